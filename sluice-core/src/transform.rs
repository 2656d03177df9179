// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Lazy, pull-based transformation of a channel's read side.
//!
//! [`TransformReader`] decorates any [`ChannelRead`]: the backing channel
//! still stores the untransformed values, and the transform runs at read
//! time, exactly once per physical item. Nothing is spawned and nothing is
//! buffered, so backpressure is exactly that of the source channel.
//!
//! [`TransformChannel`] pairs the untouched writer of a channel with a
//! transformed reader of the same channel.
//!
//! ```
//! use sluice_core::{Channel, ChannelRead, TransformChannel};
//!
//! # #[tokio::main]
//! # async fn main() -> sluice_core::Result<()> {
//! let channel = TransformChannel::new(Channel::bounded(4)?, |n: i32| n.to_string());
//!
//! channel.writer().write(7).await?;
//! channel.writer().complete(None);
//!
//! assert_eq!(channel.reader().read().await?, Some("7".to_string()));
//! assert_eq!(channel.reader().read().await?, None);
//! # Ok(())
//! # }
//! ```

use crate::channel::{Channel, ChannelOptions, ChannelReader, ChannelWriter};
use crate::channel_read::ChannelRead;
use crate::error::{Result, SluiceError};
use async_trait::async_trait;
use core::fmt;
use std::sync::Arc;

/// A reader that applies `transform` to each item as it is read.
pub struct TransformReader<R, F> {
    source: R,
    transform: Arc<F>,
}

impl<R, F> TransformReader<R, F> {
    pub fn new(source: R, transform: F) -> Self {
        Self {
            source,
            transform: Arc::new(transform),
        }
    }

    /// The undecorated reader.
    pub fn source(&self) -> &R {
        &self.source
    }
}

impl<R: Clone, F> Clone for TransformReader<R, F> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<R: fmt::Debug, F> fmt::Debug for TransformReader<R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformReader")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<R, F, U> ChannelRead for TransformReader<R, F>
where
    R: ChannelRead,
    F: Fn(R::Item) -> U + Send + Sync + 'static,
    U: Send + 'static,
{
    type Item = U;

    fn try_read(&self) -> Result<Option<U>> {
        Ok(self.source.try_read()?.map(|item| (self.transform)(item)))
    }

    async fn wait_to_read(&self) -> Result<bool> {
        self.source.wait_to_read().await
    }

    async fn read(&self) -> Result<Option<U>> {
        Ok(self.source.read().await?.map(|item| (self.transform)(item)))
    }

    fn is_completed(&self) -> bool {
        self.source.is_completed()
    }

    fn fault(&self) -> Option<SluiceError> {
        self.source.fault()
    }

    fn options(&self) -> ChannelOptions {
        self.source.options()
    }
}

/// Extension trait providing [`transform`](TransformExt::transform) on every reader.
pub trait TransformExt: ChannelRead + Sized {
    /// Decorate this reader so reads yield `transform(item)`.
    ///
    /// Lazy: no task is spawned and no channel is created.
    fn transform<U, F>(self, transform: F) -> TransformReader<Self, F>
    where
        F: Fn(Self::Item) -> U + Send + Sync + 'static,
        U: Send + 'static,
    {
        TransformReader::new(self, transform)
    }
}

impl<R: ChannelRead> TransformExt for R {}

/// A channel whose writers write `T` and whose readers receive `transform(T)`.
pub struct TransformChannel<T, F> {
    writer: ChannelWriter<T>,
    reader: TransformReader<ChannelReader<T>, F>,
}

impl<T, U, F> TransformChannel<T, F>
where
    T: Send + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
    U: Send + 'static,
{
    /// Wrap `source`; its storage is reused as is.
    pub fn new(source: Channel<T>, transform: F) -> Self {
        let (writer, reader) = source.split();
        Self {
            writer,
            reader: TransformReader::new(reader, transform),
        }
    }
}

impl<T, F> TransformChannel<T, F> {
    pub fn writer(&self) -> &ChannelWriter<T> {
        &self.writer
    }

    pub fn reader(&self) -> &TransformReader<ChannelReader<T>, F> {
        &self.reader
    }

    /// Separate the write and transformed read sides.
    pub fn split(self) -> (ChannelWriter<T>, TransformReader<ChannelReader<T>, F>) {
        (self.writer, self.reader)
    }
}

impl<T, F> fmt::Debug for TransformChannel<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformChannel")
            .field("writer", &self.writer)
            .field("reader", &self.reader)
            .finish()
    }
}
