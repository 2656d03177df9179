// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The read-side abstraction every stage consumes.
//!
//! Stages never take a concrete [`ChannelReader`]; they take any
//! [`ChannelRead`]. That is what lets a lazily transformed reader
//! ([`TransformReader`](crate::TransformReader)) feed a stage exactly like a
//! plain one.

use crate::channel::{ChannelOptions, ChannelReader};
use crate::error::{Result, SluiceError};
use crate::stream_item::StreamItem;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

/// Read access to a channel.
///
/// Implementors must be cheap to clone: fan-out stages clone the reader once
/// per worker.
#[async_trait]
pub trait ChannelRead: Clone + Send + Sync + 'static {
    /// Type produced by a read.
    type Item: Send + 'static;

    /// Read without waiting; `Ok(None)` when nothing is buffered right now.
    ///
    /// # Errors
    ///
    /// Returns the channel's fault once the buffered items are drained.
    fn try_read(&self) -> Result<Option<Self::Item>>;

    /// Wait until an item is available; `false` once exhausted.
    ///
    /// # Errors
    ///
    /// Returns the channel's fault once the buffered items are drained.
    async fn wait_to_read(&self) -> Result<bool>;

    /// Read the next item, waiting if necessary; `None` once exhausted.
    ///
    /// # Errors
    ///
    /// Returns the channel's fault once the buffered items are drained.
    async fn read(&self) -> Result<Option<Self::Item>> {
        loop {
            if let Some(item) = self.try_read()? {
                return Ok(Some(item));
            }
            if !self.wait_to_read().await? {
                return Ok(None);
            }
        }
    }

    /// `true` once the underlying channel stopped accepting writes.
    fn is_completed(&self) -> bool;

    /// The fault the underlying channel was completed with, if any.
    fn fault(&self) -> Option<SluiceError>;

    /// Options of the underlying channel.
    fn options(&self) -> ChannelOptions;

    /// Expose the reader as a `futures` stream.
    ///
    /// The stream yields every value, then at most one
    /// [`StreamItem::Error`] if the channel faulted, then ends.
    fn into_stream(self) -> BoxStream<'static, StreamItem<Self::Item>>
    where
        Self: Sized,
    {
        stream::unfold(Some(self), |reader| async move {
            let reader = reader?;
            match reader.read().await {
                Ok(Some(item)) => Some((StreamItem::Value(item), Some(reader))),
                Ok(None) => None,
                Err(fault) => Some((StreamItem::Error(fault), None)),
            }
        })
        .boxed()
    }
}

#[async_trait]
impl<T: Send + 'static> ChannelRead for ChannelReader<T> {
    type Item = T;

    fn try_read(&self) -> Result<Option<T>> {
        ChannelReader::try_read(self)
    }

    async fn wait_to_read(&self) -> Result<bool> {
        ChannelReader::wait_to_read(self).await
    }

    async fn read(&self) -> Result<Option<T>> {
        ChannelReader::read(self).await
    }

    fn is_completed(&self) -> bool {
        ChannelReader::is_completed(self)
    }

    fn fault(&self) -> Option<SluiceError> {
        ChannelReader::fault(self)
    }

    fn options(&self) -> ChannelOptions {
        ChannelReader::options(self)
    }
}
