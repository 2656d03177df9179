// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Pipe stage that maps every item through a (possibly async) mapper with
//! bounded concurrency.
//!
//! # Overview
//!
//! [`pipe`](PipeExt::pipe) applies a synchronous mapper,
//! [`pipe_async`](PipeExt::pipe_async) a mapper returning a fallible future.
//! Both run `concurrency` mappers at a time.
//!
//! # Ordering
//!
//! By default the stage runs `concurrency` independent worker loops that
//! share the source reader and the output writer. Each worker reads one
//! item, maps it and writes the result, so:
//!
//! - with `concurrency == 1` output order equals input order,
//! - with more workers the output is in completion order, a permutation of
//!   the mapped input.
//!
//! With [`StageOptions::with_preserve_order`] a single reader loop hands
//! every item to a spawned task and re-sequences the results, keeping at
//! most `concurrency` in flight. Output order then equals input order.
//!
//! # Basic Usage
//!
//! ```
//! use sluice_stage::prelude::*;
//! use sluice_test_utils::{channel_from, collect_all};
//!
//! # #[tokio::main]
//! # async fn main() -> sluice_core::Result<()> {
//! let doubled = channel_from(1..=5).pipe(1, |value| value * 2)?;
//!
//! assert_eq!(collect_all(&doubled).await?, vec![2, 4, 6, 8, 10]);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! The first mapper error (an `Err` from an async mapper or a panic in any
//! mapper) faults the output at once. Results already written stay readable
//! ahead of the fault. Sibling workers finish the item they hold and take no
//! further items from the source.

use futures::future::{self, Future};
use futures::StreamExt;
use sluice_core::stage_task::{spawn_stage, spawn_workers};
use sluice_core::{
    ChannelRead, ChannelReader, ChannelWriter, IntoSluiceError, Result, SluiceError,
    StageOptions, StreamItem,
};
use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;

/// Extension trait providing the [`pipe`](Self::pipe) and
/// [`pipe_async`](Self::pipe_async) stages.
pub trait PipeExt: ChannelRead + Sized {
    /// Maps every item with `mapper`, running up to `concurrency` mappers at a
    /// time.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`] when `concurrency` is 0.
    fn pipe<U, F>(self, concurrency: usize, mapper: F) -> Result<ChannelReader<U>>
    where
        F: Fn(Self::Item) -> U + Send + Sync + 'static,
        U: Send + 'static,
    {
        self.pipe_with(concurrency, mapper, StageOptions::default())
    }

    /// [`pipe`](Self::pipe) with explicit stage options.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`] when `concurrency` is 0 or the
    /// output capacity is `Bounded(0)`.
    fn pipe_with<U, F>(
        self,
        concurrency: usize,
        mapper: F,
        options: StageOptions,
    ) -> Result<ChannelReader<U>>
    where
        F: Fn(Self::Item) -> U + Send + Sync + 'static,
        U: Send + 'static,
    {
        self.pipe_async_with(
            concurrency,
            move |item| future::ready(Ok::<U, Infallible>(mapper(item))),
            options,
        )
    }

    /// Maps every item with an async, fallible `mapper`, awaiting up to
    /// `concurrency` mapper futures at a time.
    ///
    /// An `Err` returned by the mapper faults the output with
    /// [`SluiceError::StageFault`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sluice_stage::PipeExt;
    /// use sluice_test_utils::{channel_from, collect_all, delayed, TestError};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> sluice_core::Result<()> {
    /// let slow = channel_from(1..=8).pipe_async(4, |value| async move {
    ///     Ok::<_, TestError>(delayed(value * 10, 5).await)
    /// })?;
    ///
    /// let mut results = collect_all(&slow).await?;
    /// results.sort_unstable();
    /// assert_eq!(results, vec![10, 20, 30, 40, 50, 60, 70, 80]);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`] when `concurrency` is 0.
    fn pipe_async<U, E, F, Fut>(self, concurrency: usize, mapper: F) -> Result<ChannelReader<U>>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = core::result::Result<U, E>> + Send + 'static,
        E: Error + Send + Sync + 'static,
        U: Send + 'static,
    {
        self.pipe_async_with(concurrency, mapper, StageOptions::default())
    }

    /// [`pipe_async`](Self::pipe_async) with explicit stage options.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`] when `concurrency` is 0 or the
    /// output capacity is `Bounded(0)`.
    fn pipe_async_with<U, E, F, Fut>(
        self,
        concurrency: usize,
        mapper: F,
        options: StageOptions,
    ) -> Result<ChannelReader<U>>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = core::result::Result<U, E>> + Send + 'static,
        E: Error + Send + Sync + 'static,
        U: Send + 'static,
    {
        if concurrency == 0 {
            return Err(SluiceError::invalid_argument(
                "concurrency",
                "pipe concurrency must be at least 1",
            ));
        }
        if concurrency > 1 && self.options().single_reader {
            crate::warn!("pipe: fanning out {concurrency} workers over a single-reader channel");
        }

        let ordered = options.preserve_order && concurrency > 1;
        let writers = if ordered { 1 } else { concurrency };
        let (writer, reader) = options.output_channel(writers)?.split();
        let mapper = Arc::new(mapper);

        if ordered {
            spawn_ordered(self, concurrency, mapper, writer, options);
        } else {
            spawn_unordered(self, concurrency, mapper, writer, options);
        }

        Ok(reader)
    }
}

impl<R: ChannelRead> PipeExt for R {}

fn spawn_unordered<R, U, E, F, Fut>(
    source: R,
    concurrency: usize,
    mapper: Arc<F>,
    writer: ChannelWriter<U>,
    options: StageOptions,
) where
    R: ChannelRead,
    F: Fn(R::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = core::result::Result<U, E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
    U: Send + 'static,
{
    let output = writer.clone();
    spawn_workers("pipe", concurrency, writer, options.cancellation, move |_| {
        let source = source.clone();
        let output = output.clone();
        let mapper = Arc::clone(&mapper);
        async move {
            loop {
                // A sibling may have faulted the shared output.
                while !output.is_completed() {
                    let Some(item) = source.try_read()? else {
                        break;
                    };
                    let mapped = mapper(item).await.map_err(IntoSluiceError::into_sluice_error)?;
                    output.write(mapped).await?;
                }
                tokio::select! {
                    biased;
                    () = output.closed() => return Err(SluiceError::ChannelClosed),
                    ready = source.wait_to_read() => {
                        if !ready? {
                            return Ok(());
                        }
                    }
                }
            }
        }
    });
}

fn spawn_ordered<R, U, E, F, Fut>(
    source: R,
    concurrency: usize,
    mapper: Arc<F>,
    writer: ChannelWriter<U>,
    options: StageOptions,
) where
    R: ChannelRead,
    F: Fn(R::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = core::result::Result<U, E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
    U: Send + 'static,
{
    crate::debug!("pipe: re-sequencing up to {concurrency} items in flight");
    let output = writer.clone();

    spawn_stage("pipe", writer, options.cancellation, async move {
        let mut mapped = source
            .into_stream()
            .map(move |item| {
                let mapper = Arc::clone(&mapper);
                async move {
                    match item {
                        StreamItem::Value(value) => {
                            let task = tokio::spawn(async move { mapper(value).await });
                            match task.await {
                                Ok(result) => result.map_err(IntoSluiceError::into_sluice_error),
                                Err(join_error) if join_error.is_panic() => {
                                    Err(SluiceError::from_panic(join_error.into_panic()))
                                }
                                Err(join_error) => Err(SluiceError::CallbackPanic {
                                    context: join_error.to_string(),
                                }),
                            }
                        }
                        StreamItem::Error(fault) => Err(fault),
                    }
                }
            })
            .buffered(concurrency);

        while let Some(result) = mapped.next().await {
            output.write(result?).await?;
        }
        Ok(())
    });
}
