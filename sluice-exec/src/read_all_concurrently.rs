// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use futures::future::{self, join_all};
use parking_lot::Mutex;
use sluice_core::stage_task::guarded;
use sluice_core::{CancellationToken, ChannelRead, IntoSluiceError, Result, SluiceError};
use std::error::Error;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Extension trait that drains a channel with several concurrent read loops.
///
/// `concurrency` independent loops share the reader. Each loop reads an item,
/// runs the action on it and moves on, so items are consumed in no particular
/// order across loops. The call resolves once every loop has stopped.
#[async_trait]
pub trait ReadAllConcurrentlyExt: ChannelRead {
    /// Drains the channel with `concurrency` loops calling `action`.
    ///
    /// # Behavior
    ///
    /// - Every item is handed to exactly one loop
    /// - Resolves with the total number of processed items once the source
    ///   is exhausted and every loop has returned
    /// - An `Err` or a panic from `action` stops the loop that hit it; the
    ///   remaining loops keep draining
    /// - The earliest fault is reported once all loops have stopped
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice_exec::ReadAllConcurrentlyExt;
    /// use sluice_stage::prelude::*;
    /// use sluice_test_utils::TestError;
    /// use std::sync::atomic::{AtomicU64, Ordering};
    /// use std::sync::Arc;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> sluice_core::Result<()> {
    /// let total = Arc::new(AtomicU64::new(0));
    /// let sum = Arc::clone(&total);
    ///
    /// let processed = (1..=100u64)
    ///     .to_channel()
    ///     .read_all_concurrently(
    ///         4,
    ///         move |item| {
    ///             sum.fetch_add(item, Ordering::Relaxed);
    ///             Ok::<_, TestError>(())
    ///         },
    ///         None,
    ///     )
    ///     .await?;
    ///
    /// assert_eq!(processed, 100);
    /// assert_eq!(total.load(Ordering::Relaxed), 5050);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`] when `concurrency` is 0.
    /// Otherwise returns the first fault recorded by any loop: the action's
    /// error, the source's fault, [`SluiceError::CallbackPanic`], or
    /// [`SluiceError::Cancelled`].
    async fn read_all_concurrently<F, E>(
        self,
        concurrency: usize,
        action: F,
        cancellation: Option<CancellationToken>,
    ) -> Result<u64>
    where
        F: Fn(Self::Item) -> core::result::Result<(), E> + Send + Sync + 'static,
        E: Error + Send + Sync + 'static;

    /// Async counterpart of
    /// [`read_all_concurrently`](Self::read_all_concurrently).
    ///
    /// Each loop awaits the future returned by `action` before reading its
    /// next item, so at most `concurrency` futures are in flight.
    ///
    /// # Errors
    ///
    /// Same as [`read_all_concurrently`](Self::read_all_concurrently).
    async fn read_all_concurrently_async<F, Fut, E>(
        self,
        concurrency: usize,
        action: F,
        cancellation: Option<CancellationToken>,
    ) -> Result<u64>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = core::result::Result<(), E>> + Send + 'static,
        E: Error + Send + Sync + 'static;
}

#[async_trait]
impl<R: ChannelRead> ReadAllConcurrentlyExt for R {
    async fn read_all_concurrently<F, E>(
        self,
        concurrency: usize,
        action: F,
        cancellation: Option<CancellationToken>,
    ) -> Result<u64>
    where
        F: Fn(Self::Item) -> core::result::Result<(), E> + Send + Sync + 'static,
        E: Error + Send + Sync + 'static,
    {
        drain_concurrently(
            "read_all_concurrently",
            self,
            concurrency,
            move |item| future::ready(action(item)),
            cancellation,
        )
        .await
    }

    async fn read_all_concurrently_async<F, Fut, E>(
        self,
        concurrency: usize,
        action: F,
        cancellation: Option<CancellationToken>,
    ) -> Result<u64>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = core::result::Result<(), E>> + Send + 'static,
        E: Error + Send + Sync + 'static,
    {
        drain_concurrently(
            "read_all_concurrently_async",
            self,
            concurrency,
            action,
            cancellation,
        )
        .await
    }
}

/// Keeps the fault that was recorded first; later ones are only logged.
#[derive(Default)]
struct FirstFault(Mutex<Option<SluiceError>>);

impl FirstFault {
    fn record(&self, fault: SluiceError) {
        let mut slot = self.0.lock();
        if slot.is_none() {
            *slot = Some(fault);
        }
    }

    fn take(&self) -> Option<SluiceError> {
        self.0.lock().take()
    }
}

async fn drain_concurrently<R, F, Fut, E>(
    name: &'static str,
    source: R,
    concurrency: usize,
    action: F,
    cancellation: Option<CancellationToken>,
) -> Result<u64>
where
    R: ChannelRead,
    F: Fn(R::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = core::result::Result<(), E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
{
    if concurrency == 0 {
        return Err(SluiceError::invalid_argument(
            "concurrency",
            "at least one read loop is required",
        ));
    }
    if concurrency > 1 && source.options().single_reader {
        crate::warn!("{name}: {concurrency} loops reading a channel flagged single_reader");
    }

    crate::debug!("{name}: starting {concurrency} loops");
    let action = Arc::new(action);
    let first_fault = Arc::new(FirstFault::default());
    let total = Arc::new(AtomicU64::new(0));

    let loops: Vec<JoinHandle<()>> = (0..concurrency)
        .map(|index| {
            let source = source.clone();
            let action = Arc::clone(&action);
            let first_fault = Arc::clone(&first_fault);
            let total = Arc::clone(&total);
            let cancellation = cancellation.clone();
            tokio::spawn(async move {
                let mut processed = 0u64;
                let outcome = guarded(
                    async {
                        loop {
                            while let Some(item) = source.try_read()? {
                                action(item)
                                    .await
                                    .map_err(IntoSluiceError::into_sluice_error)?;
                                processed += 1;
                            }
                            if !source.wait_to_read().await? {
                                return Ok::<(), SluiceError>(());
                            }
                        }
                    },
                    cancellation.as_ref(),
                )
                .await;

                total.fetch_add(processed, Ordering::Relaxed);
                match outcome {
                    Ok(()) => crate::debug!("{name}: loop {index} drained {processed} items"),
                    Err(fault) => {
                        if matches!(fault, SluiceError::CallbackPanic { .. }) {
                            crate::error!("{name}: loop {index} panicked after {processed} items: {fault}");
                        } else {
                            crate::warn!("{name}: loop {index} stopped after {processed} items: {fault}");
                        }
                        first_fault.record(fault);
                    }
                }
            })
        })
        .collect();
    drop(source);

    for joined in join_all(loops).await {
        if let Err(join_error) = joined {
            first_fault.record(SluiceError::CallbackPanic {
                context: join_error.to_string(),
            });
        }
    }

    let fault = first_fault.take();
    match fault {
        Some(fault) => Err(fault),
        None => Ok(total.load(Ordering::Relaxed)),
    }
}
