// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use futures::future;
use sluice_core::stage_task::guarded;
use sluice_core::{CancellationToken, ChannelRead, IntoSluiceError, Result, SluiceError};
use std::convert::Infallible;
use std::error::Error;
use std::future::Future;

/// Extension trait that drains a channel on the calling task.
///
/// Every method consumes the reader, invokes the action once per item in
/// channel order and returns the number of items processed once the source is
/// exhausted.
#[async_trait]
pub trait ReadAllExt: ChannelRead {
    /// Drains the channel, calling `action` for every item.
    ///
    /// # Behavior
    ///
    /// - Items are handed to `action` one at a time, in the order they were read
    /// - Resolves with the number of processed items once the source completes
    /// - Stops at the first fault of the source
    /// - A panic inside `action` stops the drain with
    ///   [`SluiceError::CallbackPanic`]
    ///
    /// # Arguments
    ///
    /// * `action` - Called with every item.
    /// * `cancellation` - Optional token; cancelling it stops the drain at the
    ///   next suspension point.
    ///
    /// # Errors
    ///
    /// Returns the source's fault, [`SluiceError::CallbackPanic`], or
    /// [`SluiceError::Cancelled`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice_exec::ReadAllExt;
    /// use sluice_stage::prelude::*;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> sluice_core::Result<()> {
    /// let mut seen = Vec::new();
    ///
    /// let processed = (1..=3)
    ///     .to_channel()
    ///     .read_all(|item| seen.push(item), None)
    ///     .await?;
    ///
    /// assert_eq!(processed, 3);
    /// assert_eq!(seen, vec![1, 2, 3]);
    /// # Ok(())
    /// # }
    /// ```
    async fn read_all<F>(self, action: F, cancellation: Option<CancellationToken>) -> Result<u64>
    where
        F: FnMut(Self::Item) + Send;

    /// Drains the channel with a fallible `action`.
    ///
    /// The first `Err` returned by `action` stops the drain and is surfaced as
    /// [`SluiceError::StageFault`]; items after it are left unread.
    ///
    /// # Errors
    ///
    /// Returns the action's error, the source's fault,
    /// [`SluiceError::CallbackPanic`], or [`SluiceError::Cancelled`].
    async fn try_read_all<F, E>(
        self,
        action: F,
        cancellation: Option<CancellationToken>,
    ) -> Result<u64>
    where
        F: FnMut(Self::Item) -> core::result::Result<(), E> + Send,
        E: Error + Send + Sync + 'static;

    /// Drains the channel with an async `action`.
    ///
    /// Each returned future is awaited before the next item is read, so the
    /// action never runs concurrently with itself. Use
    /// [`read_all_concurrently_async`](crate::ReadAllConcurrentlyExt::read_all_concurrently_async)
    /// to overlap slow actions.
    ///
    /// ```
    /// use sluice_exec::ReadAllExt;
    /// use sluice_stage::prelude::*;
    /// use sluice_test_utils::{delayed, TestError};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> sluice_core::Result<()> {
    /// let processed = (0..5)
    ///     .to_channel()
    ///     .read_all_async(
    ///         |item| async move {
    ///             delayed(item, 1).await;
    ///             Ok::<_, TestError>(())
    ///         },
    ///         None,
    ///     )
    ///     .await?;
    ///
    /// assert_eq!(processed, 5);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the action's error, the source's fault,
    /// [`SluiceError::CallbackPanic`], or [`SluiceError::Cancelled`].
    async fn read_all_async<F, Fut, E>(
        self,
        action: F,
        cancellation: Option<CancellationToken>,
    ) -> Result<u64>
    where
        F: FnMut(Self::Item) -> Fut + Send,
        Fut: Future<Output = core::result::Result<(), E>> + Send,
        E: Error + Send + Sync + 'static;
}

#[async_trait]
impl<R: ChannelRead> ReadAllExt for R {
    async fn read_all<F>(self, mut action: F, cancellation: Option<CancellationToken>) -> Result<u64>
    where
        F: FnMut(Self::Item) + Send,
    {
        drain(
            "read_all",
            self,
            move |item| {
                action(item);
                future::ready(Ok::<(), Infallible>(()))
            },
            cancellation,
        )
        .await
    }

    async fn try_read_all<F, E>(
        self,
        mut action: F,
        cancellation: Option<CancellationToken>,
    ) -> Result<u64>
    where
        F: FnMut(Self::Item) -> core::result::Result<(), E> + Send,
        E: Error + Send + Sync + 'static,
    {
        drain(
            "try_read_all",
            self,
            move |item| future::ready(action(item)),
            cancellation,
        )
        .await
    }

    async fn read_all_async<F, Fut, E>(
        self,
        action: F,
        cancellation: Option<CancellationToken>,
    ) -> Result<u64>
    where
        F: FnMut(Self::Item) -> Fut + Send,
        Fut: Future<Output = core::result::Result<(), E>> + Send,
        E: Error + Send + Sync + 'static,
    {
        drain("read_all_async", self, action, cancellation).await
    }
}

async fn drain<R, F, Fut, E>(
    name: &'static str,
    source: R,
    mut action: F,
    cancellation: Option<CancellationToken>,
) -> Result<u64>
where
    R: ChannelRead,
    F: FnMut(R::Item) -> Fut + Send,
    Fut: Future<Output = core::result::Result<(), E>> + Send,
    E: Error + Send + Sync + 'static,
{
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

    match outcome {
        Ok(()) => {
            crate::debug!("{name}: source exhausted after {processed} items");
            Ok(processed)
        }
        Err(fault) => {
            if matches!(fault, SluiceError::CallbackPanic { .. }) {
                crate::error!("{name}: action panicked after {processed} items: {fault}");
            } else {
                crate::warn!("{name}: stopped after {processed} items: {fault}");
            }
            Err(fault)
        }
    }
}
