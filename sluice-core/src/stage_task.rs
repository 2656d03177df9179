// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Spawning of stage tasks with fault and cancellation propagation.
//!
//! Every non-terminal stage is a future that reads its upstream and writes
//! the output channel it owns. This module runs such futures on the Tokio
//! runtime and guarantees that the output channel is completed exactly once
//! when they end:
//!
//! - `Ok(())` completes the output without a fault,
//! - `Err(SluiceError::ChannelClosed)` means the output has no readers (or was
//!   already completed by a sibling worker) and stops quietly,
//! - any other error, a panic, or a cancelled token completes the output with
//!   that fault.

use crate::cancellation_token::CancellationToken;
use crate::channel::ChannelWriter;
use crate::error::{Result, SluiceError};
use futures::future::{join_all, FutureExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;

/// Run `stage`, converting a panic into [`SluiceError::CallbackPanic`] and
/// racing it against `cancellation`.
///
/// On cancellation the stage future is dropped where it is suspended.
///
/// # Errors
///
/// Returns the stage's own error, the converted panic, or
/// [`SluiceError::Cancelled`].
pub async fn guarded<R, Fut>(stage: Fut, cancellation: Option<&CancellationToken>) -> Result<R>
where
    Fut: Future<Output = Result<R>>,
{
    let body = AssertUnwindSafe(stage)
        .catch_unwind()
        .map(|outcome| outcome.unwrap_or_else(|payload| Err(SluiceError::from_panic(payload))));

    match cancellation {
        Some(token) => {
            tokio::select! {
                outcome = body => outcome,
                () = token.cancelled() => Err(SluiceError::Cancelled),
            }
        }
        None => body.await,
    }
}

/// Complete `writer` according to how the stage `name` ended.
pub fn finish_stage<T>(name: &'static str, writer: &ChannelWriter<T>, outcome: Result<()>) {
    match outcome {
        Ok(()) => {
            crate::debug!("{name}: source exhausted, completing output");
            writer.complete(None);
        }
        Err(SluiceError::ChannelClosed) => {
            crate::debug!("{name}: output closed, stopping");
            writer.complete(None);
        }
        Err(fault) => {
            if matches!(fault, SluiceError::CallbackPanic { .. }) {
                crate::error!("{name}: callback panicked: {fault}");
            } else {
                crate::warn!("{name}: propagating fault: {fault}");
            }
            writer.complete(Some(fault));
        }
    }
}

/// Spawn a single-loop stage that owns `writer`.
pub fn spawn_stage<T, Fut>(
    name: &'static str,
    writer: ChannelWriter<T>,
    cancellation: Option<CancellationToken>,
    stage: Fut,
) -> JoinHandle<()>
where
    T: Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    crate::debug!("{name}: starting");
    tokio::spawn(async move {
        let outcome = guarded(stage, cancellation.as_ref()).await;
        finish_stage(name, &writer, outcome);
    })
}

/// Spawn `concurrency` worker loops sharing `writer`.
///
/// `worker(index)` builds the body of each loop. The first worker to fail
/// faults the output immediately; siblings then stop on their next write.
/// The output is completed without a fault once every worker finished.
pub fn spawn_workers<T, F, Fut>(
    name: &'static str,
    concurrency: usize,
    writer: ChannelWriter<T>,
    cancellation: Option<CancellationToken>,
    mut worker: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    crate::debug!("{name}: starting {concurrency} workers");
    let workers: Vec<JoinHandle<()>> = (0..concurrency)
        .map(|index| {
            let writer = writer.clone();
            let cancellation = cancellation.clone();
            let body = worker(index);
            tokio::spawn(async move {
                match guarded(body, cancellation.as_ref()).await {
                    Ok(()) => crate::debug!("{name}: worker {index} drained its source"),
                    Err(SluiceError::ChannelClosed) => {
                        crate::debug!("{name}: worker {index} found output closed");
                    }
                    Err(fault) => finish_stage(name, &writer, Err(fault)),
                }
            })
        })
        .collect();

    tokio::spawn(async move {
        for joined in join_all(workers).await {
            if let Err(join_error) = joined {
                finish_stage(
                    name,
                    &writer,
                    Err(SluiceError::CallbackPanic {
                        context: join_error.to_string(),
                    }),
                );
            }
        }
        finish_stage(name, &writer, Ok(()));
    })
}
