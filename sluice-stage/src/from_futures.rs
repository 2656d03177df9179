// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::Future;
use parking_lot::Mutex;
use sluice_core::stage_task::spawn_workers;
use sluice_core::{ChannelReader, IntoSluiceError, Result, SluiceError, StageOptions};
use std::error::Error;
use std::sync::Arc;

/// Resolves a sequence of futures into a channel, `max_concurrency` at a time.
///
/// A pool of `max_concurrency` writer tasks each takes the next future from
/// the shared iterator, awaits it and writes its output, so the channel is
/// filled in completion order. The first `Err` faults the channel; the
/// remaining futures are not polled.
///
/// Must be called from within a Tokio runtime.
///
/// ```
/// use sluice_core::StageOptions;
/// use sluice_stage::from_futures;
/// use sluice_test_utils::{collect_all, delayed, TestError};
///
/// # #[tokio::main]
/// # async fn main() -> sluice_core::Result<()> {
/// let fetches = (1..=4).map(|id| async move { Ok::<_, TestError>(delayed(id, 5).await) });
///
/// let reader = from_futures(fetches, 2, StageOptions::default())?;
///
/// let mut ids = collect_all(&reader).await?;
/// ids.sort_unstable();
/// assert_eq!(ids, vec![1, 2, 3, 4]);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`SluiceError::InvalidArgument`] when `max_concurrency` is 0 or
/// the output capacity is `Bounded(0)`.
pub fn from_futures<I, Fut, T, E>(
    futures: I,
    max_concurrency: usize,
    options: StageOptions,
) -> Result<ChannelReader<T>>
where
    I: IntoIterator<Item = Fut>,
    I::IntoIter: Send + 'static,
    Fut: Future<Output = core::result::Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Error + Send + Sync + 'static,
{
    if max_concurrency == 0 {
        return Err(SluiceError::invalid_argument(
            "max_concurrency",
            "at least one future must be in flight",
        ));
    }

    let (writer, reader) = options.output_channel(max_concurrency)?.split();
    let pending = Arc::new(Mutex::new(futures.into_iter()));
    let output = writer.clone();

    spawn_workers(
        "from_futures",
        max_concurrency,
        writer,
        options.cancellation,
        move |index| {
            let pending = Arc::clone(&pending);
            let output = output.clone();
            async move {
                let mut resolved = 0u64;
                loop {
                    let next = pending.lock().next();
                    let Some(future) = next else {
                        crate::debug!("from_futures: worker {index} resolved {resolved} futures");
                        return Ok(());
                    };
                    let value = future.await.map_err(IntoSluiceError::into_sluice_error)?;
                    output.write(value).await?;
                    resolved += 1;
                }
            }
        },
    );

    Ok(reader)
}
