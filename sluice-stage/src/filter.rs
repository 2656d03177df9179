// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use sluice_core::stage_task::spawn_stage;
use sluice_core::{
    CancellationToken, Channel, ChannelRead, ChannelReader, ChannelWriter, Result, StageOptions,
};

/// Extension trait providing the [`filter`](Self::filter) stage.
pub trait FilterExt: ChannelRead + Sized {
    /// Forwards only the items for which `predicate` returns `true`.
    ///
    /// The output is exactly the satisfying subsequence of the input, in
    /// input order. Completion and faults of the source are propagated
    /// unchanged; a panicking predicate faults the output with
    /// [`SluiceError::CallbackPanic`](sluice_core::SluiceError::CallbackPanic).
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sluice_stage::FilterExt;
    /// use sluice_test_utils::{channel_from, collect_all};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> sluice_core::Result<()> {
    /// let evens = channel_from(1..=6).filter(|value| value % 2 == 0);
    ///
    /// assert_eq!(collect_all(&evens).await?, vec![2, 4, 6]);
    /// # Ok(())
    /// # }
    /// ```
    fn filter<P>(self, predicate: P) -> ChannelReader<Self::Item>
    where
        P: Fn(&Self::Item) -> bool + Send + Sync + 'static,
    {
        let (writer, reader) = Channel::unbounded().split();
        spawn_filter(self, predicate, writer, None);
        reader
    }

    /// [`filter`](Self::filter) with explicit output channel options.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`](sluice_core::SluiceError::InvalidArgument)
    /// when the output capacity is `Bounded(0)`.
    fn filter_with<P>(self, predicate: P, options: StageOptions) -> Result<ChannelReader<Self::Item>>
    where
        P: Fn(&Self::Item) -> bool + Send + Sync + 'static,
    {
        let (writer, reader) = options.output_channel(1)?.split();
        spawn_filter(self, predicate, writer, options.cancellation);
        Ok(reader)
    }
}

impl<R: ChannelRead> FilterExt for R {}

fn spawn_filter<R, P>(
    source: R,
    predicate: P,
    writer: ChannelWriter<R::Item>,
    cancellation: Option<CancellationToken>,
) where
    R: ChannelRead,
    P: Fn(&R::Item) -> bool + Send + Sync + 'static,
{
    let output = writer.clone();
    spawn_stage("filter", writer, cancellation, async move {
        let (mut passed, mut dropped) = (0u64, 0u64);
        loop {
            while let Some(item) = source.try_read()? {
                if predicate(&item) {
                    output.write(item).await?;
                    passed += 1;
                } else {
                    dropped += 1;
                }
            }
            if !source.wait_to_read().await? {
                break;
            }
        }
        crate::debug!("filter: passed {passed} items, dropped {dropped}");
        Ok(())
    });
}
