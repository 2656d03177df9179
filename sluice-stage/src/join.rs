// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Join stage that flattens groups back into individual items.
//!
//! [`join`](JoinExt::join) is the inverse of [`batch`](crate::BatchExt::batch):
//! every group read from the source is written element by element, in
//! order. Each element waits for room in the output, so no more than the
//! current group is ever held by the stage.
//!
//! ```
//! use sluice_stage::prelude::*;
//! use sluice_test_utils::{channel_from, collect_all};
//!
//! # #[tokio::main]
//! # async fn main() -> sluice_core::Result<()> {
//! let groups = channel_from(vec![vec![1, 2], vec![], vec![3]]);
//!
//! let flat = groups.join();
//!
//! assert_eq!(collect_all(&flat).await?, vec![1, 2, 3]);
//! # Ok(())
//! # }
//! ```

use sluice_core::stage_task::spawn_stage;
use sluice_core::{
    CancellationToken, Channel, ChannelRead, ChannelReader, ChannelWriter, Result, StageOptions,
};

/// Extension trait providing the [`join`](Self::join) and
/// [`join_map`](Self::join_map) stages.
pub trait JoinExt: ChannelRead + Sized {
    /// Flattens every group read from this reader.
    ///
    /// Must be called from within a Tokio runtime.
    fn join<T>(self) -> ChannelReader<T>
    where
        Self::Item: IntoIterator<Item = T>,
        <Self::Item as IntoIterator>::IntoIter: Send,
        T: Send + 'static,
    {
        self.join_map(|group| group)
    }

    /// [`join`](Self::join) with explicit output channel options.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`](sluice_core::SluiceError::InvalidArgument)
    /// when the output capacity is `Bounded(0)`.
    fn join_with<T>(self, options: StageOptions) -> Result<ChannelReader<T>>
    where
        Self::Item: IntoIterator<Item = T>,
        <Self::Item as IntoIterator>::IntoIter: Send,
        T: Send + 'static,
    {
        self.join_map_with(|group| group, options)
    }

    /// Maps every group with `f`, then flattens the result.
    fn join_map<F, J>(self, f: F) -> ChannelReader<J::Item>
    where
        F: Fn(Self::Item) -> J + Send + Sync + 'static,
        J: IntoIterator,
        J::IntoIter: Send,
        J::Item: Send + 'static,
    {
        let (writer, reader) = Channel::unbounded().split();
        spawn_join(self, f, writer, None);
        reader
    }

    /// [`join_map`](Self::join_map) with explicit output channel options.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`](sluice_core::SluiceError::InvalidArgument)
    /// when the output capacity is `Bounded(0)`.
    fn join_map_with<F, J>(self, f: F, options: StageOptions) -> Result<ChannelReader<J::Item>>
    where
        F: Fn(Self::Item) -> J + Send + Sync + 'static,
        J: IntoIterator,
        J::IntoIter: Send,
        J::Item: Send + 'static,
    {
        let (writer, reader) = options.output_channel(1)?.split();
        spawn_join(self, f, writer, options.cancellation);
        Ok(reader)
    }
}

impl<R: ChannelRead> JoinExt for R {}

fn spawn_join<R, F, J>(
    source: R,
    f: F,
    writer: ChannelWriter<J::Item>,
    cancellation: Option<CancellationToken>,
) where
    R: ChannelRead,
    F: Fn(R::Item) -> J + Send + Sync + 'static,
    J: IntoIterator,
    J::IntoIter: Send,
    J::Item: Send + 'static,
{
    let output = writer.clone();
    spawn_stage("join", writer, cancellation, async move {
        let mut written = 0u64;
        loop {
            while let Some(group) = source.try_read()? {
                for item in f(group) {
                    output.write(item).await?;
                    written += 1;
                }
            }
            if !source.wait_to_read().await? {
                break;
            }
        }
        crate::debug!("join: wrote {written} items");
        Ok(())
    });
}
