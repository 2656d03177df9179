// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Batch stage that groups consecutive items into fixed-size vectors.
//!
//! # Overview
//!
//! The [`batch`](BatchExt::batch) stage collects items into a buffer of a
//! fixed size. When the buffer is full it is written downstream as one
//! `Vec`. On exhaustion any partial buffer is written as a final, shorter
//! batch.
//!
//! # Basic Usage
//!
//! ```
//! use sluice_stage::prelude::*;
//! use sluice_test_utils::{assert_exhausted, test_channel, unwrap_read};
//!
//! # #[tokio::main]
//! # async fn main() -> sluice_core::Result<()> {
//! let (tx, rx) = test_channel();
//! let batches = rx.batch(3)?;
//!
//! for value in 1..=5 {
//!     tx.write(value).await?;
//! }
//! tx.complete(None); // Partial batch [4, 5] written on completion
//!
//! assert_eq!(unwrap_read(&batches, 500).await, vec![1, 2, 3]);
//! assert_eq!(unwrap_read(&batches, 500).await, vec![4, 5]);
//! assert_exhausted(&batches, 500).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Use Cases
//!
//! - **Bulk writes**: Amortize per-call costs of a sink (database, socket)
//! - **Micro-batching**: Balance latency and throughput in data pipelines
//!
//! # Error Handling
//!
//! When the source faults, the current partial batch is discarded and the
//! fault is propagated to the output. Nothing incomplete is written.

use sluice_core::stage_task::spawn_stage;
use sluice_core::{ChannelRead, ChannelReader, Result, SluiceError, StageOptions};
use std::mem;

/// Extension trait providing the [`batch`](Self::batch) stage.
///
/// Implemented for every [`ChannelRead`].
pub trait BatchExt: ChannelRead + Sized {
    /// Groups consecutive items into batches of `size` items.
    ///
    /// Every batch holds exactly `size` items, except possibly the last one,
    /// which holds the remainder. An empty source produces no batch.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`] when `size` is 0.
    fn batch(self, size: usize) -> Result<ChannelReader<Vec<Self::Item>>> {
        self.batch_with(size, StageOptions::default())
    }

    /// [`batch`](Self::batch) with explicit output channel options.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`] when `size` is 0 or the
    /// output capacity is `Bounded(0)`.
    fn batch_with(self, size: usize, options: StageOptions) -> Result<ChannelReader<Vec<Self::Item>>> {
        if size == 0 {
            return Err(SluiceError::invalid_argument(
                "size",
                "batch size must be at least 1",
            ));
        }

        let (writer, reader) = options.output_channel(1)?.split();
        let output = writer.clone();
        let source = self;

        spawn_stage("batch", writer, options.cancellation, async move {
            let mut buffer = Vec::with_capacity(size);
            let mut batches = 0u64;

            loop {
                while let Some(item) = source.try_read()? {
                    buffer.push(item);
                    if buffer.len() == size {
                        let full = mem::replace(&mut buffer, Vec::with_capacity(size));
                        output.write(full).await?;
                        batches += 1;
                    }
                }
                if !source.wait_to_read().await? {
                    break;
                }
            }

            if !buffer.is_empty() {
                crate::debug!("batch: flushing partial batch of {} items", buffer.len());
                output.write(buffer).await?;
                batches += 1;
            }
            crate::debug!("batch: wrote {batches} batches");
            Ok(())
        });

        Ok(reader)
    }
}

impl<R: ChannelRead> BatchExt for R {}
