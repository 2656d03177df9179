// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Pipeline stages over bounded async channels.
//!
//! Every stage reads from any [`ChannelRead`](sluice_core::ChannelRead),
//! runs as a spawned Tokio task and returns the
//! [`ChannelReader`](sluice_core::ChannelReader) of the output channel it
//! owns. Stages therefore compose by chaining:
//!
//! ```
//! use sluice_stage::prelude::*;
//! use sluice_test_utils::collect_all;
//!
//! # #[tokio::main]
//! # async fn main() -> sluice_core::Result<()> {
//! let output = (0..10)
//!     .to_channel()
//!     .filter(|value| value % 3 == 0)
//!     .pipe(2, |value| value + 1)?
//!     .batch(2)?
//!     .join();
//!
//! let mut values = collect_all(&output).await?;
//! values.sort_unstable();
//! assert_eq!(values, vec![1, 4, 7, 10]);
//! # Ok(())
//! # }
//! ```
//!
//! # Stages
//!
//! - **[`batch`](BatchExt::batch)**: Groups items into fixed-size vectors
//! - **[`join`](JoinExt::join)**: Flattens groups back into items
//! - **[`pipe`](PipeExt::pipe)** / **[`pipe_async`](PipeExt::pipe_async)**:
//!   Maps items with bounded concurrency, ordered or unordered
//! - **[`filter`](FilterExt::filter)**: Forwards items satisfying a predicate
//! - **[`transform`](sluice_core::TransformExt::transform)**: Lazy read-side
//!   mapping, no task and no extra channel
//!
//! # Sources
//!
//! - **[`to_channel`](ToChannelExt::to_channel)**: Any iterator
//! - **[`stream_to_channel`](StreamToChannelExt::stream_to_channel)**: Any stream
//! - **[`from_futures`]**: Futures resolved with bounded concurrency
//!
//! # Faults and Tear-Down
//!
//! A fault (an error from the source channel, a mapper error or a panic)
//! completes the stage's output with that fault, and it travels downstream
//! stage by stage. When a downstream reader goes away, the stage's next
//! write fails with [`ChannelClosed`](sluice_core::SluiceError::ChannelClosed)
//! and the stage stops quietly, releasing its own source.

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]

mod logging;

pub mod batch;
pub mod filter;
pub mod from_futures;
pub mod join;
pub mod pipe;
pub mod prelude;
pub mod to_channel;

pub use self::batch::BatchExt;
pub use self::filter::FilterExt;
pub use self::from_futures::from_futures;
pub use self::join::JoinExt;
pub use self::pipe::PipeExt;
pub use self::to_channel::{StreamToChannelExt, ToChannelExt};
pub use sluice_core::{TransformExt, TransformReader};
