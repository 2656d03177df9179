// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Sluice
//!
//! Composable pipeline stages over bounded async channels.
//!
//! ## Overview
//!
//! A pipeline is a chain of stages. Each stage reads one channel, runs as a
//! Tokio task and writes a channel of its own; the last channel is drained by
//! a terminal consumer. Bounded channels give backpressure end to end, a
//! fault completes every downstream channel, and a consumer that goes away
//! tears the upstream stages down.
//!
//! ## Quick Start
//!
//! ```rust
//! use sluice::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> sluice::Result<()> {
//!     let mut received = Vec::new();
//!
//!     let processed = (0..100_000)
//!         .to_channel()
//!         .batch(5_000)?
//!         .join()
//!         .read_all(|item| received.push(item), None)
//!         .await?;
//!
//!     assert_eq!(processed, 100_000);
//!     assert!(received.windows(2).all(|pair| pair[0] < pair[1]));
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! - `sluice-core`: channels, the [`ChannelRead`] abstraction, lazy
//!   [`TransformChannel`]s and the error type
//! - `sluice-stage`: `batch`, `join`, `pipe`, `filter` and the sources
//! - `sluice-exec`: the `read_all` family of terminal consumers

pub use sluice_core::{
    CancellationToken, Capacity, Channel, ChannelOptions, ChannelRead, ChannelReader,
    ChannelWriter, IntoSluiceError, Result, SluiceError, StageOptions, StreamItem,
    TransformChannel, TransformExt, TransformReader, TryWriteError,
};
pub use sluice_exec::{ReadAllConcurrentlyExt, ReadAllExt};
pub use sluice_stage::from_futures;

/// Prelude module for convenient imports
pub mod prelude {
    pub use sluice_core::{
        CancellationToken, Channel, ChannelOptions, ChannelRead, SluiceError, StageOptions,
        TransformChannel, TransformExt,
    };
    pub use sluice_exec::{ReadAllConcurrentlyExt, ReadAllExt};
    pub use sluice_stage::from_futures;
    pub use sluice_stage::prelude::*;
}
