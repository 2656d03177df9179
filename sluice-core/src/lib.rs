// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Core types for sluice pipelines.
//!
//! - [`Channel`]: bounded MPMC queue with async waits, one-shot completion
//!   and a sticky fault slot
//! - [`ChannelRead`]: the read-side abstraction every stage consumes
//! - [`TransformReader`] / [`TransformChannel`]: lazy read-side transforms
//! - [`SluiceError`]: the error type shared by the whole workspace
//! - [`StageOptions`], [`CancellationToken`] and the [`stage_task`] helpers
//!   stage operators are built from

pub mod cancellation_token;
pub mod channel;
pub mod channel_read;
pub mod error;
mod logging;
pub mod stage_options;
pub mod stage_task;
pub mod stream_item;
pub mod transform;

pub use self::cancellation_token::CancellationToken;
pub use self::channel::{
    Capacity, Channel, ChannelOptions, ChannelReader, ChannelWriter, TryWriteError,
};
pub use self::channel_read::ChannelRead;
pub use self::error::{IntoSluiceError, Result, SluiceError};
pub use self::stage_options::StageOptions;
pub use self::stream_item::StreamItem;
pub use self::transform::{TransformChannel, TransformExt, TransformReader};
