// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Prelude module re-exporting every stage extension trait.
//!
//! ```
//! use sluice_stage::prelude::*;
//! ```

pub use crate::batch::BatchExt;
pub use crate::filter::FilterExt;
pub use crate::join::JoinExt;
pub use crate::pipe::PipeExt;
pub use crate::to_channel::{StreamToChannelExt, ToChannelExt};
pub use sluice_core::{ChannelRead, TransformExt};
