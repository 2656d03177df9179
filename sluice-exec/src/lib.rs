// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Terminal consumers for sluice pipelines.
//!
//! A pipeline ends with a consumer that drains the last channel:
//!
//! - [`ReadAllExt`] drains on the calling task, one item at a time, in
//!   channel order.
//! - [`ReadAllConcurrentlyExt`] drains with several independent loops when
//!   the per-item action is slow.
//!
//! Both resolve with the number of processed items, or with the first fault.

pub mod read_all;
pub mod read_all_concurrently;
mod logging;

pub use read_all::ReadAllExt;
pub use read_all_concurrently::ReadAllConcurrentlyExt;
