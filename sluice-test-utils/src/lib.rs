// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities and fixtures for sluice pipelines.
//!
//! This crate is meant for development and testing only. It provides:
//!
//! - channel constructors for test setup ([`test_channel`], [`channel_from`],
//!   [`faulted_channel_from`]),
//! - read assertions with timeouts ([`unwrap_read`], [`assert_no_element_read`],
//!   [`assert_exhausted`], [`assert_faulted`], [`drain_until_fault`]),
//! - a simulated slow producer ([`delayed`]),
//! - error fixtures ([`TestError`], [`test_fault`], [`FaultInjectingReader`]).
//!
//! # Example
//!
//! ```rust
//! use sluice_test_utils::{assert_exhausted, channel_from, unwrap_read};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let reader = channel_from(vec![1, 2]);
//!
//! assert_eq!(unwrap_read(&reader, 100).await, 1);
//! assert_eq!(unwrap_read(&reader, 100).await, 2);
//! assert_exhausted(&reader, 100).await;
//! # }
//! ```

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod error_injection;
pub mod helpers;
pub mod test_channel;

pub use error_injection::{test_fault, FaultInjectingReader, TestError};
pub use helpers::{
    assert_exhausted, assert_faulted, assert_no_element_read, collect_all, delayed,
    drain_until_fault, unwrap_read,
};
pub use test_channel::{channel_from, faulted_channel_from, test_channel};
