// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Per-stage configuration.

use crate::cancellation_token::CancellationToken;
use crate::channel::{Capacity, Channel, ChannelOptions};
use crate::error::Result;

/// Configuration shared by every stage.
///
/// The default is an unbounded output channel with no hints, unordered
/// completion and no cancellation.
///
/// ```
/// use sluice_core::{Capacity, CancellationToken, StageOptions};
///
/// let token = CancellationToken::new();
/// let options = StageOptions::default()
///     .with_capacity(Capacity::Bounded(64))
///     .with_preserve_order(true)
///     .with_cancellation(token);
///
/// assert_eq!(options.capacity, Capacity::Bounded(64));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    /// Capacity of the channel the stage writes to.
    pub capacity: Capacity,
    /// Hint that the stage output will be read by a single reader.
    pub single_reader: bool,
    /// Re-sequence concurrent `pipe` output into input order.
    ///
    /// Only consulted by `pipe` stages with a concurrency above one.
    pub preserve_order: bool,
    /// Token that tears the stage down when cancelled.
    pub cancellation: Option<CancellationToken>,
}

impl StageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a bounded output channel.
    pub fn bounded(capacity: usize) -> Self {
        Self::default().with_capacity(Capacity::Bounded(capacity))
    }

    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_single_reader(mut self, single_reader: bool) -> Self {
        self.single_reader = single_reader;
        self
    }

    pub fn with_preserve_order(mut self, preserve_order: bool) -> Self {
        self.preserve_order = preserve_order;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Create the output channel for a stage with `writers` concurrent writers.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`](crate::SluiceError::InvalidArgument)
    /// for a zero bounded capacity.
    pub fn output_channel<T>(&self, writers: usize) -> Result<Channel<T>> {
        Channel::new(ChannelOptions {
            capacity: self.capacity,
            single_writer: writers == 1,
            single_reader: self.single_reader,
        })
    }
}
