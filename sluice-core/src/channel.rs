// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Bounded multi-producer/multi-consumer channel with a sticky fault slot.
//!
//! The buffer itself is an [`async_channel`] queue. On top of it this module
//! adds what pipeline stages need and `async_channel` does not offer:
//!
//! - a non-consuming [`wait_to_read`](ChannelReader::wait_to_read) and
//!   [`wait_to_write`](ChannelWriter::wait_to_write),
//! - one-shot completion that may carry a fault,
//! - a [`completion`](ChannelReader::completion) future that resolves once the
//!   channel is completed and drained.
//!
//! Completion, with or without a fault, makes the channel read-only: items
//! already buffered are still handed out, and the fault is reported to
//! readers once the buffer is drained.
//!
//! # Example
//!
//! ```
//! use sluice_core::Channel;
//!
//! # #[tokio::main]
//! # async fn main() -> sluice_core::Result<()> {
//! let (writer, reader) = Channel::bounded(2)?.split();
//!
//! writer.write(1).await?;
//! writer.write(2).await?;
//! writer.complete(None);
//!
//! assert_eq!(reader.read().await?, Some(1));
//! assert_eq!(reader.read().await?, Some(2));
//! assert_eq!(reader.read().await?, None);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SluiceError};
use async_channel::{Receiver, Sender, TryRecvError, TrySendError};
use core::fmt;
use event_listener::Event;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// How many items a channel buffers before writers suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    /// Writers never suspend.
    #[default]
    Unbounded,
    /// Writers suspend once this many items are buffered. Must be at least 1.
    Bounded(usize),
}

/// Construction options for a [`Channel`].
///
/// `single_writer` and `single_reader` are hints recorded on the channel;
/// they do not restrict how many handles may be cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelOptions {
    pub capacity: Capacity,
    pub single_writer: bool,
    pub single_reader: bool,
}

impl ChannelOptions {
    /// Options for a bounded channel with no hints.
    pub const fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Capacity::Bounded(capacity),
            single_writer: false,
            single_reader: false,
        }
    }

    /// Options for an unbounded channel with no hints.
    pub const fn unbounded() -> Self {
        Self {
            capacity: Capacity::Unbounded,
            single_writer: false,
            single_reader: false,
        }
    }

    pub const fn with_single_writer(mut self, single_writer: bool) -> Self {
        self.single_writer = single_writer;
        self
    }

    pub const fn with_single_reader(mut self, single_reader: bool) -> Self {
        self.single_reader = single_reader;
        self
    }
}

/// Error returned by [`ChannelWriter::try_write`]; hands the item back.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum TryWriteError<T> {
    /// The channel is at capacity.
    Full(T),
    /// The channel was completed or has no readers left.
    Closed(T),
}

impl<T> TryWriteError<T> {
    /// Recover the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Closed(item) => item,
        }
    }

    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}

impl<T> fmt::Debug for TryWriteError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TryWriteError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("writing into a full channel"),
            Self::Closed(_) => f.write_str("writing into a closed channel"),
        }
    }
}

impl<T> std::error::Error for TryWriteError<T> {}

struct State {
    options: ChannelOptions,
    completed: AtomicBool,
    fault: Mutex<Option<SluiceError>>,
    // Notified on every write and on close.
    readable: Event,
    // Notified on every read and on close.
    writable: Event,
    writers: AtomicUsize,
    readers: AtomicUsize,
}

impl State {
    fn fault(&self) -> Option<SluiceError> {
        // `completed` is raised under the fault lock, before the slot is written.
        if !self.completed.load(Ordering::Acquire) {
            return None;
        }
        self.fault.lock().clone()
    }

    fn notify_all(&self) {
        self.readable.notify(usize::MAX);
        self.writable.notify(usize::MAX);
    }
}

/// A bounded (or unbounded) channel: one writer handle plus one reader handle.
///
/// Both handles are cheap to clone; clones share the same buffer.
pub struct Channel<T> {
    writer: ChannelWriter<T>,
    reader: ChannelReader<T>,
}

impl<T> Channel<T> {
    /// Create a channel from options.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`] for `Capacity::Bounded(0)`.
    pub fn new(options: ChannelOptions) -> Result<Self> {
        let queue = match options.capacity {
            Capacity::Bounded(0) => {
                return Err(SluiceError::invalid_argument(
                    "capacity",
                    "bounded capacity must be at least 1",
                ))
            }
            Capacity::Bounded(capacity) => async_channel::bounded(capacity),
            Capacity::Unbounded => async_channel::unbounded(),
        };
        Ok(Self::from_queue(options, queue))
    }

    fn from_queue(options: ChannelOptions, (sender, receiver): (Sender<T>, Receiver<T>)) -> Self {
        let state = Arc::new(State {
            options,
            completed: AtomicBool::new(false),
            fault: Mutex::new(None),
            readable: Event::new(),
            writable: Event::new(),
            writers: AtomicUsize::new(1),
            readers: AtomicUsize::new(1),
        });

        Self {
            writer: ChannelWriter {
                sender,
                state: Arc::clone(&state),
            },
            reader: ChannelReader { receiver, state },
        }
    }

    /// Create a channel that buffers at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`] when `capacity` is zero.
    pub fn bounded(capacity: usize) -> Result<Self> {
        Self::new(ChannelOptions::bounded(capacity))
    }

    /// Create a channel that never applies backpressure.
    pub fn unbounded() -> Self {
        Self::from_queue(ChannelOptions::unbounded(), async_channel::unbounded())
    }

    pub fn writer(&self) -> &ChannelWriter<T> {
        &self.writer
    }

    pub fn reader(&self) -> &ChannelReader<T> {
        &self.reader
    }

    /// Separate the write and read sides.
    pub fn split(self) -> (ChannelWriter<T>, ChannelReader<T>) {
        (self.writer, self.reader)
    }

    pub fn options(&self) -> ChannelOptions {
        self.writer.state.options
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("options", &self.options())
            .field("len", &self.reader.len())
            .field("completed", &self.writer.is_completed())
            .finish()
    }
}

/// Write side of a [`Channel`].
///
/// When the last writer handle is dropped without [`complete`](Self::complete)
/// having been called, the channel is completed without a fault.
pub struct ChannelWriter<T> {
    sender: Sender<T>,
    state: Arc<State>,
}

impl<T> ChannelWriter<T> {
    /// Write without waiting.
    ///
    /// # Errors
    ///
    /// Returns the item inside [`TryWriteError::Full`] when the channel is at
    /// capacity, or inside [`TryWriteError::Closed`] when it no longer
    /// accepts writes.
    pub fn try_write(&self, item: T) -> core::result::Result<(), TryWriteError<T>> {
        match self.sender.try_send(item) {
            Ok(()) => {
                self.state.readable.notify(usize::MAX);
                Ok(())
            }
            Err(TrySendError::Full(item)) => Err(TryWriteError::Full(item)),
            Err(TrySendError::Closed(item)) => Err(TryWriteError::Closed(item)),
        }
    }

    /// Write, suspending while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::ChannelClosed`] if the channel was completed or
    /// every reader was dropped, before or while waiting.
    pub async fn write(&self, item: T) -> Result<()> {
        self.sender
            .send(item)
            .await
            .map_err(|_| SluiceError::ChannelClosed)?;
        self.state.readable.notify(usize::MAX);
        Ok(())
    }

    /// Wait until there is room for a write.
    ///
    /// Resolves to `false` once the channel no longer accepts writes.
    ///
    /// # Errors
    ///
    /// Returns the channel's fault if it was completed with one.
    pub async fn wait_to_write(&self) -> Result<bool> {
        loop {
            if let Some(ready) = self.writable_state()? {
                return Ok(ready);
            }
            let listener = self.state.writable.listen();
            if let Some(ready) = self.writable_state()? {
                return Ok(ready);
            }
            listener.await;
        }
    }

    fn writable_state(&self) -> Result<Option<bool>> {
        if self.sender.is_closed() {
            return match self.state.fault() {
                Some(fault) => Err(fault),
                None => Ok(Some(false)),
            };
        }
        if self.sender.is_full() {
            return Ok(None);
        }
        Ok(Some(true))
    }

    /// Complete the channel, optionally with a fault.
    ///
    /// Only the first call has an effect; it returns `true`. Buffered items
    /// stay readable either way; a fault is reported after the last of them.
    pub fn complete(&self, fault: Option<SluiceError>) -> bool {
        {
            let mut slot = self.state.fault.lock();
            if self.state.completed.swap(true, Ordering::AcqRel) {
                return false;
            }
            *slot = fault;
        }
        self.sender.close();
        self.state.notify_all();
        true
    }

    /// `true` once the channel stopped accepting writes.
    pub fn is_completed(&self) -> bool {
        self.state.completed.load(Ordering::Acquire) || self.sender.is_closed()
    }

    /// Resolves once the channel stops accepting writes, either because it was
    /// completed or because every reader is gone.
    pub async fn closed(&self) {
        loop {
            if self.is_completed() {
                return;
            }
            let listener = self.state.writable.listen();
            if self.is_completed() {
                return;
            }
            listener.await;
        }
    }

    /// The fault the channel was completed with, if any.
    pub fn fault(&self) -> Option<SluiceError> {
        self.state.fault()
    }

    pub fn options(&self) -> ChannelOptions {
        self.state.options
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}

impl<T> Clone for ChannelWriter<T> {
    fn clone(&self) -> Self {
        self.state.writers.fetch_add(1, Ordering::Relaxed);
        Self {
            sender: self.sender.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Drop for ChannelWriter<T> {
    fn drop(&mut self) {
        if self.state.writers.fetch_sub(1, Ordering::AcqRel) == 1 {
            if !self.state.completed.swap(true, Ordering::AcqRel) {
                crate::debug!("channel: last writer dropped, completing");
            }
            self.sender.close();
            self.state.notify_all();
        }
    }
}

impl<T> fmt::Debug for ChannelWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelWriter")
            .field("len", &self.len())
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Read side of a [`Channel`].
///
/// When the last reader handle is dropped, further writes fail with
/// [`SluiceError::ChannelClosed`].
pub struct ChannelReader<T> {
    receiver: Receiver<T>,
    state: Arc<State>,
}

impl<T> ChannelReader<T> {
    /// Read without waiting.
    ///
    /// Returns `Ok(None)` when nothing is buffered right now, including when
    /// the channel is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the channel's fault once one is set and the buffer is empty.
    pub fn try_read(&self) -> Result<Option<T>> {
        match self.receiver.try_recv() {
            Ok(item) => {
                self.state.writable.notify(usize::MAX);
                Ok(Some(item))
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => match self.state.fault() {
                Some(fault) => Err(fault),
                None => Ok(None),
            },
        }
    }

    /// Wait until an item is available.
    ///
    /// Resolves to `true` when an item can be read (another reader may still
    /// take it first) and to `false` once the channel is completed and drained.
    ///
    /// # Errors
    ///
    /// Returns the channel's fault once the buffer is drained, checked before
    /// and after every suspension.
    pub async fn wait_to_read(&self) -> Result<bool> {
        loop {
            if let Some(ready) = self.readable_state()? {
                return Ok(ready);
            }
            let listener = self.state.readable.listen();
            if let Some(ready) = self.readable_state()? {
                return Ok(ready);
            }
            listener.await;
        }
    }

    fn readable_state(&self) -> Result<Option<bool>> {
        if !self.receiver.is_empty() {
            return Ok(Some(true));
        }
        if let Some(fault) = self.state.fault() {
            // A write may have landed just before completion.
            if !self.receiver.is_empty() {
                return Ok(Some(true));
            }
            return Err(fault);
        }
        if self.receiver.is_closed() {
            return Ok(Some(!self.receiver.is_empty()));
        }
        Ok(None)
    }

    /// Read the next item, waiting if necessary.
    ///
    /// Returns `Ok(None)` once the channel is completed and drained.
    ///
    /// # Errors
    ///
    /// Returns the channel's fault once one is set.
    pub async fn read(&self) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.try_read()? {
                return Ok(Some(item));
            }
            if !self.wait_to_read().await? {
                return Ok(None);
            }
        }
    }

    /// Resolves once the channel is completed and every item has been read.
    ///
    /// # Errors
    ///
    /// Returns the channel's fault, once drained, if it was completed with one.
    pub async fn completion(&self) -> Result<()> {
        loop {
            if self.drained()? {
                return Ok(());
            }
            let listener = self.state.writable.listen();
            if self.drained()? {
                return Ok(());
            }
            listener.await;
        }
    }

    fn drained(&self) -> Result<bool> {
        if !self.receiver.is_empty() {
            return Ok(false);
        }
        match self.state.fault() {
            Some(fault) => Err(fault),
            None => Ok(self.receiver.is_closed()),
        }
    }

    /// `true` once the channel stopped accepting writes.
    pub fn is_completed(&self) -> bool {
        self.state.completed.load(Ordering::Acquire) || self.receiver.is_closed()
    }

    /// The fault the channel was completed with, if any.
    pub fn fault(&self) -> Option<SluiceError> {
        self.state.fault()
    }

    pub fn options(&self) -> ChannelOptions {
        self.state.options
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Clone for ChannelReader<T> {
    fn clone(&self) -> Self {
        self.state.readers.fetch_add(1, Ordering::Relaxed);
        Self {
            receiver: self.receiver.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Drop for ChannelReader<T> {
    fn drop(&mut self) {
        if self.state.readers.fetch_sub(1, Ordering::AcqRel) == 1 {
            crate::debug!("channel: last reader dropped, closing for writers");
            self.receiver.close();
            self.state.notify_all();
        }
    }
}

impl<T> fmt::Debug for ChannelReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelReader")
            .field("len", &self.len())
            .field("completed", &self.is_completed())
            .field("faulted", &self.fault().is_some())
            .finish()
    }
}
