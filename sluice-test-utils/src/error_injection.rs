// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error fixtures for testing fault propagation through stages.

use async_trait::async_trait;
use sluice_core::{ChannelOptions, ChannelRead, Result, SluiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// User error returned by failing test callbacks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Test error: {0}")]
pub struct TestError(pub String);

impl TestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A [`SluiceError::StageFault`] wrapping a [`TestError`].
pub fn test_fault(message: impl Into<String>) -> SluiceError {
    SluiceError::stage_fault(TestError::new(message))
}

/// A reader that faults after a given number of successful reads.
///
/// Clones share the read counter, so the fault fires at the same position
/// no matter how many workers read through it.
///
/// ```rust
/// use sluice_core::ChannelRead;
/// use sluice_test_utils::{channel_from, FaultInjectingReader};
///
/// # #[tokio::main]
/// # async fn main() {
/// let reader = FaultInjectingReader::new(channel_from(vec![1, 2, 3]), 1);
///
/// assert_eq!(reader.read().await.unwrap(), Some(1));
/// assert!(reader.read().await.is_err());
/// # }
/// ```
#[derive(Debug)]
pub struct FaultInjectingReader<R> {
    inner: R,
    fault_after: usize,
    reads: Arc<AtomicUsize>,
}

impl<R> FaultInjectingReader<R> {
    /// Wrap `inner`; the read following the first `fault_after` items faults.
    pub fn new(inner: R, fault_after: usize) -> Self {
        Self {
            inner,
            fault_after,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn injected(&self) -> SluiceError {
        test_fault(format!("injected after {} items", self.fault_after))
    }

    fn tripped(&self) -> bool {
        self.reads.load(Ordering::SeqCst) >= self.fault_after
    }
}

impl<R: Clone> Clone for FaultInjectingReader<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            fault_after: self.fault_after,
            reads: Arc::clone(&self.reads),
        }
    }
}

#[async_trait]
impl<R: ChannelRead> ChannelRead for FaultInjectingReader<R> {
    type Item = R::Item;

    fn try_read(&self) -> Result<Option<R::Item>> {
        if self.tripped() {
            return Err(self.injected());
        }
        let item = self.inner.try_read()?;
        if item.is_some() {
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
        Ok(item)
    }

    async fn wait_to_read(&self) -> Result<bool> {
        if self.tripped() {
            return Err(self.injected());
        }
        self.inner.wait_to_read().await
    }

    fn is_completed(&self) -> bool {
        self.tripped() || self.inner.is_completed()
    }

    fn fault(&self) -> Option<SluiceError> {
        if self.tripped() {
            return Some(self.injected());
        }
        self.inner.fault()
    }

    fn options(&self) -> ChannelOptions {
        self.inner.options()
    }
}
