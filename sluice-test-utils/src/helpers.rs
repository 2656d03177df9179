// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use sluice_core::{ChannelRead, Result, SluiceError};
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Reads the next item, panicking on timeout, fault or exhaustion.
pub async fn unwrap_read<R>(reader: &R, timeout_ms: u64) -> R::Item
where
    R: ChannelRead,
{
    match timeout(Duration::from_millis(timeout_ms), reader.read()).await {
        Ok(Ok(Some(item))) => item,
        Ok(Ok(None)) => panic!("expected an item, the channel is exhausted"),
        Ok(Err(fault)) => panic!("expected an item, the channel faulted: {fault}"),
        Err(_) => panic!("expected an item within {timeout_ms}ms"),
    }
}

/// Asserts that nothing becomes readable within `timeout_ms`.
pub async fn assert_no_element_read<R>(reader: &R, timeout_ms: u64)
where
    R: ChannelRead,
    R::Item: Debug,
{
    tokio::select! {
        outcome = reader.read() => {
            panic!("Unexpected read, expected no output: {outcome:?}");
        }
        () = sleep(Duration::from_millis(timeout_ms)) => {}
    }
}

/// Asserts that the reader reports exhaustion (completed, drained, no fault).
pub async fn assert_exhausted<R>(reader: &R, timeout_ms: u64)
where
    R: ChannelRead,
    R::Item: Debug,
{
    match timeout(Duration::from_millis(timeout_ms), reader.read()).await {
        Ok(Ok(None)) => {}
        Ok(Ok(Some(item))) => panic!("expected exhaustion, read {item:?}"),
        Ok(Err(fault)) => panic!("expected exhaustion, the channel faulted: {fault}"),
        Err(_) => panic!("expected exhaustion within {timeout_ms}ms"),
    }
}

/// Asserts that the next read reports a fault and returns it.
pub async fn assert_faulted<R>(reader: &R, timeout_ms: u64) -> SluiceError
where
    R: ChannelRead,
    R::Item: Debug,
{
    match timeout(Duration::from_millis(timeout_ms), reader.read()).await {
        Ok(Err(fault)) => fault,
        Ok(Ok(Some(item))) => panic!("expected a fault, read {item:?}"),
        Ok(Ok(None)) => panic!("expected a fault, the channel completed cleanly"),
        Err(_) => panic!("expected a fault within {timeout_ms}ms"),
    }
}

/// Reads until the channel faults, returning the items read before it and
/// the fault. Panics if the channel completes cleanly or stalls.
pub async fn drain_until_fault<R>(reader: &R, timeout_ms: u64) -> (Vec<R::Item>, SluiceError)
where
    R: ChannelRead,
    R::Item: Debug,
{
    let mut items = Vec::new();
    loop {
        match timeout(Duration::from_millis(timeout_ms), reader.read()).await {
            Ok(Ok(Some(item))) => items.push(item),
            Ok(Ok(None)) => panic!("expected a fault, the channel completed after {items:?}"),
            Ok(Err(fault)) => return (items, fault),
            Err(_) => panic!("expected a fault within {timeout_ms}ms, read {items:?}"),
        }
    }
}

/// Drains the reader into a vector.
///
/// # Errors
///
/// Returns the channel's fault if it faults before exhaustion.
pub async fn collect_all<R>(reader: &R) -> Result<Vec<R::Item>>
where
    R: ChannelRead,
{
    let mut items = Vec::new();
    while let Some(item) = reader.read().await? {
        items.push(item);
    }
    Ok(items)
}

/// Resolves to `value` after `delay_ms`; simulates a slow producer.
pub async fn delayed<T>(value: T, delay_ms: u64) -> T {
    sleep(Duration::from_millis(delay_ms)).await;
    value
}
