// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use sluice_core::SluiceError;
use sluice_test_utils::{
    assert_exhausted, assert_faulted, assert_no_element_read, channel_from, collect_all, delayed,
    drain_until_fault, faulted_channel_from, test_channel, test_fault, unwrap_read,
};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_channel_from_yields_items_then_exhausts() -> anyhow::Result<()> {
    let reader = channel_from(vec!["a", "b"]);

    assert_eq!(unwrap_read(&reader, 100).await, "a");
    assert_eq!(unwrap_read(&reader, 100).await, "b");
    assert_exhausted(&reader, 100).await;

    Ok(())
}

#[tokio::test]
async fn test_faulted_channel_reports_fault_after_items() -> anyhow::Result<()> {
    let reader = faulted_channel_from(vec![1, 2], test_fault("broken"));

    assert_eq!(unwrap_read(&reader, 100).await, 1);
    assert_eq!(unwrap_read(&reader, 100).await, 2);
    let fault = assert_faulted(&reader, 100).await;

    assert!(matches!(fault, SluiceError::StageFault(_)));

    Ok(())
}

#[tokio::test]
async fn test_drain_until_fault_returns_items_and_fault() -> anyhow::Result<()> {
    let reader = faulted_channel_from(vec!['a', 'b', 'c'], test_fault("broken"));

    let (items, fault) = drain_until_fault(&reader, 100).await;

    assert_eq!(items, vec!['a', 'b', 'c']);
    assert!(matches!(fault, SluiceError::StageFault(_)));

    Ok(())
}

#[tokio::test]
async fn test_assert_no_element_read_on_idle_channel() -> anyhow::Result<()> {
    let (tx, rx) = test_channel::<i32>();

    assert_no_element_read(&rx, 20).await;

    tx.write(5).await?;
    assert_eq!(unwrap_read(&rx, 100).await, 5);

    Ok(())
}

#[tokio::test]
#[should_panic(expected = "Unexpected read")]
async fn test_assert_no_element_read_panics_on_item() {
    let reader = channel_from(vec![1]);

    assert_no_element_read(&reader, 100).await;
}

#[tokio::test]
async fn test_collect_all_drains_reader() -> anyhow::Result<()> {
    let reader = channel_from(1..=4);

    let items = collect_all(&reader).await?;

    assert_eq!(items, vec![1, 2, 3, 4]);

    Ok(())
}

#[tokio::test]
async fn test_delayed_waits_before_resolving() {
    let started = Instant::now();

    let value = delayed(7, 30).await;

    assert_eq!(value, 7);
    assert!(started.elapsed() >= Duration::from_millis(30));
}
