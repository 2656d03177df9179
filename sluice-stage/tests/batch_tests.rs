// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use sluice_core::{Capacity, SluiceError, StageOptions};
use sluice_stage::prelude::*;
use sluice_test_utils::{
    assert_exhausted, assert_faulted, assert_no_element_read, channel_from, collect_all,
    test_channel, test_fault, unwrap_read, FaultInjectingReader,
};

#[tokio::test]
async fn test_batch_emits_full_batches() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = test_channel();
    let batches = rx.batch(2)?;

    // Act & Assert
    tx.write(1).await?;
    assert_no_element_read(&batches, 50).await;

    tx.write(2).await?;
    assert_eq!(unwrap_read(&batches, 500).await, vec![1, 2]);

    tx.write(3).await?;
    tx.write(4).await?;
    assert_eq!(unwrap_read(&batches, 500).await, vec![3, 4]);

    drop(tx);
    assert_exhausted(&batches, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_batch_flushes_remainder_on_completion() -> anyhow::Result<()> {
    // Arrange
    let source = channel_from(1..=7);

    // Act
    let batches = source.batch(3)?;

    // Assert
    let collected = collect_all(&batches).await?;
    assert_eq!(collected, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);

    Ok(())
}

#[tokio::test]
async fn test_batch_sizes_for_various_lengths() -> anyhow::Result<()> {
    for (count, size) in [(0usize, 3usize), (1, 3), (3, 3), (10, 3), (10, 1), (5, 10)] {
        let batches = channel_from(0..count).batch(size)?;

        let lengths: Vec<usize> = collect_all(&batches).await?.iter().map(Vec::len).collect();

        let mut expected = vec![size; count / size];
        if count % size != 0 {
            expected.push(count % size);
        }
        assert_eq!(lengths, expected, "count={count} size={size}");
    }

    Ok(())
}

#[tokio::test]
async fn test_batch_of_empty_source_emits_nothing() -> anyhow::Result<()> {
    let batches = channel_from(Vec::<i32>::new()).batch(4)?;

    assert_exhausted(&batches, 500).await;

    Ok(())
}

#[tokio::test]
async fn test_batch_zero_size_is_rejected() {
    let (_tx, rx) = test_channel::<i32>();

    let result = rx.batch(0);

    assert!(matches!(
        result,
        Err(SluiceError::InvalidArgument { argument: "size", .. })
    ));
}

#[tokio::test]
async fn test_batch_discards_partial_batch_on_fault() -> anyhow::Result<()> {
    // Arrange: the fault fires after five items, one short of a second batch
    let source = FaultInjectingReader::new(channel_from(1..=20), 5);

    // Act
    let batches = source.batch(3)?;

    // Assert: only the complete batch may surface before the fault
    let mut complete = Vec::new();
    let fault = loop {
        match batches.read().await {
            Ok(Some(batch)) => complete.push(batch),
            Ok(None) => panic!("expected a fault, the output completed cleanly"),
            Err(fault) => break fault,
        }
    };
    assert!(complete.iter().all(|batch| batch == &vec![1, 2, 3]));
    assert!(matches!(fault, SluiceError::StageFault(_)));

    Ok(())
}

#[tokio::test]
async fn test_batch_propagates_upstream_fault() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = test_channel();
    let batches = rx.batch(10)?;

    // Act
    tx.write(1).await?;
    tx.complete(Some(test_fault("upstream")));

    // Assert
    assert_faulted(&batches, 500).await;
    assert!(batches.fault().is_some());

    Ok(())
}

#[tokio::test]
async fn test_batch_respects_bounded_output() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = test_channel();
    let batches = rx.batch_with(1, StageOptions::bounded(2))?;

    // Act: the stage can only buffer two batches downstream
    for value in 0..5 {
        tx.write(value).await?;
    }
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // Assert
    assert_eq!(batches.options().capacity, Capacity::Bounded(2));
    assert_eq!(batches.len(), 2);
    drop(tx);
    assert_eq!(collect_all(&batches).await?.len(), 5);

    Ok(())
}
