// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use sluice_core::{SluiceError, StageOptions};
use sluice_stage::prelude::*;
use sluice_test_utils::{
    assert_exhausted, assert_faulted, channel_from, collect_all, test_channel, test_fault,
    unwrap_read,
};
use std::time::Duration;

#[tokio::test]
async fn test_join_flattens_groups_in_order() -> anyhow::Result<()> {
    // Arrange
    let groups = channel_from(vec![vec![1, 2, 3], vec![], vec![4], vec![5, 6]]);

    // Act
    let flat = groups.join();

    // Assert
    assert_eq!(collect_all(&flat).await?, vec![1, 2, 3, 4, 5, 6]);

    Ok(())
}

#[tokio::test]
async fn test_join_reverses_batch() -> anyhow::Result<()> {
    for (count, size) in [(0usize, 4usize), (9, 4), (12, 4), (100, 7)] {
        let flat = channel_from(0..count).batch(size)?.join();

        assert_eq!(
            collect_all(&flat).await?,
            (0..count).collect::<Vec<_>>(),
            "count={count} size={size}"
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_join_map_transforms_each_group() -> anyhow::Result<()> {
    // Arrange
    let words = channel_from(vec!["ab", "", "cde"]);

    // Act
    let letters = words.join_map(|word: &str| word.chars().collect::<Vec<_>>());

    // Assert
    assert_eq!(collect_all(&letters).await?, vec!['a', 'b', 'c', 'd', 'e']);

    Ok(())
}

#[tokio::test]
async fn test_join_waits_for_room_per_element() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = test_channel();
    let flat = rx.join_with(StageOptions::bounded(2))?;

    // Act
    tx.write(vec![1, 2, 3, 4, 5]).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Assert: the group is written element by element as room appears
    assert_eq!(flat.len(), 2);
    assert_eq!(unwrap_read(&flat, 500).await, 1);
    assert_eq!(unwrap_read(&flat, 500).await, 2);
    assert_eq!(unwrap_read(&flat, 500).await, 3);

    drop(tx);
    assert_eq!(collect_all(&flat).await?, vec![4, 5]);

    Ok(())
}

#[tokio::test]
async fn test_join_propagates_fault() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = test_channel::<Vec<i32>>();
    let flat = rx.join();

    // Act
    tx.complete(Some(test_fault("groups failed")));

    // Assert
    let fault = assert_faulted(&flat, 500).await;
    assert!(matches!(fault, SluiceError::StageFault(_)));

    Ok(())
}

#[tokio::test]
async fn test_join_completes_after_source() -> anyhow::Result<()> {
    let (tx, rx) = test_channel::<[u8; 2]>();
    let flat = rx.join();

    tx.write([7, 8]).await?;
    assert_eq!(unwrap_read(&flat, 500).await, 7);
    assert_eq!(unwrap_read(&flat, 500).await, 8);

    tx.complete(None);
    assert_exhausted(&flat, 500).await;

    Ok(())
}
