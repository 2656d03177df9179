// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fault propagation and tear-down across composed stages.

use sluice::prelude::*;
use sluice_test_utils::{test_channel, test_fault, FaultInjectingReader, TestError};
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_mapper_error_reaches_terminal_consumer() -> anyhow::Result<()> {
    // Arrange
    let mut seen = Vec::new();

    // Act
    let result = (0..100)
        .to_channel()
        .pipe_async(1, |value: i32| async move {
            if value == 42 {
                Err(TestError::new("bad item"))
            } else {
                Ok(value)
            }
        })?
        .batch(10)?
        .join()
        .read_all(|item| seen.push(item), None)
        .await;

    // Assert: no item past the failing one is ever delivered
    let fault = result.expect_err("the mapper error should surface");
    let user = fault
        .user_error()
        .and_then(|inner| inner.downcast_ref::<TestError>())
        .cloned();
    assert_eq!(user, Some(TestError::new("bad item")));
    assert!(seen.iter().all(|value| *value < 42));

    Ok(())
}

#[tokio::test]
async fn test_source_fault_reaches_concurrent_consumer() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = test_channel::<i32>();
    let filtered = rx.filter(|value| *value > 0);
    tx.write(1).await?;
    tx.complete(Some(test_fault("source broke")));

    // Act
    let result = filtered
        .read_all_concurrently(2, |_| Ok::<_, TestError>(()), None)
        .await;

    // Assert
    assert!(matches!(result, Err(SluiceError::StageFault(_))));

    Ok(())
}

#[tokio::test]
async fn test_injected_read_fault_through_pipe() -> anyhow::Result<()> {
    let source = FaultInjectingReader::new((0..100).to_channel(), 10);

    let result = source.pipe(2, |value: i32| value + 1)?.read_all(|_| {}, None).await;

    assert!(matches!(result, Err(SluiceError::StageFault(_))));

    Ok(())
}

#[tokio::test]
async fn test_cancellation_stops_pipeline_and_consumer() -> anyhow::Result<()> {
    // Arrange
    let token = CancellationToken::new();
    let (_tx, rx) = test_channel::<i32>();
    let output = rx
        .pipe_with(
            2,
            |value| value * 2,
            StageOptions::default().with_cancellation(token.clone()),
        )?
        .batch(4)?;

    // Act
    token.cancel();
    let result = timeout(Duration::from_millis(500), output.read_all(|_| {}, None)).await?;

    // Assert
    assert!(matches!(result, Err(SluiceError::Cancelled)));

    Ok(())
}

#[tokio::test]
async fn test_consumer_fault_tears_down_upstream() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = test_channel();
    let consumer = tokio::spawn(
        rx.filter(|_: &i32| true)
            .try_read_all(|_| Err(TestError::new("consumer gave up")), None),
    );

    // Act
    tx.write(1).await?;
    let result = consumer.await?;

    // Assert: the consumer released the last reader, so writes now fail
    assert!(matches!(result, Err(SluiceError::StageFault(_))));
    let closed = timeout(Duration::from_millis(500), async {
        loop {
            if tx.write(0).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(closed.is_ok());

    Ok(())
}
