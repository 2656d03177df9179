// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use sluice_core::{CancellationToken, SluiceError, StageOptions};
use sluice_stage::prelude::*;
use sluice_test_utils::{assert_faulted, drain_until_fault, test_channel, unwrap_read};
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_cancel_stops_stage_waiting_on_input() -> anyhow::Result<()> {
    // Arrange
    let token = CancellationToken::new();
    let (_tx, rx) = test_channel::<i32>();
    let filtered = rx.filter_with(
        |_| true,
        StageOptions::default().with_cancellation(token.clone()),
    )?;

    // Act
    token.cancel();

    // Assert
    assert!(matches!(
        assert_faulted(&filtered, 500).await,
        SluiceError::Cancelled
    ));

    Ok(())
}

#[tokio::test]
async fn test_cancel_stops_stage_blocked_on_full_output() -> anyhow::Result<()> {
    // Arrange
    let token = CancellationToken::new();
    let (tx, rx) = test_channel();
    let batches = rx.batch_with(
        1,
        StageOptions::bounded(1).with_cancellation(token.clone()),
    )?;
    for value in 0..3 {
        tx.write(value).await?;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Act
    token.cancel();

    // Assert: batches already handed over stay readable, then the fault
    let (delivered, fault) = drain_until_fault(&batches, 500).await;
    assert!(delivered.len() <= 2);
    assert!(delivered
        .iter()
        .enumerate()
        .all(|(index, batch)| batch == &vec![index as i32]));
    assert!(matches!(fault, SluiceError::Cancelled));

    Ok(())
}

#[tokio::test]
async fn test_cancel_stops_every_pipe_worker() -> anyhow::Result<()> {
    let token = CancellationToken::new();
    let (_tx, rx) = test_channel::<u8>();
    let mapped = rx.pipe_with(
        4,
        |value| value,
        StageOptions::default().with_cancellation(token.clone()),
    )?;

    token.cancel();

    assert!(matches!(
        assert_faulted(&mapped, 500).await,
        SluiceError::Cancelled
    ));

    Ok(())
}

#[tokio::test]
async fn test_dropping_output_tears_down_upstream() -> anyhow::Result<()> {
    // Arrange: source -> filter -> pipe
    let (tx, rx) = test_channel();
    let mapped = rx.filter(|_: &i32| true).pipe(2, |value| value + 1)?;
    tx.write(1).await?;
    assert_eq!(unwrap_read(&mapped, 500).await, 2);

    // Act: the consumer goes away
    drop(mapped);
    tx.write(2).await?;
    tx.write(3).await?;

    // Assert: closure travels back up to the source writer
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
    assert!(tx.is_completed());

    Ok(())
}

#[tokio::test]
async fn test_fault_travels_through_chain() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = test_channel::<Vec<i32>>();
    let output = rx.join().filter(|value| *value > 0).batch(2)?;

    // Act
    tx.write(vec![1, 2]).await?;
    tx.complete(Some(SluiceError::CallbackPanic {
        context: "upstream".to_string(),
    }));

    // Assert
    let fault = loop {
        match output.read().await {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("expected a fault, the output completed cleanly"),
            Err(fault) => break fault,
        }
    };
    assert!(matches!(fault, SluiceError::CallbackPanic { .. }));

    Ok(())
}
