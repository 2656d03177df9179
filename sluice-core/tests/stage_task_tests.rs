// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use sluice_core::stage_task::{guarded, spawn_stage, spawn_workers};
use sluice_core::{CancellationToken, Channel, SluiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, thiserror::Error)]
#[error("Test error: {0}")]
struct TestError(String);

fn exploding_mapper(_: i32) -> sluice_core::Result<i32> {
    panic!("mapper exploded")
}

#[tokio::test]
async fn test_guarded_passes_through_result() -> anyhow::Result<()> {
    let value = guarded(async { Ok::<_, SluiceError>(5) }, None).await?;

    assert_eq!(value, 5);

    Ok(())
}

#[tokio::test]
async fn test_guarded_converts_panic() {
    let outcome = guarded(async { exploding_mapper(1) }, None).await;

    match outcome {
        Err(SluiceError::CallbackPanic { context }) => assert_eq!(context, "mapper exploded"),
        other => panic!("expected a callback panic, got {other:?}"),
    }
}

#[tokio::test]
async fn test_guarded_stops_on_cancellation() {
    let token = CancellationToken::new();
    token.cancel();

    let outcome: Result<(), _> = guarded(futures::future::pending(), Some(&token)).await;

    assert!(matches!(outcome, Err(SluiceError::Cancelled)));
}

#[tokio::test]
async fn test_spawn_stage_completes_output_on_success() -> anyhow::Result<()> {
    // Arrange
    let (writer, reader) = Channel::bounded(4)?.split();
    let stage_writer = writer.clone();

    // Act
    let handle = spawn_stage("test", writer, None, async move {
        stage_writer.write(1).await?;
        stage_writer.write(2).await?;
        Ok(())
    });

    // Assert
    assert_eq!(reader.read().await?, Some(1));
    assert_eq!(reader.read().await?, Some(2));
    assert_eq!(reader.read().await?, None);
    assert!(reader.fault().is_none());
    handle.await?;

    Ok(())
}

#[tokio::test]
async fn test_spawn_stage_records_user_fault() -> anyhow::Result<()> {
    // Arrange
    let (writer, reader) = Channel::<i32>::bounded(4)?.split();

    // Act
    spawn_stage("test", writer, None, async {
        Err(SluiceError::stage_fault(TestError("bad input".into())))
    })
    .await?;

    // Assert
    let fault = reader.read().await.err();
    let message = fault.map(|error| error.to_string());
    assert_eq!(message.as_deref(), Some("Stage fault: Test error: bad input"));

    Ok(())
}

#[tokio::test]
async fn test_spawn_stage_treats_closed_output_as_quiet_stop() -> anyhow::Result<()> {
    let (writer, reader) = Channel::<i32>::bounded(4)?.split();
    let observer = reader.clone();
    drop(reader);

    spawn_stage("test", writer, None, async { Err(SluiceError::ChannelClosed) }).await?;

    assert!(observer.is_completed());
    assert!(observer.fault().is_none());

    Ok(())
}

#[tokio::test]
async fn test_spawn_stage_faults_output_with_cancelled() -> anyhow::Result<()> {
    // Arrange
    let token = CancellationToken::new();
    let (writer, reader) = Channel::<i32>::bounded(4)?.split();
    let handle = spawn_stage(
        "test",
        writer,
        Some(token.clone()),
        futures::future::pending(),
    );

    // Act
    token.cancel();

    // Assert
    timeout(Duration::from_millis(500), handle).await??;
    assert!(matches!(reader.read().await, Err(SluiceError::Cancelled)));

    Ok(())
}

#[tokio::test]
async fn test_spawn_workers_completes_after_all_workers() -> anyhow::Result<()> {
    // Arrange
    let (writer, reader) = Channel::unbounded().split();
    let finished = Arc::new(AtomicUsize::new(0));

    // Act
    let handle = spawn_workers("test", 3, writer.clone(), None, |index| {
        let writer = writer.clone();
        let finished = finished.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10 * index as u64)).await;
            writer.write(index).await?;
            finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    drop(writer);

    // Assert
    let mut seen = Vec::new();
    while let Some(index) = reader.read().await? {
        seen.push(index);
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(finished.load(Ordering::SeqCst), 3);
    handle.await?;

    Ok(())
}

#[tokio::test]
async fn test_spawn_workers_first_fault_wins() -> anyhow::Result<()> {
    // Arrange
    let (writer, reader) = Channel::<usize>::unbounded().split();

    // Act
    spawn_workers("test", 4, writer, None, |index| async move {
        if index == 2 {
            Err(SluiceError::stage_fault(TestError(format!("worker {index}"))))
        } else {
            futures::future::pending::<()>().await;
            Ok(())
        }
    });

    // Assert: the fault surfaces while siblings are still running
    let outcome = timeout(Duration::from_millis(500), reader.read()).await?;
    let message = outcome.err().map(|error| error.to_string());
    assert_eq!(message.as_deref(), Some("Stage fault: Test error: worker 2"));

    Ok(())
}
