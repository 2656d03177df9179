// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use sluice::prelude::*;
use sluice_test_utils::{collect_all, delayed, TestError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_then_join_keeps_a_million_items_in_order() -> anyhow::Result<()> {
    // Arrange
    let mut received = Vec::with_capacity(1_000_000);

    // Act
    let processed = (0..1_000_000)
        .to_channel()
        .batch(5_000)?
        .join()
        .read_all(|item| received.push(item), None)
        .await?;

    // Assert
    assert_eq!(processed, 1_000_000);
    assert_eq!(received, (0..1_000_000).collect::<Vec<_>>());

    Ok(())
}

#[tokio::test]
async fn test_filter_even_over_delayed_source_counts_half() -> anyhow::Result<()> {
    // Arrange
    let delayed_values =
        (0..50u64).map(|value| async move { Ok::<_, TestError>(delayed(value, 1).await) });
    let source = from_futures(delayed_values, 8, StageOptions::default())?;

    // Act
    let mut count = 0;
    let processed = source
        .filter(|value| value % 2 == 0)
        .read_all(|_| count += 1, None)
        .await?;

    // Assert
    assert_eq!(processed, 25);
    assert_eq!(count, 25);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pipe_then_concurrent_read_sums_every_item() -> anyhow::Result<()> {
    // Arrange
    let total = Arc::new(AtomicU64::new(0));

    // Act
    let processed = (1..=10_000u64)
        .to_channel_with(StageOptions::bounded(100))?
        .pipe_with(4, |value| value * 2, StageOptions::bounded(100))?
        .read_all_concurrently(
            4,
            {
                let total = Arc::clone(&total);
                move |value| {
                    total.fetch_add(value, Ordering::Relaxed);
                    Ok::<_, TestError>(())
                }
            },
            None,
        )
        .await?;

    // Assert
    assert_eq!(processed, 10_000);
    assert_eq!(total.load(Ordering::Relaxed), 10_000 * 10_001);

    Ok(())
}

#[tokio::test]
async fn test_transform_channel_doubles_into_wider_type() -> anyhow::Result<()> {
    // Arrange
    let channel = TransformChannel::new(Channel::unbounded(), |value: i32| i64::from(value) * 2);
    let (writer, reader) = channel.split();

    // Act
    for value in 0..1_000 {
        writer.write(value).await?;
    }
    drop(writer);

    // Assert
    let expected: Vec<i64> = (0..1_000).map(|value| value * 2).collect();
    assert_eq!(collect_all(&reader).await?, expected);

    Ok(())
}

#[tokio::test]
async fn test_ordered_pipe_into_batches() -> anyhow::Result<()> {
    // Arrange
    let options = StageOptions::default().with_preserve_order(true);

    // Act
    let batches = (0..10u64)
        .to_channel()
        .pipe_async_with(
            3,
            |value| async move { Ok::<_, TestError>(delayed(value, 10 - value).await) },
            options,
        )?
        .batch(4)?;

    // Assert
    assert_eq!(
        collect_all(&batches).await?,
        vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]
    );

    Ok(())
}

#[tokio::test]
async fn test_stream_source_through_transform_and_filter() -> anyhow::Result<()> {
    // Arrange
    let source = tokio_stream::iter(vec!["1", "x", "3", "4"]).stream_to_channel();

    // Act
    let parsed = source
        .transform(|text: &str| text.parse::<u32>().ok())
        .filter(Option::is_some)
        .pipe(1, |value| value.unwrap_or_default())?;

    // Assert
    assert_eq!(collect_all(&parsed).await?, vec![1, 3, 4]);

    Ok(())
}
