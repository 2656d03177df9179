// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use sluice_core::{Channel, ChannelReader, ChannelWriter, SluiceError};

/// Creates an unbounded channel for imperative test setup.
///
/// Tests keep the writer to push values (and complete the channel) while the
/// reader is handed to the stage under test.
///
/// ```rust
/// use sluice_test_utils::test_channel;
///
/// # #[tokio::main]
/// # async fn main() {
/// let (tx, rx) = test_channel();
/// tx.try_write(42).unwrap();
/// assert_eq!(rx.read().await.unwrap(), Some(42));
/// # }
/// ```
pub fn test_channel<T>() -> (ChannelWriter<T>, ChannelReader<T>) {
    Channel::unbounded().split()
}

/// Creates a reader that yields `items` and is then exhausted.
pub fn channel_from<T, I>(items: I) -> ChannelReader<T>
where
    I: IntoIterator<Item = T>,
{
    let (writer, reader) = test_channel();
    for item in items {
        if writer.try_write(item).is_err() {
            unreachable!("unbounded test channel rejected a write");
        }
    }
    writer.complete(None);
    reader
}

/// Creates a reader whose channel holds `items` and is already faulted.
///
/// Readers get every one of `items` first, then `fault`.
pub fn faulted_channel_from<T, I>(items: I, fault: SluiceError) -> ChannelReader<T>
where
    I: IntoIterator<Item = T>,
{
    let (writer, reader) = test_channel();
    for item in items {
        if writer.try_write(item).is_err() {
            unreachable!("unbounded test channel rejected a write");
        }
    }
    writer.complete(Some(fault));
    reader
}
