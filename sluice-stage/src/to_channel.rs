// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Source adapters that feed iterators and streams into a channel.
//!
//! Both adapters spawn one writer task that pulls lazily from the source and
//! writes with backpressure: with a bounded output, the source is only
//! advanced when there is room downstream.

use futures::{Stream, StreamExt};
use sluice_core::stage_task::spawn_stage;
use sluice_core::{Channel, ChannelReader, ChannelWriter, Result, StageOptions};

/// Extension trait to feed any iterator into a channel.
///
/// ```
/// use sluice_stage::prelude::*;
/// use sluice_core::StageOptions;
/// use sluice_test_utils::collect_all;
///
/// # #[tokio::main]
/// # async fn main() -> sluice_core::Result<()> {
/// let reader = (0..4).to_channel_with(StageOptions::bounded(2))?;
///
/// assert_eq!(collect_all(&reader).await?, vec![0, 1, 2, 3]);
/// # Ok(())
/// # }
/// ```
pub trait ToChannelExt: IntoIterator + Sized
where
    Self::IntoIter: Send + 'static,
    Self::Item: Send + 'static,
{
    /// Writes every item into a new unbounded channel, then completes it.
    ///
    /// Must be called from within a Tokio runtime.
    fn to_channel(self) -> ChannelReader<Self::Item> {
        let (writer, reader) = Channel::unbounded().split();
        spawn_iter(self.into_iter(), writer, StageOptions::default());
        reader
    }

    /// [`to_channel`](Self::to_channel) with explicit output channel options.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`](sluice_core::SluiceError::InvalidArgument)
    /// when the output capacity is `Bounded(0)`.
    fn to_channel_with(self, options: StageOptions) -> Result<ChannelReader<Self::Item>> {
        let (writer, reader) = options.output_channel(1)?.split();
        spawn_iter(self.into_iter(), writer, options);
        Ok(reader)
    }
}

impl<I> ToChannelExt for I
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
}

fn spawn_iter<I>(items: I, writer: ChannelWriter<I::Item>, options: StageOptions)
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    let output = writer.clone();
    spawn_stage("to_channel", writer, options.cancellation, async move {
        for item in items {
            output.write(item).await?;
        }
        Ok(())
    });
}

/// Extension trait to feed any stream into a channel.
pub trait StreamToChannelExt: Stream + Sized + Send + 'static
where
    Self::Item: Send + 'static,
{
    /// Writes every item of the stream into a new unbounded channel, then
    /// completes it.
    ///
    /// Must be called from within a Tokio runtime.
    fn stream_to_channel(self) -> ChannelReader<Self::Item> {
        let (writer, reader) = Channel::unbounded().split();
        spawn_stream(self, writer, StageOptions::default());
        reader
    }

    /// [`stream_to_channel`](Self::stream_to_channel) with explicit output
    /// channel options.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidArgument`](sluice_core::SluiceError::InvalidArgument)
    /// when the output capacity is `Bounded(0)`.
    fn stream_to_channel_with(self, options: StageOptions) -> Result<ChannelReader<Self::Item>> {
        let (writer, reader) = options.output_channel(1)?.split();
        spawn_stream(self, writer, options);
        Ok(reader)
    }
}

impl<S> StreamToChannelExt for S
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
}

fn spawn_stream<S>(stream: S, writer: ChannelWriter<S::Item>, options: StageOptions)
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    let output = writer.clone();
    spawn_stage("stream_to_channel", writer, options.cancellation, async move {
        let mut stream = Box::pin(stream);
        while let Some(item) = stream.next().await {
            output.write(item).await?;
        }
        Ok(())
    });
}
