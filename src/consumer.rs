//! Consumer side of the pipeline.
//!
//! The consumer knows nothing about cancellation. It reads until the channel
//! says it is drained, so it works with any producer that closes its writer.

use futures::stream::{self, FusedStream, StreamExt};

use crate::channel::ChannelReader;

/// Turn the read end into a lazy stream of items in arrival order. The stream
/// ends when the channel is closed and drained. It takes the reader by value,
/// so a drained channel cannot be iterated a second time; polling the
/// finished stream again keeps returning `None`.
pub fn drain<T>(source: ChannelReader<T>) -> impl FusedStream<Item = T> {
    stream::unfold(source, |mut reader| async move {
        reader.recv().await.map(|item| (item, reader))
    })
    .fuse()
}

/// Drain everything into a `Vec`.
pub async fn collect<T>(source: ChannelReader<T>) -> Vec<T> {
    drain(source).collect().await
}
