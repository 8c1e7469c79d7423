//! Bounded single-producer / single-consumer handoff channel.
//!
//! A thin layer over `tokio::sync::mpsc` that adds the close rules the
//! pipeline depends on. The writer owns the right to close the channel and
//! closes it exactly once; closing again, or writing after closing, panics.
//! The reader only learns about termination through [`ChannelReader::recv`]
//! returning `None` (or [`ChannelReader::read`] returning `more == false`),
//! which happens once the channel is closed *and* every buffered item has
//! been handed out.
//!
//! [`ChannelWriter::close`] takes `&mut self`, so it cannot run while a
//! [`ChannelWriter::write`] on the same writer is still pending.

use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result, TryRecvError, TryWriteError, WriteError};

const CLOSE_TWICE: &str = "close of closed channel";
const WRITE_AFTER_CLOSE: &str = "write on closed channel";

/// Create a channel holding at most `capacity` unread items.
pub fn bounded<T>(capacity: usize) -> Result<(ChannelWriter<T>, ChannelReader<T>)> {
    if capacity == 0 {
        return Err(PipelineError::ZeroCapacity);
    }
    // mpsc::channel panics above this.
    if capacity > Semaphore::MAX_PERMITS {
        return Err(PipelineError::invalid_config(
            "capacity",
            format!("must not exceed {}", Semaphore::MAX_PERMITS),
        ));
    }

    let (sender, receiver) = mpsc::channel(capacity);
    Ok((
        ChannelWriter {
            sender: Some(sender),
            capacity,
        },
        ChannelReader { receiver, capacity },
    ))
}

// =============================================================================
// Writer
// =============================================================================

/// The write end. Not `Clone`: a channel has exactly one writer.
pub struct ChannelWriter<T> {
    /// `None` once closed.
    sender: Option<mpsc::Sender<T>>,
    capacity: usize,
}

impl<T> ChannelWriter<T> {
    /// Enqueue `item`, waiting for a free slot if the channel is full.
    ///
    /// Cancel safe: if the returned future is dropped before it completes,
    /// nothing was enqueued.
    ///
    /// # Panics
    ///
    /// Panics if the channel has already been closed.
    pub async fn write(&self, item: T) -> Result<(), WriteError<T>> {
        self.open_sender()
            .send(item)
            .await
            .map_err(|mpsc::error::SendError(item)| WriteError::Disconnected(item))
    }

    /// Enqueue `item` only if a slot is free right now.
    ///
    /// # Panics
    ///
    /// Panics if the channel has already been closed.
    pub fn try_write(&self, item: T) -> Result<(), TryWriteError<T>> {
        self.open_sender().try_send(item).map_err(|err| match err {
            TrySendError::Full(item) => TryWriteError::Full(item),
            TrySendError::Closed(item) => TryWriteError::Disconnected(item),
        })
    }

    /// Close the channel. Items already buffered stay readable.
    ///
    /// # Panics
    ///
    /// Panics if the channel is already closed.
    pub fn close(&mut self) {
        let pending = self.len();
        match self.sender.take() {
            Some(_) => debug!(pending, "channel closed"),
            None => panic!("{CLOSE_TWICE}"),
        }
    }

    /// Unread items, as seen from the write side. `0` once closed.
    pub fn len(&self) -> usize {
        self.sender
            .as_ref()
            .map_or(0, |sender| sender.max_capacity() - sender.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// `true` once the reader has been dropped.
    pub fn is_disconnected(&self) -> bool {
        self.sender.as_ref().is_some_and(mpsc::Sender::is_closed)
    }

    fn open_sender(&self) -> &mpsc::Sender<T> {
        match &self.sender {
            Some(sender) => sender,
            None => panic!("{WRITE_AFTER_CLOSE}"),
        }
    }
}

impl<T> Drop for ChannelWriter<T> {
    fn drop(&mut self) {
        // Dropping the sender closes the channel either way.
        if self.sender.is_some() {
            warn!("channel writer dropped without close, closing implicitly");
        }
    }
}

impl<T> fmt::Debug for ChannelWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelWriter")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// =============================================================================
// Reader
// =============================================================================

/// The read end. It can observe closure but never cause it.
pub struct ChannelReader<T> {
    receiver: mpsc::Receiver<T>,
    capacity: usize,
}

impl<T> ChannelReader<T> {
    /// Wait for the next item. `None` means closed and drained, and every
    /// later call returns `None` as well.
    ///
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        self.receiver.try_recv().map_err(|err| match err {
            mpsc::error::TryRecvError::Empty => TryRecvError::Empty,
            mpsc::error::TryRecvError::Disconnected => TryRecvError::Drained,
        })
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }

    /// Closed with nothing left to read.
    pub fn is_drained(&self) -> bool {
        self.is_closed() && self.is_empty()
    }
}

impl<T: Default> ChannelReader<T> {
    /// Two-value receive: `(item, true)` for a real item, `(T::default(), false)`
    /// once the channel is closed and drained.
    pub async fn read(&mut self) -> (T, bool) {
        match self.recv().await {
            Some(item) => (item, true),
            None => (T::default(), false),
        }
    }
}

impl<T> Drop for ChannelReader<T> {
    fn drop(&mut self) {
        let abandoned = self.receiver.len();
        if abandoned > 0 {
            debug!(abandoned, "channel reader dropped with unread items");
        }
    }
}

impl<T> fmt::Debug for ChannelReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelReader")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
