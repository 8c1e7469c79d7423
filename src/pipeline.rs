//! Wiring: build a channel, spawn an emitter on it, hand back the read end.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cancel::CancellationSignal;
use crate::channel::{bounded, ChannelReader};
use crate::emitter::{Emission, Emitter, EmitterReport, EmitterState};
use crate::error::Result;

/// A spawned emitter together with the read end of its channel.
#[derive(Debug)]
pub struct EmitterHandle {
    pub reader: ChannelReader<Emission>,
    pub task: JoinHandle<EmitterReport>,
    state: watch::Receiver<EmitterState>,
}

impl EmitterHandle {
    /// Last lifecycle state the emitter published.
    pub fn state(&self) -> EmitterState {
        *self.state.borrow()
    }

    /// A receiver for following state changes from another task.
    pub fn subscribe(&self) -> watch::Receiver<EmitterState> {
        self.state.clone()
    }

    /// Split into the reader and a future resolving to the emitter's report.
    pub fn into_parts(self) -> (ChannelReader<Emission>, JoinHandle<EmitterReport>) {
        (self.reader, self.task)
    }
}

/// Spawn `emitter` onto the current tokio runtime, writing into a fresh
/// channel of `capacity` slots. Fails before spawning anything if the channel
/// cannot be built.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn_emitter(emitter: Emitter, capacity: usize, cancel: CancellationSignal) -> Result<EmitterHandle> {
    let (writer, reader) = bounded(capacity)?;
    let (state_tx, state_rx) = watch::channel(EmitterState::Idle);
    let task = tokio::spawn(emitter.drive(cancel, writer, state_tx));
    Ok(EmitterHandle {
        reader,
        task,
        state: state_rx,
    })
}

/// Like [`spawn_emitter`], for callers that only want the items. The emitter
/// keeps running detached until it finishes or is cancelled.
pub fn start_emitter(
    emitter: Emitter,
    capacity: usize,
    cancel: CancellationSignal,
) -> Result<ChannelReader<Emission>> {
    spawn_emitter(emitter, capacity, cancel).map(|handle| handle.reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::collect;
    use crate::emitter::ExitReason;
    use crate::error::PipelineError;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_start_emitter_returns_reader_immediately() {
        let emitter = Emitter::counted(Duration::from_millis(10), 3).unwrap();
        let reader = start_emitter(emitter, 1, CancellationSignal::new()).unwrap();
        assert!(!reader.is_closed());
        assert_eq!(collect(reader).await, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_zero_capacity_fails_before_spawning() {
        let emitter = Emitter::periodic(Duration::from_millis(10)).unwrap();
        let err = spawn_emitter(emitter, 0, CancellationSignal::new()).unwrap_err();
        assert!(matches!(err, PipelineError::ZeroCapacity));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_state_and_result() {
        let cancel = CancellationSignal::new();
        let emitter = Emitter::periodic(Duration::from_millis(10)).unwrap();
        let handle = spawn_emitter(emitter, 2, cancel.clone()).unwrap();
        let mut states = handle.subscribe();

        states
            .wait_for(|state| *state == EmitterState::Running)
            .await
            .unwrap();

        cancel.trigger();
        let (reader, task) = handle.into_parts();
        let items = collect(reader).await;
        let report = task.await.unwrap();

        assert_eq!(report.exit, ExitReason::Cancelled);
        assert_eq!(report.emitted, items.len() as u64);
        assert_eq!(*states.borrow(), EmitterState::Closed);
    }
}
