//! Ticking emitter: the producer half of the pipeline.
//!
//! An [`Emitter`] writes `0, 1, 2, ...` into a [`ChannelWriter`], one value per
//! timer tick, until it has written `bound` values or its
//! [`CancellationSignal`] fires. Whatever the reason it stops, it closes the
//! channel exactly once on the way out.
//!
//! ```text
//! Idle -> Running -> { BoundedComplete | Cancelled | Disconnected } -> Closed
//! ```

use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, debug_span, trace, Instrument};

use crate::cancel::CancellationSignal;
use crate::channel::ChannelWriter;
use crate::error::{PipelineError, Result, WriteError};

/// One produced sequence value.
pub type Emission = u64;

/// Longest accepted tick period.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

// =============================================================================
// Lifecycle types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitterState {
    Idle,
    Running,
    BoundedComplete,
    Cancelled,
    Disconnected,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Wrote `bound` values.
    BoundReached,
    /// The cancellation signal fired first.
    Cancelled,
    /// The reader was dropped, so there was nobody left to write to.
    Disconnected,
}

impl From<ExitReason> for EmitterState {
    fn from(reason: ExitReason) -> Self {
        match reason {
            ExitReason::BoundReached => EmitterState::BoundedComplete,
            ExitReason::Cancelled => EmitterState::Cancelled,
            ExitReason::Disconnected => EmitterState::Disconnected,
        }
    }
}

/// What a finished run did. Truncation by cancellation shows up here, not as
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmitterReport {
    pub emitted: u64,
    pub bound: Option<u64>,
    pub exit: ExitReason,
}

impl EmitterReport {
    /// A bounded run that stopped before writing `bound` values. Unbounded
    /// runs are never truncated; stopping is the only way they end.
    pub fn is_truncated(&self) -> bool {
        self.bound.is_some_and(|bound| self.emitted < bound)
    }
}

// =============================================================================
// Emitter
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emitter {
    interval: Duration,
    bound: Option<u64>,
}

impl Emitter {
    /// `bound = None` runs until cancelled.
    pub fn new(interval: Duration, bound: Option<u64>) -> Result<Self> {
        if interval.is_zero() {
            return Err(PipelineError::ZeroInterval);
        }
        if interval > MAX_INTERVAL {
            return Err(PipelineError::invalid_config(
                "interval",
                format!("must not exceed {}s", MAX_INTERVAL.as_secs()),
            ));
        }
        Ok(Self { interval, bound })
    }

    /// Emit until cancelled.
    pub fn periodic(interval: Duration) -> Result<Self> {
        Self::new(interval, None)
    }

    /// Emit `count` values, or fewer if cancelled.
    pub fn counted(interval: Duration, count: u64) -> Result<Self> {
        Self::new(interval, Some(count))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn bound(&self) -> Option<u64> {
        self.bound
    }

    /// Run to completion on the current task and close `sink`.
    pub async fn run(self, cancel: CancellationSignal, sink: ChannelWriter<Emission>) -> EmitterReport {
        let (state, _) = watch::channel(EmitterState::Idle);
        self.drive(cancel, sink, state).await
    }

    pub(crate) async fn drive(
        self,
        cancel: CancellationSignal,
        mut sink: ChannelWriter<Emission>,
        state: watch::Sender<EmitterState>,
    ) -> EmitterReport {
        let span = debug_span!(
            "emitter",
            interval_ms = self.interval.as_millis() as u64,
            bound = ?self.bound
        );

        async move {
            state.send_replace(EmitterState::Running);
            debug!("emitter started");

            // Like a wall-clock ticker: first tick one period from now, and a
            // consumer that stalls us costs skipped ticks rather than a burst.
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut next: Emission = 0;
            let exit = loop {
                if self.bound.is_some_and(|bound| next >= bound) {
                    break ExitReason::BoundReached;
                }

                tokio::select! {
                    biased;
                    _ = cancel.triggered() => break ExitReason::Cancelled,
                    _ = ticker.tick() => {}
                }

                // The write may park on a full channel; cancellation abandons
                // it without enqueueing anything.
                tokio::select! {
                    biased;
                    _ = cancel.triggered() => break ExitReason::Cancelled,
                    written = sink.write(next) => match written {
                        Ok(()) => {
                            trace!(value = next, "emitted");
                            next += 1;
                        }
                        Err(WriteError::Disconnected(_)) => break ExitReason::Disconnected,
                    },
                }
            };

            // Single exit: release the timer, then close the channel once.
            state.send_replace(exit.into());
            drop(ticker);
            sink.close();
            state.send_replace(EmitterState::Closed);
            debug!(emitted = next, ?exit, "emitter stopped");

            EmitterReport {
                emitted: next,
                bound: self.bound,
                exit,
            }
        }
        .instrument(span)
        .await
    }
}
