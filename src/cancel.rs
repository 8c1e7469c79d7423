//! One-shot stop notification shared between a pipeline and whoever drives it.
//!
//! A [`CancellationSignal`] is either triggered explicitly (shutdown request,
//! Ctrl-C, a test) or by its deadline passing. Both look the same to
//! observers: once [`is_triggered`](CancellationSignal::is_triggered) returns
//! `true` it never goes back to `false`.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancellationSignal {
    /// A signal with no deadline; it fires only when triggered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a signal that fires when `parent` fires or when `duration` has
    /// elapsed, whichever comes first. Triggering the derived signal does not
    /// affect the parent.
    pub fn with_deadline(parent: &CancellationSignal, duration: Duration) -> Self {
        // An unrepresentable instant is as good as no deadline at all.
        let own = Instant::now().checked_add(duration);
        let deadline = match (parent.deadline, own) {
            (Some(inherited), Some(own)) => Some(inherited.min(own)),
            (inherited, own) => inherited.or(own),
        };
        Self {
            token: parent.token.child_token(),
            deadline,
        }
    }

    /// Derive a signal that fires with this one but can also be triggered on
    /// its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Fire the signal. Calling it again is a no-op.
    pub fn trigger(&self) {
        // Covers an already expired deadline as well as an earlier trigger.
        if !self.is_triggered() {
            debug!("cancellation triggered");
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|at| Instant::now() >= at)
    }

    /// Resolves once the signal has fired. Safe to await from any number of
    /// tasks at once, and cancel safe.
    pub async fn triggered(&self) {
        match self.deadline {
            Some(at) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(at) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline fires. `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tokio::time::{sleep, timeout};

    // Collects formatted log lines so tests can count events.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn trigger_log_count(run: impl FnOnce()) -> usize {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, run);

        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        logs.matches("cancellation triggered").count()
    }

    #[test]
    fn test_trigger_is_idempotent_and_sticky() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_triggered());

        signal.trigger();
        signal.trigger();
        assert!(signal.is_triggered());
        assert!(signal.is_triggered());
    }

    #[test]
    fn test_parent_trigger_reaches_children_but_not_back() {
        let parent = CancellationSignal::new();
        let child = parent.child();
        let sibling = parent.child();

        sibling.trigger();
        assert!(sibling.is_triggered());
        assert!(!parent.is_triggered());
        assert!(!child.is_triggered());

        parent.trigger();
        assert!(child.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_after_duration() {
        let signal = CancellationSignal::with_deadline(&CancellationSignal::new(), Duration::from_millis(50));
        assert!(!signal.is_triggered());
        assert_eq!(signal.remaining(), Some(Duration::from_millis(50)));

        sleep(Duration::from_millis(40)).await;
        assert!(!signal.is_triggered());

        sleep(Duration::from_millis(20)).await;
        assert!(signal.is_triggered());
        assert_eq!(signal.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggered_resolves_on_deadline() {
        let start = Instant::now();
        let signal = CancellationSignal::with_deadline(&CancellationSignal::new(), Duration::from_millis(50));
        signal.triggered().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_deadline_never_outlives_parent() {
        let parent = CancellationSignal::with_deadline(&CancellationSignal::new(), Duration::from_millis(20));
        let child = CancellationSignal::with_deadline(&parent, Duration::from_secs(10));
        assert_eq!(child.deadline(), parent.deadline());

        let tighter = CancellationSignal::with_deadline(&parent, Duration::from_millis(5));
        sleep(Duration::from_millis(5)).await;
        assert!(tighter.is_triggered());
        assert!(!parent.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_trigger_beats_deadline() {
        let signal = CancellationSignal::with_deadline(&CancellationSignal::new(), Duration::from_secs(10));
        signal.trigger();
        timeout(Duration::from_millis(1), signal.triggered())
            .await
            .expect("trigger should resolve immediately");
    }

    #[tokio::test]
    async fn test_many_observers_wake_on_one_trigger() {
        let signal = CancellationSignal::new();
        let observers: Vec<_> = (0..8)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.triggered().await })
            })
            .collect();

        signal.trigger();
        for observer in observers {
            timeout(Duration::from_secs(1), observer)
                .await
                .expect("observer should wake")
                .unwrap();
        }
    }

    #[test]
    fn test_trigger_logs_only_the_first_transition() {
        let fresh = trigger_log_count(|| {
            let signal = CancellationSignal::new();
            signal.trigger();
            signal.trigger();
        });
        assert_eq!(fresh, 1);

        let expired = trigger_log_count(|| {
            let signal = CancellationSignal::with_deadline(&CancellationSignal::new(), Duration::ZERO);
            assert!(signal.is_triggered());
            signal.trigger();
        });
        assert_eq!(expired, 0);
    }
}
