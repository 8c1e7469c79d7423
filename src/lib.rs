//! # tickpipe
//!
//! A cancellable, time-paced producer feeding a bounded channel that a
//! consumer drains. It is the smallest building block that shows
//! producer/consumer handoff, backpressure and cancellation together.
//!
//! ## Pieces
//!
//! 1. **Emitter** ([`emitter`]) - writes `0, 1, 2, ...` once per tick until a
//!    bound is reached or the cancellation signal fires, then closes its
//!    channel exactly once.
//! 2. **Channel** ([`channel`]) - fixed-capacity FIFO. A full channel parks
//!    the writer; a closed and drained channel ends the reader.
//! 3. **Consumer** ([`consumer`]) - drains the channel as a `Stream`. It never
//!    looks at the cancellation signal; channel closure is its only cue.
//! 4. **Cancellation** ([`cancel`]) - one-shot stop signal, triggered by hand
//!    or by a deadline.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tickpipe::{collect, start_emitter, CancellationSignal, Emitter};
//!
//! # async fn demo() -> tickpipe::Result<()> {
//! let emitter = Emitter::counted(Duration::from_millis(50), 5)?;
//! let reader = start_emitter(emitter, 1, CancellationSignal::new())?;
//! assert_eq!(collect(reader).await, vec![0, 1, 2, 3, 4]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Dependencies
//!
//! - `tokio` - runtime, timers, bounded mpsc and watch channels
//! - `tokio-util` - `CancellationToken` behind [`CancellationSignal`]
//! - `futures` - `Stream` returned by [`drain`]
//! - `thiserror` - error enums
//! - `tracing` - lifecycle logging

pub mod cancel;
pub mod channel;
pub mod config;
pub mod consumer;
pub mod emitter;
pub mod error;
pub mod pipeline;

pub use cancel::CancellationSignal;
pub use channel::{bounded, ChannelReader, ChannelWriter};
pub use config::PipelineConfig;
pub use consumer::{collect, drain};
pub use emitter::{Emission, Emitter, EmitterReport, EmitterState, ExitReason};
pub use error::{PipelineError, Result, TryRecvError, TryWriteError, WriteError};
pub use pipeline::{spawn_emitter, start_emitter, EmitterHandle};
