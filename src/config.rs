//! Pipeline settings, loadable from TOML.
//!
//! ```toml
//! interval_ms = 50
//! bound = 5
//! capacity = 1
//! deadline_ms = 2000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cancel::CancellationSignal;
use crate::emitter::Emitter;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Tick period in milliseconds.
    pub interval_ms: u64,
    /// Stop after this many emissions. Absent means run until cancelled.
    pub bound: Option<u64>,
    /// Channel slots between emitter and consumer.
    pub capacity: usize,
    /// Cancel automatically after this many milliseconds.
    pub deadline_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            bound: None,
            capacity: 1,
            deadline_ms: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(PipelineError::invalid_config("interval_ms", "must be greater than zero"));
        }
        if self.capacity == 0 {
            return Err(PipelineError::invalid_config("capacity", "must be at least 1"));
        }
        if self.deadline_ms == Some(0) {
            return Err(PipelineError::invalid_config(
                "deadline_ms",
                "must be greater than zero; omit it to run without a deadline",
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn emitter(&self) -> Result<Emitter> {
        Emitter::new(self.interval(), self.bound)
    }

    /// Derive the run's signal from `parent`, arming the deadline if set.
    pub fn cancellation(&self, parent: &CancellationSignal) -> CancellationSignal {
        match self.deadline() {
            Some(after) => CancellationSignal::with_deadline(parent, after),
            None => parent.child(),
        }
    }
}
