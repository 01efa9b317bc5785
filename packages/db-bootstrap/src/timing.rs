use std::time::{Duration, Instant};

use tracing::info;

/// A named, measured bootstrap step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingEntry {
    pub name: String,
    pub elapsed: Duration,
}

/// Collects how long each bootstrap step took.
#[derive(Debug, Default, Clone)]
pub struct Timing {
    entries: Vec<TimingEntry>,
}

impl Timing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `step`, record its duration under `name` and pass its result through.
    pub fn measure<T>(&mut self, name: impl Into<String>, step: impl FnOnce() -> T) -> T {
        let name = name.into();
        let start = Instant::now();
        let out = step();
        let elapsed = start.elapsed();
        info!(step = %name, elapsed_ms = elapsed.as_millis(), "timing=end");
        self.entries.push(TimingEntry { name, elapsed });
        out
    }

    pub fn entries(&self) -> &[TimingEntry] {
        &self.entries
    }

    pub fn total(&self) -> Duration {
        self.entries.iter().map(|e| e.elapsed).sum()
    }
}
