//! Studio configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Orchestration settings.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Wait between status polls of a generation operation
    pub poll_interval: Duration,
    /// Re-polls allowed before the generation is abandoned
    pub max_poll_attempts: u32,
    /// Wall-clock bound on a single generation, submission included
    pub max_generation_time: Duration,
    /// Where the headless binary writes result videos
    pub output_dir: PathBuf,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 120, // 10 minutes at the default interval
            max_generation_time: Duration::from_secs(900),
            output_dir: PathBuf::from("./rns-output"),
        }
    }
}

impl StudioConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_secs(
                std::env::var("RNS_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            max_poll_attempts: std::env::var("RNS_MAX_POLL_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
            max_generation_time: Duration::from_secs(
                std::env::var("RNS_MAX_GENERATION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
            output_dir: std::env::var("RNS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./rns-output")),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, max_poll_attempts: u32) -> Self {
        self.max_poll_attempts = max_poll_attempts;
        self
    }

    pub fn with_max_generation_time(mut self, max_generation_time: Duration) -> Self {
        self.max_generation_time = max_generation_time;
        self
    }
}
