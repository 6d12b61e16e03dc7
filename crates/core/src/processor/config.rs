//! Configuration for the processor module.

use serde::{Deserialize, Serialize};

use crate::converter::{AudioFormat, Bitrate};

/// Configuration for a conversion batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum parallel conversions.
    #[serde(default = "default_concurrency")]
    pub max_parallel_conversions: usize,

    /// Output format handed to the converter.
    #[serde(default = "default_target_format")]
    pub target_format: AudioFormat,

    /// Constant bit rate for every output.
    #[serde(default)]
    pub bitrate: Bitrate,

    /// Report candidates as converted without running the converter.
    #[serde(default)]
    pub dry_run: bool,
}

/// Number of conversions to run at once when none is configured: the host's
/// available parallelism, or 1 if it cannot be determined.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_target_format() -> AudioFormat {
    AudioFormat::Mp3
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_parallel_conversions: default_concurrency(),
            target_format: default_target_format(),
            bitrate: Bitrate::DEFAULT,
            dry_run: false,
        }
    }
}

impl ProcessorConfig {
    /// Sets the maximum parallel conversions. Zero is raised to one.
    pub fn with_max_conversions(mut self, max: usize) -> Self {
        self.max_parallel_conversions = max.max(1);
        self
    }

    /// Sets the output format.
    pub fn with_target_format(mut self, format: AudioFormat) -> Self {
        self.target_format = format;
        self
    }

    /// Sets the output bit rate.
    pub fn with_bitrate(mut self, bitrate: Bitrate) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Enables dry-run mode.
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}
