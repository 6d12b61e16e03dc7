use serde::{Deserialize, Serialize};

use crate::converter::{AudioFormat, Bitrate, ConverterConfig};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub conversion: ConversionSettings,
    #[serde(default)]
    pub converter: ConverterConfig,
}

/// What to convert and how
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConversionSettings {
    #[serde(default = "default_source_format")]
    pub source_format: AudioFormat,
    #[serde(default = "default_target_format")]
    pub target_format: AudioFormat,
    #[serde(default)]
    pub bitrate: Bitrate,
    /// Parallel conversions; the host's available parallelism when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            source_format: default_source_format(),
            target_format: default_target_format(),
            bitrate: Bitrate::DEFAULT,
            threads: None,
        }
    }
}

fn default_source_format() -> AudioFormat {
    AudioFormat::OggVorbis
}

fn default_target_format() -> AudioFormat {
    AudioFormat::Mp3
}
