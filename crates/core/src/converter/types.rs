//! Types for the converter module.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Normalized tags to write into the output file, keyed by output tag name.
pub type TagSet = BTreeMap<String, String>;

/// Tags as reported by the probe, before normalization.
pub type RawTags = BTreeMap<String, String>;

/// Lossy audio formats the converter can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    /// MPEG Audio Layer III
    #[serde(rename = "mp3")]
    Mp3,
    /// Ogg Vorbis
    #[serde(rename = "ogg", alias = "ogg_vorbis", alias = "vorbis")]
    OggVorbis,
    /// Opus
    #[serde(rename = "opus")]
    Opus,
    /// AAC in an MPEG-4 container
    #[serde(rename = "m4a", alias = "aac")]
    Aac,
}

impl AudioFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg",
            Self::Opus => "opus",
            Self::Aac => "m4a",
        }
    }

    /// Returns the ffmpeg encoder name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::OggVorbis => "libvorbis",
            Self::Opus => "libopus",
            Self::Aac => "aac",
        }
    }

    /// Returns the ffmpeg muxer name, needed because outputs are written to a
    /// temporary name whose extension ffmpeg cannot guess from.
    pub fn ffmpeg_muxer(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg",
            Self::Opus => "opus",
            Self::Aac => "ipod",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "ogg" | "ogg_vorbis" | "vorbis" => Ok(Self::OggVorbis),
            "opus" => Ok(Self::Opus),
            "m4a" | "aac" => Ok(Self::Aac),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Returned when a format name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported audio format '{0}' (expected mp3, ogg, opus or m4a)")]
pub struct UnknownFormat(pub String);

static BITRATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+k$").expect("bitrate pattern is valid"));

/// Constant bit rate in kilobits per second, written as e.g. `320k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bitrate {
    kbps: u32,
}

impl Bitrate {
    pub const DEFAULT: Bitrate = Bitrate { kbps: 320 };

    /// Creates a bitrate from a kbps value. Zero is rejected.
    pub fn from_kbps(kbps: u32) -> Option<Self> {
        (kbps > 0).then_some(Self { kbps })
    }

    pub fn kbps(&self) -> u32 {
        self.kbps
    }
}

impl Default for Bitrate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k", self.kbps)
    }
}

impl FromStr for Bitrate {
    type Err = InvalidBitrate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !BITRATE_PATTERN.is_match(s) {
            return Err(InvalidBitrate(s.to_string()));
        }
        s.trim_end_matches('k')
            .parse::<u32>()
            .ok()
            .and_then(Self::from_kbps)
            .ok_or_else(|| InvalidBitrate(s.to_string()))
    }
}

impl TryFrom<String> for Bitrate {
    type Error = InvalidBitrate;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bitrate> for String {
    fn from(bitrate: Bitrate) -> Self {
        bitrate.to_string()
    }
}

/// Returned when a bitrate string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bitrate '{0}': expected a positive number followed by 'k', e.g. 320k")]
pub struct InvalidBitrate(pub String);

/// A single file conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    /// Source file path.
    pub input_path: PathBuf,
    /// Final output file path.
    pub output_path: PathBuf,
    /// Output format.
    pub format: AudioFormat,
    /// Constant bit rate for the output.
    pub bitrate: Bitrate,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Output file path.
    pub output_path: PathBuf,
    /// Output file size in bytes.
    pub output_size_bytes: u64,
    /// Conversion duration in milliseconds.
    pub duration_ms: u64,
    /// Number of tags written to the output.
    pub tags_written: usize,
    /// Whether the tagged encode failed and the file was written without tags.
    pub tags_dropped: bool,
}
