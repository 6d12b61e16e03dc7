//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Required executables are not on the search path.
    #[error("Required dependencies not found in PATH: {}", missing.join(", "))]
    DependenciesMissing { missing: Vec<String> },

    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {}", path.display())]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {}", path.display())]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {}", path.display())]
    OutputDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source could not be decoded.
    #[error("Could not decode '{}'. The file may be corrupt", path.display())]
    DecodeFailed {
        path: PathBuf,
        stderr: Option<String>,
    },

    /// The encoder ran but did not produce an output.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// An external process timed out.
    #[error("{process} timed out after {timeout_secs} seconds")]
    Timeout {
        process: &'static str,
        timeout_secs: u64,
    },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse FFprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Whether the source itself is unreadable, so retrying cannot help.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::DecodeFailed { .. } | Self::InputNotFound { .. })
    }

    /// Captured encoder stderr, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::DecodeFailed { stderr, .. } | Self::ConversionFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_missing_lists_names() {
        let err = ConverterError::DependenciesMissing {
            missing: vec!["ffmpeg".to_string(), "ffprobe".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Required dependencies not found in PATH: ffmpeg, ffprobe"
        );
    }

    #[test]
    fn test_decode_classification() {
        let decode = ConverterError::DecodeFailed {
            path: PathBuf::from("/a.ogg"),
            stderr: Some("Invalid data found when processing input".to_string()),
        };
        assert!(decode.is_decode_failure());
        assert_eq!(
            decode.stderr(),
            Some("Invalid data found when processing input")
        );

        let encode = ConverterError::conversion_failed("exit code 1", None);
        assert!(!encode.is_decode_failure());
        assert_eq!(encode.stderr(), None);
    }
}
