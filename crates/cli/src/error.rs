use std::path::PathBuf;

use mp3cator_core::{CatalogError, ConfigError, ConverterError};
use thiserror::Error;

/// Exit status for a user interrupt.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Fatal errors of a run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Dependency(ConverterError),

    #[error(transparent)]
    Discovery(#[from] CatalogError),

    #[error("Cannot use output directory '{}': {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation cancelled by user.")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }

    pub fn display_message(&self) -> String {
        match self {
            Self::Dependency(e) => format!("Error: {e}\nPlease install these dependencies to proceed."),
            Self::Discovery(e) if e.is_permission_denied() => format!("Permission denied: {e}"),
            Self::Interrupted => self.to_string(),
            Self::Other(e) => format!("Error: {e:#}"),
            _ => format!("Error: {self}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Interrupted.exit_code(), 130);
        let invalid = CliError::Discovery(CatalogError::InvalidDirectory {
            path: PathBuf::from("/missing"),
        });
        assert_eq!(invalid.exit_code(), 1);
        let missing = CliError::Dependency(ConverterError::DependenciesMissing {
            missing: vec!["ffprobe".to_string()],
        });
        assert_eq!(missing.exit_code(), 1);
    }

    #[test]
    fn test_messages() {
        let invalid = CliError::Discovery(CatalogError::InvalidDirectory {
            path: PathBuf::from("/missing"),
        });
        assert_eq!(
            invalid.display_message(),
            "Error: Provided path '/missing' is not a valid directory"
        );

        let missing = CliError::Dependency(ConverterError::DependenciesMissing {
            missing: vec!["ffmpeg".to_string(), "ffprobe".to_string()],
        });
        assert!(missing
            .display_message()
            .starts_with("Error: Required dependencies not found in PATH: ffmpeg, ffprobe"));

        assert_eq!(
            CliError::Interrupted.display_message(),
            "Operation cancelled by user."
        );
    }
}
