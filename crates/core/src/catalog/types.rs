//! Types produced by the catalog.

use std::path::{Path, PathBuf};

/// A source file that still needs converting, paired with its output path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversionCandidate {
    /// Absolute path of the source file.
    pub source: PathBuf,
    /// Path the converted file will be written to.
    pub output: PathBuf,
}

impl ConversionCandidate {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
        }
    }

    /// File name of the source, for display.
    pub fn display_name(&self) -> String {
        display_name(&self.source)
    }
}

/// Result of diffing source files against existing outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateScan {
    /// Source files without an output yet, sorted by source path.
    pub candidates: Vec<ConversionCandidate>,
    /// Number of source files found under the root.
    pub total_sources: usize,
    /// Number of source files whose output already exists.
    pub skipped: usize,
}

impl CandidateScan {
    /// Whether no source files were found at all.
    pub fn is_empty(&self) -> bool {
        self.total_sources == 0
    }

    /// Source paths of the candidates.
    pub fn sources(&self) -> Vec<PathBuf> {
        self.candidates.iter().map(|c| c.source.clone()).collect()
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
