//! Types for the post-check module.

use std::path::{Path, PathBuf};

/// A source file that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What happened to the source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Deletion was not asked for.
    NotRequested,
    /// Every file was converted but there were no source files.
    NothingToDelete,
    /// Some files lack an output, so nothing was deleted.
    SkippedUnconverted { remaining: usize },
    /// Every file was converted, but this is a dry run.
    SkippedDryRun { total: usize },
    /// Cancelled part way; the remaining source files were kept.
    Interrupted { deleted: usize, total: usize },
    /// Deletion was attempted on every source file.
    Completed {
        deleted: usize,
        total: usize,
        failures: Vec<DeletionFailure>,
    },
}

/// Result of a post-conversion scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCheckReport {
    /// Source files found under the root.
    pub source_count: usize,
    /// Target files found under the output root.
    pub target_count: usize,
    /// Source files without an output, sorted.
    pub unconverted: Vec<PathBuf>,
    pub deletion: DeletionOutcome,
}

impl PostCheckReport {
    /// Whether every source file has an output.
    pub fn is_complete(&self) -> bool {
        self.unconverted.is_empty()
    }

    /// Unconverted files relative to `root`, for display.
    pub fn unconverted_relative<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = &'a Path> {
        self.unconverted
            .iter()
            .map(move |path| path.strip_prefix(root).unwrap_or(path))
    }
}
