//! Post-conversion verification and cleanup.
//!
//! After a batch the tree is scanned again from scratch. Source files whose
//! expected output is missing are reported; only when there are none, and
//! deletion was asked for, are the source files removed.

mod types;

pub use types::{DeletionFailure, DeletionOutcome, PostCheckReport};

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::policy::{OutputPolicy, PathPlanner};

/// Verifies a tree against an output policy.
#[derive(Debug, Clone)]
pub struct PostCheck {
    catalog: Catalog,
    planner: PathPlanner,
    source_extension: String,
    dry_run: bool,
    cancel: CancellationToken,
}

impl PostCheck {
    /// Fails with [`CatalogError::InvalidDirectory`] if `root` is not a
    /// directory.
    pub fn new(
        root: impl Into<PathBuf>,
        policy: OutputPolicy,
        source_extension: &str,
        target_extension: &str,
    ) -> Result<Self, CatalogError> {
        let catalog = Catalog::new(root)?;
        let planner = PathPlanner::new(catalog.root(), policy, target_extension);
        Ok(Self {
            catalog,
            planner,
            source_extension: source_extension.trim_start_matches('.').to_string(),
            dry_run: false,
            cancel: CancellationToken::new(),
        })
    }

    /// In a dry run a requested deletion is reported but never performed.
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Stops the deletion loop between files once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn root(&self) -> &Path {
        self.catalog.root()
    }

    /// Source files whose expected output does not exist.
    pub fn verify(&self) -> Result<Vec<PathBuf>, CatalogError> {
        let sources = self.catalog.find_files(&self.source_extension)?;
        self.unconverted(&sources)
    }

    /// Deletes every source file, but only if none is unconverted.
    pub fn delete_if_complete(&self) -> Result<DeletionOutcome, CatalogError> {
        let sources = self.catalog.find_files(&self.source_extension)?;
        let unconverted = self.unconverted(&sources)?;
        Ok(self.decide_deletion(true, &sources, &unconverted))
    }

    /// Scans the tree and, when `delete` is set and everything is converted,
    /// removes the source files.
    pub fn run(&self, delete: bool) -> Result<PostCheckReport, CatalogError> {
        let sources = self.catalog.find_files(&self.source_extension)?;
        let target_count = self.count_targets()?;
        let unconverted = self.unconverted(&sources)?;

        info!(
            root = %self.root().display(),
            sources = sources.len(),
            targets = target_count,
            unconverted = unconverted.len(),
            "Post-check scan finished"
        );

        let deletion = self.decide_deletion(delete, &sources, &unconverted);

        Ok(PostCheckReport {
            source_count: sources.len(),
            target_count,
            unconverted,
            deletion,
        })
    }

    fn unconverted(&self, sources: &[PathBuf]) -> Result<Vec<PathBuf>, CatalogError> {
        Ok(self
            .catalog
            .pending(sources, &self.planner)?
            .into_iter()
            .map(|candidate| candidate.source)
            .collect())
    }

    /// Target files under the directory the active policy writes to.
    fn count_targets(&self) -> Result<usize, CatalogError> {
        let output_root = self.planner.output_root();
        if !output_root.is_dir() {
            return Ok(0);
        }
        Ok(crate::catalog::find_files(&output_root, self.planner.target_extension())?.len())
    }

    fn decide_deletion(
        &self,
        requested: bool,
        sources: &[PathBuf],
        unconverted: &[PathBuf],
    ) -> DeletionOutcome {
        if !requested {
            return DeletionOutcome::NotRequested;
        }
        if !unconverted.is_empty() {
            return DeletionOutcome::SkippedUnconverted {
                remaining: unconverted.len(),
            };
        }
        if sources.is_empty() {
            return DeletionOutcome::NothingToDelete;
        }
        if self.dry_run {
            return DeletionOutcome::SkippedDryRun {
                total: sources.len(),
            };
        }

        info!(count = sources.len(), "Deleting original files");

        let mut deleted = 0;
        let mut failures = Vec::new();
        for source in sources {
            if self.cancel.is_cancelled() {
                warn!(deleted, total = sources.len(), "Deletion interrupted");
                return DeletionOutcome::Interrupted {
                    deleted,
                    total: sources.len(),
                };
            }
            match std::fs::remove_file(source) {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!("Failed to delete {}: {}", source.display(), e);
                    failures.push(DeletionFailure {
                        path: source.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        DeletionOutcome::Completed {
            deleted,
            total: sources.len(),
            failures,
        }
    }
}

/// Source files under `root` that lack an output under `policy`.
pub fn verify(
    root: &Path,
    policy: &OutputPolicy,
    source_extension: &str,
    target_extension: &str,
) -> Result<Vec<PathBuf>, CatalogError> {
    PostCheck::new(root, policy.clone(), source_extension, target_extension)?.verify()
}

/// Deletes the source files under `root` if every one has an output.
pub fn delete_if_complete(
    root: &Path,
    policy: &OutputPolicy,
    source_extension: &str,
    target_extension: &str,
) -> Result<DeletionOutcome, CatalogError> {
    PostCheck::new(root, policy.clone(), source_extension, target_extension)?.delete_if_complete()
}
