//! File discovery.
//!
//! The catalog walks a directory tree and works out which source files still
//! lack an output. Nothing is cached between calls: every scan reads the
//! filesystem again, so the presence of output files is the only state.
//!
//! # Example
//!
//! ```ignore
//! use mp3cator_core::catalog::Catalog;
//! use mp3cator_core::policy::OutputPolicy;
//!
//! let catalog = Catalog::new("/music")?;
//! let scan = catalog.identify_candidates("ogg", "mp3", &OutputPolicy::InPlace)?;
//! println!("{} to convert, {} skipped", scan.candidates.len(), scan.skipped);
//! ```

mod error;
mod types;

pub use error::CatalogError;
pub use types::{CandidateScan, ConversionCandidate};

pub(crate) use types::display_name;

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::policy::{OutputPolicy, PathPlanner};

/// Finds files beneath a root directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    /// Creates a catalog rooted at `root`.
    ///
    /// Fails with [`CatalogError::InvalidDirectory`] if `root` is not a
    /// directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CatalogError::InvalidDirectory { path: root });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists every file under the root whose name ends with `extension`,
    /// compared case-insensitively. Results are sorted.
    pub fn find_files(&self, extension: &str) -> Result<Vec<PathBuf>, CatalogError> {
        find_files(&self.root, extension)
    }

    /// Works out which source files still need converting.
    pub fn identify_candidates(
        &self,
        source_extension: &str,
        target_extension: &str,
        policy: &OutputPolicy,
    ) -> Result<CandidateScan, CatalogError> {
        let planner = PathPlanner::new(&self.root, policy.clone(), target_extension);
        let sources = self.find_files(source_extension)?;
        let total_sources = sources.len();
        let candidates = self.pending(&sources, &planner)?;
        let skipped = total_sources - candidates.len();

        debug!(
            root = %self.root.display(),
            policy = policy.name(),
            total_sources,
            candidates = candidates.len(),
            skipped,
            "Identified conversion candidates"
        );

        Ok(CandidateScan {
            candidates,
            total_sources,
            skipped,
        })
    }

    /// Returns the subset of `sources` whose expected output does not exist.
    ///
    /// For the in-place policy the existing targets are listed once and looked
    /// up by directory and stem, which gives the same answer as checking each
    /// computed path but needs a single walk. Only targets whose extension is
    /// exactly the planned one count, as the planned path is spelled that way.
    pub fn pending(
        &self,
        sources: &[PathBuf],
        planner: &PathPlanner,
    ) -> Result<Vec<ConversionCandidate>, CatalogError> {
        let candidates = match planner.policy() {
            OutputPolicy::InPlace => {
                let existing: HashSet<(PathBuf, OsString)> = self
                    .find_files(planner.target_extension())?
                    .iter()
                    .filter(|target| {
                        target.extension() == Some(OsStr::new(planner.target_extension()))
                    })
                    .filter_map(|target| stem_key(target))
                    .collect();

                sources
                    .iter()
                    .filter(|source| {
                        stem_key(source).map_or(true, |key| !existing.contains(&key))
                    })
                    .map(|source| ConversionCandidate::new(source, planner.output_path(source)))
                    .collect()
            }
            OutputPolicy::Restructure | OutputPolicy::CustomDirectory(_) => sources
                .iter()
                .map(|source| ConversionCandidate::new(source, planner.output_path(source)))
                .filter(|candidate| !candidate.output.exists())
                .collect(),
        };
        Ok(candidates)
    }
}

/// Lists every file under `root` whose name ends with `.extension`.
///
/// The extension may be given with or without a leading dot. Symbolic links
/// to directories are not followed.
pub fn find_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, CatalogError> {
    let suffix = format!(".{}", extension.trim_start_matches('.').to_lowercase());
    let mut found = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| CatalogError::Traversal {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.ends_with(&suffix) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

fn stem_key(path: &Path) -> Option<(PathBuf, OsString)> {
    let parent = path.parent()?.to_path_buf();
    let stem = path.file_stem()?.to_os_string();
    Some((parent, stem))
}
