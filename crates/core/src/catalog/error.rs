//! Error types for the catalog module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering files.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The scan root is missing or not a directory.
    #[error("Provided path '{}' is not a valid directory", path.display())]
    InvalidDirectory { path: PathBuf },

    /// Walking the directory tree failed.
    #[error("Failed to read '{}': {source}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl CatalogError {
    /// Whether the failure was caused by missing permissions.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Traversal { source, .. } => source
                .io_error()
                .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied),
            Self::InvalidDirectory { .. } => false,
        }
    }
}
