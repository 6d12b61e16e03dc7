//! Testing utilities and mock implementations.
//!
//! This module provides a mock `Converter` and filesystem fixtures, allowing
//! the whole discovery and conversion pipeline to be exercised without ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use mp3cator_core::testing::{fixtures, MockConverter};
//!
//! let dir = tempfile::TempDir::new()?;
//! fixtures::write_files(dir.path(), &["Album/01.ogg", "Album/02.ogg"]);
//!
//! let converter = MockConverter::new();
//! converter.set_write_outputs(true).await;
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Create empty files at the given paths relative to `root`, creating
    /// parent directories as needed. Returns the absolute paths.
    ///
    /// Panics if a file cannot be created.
    pub fn write_files(root: &Path, relative_paths: &[&str]) -> Vec<PathBuf> {
        relative_paths
            .iter()
            .map(|relative| {
                let path = root.join(relative);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).expect("create fixture directory");
                }
                fs::write(&path, b"").expect("write fixture file");
                path
            })
            .collect()
    }

    /// Paths of all files under `root`, relative to it, sorted, with `/` as
    /// separator.
    pub fn list_relative(root: &Path) -> Vec<String> {
        let mut found: Vec<String> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry.path().strip_prefix(root).ok().map(|relative| {
                    relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().to_string())
                        .collect::<Vec<_>>()
                        .join("/")
                })
            })
            .collect();
        found.sort();
        found
    }
}
