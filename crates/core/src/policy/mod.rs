//! Output path policies.
//!
//! Every converted file lands at a path computed from its source path, the
//! scan root, and exactly one [`OutputPolicy`]. Discovery and the post-check
//! both go through [`compute_output_path`], so they always agree on which
//! source files still need work.

mod normalize;

pub use normalize::to_camel_case;

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

/// Name of the subfolder that receives restructured output.
pub const RESTRUCTURE_DIR: &str = "RS";

/// Where converted files are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Next to the source file, extension swapped.
    InPlace,
    /// Under `<root>/RS/` with every segment in lower camel case.
    Restructure,
    /// The relative layout reproduced under a different directory.
    CustomDirectory(PathBuf),
}

impl OutputPolicy {
    /// Picks the policy from command line style flags.
    ///
    /// A custom directory always wins over `restructure`.
    pub fn select(output_dir: Option<PathBuf>, restructure: bool) -> Self {
        match output_dir {
            Some(dir) => Self::CustomDirectory(dir),
            None if restructure => Self::Restructure,
            None => Self::InPlace,
        }
    }

    /// Short label used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InPlace => "in_place",
            Self::Restructure => "restructure",
            Self::CustomDirectory(_) => "custom_directory",
        }
    }

    /// Directory tree that holds the outputs for a given scan root.
    pub fn output_root(&self, root: &Path) -> PathBuf {
        match self {
            Self::InPlace => root.to_path_buf(),
            Self::Restructure => root.join(RESTRUCTURE_DIR),
            Self::CustomDirectory(dir) => dir.clone(),
        }
    }
}

/// Computes the output path for `source`.
///
/// `source` is expected to live under `root`. If it does not, only its file
/// name is used as the relative path so the function stays total.
pub fn compute_output_path(
    source: &Path,
    root: &Path,
    policy: &OutputPolicy,
    target_extension: &str,
) -> PathBuf {
    match policy {
        OutputPolicy::InPlace => source.with_extension(target_extension),
        OutputPolicy::Restructure => {
            let (directories, stem) = split_relative(relative_to(source, root));
            let mut path = root.join(RESTRUCTURE_DIR);
            for segment in directories {
                let segment = to_camel_case(&segment.to_string_lossy());
                if !segment.is_empty() {
                    path.push(segment);
                }
            }
            let stem = to_camel_case(&stem.to_string_lossy());
            path.push(with_extension(OsStr::new(&stem), target_extension));
            path
        }
        OutputPolicy::CustomDirectory(dir) => {
            let (directories, stem) = split_relative(relative_to(source, root));
            let mut path = dir.clone();
            path.extend(directories);
            path.push(with_extension(stem, target_extension));
            path
        }
    }
}

/// Plans output paths for one scan root and one policy.
#[derive(Debug, Clone)]
pub struct PathPlanner {
    root: PathBuf,
    policy: OutputPolicy,
    target_extension: String,
}

impl PathPlanner {
    /// Creates a planner. The target extension is given without a leading dot.
    pub fn new(root: impl Into<PathBuf>, policy: OutputPolicy, target_extension: &str) -> Self {
        Self {
            root: root.into(),
            policy,
            target_extension: target_extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> &OutputPolicy {
        &self.policy
    }

    pub fn target_extension(&self) -> &str {
        &self.target_extension
    }

    /// Expected output path for a source file.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        compute_output_path(source, &self.root, &self.policy, &self.target_extension)
    }

    /// Directory tree that holds the outputs.
    pub fn output_root(&self) -> PathBuf {
        self.policy.output_root(&self.root)
    }
}

fn relative_to<'a>(source: &'a Path, root: &Path) -> &'a Path {
    source
        .strip_prefix(root)
        .ok()
        .or_else(|| source.file_name().map(Path::new))
        .unwrap_or(source)
}

/// Splits a relative path into its directory segments and file stem.
fn split_relative(relative: &Path) -> (Vec<&OsStr>, &OsStr) {
    let directories = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment),
            _ => None,
        })
        .collect();
    (directories, relative.file_stem().unwrap_or_default())
}

fn with_extension(stem: &OsStr, extension: &str) -> OsString {
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(extension);
    name
}
