//! Resolution of output directories.
//!
//! Every save and load routine of the crate accepts a [`PathSpec`] telling
//! where its file lives. Resolving a specification always yields an absolute
//! path to an existing directory; missing directories are created on the way.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{ToolboxError, ToolboxResult};

/// Where to read or write a file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PathSpec {
    /// The current working directory.
    #[default]
    Cwd,
    /// A single folder, absolute or relative to the base directory.
    Dir(PathBuf),
    /// Folder names nested inside one another, outermost first.
    Nested(Vec<PathBuf>),
}

impl PathSpec {
    /// Resolve against the process working directory.
    pub fn resolve(&self) -> ToolboxResult<PathBuf> {
        let cwd = std::env::current_dir()
            .map_err(|e| ToolboxError::io("reading the current directory", e))?;
        self.resolve_in(&cwd)
    }

    /// Resolve against an explicit base directory.
    ///
    /// Relative segments are joined to `base`; absolute segments replace
    /// whatever was accumulated so far.
    pub fn resolve_in(&self, base: &Path) -> ToolboxResult<PathBuf> {
        match self {
            PathSpec::Cwd => Ok(base.to_path_buf()),
            PathSpec::Dir(dir) => ensure_dir(&base.join(dir)),
            PathSpec::Nested(parts) => {
                if parts.is_empty() {
                    warn!("Variable `path` is neither a string or a list of string.");
                    return Err(ToolboxError::InvalidPath(
                        "an empty list of folders does not name a directory".to_string(),
                    ));
                }
                parts.iter().try_fold(base.to_path_buf(), |acc, part| {
                    ensure_dir(&acc.join(part))
                })
            }
        }
    }
}

/// Resolve a path specification against the current working directory.
///
/// This is the entry point used by every persistence routine.
pub fn resolve<P: Into<PathSpec>>(path: P) -> ToolboxResult<PathBuf> {
    path.into().resolve()
}

fn ensure_dir(dir: &Path) -> ToolboxResult<PathBuf> {
    if !dir.is_dir() {
        std::fs::create_dir_all(dir)
            .map_err(|e| ToolboxError::io(format!("creating {}", dir.display()), e))?;
        debug!(path = %dir.display(), "created directory");
    }
    Ok(dir.to_path_buf())
}

impl From<&str> for PathSpec {
    fn from(s: &str) -> Self {
        PathSpec::Dir(PathBuf::from(s))
    }
}

impl From<String> for PathSpec {
    fn from(s: String) -> Self {
        PathSpec::Dir(PathBuf::from(s))
    }
}

impl From<&Path> for PathSpec {
    fn from(p: &Path) -> Self {
        PathSpec::Dir(p.to_path_buf())
    }
}

impl From<PathBuf> for PathSpec {
    fn from(p: PathBuf) -> Self {
        PathSpec::Dir(p)
    }
}

impl From<&PathBuf> for PathSpec {
    fn from(p: &PathBuf) -> Self {
        PathSpec::Dir(p.clone())
    }
}

impl<T: Into<PathBuf>> From<Vec<T>> for PathSpec {
    fn from(parts: Vec<T>) -> Self {
        PathSpec::Nested(parts.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PathBuf> + Clone> From<&[T]> for PathSpec {
    fn from(parts: &[T]) -> Self {
        PathSpec::Nested(parts.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<PathBuf>, const N: usize> From<[T; N]> for PathSpec {
    fn from(parts: [T; N]) -> Self {
        PathSpec::Nested(parts.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PathSpec>> From<Option<T>> for PathSpec {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(PathSpec::Cwd, Into::into)
    }
}
