//! Workspace jail
//!
//! Every filesystem path a tool receives passes through here before any
//! I/O happens. Relative paths are anchored at the workspace root,
//! `.`/`..` components are folded lexically, existing paths are
//! canonicalized to defeat symlink escapes, and anything that lands
//! outside the root is rejected.

use crate::error::{Result, WardenError};
use std::path::{Component, Path, PathBuf};

/// Validates and canonicalizes paths against a fixed workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceJail {
    root: PathBuf,
}

impl WorkspaceJail {
    /// Create a jail rooted at `root`, creating the directory if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    /// The canonical workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` to an absolute path inside the root.
    ///
    /// Idempotent: resolving an already-resolved path yields it unchanged.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let normalized = normalize(&joined);

        // Canonicalize whatever prefix of the path exists so symlinks
        // cannot smuggle the result outside the root. The non-existent
        // tail (a file about to be written) stays lexical.
        let resolved = canonicalize_existing_prefix(&normalized);

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(WardenError::PathEscapes {
                path: path.display().to_string(),
            })
        }
    }
}

/// Fold `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest existing ancestor, then re-append the rest.
fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();

    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }

    let mut out = existing.canonicalize().unwrap_or(existing);
    for name in tail.into_iter().rev() {
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn jail() -> (TempDir, WorkspaceJail) {
        let temp = TempDir::new().unwrap();
        let jail = WorkspaceJail::new(temp.path()).unwrap();
        (temp, jail)
    }

    #[test]
    fn relative_paths_land_inside_the_root() {
        let (_temp, jail) = jail();
        let resolved = jail.resolve("notes/todo.txt").unwrap();
        assert!(resolved.starts_with(jail.root()));
        assert!(resolved.ends_with("notes/todo.txt"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let (_temp, jail) = jail();
        assert!(jail.resolve("../outside.txt").is_err());
        assert!(jail.resolve("a/../../outside.txt").is_err());
        assert!(jail.resolve("/etc/passwd").is_err());
    }

    #[test]
    fn inner_dotdot_that_stays_inside_is_fine() {
        let (_temp, jail) = jail();
        let resolved = jail.resolve("a/b/../c.txt").unwrap();
        assert!(resolved.ends_with("a/c.txt"));
    }

    #[test]
    fn resolve_is_idempotent() {
        let (_temp, jail) = jail();
        let once = jail.resolve("sub/dir/file.txt").unwrap();
        let twice = jail.resolve(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn absolute_path_inside_root_is_accepted() {
        let (_temp, jail) = jail();
        let inside = jail.root().join("data.json");
        let resolved = jail.resolve(&inside).unwrap();
        assert_eq!(resolved, inside);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_is_rejected() {
        let (_temp, jail) = jail();
        let outside = TempDir::new().unwrap();
        let link = jail.root().join("sneaky");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();
        assert!(jail.resolve("sneaky/secret.txt").is_err());
    }
}
