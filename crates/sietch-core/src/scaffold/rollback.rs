//! Where a vault is built, and how it is committed or thrown away.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::ScaffoldError;
use super::path::{TargetState, VaultTarget};
use crate::manifest::sync_directory;

/// Remove a partially created vault.
///
/// Best effort: a missing path is fine, and a failed removal is logged rather
/// than returned so the error that triggered the rollback is the one reported.
pub fn cleanup_on_error(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => debug!("Removed partial vault at {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to clean up {}: {e}", path.display()),
    }
}

/// The directory a vault is being built in.
#[derive(Debug)]
pub(crate) enum BuildDir {
    /// A hidden sibling of the target, renamed into place on commit.
    ///
    /// `created_base` is the outermost ancestor of the target that did not exist
    /// before the build and is removed again on rollback.
    Staged {
        staging: PathBuf,
        target: PathBuf,
        created_base: Option<PathBuf>,
    },
    /// The target itself, used when forcing over an existing vault.
    InPlace { target: PathBuf },
}

impl BuildDir {
    /// Pick and create the build directory for `target`.
    pub(crate) fn prepare(target: &VaultTarget) -> Result<Self, ScaffoldError> {
        if target.state == TargetState::NonEmptyDirectory {
            return Ok(Self::InPlace {
                target: target.path.clone(),
            });
        }

        let parent = target
            .path
            .parent()
            .ok_or_else(|| ScaffoldError::InvalidVaultName {
                name: target.name.clone(),
                reason: "vault cannot be the filesystem root",
            })?;
        let created_base = parent
            .ancestors()
            .take_while(|dir| !dir.exists())
            .last()
            .map(Path::to_path_buf);
        fs::create_dir_all(parent).map_err(|source| ScaffoldError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source,
        })?;

        let staging = parent.join(format!(".{}.scaffold-{}", target.name, Uuid::new_v4()));
        fs::create_dir(&staging).map_err(|source| ScaffoldError::DirectoryCreationFailed {
            path: staging.clone(),
            source,
        })?;
        debug!("Staging vault in {}", staging.display());

        Ok(Self::Staged {
            staging,
            target: target.path.clone(),
            created_base,
        })
    }

    /// Where files are written while building.
    pub(crate) fn root(&self) -> &Path {
        match self {
            Self::Staged { staging, .. } => staging,
            Self::InPlace { target } => target,
        }
    }

    /// Move the finished vault to its target and return the final path.
    ///
    /// A target that appeared since resolution is only replaced if it is still an
    /// empty directory.
    pub(crate) fn commit(&self) -> Result<PathBuf, ScaffoldError> {
        let (staging, target) = match self {
            Self::InPlace { target } => return Ok(target.clone()),
            Self::Staged { staging, target, .. } => (staging, target),
        };
        let commit_err = |source| ScaffoldError::CommitFailed {
            path: target.clone(),
            source,
        };

        match fs::remove_dir(target) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(commit_err(e)),
        }
        fs::rename(staging, target).map_err(commit_err)?;
        if let Some(parent) = target.parent() {
            sync_directory(parent).map_err(commit_err)?;
        }
        Ok(target.clone())
    }

    /// Throw away whatever was built.
    pub(crate) fn rollback(&self) {
        cleanup_on_error(self.root());
        if let Self::Staged {
            target,
            created_base: Some(base),
            ..
        } = self
        {
            remove_created_ancestors(target, base);
        }
    }
}

/// Remove the now-empty directories between `target` and `base`, inclusive.
fn remove_created_ancestors(target: &Path, base: &Path) {
    for dir in target.ancestors().skip(1) {
        if let Err(e) = fs::remove_dir(dir) {
            // Someone else put something there meanwhile
            debug!("Keeping {}: {e}", dir.display());
            return;
        }
        if dir == base {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::path::resolve_vault_path;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_cleanup_missing_path_is_noop() {
        let temp = TempDir::new().unwrap();
        cleanup_on_error(&temp.path().join("never-created"));
        cleanup_on_error(&temp.path().join("never-created"));
    }

    #[test]
    fn test_cleanup_removes_tree() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("v");
        fs::create_dir_all(vault.join(".sietch/keys")).unwrap();
        fs::write(vault.join(".sietch/keys/secret.key"), b"k").unwrap();

        cleanup_on_error(&vault);
        assert!(!vault.exists());
    }

    #[test]
    fn test_staged_commit() {
        let temp = TempDir::new().unwrap();
        let target = resolve_vault_path(temp.path(), "v", false).unwrap();
        let build = BuildDir::prepare(&target).unwrap();
        assert_ne!(build.root(), target.path);
        assert!(!target.path.exists());

        fs::write(build.root().join("vault.yaml"), b"name: v\n").unwrap();
        let committed = build.commit().unwrap();
        assert_eq!(committed, target.path);
        assert!(target.path.join("vault.yaml").is_file());
        assert_eq!(entries(temp.path()), vec!["v"]);
    }

    #[test]
    fn test_staged_commit_replaces_empty_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("v")).unwrap();
        let target = resolve_vault_path(temp.path(), "v", false).unwrap();
        let build = BuildDir::prepare(&target).unwrap();
        fs::write(build.root().join("vault.yaml"), b"name: v\n").unwrap();

        build.commit().unwrap();
        assert!(target.path.join("vault.yaml").is_file());
        assert_eq!(entries(temp.path()), vec!["v"]);
    }

    #[test]
    fn test_staged_commit_refuses_populated_target() {
        let temp = TempDir::new().unwrap();
        let target = resolve_vault_path(temp.path(), "v", false).unwrap();
        let build = BuildDir::prepare(&target).unwrap();

        fs::create_dir(&target.path).unwrap();
        fs::write(target.path.join("other.txt"), b"someone else").unwrap();

        assert!(matches!(
            build.commit(),
            Err(ScaffoldError::CommitFailed { .. })
        ));
        build.rollback();
        assert_eq!(entries(temp.path()), vec!["v"]);
        assert_eq!(entries(&target.path), vec!["other.txt"]);
    }

    #[test]
    fn test_staged_rollback_leaves_target_alone() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("v")).unwrap();
        let target = resolve_vault_path(temp.path(), "v", false).unwrap();
        let build = BuildDir::prepare(&target).unwrap();
        fs::write(build.root().join("partial"), b"x").unwrap();

        build.rollback();
        assert_eq!(entries(temp.path()), vec!["v"]);
        assert!(entries(&target.path).is_empty());
    }

    #[test]
    fn test_staged_rollback_removes_created_base() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("a/b");
        let target = resolve_vault_path(&base, "v", false).unwrap();
        let build = BuildDir::prepare(&target).unwrap();
        assert!(base.is_dir());

        build.rollback();
        assert!(entries(temp.path()).is_empty());
    }

    #[test]
    fn test_staged_rollback_keeps_preexisting_base() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("a")).unwrap();
        let target = resolve_vault_path(&temp.path().join("a/b"), "v", false).unwrap();
        let build = BuildDir::prepare(&target).unwrap();

        build.rollback();
        assert_eq!(entries(temp.path()), vec!["a"]);
        assert!(entries(&temp.path().join("a")).is_empty());
    }

    #[test]
    fn test_in_place_build() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("v")).unwrap();
        fs::write(temp.path().join("v/old.txt"), b"old").unwrap();
        let target = resolve_vault_path(temp.path(), "v", true).unwrap();

        let build = BuildDir::prepare(&target).unwrap();
        assert_eq!(build.root(), target.path);
        assert_eq!(build.commit().unwrap(), target.path);

        build.rollback();
        assert!(!target.path.exists());
    }
}
