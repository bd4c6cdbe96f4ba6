//! Target path resolution and collision checks.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::ScaffoldError;

/// What occupies the target path before scaffolding starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Missing,
    EmptyDirectory,
    /// Only reachable with `force`.
    NonEmptyDirectory,
}

/// A resolved, absolute vault location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultTarget {
    pub path: PathBuf,
    pub name: String,
    pub state: TargetState,
}

/// Compute the absolute vault path `base_path/vault_name` and check it may be used.
///
/// An empty `base_path` means the current working directory. This only inspects
/// the filesystem; nothing is created.
///
/// # Errors
/// * `InvalidVaultName` if `vault_name` is not a single plain path component
/// * `PathAlreadyExists` if the path is a non-empty directory and `force` is off,
///   or if it is anything other than a directory
pub fn resolve_vault_path(
    base_path: &Path,
    vault_name: &str,
    force: bool,
) -> Result<VaultTarget, ScaffoldError> {
    check_vault_name(vault_name)?;

    let joined = if base_path.as_os_str().is_empty() {
        PathBuf::from(vault_name)
    } else {
        base_path.join(vault_name)
    };
    let path = std::path::absolute(&joined).map_err(|source| {
        ScaffoldError::DirectoryCreationFailed {
            path: joined.clone(),
            source,
        }
    })?;

    let state = match fs::metadata(&path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => TargetState::Missing,
        Err(source) => return Err(ScaffoldError::DirectoryCreationFailed { path, source }),
        Ok(meta) if !meta.is_dir() => return Err(ScaffoldError::PathAlreadyExists { path }),
        Ok(_) => {
            let mut entries = fs::read_dir(&path).map_err(|source| {
                ScaffoldError::DirectoryCreationFailed {
                    path: path.clone(),
                    source,
                }
            })?;
            if entries.next().is_none() {
                TargetState::EmptyDirectory
            } else if force {
                TargetState::NonEmptyDirectory
            } else {
                return Err(ScaffoldError::PathAlreadyExists { path });
            }
        }
    };

    Ok(VaultTarget {
        path,
        name: vault_name.to_string(),
        state,
    })
}

fn check_vault_name(name: &str) -> Result<(), ScaffoldError> {
    let invalid = |reason| ScaffoldError::InvalidVaultName {
        name: name.to_string(),
        reason,
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("name cannot contain path separators"));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("name must be a plain directory name")),
    }
}
