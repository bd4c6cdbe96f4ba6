//! The vault manifest, `vault.yaml` at the vault root.
//!
//! Its presence marks a complete vault: it is always the last thing scaffolding
//! writes, and it is written via a temporary file in the same directory that is
//! synced and renamed over the final path, so a reader sees either no manifest
//! or a whole one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::config::VaultConfig;
use crate::layout::{DEFAULT_FILE_MODE, MANIFEST_FILE};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to serialize vault manifest: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("Failed to parse vault manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Manifest I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Persists a vault configuration as the vault's manifest.
pub trait ManifestWriter: Send + Sync {
    /// Write the manifest for the vault at `vault_root` and return its path.
    fn write(&self, vault_root: &Path, config: &VaultConfig) -> Result<PathBuf, ManifestError>;
}

/// Writes `vault.yaml` atomically and durably.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlManifestWriter;

impl ManifestWriter for YamlManifestWriter {
    fn write(&self, vault_root: &Path, config: &VaultConfig) -> Result<PathBuf, ManifestError> {
        let yaml = serde_yaml::to_string(config).map_err(ManifestError::Serialize)?;
        let path = manifest_path(vault_root);
        let io_err = |source| ManifestError::Io {
            path: path.clone(),
            source,
        };

        let mut temp = NamedTempFile::new_in(vault_root).map_err(io_err)?;
        temp.write_all(yaml.as_bytes()).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(DEFAULT_FILE_MODE))
                .map_err(io_err)?;
        }
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&path).map_err(|e| io_err(e.error))?;
        sync_directory(vault_root).map_err(io_err)?;

        debug!("Wrote vault manifest {}", path.display());
        Ok(path)
    }
}

/// Location of the manifest for the vault at `vault_root`.
pub fn manifest_path(vault_root: &Path) -> PathBuf {
    vault_root.join(MANIFEST_FILE)
}

/// Load the manifest of the vault at `vault_root`.
pub fn read_manifest(vault_root: &Path) -> Result<VaultConfig, ManifestError> {
    let path = manifest_path(vault_root);
    let yaml = fs::read_to_string(&path).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;
    serde_yaml::from_str(&yaml).map_err(|source| ManifestError::Parse { path, source })
}

/// Flush a directory entry so a rename inside it survives a crash.
#[cfg(unix)]
pub(crate) fn sync_directory(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn sync_directory(_dir: &Path) -> io::Result<()> {
    Ok(())
}
