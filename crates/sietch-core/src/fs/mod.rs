//! Filesystem materialization of a vault skeleton.
//!
//! [`materialize`] lays down the base vault structure followed by the directories
//! and files a template declares. Directory creation is idempotent. Only the
//! permission-mode parse is lenient: a mode that cannot be parsed falls back to
//! [`DEFAULT_FILE_MODE`] with a warning, while any failed write is an error.

mod mode;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::layout::{BASE_DIRECTORIES, DEFAULT_FILE_MODE};
use crate::template::{TemplateDescriptor, TemplateFile};

pub use mode::{ParseModeError, format_mode, parse_mode};

/// Errors from laying out the vault on disk.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write file {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What [`materialize`] created, in creation order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Template directories, relative to the vault root.
    pub directories: Vec<PathBuf>,
    /// Template files with the mode that was applied.
    pub files: Vec<(PathBuf, u32)>,
    /// Files whose declared mode could not be parsed, with the rejected string.
    pub mode_fallbacks: Vec<(PathBuf, String)>,
}

/// Create `path` and any missing parents. Succeeds if it already exists.
pub fn ensure_directory(path: &Path) -> Result<(), FsError> {
    fs::create_dir_all(path).map_err(|source| FsError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

/// Create the directories every vault needs, independent of its template.
pub fn create_vault_structure(root: &Path) -> Result<(), FsError> {
    for dir in BASE_DIRECTORIES {
        ensure_directory(&root.join(dir))?;
    }
    Ok(())
}

/// Lay down the base structure and everything `template` declares under `root`.
pub fn materialize(
    root: &Path,
    template: &TemplateDescriptor,
) -> Result<MaterializeReport, FsError> {
    let mut report = MaterializeReport::default();

    create_vault_structure(root)?;

    for dir in &template.directories {
        ensure_directory(&root.join(dir))?;
        info!("Created directory: {}", dir.display());
        report.directories.push(dir.clone());
    }

    for file in &template.files {
        let mode = resolve_mode(file, &mut report);
        let path = root.join(&file.path);
        if let Some(parent) = path.parent() {
            ensure_directory(parent)?;
        }
        write_file_with_mode(&path, file.content.as_bytes(), mode)
            .map_err(|source| FsError::WriteFile { path, source })?;
        info!("Created file: {} ({})", file.path.display(), format_mode(mode));
        report.files.push((file.path.clone(), mode));
    }

    Ok(report)
}

fn resolve_mode(file: &TemplateFile, report: &mut MaterializeReport) -> u32 {
    if file.mode.trim().is_empty() {
        return DEFAULT_FILE_MODE;
    }
    match parse_mode(&file.mode) {
        Ok(mode) => mode,
        Err(e) => {
            warn!(
                "Invalid mode for {}: {e}; using {}",
                file.path.display(),
                format_mode(DEFAULT_FILE_MODE)
            );
            report
                .mode_fallbacks
                .push((file.path.clone(), file.mode.clone()));
            DEFAULT_FILE_MODE
        }
    }
}

/// Write `contents` to `path` (truncating) and set its permission bits to `mode`.
///
/// The mode is applied explicitly after the write so the process umask does not
/// widen or narrow it. On non-Unix platforms the mode is ignored.
pub fn write_file_with_mode(path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
    make_owner_writable(path)?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

/// Let the owner write an existing file that an earlier run left read-only.
///
/// Missing paths and non-files are left for the open to report.
fn make_owner_writable(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let current = meta.permissions().mode();
        if current & 0o200 == 0 {
            fs::set_permissions(path, fs::Permissions::from_mode(current | 0o200))?;
        }
    }
    #[cfg(not(unix))]
    {
        let mut perms = meta.permissions();
        if perms.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            fs::set_permissions(path, perms)?;
        }
    }

    Ok(())
}
