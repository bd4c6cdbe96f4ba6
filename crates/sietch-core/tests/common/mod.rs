//! Shared helpers for scaffold integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sietch_core::config::{RsaConfig, VaultConfig};
use sietch_core::crypto::{
    DefaultKeyProvisioner, KeyConfig, KeyGenParams, KeyGenerationError, KeyProvisioner,
    SyncKeyError,
};
use sietch_core::manifest::{ManifestError, ManifestWriter, YamlManifestWriter};
use sietch_core::template::{TemplateDescriptor, TemplateProvider, TemplateSet};
use sietch_core::Scaffolder;
use walkdir::WalkDir;

/// RSA size used by tests; 4096-bit generation is too slow for a test run.
pub const TEST_RSA_BITS: usize = 2048;

/// Install a subscriber so `RUST_LOG=debug` shows pipeline logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fast_key_params() -> KeyGenParams {
    KeyGenParams::scaffold(1024, 8, 1)
}

pub fn builtin_template(name: &str) -> TemplateDescriptor {
    TemplateSet::builtin()
        .expect("built-in templates parse")
        .validate(name)
        .expect("built-in template exists")
}

/// Scaffolder over the built-in templates with cheap key parameters.
pub fn scaffolder() -> Scaffolder {
    init_tracing();
    Scaffolder::new(TemplateSet::builtin().expect("built-in templates parse"))
        .with_key_params(fast_key_params())
        .with_rsa_key_size(TEST_RSA_BITS)
}

/// Scaffolder over the built-ins plus `extra`.
pub fn scaffolder_with(extra: TemplateDescriptor) -> Scaffolder {
    init_tracing();
    let mut set = TemplateSet::builtin().expect("built-in templates parse");
    set.insert(extra);
    Scaffolder::new(set)
        .with_key_params(fast_key_params())
        .with_rsa_key_size(TEST_RSA_BITS)
}

/// Every entry under `root`: files map to their contents, directories to `None`.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.expect("walk entry");
            let relative = entry
                .path()
                .strip_prefix(root)
                .expect("entry under root")
                .to_path_buf();
            let contents = entry
                .file_type()
                .is_file()
                .then(|| fs::read(entry.path()).expect("read file"));
            (relative, contents)
        })
        .collect()
}

/// Names directly inside `dir`, sorted.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(unix)]
pub fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).expect("metadata").permissions().mode() & 0o7777
}

/// Where a [`FaultyKeys`] provisioner fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFault {
    Symmetric,
    Rsa,
    /// Generates the keypair but forgets to record the fingerprint.
    MissingFingerprint,
}

/// Key provisioner that runs the real generation up to an injected fault.
#[derive(Debug, Clone, Copy)]
pub struct FaultyKeys(pub KeyFault);

impl KeyProvisioner for FaultyKeys {
    fn generate_symmetric_key(
        &self,
        vault_root: &Path,
        params: &KeyGenParams,
    ) -> Result<KeyConfig, KeyGenerationError> {
        let config = DefaultKeyProvisioner.generate_symmetric_key(vault_root, params)?;
        if self.0 == KeyFault::Symmetric {
            return Err(KeyGenerationError::KeyDerivation(
                "injected failure after key write".to_string(),
            ));
        }
        Ok(config)
    }

    fn generate_rsa_keypair(
        &self,
        vault_root: &Path,
        config: &mut VaultConfig,
    ) -> Result<(), SyncKeyError> {
        match self.0 {
            KeyFault::Symmetric => DefaultKeyProvisioner.generate_rsa_keypair(vault_root, config),
            KeyFault::Rsa => Err(SyncKeyError::Encoding("injected failure".to_string())),
            KeyFault::MissingFingerprint => {
                DefaultKeyProvisioner.generate_rsa_keypair(vault_root, config)?;
                if let Some(rsa) = config.sync.rsa.as_mut() {
                    rsa.fingerprint = None;
                }
                Ok(())
            }
        }
    }
}

/// Key provisioner that records the RSA block it is handed and fills in
/// placeholder key material instead of generating a keypair.
#[derive(Debug, Clone, Default)]
pub struct RecordingKeys {
    pub seen_rsa: Arc<Mutex<Vec<Option<RsaConfig>>>>,
}

impl KeyProvisioner for RecordingKeys {
    fn generate_symmetric_key(
        &self,
        vault_root: &Path,
        params: &KeyGenParams,
    ) -> Result<KeyConfig, KeyGenerationError> {
        DefaultKeyProvisioner.generate_symmetric_key(vault_root, params)
    }

    fn generate_rsa_keypair(
        &self,
        _vault_root: &Path,
        config: &mut VaultConfig,
    ) -> Result<(), SyncKeyError> {
        self.seen_rsa
            .lock()
            .expect("lock")
            .push(config.sync.rsa.clone());
        let rsa = config.sync.rsa.as_mut().ok_or(SyncKeyError::MissingRsaConfig)?;
        rsa.public_key_path = Some(PathBuf::from("public.pem"));
        rsa.private_key_path = Some(PathBuf::from("private.pem"));
        rsa.fingerprint = Some("00".repeat(32));
        Ok(())
    }
}

/// Manifest writer that writes a partial file and then fails.
#[derive(Debug, Clone, Copy)]
pub struct FailingManifest;

impl ManifestWriter for FailingManifest {
    fn write(&self, vault_root: &Path, config: &VaultConfig) -> Result<PathBuf, ManifestError> {
        let path = YamlManifestWriter.write(vault_root, config)?;
        fs::write(&path, b"name: trunc").map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        Err(ManifestError::Io {
            path,
            source: std::io::Error::other("injected failure"),
        })
    }
}
