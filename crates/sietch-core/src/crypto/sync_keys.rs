//! RSA keypair used to authenticate a vault to its sync peers.
//!
//! The private key is written as PKCS#8 PEM with owner-only permissions, the
//! public key as SPKI PEM. The fingerprint is the hex SHA-256 of the DER-encoded
//! public key, which is what peers compare when they exchange trust.

use std::path::{Path, PathBuf};

use rand_core::OsRng;
use ring::digest;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::VaultConfig;
use crate::fs::write_file_with_mode;
use crate::layout::{
    DEFAULT_FILE_MODE, MIN_RSA_KEY_SIZE, SECRET_FILE_MODE, SYNC_PRIVATE_KEY_PATH,
    SYNC_PUBLIC_KEY_PATH,
};

#[derive(Error, Debug)]
pub enum SyncKeyError {
    #[error("Vault configuration has no sync RSA settings")]
    MissingRsaConfig,

    #[error("RSA key size {size} is below the minimum of {MIN_RSA_KEY_SIZE} bits")]
    KeyTooSmall { size: usize },

    #[error("RSA key generation failed: {0}")]
    Generation(#[from] rsa::Error),

    #[error("Failed to encode RSA key: {0}")]
    Encoding(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Generate the sync keypair under `vault_root` and record it in `config`.
///
/// `config.sync.rsa` must already be populated; its `key_size` picks the modulus
/// size. On success the key paths (relative to the vault root) and the public
/// key fingerprint are filled in.
pub fn generate_rsa_keypair(
    vault_root: &Path,
    config: &mut VaultConfig,
) -> Result<(), SyncKeyError> {
    let rsa = config.sync.rsa.as_mut().ok_or(SyncKeyError::MissingRsaConfig)?;
    if rsa.key_size < MIN_RSA_KEY_SIZE {
        return Err(SyncKeyError::KeyTooSmall { size: rsa.key_size });
    }

    debug!("Generating {}-bit RSA sync keypair", rsa.key_size);
    let private_key = RsaPrivateKey::new(&mut OsRng, rsa.key_size)?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| SyncKeyError::Encoding(e.to_string()))?;
    let public_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| SyncKeyError::Encoding(e.to_string()))?;
    let public_der = public_key
        .to_public_key_der()
        .map_err(|e| SyncKeyError::Encoding(e.to_string()))?;

    let private_path = PathBuf::from(SYNC_PRIVATE_KEY_PATH);
    let public_path = PathBuf::from(SYNC_PUBLIC_KEY_PATH);
    write_key(vault_root, &private_path, private_pem.as_bytes(), SECRET_FILE_MODE)?;
    write_key(vault_root, &public_path, public_pem.as_bytes(), DEFAULT_FILE_MODE)?;

    let fingerprint = hex::encode(digest::digest(&digest::SHA256, public_der.as_bytes()));
    info!("Sync keypair generated (fingerprint {fingerprint})");

    rsa.private_key_path = Some(private_path);
    rsa.public_key_path = Some(public_path);
    rsa.fingerprint = Some(fingerprint);
    Ok(())
}

fn write_key(root: &Path, relative: &Path, pem: &[u8], mode: u32) -> Result<(), SyncKeyError> {
    let path = root.join(relative);
    write_file_with_mode(&path, pem, mode).map_err(|source| SyncKeyError::Io { path, source })
}
