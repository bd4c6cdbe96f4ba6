//! Symmetric key provisioning for new vaults.
//!
//! A scaffolded vault gets a fresh 256-bit AES key derived with scrypt (or
//! PBKDF2-HMAC-SHA256) from random seed material and a random salt. The key is
//! written base64-encoded to [`SECRET_KEY_PATH`](crate::layout::SECRET_KEY_PATH) and
//! never appears in the returned [`KeyConfig`]: the config only carries what later
//! operations need to find and check the key (path, KDF parameters, a SHA-256 hash
//! and an AES-GCM key-check block).

use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use ring::{digest, pbkdf2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::fs::write_file_with_mode;
use crate::layout::{
    DEFAULT_PBKDF2_ITERATIONS, DEFAULT_SCRYPT_N, DEFAULT_SCRYPT_P, DEFAULT_SCRYPT_R,
    SECRET_FILE_MODE, SECRET_KEY_PATH,
};

const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Plaintext sealed into the key-check block.
const KEY_CHECK_PLAINTEXT: &[u8] = b"sietch-key-check-v1";

/// Kind of vault encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Aes,
    Gpg,
    None,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Aes => "aes",
            KeyType::Gpg => "gpg",
            KeyType::None => "none",
        }
    }
}

/// AES block mode recorded for the vault's content encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AesMode {
    Gcm,
    Cbc,
}

/// Key derivation function and its cost parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum Kdf {
    Scrypt { n: u64, r: u32, p: u32 },
    Pbkdf2 { iterations: u32 },
    /// Key imported from a key file, not derived.
    None,
}

/// How the symmetric key should be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGenParams {
    pub key_type: KeyType,
    pub use_passphrase: bool,
    /// Import this base64 key instead of generating one.
    pub key_file: Option<PathBuf>,
    pub aes_mode: AesMode,
    pub use_scrypt: bool,
    pub scrypt_n: u64,
    pub scrypt_r: u32,
    pub scrypt_p: u32,
    pub pbkdf2_iterations: u32,
}

impl KeyGenParams {
    /// The fixed policy for scaffolded vaults: AES-GCM, scrypt, no passphrase.
    pub fn scaffold(scrypt_n: u64, scrypt_r: u32, scrypt_p: u32) -> Self {
        Self {
            key_type: KeyType::Aes,
            use_passphrase: false,
            key_file: None,
            aes_mode: AesMode::Gcm,
            use_scrypt: true,
            scrypt_n,
            scrypt_r,
            scrypt_p,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl Default for KeyGenParams {
    fn default() -> Self {
        Self::scaffold(DEFAULT_SCRYPT_N, DEFAULT_SCRYPT_R, DEFAULT_SCRYPT_P)
    }
}

/// AES parameters stored in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AesConfig {
    pub mode: AesMode,
    pub kdf: Kdf,
    /// Base64 salt, absent for imported keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// Hex SHA-256 of the raw key.
    pub key_hash: String,
    /// Base64 `nonce || ciphertext || tag` of a fixed plaintext under the key.
    pub key_check: String,
}

/// Handle to provisioned key material.
///
/// Holds no secret: the key itself lives only in the key file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConfig {
    pub key_type: KeyType,
    /// Key file location relative to the vault root.
    pub key_path: PathBuf,
    pub aes: Option<AesConfig>,
}

#[derive(Error, Debug)]
pub enum KeyGenerationError {
    #[error("Unsupported key type for scaffolded vaults: {}", .0.as_str())]
    UnsupportedKeyType(KeyType),

    #[error("Passphrase-protected keys cannot be generated non-interactively")]
    PassphraseUnsupported,

    #[error("Invalid scrypt parameters: {0}")]
    InvalidScryptParams(String),

    #[error("Invalid PBKDF2 iteration count: {0}")]
    InvalidPbkdf2Iterations(u32),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key file {}: {reason}", path.display())]
    InvalidKeyFile { path: PathBuf, reason: String },

    #[error("Key check encryption failed")]
    KeyCheck,

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Produce the vault's symmetric key and write it under `vault_root`.
pub fn generate_symmetric_key(
    vault_root: &Path,
    params: &KeyGenParams,
) -> Result<KeyConfig, KeyGenerationError> {
    if params.key_type != KeyType::Aes {
        return Err(KeyGenerationError::UnsupportedKeyType(params.key_type));
    }
    if params.use_passphrase {
        return Err(KeyGenerationError::PassphraseUnsupported);
    }

    let (key, kdf, salt) = match &params.key_file {
        Some(path) => (import_key(path)?, Kdf::None, None),
        None => {
            let mut seed = Zeroizing::new([0u8; KEY_LEN]);
            let mut salt = [0u8; SALT_LEN];
            rand::rng().fill_bytes(&mut seed[..]);
            rand::rng().fill_bytes(&mut salt);

            let (key, kdf) = if params.use_scrypt {
                let key = derive_scrypt(&seed[..], &salt, params)?;
                let kdf = Kdf::Scrypt {
                    n: params.scrypt_n,
                    r: params.scrypt_r,
                    p: params.scrypt_p,
                };
                (key, kdf)
            } else {
                let key = derive_pbkdf2(&seed[..], &salt, params.pbkdf2_iterations)?;
                let kdf = Kdf::Pbkdf2 {
                    iterations: params.pbkdf2_iterations,
                };
                (key, kdf)
            };
            (key, kdf, Some(BASE64.encode(salt)))
        }
    };

    let key_path = PathBuf::from(SECRET_KEY_PATH);
    let absolute = vault_root.join(&key_path);
    let encoded = Zeroizing::new(BASE64.encode(&key[..]));
    write_file_with_mode(&absolute, encoded.as_bytes(), SECRET_FILE_MODE).map_err(|source| {
        KeyGenerationError::Io {
            path: absolute.clone(),
            source,
        }
    })?;
    info!("Encryption key stored at: {}", key_path.display());

    let aes = AesConfig {
        mode: params.aes_mode,
        kdf,
        salt,
        key_hash: key_hash(&key),
        key_check: seal_key_check(&key)?,
    };

    Ok(KeyConfig {
        key_type: KeyType::Aes,
        key_path,
        aes: Some(aes),
    })
}

/// Read the vault key back from its key file.
pub fn load_key(vault_root: &Path) -> Result<Zeroizing<[u8; KEY_LEN]>, KeyGenerationError> {
    import_key(&vault_root.join(SECRET_KEY_PATH))
}

/// Check that `key` is the key described by `aes`.
pub fn verify_key(key: &[u8; KEY_LEN], aes: &AesConfig) -> bool {
    if key_hash(key) != aes.key_hash {
        return false;
    }
    let Ok(sealed) = BASE64.decode(&aes.key_check) else {
        return false;
    };
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return false;
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .is_ok_and(|plain| plain == KEY_CHECK_PLAINTEXT)
}

fn derive_scrypt(
    secret: &[u8],
    salt: &[u8],
    params: &KeyGenParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, KeyGenerationError> {
    let n = params.scrypt_n;
    if n < 2 || !n.is_power_of_two() {
        return Err(KeyGenerationError::InvalidScryptParams(format!(
            "N={n} must be a power of two greater than 1"
        )));
    }
    let log2_n = u8::try_from(n.trailing_zeros()).map_err(|_| {
        KeyGenerationError::InvalidScryptParams(format!("N={n} is too large"))
    })?;

    let scrypt_params = scrypt::Params::new(log2_n, params.scrypt_r, params.scrypt_p, KEY_LEN)
        .map_err(|e| {
            KeyGenerationError::InvalidScryptParams(format!(
                "N=2^{log2_n}, r={}, p={}: {e}",
                params.scrypt_r, params.scrypt_p
            ))
        })?;

    debug!(
        "Deriving vault key with scrypt (N=2^{log2_n}, r={}, p={})",
        params.scrypt_r, params.scrypt_p
    );
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt::scrypt(secret, salt, &scrypt_params, &mut key[..])
        .map_err(|e| KeyGenerationError::KeyDerivation(format!("scrypt: {e}")))?;
    Ok(key)
}

fn derive_pbkdf2(
    secret: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, KeyGenerationError> {
    let rounds =
        NonZeroU32::new(iterations).ok_or(KeyGenerationError::InvalidPbkdf2Iterations(iterations))?;
    debug!("Deriving vault key with PBKDF2-HMAC-SHA256 ({iterations} iterations)");
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, rounds, salt, secret, &mut key[..]);
    Ok(key)
}

fn import_key(path: &Path) -> Result<Zeroizing<[u8; KEY_LEN]>, KeyGenerationError> {
    let encoded = Zeroizing::new(fs::read_to_string(path).map_err(|source| {
        KeyGenerationError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?);
    let raw = Zeroizing::new(BASE64.decode(encoded.trim()).map_err(|e| {
        KeyGenerationError::InvalidKeyFile {
            path: path.to_path_buf(),
            reason: format!("not base64: {e}"),
        }
    })?);
    if raw.len() != KEY_LEN {
        return Err(KeyGenerationError::InvalidKeyFile {
            path: path.to_path_buf(),
            reason: format!("expected {KEY_LEN} key bytes, got {}", raw.len()),
        });
    }
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&raw);
    Ok(key)
}

fn key_hash(key: &[u8; KEY_LEN]) -> String {
    hex::encode(digest::digest(&digest::SHA256, key).as_ref())
}

fn seal_key_check(key: &[u8; KEY_LEN]) -> Result<String, KeyGenerationError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), KEY_CHECK_PLAINTEXT)
        .map_err(|_| KeyGenerationError::KeyCheck)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(sealed))
}
