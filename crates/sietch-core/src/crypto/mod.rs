//! Key material for new vaults.

pub mod keys;
pub mod sync_keys;

use std::path::Path;

use crate::config::VaultConfig;

pub use keys::{
    AesConfig, AesMode, Kdf, KeyConfig, KeyGenParams, KeyGenerationError, KeyType,
    generate_symmetric_key, load_key, verify_key,
};
pub use sync_keys::{SyncKeyError, generate_rsa_keypair};

/// Provisions the cryptographic material a new vault needs.
///
/// The scaffold pipeline goes through this trait so callers can swap in
/// hardware-backed or precomputed keys.
pub trait KeyProvisioner: Send + Sync {
    /// Write the vault's symmetric key under `vault_root` and describe it.
    fn generate_symmetric_key(
        &self,
        vault_root: &Path,
        params: &KeyGenParams,
    ) -> Result<KeyConfig, KeyGenerationError>;

    /// Write the sync keypair under `vault_root` and record it in `config.sync.rsa`.
    fn generate_rsa_keypair(
        &self,
        vault_root: &Path,
        config: &mut VaultConfig,
    ) -> Result<(), SyncKeyError>;
}

/// Software key generation backed by the OS random number generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKeyProvisioner;

impl KeyProvisioner for DefaultKeyProvisioner {
    fn generate_symmetric_key(
        &self,
        vault_root: &Path,
        params: &KeyGenParams,
    ) -> Result<KeyConfig, KeyGenerationError> {
        generate_symmetric_key(vault_root, params)
    }

    fn generate_rsa_keypair(
        &self,
        vault_root: &Path,
        config: &mut VaultConfig,
    ) -> Result<(), SyncKeyError> {
        generate_rsa_keypair(vault_root, config)
    }
}
