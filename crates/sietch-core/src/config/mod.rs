//! The vault configuration written to the manifest.
//!
//! [`build_vault_config`] merges the vault's identity, its encryption descriptor,
//! the template's default configuration and the provisioned key handle into a
//! single [`VaultConfig`]. It performs no I/O. The sync RSA block is filled in
//! later by RSA provisioning; [`VaultConfig::validate`] refuses a configuration
//! that still has gaps so the manifest is never written half-populated.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::keys::{AesConfig, KeyConfig, KeyType};
use crate::layout::DEFAULT_RSA_KEY_SIZE;
use crate::template::TemplateDescriptor;

/// Who the vault is and when it was created.
///
/// `id` and `created_at` are fresh for every scaffold and are the only
/// non-deterministic inputs to the assembled configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultIdentity {
    pub id: Uuid,
    pub name: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl VaultIdentity {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            author: author.into(),
            created_at: Utc::now(),
        }
    }
}

/// Encryption settings chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionSpec {
    pub key_type: KeyType,
    pub key_path: PathBuf,
    pub passphrase_protected: bool,
}

/// The full vault configuration, as persisted in `vault.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub name: String,
    pub vault_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub template: TemplateRef,
    pub encryption: EncryptionConfig,
    pub chunking: ChunkingConfig,
    pub compression: String,
    pub sync: SyncConfig,
    pub deduplication: DedupConfig,
    pub metadata: Metadata,
}

/// The template a vault was scaffolded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Key file, relative to the vault root.
    pub key_path: PathBuf,
    pub passphrase_protected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aes: Option<AesConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub strategy: String,
    pub chunk_size: String,
    pub hash_algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub mode: String,
    #[serde(default)]
    pub known_peers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsa: Option<RsaConfig>,
}

/// Sync keypair settings and the peers whose keys this vault trusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaConfig {
    #[serde(default = "default_rsa_key_size")]
    pub key_size: usize,
    #[serde(default)]
    pub trusted_peers: Vec<TrustedPeer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
    /// Hex SHA-256 of the DER public key, shared with peers for trust exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

fn default_rsa_key_size() -> usize {
    DEFAULT_RSA_KEY_SIZE
}

impl RsaConfig {
    pub fn with_key_size(key_size: usize) -> Self {
        Self {
            key_size,
            trusted_peers: Vec::new(),
            public_key_path: None,
            private_key_path: None,
            fingerprint: None,
        }
    }
}

impl Default for RsaConfig {
    fn default() -> Self {
        Self::with_key_size(DEFAULT_RSA_KEY_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedPeer {
    pub id: String,
    pub name: String,
    pub public_key: String,
    pub fingerprint: String,
    pub trusted_since: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    pub enabled: bool,
    pub strategy: String,
    pub min_chunk_size: String,
    pub max_chunk_size: String,
    pub gc_threshold: u64,
    pub index_enabled: bool,
    pub cross_file_dedup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub author: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// A required configuration field that is still empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("configuration field `{field}` is not populated")]
pub struct IncompleteConfigError {
    pub field: &'static str,
}

/// Assemble a vault configuration from its parts.
pub fn build_vault_config(
    identity: VaultIdentity,
    encryption: EncryptionSpec,
    template: &TemplateDescriptor,
    key_config: &KeyConfig,
) -> VaultConfig {
    let cfg = &template.config;
    VaultConfig {
        name: identity.name,
        vault_id: identity.id,
        created_at: identity.created_at,
        template: TemplateRef {
            name: template.name.clone(),
            version: template.version.clone(),
        },
        encryption: EncryptionConfig {
            key_type: encryption.key_type,
            key_path: encryption.key_path,
            passphrase_protected: encryption.passphrase_protected,
            aes: key_config.aes.clone(),
        },
        chunking: ChunkingConfig {
            strategy: cfg.chunking_strategy.clone(),
            chunk_size: cfg.chunk_size.clone(),
            hash_algorithm: cfg.hash_algorithm.clone(),
        },
        compression: cfg.compression.clone(),
        sync: SyncConfig {
            mode: cfg.sync_mode.clone(),
            known_peers: Vec::new(),
            rsa: cfg.rsa.clone(),
        },
        deduplication: DedupConfig {
            enabled: cfg.enable_dedup,
            strategy: cfg.dedup_strategy.clone(),
            min_chunk_size: cfg.dedup_min_size.clone(),
            max_chunk_size: cfg.dedup_max_size.clone(),
            gc_threshold: cfg.dedup_gc_threshold,
            index_enabled: cfg.dedup_index_enabled,
            cross_file_dedup: cfg.dedup_cross_file,
        },
        metadata: Metadata {
            author: identity.author,
            tags: template.tags.clone(),
        },
    }
}

impl VaultConfig {
    /// Make sure a sync RSA block exists, inserting an empty one with
    /// `default_key_size` if the template did not provide one.
    pub fn ensure_rsa_config(&mut self, default_key_size: usize) -> &mut RsaConfig {
        self.sync
            .rsa
            .get_or_insert_with(|| RsaConfig::with_key_size(default_key_size))
    }

    /// Check every field later vault operations depend on is populated.
    pub fn validate(&self) -> Result<(), IncompleteConfigError> {
        let missing = |field| Err(IncompleteConfigError { field });

        if self.name.trim().is_empty() {
            return missing("name");
        }
        if self.vault_id.is_nil() {
            return missing("vault_id");
        }
        if self.encryption.key_path.as_os_str().is_empty() {
            return missing("encryption.key_path");
        }
        if self.encryption.key_type == KeyType::Aes && self.encryption.aes.is_none() {
            return missing("encryption.aes");
        }
        for (field, value) in [
            ("chunking.strategy", &self.chunking.strategy),
            ("chunking.chunk_size", &self.chunking.chunk_size),
            ("chunking.hash_algorithm", &self.chunking.hash_algorithm),
            ("compression", &self.compression),
            ("sync.mode", &self.sync.mode),
        ] {
            if value.trim().is_empty() {
                return missing(field);
            }
        }
        if self.deduplication.enabled && self.deduplication.strategy.trim().is_empty() {
            return missing("deduplication.strategy");
        }

        let Some(rsa) = &self.sync.rsa else {
            return missing("sync.rsa");
        };
        if rsa.public_key_path.is_none() {
            return missing("sync.rsa.public_key_path");
        }
        if rsa.private_key_path.is_none() {
            return missing("sync.rsa.private_key_path");
        }
        if rsa.fingerprint.as_deref().is_none_or(str::is_empty) {
            return missing("sync.rsa.fingerprint");
        }

        Ok(())
    }
}
