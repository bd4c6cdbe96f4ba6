//! Vault templates: named, reusable descriptions of a vault's initial layout and
//! default configuration.
//!
//! A template is read-only once loaded. The scaffold pipeline only ever asks a
//! [`TemplateProvider`] to resolve a name into a validated [`TemplateDescriptor`].

mod builtin;
mod store;

use std::collections::{BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RsaConfig;

pub use builtin::{BUILTIN_TEMPLATES, TemplateSet, builtin_templates};
pub use store::{TEMPLATE_EXTENSION, TemplateStore};

/// Errors raised while loading or validating templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No template with that name exists in the provider.
    #[error("Template not found: {name}")]
    NotFound { name: String },

    /// The template exists but cannot be used to scaffold a vault.
    #[error("Invalid template '{name}': {reason}")]
    Invalid { name: String, reason: String },

    /// The template file is not valid YAML for a template descriptor.
    #[error("Failed to parse template {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Filesystem error while reading or writing the template store.
    #[error("Template store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves template names into descriptors.
pub trait TemplateProvider: Send + Sync {
    /// Load the named template and check that it can be scaffolded.
    fn validate(&self, name: &str) -> Result<TemplateDescriptor, TemplateError>;

    /// All templates the provider knows about, sorted by name.
    fn list(&self) -> Result<Vec<TemplateDescriptor>, TemplateError>;
}

/// A named vault template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Created in declared order, relative to the vault root.
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    #[serde(default)]
    pub files: Vec<TemplateFile>,
    /// Default vault configuration.
    pub config: TemplateConfig,
}

/// A file the template places inside every new vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub path: PathBuf,
    #[serde(default)]
    pub content: String,
    /// Octal permission string such as `"0600"`. Empty means the default mode.
    #[serde(default)]
    pub mode: String,
}

/// The template's default vault configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub chunking_strategy: String,
    pub chunk_size: String,
    pub hash_algorithm: String,
    pub compression: String,
    pub sync_mode: String,
    #[serde(default)]
    pub enable_dedup: bool,
    #[serde(default)]
    pub dedup_strategy: String,
    #[serde(default)]
    pub dedup_min_size: String,
    #[serde(default)]
    pub dedup_max_size: String,
    #[serde(default)]
    pub dedup_gc_threshold: u64,
    #[serde(default)]
    pub dedup_index_enabled: bool,
    #[serde(default)]
    pub dedup_cross_file: bool,
    /// Sync keypair settings. Absent means the scaffold default is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsa: Option<RsaConfig>,
}

impl TemplateDescriptor {
    /// Parse a descriptor from YAML text.
    pub fn from_yaml(yaml: &str, origin: &Path) -> Result<Self, TemplateError> {
        serde_yaml::from_str(yaml).map_err(|source| TemplateError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check the descriptor is usable for a scaffold requested as `requested`.
    pub fn check(&self, requested: &str) -> Result<(), TemplateError> {
        let invalid = |reason: String| TemplateError::Invalid {
            name: requested.to_string(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("template name is empty".to_string()));
        }
        if self.name != requested {
            return Err(invalid(format!("template declares name '{}'", self.name)));
        }
        if self.version.trim().is_empty() {
            return Err(invalid("template version is empty".to_string()));
        }

        let cfg = &self.config;
        for (field, value) in [
            ("chunking_strategy", &cfg.chunking_strategy),
            ("chunk_size", &cfg.chunk_size),
            ("hash_algorithm", &cfg.hash_algorithm),
            ("compression", &cfg.compression),
            ("sync_mode", &cfg.sync_mode),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("config.{field} is empty")));
            }
        }
        if cfg.enable_dedup && cfg.dedup_strategy.trim().is_empty() {
            return Err(invalid(
                "config.dedup_strategy is required when dedup is enabled".to_string(),
            ));
        }

        for dir in &self.directories {
            check_relative(dir).map_err(|reason| invalid(format!("directory {reason}")))?;
        }

        let mut seen = HashSet::new();
        for file in &self.files {
            check_relative(&file.path).map_err(|reason| invalid(format!("file {reason}")))?;
            if !seen.insert(&file.path) {
                return Err(invalid(format!(
                    "file {} is declared twice",
                    file.path.display()
                )));
            }
        }

        Ok(())
    }
}

/// Template paths must stay inside the vault.
fn check_relative(path: &Path) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("path is empty".to_string());
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(format!(
                    "{} must be relative to the vault root",
                    path.display()
                ));
            }
        }
    }
    Ok(())
}
