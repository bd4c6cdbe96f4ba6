//! The vault scaffolding pipeline.
//!
//! [`Scaffolder::scaffold`] turns a template name into a complete vault:
//!
//! 1. resolve the template and the target path
//! 2. lay down the base skeleton and the template's directories and files
//! 3. generate the symmetric vault key
//! 4. assemble the configuration, inject the RSA defaults and generate the sync keypair
//! 5. write `vault.yaml`
//!
//! A fresh target is built in a hidden staging directory next to it and renamed
//! into place once the manifest is on disk, so a failure at any step leaves the
//! target untouched. With `force` over an existing vault the build happens in
//! place and a failure removes the target.

mod path;
mod rollback;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::{
    EncryptionSpec, IncompleteConfigError, VaultConfig, VaultIdentity, build_vault_config,
};
use crate::crypto::{
    DefaultKeyProvisioner, KeyGenParams, KeyGenerationError, KeyProvisioner, SyncKeyError,
};
use crate::fs::{FsError, MaterializeReport, materialize};
use crate::layout::DEFAULT_RSA_KEY_SIZE;
use crate::manifest::{ManifestError, ManifestWriter, YamlManifestWriter};
use crate::template::{TemplateDescriptor, TemplateError, TemplateProvider, TemplateStore};

pub use path::{TargetState, VaultTarget, resolve_vault_path};
pub use rollback::cleanup_on_error;

use rollback::BuildDir;

/// Errors that can occur while scaffolding a vault
#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error("Failed to set up config directory {}: {source}", path.display())]
    ConfigDirSetupFailed {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("Template '{name}' cannot be used: {source}")]
    TemplateInvalid {
        name: String,
        #[source]
        source: TemplateError,
    },

    #[error("Invalid vault name '{name}': {reason}")]
    InvalidVaultName { name: String, reason: &'static str },

    #[error("Path already exists: {}", path.display())]
    PathAlreadyExists { path: PathBuf },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file {}: {source}", path.display())]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(#[source] KeyGenerationError),

    #[error("Sync key generation failed: {0}")]
    SyncKeyGenerationFailed(#[source] SyncKeyError),

    #[error("Vault configuration is incomplete: {0}")]
    IncompleteConfiguration(#[source] IncompleteConfigError),

    #[error("Failed to write vault manifest: {0}")]
    ManifestWriteFailed(#[source] ManifestError),

    #[error("Failed to move finished vault into {}: {source}", path.display())]
    CommitFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<FsError> for ScaffoldError {
    fn from(e: FsError) -> Self {
        match e {
            FsError::CreateDirectory { path, source } => {
                ScaffoldError::DirectoryCreationFailed { path, source }
            }
            FsError::WriteFile { path, source } => ScaffoldError::FileWriteFailed { path, source },
        }
    }
}

impl ScaffoldError {
    fn from_template(name: &str, e: TemplateError) -> Self {
        match e {
            TemplateError::NotFound { name } => ScaffoldError::TemplateNotFound { name },
            other => ScaffoldError::TemplateInvalid {
                name: name.to_string(),
                source: other,
            },
        }
    }
}

/// A request to scaffold one vault.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaffoldRequest {
    /// Template to build from. Required.
    pub template_name: String,
    /// Directory name of the vault. Empty means the template's name.
    pub vault_name: String,
    /// Directory the vault is created in. Empty means the working directory.
    pub base_path: PathBuf,
    /// Build over an existing non-empty directory.
    pub force: bool,
    /// Recorded in the manifest. Empty means the template's author.
    pub author: String,
}

impl ScaffoldRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, vault_name: impl Into<String>) -> Self {
        self.vault_name = vault_name.into();
        self
    }

    pub fn in_dir(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

/// A successfully scaffolded vault.
#[derive(Debug, Clone)]
pub struct ScaffoldOutcome {
    pub vault_path: PathBuf,
    pub manifest_path: PathBuf,
    pub config: VaultConfig,
    pub template: TemplateDescriptor,
    pub report: MaterializeReport,
}

/// Builder and runner for the scaffold pipeline.
///
/// # Example
///
/// ```no_run
/// use sietch_core::{ScaffoldRequest, Scaffolder};
///
/// let scaffolder = Scaffolder::from_config_dir("/home/me/.config/sietch")?;
/// let outcome = scaffolder.scaffold(&ScaffoldRequest::new("photoVault").in_dir("/srv"))?;
/// println!("vault created at {}", outcome.vault_path.display());
/// # Ok::<(), sietch_core::ScaffoldError>(())
/// ```
pub struct Scaffolder {
    templates: Box<dyn TemplateProvider>,
    keys: Box<dyn KeyProvisioner>,
    manifest: Box<dyn ManifestWriter>,
    key_params: KeyGenParams,
    rsa_key_size: usize,
}

impl Scaffolder {
    /// A scaffolder resolving templates through `templates`, with default key
    /// generation and manifest writing.
    pub fn new(templates: impl TemplateProvider + 'static) -> Self {
        Self {
            templates: Box::new(templates),
            keys: Box::new(DefaultKeyProvisioner),
            manifest: Box::new(YamlManifestWriter),
            key_params: KeyGenParams::default(),
            rsa_key_size: DEFAULT_RSA_KEY_SIZE,
        }
    }

    /// Open the template store in `config_dir`, seeding the built-in templates.
    pub fn from_config_dir(config_dir: impl AsRef<Path>) -> Result<Self, ScaffoldError> {
        let config_dir = config_dir.as_ref();
        let store = TemplateStore::open(config_dir).map_err(|source| {
            ScaffoldError::ConfigDirSetupFailed {
                path: config_dir.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::new(store))
    }

    /// Parameters for the symmetric key (scrypt cost, key file import).
    pub fn with_key_params(mut self, params: KeyGenParams) -> Self {
        self.key_params = params;
        self
    }

    /// RSA modulus size used when the template does not set one.
    pub fn with_rsa_key_size(mut self, bits: usize) -> Self {
        self.rsa_key_size = bits;
        self
    }

    pub fn with_key_provisioner(mut self, keys: impl KeyProvisioner + 'static) -> Self {
        self.keys = Box::new(keys);
        self
    }

    pub fn with_manifest_writer(mut self, writer: impl ManifestWriter + 'static) -> Self {
        self.manifest = Box::new(writer);
        self
    }

    pub fn templates(&self) -> &dyn TemplateProvider {
        self.templates.as_ref()
    }

    /// Run the pipeline for `request`.
    ///
    /// # Errors
    /// Template and path errors are returned before anything is written. Every
    /// later error is returned after the partially built vault has been removed.
    #[instrument(level = "debug", skip(self), fields(template = %request.template_name))]
    pub fn scaffold(&self, request: &ScaffoldRequest) -> Result<ScaffoldOutcome, ScaffoldError> {
        let template = self
            .templates
            .validate(&request.template_name)
            .map_err(|e| ScaffoldError::from_template(&request.template_name, e))?;
        let vault_name = if request.vault_name.is_empty() {
            template.name.clone()
        } else {
            request.vault_name.clone()
        };
        let target = resolve_vault_path(&request.base_path, &vault_name, request.force)?;
        debug!("Resolved vault path {}", target.path.display());

        let build = BuildDir::prepare(&target)?;
        let author = if request.author.is_empty() {
            template.author.clone()
        } else {
            request.author.clone()
        };
        let identity = VaultIdentity::new(vault_name, author);
        let built = self
            .build(build.root(), &template, identity)
            .and_then(|(config, report)| Ok((build.commit()?, config, report)));

        match built {
            Ok((vault_path, config, report)) => {
                info!("Vault '{}' created at {}", config.name, vault_path.display());
                Ok(ScaffoldOutcome {
                    manifest_path: crate::manifest::manifest_path(&vault_path),
                    vault_path,
                    config,
                    template,
                    report,
                })
            }
            Err(e) => {
                debug!("Scaffold failed, rolling back: {e}");
                build.rollback();
                Err(e)
            }
        }
    }

    fn build(
        &self,
        root: &Path,
        template: &TemplateDescriptor,
        identity: VaultIdentity,
    ) -> Result<(VaultConfig, MaterializeReport), ScaffoldError> {
        let report = materialize(root, template)?;
        debug!("Vault skeleton created in {}", root.display());

        let key_config = self
            .keys
            .generate_symmetric_key(root, &self.key_params)
            .map_err(ScaffoldError::KeyGenerationFailed)?;
        debug!("Symmetric key generated");

        let encryption = EncryptionSpec {
            key_type: key_config.key_type,
            key_path: key_config.key_path.clone(),
            passphrase_protected: self.key_params.use_passphrase,
        };
        let mut config = build_vault_config(identity, encryption, template, &key_config);
        config.ensure_rsa_config(self.rsa_key_size);
        self.keys
            .generate_rsa_keypair(root, &mut config)
            .map_err(ScaffoldError::SyncKeyGenerationFailed)?;
        debug!("Sync keypair generated");

        config
            .validate()
            .map_err(ScaffoldError::IncompleteConfiguration)?;
        self.manifest
            .write(root, &config)
            .map_err(ScaffoldError::ManifestWriteFailed)?;

        Ok((config, report))
    }
}
