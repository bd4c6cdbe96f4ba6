//! Directory-backed template store.
//!
//! Templates live as YAML files in `<config dir>/templates/<name>.yaml`. Users add
//! their own templates by dropping files there and edit them in place; the
//! built-in templates are written on first use and can be restored with
//! [`TemplateStore::reset_default_templates`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::builtin::BUILTIN_TEMPLATES;
use super::{TemplateDescriptor, TemplateError, TemplateProvider};

/// File extension of stored templates.
pub const TEMPLATE_EXTENSION: &str = "yaml";

const ALT_TEMPLATE_EXTENSION: &str = "yml";

#[derive(Debug, Clone)]
pub struct TemplateStore {
    config_dir: PathBuf,
    templates_dir: PathBuf,
}

impl TemplateStore {
    /// A store rooted at `config_dir`, without touching the filesystem.
    pub fn at(config_dir: impl AsRef<Path>) -> Self {
        let config_dir = config_dir.as_ref().to_path_buf();
        let templates_dir = config_dir.join("templates");
        Self {
            config_dir,
            templates_dir,
        }
    }

    /// Open the store, creating the config directories and seeding the built-in
    /// templates if they are missing.
    pub fn open(config_dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let store = Self::at(config_dir);
        store.ensure_config_directories()?;
        store.ensure_default_templates()?;
        Ok(store)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    pub fn ensure_config_directories(&self) -> Result<(), TemplateError> {
        fs::create_dir_all(&self.templates_dir).map_err(|source| TemplateError::Io {
            path: self.templates_dir.clone(),
            source,
        })
    }

    /// Write every built-in template that has no file yet. Existing files are left
    /// alone so user edits survive. Returns how many templates were written.
    pub fn ensure_default_templates(&self) -> Result<usize, TemplateError> {
        let mut written = 0;
        for (name, yaml) in BUILTIN_TEMPLATES {
            let path = self.template_path(name);
            if path.exists() {
                continue;
            }
            write_template_file(&path, yaml)?;
            debug!("Seeded built-in template {name} at {}", path.display());
            written += 1;
        }
        Ok(written)
    }

    /// Overwrite the built-in templates with their shipped versions.
    ///
    /// User templates with other names are not touched.
    pub fn reset_default_templates(&self) -> Result<(), TemplateError> {
        self.ensure_config_directories()?;
        for (name, yaml) in BUILTIN_TEMPLATES {
            write_template_file(&self.template_path(name), yaml)?;
        }
        info!("Restored {} built-in templates", BUILTIN_TEMPLATES.len());
        Ok(())
    }

    /// Persist a template under its own name.
    pub fn save(&self, template: &TemplateDescriptor) -> Result<PathBuf, TemplateError> {
        template.check(&template.name)?;
        let path = self.template_path(&template.name);
        let yaml = template.to_yaml().map_err(|source| TemplateError::Parse {
            path: path.clone(),
            source,
        })?;
        write_template_file(&path, &yaml)?;
        Ok(path)
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir
            .join(format!("{name}.{TEMPLATE_EXTENSION}"))
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        [TEMPLATE_EXTENSION, ALT_TEMPLATE_EXTENSION]
            .iter()
            .map(|ext| self.templates_dir.join(format!("{name}.{ext}")))
            .find(|path| path.is_file())
    }
}

impl TemplateProvider for TemplateStore {
    fn validate(&self, name: &str) -> Result<TemplateDescriptor, TemplateError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(TemplateError::Invalid {
                name: name.to_string(),
                reason: "template names cannot contain path separators or start with '.'"
                    .to_string(),
            });
        }

        let path = self.locate(name).ok_or_else(|| TemplateError::NotFound {
            name: name.to_string(),
        })?;
        let yaml = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
            path: path.clone(),
            source,
        })?;
        let template = TemplateDescriptor::from_yaml(&yaml, &path)?;
        template.check(name)?;
        Ok(template)
    }

    fn list(&self) -> Result<Vec<TemplateDescriptor>, TemplateError> {
        let entries = match fs::read_dir(&self.templates_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(TemplateError::Io {
                    path: self.templates_dir.clone(),
                    source,
                });
            }
        };

        let mut templates = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| TemplateError::Io {
                    path: self.templates_dir.clone(),
                    source,
                })?
                .path();
            let is_template = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == TEMPLATE_EXTENSION || ext == ALT_TEMPLATE_EXTENSION);
            if !is_template || !path.is_file() {
                continue;
            }

            let loaded = fs::read_to_string(&path)
                .map_err(|source| TemplateError::Io {
                    path: path.clone(),
                    source,
                })
                .and_then(|yaml| TemplateDescriptor::from_yaml(&yaml, &path));
            match loaded {
                Ok(template) => templates.push(template),
                // One broken user template shouldn't hide the others
                Err(e) => warn!("Skipping template {}: {e}", path.display()),
            }
        }

        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }
}

fn write_template_file(path: &Path, yaml: &str) -> Result<(), TemplateError> {
    fs::write(path, yaml).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
