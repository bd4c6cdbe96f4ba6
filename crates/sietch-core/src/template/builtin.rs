use std::path::Path;

use super::{TemplateDescriptor, TemplateError, TemplateProvider};

/// Templates shipped with Sietch as `(name, yaml)` pairs.
pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("photoVault", include_str!("../../templates/photoVault.yaml")),
    ("documentVault", include_str!("../../templates/documentVault.yaml")),
    ("backupVault", include_str!("../../templates/backupVault.yaml")),
];

/// Parse every built-in template.
pub fn builtin_templates() -> Result<Vec<TemplateDescriptor>, TemplateError> {
    BUILTIN_TEMPLATES
        .iter()
        .map(|(name, yaml)| TemplateDescriptor::from_yaml(yaml, Path::new(name)))
        .collect()
}

/// An in-memory template provider.
///
/// Useful for embedding and for tests that should not touch the user's
/// configuration directory.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<TemplateDescriptor>,
}

impl TemplateSet {
    pub fn new(templates: Vec<TemplateDescriptor>) -> Self {
        Self { templates }
    }

    /// Provider over the built-in templates only.
    pub fn builtin() -> Result<Self, TemplateError> {
        builtin_templates().map(Self::new)
    }

    pub fn insert(&mut self, template: TemplateDescriptor) {
        self.templates.retain(|t| t.name != template.name);
        self.templates.push(template);
    }
}

impl TemplateProvider for TemplateSet {
    fn validate(&self, name: &str) -> Result<TemplateDescriptor, TemplateError> {
        let template = self
            .templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| TemplateError::NotFound {
                name: name.to_string(),
            })?;
        template.check(name)?;
        Ok(template.clone())
    }

    fn list(&self) -> Result<Vec<TemplateDescriptor>, TemplateError> {
        let mut templates = self.templates.clone();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }
}
