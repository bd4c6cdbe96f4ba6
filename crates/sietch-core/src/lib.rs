#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod layout;
pub mod manifest;
pub mod scaffold;
pub mod template;

pub use config::VaultConfig;
pub use scaffold::{ScaffoldError, ScaffoldOutcome, ScaffoldRequest, Scaffolder};
pub use template::{TemplateDescriptor, TemplateProvider, TemplateStore};
