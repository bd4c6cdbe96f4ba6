//! Error types for the sietch-core crate
//!
//! Each pipeline stage has its own error type; [`ScaffoldError`] is what the
//! pipeline returns and wraps the others as its source.

pub use crate::config::IncompleteConfigError;
pub use crate::crypto::keys::KeyGenerationError;
pub use crate::crypto::sync_keys::SyncKeyError;
pub use crate::fs::{FsError, ParseModeError};
pub use crate::manifest::ManifestError;
pub use crate::scaffold::ScaffoldError;
pub use crate::template::TemplateError;
