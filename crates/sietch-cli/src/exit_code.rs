//! Exit codes for the CLI.
//!
//! These follow common Unix conventions and provide meaningful
//! status information for scripting and automation.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Command-line usage error (bad arguments, invalid vault name)
pub const USAGE_ERROR: u8 = 2;

/// Config file or config directory could not be read or set up
pub const CONFIG_ERROR: u8 = 3;

/// Template exists but cannot be used
pub const TEMPLATE_INVALID: u8 = 4;

/// Permission denied while writing the vault
pub const PERMISSION_DENIED: u8 = 5;

/// Target path already exists and is not empty
pub const ALREADY_EXISTS: u8 = 6;

/// Template not found
pub const NOT_FOUND: u8 = 7;

/// Key or sync keypair generation failed
pub const KEY_GENERATION_FAILED: u8 = 8;
