//! On-disk layout of a Sietch vault and the fixed defaults new vaults start from.
//!
//! ```text
//! <vault>/
//! +-- vault.yaml              # manifest (VaultConfig)
//! +-- data/
//! +-- .sietch/
//!     +-- keys/secret.key     # base64 AES key
//!     +-- sync/sync_private.pem
//!     +-- sync/sync_public.pem
//!     +-- manifests/
//!     +-- chunks/
//! ```
//!
//! Every path here is relative to the vault root. Other vault operations rely on
//! this layout, so changing it is a format break.

/// Directories every vault has, independent of its template.
pub const BASE_DIRECTORIES: &[&str] = &[
    ".sietch",
    ".sietch/keys",
    ".sietch/sync",
    ".sietch/manifests",
    ".sietch/chunks",
    "data",
];

/// Symmetric key material.
pub const SECRET_KEY_PATH: &str = ".sietch/keys/secret.key";

pub const SYNC_PRIVATE_KEY_PATH: &str = ".sietch/sync/sync_private.pem";
pub const SYNC_PUBLIC_KEY_PATH: &str = ".sietch/sync/sync_public.pem";

/// Manifest file at the vault root.
pub const MANIFEST_FILE: &str = "vault.yaml";

/// Mode for template files that declare none, or an unparsable one.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mode for private key material.
pub const SECRET_FILE_MODE: u32 = 0o600;

/// scrypt cost parameter N (must be a power of two).
pub const DEFAULT_SCRYPT_N: u64 = 32768;
pub const DEFAULT_SCRYPT_R: u32 = 8;
pub const DEFAULT_SCRYPT_P: u32 = 1;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// RSA modulus size for the sync keypair when the template does not pick one.
pub const DEFAULT_RSA_KEY_SIZE: usize = 4096;

/// Smallest RSA modulus accepted for sync keys.
pub const MIN_RSA_KEY_SIZE: usize = 1024;
