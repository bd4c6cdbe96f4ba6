use std::collections::BTreeSet;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use sietch_core::crypto::{AesMode, KeyType};
use sietch_core::VaultConfig;

/// Create a styled table for output
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

/// Human-readable name of a vault's encryption
pub fn format_encryption(config: &VaultConfig) -> &'static str {
    match (config.encryption.key_type, &config.encryption.aes) {
        (KeyType::Aes, Some(aes)) if aes.mode == AesMode::Cbc => "AES-256-CBC",
        (KeyType::Aes, _) => "AES-256-GCM",
        (KeyType::Gpg, _) => "GPG",
        (KeyType::None, _) => "none",
    }
}

pub fn format_tags(tags: &BTreeSet<String>) -> String {
    if tags.is_empty() {
        "-".to_string()
    } else {
        tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}
