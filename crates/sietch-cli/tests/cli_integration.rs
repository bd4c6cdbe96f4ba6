#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Cheap key costs so scaffolds finish quickly.
const FAST_CONFIG: &str = r#"
[defaults]
author = "config-author"

[keys]
scrypt_n = 1024
scrypt_r = 8
scrypt_p = 1
rsa_key_size = 2048
"#;

/// An isolated config directory plus a working directory for vaults.
struct TestEnv {
    config: TempDir,
    work: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let config = TempDir::new().expect("Failed to create config dir");
        fs::write(config.path().join("config.toml"), FAST_CONFIG).expect("write config");
        Self {
            config,
            work: TempDir::new().expect("Failed to create work dir"),
        }
    }

    fn sietch(&self) -> Command {
        let mut cmd = Command::cargo_bin("sietch").unwrap();
        cmd.env("SIETCH_CONFIG_DIR", self.config.path())
            .env_remove("SIETCH_AUTHOR")
            .env_remove("RUST_LOG")
            .current_dir(self.work.path());
        cmd
    }

    fn work(&self) -> &Path {
        self.work.path()
    }

    fn templates_dir(&self) -> std::path::PathBuf {
        self.config.path().join("templates")
    }
}

fn read_manifest(vault: &Path) -> serde_json::Value {
    let yaml = fs::read_to_string(vault.join("vault.yaml")).expect("manifest exists");
    // Round-trip through the JSON model for easy field access
    let config: sietch_core::VaultConfig = serde_yaml::from_str(&yaml).expect("manifest parses");
    serde_json::to_value(config).unwrap()
}

// ============================================================================
// Basic CLI tests
// ============================================================================

#[test]
fn test_help() {
    let env = TestEnv::new();
    env.sietch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Template-driven scaffolding"))
        .stdout(predicate::str::contains("scaffold"));
}

#[test]
fn test_version() {
    let env = TestEnv::new();
    env.sietch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sietch"));
}

#[test]
fn test_scaffold_requires_template() {
    let env = TestEnv::new();
    env.sietch()
        .arg("scaffold")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--template"));
}

// ============================================================================
// Templates
// ============================================================================

#[test]
fn test_list_templates() {
    let env = TestEnv::new();
    env.sietch()
        .args(["scaffold", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("photoVault"))
        .stdout(predicate::str::contains("documentVault"))
        .stdout(predicate::str::contains("backupVault"));

    assert!(env.templates_dir().join("photoVault.yaml").is_file());
}

#[test]
fn test_list_templates_json() {
    let env = TestEnv::new();
    let output = env
        .sietch()
        .args(["scaffold", "--list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let templates: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = templates
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["backupVault", "documentVault", "photoVault"]);
}

#[test]
fn test_reset_templates_restores_builtin() {
    let env = TestEnv::new();
    env.sietch().args(["scaffold", "--list"]).assert().success();

    let path = env.templates_dir().join("photoVault.yaml");
    let original = fs::read_to_string(&path).unwrap();
    fs::write(&path, "name: [broken").unwrap();

    env.sietch()
        .args(["scaffold", "--reset-templates"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored built-in templates"));
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn test_user_template_is_used() {
    let env = TestEnv::new();
    env.sietch().args(["scaffold", "--list"]).assert().success();

    let yaml = fs::read_to_string(env.templates_dir().join("documentVault.yaml"))
        .unwrap()
        .replace("name: documentVault", "name: scanVault");
    fs::write(env.templates_dir().join("scanVault.yaml"), yaml).unwrap();

    env.sietch()
        .args(["scaffold", "-t", "scanVault"])
        .assert()
        .success();
    assert!(env.work().join("scanVault/vault.yaml").is_file());
}

#[test]
fn test_unknown_template() {
    let env = TestEnv::new();
    env.sietch()
        .args(["scaffold", "--template", "musicVault"])
        .assert()
        .failure()
        .code(7)
        .stderr(predicate::str::contains("Template not found: musicVault"));
    assert_eq!(fs::read_dir(env.work()).unwrap().count(), 0);
}

#[test]
fn test_invalid_template_file() {
    let env = TestEnv::new();
    env.sietch().args(["scaffold", "--list"]).assert().success();
    fs::write(env.templates_dir().join("brokenVault.yaml"), "name: brokenVault\n").unwrap();

    env.sietch()
        .args(["scaffold", "--template", "brokenVault"])
        .assert()
        .failure()
        .code(4);
}

// ============================================================================
// Scaffolding
// ============================================================================

#[test]
fn test_scaffold_in_current_directory() {
    let env = TestEnv::new();
    env.sietch()
        .args(["scaffold", "--template", "photoVault"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully scaffolded 'photoVault' vault"))
        .stdout(predicate::str::contains("Created directory: photos"))
        .stdout(predicate::str::contains("Encryption: AES-256-GCM"));

    let vault = env.work().join("photoVault");
    assert!(vault.join("photos").is_dir());
    assert!(vault.join("thumbnails").is_dir());
    assert!(vault.join("config/defaults.yaml").is_file());
    assert!(vault.join(".sietch/keys/secret.key").is_file());
    assert!(vault.join(".sietch/sync/sync_public.pem").is_file());

    let manifest = read_manifest(&vault);
    assert_eq!(manifest["name"], "photoVault");
    assert_eq!(manifest["metadata"]["author"], "config-author");
    assert_eq!(manifest["sync"]["rsa"]["key_size"], 2048);
}

#[test]
fn test_scaffold_with_name_path_and_author() {
    let env = TestEnv::new();
    let base = env.work().join("vaults");
    env.sietch()
        .args(["scaffold", "-t", "documentVault", "-n", "My Docs", "--author", "dana"])
        .arg("--path")
        .arg(&base)
        .assert()
        .success();

    let manifest = read_manifest(&base.join("My Docs"));
    assert_eq!(manifest["name"], "My Docs");
    assert_eq!(manifest["template"]["name"], "documentVault");
    assert_eq!(manifest["metadata"]["author"], "dana");
}

#[test]
fn test_scaffold_json_output() {
    let env = TestEnv::new();
    let output = env
        .sietch()
        .args(["scaffold", "-t", "photoVault", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let vault = env.work().join("photoVault");
    assert_eq!(
        fs::canonicalize(summary["vault_path"].as_str().unwrap()).unwrap(),
        fs::canonicalize(&vault).unwrap()
    );
    assert_eq!(summary["template"], "photoVault");
    assert_eq!(summary["config"], read_manifest(&vault));
}

#[test]
fn test_quiet_prints_nothing() {
    let env = TestEnv::new();
    env.sietch()
        .args(["-q", "scaffold", "-t", "photoVault"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(env.work().join("photoVault/vault.yaml").is_file());
}

#[test]
fn test_existing_directory_fails_without_force() {
    let env = TestEnv::new();
    let vault = env.work().join("photoVault");
    fs::create_dir(&vault).unwrap();
    fs::write(vault.join("keep.txt"), "mine").unwrap();

    env.sietch()
        .args(["scaffold", "-t", "photoVault"])
        .assert()
        .failure()
        .code(6)
        .stdout(predicate::str::contains("Successfully").not())
        .stderr(predicate::str::contains("Path already exists"));

    assert_eq!(fs::read_dir(&vault).unwrap().count(), 1);
    assert_eq!(fs::read_to_string(vault.join("keep.txt")).unwrap(), "mine");
}

#[test]
fn test_force_overwrites_existing_directory() {
    let env = TestEnv::new();
    let vault = env.work().join("photoVault");
    fs::create_dir(&vault).unwrap();
    fs::write(vault.join("keep.txt"), "mine").unwrap();

    env.sietch()
        .args(["scaffold", "-t", "photoVault", "--force"])
        .assert()
        .success();
    assert!(vault.join("vault.yaml").is_file());
}

#[test]
fn test_invalid_vault_name() {
    let env = TestEnv::new();
    env.sietch()
        .args(["scaffold", "-t", "photoVault", "-n", "../escape"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Invalid vault name"));
}

#[test]
fn test_bad_key_cost_rolls_back() {
    let env = TestEnv::new();
    fs::write(
        env.config.path().join("config.toml"),
        "[keys]\nscrypt_n = 1000\nrsa_key_size = 2048\n",
    )
    .unwrap();

    env.sietch()
        .args(["scaffold", "-t", "photoVault"])
        .assert()
        .failure()
        .code(8)
        .stderr(predicate::str::contains("Key generation failed"));
    assert_eq!(fs::read_dir(env.work()).unwrap().count(), 0);
}

#[test]
fn test_broken_config_file() {
    let env = TestEnv::new();
    fs::write(env.config.path().join("config.toml"), "[keys\n").unwrap();
    env.sietch()
        .args(["scaffold", "--list"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Failed to parse config file"));
}
