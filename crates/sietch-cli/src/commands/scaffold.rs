use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::debug;

use sietch_core::fs::format_mode;
use sietch_core::layout::DEFAULT_FILE_MODE;
use sietch_core::{
    ScaffoldError, ScaffoldOutcome, ScaffoldRequest, Scaffolder, TemplateProvider, TemplateStore,
    VaultConfig,
};

use crate::config::{self, Config};
use crate::output::{create_table, format_encryption, format_tags};

#[derive(ClapArgs, Clone, Debug)]
pub struct Args {
    /// Template to use for scaffolding
    #[arg(short, long, required_unless_present_any = ["list", "reset_templates"])]
    pub template: Option<String>,

    /// Name for the vault directory (defaults to the template name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Directory to create the vault in (defaults to the current directory)
    #[arg(short, long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Build the vault even if the directory exists and is not empty
    #[arg(short, long)]
    pub force: bool,

    /// List available templates
    #[arg(short, long, conflicts_with_all = ["name", "path", "force"])]
    pub list: bool,

    /// Restore the built-in templates to their shipped versions
    #[arg(long)]
    pub reset_templates: bool,

    /// Author recorded in the vault metadata (defaults to the template author)
    #[arg(long, env = "SIETCH_AUTHOR")]
    pub author: Option<String>,

    /// Import the vault key from a base64 key file instead of generating one
    #[arg(long, value_name = "FILE")]
    pub key_file: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: &Args, config: &Config, quiet: bool) -> Result<()> {
    let config_dir = config::config_dir()?;
    debug!("Using config directory {}", config_dir.display());

    let store = TemplateStore::open(&config_dir)
        .map_err(|source| ScaffoldError::ConfigDirSetupFailed {
            path: config_dir.clone(),
            source,
        })
        .context("Failed to prepare template directory")?;

    if args.reset_templates {
        store
            .reset_default_templates()
            .context("Failed to reset built-in templates")?;
        if !quiet && !args.json {
            println!(
                "Restored built-in templates in {}",
                store.templates_dir().display()
            );
        }
    }

    if args.list {
        return list_templates(&store, args.json);
    }

    let Some(template_name) = args.template.as_deref() else {
        // Only reachable with --reset-templates alone
        return Ok(());
    };

    let author = args
        .author
        .clone()
        .or_else(|| config.defaults.author.clone())
        .unwrap_or_default();
    let mut key_params = config.keys.key_params();
    key_params.key_file.clone_from(&args.key_file);

    let request = ScaffoldRequest::new(template_name)
        .with_name(args.name.clone().unwrap_or_default())
        .in_dir(args.path.clone().unwrap_or_default())
        .with_force(args.force)
        .with_author(author);

    let outcome = Scaffolder::new(store)
        .with_key_params(key_params)
        .with_rsa_key_size(config.keys.rsa_key_size())
        .scaffold(&request)
        .with_context(|| format!("Failed to scaffold vault from template '{template_name}'"))?;

    for (path, mode) in &outcome.report.mode_fallbacks {
        eprintln!(
            "Warning: invalid mode '{mode}' for {}, used {}",
            path.display(),
            format_mode(DEFAULT_FILE_MODE)
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&Summary::from(&outcome))?);
    } else if !quiet {
        print_summary(&outcome);
    }
    Ok(())
}

fn list_templates(store: &TemplateStore, json: bool) -> Result<()> {
    let templates = store.list().context("Failed to list templates")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    if templates.is_empty() {
        println!("No templates found in {}", store.templates_dir().display());
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Name", "Version", "Description", "Tags"]);
    for template in &templates {
        table.add_row(vec![
            template.name.clone(),
            template.version.clone(),
            template.description.clone(),
            format_tags(&template.tags),
        ]);
    }
    println!("{table}");
    println!(
        "\nTemplates are read from {}",
        store.templates_dir().display()
    );
    Ok(())
}

fn print_summary(outcome: &ScaffoldOutcome) {
    let template = &outcome.template;
    let config = &outcome.config;

    println!("Loading template: {}", template.name);
    if !template.description.is_empty() {
        println!("Description: {}", template.description);
    }
    for dir in &outcome.report.directories {
        println!("Created directory: {}", dir.display());
    }
    for (file, mode) in &outcome.report.files {
        println!("Created file: {} ({})", file.display(), format_mode(*mode));
    }
    println!(
        "Encryption key stored at: {}",
        outcome.vault_path.join(&config.encryption.key_path).display()
    );

    println!(
        "\nSuccessfully scaffolded '{}' vault at: {}",
        template.name,
        outcome.vault_path.display()
    );
    println!("Template: {} (v{})", template.name, template.version);
    println!("Encryption: {}", format_encryption(config));
    println!(
        "Chunking: {} ({} chunks)",
        config.chunking.strategy, config.chunking.chunk_size
    );
    if config.deduplication.enabled {
        println!(
            "Deduplication: enabled ({} strategy)",
            config.deduplication.strategy
        );
    }
    println!("Compression: {}", config.compression);
    if let Some(fingerprint) = config.sync.rsa.as_ref().and_then(|r| r.fingerprint.as_deref()) {
        println!("Sync key fingerprint: {fingerprint}");
    }
    println!("\nYour vault is ready to use! Add files with: sietch add <files>");
}

/// JSON form of a scaffold outcome.
#[derive(Serialize)]
struct Summary<'a> {
    vault_path: &'a Path,
    manifest_path: &'a Path,
    template: &'a str,
    template_version: &'a str,
    created_directories: &'a [PathBuf],
    created_files: Vec<&'a Path>,
    mode_fallbacks: Vec<&'a Path>,
    config: &'a VaultConfig,
}

impl<'a> From<&'a ScaffoldOutcome> for Summary<'a> {
    fn from(outcome: &'a ScaffoldOutcome) -> Self {
        Self {
            vault_path: &outcome.vault_path,
            manifest_path: &outcome.manifest_path,
            template: &outcome.template.name,
            template_version: &outcome.template.version,
            created_directories: &outcome.report.directories,
            created_files: outcome.report.files.iter().map(|(p, _)| p.as_path()).collect(),
            mode_fallbacks: outcome
                .report
                .mode_fallbacks
                .iter()
                .map(|(p, _)| p.as_path())
                .collect(),
            config: &outcome.config,
        }
    }
}
