#![deny(unsafe_code)]

mod commands;
mod config;
mod exit_code;
mod output;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sietch_core::ScaffoldError;
use sietch_core::error::TemplateError;

use crate::commands::scaffold;

/// Template-driven scaffolding for encrypted Sietch vaults
#[derive(Parser)]
#[command(name = "sietch")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # List available templates
    sietch scaffold --list

    # Create ./photoVault from the photoVault template
    sietch scaffold --template photoVault

    # Pick the vault name and location
    sietch scaffold --template photoVault --name \"My Photo Vault\" --path ~/vaults

    # Templates live in ~/.config/sietch/templates (override with SIETCH_CONFIG_DIR)
    sietch scaffold --reset-templates
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new Sietch vault from a template
    Scaffold(scaffold::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);

            // Quiet is parsed separately so it also applies when parsing the rest failed
            let is_quiet = std::env::args().any(|a| a == "-q" || a == "--quiet");
            if !is_quiet {
                eprintln!("Error: {e:#}");
            }

            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    if !cli.quiet {
        setup_tracing(cli.verbose.max(config.defaults.verbosity.unwrap_or(0)));
    }

    match cli.command {
        Commands::Scaffold(args) => scaffold::execute(&args, &config, cli.quiet),
    }
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(scaffold_err) = cause.downcast_ref::<ScaffoldError>() {
            return match scaffold_err {
                ScaffoldError::ConfigDirSetupFailed { .. } => exit_code::CONFIG_ERROR,
                ScaffoldError::TemplateNotFound { .. } => exit_code::NOT_FOUND,
                ScaffoldError::TemplateInvalid { .. } => exit_code::TEMPLATE_INVALID,
                ScaffoldError::InvalidVaultName { .. } => exit_code::USAGE_ERROR,
                ScaffoldError::PathAlreadyExists { .. } => exit_code::ALREADY_EXISTS,
                ScaffoldError::KeyGenerationFailed(_)
                | ScaffoldError::SyncKeyGenerationFailed(_) => exit_code::KEY_GENERATION_FAILED,
                ScaffoldError::DirectoryCreationFailed { source, .. }
                | ScaffoldError::FileWriteFailed { source, .. }
                | ScaffoldError::CommitFailed { source, .. }
                    if source.kind() == io::ErrorKind::PermissionDenied =>
                {
                    exit_code::PERMISSION_DENIED
                }
                _ => exit_code::GENERAL_ERROR,
            };
        }

        if cause.downcast_ref::<TemplateError>().is_some() {
            return exit_code::CONFIG_ERROR;
        }

        if cause.downcast_ref::<toml::de::Error>().is_some() {
            return exit_code::CONFIG_ERROR;
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>()
            && io_err.kind() == io::ErrorKind::PermissionDenied
        {
            return exit_code::PERMISSION_DENIED;
        }
    }

    exit_code::GENERAL_ERROR
}
