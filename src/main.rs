//! Binary entry point for cookbook.
//!
//! This binary provides the CLI interface for the recipe store.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use cookbook::CookbookConfig;
use cookbook::cli;
use cookbook::observability;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Cookbook - a folder and recipe store with cascading deletes and search.
#[derive(Parser)]
#[command(name = "cookbook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "COOKBOOK_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Store file, overriding the configured one.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Open the store, seeding it from fixtures if it is empty.
    Init {
        /// Fixture tree to seed from.
        #[arg(long)]
        seed_dir: Option<PathBuf>,
    },

    /// Show record counts.
    Status,

    /// List root folders.
    Folders,

    /// Print a folder and everything below it.
    ShowFolder {
        /// Folder id.
        id: String,
    },

    /// Print a recipe.
    ShowRecipe {
        /// Recipe id.
        id: String,
    },

    /// Search recipes by substring.
    Search {
        /// The search query; empty lists every recipe.
        #[arg(default_value = "")]
        query: String,

        /// Maximum number of results.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete a folder with all its sub-folders and recipes.
    DeleteFolder {
        /// Folder id.
        id: String,

        /// Report what would be deleted without deleting.
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a recipe with all its sections and images.
    DeleteRecipe {
        /// Recipe id.
        id: String,

        /// Report what would be deleted without deleting.
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a recipe as fixture JSON.
    ExportRecipe {
        /// Recipe id.
        id: String,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    let config = match &cli.store {
        Some(path) => config.with_store_path(path),
        None => config,
    };

    if let Err(e) = observability::init_from_config(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: CookbookConfig) -> cookbook::Result<()> {
    let store = cli::open_store(&config)?;

    match command {
        Commands::Init { seed_dir } => {
            let seed_dir = seed_dir.or_else(|| config.seed_dir.clone());
            cli::cmd_init(&store, seed_dir.as_deref()).await
        },
        Commands::Status => cli::cmd_status(&store).await,
        Commands::Folders => cli::cmd_folders(&store).await,
        Commands::ShowFolder { id } => cli::cmd_show_folder(&store, &id).await,
        Commands::ShowRecipe { id } => cli::cmd_show_recipe(&store, &id).await,
        Commands::Search { query, limit } => {
            let limit = limit.unwrap_or(config.search.result_limit);
            cli::cmd_search(&store, &query, limit, config.search.excerpt_len).await
        },
        Commands::DeleteFolder { id, dry_run } => cli::cmd_delete_folder(&store, &id, dry_run).await,
        Commands::DeleteRecipe { id, dry_run } => cli::cmd_delete_recipe(&store, &id, dry_run).await,
        Commands::ExportRecipe { id, output } => {
            cli::cmd_export_recipe(&store, &id, output.as_deref()).await
        },
    }
}

/// Loads configuration, applying `COOKBOOK_*` environment overrides.
fn load_config(path: Option<&Path>) -> cookbook::Result<CookbookConfig> {
    let config = match path {
        Some(path) => CookbookConfig::load_from_file(path)?,
        None => CookbookConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}
