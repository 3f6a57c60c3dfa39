use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

mod commands;

/// hytale-sources - Decompiled, IDE-ready sources for the Hytale server
#[derive(Parser)]
#[command(name = "hytale-sources")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where the Hytale install for a patchline lives
    Locate {
        /// Patchline to look up (e.g., release, pre-release)
        #[arg(short, long)]
        patchline: Option<String>,
    },

    /// Fetch the server jar, decompile it if it changed, and publish it
    Sync {
        /// Patchline to sync (e.g., release, pre-release)
        #[arg(short, long)]
        patchline: Option<String>,

        /// Version selector (latest.release, latest.integration, or an exact version)
        #[arg(long)]
        version: Option<String>,

        /// Use the jar from the local launcher install instead of Maven
        #[arg(long)]
        local: bool,

        /// Override the cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Override the output repository directory
        #[arg(long)]
        repo_dir: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the artifact cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Diagnose common setup issues
    Doctor {
        /// Download the decompiler if it is missing
        #[arg(long)]
        fix: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache location
    Path,

    /// Show cache contents and size
    Info,

    /// Remove the cached server jar and sources
    Clean {
        /// Remove the whole cache directory, including the decompiler and repository
        #[arg(long)]
        all: bool,

        /// Show what would be removed without removing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., install.patchline, dependency.version)
        key: String,

        /// Value to set (empty clears an optional path)
        value: String,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Locate { patchline } => commands::locate::run(patchline),
        Commands::Sync {
            patchline,
            version,
            local,
            cache_dir,
            repo_dir,
            json,
        } => commands::sync::run(commands::sync::SyncArgs {
            patchline,
            version,
            local,
            cache_dir,
            repo_dir,
            json,
        }),
        Commands::Cache { action } => match action {
            CacheAction::Path => commands::cache::run_path(),
            CacheAction::Info => commands::cache::run_info(),
            CacheAction::Clean { all, dry_run } => commands::cache::run_clean(all, dry_run),
        },
        Commands::Doctor { fix } => commands::doctor::run(cli.verbose, fix),
        Commands::Config { action } => commands::config::run(&action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "hytale-sources", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
