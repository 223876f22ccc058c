// SPDX-License-Identifier: MIT

//! Skyorg CLI: 3DSky File Organizer

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use skyorg::catalog::CatalogClient;
use skyorg::config::AppConfig;
use skyorg::history::History;
use skyorg::merger::Merger;
use skyorg::organizer::Organizer;
use skyorg::progress::LogReporter;
use skyorg::Result;

const HISTORY_FILE: &str = "skyorg_history.jsonl";

/// Skyorg CLI - 3DSky File Organizer
#[derive(Parser, Debug)]
#[command(name = "skyorg")]
#[command(version = "1.2.0")]
#[command(about = "Organize 3DSky model archives into categorized folders", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Organize archives from a source directory into categorized folders
    Organize {
        /// Source directory containing downloaded archives
        #[arg(short, long)]
        source: PathBuf,

        /// Destination directory for the organized tree
        #[arg(short, long)]
        destination: PathBuf,

        /// Show what would move without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Skip catalog reachability check on startup
        #[arg(long)]
        skip_health_check: bool,
    },

    /// Merge organized folder trees and refresh their summaries
    Merge {
        /// Source trees to merge (repeatable)
        #[arg(short, long, required = true)]
        source: Vec<PathBuf>,

        /// Target tree that receives the union
        #[arg(short, long)]
        target: PathBuf,

        /// Show what would move without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the web dashboard
    Gui {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check catalog API reachability
    Status,

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent moves
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Undo recent moves
    Undo {
        /// Number of moves to undo
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !cli.quiet {
        info!("Skyorg v1.2.0 - 3DSky File Organizer");
    }

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Organize {
            source,
            destination,
            dry_run,
            skip_health_check,
        } => run_organize(config, source, destination, dry_run, skip_health_check).await,
        Commands::Merge {
            source,
            target,
            dry_run,
        } => run_merge(source, target, dry_run),
        Commands::Gui { host, port } => run_gui(config, host, port).await,
        Commands::Status => run_status(config).await,
        Commands::History { action } => run_history_command(action),
        Commands::Config { action } => run_config_command(config, action, &cli.config),
    }
}

async fn run_organize(
    config: AppConfig,
    source: PathBuf,
    destination: PathBuf,
    dry_run: bool,
    skip_health_check: bool,
) -> Result<()> {
    if dry_run {
        warn!("DRY RUN MODE - files will not be moved");
    }

    if !skip_health_check {
        let client = CatalogClient::new(&config.catalog);
        info!("Checking catalog availability...");
        match client.health_check().await {
            Ok(()) => info!("Catalog is reachable"),
            Err(e) => warn!("Catalog check failed ({}); lookups may not succeed", e),
        }
    }

    let organizer = Organizer::new(config, PathBuf::from(HISTORY_FILE), dry_run);
    let outcome = organizer
        .run(&source, &destination, Arc::new(LogReporter))
        .await?;

    println!(
        "Organized {}/{} archives ({} unplaced)",
        outcome.organized,
        outcome.total,
        outcome.not_found.len()
    );
    for (id, reason) in &outcome.not_found {
        println!("  {}: {}", id, reason);
    }

    Ok(())
}

fn run_merge(sources: Vec<PathBuf>, target: PathBuf, dry_run: bool) -> Result<()> {
    if dry_run {
        warn!("DRY RUN MODE - files will not be moved");
    }

    let merger = Merger::new(dry_run);
    let outcome = merger.merge(&sources, &target, Arc::new(LogReporter))?;

    println!(
        "Merged into {:?}: {} moved, {} duplicates dropped, {} renamed, {} summaries refreshed",
        target, outcome.moved, outcome.duplicates, outcome.renamed, outcome.summaries_refreshed
    );

    Ok(())
}

async fn run_gui(config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = config;
    if let Some(host) = host {
        config.web.host = host;
    }
    if let Some(port) = port {
        config.web.port = port;
    }

    skyorg::web::start_server(config, PathBuf::from(HISTORY_FILE)).await
}

async fn run_status(config: AppConfig) -> Result<()> {
    let client = CatalogClient::new(&config.catalog);

    println!("Skyorg v1.2.0 Status");
    println!("====================");

    match client.health_check().await {
        Ok(()) => println!("Catalog: reachable at {}", config.catalog.api_url),
        Err(e) => println!("Catalog: error - {}", e),
    }

    let history = History::new(PathBuf::from(HISTORY_FILE));
    let entries = history.read_all()?;
    println!("History: {} recorded moves", entries.len());

    println!("\nConfiguration:");
    println!("  Models directory: {}", config.organizer.models_dirname);
    println!("  Workers: {}", config.organizer.workers);
    println!("  Request delay: {}ms", config.catalog.request_delay_ms);
    println!("  Web UI: {}:{}", config.web.host, config.web.port);

    Ok(())
}

fn run_history_command(action: HistoryCommands) -> Result<()> {
    let history = History::new(PathBuf::from(HISTORY_FILE));

    match action {
        HistoryCommands::List { count } => {
            let entries = history.get_recent(count)?;
            println!("Recent history ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                println!(
                    "  {} {} -> {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.original_path.display(),
                    entry.new_path.display(),
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let entries = history.get_undoable()?;
            let to_undo: Vec<_> = entries.into_iter().rev().take(count).collect();

            if to_undo.is_empty() {
                println!("No moves to undo");
                return Ok(());
            }

            for entry in to_undo {
                if entry.new_path.exists() {
                    if dry_run {
                        println!(
                            "Would undo: {} -> {}",
                            entry.new_path.display(),
                            entry.original_path.display()
                        );
                    } else {
                        skyorg::fsops::move_file(&entry.new_path, &entry.original_path)?;
                        history.mark_undone(&entry.id)?;
                        println!(
                            "Undone: {} -> {}",
                            entry.new_path.display(),
                            entry.original_path.display()
                        );
                    }
                } else {
                    warn!(
                        "File not found (may have been moved/deleted): {:?}",
                        entry.new_path
                    );
                }
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            let default_config = AppConfig::default();
            default_config.save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            println!("Configuration at {:?} is valid", config_path);
            println!("  Catalog API: {}", config.catalog.api_url);
            println!("  Models directory: {}", config.organizer.models_dirname);
            println!("  Workers: {}", config.organizer.workers);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_organize_command() {
        let cli = Cli::try_parse_from([
            "skyorg", "organize", "--source", "/tmp/in", "--destination", "/tmp/out", "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Organize {
                source,
                destination,
                dry_run,
                ..
            } => {
                assert!(dry_run);
                assert_eq!(source, PathBuf::from("/tmp/in"));
                assert_eq!(destination, PathBuf::from("/tmp/out"));
            }
            _ => panic!("Expected Organize command"),
        }
    }

    #[test]
    fn test_cli_merge_accepts_multiple_sources() {
        let cli = Cli::try_parse_from([
            "skyorg", "merge", "--source", "/a", "--source", "/b", "--target", "/t",
        ])
        .unwrap();

        match cli.command {
            Commands::Merge { source, target, .. } => {
                assert_eq!(source, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
                assert_eq!(target, PathBuf::from("/t"));
            }
            _ => panic!("Expected Merge command"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["skyorg"]).is_err());
    }
}
