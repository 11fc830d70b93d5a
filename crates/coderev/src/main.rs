//! coderev command-line interface.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coderev::config::{self, Config};
use coderev::{HttpReviewer, Pipeline};
use coderev_db::CoderevDb;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coderev", about = "Incremental source review pipeline")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create .coderev/config.yaml here and initialize the review ledger
    Init,

    /// Analyze a source tree, reviewing content never seen before
    Run {
        /// Directory to analyze (default: configured source_dir)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Inspect or edit configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Review ledger maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print one configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    /// Delete the ledger and recreate an empty schema
    Wipe {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "coderev=debug,info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Run { path } => cmd_run(path).await,
        Commands::Config { command } => cmd_config(command),
        Commands::Db {
            command: DbCommands::Wipe { yes },
        } => cmd_db_wipe(yes).await,
    }
}

fn load_config() -> Result<(PathBuf, Config)> {
    let cwd = std::env::current_dir()?;
    let path = config::find_config_file(&cwd)
        .context("run `coderev init` to create a configuration first")?;
    let config = Config::load(&path).with_context(|| format!("loading {}", path.display()))?;
    Ok((path, config))
}

async fn cmd_init() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config_path = cwd.join(config::CONFIG_DIR).join(config::CONFIG_FILE);

    if config_path.exists() {
        bail!("already initialized: {}", config_path.display());
    }

    let config = Config::default();
    config.save(&config_path)?;
    println!("Wrote {}", config_path.display());

    let db = CoderevDb::open(&config.database_path).await?;
    db.close().await;
    println!("Initialized review ledger at {}", config.database_path);

    Ok(())
}

async fn cmd_run(path: Option<PathBuf>) -> Result<()> {
    let (_, config) = load_config()?;

    let root = path.unwrap_or_else(|| PathBuf::from(&config.source_dir));
    let db = CoderevDb::open(&config.database_path).await?;
    let reviewer = HttpReviewer::new(
        config.reviewer.endpoint.as_str(),
        Duration::from_secs(config.reviewer.timeout_secs),
    )?;

    let pipeline = Pipeline::new(
        db,
        reviewer,
        config.file_pattern.as_str(),
        config.excluded_dirs.clone(),
    );
    let report = pipeline.run(&root).await?;

    println!("run {}:", report.run_id);
    println!("  discovered: {}", report.discovered);
    println!("  skipped:    {}", report.skipped);
    println!(
        "  reviewed:   {} ({} new snapshots)",
        report.reviewed, report.snapshots_created
    );
    println!("  failed:     {}", report.failed.len());
    for failure in &report.failed {
        println!("    {}: {}", failure.path, failure.reason);
    }

    if !report.is_clean() {
        bail!("{} file(s) failed; they remain unseen and will be retried next run", report.failed.len());
    }
    Ok(())
}

fn cmd_config(command: ConfigCommands) -> Result<()> {
    let (path, mut config) = load_config()?;

    match command {
        ConfigCommands::List => {
            for (key, value) in config.entries() {
                println!("{key}: {value}");
            }
        }
        ConfigCommands::Get { key } => match config.get(&key) {
            Some(value) => println!("{key}: {value}"),
            None => bail!("unknown key: {key}"),
        },
        ConfigCommands::Set { key, value } => {
            config.set(&key, &value)?;
            config.save(&path)?;
            println!("Configuration updated: {key} = {value}");
        }
    }
    Ok(())
}

async fn cmd_db_wipe(yes: bool) -> Result<()> {
    let (_, config) = load_config()?;
    let db_path = Path::new(&config.database_path);

    if db_path.exists() {
        if !yes {
            print!(
                "Found ledger at {}. Wipe all review history? [y/N] ",
                db_path.display()
            );
            std::io::stdout().flush()?;
            let mut answer = String::new();
            std::io::stdin().read_line(&mut answer)?;
            if !answer.trim().eq_ignore_ascii_case("y") {
                println!("Aborting.");
                return Ok(());
            }
        }
        std::fs::remove_file(db_path)?;
        // SQLite WAL sidecar files
        for suffix in ["-wal", "-shm"] {
            let sidecar = PathBuf::from(format!("{}{suffix}", db_path.display()));
            if sidecar.exists() {
                std::fs::remove_file(sidecar)?;
            }
        }
        println!("Ledger wiped.");
    }

    let db = CoderevDb::open(db_path).await?;
    db.close().await;
    println!("Ledger reinitialized at {}", db_path.display());
    Ok(())
}
