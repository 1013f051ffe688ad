//! desig-namer - assign sequential designations to detected sources
//!
//! Commands:
//! - `assign`: name every unnamed candidate in the database
//! - `add`: insert an unnamed candidate (for testing and manual ingest)
//! - `latest`: show the latest designation of a year
//! - `successor`: show the suffix that follows a given suffix

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use desig_common::config::{resolve_config, ConfigOverrides};
use desig_common::db::init_database;
use desig_common::time::parse_timestamp;
use desig_namer::{successor, Namer};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "desig-namer", version, about = "Sequential source designation allocator")]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Designation base (survey prefix)
    #[arg(long)]
    base: Option<String>,

    /// First suffix of an empty year scope
    #[arg(long)]
    seed: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Name every unnamed candidate
    Assign {
        /// Print the named records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Insert an unnamed candidate
    Add {
        /// Detection time, RFC 3339
        #[arg(long)]
        time: String,
        #[arg(long)]
        ra: Option<f64>,
        #[arg(long)]
        dec: Option<f64>,
    },
    /// Show the latest designation of a two-digit year
    Latest {
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..100))]
        year: u8,
    },
    /// Show the successor of a suffix
    Successor { suffix: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Pure command: no configuration or database needed
    if let Command::Successor { suffix } = &cli.command {
        return print_successor(suffix);
    }

    // Logging comes up before config so config loading is visible; RUST_LOG
    // wins, otherwise the configured level replaces the startup default
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let resolved = resolve_config(&ConfigOverrides {
        config_file: cli.config.clone(),
        database_path: cli.database.clone(),
        base: cli.base.clone(),
        seed_suffix: cli.seed.clone(),
    })?;

    if !from_env {
        filter_handle
            .reload(EnvFilter::new(&resolved.logging.level))
            .context("Failed to apply configured log level")?;
    }

    info!(
        "Starting desig-namer v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database path: {}", resolved.database_path.display());

    let pool = init_database(&resolved.database_path, &resolved.namer.layout())
        .await
        .context("Failed to open database")?;
    let namer = Namer::connect(pool, resolved.namer).await?;
    info!("{}", namer);

    match cli.command {
        Command::Assign { json } => {
            let named = namer.assign_pending().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&named)?);
            } else {
                for record in &named {
                    println!(
                        "{}\t{}\t{}",
                        record.id,
                        record.detection_time.to_rfc3339(),
                        record.designation.as_deref().unwrap_or("")
                    );
                }
            }
            info!("Named {} candidate(s)", named.len());
        }
        Command::Add { time, ra, dec } => {
            let detection_time = parse_timestamp(&time)?;
            let id = namer.insert_candidate(&detection_time, ra, dec).await?;
            println!("{}", id);
        }
        Command::Latest { year } => match namer.latest(year).await? {
            Some(designation) => println!("{}", designation),
            None => println!("none"),
        },
        Command::Successor { suffix } => print_successor(&suffix)?,
    }

    Ok(())
}

fn print_successor(suffix: &str) -> Result<()> {
    anyhow::ensure!(
        !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_lowercase()),
        "suffix must be non-empty lowercase letters"
    );
    println!("{}", successor(suffix));
    Ok(())
}
