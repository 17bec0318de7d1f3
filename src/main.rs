//! # Salespipe CLI (`spp`)
//!
//! The `spp` binary drives the pipeline: database initialization, ingestion
//! runs, ad-hoc queries against the active snapshot, store statistics, and
//! the read API server.
//!
//! ## Usage
//!
//! ```bash
//! spp --config ./config/spp.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `spp init` | Create the SQLite database and snapshot tables |
//! | `spp ingest [FILES...]` | Harmonize source files (or the landing dir) into a new snapshot |
//! | `spp query` | Run a filtered, paginated query and print the JSON page |
//! | `spp stats` | Show active snapshot statistics |
//! | `spp serve` | Start the read API HTTP server |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use salespipe::models::{DocumentKind, SourceDocument};
use salespipe::query::QueryRequest;
use salespipe::{config, db, ingest, migrate, query, server, sources, stats};

/// Salespipe — a harmonizing ingestion pipeline and cursor-paginated query
/// engine for heterogeneous sales records.
#[derive(Parser)]
#[command(
    name = "spp",
    about = "Salespipe — harmonize heterogeneous sales records and serve them with stable pagination",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/spp.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite file, both snapshot tables, and the snapshot
    /// pointer row. Idempotent — running it again is safe.
    Init,

    /// Run one ingestion: normalize, harmonize, and replace the snapshot.
    ///
    /// With file arguments, ingests exactly those files (kind inferred from
    /// extension). Without arguments, scans the configured landing
    /// directory. A run that yields zero records leaves the previous
    /// snapshot serving and exits non-zero.
    Ingest {
        /// Source files to ingest; defaults to the landing directory scan.
        files: Vec<PathBuf>,

        /// Show file and record counts without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Query the active snapshot and print one page as JSON.
    Query {
        /// Inclusive lower date bound (YYYY-MM-DD).
        #[arg(long)]
        date_from: Option<String>,

        /// Inclusive upper date bound (YYYY-MM-DD).
        #[arg(long)]
        date_to: Option<String>,

        /// Case-insensitive substring match on customer location.
        #[arg(long)]
        location: Option<String>,

        /// Exact gender match.
        #[arg(long)]
        gender: Option<String>,

        /// Inclusive minimum age.
        #[arg(long)]
        age_min: Option<i64>,

        /// Inclusive maximum age.
        #[arg(long)]
        age_max: Option<i64>,

        /// Case-insensitive substring match on product (mobile) name.
        #[arg(long)]
        product: Option<String>,

        /// Opaque cursor from a previous page's next_cursor.
        #[arg(long)]
        cursor: Option<String>,

        /// Page size (bounded by query.max_limit).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show store statistics for the active snapshot.
    Stats,

    /// Start the read API HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { files, dry_run } => {
            let documents = if files.is_empty() {
                sources::scan_landing(&cfg)?
            } else {
                collect_documents(files)
            };
            ingest::run_ingest(&cfg, documents, dry_run).await?;
        }
        Commands::Query {
            date_from,
            date_to,
            location,
            gender,
            age_min,
            age_max,
            product,
            cursor,
            limit,
        } => {
            let request = QueryRequest {
                date_from,
                date_to,
                location,
                gender,
                age_min,
                age_max,
                product,
                cursor,
                limit,
            };
            let plan = query::compile(&request, &cfg.query)?;
            let pool = db::connect(&cfg).await?;
            let page = query::fetch_page(&pool, &plan).await?;
            pool.close().await;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

/// Turn CLI file arguments into source documents, skipping files whose kind
/// cannot be inferred from the extension.
fn collect_documents(files: Vec<PathBuf>) -> Vec<SourceDocument> {
    let mut documents = Vec::new();
    for path in files {
        match DocumentKind::from_path(&path) {
            Some(kind) => documents.push(SourceDocument::new(path, kind)),
            None => eprintln!("  skipped {}: unrecognized document kind", path.display()),
        }
    }
    documents
}
