//! # Consultant Index CLI (`cidx`)
//!
//! Synchronizes consultant profiles from Zoho CRM into a local SQLite index
//! and searches them by meaning or by name.
//!
//! ## Usage
//!
//! ```bash
//! cidx --config ./config/cidx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cidx init` | Create the SQLite database and schema |
//! | `cidx sync` | Run one full (or `--incremental`) sync from the CRM |
//! | `cidx schedule` | Sync now, then on a fixed interval |
//! | `cidx replay [PATH]` | Re-index the recovery snapshot |
//! | `cidx search "<query>"` | Semantic search over consultant embeddings |
//! | `cidx get <id>` | Print one consultant |
//! | `cidx find-name <fragment>` | Case-insensitive name lookup |
//! | `cidx list` | Page through consultants by name |
//! | `cidx stats` | Index overview and last sync |
//! | `cidx runs` | Recent sync runs |
//!
//! Secrets come from the environment: `ZOHO_CLIENT_ID`,
//! `ZOHO_CLIENT_SECRET`, `ZOHO_REFRESH_TOKEN` and, for the `openai`
//! embedding provider, `OPENAI_API_KEY`. Logs go to stderr and honour
//! `RUST_LOG`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use consultant_index::search::SearchOptions;
use consultant_index::{config, get, ingest, migrate, search, stats};

/// Consultant Index: a semantic search index over CRM consultant profiles.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cidx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cidx",
    about = "Consultant Index: sync consultants from Zoho CRM and search them semantically",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cidx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Run one sync pass from the CRM.
    ///
    /// A full sync fetches every contact and rewrites the recovery
    /// snapshot. An incremental sync only asks for contacts modified since
    /// the last completed run.
    Sync {
        /// Only fetch contacts modified since the last completed run.
        #[arg(long)]
        incremental: bool,
    },

    /// Sync now, then repeat every interval until Ctrl-C.
    ///
    /// A trigger that fires while a run is still active is skipped.
    Schedule {
        /// Hours between runs (defaults to `[sync] interval_hours`).
        #[arg(long)]
        interval_hours: Option<u64>,
    },

    /// Re-index every record of a recovery snapshot.
    Replay {
        /// Snapshot file (defaults to `[sync] snapshot_path`).
        path: Option<PathBuf>,
    },

    /// Semantic search over consultant embeddings.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum cosine similarity a result must reach.
        #[arg(long)]
        min_similarity: Option<f32>,

        /// Only consultants whose status is exactly "Active".
        #[arg(long)]
        active_only: bool,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print one consultant by CRM id.
    Get {
        id: String,

        /// Print the full record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Find consultants whose name contains a fragment (case-insensitive).
    FindName {
        fragment: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// List consultants ordered by name.
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show index statistics and the latest sync run.
    Stats,

    /// List recent sync runs.
    Runs {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync { incremental } => {
            ingest::run_sync(&cfg, incremental).await?;
        }
        Commands::Schedule { interval_hours } => {
            ingest::run_schedule(&cfg, interval_hours).await?;
        }
        Commands::Replay { path } => {
            ingest::run_replay(&cfg, path.as_deref()).await?;
        }
        Commands::Search {
            query,
            limit,
            min_similarity,
            active_only,
            json,
        } => {
            let options = SearchOptions {
                limit,
                min_similarity,
                active_only,
            };
            search::run_search(&cfg, &query, &options, json).await?;
        }
        Commands::Get { id, json } => {
            get::run_get(&cfg, &id, json).await?;
        }
        Commands::FindName { fragment, limit } => {
            get::run_find_name(&cfg, &fragment, limit).await?;
        }
        Commands::List { limit, offset } => {
            get::run_list(&cfg, limit, offset).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Runs { limit } => {
            stats::run_runs(&cfg, limit).await?;
        }
    }

    Ok(())
}
