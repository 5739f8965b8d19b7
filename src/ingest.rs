//! Sync command entry points.
//!
//! Wires the configured CRM connector, embedding provider and SQLite store
//! into a [`SyncOrchestrator`] for `cidx sync`, `cidx replay` and
//! `cidx schedule`. Secrets are checked before anything touches the network
//! or the database.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use consultant_index_core::models::{SyncKind, SyncRun, SyncStatus};

use crate::config::{Config, CrmCredentials};
use crate::connector_zoho::ZohoConnector;
use crate::embedding;
use crate::scheduler;
use crate::sqlite_store::SqliteStore;
use crate::sync::SyncOrchestrator;

/// Build an orchestrator that reads from Zoho.
pub async fn build_orchestrator(config: &Config) -> Result<SyncOrchestrator> {
    let credentials = CrmCredentials::from_env()?;
    let embedder = embedding::create_embedder(&config.embedding)?;
    let connector = ZohoConnector::new(&config.crm, credentials, config.sync.extract_documents)?;
    let store = SqliteStore::open(config).await?;

    Ok(SyncOrchestrator::new(
        Arc::new(connector),
        embedder,
        Arc::new(store),
        config.sync.workers,
    )
    .with_snapshot_path(config.sync.snapshot_path.clone()))
}

/// `cidx sync [--incremental]`: one run, then a summary on stdout.
pub async fn run_sync(config: &Config, incremental: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    let kind = if incremental {
        SyncKind::Incremental
    } else {
        SyncKind::Full
    };
    let run = orchestrator.run(kind).await?;
    report(&run, config.embedding.is_enabled())
}

/// `cidx replay [PATH]`: re-index a snapshot without contacting the CRM.
pub async fn run_replay(config: &Config, path: Option<&Path>) -> Result<()> {
    let path: PathBuf = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.sync.snapshot_path.clone());
    let embedder = embedding::create_embedder(&config.embedding)?;
    let store = SqliteStore::open(config).await?;

    let orchestrator = SyncOrchestrator::offline(embedder, Arc::new(store), config.sync.workers);
    let run = orchestrator.replay(&path).await?;
    report(&run, config.embedding.is_enabled())
}

/// `cidx schedule`: a full run now, then every `interval_hours`.
pub async fn run_schedule(config: &Config, interval_hours: Option<u64>) -> Result<()> {
    let hours = interval_hours.unwrap_or(config.sync.interval_hours).max(1);
    let orchestrator = Arc::new(build_orchestrator(config).await?);
    scheduler::run_schedule(orchestrator, Duration::from_secs(hours * 3600)).await
}

fn report(run: &SyncRun, embeddings_enabled: bool) -> Result<()> {
    println!("sync {} ({})", run.kind.as_str(), run.id);
    println!("  contacts seen:        {}", run.counts.contacts_seen);
    println!("  consultants matched:  {}", run.counts.consultants_matched);
    println!("  succeeded:            {}", run.counts.succeeded);
    println!("  failed:               {}", run.counts.failed);
    if embeddings_enabled || run.counts.embedding_failures > 0 {
        println!("  embedding failures:   {}", run.counts.embedding_failures);
    }
    if let Some(ms) = run.elapsed_ms {
        println!("  elapsed:              {} ms", ms);
    }

    match run.status {
        SyncStatus::Completed => {
            if let Some(error) = &run.error {
                println!("  warning: {}", error);
            }
            println!("ok");
            Ok(())
        }
        _ => anyhow::bail!(
            "sync run failed: {}",
            run.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
