//! Index statistics and the sync run log.
//!
//! `cidx stats` gives a quick health overview: how many consultants are
//! indexed, how many carry an embedding, how statuses are distributed and
//! how the latest sync went. `cidx runs` lists recent sync runs.

use anyhow::Result;

use consultant_index_core::models::SyncRun;
use consultant_index_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let stats = store.stats().await;
    let latest = store.recent_sync_runs(1).await;
    store.close().await;
    let (stats, latest) = (stats?, latest?);

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Consultant Index Stats");
    println!("======================");
    println!();
    println!("  Database:     {}", config.db.path.display());
    println!("  Size:         {}", format_bytes(db_size));
    println!();
    println!("  Consultants:  {}", stats.total_consultants);
    println!(
        "  Embedded:     {} / {} ({}%)",
        stats.with_embeddings,
        stats.total_consultants,
        percent(stats.with_embeddings, stats.total_consultants)
    );
    println!("  Attachments:  {}", stats.total_attachments);

    if !stats.status_distribution.is_empty() {
        println!();
        println!("  By status:");
        for (status, count) in &stats.status_distribution {
            println!("  {:<24} {:>6}", status, count);
        }
    }

    println!();
    match latest.first() {
        Some(run) => println!("  Last sync:    {}", describe_run(run)),
        None => println!("  Last sync:    never"),
    }
    println!();

    Ok(())
}

/// `cidx runs`: most recent sync runs first.
pub async fn run_runs(config: &Config, limit: usize) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let runs = store.recent_sync_runs(limit).await;
    store.close().await;
    let runs = runs?;

    if runs.is_empty() {
        println!("No sync runs recorded.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<11} {:<9} {:>6} {:>7} {:>6} {:>6}  {}",
        "ID", "KIND", "STATUS", "SEEN", "MATCHED", "OK", "FAILED", "STARTED"
    );
    for run in &runs {
        println!(
            "{:<36}  {:<11} {:<9} {:>6} {:>7} {:>6} {:>6}  {}",
            run.id,
            run.kind.as_str(),
            run.status.as_str(),
            run.counts.contacts_seen,
            run.counts.consultants_matched,
            run.counts.succeeded,
            run.counts.failed,
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(error) = &run.error {
            println!("    error: {}", error);
        }
    }

    Ok(())
}

fn describe_run(run: &SyncRun) -> String {
    let mut line = format!(
        "{} {} at {} ({} ok, {} failed",
        run.kind.as_str(),
        run.status.as_str(),
        run.started_at.format("%Y-%m-%d %H:%M"),
        run.counts.succeeded,
        run.counts.failed
    );
    if run.counts.embedding_failures > 0 {
        line.push_str(&format!(
            ", {} without embedding",
            run.counts.embedding_failures
        ));
    }
    line.push(')');
    if let Some(ms) = run.elapsed_ms {
        line.push_str(&format!(" in {:.1}s", ms as f64 / 1000.0));
    }
    line
}

fn percent(part: u64, whole: u64) -> u64 {
    if whole > 0 {
        part * 100 / whole
    } else {
        0
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
