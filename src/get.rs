//! Consultant retrieval by id or name.
//!
//! These lookups never touch embeddings: `get` is an exact id match,
//! `find-name` a case-insensitive substring match on the full name, and
//! `list` pages through every consultant alphabetically.

use anyhow::Result;

use consultant_index_core::models::{ConsultantRecord, ConsultantSummary};
use consultant_index_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Core get function returning structured data.
pub async fn get_consultant(config: &Config, id: &str) -> Result<Option<ConsultantRecord>> {
    let store = SqliteStore::open(config).await?;
    let record = store.get_consultant(id).await;
    store.close().await;
    Ok(record?)
}

/// CLI entry point: print the record, or exit non-zero when it is unknown.
pub async fn run_get(config: &Config, id: &str, json: bool) -> Result<()> {
    let record = match get_consultant(config, id).await? {
        Some(r) => r,
        None => {
            eprintln!("consultant not found: {}", id);
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("--- Consultant ---");
    println!("id:            {}", record.consultant_id);
    println!("name:          {}", record.name);
    print_opt("email", &record.email);
    print_opt("phone", &record.phone);
    print_opt("mobile", &record.mobile);
    print_opt("title", &record.title);
    print_opt("status", &record.consultant_status);
    print_opt("practice_area", &record.practice_area);
    print_opt("location", &record.location);
    print_opt("linkedin", &record.linkedin);
    print_opt("modified_time", &record.modified_time);

    let skills: Vec<&String> = record
        .business_strategy_skills
        .iter()
        .chain(&record.finance_skills)
        .chain(&record.law_skills)
        .chain(&record.marketing_pr_skills)
        .chain(&record.nonprofit_skills)
        .collect();
    if !skills.is_empty() {
        let skills: Vec<&str> = skills.iter().map(|s| s.as_str()).collect();
        println!("skills:        {}", skills.join(", "));
    }
    println!(
        "embedding:     {}",
        match record.indexed.embedding() {
            Some(v) => format!("{} dims", v.len()),
            None => "none".to_string(),
        }
    );
    println!();

    println!("--- Canonical text ---");
    println!("{}", record.indexed.text());
    println!();

    println!("--- Attachments ({}) ---", record.attachments.len());
    for a in &record.attachments {
        println!(
            "[{}] {} ({})",
            a.attachment_id,
            a.file_name,
            a.file_size.as_deref().unwrap_or("?")
        );
    }

    Ok(())
}

/// `cidx find-name`: case-insensitive substring match on the name.
pub async fn run_find_name(config: &Config, fragment: &str, limit: usize) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let found = store.search_by_name(fragment, limit).await;
    store.close().await;
    print_summaries(&found?);
    Ok(())
}

/// `cidx list`: consultants ordered by name.
pub async fn run_list(config: &Config, limit: usize, offset: usize) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let page = store.list_consultants(limit, offset).await;
    store.close().await;
    print_summaries(&page?);
    Ok(())
}

fn print_summaries(summaries: &[ConsultantSummary]) {
    if summaries.is_empty() {
        println!("No consultants found.");
        return;
    }
    println!(
        "{:<22} {:<32} {:<12} {}",
        "ID", "NAME", "STATUS", "PRACTICE AREA"
    );
    for s in summaries {
        println!(
            "{:<22} {:<32} {:<12} {}",
            s.consultant_id,
            s.name,
            s.consultant_status.as_deref().unwrap_or("-"),
            s.practice_area.as_deref().unwrap_or("-")
        );
    }
}

fn print_opt(label: &str, value: &Option<String>) {
    if let Some(v) = value {
        println!("{:<14} {}", format!("{}:", label), v);
    }
}
