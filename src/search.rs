//! Semantic consultant search.
//!
//! Embeds the query with the configured provider and ranks stored
//! consultant embeddings by cosine similarity. Used by `cidx search`.

use anyhow::Result;

use consultant_index_core::search::{search, SearchQuery, SearchResponse};

use crate::config::Config;
use crate::embedding;
use crate::sqlite_store::SqliteStore;

/// Options that override the `[search]` defaults.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub min_similarity: Option<f32>,
    pub active_only: bool,
}

/// Core search function returning structured data.
pub async fn search_consultants(
    config: &Config,
    query: &str,
    options: &SearchOptions,
) -> Result<SearchResponse> {
    let embedder = embedding::create_embedder(&config.embedding)?;
    let store = SqliteStore::open(config).await?;

    let request = SearchQuery {
        text: query.to_string(),
        limit: options.limit.unwrap_or(config.search.default_limit),
        min_similarity: options
            .min_similarity
            .unwrap_or(config.search.min_similarity),
        active_only: options.active_only,
    };

    let response = search(&store, embedder.as_ref(), &request).await;
    store.close().await;
    Ok(response?)
}

/// CLI entry point: print ranked results, or the JSON response with `json`.
pub async fn run_search(
    config: &Config,
    query: &str,
    options: &SearchOptions,
    json: bool,
) -> Result<()> {
    let response = search_consultants(config, query, options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in response.results.iter().enumerate() {
        let c = &result.consultant;
        println!(
            "{}. [{:.3}] {}  ({})",
            i + 1,
            result.similarity,
            c.name,
            c.consultant_id
        );
        let details: Vec<&str> = [&c.title, &c.practice_area, &c.location, &c.consultant_status]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .collect();
        if !details.is_empty() {
            println!("    {}", details.join(" | "));
        }
        if let Some(email) = &c.email {
            println!("    {}", email);
        }
    }
    println!();
    println!(
        "{} result(s) in {} ms",
        response.total_found, response.processing_time_ms
    );

    Ok(())
}
