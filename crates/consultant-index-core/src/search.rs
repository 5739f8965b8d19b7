//! Similarity search over stored consultant embeddings.
//!
//! The algorithm operates entirely through the [`Store`] and [`Embedder`]
//! traits, with no database or configuration dependencies.
//!
//! # Algorithm
//!
//! 1. Embed the query text. An empty query or a failed embedding matches
//!    nothing and yields an empty response.
//! 2. Scan every stored non-null embedding (Active only, when requested).
//! 3. Score each with cosine similarity and keep `similarity >= min_similarity`.
//! 4. Sort by similarity (desc), then consultant id (asc).
//! 5. Truncate to `limit` and attach the summary projection.

use std::cmp::Ordering;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::embedding::{cosine_similarity, EmbedOutcome, Embedder};
use crate::error::SearchError;
use crate::models::ConsultantSummary;
use crate::store::Store;

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.7;

/// One similarity-search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub limit: usize,
    pub min_similarity: f32,
    /// Only consider consultants whose status is exactly `"Active"`.
    pub active_only: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: DEFAULT_LIMIT,
            min_similarity: DEFAULT_MIN_SIMILARITY,
            active_only: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub consultant: ConsultantSummary,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_found: usize,
    /// The query text as received.
    pub query: String,
    pub processing_time_ms: u64,
}

impl SearchResponse {
    fn empty(query: &SearchQuery, started: Instant) -> Self {
        Self {
            results: Vec::new(),
            total_found: 0,
            query: query.text.clone(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Run a similarity search against a [`Store`] backend.
///
/// Only a store failure is an error; "no match" of any kind is an empty
/// response.
pub async fn search<S, E>(
    store: &S,
    embedder: &E,
    query: &SearchQuery,
) -> Result<SearchResponse, SearchError>
where
    S: Store + ?Sized,
    E: Embedder + ?Sized,
{
    let started = Instant::now();

    if query.text.trim().is_empty() || query.limit == 0 {
        return Ok(SearchResponse::empty(query, started));
    }

    let query_vec = match embedder.embed(&query.text).await {
        EmbedOutcome::Embedded(v) => v,
        EmbedOutcome::NoText => return Ok(SearchResponse::empty(query, started)),
        EmbedOutcome::Failed(reason) => {
            debug!(%reason, "query embedding failed; returning no results");
            return Ok(SearchResponse::empty(query, started));
        }
    };

    let candidates = store.vector_candidates(query.active_only).await?;
    let scanned = candidates.len();

    let mut ranked = rank(&query_vec, candidates, query.min_similarity);
    ranked.truncate(query.limit);

    let mut results = Vec::with_capacity(ranked.len());
    for (consultant_id, similarity) in ranked {
        // A record deleted between the scan and this lookup is skipped.
        if let Some(consultant) = store.get_summary(&consultant_id).await? {
            results.push(SearchResult {
                consultant,
                similarity,
            });
        }
    }

    debug!(scanned, returned = results.len(), "similarity search finished");

    Ok(SearchResponse {
        total_found: results.len(),
        results,
        query: query.text.clone(),
        processing_time_ms: started.elapsed().as_millis() as u64,
    })
}

/// Score, filter, and order candidates. Ties on similarity break by id.
pub fn rank(
    query_vec: &[f32],
    candidates: Vec<crate::store::VectorCandidate>,
    min_similarity: f32,
) -> Vec<(String, f32)> {
    let mut scored: Vec<(String, f32)> = candidates
        .into_iter()
        .map(|c| {
            let sim = cosine_similarity(query_vec, &c.embedding);
            (c.consultant_id, sim)
        })
        .filter(|(_, sim)| *sim >= min_similarity)
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{AttachmentRecord, ConsultantRecord, IndexedText, SyncKind, SyncRun};
    use crate::store::memory::InMemoryStore;
    use crate::store::{IndexStats, VectorCandidate};
    use async_trait::async_trait;

    struct FixedEmbedder(EmbedOutcome);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> EmbedOutcome {
            self.0.clone()
        }
    }

    fn unit(angle_deg: f32) -> Vec<f32> {
        let r = angle_deg.to_radians();
        vec![r.cos(), r.sin()]
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let rows = [
            ("c3", "Casey", "Active", unit(0.0)),
            ("c1", "Alex", "Active", unit(0.0)),
            ("c2", "Blair", "Inactive", unit(10.0)),
            ("c4", "Drew", "Active", unit(60.0)),
        ];
        for (id, name, status, vec) in rows {
            let record = ConsultantRecord {
                consultant_id: id.to_string(),
                name: name.to_string(),
                consultant_status: Some(status.to_string()),
                indexed: IndexedText::new(name.to_string(), Some(vec)),
                ..Default::default()
            };
            store.upsert_consultant(&record).await.unwrap();
        }
        store
    }

    fn query(min: f32) -> SearchQuery {
        SearchQuery {
            min_similarity: min,
            ..SearchQuery::new("marketing strategy")
        }
    }

    #[tokio::test]
    async fn results_meet_threshold_and_are_ordered() {
        let store = seeded().await;
        let embedder = FixedEmbedder(EmbedOutcome::Embedded(unit(0.0)));
        let resp = search(&store, &embedder, &query(0.9)).await.unwrap();

        let ids: Vec<&str> = resp
            .results
            .iter()
            .map(|r| r.consultant.consultant_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1", "c3", "c2"]);
        assert!(resp.results.iter().all(|r| r.similarity >= 0.9));
        assert!(resp
            .results
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
        assert_eq!(resp.total_found, 3);
        assert_eq!(resp.query, "marketing strategy");
    }

    #[tokio::test]
    async fn active_only_excludes_other_statuses() {
        let store = seeded().await;
        let embedder = FixedEmbedder(EmbedOutcome::Embedded(unit(0.0)));
        let mut q = query(0.0);
        q.active_only = true;
        let resp = search(&store, &embedder, &q).await.unwrap();
        assert!(resp
            .results
            .iter()
            .all(|r| r.consultant.consultant_status.as_deref() == Some("Active")));
        assert_eq!(resp.results.len(), 3);
    }

    #[tokio::test]
    async fn limit_truncates() {
        let store = seeded().await;
        let embedder = FixedEmbedder(EmbedOutcome::Embedded(unit(0.0)));
        let mut q = query(-1.0);
        q.limit = 2;
        let resp = search(&store, &embedder, &q).await.unwrap();
        assert_eq!(resp.results.len(), 2);
    }

    #[tokio::test]
    async fn empty_query_and_failed_embedding_match_nothing() {
        let store = seeded().await;
        let ok = FixedEmbedder(EmbedOutcome::Embedded(unit(0.0)));
        let resp = search(&store, &ok, &SearchQuery::new("   ")).await.unwrap();
        assert!(resp.results.is_empty());

        let failing = FixedEmbedder(EmbedOutcome::Failed("503".to_string()));
        let resp = search(&store, &failing, &query(0.0)).await.unwrap();
        assert!(resp.results.is_empty());
        assert_eq!(resp.total_found, 0);
    }

    struct DownStore;

    #[async_trait]
    impl Store for DownStore {
        async fn upsert_consultant(&self, _: &ConsultantRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn upsert_attachment(&self, _: &str, _: &AttachmentRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn get_consultant(&self, _: &str) -> Result<Option<ConsultantRecord>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn get_summary(&self, _: &str) -> Result<Option<ConsultantSummary>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn search_by_name(&self, _: &str, _: usize) -> Result<Vec<ConsultantSummary>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn list_consultants(&self, _: usize, _: usize) -> Result<Vec<ConsultantSummary>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn vector_candidates(&self, _: bool) -> Result<Vec<VectorCandidate>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn stats(&self) -> Result<IndexStats, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn begin_sync_run(&self, _: &SyncRun) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn finish_sync_run(&self, _: &SyncRun) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn last_completed_run(&self, _: SyncKind) -> Result<Option<SyncRun>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn recent_sync_runs(&self, _: usize) -> Result<Vec<SyncRun>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn unavailable_store_is_an_error_not_an_empty_result() {
        let embedder = FixedEmbedder(EmbedOutcome::Embedded(unit(0.0)));
        let err = search(&DownStore, &embedder, &query(0.0)).await.unwrap_err();
        assert!(matches!(err, SearchError::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn rank_breaks_ties_by_id() {
        let candidates = vec![
            VectorCandidate { consultant_id: "b".into(), embedding: vec![1.0, 0.0] },
            VectorCandidate { consultant_id: "a".into(), embedding: vec![2.0, 0.0] },
            VectorCandidate { consultant_id: "c".into(), embedding: vec![0.0, 1.0] },
        ];
        let ranked = rank(&[1.0, 0.0], candidates, 0.5);
        let ids: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
