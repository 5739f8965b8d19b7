//! Storage abstraction for Consultant Index.
//!
//! The [`Store`] trait defines every persistence operation the sync
//! pipeline and the search engine need, so backends (SQLite, in-memory)
//! can be swapped without touching either.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreError;
use crate::models::{AttachmentRecord, ConsultantRecord, ConsultantSummary, SyncKind, SyncRun};

/// A stored consultant embedding, as scanned by the search engine.
#[derive(Debug, Clone)]
pub struct VectorCandidate {
    pub consultant_id: String,
    pub embedding: Vec<f32>,
}

/// Aggregate counters over the whole index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_consultants: u64,
    pub with_embeddings: u64,
    pub total_attachments: u64,
    /// `(consultant_status, count)` pairs, most frequent first. Records
    /// with no status are grouped under `"Unknown"`.
    pub status_distribution: Vec<(String, u64)>,
}

/// Abstract storage backend for Consultant Index.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_consultant`](Store::upsert_consultant) | Insert or fully replace a consultant row |
/// | [`upsert_attachment`](Store::upsert_attachment) | Insert or replace one attachment of a consultant |
/// | [`get_consultant`](Store::get_consultant) | Full record (with attachments) by id |
/// | [`get_summary`](Store::get_summary) | Search projection by id |
/// | [`search_by_name`](Store::search_by_name) | Case-insensitive substring lookup on name |
/// | [`list_consultants`](Store::list_consultants) | Paged listing ordered by name |
/// | [`vector_candidates`](Store::vector_candidates) | Every stored embedding, optionally Active only |
/// | [`begin_sync_run`](Store::begin_sync_run) / [`finish_sync_run`](Store::finish_sync_run) | Sync-run log |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace the consultant keyed by `consultant_id`.
    ///
    /// Every column is overwritten, including the canonical text and its
    /// embedding, in one atomic write. Attachments in `record.attachments`
    /// are not touched; use [`upsert_attachment`](Store::upsert_attachment).
    async fn upsert_consultant(&self, record: &ConsultantRecord) -> Result<(), StoreError>;

    /// Insert or replace the attachment keyed by `(consultant_id, attachment_id)`.
    async fn upsert_attachment(
        &self,
        consultant_id: &str,
        attachment: &AttachmentRecord,
    ) -> Result<(), StoreError>;

    async fn get_consultant(&self, id: &str) -> Result<Option<ConsultantRecord>, StoreError>;

    async fn get_summary(&self, id: &str) -> Result<Option<ConsultantSummary>, StoreError>;

    /// Consultants whose name contains `fragment` (case-insensitive),
    /// ordered by name then id.
    async fn search_by_name(
        &self,
        fragment: &str,
        limit: usize,
    ) -> Result<Vec<ConsultantSummary>, StoreError>;

    async fn list_consultants(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ConsultantSummary>, StoreError>;

    /// Every consultant with a stored embedding. With `active_only`, only
    /// those whose status is exactly `"Active"`.
    async fn vector_candidates(&self, active_only: bool)
        -> Result<Vec<VectorCandidate>, StoreError>;

    async fn stats(&self) -> Result<IndexStats, StoreError>;

    /// Record a run in status `started`.
    async fn begin_sync_run(&self, run: &SyncRun) -> Result<(), StoreError>;

    /// Overwrite the stored run with its finalized state.
    async fn finish_sync_run(&self, run: &SyncRun) -> Result<(), StoreError>;

    /// Most recent completed run of `kind`, by start time.
    async fn last_completed_run(&self, kind: SyncKind) -> Result<Option<SyncRun>, StoreError>;

    /// Newest runs first.
    async fn recent_sync_runs(&self, limit: usize) -> Result<Vec<SyncRun>, StoreError>;
}
