//! In-memory [`Store`] implementation for tests and embedding in other tools.
//!
//! Uses `HashMap` behind `std::sync::RwLock` for thread safety. Every write
//! replaces the stored value under a single write lock, so readers never
//! observe a half-applied upsert.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{AttachmentRecord, ConsultantRecord, ConsultantSummary, SyncKind, SyncRun, SyncStatus};

use super::{IndexStats, Store, VectorCandidate};

/// In-memory store.
pub struct InMemoryStore {
    consultants: RwLock<HashMap<String, ConsultantRecord>>,
    /// consultant id -> attachment id -> attachment
    attachments: RwLock<HashMap<String, BTreeMap<String, AttachmentRecord>>>,
    runs: RwLock<Vec<SyncRun>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            consultants: RwLock::new(HashMap::new()),
            attachments: RwLock::new(HashMap::new()),
            runs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
}

fn sorted_by_name<'a>(records: impl Iterator<Item = &'a ConsultantRecord>) -> Vec<&'a ConsultantRecord> {
    let mut out: Vec<&ConsultantRecord> = records.collect();
    out.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.consultant_id.cmp(&b.consultant_id))
    });
    out
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_consultant(&self, record: &ConsultantRecord) -> Result<(), StoreError> {
        if record.consultant_id.is_empty() {
            return Err(StoreError::Query("consultant_id must not be empty".to_string()));
        }
        let mut stored = record.clone();
        stored.attachments.clear();
        write(&self.consultants)?.insert(record.consultant_id.clone(), stored);
        Ok(())
    }

    async fn upsert_attachment(
        &self,
        consultant_id: &str,
        attachment: &AttachmentRecord,
    ) -> Result<(), StoreError> {
        if !read(&self.consultants)?.contains_key(consultant_id) {
            return Err(StoreError::Query(format!(
                "attachment {} references unknown consultant {}",
                attachment.attachment_id, consultant_id
            )));
        }
        write(&self.attachments)?
            .entry(consultant_id.to_string())
            .or_default()
            .insert(attachment.attachment_id.clone(), attachment.clone());
        Ok(())
    }

    async fn get_consultant(&self, id: &str) -> Result<Option<ConsultantRecord>, StoreError> {
        let consultants = read(&self.consultants)?;
        let Some(record) = consultants.get(id) else {
            return Ok(None);
        };
        let mut record = record.clone();
        if let Some(atts) = read(&self.attachments)?.get(id) {
            record.attachments = atts.values().cloned().collect();
        }
        Ok(Some(record))
    }

    async fn get_summary(&self, id: &str) -> Result<Option<ConsultantSummary>, StoreError> {
        Ok(read(&self.consultants)?.get(id).map(ConsultantRecord::summary))
    }

    async fn search_by_name(
        &self,
        fragment: &str,
        limit: usize,
    ) -> Result<Vec<ConsultantSummary>, StoreError> {
        let needle = fragment.to_lowercase();
        let consultants = read(&self.consultants)?;
        Ok(sorted_by_name(
            consultants
                .values()
                .filter(|r| r.name.to_lowercase().contains(&needle)),
        )
        .into_iter()
        .take(limit)
        .map(ConsultantRecord::summary)
        .collect())
    }

    async fn list_consultants(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ConsultantSummary>, StoreError> {
        let consultants = read(&self.consultants)?;
        Ok(sorted_by_name(consultants.values())
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(ConsultantRecord::summary)
            .collect())
    }

    async fn vector_candidates(
        &self,
        active_only: bool,
    ) -> Result<Vec<VectorCandidate>, StoreError> {
        let consultants = read(&self.consultants)?;
        Ok(consultants
            .values()
            .filter(|r| !active_only || r.consultant_status.as_deref() == Some("Active"))
            .filter_map(|r| {
                r.indexed.embedding().map(|v| VectorCandidate {
                    consultant_id: r.consultant_id.clone(),
                    embedding: v.to_vec(),
                })
            })
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        let consultants = read(&self.consultants)?;
        let mut by_status: HashMap<String, u64> = HashMap::new();
        for r in consultants.values() {
            let status = r
                .consultant_status
                .clone()
                .unwrap_or_else(|| "Unknown".to_string());
            *by_status.entry(status).or_default() += 1;
        }
        let mut status_distribution: Vec<(String, u64)> = by_status.into_iter().collect();
        status_distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(IndexStats {
            total_consultants: consultants.len() as u64,
            with_embeddings: consultants
                .values()
                .filter(|r| r.indexed.embedding().is_some())
                .count() as u64,
            total_attachments: read(&self.attachments)?
                .values()
                .map(|m| m.len() as u64)
                .sum(),
            status_distribution,
        })
    }

    async fn begin_sync_run(&self, run: &SyncRun) -> Result<(), StoreError> {
        write(&self.runs)?.push(run.clone());
        Ok(())
    }

    async fn finish_sync_run(&self, run: &SyncRun) -> Result<(), StoreError> {
        let mut runs = write(&self.runs)?;
        match runs.iter_mut().find(|r| r.id == run.id) {
            Some(existing) => *existing = run.clone(),
            None => runs.push(run.clone()),
        }
        Ok(())
    }

    async fn last_completed_run(&self, kind: SyncKind) -> Result<Option<SyncRun>, StoreError> {
        Ok(read(&self.runs)?
            .iter()
            .filter(|r| r.kind == kind && r.status == SyncStatus::Completed)
            .max_by_key(|r| r.started_at)
            .cloned())
    }

    async fn recent_sync_runs(&self, limit: usize) -> Result<Vec<SyncRun>, StoreError> {
        let mut runs = read(&self.runs)?.clone();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit);
        Ok(runs)
    }
}
