//! Sync orchestration.
//!
//! One run moves every consultant from the CRM into the store:
//!
//! ```text
//! IDLE ─► FETCHING ─► PROCESSING ─► PERSISTING ─► COMPLETED
//!             │                                  └► FAILED
//!             └─ authentication failure ─────────► FAILED
//! ```
//!
//! A `sync_runs` row is written when the run enters FETCHING and finalized
//! once at the end. Each matched record is built, canonicalized, embedded
//! and upserted independently on a bounded pool of tokio tasks; a failure
//! is logged with its `consultant_id`, counted, and never cancels its
//! siblings. Counters are accumulated from task results on the
//! orchestrating task, so no shared counter is mutated concurrently.
//!
//! Full runs finish by rotating the recovery snapshot. Incremental runs
//! only see changed contacts and leave the snapshot alone, as do full runs
//! whose paging stopped early. A snapshot that could not be written is
//! recorded in the run's error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use consultant_index_core::canonical::canonical_text;
use consultant_index_core::embedding::{EmbedOutcome, Embedder};
use consultant_index_core::models::{
    AttachmentRecord, ConsultantRecord, IndexedText, SyncCounts, SyncKind, SyncRun, SyncStatus,
};
use consultant_index_core::store::Store;

use crate::connector_zoho::is_consultant;
use crate::error::{RecordError, SyncError};
use crate::extract::AttachmentText;
use crate::models::CrmContact;
use crate::snapshot;
use crate::traits::CrmSource;

/// Records between two progress log lines.
const PROGRESS_EVERY: u64 = 50;

/// Lifecycle of the orchestrator. Starts at `Idle`; after a run it rests at
/// `Completed` or `Failed` until the next one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
    Processing,
    Persisting,
    Completed,
    Failed,
}

impl SyncPhase {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SyncPhase::Fetching | SyncPhase::Processing | SyncPhase::Persisting
        )
    }
}

/// Result of pushing one record through the pipeline.
enum RecordOutcome {
    Indexed {
        record: ConsultantRecord,
        embedding_failed: bool,
    },
    Failed {
        consultant_id: String,
        /// Present when the record was built but could not be persisted.
        record: Option<ConsultantRecord>,
        error: RecordError,
    },
}

/// Everything a worker task needs, shared by reference count.
#[derive(Clone)]
struct Pipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn Store>,
}

pub struct SyncOrchestrator {
    source: Option<Arc<dyn CrmSource>>,
    pipeline: Pipeline,
    workers: usize,
    snapshot_path: Option<PathBuf>,
    phase: Mutex<SyncPhase>,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn CrmSource>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn Store>,
        workers: usize,
    ) -> Self {
        Self {
            source: Some(source),
            ..Self::offline(embedder, store, workers)
        }
    }

    /// An orchestrator with no CRM source. Only replay runs can succeed.
    pub fn offline(embedder: Arc<dyn Embedder>, store: Arc<dyn Store>, workers: usize) -> Self {
        Self {
            source: None,
            pipeline: Pipeline { embedder, store },
            workers: workers.max(1),
            snapshot_path: None,
            phase: Mutex::new(SyncPhase::Idle),
        }
    }

    /// Write the recovery snapshot to `path` after full runs.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn phase(&self) -> SyncPhase {
        match self.phase.lock() {
            Ok(phase) => *phase,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// True while a run is between FETCHING and its final state.
    pub fn is_running(&self) -> bool {
        self.phase().is_active()
    }

    /// Run one sync pass of the given kind.
    ///
    /// `SyncKind::Replay` replays the configured snapshot path. Returns
    /// [`SyncError::AlreadyRunning`] without side effects when another run
    /// is active.
    pub async fn run(&self, kind: SyncKind) -> Result<SyncRun, SyncError> {
        let guard = self.try_start()?;
        let mut run = SyncRun::start(kind);
        self.pipeline.store.begin_sync_run(&run).await?;
        info!(run_id = %run.id, kind = kind.as_str(), "sync run started");

        let result = match kind {
            SyncKind::Full | SyncKind::Incremental => self.sync_from_source(&guard, &mut run).await,
            SyncKind::Replay => match self.snapshot_path.clone() {
                Some(path) => self.replay_snapshot(&guard, &mut run, &path).await,
                None => {
                    run.fail("no snapshot path configured");
                    Ok(())
                }
            },
        };
        self.finish(guard, run, result).await
    }

    /// Re-index every record of the snapshot at `path`, logged as a
    /// `replay` run.
    pub async fn replay(&self, path: &Path) -> Result<SyncRun, SyncError> {
        let guard = self.try_start()?;
        let mut run = SyncRun::start(SyncKind::Replay);
        self.pipeline.store.begin_sync_run(&run).await?;
        info!(run_id = %run.id, path = %path.display(), "replay run started");

        let result = self.replay_snapshot(&guard, &mut run, path).await;
        self.finish(guard, run, result).await
    }

    fn try_start(&self) -> Result<PhaseGuard<'_>, SyncError> {
        let mut phase = match self.phase.lock() {
            Ok(phase) => phase,
            Err(poisoned) => poisoned.into_inner(),
        };
        if phase.is_active() {
            return Err(SyncError::AlreadyRunning);
        }
        *phase = SyncPhase::Fetching;
        Ok(PhaseGuard {
            phase: &self.phase,
            finished: false,
        })
    }

    async fn finish(
        &self,
        mut guard: PhaseGuard<'_>,
        mut run: SyncRun,
        result: Result<(), SyncError>,
    ) -> Result<SyncRun, SyncError> {
        if let Err(e) = &result {
            run.fail(e.to_string());
        }
        let logged = self.pipeline.store.finish_sync_run(&run).await;

        let final_phase = match run.status {
            SyncStatus::Completed => SyncPhase::Completed,
            _ => SyncPhase::Failed,
        };
        guard.set(final_phase);
        guard.finished = true;

        match run.status {
            SyncStatus::Completed => info!(
                run_id = %run.id,
                kind = run.kind.as_str(),
                seen = run.counts.contacts_seen,
                matched = run.counts.consultants_matched,
                succeeded = run.counts.succeeded,
                failed = run.counts.failed,
                embedding_failures = run.counts.embedding_failures,
                elapsed_ms = run.elapsed_ms.unwrap_or_default(),
                "sync run completed"
            ),
            _ => error!(
                run_id = %run.id,
                reason = run.error.as_deref().unwrap_or(""),
                "sync run failed"
            ),
        }

        result?;
        logged?;
        Ok(run)
    }

    async fn sync_from_source(
        &self,
        guard: &PhaseGuard<'_>,
        run: &mut SyncRun,
    ) -> Result<(), SyncError> {
        let Some(source) = self.source.clone() else {
            run.fail("no CRM source configured");
            return Ok(());
        };

        let token = match source.authenticate().await {
            Ok(token) => token,
            Err(e) => {
                run.fail(format!("authentication failed: {}", e));
                return Ok(());
            }
        };

        let modified_since = match run.kind {
            SyncKind::Incremental => self.last_sync_start().await?,
            _ => None,
        };
        if let Some(since) = modified_since {
            info!(since = %since, "incremental fetch");
        }

        let fetched = source.fetch_all_records(&token, modified_since).await;
        let mut counts = SyncCounts {
            contacts_seen: fetched.records.len() as u64,
            ..Default::default()
        };

        let matched = select_consultants(fetched.records);
        counts.consultants_matched = matched.len() as u64;
        info!(
            seen = counts.contacts_seen,
            matched = counts.consultants_matched,
            "filtered consultants"
        );

        guard.set(SyncPhase::Processing);
        let token: Arc<str> = Arc::from(token);
        let mut records = self
            .process_all(matched, &mut counts, |pipeline, raw| {
                let source = Arc::clone(&source);
                let token = Arc::clone(&token);
                async move { pipeline.process_raw(source.as_ref(), &token, raw).await }
            })
            .await;

        guard.set(SyncPhase::Persisting);
        let mut problems: Vec<String> = fetched.error.into_iter().collect();
        if run.kind == SyncKind::Full && self.snapshot_path.is_some() {
            if problems.is_empty() {
                if let Err(reason) = self.write_snapshot(&mut records) {
                    problems.push(format!("snapshot write failed: {}", reason));
                }
            } else {
                warn!("paging stopped early, keeping the previous snapshot");
                problems.push("snapshot not written: incomplete fetch".to_string());
            }
        }

        let error = (!problems.is_empty()).then(|| problems.join("; "));
        run.complete(counts, error);
        Ok(())
    }

    async fn replay_snapshot(
        &self,
        guard: &PhaseGuard<'_>,
        run: &mut SyncRun,
        path: &Path,
    ) -> Result<(), SyncError> {
        let records = match snapshot::load_snapshot(path) {
            Ok(records) => records,
            Err(e) => {
                run.fail(format!("{:#}", e));
                return Ok(());
            }
        };

        let mut counts = SyncCounts {
            contacts_seen: records.len() as u64,
            consultants_matched: records.len() as u64,
            ..Default::default()
        };

        guard.set(SyncPhase::Processing);
        self.process_all(records, &mut counts, |pipeline, record| async move {
            pipeline.index_record(record).await
        })
        .await;

        guard.set(SyncPhase::Persisting);
        run.complete(counts, None);
        Ok(())
    }

    /// Start time of the most recent completed full or incremental run.
    async fn last_sync_start(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
        let store = &self.pipeline.store;
        let full = store.last_completed_run(SyncKind::Full).await?;
        let incremental = store.last_completed_run(SyncKind::Incremental).await?;
        Ok([full, incremental]
            .into_iter()
            .flatten()
            .map(|run| run.started_at)
            .max())
    }

    /// Run `work` over every item on at most `self.workers` concurrent tasks
    /// and tally the outcomes into `counts`. Returns every record that was
    /// built, whether or not it was persisted.
    async fn process_all<T, F, Fut>(
        &self,
        items: Vec<T>,
        counts: &mut SyncCounts,
        work: F,
    ) -> Vec<ConsultantRecord>
    where
        T: Send + 'static,
        F: Fn(Pipeline, T) -> Fut,
        Fut: std::future::Future<Output = RecordOutcome> + Send + 'static,
    {
        let total = items.len() as u64;
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut records = Vec::with_capacity(items.len());
        let mut done = 0u64;

        for item in items {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let fut = work(self.pipeline.clone(), item);
            tasks.spawn(async move {
                let outcome = fut.await;
                drop(permit);
                outcome
            });

            // Drain finished tasks so results do not pile up.
            while let Some(joined) = tasks.try_join_next() {
                tally(joined, counts, &mut records);
                done += 1;
                log_progress(done, total);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            tally(joined, counts, &mut records);
            done += 1;
            log_progress(done, total);
        }

        records
    }

    /// Sorted by id so consecutive snapshots diff cleanly.
    fn write_snapshot(&self, records: &mut [ConsultantRecord]) -> Result<(), String> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        records.sort_by(|a, b| a.consultant_id.cmp(&b.consultant_id));
        snapshot::write_snapshot(path, records).map(|_| ()).map_err(|e| {
            let reason = format!("{:#}", e);
            error!(path = %path.display(), error = %reason, "snapshot write failed");
            reason
        })
    }
}

impl Pipeline {
    /// Raw CRM record to indexed, persisted consultant.
    async fn process_raw(&self, source: &dyn CrmSource, token: &str, raw: Value) -> RecordOutcome {
        let fallback_id = raw_id(&raw).unwrap_or_default();
        match build_record(source, token, raw).await {
            Ok(record) => self.index_record(record).await,
            Err(error) => {
                error!(consultant_id = %fallback_id, error = %error, "record skipped");
                RecordOutcome::Failed {
                    consultant_id: fallback_id,
                    record: None,
                    error,
                }
            }
        }
    }

    /// Canonicalize, embed and upsert one record, then its attachments.
    async fn index_record(&self, mut record: ConsultantRecord) -> RecordOutcome {
        let text = canonical_text(&record);
        let outcome = self.embedder.embed(&text).await;
        let embedding_failed = outcome.is_failure();
        if let EmbedOutcome::Failed(reason) = &outcome {
            warn!(consultant_id = %record.consultant_id, reason = %reason, "embedding failed; storing without vector");
        }
        record.indexed = IndexedText::new(text, outcome.into_vector());

        if let Err(e) = self.store.upsert_consultant(&record).await {
            error!(consultant_id = %record.consultant_id, error = %e, "upsert failed");
            return RecordOutcome::Failed {
                consultant_id: record.consultant_id.clone(),
                record: Some(record),
                error: RecordError::Persist(e),
            };
        }

        for attachment in record.attachments.iter_mut() {
            self.index_attachment(&record.consultant_id, attachment).await;
        }

        debug!(consultant_id = %record.consultant_id, "record indexed");
        RecordOutcome::Indexed {
            record,
            embedding_failed,
        }
    }

    /// Attachment failures are logged and never fail the parent record.
    async fn index_attachment(&self, consultant_id: &str, attachment: &mut AttachmentRecord) {
        match self.embedder.embed(&attachment.extracted_text).await {
            EmbedOutcome::Embedded(vec) => attachment.embedding = Some(vec),
            EmbedOutcome::NoText => attachment.embedding = None,
            EmbedOutcome::Failed(reason) => {
                warn!(consultant_id, file_name = %attachment.file_name, reason = %reason, "attachment embedding failed");
                attachment.embedding = None;
            }
        }
        if let Err(e) = self.store.upsert_attachment(consultant_id, attachment).await {
            error!(consultant_id, file_name = %attachment.file_name, error = %e, "attachment upsert failed");
        }
    }
}

/// Parse a raw record and attach the text of each of its attachments.
async fn build_record(
    source: &dyn CrmSource,
    token: &str,
    raw: Value,
) -> Result<ConsultantRecord, RecordError> {
    let contact = CrmContact::from_value(&raw)?;
    let consultant_id = contact
        .id
        .clone()
        .ok_or_else(|| RecordError::Malformed("record has no id".to_string()))?;

    let metas = match source.fetch_attachments(&consultant_id, token).await {
        Ok(metas) => metas,
        Err(e) => {
            warn!(consultant_id = %consultant_id, error = %e, "attachment listing failed; continuing without attachments");
            Vec::new()
        }
    };

    let mut attachments = Vec::with_capacity(metas.len());
    for meta in metas {
        let text = source
            .fetch_attachment_content(&meta, &consultant_id, token)
            .await;
        if text == AttachmentText::Empty {
            continue;
        }
        attachments.push(meta.into_record(text.into_string()));
    }

    contact.into_record(raw, attachments)
}

/// Keep consultants only, one per id. A later duplicate replaces an earlier
/// one so no two workers ever write the same key.
fn select_consultants(records: Vec<Value>) -> Vec<Value> {
    let mut order: Vec<Option<String>> = Vec::new();
    let mut by_id: HashMap<String, Value> = HashMap::new();
    let mut without_id: Vec<Value> = Vec::new();

    for raw in records.into_iter().filter(is_consultant) {
        match raw_id(&raw) {
            Some(id) => {
                if by_id.insert(id.clone(), raw).is_none() {
                    order.push(Some(id));
                }
            }
            None => {
                without_id.push(raw);
                order.push(None);
            }
        }
    }

    let mut without_id = without_id.into_iter();
    order
        .into_iter()
        .filter_map(|slot| match slot {
            Some(id) => by_id.remove(&id),
            None => without_id.next(),
        })
        .collect()
}

fn raw_id(raw: &Value) -> Option<String> {
    raw.get("id").and_then(crate::models::value_to_text)
}

fn tally(
    joined: Result<RecordOutcome, tokio::task::JoinError>,
    counts: &mut SyncCounts,
    records: &mut Vec<ConsultantRecord>,
) {
    match joined {
        Ok(RecordOutcome::Indexed {
            record,
            embedding_failed,
        }) => {
            counts.succeeded += 1;
            if embedding_failed {
                counts.embedding_failures += 1;
            }
            records.push(record);
        }
        Ok(RecordOutcome::Failed {
            consultant_id,
            record,
            error,
        }) => {
            counts.failed += 1;
            debug!(consultant_id = %consultant_id, error = %error, "record counted as failed");
            records.extend(record);
        }
        Err(e) => {
            counts.failed += 1;
            error!(error = %e, "record task aborted");
        }
    }
}

fn log_progress(done: u64, total: u64) {
    if done % PROGRESS_EVERY == 0 || done == total {
        info!(done, total, "processed records");
    }
}

/// Owns the "run active" state for the duration of a run. Dropping it
/// without finishing (a panic or cancelled future) marks the run failed so
/// the orchestrator never stays stuck in an active phase.
struct PhaseGuard<'a> {
    phase: &'a Mutex<SyncPhase>,
    finished: bool,
}

impl PhaseGuard<'_> {
    fn set(&self, next: SyncPhase) {
        match self.phase.lock() {
            Ok(mut phase) => *phase = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.set(SyncPhase::Failed);
        }
    }
}
