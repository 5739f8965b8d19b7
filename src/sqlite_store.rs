//! SQLite-backed [`Store`] implementation.
//!
//! Skill lists, references and the raw payload are stored as JSON text;
//! embeddings as little-endian f32 BLOBs next to the hash of the text they
//! were computed from. A vector whose text no longer matches that hash is
//! never returned. Cosine ranking happens in the core search engine over
//! the decoded vectors.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::warn;

use consultant_index_core::embedding::{blob_to_vec, vec_to_blob};
use consultant_index_core::error::StoreError;
use consultant_index_core::models::{
    hash_text, AttachmentRecord, ConsultantRecord, ConsultantSummary, IndexedText, SyncCounts,
    SyncKind, SyncRun, SyncStatus,
};
use consultant_index_core::store::{IndexStats, Store, VectorCandidate};

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    embedding_model: Option<String>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            embedding_model: None,
        }
    }

    /// Record `model` alongside every embedding this store writes.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        let store = Self::new(pool);
        Ok(if config.embedding.is_enabled() {
            store.with_embedding_model(config.embedding.model.clone())
        } else {
            store
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn store_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => StoreError::Unavailable(e.to_string()),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Corrupt(e.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}

fn get<'r, T>(row: &'r SqliteRow, col: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(col).map_err(store_err)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Query(e.to_string()))
}

fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, StoreError> {
    serde_json::from_str(text).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", text, e)))
}

/// Stored vector of a row, or `None` when the row's text no longer hashes
/// to the `text_hash` written with that vector.
fn trusted_embedding(row: &SqliteRow, text: &str) -> Result<Option<Vec<f32>>, StoreError> {
    let blob: Option<Vec<u8>> = get(row, "embedding")?;
    let Some(blob) = blob else {
        return Ok(None);
    };
    let stored_hash: String = get(row, "text_hash")?;
    if hash_text(text) != stored_hash {
        let id: String = get(row, "consultant_id")?;
        warn!(consultant_id = %id, "canonical text does not match its hash, ignoring embedding");
        return Ok(None);
    }
    Ok(Some(blob_to_vec(&blob)))
}

fn row_to_record(row: &SqliteRow) -> Result<ConsultantRecord, StoreError> {
    let text: String = get(row, "canonical_text")?;
    let embedding = trusted_embedding(row, &text)?;
    let indexed = IndexedText::new(text, embedding);
    let raw: String = get(row, "raw_source_payload")?;

    Ok(ConsultantRecord {
        consultant_id: get(row, "consultant_id")?,
        first_name: get(row, "first_name")?,
        last_name: get(row, "last_name")?,
        name: get(row, "name")?,
        email: get(row, "email")?,
        phone: get(row, "phone")?,
        mobile: get(row, "mobile")?,
        home_phone: get(row, "home_phone")?,
        other_phone: get(row, "other_phone")?,
        fax: get(row, "fax")?,
        contact_type: get(row, "contact_type")?,
        consultant_status: get(row, "consultant_status")?,
        contact_owner: get(row, "contact_owner")?,
        lead_source: get(row, "lead_source")?,
        consultant_lead_source: get(row, "consultant_lead_source")?,
        account_name: get(row, "account_name")?,
        title: get(row, "title")?,
        department: get(row, "department")?,
        mailing_street: get(row, "mailing_street")?,
        mailing_city: get(row, "mailing_city")?,
        mailing_state: get(row, "mailing_state")?,
        mailing_zip: get(row, "mailing_zip")?,
        mailing_country: get(row, "mailing_country")?,
        location: get(row, "location")?,
        practice_area: get(row, "practice_area")?,
        hourly_rate_low: get(row, "hourly_rate_low")?,
        hourly_rate_high: get(row, "hourly_rate_high")?,
        hourly_rate_range: get(row, "hourly_rate_range")?,
        business_strategy_skills: from_json(&get::<String>(row, "business_strategy_skills")?)?,
        finance_skills: from_json(&get::<String>(row, "finance_skills")?)?,
        law_skills: from_json(&get::<String>(row, "law_skills")?)?,
        marketing_pr_skills: from_json(&get::<String>(row, "marketing_pr_skills")?)?,
        nonprofit_skills: from_json(&get::<String>(row, "nonprofit_skills")?)?,
        professional_passion: get(row, "professional_passion")?,
        projects_excite: get(row, "projects_excite")?,
        open_to_fulltime: get(row, "open_to_fulltime")?,
        how_heard_about_us: get(row, "how_heard_about_us")?,
        referred_by: get(row, "referred_by")?,
        reference_1: from_json(&get::<String>(row, "reference_1")?)?,
        reference_2: from_json(&get::<String>(row, "reference_2")?)?,
        description: get(row, "description")?,
        interview_notes: get(row, "interview_notes")?,
        reference_call_notes: get(row, "reference_call_notes")?,
        keywords: get(row, "keywords")?,
        linkedin: get(row, "linkedin")?,
        linkedin_connection: get(row, "linkedin_connection")?,
        invitation_lists: from_json(&get::<String>(row, "invitation_lists")?)?,
        created_time: get(row, "created_time")?,
        modified_time: get(row, "modified_time")?,
        last_activity_time: get(row, "last_activity_time")?,
        resume_text: get(row, "resume_text")?,
        attachments: Vec::new(),
        indexed,
        raw_source_payload: from_json(&raw)?,
    })
}

fn row_to_attachment(row: &SqliteRow) -> Result<AttachmentRecord, StoreError> {
    let embedding: Option<Vec<u8>> = get(row, "embedding")?;
    Ok(AttachmentRecord {
        attachment_id: get(row, "attachment_id")?,
        file_name: get(row, "file_name")?,
        file_size: get(row, "file_size")?,
        file_type: get(row, "file_type")?,
        created_time: get(row, "created_time")?,
        modified_time: get(row, "modified_time")?,
        extracted_text: get(row, "extracted_text")?,
        embedding: embedding.map(|blob| blob_to_vec(&blob)),
    })
}

fn row_to_run(row: &SqliteRow) -> Result<SyncRun, StoreError> {
    let kind: String = get(row, "kind")?;
    let status: String = get(row, "status")?;
    let finished_at: Option<String> = get(row, "finished_at")?;
    let count = |col: &str| get::<i64>(row, col).map(|n| n.max(0) as u64);

    Ok(SyncRun {
        id: get(row, "id")?,
        kind: SyncKind::parse(&kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown sync kind {:?}", kind)))?,
        status: SyncStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown sync status {:?}", status)))?,
        counts: SyncCounts {
            contacts_seen: count("contacts_seen")?,
            consultants_matched: count("consultants_matched")?,
            succeeded: count("succeeded")?,
            failed: count("failed")?,
            embedding_failures: count("embedding_failures")?,
        },
        started_at: parse_ts(&get::<String>(row, "started_at")?)?,
        finished_at: finished_at.as_deref().map(parse_ts).transpose()?,
        elapsed_ms: get(row, "elapsed_ms")?,
        error: get(row, "error")?,
    })
}

impl SqliteStore {
    async fn write_run(&self, run: &SyncRun) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_runs (id, kind, status, contacts_seen, consultants_matched,
                                   succeeded, failed, embedding_failures,
                                   started_at, finished_at, elapsed_ms, error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                contacts_seen = excluded.contacts_seen,
                consultants_matched = excluded.consultants_matched,
                succeeded = excluded.succeeded,
                failed = excluded.failed,
                embedding_failures = excluded.embedding_failures,
                finished_at = excluded.finished_at,
                elapsed_ms = excluded.elapsed_ms,
                error = excluded.error
            "#,
        )
        .bind(&run.id)
        .bind(run.kind.as_str())
        .bind(run.status.as_str())
        .bind(run.counts.contacts_seen as i64)
        .bind(run.counts.consultants_matched as i64)
        .bind(run.counts.succeeded as i64)
        .bind(run.counts.failed as i64)
        .bind(run.counts.embedding_failures as i64)
        .bind(format_ts(&run.started_at))
        .bind(run.finished_at.as_ref().map(format_ts))
        .bind(run.elapsed_ms)
        .bind(&run.error)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_consultant(&self, record: &ConsultantRecord) -> Result<(), StoreError> {
        if record.consultant_id.is_empty() {
            return Err(StoreError::Query("consultant_id must not be empty".to_string()));
        }
        let blob = record.indexed.embedding().map(vec_to_blob);
        let embedding_model = blob.as_ref().and(self.embedding_model.as_deref());

        // Text, hash and embedding travel in the same statement.
        sqlx::query(
            r#"
            INSERT INTO consultants (
                consultant_id, first_name, last_name, name, email,
                phone, mobile, home_phone, other_phone, fax,
                contact_type, consultant_status, contact_owner, lead_source, consultant_lead_source,
                account_name, title, department, mailing_street, mailing_city,
                mailing_state, mailing_zip, mailing_country, location, practice_area,
                hourly_rate_low, hourly_rate_high, hourly_rate_range, business_strategy_skills, finance_skills,
                law_skills, marketing_pr_skills, nonprofit_skills, professional_passion, projects_excite,
                open_to_fulltime, how_heard_about_us, referred_by, reference_1, reference_2,
                description, interview_notes, reference_call_notes, keywords, linkedin,
                linkedin_connection, invitation_lists, created_time, modified_time, last_activity_time,
                resume_text, canonical_text, text_hash, embedding, embedding_model,
                raw_source_payload, extracted_at
            )
            VALUES (
                ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?, ?, ?
            )
            ON CONFLICT(consultant_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                mobile = excluded.mobile,
                home_phone = excluded.home_phone,
                other_phone = excluded.other_phone,
                fax = excluded.fax,
                contact_type = excluded.contact_type,
                consultant_status = excluded.consultant_status,
                contact_owner = excluded.contact_owner,
                lead_source = excluded.lead_source,
                consultant_lead_source = excluded.consultant_lead_source,
                account_name = excluded.account_name,
                title = excluded.title,
                department = excluded.department,
                mailing_street = excluded.mailing_street,
                mailing_city = excluded.mailing_city,
                mailing_state = excluded.mailing_state,
                mailing_zip = excluded.mailing_zip,
                mailing_country = excluded.mailing_country,
                location = excluded.location,
                practice_area = excluded.practice_area,
                hourly_rate_low = excluded.hourly_rate_low,
                hourly_rate_high = excluded.hourly_rate_high,
                hourly_rate_range = excluded.hourly_rate_range,
                business_strategy_skills = excluded.business_strategy_skills,
                finance_skills = excluded.finance_skills,
                law_skills = excluded.law_skills,
                marketing_pr_skills = excluded.marketing_pr_skills,
                nonprofit_skills = excluded.nonprofit_skills,
                professional_passion = excluded.professional_passion,
                projects_excite = excluded.projects_excite,
                open_to_fulltime = excluded.open_to_fulltime,
                how_heard_about_us = excluded.how_heard_about_us,
                referred_by = excluded.referred_by,
                reference_1 = excluded.reference_1,
                reference_2 = excluded.reference_2,
                description = excluded.description,
                interview_notes = excluded.interview_notes,
                reference_call_notes = excluded.reference_call_notes,
                keywords = excluded.keywords,
                linkedin = excluded.linkedin,
                linkedin_connection = excluded.linkedin_connection,
                invitation_lists = excluded.invitation_lists,
                created_time = excluded.created_time,
                modified_time = excluded.modified_time,
                last_activity_time = excluded.last_activity_time,
                resume_text = excluded.resume_text,
                canonical_text = excluded.canonical_text,
                text_hash = excluded.text_hash,
                embedding = excluded.embedding,
                embedding_model = excluded.embedding_model,
                raw_source_payload = excluded.raw_source_payload,
                extracted_at = excluded.extracted_at
            "#,
        )
        .bind(&record.consultant_id)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.mobile)
        .bind(&record.home_phone)
        .bind(&record.other_phone)
        .bind(&record.fax)
        .bind(&record.contact_type)
        .bind(&record.consultant_status)
        .bind(&record.contact_owner)
        .bind(&record.lead_source)
        .bind(&record.consultant_lead_source)
        .bind(&record.account_name)
        .bind(&record.title)
        .bind(&record.department)
        .bind(&record.mailing_street)
        .bind(&record.mailing_city)
        .bind(&record.mailing_state)
        .bind(&record.mailing_zip)
        .bind(&record.mailing_country)
        .bind(&record.location)
        .bind(&record.practice_area)
        .bind(&record.hourly_rate_low)
        .bind(&record.hourly_rate_high)
        .bind(&record.hourly_rate_range)
        .bind(to_json(&record.business_strategy_skills)?)
        .bind(to_json(&record.finance_skills)?)
        .bind(to_json(&record.law_skills)?)
        .bind(to_json(&record.marketing_pr_skills)?)
        .bind(to_json(&record.nonprofit_skills)?)
        .bind(&record.professional_passion)
        .bind(&record.projects_excite)
        .bind(&record.open_to_fulltime)
        .bind(&record.how_heard_about_us)
        .bind(&record.referred_by)
        .bind(to_json(&record.reference_1)?)
        .bind(to_json(&record.reference_2)?)
        .bind(&record.description)
        .bind(&record.interview_notes)
        .bind(&record.reference_call_notes)
        .bind(&record.keywords)
        .bind(&record.linkedin)
        .bind(&record.linkedin_connection)
        .bind(to_json(&record.invitation_lists)?)
        .bind(&record.created_time)
        .bind(&record.modified_time)
        .bind(&record.last_activity_time)
        .bind(&record.resume_text)
        .bind(record.indexed.text())
        .bind(record.indexed.hash())
        .bind(&blob)
        .bind(embedding_model)
        .bind(to_json(&record.raw_source_payload)?)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn upsert_attachment(
        &self,
        consultant_id: &str,
        attachment: &AttachmentRecord,
    ) -> Result<(), StoreError> {
        let blob = attachment.embedding.as_deref().map(vec_to_blob);
        sqlx::query(
            r#"
            INSERT INTO consultant_attachments (consultant_id, attachment_id, file_name,
                                                file_size, file_type, created_time,
                                                modified_time, extracted_text, embedding)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(consultant_id, attachment_id) DO UPDATE SET
                file_name = excluded.file_name,
                file_size = excluded.file_size,
                file_type = excluded.file_type,
                created_time = excluded.created_time,
                modified_time = excluded.modified_time,
                extracted_text = excluded.extracted_text,
                embedding = excluded.embedding
            "#,
        )
        .bind(consultant_id)
        .bind(&attachment.attachment_id)
        .bind(&attachment.file_name)
        .bind(&attachment.file_size)
        .bind(&attachment.file_type)
        .bind(&attachment.created_time)
        .bind(&attachment.modified_time)
        .bind(&attachment.extracted_text)
        .bind(&blob)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_consultant(&self, id: &str) -> Result<Option<ConsultantRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM consultants WHERE consultant_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = row_to_record(&row)?;

        let att_rows = sqlx::query(
            "SELECT * FROM consultant_attachments WHERE consultant_id = ? ORDER BY attachment_id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        record.attachments = att_rows
            .iter()
            .map(row_to_attachment)
            .collect::<Result<_, _>>()?;

        Ok(Some(record))
    }

    async fn get_summary(&self, id: &str) -> Result<Option<ConsultantSummary>, StoreError> {
        let row = sqlx::query("SELECT * FROM consultants WHERE consultant_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.map(|r| row_to_record(&r).map(|rec| rec.summary()))
            .transpose()
    }

    async fn search_by_name(
        &self,
        fragment: &str,
        limit: usize,
    ) -> Result<Vec<ConsultantSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM consultants
            WHERE instr(lower(name), lower(?)) > 0
            ORDER BY name ASC, consultant_id ASC
            LIMIT ?
            "#,
        )
        .bind(fragment)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(|r| row_to_record(r).map(|rec| rec.summary()))
            .collect()
    }

    async fn list_consultants(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ConsultantSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM consultants ORDER BY name ASC, consultant_id ASC LIMIT ? OFFSET ?",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(|r| row_to_record(r).map(|rec| rec.summary()))
            .collect()
    }

    async fn vector_candidates(
        &self,
        active_only: bool,
    ) -> Result<Vec<VectorCandidate>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT consultant_id, canonical_text, text_hash, embedding FROM consultants
            WHERE embedding IS NOT NULL
              AND (? = 0 OR consultant_status = 'Active')
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let text: String = get(row, "canonical_text")?;
            if let Some(embedding) = trusted_embedding(row, &text)? {
                candidates.push(VectorCandidate {
                    consultant_id: get(row, "consultant_id")?,
                    embedding,
                });
            }
        }
        Ok(candidates)
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        let (total, with_embeddings): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(embedding) FROM consultants")
                .fetch_one(&self.pool)
                .await
                .map_err(store_err)?;

        let total_attachments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM consultant_attachments")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        let status_rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT COALESCE(consultant_status, 'Unknown') AS status, COUNT(*) AS n
            FROM consultants
            GROUP BY status
            ORDER BY n DESC, status ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(IndexStats {
            total_consultants: total as u64,
            with_embeddings: with_embeddings as u64,
            total_attachments: total_attachments as u64,
            status_distribution: status_rows
                .into_iter()
                .map(|(status, n)| (status, n as u64))
                .collect(),
        })
    }

    async fn begin_sync_run(&self, run: &SyncRun) -> Result<(), StoreError> {
        self.write_run(run).await
    }

    async fn finish_sync_run(&self, run: &SyncRun) -> Result<(), StoreError> {
        self.write_run(run).await
    }

    async fn last_completed_run(&self, kind: SyncKind) -> Result<Option<SyncRun>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM sync_runs
            WHERE kind = ? AND status = 'completed'
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        )
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(row_to_run).transpose()
    }

    async fn recent_sync_runs(&self, limit: usize) -> Result<Vec<SyncRun>, StoreError> {
        let rows = sqlx::query("SELECT * FROM sync_runs ORDER BY started_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter().map(row_to_run).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};

    async fn open() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::connect_path(&dir.path().join("cidx.sqlite")).await.unwrap();
        migrate::apply(&pool).await.unwrap();
        (dir, SqliteStore::new(pool).with_embedding_model("test-model"))
    }

    fn record(id: &str, name: &str, text: &str, vec: Option<Vec<f32>>) -> ConsultantRecord {
        ConsultantRecord {
            consultant_id: id.to_string(),
            name: name.to_string(),
            consultant_status: Some("Active".to_string()),
            finance_skills: vec!["Audit".to_string(), "Tax".to_string()],
            reference_1: consultant_index_core::models::ProfessionalReference {
                name: Some("Sam Lee".to_string()),
                ..Default::default()
            },
            indexed: IndexedText::new(text.to_string(), vec),
            raw_source_payload: serde_json::json!({"id": id, "Full_Name": name}),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn record_round_trips_through_sqlite() {
        let (_dir, store) = open().await;
        let original = record("c1", "Alex Rich", "alex text", Some(vec![0.25, -1.5]));
        store.upsert_consultant(&original).await.unwrap();

        let got = store.get_consultant("c1").await.unwrap().unwrap();
        assert_eq!(got, original);
    }

    #[tokio::test]
    async fn second_version_replaces_every_field() {
        let (_dir, store) = open().await;
        let mut v1 = record("c1", "Alex Rich", "first", Some(vec![1.0, 0.0]));
        v1.title = Some("Analyst".to_string());
        store.upsert_consultant(&v1).await.unwrap();

        let v2 = record("c1", "Alex Rich", "second", None);
        store.upsert_consultant(&v2).await.unwrap();
        store.upsert_consultant(&v2).await.unwrap();

        let got = store.get_consultant("c1").await.unwrap().unwrap();
        assert_eq!(got.title, None);
        assert_eq!(got.indexed.text(), "second");
        assert!(got.indexed.embedding().is_none());
        assert_eq!(store.stats().await.unwrap().total_consultants, 1);
    }

    #[tokio::test]
    async fn embedding_of_edited_text_is_not_served() {
        let (_dir, store) = open().await;
        store
            .upsert_consultant(&record("c1", "Alex Rich", "marketing", Some(vec![1.0, 0.0])))
            .await
            .unwrap();
        store
            .upsert_consultant(&record("c2", "Jo Park", "finance", Some(vec![0.0, 1.0])))
            .await
            .unwrap();

        // Text rewritten outside the store; the vector now belongs to nothing.
        sqlx::query("UPDATE consultants SET canonical_text = 'law' WHERE consultant_id = 'c1'")
            .execute(store.pool())
            .await
            .unwrap();

        let got = store.get_consultant("c1").await.unwrap().unwrap();
        assert_eq!(got.indexed.text(), "law");
        assert!(got.indexed.embedding().is_none());

        let ids: Vec<String> = store
            .vector_candidates(false)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.consultant_id)
            .collect();
        assert_eq!(ids, vec!["c2".to_string()]);
    }

    #[tokio::test]
    async fn attachment_requires_parent_and_cascades() {
        let (_dir, store) = open().await;
        let att = AttachmentRecord {
            attachment_id: "a1".to_string(),
            file_name: "Resume.pdf".to_string(),
            extracted_text: "[PDF File: Resume.pdf - Size: 10 bytes]".to_string(),
            ..Default::default()
        };
        let err = store.upsert_attachment("missing", &att).await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));

        store
            .upsert_consultant(&record("c1", "Alex", "t", None))
            .await
            .unwrap();
        store.upsert_attachment("c1", &att).await.unwrap();
        store.upsert_attachment("c1", &att).await.unwrap();
        assert_eq!(store.stats().await.unwrap().total_attachments, 1);

        sqlx::query("DELETE FROM consultants WHERE consultant_id = 'c1'")
            .execute(store.pool())
            .await
            .unwrap();
        assert_eq!(store.stats().await.unwrap().total_attachments, 0);
    }

    #[tokio::test]
    async fn name_search_matches_substrings_case_insensitively() {
        let (_dir, store) = open().await;
        for (id, name) in [("1", "Alex Rich"), ("2", "Richard Cole"), ("3", "Pat Stone")] {
            store
                .upsert_consultant(&record(id, name, name, None))
                .await
                .unwrap();
        }
        let hits = store.search_by_name("rich", 10).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Alex Rich", "Richard Cole"]);
    }

    #[tokio::test]
    async fn active_filter_is_case_sensitive() {
        let (_dir, store) = open().await;
        let mut lower = record("2", "B", "b", Some(vec![1.0]));
        lower.consultant_status = Some("active".to_string());
        store
            .upsert_consultant(&record("1", "A", "a", Some(vec![1.0])))
            .await
            .unwrap();
        store.upsert_consultant(&lower).await.unwrap();
        store
            .upsert_consultant(&record("3", "C", "c", None))
            .await
            .unwrap();

        assert_eq!(store.vector_candidates(false).await.unwrap().len(), 2);
        let active = store.vector_candidates(true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].consultant_id, "1");
    }

    #[tokio::test]
    async fn sync_run_log_round_trips() {
        let (_dir, store) = open().await;
        let mut run = SyncRun::start(SyncKind::Incremental);
        store.begin_sync_run(&run).await.unwrap();
        run.complete(
            SyncCounts {
                contacts_seen: 5,
                consultants_matched: 3,
                succeeded: 2,
                failed: 1,
                embedding_failures: 0,
            },
            None,
        );
        store.finish_sync_run(&run).await.unwrap();

        let runs = store.recent_sync_runs(5).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].counts.failed, 1);
        assert_eq!(runs[0].status, SyncStatus::Completed);
        let last = store
            .last_completed_run(SyncKind::Incremental)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.id, run.id);
    }
}
