//! Core data models for Consultant Index.
//!
//! These types describe the consultant records, attachments, and sync-run
//! log entries that flow through the synchronization pipeline and the
//! similarity-search engine.
//!
//! A [`ConsultantRecord`] is a fixed, typed view of one CRM contact. Its
//! canonical text and embedding live together in a single [`IndexedText`]
//! value so that the text can never be replaced without also replacing (or
//! clearing) the vector derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A professional reference attached to a consultant profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalReference {
    pub name: Option<String>,
    pub organization: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// Canonical text together with the embedding computed from it.
///
/// The fields are private: the only way to obtain an `IndexedText` is to
/// supply the text and the vector (or `None`) at the same time, which keeps
/// a stored embedding tied to the exact text it was generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedText {
    text: String,
    hash: String,
    #[serde(skip)]
    embedding: Option<Vec<f32>>,
}

impl IndexedText {
    /// Pair `text` with the embedding generated from it.
    pub fn new(text: String, embedding: Option<Vec<f32>>) -> Self {
        let hash = hash_text(&text);
        Self {
            text,
            hash,
            embedding,
        }
    }

    /// Canonical text with no embedding (generation skipped or failed).
    pub fn unembedded(text: String) -> Self {
        Self::new(text, None)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// SHA-256 of [`text`](Self::text), hex encoded.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

impl Default for IndexedText {
    fn default() -> Self {
        Self::unembedded(String::new())
    }
}

/// One consultant profile, keyed by the CRM's stable contact id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsultantRecord {
    pub consultant_id: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub home_phone: Option<String>,
    pub other_phone: Option<String>,
    pub fax: Option<String>,

    pub contact_type: Option<String>,
    pub consultant_status: Option<String>,
    pub contact_owner: Option<String>,
    pub lead_source: Option<String>,
    pub consultant_lead_source: Option<String>,
    pub account_name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,

    pub mailing_street: Option<String>,
    pub mailing_city: Option<String>,
    pub mailing_state: Option<String>,
    pub mailing_zip: Option<String>,
    pub mailing_country: Option<String>,
    pub location: Option<String>,

    pub practice_area: Option<String>,
    pub hourly_rate_low: Option<String>,
    pub hourly_rate_high: Option<String>,
    pub hourly_rate_range: Option<String>,

    pub business_strategy_skills: Vec<String>,
    pub finance_skills: Vec<String>,
    pub law_skills: Vec<String>,
    pub marketing_pr_skills: Vec<String>,
    pub nonprofit_skills: Vec<String>,

    pub professional_passion: Option<String>,
    pub projects_excite: Option<String>,
    pub open_to_fulltime: Option<String>,
    pub how_heard_about_us: Option<String>,
    pub referred_by: Option<String>,

    pub reference_1: ProfessionalReference,
    pub reference_2: ProfessionalReference,

    pub description: Option<String>,
    pub interview_notes: Option<String>,
    pub reference_call_notes: Option<String>,
    pub keywords: Option<String>,
    pub linkedin: Option<String>,
    pub linkedin_connection: Option<String>,
    pub invitation_lists: Vec<String>,

    pub created_time: Option<String>,
    pub modified_time: Option<String>,
    pub last_activity_time: Option<String>,

    /// Extracted text of the first attachment whose file name mentions "resume".
    pub resume_text: Option<String>,
    pub attachments: Vec<AttachmentRecord>,

    pub indexed: IndexedText,

    /// Original CRM document, kept verbatim for audit and replay.
    pub raw_source_payload: serde_json::Value,
}

impl ConsultantRecord {
    /// Lightweight projection used in search and name-lookup results.
    pub fn summary(&self) -> ConsultantSummary {
        ConsultantSummary {
            consultant_id: self.consultant_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            title: self.title.clone(),
            practice_area: self.practice_area.clone(),
            location: self.location.clone(),
            consultant_status: self.consultant_status.clone(),
            business_strategy_skills: self.business_strategy_skills.clone(),
            finance_skills: self.finance_skills.clone(),
            law_skills: self.law_skills.clone(),
            marketing_pr_skills: self.marketing_pr_skills.clone(),
            nonprofit_skills: self.nonprofit_skills.clone(),
            professional_passion: self.professional_passion.clone(),
            projects_excite: self.projects_excite.clone(),
            description: self.description.clone(),
            keywords: self.keywords.clone(),
            hourly_rate_low: self.hourly_rate_low.clone(),
            hourly_rate_high: self.hourly_rate_high.clone(),
        }
    }
}

/// A file attached to a consultant in the CRM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Unique within the parent consultant.
    pub attachment_id: String,
    pub file_name: String,
    pub file_size: Option<String>,
    pub file_type: Option<String>,
    pub created_time: Option<String>,
    pub modified_time: Option<String>,
    /// Extracted text, or a bracketed placeholder when extraction is unsupported.
    pub extracted_text: String,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// Search/lookup projection of a [`ConsultantRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsultantSummary {
    pub consultant_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub practice_area: Option<String>,
    pub location: Option<String>,
    pub consultant_status: Option<String>,
    pub business_strategy_skills: Vec<String>,
    pub finance_skills: Vec<String>,
    pub law_skills: Vec<String>,
    pub marketing_pr_skills: Vec<String>,
    pub nonprofit_skills: Vec<String>,
    pub professional_passion: Option<String>,
    pub projects_excite: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub hourly_rate_low: Option<String>,
    pub hourly_rate_high: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Full,
    Incremental,
    Replay,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Full => "full",
            SyncKind::Incremental => "incremental",
            SyncKind::Replay => "replay",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(SyncKind::Full),
            "incremental" => Some(SyncKind::Incremental),
            "replay" => Some(SyncKind::Replay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Started,
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Started => "started",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(SyncStatus::Started),
            "completed" => Some(SyncStatus::Completed),
            "failed" => Some(SyncStatus::Failed),
            _ => None,
        }
    }
}

/// Aggregate counters for one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    /// Raw contacts returned by the source.
    pub contacts_seen: u64,
    /// Contacts that passed the consultant filter.
    pub consultants_matched: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Persisted records whose embedding attempt failed (stored with a null vector).
    pub embedding_failures: u64,
}

/// Append-only log entry describing one sync run.
///
/// Created with status `started` and finalized exactly once with
/// [`complete`](SyncRun::complete) or [`fail`](SyncRun::fail).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: String,
    pub kind: SyncKind,
    pub status: SyncStatus,
    pub counts: SyncCounts,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: Option<i64>,
    pub error: Option<String>,
}

impl SyncRun {
    pub fn start(kind: SyncKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            status: SyncStatus::Started,
            counts: SyncCounts::default(),
            started_at: Utc::now(),
            finished_at: None,
            elapsed_ms: None,
            error: None,
        }
    }

    /// Finalize as completed. `error` carries non-fatal detail such as a
    /// page that could not be fetched.
    pub fn complete(&mut self, counts: SyncCounts, error: Option<String>) {
        self.counts = counts;
        self.error = error;
        self.finish(SyncStatus::Completed);
    }

    /// Finalize as failed with the given reason; counts are left untouched.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.error = Some(reason.into());
        self.finish(SyncStatus::Failed);
    }

    fn finish(&mut self, status: SyncStatus) {
        let now = Utc::now();
        self.status = status;
        self.elapsed_ms = Some((now - self.started_at).num_milliseconds());
        self.finished_at = Some(now);
    }
}

/// Hex-encoded SHA-256 of `text`.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
