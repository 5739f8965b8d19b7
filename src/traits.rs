//! The CRM source seam.
//!
//! The sync orchestrator talks to the CRM only through [`CrmSource`], so
//! tests can drive the whole pipeline with an in-process fake and other
//! CRMs can be added without touching the orchestrator.
//!
//! ```text
//! authenticate() ──► token
//!        │
//!        ▼
//! fetch_all_records(token) ──► [raw JSON records]
//!        │   (per matched record)
//!        ▼
//! fetch_attachments(id, token) ──► [AttachmentMeta]
//!        │   (per attachment)
//!        ▼
//! fetch_attachment_content(meta, id, token) ──► AttachmentText
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::SourceError;
use crate::extract::AttachmentText;
use crate::models::AttachmentMeta;

/// Every record the source returned for one run.
#[derive(Debug, Clone, Default)]
pub struct FetchedRecords {
    pub records: Vec<Value>,
    /// Pages successfully read.
    pub pages: u32,
    /// Set when paging stopped early because a page could not be fetched.
    /// Records from earlier pages are still returned.
    pub error: Option<String>,
}

/// A CRM that holds consultant contact records.
#[async_trait]
pub trait CrmSource: Send + Sync {
    /// Exchange the long-lived refresh credential for an access token.
    /// Called once per sync run; tokens are never cached across runs.
    async fn authenticate(&self) -> Result<String, SourceError>;

    /// Page through every contact. With `modified_since`, only contacts
    /// changed after that instant are requested.
    async fn fetch_all_records(
        &self,
        token: &str,
        modified_since: Option<DateTime<Utc>>,
    ) -> FetchedRecords;

    /// List the attachments of one contact.
    async fn fetch_attachments(
        &self,
        record_id: &str,
        token: &str,
    ) -> Result<Vec<AttachmentMeta>, SourceError>;

    /// Download one attachment and turn it into text. Never fails: errors
    /// become an [`AttachmentText::Error`] placeholder.
    async fn fetch_attachment_content(
        &self,
        attachment: &AttachmentMeta,
        record_id: &str,
        token: &str,
    ) -> AttachmentText;
}
