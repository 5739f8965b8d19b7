//! Zoho CRM connector.
//!
//! Implements [`CrmSource`] against the Zoho CRM v2 REST API:
//!
//! - `POST {accounts_url}/oauth/v2/token` with `grant_type=refresh_token`
//! - `GET {api_url}/Contacts?page=N&per_page=M&fields=…` until
//!   `info.more_records` is false or a page comes back empty
//! - `GET {api_url}/Contacts/{id}/Attachments`
//! - `GET {api_url}/Contacts/{id}/Attachments/{attachment_id}`
//!
//! All API calls send `Authorization: Zoho-oauthtoken <token>`. Every call
//! is bounded by the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::{CrmConfig, CrmCredentials};
use crate::error::SourceError;
use crate::extract::{extract_attachment, AttachmentText};
use crate::models::AttachmentMeta;
use crate::traits::{CrmSource, FetchedRecords};

/// Contact fields requested on every page.
pub const CONTACT_FIELDS: &str = "id,First_Name,Last_Name,Email,Phone,Mobile,Home_Phone,\
Other_Phone,Fax,Contact_Type,Consultant_Status,Contact_Owner,Lead_Source,Consultant_Lead_Source,\
Account_Name,Title,Department,Mailing_Street,Mailing_City,Mailing_State,Mailing_Zip,\
Mailing_Country,Location,Practice_Area,Hourly_Rate_Low,Hourly_Rate_High,Hourly_rate_range,\
Business_Strategy_Skills,Finance_Skills,Law_Skills,Marketing_and_Public_Relations_Skills,\
Nonprofit_Skills,What_is_your_professional_passion,What_sort_of_projects_excite_you,\
Would_you_be_open_to_a_full_time_engagement,How_did_you_hear_about_us,Referred_By,\
Professional_Reference_1_Name,Professional_Reference_1_Organization,\
Professional_Reference_1_Title,Professional_Reference_1_Email,Professional_Reference_1_Phone,\
Professional_Reference_1_Notes_Relationship_Histor,Professional_Reference_2_Name,\
Professional_Reference_2_Organization,Professional_Reference_2_Title,\
Professional_Reference_2_Email,Professional_Reference_2_Phone,\
Professional_Reference_2_Notes_Relationship_Histor,Description,Interview_Notes,\
Reference_Call_Notes,Keywords,LinkedIn,LinkedIn_Connection,Invitation_Lists,Created_Time,\
Modified_Time,Last_Activity_Time";

pub struct ZohoConnector {
    client: reqwest::Client,
    accounts_url: String,
    api_url: String,
    page_size: u32,
    credentials: CrmCredentials,
    extract_documents: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    info: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
struct PageInfo {
    #[serde(default)]
    more_records: bool,
}

impl ZohoConnector {
    pub fn new(
        config: &CrmConfig,
        credentials: CrmCredentials,
        extract_documents: bool,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            accounts_url: config.accounts_url.trim_end_matches('/').to_string(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            credentials,
            extract_documents,
        })
    }

    fn auth_header(token: &str) -> String {
        format!("Zoho-oauthtoken {}", token)
    }

    /// Fetch one page. `None` means the API reported no content.
    async fn fetch_page(
        &self,
        token: &str,
        page: u32,
        modified_since: Option<&str>,
    ) -> Result<Option<ListResponse>, SourceError> {
        let url = format!("{}/Contacts", self.api_url);
        let mut request = self
            .client
            .get(&url)
            .header("Authorization", Self::auth_header(token))
            .query(&[
                ("page", page.to_string()),
                ("per_page", self.page_size.to_string()),
                ("fields", CONTACT_FIELDS.to_string()),
            ]);
        if let Some(since) = modified_since {
            request = request.header("If-Modified-Since", since);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED => return Ok(None),
            status if !status.is_success() => {
                return Err(SourceError::Status {
                    status: status.as_u16(),
                    url,
                })
            }
            _ => {}
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    /// GET `url`, returning the content type and body.
    async fn download(&self, url: &str, token: &str) -> Result<(String, Vec<u8>), SourceError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", Self::auth_header(token))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = response.bytes().await?;
        Ok((content_type, bytes.to_vec()))
    }
}

#[async_trait]
impl CrmSource for ZohoConnector {
    async fn authenticate(&self) -> Result<String, SourceError> {
        let url = format!("{}/oauth/v2/token", self.accounts_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Auth(format!("token endpoint returned {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        match body.access_token {
            Some(token) if !token.is_empty() => {
                debug!("obtained Zoho access token");
                Ok(token)
            }
            _ => Err(SourceError::Auth(
                body.error
                    .unwrap_or_else(|| "no access token in response".to_string()),
            )),
        }
    }

    async fn fetch_all_records(
        &self,
        token: &str,
        modified_since: Option<DateTime<Utc>>,
    ) -> FetchedRecords {
        let since = modified_since.map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, false));
        let mut fetched = FetchedRecords::default();
        let mut page = 1u32;

        loop {
            info!(page, "fetching contacts page");
            match self.fetch_page(token, page, since.as_deref()).await {
                Ok(None) => break,
                Ok(Some(list)) => {
                    if list.data.is_empty() {
                        break;
                    }
                    fetched.records.extend(list.data);
                    fetched.pages += 1;
                    if !list.info.more_records {
                        break;
                    }
                    page += 1;
                }
                Err(e) => {
                    error!(page, error = %e, "failed to fetch contacts page; stopping pagination");
                    fetched.error = Some(format!("page {}: {}", page, e));
                    break;
                }
            }
        }

        info!(
            total = fetched.records.len(),
            pages = fetched.pages,
            "fetched contacts"
        );
        fetched
    }

    async fn fetch_attachments(
        &self,
        record_id: &str,
        token: &str,
    ) -> Result<Vec<AttachmentMeta>, SourceError> {
        let url = format!("{}/Contacts/{}/Attachments", self.api_url, record_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", Self::auth_header(token))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        let list: ListResponse =
            serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))?;
        let attachments = list
            .data
            .into_iter()
            .map(serde_json::from_value::<AttachmentMeta>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        debug!(consultant_id = record_id, count = attachments.len(), "listed attachments");
        Ok(attachments)
    }

    async fn fetch_attachment_content(
        &self,
        attachment: &AttachmentMeta,
        record_id: &str,
        token: &str,
    ) -> AttachmentText {
        let file_name = attachment.file_name();
        if file_name.is_empty() {
            return AttachmentText::Empty;
        }
        let Some(attachment_id) = attachment.id.as_deref() else {
            return AttachmentText::metadata_only(file_name);
        };

        let url = format!(
            "{}/Contacts/{}/Attachments/{}",
            self.api_url, record_id, attachment_id
        );
        debug!(consultant_id = record_id, file_name, "downloading attachment");

        let downloaded = self.download(&url, token).await;

        match downloaded {
            Ok((content_type, bytes)) => {
                extract_attachment(file_name, &content_type, &bytes, self.extract_documents)
            }
            Err(e) => {
                error!(consultant_id = record_id, file_name, error = %e, "attachment download failed");
                AttachmentText::error(file_name, e)
            }
        }
    }
}

/// True when the raw record's classification field is "consultant" in any
/// letter case. A list-valued field is judged by its first element.
pub fn is_consultant(raw: &Value) -> bool {
    let kind = match raw.get("Contact_Type") {
        Some(Value::Array(items)) => items.first(),
        other => other,
    };
    kind.and_then(crate::models::value_to_text)
        .is_some_and(|t| t.to_lowercase() == "consultant")
}
