//! Typed views of Zoho CRM payloads.
//!
//! Zoho returns loosely-typed JSON: lookups arrive as `{"name", "id"}`
//! objects, multi-select picklists as arrays, and numeric or boolean
//! custom fields as JSON scalars. Every field is normalized on the way in
//! so that [`CrmContact::into_record`] works with plain strings and lists.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use consultant_index_core::models::{AttachmentRecord, ConsultantRecord, ProfessionalReference};

use crate::error::RecordError;

/// One Zoho `Contacts` record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrmContact {
    #[serde(default, deserialize_with = "text")]
    pub id: Option<String>,

    #[serde(rename = "First_Name", default, deserialize_with = "text")]
    pub first_name: Option<String>,
    #[serde(rename = "Last_Name", default, deserialize_with = "text")]
    pub last_name: Option<String>,
    #[serde(rename = "Email", default, deserialize_with = "text")]
    pub email: Option<String>,
    #[serde(rename = "Phone", default, deserialize_with = "text")]
    pub phone: Option<String>,
    #[serde(rename = "Mobile", default, deserialize_with = "text")]
    pub mobile: Option<String>,
    #[serde(rename = "Home_Phone", default, deserialize_with = "text")]
    pub home_phone: Option<String>,
    #[serde(rename = "Other_Phone", default, deserialize_with = "text")]
    pub other_phone: Option<String>,
    #[serde(rename = "Fax", default, deserialize_with = "text")]
    pub fax: Option<String>,

    #[serde(rename = "Contact_Type", default, deserialize_with = "first_text")]
    pub contact_type: Option<String>,
    #[serde(rename = "Consultant_Status", default, deserialize_with = "text")]
    pub consultant_status: Option<String>,
    #[serde(rename = "Contact_Owner", default, deserialize_with = "text")]
    pub contact_owner: Option<String>,
    #[serde(rename = "Lead_Source", default, deserialize_with = "text")]
    pub lead_source: Option<String>,
    #[serde(rename = "Consultant_Lead_Source", default, deserialize_with = "text")]
    pub consultant_lead_source: Option<String>,
    #[serde(rename = "Account_Name", default, deserialize_with = "text")]
    pub account_name: Option<String>,
    #[serde(rename = "Title", default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(rename = "Department", default, deserialize_with = "text")]
    pub department: Option<String>,

    #[serde(rename = "Mailing_Street", default, deserialize_with = "text")]
    pub mailing_street: Option<String>,
    #[serde(rename = "Mailing_City", default, deserialize_with = "text")]
    pub mailing_city: Option<String>,
    #[serde(rename = "Mailing_State", default, deserialize_with = "text")]
    pub mailing_state: Option<String>,
    #[serde(rename = "Mailing_Zip", default, deserialize_with = "text")]
    pub mailing_zip: Option<String>,
    #[serde(rename = "Mailing_Country", default, deserialize_with = "text")]
    pub mailing_country: Option<String>,
    #[serde(rename = "Location", default, deserialize_with = "text")]
    pub location: Option<String>,

    #[serde(rename = "Practice_Area", default, deserialize_with = "text")]
    pub practice_area: Option<String>,
    #[serde(rename = "Hourly_Rate_Low", default, deserialize_with = "text")]
    pub hourly_rate_low: Option<String>,
    #[serde(rename = "Hourly_Rate_High", default, deserialize_with = "text")]
    pub hourly_rate_high: Option<String>,
    #[serde(rename = "Hourly_rate_range", default, deserialize_with = "text")]
    pub hourly_rate_range: Option<String>,

    #[serde(rename = "Business_Strategy_Skills", default, deserialize_with = "list")]
    pub business_strategy_skills: Vec<String>,
    #[serde(rename = "Finance_Skills", default, deserialize_with = "list")]
    pub finance_skills: Vec<String>,
    #[serde(rename = "Law_Skills", default, deserialize_with = "list")]
    pub law_skills: Vec<String>,
    #[serde(rename = "Marketing_and_Public_Relations_Skills", default, deserialize_with = "list")]
    pub marketing_pr_skills: Vec<String>,
    #[serde(rename = "Nonprofit_Skills", default, deserialize_with = "list")]
    pub nonprofit_skills: Vec<String>,

    #[serde(rename = "What_is_your_professional_passion", default, deserialize_with = "text")]
    pub professional_passion: Option<String>,
    #[serde(rename = "What_sort_of_projects_excite_you", default, deserialize_with = "text")]
    pub projects_excite: Option<String>,
    #[serde(
        rename = "Would_you_be_open_to_a_full_time_engagement",
        default,
        deserialize_with = "text"
    )]
    pub open_to_fulltime: Option<String>,
    #[serde(rename = "How_did_you_hear_about_us", default, deserialize_with = "text")]
    pub how_heard_about_us: Option<String>,
    #[serde(rename = "Referred_By", default, deserialize_with = "text")]
    pub referred_by: Option<String>,

    #[serde(rename = "Professional_Reference_1_Name", default, deserialize_with = "text")]
    pub reference_1_name: Option<String>,
    #[serde(rename = "Professional_Reference_1_Organization", default, deserialize_with = "text")]
    pub reference_1_organization: Option<String>,
    #[serde(rename = "Professional_Reference_1_Title", default, deserialize_with = "text")]
    pub reference_1_title: Option<String>,
    #[serde(rename = "Professional_Reference_1_Email", default, deserialize_with = "text")]
    pub reference_1_email: Option<String>,
    #[serde(rename = "Professional_Reference_1_Phone", default, deserialize_with = "text")]
    pub reference_1_phone: Option<String>,
    #[serde(
        rename = "Professional_Reference_1_Notes_Relationship_Histor",
        default,
        deserialize_with = "text"
    )]
    pub reference_1_notes: Option<String>,
    #[serde(rename = "Professional_Reference_2_Name", default, deserialize_with = "text")]
    pub reference_2_name: Option<String>,
    #[serde(rename = "Professional_Reference_2_Organization", default, deserialize_with = "text")]
    pub reference_2_organization: Option<String>,
    #[serde(rename = "Professional_Reference_2_Title", default, deserialize_with = "text")]
    pub reference_2_title: Option<String>,
    #[serde(rename = "Professional_Reference_2_Email", default, deserialize_with = "text")]
    pub reference_2_email: Option<String>,
    #[serde(rename = "Professional_Reference_2_Phone", default, deserialize_with = "text")]
    pub reference_2_phone: Option<String>,
    #[serde(
        rename = "Professional_Reference_2_Notes_Relationship_Histor",
        default,
        deserialize_with = "text"
    )]
    pub reference_2_notes: Option<String>,

    #[serde(rename = "Description", default, deserialize_with = "text")]
    pub description: Option<String>,
    #[serde(rename = "Interview_Notes", default, deserialize_with = "text")]
    pub interview_notes: Option<String>,
    #[serde(rename = "Reference_Call_Notes", default, deserialize_with = "text")]
    pub reference_call_notes: Option<String>,
    #[serde(rename = "Keywords", default, deserialize_with = "text")]
    pub keywords: Option<String>,
    #[serde(rename = "LinkedIn", default, deserialize_with = "text")]
    pub linkedin: Option<String>,
    #[serde(rename = "LinkedIn_Connection", default, deserialize_with = "text")]
    pub linkedin_connection: Option<String>,
    #[serde(rename = "Invitation_Lists", default, deserialize_with = "list")]
    pub invitation_lists: Vec<String>,

    #[serde(rename = "Created_Time", default, deserialize_with = "text")]
    pub created_time: Option<String>,
    #[serde(rename = "Modified_Time", default, deserialize_with = "text")]
    pub modified_time: Option<String>,
    #[serde(rename = "Last_Activity_Time", default, deserialize_with = "text")]
    pub last_activity_time: Option<String>,
}

impl CrmContact {
    /// Parse one raw record.
    pub fn from_value(raw: &Value) -> Result<Self, RecordError> {
        if !raw.is_object() {
            return Err(RecordError::Malformed("record is not a JSON object".to_string()));
        }
        serde_json::from_value(raw.clone()).map_err(|e| RecordError::Malformed(e.to_string()))
    }

    /// `"<first> <last>"`, trimmed.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    /// Build the structured record. Canonical text and embedding are left
    /// empty; the sync pipeline fills them in.
    pub fn into_record(
        self,
        raw: Value,
        attachments: Vec<AttachmentRecord>,
    ) -> Result<ConsultantRecord, RecordError> {
        let consultant_id = self
            .id
            .clone()
            .ok_or_else(|| RecordError::Malformed("record has no id".to_string()))?;
        let name = self.full_name();

        let resume_text = attachments
            .iter()
            .find(|a| a.file_name.to_lowercase().contains("resume"))
            .map(|a| a.extracted_text.clone());

        Ok(ConsultantRecord {
            consultant_id,
            name,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            mobile: self.mobile,
            home_phone: self.home_phone,
            other_phone: self.other_phone,
            fax: self.fax,
            contact_type: self.contact_type,
            consultant_status: self.consultant_status,
            contact_owner: self.contact_owner,
            lead_source: self.lead_source,
            consultant_lead_source: self.consultant_lead_source,
            account_name: self.account_name,
            title: self.title,
            department: self.department,
            mailing_street: self.mailing_street,
            mailing_city: self.mailing_city,
            mailing_state: self.mailing_state,
            mailing_zip: self.mailing_zip,
            mailing_country: self.mailing_country,
            location: self.location,
            practice_area: self.practice_area,
            hourly_rate_low: self.hourly_rate_low,
            hourly_rate_high: self.hourly_rate_high,
            hourly_rate_range: self.hourly_rate_range,
            business_strategy_skills: self.business_strategy_skills,
            finance_skills: self.finance_skills,
            law_skills: self.law_skills,
            marketing_pr_skills: self.marketing_pr_skills,
            nonprofit_skills: self.nonprofit_skills,
            professional_passion: self.professional_passion,
            projects_excite: self.projects_excite,
            open_to_fulltime: self.open_to_fulltime,
            how_heard_about_us: self.how_heard_about_us,
            referred_by: self.referred_by,
            reference_1: ProfessionalReference {
                name: self.reference_1_name,
                organization: self.reference_1_organization,
                title: self.reference_1_title,
                email: self.reference_1_email,
                phone: self.reference_1_phone,
                notes: self.reference_1_notes,
            },
            reference_2: ProfessionalReference {
                name: self.reference_2_name,
                organization: self.reference_2_organization,
                title: self.reference_2_title,
                email: self.reference_2_email,
                phone: self.reference_2_phone,
                notes: self.reference_2_notes,
            },
            description: self.description,
            interview_notes: self.interview_notes,
            reference_call_notes: self.reference_call_notes,
            keywords: self.keywords,
            linkedin: self.linkedin,
            linkedin_connection: self.linkedin_connection,
            invitation_lists: self.invitation_lists,
            created_time: self.created_time,
            modified_time: self.modified_time,
            last_activity_time: self.last_activity_time,
            resume_text,
            attachments,
            indexed: Default::default(),
            raw_source_payload: raw,
        })
    }
}

/// One entry of a contact's `Attachments` related list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttachmentMeta {
    #[serde(default, deserialize_with = "text")]
    pub id: Option<String>,
    #[serde(rename = "File_Name", default, deserialize_with = "text")]
    pub file_name: Option<String>,
    #[serde(rename = "Size", default, deserialize_with = "text")]
    pub size: Option<String>,
    #[serde(rename = "File_Type", default, deserialize_with = "text")]
    pub file_type: Option<String>,
    #[serde(rename = "Created_Time", default, deserialize_with = "text")]
    pub created_time: Option<String>,
    #[serde(rename = "Modified_Time", default, deserialize_with = "text")]
    pub modified_time: Option<String>,
}

impl AttachmentMeta {
    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("")
    }

    /// Pair metadata with its extracted text. The id falls back to the file
    /// name when the CRM omitted it.
    pub fn into_record(self, extracted_text: String) -> AttachmentRecord {
        let file_name = self.file_name.unwrap_or_default();
        AttachmentRecord {
            attachment_id: self.id.unwrap_or_else(|| file_name.clone()),
            file_name,
            file_size: self.size,
            file_type: self.file_type,
            created_time: self.created_time,
            modified_time: self.modified_time,
            extracted_text,
            embedding: None,
        }
    }
}

/// Render a scalar or lookup value as text. Empty strings become `None`.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get("name").and_then(value_to_text),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
    }
}

/// Render a multi-select value as a list.
pub fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_to_text).collect(),
        other => value_to_text(other).into_iter().collect(),
    }
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_to_text))
}

fn first_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Array(items)) => items.first().and_then(value_to_text),
        other => other.as_ref().and_then(value_to_text),
    })
}

fn list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().map(value_to_list).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_lookup_list_and_scalar_fields() {
        let raw = json!({
            "id": 4_150_868_000_000_123_u64,
            "First_Name": "Alex",
            "Last_Name": "Rich",
            "Contact_Type": ["Consultant", "Client"],
            "Account_Name": {"name": "Rich Advisory", "id": "77"},
            "Finance_Skills": ["Audit", "", "Tax"],
            "Law_Skills": "Contracts",
            "Hourly_Rate_Low": 150,
            "Would_you_be_open_to_a_full_time_engagement": false,
            "Description": "   ",
            "Keywords": null
        });
        let contact = CrmContact::from_value(&raw).unwrap();
        assert_eq!(contact.id.as_deref(), Some("4150868000000123"));
        assert_eq!(contact.contact_type.as_deref(), Some("Consultant"));
        assert_eq!(contact.account_name.as_deref(), Some("Rich Advisory"));
        assert_eq!(contact.finance_skills, vec!["Audit", "Tax"]);
        assert_eq!(contact.law_skills, vec!["Contracts"]);
        assert_eq!(contact.hourly_rate_low.as_deref(), Some("150"));
        assert_eq!(contact.open_to_fulltime.as_deref(), Some("false"));
        assert_eq!(contact.description, None);
        assert_eq!(contact.keywords, None);
    }

    #[test]
    fn into_record_builds_name_references_and_resume() {
        let raw = json!({
            "id": "c-9",
            "First_Name": "Sam",
            "Professional_Reference_1_Name": "Pat Lee",
            "Professional_Reference_1_Organization": "Acme"
        });
        let attachments = vec![
            AttachmentMeta {
                id: Some("a1".into()),
                file_name: Some("cover.txt".into()),
                ..Default::default()
            }
            .into_record("cover letter".into()),
            AttachmentMeta {
                file_name: Some("Sam_RESUME.pdf".into()),
                ..Default::default()
            }
            .into_record("[PDF File: Sam_RESUME.pdf - Size: 3 bytes]".into()),
        ];
        let record = CrmContact::from_value(&raw)
            .unwrap()
            .into_record(raw.clone(), attachments)
            .unwrap();

        assert_eq!(record.name, "Sam");
        assert_eq!(record.reference_1.organization.as_deref(), Some("Acme"));
        assert_eq!(
            record.resume_text.as_deref(),
            Some("[PDF File: Sam_RESUME.pdf - Size: 3 bytes]")
        );
        assert_eq!(record.attachments[1].attachment_id, "Sam_RESUME.pdf");
        assert_eq!(record.raw_source_payload, raw);
    }

    #[test]
    fn missing_id_is_malformed() {
        let contact = CrmContact::from_value(&json!({"First_Name": "No Id"})).unwrap();
        let err = contact.into_record(json!({}), Vec::new()).unwrap_err();
        assert!(matches!(err, RecordError::Malformed(_)));
        assert!(CrmContact::from_value(&json!([1, 2])).is_err());
    }
}
