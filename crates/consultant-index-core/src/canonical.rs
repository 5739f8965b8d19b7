//! Canonical text builder.
//!
//! Produces the single text blob that represents a [`ConsultantRecord`] for
//! embedding and persistence. The blob is a pure function of the record's
//! fields:
//!
//! 1. Fields are visited in a fixed order: identity, skills, narrative,
//!    address, references, source metadata, then attachment text.
//! 2. List-valued fields are joined with single spaces.
//! 3. Empty or missing fields contribute nothing.
//! 4. Whitespace runs collapse to one space; the ends are trimmed.
//! 5. The result is cut to the first [`CANONICAL_TEXT_BUDGET`] characters.
//!
//! # Example
//!
//! ```rust
//! use consultant_index_core::canonical::canonical_text;
//! use consultant_index_core::models::ConsultantRecord;
//!
//! let record = ConsultantRecord {
//!     name: "Alex Rich".to_string(),
//!     practice_area: Some("Marketing".to_string()),
//!     finance_skills: vec!["Budgeting".to_string(), "Audit".to_string()],
//!     ..Default::default()
//! };
//! assert_eq!(canonical_text(&record), "Alex Rich Marketing Budgeting Audit");
//! ```

use crate::models::ConsultantRecord;

/// Maximum number of characters in a canonical text (and in any text sent
/// to the embedding provider).
pub const CANONICAL_TEXT_BUDGET: usize = 6000;

/// Build the canonical text for `record`.
pub fn canonical_text(record: &ConsultantRecord) -> String {
    let mut parts: Vec<String> = Vec::new();

    // Identity
    push_str(&mut parts, Some(&record.name));
    push(&mut parts, &record.email);
    push(&mut parts, &record.title);
    push(&mut parts, &record.practice_area);
    push(&mut parts, &record.location);
    push(&mut parts, &record.phone);
    push(&mut parts, &record.mobile);
    push(&mut parts, &record.department);

    // Skills
    for skills in [
        &record.business_strategy_skills,
        &record.finance_skills,
        &record.law_skills,
        &record.marketing_pr_skills,
        &record.nonprofit_skills,
    ] {
        push_list(&mut parts, skills);
    }

    // Narrative
    push(&mut parts, &record.professional_passion);
    push(&mut parts, &record.projects_excite);
    push(&mut parts, &record.description);
    push(&mut parts, &record.keywords);
    push(&mut parts, &record.interview_notes);
    push(&mut parts, &record.reference_call_notes);

    // Address
    push(&mut parts, &record.mailing_street);
    push(&mut parts, &record.mailing_city);
    push(&mut parts, &record.mailing_state);
    push(&mut parts, &record.mailing_country);

    // References
    for reference in [&record.reference_1, &record.reference_2] {
        push(&mut parts, &reference.name);
        push(&mut parts, &reference.organization);
        push(&mut parts, &reference.title);
    }

    // Source metadata
    push(&mut parts, &record.how_heard_about_us);
    push(&mut parts, &record.referred_by);
    push(&mut parts, &record.linkedin);
    push(&mut parts, &record.contact_type);

    // Attachments
    for attachment in &record.attachments {
        push_str(&mut parts, Some(&attachment.extracted_text));
    }

    truncate_chars(&normalize_whitespace(&parts.join(" ")), CANONICAL_TEXT_BUDGET).to_string()
}

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Return the prefix of `text` holding at most `max_chars` characters.
///
/// Counts Unicode scalar values, never splits a character, and ignores word
/// boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn push(parts: &mut Vec<String>, value: &Option<String>) {
    push_str(parts, value.as_deref());
}

fn push_str(parts: &mut Vec<String>, value: Option<&str>) {
    if let Some(v) = value {
        if !v.is_empty() {
            parts.push(v.to_string());
        }
    }
}

fn push_list(parts: &mut Vec<String>, values: &[String]) {
    let joined = values
        .iter()
        .filter(|v| !v.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    push_str(parts, Some(&joined));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttachmentRecord, ProfessionalReference};

    fn sample() -> ConsultantRecord {
        ConsultantRecord {
            consultant_id: "c-1".to_string(),
            name: "Alex Rich".to_string(),
            email: Some("alex@example.com".to_string()),
            title: Some("Principal".to_string()),
            marketing_pr_skills: vec!["Brand Strategy".to_string(), String::new()],
            professional_passion: Some("  growing\n\nnonprofits ".to_string()),
            mailing_city: Some("Denver".to_string()),
            reference_1: ProfessionalReference {
                name: Some("Sam Lee".to_string()),
                ..Default::default()
            },
            contact_type: Some("Consultant".to_string()),
            attachments: vec![AttachmentRecord {
                attachment_id: "a-1".to_string(),
                file_name: "resume.txt".to_string(),
                extracted_text: "Ten years\tof marketing".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn fields_appear_in_fixed_order() {
        assert_eq!(
            canonical_text(&sample()),
            "Alex Rich alex@example.com Principal Brand Strategy growing nonprofits \
             Denver Sam Lee Consultant Ten years of marketing"
        );
    }

    #[test]
    fn missing_fields_contribute_nothing() {
        let record = ConsultantRecord {
            name: "Solo".to_string(),
            ..Default::default()
        };
        let text = canonical_text(&record);
        assert_eq!(text, "Solo");
        assert!(!text.contains("None"));
    }

    #[test]
    fn empty_record_yields_empty_text() {
        assert_eq!(canonical_text(&ConsultantRecord::default()), "");
    }

    #[test]
    fn identical_input_is_byte_identical() {
        let a = canonical_text(&sample());
        let _ = canonical_text(&ConsultantRecord::default());
        let b = canonical_text(&sample().clone());
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn long_text_is_cut_to_budget_prefix() {
        let long = "word ".repeat(2000);
        let record = ConsultantRecord {
            name: "Long".to_string(),
            description: Some(long.clone()),
            ..Default::default()
        };
        let untruncated = normalize_whitespace(&format!("Long {}", long));
        let text = canonical_text(&record);
        assert_eq!(text.chars().count(), CANONICAL_TEXT_BUDGET);
        assert_eq!(text, untruncated.chars().take(CANONICAL_TEXT_BUDGET).collect::<String>());
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        let text = "é".repeat(10);
        assert_eq!(truncate_chars(&text, 4), "éééé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn whitespace_is_normalized() {
        assert_eq!(normalize_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(normalize_whitespace("   "), "");
    }
}
