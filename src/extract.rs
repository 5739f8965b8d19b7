//! Attachment text extraction.
//!
//! Turns a downloaded CRM attachment into the text that feeds the canonical
//! text of its consultant. Nothing here returns an error to the caller:
//! unsupported or unreadable files become bracketed placeholders so that a
//! bad attachment never fails the surrounding record.
//!
//! | Class | Recognized by | Result |
//! |-------|---------------|--------|
//! | PDF | content-type contains `pdf`, or `.pdf` | `[PDF File: …]` (or text when document extraction is on) |
//! | DOCX | content-type contains `docx` / WordprocessingML, or `.docx` | `[DOCX File: …]` (or text when document extraction is on) |
//! | DOC | `application/msword`, or `.doc` | `[DOCX File: …]` |
//! | Plain text | content-type contains `text`, or `.txt` | the decoded body |
//! | Other | anything else | `[File: … - Type: … - Size: …]` |

use std::fmt;
use std::io::Read;

use tracing::debug;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Text obtained for one attachment.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentText {
    /// Real text content.
    Text(String),
    /// File recognized but its text was not extracted.
    Placeholder(String),
    /// Download or decoding failed.
    Error(String),
    /// The CRM listed an attachment with no file name.
    Empty,
}

impl AttachmentText {
    pub fn into_string(self) -> String {
        match self {
            AttachmentText::Text(s) | AttachmentText::Placeholder(s) | AttachmentText::Error(s) => s,
            AttachmentText::Empty => String::new(),
        }
    }

    /// Placeholder for an attachment the CRM listed without an id.
    pub fn metadata_only(file_name: &str) -> Self {
        AttachmentText::Placeholder(format!("[Attachment metadata: {}]", file_name))
    }

    /// Placeholder for a download or decoding failure.
    pub fn error(file_name: &str, err: impl fmt::Display) -> Self {
        AttachmentText::Error(format!("[Error extracting {}: {}]", file_name, err))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileClass {
    Pdf,
    Docx,
    Doc,
    PlainText,
    Other,
}

fn classify(file_name: &str, content_type: &str) -> FileClass {
    let ct = content_type.to_lowercase();
    let name = file_name.to_lowercase();

    if ct.contains("pdf") || name.ends_with(".pdf") {
        FileClass::Pdf
    } else if ct.contains("docx") || ct == MIME_DOCX || name.ends_with(".docx") {
        FileClass::Docx
    } else if ct == MIME_DOC || name.ends_with(".doc") {
        FileClass::Doc
    } else if ct.contains("text") || name.ends_with(".txt") {
        FileClass::PlainText
    } else {
        FileClass::Other
    }
}

/// Produce the text for a downloaded attachment.
///
/// With `extract_documents`, PDF and DOCX bodies are parsed; any parse
/// failure (or an empty result) falls back to the placeholder.
pub fn extract_attachment(
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
    extract_documents: bool,
) -> AttachmentText {
    let size = bytes.len();
    let document_placeholder = |label: &str| {
        AttachmentText::Placeholder(format!("[{} File: {} - Size: {} bytes]", label, file_name, size))
    };

    match classify(file_name, content_type) {
        FileClass::Pdf if extract_documents => {
            parsed_or(extract_pdf(bytes), file_name, || document_placeholder("PDF"))
        }
        FileClass::Pdf => document_placeholder("PDF"),
        FileClass::Docx if extract_documents => {
            parsed_or(extract_docx(bytes), file_name, || document_placeholder("DOCX"))
        }
        FileClass::Docx | FileClass::Doc => document_placeholder("DOCX"),
        FileClass::PlainText => AttachmentText::Text(String::from_utf8_lossy(bytes).into_owned()),
        FileClass::Other => AttachmentText::Placeholder(format!(
            "[File: {} - Type: {} - Size: {} bytes]",
            file_name,
            content_type.to_lowercase(),
            size
        )),
    }
}

fn parsed_or(
    parsed: Result<String, ExtractError>,
    file_name: &str,
    fallback: impl FnOnce() -> AttachmentText,
) -> AttachmentText {
    match parsed {
        Ok(text) if !text.trim().is_empty() => AttachmentText::Text(text),
        Ok(_) => fallback(),
        Err(e) => {
            debug!(file_name, error = %e, "document extraction failed; using placeholder");
            fallback()
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    extract_w_t_elements(&doc_xml)
}

/// Concatenate every `<w:t>` run, separating paragraphs with a space.
fn extract_w_t_elements(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}
