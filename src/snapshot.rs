//! Recovery snapshot of every matched consultant.
//!
//! A full sync writes all processed records to one pretty-printed JSON
//! array. An existing snapshot is first renamed to
//! `<file>.backup.<YYYYmmdd_HHMMSS>`, never deleted or overwritten. The
//! snapshot omits embeddings; `cidx replay` rebuilds them.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use consultant_index_core::models::ConsultantRecord;

/// Write `records` to `path`, rotating any previous snapshot.
///
/// Returns the backup path when a previous snapshot was rotated.
pub fn write_snapshot(path: &Path, records: &[ConsultantRecord]) -> Result<Option<PathBuf>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let backup = if path.exists() {
        let backup = backup_path(path);
        std::fs::rename(path, &backup).with_context(|| {
            format!(
                "Failed to rotate snapshot {} to {}",
                path.display(),
                backup.display()
            )
        })?;
        info!(backup = %backup.display(), "rotated previous snapshot");
        Some(backup)
    } else {
        None
    };

    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    info!(path = %path.display(), records = records.len(), "wrote snapshot");

    Ok(backup)
}

/// Load a snapshot written by [`write_snapshot`].
pub fn load_snapshot(path: &Path) -> Result<Vec<ConsultantRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
}

/// `<path>.backup.<timestamp>`, with a numeric suffix if that name is taken.
fn backup_path(path: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let base = format!("{}.backup.{}", path.display(), stamp);
    let mut candidate = PathBuf::from(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}.{}", base, n));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use consultant_index_core::models::IndexedText;

    fn record(id: &str) -> ConsultantRecord {
        ConsultantRecord {
            consultant_id: id.to_string(),
            name: format!("Consultant {}", id),
            indexed: IndexedText::new("text".to_string(), Some(vec![1.0, 2.0])),
            ..Default::default()
        }
    }

    #[test]
    fn rotates_instead_of_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("consultants.json");

        assert!(write_snapshot(&path, &[record("1")]).unwrap().is_none());
        let first = std::fs::read_to_string(&path).unwrap();

        let backup = write_snapshot(&path, &[record("1"), record("2")])
            .unwrap()
            .expect("previous snapshot rotated");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), first);
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("consultants.json.backup."));

        let third = write_snapshot(&path, &[record("3")]).unwrap().unwrap();
        assert_ne!(third, backup);
        assert_eq!(load_snapshot(&path).unwrap().len(), 1);
    }

    #[test]
    fn snapshot_omits_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        write_snapshot(&path, &[record("1")]).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded[0].consultant_id, "1");
        assert_eq!(loaded[0].indexed.text(), "text");
        assert!(loaded[0].indexed.embedding().is_none());
        assert!(!std::fs::read_to_string(&path).unwrap().contains("embedding"));
    }
}
