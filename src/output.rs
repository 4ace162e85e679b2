//! Output types: binary attachments, per-item records and batch results.

use crate::error::{CloudConvertError, ItemError};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// A named blob of file bytes: a download result or an upload input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryAttachment {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_size: usize,
    #[serde(skip)]
    pub data: Bytes,
}

impl BinaryAttachment {
    pub fn new(file_name: impl Into<String>, mime_type: Option<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            file_name: file_name.into(),
            mime_type,
            file_size: data.len(),
            data,
        }
    }

    /// Read a local file into an attachment named after it.
    pub async fn from_path(path: impl AsRef<Path>, mime_type: Option<String>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self::new(name, mime_type, data))
    }

    /// Name safe to join onto a directory: the last path component only.
    pub fn safe_file_name(&self) -> String {
        let name = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if name.is_empty() || name == "." || name == ".." {
            "download".to_string()
        } else {
            name.to_string()
        }
    }

    /// Write the bytes into `dir`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, CloudConvertError> {
        let dir = dir.as_ref();
        let path = dir.join(self.safe_file_name());
        let write_err = |source| CloudConvertError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(dir).await.map_err(write_err)?;
        let tmp_path = dir.join(format!(".{}.part", self.safe_file_name()));
        tokio::fs::write(&tmp_path, &self.data)
            .await
            .map_err(write_err)?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;
        Ok(path)
    }
}

/// One output slot of a batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    /// Index of the batch item that produced this record.
    pub item: usize,
    pub json: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<BinaryAttachment>,
}

impl OutputRecord {
    pub fn json(item: usize, json: Value) -> Self {
        Self {
            item,
            json,
            binary: None,
        }
    }

    pub fn with_binary(mut self, binary: BinaryAttachment) -> Self {
        self.binary = Some(binary);
        self
    }
}

/// What one batch item produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemOutcome {
    Ok(Vec<OutputRecord>),
    Failed(ItemError),
}

impl ItemOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ItemOutcome::Ok(_))
    }

    /// The item's records; a failure becomes a single `{"error": ...}` record.
    pub fn records(&self) -> Vec<OutputRecord> {
        match self {
            ItemOutcome::Ok(records) => records.clone(),
            ItemOutcome::Failed(e) => vec![OutputRecord::json(e.item, json!({ "error": e.error }))],
        }
    }
}

/// Summary counters for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total_items: usize,
    pub succeeded_items: usize,
    pub failed_items: usize,
    pub records: usize,
    pub files_downloaded: usize,
    pub total_duration_ms: u64,
}

/// Result of [`crate::execute::run_batch`]: one outcome per input item, in
/// input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutput {
    pub outcomes: Vec<ItemOutcome>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Every record of every item, in item order.
    pub fn records(&self) -> Vec<OutputRecord> {
        self.outcomes.iter().flat_map(ItemOutcome::records).collect()
    }

    /// Treat any failed item as an error.
    pub fn into_result(self) -> Result<Self, CloudConvertError> {
        match self.outcomes.iter().find_map(|o| match o {
            ItemOutcome::Failed(e) => Some(e.clone()),
            ItemOutcome::Ok(_) => None,
        }) {
            Some(e) => Err(CloudConvertError::Internal(format!(
                "{}/{} items failed; first: {}",
                self.stats.failed_items, self.stats.total_items, e
            ))),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_renders_error_record() {
        let outcome = ItemOutcome::Failed(ItemError {
            item: 4,
            error: "boom".into(),
        });
        let records = outcome.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item, 4);
        assert_eq!(records[0].json, json!({"error": "boom"}));
        assert!(!outcome.is_ok());
    }

    #[test]
    fn safe_file_name_strips_directories() {
        let a = BinaryAttachment::new("../../etc/passwd", None, Vec::new());
        assert_eq!(a.safe_file_name(), "passwd");
        let a = BinaryAttachment::new("..", None, Vec::new());
        assert_eq!(a.safe_file_name(), "download");
        let a = BinaryAttachment::new("dir\\report.pdf", None, Vec::new());
        assert_eq!(a.safe_file_name(), "report.pdf");
    }

    #[tokio::test]
    async fn write_to_dir_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = BinaryAttachment::new("out.pdf", Some("application/pdf".into()), b"%PDF-1.7".to_vec());
        let path = a.write_to_dir(dir.path().join("nested")).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        assert_eq!(path.file_name().unwrap(), "out.pdf");
        assert!(!dir.path().join("nested/.out.pdf.part").exists());
    }

    #[test]
    fn attachment_serialises_without_bytes() {
        let a = BinaryAttachment::new("a.png", None, vec![1, 2, 3]);
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v, json!({"file_name": "a.png", "file_size": 3}));
    }

    #[test]
    fn into_result_fails_on_any_failed_item() {
        let out = BatchOutput {
            outcomes: vec![
                ItemOutcome::Ok(vec![]),
                ItemOutcome::Failed(ItemError {
                    item: 1,
                    error: "nope".into(),
                }),
            ],
            stats: BatchStats {
                total_items: 2,
                succeeded_items: 1,
                failed_items: 1,
                ..Default::default()
            },
        };
        assert_eq!(out.records().len(), 1);
        let err = out.into_result().unwrap_err();
        assert!(err.to_string().contains("1/2 items failed"));
    }
}
