//! Result extraction: find the files a job produced.
//!
//! Every graph built by [`crate::graph::builder`] ends in an `export/url`
//! stage. Once the job has finished, that task's `result.files` lists one
//! signed URL per output file. A job that is still running, or failed
//! before exporting, simply has no files: that is an empty result, not an
//! error.

use crate::model::Job;
use serde::Serialize;

/// Operation tag of the export stage.
pub const EXPORT_URL: &str = "export/url";

/// One downloadable output of a job.
///
/// `file_index` and `total_files` let callers fan out one output per file
/// (e.g. one per sheet of an `all_sheets` spreadsheet export) instead of
/// flattening them into one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub url: String,
    pub filename: String,
    pub file_index: usize,
    pub total_files: usize,
}

/// List the files of the first task whose operation is `export_operation`.
pub fn extract_files(job: &Job, export_operation: &str) -> Vec<ResultItem> {
    let files = match job
        .find_task(export_operation)
        .and_then(|t| t.result.as_ref())
        .and_then(|r| r.files.as_ref())
    {
        Some(files) => files,
        None => return Vec::new(),
    };

    let total_files = files.len();
    files
        .iter()
        .enumerate()
        .map(|(file_index, f)| ResultItem {
            url: f.url.clone(),
            filename: f.filename.clone(),
            file_index,
            total_files,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn job(tasks: Value) -> Job {
        serde_json::from_value(json!({"id": "job-1", "status": "finished", "tasks": tasks})).unwrap()
    }

    #[test]
    fn two_files_become_two_items() {
        let j = job(json!([
            {"id": "c", "operation": "convert", "result": {"files": [{"filename": "x", "url": "u"}]}},
            {"id": "e", "operation": "export/url", "result": {"files": [
                {"filename": "Sheet1.csv", "url": "https://s/1"},
                {"filename": "Sheet2.csv", "url": "https://s/2"}
            ]}}
        ]));
        let items = extract_files(&j, EXPORT_URL);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].file_index, 0);
        assert_eq!(items[1].file_index, 1);
        assert!(items.iter().all(|i| i.total_files == 2));
        assert_eq!(items[1].filename, "Sheet2.csv");
        assert_eq!(items[1].url, "https://s/2");
    }

    #[test]
    fn no_files_is_empty_not_error() {
        let j = job(json!([{"id": "e", "operation": "export/url", "result": {"files": []}}]));
        assert!(extract_files(&j, EXPORT_URL).is_empty());
    }

    #[test]
    fn unfinished_export_is_empty() {
        let j = job(json!([{"id": "e", "operation": "export/url", "status": "waiting"}]));
        assert!(extract_files(&j, EXPORT_URL).is_empty());
    }

    #[test]
    fn missing_export_task_is_empty() {
        let j = job(json!([{"id": "i", "operation": "import/url"}]));
        assert!(extract_files(&j, EXPORT_URL).is_empty());
    }

    #[test]
    fn item_serialises_camel_case() {
        let item = ResultItem {
            url: "u".into(),
            filename: "f".into(),
            file_index: 1,
            total_files: 2,
        };
        let v = serde_json::to_value(item).unwrap();
        assert_eq!(v["fileIndex"], 1);
        assert_eq!(v["totalFiles"], 2);
    }
}
