//! Wire types for CloudConvert API responses and requests.
//!
//! Responses keep every field the crate does not model in an `extra` map,
//! so a job serialised back to JSON is the job the API returned.

use crate::error::CloudConvertError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `{"data": ...}` wrapper around single-resource responses.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// A CloudConvert job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tasks: Vec<TaskResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// The first task with the given operation tag.
    pub fn find_task(&self, operation: &str) -> Option<&TaskResult> {
        self.tasks.iter().find(|t| t.operation == operation)
    }
}

/// One task of a job, or a standalone task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskOutput>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `result` object of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<ResultFile>>,
    /// Present on `import/upload` tasks: where and how to post the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<UploadForm>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A produced file: a signed download URL and its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    #[serde(default)]
    pub filename: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Multipart form target returned by an `import/upload` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadForm {
    pub url: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub links: Option<PageLinks>,
    #[serde(default)]
    pub meta: Option<Value>,
}

impl Page {
    /// `true` when the page advertises a next-page link.
    pub fn has_next(&self) -> bool {
        self.links
            .as_ref()
            .and_then(|l| l.next.as_deref())
            .is_some_and(|next| !next.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
}

/// An entry of the `/operations` catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEntry {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub input_format: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /jobs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobRequest {
    pub tasks: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub webhook_events: Vec<String>,
}

impl JobRequest {
    pub fn new(tasks: Value) -> Self {
        Self {
            tasks,
            ..Default::default()
        }
    }

    pub fn tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag.filter(|t| !t.is_empty());
        self
    }

    pub fn webhook(mut self, url: Option<String>, events: Vec<String>) -> Self {
        self.webhook_url = url.filter(|u| !u.is_empty());
        self.webhook_events = events;
        self
    }
}

/// Decode a JSON value into `T`, naming the URL it came from on failure.
pub(crate) fn decode<T: DeserializeOwned>(url: &str, value: Value) -> Result<T, CloudConvertError> {
    serde_json::from_value(value).map_err(|source| CloudConvertError::Decode {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_keeps_unknown_fields() {
        let raw = json!({
            "id": "job-1",
            "status": "finished",
            "created_at": "2026-01-01T00:00:00+00:00",
            "tasks": [{
                "id": "t1",
                "name": "export-file",
                "operation": "export/url",
                "status": "finished",
                "engine": "cloudconvert",
                "result": {"files": [{"filename": "a.pdf", "url": "https://s/a.pdf", "size": 10}]}
            }]
        });
        let job: Job = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(job.tasks.len(), 1);
        assert_eq!(job.extra["created_at"], json!("2026-01-01T00:00:00+00:00"));
        assert_eq!(job.tasks[0].extra["engine"], json!("cloudconvert"));
        assert_eq!(serde_json::to_value(&job).unwrap(), raw);
    }

    #[test]
    fn find_task_by_operation() {
        let job: Job = serde_json::from_value(json!({
            "id": "j",
            "tasks": [
                {"id": "a", "operation": "import/url"},
                {"id": "b", "operation": "export/url"}
            ]
        }))
        .unwrap();
        assert_eq!(job.find_task("export/url").map(|t| t.id.as_str()), Some("b"));
        assert!(job.find_task("archive").is_none());
    }

    #[test]
    fn page_next_link() {
        let p: Page = serde_json::from_value(json!({"data": [], "links": {"next": null}})).unwrap();
        assert!(!p.has_next());
        let p: Page =
            serde_json::from_value(json!({"data": [], "links": {"next": "https://api/jobs?page=2"}}))
                .unwrap();
        assert!(p.has_next());
        let p: Page = serde_json::from_value(json!({"data": [1]})).unwrap();
        assert!(!p.has_next());
    }

    #[test]
    fn job_request_omits_empty_fields() {
        let body = JobRequest::new(json!({"a": {"operation": "import/url"}}))
            .tag(Some(String::new()))
            .webhook(None, vec![]);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"tasks": {"a": {"operation": "import/url"}}})
        );
    }

    #[test]
    fn decode_names_url_on_failure() {
        let err = decode::<Job>("https://api/jobs/x", json!({"status": 1})).unwrap_err();
        assert!(err.to_string().contains("https://api/jobs/x"));
    }
}
