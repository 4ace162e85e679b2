//! HTTP client for the CloudConvert v2 API.
//!
//! [`CloudConvertClient`] is built once per invocation from a
//! [`ClientConfig`] and passed explicitly to whatever needs it. It adds the
//! bearer token, picks the regular or sync base URL, drops empty bodies and
//! query strings, and turns every non-2xx answer into
//! [`CloudConvertError::Api`] carrying the method, URL and the API's
//! message. There are no retries: a failed call fails the caller.

use crate::config::ClientConfig;
use crate::error::CloudConvertError;
use crate::extract::ResultItem;
use crate::filters::{ListFilter, Query};
use crate::formats::{self, FormatDirection, FormatOption};
use crate::graph::Operation;
use crate::model::{decode, Envelope, Job, JobRequest, OperationEntry, Page, TaskResult, UploadForm};
use crate::output::BinaryAttachment;
use crate::paginate::{self, PageSource};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Longest API error body quoted in an error message.
const BODY_PREVIEW_LIMIT: usize = 512;

/// Authenticated CloudConvert API client.
#[derive(Debug, Clone)]
pub struct CloudConvertClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl CloudConvertClient {
    pub fn new(config: ClientConfig) -> Result<Self, CloudConvertError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|source| CloudConvertError::Http {
                url: config.api_base_url().to_string(),
                source,
            })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Core request ─────────────────────────────────────────────────────

    /// Send one JSON request and return the decoded body.
    ///
    /// `body` is omitted when `None` or an empty object; `query` is omitted
    /// when empty. `sync` selects the blocking sync base URL. An empty
    /// response body (e.g. `204 No Content`) yields `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        query: &Query,
        sync: bool,
    ) -> Result<Value, CloudConvertError> {
        let base = if sync {
            self.config.sync_base_url()
        } else {
            self.config.api_base_url()
        };
        let url = format!("{base}{endpoint}");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.config.api_key)
            .header(ACCEPT, "application/json");
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body.filter(|b| !is_empty_body(b)) {
            req = req.json(body);
        }

        debug!("{} {}{}", method, url, if sync { " (sync)" } else { "" });
        let response = req.send().await.map_err(|source| CloudConvertError::Http {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| CloudConvertError::Http {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(CloudConvertError::Api {
                method: method.to_string(),
                url,
                status: status.as_u16(),
                message: api_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|source| CloudConvertError::Decode { url, source })
    }

    /// [`Self::request`] for `{"data": T}` responses.
    async fn request_data<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        query: &Query,
        sync: bool,
    ) -> Result<T, CloudConvertError> {
        let value = self.request(method, endpoint, body, query, sync).await?;
        let envelope: Envelope<T> = decode(endpoint, value)?;
        Ok(envelope.data)
    }

    async fn list_page(
        &self,
        endpoint: &str,
        filter: &ListFilter,
        limit: usize,
    ) -> Result<Page, CloudConvertError> {
        let mut query = filter.to_query();
        query.push(("per_page".to_string(), limit.to_string()));
        self.fetch_page(endpoint, &query).await
    }

    // ── Jobs ─────────────────────────────────────────────────────────────

    /// `POST /jobs`. With `wait`, the sync endpoint answers once the job has
    /// finished, so export URLs are already present.
    pub async fn create_job(&self, job: &JobRequest, wait: bool) -> Result<Job, CloudConvertError> {
        let body = serde_json::to_value(job).map_err(|source| CloudConvertError::Decode {
            url: "/jobs".to_string(),
            source,
        })?;
        let job: Job = self
            .request_data(Method::POST, "/jobs", Some(&body), &Query::new(), wait)
            .await?;
        info!("Created job {} ({})", job.id, job.status);
        Ok(job)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Job, CloudConvertError> {
        self.request_data(Method::GET, &format!("/jobs/{job_id}"), None, &Query::new(), false)
            .await
    }

    /// Block until the job has finished (or failed).
    pub async fn wait_job(&self, job_id: &str) -> Result<Job, CloudConvertError> {
        self.request_data(Method::GET, &format!("/jobs/{job_id}"), None, &Query::new(), true)
            .await
    }

    /// One page of at most `limit` jobs.
    pub async fn list_jobs(&self, filter: &ListFilter, limit: usize) -> Result<Page, CloudConvertError> {
        self.list_page("/jobs", filter, limit).await
    }

    /// Every job matching `filter`.
    pub async fn list_all_jobs(&self, filter: &ListFilter) -> Result<Vec<Value>, CloudConvertError> {
        paginate::fetch_all(self, "/jobs", &filter.to_query()).await
    }

    pub async fn delete_job(&self, job_id: &str) -> Result<(), CloudConvertError> {
        self.request(Method::DELETE, &format!("/jobs/{job_id}"), None, &Query::new(), false)
            .await?;
        info!("Deleted job {}", job_id);
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────────

    /// `POST /<operation>` with a free-form task body.
    pub async fn create_task(&self, operation: Operation, data: &Value) -> Result<TaskResult, CloudConvertError> {
        self.request_data(
            Method::POST,
            &format!("/{}", operation.as_str()),
            Some(data),
            &Query::new(),
            false,
        )
        .await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<TaskResult, CloudConvertError> {
        self.request_data(Method::GET, &format!("/tasks/{task_id}"), None, &Query::new(), false)
            .await
    }

    pub async fn wait_task(&self, task_id: &str) -> Result<TaskResult, CloudConvertError> {
        self.request_data(Method::GET, &format!("/tasks/{task_id}"), None, &Query::new(), true)
            .await
    }

    pub async fn list_tasks(&self, filter: &ListFilter, limit: usize) -> Result<Page, CloudConvertError> {
        self.list_page("/tasks", filter, limit).await
    }

    pub async fn list_all_tasks(&self, filter: &ListFilter) -> Result<Vec<Value>, CloudConvertError> {
        paginate::fetch_all(self, "/tasks", &filter.to_query()).await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<(), CloudConvertError> {
        self.request(Method::DELETE, &format!("/tasks/{task_id}"), None, &Query::new(), false)
            .await?;
        Ok(())
    }

    pub async fn cancel_task(&self, task_id: &str) -> Result<TaskResult, CloudConvertError> {
        self.request_data(Method::POST, &format!("/tasks/{task_id}/cancel"), None, &Query::new(), false)
            .await
    }

    pub async fn retry_task(&self, task_id: &str) -> Result<TaskResult, CloudConvertError> {
        self.request_data(Method::POST, &format!("/tasks/{task_id}/retry"), None, &Query::new(), false)
            .await
    }

    // ── Upload handshake ─────────────────────────────────────────────────

    /// `POST /import/upload`: returns a task whose result holds the form to
    /// post the file to.
    pub async fn create_upload_task(&self) -> Result<TaskResult, CloudConvertError> {
        self.request_data(Method::POST, "/import/upload", None, &Query::new(), false)
            .await
    }

    /// Post the file as a multipart form: every form parameter as a text
    /// part, then the `file` part. The storage URL is pre-signed, so no
    /// bearer token is sent.
    pub async fn upload_file(&self, form: &UploadForm, file: &BinaryAttachment) -> Result<(), CloudConvertError> {
        let mut multipart = Form::new();
        for (key, value) in &form.parameters {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            multipart = multipart.text(key.clone(), text);
        }

        let mut part = Part::bytes(file.data.to_vec()).file_name(file.file_name.clone());
        if let Some(mime) = &file.mime_type {
            part = part.mime_str(mime).map_err(|source| CloudConvertError::Http {
                url: form.url.clone(),
                source,
            })?;
        }
        multipart = multipart.part("file", part);

        debug!("Uploading {} ({} bytes) to {}", file.file_name, file.file_size, form.url);
        let response = self
            .http
            .post(&form.url)
            .multipart(multipart)
            .send()
            .await
            .map_err(|source| CloudConvertError::Http {
                url: form.url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CloudConvertError::UploadRejected {
                url: form.url.clone(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Full handshake: create the upload task, then post the file to it.
    pub async fn upload(&self, file: &BinaryAttachment) -> Result<TaskResult, CloudConvertError> {
        let task = self.create_upload_task().await?;
        let form = task
            .result
            .as_ref()
            .and_then(|r| r.form.as_ref())
            .ok_or_else(|| CloudConvertError::MissingUploadForm {
                task_id: task.id.clone(),
            })?;
        self.upload_file(form, file).await?;
        info!("Uploaded {} via task {}", file.file_name, task.id);
        Ok(task)
    }

    // ── Downloads ────────────────────────────────────────────────────────

    /// Fetch a result file's bytes. Export URLs are pre-signed.
    pub async fn download(&self, item: &ResultItem) -> Result<BinaryAttachment, CloudConvertError> {
        let http_err = |source| CloudConvertError::Http {
            url: item.url.clone(),
            source,
        };
        let response = self.http.get(&item.url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CloudConvertError::Api {
                method: "GET".to_string(),
                url: item.url.clone(),
                status: status.as_u16(),
                message: api_message(&body),
            });
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response.bytes().await.map_err(http_err)?;
        info!(
            "Downloaded {} ({} bytes, file {}/{})",
            item.filename,
            data.len(),
            item.file_index + 1,
            item.total_files
        );
        Ok(BinaryAttachment::new(item.filename.clone(), mime_type, data))
    }

    // ── Catalog & account ────────────────────────────────────────────────

    /// `GET /operations` with the given filter.
    pub async fn list_operations(&self, filter: &ListFilter) -> Result<Vec<OperationEntry>, CloudConvertError> {
        self.request_data(Method::GET, "/operations", None, &filter.to_query(), false)
            .await
    }

    /// Formats available on one side of a conversion, given the other side.
    pub async fn list_formats(
        &self,
        direction: FormatDirection,
        known: Option<&str>,
    ) -> Result<Vec<FormatOption>, CloudConvertError> {
        let entries = self
            .list_operations(&formats::catalog_filter(direction, known))
            .await?;
        Ok(formats::collect_formats(&entries, direction, known))
    }

    /// `GET /users/me`.
    pub async fn me(&self) -> Result<Value, CloudConvertError> {
        self.request_data(Method::GET, "/users/me", None, &Query::new(), false)
            .await
    }

    /// Lightweight connectivity check of the API key and environment.
    pub async fn verify_credentials(&self) -> Result<(), CloudConvertError> {
        self.me().await.map(|_| ())
    }
}

impl PageSource for CloudConvertClient {
    async fn fetch_page(&self, endpoint: &str, query: &Query) -> Result<Page, CloudConvertError> {
        let value = self.request(Method::GET, endpoint, None, query, false).await?;
        decode(endpoint, value)
    }
}

fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// The API's `message` field if the body is a JSON error, otherwise a
/// trimmed preview of the raw body.
fn api_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(msg)) = map.get("message") {
            return msg.clone();
        }
    }
    preview_body(body)
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    if trimmed.chars().count() <= BODY_PREVIEW_LIMIT {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    out.push_str("...");
    out
}
