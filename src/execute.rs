//! Batch executor: turn [`Request`]s into API calls and output records.
//!
//! ## Item flow
//!
//! ```text
//! Request ──► (upload handshake) ──► build graph ──► POST /jobs ──► extract ──► download
//!    │                                                  │
//!    └── job / task / catalog actions ─────────────────►└──► OutputRecord(s)
//! ```
//!
//! Items run one after another. Each item is independent: with
//! `continue_on_fail` a failed item leaves an `{"error": ...}` record in
//! its slot and the batch moves on; without it the first failure aborts
//! the batch.

use crate::client::CloudConvertClient;
use crate::error::{CloudConvertError, ItemError};
use crate::extract::{extract_files, EXPORT_URL};
use crate::filters::ListFilter;
use crate::formats::FormatDirection;
use crate::graph::builder::{
    self, json_object_param, ArchiveParams, CaptureParams, ConvertParams, Intent, MergeParams,
    ThumbnailParams, WatermarkParams,
};
use crate::graph::Operation;
use crate::model::{Job, JobRequest};
use crate::output::{BatchOutput, BatchStats, BinaryAttachment, ItemOutcome, OutputRecord};
use crate::progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

fn default_true() -> bool {
    true
}

/// How a file intent's result is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Submit through the sync endpoint and wait for the job to finish.
    #[serde(default = "default_true")]
    pub wait: bool,
    /// Download the exported files. Ignored unless `wait` is set.
    #[serde(default)]
    pub download: bool,
}

impl Default for Delivery {
    fn default() -> Self {
        Self {
            wait: true,
            download: false,
        }
    }
}

impl Delivery {
    pub fn downloads(&self) -> bool {
        self.wait && self.download
    }
}

/// One unit of work, tagged by `action` on the wire:
///
/// ```json
/// {"action": "convert", "source": {"url": "https://example.com/a.docx"},
///  "output_format": "pdf", "download": true}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    // ── Jobs ─────────────────────────────────────────────────────────────
    /// Submit a hand-written task graph. `tasks` is an object or a string
    /// holding one.
    CreateJob {
        tasks: Value,
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        webhook_url: Option<String>,
        #[serde(default)]
        webhook_events: Vec<String>,
        #[serde(default)]
        wait: bool,
    },
    GetJob {
        job_id: String,
    },
    /// Without `limit`, every matching job.
    ListJobs {
        #[serde(default)]
        filter: ListFilter,
        #[serde(default)]
        limit: Option<usize>,
    },
    DeleteJob {
        job_id: String,
    },
    WaitJob {
        job_id: String,
    },

    // ── Tasks ────────────────────────────────────────────────────────────
    CreateTask {
        operation: Operation,
        task_data: Value,
    },
    GetTask {
        task_id: String,
    },
    ListTasks {
        #[serde(default)]
        filter: ListFilter,
        #[serde(default)]
        limit: Option<usize>,
    },
    DeleteTask {
        task_id: String,
    },
    CancelTask {
        task_id: String,
    },
    RetryTask {
        task_id: String,
    },
    WaitTask {
        task_id: String,
    },

    // ── File intents ─────────────────────────────────────────────────────
    Convert {
        #[serde(flatten)]
        params: ConvertParams,
        #[serde(flatten)]
        delivery: Delivery,
    },
    CaptureWebsite {
        #[serde(flatten)]
        params: CaptureParams,
        #[serde(flatten)]
        delivery: Delivery,
    },
    Thumbnail {
        #[serde(flatten)]
        params: ThumbnailParams,
        #[serde(flatten)]
        delivery: Delivery,
    },
    Watermark {
        #[serde(flatten)]
        params: WatermarkParams,
        #[serde(flatten)]
        delivery: Delivery,
    },
    Merge {
        #[serde(flatten)]
        params: MergeParams,
        #[serde(flatten)]
        delivery: Delivery,
    },
    Archive {
        #[serde(flatten)]
        params: ArchiveParams,
        #[serde(flatten)]
        delivery: Delivery,
    },

    // ── Catalog & account ────────────────────────────────────────────────
    GetFormats {
        direction: FormatDirection,
        #[serde(default)]
        format: Option<String>,
    },
    ListOperations {
        #[serde(default)]
        filter: ListFilter,
    },
    GetMe,
}

impl Request {
    /// The wire `action` tag.
    pub fn action(&self) -> &'static str {
        match self {
            Request::CreateJob { .. } => "create_job",
            Request::GetJob { .. } => "get_job",
            Request::ListJobs { .. } => "list_jobs",
            Request::DeleteJob { .. } => "delete_job",
            Request::WaitJob { .. } => "wait_job",
            Request::CreateTask { .. } => "create_task",
            Request::GetTask { .. } => "get_task",
            Request::ListTasks { .. } => "list_tasks",
            Request::DeleteTask { .. } => "delete_task",
            Request::CancelTask { .. } => "cancel_task",
            Request::RetryTask { .. } => "retry_task",
            Request::WaitTask { .. } => "wait_task",
            Request::Convert { .. } => "convert",
            Request::CaptureWebsite { .. } => "capture_website",
            Request::Thumbnail { .. } => "thumbnail",
            Request::Watermark { .. } => "watermark",
            Request::Merge { .. } => "merge",
            Request::Archive { .. } => "archive",
            Request::GetFormats { .. } => "get_formats",
            Request::ListOperations { .. } => "list_operations",
            Request::GetMe => "get_me",
        }
    }

    /// The file intent and its delivery, for file actions.
    pub fn intent(&self) -> Option<(Intent, Delivery)> {
        let pair = match self {
            Request::Convert { params, delivery } => (Intent::Convert(params.clone()), *delivery),
            Request::CaptureWebsite { params, delivery } => {
                (Intent::CaptureWebsite(params.clone()), *delivery)
            }
            Request::Thumbnail { params, delivery } => (Intent::Thumbnail(params.clone()), *delivery),
            Request::Watermark { params, delivery } => (Intent::Watermark(params.clone()), *delivery),
            Request::Merge { params, delivery } => (Intent::Merge(params.clone()), *delivery),
            Request::Archive { params, delivery } => (Intent::Archive(params.clone()), *delivery),
            _ => return None,
        };
        Some(pair)
    }
}

/// A request plus the binary attachments it may upload, keyed by property
/// name (`data` by default).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub request: Request,
    pub binaries: HashMap<String, BinaryAttachment>,
}

impl BatchItem {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            binaries: HashMap::new(),
        }
    }

    pub fn with_binary(mut self, property: impl Into<String>, file: BinaryAttachment) -> Self {
        self.binaries.insert(property.into(), file);
        self
    }
}

/// Options for [`run_batch`].
#[derive(Clone)]
pub struct BatchOptions {
    /// Record a failed item as `{"error": ...}` and carry on.
    pub continue_on_fail: bool,
    pub progress: ProgressCallback,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            continue_on_fail: false,
            progress: Arc::new(NoopProgressCallback),
        }
    }
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("continue_on_fail", &self.continue_on_fail)
            .field("progress", &"<callback>")
            .finish()
    }
}

/// Run every item in order.
///
/// # Errors
/// Without `continue_on_fail`, the first item error is returned and the
/// remaining items are not run.
pub async fn run_batch(
    client: &CloudConvertClient,
    items: &[BatchItem],
    options: &BatchOptions,
) -> Result<BatchOutput, CloudConvertError> {
    let start = Instant::now();
    let progress = options.progress.as_ref();
    progress.on_batch_start(items.len());

    let mut outcomes = Vec::with_capacity(items.len());
    let mut stats = BatchStats {
        total_items: items.len(),
        ..Default::default()
    };

    for (idx, item) in items.iter().enumerate() {
        progress.on_item_start(idx, item.request.action());
        match execute(client, idx, item, progress).await {
            Ok(records) => {
                stats.succeeded_items += 1;
                stats.records += records.len();
                stats.files_downloaded += records.iter().filter(|r| r.binary.is_some()).count();
                progress.on_item_complete(idx, records.len());
                outcomes.push(ItemOutcome::Ok(records));
            }
            Err(e) => {
                progress.on_item_error(idx, &e.to_string());
                if !options.continue_on_fail {
                    return Err(e);
                }
                warn!("Item {} ({}) failed: {}", idx, item.request.action(), e);
                stats.failed_items += 1;
                stats.records += 1;
                outcomes.push(ItemOutcome::Failed(ItemError::new(idx, &e)));
            }
        }
    }

    stats.total_duration_ms = start.elapsed().as_millis() as u64;
    progress.on_batch_complete(stats.total_items, stats.succeeded_items);
    info!(
        "Batch complete: {}/{} items succeeded, {} files downloaded in {}ms",
        stats.succeeded_items, stats.total_items, stats.files_downloaded, stats.total_duration_ms
    );

    Ok(BatchOutput { outcomes, stats })
}

/// Run one item and return its output records.
pub async fn execute(
    client: &CloudConvertClient,
    idx: usize,
    item: &BatchItem,
    progress: &dyn BatchProgressCallback,
) -> Result<Vec<OutputRecord>, CloudConvertError> {
    if let Some((intent, delivery)) = item.request.intent() {
        return run_intent(client, idx, &intent, delivery, &item.binaries, progress).await;
    }

    let single = |value: Value| -> Result<Vec<OutputRecord>, CloudConvertError> {
        Ok(vec![OutputRecord::json(idx, value)])
    };
    let success = || json!({ "success": true });

    match &item.request {
        Request::CreateJob {
            tasks,
            tag,
            webhook_url,
            webhook_events,
            wait,
        } => {
            let tasks = json_object_param("tasks", tasks)?;
            let body = JobRequest::new(Value::Object(tasks))
                .tag(tag.clone())
                .webhook(webhook_url.clone(), webhook_events.clone());
            let job = client.create_job(&body, *wait).await?;
            progress.on_job_submitted(idx, &job.id);
            single(to_json(&job)?)
        }
        Request::GetJob { job_id } => single(to_json(&client.get_job(job_id).await?)?),
        Request::WaitJob { job_id } => single(to_json(&client.wait_job(job_id).await?)?),
        Request::ListJobs { filter, limit } => {
            let data = match limit {
                Some(n) => client.list_jobs(filter, *n).await?.data,
                None => client.list_all_jobs(filter).await?,
            };
            single(json!({ "data": data }))
        }
        Request::DeleteJob { job_id } => {
            client.delete_job(job_id).await?;
            single(success())
        }

        Request::CreateTask {
            operation,
            task_data,
        } => {
            let data = json_object_param("task_data", task_data)?;
            let task = client.create_task(*operation, &Value::Object(data)).await?;
            single(to_json(&task)?)
        }
        Request::GetTask { task_id } => single(to_json(&client.get_task(task_id).await?)?),
        Request::WaitTask { task_id } => single(to_json(&client.wait_task(task_id).await?)?),
        Request::ListTasks { filter, limit } => {
            let data = match limit {
                Some(n) => client.list_tasks(filter, *n).await?.data,
                None => client.list_all_tasks(filter).await?,
            };
            single(json!({ "data": data }))
        }
        Request::DeleteTask { task_id } => {
            client.delete_task(task_id).await?;
            single(success())
        }
        Request::CancelTask { task_id } => single(to_json(&client.cancel_task(task_id).await?)?),
        Request::RetryTask { task_id } => single(to_json(&client.retry_task(task_id).await?)?),

        Request::GetFormats { direction, format } => {
            let formats = client.list_formats(*direction, format.as_deref()).await?;
            single(json!({ "formats": to_json(&formats)? }))
        }
        Request::ListOperations { filter } => {
            let ops = client.list_operations(filter).await?;
            single(json!({ "data": to_json(&ops)? }))
        }
        Request::GetMe => single(client.me().await?),

        Request::Convert { .. }
        | Request::CaptureWebsite { .. }
        | Request::Thumbnail { .. }
        | Request::Watermark { .. }
        | Request::Merge { .. }
        | Request::Archive { .. } => Err(CloudConvertError::Internal(format!(
            "file action '{}' reached the resource dispatcher",
            item.request.action()
        ))),
    }
}

/// Upload (if needed), build, submit, then optionally download.
async fn run_intent(
    client: &CloudConvertClient,
    idx: usize,
    intent: &Intent,
    delivery: Delivery,
    binaries: &HashMap<String, BinaryAttachment>,
    progress: &dyn BatchProgressCallback,
) -> Result<Vec<OutputRecord>, CloudConvertError> {
    let uploaded;
    let intent = match intent.upload_property() {
        Some(property) => {
            let file = binaries
                .get(property)
                .ok_or_else(|| CloudConvertError::MissingBinary {
                    property: property.to_string(),
                })?;
            let task = client.upload(file).await?;
            uploaded = intent.with_upload_task(&task.id);
            &uploaded
        }
        None => intent,
    };

    let graph = builder::build(intent)?;
    let job = client
        .create_job(&JobRequest::new(graph.to_value()?), delivery.wait)
        .await?;
    progress.on_job_submitted(idx, &job.id);

    if !delivery.downloads() {
        return Ok(vec![OutputRecord::json(idx, to_json(&job)?)]);
    }
    deliver_files(client, idx, &job, progress).await
}

/// Shape a finished job into records.
///
/// No files: the job itself. One file: the job with the file attached.
/// Several files: one record per file, each carrying `fileIndex`,
/// `filename` and `totalFiles` next to the job fields.
async fn deliver_files(
    client: &CloudConvertClient,
    idx: usize,
    job: &Job,
    progress: &dyn BatchProgressCallback,
) -> Result<Vec<OutputRecord>, CloudConvertError> {
    let job_json = to_json(job)?;
    let files = extract_files(job, EXPORT_URL);

    if files.is_empty() {
        warn!("Job {} has no exported files to download", job.id);
        return Ok(vec![OutputRecord::json(idx, job_json)]);
    }

    let mut records = Vec::with_capacity(files.len());
    for file in &files {
        let binary = client.download(file).await?;
        progress.on_file_downloaded(idx, &binary.file_name, binary.file_size);

        let mut json = job_json.clone();
        if files.len() > 1 {
            if let Value::Object(map) = &mut json {
                map.insert("fileIndex".into(), json!(file.file_index));
                map.insert("filename".into(), json!(file.filename));
                map.insert("totalFiles".into(), json!(file.total_files));
            }
        }
        records.push(OutputRecord::json(idx, json).with_binary(binary));
    }
    Ok(records)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, CloudConvertError> {
    serde_json::to_value(value)
        .map_err(|e| CloudConvertError::Internal(format!("failed to serialise output: {e}")))
}
