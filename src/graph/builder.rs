//! Intent → task graph.
//!
//! [`build`] is pure: it turns one [`Intent`] and its parameters into the
//! stages of a job and never talks to the network. Uploads are the one
//! source that needs I/O first; the executor performs the upload handshake
//! and only then asks for the graph (see [`crate::execute`]).
//!
//! Every graph ends in a single `export/url` stage, so
//! [`crate::extract::extract_files`] can find the results of any intent.

use super::options::ConversionOptions;
use super::{Operation, TaskGraph, TaskSpec};
use crate::error::CloudConvertError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Stage names used by the convert intent.
pub const IMPORT_FILE: &str = "import-file";
pub const CONVERT_FILE: &str = "convert-file";
pub const EXPORT_FILE: &str = "export-file";

/// Stage names used by every other intent.
pub const IMPORT: &str = "import";
pub const IMPORT_WATERMARK: &str = "import-watermark";
pub const CAPTURE: &str = "capture";
pub const THUMBNAIL: &str = "thumbnail";
pub const WATERMARK: &str = "watermark";
pub const MERGE: &str = "merge";
pub const ARCHIVE: &str = "archive";
pub const EXPORT: &str = "export";

fn default_binary_property() -> String {
    "data".to_string()
}

fn default_pdf() -> String {
    "pdf".to_string()
}

fn default_png() -> String {
    "png".to_string()
}

fn default_zip() -> String {
    "zip".to_string()
}

/// Where the primary input file comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSource {
    /// Public URL the service fetches.
    Url(String),
    /// ID of an earlier task whose output is the input.
    ///
    /// Emitted as an `import/url` stage whose `url` field holds the task ID,
    /// not a fetchable URL. CloudConvert also accepts the ID directly as a
    /// stage `input`; the graph keeps the import stage so every intent has
    /// the same stage layout whatever the source.
    Task(String),
    /// Bytes uploaded through the `import/upload` handshake. The named
    /// binary property of the batch item holds the file.
    ///
    /// Once the handshake has run, `task_id` holds the upload task that
    /// owns the file and the consuming stage reads from it directly.
    /// Without it the graph carries a fresh `import/upload` stage whose
    /// form the caller posts the file to after submitting the job.
    Upload {
        #[serde(default = "default_binary_property")]
        binary_property: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
    },
}

impl ImportSource {
    /// Add the import to `g` under `stage` and return the name the
    /// consuming stage reads from.
    fn attach(&self, g: &mut TaskGraph, stage: &str) -> Result<String, CloudConvertError> {
        let spec = match self {
            ImportSource::Url(url) => TaskSpec::new(Operation::ImportUrl).with("url", url.as_str()),
            ImportSource::Task(id) => TaskSpec::new(Operation::ImportUrl).with("url", id.as_str()),
            ImportSource::Upload { task_id: Some(id), .. } => {
                g.declare_external(id.clone());
                return Ok(id.clone());
            }
            ImportSource::Upload { task_id: None, .. } => TaskSpec::new(Operation::ImportUpload),
        };
        g.insert(stage, spec)?;
        Ok(stage.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertParams {
    pub source: ImportSource,
    #[serde(default = "default_pdf")]
    pub output_format: String,
    #[serde(default)]
    pub input_format: Option<String>,
    #[serde(default)]
    pub options: ConversionOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureParams {
    pub url: String,
    #[serde(default = "default_pdf")]
    pub output_format: String,
    /// `screen_width`, `full_page`, `wait_until`, ... merged flat.
    #[serde(default)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailParams {
    pub source: ImportSource,
    #[serde(default = "default_png")]
    pub output_format: String,
    /// `width`, `height`, `fit`, ... merged flat.
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// The layer painted over the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkLayer {
    Text(String),
    /// URL of the watermark image.
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkParams {
    pub source: ImportSource,
    pub layer: WatermarkLayer,
    #[serde(default = "default_png")]
    pub output_format: String,
    /// `layer_position`, `layer_opacity`, ... merged flat.
    #[serde(default)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeParams {
    /// Comma-separated IDs of the tasks to merge, in order.
    pub tasks: String,
    #[serde(default = "default_pdf")]
    pub output_format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveParams {
    pub source: ImportSource,
    #[serde(default = "default_zip")]
    pub output_format: String,
}

/// What the user wants done to a file.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Convert(ConvertParams),
    CaptureWebsite(CaptureParams),
    Thumbnail(ThumbnailParams),
    Watermark(WatermarkParams),
    Merge(MergeParams),
    Archive(ArchiveParams),
}

impl Intent {
    /// The primary import source, if the intent has one.
    pub fn source(&self) -> Option<&ImportSource> {
        match self {
            Intent::Convert(p) => Some(&p.source),
            Intent::Thumbnail(p) => Some(&p.source),
            Intent::Watermark(p) => Some(&p.source),
            Intent::Archive(p) => Some(&p.source),
            Intent::CaptureWebsite(_) | Intent::Merge(_) => None,
        }
    }

    /// Binary property to upload before building, for upload sources.
    pub fn upload_property(&self) -> Option<&str> {
        match self.source() {
            Some(ImportSource::Upload {
                binary_property,
                task_id: None,
            }) => Some(binary_property),
            _ => None,
        }
    }

    /// The same intent reading from the upload task that already holds
    /// the file. No-op for sources other than [`ImportSource::Upload`].
    pub fn with_upload_task(&self, id: &str) -> Intent {
        let mut intent = self.clone();
        let source = match &mut intent {
            Intent::Convert(p) => Some(&mut p.source),
            Intent::Thumbnail(p) => Some(&mut p.source),
            Intent::Watermark(p) => Some(&mut p.source),
            Intent::Archive(p) => Some(&mut p.source),
            Intent::CaptureWebsite(_) | Intent::Merge(_) => None,
        };
        if let Some(ImportSource::Upload { task_id, .. }) = source {
            *task_id = Some(id.to_string());
        }
        intent
    }

    pub fn name(&self) -> &'static str {
        match self {
            Intent::Convert(_) => "convert",
            Intent::CaptureWebsite(_) => "capture-website",
            Intent::Thumbnail(_) => "thumbnail",
            Intent::Watermark(_) => "watermark",
            Intent::Merge(_) => "merge",
            Intent::Archive(_) => "archive",
        }
    }
}

/// Build the task graph for an intent.
///
/// # Errors
/// * [`CloudConvertError::MalformedInput`] - e.g. a merge with no task IDs
/// * [`CloudConvertError::Internal`] - the graph would contain a dangling
///   reference (a bug in this module, never user input)
pub fn build(intent: &Intent) -> Result<TaskGraph, CloudConvertError> {
    let graph = match intent {
        Intent::Convert(p) => build_convert(p)?,
        Intent::CaptureWebsite(p) => build_capture(p)?,
        Intent::Thumbnail(p) => build_thumbnail(p)?,
        Intent::Watermark(p) => build_watermark(p)?,
        Intent::Merge(p) => build_merge(p)?,
        Intent::Archive(p) => build_archive(p)?,
    };
    graph.validate()?;
    debug!("Built {} graph: {:?}", intent.name(), graph.names());
    Ok(graph)
}

fn build_convert(p: &ConvertParams) -> Result<TaskGraph, CloudConvertError> {
    let mut g = TaskGraph::new();
    let source = p.source.attach(&mut g, IMPORT_FILE)?;

    let mut convert = TaskSpec::new(Operation::Convert)
        .input(source)
        .with("output_format", p.output_format.as_str());
    if let Some(fmt) = p.input_format.as_deref().filter(|f| !f.is_empty()) {
        convert.set("input_format", fmt);
    }
    g.insert(CONVERT_FILE, convert.merge(&p.options.filtered()))?;

    g.insert(EXPORT_FILE, TaskSpec::new(Operation::ExportUrl).input(CONVERT_FILE))?;
    Ok(g)
}

fn build_capture(p: &CaptureParams) -> Result<TaskGraph, CloudConvertError> {
    let mut g = TaskGraph::new();
    let capture = TaskSpec::new(Operation::CaptureWebsite)
        .with("url", p.url.as_str())
        .with("output_format", p.output_format.as_str())
        .merge(&p.options);
    g.insert(CAPTURE, capture)?;
    g.insert(EXPORT, TaskSpec::new(Operation::ExportUrl).input(CAPTURE))?;
    Ok(g)
}

fn build_thumbnail(p: &ThumbnailParams) -> Result<TaskGraph, CloudConvertError> {
    let mut g = TaskGraph::new();
    let source = p.source.attach(&mut g, IMPORT)?;
    let thumb = TaskSpec::new(Operation::Thumbnail)
        .input(source)
        .with("output_format", p.output_format.as_str())
        .merge(&p.options);
    g.insert(THUMBNAIL, thumb)?;
    g.insert(EXPORT, TaskSpec::new(Operation::ExportUrl).input(THUMBNAIL))?;
    Ok(g)
}

fn build_watermark(p: &WatermarkParams) -> Result<TaskGraph, CloudConvertError> {
    let mut g = TaskGraph::new();
    let source = p.source.attach(&mut g, IMPORT)?;

    let mut watermark = TaskSpec::new(Operation::Watermark)
        .input(source)
        .with("output_format", p.output_format.as_str())
        .merge(&p.options);
    match &p.layer {
        WatermarkLayer::Text(text) => watermark.set("layer_text", text.as_str()),
        WatermarkLayer::Image(url) => {
            g.insert(
                IMPORT_WATERMARK,
                TaskSpec::new(Operation::ImportUrl).with("url", url.as_str()),
            )?;
            watermark.set("layer_input", IMPORT_WATERMARK);
        }
    }
    g.insert(WATERMARK, watermark)?;
    g.insert(EXPORT, TaskSpec::new(Operation::ExportUrl).input(WATERMARK))?;
    Ok(g)
}

fn build_merge(p: &MergeParams) -> Result<TaskGraph, CloudConvertError> {
    let ids = split_task_ids(&p.tasks);
    if ids.is_empty() {
        return Err(CloudConvertError::malformed(
            "merge_tasks",
            "expected at least one task ID",
        ));
    }

    let mut g = TaskGraph::new();
    for id in &ids {
        g.declare_external(id.clone());
    }
    let merge = TaskSpec::new(Operation::Merge)
        .inputs(ids)
        .with("output_format", p.output_format.as_str());
    g.insert(MERGE, merge)?;
    g.insert(EXPORT, TaskSpec::new(Operation::ExportUrl).input(MERGE))?;
    Ok(g)
}

fn build_archive(p: &ArchiveParams) -> Result<TaskGraph, CloudConvertError> {
    let mut g = TaskGraph::new();
    let source = p.source.attach(&mut g, IMPORT)?;
    g.insert(
        ARCHIVE,
        TaskSpec::new(Operation::Archive)
            .input(source)
            .with("output_format", p.output_format.as_str()),
    )?;
    g.insert(EXPORT, TaskSpec::new(Operation::ExportUrl).input(ARCHIVE))?;
    Ok(g)
}

/// Split `"a, b ,c"` into `["a", "b", "c"]`, dropping empty entries.
pub fn split_task_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse free-form JSON text that must be an object.
///
/// `field` names the parameter in the error so the user knows which input
/// to fix.
pub fn parse_json_object(field: &str, text: &str) -> Result<Map<String, Value>, CloudConvertError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CloudConvertError::malformed(
            field,
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
        Err(e) => Err(CloudConvertError::malformed(field, e)),
    }
}

/// Accept either an object or a string holding one.
pub fn json_object_param(field: &str, value: &Value) -> Result<Map<String, Value>, CloudConvertError> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::String(text) => parse_json_object(field, text),
        other => Err(CloudConvertError::malformed(
            field,
            format!("expected a JSON object, got {}", json_kind(other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
