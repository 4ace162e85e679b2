//! Task graphs: the `tasks` object of a CloudConvert job.
//!
//! A job is a set of named stages. Each stage names an [`Operation`] and
//! optionally the stage(s) it reads from (`input`). The service works out the
//! execution order from those references, so a graph is only well-formed
//! when every reference points at a stage that exists in the same graph.
//!
//! ## Data Flow
//!
//! ```text
//! import-file ──▶ convert-file ──▶ export-file
//! (import/url)    (convert)        (export/url)
//! ```
//!
//! 1. [`options`] - the falsy-omits filter applied to conversion options
//! 2. [`builder`] - turns a user [`builder::Intent`] into a [`TaskGraph`]

pub mod builder;
pub mod options;

use crate::error::CloudConvertError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Option keys owned by [`TaskSpec`] itself; flat option merges never
/// overwrite them.
const RESERVED_KEYS: [&str; 2] = ["operation", "input"];

/// CloudConvert task operations this crate knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "import/url")]
    ImportUrl,
    #[serde(rename = "import/upload")]
    ImportUpload,
    #[serde(rename = "convert")]
    Convert,
    #[serde(rename = "capture-website")]
    CaptureWebsite,
    #[serde(rename = "watermark")]
    Watermark,
    #[serde(rename = "thumbnail")]
    Thumbnail,
    #[serde(rename = "merge")]
    Merge,
    #[serde(rename = "archive")]
    Archive,
    #[serde(rename = "export/url")]
    ExportUrl,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::ImportUrl,
        Operation::ImportUpload,
        Operation::Convert,
        Operation::CaptureWebsite,
        Operation::Watermark,
        Operation::Thumbnail,
        Operation::Merge,
        Operation::Archive,
        Operation::ExportUrl,
    ];

    /// The wire tag, also the endpoint path for standalone task creation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ImportUrl => "import/url",
            Operation::ImportUpload => "import/upload",
            Operation::Convert => "convert",
            Operation::CaptureWebsite => "capture-website",
            Operation::Watermark => "watermark",
            Operation::Thumbnail => "thumbnail",
            Operation::Merge => "merge",
            Operation::Archive => "archive",
            Operation::ExportUrl => "export/url",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CloudConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CloudConvertError::malformed("operation", format!("unknown operation '{s}'")))
    }
}

/// The `input` field of a stage: one stage name or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskInput {
    One(String),
    Many(Vec<String>),
}

impl TaskInput {
    /// Every name referenced, in order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            TaskInput::One(name) => vec![name.as_str()],
            TaskInput::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// One stage of a job.
///
/// Serialises flat: `{"operation": "convert", "input": "import-file",
/// "output_format": "pdf", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<TaskInput>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl TaskSpec {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            input: None,
            options: Map::new(),
        }
    }

    /// Read from a single stage.
    pub fn input(mut self, stage: impl Into<String>) -> Self {
        self.input = Some(TaskInput::One(stage.into()));
        self
    }

    /// Read from an ordered list of stages or task IDs.
    pub fn inputs(mut self, stages: Vec<String>) -> Self {
        self.input = Some(TaskInput::Many(stages));
        self
    }

    /// Set one option field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.options.insert(key.to_string(), value.into());
    }

    /// Merge option fields flat into the stage. Later values win; reserved
    /// keys (`operation`, `input`) are skipped.
    pub fn merge(mut self, fields: &Map<String, Value>) -> Self {
        for (key, value) in fields {
            if RESERVED_KEYS.contains(&key.as_str()) {
                debug!("Ignoring reserved option key '{}' on {} stage", key, self.operation);
                continue;
            }
            self.options.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}

/// Named stages in insertion order, plus the external task IDs the graph
/// is allowed to reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskGraph {
    stages: IndexMap<String, TaskSpec>,
    external: Vec<String>,
}

impl Serialize for TaskGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.stages.serialize(serializer)
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage. Stage names are unique within a graph.
    pub fn insert(&mut self, name: impl Into<String>, spec: TaskSpec) -> Result<(), CloudConvertError> {
        let name = name.into();
        if self.stages.contains_key(&name) {
            return Err(CloudConvertError::Internal(format!(
                "duplicate stage name '{name}' in task graph"
            )));
        }
        self.stages.insert(name, spec);
        Ok(())
    }

    /// Allow `input` references to a task that lives outside this graph
    /// (e.g. the finished tasks a merge stage combines).
    pub fn declare_external(&mut self, task_id: impl Into<String>) {
        self.external.push(task_id.into());
    }

    pub fn get(&self, name: &str) -> Option<&TaskSpec> {
        self.stages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskSpec)> {
        self.stages.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `(stage, reference)` pairs whose reference resolves to nothing.
    pub fn dangling_references(&self) -> Vec<(&str, &str)> {
        self.stages
            .iter()
            .flat_map(|(stage, spec)| {
                spec.input
                    .iter()
                    .flat_map(TaskInput::names)
                    .map(move |r| (stage.as_str(), r))
            })
            .filter(|(_, r)| !self.stages.contains_key(*r) && !self.external.iter().any(|e| e == r))
            .collect()
    }

    /// Fail if any stage references a stage that does not exist.
    pub fn validate(&self) -> Result<(), CloudConvertError> {
        match self.dangling_references().first() {
            None => Ok(()),
            Some((stage, reference)) => Err(CloudConvertError::Internal(format!(
                "stage '{stage}' references unknown stage '{reference}'"
            ))),
        }
    }

    /// The graph as the JSON object sent in a job's `tasks` field.
    pub fn to_value(&self) -> Result<Value, CloudConvertError> {
        serde_json::to_value(self)
            .map_err(|e| CloudConvertError::Internal(format!("failed to serialise task graph: {e}")))
    }
}
