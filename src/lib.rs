//! # cloudconvert-jobs
//!
//! Build, submit and collect CloudConvert v2 conversion jobs.
//!
//! ## Why this crate?
//!
//! A CloudConvert job is a small graph of named tasks: import a file,
//! transform it, export the result. Writing that graph by hand for every
//! conversion is tedious and easy to get wrong: a typo in an `input` name
//! only shows up as an API error. This crate builds the graph from a typed
//! intent, checks every reference before submitting, and turns the finished
//! job back into downloadable files.
//!
//! ## Flow Overview
//!
//! ```text
//! Intent (convert / capture / thumbnail / watermark / merge / archive)
//!  │
//!  ├─ 1. Upload   optional import/upload handshake for local bytes
//!  ├─ 2. Build    typed intent → ordered task graph (validated)
//!  ├─ 3. Submit   POST /jobs, via the sync endpoint when waiting
//!  ├─ 4. Extract  export/url task → one ResultItem per file
//!  └─ 5. Deliver  download each file as a named BinaryAttachment
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cloudconvert_jobs::{
//!     build, extract_files, ClientConfig, CloudConvertClient, ConvertParams, ImportSource,
//!     Intent, JobRequest, EXPORT_URL,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .api_key(std::env::var("CLOUDCONVERT_API_KEY")?)
//!         .build()?;
//!     let client = CloudConvertClient::new(config)?;
//!
//!     let graph = build(&Intent::Convert(ConvertParams {
//!         source: ImportSource::Url("https://example.com/report.docx".into()),
//!         output_format: "pdf".into(),
//!         input_format: None,
//!         options: Default::default(),
//!     }))?;
//!     let job = client.create_job(&JobRequest::new(graph.to_value()?), true).await?;
//!
//!     for item in extract_files(&job, EXPORT_URL) {
//!         let file = client.download(&item).await?;
//!         file.write_to_dir("out").await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ccjobs` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! cloudconvert-jobs = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod execute;
pub mod extract;
pub mod filters;
pub mod formats;
pub mod graph;
pub mod model;
pub mod output;
pub mod paginate;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::CloudConvertClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{CloudConvertError, ItemError};
pub use execute::{execute, run_batch, BatchItem, BatchOptions, Delivery, Request};
pub use extract::{extract_files, ResultItem, EXPORT_URL};
pub use filters::{ListFilter, Query};
pub use formats::{FormatDirection, FormatOption};
pub use graph::builder::{
    build, ArchiveParams, CaptureParams, ConvertParams, ImportSource, Intent, MergeParams,
    ThumbnailParams, WatermarkLayer, WatermarkParams,
};
pub use graph::options::ConversionOptions;
pub use graph::{Operation, TaskGraph, TaskInput, TaskSpec};
pub use model::{Job, JobRequest, OperationEntry, Page, TaskResult, UploadForm};
pub use output::{BatchOutput, BatchStats, BinaryAttachment, ItemOutcome, OutputRecord};
pub use paginate::{fetch_all, PageSource, PAGE_SIZE};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
