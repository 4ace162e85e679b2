//! CLI binary for cloudconvert-jobs.
//!
//! A thin shim over the library crate that maps CLI flags to
//! [`Request`]s, runs them as a batch and prints the results as JSON.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use cloudconvert_jobs::{
    run_batch, ArchiveParams, BatchItem, BatchOptions, BatchOutput, BatchProgressCallback,
    BinaryAttachment, CaptureParams, ClientConfig, CloudConvertClient, ConversionOptions,
    ConvertParams, Delivery, FormatDirection, ImportSource, ListFilter, MergeParams,
    NoopProgressCallback, Operation, ProgressCallback, Request, ThumbnailParams, WatermarkLayer,
    WatermarkParams,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar over the batch items plus one log line
/// per submitted job, downloaded file and failure.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} items  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Running");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_items: usize) {
        self.bar.set_length(total_items as u64);
    }

    fn on_item_start(&self, _item: usize, action: &str) {
        self.bar.set_message(action.to_string());
    }

    fn on_job_submitted(&self, item: usize, job_id: &str) {
        self.bar
            .println(format!("  {} item {:>3}  job {}", cyan("◆"), item, bold(job_id)));
    }

    fn on_file_downloaded(&self, item: usize, file_name: &str, bytes: usize) {
        self.bar.println(format!(
            "  {} item {:>3}  {}  {}",
            green("↓"),
            item,
            file_name,
            dim(&format!("{bytes} bytes"))
        ));
    }

    fn on_item_complete(&self, _item: usize, _records: usize) {
        self.bar.inc(1);
    }

    fn on_item_error(&self, item: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        // Keep long API messages to one terminal line.
        let msg = if error.chars().count() > 100 {
            let head: String = error.chars().take(99).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} item {:>3}  {}", red("✗"), item, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_items: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} items done", green("✔"), bold(&succeeded.to_string()));
        } else {
            eprintln!(
                "{} {}/{} items done  ({} failed)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total_items,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a public file to PDF and download the result
  ccjobs convert --url https://example.com/report.docx --to pdf --download

  # Upload a local spreadsheet, export every sheet as CSV
  ccjobs convert --file book.xlsx --to csv --option all_sheets=true --download --out-dir sheets

  # Send a zero that would otherwise be dropped
  ccjobs convert --url https://example.com/a.png --to jpg --pin quality=0

  # Screenshot a page
  ccjobs capture https://example.com --to png --option full_page=true --download

  # Merge finished tasks, in order
  ccjobs merge "task-a, task-b, task-c" --download

  # List every finished job
  ccjobs job list --status finished

  # What can a PDF become?
  ccjobs formats pdf

  # Run a batch file, recording failures instead of stopping
  ccjobs batch jobs.json --continue-on-fail

BATCH FILE:
  A JSON array of requests tagged by "action". File intents may name local
  files to upload under "files":

    [{"action": "convert", "source": {"upload": {}}, "output_format": "pdf",
      "download": true, "files": {"data": "in.docx"}},
     {"action": "get_job", "job_id": "..."}]

ENVIRONMENT VARIABLES:
  CLOUDCONVERT_API_KEY    API key (required)
  CLOUDCONVERT_SANDBOX    Use the sandbox environment (true/false)
  CLOUDCONVERT_TIMEOUT    Request timeout in seconds (default 120)
  RUST_LOG                Override the log filter
"#;

/// Build, submit and collect CloudConvert jobs.
#[derive(Parser, Debug)]
#[command(
    name = "ccjobs",
    version,
    about = "Build, submit and collect CloudConvert jobs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// CloudConvert API key.
    #[arg(long, env = "CLOUDCONVERT_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Use the sandbox environment.
    #[arg(long, env = "CLOUDCONVERT_SANDBOX", global = true)]
    sandbox: bool,

    /// Request timeout in seconds.
    #[arg(long, env = "CLOUDCONVERT_TIMEOUT", default_value_t = 120, global = true)]
    timeout: u64,

    /// Override the API base URL (e.g. a local mock).
    #[arg(long, env = "CLOUDCONVERT_API_BASE_URL", hide = true, global = true)]
    api_base_url: Option<String>,

    /// Override the sync API base URL.
    #[arg(long, env = "CLOUDCONVERT_SYNC_BASE_URL", hide = true, global = true)]
    sync_base_url: Option<String>,

    /// Directory downloaded files are written to.
    #[arg(long, env = "CCJOBS_OUT_DIR", default_value = ".", global = true)]
    out_dir: PathBuf,

    /// Record a failed item as {"error": ...} and keep going.
    #[arg(long, global = true)]
    continue_on_fail: bool,

    /// Disable progress bar.
    #[arg(long, env = "CCJOBS_NO_PROGRESS", global = true)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CCJOBS_VERBOSE", global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CCJOBS_QUIET", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a file to another format.
    Convert {
        #[command(flatten)]
        source: SourceArgs,
        /// Output format.
        #[arg(long = "to", default_value = "pdf")]
        output_format: String,
        /// Input format, when the extension is ambiguous.
        #[arg(long = "from")]
        input_format: Option<String>,
        /// Conversion option, KEY=VALUE (VALUE parsed as JSON when it can be).
        #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
        /// Conversion options as one JSON object.
        #[arg(long, value_name = "JSON")]
        options_json: Option<String>,
        /// Option sent even when zero, false or empty.
        #[arg(long = "pin", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        pinned: Vec<(String, Value)>,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
    /// Capture a website as PDF or image.
    Capture {
        /// Page to capture.
        url: String,
        #[arg(long = "to", default_value = "pdf")]
        output_format: String,
        #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
    /// Create a thumbnail of a file.
    Thumbnail {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long = "to", default_value = "png")]
        output_format: String,
        /// Thumbnail option, e.g. width=200 or fit=crop.
        #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
    /// Add a text or image watermark.
    Watermark {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        layer: LayerArgs,
        #[arg(long = "to", default_value = "png")]
        output_format: String,
        #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
    /// Merge the outputs of earlier tasks.
    Merge {
        /// Comma-separated task IDs, in order.
        tasks: String,
        #[arg(long = "to", default_value = "pdf")]
        output_format: String,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
    /// Pack a file into an archive.
    Archive {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long = "to", default_value = "zip")]
        output_format: String,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
    /// Manage jobs.
    #[command(subcommand)]
    Job(JobCommand),
    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// List the formats a format converts to (or from).
    Formats {
        /// The known side of the conversion.
        format: Option<String>,
        /// List input formats instead of output formats.
        #[arg(long)]
        inputs: bool,
    },
    /// Query the operation catalog.
    Operations {
        #[arg(long)]
        operation: Option<String>,
        #[arg(long)]
        input_format: Option<String>,
        #[arg(long)]
        output_format: Option<String>,
    },
    /// Show the current user.
    Me,
    /// Run a JSON file of requests.
    Batch {
        /// Path to a JSON array of requests.
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum JobCommand {
    /// Submit a hand-written task graph.
    Create {
        /// Tasks object as JSON, or @path to read it from a file.
        #[arg(long)]
        tasks: String,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        webhook_url: Option<String>,
        #[arg(long = "webhook-event")]
        webhook_events: Vec<String>,
        /// Wait for the job to finish.
        #[arg(long)]
        wait: bool,
    },
    Get {
        job_id: String,
    },
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// Return at most this many jobs instead of all of them.
        #[arg(long)]
        limit: Option<usize>,
    },
    Delete {
        job_id: String,
    },
    /// Block until the job has finished.
    Wait {
        job_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Create a standalone task.
    Create {
        /// Operation, e.g. import/url or convert.
        #[arg(value_parser = parse_operation)]
        operation: Operation,
        /// Task body as JSON, or @path to read it from a file.
        #[arg(long, default_value = "{}")]
        data: String,
    },
    Get {
        task_id: String,
    },
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        operation: Option<String>,
        #[arg(long)]
        job_id: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Delete {
        task_id: String,
    },
    Cancel {
        task_id: String,
    },
    Retry {
        task_id: String,
    },
    Wait {
        task_id: String,
    },
}

/// Where the input file comes from. Exactly one is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Public URL of the input file.
    #[arg(long)]
    url: Option<String>,
    /// ID of an earlier task whose output is the input.
    #[arg(long)]
    task: Option<String>,
    /// Local file to upload.
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct LayerArgs {
    /// Watermark text.
    #[arg(long)]
    text: Option<String>,
    /// URL of the watermark image.
    #[arg(long)]
    image_url: Option<String>,
}

#[derive(Args, Debug)]
struct DeliveryArgs {
    /// Return as soon as the job is created.
    #[arg(long)]
    no_wait: bool,
    /// Download the exported files into --out-dir.
    #[arg(long, conflicts_with = "no_wait")]
    download: bool,
}

impl From<&DeliveryArgs> for Delivery {
    fn from(d: &DeliveryArgs) -> Self {
        Delivery {
            wait: !d.no_wait,
            download: d.download,
        }
    }
}

/// One entry of a batch file.
#[derive(Deserialize)]
struct BatchFileItem {
    #[serde(flatten)]
    request: Request,
    /// Binary property name → local path.
    #[serde(default)]
    files: HashMap<String, PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose is given.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build client ─────────────────────────────────────────────────────
    let client = CloudConvertClient::new(build_config(&cli)?).context("Failed to create client")?;

    // ── Map the command to batch items ───────────────────────────────────
    let items = build_items(&cli.command).await?;

    let progress: ProgressCallback = if show_progress {
        CliProgressCallback::new() as ProgressCallback
    } else {
        Arc::new(NoopProgressCallback)
    };
    let options = BatchOptions {
        continue_on_fail: cli.continue_on_fail,
        progress,
    };

    let output = run_batch(&client, &items, &options)
        .await
        .context("Request failed")?;

    print_output(&output, &cli.out_dir).await?;

    if !cli.quiet && !show_progress {
        eprintln!(
            "{}/{} items in {}ms",
            output.stats.succeeded_items, output.stats.total_items, output.stats.total_duration_ms
        );
    }
    Ok(())
}

/// Map global CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .api_key(cli.api_key.clone().unwrap_or_default())
        .sandbox(cli.sandbox)
        .timeout_secs(cli.timeout)
        .user_agent(concat!("ccjobs/", env!("CARGO_PKG_VERSION")));
    if let Some(ref url) = cli.api_base_url {
        builder = builder.api_base_url(url.clone());
    }
    if let Some(ref url) = cli.sync_base_url {
        builder = builder.sync_base_url(url.clone());
    }
    builder.build().context("Invalid configuration")
}

async fn build_items(command: &Command) -> Result<Vec<BatchItem>> {
    let item = match command {
        Command::Convert {
            source,
            output_format,
            input_format,
            options,
            options_json,
            pinned,
            delivery,
        } => {
            let (source, binary) = resolve_source(source).await?;
            let mut conversion = match options_json {
                Some(text) => ConversionOptions::from_json_str("options", text)?,
                None => ConversionOptions::new(),
            };
            for (key, value) in options {
                conversion = conversion.set(key.clone(), value.clone());
            }
            for (key, value) in pinned {
                conversion = conversion.pin(key.clone(), value.clone());
            }
            let request = Request::Convert {
                params: ConvertParams {
                    source,
                    output_format: output_format.clone(),
                    input_format: input_format.clone().filter(|f| !f.is_empty()),
                    options: conversion,
                },
                delivery: delivery.into(),
            };
            with_upload(request, binary)
        }
        Command::Capture {
            url,
            output_format,
            options,
            delivery,
        } => BatchItem::new(Request::CaptureWebsite {
            params: CaptureParams {
                url: url.clone(),
                output_format: output_format.clone(),
                options: to_map(options),
            },
            delivery: delivery.into(),
        }),
        Command::Thumbnail {
            source,
            output_format,
            options,
            delivery,
        } => {
            let (source, binary) = resolve_source(source).await?;
            let request = Request::Thumbnail {
                params: ThumbnailParams {
                    source,
                    output_format: output_format.clone(),
                    options: to_map(options),
                },
                delivery: delivery.into(),
            };
            with_upload(request, binary)
        }
        Command::Watermark {
            source,
            layer,
            output_format,
            options,
            delivery,
        } => {
            let (source, binary) = resolve_source(source).await?;
            let layer = match (&layer.text, &layer.image_url) {
                (Some(text), _) => WatermarkLayer::Text(text.clone()),
                (None, Some(url)) => WatermarkLayer::Image(url.clone()),
                (None, None) => bail!("Either --text or --image-url is required"),
            };
            let request = Request::Watermark {
                params: WatermarkParams {
                    source,
                    layer,
                    output_format: output_format.clone(),
                    options: to_map(options),
                },
                delivery: delivery.into(),
            };
            with_upload(request, binary)
        }
        Command::Merge {
            tasks,
            output_format,
            delivery,
        } => BatchItem::new(Request::Merge {
            params: MergeParams {
                tasks: tasks.clone(),
                output_format: output_format.clone(),
            },
            delivery: delivery.into(),
        }),
        Command::Archive {
            source,
            output_format,
            delivery,
        } => {
            let (source, binary) = resolve_source(source).await?;
            let request = Request::Archive {
                params: ArchiveParams {
                    source,
                    output_format: output_format.clone(),
                },
                delivery: delivery.into(),
            };
            with_upload(request, binary)
        }
        Command::Job(cmd) => BatchItem::new(job_request(cmd).await?),
        Command::Task(cmd) => BatchItem::new(task_request(cmd).await?),
        Command::Formats { format, inputs } => BatchItem::new(Request::GetFormats {
            direction: if *inputs {
                FormatDirection::Input
            } else {
                FormatDirection::Output
            },
            format: format.clone(),
        }),
        Command::Operations {
            operation,
            input_format,
            output_format,
        } => BatchItem::new(Request::ListOperations {
            filter: ListFilter {
                operation: operation.clone(),
                input_format: input_format.clone(),
                output_format: output_format.clone(),
                ..Default::default()
            },
        }),
        Command::Me => BatchItem::new(Request::GetMe),
        Command::Batch { file } => return load_batch_file(file).await,
    };
    Ok(vec![item])
}

async fn job_request(cmd: &JobCommand) -> Result<Request> {
    Ok(match cmd {
        JobCommand::Create {
            tasks,
            tag,
            webhook_url,
            webhook_events,
            wait,
        } => Request::CreateJob {
            tasks: Value::String(read_json_arg(tasks).await?),
            tag: tag.clone(),
            webhook_url: webhook_url.clone(),
            webhook_events: webhook_events.clone(),
            wait: *wait,
        },
        JobCommand::Get { job_id } => Request::GetJob {
            job_id: job_id.clone(),
        },
        JobCommand::List { status, tag, limit } => Request::ListJobs {
            filter: ListFilter {
                status: status.clone(),
                tag: tag.clone(),
                ..Default::default()
            },
            limit: *limit,
        },
        JobCommand::Delete { job_id } => Request::DeleteJob {
            job_id: job_id.clone(),
        },
        JobCommand::Wait { job_id } => Request::WaitJob {
            job_id: job_id.clone(),
        },
    })
}

async fn task_request(cmd: &TaskCommand) -> Result<Request> {
    Ok(match cmd {
        TaskCommand::Create { operation, data } => Request::CreateTask {
            operation: *operation,
            task_data: Value::String(read_json_arg(data).await?),
        },
        TaskCommand::Get { task_id } => Request::GetTask {
            task_id: task_id.clone(),
        },
        TaskCommand::List {
            status,
            operation,
            job_id,
            limit,
        } => Request::ListTasks {
            filter: ListFilter {
                status: status.clone(),
                operation: operation.clone(),
                job_id: job_id.clone(),
                ..Default::default()
            },
            limit: *limit,
        },
        TaskCommand::Delete { task_id } => Request::DeleteTask {
            task_id: task_id.clone(),
        },
        TaskCommand::Cancel { task_id } => Request::CancelTask {
            task_id: task_id.clone(),
        },
        TaskCommand::Retry { task_id } => Request::RetryTask {
            task_id: task_id.clone(),
        },
        TaskCommand::Wait { task_id } => Request::WaitTask {
            task_id: task_id.clone(),
        },
    })
}

/// Map `--url` / `--task` / `--file` to an import source. A local file is
/// read now and uploaded under the default `data` property.
async fn resolve_source(args: &SourceArgs) -> Result<(ImportSource, Option<BinaryAttachment>)> {
    if let Some(ref url) = args.url {
        return Ok((ImportSource::Url(url.clone()), None));
    }
    if let Some(ref id) = args.task {
        return Ok((ImportSource::Task(id.clone()), None));
    }
    if let Some(ref path) = args.file {
        let file = BinaryAttachment::from_path(path, None)
            .await
            .with_context(|| format!("Failed to read input file {:?}", path))?;
        return Ok((
            ImportSource::Upload {
                binary_property: "data".to_string(),
                task_id: None,
            },
            Some(file),
        ));
    }
    bail!("One of --url, --task or --file is required")
}

fn with_upload(request: Request, binary: Option<BinaryAttachment>) -> BatchItem {
    let item = BatchItem::new(request);
    match binary {
        Some(file) => item.with_binary("data", file),
        None => item,
    }
}

async fn load_batch_file(path: &Path) -> Result<Vec<BatchItem>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read batch file {:?}", path))?;
    let entries: Vec<BatchFileItem> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid batch file {:?}", path))?;

    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut item = BatchItem::new(entry.request);
        for (property, file) in entry.files {
            let file_path = base.join(&file);
            let binary = BinaryAttachment::from_path(&file_path, None)
                .await
                .with_context(|| format!("Failed to read {:?}", file_path))?;
            item = item.with_binary(property, binary);
        }
        items.push(item);
    }
    Ok(items)
}

/// `{...}` or `@path/to/file.json`.
async fn read_json_arg(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {path}")),
        None => Ok(arg.to_string()),
    }
}

/// Write downloaded files and print every record as JSON on stdout.
async fn print_output(output: &BatchOutput, out_dir: &Path) -> Result<()> {
    let mut printed = Vec::new();
    for record in output.records() {
        let mut json = record.json.clone();
        if let Some(ref binary) = record.binary {
            let path = binary
                .write_to_dir(out_dir)
                .await
                .context("Failed to save download")?;
            if let Value::Object(ref mut map) = json {
                map.insert(
                    "binary".to_string(),
                    serde_json::json!({
                        "file_name": binary.file_name,
                        "mime_type": binary.mime_type,
                        "file_size": binary.file_size,
                        "path": path.display().to_string(),
                    }),
                );
            }
        }
        printed.push(json);
    }

    let value = match printed.len() {
        1 => printed.remove(0),
        _ => Value::Array(printed),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&value).context("Failed to serialise output")?
    );
    Ok(())
}

fn to_map(pairs: &[(String, Value)]) -> Map<String, Value> {
    pairs.iter().cloned().collect()
}

/// Parse `KEY=VALUE`; VALUE is JSON when it parses as JSON, else a string.
fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn parse_operation(s: &str) -> Result<Operation, String> {
    s.parse::<Operation>().map_err(|e| e.to_string())
}
