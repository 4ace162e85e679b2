//! Integration tests for cloudconvert-jobs against a local mock API.
//!
//! Every test starts its own `mockito` server and points both the regular
//! and the sync base URL at it, so nothing here talks to CloudConvert.
//!
//! Run with:
//!   cargo test --test api

use cloudconvert_jobs::{
    run_batch, BatchItem, BatchOptions, BinaryAttachment, ClientConfig, CloudConvertClient,
    CloudConvertError, ConversionOptions, ConvertParams, Delivery, ImportSource, ListFilter,
    MergeParams, Request,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn client_for(server: &ServerGuard) -> CloudConvertClient {
    let config = ClientConfig::builder()
        .api_key("integration-key")
        .base_url(server.url())
        .timeout_secs(5)
        .build()
        .expect("valid config");
    CloudConvertClient::new(config).expect("client")
}

/// A finished job whose export task lists `files`.
fn finished_job(files: Value) -> Value {
    json!({"data": {
        "id": "job-1",
        "status": "finished",
        "tasks": [
            {"id": "t-import", "name": "import-file", "operation": "import/url", "status": "finished"},
            {"id": "t-convert", "name": "convert-file", "operation": "convert", "status": "finished"},
            {"id": "t-export", "name": "export-file", "operation": "export/url", "status": "finished",
             "result": {"files": files}}
        ],
        "created_at": "2026-01-01T00:00:00+00:00"
    }})
}

fn convert_request(source: ImportSource, options: ConversionOptions, delivery: Delivery) -> Request {
    Request::Convert {
        params: ConvertParams {
            source,
            output_format: "csv".into(),
            input_format: None,
            options,
        },
        delivery,
    }
}

const DOWNLOAD: Delivery = Delivery {
    wait: true,
    download: true,
};

// ── File intents ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_fans_out_one_record_per_file() {
    let mut server = Server::new_async().await;
    let files = json!([
        {"filename": "Sheet1.csv", "url": format!("{}/files/1.csv", server.url())},
        {"filename": "Sheet2.csv", "url": format!("{}/files/2.csv", server.url())}
    ]);
    let job = server
        .mock("POST", "/jobs")
        .match_header("authorization", "Bearer integration-key")
        .match_body(Matcher::PartialJson(json!({"tasks": {
            "import-file": {"operation": "import/url", "url": "https://example.com/book.xlsx"},
            "convert-file": {"operation": "convert", "input": "import-file",
                             "output_format": "csv", "all_sheets": true},
            "export-file": {"operation": "export/url", "input": "convert-file"}
        }})))
        .with_status(201)
        .with_body(finished_job(files).to_string())
        .create_async()
        .await;
    let first = server
        .mock("GET", "/files/1.csv")
        .with_body("a,b\n1,2\n")
        .create_async()
        .await;
    let second = server
        .mock("GET", "/files/2.csv")
        .with_body("c,d\n3,4\n")
        .create_async()
        .await;

    let options = ConversionOptions::new()
        .set("all_sheets", true)
        .set("sheet", 0);
    let item = BatchItem::new(convert_request(
        ImportSource::Url("https://example.com/book.xlsx".into()),
        options,
        DOWNLOAD,
    ));
    let out = run_batch(&client_for(&server), &[item], &BatchOptions::default())
        .await
        .expect("batch");

    job.assert_async().await;
    first.assert_async().await;
    second.assert_async().await;

    let records = out.records();
    assert_eq!(records.len(), 2);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.json["id"], "job-1");
        assert_eq!(record.json["fileIndex"], i);
        assert_eq!(record.json["totalFiles"], 2);
        assert!(record.binary.is_some());
    }
    assert_eq!(records[1].json["filename"], "Sheet2.csv");
    assert_eq!(&records[1].binary.as_ref().unwrap().data[..], b"c,d\n3,4\n");
    assert_eq!(out.stats.files_downloaded, 2);
}

#[tokio::test]
async fn test_single_file_is_attached_to_job_record() {
    let mut server = Server::new_async().await;
    let files = json!([{"filename": "out.csv", "url": format!("{}/files/out.csv", server.url())}]);
    let _job = server
        .mock("POST", "/jobs")
        .with_status(201)
        .with_body(finished_job(files).to_string())
        .create_async()
        .await;
    let _file = server
        .mock("GET", "/files/out.csv")
        .with_header("content-type", "text/csv")
        .with_body("x\n")
        .create_async()
        .await;

    let item = BatchItem::new(convert_request(
        ImportSource::Task("task-123".into()),
        ConversionOptions::new(),
        DOWNLOAD,
    ));
    let out = run_batch(&client_for(&server), &[item], &BatchOptions::default())
        .await
        .expect("batch");

    let records = out.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].json.get("fileIndex").is_none());
    let binary = records[0].binary.as_ref().expect("attached file");
    assert_eq!(binary.file_name, "out.csv");
    assert_eq!(binary.mime_type.as_deref(), Some("text/csv"));
}

#[tokio::test]
async fn test_job_without_files_is_not_an_error() {
    let mut server = Server::new_async().await;
    let _job = server
        .mock("POST", "/jobs")
        .with_status(201)
        .with_body(json!({"data": {"id": "job-2", "status": "error", "tasks": []}}).to_string())
        .create_async()
        .await;

    let item = BatchItem::new(convert_request(
        ImportSource::Url("https://example.com/a.doc".into()),
        ConversionOptions::new(),
        DOWNLOAD,
    ));
    let out = run_batch(&client_for(&server), &[item], &BatchOptions::default())
        .await
        .expect("batch");

    let records = out.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].json["id"], "job-2");
    assert!(records[0].binary.is_none());
}

#[tokio::test]
async fn test_no_wait_never_downloads() {
    let mut server = Server::new_async().await;
    let files = json!([{"filename": "out.csv", "url": format!("{}/files/out.csv", server.url())}]);
    let _job = server
        .mock("POST", "/jobs")
        .with_status(201)
        .with_body(finished_job(files).to_string())
        .create_async()
        .await;
    let download = server
        .mock("GET", "/files/out.csv")
        .expect(0)
        .create_async()
        .await;

    let item = BatchItem::new(convert_request(
        ImportSource::Url("https://example.com/a.doc".into()),
        ConversionOptions::new(),
        Delivery {
            wait: false,
            download: true,
        },
    ));
    let out = run_batch(&client_for(&server), &[item], &BatchOptions::default())
        .await
        .expect("batch");

    assert_eq!(out.records().len(), 1);
    download.assert_async().await;
}

#[tokio::test]
async fn test_upload_handshake_runs_before_job() {
    let mut server = Server::new_async().await;
    let storage_url = format!("{}/upload-target", server.url());
    let upload_task = server
        .mock("POST", "/import/upload")
        .with_status(201)
        .with_body(
            json!({"data": {"id": "up-1", "operation": "import/upload", "status": "waiting",
                "result": {"form": {"url": storage_url, "parameters": {"signature": "s1"}}}}})
            .to_string(),
        )
        .create_async()
        .await;
    let storage = server
        .mock("POST", "/upload-target")
        .match_body(Matcher::Regex(r#"filename="report.docx""#.into()))
        .with_status(204)
        .create_async()
        .await;
    let job = server
        .mock("POST", "/jobs")
        .match_body(Matcher::PartialJson(json!({"tasks": {
            "convert-file": {"operation": "convert", "input": "up-1", "output_format": "pdf"},
            "export-file": {"operation": "export/url", "input": "convert-file"}
        }})))
        .with_status(201)
        .with_body(json!({"data": {"id": "job-3", "status": "processing", "tasks": []}}).to_string())
        .create_async()
        .await;

    let file = BinaryAttachment::new("report.docx", None, b"PK\x03\x04".to_vec());
    let item = BatchItem::new(convert_request(
        ImportSource::Upload {
            binary_property: "data".into(),
            task_id: None,
        },
        ConversionOptions::new(),
        Delivery::default(),
    ))
    .with_binary("data", file);

    run_batch(&client_for(&server), &[item], &BatchOptions::default())
        .await
        .expect("batch");

    upload_task.assert_async().await;
    storage.assert_async().await;
    job.assert_async().await;
}

#[tokio::test]
async fn test_rejected_upload_fails_the_item() {
    let mut server = Server::new_async().await;
    let storage_url = format!("{}/upload-target", server.url());
    let _task = server
        .mock("POST", "/import/upload")
        .with_status(201)
        .with_body(
            json!({"data": {"id": "up-2", "operation": "import/upload",
                "result": {"form": {"url": storage_url, "parameters": {}}}}})
            .to_string(),
        )
        .create_async()
        .await;
    let _storage = server
        .mock("POST", "/upload-target")
        .with_status(403)
        .create_async()
        .await;
    let jobs = server.mock("POST", "/jobs").expect(0).create_async().await;

    let item = BatchItem::new(convert_request(
        ImportSource::Upload {
            binary_property: "data".into(),
            task_id: None,
        },
        ConversionOptions::new(),
        Delivery::default(),
    ))
    .with_binary("data", BinaryAttachment::new("a.txt", None, b"a".to_vec()));

    let err = run_batch(&client_for(&server), &[item], &BatchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CloudConvertError::UploadRejected { status: 403, .. }));
    jobs.assert_async().await;
}

#[tokio::test]
async fn test_merge_sends_ordered_task_ids() {
    let mut server = Server::new_async().await;
    let job = server
        .mock("POST", "/jobs")
        .match_body(Matcher::PartialJson(json!({"tasks": {
            "merge": {"operation": "merge", "input": ["a", "b", "c"], "output_format": "pdf"},
            "export": {"operation": "export/url", "input": "merge"}
        }})))
        .with_status(201)
        .with_body(json!({"data": {"id": "job-4", "status": "finished", "tasks": []}}).to_string())
        .create_async()
        .await;

    let item = BatchItem::new(Request::Merge {
        params: MergeParams {
            tasks: " a, b ,,c ".into(),
            output_format: "pdf".into(),
        },
        delivery: Delivery::default(),
    });
    run_batch(&client_for(&server), &[item], &BatchOptions::default())
        .await
        .expect("batch");
    job.assert_async().await;
}

// ── Resource actions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_all_jobs_walks_every_page() {
    let mut server = Server::new_async().await;
    let page = |range: std::ops::Range<usize>, next: bool| {
        let data: Vec<Value> = range.map(|i| json!({"id": format!("job-{i}")})).collect();
        let next = next.then(|| "https://api.cloudconvert.com/v2/jobs?page=next");
        json!({"data": data, "links": {"next": next}}).to_string()
    };

    let mut mocks = Vec::new();
    for (n, body) in [
        (1, page(0..100, true)),
        (2, page(100..200, true)),
        (3, page(200..250, false)),
    ] {
        mocks.push(
            server
                .mock("GET", "/jobs")
                .match_query(Matcher::AllOf(vec![
                    Matcher::UrlEncoded("filter[status]".into(), "finished".into()),
                    Matcher::UrlEncoded("per_page".into(), "100".into()),
                    Matcher::UrlEncoded("page".into(), n.to_string()),
                ]))
                .with_body(body)
                .expect(1)
                .create_async()
                .await,
        );
    }

    let jobs = client_for(&server)
        .list_all_jobs(&ListFilter::new().status("finished"))
        .await
        .expect("all jobs");

    assert_eq!(jobs.len(), 250);
    assert_eq!(jobs[0]["id"], "job-0");
    assert_eq!(jobs[249]["id"], "job-249");
    for m in mocks {
        m.assert_async().await;
    }
}

#[tokio::test]
async fn test_continue_on_fail_records_error_in_slot() {
    let mut server = Server::new_async().await;
    let _ok = server
        .mock("GET", "/jobs/good")
        .with_body(json!({"data": {"id": "good", "status": "finished", "tasks": []}}).to_string())
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/jobs/bad")
        .with_status(404)
        .with_body(r#"{"message": "Job not found", "code": "NOT_FOUND"}"#)
        .create_async()
        .await;

    let items = vec![
        BatchItem::new(Request::GetJob {
            job_id: "good".into(),
        }),
        BatchItem::new(Request::GetJob {
            job_id: "bad".into(),
        }),
        BatchItem::new(Request::GetJob {
            job_id: "good".into(),
        }),
    ];
    let options = BatchOptions {
        continue_on_fail: true,
        ..Default::default()
    };
    let out = run_batch(&client_for(&server), &items, &options)
        .await
        .expect("batch");

    assert_eq!(out.stats.succeeded_items, 2);
    assert_eq!(out.stats.failed_items, 1);
    let records = out.records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].json["id"], "good");
    let error = records[1].json["error"].as_str().expect("error record");
    assert!(error.contains("Job not found"), "got: {error}");
    assert_eq!(records[2].json["id"], "good");
}

#[tokio::test]
async fn test_delete_and_formats_from_batch_file_json() {
    let mut server = Server::new_async().await;
    let _delete = server
        .mock("DELETE", "/tasks/t-9")
        .with_status(204)
        .create_async()
        .await;
    let _ops = server
        .mock("GET", "/operations")
        .match_query(Matcher::UrlEncoded("filter[output_format]".into(), "pdf".into()))
        .with_body(
            json!({"data": [
                {"operation": "convert", "input_format": "docx", "output_format": "pdf"},
                {"operation": "convert", "input_format": "odt", "output_format": "pdf"},
                {"operation": "convert", "input_format": "DOCX", "output_format": "pdf"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let requests: Vec<Request> = serde_json::from_value(json!([
        {"action": "delete_task", "task_id": "t-9"},
        {"action": "get_formats", "direction": "input", "format": "pdf"}
    ]))
    .expect("requests");
    let items: Vec<BatchItem> = requests.into_iter().map(BatchItem::new).collect();

    let out = run_batch(&client_for(&server), &items, &BatchOptions::default())
        .await
        .expect("batch");
    let records = out.records();
    assert_eq!(records[0].json, json!({"success": true}));
    assert_eq!(
        records[1].json["formats"],
        json!([{"name": "DOCX", "value": "docx"}, {"name": "ODT", "value": "odt"}])
    );
}

#[tokio::test]
async fn test_downloaded_file_written_atomically() {
    let mut server = Server::new_async().await;
    let _file = server
        .mock("GET", "/files/r.pdf")
        .with_body("%PDF-1.7 body")
        .create_async()
        .await;

    let item = cloudconvert_jobs::ResultItem {
        url: format!("{}/files/r.pdf", server.url()),
        filename: "r.pdf".into(),
        file_index: 0,
        total_files: 1,
    };
    let file = client_for(&server).download(&item).await.expect("download");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = file.write_to_dir(dir.path()).await.expect("write");
    assert_eq!(std::fs::read(path).expect("read"), b"%PDF-1.7 body");
}
