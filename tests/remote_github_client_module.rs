use chrono::{DateTime, TimeZone, Utc};
use runscope::remote::{ArtifactFetcher, GitHubClient, ListRunsRequest, RunLister};
use std::fs;
use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

struct MockGitHubServer {
    base_url: String,
    paths: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockGitHubServer {
    fn start<F>(expected_requests: usize, responder: F) -> Self
    where
        F: Fn(&str, &str) -> (&'static str, Vec<u8>) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);
        let paths = Arc::new(Mutex::new(Vec::new()));
        let paths_for_thread = Arc::clone(&paths);
        let base_for_thread = base_url.clone();

        let handle = thread::spawn(move || {
            for _ in 0..expected_requests {
                let (mut stream, _) = listener.accept().expect("accept");
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

                let mut request_line = String::new();
                reader
                    .read_line(&mut request_line)
                    .expect("read request line");
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).expect("read header");
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                }
                paths_for_thread
                    .lock()
                    .expect("lock paths")
                    .push(path.clone());

                let (content_type, body) = responder(&base_for_thread, &path);
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                stream.write_all(head.as_bytes()).expect("write head");
                stream.write_all(&body).expect("write body");
            }
        });

        Self {
            base_url,
            paths,
            handle: Some(handle),
        }
    }

    fn finish(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("join mock server");
        }
        self.paths.lock().expect("lock paths").clone()
    }
}

fn at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, second)
        .single()
        .expect("timestamp")
}

fn zip_bytes(name: &str, body: &str) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        writer.start_file(name, options).expect("start file");
        writer.write_all(body.as_bytes()).expect("write entry");
        writer.finish().expect("finish zip");
    }
    buffer.into_inner()
}

fn query_value(path: &str, key: &str) -> Option<String> {
    let (_, query) = path.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| {
            urlencoding::decode(v)
                .map(|value| value.into_owned())
                .unwrap_or_default()
        })
    })
}

#[test]
fn runs_sharing_the_oldest_second_are_listed_on_the_next_page() {
    let runs = [(3u64, at(5)), (2, at(3)), (1, at(3))];
    let server = MockGitHubServer::start(2, move |_, path| {
        let per_page: usize = query_value(path, "per_page")
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);
        let upper = query_value(path, "created")
            .and_then(|created| created.strip_prefix("<=").map(str::to_string))
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .expect("created bound")
                    .with_timezone(&Utc)
            });
        let page: Vec<serde_json::Value> = runs
            .iter()
            .filter(|(_, created)| upper.map_or(true, |upper| *created <= upper))
            .take(per_page)
            .map(|(id, created)| {
                serde_json::json!({
                    "id": id,
                    "name": "Triage",
                    "path": ".github/workflows/triage.lock.yml",
                    "status": "completed",
                    "conclusion": "success",
                    "event": "issues",
                    "created_at": created.to_rfc3339(),
                    "updated_at": created.to_rfc3339(),
                })
            })
            .collect();
        (
            "application/json",
            serde_json::json!({ "workflow_runs": page })
                .to_string()
                .into_bytes(),
        )
    });
    let client = GitHubClient::new(server.base_url.clone(), "octo", "widgets", None);

    let mut request = ListRunsRequest {
        workflow_name: Some("triage".to_string()),
        limit: 2,
        ..ListRunsRequest::default()
    };
    let first = client.list_runs(&request).expect("first page");
    assert_eq!(first.runs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2]);
    assert_eq!(first.oldest_created_at, Some(at(3)));

    request.before_date = first.oldest_created_at;
    let second = client.list_runs(&request).expect("second page");
    assert_eq!(second.runs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1]);

    let paths = server.finish();
    assert_eq!(
        query_value(&paths[1], "created").as_deref(),
        Some("<=2025-05-01T10:00:03Z")
    );
}

#[test]
fn downloading_a_run_twice_replaces_the_earlier_artifacts() {
    let round = Arc::new(AtomicUsize::new(0));
    let round_for_server = Arc::clone(&round);
    let server = MockGitHubServer::start(5, move |base, path| {
        if path.contains("/actions/runs/1/artifacts") {
            let current = round_for_server.fetch_add(1, Ordering::SeqCst) + 1;
            let mut artifacts = vec![serde_json::json!({
                "name": "aw_info.json",
                "archive_download_url": format!("{base}/download/{current}/aw_info"),
                "expired": false,
            })];
            if current == 1 {
                artifacts.push(serde_json::json!({
                    "name": "notes",
                    "archive_download_url": format!("{base}/download/{current}/notes"),
                    "expired": false,
                }));
            }
            let body = serde_json::json!({ "artifacts": artifacts }).to_string();
            return ("application/json", body.into_bytes());
        }
        let engine = if path.starts_with("/download/1/") {
            "codex"
        } else {
            "claude"
        };
        let bytes = if path.ends_with("/notes") {
            zip_bytes("notes.log", "first download only")
        } else {
            zip_bytes("aw_info.json", &format!(r#"{{"engine_id":"{engine}"}}"#))
        };
        ("application/zip", bytes)
    });
    let client = GitHubClient::new(server.base_url.clone(), "octo", "widgets", None);
    let dir = tempfile::tempdir().expect("tempdir");
    let run_dir = dir.path().join("run-1");

    client.download_artifacts(1, &run_dir).expect("first download");
    assert!(run_dir.join("notes.log").is_file());

    client.download_artifacts(1, &run_dir).expect("second download");
    assert_eq!(
        fs::read_to_string(run_dir.join("aw_info.json")).expect("read metadata"),
        r#"{"engine_id":"claude"}"#
    );
    assert!(!run_dir.join("notes.log").exists());

    assert_eq!(server.finish().len(), 5);
}
