use super::*;
use crate::client::RequestBody;
use crate::test_helpers::{
    PROJECT_LINK, ScriptedClient, scripted_project_client, test_project, zip_bytes,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

const DOWNLOAD_URL: &str = "https://cdn.lingohub.com/exports/exp-1.zip";

fn exports_url() -> String {
    format!("{PROJECT_LINK}/exports")
}

fn status_url() -> String {
    format!("{PROJECT_LINK}/exports/exp-1")
}

fn processing() -> String {
    serde_json::json!({"id": "exp-1", "status": "PROCESSING"}).to_string()
}

fn success() -> String {
    serde_json::json!({"id": "exp-1", "status": "SUCCESS", "downloadUrl": DOWNLOAD_URL})
        .to_string()
}

fn failed(details: &str) -> String {
    serde_json::json!({"id": "exp-1", "status": "FAILED", "errorDetails": details}).to_string()
}

/// Demo project whose export endpoint answers with `statuses` in order
fn export_client(statuses: &[String]) -> Arc<ScriptedClient> {
    let client = scripted_project_client();
    client.on_post(&exports_url(), r#"{"id": "exp-1"}"#);
    for status in statuses {
        client.on_get(&status_url(), status.clone());
    }
    client
}

/// Create `<root>/app/locales/<locale>` for each locale
fn locale_dirs(root: &Path, locales: &[&str]) -> PathBuf {
    let locales_root = root.join("app/locales");
    for locale in locales {
        std::fs::create_dir_all(locales_root.join(locale)).unwrap();
    }
    locales_root
}

// ---------------------------------------------------------------------------
// Initiation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_initiate_export_posts_empty_json_request() {
    let temp_dir = TempDir::new().unwrap();
    let client = export_client(&[]);
    let mut project = test_project(client.clone(), temp_dir.path());
    assert_eq!(project.export_state(), ExportState::Unstarted);

    let export_id = project.initiate_export().await.unwrap();

    assert_eq!(export_id, "exp-1");
    assert_eq!(project.export_id().await.unwrap().as_deref(), Some("exp-1"));
    assert_eq!(project.export_state(), ExportState::Requested);

    let post = client
        .calls()
        .into_iter()
        .find(|c| c.method == "POST")
        .unwrap();
    assert_eq!(post.url, exports_url());
    assert_eq!(post.body, Some(RequestBody::Empty));
    assert!(
        post.options
            .headers
            .contains(&("content-type".to_string(), "application/json".to_string()))
    );
    assert!(
        post.options
            .headers
            .contains(&("accept".to_string(), "*".to_string()))
    );
}

#[tokio::test]
async fn test_initiate_twice_keeps_first_id() {
    let temp_dir = TempDir::new().unwrap();
    let client = scripted_project_client();
    client
        .on_post(&exports_url(), r#"{"id": "exp-1"}"#)
        .on_post(&exports_url(), r#"{"id": "exp-2"}"#);
    let mut project = test_project(client.clone(), temp_dir.path());

    assert_eq!(project.initiate_export().await.unwrap(), "exp-1");
    assert_eq!(project.initiate_export().await.unwrap(), "exp-1");

    assert_eq!(client.count("POST", &exports_url()), 2);
    assert_eq!(project.export_id().await.unwrap().as_deref(), Some("exp-1"));
}

#[tokio::test]
async fn test_numeric_export_id() {
    let temp_dir = TempDir::new().unwrap();
    let client = scripted_project_client();
    client.on_post(&exports_url(), r#"{"id": 4711}"#);
    let mut project = test_project(client, temp_dir.path());

    assert_eq!(project.initiate_export().await.unwrap(), "4711");
}

#[tokio::test]
async fn test_export_response_without_id_is_malformed() {
    let temp_dir = TempDir::new().unwrap();
    let client = scripted_project_client();
    client.on_post(&exports_url(), r#"{"status": "PROCESSING"}"#);
    let mut project = test_project(client, temp_dir.path());

    assert!(matches!(
        project.initiate_export().await,
        Err(Error::MalformedResponse { .. })
    ));
    assert_eq!(project.export_state(), ExportState::Unstarted);
    assert_eq!(project.export_id().await.unwrap(), None);
}

#[tokio::test]
async fn test_initiated_event() {
    let temp_dir = TempDir::new().unwrap();
    let mut project = test_project(export_client(&[]), temp_dir.path());
    let mut events = project.subscribe();

    project.initiate_export().await.unwrap();

    assert!(matches!(events.recv().await.unwrap(), Event::Hydrated { .. }));
    assert_eq!(
        events.recv().await.unwrap(),
        Event::ExportInitiated {
            export_id: "exp-1".to_string()
        }
    );
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_export_info_requires_initiated_export() {
    let temp_dir = TempDir::new().unwrap();
    let mut project = test_project(export_client(&[]), temp_dir.path());

    assert!(matches!(
        project.export_info().await,
        Err(Error::ExportNotStarted)
    ));
    assert!(matches!(
        project.await_export_readiness().await,
        Err(Error::ExportNotStarted)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_processing_twice_then_success() {
    let temp_dir = TempDir::new().unwrap();
    let client = export_client(&[processing(), processing(), success()]);
    let mut project = test_project(client.clone(), temp_dir.path());
    let mut events = project.subscribe();

    project.initiate_export().await.unwrap();
    assert_eq!(project.export_download_url().await.unwrap(), None);

    let start = Instant::now();
    let download_url = project.await_export_readiness().await.unwrap();

    // two sleeps of the default 5 second interval
    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert_eq!(download_url, DOWNLOAD_URL);
    assert_eq!(
        project.export_download_url().await.unwrap().as_deref(),
        Some(DOWNLOAD_URL)
    );
    assert_eq!(project.export_state(), ExportState::Succeeded);
    assert!(project.export_state().is_terminal());
    assert_eq!(client.count("GET", &status_url()), 3);

    let mut progress = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::ExportProgress { attempt, status } = event {
            progress.push((attempt, status));
        }
    }
    assert_eq!(
        progress,
        vec![
            (1, ExportStatus::Processing),
            (2, ExportStatus::Processing),
            (3, ExportStatus::Success),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failure_aborts_with_server_details() {
    let temp_dir = TempDir::new().unwrap();
    let client = export_client(&[processing(), failed("Locale 'xx' is not configured")]);
    let mut project = test_project(client.clone(), temp_dir.path());

    project.initiate_export().await.unwrap();
    let start = Instant::now();

    match project.await_export_readiness().await {
        Err(Error::ExportFailed { details }) => {
            assert_eq!(details, "Locale 'xx' is not configured")
        }
        other => panic!("expected ExportFailed, got {other:?}"),
    }
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(project.export_download_url().await.unwrap(), None);
    assert_eq!(project.export_state(), ExportState::Failed);
    assert_eq!(client.count("GET", &status_url()), 2);
}

#[tokio::test]
async fn test_unknown_status_without_details() {
    let temp_dir = TempDir::new().unwrap();
    let client = export_client(&[serde_json::json!({"status": "CANCELLED"}).to_string()]);
    let mut project = test_project(client, temp_dir.path());

    project.initiate_export().await.unwrap();
    match project.await_export_readiness().await {
        Err(Error::ExportFailed { details }) => assert_eq!(details, "unknown error"),
        other => panic!("expected ExportFailed, got {other:?}"),
    }
    assert_eq!(project.export_state(), ExportState::Failed);
}

#[tokio::test]
async fn test_missing_status_is_a_failure() {
    let temp_dir = TempDir::new().unwrap();
    let client = export_client(&[serde_json::json!({"errorDetails": "boom"}).to_string()]);
    let mut project = test_project(client.clone(), temp_dir.path());
    let mut events = project.subscribe();

    project.initiate_export().await.unwrap();
    match project.await_export_readiness().await {
        Err(Error::ExportFailed { details }) => assert_eq!(details, "boom"),
        other => panic!("expected ExportFailed, got {other:?}"),
    }
    assert_eq!(project.export_state(), ExportState::Failed);
    assert!(project.export_state().is_terminal());
    assert_eq!(client.count("GET", &status_url()), 1);

    let mut progress = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::ExportProgress { attempt, status } = event {
            progress.push((attempt, status));
        }
    }
    assert_eq!(progress, vec![(1, ExportStatus::Other(String::new()))]);
}

#[tokio::test(start_paused = true)]
async fn test_poll_bound_yields_timeout() {
    let temp_dir = TempDir::new().unwrap();
    let client = export_client(&[processing()]);
    let mut project = test_project(client.clone(), temp_dir.path());
    project.config.export.max_poll_attempts = 3;

    project.initiate_export().await.unwrap();
    let start = Instant::now();

    match project.await_export_readiness().await {
        Err(Error::ExportTimeout {
            export_id,
            attempts,
        }) => {
            assert_eq!(export_id, "exp-1");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected ExportTimeout, got {other:?}"),
    }
    // no sleep after the last check
    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert_eq!(client.count("GET", &status_url()), 3);
    assert_eq!(project.export_state(), ExportState::Processing);
    assert_eq!(project.export_download_url().await.unwrap(), None);
}

#[tokio::test]
async fn test_success_without_download_url_is_malformed() {
    let temp_dir = TempDir::new().unwrap();
    let client = export_client(&[serde_json::json!({"status": "SUCCESS"}).to_string()]);
    let mut project = test_project(client, temp_dir.path());

    project.initiate_export().await.unwrap();
    assert!(matches!(
        project.await_export_readiness().await,
        Err(Error::MalformedResponse { .. })
    ));
    assert_eq!(project.export_state(), ExportState::Failed);
    assert_eq!(project.export_download_url().await.unwrap(), None);
    assert!(matches!(
        project.download_and_extract_export().await,
        Err(Error::ExportNotReady)
    ));
}

#[tokio::test]
async fn test_status_reads_use_json_headers() {
    let temp_dir = TempDir::new().unwrap();
    let client = export_client(&[success()]);
    let mut project = test_project(client.clone(), temp_dir.path());

    project.initiate_export().await.unwrap();
    project.await_export_readiness().await.unwrap();

    let status_read = client
        .calls()
        .into_iter()
        .find(|c| c.url == status_url())
        .unwrap();
    assert_eq!(status_read.options, RequestOptions::json());
}

#[test]
fn test_export_info_parses_camel_case_fields() {
    let info: ExportInfo = serde_json::from_str(
        r#"{"id": 7, "status": "FAILED", "errorDetails": {"code": "E1"}}"#,
    )
    .unwrap();
    assert_eq!(info.status.as_deref(), Some("FAILED"));
    assert_eq!(info.download_url, None);
    assert_eq!(info.error_details_text(), r#"{"code":"E1"}"#);
}

// ---------------------------------------------------------------------------
// Download and distribution
// ---------------------------------------------------------------------------

#[test]
fn test_locale_from_file_name() {
    assert_eq!(locale_from_file_name("app.resource.en.yml"), Some("en"));
    assert_eq!(locale_from_file_name("app.resource.pt-BR.yml"), Some("pt-BR"));
    assert_eq!(locale_from_file_name("a.b.c"), Some("c"));
    assert_eq!(locale_from_file_name("app.en.yml"), Some("yml"));
    assert_eq!(locale_from_file_name("readme.txt"), None);
    assert_eq!(locale_from_file_name("a.b..yml"), None);
}

#[tokio::test]
async fn test_download_before_success_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let client = export_client(&[]);
    let mut project = test_project(client.clone(), temp_dir.path());

    project.initiate_export().await.unwrap();
    assert!(matches!(
        project.download_and_extract_export().await,
        Err(Error::ExportNotReady)
    ));
    assert_eq!(client.count("FILE", DOWNLOAD_URL), 0);
}

#[tokio::test]
async fn test_download_routes_files_by_locale() {
    let temp_dir = TempDir::new().unwrap();
    let locales_root = locale_dirs(temp_dir.path(), &["en", "de"]);
    let archive = zip_bytes(&[
        ("app.resource.en.yml", "en:\n  hello: Hello\n"),
        ("app.resource.de.yml", "de:\n  hello: Hallo\n"),
        ("app.resource.xx.yml", "xx: {}\n"),
        ("README", "no locale here"),
    ]);
    let client = export_client(&[success()]);
    client.on_export_file(DOWNLOAD_URL, archive);
    let mut project = test_project(client.clone(), temp_dir.path());

    project.initiate_export().await.unwrap();
    project.await_export_readiness().await.unwrap();
    let report = project.download_and_extract_export().await.unwrap();

    assert_eq!(report.moved.len(), 2);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(
        std::fs::read_to_string(locales_root.join("en/app.resource.en.yml")).unwrap(),
        "en:\n  hello: Hello\n"
    );
    assert!(locales_root.join("de/app.resource.de.yml").exists());
    assert!(!locales_root.join("xx").exists());

    // the workspace, including unrouted files, is gone
    let workspace_root = temp_dir.path().join("work");
    assert_eq!(std::fs::read_dir(&workspace_root).unwrap().count(), 0);
    assert!(report.skipped.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_download_leaves_unrelated_files_alone() {
    let temp_dir = TempDir::new().unwrap();
    let locales_root = locale_dirs(temp_dir.path(), &["en"]);
    let unrelated = temp_dir.path().join("untracked.txt");
    std::fs::write(&unrelated, "keep me").unwrap();
    std::fs::write(locales_root.join("en/existing.yml"), "keep me too").unwrap();

    let client = export_client(&[success()]);
    client.on_export_file(
        DOWNLOAD_URL,
        zip_bytes(&[("app.resource.en.yml", "en: {}\n")]),
    );
    let mut project = test_project(client, temp_dir.path());

    project.initiate_export().await.unwrap();
    project.await_export_readiness().await.unwrap();
    project.download_and_extract_export().await.unwrap();

    assert!(unrelated.exists());
    assert!(locales_root.join("en/existing.yml").exists());
    assert!(locales_root.join("en/app.resource.en.yml").exists());
}

#[tokio::test]
async fn test_download_events() {
    let temp_dir = TempDir::new().unwrap();
    locale_dirs(temp_dir.path(), &["en"]);
    let archive = zip_bytes(&[
        ("app.resource.en.yml", "en: {}\n"),
        ("app.resource.xx.yml", "xx: {}\n"),
    ]);
    let archive_len = archive.len() as u64;
    let client = export_client(&[success()]);
    client.on_export_file(DOWNLOAD_URL, archive);
    let mut project = test_project(client, temp_dir.path());

    project.initiate_export().await.unwrap();
    project.await_export_readiness().await.unwrap();
    let mut events = project.subscribe();
    project.download_and_extract_export().await.unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        Event::ExportDownloaded { bytes: archive_len }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        Event::ExportExtracted { files: 2 }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        Event::ExportDistributed {
            moved: 1,
            skipped: 1
        }
    );
    assert_eq!(events.recv().await.unwrap(), Event::WorkspaceCleaned);
}

#[tokio::test]
async fn test_corrupt_archive_fails_and_cleans_workspace() {
    let temp_dir = TempDir::new().unwrap();
    locale_dirs(temp_dir.path(), &["en"]);
    let client = export_client(&[success()]);
    client.on_export_file(DOWNLOAD_URL, b"definitely not a zip".to_vec());
    let mut project = test_project(client, temp_dir.path());

    project.initiate_export().await.unwrap();
    project.await_export_readiness().await.unwrap();

    assert!(matches!(
        project.download_and_extract_export().await,
        Err(Error::Extraction { .. })
    ));
    let workspace_root = temp_dir.path().join("work");
    assert_eq!(std::fs::read_dir(&workspace_root).unwrap().count(), 0);
}

/// Extractor that writes fixed files instead of reading the archive
struct FixedExtractor(Vec<&'static str>);

#[async_trait]
impl ArchiveExtractor for FixedExtractor {
    async fn extract_archive(&self, _archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dest_dir)?;
        let mut files = Vec::new();
        for name in &self.0 {
            let path = dest_dir.join(name);
            std::fs::write(&path, name.as_bytes())?;
            files.push(path);
        }
        Ok(files)
    }
}

/// Mover that records requests and delegates to [`FsMover`]
#[derive(Default)]
struct RecordingMover {
    moves: Mutex<Vec<(String, PathBuf)>>,
}

#[async_trait]
impl FileMover for RecordingMover {
    async fn move_file(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let name = source
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        self.moves.lock().unwrap().push((name, dest_dir.to_path_buf()));
        FsMover.move_file(source, dest_dir).await
    }
}

#[tokio::test]
async fn test_injected_collaborators() {
    let temp_dir = TempDir::new().unwrap();
    let locales_root = locale_dirs(temp_dir.path(), &["fr"]);
    let client = export_client(&[success()]);
    client.on_export_file(DOWNLOAD_URL, Vec::new());
    let mover = Arc::new(RecordingMover::default());
    let mut project = test_project(client, temp_dir.path())
        .with_extractor(Arc::new(FixedExtractor(vec![
            "web.strings.fr.json",
            "web.strings.es.json",
        ])))
        .with_mover(mover.clone());

    project.initiate_export().await.unwrap();
    project.await_export_readiness().await.unwrap();
    let report = project.download_and_extract_export().await.unwrap();

    assert_eq!(
        *mover.moves.lock().unwrap(),
        vec![("web.strings.fr.json".to_string(), locales_root.join("fr"))]
    );
    assert_eq!(report.moved, vec![locales_root.join("fr/web.strings.fr.json")]);
    assert_eq!(report.skipped.len(), 1);
}

#[tokio::test]
async fn test_fs_mover_replaces_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("app.resource.en.yml");
    let dest_dir = temp_dir.path().join("en");
    std::fs::create_dir_all(&dest_dir).unwrap();
    std::fs::write(&source, "new").unwrap();
    std::fs::write(dest_dir.join("app.resource.en.yml"), "old").unwrap();

    let moved = FsMover.move_file(&source, &dest_dir).await.unwrap();

    assert_eq!(moved, dest_dir.join("app.resource.en.yml"));
    assert_eq!(std::fs::read_to_string(&moved).unwrap(), "new");
    assert!(!source.exists());
}

#[test]
fn test_zip_extractor_skips_unsafe_entries() {
    let temp_dir = TempDir::new().unwrap();
    let archive_path = temp_dir.path().join("export.zip");
    std::fs::write(
        &archive_path,
        zip_bytes(&[
            ("../escape.en.yml", "nope"),
            ("nested/app.resource.en.yml", "ok"),
        ]),
    )
    .unwrap();
    let dest = temp_dir.path().join("extracted");

    let files = ZipExtractor::try_extract(&archive_path, &dest).unwrap();

    assert_eq!(files, vec![dest.join("nested/app.resource.en.yml")]);
    assert!(!temp_dir.path().join("escape.en.yml").exists());
}
