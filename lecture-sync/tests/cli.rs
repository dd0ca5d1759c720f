use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

/// URL nothing listens on; tests that reach the network must fail fast.
const DEAD_URL: &str = "http://127.0.0.1:9/wasm.zip";

/// Places a ready-made lecture archive where the CLI expects its download.
fn seed_archive(root: &Path, lecture: &str) {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(
            "lecture-python-intro-wasm/lectures/lecture1.md",
            SimpleFileOptions::default(),
        )
        .unwrap();
    writer.write_all(lecture.as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();
    fs::write(root.join("qe-lecture-intro-wasm.zip"), bytes).unwrap();
}

#[test]
fn sync_cli_happy_flow_rewrites_lectures() {
    let tmp = tempdir().unwrap();
    seed_archive(tmp.path(), "# One\n!pip install --upgrade numpy\n");

    let mut cmd = Command::cargo_bin("lecture-sync").expect("Binary exists");
    cmd.arg("sync")
        .arg("--root")
        .arg(tmp.path())
        .arg("--url")
        .arg(DEAD_URL);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Sync completed successfully"))
        .stdout(predicate::str::contains("Processing 1 lecture files..."))
        .stdout(predicate::str::contains("Processed: lecture1.md"));

    assert_eq!(
        fs::read_to_string(tmp.path().join("lectures/lecture1.md")).unwrap(),
        "# One\n%pip install numpy\n"
    );
    assert!(!tmp.path().join("qe-lecture-intro-wasm.zip").exists());
    assert!(!tmp.path().join("lecture-python-intro-wasm").exists());
}

#[test]
fn sync_cli_reads_config_file() {
    let tmp = tempdir().unwrap();
    seed_archive(tmp.path(), "```{exercise-start}\n");
    let config = tmp.path().join("sync.yaml");
    fs::write(
        &config,
        format!(
            "root_dir: {}\nsource_url: {DEAD_URL}\ncontent_dir: book/lectures\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    Command::cargo_bin("lecture-sync")
        .unwrap()
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .arg("--quiet")
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(tmp.path().join("book/lectures/lecture1.md")).unwrap(),
        "```{exercise}\n"
    );
}

#[test]
fn sync_cli_fails_when_download_fails() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("lectures")).unwrap();
    fs::write(tmp.path().join("lectures/a.md"), "!pip install x\n").unwrap();

    Command::cargo_bin("lecture-sync")
        .unwrap()
        .arg("sync")
        .arg("--root")
        .arg(tmp.path())
        .arg("--url")
        .arg(DEAD_URL)
        .arg("--timeout")
        .arg("5")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Downloading lectures..."))
        .stdout(predicate::str::contains("Copying files").not())
        .stderr(predicate::str::contains("Sync failed"))
        .stderr(predicate::str::contains("fetch step"));

    assert_eq!(
        fs::read_to_string(tmp.path().join("lectures/a.md")).unwrap(),
        "!pip install x\n"
    );
}

#[test]
fn sync_cli_rejects_config_that_would_remove_the_root() {
    let tmp = tempdir().unwrap();
    seed_archive(tmp.path(), "# One\n");
    fs::create_dir_all(tmp.path().join("lectures")).unwrap();
    fs::write(tmp.path().join("lectures/mine.md"), "mine\n").unwrap();
    let config = tmp.path().join("sync.yaml");
    fs::write(
        &config,
        format!(
            "root_dir: {}\nsource_url: {DEAD_URL}\nextracted_dir: \"\"\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    Command::cargo_bin("lecture-sync")
        .unwrap()
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config step"))
        .stderr(predicate::str::contains("extracted_dir must not be empty"));

    assert_eq!(
        fs::read_to_string(tmp.path().join("lectures/mine.md")).unwrap(),
        "mine\n"
    );
    assert!(tmp.path().join("qe-lecture-intro-wasm.zip").is_file());
}

#[test]
fn sync_cli_rejects_missing_config_file() {
    let tmp = tempdir().unwrap();
    Command::cargo_bin("lecture-sync")
        .unwrap()
        .arg("sync")
        .arg("--config")
        .arg(tmp.path().join("missing.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn run_reports_the_failed_stage_in_traces() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use lecture_sync::cli::{run, Cli, Commands, SyncArgs};

    let tmp = tempdir().unwrap();
    let cli = Cli {
        quiet: false,
        command: Commands::Sync(SyncArgs {
            root: Some(tmp.path().to_path_buf()),
            url: Some(DEAD_URL.to_string()),
            timeout: Some(5),
            ..SyncArgs::default()
        }),
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs
            .iter()
            .any(|msg| msg.contains("Synchronisation failed") && msg.contains("fetch")),
        "Expected a failed-synchronisation trace event, got: {:?}",
        event_msgs
    );
}
