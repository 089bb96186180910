//! Runs the `tally` binary end to end inside a scratch project directory.

use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use serde_json::Value;

fn tally(project: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tally"))
        .args(args)
        .current_dir(project)
        .env("XDG_CONFIG_HOME", project.join("xdg"))
        .env("HOME", project)
        .env("TALLY_WORKER__SLEEP_MS", "1")
        .env_remove("TALLY_LOG")
        .output()
        .expect("tally binary should run")
}

fn report(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "tally failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be a JSON report")
}

#[test]
fn emitted_events_are_drained_by_bounded_worker() {
    let project = tempfile::tempdir().unwrap();

    for id in ["1", "2"] {
        let emitted = report(&tally(
            project.path(),
            &[
                "--format",
                "raw",
                "emit",
                "--kind",
                "created",
                "User",
                id,
                "--after",
                r#"{"name":"n"}"#,
            ],
        ));
        assert_eq!(emitted["mode"], "queued");
        assert_eq!(emitted["outcome"], "enqueued");
    }

    let summary = report(&tally(project.path(), &["work", "--max-loops", "3"]));
    assert_eq!(summary["received"], 2);
    assert_eq!(summary["events_flushed"], 2);
    assert_eq!(summary["rescues"], 0);
    assert!(project.path().join(".tally").join("audit.db").exists());
}

#[test]
fn recover_with_no_rescue_files_reports_nothing() {
    let project = tempfile::tempdir().unwrap();
    let recovered = report(&tally(project.path(), &["recover"]));
    assert_eq!(recovered["files_found"], 0);
    assert_eq!(recovered["events_restored"], 0);
}

#[test]
fn prune_days_override_wins() {
    let project = tempfile::tempdir().unwrap();

    let default_run = report(&tally(project.path(), &["prune"]));
    assert_eq!(default_run["retention_days"], 90);

    let override_run = report(&tally(project.path(), &["prune", "--days", "14"]));
    assert_eq!(override_run["retention_days"], 14);
    assert_eq!(override_run["deleted"], 0);
}

#[test]
fn project_config_file_is_honoured() {
    let project = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(project.path().join(".tally")).unwrap();
    std::fs::write(
        project.path().join(".tally").join("config.toml"),
        "[retention]\nprune_days = 30\n",
    )
    .unwrap();

    let pruned = report(&tally(project.path(), &["prune"]));
    assert_eq!(pruned["retention_days"], 30);
}

#[test]
fn invalid_config_exits_with_error() {
    let project = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_tally"))
        .args(["work", "--max-loops", "1"])
        .current_dir(project.path())
        .env("XDG_CONFIG_HOME", project.path().join("xdg"))
        .env("HOME", project.path())
        .env("TALLY_WORKER__BATCH_SIZE", "0")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("tally error:"), "{stderr}");
    assert!(stderr.contains("worker.batch_size"), "{stderr}");
}

#[test]
fn prune_days_beyond_supported_range_is_rejected() {
    let project = tempfile::tempdir().unwrap();
    let output = tally(project.path(), &["prune", "--days", "4294967295"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn configured_retention_beyond_supported_range_exits_with_error() {
    let project = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_tally"))
        .arg("prune")
        .current_dir(project.path())
        .env("XDG_CONFIG_HOME", project.path().join("xdg"))
        .env("HOME", project.path())
        .env("TALLY_RETENTION__PRUNE_DAYS", "4294967295")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("retention.prune_days"), "{stderr}");
}

#[cfg(unix)]
#[test]
fn sigterm_flushes_buffered_batch_before_exit() {
    use std::io::{BufRead, BufReader};
    use std::process::Stdio;
    use std::sync::mpsc;
    use std::time::Duration;

    let project = tempfile::tempdir().unwrap();
    report(&tally(
        project.path(),
        &["emit", "--kind", "created", "User", "1", "--after", r#"{"name":"n"}"#],
    ));

    // The interval is far away, so only the shutdown drain can flush.
    let mut child = Command::new(env!("CARGO_BIN_EXE_tally"))
        .arg("work")
        .current_dir(project.path())
        .env("XDG_CONFIG_HOME", project.path().join("xdg"))
        .env("HOME", project.path())
        .env("TALLY_WORKER__SLEEP_MS", "1")
        .env("TALLY_WORKER__FLUSH_INTERVAL_SECS", "3600")
        .env("TALLY_LOG", "info,tally_worker=debug")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let stderr = child.stderr.take().unwrap();
    let (buffered_tx, buffered_rx) = mpsc::channel();
    let reader = std::thread::spawn(move || {
        let mut lines = Vec::new();
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            if line.contains("Buffered audit event") {
                let _ = buffered_tx.send(());
            }
            lines.push(line);
        }
        lines
    });

    if buffered_rx.recv_timeout(Duration::from_secs(30)).is_err() {
        let _ = child.kill();
        panic!("worker never buffered the event: {:?}", reader.join().unwrap());
    }

    let sent = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    let output = child.wait_with_output().unwrap();
    let logs = reader.join().unwrap();
    assert!(output.status.success(), "{logs:?}");
    assert!(
        logs.iter().any(|line| line.contains("Signal received")),
        "{logs:?}"
    );

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["received"], 1);
    assert_eq!(summary["events_flushed"], 1);
    assert_eq!(summary["flushes"], 1);
    assert_eq!(summary["rescues"], 0);
}
