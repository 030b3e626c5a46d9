//! End-to-end tests for the registration flow.
//!
//! Drives the binary the way an operator would: roster setup, event setup,
//! registration, statistics, and export.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn att_binary() -> String {
    env!("CARGO_BIN_EXE_att").to_string()
}

struct Workspace {
    _temp: TempDir,
    config_file: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let db_file = temp.path().join("att.db");
        let config_file = temp.path().join("config.toml");
        std::fs::write(
            &config_file,
            format!(r#"database_path = "{}""#, db_file.display()),
        )
        .unwrap();
        Self {
            _temp: temp,
            config_file,
        }
    }

    fn att(&self, args: &[&str]) -> Output {
        Command::new(att_binary())
            .arg("--config")
            .arg(&self.config_file)
            .args(args)
            .output()
            .expect("failed to run att")
    }

    fn att_ok(&self, args: &[&str]) -> String {
        let output = self.att(args);
        assert!(
            output.status.success(),
            "att {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    fn att_err(&self, args: &[&str]) -> String {
        let output = self.att(args);
        assert!(!output.status.success(), "att {args:?} unexpectedly succeeded");
        String::from_utf8_lossy(&output.stderr).into_owned()
    }

    /// One subject, one registrar, two overlapping events on 2025-10-21
    /// plus a third on 2025-10-22.
    fn seed(&self) {
        self.att_ok(&["subjects", "add", "20251001", "Ada Lovelace"]);
        self.att_ok(&["operators", "add", "90000001", "Front Desk", "--registrar"]);
        for (title, date, start, end) in [
            ("IIoT Workshop", "2025-10-21", "12:00", "13:00"),
            ("Applied Math", "2025-10-21", "12:30", "13:30"),
            ("Closing Keynote", "2025-10-22", "09:00", "10:00"),
        ] {
            self.att_ok(&[
                "events", "add", title, "--date", date, "--start", start, "--end", end,
            ]);
        }
    }

    fn register(&self, event: &str) -> Output {
        self.att(&[
            "register",
            "20251001",
            event,
            "--operator",
            "90000001",
            "--skip-time-window",
        ])
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn register_then_stats_then_export() {
    let ws = Workspace::new();
    ws.seed();

    let output = ws.register("1");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    // Two blocks (E1+E2 overlap, E3 alone), one attended.
    let stats = ws.att_ok(&["stats", "20251001", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(parsed["total_blocks"], 2);
    assert_eq!(parsed["attended_blocks"], 1);
    assert_eq!(parsed["percentage"], 50.0);
    assert_eq!(parsed["meets_minimum"], false);

    // 50% misses the default 80% minimum; lowering it qualifies the subject.
    let export = ws.att_ok(&["export", "--qualified"]);
    assert_eq!(export.lines().count(), 0);
    ws.att_ok(&["policy", "set", "--minimum", "50"]);
    let export = ws.att_ok(&["export", "--qualified"]);
    assert_eq!(export.lines().count(), 1);
    let row: serde_json::Value = serde_json::from_str(export.lines().next().unwrap()).unwrap();
    assert_eq!(row["account_number"], "20251001");
    assert_eq!(row["meets_minimum"], true);
}

#[test]
fn duplicate_and_conflict_are_rejected() {
    let ws = Workspace::new();
    ws.seed();
    assert!(ws.register("1").status.success());

    let stderr = String::from_utf8_lossy(&ws.register("1").stderr).into_owned();
    assert!(stderr.contains("already has a valid"), "{stderr}");

    // Event 2 overlaps event 1 on the same date.
    let stderr = String::from_utf8_lossy(&ws.register("2").stderr).into_owned();
    assert!(stderr.contains("overlaps"), "{stderr}");

    // The next day's event is unaffected.
    assert!(ws.register("3").status.success());
}

#[test]
fn window_enforced_unless_skipped() {
    let ws = Workspace::new();
    ws.seed();

    // Without the skip flag the 2025 window has long closed.
    let stderr = ws.att_err(&["register", "20251001", "1", "--operator", "90000001"]);
    assert!(stderr.contains("only open"), "{stderr}");

    assert!(ws.register("1").status.success());
}

#[test]
fn non_registrar_operator_is_rejected() {
    let ws = Workspace::new();
    ws.seed();
    ws.att_ok(&["operators", "add", "90000002", "Bystander"]);

    let stderr = ws.att_err(&[
        "register",
        "20251001",
        "1",
        "--operator",
        "90000002",
        "--skip-time-window",
    ]);
    assert!(stderr.contains("not a registrar"), "{stderr}");
}

#[test]
fn guests_need_approval_and_skip_conflicts() {
    let ws = Workspace::new();
    ws.seed();
    ws.att_ok(&["guests", "add", "30000001", "Visiting Scholar"]);

    let stderr = ws.att_err(&[
        "register",
        "30000001",
        "1",
        "--operator",
        "90000001",
        "--skip-time-window",
    ]);
    assert!(stderr.contains("not approved"), "{stderr}");

    ws.att_ok(&["guests", "approve", "30000001"]);
    for event in ["1", "2"] {
        // Overlapping events are fine for guests.
        ws.att_ok(&[
            "register",
            "30000001",
            event,
            "--operator",
            "90000001",
            "--skip-time-window",
        ]);
    }
}

#[test]
fn invalidate_frees_the_slot() {
    let ws = Workspace::new();
    ws.seed();
    assert!(ws.register("1").status.success());

    let output = ws.att_ok(&["invalidate", "1"]);
    assert!(output.contains("Invalidated"), "{output}");

    // The overlapping event is registrable again.
    assert!(ws.register("2").status.success());

    let stats = ws.att_ok(&["stats", "20251001", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(parsed["attended_blocks"], 1);
}

#[test]
fn delete_removes_the_record_entirely() {
    let ws = Workspace::new();
    ws.seed();
    assert!(ws.register("1").status.success());

    let output = ws.att_ok(&["invalidate", "1", "--delete"]);
    assert!(output.contains("Deleted"), "{output}");

    let stats = ws.att_ok(&["stats", "20251001", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(parsed["attended_blocks"], 0);

    // Unlike soft invalidation, nothing is kept for audit.
    let status = ws.att_ok(&["status"]);
    assert!(status.contains("Attendance records: 0 (0 valid)"), "{status}");

    // The slot is free again.
    assert!(ws.register("1").status.success());
}

#[test]
fn event_records_show_invalidation_state() {
    let ws = Workspace::new();
    ws.seed();
    assert!(ws.register("1").status.success());

    let output = ws.att_ok(&["events", "records", "1"]);
    assert!(output.contains("subject 1"), "{output}");
    assert!(!output.contains("(invalid)"), "{output}");

    ws.att_ok(&["invalidate", "1"]);
    let output = ws.att_ok(&["events", "records", "1"]);
    assert!(output.contains("(invalid)"), "{output}");

    let stderr = ws.att_err(&["events", "records", "999"]);
    assert!(stderr.contains("no event"), "{stderr}");
}

#[test]
fn deactivating_an_event_reshapes_the_blocks() {
    let ws = Workspace::new();
    ws.seed();
    assert!(ws.register("3").status.success());

    let stats = ws.att_ok(&["stats", "20251001", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(parsed["total_blocks"], 2);
    assert_eq!(parsed["attended_blocks"], 1);

    ws.att_ok(&["events", "deactivate", "3"]);
    let stats = ws.att_ok(&["stats", "20251001", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(parsed["total_blocks"], 1);
    assert_eq!(parsed["attended_blocks"], 0);
}

#[test]
fn import_reads_jsonl_from_stdin() {
    let ws = Workspace::new();
    ws.seed();

    let lines = concat!(
        r#"{"account":"20251001","event_id":1,"registered_at":"2025-10-21T12:05:00Z"}"#,
        "\n",
        "garbage line\n",
        // Conflicts with the first line's slot.
        r#"{"account":"20251001","event_id":2,"registered_at":"2025-10-21T12:35:00Z"}"#,
        "\n",
    );

    let mut child = Command::new(att_binary())
        .arg("--config")
        .arg(path_str(&ws.config_file))
        .args(["import", "--operator", "90000001"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(lines.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Imported 1 record(s), skipped 2."), "{stdout}");

    let stats = ws.att_ok(&["stats", "20251001", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(parsed["attended_blocks"], 1);
}

#[test]
fn status_shows_counts() {
    let ws = Workspace::new();
    ws.seed();

    let output = ws.att_ok(&["status"]);
    assert!(output.contains("Subjects: 1"), "{output}");
    assert!(output.contains("Events: 3"), "{output}");
    assert!(output.contains("Minimum attendance: 80.00%"), "{output}");
}
