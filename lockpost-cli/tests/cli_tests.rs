//! End-to-end tests for the `lockpost` binary.
//!
//! Each test builds a throwaway project directory and runs the compiled CLI
//! against it, checking exit codes, JSON output and package.json edits.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const PACKAGE_LOCK: &str = r#"{
  "name": "demo-app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "requires": true,
  "packages": {
    "": {
      "name": "demo-app",
      "version": "1.0.0",
      "dependencies": { "package-a": "^1.0.0" }
    },
    "node_modules/package-a": {
      "version": "1.0.0",
      "dependencies": { "debug": "^4.4.0" }
    },
    "node_modules/debug": {
      "version": "4.4.2",
      "dependencies": { "ms": "^2.1.3" }
    },
    "node_modules/ms": { "version": "2.1.3" }
  }
}
"#;

const PACKAGE_JSON: &str = r#"{
  "name": "demo-app",
  "version": "1.0.0",
  "dependencies": {
    "package-a": "^1.0.0"
  }
}
"#;

const CLEAN_LOCK: &str = r#"{
  "name": "clean-app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "clean-app", "version": "1.0.0", "dependencies": { "ms": "^2.1.3" } },
    "node_modules/ms": { "version": "2.1.3" }
  }
}
"#;

/// Run the binary with a config path that does not exist, so defaults apply.
fn lockpost(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lockpost"))
        .arg("--config")
        .arg(dir.join("lockpost.toml"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("should run lockpost binary")
}

fn project(lock: &str, manifest: Option<&str>) -> TempDir {
    let dir = TempDir::new().expect("should create temp dir");
    fs::write(dir.path().join("package-lock.json"), lock).expect("should write lockfile");
    if let Some(manifest) = manifest {
        fs::write(dir.path().join("package.json"), manifest).expect("should write manifest");
    }
    dir
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

fn path_arg(dir: &TempDir) -> &str {
    dir.path().to_str().expect("utf-8 temp path")
}

#[test]
fn test_lock_compromised_exits_4() {
    // Given: a project with debug@4.4.2 installed
    let dir = project(PACKAGE_LOCK, Some(PACKAGE_JSON));

    // When: scanning with JSON output
    let output = lockpost(dir.path(), &["--output", "json", "lock", path_arg(&dir)]);

    // Then: exit code 4 and the report names debug with its chain
    assert_eq!(output.status.code(), Some(4));
    let report = stdout_json(&output);
    assert_eq!(report["threatened"][0]["name"].as_str(), Some("debug"));
    assert_eq!(report["threatened"][0]["compromised"].as_bool(), Some(true));
    assert_eq!(
        report["threatened"][0]["versions"][0]["chains"][0]["nodes"],
        serde_json::json!(["demo-app@1.0.0", "package-a@1.0.0", "debug@4.4.2"])
    );
    assert_eq!(
        report["plan"]["plan"]["overrides"]["debug"].as_str(),
        Some("4.4.1")
    );
    assert!(report.get("applied").is_none());

    // And: package.json untouched without --update
    let manifest = fs::read_to_string(dir.path().join("package.json")).expect("read manifest");
    assert_eq!(manifest, PACKAGE_JSON);
}

#[test]
fn test_lock_update_writes_overrides_and_exits_0() {
    let dir = project(PACKAGE_LOCK, Some(PACKAGE_JSON));

    let output = lockpost(
        dir.path(),
        &["--output", "json", "lock", path_arg(&dir), "--update"],
    );

    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report = stdout_json(&output);
    assert_eq!(report["applied"]["updated"], serde_json::json!(["debug"]));
    assert!(report["applied"]["backup_path"].is_string());

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("package.json")).expect("read manifest"),
    )
    .expect("manifest is JSON");
    assert_eq!(manifest["overrides"]["debug"].as_str(), Some("4.4.1"));
    assert_eq!(manifest["resolutions"]["debug"].as_str(), Some("4.4.1"));

    // Second run sees the pin and has nothing left to do
    let rerun = lockpost(dir.path(), &["--output", "json", "lock", path_arg(&dir)]);
    assert_eq!(rerun.status.code(), Some(0));
    let report = stdout_json(&rerun);
    assert_eq!(report["plan"]["already_pinned"], serde_json::json!(["debug"]));
    assert_eq!(report["threatened"][0]["pinned_to"].as_str(), Some("4.4.1"));
}

#[test]
fn test_lock_update_without_resolutions_or_backup() {
    let dir = project(PACKAGE_LOCK, Some(PACKAGE_JSON));

    let output = lockpost(
        dir.path(),
        &[
            "--output",
            "json",
            "lock",
            path_arg(&dir),
            "--update",
            "--no-resolutions",
            "--no-backup",
        ],
    );

    assert_eq!(output.status.code(), Some(0));
    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("package.json")).expect("read manifest"),
    )
    .expect("manifest is JSON");
    assert_eq!(manifest["overrides"]["debug"].as_str(), Some("4.4.1"));
    assert!(manifest.get("resolutions").is_none());

    let backups = fs::read_dir(dir.path())
        .expect("list dir")
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().contains(".bak"))
        .count();
    assert_eq!(backups, 0);
}

#[test]
fn test_lock_update_without_manifest_is_error() {
    let dir = project(PACKAGE_LOCK, None);

    let output = lockpost(dir.path(), &["lock", path_arg(&dir), "--update"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("package.json"), "stderr: {stderr}");
}

#[test]
fn test_lock_clean_project_exits_0_text() {
    let dir = project(CLEAN_LOCK, None);

    let output = lockpost(dir.path(), &["lock", path_arg(&dir)]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("package-lock.json"));
    assert!(stdout.contains("No known-compromised packages installed."));
}

#[test]
fn test_lock_text_output_shows_chain_and_plan() {
    let dir = project(PACKAGE_LOCK, Some(PACKAGE_JSON));

    let output = lockpost(dir.path(), &["lock", path_arg(&dir)]);

    assert_eq!(output.status.code(), Some(4));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("demo-app@1.0.0 > package-a@1.0.0 > debug@4.4.2"));
    assert!(stdout.contains("\"debug\": \"4.4.1\""));
    assert!(stdout.contains("--update"));
}

#[test]
fn test_lock_missing_directory_is_error() {
    let dir = TempDir::new().expect("should create temp dir");
    let missing = dir.path().join("nope");

    let output = lockpost(
        dir.path(),
        &["lock", missing.to_str().expect("utf-8 path")],
    );

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_lock_invalid_flag_value_is_config_error() {
    let dir = project(CLEAN_LOCK, None);

    let output = lockpost(dir.path(), &["lock", path_arg(&dir), "--max-depth", "0"]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_lock_custom_threat_db() {
    let dir = project(CLEAN_LOCK, None);
    let db = dir.path().join("threats.json");
    fs::write(
        &db,
        r#"[{ "name": "ms", "badRanges": ["2.1.3"], "lastSafe": "2.1.2" }]"#,
    )
    .expect("should write threat db");

    let output = lockpost(
        dir.path(),
        &[
            "--output",
            "json",
            "lock",
            path_arg(&dir),
            "--threats",
            db.to_str().expect("utf-8 path"),
        ],
    );

    assert_eq!(output.status.code(), Some(4));
    let report = stdout_json(&output);
    assert_eq!(report["threat_entries"].as_u64(), Some(1));
    assert_eq!(report["threatened"][0]["name"].as_str(), Some("ms"));
}

#[test]
fn test_threats_filter_by_name() {
    let dir = TempDir::new().expect("should create temp dir");

    let output = lockpost(
        dir.path(),
        &["--output", "json", "threats", "--name", "debug"],
    );

    assert_eq!(output.status.code(), Some(0));
    let list = stdout_json(&output);
    assert_eq!(list["source"].as_str(), Some("built-in"));
    let entries = list["entries"].as_array().expect("entries array");
    assert!(!entries.is_empty());
    assert!(
        entries
            .iter()
            .all(|e| e["name"].as_str().is_some_and(|n| n.contains("debug")))
    );
    assert!(list["total"].as_u64().unwrap_or(0) >= entries.len() as u64);
}

#[test]
fn test_config_validate_valid_and_invalid() {
    let dir = TempDir::new().expect("should create temp dir");
    let config_path = dir.path().join("lockpost.toml");

    fs::write(
        &config_path,
        "[general]\nlog_level = \"info\"\n\n[scan]\nmax_chains = 5\n",
    )
    .expect("should write config");
    let output = lockpost(dir.path(), &["--output", "json", "config", "validate"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_json(&output)["valid"].as_bool(), Some(true));

    fs::write(&config_path, "[scan]\nmax_chain_depth = 0\n").expect("should write config");
    let output = lockpost(dir.path(), &["--output", "json", "config", "validate"]);
    assert_eq!(output.status.code(), Some(2));
    let report = stdout_json(&output);
    assert_eq!(report["valid"].as_bool(), Some(false));
    assert!(
        report["errors"][0]
            .as_str()
            .is_some_and(|e| e.contains("max_chain_depth"))
    );
}

#[test]
fn test_config_show_section() {
    let dir = TempDir::new().expect("should create temp dir");
    fs::write(
        dir.path().join("lockpost.toml"),
        "[pin]\nbackup = false\n",
    )
    .expect("should write config");

    let output = lockpost(dir.path(), &["config", "show", "--section", "pin"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[pin]"));
    assert!(stdout.contains("backup = false"));
}
