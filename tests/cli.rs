use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cidx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cidx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/cidx.sqlite"

[embedding]
provider = "disabled"

[sync]
snapshot_path = "{root}/data/consultants.json"
workers = 2
"#,
        root = root.display()
    );

    let config_path = config_dir.join("cidx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn write_snapshot(root: &Path) -> PathBuf {
    let path = root.join("snapshot.json");
    let records = serde_json::json!([
        {
            "consultant_id": "c1",
            "name": "Alex Rich",
            "consultant_status": "Active",
            "practice_area": "Marketing",
            "description": "Brand and marketing strategy"
        },
        {
            "consultant_id": "c2",
            "name": "Richard Cole",
            "consultant_status": "Inactive",
            "finance_skills": ["Audit", "Budgeting"]
        },
        {
            "consultant_id": "c3",
            "name": "Jordan Park"
        }
    ]);
    fs::write(&path, serde_json::to_string_pretty(&records).unwrap()).unwrap();
    path
}

fn run_cidx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cidx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("ZOHO_CLIENT_ID")
        .env_remove("ZOHO_CLIENT_SECRET")
        .env_remove("ZOHO_REFRESH_TOKEN")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cidx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cidx(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/cidx.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_cidx(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_cidx(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_cidx(&tmp.path().join("nope.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_sync_without_credentials_is_a_config_error() {
    let (tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cidx(&config_path, &["sync"]);
    assert!(!success);
    assert!(
        stderr.contains("missing required environment variable ZOHO_CLIENT_ID"),
        "stderr={}",
        stderr
    );
    // Nothing was opened or written.
    assert!(!tmp.path().join("data/cidx.sqlite").exists());
}

#[test]
fn test_search_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    run_cidx(&config_path, &["init"]);
    let (stdout, stderr, success) = run_cidx(&config_path, &["search", "marketing strategy"]);
    assert!(success, "search failed: stderr={}", stderr);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_json_echoes_query() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) =
        run_cidx(&config_path, &["search", "nonprofit boards", "--json"]);
    assert!(success);
    let response: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(response["query"], "nonprofit boards");
    assert_eq!(response["total_found"], 0);
    assert!(response["results"].as_array().unwrap().is_empty());
}

#[test]
fn test_get_unknown_id_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_cidx(&config_path, &["init"]);
    let (_, stderr, success) = run_cidx(&config_path, &["get", "nope"]);
    assert!(!success);
    assert!(stderr.contains("consultant not found: nope"));
}

#[test]
fn test_stats_and_runs_on_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cidx(&config_path, &["stats"]);
    assert!(success, "stats failed: stderr={}", stderr);
    assert!(stdout.contains("Consultants:  0"));
    assert!(stdout.contains("Last sync:    never"));

    let (stdout, _, success) = run_cidx(&config_path, &["runs"]);
    assert!(success);
    assert!(stdout.contains("No sync runs recorded."));
}

#[test]
fn test_replay_then_lookup() {
    let (tmp, config_path) = setup_test_env();
    let snapshot = write_snapshot(tmp.path());

    let (stdout, stderr, success) =
        run_cidx(&config_path, &["replay", snapshot.to_str().unwrap()]);
    assert!(success, "replay failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("sync replay"));
    assert!(stdout.contains("succeeded:            3"));
    // The disabled provider stores every record without a vector.
    assert!(stdout.contains("embedding failures:   3"));
    assert!(stdout.contains("ok"));

    // Substring, not word, matching: "Richard" contains "rich" too.
    let (stdout, _, success) = run_cidx(&config_path, &["find-name", "RICH"]);
    assert!(success);
    assert!(stdout.contains("Alex Rich"));
    assert!(stdout.contains("Richard Cole"));
    assert!(!stdout.contains("Jordan Park"));
    let alex = stdout.find("Alex Rich").unwrap();
    let richard = stdout.find("Richard Cole").unwrap();
    assert!(alex < richard, "name results are alphabetical");

    let (stdout, _, success) = run_cidx(&config_path, &["get", "c2", "--json"]);
    assert!(success);
    let record: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(record["consultant_id"], "c2");
    assert_eq!(record["finance_skills"], serde_json::json!(["Audit", "Budgeting"]));
    assert!(record["indexed"]["text"]
        .as_str()
        .unwrap()
        .contains("Audit Budgeting"));

    let (stdout, _, success) = run_cidx(&config_path, &["list", "--limit", "2"]);
    assert!(success);
    assert!(stdout.contains("Alex Rich"));
    assert!(stdout.contains("Jordan Park"));
    assert!(!stdout.contains("Richard Cole"));

    let (stdout, _, success) = run_cidx(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Consultants:  3"));
    assert!(stdout.contains("Embedded:     0 / 3 (0%)"));
    assert!(stdout.contains("replay completed"));

    let (stdout, _, success) = run_cidx(&config_path, &["runs"]);
    assert!(success);
    assert!(stdout.contains("replay"));
    assert!(stdout.contains("completed"));
}

#[test]
fn test_replay_missing_snapshot_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cidx(&config_path, &["replay"]);
    assert!(!success);
    assert!(stderr.contains("sync run failed"), "stderr={}", stderr);
}
