use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use job_atlas::config::load_config;
use job_atlas::db;
use job_atlas::sqlite_store::SqliteStore;
use job_atlas_core::models::Offer;
use job_atlas_core::store::OfferStore;

fn atlas_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("atlas");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/atlas.sqlite"

[source]
listing_url = "https://justjoin.it/"

[llm]
provider = "disabled"

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("atlas.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_atlas(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = atlas_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run atlas binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

async fn seed_offers(config_path: &Path, stacks: &[&str]) {
    let config = load_config(config_path).unwrap();
    let store = SqliteStore::new(db::connect(&config).await.unwrap());
    for (i, stack) in stacks.iter().enumerate() {
        let mut offer = Offer::new(format!("https://justjoin.it/job-offer/seed-{i}"));
        offer.title = Some(format!("Engineer {i}"));
        offer.tech_stack = Some(stack.to_string());
        store.insert_offer(&offer).await.unwrap();
    }
    store.pool().close().await;
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_atlas(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/atlas.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_atlas(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_atlas(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_stats_on_empty_database() {
    let (_tmp, config_path) = setup_test_env();

    run_atlas(&config_path, &["init"]);
    let (stdout, stderr, success) = run_atlas(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Offers:         0"));
    assert!(stdout.contains("Skills:         0"));
}

#[tokio::test]
async fn test_skills_extract_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    run_atlas(&config_path, &["init"]);
    seed_offers(
        &config_path,
        &["Python: Advanced; Go\nRust: Intermediate", "Go: Junior; Docker: Regular"],
    )
    .await;

    let (stdout, stderr, success) = run_atlas(&config_path, &["skills", "extract"]);
    assert!(success, "extract failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("offers scanned: 2"));
    assert!(stdout.contains("inserted: 4"));
    assert!(stdout.contains("ok"));

    let (stdout, _, success) = run_atlas(&config_path, &["skills", "extract"]);
    assert!(success);
    assert!(stdout.contains("inserted: 0"));
    assert!(stdout.contains("already present: 4"));

    let (stdout, _, success) = run_atlas(&config_path, &["skills", "sample", "--limit", "2"]);
    assert!(success);
    assert!(stdout.contains("(2 shown)"));
    assert!(stdout.contains("Python"));

    let (stdout, _, _) = run_atlas(&config_path, &["stats"]);
    assert!(stdout.contains("Offers:         2"));
    assert!(stdout.contains("Uncategorized:  4"));
}

#[test]
fn test_normalize_extract_stage() {
    let (_tmp, config_path) = setup_test_env();

    run_atlas(&config_path, &["init"]);
    let (stdout, stderr, success) =
        run_atlas(&config_path, &["normalize", "--stage", "extract"]);
    assert!(success, "normalize failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("status: 200"));
    assert!(stdout.contains("Normalization completed"));
}

#[test]
fn test_normalize_unknown_stage_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_atlas(&config_path, &["init"]);
    let (stdout, _, success) = run_atlas(&config_path, &["normalize", "--stage", "bogus"]);
    assert!(!success);
    assert!(stdout.contains("status: 400"));
}

#[test]
fn test_categorize_requires_provider() {
    let (_tmp, config_path) = setup_test_env();

    run_atlas(&config_path, &["init"]);
    let (_, stderr, success) = run_atlas(&config_path, &["skills", "categorize"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let content = fs::read_to_string(&config_path).unwrap();
    fs::write(
        &config_path,
        content.replace("provider = \"disabled\"", "provider = \"openai\""),
    )
    .unwrap();

    let (_, stderr, success) = run_atlas(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Unknown llm provider"));
}
