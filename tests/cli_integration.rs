//! CLI integration tests for pagesync
//!
//! These tests verify the complete workflow from initialization through
//! page publishing, regional sync and the recycle bin, ensuring commands
//! work together correctly.

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command instance for the pagesync binary
fn pagesync_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("pagesync"));
    cmd.env("PAGESYNC_AUTHOR", "Alex M.").env_remove("PAGESYNC_LOG");
    cmd
}

/// Create a temporary directory and initialize a workspace
fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    pagesync_cmd().arg("init").arg(dir.path()).assert().success();
    dir
}

/// Run a command with `--format json` and parse its stdout
fn json(dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = pagesync_cmd()
        .current_dir(dir.path())
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Create a page and return its ID
fn create_page(dir: &TempDir, title: &str, slug: &str, content: &str) -> String {
    let page = json(dir, &["page", "new", title, "--slug", slug, "--content", content]);
    page["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    pagesync_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized pagesync workspace"));

    assert!(dir.path().join(".pagesync").is_dir());
    assert!(dir.path().join(".pagesync/config.toml").is_file());
    assert!(dir.path().join(".pagesync/.gitignore").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    pagesync_cmd().arg("init").arg(dir.path()).assert().success();
    pagesync_cmd().arg("init").arg(dir.path()).assert().success();
}

#[test]
fn test_commands_outside_workspace_fail() {
    let dir = TempDir::new().unwrap();

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pagesync init"));
}

// =============================================================================
// Page Tests
// =============================================================================

#[test]
fn test_page_new_and_list() {
    let dir = setup_workspace();

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "new", "Company History", "--slug", "/about/history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created page"));

    assert!(dir.path().join(".pagesync/content.jsonl").is_file());

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Company History"))
        .stdout(predicate::str::contains("/about/history"));
}

#[test]
fn test_page_new_reads_content_file() {
    let dir = setup_workspace();
    let file = dir.path().join("careers.html");
    fs::write(&file, "<h1>Careers</h1>\n<p>Join us</p>").unwrap();

    let page = json(
        &dir,
        &["page", "new", "Careers", "--slug", "/careers", "--content-file", file.to_str().unwrap()],
    );

    assert_eq!(page["content"], "<h1>Careers</h1>\n<p>Join us</p>");
    assert_eq!(page["status"], "draft");
    assert_eq!(page["version"], "v1");
}

#[test]
fn test_duplicate_slug_rejected() {
    let dir = setup_workspace();
    create_page(&dir, "Careers", "/careers", "<p>Join us</p>");

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "new", "Jobs", "--slug", "/careers/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already used"));
}

#[test]
fn test_publish_then_edit_creates_new_version() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Company History", "/about/history", "<p>Founded in 1990.</p>");

    let report = json(&dir, &["page", "publish", &id]);
    assert_eq!(report["published"], true);
    assert_eq!(report["version"], "v1");

    let page = json(&dir, &["page", "edit", &id, "--title", "Our History"]);
    assert_eq!(page["version"], "v2");
    assert_eq!(page["status"], "draft");

    let history = json(&dir, &["page", "history", &id]);
    let revisions = history.as_array().unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[0]["status"], "published");
    assert_eq!(revisions[0]["title"], "Company History");
}

#[test]
fn test_stale_edit_is_conflict() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Contact Us", "/contact", "<p>Call us</p>");
    json(&dir, &["page", "publish", &id]);
    json(&dir, &["page", "edit", &id, "--title", "Contact"]);

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "edit", &id, "--expect", "v1", "--title", "Reach Us", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"code\":\"conflict\""));
}

#[test]
fn test_forbidden_content_keeps_draft() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Contact Us", "/contact", "<p>Call us</p>");

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "edit", &id, "--content", "<style>p{}</style><p>Call us</p>"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("forbidden markup"));

    let shown = json(&dir, &["page", "show", &id]);
    assert_eq!(shown["page"]["content"], "<p>Call us</p>");
}

#[test]
fn test_edit_attaches_resources_and_seo() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Contact Us", "/contact", "<p>Call us</p>");

    let page = json(
        &dir,
        &[
            "page",
            "edit",
            &id,
            "--head",
            "main-theme.css",
            "--body",
            "analytics.js",
            "--meta-title",
            "Contact | Acme",
            "--keywords",
            "support,phone",
        ],
    );

    assert_eq!(page["resources"]["head"][0]["href"], "main-theme.css");
    assert_eq!(page["resources"]["body"][0]["kind"], "script");
    assert_eq!(page["seo"]["meta_title"], "Contact | Acme");
    assert_eq!(page["seo"]["keywords"][1], "phone");
}

#[test]
fn test_edit_without_changes_fails() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Contact Us", "/contact", "<p>Call us</p>");

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "edit", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to change"));
}

#[test]
fn test_page_revert_restores_earlier_revision() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Company History", "/about/history", "<p>Founded in 1990.</p>");
    json(&dir, &["page", "publish", &id]);
    json(&dir, &["page", "edit", &id, "--title", "Our History", "--content", "<p>Rewritten</p>"]);

    let reverted = json(&dir, &["page", "revert", &id, "v1"]);
    assert_eq!(reverted["restored"], "v1");
    assert_eq!(reverted["version"], "v2");

    let shown = json(&dir, &["page", "show", &id]);
    assert_eq!(shown["page"]["title"], "Company History");
    assert_eq!(shown["page"]["content"], "<p>Founded in 1990.</p>");
    assert_eq!(shown["page"]["status"], "draft");

    let history = json(&dir, &["page", "history", &id]);
    assert_eq!(history.as_array().unwrap().len(), 2);

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "revert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VERSION"));
}

#[test]
fn test_page_revert_unknown_revision() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Careers", "/careers", "<p>Join us</p>");

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "revert", &id, "v7", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"code\":\"unknown_revision\""));
}

// =============================================================================
// Region Tests
// =============================================================================

#[test]
fn test_region_sync_lifecycle() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Company History", "/about/history", "<p>Founded in 1990.</p>");
    json(&dir, &["page", "publish", &id]);

    let translation = json(&dir, &["region", "add", &id, "tw", "--method", "copy"]);
    assert_eq!(translation["locale"], "TW");
    assert_eq!(translation["slug"], "/tw/about/history");
    let key = format!("{}@TW", id);

    let status = json(&dir, &["region", "status", &key]);
    assert_eq!(status["sync_status"], "synced");

    // Unedited translations follow the new source version
    json(&dir, &["page", "edit", &id, "--content", "<p>Founded in 1990 in Taipei.</p>"]);
    let report = json(&dir, &["page", "publish", &id]);
    assert_eq!(report["propagation"]["outcomes"][0]["outcome"], "regenerated");

    let shown = json(&dir, &["region", "show", &key]);
    assert_eq!(shown["content"], "<p>Founded in 1990 in Taipei.</p>");
    assert_eq!(shown["sync_status"], "synced");

    // Local edits override and are flagged on the next publish
    json(&dir, &["region", "edit", &key, "--content", "<p>公司沿革</p>"]);
    let status = json(&dir, &["region", "status", &key]);
    assert_eq!(status["sync_status"], "overridden");

    json(&dir, &["page", "edit", &id, "--content", "<p>Third edition.</p>"]);
    let report = json(&dir, &["page", "publish", &id]);
    assert_eq!(report["propagation"]["outcomes"][0]["outcome"], "marked_pending");

    let status = json(&dir, &["region", "status", &key]);
    assert_eq!(status["pending_source"], "v3");

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["region", "compare", &key])
        .assert()
        .success()
        .stdout(predicate::str::contains("-<p>Third edition.</p>"))
        .stdout(predicate::str::contains("+<p>公司沿革</p>"));

    let accepted = json(&dir, &["region", "accept", &key]);
    assert_eq!(accepted["content"], "<p>Third edition.</p>");
    let status = json(&dir, &["region", "status", &key]);
    assert_eq!(status["sync_status"], "synced");
}

#[test]
fn test_region_keep_local() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Contact Us", "/contact", "<p>Call us</p>");
    json(&dir, &["page", "publish", &id]);
    json(&dir, &["region", "add", &id, "JP", "--method", "copy"]);
    let key = format!("{}@JP", id);

    json(&dir, &["region", "edit", &key, "--content", "<p>お問い合わせ</p>"]);
    json(&dir, &["page", "edit", &id, "--content", "<p>Call or write</p>"]);
    json(&dir, &["page", "publish", &id]);

    let kept = json(&dir, &["region", "keep", &key]);
    assert_eq!(kept["dismissed_source"], "v2");
    assert!(kept.get("pending_source").is_none());
    assert_eq!(kept["content"], "<p>お問い合わせ</p>");
}

#[test]
fn test_region_add_twice_fails() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Careers", "/careers", "<p>Join us</p>");

    json(&dir, &["region", "add", &id, "TW", "--method", "copy"]);

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["region", "add", &id, "TW", "--method", "copy", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"code\":\"duplicate_region\""));
}

#[test]
fn test_region_add_ai_without_translator_fails() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Careers", "/careers", "<p>Join us</p>");

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["region", "add", &id, "TW"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No translator configured"));
}

#[test]
fn test_region_add_forbidden_by_page() {
    let dir = setup_workspace();
    let page = json(
        &dir,
        &["page", "new", "Legal", "--slug", "/legal", "--no-local-translation"],
    );
    let id = page["id"].as_str().unwrap();

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["region", "add", id, "TW", "--method", "copy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not allow local translations"));
}

#[test]
fn test_region_new_and_list_filters() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Careers", "/careers", "<p>Join us</p>");
    json(&dir, &["region", "add", &id, "TW", "--method", "copy"]);
    json(&dir, &["region", "new", "TW", "門市資訊", "--slug", "/tw/stores"]);

    let local = json(&dir, &["region", "list", "--sync", "local"]);
    let local = local.as_array().unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0]["title"], "門市資訊");

    let all = json(&dir, &["region", "list", "--locale", "tw"]);
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[test]
fn test_region_revert_restores_earlier_revision() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Contact Us", "/contact", "<p>Call us</p>");
    json(&dir, &["region", "add", &id, "DE", "--method", "copy"]);
    let key = format!("{}@DE", id);

    json(&dir, &["region", "publish", &key]);
    json(&dir, &["region", "edit", &key, "--content", "<p>Rufen Sie uns an</p>"]);

    let reverted = json(&dir, &["region", "revert", &key, "v1"]);
    assert_eq!(reverted["restored"], "v1");
    assert_eq!(reverted["version"], "v2");

    let shown = json(&dir, &["region", "show", &key]);
    assert_eq!(shown["content"], "<p>Call us</p>");

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["region", "revert", "--help"])
        .assert()
        .success();
}

// =============================================================================
// Recycle Bin Tests
// =============================================================================

#[test]
fn test_delete_restore_round_trip() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Careers", "/careers", "<p>Join us</p>");
    let before = json(&dir, &["page", "show", &id]);

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("recycle bin"));

    let bin = json(&dir, &["bin", "list", "--origin", "global"]);
    assert_eq!(bin.as_array().unwrap().len(), 1);

    // The slug is free while the page is deleted
    pagesync_cmd()
        .current_dir(dir.path())
        .args(["page", "show", &id])
        .assert()
        .failure();

    json(&dir, &["bin", "restore", &id]);
    let after = json(&dir, &["page", "show", &id]);
    assert_eq!(before, after);

    let bin = json(&dir, &["bin", "list"]);
    assert!(bin.as_array().unwrap().is_empty());
}

#[test]
fn test_restore_blocked_by_reused_slug() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Careers", "/careers", "<p>Join us</p>");
    json(&dir, &["page", "delete", &id]);
    create_page(&dir, "Jobs", "/careers", "<p>We are hiring</p>");

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["bin", "restore", &id, "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"code\":\"duplicate_slug\""));

    let bin = json(&dir, &["bin", "list"]);
    assert_eq!(bin.as_array().unwrap().len(), 1);
}

#[test]
fn test_bin_purge_and_empty() {
    let dir = setup_workspace();
    let careers = create_page(&dir, "Careers", "/careers", "");
    let contact = create_page(&dir, "Contact Us", "/contact", "");
    json(&dir, &["page", "delete", &careers]);
    json(&dir, &["page", "delete", &contact]);

    json(&dir, &["bin", "purge", &careers]);
    pagesync_cmd()
        .current_dir(dir.path())
        .args(["bin", "restore", &careers])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));

    let purged = json(&dir, &["bin", "purge", "--older-than", "0"]);
    assert_eq!(purged["purged"].as_array().unwrap().len(), 1);

    let emptied = json(&dir, &["bin", "empty"]);
    assert_eq!(emptied["purged"], 0);
}

#[test]
fn test_bin_purge_expired_needs_retention() {
    let dir = setup_workspace();

    pagesync_cmd()
        .current_dir(dir.path())
        .args(["bin", "purge", "--expired"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retention_days"));
}

#[test]
fn test_repeated_region_deletes_keep_every_entry() {
    let dir = setup_workspace();
    let id = create_page(&dir, "Store Locator", "/stores", "<p>Find us</p>");
    let key = format!("{}@TW", id);

    json(&dir, &["region", "add", &id, "TW", "--method", "copy"]);
    json(&dir, &["region", "edit", &key, "--content", "<p>first</p>"]);
    let first = json(&dir, &["region", "delete", &key]);
    json(&dir, &["region", "add", &id, "TW", "--method", "copy"]);
    let second = json(&dir, &["region", "delete", &key]);

    let first_id = first["bin_id"].as_str().unwrap().to_string();
    assert_ne!(first["bin_id"], second["bin_id"]);

    let bin = json(&dir, &["bin", "list", "--origin", "TW"]);
    assert_eq!(bin.as_array().unwrap().len(), 2);

    json(&dir, &["bin", "restore", &first_id]);
    let shown = json(&dir, &["region", "show", &key]);
    assert_eq!(shown["content"], "<p>first</p>");

    let bin = json(&dir, &["bin", "list"]);
    let remaining = bin.as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["id"], second["bin_id"]);
}
