use std::path::Path;
use std::process::Command;

fn sitemigrate_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sitemigrate"));
    cmd.current_dir(dir);
    cmd
}

fn fixture_site() -> &'static Path {
    Path::new("tests/fixtures/site")
}

/// Copy a directory tree into a fresh temp dir so mutating commands can run.
fn copy_tree(from: &Path, to: &Path) {
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let dest = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            std::fs::create_dir_all(&dest).unwrap();
            copy_tree(&entry.path(), &dest);
        } else {
            std::fs::copy(entry.path(), dest).unwrap();
        }
    }
}

#[test]
fn audit_reports_broken_links_by_category() {
    let out = sitemigrate_cmd(fixture_site()).arg("audit").output().unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert_eq!(out.status.code(), Some(1), "stdout: {stdout}\nstderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("## index.html"));
    assert!(stdout.contains("### Case mismatches (1)"));
    assert!(stdout.contains("fix: About/Index.html"));
    assert!(stdout.contains("### Unprocessed template variables (1)"));
    assert!(stdout.contains("### Absolute paths (should be relative) (1)"));
    assert!(stdout.contains("### Legacy path references (1)"));
    assert!(stdout.contains("### Missing assets (1)"));
    assert!(stdout.contains("expected 2 `../` segments"));
    assert!(!stdout.contains("does-not-exist.html"), "excluded directory was audited");
    assert!(stdout.contains("6 broken links in 2 documents (4 documents scanned"));
}

#[test]
fn audit_json_lists_each_link_once() {
    let root = std::fs::canonicalize(fixture_site()).unwrap();
    let out = sitemigrate_cmd(Path::new("."))
        .args(["audit", "--json", "--root"])
        .arg(&root)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["documents_scanned"], 4);
    let index = &json["failures"]["index.html"];
    let missing = index["missing_asset"].as_array().unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0]["link"]["raw"], "assets/css/missing.css");
    assert_eq!(missing[0]["kind"], "css");
    let case = index["case_mismatch"].as_array().unwrap();
    assert_eq!(case[0]["failure"]["suggestion"], "About/Index.html");
}

#[test]
fn rewrite_applies_table_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    std::fs::create_dir_all(site.join("tools")).unwrap();
    std::fs::write(
        site.join("tools/risk.html"),
        "<a href=\"../about/About.en-US.webpage.copy.html\">About</a>\n\
         <a href=\"../Home/Home.en-US.webpage.copy.html\">Home</a>\n\
         <img src=\"../../web-files/logo.png\">\n",
    )
    .unwrap();
    std::fs::write(site.join("tools/app.js"), "location.href = '../Home/Home.en-US.webpage.copy.html';\n").unwrap();
    std::fs::write(
        dir.path().join(".sitemigrate.toml"),
        r#"
root = "site"

[[relocate]]
from = "../about/About.en-US.webpage.copy.html"
to = "about/index.html"

[[replace]]
from = "../Home/Home.html"
to = "../index.html"

[[replace]]
from = "../../web-files/"
to = "../assets/"
"#,
    )
    .unwrap();

    let out = sitemigrate_cmd(dir.path()).arg("rewrite").output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Scanned 2 files, 2 modified, 0 failed"));

    let page = std::fs::read_to_string(site.join("tools/risk.html")).unwrap();
    assert_eq!(
        page,
        "<a href=\"../about/index.html\">About</a>\n\
         <a href=\"../index.html\">Home</a>\n\
         <img src=\"../assets/logo.png\">\n"
    );
    let script = std::fs::read_to_string(site.join("tools/app.js")).unwrap();
    assert_eq!(script, "location.href = '../index.html';\n");

    let again = sitemigrate_cmd(dir.path()).arg("rewrite").output().unwrap();
    assert!(again.status.success());
    assert!(String::from_utf8_lossy(&again.stdout).contains("Scanned 2 files, 0 modified, 0 failed"));
}

#[test]
fn dry_run_leaves_files_alone() {
    let dir = tempfile::tempdir().unwrap();
    copy_tree(fixture_site(), dir.path());
    let before = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
    std::fs::write(dir.path().join("index.html"), format!("{before}<p>\u{1F680}</p>")).unwrap();

    let out = sitemigrate_cmd(dir.path()).args(["strip-emoji", "--dry-run"]).output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("- emoji removed: 1"));
    let after = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert!(after.contains('\u{1F680}'));
}

#[test]
fn strip_then_verify_emoji() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        "<h1>\u{1F4CA} Metrics</h1><p>\u{26A0}\u{FE0F} Check inputs \u{2713}</p><p>\u{2728}</p>",
    )
    .unwrap();

    let verify = sitemigrate_cmd(dir.path()).arg("verify-emoji").output().unwrap();
    assert_eq!(verify.status.code(), Some(1));

    let strip = sitemigrate_cmd(dir.path()).arg("strip-emoji").output().unwrap();
    assert!(strip.status.success());
    let stdout = String::from_utf8_lossy(&strip.stdout);
    assert!(stdout.contains("- files modified: 1"));
    assert!(stdout.contains("- emoji removed: 2"));

    let page = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert_eq!(page, "<h1> Metrics</h1><p>\u{26A0}\u{FE0F} Check inputs \u{2713}</p><p></p>");

    let verify = sitemigrate_cmd(dir.path()).args(["verify-emoji", "--report", "emoji-report.md"]).output().unwrap();
    assert!(verify.status.success());
    let report = std::fs::read_to_string(dir.path().join("emoji-report.md")).unwrap();
    assert!(report.contains("WARNING: 1 (allowed)"));
    assert!(report.contains("CHECK: 1 (allowed)"));
}

#[test]
fn verify_emoji_lists_undecodable_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.html"), [0xff, 0xfe, 0xfd]).unwrap();
    std::fs::write(dir.path().join("good.html"), "<p>\u{2713} done</p>").unwrap();

    let out = sitemigrate_cmd(dir.path()).arg("verify-emoji").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("- files scanned: 2"));
    assert!(stdout.contains("## Skipped"));
    assert!(stdout.contains("- bad.html: not valid UTF-8 text"));
}

#[test]
fn missing_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = sitemigrate_cmd(dir.path())
        .args(["audit", "--root", "no-such-site"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Site Root Not Found"));
}
