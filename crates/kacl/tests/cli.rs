//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const REPO: &str = "https://github.com/acme/widget";

const CHANGELOG: &str = "\
# Changelog
All notable changes to this project will be documented in this file.

The format is based on [Keep a Changelog](https://keepachangelog.com/en/1.0.0/),
and this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html).

## [Unreleased]
### Fixed
- Crash on empty input

## [1.0.0] - 2024-01-02
### Added
- Widgets

[Unreleased]: https://github.com/acme/widget/compare/v1.0.0...HEAD
[1.0.0]: https://github.com/acme/widget/releases/tag/v1.0.0
";

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

/// A command running in `dir`, logging there and without colors.
fn cmd_in(dir: &Path) -> Command {
    let mut cmd = cmd();
    cmd.env("KACL_LOG_DIR", dir.join(".logs"))
        .args(["--color", "never", "-C"])
        .arg(dir);
    cmd
}

fn with_changelog(content: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("CHANGELOG.md"), content).unwrap();
    tmp
}

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn long_help_lists_environment() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("KACL_LOG_DIR"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn rc_requires_current_version() {
    cmd()
        .args(["validate", "--rc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--current-version"));
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "validate"])
        .assert()
        .failure();
}

// =============================================================================
// Init Command
// =============================================================================

#[test]
fn init_creates_changelog() {
    let tmp = TempDir::new().unwrap();

    cmd_in(tmp.path())
        .args(["init", "--repo", REPO])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let written = fs::read_to_string(tmp.path().join("CHANGELOG.md")).unwrap();
    assert!(written.starts_with("# Changelog\n"));
    assert!(written.contains("## [Unreleased]"));
}

#[test]
fn init_refuses_to_overwrite() {
    let tmp = with_changelog(CHANGELOG);

    cmd_in(tmp.path())
        .args(["init", "--repo", REPO])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let kept = fs::read_to_string(tmp.path().join("CHANGELOG.md")).unwrap();
    assert_eq!(kept, CHANGELOG);
}

#[test]
fn init_without_repo_url_fails() {
    let tmp = TempDir::new().unwrap();

    cmd_in(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no repository URL"));
}

#[test]
fn init_output_validates() {
    let tmp = TempDir::new().unwrap();

    cmd_in(tmp.path()).args(["init", "--repo", REPO]).assert().success();
    cmd_in(tmp.path())
        .args(["validate", "--repo", REPO])
        .assert()
        .success();
}

// =============================================================================
// Validate Command
// =============================================================================

#[test]
fn validate_accepts_canonical_changelog() {
    let tmp = with_changelog(CHANGELOG);

    cmd_in(tmp.path())
        .args(["validate", "--repo", REPO])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn validate_shows_diff_for_unformatted_changelog() {
    let tmp = with_changelog(&CHANGELOG.replace("## [Unreleased]\n", "## [Unreleased]\n\n"));

    cmd_in(tmp.path())
        .args(["validate", "--repo", REPO])
        .assert()
        .failure()
        .stdout(predicate::str::contains("--- CHANGELOG.md"))
        .stdout(predicate::str::contains("@@ -5,7 +5,6 @@"))
        .stderr(predicate::str::contains("not formatted"));
}

#[test]
fn validate_fix_rewrites_file() {
    let tmp = with_changelog(&CHANGELOG.replace("## [Unreleased]\n", "## [Unreleased]\n\n"));

    cmd_in(tmp.path())
        .args(["validate", "--repo", REPO, "--fix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Formatted"));

    let fixed = fs::read_to_string(tmp.path().join("CHANGELOG.md")).unwrap();
    assert_eq!(fixed, CHANGELOG);
}

#[test]
fn validate_reports_parse_errors_with_line() {
    let tmp = with_changelog(&CHANGELOG.replace("### Added", "### Invented"));

    cmd_in(tmp.path())
        .args(["validate", "--repo", REPO])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invented"));
}

#[test]
fn validate_rc_rejects_pending_unreleased_changes() {
    let tmp = with_changelog(CHANGELOG);

    cmd_in(tmp.path())
        .args(["validate", "--repo", REPO, "--rc", "--current-version", "1.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unreleased changes"));
}

#[test]
fn validate_json_reports_status() {
    let tmp = with_changelog(CHANGELOG);

    let output = cmd_in(tmp.path())
        .args(["validate", "--repo", REPO, "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("validate --json should output valid JSON");
    assert_eq!(json["valid"], true);
    assert_eq!(json["path"], "CHANGELOG.md");
}

#[test]
fn validate_missing_file_suggests_init() {
    let tmp = TempDir::new().unwrap();

    cmd_in(tmp.path())
        .args(["validate", "--repo", REPO])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kacl init"));
}

#[test]
fn validate_runs_formatter() {
    let tmp = with_changelog(CHANGELOG);

    cmd_in(tmp.path())
        .args(["validate", "--repo", REPO])
        .assert()
        .success();

    fs::write(
        tmp.path().join(".kacl.toml"),
        "[changelog]\nformatter = \"tr a-z A-Z\"\n",
    )
    .unwrap();
    cmd_in(tmp.path())
        .args(["validate", "--repo", REPO])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not formatted"));
}

// =============================================================================
// Show Command
// =============================================================================

#[test]
fn show_prints_unreleased_by_default() {
    let tmp = with_changelog(CHANGELOG);

    cmd_in(tmp.path())
        .args(["show", "--repo", REPO])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("## [Unreleased]\n### Fixed\n- Crash on empty input"));
}

#[test]
fn show_prints_release() {
    let tmp = with_changelog(CHANGELOG);

    cmd_in(tmp.path())
        .args(["show", "--repo", REPO, "1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("## [1.0.0] - 2024-01-02\n### Added\n- Widgets"));
}

#[test]
fn show_unknown_release_fails() {
    let tmp = with_changelog(CHANGELOG);

    cmd_in(tmp.path())
        .args(["show", "--repo", REPO, "9.9.9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("9.9.9"));
}

#[test]
fn show_json_outputs_changes() {
    let tmp = with_changelog(CHANGELOG);

    let output = cmd_in(tmp.path())
        .args(["show", "--repo", REPO, "--json", "1.0.0"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("show --json should output valid JSON");
    assert_eq!(json["version"], "1.0.0");
    assert_eq!(json["date"], "2024-01-02");
    assert_eq!(json["changes"]["Added"][0]["description"], "Widgets");
}

// =============================================================================
// Update Command
// =============================================================================

#[test]
fn update_adds_commits_since_last_tag() {
    if !git_available() {
        return;
    }
    let tmp = with_changelog(CHANGELOG);
    let dir = tmp.path();
    git(dir, &["init", "--quiet"]);
    git(dir, &["commit", "--quiet", "--allow-empty", "-m", "Initial commit"]);
    git(dir, &["tag", "v1.0.0"]);
    git(dir, &["commit", "--quiet", "--allow-empty", "-m", "Add gadgets (#12)"]);

    cmd_in(dir)
        .args(["update", "--repo", REPO])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated"));

    let updated = fs::read_to_string(dir.join("CHANGELOG.md")).unwrap();
    assert!(updated.contains(
        "### Uncategorized\n- Add gadgets ([#12](https://github.com/acme/widget/pull/12))"
    ));

    cmd_in(dir)
        .args(["update", "--repo", REPO])
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
}

#[test]
fn update_rc_cuts_release() {
    if !git_available() {
        return;
    }
    let tmp = with_changelog(CHANGELOG);
    let dir = tmp.path();
    git(dir, &["init", "--quiet"]);
    git(dir, &["commit", "--quiet", "--allow-empty", "-m", "Initial commit"]);
    git(dir, &["tag", "v1.0.0"]);

    cmd_in(dir)
        .args([
            "update",
            "--repo",
            REPO,
            "--rc",
            "--current-version",
            "1.1.0",
            "--date",
            "2024-03-04",
        ])
        .assert()
        .success();

    let updated = fs::read_to_string(dir.join("CHANGELOG.md")).unwrap();
    assert!(updated.contains("## [Unreleased]\n\n## [1.1.0] - 2024-03-04\n### Fixed\n- Crash on empty input"));
    assert!(updated.contains("[1.1.0]: https://github.com/acme/widget/compare/v1.0.0...v1.1.0"));

    cmd_in(dir)
        .args(["validate", "--repo", REPO, "--rc", "--current-version", "1.1.0"])
        .assert()
        .success();
}

#[test]
fn update_rc_refuses_tagged_version() {
    if !git_available() {
        return;
    }
    let tmp = with_changelog(CHANGELOG);
    let dir = tmp.path();
    git(dir, &["init", "--quiet"]);
    git(dir, &["commit", "--quiet", "--allow-empty", "-m", "Initial commit"]);
    git(dir, &["tag", "v1.0.0"]);

    cmd_in(dir)
        .args(["update", "--repo", REPO, "--rc", "--current-version", "1.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already tagged"));
}
