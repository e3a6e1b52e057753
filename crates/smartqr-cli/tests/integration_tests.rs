//! Integration tests for smartqr-cli.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_flag() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("templates"))
        .stdout(predicate::str::contains("stats"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_args_shows_help_and_exits_2() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.assert().failure().code(2);
}

#[test]
fn test_generate_known_domain_json() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.args([
        "generate",
        "https://instagram.com/nasa",
        "--user",
        "alice",
        "--json",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("instagram-v1"))
    .stdout(predicate::str::contains("\"remaining\": 2"))
    .stdout(predicate::str::contains("\"templateApplied\": true"));
}

#[test]
fn test_generate_unknown_domain_succeeds_without_template() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.args([
        "generate",
        "https://example-unknown-site.dev/page",
        "--user",
        "bob",
        "--json",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"templateApplied\": false"))
    // Unknown domains are never billed.
    .stdout(predicate::str::contains("\"remaining\": 3"));
}

#[test]
fn test_generate_bare_domain_gets_https_scheme() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.args(["generate", "youtu.be/dQw4w9WgXcQ", "--user", "carol", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("youtube-v1"));
}

#[test]
fn test_generate_full_template_embeds_template() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.args([
        "generate",
        "https://instagram.com/nasa",
        "--user",
        "alice",
        "--full-template",
        "--json",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("_fullTemplate"));
}

#[test]
fn test_templates_lists_builtin_catalogue() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    let mut assert = cmd.arg("templates").assert().success();
    for id in [
        "instagram-v1",
        "youtube-v1",
        "facebook-v1",
        "linkedin-v1",
        "twitter-v1",
        "whatsapp-v1",
        "tiktok-v1",
        "spotify-v1",
    ] {
        assert = assert.stdout(predicate::str::contains(id));
    }
}

#[test]
fn test_templates_ranked_against_url() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.args(["templates", "https://www.youtube.com/watch?v=x", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"recommendedId\": \"youtube-v1\""));
}

#[test]
fn test_templates_tag_filter() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.args(["templates", "--tag", "music", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spotify-v1"))
        .stdout(predicate::str::contains("\"total\": 1"));
}

#[test]
fn test_config_file_overrides_daily_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smartqr.toml");
    std::fs::write(&path, "[limits]\ndaily = 1\n").unwrap();

    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.args([
        "--config",
        path.to_str().unwrap(),
        "generate",
        "https://instagram.com/nasa",
        "--user",
        "alice",
        "--json",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"remaining\": 0"));
}

#[test]
fn test_env_overrides_daily_limit() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.env("SMARTQR_LIMITS__DAILY", "2")
        .args([
            "generate",
            "https://instagram.com/nasa",
            "--user",
            "alice",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"remaining\": 1"));
}

#[test]
fn test_stats_catalogue_wide() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 8"))
        .stdout(predicate::str::contains("\"active\": 8"));
}

#[test]
fn test_stats_for_fresh_user() {
    let mut cmd = Command::cargo_bin("smartqr").unwrap();
    cmd.args(["stats", "--user", "nobody", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"remainingToday\": 3"))
        .stdout(predicate::str::contains("\"total\": 0"));
}
