use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("github-connector").unwrap();
    for key in [
        "GITHUB_TOKEN",
        "GH_TOKEN",
        "ALLOWLIST_REPOS",
        "ALLOWLIST_OWNERS",
        "PORT",
        "GITHUB_AUTH_SCHEME",
    ] {
        cmd.env_remove(key);
    }
    cmd.arg("--log-level").arg("warn");
    cmd
}

#[test]
fn version_flag() {
    bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("github-connector "));
}

#[test]
fn missing_credential_fails_startup() {
    bin()
        .env("ALLOWLIST_REPOS", "octo/widgets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}

#[test]
fn empty_allowlist_fails_startup() {
    bin()
        .env("GITHUB_TOKEN", "t")
        .env("ALLOWLIST_REPOS", " , ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ALLOWLIST_REPOS or ALLOWLIST_OWNERS"));
}

#[test]
fn bad_auth_scheme_fails_startup() {
    bin()
        .env("GITHUB_TOKEN", "t")
        .env("ALLOWLIST_OWNERS", "octo")
        .env("GITHUB_AUTH_SCHEME", "basic")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_AUTH_SCHEME"));
}
