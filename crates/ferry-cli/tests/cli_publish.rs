use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CREDENTIAL_VARS: &[&str] = &[
    "FERRY_SIGNING_KEY",
    "FERRY_SIGNING_KEY_PASSWORD",
    "FERRY_REPOSITORY_USERNAME",
    "FERRY_REPOSITORY_PASSWORD",
    "ORG_GRADLE_PROJECT_signingKey",
    "ORG_GRADLE_PROJECT_signingKeyPassword",
    "ORG_GRADLE_PROJECT_sonatypeUsername",
    "ORG_GRADLE_PROJECT_sonatypePassword",
];

#[allow(deprecated)]
fn ferry_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ferry").unwrap();
    cmd.env("FERRY_HOME", home);
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../ferry-sign/tests/fixtures")
        .join(name)
}

fn project(extra: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("build/libs")).unwrap();
    fs::write(tmp.path().join("build/libs/lib-1.0.0.jar"), b"jar bytes").unwrap();
    fs::write(
        tmp.path().join("Ferry.toml"),
        format!(
            r#"[publication]
group = "io.example"
artifact = "lib"
version = "1.0.0"
license = "Apache-2.0"

[[artifacts]]
path = "build/libs/lib-1.0.0.jar"
{extra}"#
        ),
    )
    .unwrap();
    tmp
}

#[test]
fn test_publish_without_manifest_fails() {
    let tmp = TempDir::new().unwrap();

    ferry_cmd(tmp.path())
        .current_dir(tmp.path())
        .args(["publish", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ferry.toml"));
}

#[test]
fn test_dry_run_installs_into_build_dir() {
    let project = project("");
    let home = TempDir::new().unwrap();

    ferry_cmd(home.path())
        .current_dir(project.path())
        .args(["publish", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Installing"))
        .stderr(predicate::str::contains("Released"))
        .stdout(predicate::str::contains("ferry-dry-run"));

    let version_dir = project.path().join("build/ferry-dry-run/io/example/lib/1.0.0");
    assert!(version_dir.join("lib-1.0.0.jar").is_file());
    assert!(version_dir.join("lib-1.0.0.pom").is_file());
    assert!(version_dir.join("lib-1.0.0.jar.sha1").is_file());
    assert!(!version_dir.join("lib-1.0.0.jar.asc").exists());
}

#[test]
fn test_signed_dry_run_writes_signatures() {
    let project = project("");
    let home = TempDir::new().unwrap();
    let key = fs::read_to_string(fixture("encrypted.pem")).unwrap();

    ferry_cmd(home.path())
        .current_dir(project.path())
        .env("FERRY_SIGNING_KEY", key)
        .env("FERRY_SIGNING_KEY_PASSWORD", "correct-horse")
        .args(["publish", "--dry-run"])
        .assert()
        .success();

    let jar = project
        .path()
        .join("build/ferry-dry-run/io/example/lib/1.0.0/lib-1.0.0.jar");
    let asc = jar.with_file_name("lib-1.0.0.jar.asc");
    assert!(asc.is_file());

    ferry_cmd(home.path())
        .arg("verify")
        .arg(&jar)
        .arg(&asc)
        .arg("--public-key")
        .arg(fixture("public.pem"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Verified"));

    ferry_cmd(home.path())
        .arg("verify")
        .arg(&jar)
        .arg(&asc)
        .arg("--public-key")
        .arg(fixture("other-public.pem"))
        .assert()
        .failure();
}

#[test]
fn test_wrong_passphrase_fails_before_staging() {
    let project = project("");
    let home = TempDir::new().unwrap();
    let key = fs::read_to_string(fixture("encrypted.pem")).unwrap();

    ferry_cmd(home.path())
        .current_dir(project.path())
        .env("FERRY_SIGNING_KEY", key)
        .env("FERRY_SIGNING_KEY_PASSWORD", "wrong")
        .args(["publish", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sign"));

    assert!(!project.path().join("build/ferry-dry-run/io").exists());
}

#[test]
fn test_remote_without_credentials_is_auth_error() {
    let project = project(
        r#"
[repositories.staging]
url = "http://127.0.0.1:9/api"
"#,
    );
    let home = TempDir::new().unwrap();

    ferry_cmd(home.path())
        .current_dir(project.path())
        .args(["publish"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Publishing"))
        .stderr(predicate::str::contains("Authentication"));
}

#[test]
fn test_unknown_repository_is_rejected() {
    let project = project("");
    let home = TempDir::new().unwrap();

    ferry_cmd(home.path())
        .current_dir(project.path())
        .args(["publish", "--repository", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_pubkey_prints_public_key() {
    let home = TempDir::new().unwrap();
    let key = fs::read_to_string(fixture("encrypted.pem")).unwrap();
    let expected = fs::read_to_string(fixture("public.pem")).unwrap();

    ferry_cmd(home.path())
        .env("FERRY_SIGNING_KEY", key)
        .env("FERRY_SIGNING_KEY_PASSWORD", "correct-horse")
        .arg("pubkey")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.trim()));
}
