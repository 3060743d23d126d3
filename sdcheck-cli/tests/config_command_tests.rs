//! Integration tests for the `sdcheck` binary: config commands and exit codes.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const RUNNABLE_CONFIG: &str = r#"
[general]
log_level = "warn"
log_format = "json"

[platform]
api = "https://api.sys.example.com"
apps_domain = "apps.example.com"
admin_user = "admin"
admin_password = "admin-secret"

[user]
username = "cats-user"
password = "user-secret"
org = "cats-org"
space = "cats-space"
"#;

fn sdcheck(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sdcheck"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("should spawn sdcheck")
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("sdcheck.toml");
    fs::write(&path, content).expect("should write config");
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_config_validate_valid_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, RUNNABLE_CONFIG);

    let output = sdcheck(&path, &["config", "validate", "--for-run"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("VALID"));
}

#[test]
fn test_config_validate_empty_file_uses_defaults() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "");

    let output = sdcheck(&path, &["config", "validate"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_config_validate_for_run_requires_credentials() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "");

    let output = sdcheck(&path, &["--output", "json", "config", "validate", "--for-run"]);

    assert_eq!(output.status.code(), Some(2));
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be JSON");
    assert_eq!(parsed["valid"].as_bool(), Some(false));
    assert!(parsed["errors"][0].as_str().unwrap().contains("platform.api"));
}

#[test]
fn test_config_validate_malformed_toml() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "[general\nlog_level = \"info\"\n");

    let output = sdcheck(&path, &["config", "validate"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("INVALID"));
}

#[test]
fn test_config_validate_out_of_range_value() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "[apps]\nbackend_port = 0\n");

    let output = sdcheck(&path, &["config", "validate"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("apps.backend_port"));
}

#[test]
fn test_config_show_redacts_passwords() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, RUNNABLE_CONFIG);

    let output = sdcheck(&path, &["config", "show"]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("***REDACTED***"));
    assert!(!text.contains("admin-secret"));
    assert!(!text.contains("user-secret"));
    assert!(text.contains("cats-org"));
}

#[test]
fn test_config_show_section() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, RUNNABLE_CONFIG);

    let output = sdcheck(&path, &["config", "show", "--section", "apps"]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("[apps]"));
    assert!(text.contains("internal_domain = \"apps.internal\""));
    assert!(!text.contains("cats-org"));
}

#[test]
fn test_config_show_unknown_section() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, RUNNABLE_CONFIG);

    let output = sdcheck(&path, &["config", "show", "--section", "ebpf"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown section"));
}

#[test]
fn test_config_show_missing_file() {
    let output = sdcheck(Path::new("/nonexistent/sdcheck.toml"), &["config", "show"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_run_with_incomplete_config_is_config_error() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "[platform]\napi = \"https://api.sys.example.com\"\n");

    let output = sdcheck(&path, &["run"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("platform.apps_domain"));
}

#[test]
fn test_run_rejects_out_of_range_value() {
    let dir = TempDir::new().expect("should create temp dir");
    let config = format!("{RUNNABLE_CONFIG}\n[apps]\nbackend_port = 0\n");
    let path = write_config(&dir, &config);

    let output = sdcheck(&path, &["run", "--cf-binary", "/nonexistent/cf"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("apps.backend_port"));
}

#[test]
fn test_run_without_cf_binary_is_unavailable() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, RUNNABLE_CONFIG);

    let output = sdcheck(&path, &["run", "--cf-binary", "/nonexistent/cf"]);

    assert_eq!(output.status.code(), Some(3));
}

#[cfg(unix)]
#[test]
fn test_run_with_rejected_login_is_command_error() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, RUNNABLE_CONFIG);
    let cf = dir.path().join("cf");
    fs::write(
        &cf,
        "#!/bin/sh\nif [ \"$1\" = auth ]; then echo 'Credentials were rejected, please try again.'; exit 1; fi\necho OK\n",
    )
    .expect("should write fake cf");
    fs::set_permissions(&cf, fs::Permissions::from_mode(0o755)).expect("should chmod");

    let output = sdcheck(&path, &["run", "--cf-binary", cf.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Credentials were rejected"));
    assert!(!stderr.contains("user-secret"), "password must be redacted");
}
