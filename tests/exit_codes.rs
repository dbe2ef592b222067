use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

fn inspector_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_a11y-inspector"));
    cmd.env("HOME", home);
    for key in [
        "A11Y_INSPECTOR_CONFIG",
        "A11Y_INSPECTOR_UI_COLOR",
        "A11Y_INSPECTOR_UI_MAX_TABLE_ROWS",
        "A11Y_INSPECTOR_SCAN_DEFAULT_MODE",
        "A11Y_INSPECTOR_SCAN_INCLUDE",
        "A11Y_INSPECTOR_SCAN_EXCLUDE",
        "A11Y_INSPECTOR_CONTRAST_FORMULA",
        "A11Y_INSPECTOR_CONTRAST_THRESHOLD",
        "A11Y_INSPECTOR_STORAGE_PATH",
        "A11Y_INSPECTOR_REPORT_PASSED_LIMIT",
        "A11Y_INSPECTOR_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    inspector_cmd(home)
        .args(args)
        .output()
        .expect("run a11y-inspector")
}

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let home = std::env::temp_dir().join(format!(
        "a11y-inspector-exit-test-{}-{seq}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdirs");
    }
    std::fs::write(path, bytes).expect("write");
}

const BROKEN_PAGE: &[u8] = br#"<html lang="en"><head><title>t</title></head>
<body><h1>Title</h1><img src="logo.png"></body></html>"#;

#[test]
fn completion_unknown_shell_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "nope"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn ui_requires_tty_exits_2() {
    let home = make_temp_home();
    let page = home.join("page.html");
    write_file(&page, BROKEN_PAGE);
    let out = run(&home, &["ui", page.to_str().expect("utf8 path")]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn missing_page_exits_10() {
    let home = make_temp_home();
    let missing = home.join("missing.html");
    let out = run(&home, &["scan", missing.to_str().expect("utf8 path")]);
    assert_eq!(out.status.code(), Some(10));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error:"), "stderr={stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn fail_on_issues_exits_1_after_printing_results() {
    let home = make_temp_home();
    let page = home.join("page.html");
    write_file(&page, BROKEN_PAGE);
    let out = run(
        &home,
        &[
            "scan",
            page.to_str().expect("utf8 path"),
            "--json",
            "--no-save",
            "--fail-on-issues",
        ],
    );
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert!(v["issues"].as_array().is_some_and(|a| !a.is_empty()));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn invalid_element_selector_exits_2() {
    let home = make_temp_home();
    let page = home.join("page.html");
    write_file(&page, BROKEN_PAGE);
    let out = run(
        &home,
        &["scan", page.to_str().expect("utf8 path"), "--element", "[[", "--no-save"],
    );
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn invalid_exclude_glob_exits_2() {
    let home = make_temp_home();
    write_file(&home.join("site/index.html"), BROKEN_PAGE);
    let site = home.join("site");
    let out = run(
        &home,
        &["scan", site.to_str().expect("utf8 path"), "--exclude", "[", "--no-save"],
    );
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn malformed_store_exits_20() {
    let home = make_temp_home();
    write_file(
        &home.join(".config/a11y-inspector/store.json"),
        b"{ not json",
    );
    let out = run(&home, &["history"]);
    assert_eq!(out.status.code(), Some(20));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn invalid_settings_value_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["settings", "set", "complianceLevel", "Z"]);
    assert_eq!(out.status.code(), Some(2));
    let out = run(&home, &["settings", "set", "noSuchKey", "1"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}
