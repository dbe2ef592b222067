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
        "a11y-inspector-config-test-{}-{seq}",
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

const CONTRAST_PAGE: &[u8] = br#"<html lang="en"><head><title>t</title></head>
<body><h1>Title</h1><p style="color:#777777;background-color:#fefefe">grey on white</p></body></html>"#;

fn contrast_titles(v: &serde_json::Value) -> (Vec<String>, Vec<String>) {
    let titles = |bucket: &str| -> Vec<String> {
        v[bucket]
            .as_array()
            .expect("bucket array")
            .iter()
            .filter_map(|f| f["title"].as_str())
            .filter(|t| t.contains("Color Contrast"))
            .map(str::to_string)
            .collect()
    };
    (titles("warnings"), titles("passed"))
}

#[test]
fn default_threshold_flags_low_contrast() {
    let home = make_temp_home();
    let page = home.join("page.html");
    write_file(&page, CONTRAST_PAGE);

    let out = run(&home, &["scan", page.to_str().expect("utf8 path"), "--json", "--no-save"]);
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let (warnings, passed) = contrast_titles(&v);
    assert_eq!(warnings, vec!["Low Color Contrast"]);
    assert!(passed.is_empty());

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn config_file_threshold_is_applied() {
    let home = make_temp_home();
    let page = home.join("page.html");
    write_file(&page, CONTRAST_PAGE);
    write_file(
        &home.join(".config/a11y-inspector/config.toml"),
        br#"
[contrast]
threshold = 1.5
"#,
    );

    let out = run(&home, &["scan", page.to_str().expect("utf8 path"), "--json", "--no-save"]);
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let (warnings, passed) = contrast_titles(&v);
    assert!(warnings.is_empty());
    assert_eq!(passed, vec!["Good Color Contrast"]);

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn explicit_config_path_must_exist() {
    let home = make_temp_home();
    let missing = home.join("nope.toml");
    let out = run(
        &home,
        &["--config", missing.to_str().expect("utf8 path"), "config", "--show"],
    );
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn out_of_range_threshold_is_rejected() {
    let home = make_temp_home();
    write_file(
        &home.join(".config/a11y-inspector/config.toml"),
        b"[contrast]\nthreshold = 40.0\n",
    );
    let out = run(&home, &["config", "--show"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn config_show_reports_the_effective_store_path() {
    let home = make_temp_home();
    let out = run(&home, &["--json", "config", "--show"]);
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let store = v["storage"]["path"].as_str().expect("storage path");
    assert!(store.ends_with(".config/a11y-inspector/store.json"), "store={store}");
    assert_eq!(v["scan"]["default_mode"], "quick");
    assert_eq!(v["contrast"]["formula"], "perceptual");
    let _ = std::fs::remove_dir_all(&home);
}
