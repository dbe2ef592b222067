use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::contrast::ContrastFormula;
use crate::engine::ScanMode;

pub const CONFIG_ENV: &str = "A11Y_INSPECTOR_CONFIG";

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub scan: ScanConfig,
    pub contrast: ContrastConfig,
    pub storage: StorageConfig,
    pub report: ReportConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanConfig {
    pub default_mode: ScanMode,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContrastConfig {
    pub formula: ContrastFormula,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    pub passed_limit: usize,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                max_table_rows: 20,
            },
            scan: ScanConfig {
                default_mode: ScanMode::Quick,
                include: vec!["**/*.html".to_string(), "**/*.htm".to_string()],
                exclude: vec!["**/node_modules/**".to_string()],
            },
            contrast: ContrastConfig {
                formula: ContrastFormula::Perceptual,
                threshold: 4.5,
            },
            storage: StorageConfig {
                path: String::new(),
            },
            report: ReportConfig { passed_limit: 10 },
            config_path: None,
        }
    }
}

impl EffectiveConfig {
    /// Store location with a leading `~/` expanded against `home_dir`.
    pub fn store_path(&self, home_dir: &Path) -> PathBuf {
        let raw = self.storage.path.trim();
        if raw.is_empty() {
            return default_store_path(home_dir);
        }
        match raw.strip_prefix("~/") {
            Some(rest) => home_dir.join(rest),
            None => PathBuf::from(raw),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    scan: Option<RawScanConfig>,
    contrast: Option<RawContrastConfig>,
    storage: Option<RawStorageConfig>,
    report: Option<RawReportConfig>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawScanConfig {
    default_mode: Option<ScanMode>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawContrastConfig {
    formula: Option<ContrastFormula>,
    threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawStorageConfig {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReportConfig {
    passed_limit: Option<usize>,
}

pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME is not set"))
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/a11y-inspector/config.toml")
}

pub fn default_store_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/a11y-inspector/store.json")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let explicit = config_path.map(ToOwned::to_owned).or_else(|| {
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    });
    let required = explicit.is_some();
    let path = explicit.unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s).context("failed to parse config file (TOML)")?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    } else if required {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    apply_env_overrides(&mut cfg)?;
    validate(&cfg)?;

    if cfg.storage.path.trim().is_empty() {
        cfg.storage.path = default_store_path(home_dir).display().to_string();
    }

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(scan) = raw.scan {
        if let Some(default_mode) = scan.default_mode {
            cfg.scan.default_mode = default_mode;
        }
        if let Some(include) = scan.include {
            cfg.scan.include = include;
        }
        if let Some(exclude) = scan.exclude {
            cfg.scan.exclude = exclude;
        }
    }

    if let Some(contrast) = raw.contrast {
        if let Some(formula) = contrast.formula {
            cfg.contrast.formula = formula;
        }
        if let Some(threshold) = contrast.threshold {
            cfg.contrast.threshold = threshold;
        }
    }

    if let Some(storage) = raw.storage {
        if let Some(path) = storage.path {
            cfg.storage.path = path;
        }
    }

    if let Some(report) = raw.report {
        if let Some(passed_limit) = report.passed_limit {
            cfg.report.passed_limit = passed_limit;
        }
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("A11Y_INSPECTOR_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "A11Y_INSPECTOR_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("A11Y_INSPECTOR_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .trim()
            .parse::<usize>()
            .with_context(|| "A11Y_INSPECTOR_UI_MAX_TABLE_ROWS")?;
    }
    if let Ok(v) = std::env::var("A11Y_INSPECTOR_SCAN_DEFAULT_MODE") {
        cfg.scan.default_mode = v
            .parse::<ScanMode>()
            .map_err(anyhow::Error::msg)
            .with_context(|| "A11Y_INSPECTOR_SCAN_DEFAULT_MODE")?;
    }
    if let Ok(v) = std::env::var("A11Y_INSPECTOR_SCAN_INCLUDE") {
        let parts = split_list(&v);
        if !parts.is_empty() {
            cfg.scan.include = parts;
        }
    }
    if let Ok(v) = std::env::var("A11Y_INSPECTOR_SCAN_EXCLUDE") {
        let parts = split_list(&v);
        if !parts.is_empty() {
            cfg.scan.exclude = parts;
        }
    }
    if let Ok(v) = std::env::var("A11Y_INSPECTOR_CONTRAST_FORMULA") {
        cfg.contrast.formula = v
            .parse::<ContrastFormula>()
            .map_err(anyhow::Error::msg)
            .with_context(|| "A11Y_INSPECTOR_CONTRAST_FORMULA")?;
    }
    if let Ok(v) = std::env::var("A11Y_INSPECTOR_CONTRAST_THRESHOLD") {
        cfg.contrast.threshold = v
            .trim()
            .parse::<f64>()
            .with_context(|| "A11Y_INSPECTOR_CONTRAST_THRESHOLD")?;
    }
    if let Ok(v) = std::env::var("A11Y_INSPECTOR_STORAGE_PATH") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.storage.path = v.to_string();
        }
    }
    if let Ok(v) = std::env::var("A11Y_INSPECTOR_REPORT_PASSED_LIMIT") {
        cfg.report.passed_limit = v
            .trim()
            .parse::<usize>()
            .with_context(|| "A11Y_INSPECTOR_REPORT_PASSED_LIMIT")?;
    }

    Ok(())
}

fn validate(cfg: &EffectiveConfig) -> Result<()> {
    let t = cfg.contrast.threshold;
    if !t.is_finite() || !(1.0..=21.0).contains(&t) {
        return Err(anyhow!(
            "contrast.threshold must be between 1 and 21 (got {t})"
        ));
    }
    Ok(())
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}
