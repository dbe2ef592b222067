//! JSON file persistence for settings and scan history.

mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::core::ScanRecord;

pub use settings::{ColorScheme, Settings};

pub const HISTORY_LIMIT: usize = 50;
const UPDATE_CHECK_INTERVAL: Duration = Duration::hours(24);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreData {
    pub settings: Settings,
    pub scan_history: Vec<ScanRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub settings: Settings,
    pub scan_history: Vec<ScanRecord>,
    pub export_date: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub history_replaced: bool,
    pub history_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheck {
    /// False when the previous check was less than a day ago.
    pub checked: bool,
    pub update_available: bool,
}

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents; a store that was never written reads as defaults.
    pub fn load(&self) -> Result<StoreData> {
        if !self.path.exists() {
            return Ok(StoreData::default());
        }
        let s = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read store: {}", self.path.display()))?;
        if s.trim().is_empty() {
            return Ok(StoreData::default());
        }
        serde_json::from_str(&s)
            .with_context(|| format!("store is not valid JSON: {}", self.path.display()))
    }

    /// Writes to a sibling temp file and renames it into place.
    pub fn save(&self, data: &StoreData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let body = serde_json::to_string_pretty(data).context("failed to encode store")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body.as_bytes())
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.load()?.settings)
    }

    pub fn save_settings(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let mut data = self.load()?;
        data.settings = settings;
        self.save(&data)
    }

    pub fn history(&self) -> Result<Vec<ScanRecord>> {
        Ok(self.load()?.scan_history)
    }

    /// Prepends `record`, keeping at most [`HISTORY_LIMIT`] entries.
    pub fn save_scan_result(&self, record: ScanRecord) -> Result<()> {
        let mut data = self.load()?;
        push_history(&mut data.scan_history, record);
        self.save(&data)?;
        tracing::info!(
            store = %self.path.display(),
            entries = data.scan_history.len(),
            "scan result saved"
        );
        Ok(())
    }

    pub fn export(&self) -> Result<ExportBundle> {
        let data = self.load()?;
        Ok(ExportBundle {
            settings: data.settings,
            scan_history: data.scan_history,
            export_date: crate::core::timestamp_now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Merges an export bundle into the store. Nothing is written unless the
    /// whole bundle is valid.
    pub fn import(&self, bundle: &Value) -> Result<ImportSummary> {
        let Some(obj) = bundle.as_object() else {
            bail!("invalid data format: expected a JSON object");
        };
        let Some(patch) = obj.get("settings").and_then(Value::as_object) else {
            bail!("invalid data format: missing settings object");
        };

        let mut data = self.load()?;
        let settings = data.settings.merged_with(patch)?;

        let history = match obj.get("scanHistory") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let mut records: Vec<ScanRecord> = serde_json::from_value(v.clone())
                    .context("invalid data format: scanHistory")?;
                records.truncate(HISTORY_LIMIT);
                Some(records)
            }
        };

        data.settings = settings;
        let history_replaced = history.is_some();
        if let Some(records) = history {
            data.scan_history = records;
        }
        self.save(&data)?;
        Ok(ImportSummary {
            history_replaced,
            history_len: data.scan_history.len(),
        })
    }

    /// Resets settings to defaults and empties the history.
    pub fn clear(&self) -> Result<()> {
        self.save(&StoreData::default())
    }

    pub fn check_update(&self, now: OffsetDateTime) -> Result<UpdateCheck> {
        let mut data = self.load()?;
        let recent = data
            .settings
            .last_update_check
            .as_deref()
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
            .is_some_and(|last| now - last < UPDATE_CHECK_INTERVAL);
        if recent {
            return Ok(UpdateCheck {
                checked: false,
                update_available: false,
            });
        }
        let stamp = now
            .format(&Rfc3339)
            .map_err(|e| anyhow!("failed to format timestamp: {e}"))?;
        data.settings.last_update_check = Some(stamp);
        self.save(&data)?;
        Ok(UpdateCheck {
            checked: true,
            update_available: false,
        })
    }
}

fn push_history(history: &mut Vec<ScanRecord>, record: ScanRecord) {
    history.insert(0, record);
    history.truncate(HISTORY_LIMIT);
}

/// Records a usage event locally when telemetry is enabled. Nothing leaves
/// the machine.
pub fn track_event(settings: &Settings, event: &str, detail: &str) {
    if settings.telemetry {
        tracing::debug!(target: "a11y_inspector::telemetry", event, detail, "event tracked");
    }
}
