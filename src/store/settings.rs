use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dom::is_valid_selector;
use crate::report::ReportFormat;
use crate::rules::{CustomRule, validate_custom_rules};

/// User preferences persisted alongside the scan history.
///
/// Unknown keys are ignored and missing keys take their defaults, so stores
/// written by older versions keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_scan: bool,
    pub highlight_issues: bool,
    pub show_notifications: bool,
    pub export_format: ReportFormat,
    pub theme: String,
    pub language: String,
    pub wcag_version: String,
    pub compliance_level: String,
    pub scan_frequency: String,
    pub excluded_selectors: Vec<String>,
    pub custom_rules: Vec<CustomRule>,
    pub telemetry: bool,
    pub auto_update: bool,
    pub compact_mode: bool,
    pub colors: ColorScheme,
    pub last_update_check: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_scan: false,
            highlight_issues: true,
            show_notifications: true,
            export_format: ReportFormat::Html,
            theme: "default".to_string(),
            language: "en".to_string(),
            wcag_version: "2.1".to_string(),
            compliance_level: "AA".to_string(),
            scan_frequency: "manual".to_string(),
            excluded_selectors: Vec::new(),
            custom_rules: Vec::new(),
            telemetry: true,
            auto_update: true,
            compact_mode: false,
            colors: ColorScheme::default(),
            last_update_check: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub error: String,
    pub warning: String,
    pub success: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            error: "#ef4444".to_string(),
            warning: "#f59e0b".to_string(),
            success: "#10b981".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        for selector in &self.excluded_selectors {
            if !is_valid_selector(selector) {
                bail!("invalid excluded selector: {selector}");
            }
        }
        validate_custom_rules(&self.custom_rules)?;
        for (name, color) in [
            ("colors.error", &self.colors.error),
            ("colors.warning", &self.colors.warning),
            ("colors.success", &self.colors.success),
        ] {
            if !is_hex_color(color) {
                bail!("{name} must be a hex color like #ef4444 (got {color})");
            }
        }
        if !matches!(self.compliance_level.as_str(), "A" | "AA" | "AAA") {
            bail!(
                "complianceLevel must be A, AA or AAA (got {})",
                self.compliance_level
            );
        }
        Ok(())
    }

    /// Shallow merge of `patch` over these settings, like spreading one
    /// object over another. The result is validated before it is returned.
    pub fn merged_with(&self, patch: &serde_json::Map<String, Value>) -> Result<Settings> {
        let mut current = serde_json::to_value(self).context("failed to encode settings")?;
        let Value::Object(fields) = &mut current else {
            bail!("settings did not encode as an object");
        };
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
        let merged: Settings =
            serde_json::from_value(current).context("settings have an invalid shape")?;
        merged.validate()?;
        Ok(merged)
    }

    /// Sets one field from its command-line spelling. `key` is the camelCase
    /// field name, with `colors.<name>` for the palette.
    pub fn with_key(&self, key: &str, raw: &str) -> Result<Settings> {
        let current = serde_json::to_value(self).context("failed to encode settings")?;
        let (top, nested) = match key.split_once('.') {
            Some((top, nested)) => (top, Some(nested)),
            None => (key, None),
        };
        let existing = current
            .get(top)
            .ok_or_else(|| anyhow!("unknown settings key: {key}"))?;
        let existing = match nested {
            Some(nested) => existing
                .get(nested)
                .ok_or_else(|| anyhow!("unknown settings key: {key}"))?,
            None => existing,
        };
        let value = coerce_value(existing, raw).with_context(|| format!("invalid value for {key}"))?;

        let mut patch = serde_json::Map::new();
        match nested {
            Some(nested) => {
                let mut inner = current
                    .get(top)
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                inner.insert(nested.to_string(), value);
                patch.insert(top.to_string(), Value::Object(inner));
            }
            None => {
                patch.insert(top.to_string(), value);
            }
        }
        self.merged_with(&patch)
    }
}

fn coerce_value(existing: &Value, raw: &str) -> Result<Value> {
    match existing {
        Value::Bool(_) => Ok(Value::Bool(crate::config::parse_bool(raw)?)),
        Value::String(_) => Ok(Value::String(raw.to_string())),
        Value::Null => {
            if raw.trim().eq_ignore_ascii_case("null") {
                Ok(Value::Null)
            } else {
                Ok(Value::String(raw.to_string()))
            }
        }
        Value::Array(_) => {
            let trimmed = raw.trim();
            if trimmed.starts_with('[') {
                serde_json::from_str(trimmed).context("expected a JSON array")
            } else {
                Ok(Value::Array(
                    trimmed
                        .split('\n')
                        .flat_map(|line| line.split(','))
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| Value::String(s.to_string()))
                        .collect(),
                ))
            }
        }
        Value::Number(_) | Value::Object(_) => {
            serde_json::from_str(raw.trim()).context("expected JSON")
        }
    }
}

fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 4 | 6 | 8) && hex.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let v = serde_json::to_value(Settings::default()).expect("encode");
        assert_eq!(v.as_object().map(|o| o.len()), Some(16));
        assert_eq!(v["exportFormat"], "html");
        assert_eq!(v["complianceLevel"], "AA");
        assert_eq!(v["colors"]["error"], "#ef4444");
        assert!(v["lastUpdateCheck"].is_null());
        assert_eq!(v["excludedSelectors"], serde_json::json!([]));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let s: Settings = serde_json::from_str(r#"{"autoScan":true,"unknown":1}"#).expect("parse");
        assert!(s.auto_scan);
        assert!(s.telemetry);
        assert_eq!(s.wcag_version, "2.1");
    }

    #[test]
    fn with_key_coerces_by_field_type() {
        let s = Settings::default();
        let s = s.with_key("autoScan", "yes").expect("bool");
        assert!(s.auto_scan);
        let s = s.with_key("excludedSelectors", ".ads, #cookie-banner").expect("list");
        assert_eq!(s.excluded_selectors, vec![".ads", "#cookie-banner"]);
        let s = s.with_key("colors.error", "#ff0000").expect("nested");
        assert_eq!(s.colors.error, "#ff0000");
        assert_eq!(s.colors.warning, "#f59e0b");
        assert!(s.with_key("nope", "1").is_err());
        assert!(s.with_key("colors.error", "red").is_err());
        assert!(s.with_key("exportFormat", "pdf").is_err());
    }

    #[test]
    fn merge_rejects_invalid_custom_rules() {
        let patch = serde_json::json!({
            "customRules": [{"id": "x", "selector": "div[", "title": "T"}]
        });
        let patch = patch.as_object().expect("object");
        assert!(Settings::default().merged_with(patch).is_err());
    }
}
