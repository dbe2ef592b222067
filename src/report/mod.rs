//! Renderers that turn a finished [`ResultSet`] into a shareable document.

pub mod html;
pub mod markdown;

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::ResultSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Html,
    Json,
    Markdown,
}

impl ReportFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "markdown",
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(format!(
                "invalid report format: {other} (expected html|json|markdown)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Render the sidebar-style report with WCAG guidance.
    pub detailed: bool,
    pub passed_limit: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            detailed: false,
            passed_limit: 10,
        }
    }
}

pub fn render(results: &ResultSet, format: ReportFormat, opts: &ReportOptions) -> Result<String> {
    match format {
        ReportFormat::Html if opts.detailed => Ok(html::render_detailed(results, opts.passed_limit)),
        ReportFormat::Html => Ok(html::render_summary(results)),
        ReportFormat::Markdown => Ok(markdown::render(results, opts)),
        ReportFormat::Json => {
            let mut s = serde_json::to_string_pretty(results).context("failed to encode results")?;
            s.push('\n');
            Ok(s)
        }
    }
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Calendar date of an RFC 3339 timestamp, or the raw value when it has no
/// time part.
pub(crate) fn report_date(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn json_report_is_the_result_set_wire_shape() {
        let results = ResultSet::at("2026-01-01T00:00:00Z");
        let out = render(&results, ReportFormat::Json, &ReportOptions::default()).expect("render");
        let v: serde_json::Value = serde_json::from_str(&out).expect("json");
        assert_eq!(v["timestamp"], "2026-01-01T00:00:00Z");
        assert!(v["issues"].as_array().is_some_and(|a| a.is_empty()));
    }

    #[test]
    fn format_parses_aliases() {
        assert_eq!("MD".parse::<ReportFormat>(), Ok(ReportFormat::Markdown));
        assert!("pdf".parse::<ReportFormat>().is_err());
        assert_eq!(report_date("2026-03-04T05:06:07Z"), "2026-03-04");
    }
}
