use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "issue" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            other => Err(format!(
                "invalid severity: {other} (expected error|warning)"
            )),
        }
    }
}

/// One classified accessibility observation.
///
/// `severity` is absent for passed checks. `selector` pins the exact element
/// the finding was raised for; document-level findings have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub description: String,
    pub element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub timestamp: String,
}

/// A finding before it is classified and stamped by the result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub title: String,
    pub description: String,
    pub element: String,
    pub selector: Option<String>,
}

impl Observation {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        element: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            element: element.into(),
            selector: None,
        }
    }

    pub fn with_selector(mut self, selector: Option<String>) -> Self {
        self.selector = selector;
        self
    }

    pub(crate) fn into_finding(self, severity: Option<Severity>, timestamp: String) -> Finding {
        Finding {
            title: self.title,
            description: self.description,
            element: self.element,
            selector: self.selector,
            severity,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parses_aliases() {
        assert_eq!("Error".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!(" warn ".parse::<Severity>(), Ok(Severity::Warning));
        assert!("passed".parse::<Severity>().is_err());
    }

    #[test]
    fn passed_finding_omits_severity_and_selector() {
        let finding = Observation::new("Alt Text Present", "ok", "img")
            .into_finding(None, "2026-01-01T00:00:00Z".to_string());
        let v = serde_json::to_value(&finding).expect("serialize");
        assert!(v.get("severity").is_none());
        assert!(v.get("selector").is_none());
        assert_eq!(v["element"], "img");
    }
}
