use std::collections::HashSet;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::{ResultSet, Severity};
use crate::dom::{has_attr, is_valid_selector};
use crate::rules::RuleContext;

/// A user-defined selector check stored in settings.
///
/// Every element matching `selector` is reported with `severity`, unless
/// `require_attribute` is set and the element carries that attribute, in
/// which case it is recorded as passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRule {
    pub id: String,
    pub selector: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_attribute: Option<String>,
}

fn default_severity() -> Severity {
    Severity::Warning
}

pub fn validate_custom_rules(rules: &[CustomRule]) -> Result<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        if rule.id.trim().is_empty() {
            bail!("custom rule id must not be empty");
        }
        if !seen.insert(rule.id.as_str()) {
            bail!("duplicate custom rule id: {}", rule.id);
        }
        if rule.title.trim().is_empty() {
            bail!("custom rule {} has an empty title", rule.id);
        }
        if !is_valid_selector(&rule.selector) {
            bail!("custom rule {} has an invalid selector: {}", rule.id, rule.selector);
        }
    }
    Ok(())
}

pub fn apply_custom_rules(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for rule in &ctx.options.custom_rules {
        if !is_valid_selector(&rule.selector) {
            tracing::warn!(rule = %rule.id, selector = %rule.selector, "skipping custom rule with invalid selector");
            continue;
        }
        for el in ctx.select(&rule.selector) {
            let satisfied = rule
                .require_attribute
                .as_deref()
                .is_some_and(|name| has_attr(&el, name));
            if satisfied {
                results.add_passed(ctx.observe(
                    &el,
                    &rule.title,
                    format!("Satisfies custom rule {}", rule.id),
                ));
                continue;
            }
            let description = if rule.description.is_empty() {
                format!("Matched custom rule {}", rule.id)
            } else {
                rule.description.clone()
            };
            let obs = ctx.observe(&el, &rule.title, description);
            match rule.severity {
                Severity::Error => results.add_issue(obs),
                Severity::Warning => results.add_warning(obs),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleOptions;
    use crate::rules::testing::run_with;

    fn rule(id: &str, selector: &str, require: Option<&str>) -> CustomRule {
        CustomRule {
            id: id.to_string(),
            selector: selector.to_string(),
            title: "Button Needs Type".to_string(),
            description: "Buttons should declare a type".to_string(),
            severity: Severity::Error,
            require_attribute: require.map(str::to_string),
        }
    }

    #[test]
    fn required_attribute_splits_pass_and_fail() {
        let options = RuleOptions {
            custom_rules: vec![rule("button-type", "button", Some("type"))],
            ..RuleOptions::default()
        };
        let r = run_with(
            apply_custom_rules,
            r#"<button type="button">a</button><button>b</button>"#,
            &options,
        );
        assert_eq!(r.issues.len(), 1);
        assert_eq!(r.issues[0].title, "Button Needs Type");
        assert_eq!(r.passed.len(), 1);
    }

    #[test]
    fn rule_without_requirement_reports_every_match() {
        let mut marquee = rule("no-marquee", "marquee", None);
        marquee.severity = Severity::Warning;
        let options = RuleOptions {
            custom_rules: vec![marquee],
            ..RuleOptions::default()
        };
        let r = run_with(
            apply_custom_rules,
            "<marquee>a</marquee><marquee>b</marquee>",
            &options,
        );
        assert_eq!(r.warnings.len(), 2);
    }

    #[test]
    fn validation_rejects_bad_selectors_and_duplicates() {
        assert!(validate_custom_rules(&[rule("a", "button", None)]).is_ok());
        assert!(validate_custom_rules(&[rule("a", "button[", None)]).is_err());
        assert!(validate_custom_rules(&[rule("a", "p", None), rule("a", "div", None)]).is_err());
        assert!(validate_custom_rules(&[rule(" ", "p", None)]).is_err());
    }

    #[test]
    fn deserializes_camel_case_json() {
        let rule: CustomRule = serde_json::from_str(
            r#"{"id":"x","selector":"img","title":"T","requireAttribute":"loading"}"#,
        )
        .expect("parse");
        assert_eq!(rule.severity, Severity::Warning);
        assert_eq!(rule.require_attribute.as_deref(), Some("loading"));
    }
}
