//! The rule battery: independent DOM predicates that append classified
//! findings to a shared [`ResultSet`].

mod custom;
mod detailed;
mod quick;

use std::collections::HashSet;

use anyhow::Result;
use kuchiki::NodeRef;

use crate::contrast::ContrastFormula;
use crate::core::{Observation, ResultSet};
use crate::dom::{self, Document};

pub use custom::{CustomRule, apply_custom_rules, validate_custom_rules};

pub type RuleFn = fn(&RuleContext<'_>, &mut ResultSet) -> Result<()>;

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub check: RuleFn,
}

pub const QUICK_RULES: &[Rule] = &[
    Rule {
        id: "alt-text",
        check: quick::alt_text,
    },
    Rule {
        id: "heading-structure",
        check: quick::heading_structure,
    },
    Rule {
        id: "form-labels",
        check: quick::form_labels,
    },
    Rule {
        id: "link-text",
        check: quick::link_text,
    },
    Rule {
        id: "color-contrast",
        check: quick::color_contrast,
    },
    Rule {
        id: "aria-labels",
        check: quick::aria_labels,
    },
    Rule {
        id: "keyboard-access",
        check: quick::keyboard_access,
    },
];

/// Run after the quick subset in a detailed scan.
pub const DETAILED_RULES: &[Rule] = &[
    Rule {
        id: "semantic-html",
        check: detailed::semantic_html,
    },
    Rule {
        id: "focus-management",
        check: detailed::focus_management,
    },
    Rule {
        id: "screen-reader",
        check: detailed::screen_reader,
    },
    Rule {
        id: "mobile",
        check: detailed::mobile,
    },
    Rule {
        id: "performance",
        check: detailed::performance,
    },
    Rule {
        id: "language",
        check: detailed::language,
    },
    Rule {
        id: "table-captions",
        check: detailed::table_captions,
    },
    Rule {
        id: "multimedia",
        check: detailed::multimedia,
    },
    Rule {
        id: "cognitive-load",
        check: detailed::cognitive_load,
    },
    Rule {
        id: "seizure-safety",
        check: detailed::seizure_safety,
    },
];

pub fn rule_ids() -> impl Iterator<Item = &'static str> {
    QUICK_RULES
        .iter()
        .chain(DETAILED_RULES.iter())
        .map(|rule| rule.id)
}

#[derive(Debug, Clone)]
pub struct RuleOptions {
    pub formula: ContrastFormula,
    pub contrast_threshold: f64,
    pub excluded_selectors: Vec<String>,
    pub custom_rules: Vec<CustomRule>,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            formula: ContrastFormula::default(),
            contrast_threshold: 4.5,
            excluded_selectors: Vec::new(),
            custom_rules: Vec::new(),
        }
    }
}

impl RuleOptions {
    /// Takes the excluded selectors and custom rules from the user's settings.
    pub fn with_settings(mut self, settings: &crate::store::Settings) -> Self {
        self.excluded_selectors = settings.excluded_selectors.clone();
        self.custom_rules = settings.custom_rules.clone();
        self
    }
}

pub struct RuleContext<'a> {
    pub doc: &'a Document,
    pub options: &'a RuleOptions,
    scope: Option<NodeRef>,
    excluded: HashSet<usize>,
}

impl<'a> RuleContext<'a> {
    pub fn new(doc: &'a Document, options: &'a RuleOptions, scope: Option<NodeRef>) -> Self {
        let mut excluded = HashSet::new();
        let selectors = std::iter::once(crate::overlay::OVERLAY_SELECTOR)
            .chain(options.excluded_selectors.iter().map(String::as_str));
        for selector in selectors {
            let matches = match doc.try_select(selector) {
                Ok(matches) => matches,
                Err(err) => {
                    tracing::warn!(selector = %selector, error = %err, "ignoring excluded selector");
                    continue;
                }
            };
            for node in matches {
                excluded.extend(node.inclusive_descendants().map(|n| dom::node_key(&n)));
            }
        }
        Self {
            doc,
            options,
            scope,
            excluded,
        }
    }

    /// A scoped context covers one subtree; document-level checks are skipped.
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    pub fn is_excluded(&self, node: &NodeRef) -> bool {
        self.excluded.contains(&dom::node_key(node))
    }

    /// Elements in scope matching `selector`, minus excluded ones.
    pub fn select(&self, selector: &str) -> Vec<NodeRef> {
        let found = match &self.scope {
            Some(scope) => dom::select_within(scope, selector),
            None => self.doc.select(selector),
        };
        found
            .into_iter()
            .filter(|node| !self.is_excluded(node))
            .collect()
    }

    pub fn exists(&self, selector: &str) -> bool {
        !self.select(selector).is_empty()
    }

    pub fn is_hidden(&self, node: &NodeRef) -> bool {
        self.doc.styles().is_hidden(node)
    }

    /// Observation pinned to `node` by tag name and exact selector.
    pub fn observe(&self, node: &NodeRef, title: &str, description: impl Into<String>) -> Observation {
        Observation::new(title, description, dom::tag_name(node))
            .with_selector(dom::selector_path(node))
    }

    /// Observation about the page as a whole, reported against `element`.
    pub fn observe_page(&self, element: &str, title: &str, description: &str) -> Observation {
        Observation::new(title, description, element)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn run(rule: RuleFn, html: &str) -> ResultSet {
        run_with(rule, html, &RuleOptions::default())
    }

    pub fn run_with(rule: RuleFn, html: &str, options: &RuleOptions) -> ResultSet {
        let doc = Document::parse(html);
        let ctx = RuleContext::new(&doc, options, None);
        let mut results = ResultSet::at("2026-01-01T00:00:00Z");
        rule(&ctx, &mut results).expect("rule");
        results
    }

    pub fn titles(findings: &[crate::core::Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.title.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_ids_are_unique_and_ordered() {
        let ids: Vec<&str> = rule_ids().collect();
        assert_eq!(ids.len(), 17);
        assert_eq!(ids[0], "alt-text");
        assert_eq!(ids[6], "keyboard-access");
        assert_eq!(ids[16], "seizure-safety");
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn excluded_subtrees_are_invisible() {
        let doc = Document::parse(
            r#"<div class="ads"><img src="a.png"><p><img src="b.png"></p></div><img src="c.png">"#,
        );
        let options = RuleOptions {
            excluded_selectors: vec![".ads".to_string(), "[[bad".to_string()],
            ..RuleOptions::default()
        };
        let ctx = RuleContext::new(&doc, &options, None);
        assert_eq!(ctx.select("img").len(), 1);
    }

    #[test]
    fn scoped_context_selects_inside_the_subtree_only() {
        let doc = Document::parse(r#"<section id="s"><a href="/x">x</a></section><a href="/y">y</a>"#);
        let options = RuleOptions::default();
        let scope = doc.select_first("#s");
        let ctx = RuleContext::new(&doc, &options, scope);
        assert!(ctx.is_scoped());
        assert_eq!(ctx.select("a[href]").len(), 1);
    }
}
