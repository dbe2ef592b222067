use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::ResultSet;
use crate::dom::Document;
use crate::rules::{DETAILED_RULES, QUICK_RULES, Rule, RuleContext, RuleOptions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Quick,
    Detailed,
}

impl ScanMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ScanMode::Quick => "quick",
            ScanMode::Detailed => "detailed",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(ScanMode::Quick),
            "detailed" => Ok(ScanMode::Detailed),
            other => Err(format!("invalid scan mode: {other} (expected quick|detailed)")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub rules: RuleOptions,
    pub show_progress: bool,
}

/// A predicate that returned an error or panicked during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleFailure {
    pub rule: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ScanPass {
    pub results: ResultSet,
    pub failed_rules: Vec<RuleFailure>,
}

#[derive(Debug)]
pub struct PageScan {
    pub path: PathBuf,
    pub outcome: Result<ScanPass>,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    opts: EngineOptions,
}

impl Engine {
    pub fn new(opts: EngineOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.opts
    }

    pub fn quick_scan(&self, doc: &Document) -> ResultSet {
        self.scan(doc, ScanMode::Quick).results
    }

    pub fn detailed_scan(&self, doc: &Document) -> ResultSet {
        self.scan(doc, ScanMode::Detailed).results
    }

    pub fn scan(&self, doc: &Document, mode: ScanMode) -> ScanPass {
        let ctx = RuleContext::new(doc, &self.opts.rules, None);
        self.run(&ctx, mode)
    }

    /// Detailed scan of the subtree rooted at the first match of `selector`.
    pub fn scan_element(&self, doc: &Document, selector: &str) -> Result<ScanPass> {
        let matches = doc.try_select(selector)?;
        let scope = matches
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no element matches selector: {selector}"))?;
        let ctx = RuleContext::new(doc, &self.opts.rules, Some(scope));
        Ok(self.run(&ctx, ScanMode::Detailed))
    }

    pub fn scan_files(&self, paths: &[PathBuf], mode: ScanMode) -> Vec<PageScan> {
        use std::io::IsTerminal;
        let progress_enabled = self.opts.show_progress && std::io::stderr().is_terminal();
        let pb = if progress_enabled {
            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let mut out = Vec::with_capacity(paths.len());
        for (idx, path) in paths.iter().enumerate() {
            if let Some(pb) = &pb {
                pb.set_message(format!("scanning {}/{} {}", idx + 1, paths.len(), path.display()));
            }
            tracing::debug!(page = %path.display(), mode = %mode, "scanning page");
            let outcome = Document::from_path(path)
                .with_context(|| format!("scan failed: {}", path.display()))
                .map(|doc| self.scan(&doc, mode));
            out.push(PageScan {
                path: path.clone(),
                outcome,
            });
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        out
    }

    fn run(&self, ctx: &RuleContext<'_>, mode: ScanMode) -> ScanPass {
        let mut results = ResultSet::new();
        let mut failed_rules = Vec::new();

        let extra: &[Rule] = match mode {
            ScanMode::Quick => &[],
            ScanMode::Detailed => DETAILED_RULES,
        };
        for rule in QUICK_RULES.iter().chain(extra.iter()) {
            if let Err(failure) = run_isolated(rule.id, ctx, &mut results, rule.check) {
                failed_rules.push(failure);
            }
        }
        if !ctx.options.custom_rules.is_empty() {
            if let Err(failure) =
                run_isolated("custom-rules", ctx, &mut results, crate::rules::apply_custom_rules)
            {
                failed_rules.push(failure);
            }
        }

        tracing::debug!(
            mode = %mode,
            issues = results.issues.len(),
            warnings = results.warnings.len(),
            passed = results.passed.len(),
            failed = failed_rules.len(),
            "scan pass finished"
        );
        ScanPass {
            results,
            failed_rules,
        }
    }
}

fn run_isolated(
    id: &str,
    ctx: &RuleContext<'_>,
    results: &mut ResultSet,
    check: crate::rules::RuleFn,
) -> std::result::Result<(), RuleFailure> {
    tracing::debug!(rule = id, "running rule");
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| check(ctx, results)));
    let message = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => format!("{err:#}"),
        Err(payload) => panic_message(payload.as_ref()),
    };
    tracing::warn!(rule = id, error = %message, "rule failed; continuing");
    Err(RuleFailure {
        rule: id.to_string(),
        message,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return format!("panicked: {s}");
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return format!("panicked: {s}");
    }
    "panicked".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::CustomRule;

    const PAGE: &str = r##"<!doctype html>
        <html><head><title>t</title></head><body>
        <h1>Title</h1><h3>Skipped</h3>
        <img src="a.png">
        <img src="b.png" alt="">
        <img src="c.png" alt="Chart">
        <a href="#main">Skip</a>
        <section id="widget"><img src="d.png"><iframe src="x"></iframe></section>
        </body></html>"##;

    fn counts(r: &ResultSet) -> (usize, usize, usize) {
        (r.issues.len(), r.warnings.len(), r.passed.len())
    }

    #[test]
    fn quick_findings_are_a_subset_of_detailed_findings() {
        let doc = Document::parse(PAGE);
        let engine = Engine::default();
        let quick = engine.quick_scan(&doc);
        let detailed = engine.detailed_scan(&doc);
        for f in quick.issues.iter().chain(&quick.warnings).chain(&quick.passed) {
            let found = detailed
                .issues
                .iter()
                .chain(&detailed.warnings)
                .chain(&detailed.passed)
                .any(|d| d.title == f.title && d.selector == f.selector);
            assert!(found, "missing from detailed: {}", f.title);
        }
        assert!(detailed.total() > quick.total());
        assert!(detailed.issues.iter().any(|f| f.title == "Missing Language Attribute"));
    }

    #[test]
    fn repeated_scans_of_an_unchanged_document_agree() {
        let doc = Document::parse(PAGE);
        let engine = Engine::default();
        let first = engine.detailed_scan(&doc);
        let second = engine.detailed_scan(&doc);
        assert_eq!(counts(&first), counts(&second));
    }

    #[test]
    fn element_scan_is_scoped_and_skips_page_level_checks() {
        let doc = Document::parse(PAGE);
        let engine = Engine::default();
        let pass = engine.scan_element(&doc, "#widget").expect("scan");
        let titles: Vec<&str> = pass.results.problems().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Missing Alt Text", "Missing iframe Title"]);
        assert!(engine.scan_element(&doc, "#absent").is_err());
        assert!(engine.scan_element(&doc, "[[").is_err());
    }

    #[test]
    fn custom_rules_run_after_builtin_rules() {
        let doc = Document::parse(r#"<html lang="en"><body><h1>x</h1><button>Go</button></body></html>"#);
        let opts = EngineOptions {
            rules: RuleOptions {
                custom_rules: vec![CustomRule {
                    id: "button-type".to_string(),
                    selector: "button".to_string(),
                    title: "Button Without Type".to_string(),
                    description: String::new(),
                    severity: crate::core::Severity::Error,
                    require_attribute: Some("type".to_string()),
                }],
                ..RuleOptions::default()
            },
            show_progress: false,
        };
        let results = Engine::new(opts).quick_scan(&doc);
        assert_eq!(
            results.issues.last().map(|f| f.title.as_str()),
            Some("Button Without Type")
        );
    }

    #[test]
    fn failing_rules_are_isolated() {
        fn broken(_: &RuleContext<'_>, _: &mut ResultSet) -> Result<()> {
            Err(anyhow!("boom"))
        }
        fn panicking(_: &RuleContext<'_>, _: &mut ResultSet) -> Result<()> {
            panic!("kaboom")
        }
        let doc = Document::parse("<p>x</p>");
        let options = RuleOptions::default();
        let ctx = RuleContext::new(&doc, &options, None);
        let mut results = ResultSet::new();

        let err = run_isolated("broken", &ctx, &mut results, broken).expect_err("fails");
        assert_eq!(err.message, "boom");
        let err = run_isolated("panicking", &ctx, &mut results, panicking).expect_err("fails");
        assert_eq!(err.message, "panicked: kaboom");
    }

    #[test]
    fn scan_mode_parses() {
        assert_eq!("Detailed".parse::<ScanMode>(), Ok(ScanMode::Detailed));
        assert!("full".parse::<ScanMode>().is_err());
    }
}
