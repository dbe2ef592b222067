use std::fmt::Write as _;

use crate::core::{Finding, ResultSet};
use crate::guidance;
use crate::report::{ReportOptions, report_date};

pub fn render(results: &ResultSet, opts: &ReportOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Accessibility report");
    let _ = writeln!(out);
    let _ = writeln!(out, "- generated: {}", report_date(&results.timestamp));
    let _ = writeln!(out, "- score: {}/100", results.score());
    let _ = writeln!(
        out,
        "- issues: {}, warnings: {}, passed: {}",
        results.issues.len(),
        results.warnings.len(),
        results.passed.len()
    );
    let _ = writeln!(out);

    if opts.detailed {
        let _ = writeln!(out, "## WCAG overview");
        let _ = writeln!(out);
        let _ = writeln!(out, "| principle | passed | total | rate |");
        let _ = writeln!(out, "|---|---:|---:|---:|");
        for stat in guidance::principle_overview(results) {
            let rate = stat
                .rate()
                .map(|r| format!("{r}%"))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                stat.principle.name(),
                stat.passed,
                stat.total,
                rate
            );
        }
        let _ = writeln!(out);
    }

    write_section(&mut out, "Issues", &results.issues, opts.detailed);
    write_section(&mut out, "Warnings", &results.warnings, opts.detailed);

    let _ = writeln!(out, "## Passed ({})", results.passed.len());
    let _ = writeln!(out);
    let limit = if opts.detailed {
        opts.passed_limit
    } else {
        usize::MAX
    };
    for f in results.passed.iter().take(limit) {
        let _ = writeln!(out, "- {} (`{}`)", md_inline(&f.title), md_code(&f.element));
    }
    if results.passed.len() > limit {
        let _ = writeln!(
            out,
            "- ... and {} more passed checks",
            results.passed.len() - limit
        );
    }
    out
}

fn write_section(out: &mut String, heading: &str, findings: &[Finding], detailed: bool) {
    let _ = writeln!(out, "## {heading} ({})", findings.len());
    let _ = writeln!(out);
    if findings.is_empty() {
        let _ = writeln!(out, "_none_");
        let _ = writeln!(out);
        return;
    }
    for f in findings {
        let _ = writeln!(out, "### {}", md_inline(&f.title));
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", md_inline(&f.description));
        let _ = writeln!(out);
        let _ = writeln!(out, "- element: `{}`", md_code(&f.element));
        if let Some(selector) = &f.selector {
            let _ = writeln!(out, "- selector: `{}`", md_code(selector));
        }
        if detailed {
            let _ = writeln!(out, "- guideline: {}", guidance::guideline_label(&f.title));
            let _ = writeln!(out, "- fix: {}", guidance::suggestion(&f.title));
        }
        let _ = writeln!(out);
    }
}

fn md_inline(s: &str) -> String {
    s.replace('\n', " ").replace('|', "\\|")
}

fn md_code(s: &str) -> String {
    s.replace('`', "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Observation;

    #[test]
    fn summary_lists_every_bucket() {
        let mut r = ResultSet::at("2026-02-03T00:00:00Z");
        r.add_issue(
            Observation::new("Missing Alt Text", "Image missing alt", "img")
                .with_selector(Some("html > body:nth-of-type(1) > img:nth-of-type(1)".into())),
        );
        r.add_passed(Observation::new("Form Label Present", "ok", "input"));
        let md = render(&r, &ReportOptions::default());

        assert!(md.contains("- score: 50/100"));
        assert!(md.contains("### Missing Alt Text"));
        assert!(md.contains("- selector: `html > body:nth-of-type(1) > img:nth-of-type(1)`"));
        assert!(md.contains("## Warnings (0)\n\n_none_"));
        assert!(!md.contains("guideline:"));
    }

    #[test]
    fn detailed_adds_guidance_and_caps_passed() {
        let mut r = ResultSet::at("t");
        r.add_warning(Observation::new("Custom Thing", "d", "div"));
        for _ in 0..3 {
            r.add_passed(Observation::new("Alt Text Present", "ok", "img"));
        }
        let md = render(
            &r,
            &ReportOptions {
                detailed: true,
                passed_limit: 1,
            },
        );
        assert!(md.contains("- guideline: WCAG Guideline not specified"));
        assert!(md.contains("| Perceivable | 3 | 3 | 100% |"));
        assert!(md.contains("| Robust | 0 | 0 | n/a |"));
        assert!(md.contains("- ... and 2 more passed checks"));
    }
}
