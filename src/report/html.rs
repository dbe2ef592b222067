use std::fmt::Write as _;

use crate::core::{Finding, ResultSet};
use crate::guidance::{self, RECOMMENDATIONS};
use crate::report::{escape_html, report_date};

const SUMMARY_CSS: &str = r#"body { font-family: Arial, sans-serif; margin: 40px; background: #f5f5f5; }
.container { max-width: 800px; margin: 0 auto; background: white; padding: 30px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
.header { text-align: center; margin-bottom: 30px; }
.score { font-size: 3em; font-weight: bold; color: #667eea; text-align: center; margin: 20px 0; }
.section { margin: 20px 0; }
.issue { background: #fef2f2; border-left: 4px solid #ef4444; padding: 15px; margin: 10px 0; border-radius: 5px; }
.warning { background: #fffbeb; border-left: 4px solid #f59e0b; }
.passed { background: #f0fdf4; border-left: 4px solid #10b981; }
h1, h2 { color: #333; }
.summary { display: grid; grid-template-columns: repeat(3, 1fr); gap: 20px; margin: 20px 0; }
.summary-item { text-align: center; padding: 20px; background: #f8fafc; border-radius: 8px; }
.summary-number { font-size: 2em; font-weight: bold; }"#;

const DETAILED_CSS: &str = r#"body { font-family: Arial, sans-serif; margin: 40px; background: #f5f5f5; }
.container { max-width: 1000px; margin: 0 auto; background: white; padding: 40px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
.header { text-align: center; margin-bottom: 40px; }
.score { font-size: 4em; font-weight: bold; color: #667eea; text-align: center; margin: 20px 0; }
.section { margin: 30px 0; }
.issue { background: #fef2f2; border-left: 4px solid #ef4444; padding: 20px; margin: 15px 0; border-radius: 5px; }
.warning { background: #fffbeb; border-left: 4px solid #f59e0b; padding: 20px; margin: 15px 0; border-radius: 5px; }
.passed { background: #f0fdf4; border-left: 4px solid #10b981; padding: 20px; margin: 15px 0; border-radius: 5px; }
h1, h2, h3 { color: #333; }
.summary { display: grid; grid-template-columns: repeat(3, 1fr); gap: 20px; margin: 20px 0; }
.summary-item { text-align: center; padding: 20px; background: #f8fafc; border-radius: 8px; }
.summary-number { font-size: 2.5em; font-weight: bold; }
.wcag-overview { background: #f8fafc; padding: 20px; border-radius: 8px; margin: 20px 0; }
.wcag-grid { display: grid; grid-template-columns: repeat(2, 1fr); gap: 20px; margin-top: 20px; }
.wcag-item { padding: 15px; background: white; border-radius: 6px; border: 1px solid #e5e7eb; }
.progress-bar { height: 8px; background: #e5e7eb; border-radius: 4px; overflow: hidden; margin: 10px 0; }
.progress-fill { height: 100%; background: #10b981; }
.recommendations { background: #f0f9ff; padding: 20px; border-radius: 8px; border-left: 4px solid #3b82f6; }
.recommendations h3 { color: #1e40af; }
.recommendations ul { margin: 15px 0; padding-left: 20px; }
.recommendations li { margin: 8px 0; }"#;

/// The compact report: score, counts and every finding.
pub fn render_summary(results: &ResultSet) -> String {
    let date = escape_html(report_date(&results.timestamp));
    let mut out = String::new();

    write_head(&mut out, &format!("Accessibility Report - {date}"), SUMMARY_CSS);
    let _ = writeln!(out, r#"<div class="header">"#);
    let _ = writeln!(out, "<h1>A11y Inspector Report</h1>");
    let _ = writeln!(out, "<p>Generated on {date}</p>");
    let _ = writeln!(out, r#"<div class="score">{}/100</div>"#, results.score());
    let _ = writeln!(out, "</div>");
    write_counts(&mut out, results, ["Issues", "Warnings", "Passed"]);

    let _ = writeln!(out, r#"<div class="section">"#);
    let _ = writeln!(out, "<h2>Critical Issues</h2>");
    for f in &results.issues {
        write_summary_item(&mut out, "issue", f, true);
    }
    let _ = writeln!(out, "</div>");

    let _ = writeln!(out, r#"<div class="section">"#);
    let _ = writeln!(out, "<h2>Warnings</h2>");
    for f in &results.warnings {
        write_summary_item(&mut out, "issue warning", f, true);
    }
    let _ = writeln!(out, "</div>");

    let _ = writeln!(out, r#"<div class="section">"#);
    let _ = writeln!(out, "<h2>Passed Checks</h2>");
    for f in &results.passed {
        write_summary_item(&mut out, "issue passed", f, false);
    }
    let _ = writeln!(out, "</div>");

    write_tail(&mut out);
    out
}

/// The full report: WCAG principle overview, guidance per finding, a capped
/// list of passed checks and general recommendations.
pub fn render_detailed(results: &ResultSet, passed_limit: usize) -> String {
    let date = escape_html(report_date(&results.timestamp));
    let mut out = String::new();

    write_head(
        &mut out,
        &format!("Detailed Accessibility Report - {date}"),
        DETAILED_CSS,
    );
    let _ = writeln!(out, r#"<div class="header">"#);
    let _ = writeln!(out, "<h1>A11y Inspector - Detailed Accessibility Report</h1>");
    let _ = writeln!(out, "<p>Generated on {date}</p>");
    let _ = writeln!(out, r#"<div class="score">{}/100</div>"#, results.score());
    let _ = writeln!(out, "</div>");
    write_counts(&mut out, results, ["Critical Issues", "Warnings", "Passed Checks"]);

    let _ = writeln!(out, r#"<div class="wcag-overview">"#);
    let _ = writeln!(out, "<h2>WCAG 2.1 Compliance Overview</h2>");
    let _ = writeln!(out, r#"<div class="wcag-grid">"#);
    for stat in guidance::principle_overview(results) {
        let (width, label) = match stat.rate() {
            Some(rate) => (rate, format!("{rate}% ({}/{})", stat.passed, stat.total)),
            None => (0, "no checks".to_string()),
        };
        let _ = writeln!(out, r#"<div class="wcag-item">"#);
        let _ = writeln!(out, "<h4>{}</h4>", stat.principle.name());
        let _ = writeln!(
            out,
            r#"<div class="progress-bar"><div class="progress-fill" style="width: {width}%"></div></div>"#
        );
        let _ = writeln!(out, "<p>{label}</p>");
        let _ = writeln!(out, "<small>{}</small>", escape_html(stat.principle.summary()));
        let _ = writeln!(out, "</div>");
    }
    let _ = writeln!(out, "</div>");
    let _ = writeln!(out, "</div>");

    let _ = writeln!(out, r#"<div class="section">"#);
    let _ = writeln!(out, "<h2>Critical Issues ({})</h2>", results.issues.len());
    for f in &results.issues {
        write_detailed_item(&mut out, "issue", f);
    }
    let _ = writeln!(out, "</div>");

    let _ = writeln!(out, r#"<div class="section">"#);
    let _ = writeln!(out, "<h2>Warnings ({})</h2>", results.warnings.len());
    for f in &results.warnings {
        write_detailed_item(&mut out, "warning", f);
    }
    let _ = writeln!(out, "</div>");

    let _ = writeln!(out, r#"<div class="section">"#);
    let _ = writeln!(out, "<h2>Passed Checks ({})</h2>", results.passed.len());
    for f in results.passed.iter().take(passed_limit) {
        let _ = writeln!(out, r#"<div class="passed">"#);
        let _ = writeln!(out, "<h3>{}</h3>", escape_html(&f.title));
        let _ = writeln!(out, "<p>{}</p>", escape_html(&f.description));
        let _ = writeln!(
            out,
            "<p><strong>Element:</strong> <code>{}</code></p>",
            escape_html(&f.element)
        );
        let _ = writeln!(out, "</div>");
    }
    if results.passed.len() > passed_limit {
        let _ = writeln!(
            out,
            "<p><em>... and {} more passed checks</em></p>",
            results.passed.len() - passed_limit
        );
    }
    let _ = writeln!(out, "</div>");

    let _ = writeln!(out, r#"<div class="recommendations">"#);
    let _ = writeln!(out, "<h3>Recommendations for Improvement</h3>");
    let _ = writeln!(out, "<ul>");
    for rec in RECOMMENDATIONS {
        let _ = writeln!(out, "<li>{}</li>", escape_html(rec));
    }
    let _ = writeln!(out, "</ul>");
    let _ = writeln!(out, "</div>");

    let _ = writeln!(
        out,
        r#"<div style="text-align: center; margin-top: 40px; color: #666;"><p>Generated by A11y Inspector v{}</p></div>"#,
        env!("CARGO_PKG_VERSION")
    );
    write_tail(&mut out);
    out
}

fn write_head(out: &mut String, title: &str, css: &str) {
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, r#"<html lang="en">"#);
    let _ = writeln!(out, "<head>");
    let _ = writeln!(out, r#"<meta charset="utf-8">"#);
    let _ = writeln!(out, "<title>{title}</title>");
    let _ = writeln!(out, "<style>\n{css}\n</style>");
    let _ = writeln!(out, "</head>");
    let _ = writeln!(out, "<body>");
    let _ = writeln!(out, r#"<div class="container">"#);
}

fn write_tail(out: &mut String) {
    let _ = writeln!(out, "</div>");
    let _ = writeln!(out, "</body>");
    let _ = writeln!(out, "</html>");
}

fn write_counts(out: &mut String, results: &ResultSet, labels: [&str; 3]) {
    let counts = [
        (results.issues.len(), "#ef4444"),
        (results.warnings.len(), "#f59e0b"),
        (results.passed.len(), "#10b981"),
    ];
    let _ = writeln!(out, r#"<div class="summary">"#);
    for ((count, color), label) in counts.into_iter().zip(labels) {
        let _ = writeln!(
            out,
            r#"<div class="summary-item"><div class="summary-number" style="color: {color};">{count}</div><div>{label}</div></div>"#
        );
    }
    let _ = writeln!(out, "</div>");
}

fn write_summary_item(out: &mut String, class: &str, f: &Finding, with_element: bool) {
    let _ = writeln!(out, r#"<div class="{class}">"#);
    let _ = writeln!(out, "<strong>{}</strong>", escape_html(&f.title));
    let _ = writeln!(out, "<p>{}</p>", escape_html(&f.description));
    if with_element {
        let _ = writeln!(out, "<small>Element: {}</small>", escape_html(&f.element));
    }
    let _ = writeln!(out, "</div>");
}

fn write_detailed_item(out: &mut String, class: &str, f: &Finding) {
    let _ = writeln!(out, r#"<div class="{class}">"#);
    let _ = writeln!(out, "<h3>{}</h3>", escape_html(&f.title));
    let _ = writeln!(
        out,
        "<p><strong>Description:</strong> {}</p>",
        escape_html(&f.description)
    );
    let _ = writeln!(
        out,
        "<p><strong>Element:</strong> <code>{}</code></p>",
        escape_html(&f.element)
    );
    if let Some(selector) = &f.selector {
        let _ = writeln!(
            out,
            "<p><strong>Selector:</strong> <code>{}</code></p>",
            escape_html(selector)
        );
    }
    let _ = writeln!(
        out,
        "<p><strong>WCAG Guideline:</strong> {}</p>",
        escape_html(&guidance::guideline_label(&f.title))
    );
    let _ = writeln!(
        out,
        "<p><strong>Recommendation:</strong> {}</p>",
        escape_html(guidance::suggestion(&f.title))
    );
    let _ = writeln!(out, "</div>");
}
