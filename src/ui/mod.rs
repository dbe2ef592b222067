use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::core::{Finding, ResultSet, ScanRecord, Severity};
use crate::engine::RuleFailure;
use crate::store::Settings;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(stderr, "  - rerun with `--verbose` for diagnostics");
    let _ = writeln!(
        stderr,
        "  - see `a11y-inspector --help` for commands and options"
    );
}

/// One-line completion notice, shown when notifications are enabled.
pub fn notify(cfg: &UiConfig, settings: &Settings, results: &ResultSet) {
    if cfg.quiet || !settings.show_notifications {
        return;
    }
    let mut stderr = io::stderr().lock();
    let _ = writeln!(
        stderr,
        "Accessibility scan complete: found {} issues and {} warnings",
        results.issues.len(),
        results.warnings.len()
    );
}

pub fn print_scan(label: &str, results: &ResultSet, failed: &[RuleFailure], cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_scan(&mut out, label, results, failed, cfg);
}

pub fn write_scan(
    out: &mut dyn Write,
    label: &str,
    results: &ResultSet,
    failed: &[RuleFailure],
    cfg: &UiConfig,
) {
    let _ = writeln!(
        out,
        "{label}: score {}/100  issues={}  warnings={}  passed={}",
        results.score(),
        results.issues.len(),
        results.warnings.len(),
        results.passed.len()
    );

    let problems: Vec<&Finding> = results.problems().collect();
    if problems.is_empty() {
        let _ = writeln!(out, "No issues or warnings.");
    } else {
        let rows = cfg.max_table_rows.min(problems.len());
        let _ = writeln!(out);
        if problems.len() > rows {
            let _ = writeln!(out, "Findings ({rows} of {} shown):", problems.len());
        } else {
            let _ = writeln!(out, "Findings:");
        }
        write_findings_table(out, &problems, rows, cfg.color);
    }

    for failure in failed {
        let _ = writeln!(out, "rule {} failed: {}", failure.rule, failure.message);
    }
}

pub struct PageRow<'a> {
    pub label: String,
    pub results: Option<&'a ResultSet>,
    pub error: Option<String>,
}

/// Per-page overview of a batch scan.
pub fn write_batch(out: &mut dyn Write, rows: &[PageRow<'_>]) {
    let label_page = "page";
    let page_w = rows
        .iter()
        .map(|r| visible_width_ansi(&r.label))
        .max()
        .unwrap_or(0)
        .max(label_page.len())
        .min(60);

    let _ = writeln!(
        out,
        "{}  {}  {}  {}  {}",
        pad_end_display(label_page, page_w),
        pad_start_display("score", 5),
        pad_start_display("issues", 6),
        pad_start_display("warnings", 8),
        pad_start_display("passed", 6),
    );
    let _ = writeln!(
        out,
        "{}  {}  {}  {}  {}",
        "-".repeat(page_w),
        "-".repeat(5),
        "-".repeat(6),
        "-".repeat(8),
        "-".repeat(6)
    );
    for row in rows {
        let page = pad_end_display(&truncate_middle(&row.label, page_w), page_w);
        match (row.results, &row.error) {
            (Some(r), _) => {
                let _ = writeln!(
                    out,
                    "{page}  {}  {}  {}  {}",
                    pad_start_display(&r.score().to_string(), 5),
                    pad_start_display(&r.issues.len().to_string(), 6),
                    pad_start_display(&r.warnings.len().to_string(), 8),
                    pad_start_display(&r.passed.len().to_string(), 6),
                );
            }
            (None, err) => {
                let _ = writeln!(
                    out,
                    "{page}  failed: {}",
                    err.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
}

pub fn print_history(records: &[ScanRecord], cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    if records.is_empty() {
        let _ = writeln!(out, "No scans recorded yet.");
        return;
    }
    let rows: Vec<PageRow<'_>> = records
        .iter()
        .map(|r| PageRow {
            label: format!("{}  {}", r.timestamp, r.url),
            results: Some(&r.results),
            error: None,
        })
        .collect();
    write_batch(&mut out, &rows);
}

fn truncate_middle(s: &str, max_chars: usize) -> String {
    let len = s.chars().count();
    if len <= max_chars {
        return s.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let left = keep / 2;
    let right = keep.saturating_sub(left);

    let prefix: String = s.chars().take(left).collect();
    let suffix: String = s
        .chars()
        .rev()
        .take(right)
        .collect::<String>()
        .chars()
        .rev()
        .collect();

    format!("{prefix}...{suffix}")
}

fn write_findings_table(out: &mut dyn Write, findings: &[&Finding], rows: usize, color: bool) {
    let label_sev = "severity";
    let label_el = "element";
    let label_title = "title";

    let sev_w = visible_width_ansi(label_sev);
    let el_w = findings
        .iter()
        .take(rows)
        .map(|f| visible_width_ansi(&f.element))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_el))
        .min(16);

    let _ = writeln!(
        out,
        "{}  {}  {}",
        pad_end_display(label_sev, sev_w),
        pad_end_display(label_el, el_w),
        label_title
    );
    let _ = writeln!(
        out,
        "{}  {}  {}",
        "-".repeat(sev_w),
        "-".repeat(el_w),
        "-".repeat(label_title.len())
    );

    for finding in findings.iter().take(rows) {
        let sev = pad_end_ansi(&format_severity(finding.severity, color), sev_w);
        let el = pad_end_display(&truncate_middle(&finding.element, el_w), el_w);
        let _ = writeln!(out, "{sev}  {el}  {}", finding.title);
    }
}

fn format_severity(severity: Option<Severity>, color: bool) -> String {
    let (label, code) = match severity {
        Some(Severity::Error) => ("error", "31"),
        Some(Severity::Warning) => ("warning", "33"),
        None => ("passed", "32"),
    };
    if !color {
        return label.to_string();
    }
    format!("\x1b[{code}m{label}\x1b[0m")
}

fn pad_end_ansi(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_end_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_start_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{}{}", " ".repeat(width - w), s)
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Observation;

    fn cfg(rows: usize) -> UiConfig {
        UiConfig {
            color: false,
            stdin_is_tty: false,
            stdout_is_tty: false,
            stderr_is_tty: false,
            max_table_rows: rows,
            quiet: false,
            verbose: false,
        }
    }

    #[test]
    fn scan_summary_caps_rows_and_lists_failures() {
        let mut r = ResultSet::at("t");
        r.add_issue(Observation::new("Missing Alt Text", "d", "img"));
        r.add_warning(Observation::new("No Skip Links", "d", "document"));
        r.add_passed(Observation::new("Form Label Present", "d", "input"));
        let failed = vec![RuleFailure {
            rule: "color-contrast".into(),
            message: "panicked: boom".into(),
        }];

        let mut out = Vec::new();
        write_scan(&mut out, "page.html", &r, &failed, &cfg(1));
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("page.html: score 33/100  issues=1  warnings=1  passed=1"));
        assert!(text.contains("Findings (1 of 2 shown):"));
        assert!(text.contains("error     img      Missing Alt Text"));
        assert!(!text.contains("No Skip Links"));
        assert!(text.contains("rule color-contrast failed: panicked: boom"));
    }

    #[test]
    fn width_ignores_ansi_and_counts_wide_chars() {
        assert_eq!(visible_width_ansi("\x1b[31merror\x1b[0m"), 5);
        assert_eq!(visible_width_ansi("画像"), 4);
        assert_eq!(truncate_middle("abcdefghij", 7), "ab...ij");
    }

    #[test]
    fn batch_rows_show_failures_inline() {
        let r = ResultSet::at("t");
        let rows = vec![
            PageRow {
                label: "a.html".into(),
                results: Some(&r),
                error: None,
            },
            PageRow {
                label: "b.html".into(),
                results: None,
                error: Some("unreadable".into()),
            },
        ];
        let mut out = Vec::new();
        write_batch(&mut out, &rows);
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("a.html      0       0         0       0"));
        assert!(text.contains("b.html  failed: unreadable"));
    }
}
