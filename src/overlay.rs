//! Highlight boxes and tooltips drawn over a scanned page.
//!
//! Planning is pure ([`plan`] then [`resolve`]); [`Overlay`] is the thin
//! adapter that turns draw commands into nodes inside one container element.

use std::fmt;
use std::str::FromStr;

use kuchiki::NodeRef;
use serde::{Deserialize, Serialize};

use crate::core::{Finding, ResultSet};
use crate::dom::{self, Document};
use crate::report::escape_html;
use crate::store::ColorScheme;

pub const OVERLAY_SELECTOR: &str = ".a11y-overlay";
const OVERLAY_CLASS: &str = "a11y-overlay";
const DRAWN_SELECTOR: &str = ".a11y-highlight, .a11y-tooltip";
/// Tooltips sit this many pixels above their box.
pub const TOOLTIP_OFFSET: f64 = 40.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightFilter {
    #[default]
    All,
    Issues,
    Warnings,
}

impl HighlightFilter {
    pub const fn as_str(self) -> &'static str {
        match self {
            HighlightFilter::All => "all",
            HighlightFilter::Issues => "issues",
            HighlightFilter::Warnings => "warnings",
        }
    }

    fn includes_issues(self) -> bool {
        matches!(self, HighlightFilter::All | HighlightFilter::Issues)
    }

    fn includes_warnings(self) -> bool {
        matches!(self, HighlightFilter::All | HighlightFilter::Warnings)
    }
}

impl fmt::Display for HighlightFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(HighlightFilter::All),
            "issues" => Ok(HighlightFilter::Issues),
            "warnings" => Ok(HighlightFilter::Warnings),
            other => Err(format!(
                "invalid highlight type: {other} (expected all|issues|warnings)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Error,
    Warning,
}

impl HighlightKind {
    pub const fn class(self) -> &'static str {
        match self {
            HighlightKind::Error => "error",
            HighlightKind::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightTarget {
    pub kind: HighlightKind,
    /// Exact element path when the finding carries one.
    pub selector: Option<String>,
    /// Bare tag name, used when there is no selector.
    pub element: String,
    pub label: String,
}

impl HighlightTarget {
    fn from_finding(kind: HighlightKind, f: &Finding) -> Self {
        Self {
            kind,
            selector: f.selector.clone(),
            element: f.element.clone(),
            label: f.description.clone(),
        }
    }
}

/// Issues then warnings, filtered.
pub fn plan(results: &ResultSet, filter: HighlightFilter) -> Vec<HighlightTarget> {
    let mut targets = Vec::new();
    if filter.includes_issues() {
        targets.extend(
            results
                .issues
                .iter()
                .map(|f| HighlightTarget::from_finding(HighlightKind::Error, f)),
        );
    }
    if filter.includes_warnings() {
        targets.extend(
            results
                .warnings
                .iter()
                .map(|f| HighlightTarget::from_finding(HighlightKind::Warning, f)),
        );
    }
    targets
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BoxRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxRect {
    /// Box from declared geometry: offsets accumulate over the ancestors and
    /// undeclared sizes are zero.
    pub fn of(doc: &Document, node: &NodeRef) -> Self {
        let styles = doc.styles();
        let (left, top) = node
            .inclusive_ancestors()
            .fold((0.0, 0.0), |(left, top), n| {
                (
                    left + styles.offset(&n, "left").unwrap_or(0.0),
                    top + styles.offset(&n, "top").unwrap_or(0.0),
                )
            });
        Self {
            left,
            top,
            width: styles.dimension(node, "width").unwrap_or(0.0),
            height: styles.dimension(node, "height").unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DrawCommand {
    Highlight { kind: HighlightKind, rect: BoxRect },
    Tooltip { text: String, left: f64, top: f64 },
}

/// Finds each target in the page and emits a box plus its tooltip. Targets
/// that no longer match anything are skipped.
pub fn resolve(doc: &Document, targets: &[HighlightTarget]) -> Vec<DrawCommand> {
    let mut commands = Vec::with_capacity(targets.len() * 2);
    for target in targets {
        let node = target
            .selector
            .as_deref()
            .and_then(|sel| doc.select_first(sel))
            .or_else(|| doc.select_first(&target.element));
        let Some(node) = node else {
            tracing::debug!(element = %target.element, "highlight target not found");
            continue;
        };
        let rect = BoxRect::of(doc, &node);
        commands.push(DrawCommand::Highlight {
            kind: target.kind,
            rect,
        });
        commands.push(DrawCommand::Tooltip {
            text: target.label.clone(),
            left: rect.left,
            top: rect.top - TOOLTIP_OFFSET,
        });
    }
    commands
}

/// Owns the overlay container of one page and the nodes drawn into it.
#[derive(Debug, Default)]
pub struct Overlay {
    colors: ColorScheme,
    container: Option<NodeRef>,
    drawn: Vec<NodeRef>,
}

impl Overlay {
    pub fn new(colors: ColorScheme) -> Self {
        Self {
            colors,
            container: None,
            drawn: Vec::new(),
        }
    }

    /// Adopts an overlay already present in `doc`, so a page written out with
    /// highlights can be cleared later.
    pub fn attach(doc: &Document, colors: ColorScheme) -> Self {
        let container = doc.select_first(OVERLAY_SELECTOR);
        let drawn = container
            .as_ref()
            .map(|c| dom::select_within(c, DRAWN_SELECTOR))
            .unwrap_or_default();
        Self {
            colors,
            container,
            drawn,
        }
    }

    pub fn drawn(&self) -> usize {
        self.drawn.len()
    }

    /// Clears, then draws every planned target. Returns the number of nodes
    /// drawn (a box and a tooltip per resolved target).
    pub fn highlight(&mut self, doc: &Document, results: &ResultSet, filter: HighlightFilter) -> usize {
        self.clear_highlights();
        let commands = resolve(doc, &plan(results, filter));
        let Some(container) = self.ensure_container(doc) else {
            return 0;
        };
        for command in &commands {
            for node in dom::parse_fragment(&self.render_command(command)) {
                container.append(node.clone());
                self.drawn.push(node);
            }
        }
        tracing::debug!(filter = %filter, drawn = self.drawn.len(), "highlights drawn");
        self.drawn.len()
    }

    pub fn clear_highlights(&mut self) {
        for node in self.drawn.drain(..) {
            node.detach();
        }
    }

    fn ensure_container(&mut self, doc: &Document) -> Option<NodeRef> {
        if let Some(container) = &self.container {
            if container.parent().is_some() {
                return Some(container.clone());
            }
        }
        let host = doc
            .body()
            .or_else(|| doc.document_element())
            .unwrap_or_else(|| doc.root().clone());
        let html = format!(
            r#"<div class="{OVERLAY_CLASS}" aria-hidden="true"><style>{}</style></div>"#,
            self.css()
        );
        let container = dom::parse_fragment(&html)
            .into_iter()
            .find(|n| n.as_element().is_some())?;
        host.append(container.clone());
        self.container = Some(container.clone());
        Some(container)
    }

    fn render_command(&self, command: &DrawCommand) -> String {
        match command {
            DrawCommand::Highlight { kind, rect } => format!(
                r#"<div class="a11y-highlight {}" style="left: {}px; top: {}px; width: {}px; height: {}px;"></div>"#,
                kind.class(),
                rect.left,
                rect.top,
                rect.width,
                rect.height
            ),
            DrawCommand::Tooltip { text, left, top } => format!(
                r#"<div class="a11y-tooltip" style="left: {left}px; top: {top}px;">{}</div>"#,
                escape_html(text)
            ),
        }
    }

    fn css(&self) -> String {
        format!(
            ".a11y-overlay {{ position: absolute; top: 0; left: 0; pointer-events: none; z-index: 2147483646; }}\n\
             .a11y-highlight {{ position: absolute; border: 3px solid; border-radius: 4px; box-sizing: border-box; }}\n\
             .a11y-highlight.error {{ border-color: {error}; background: rgba(239, 68, 68, 0.1); }}\n\
             .a11y-highlight.warning {{ border-color: {warning}; background: rgba(245, 158, 11, 0.1); }}\n\
             .a11y-tooltip {{ position: absolute; max-width: 300px; padding: 8px 12px; background: #1f2937; color: #ffffff; font: 12px/1.4 sans-serif; border-radius: 6px; }}",
            error = self.colors.error,
            warning = self.colors.warning,
        )
    }
}
