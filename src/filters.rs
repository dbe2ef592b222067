//! Document-level visual simulation modes. At most one is active at a time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dom::{self, Document};

const FILTER_STYLE_ID: &str = "a11y-filter-style";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualFilter {
    Protanopia,
    Deuteranopia,
    Tritanopia,
    HighContrast,
    LargeText,
    ReducedMotion,
}

impl VisualFilter {
    pub const ALL: [VisualFilter; 6] = [
        VisualFilter::Protanopia,
        VisualFilter::Deuteranopia,
        VisualFilter::Tritanopia,
        VisualFilter::HighContrast,
        VisualFilter::LargeText,
        VisualFilter::ReducedMotion,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            VisualFilter::Protanopia => "protanopia",
            VisualFilter::Deuteranopia => "deuteranopia",
            VisualFilter::Tritanopia => "tritanopia",
            VisualFilter::HighContrast => "high-contrast",
            VisualFilter::LargeText => "large-text",
            VisualFilter::ReducedMotion => "reduced-motion",
        }
    }

    /// Class set on `<body>` while the mode is active.
    pub const fn body_class(self) -> &'static str {
        match self {
            VisualFilter::Protanopia => "a11y-colorblind-protanopia",
            VisualFilter::Deuteranopia => "a11y-colorblind-deuteranopia",
            VisualFilter::Tritanopia => "a11y-colorblind-tritanopia",
            VisualFilter::HighContrast => "a11y-high-contrast",
            VisualFilter::LargeText => "a11y-large-text",
            VisualFilter::ReducedMotion => "a11y-reduced-motion",
        }
    }

    // Color matrices follow the common Machado-style simulation values.
    fn color_matrix(self) -> Option<&'static str> {
        match self {
            VisualFilter::Protanopia => Some(
                "0.567 0.433 0 0 0  0.558 0.442 0 0 0  0 0.242 0.758 0 0  0 0 0 1 0",
            ),
            VisualFilter::Deuteranopia => {
                Some("0.625 0.375 0 0 0  0.7 0.3 0 0 0  0 0.3 0.7 0 0  0 0 0 1 0")
            }
            VisualFilter::Tritanopia => {
                Some("0.95 0.05 0 0 0  0 0.433 0.567 0 0  0 0.475 0.525 0 0  0 0 0 1 0")
            }
            _ => None,
        }
    }

    fn css(self) -> String {
        let class = self.body_class();
        if let Some(matrix) = self.color_matrix() {
            let svg = format!(
                "<svg xmlns='http://www.w3.org/2000/svg'><filter id='f'><feColorMatrix type='matrix' values='{matrix}'/></filter></svg>"
            );
            return format!(
                "body.{class} {{ filter: url(\"data:image/svg+xml;utf8,{}#f\"); }}",
                svg.replace('#', "%23").replace('<', "%3C").replace('>', "%3E")
            );
        }
        match self {
            VisualFilter::HighContrast => format!(
                "body.{class} {{ filter: contrast(150%) brightness(110%); }}\n\
                 body.{class} * {{ background: #000000 !important; color: #ffffff !important; border-color: #ffffff !important; }}\n\
                 body.{class} a {{ color: #ffff00 !important; }}"
            ),
            VisualFilter::LargeText => format!(
                "body.{class} {{ font-size: 150% !important; }}\n\
                 body.{class} * {{ font-size: inherit !important; line-height: 1.6 !important; }}"
            ),
            _ => format!(
                "body.{class} *, body.{class} *::before, body.{class} *::after {{ animation: none !important; transition: none !important; scroll-behavior: auto !important; }}"
            ),
        }
    }
}

impl fmt::Display for VisualFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        VisualFilter::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "invalid filter: {wanted} (expected protanopia|deuteranopia|tritanopia|high-contrast|large-text|reduced-motion)"
                )
            })
    }
}

/// Activates `filter`, replacing whichever mode was active. Returns false when
/// the page has no `<body>`.
pub fn apply(doc: &mut Document, filter: VisualFilter) -> bool {
    let Some(body) = doc.body() else {
        return false;
    };
    clear(doc);
    let mut classes = dom::class_list(&body);
    classes.push(filter.body_class().to_string());
    dom::set_class_list(&body, &classes);

    let host = doc.head().unwrap_or_else(|| body.clone());
    let style = format!(r#"<style id="{FILTER_STYLE_ID}">{}</style>"#, filter.css());
    for node in dom::parse_fragment(&style) {
        host.append(node);
    }
    doc.refresh_styles();
    tracing::debug!(filter = %filter, "visual filter applied");
    true
}

/// Removes any active mode. Safe to call when none is active.
pub fn clear(doc: &mut Document) {
    if let Some(body) = doc.body() {
        let classes: Vec<String> = dom::class_list(&body)
            .into_iter()
            .filter(|c| !VisualFilter::ALL.iter().any(|f| f.body_class() == c))
            .collect();
        dom::set_class_list(&body, &classes);
    }
    if let Some(style) = doc.element_by_id(FILTER_STYLE_ID) {
        style.detach();
    }
    doc.refresh_styles();
}

pub fn active(doc: &Document) -> Option<VisualFilter> {
    let body = doc.body()?;
    let classes = dom::class_list(&body);
    VisualFilter::ALL
        .into_iter()
        .find(|f| classes.iter().any(|c| c == f.body_class()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str =
        r#"<html><head><title>t</title></head><body class="page"><p>x</p></body></html>"#;

    #[test]
    fn modes_are_mutually_exclusive() {
        let mut doc = Document::parse(PAGE);
        assert!(apply(&mut doc, VisualFilter::Protanopia));
        assert!(apply(&mut doc, VisualFilter::LargeText));

        let body = doc.body().expect("body");
        assert_eq!(dom::class_list(&body), vec!["page", "a11y-large-text"]);
        assert_eq!(active(&doc), Some(VisualFilter::LargeText));
        assert_eq!(doc.select(&format!("#{FILTER_STYLE_ID}")).len(), 1);
    }

    #[test]
    fn clear_restores_the_page() {
        let mut doc = Document::parse(PAGE);
        apply(&mut doc, VisualFilter::Tritanopia);
        assert!(doc.to_html().contains("feColorMatrix"));
        clear(&mut doc);
        clear(&mut doc);
        assert_eq!(active(&doc), None);
        assert!(!doc.to_html().contains(FILTER_STYLE_ID));
        assert_eq!(dom::class_list(&doc.body().expect("body")), vec!["page"]);
    }

    #[test]
    fn high_contrast_restyles_the_page() {
        let mut doc = Document::parse(
            r#"<html><head></head><body><p style="color: #777777">x</p></body></html>"#,
        );
        let p = doc.select_first("p").expect("p");
        assert_eq!(doc.styles().computed_color(&p), "rgb(119, 119, 119)");

        apply(&mut doc, VisualFilter::HighContrast);
        assert_eq!(doc.styles().computed_color(&p), "rgb(255, 255, 255)");
        assert_eq!(doc.styles().computed_background(&p), "rgb(0, 0, 0)");

        clear(&mut doc);
        assert_eq!(doc.styles().computed_color(&p), "rgb(119, 119, 119)");
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("high-contrast".parse(), Ok(VisualFilter::HighContrast));
        assert!("sepia".parse::<VisualFilter>().is_err());
        let json = serde_json::to_string(&VisualFilter::ReducedMotion).expect("json");
        assert_eq!(json, "\"reduced-motion\"");
    }
}
