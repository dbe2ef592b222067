//! WCAG references and remediation advice keyed by finding title.

use serde::Serialize;

use crate::core::{Finding, ResultSet};

pub const UNKNOWN_GUIDELINE: &str = "WCAG Guideline not specified";
pub const DEFAULT_SUGGESTION: &str =
    "Review the element against WCAG guidelines and make necessary improvements.";

pub const RECOMMENDATIONS: [&str; 7] = [
    "Address all critical issues first as they have the most significant impact on accessibility",
    "Review warnings and consider implementing suggested improvements",
    "Test your website with screen readers like NVDA, JAWS, or VoiceOver",
    "Ensure keyboard navigation works properly throughout your site",
    "Test color contrast using tools like WebAIM Contrast Checker",
    "Consider conducting user testing with people with disabilities",
    "Regular accessibility audits should be part of your development process",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Principle {
    Perceivable,
    Operable,
    Understandable,
    Robust,
}

impl Principle {
    pub const ALL: [Principle; 4] = [
        Principle::Perceivable,
        Principle::Operable,
        Principle::Understandable,
        Principle::Robust,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Principle::Perceivable => "Perceivable",
            Principle::Operable => "Operable",
            Principle::Understandable => "Understandable",
            Principle::Robust => "Robust",
        }
    }

    pub const fn summary(self) -> &'static str {
        match self {
            Principle::Perceivable => {
                "Information and user interface components must be presentable to users in ways they can perceive."
            }
            Principle::Operable => "User interface components and navigation must be operable.",
            Principle::Understandable => {
                "Information and the operation of user interface must be understandable."
            }
            Principle::Robust => {
                "Content must be robust enough that it can be interpreted reliably by a wide variety of user agents."
            }
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code.split('.').next()? {
            "1" => Some(Principle::Perceivable),
            "2" => Some(Principle::Operable),
            "3" => Some(Principle::Understandable),
            "4" => Some(Principle::Robust),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guidance {
    pub code: &'static str,
    pub name: &'static str,
    pub suggestion: &'static str,
}

impl Guidance {
    pub fn label(&self) -> String {
        format!("WCAG {} - {}", self.code, self.name)
    }

    pub fn principle(&self) -> Option<Principle> {
        Principle::from_code(self.code)
    }
}

const fn g(code: &'static str, name: &'static str, suggestion: &'static str) -> Guidance {
    Guidance {
        code,
        name,
        suggestion,
    }
}

const NON_TEXT: &str = "Non-text Content";
const INFO_REL: &str = "Info and Relationships";
const LABELS: &str = "Labels or Instructions";
const LINK_PURPOSE: &str = "Link Purpose (In Context)";
const CONTRAST: &str = "Contrast (Minimum)";
const NAME_ROLE: &str = "Name, Role, Value";
const KEYBOARD: &str = "Keyboard";

pub fn lookup(title: &str) -> Option<Guidance> {
    let guidance = match title {
        "Missing Alt Text" => g(
            "1.1.1",
            NON_TEXT,
            "Add descriptive alt text to all images. If the image is decorative, use alt=\"\" with an empty string.",
        ),
        "Empty Alt Text" => g(
            "1.1.1",
            NON_TEXT,
            "Ensure empty alt text is only used for decorative images. For informative images, add descriptive text.",
        ),
        "Alt Text Present" => g("1.1.1", NON_TEXT, "Keep alt text accurate when images change."),
        "Missing Form Label" => g(
            "3.3.2",
            LABELS,
            "Add a label element associated with the form input using the \"for\" attribute, or wrap the input in a label.",
        ),
        "Form Label Present" => g("3.3.2", LABELS, "Keep labels visible and descriptive."),
        "Empty Link Text" => g(
            "2.4.4",
            LINK_PURPOSE,
            "Add descriptive text to the link that explains its destination or purpose.",
        ),
        "Generic Link Text" => g(
            "2.4.4",
            LINK_PURPOSE,
            "Replace generic text like \"click here\" with descriptive text that indicates the link's purpose.",
        ),
        "Descriptive Link Text" => g("2.4.4", LINK_PURPOSE, "Keep link text unique within a page."),
        "Low Color Contrast" => g(
            "1.4.3",
            CONTRAST,
            "Increase the contrast ratio between text and background colors to at least 4.5:1 for normal text.",
        ),
        "Good Color Contrast" => g("1.4.3", CONTRAST, "Re-check contrast after theme changes."),
        "Empty ARIA Label" => g(
            "4.1.2",
            NAME_ROLE,
            "Provide meaningful text in ARIA labels or ensure empty labels are intentional.",
        ),
        "Invalid ARIA Label Reference" => g(
            "4.1.2",
            NAME_ROLE,
            "Ensure the referenced element exists and has appropriate content.",
        ),
        "Valid ARIA Label" => g("4.1.2", NAME_ROLE, "Prefer visible labels where possible."),
        "Missing Language Attribute" => g(
            "3.1.1",
            "Language of Page",
            "Add a lang attribute to the HTML element to specify the page language.",
        ),
        "Missing iframe Title" => g(
            "2.4.1",
            "Bypass Blocks",
            "Add a descriptive title attribute to all iframe elements.",
        ),
        "Missing Table Header Scope" => g(
            "1.3.1",
            INFO_REL,
            "Add scope attributes to table headers to indicate whether they apply to rows or columns.",
        ),
        "Missing Video Captions" => g(
            "1.2.2",
            "Captions (Prerecorded)",
            "Add caption tracks to all video content to make it accessible to deaf and hard-of-hearing users.",
        ),
        "Missing Audio Description" => g(
            "1.2.3",
            "Audio Description or Media Alternative",
            "Add audio descriptions or provide a text alternative for audio content.",
        ),
        "Multiple H1 Headings" => g(
            "1.3.1",
            INFO_REL,
            "Use a single H1 for the page title and H2-H6 for sections.",
        ),
        "Heading Level Skipped" => g(
            "1.3.1",
            INFO_REL,
            "Nest headings in order without skipping levels.",
        ),
        "No Headings Found" => g(
            "2.4.6",
            "Headings and Labels",
            "Add headings that describe the structure of the page.",
        ),
        "Potential Keyboard Accessibility Issue" => g(
            "2.1.1",
            KEYBOARD,
            "Use a native button or link, or add keyboard handlers and an appropriate role.",
        ),
        "Keyboard Accessible" => g("2.1.1", KEYBOARD, "Verify the focus order matches the visual order."),
        "Semantic HTML Used" => g("1.3.1", INFO_REL, "Keep landmarks unique and labelled."),
        "No Landmark Roles" => g(
            "1.3.1",
            INFO_REL,
            "Add landmark roles such as banner, navigation, main and contentinfo.",
        ),
        "No Focusable Elements" => g(
            "2.1.1",
            KEYBOARD,
            "Make interactive content reachable with the keyboard.",
        ),
        "No Skip Links" => g(
            "2.4.1",
            "Bypass Blocks",
            "Add a \"skip to main content\" link at the top of the page.",
        ),
        "Missing Viewport Meta" => g(
            "1.4.10",
            "Reflow",
            "Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">.",
        ),
        "Small Touch Target" => g(
            "2.5.5",
            "Target Size",
            "Make touch targets at least 44 by 44 CSS pixels.",
        ),
        "Missing Table Caption" => g(
            "1.3.1",
            INFO_REL,
            "Add a caption element describing the table contents.",
        ),
        "Complex Content" => g(
            "3.1.5",
            "Reading Level",
            "Break long passages into shorter paragraphs, lists or summaries.",
        ),
        "Animated Content" => g(
            "2.3.1",
            "Three Flashes or Below Threshold",
            "Avoid flashing content and honour prefers-reduced-motion.",
        ),
        _ => return None,
    };
    Some(guidance)
}

pub fn guideline_label(title: &str) -> String {
    lookup(title)
        .map(|g| g.label())
        .unwrap_or_else(|| UNKNOWN_GUIDELINE.to_string())
}

pub fn suggestion(title: &str) -> &'static str {
    lookup(title).map(|g| g.suggestion).unwrap_or(DEFAULT_SUGGESTION)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrincipleStat {
    pub principle: Principle,
    pub passed: usize,
    pub total: usize,
}

impl PrincipleStat {
    /// Pass rate in percent, or `None` when no finding maps to the principle.
    pub fn rate(&self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        Some(((self.passed as f64 / self.total as f64) * 100.0).round() as u32)
    }
}

/// Per-principle pass rates over every finding with a known guideline.
pub fn principle_overview(results: &ResultSet) -> Vec<PrincipleStat> {
    let mut stats: Vec<PrincipleStat> = Principle::ALL
        .iter()
        .map(|&principle| PrincipleStat {
            principle,
            passed: 0,
            total: 0,
        })
        .collect();

    let mut tally = |finding: &Finding, passed: bool| {
        let Some(principle) = lookup(&finding.title).and_then(|g| g.principle()) else {
            return;
        };
        if let Some(stat) = stats.iter_mut().find(|s| s.principle == principle) {
            stat.total += 1;
            if passed {
                stat.passed += 1;
            }
        }
    };
    for f in results.problems() {
        tally(f, false);
    }
    for f in &results.passed {
        tally(f, true);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Observation;

    #[test]
    fn known_titles_map_to_guidelines() {
        assert_eq!(
            guideline_label("Missing Alt Text"),
            "WCAG 1.1.1 - Non-text Content"
        );
        assert_eq!(
            lookup("Missing Language Attribute").and_then(|g| g.principle()),
            Some(Principle::Understandable)
        );
        assert_eq!(guideline_label("Something Else"), UNKNOWN_GUIDELINE);
        assert_eq!(suggestion("Something Else"), DEFAULT_SUGGESTION);
    }

    #[test]
    fn every_builtin_problem_title_has_guidance_except_large_image() {
        for title in [
            "Missing Alt Text",
            "Heading Level Skipped",
            "Missing Form Label",
            "Generic Link Text",
            "Low Color Contrast",
            "Invalid ARIA Label Reference",
            "Potential Keyboard Accessibility Issue",
            "No Landmark Roles",
            "No Skip Links",
            "Missing iframe Title",
            "Small Touch Target",
            "Missing Table Caption",
            "Missing Video Captions",
            "Complex Content",
            "Animated Content",
        ] {
            assert!(lookup(title).is_some(), "{title}");
        }
        assert!(lookup("Large Image").is_none());
    }

    #[test]
    fn overview_is_deterministic_per_principle() {
        let mut results = ResultSet::at("t");
        results.add_issue(Observation::new("Missing Alt Text", "d", "img"));
        results.add_passed(Observation::new("Alt Text Present", "d", "img"));
        results.add_passed(Observation::new("Alt Text Present", "d", "img"));
        results.add_warning(Observation::new("No Skip Links", "d", "document"));
        results.add_warning(Observation::new("Large Image", "d", "img"));

        let overview = principle_overview(&results);
        assert_eq!(overview[0].principle, Principle::Perceivable);
        assert_eq!((overview[0].passed, overview[0].total), (2, 3));
        assert_eq!(overview[0].rate(), Some(67));
        assert_eq!(overview[1].rate(), Some(0));
        assert_eq!(overview[2].rate(), None);
        assert_eq!(principle_overview(&results), overview);
    }
}
