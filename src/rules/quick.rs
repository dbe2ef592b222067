use anyhow::Result;
use kuchiki::NodeRef;

use crate::contrast::rgb_to_hex;
use crate::core::ResultSet;
use crate::dom::{attr, has_attr, tag_name};
use crate::rules::RuleContext;

pub(super) fn alt_text(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for img in ctx.select("img") {
        let hidden_from_at = has_attr(&img, "aria-hidden");
        match attr(&img, "alt") {
            None if !hidden_from_at => results.add_issue(ctx.observe(
                &img,
                "Missing Alt Text",
                "Image missing alt text for screen readers",
            )),
            Some(alt) if alt.is_empty() && !hidden_from_at => results.add_warning(ctx.observe(
                &img,
                "Empty Alt Text",
                "Image has empty alt text - ensure this is intentional",
            )),
            _ => results.add_passed(ctx.observe(
                &img,
                "Alt Text Present",
                "Image has appropriate alt text",
            )),
        }
    }
    Ok(())
}

pub(super) fn heading_structure(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    let headings = ctx.select("h1, h2, h3, h4, h5, h6");
    let mut previous_level = 0u32;

    for heading in &headings {
        let Some(level) = heading_level(heading) else {
            continue;
        };
        if level == 1 && previous_level > 0 {
            results.add_warning(ctx.observe(
                heading,
                "Multiple H1 Headings",
                "Multiple H1 headings found on the page",
            ));
        }
        if previous_level > 0 && level > previous_level + 1 {
            results.add_warning(ctx.observe(
                heading,
                "Heading Level Skipped",
                format!("Heading level skipped from H{previous_level} to H{level}"),
            ));
        }
        previous_level = level;
    }

    if headings.is_empty() && !ctx.is_scoped() {
        results.add_warning(ctx.observe_page(
            "document",
            "No Headings Found",
            "No heading elements found on the page",
        ));
    }
    Ok(())
}

fn heading_level(node: &NodeRef) -> Option<u32> {
    tag_name(node).strip_prefix('h')?.parse().ok()
}

pub(super) fn form_labels(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for input in ctx.select("input, textarea, select") {
        if attr(&input, "type").is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden")) {
            continue;
        }
        let labelled = has_associated_label(ctx, &input)
            || has_attr(&input, "aria-label")
            || has_attr(&input, "aria-labelledby");
        if labelled {
            results.add_passed(ctx.observe(
                &input,
                "Form Label Present",
                "Form input has proper labeling",
            ));
        } else {
            results.add_issue(ctx.observe(
                &input,
                "Missing Form Label",
                "Form input missing associated label",
            ));
        }
    }
    Ok(())
}

fn has_associated_label(ctx: &RuleContext<'_>, input: &NodeRef) -> bool {
    if let Some(id) = attr(input, "id").filter(|id| !id.is_empty()) {
        let explicit = ctx
            .doc
            .select("label[for]")
            .iter()
            .any(|label| attr(label, "for").as_deref() == Some(id.as_str()));
        if explicit {
            return true;
        }
    }
    input
        .ancestors()
        .any(|ancestor| tag_name(&ancestor) == "label")
}

pub(super) fn link_text(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for link in ctx.select("a[href]") {
        let text = link.text_contents();
        let text = text.trim();
        if text.is_empty() {
            results.add_issue(ctx.observe(&link, "Empty Link Text", "Link has no text content"));
        } else if is_generic_link_text(text) {
            results.add_warning(ctx.observe(
                &link,
                "Generic Link Text",
                "Link uses generic text that lacks context",
            ));
        } else {
            results.add_passed(ctx.observe(
                &link,
                "Descriptive Link Text",
                "Link has descriptive text content",
            ));
        }
    }
    Ok(())
}

fn is_generic_link_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower == "click here" || lower == "read more"
}

pub(super) fn color_contrast(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    let styles = ctx.doc.styles();
    for el in ctx.select("p, span, div, h1, h2, h3, h4, h5, h6") {
        let Some(color) = rgb_to_hex(&styles.computed_color(&el)) else {
            continue;
        };
        let Some(background) = rgb_to_hex(&styles.computed_background(&el)) else {
            continue;
        };
        if color == "#000000" || background == "#ffffff" {
            continue;
        }
        let ratio = ctx.options.formula.ratio(&color, &background);
        if ratio < ctx.options.contrast_threshold {
            results.add_warning(ctx.observe(
                &el,
                "Low Color Contrast",
                format!("Low color contrast ratio ({ratio:.2}:1)"),
            ));
        } else {
            results.add_passed(ctx.observe(
                &el,
                "Good Color Contrast",
                format!("Color contrast ratio is acceptable ({ratio:.2}:1)"),
            ));
        }
    }
    Ok(())
}

pub(super) fn aria_labels(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for el in ctx.select("[aria-label], [aria-labelledby]") {
        let empty_label = attr(&el, "aria-label").is_some_and(|label| label.trim().is_empty());
        let dangling_reference = attr(&el, "aria-labelledby").is_some_and(|ids| {
            ids.split_whitespace()
                .any(|id| ctx.doc.element_by_id(id).is_none())
        });

        if empty_label {
            results.add_warning(ctx.observe(&el, "Empty ARIA Label", "ARIA label is empty"));
        } else if dangling_reference {
            results.add_issue(ctx.observe(
                &el,
                "Invalid ARIA Label Reference",
                "ARIA-labelledby references non-existent element",
            ));
        } else {
            results.add_passed(ctx.observe(
                &el,
                "Valid ARIA Label",
                "ARIA label is properly implemented",
            ));
        }
    }
    Ok(())
}

pub(super) fn keyboard_access(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for el in ctx.select("button, a, input, select, textarea, [tabindex]") {
        if attr(&el, "tabindex").is_some_and(|t| t.trim() == "-1") {
            continue;
        }
        if ctx.is_hidden(&el) {
            continue;
        }
        let has_key_handler = ["onkeydown", "onkeyup", "onkeypress"]
            .iter()
            .any(|handler| has_attr(&el, handler));
        if tag_name(&el) == "div" && !has_key_handler {
            results.add_warning(ctx.observe(
                &el,
                "Potential Keyboard Accessibility Issue",
                "Interactive element may not be keyboard accessible",
            ));
        } else {
            results.add_passed(ctx.observe(
                &el,
                "Keyboard Accessible",
                "Element appears to be keyboard accessible",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contrast::ContrastFormula;
    use crate::rules::RuleOptions;
    use crate::rules::testing::{run, run_with, titles};

    #[test]
    fn alt_text_classifies_each_image_once() {
        let r = run(alt_text, r#"<img src="a.png">"#);
        assert_eq!(titles(&r.issues), vec!["Missing Alt Text"]);
        assert!(r.warnings.is_empty() && r.passed.is_empty());

        let r = run(alt_text, r#"<img src="a.png" alt="">"#);
        assert_eq!(titles(&r.warnings), vec!["Empty Alt Text"]);
        assert!(r.issues.is_empty() && r.passed.is_empty());

        let r = run(alt_text, r#"<img src="a.png" alt="x">"#);
        assert_eq!(titles(&r.passed), vec!["Alt Text Present"]);
        assert_eq!(r.total(), 1);

        let r = run(alt_text, r#"<img src="a.png" aria-hidden="true">"#);
        assert_eq!(titles(&r.passed), vec!["Alt Text Present"]);
    }

    #[test]
    fn alt_text_findings_carry_an_exact_selector() {
        let r = run(alt_text, r#"<p><img src="a.png" alt="a"></p><p><img src="b.png"></p>"#);
        assert_eq!(
            r.issues[0].selector.as_deref(),
            Some("html > body:nth-of-type(1) > p:nth-of-type(2) > img:nth-of-type(1)")
        );
        assert_eq!(r.issues[0].element, "img");
    }

    #[test]
    fn heading_skip_is_reported_once() {
        let r = run(heading_structure, "<h1>a</h1><h3>b</h3>");
        assert_eq!(titles(&r.warnings), vec!["Heading Level Skipped"]);
        assert_eq!(r.warnings[0].description, "Heading level skipped from H1 to H3");
    }

    #[test]
    fn heading_structure_flags_repeated_h1_and_missing_headings() {
        let r = run(heading_structure, "<h1>a</h1><h2>b</h2><h1>c</h1>");
        assert_eq!(titles(&r.warnings), vec!["Multiple H1 Headings"]);

        let r = run(heading_structure, "<p>no headings</p>");
        assert_eq!(titles(&r.warnings), vec!["No Headings Found"]);
        assert_eq!(r.warnings[0].element, "document");
        assert!(r.warnings[0].selector.is_none());
    }

    #[test]
    fn form_labels_accept_for_wrapping_and_aria() {
        let html = r#"
            <label for="a">A</label><input id="a">
            <label>B <input></label>
            <input aria-label="C">
            <select></select>
            <input type="hidden" name="token">
        "#;
        let r = run(form_labels, html);
        assert_eq!(r.passed.len(), 3);
        assert_eq!(titles(&r.issues), vec!["Missing Form Label"]);
        assert_eq!(r.issues[0].element, "select");
    }

    #[test]
    fn link_text_detects_empty_and_generic_links() {
        let r = run(
            link_text,
            r#"<a href="/a"> </a><a href="/b">Click HERE</a><a href="/c">Pricing</a><a>no href</a>"#,
        );
        assert_eq!(titles(&r.issues), vec!["Empty Link Text"]);
        assert_eq!(titles(&r.warnings), vec!["Generic Link Text"]);
        assert_eq!(titles(&r.passed), vec!["Descriptive Link Text"]);
    }

    #[test]
    fn color_contrast_skips_default_black_and_white() {
        let html = r#"
            <p style="color:#777777;background-color:#888888">low</p>
            <p style="color:#ffffff;background-color:#000080">good</p>
            <p style="background-color:#eeeeee">black text</p>
            <p style="color:#777777">transparent background</p>
            <p style="color:#777777;background-color:#ffffff">white background</p>
        "#;
        let r = run(color_contrast, html);
        assert_eq!(titles(&r.warnings), vec!["Low Color Contrast"]);
        assert!(r.warnings[0].description.starts_with("Low color contrast ratio ("));
        assert_eq!(titles(&r.passed), vec!["Good Color Contrast"]);
    }

    #[test]
    fn color_contrast_resolves_named_and_hsl_colors() {
        let html = r#"
            <p style="color: lightslategray; background-color: silver">named</p>
            <p style="color: hsl(0, 0%, 47%); background: hsl(0, 0%, 53%)">hsl</p>
            <p style="color: white; background-color: midnightblue">good</p>
        "#;
        let r = run(color_contrast, html);
        assert_eq!(titles(&r.warnings), vec!["Low Color Contrast", "Low Color Contrast"]);
        assert_eq!(titles(&r.passed), vec!["Good Color Contrast"]);
    }

    #[test]
    fn color_contrast_honours_formula_and_threshold() {
        let html = r#"<p style="color:#777777;background-color:#fefefe">x</p>"#;
        let perceptual = run(color_contrast, html);
        assert_eq!(perceptual.warnings.len(), 1);

        let options = RuleOptions {
            formula: ContrastFormula::Wcag,
            contrast_threshold: 3.0,
            ..RuleOptions::default()
        };
        let wcag = run_with(color_contrast, html, &options);
        assert_eq!(wcag.passed.len(), 1);
    }

    #[test]
    fn aria_labels_check_empty_labels_and_references() {
        let html = r#"
            <span id="name">Name</span>
            <button aria-label="  ">x</button>
            <button aria-labelledby="missing">y</button>
            <button aria-labelledby="name">z</button>
            <button aria-label="Close">w</button>
        "#;
        let r = run(aria_labels, html);
        assert_eq!(titles(&r.warnings), vec!["Empty ARIA Label"]);
        assert_eq!(titles(&r.issues), vec!["Invalid ARIA Label Reference"]);
        assert_eq!(r.passed.len(), 2);
    }

    #[test]
    fn keyboard_access_flags_focusable_divs_without_handlers() {
        let html = r#"
            <div tabindex="0">custom</div>
            <div tabindex="0" onkeydown="go()">handled</div>
            <div tabindex="-1">skipped</div>
            <button style="display:none">hidden</button>
            <button>ok</button>
        "#;
        let r = run(keyboard_access, html);
        assert_eq!(
            titles(&r.warnings),
            vec!["Potential Keyboard Accessibility Issue"]
        );
        assert_eq!(r.passed.len(), 2);
    }
}
