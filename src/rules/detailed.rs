use anyhow::Result;
use kuchiki::NodeRef;

use crate::core::ResultSet;
use crate::dom::{attr, has_attr, select_within, style::inline_animates};
use crate::rules::RuleContext;

const LANDMARK_TAGS: [&str; 7] = ["main", "nav", "header", "footer", "article", "section", "aside"];
const MIN_TOUCH_TARGET_PX: f64 = 44.0;
const LARGE_IMAGE_PX: f64 = 2000.0;

pub(super) fn semantic_html(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for tag in LANDMARK_TAGS {
        if ctx.exists(tag) {
            results.add_passed(ctx.observe_page(
                tag,
                "Semantic HTML Used",
                &format!("Proper use of {tag} element"),
            ));
        }
    }

    if !ctx.is_scoped()
        && !ctx.exists(
            r#"[role="banner"], [role="navigation"], [role="main"], [role="complementary"], [role="contentinfo"]"#,
        )
    {
        results.add_warning(ctx.observe_page(
            "document",
            "No Landmark Roles",
            "No ARIA landmark roles found",
        ));
    }
    Ok(())
}

pub(super) fn focus_management(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    if ctx.is_scoped() {
        return Ok(());
    }
    if !ctx.exists(r#"a, button, input, select, textarea, [tabindex]:not([tabindex="-1"])"#) {
        results.add_warning(ctx.observe_page(
            "document",
            "No Focusable Elements",
            "No focusable elements found on the page",
        ));
    }
    if !ctx.exists(r##"a[href^="#"], a[href^="."]"##) {
        results.add_warning(ctx.observe_page(
            "document",
            "No Skip Links",
            "No skip links found for keyboard navigation",
        ));
    }
    Ok(())
}

pub(super) fn screen_reader(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for iframe in ctx.select("iframe") {
        let titled = attr(&iframe, "title").is_some_and(|t| !t.is_empty());
        if !titled {
            results.add_issue(ctx.observe(
                &iframe,
                "Missing iframe Title",
                "iframe missing title attribute for screen readers",
            ));
        }
    }

    for table in ctx.select("table") {
        let has_headers = !select_within(&table, "th").is_empty();
        let has_scope = !select_within(&table, "th[scope]").is_empty();
        if has_headers && !has_scope {
            results.add_warning(ctx.observe(
                &table,
                "Missing Table Header Scope",
                "Table headers missing scope attribute",
            ));
        }
    }
    Ok(())
}

pub(super) fn mobile(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    if !ctx.is_scoped() && ctx.doc.select_first(r#"meta[name="viewport"]"#).is_none() {
        results.add_warning(ctx.observe_page(
            "head",
            "Missing Viewport Meta",
            "No viewport meta tag found for mobile responsiveness",
        ));
    }

    for el in ctx.select("button, a, input, select, textarea") {
        if ctx.is_hidden(&el) {
            continue;
        }
        let Some(smallest) = smallest_declared_side(ctx, &el) else {
            continue;
        };
        if smallest < MIN_TOUCH_TARGET_PX {
            results.add_warning(ctx.observe(
                &el,
                "Small Touch Target",
                "Touch target smaller than recommended 44px minimum",
            ));
        }
    }
    Ok(())
}

/// Smaller of the declared width and height; a single declared side stands
/// in for the box when the other is unknown.
fn smallest_declared_side(ctx: &RuleContext<'_>, el: &NodeRef) -> Option<f64> {
    let styles = ctx.doc.styles();
    match (styles.dimension(el, "width"), styles.dimension(el, "height")) {
        (Some(w), Some(h)) => Some(w.min(h)),
        (Some(side), None) | (None, Some(side)) => Some(side),
        (None, None) => None,
    }
}

pub(super) fn performance(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    let styles = ctx.doc.styles();
    for img in ctx.select("img") {
        let oversized = ["width", "height"]
            .iter()
            .filter_map(|side| styles.dimension(&img, side))
            .any(|px| px > LARGE_IMAGE_PX);
        if oversized {
            results.add_warning(ctx.observe(
                &img,
                "Large Image",
                "Very large image may impact performance",
            ));
        }
    }
    Ok(())
}

pub(super) fn language(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    if ctx.is_scoped() {
        return Ok(());
    }
    let has_lang = ctx
        .doc
        .document_element()
        .is_some_and(|html| has_attr(&html, "lang"));
    if !has_lang {
        results.add_issue(ctx.observe_page(
            "html",
            "Missing Language Attribute",
            "HTML element missing lang attribute",
        ));
    }
    Ok(())
}

pub(super) fn table_captions(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for table in ctx.select("table") {
        let described = has_attr(&table, "summary")
            || !select_within(&table, "caption, summary").is_empty();
        if !described {
            results.add_warning(ctx.observe(
                &table,
                "Missing Table Caption",
                "Table missing caption or summary",
            ));
        }
    }
    Ok(())
}

pub(super) fn multimedia(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for video in ctx.select("video") {
        let captioned = select_within(&video, "track").iter().any(|track| {
            attr(track, "kind").is_some_and(|kind| {
                let kind = kind.trim().to_ascii_lowercase();
                kind == "captions" || kind == "subtitles"
            })
        });
        if !captioned {
            results.add_warning(ctx.observe(
                &video,
                "Missing Video Captions",
                "Video missing caption tracks",
            ));
        }
    }

    for audio in ctx.select("audio") {
        if !has_attr(&audio, "aria-label") && !has_attr(&audio, "aria-describedby") {
            results.add_warning(ctx.observe(
                &audio,
                "Missing Audio Description",
                "Audio missing description",
            ));
        }
    }
    Ok(())
}

pub(super) fn cognitive_load(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for el in ctx.select("div, span") {
        let text = el.text_contents();
        if is_complex_text(&text) {
            results.add_warning(ctx.observe(
                &el,
                "Complex Content",
                "Long text block may be difficult to process",
            ));
        }
    }
    Ok(())
}

fn is_complex_text(text: &str) -> bool {
    // UTF-16 code units, matching DOM string length.
    if text.encode_utf16().count() <= 200 {
        return false;
    }
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    sentences > 5
}

pub(super) fn seizure_safety(ctx: &RuleContext<'_>, results: &mut ResultSet) -> Result<()> {
    for el in ctx.select("[style]") {
        let Some(style) = attr(&el, "style") else {
            continue;
        };
        if inline_animates(&style) {
            results.add_warning(ctx.observe(
                &el,
                "Animated Content",
                "Animated content may affect users with photosensitivity",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{run, titles};

    #[test]
    fn semantic_html_passes_per_landmark_tag() {
        let r = run(
            semantic_html,
            r#"<header role="banner"></header><main><section></section><section></section></main>"#,
        );
        assert_eq!(r.passed.len(), 3);
        assert_eq!(r.passed[0].description, "Proper use of main element");
        assert!(r.warnings.is_empty());

        let r = run(semantic_html, "<div>plain</div>");
        assert_eq!(titles(&r.warnings), vec!["No Landmark Roles"]);
    }

    #[test]
    fn focus_management_requires_focusables_and_skip_links() {
        let r = run(focus_management, "<p>static</p>");
        assert_eq!(
            titles(&r.warnings),
            vec!["No Focusable Elements", "No Skip Links"]
        );

        let r = run(focus_management, r##"<a href="#main">Skip to content</a>"##);
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn screen_reader_checks_iframes_and_header_scope() {
        let html = r#"
            <iframe src="a"></iframe><iframe src="b" title="Map"></iframe>
            <table><tr><th>A</th></tr></table>
            <table><tr><th scope="col">A</th></tr></table>
        "#;
        let r = run(screen_reader, html);
        assert_eq!(titles(&r.issues), vec!["Missing iframe Title"]);
        assert_eq!(titles(&r.warnings), vec!["Missing Table Header Scope"]);
    }

    #[test]
    fn mobile_flags_viewport_and_small_declared_targets() {
        let html = r#"
            <button style="width: 30px; height: 60px">a</button>
            <button style="width: 48px; height: 48px">b</button>
            <a href="/x" height="20">c</a>
            <a href="/y">unknown size</a>
        "#;
        let r = run(mobile, html);
        assert_eq!(
            titles(&r.warnings),
            vec!["Missing Viewport Meta", "Small Touch Target", "Small Touch Target"]
        );

        let r = run(
            mobile,
            r#"<head><meta name="viewport" content="width=device-width"></head><body></body>"#,
        );
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn performance_flags_declared_oversized_images() {
        let r = run(
            performance,
            r#"<img src="a" width="2400"><img src="b" style="height: 2001px"><img src="c" width="2000">"#,
        );
        assert_eq!(r.warnings.len(), 2);
    }

    #[test]
    fn language_requires_lang_on_root() {
        let r = run(language, "<html><body></body></html>");
        assert_eq!(titles(&r.issues), vec!["Missing Language Attribute"]);
        assert_eq!(r.issues[0].element, "html");

        let r = run(language, r#"<html lang="en"><body></body></html>"#);
        assert!(r.issues.is_empty());
    }

    #[test]
    fn table_captions_accept_caption_or_summary_attribute() {
        let html = r#"
            <table><caption>Totals</caption><tr><td>1</td></tr></table>
            <table summary="Totals"><tr><td>1</td></tr></table>
            <table><tr><td>1</td></tr></table>
        "#;
        let r = run(table_captions, html);
        assert_eq!(titles(&r.warnings), vec!["Missing Table Caption"]);
    }

    #[test]
    fn multimedia_requires_caption_tracks_and_audio_descriptions() {
        let html = r#"
            <video src="a.mp4"></video>
            <video src="b.mp4"><track kind="captions" src="b.vtt"></video>
            <video src="c.mp4"><track kind="chapters" src="c.vtt"></video>
            <audio src="a.mp3"></audio>
            <audio src="b.mp3" aria-label="Interview"></audio>
        "#;
        let r = run(multimedia, html);
        assert_eq!(
            titles(&r.warnings),
            vec![
                "Missing Video Captions",
                "Missing Video Captions",
                "Missing Audio Description"
            ]
        );
    }

    #[test]
    fn complex_text_needs_length_and_many_sentences() {
        let long_few = "word ".repeat(60);
        assert!(!is_complex_text(&long_few));
        let long_many = "This is a sentence. ".repeat(12);
        assert!(is_complex_text(&long_many));
        assert!(!is_complex_text("A. B. C. D. E. F. G."));
    }

    #[test]
    fn complex_text_length_counts_utf16_units() {
        // 120 chars but 220 UTF-16 units.
        let text = "\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}. ".repeat(10);
        assert_eq!(text.chars().count(), 120);
        assert_eq!(text.encode_utf16().count(), 220);
        assert!(is_complex_text(&text));
    }

    #[test]
    fn seizure_safety_reads_inline_animation_declarations() {
        let html = r#"
            <div style="animation: blink 1s infinite">a</div>
            <div style="transition-duration: 0.3s">b</div>
            <div style="animation: none">c</div>
            <div style="color: red">d</div>
        "#;
        let r = run(seizure_safety, html);
        assert_eq!(r.warnings.len(), 2);
    }
}
