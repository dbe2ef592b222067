use std::collections::HashMap;

use kuchiki::NodeRef;
use lightningcss::properties::Property;
use lightningcss::properties::display::{Display, DisplayKeyword, Visibility};
use lightningcss::properties::size::Size;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleAttribute, StyleSheet};
use lightningcss::traits::ToCss;
use lightningcss::values::color::CssColor;
use lightningcss::values::length::{LengthPercentage, LengthPercentageOrAuto};

use crate::contrast::computed_color;
use crate::dom::{attr, node_key};

fn parser_options<'o, 'i>() -> ParserOptions<'o, 'i> {
    ParserOptions {
        error_recovery: true,
        ..ParserOptions::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Fill {
    Color(String),
    CurrentColor,
}

/// The declared values the scanner reads, for one declaration block or one
/// element. `None` means not declared; lengths hold `Some(None)` when the
/// declared value has no absolute pixel size (`auto`, percentages).
#[derive(Debug, Clone, Default, PartialEq)]
struct Declared {
    color: Option<String>,
    background: Option<Fill>,
    display_none: Option<bool>,
    visibility_hidden: Option<bool>,
    width: Option<Option<f64>>,
    height: Option<Option<f64>>,
    left: Option<Option<f64>>,
    top: Option<Option<f64>>,
}

impl Declared {
    fn from_properties(props: &[Property<'_>]) -> Self {
        let mut out = Self::default();
        for prop in props {
            out.apply(prop);
        }
        out
    }

    fn apply(&mut self, prop: &Property<'_>) {
        match prop {
            Property::Color(color) => {
                if let Some(c) = computed_color(color) {
                    self.color = Some(c);
                }
            }
            Property::BackgroundColor(color) => {
                if let Some(fill) = fill_of(color) {
                    self.background = Some(fill);
                }
            }
            Property::Background(layers) => {
                if let Some(fill) = layers.last().and_then(|layer| fill_of(&layer.color)) {
                    self.background = Some(fill);
                }
            }
            Property::Display(display) => {
                self.display_none = Some(matches!(
                    display,
                    Display::Keyword(DisplayKeyword::None)
                ));
            }
            Property::Visibility(v) => {
                self.visibility_hidden = Some(matches!(v, Visibility::Hidden | Visibility::Collapse));
            }
            Property::Width(size) => self.width = Some(size_px(size)),
            Property::Height(size) => self.height = Some(size_px(size)),
            Property::Left(inset) => self.left = Some(inset_px(inset)),
            Property::Top(inset) => self.top = Some(inset_px(inset)),
            _ => {}
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn merge(&mut self, later: &Declared) {
        fn take<T: Clone>(slot: &mut Option<T>, later: &Option<T>) {
            if later.is_some() {
                slot.clone_from(later);
            }
        }
        take(&mut self.color, &later.color);
        take(&mut self.background, &later.background);
        take(&mut self.display_none, &later.display_none);
        take(&mut self.visibility_hidden, &later.visibility_hidden);
        take(&mut self.width, &later.width);
        take(&mut self.height, &later.height);
        take(&mut self.left, &later.left);
        take(&mut self.top, &later.top);
    }
}

fn fill_of(color: &CssColor) -> Option<Fill> {
    if matches!(color, CssColor::CurrentColor) {
        return Some(Fill::CurrentColor);
    }
    computed_color(color).map(Fill::Color)
}

fn size_px(size: &Size) -> Option<f64> {
    match size {
        Size::LengthPercentage(LengthPercentage::Dimension(length)) => length
            .to_px()
            .map(f64::from)
            .filter(|px| px.is_finite() && *px >= 0.0),
        _ => None,
    }
}

fn inset_px(inset: &LengthPercentageOrAuto) -> Option<f64> {
    match inset {
        LengthPercentageOrAuto::LengthPercentage(LengthPercentage::Dimension(length)) => {
            length.to_px().map(f64::from).filter(|px| px.is_finite())
        }
        _ => None,
    }
}

/// One declaration block and the elements it applies to.
struct Layer {
    targets: Vec<NodeRef>,
    normal: Declared,
    important: Declared,
}

struct Entry {
    // Held so the key cannot be reused by a new node while the index lives.
    _node: NodeRef,
    style: Declared,
}

/// Cascaded declarations per element: `<style>` rules in source order, then
/// the element's own `style` attribute, then the `!important` declarations in
/// the same order. Selector specificity is not modelled and at-rules are
/// skipped.
#[derive(Default)]
pub struct StyleIndex {
    by_node: HashMap<usize, Entry>,
}

impl std::fmt::Debug for StyleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleIndex")
            .field("elements", &self.by_node.len())
            .finish()
    }
}

impl StyleIndex {
    pub fn build(root: &NodeRef) -> Self {
        let mut layers = Vec::new();

        let sheets: Vec<String> = root
            .select("style")
            .map(|styles| styles.map(|s| s.as_node().text_contents()).collect())
            .unwrap_or_default();
        for css in &sheets {
            let sheet = match StyleSheet::parse(css, parser_options()) {
                Ok(sheet) => sheet,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unparseable stylesheet");
                    continue;
                }
            };
            for rule in &sheet.rules.0 {
                let CssRule::Style(style) = rule else {
                    continue;
                };
                let selectors = match style.selectors.to_css_string(PrinterOptions::default()) {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let Ok(matches) = root.select(&selectors) else {
                    tracing::debug!(selectors = %selectors, "skipping unsupported selector");
                    continue;
                };
                let targets: Vec<NodeRef> = matches.map(|el| el.as_node().clone()).collect();
                if targets.is_empty() {
                    continue;
                }
                layers.push(Layer {
                    targets,
                    normal: Declared::from_properties(&style.declarations.declarations),
                    important: Declared::from_properties(
                        &style.declarations.important_declarations,
                    ),
                });
            }
        }

        for node in root.descendants() {
            let Some(text) = attr(&node, "style") else {
                continue;
            };
            let Ok(inline) = StyleAttribute::parse(&text, parser_options()) else {
                tracing::debug!(style = %text, "skipping unparseable style attribute");
                continue;
            };
            layers.push(Layer {
                targets: vec![node],
                normal: Declared::from_properties(&inline.declarations.declarations),
                important: Declared::from_properties(&inline.declarations.important_declarations),
            });
        }

        let mut by_node: HashMap<usize, Entry> = HashMap::new();
        let passes = [false, true];
        for important in passes {
            for layer in &layers {
                let delta = if important {
                    &layer.important
                } else {
                    &layer.normal
                };
                if delta.is_empty() {
                    continue;
                }
                for node in &layer.targets {
                    by_node
                        .entry(node_key(node))
                        .or_insert_with(|| Entry {
                            _node: node.clone(),
                            style: Declared::default(),
                        })
                        .style
                        .merge(delta);
                }
            }
        }

        Self { by_node }
    }

    fn declared(&self, node: &NodeRef) -> Option<&Declared> {
        self.by_node.get(&node_key(node)).map(|e| &e.style)
    }

    /// Foreground color in computed form, inherited through ancestors and
    /// defaulting to black.
    pub fn computed_color(&self, node: &NodeRef) -> String {
        node.inclusive_ancestors()
            .find_map(|ancestor| self.declared(&ancestor).and_then(|d| d.color.clone()))
            .unwrap_or_else(|| "rgb(0, 0, 0)".to_string())
    }

    /// Background color in computed form. Not inherited: an element without
    /// its own background is transparent.
    pub fn computed_background(&self, node: &NodeRef) -> String {
        match self.declared(node).and_then(|d| d.background.clone()) {
            Some(Fill::Color(color)) => color,
            Some(Fill::CurrentColor) => self.computed_color(node),
            None => "rgba(0, 0, 0, 0)".to_string(),
        }
    }

    /// `display: none` or the `hidden` attribute anywhere up the tree, or an
    /// inherited `visibility: hidden|collapse`.
    pub fn is_hidden(&self, node: &NodeRef) -> bool {
        let mut visibility_decided = false;
        for ancestor in node.inclusive_ancestors() {
            if ancestor.as_element().is_none() {
                continue;
            }
            if crate::dom::has_attr(&ancestor, "hidden") {
                return true;
            }
            let Some(declared) = self.declared(&ancestor) else {
                continue;
            };
            if declared.display_none == Some(true) {
                return true;
            }
            if !visibility_decided {
                if let Some(hidden) = declared.visibility_hidden {
                    if hidden {
                        return true;
                    }
                    visibility_decided = true;
                }
            }
        }
        false
    }

    /// Declared size in CSS pixels from the cascade, falling back to the
    /// presentational attribute of the same name.
    pub fn dimension(&self, node: &NodeRef, property: &str) -> Option<f64> {
        let declared = self.declared(node).and_then(|d| match property {
            "width" => d.width,
            "height" => d.height,
            _ => None,
        });
        if let Some(Some(px)) = declared {
            return Some(px);
        }
        attr(node, property).as_deref().and_then(attribute_px)
    }

    pub fn offset(&self, node: &NodeRef, property: &str) -> Option<f64> {
        let d = self.declared(node)?;
        let declared = match property {
            "left" => d.left,
            "top" => d.top,
            _ => None,
        };
        declared.flatten()
    }
}

// Presentational `width`/`height` attributes are bare non-negative integers.
fn attribute_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value);
    value
        .parse::<f64>()
        .ok()
        .filter(|px| px.is_finite() && *px >= 0.0)
}

/// Whether an inline `style` declares an animation or transition other than
/// `none`.
pub fn inline_animates(style: &str) -> bool {
    let Ok(inline) = StyleAttribute::parse(style, parser_options()) else {
        return false;
    };
    let block = &inline.declarations;
    block
        .declarations
        .iter()
        .chain(block.important_declarations.iter())
        .any(|prop| {
            let id = prop.property_id();
            let name = id.name();
            if !name.starts_with("animation") && !name.starts_with("transition") {
                return false;
            }
            prop.value_to_css_string(PrinterOptions::default())
                .map(|v| !v.trim().eq_ignore_ascii_case("none"))
                .unwrap_or(true)
        })
}
