//! Parsed page plus the element helpers the rules and overlay share.

pub mod style;

use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;

pub use style::StyleIndex;

pub struct Document {
    root: NodeRef,
    styles: StyleIndex,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").finish_non_exhaustive()
    }
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self::from_root(kuchiki::parse_html().one(html))
    }

    /// Reads a page from disk. Bytes that are not UTF-8 decode to U+FFFD
    /// instead of failing the read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let root = kuchiki::parse_html()
            .from_utf8()
            .from_file(path)
            .with_context(|| format!("failed to read page: {}", path.display()))?;
        Ok(Self::from_root(root))
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let root = kuchiki::parse_html()
            .from_utf8()
            .read_from(&mut reader)
            .context("failed to read page")?;
        Ok(Self::from_root(root))
    }

    fn from_root(root: NodeRef) -> Self {
        let styles = StyleIndex::build(&root);
        Self { root, styles }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn styles(&self) -> &StyleIndex {
        &self.styles
    }

    /// Rebuilds the style cascade. Call after inserting or removing
    /// stylesheets or `style` attributes.
    pub fn refresh_styles(&mut self) {
        self.styles = StyleIndex::build(&self.root);
    }

    /// Elements matching `selector` in document order. An unparseable selector
    /// matches nothing.
    pub fn select(&self, selector: &str) -> Vec<NodeRef> {
        select_within(&self.root, selector)
    }

    pub fn try_select(&self, selector: &str) -> Result<Vec<NodeRef>> {
        try_select_within(&self.root, selector)
    }

    pub fn select_first(&self, selector: &str) -> Option<NodeRef> {
        self.root
            .select_first(selector)
            .ok()
            .map(|el| el.as_node().clone())
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        if id.is_empty() {
            return None;
        }
        self.root
            .descendants()
            .find(|node| attr(node, "id").as_deref() == Some(id))
    }

    pub fn document_element(&self) -> Option<NodeRef> {
        self.select_first("html")
    }

    pub fn head(&self) -> Option<NodeRef> {
        self.select_first("head")
    }

    pub fn body(&self) -> Option<NodeRef> {
        self.select_first("body")
    }

    pub fn to_html(&self) -> String {
        self.root.to_string()
    }
}

pub fn select_within(scope: &NodeRef, selector: &str) -> Vec<NodeRef> {
    try_select_within(scope, selector).unwrap_or_default()
}

pub fn try_select_within(scope: &NodeRef, selector: &str) -> Result<Vec<NodeRef>> {
    let matches = scope
        .select(selector)
        .map_err(|()| anyhow!("invalid selector: {selector}"))?;
    Ok(matches.map(|el| el.as_node().clone()).collect())
}

pub fn is_valid_selector(selector: &str) -> bool {
    !selector.trim().is_empty() && kuchiki::Selectors::compile(selector).is_ok()
}

/// Identity of a node while something holds a reference to it. A dropped
/// node's key can be reused, so maps keyed by it must keep the node alive.
pub fn node_key(node: &NodeRef) -> usize {
    Rc::as_ptr(&node.0) as usize
}

pub fn tag_name(node: &NodeRef) -> String {
    node.as_element()
        .map(|el| el.name.local.to_ascii_lowercase().to_string())
        .unwrap_or_default()
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    let el = node.as_element()?;
    let attrs = el.attributes.borrow();
    attrs.get(name).map(str::to_string)
}

pub fn has_attr(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .is_some_and(|el| el.attributes.borrow().contains(name))
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().insert(name, value.to_string());
    }
}

pub fn remove_attr(node: &NodeRef, name: &str) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().remove(name);
    }
}

pub fn class_list(node: &NodeRef) -> Vec<String> {
    attr(node, "class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn set_class_list(node: &NodeRef, classes: &[String]) {
    if classes.is_empty() {
        remove_attr(node, "class");
    } else {
        set_attr(node, "class", &classes.join(" "));
    }
}

/// Unique `nth-of-type` path from the root element down to `node`.
pub fn selector_path(node: &NodeRef) -> Option<String> {
    node.as_element()?;
    let mut parts = Vec::new();
    for ancestor in node.inclusive_ancestors() {
        if ancestor.as_element().is_none() {
            break;
        }
        let tag = tag_name(&ancestor);
        let parent_is_element = ancestor
            .parent()
            .is_some_and(|p| p.as_element().is_some());
        if !parent_is_element {
            parts.push(tag);
            continue;
        }
        let position = 1 + ancestor
            .preceding_siblings()
            .filter(|sib| sib.as_element().is_some() && tag_name(sib) == tag)
            .count();
        parts.push(format!("{tag}:nth-of-type({position})"));
    }
    parts.reverse();
    Some(parts.join(" > "))
}

/// Parses an HTML fragment and returns its top-level nodes, detached and ready
/// to be appended elsewhere.
pub fn parse_fragment(html: &str) -> Vec<NodeRef> {
    let doc = kuchiki::parse_html().one(format!("<html><body>{html}</body></html>"));
    let Ok(body) = doc.select_first("body") else {
        return Vec::new();
    };
    let nodes: Vec<NodeRef> = body.as_node().children().collect();
    for node in &nodes {
        node.detach();
    }
    nodes
}
