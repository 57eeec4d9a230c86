//! Re-rendering of parsed markup into block inner HTML
//!
//! Text is written back exactly as it appeared in the template. Attribute
//! values are re-encoded, and control attributes are dropped since they steer
//! compilation and are never part of a block's markup.

use crate::parser::ast::{is_void, Element, Position, RawNode, Spanned};

/// Attributes that steer compilation and never reach block markup
pub const CONTROL_ATTRIBUTES: &[&str] = &["key", "templateLock", "blockEditingMode"];

pub fn is_control_attribute(name: &str) -> bool {
    CONTROL_ATTRIBUTES.contains(&name)
}

/// Render a node and its descendants
pub fn render_node(node: &RawNode) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

/// Render a sequence of sibling nodes
pub fn render_nodes<'a>(nodes: impl IntoIterator<Item = &'a Spanned<RawNode>>) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, &node.node);
    }
    out
}

/// Render an element with its descendants
pub fn render_element(el: &Element) -> String {
    render_element_except(el, &[])
}

/// Render an element, leaving `skip` out of its own opening tag
pub fn render_element_except(el: &Element, skip: &[&str]) -> String {
    let mut out = String::new();
    write_open_tag(&mut out, el, skip);
    if !(el.self_closing || is_void(&el.name)) {
        for child in &el.children {
            write_node(&mut out, &child.node);
        }
        out.push_str(&close_tag(el));
    }
    out
}

/// Render only the opening tag of an element
pub fn open_tag(el: &Element) -> String {
    open_tag_except(el, &[])
}

/// Render the opening tag of an element without the attributes in `skip`
pub fn open_tag_except(el: &Element, skip: &[&str]) -> String {
    let mut out = String::new();
    write_open_tag(&mut out, el, skip);
    out
}

/// Render the closing tag of an element, empty for void or self-closed ones
pub fn close_tag(el: &Element) -> String {
    if el.self_closing || is_void(&el.name) {
        String::new()
    } else {
        format!("</{}>", el.name)
    }
}

fn write_node(out: &mut String, node: &RawNode) {
    match node {
        RawNode::Text(text) => out.push_str(text),
        RawNode::Element(el) => write_element(out, el),
    }
}

fn write_element(out: &mut String, el: &Element) {
    write_open_tag(out, el, &[]);
    if el.self_closing || is_void(&el.name) {
        return;
    }
    for child in &el.children {
        write_node(out, &child.node);
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

fn write_open_tag(out: &mut String, el: &Element, skip: &[&str]) {
    out.push('<');
    out.push_str(&el.name);
    for attr in el.attributes.iter().map(|a| &a.node) {
        if is_control_attribute(&attr.name) || skip.contains(&attr.name.as_str()) {
            continue;
        }
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(value));
            out.push('"');
        }
    }
    out.push_str(if el.self_closing { "/>" } else { ">" });
}

/// A control attribute found on markup that stays literal
#[derive(Debug, Clone, PartialEq)]
pub struct StrayControl {
    pub tag: String,
    pub attribute: String,
    pub position: Position,
}

/// Find control attributes on `nodes` and all their descendants
pub fn find_control_attributes<'a>(
    source: &str,
    nodes: impl IntoIterator<Item = &'a Spanned<RawNode>>,
) -> Vec<StrayControl> {
    let mut found = Vec::new();
    for node in nodes {
        collect_controls(source, node, &mut found);
    }
    found
}

fn collect_controls(source: &str, node: &Spanned<RawNode>, found: &mut Vec<StrayControl>) {
    let RawNode::Element(el) = &node.node else {
        return;
    };
    for attr in &el.attributes {
        if is_control_attribute(&attr.node.name) {
            found.push(StrayControl {
                tag: el.name.clone(),
                attribute: attr.node.name.clone(),
                position: Position::locate(source, attr.span.start),
            });
        }
    }
    for child in &el.children {
        collect_controls(source, child, found);
    }
}
