//! Canonical block serialization

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::block::{BlockNode, InnerContent, CORE_NAMESPACE, FREEFORM_BLOCK};

/// Configuration options for wire output
#[derive(Debug, Clone, Default)]
pub struct SerializeConfig {
    /// Text placed between top-level blocks
    pub block_separator: String,
}

impl SerializeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text placed between top-level blocks
    pub fn with_block_separator(mut self, separator: impl Into<String>) -> Self {
        self.block_separator = separator.into();
        self
    }
}

/// Serialize blocks with the default configuration
pub fn serialize(blocks: &[BlockNode]) -> String {
    serialize_with(blocks, &SerializeConfig::default())
}

/// Serialize blocks, joining top-level blocks with the configured separator
///
/// Top-level freeform blocks with only whitespace are skipped; the parser
/// drops such markup between blocks.
pub fn serialize_with(blocks: &[BlockNode], config: &SerializeConfig) -> String {
    let mut out = String::new();
    let mut first = true;
    for block in blocks.iter().filter(|b| !is_blank_freeform(b)) {
        if !first {
            out.push_str(&config.block_separator);
        }
        first = false;
        write_block(&mut out, block);
    }
    out
}

fn is_blank_freeform(block: &BlockNode) -> bool {
    block.name == FREEFORM_BLOCK && block.html().trim().is_empty()
}

/// The tree [`parse`](super::parse) returns for the serialized form of `blocks`
///
/// Freeform blocks have no delimiters, so adjacent top-level ones come back
/// as one block, blank ones vanish, and nested ones become their parent's
/// literal markup.
pub fn normalize(blocks: &[BlockNode]) -> Vec<BlockNode> {
    let mut out: Vec<BlockNode> = Vec::with_capacity(blocks.len());
    for block in blocks.iter().filter(|b| !is_blank_freeform(b)) {
        if block.name != FREEFORM_BLOCK {
            out.push(normalize_nested(block));
            continue;
        }
        match out.last_mut() {
            Some(prev) if prev.name == FREEFORM_BLOCK => prev.push_html(block.html()),
            _ => out.push(BlockNode::new(FREEFORM_BLOCK).with_html(block.html())),
        }
    }
    out
}

fn normalize_nested(block: &BlockNode) -> BlockNode {
    let mut node = block.clone();
    node.inner.clear();
    for piece in &block.inner {
        match piece {
            InnerContent::Html(html) => node.push_html(html.as_str()),
            InnerContent::Block(child) if child.name == FREEFORM_BLOCK => node.push_html(child.html()),
            InnerContent::Block(child) => node.push_block(normalize_nested(child)),
        }
    }
    node
}

/// Serialize a single block and its inner blocks
pub fn serialize_block(block: &BlockNode) -> String {
    let mut out = String::new();
    write_block(&mut out, block);
    out
}

fn write_block(out: &mut String, block: &BlockNode) {
    if block.name == FREEFORM_BLOCK {
        out.push_str(&block.html());
        return;
    }

    let mut inner = String::new();
    for piece in &block.inner {
        match piece {
            InnerContent::Html(html) => inner.push_str(html),
            InnerContent::Block(child) => write_block(&mut inner, child),
        }
    }

    let name = wire_name(&block.name);
    out.push_str("<!-- wp:");
    out.push_str(name);
    if let Some(json) = attributes_json(block) {
        out.push(' ');
        out.push_str(&json);
    }
    if inner.is_empty() {
        out.push_str(" /-->");
        return;
    }
    out.push_str(" -->");
    out.push_str(&inner);
    out.push_str("<!-- /wp:");
    out.push_str(name);
    out.push_str(" -->");
}

/// Name as written in delimiters: core blocks drop their namespace
pub fn wire_name(name: &str) -> &str {
    name.strip_prefix(CORE_NAMESPACE)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name)
}

/// Attribute map as written in the opening delimiter, control values included
pub fn wire_attributes(block: &BlockNode) -> Map<String, Value> {
    let mut attrs: Map<String, Value> = block
        .attrs
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if block.key.is_some() || block.editing_mode.is_some() {
        let mut metadata = match attrs.remove("metadata") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(key) = &block.key {
            metadata.insert("key".to_string(), Value::String(key.clone()));
        }
        if let Some(mode) = block.editing_mode {
            metadata.insert(
                "blockEditingMode".to_string(),
                Value::String(mode.as_str().to_string()),
            );
        }
        attrs.insert("metadata".to_string(), Value::Object(metadata));
    }
    if let Some(lock) = block.lock {
        attrs.insert("templateLock".to_string(), lock.to_value());
    }
    attrs
}

fn attributes_json(block: &BlockNode) -> Option<String> {
    let attrs = wire_attributes(block);
    if attrs.is_empty() {
        return None;
    }
    Some(escape_json(&sorted(Value::Object(attrs)).to_string()))
}

/// Rebuild objects with keys in sorted order at every depth
fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let entries: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sorted(v))).collect();
            Value::Object(entries.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// Escape JSON text so it cannot end or confuse an HTML comment
///
/// `--`, `<`, `>`, `&` and escaped quotes become unicode escapes. Input must
/// be serde_json output, where these only occur inside strings.
pub fn escape_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('"') => out.push_str("\\u0022"),
                Some(escaped) => {
                    out.push('\\');
                    out.push(escaped);
                }
                None => out.push('\\'),
            },
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                out.push_str("\\u002d\\u002d");
            }
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            _ => out.push(c),
        }
    }
    out
}
