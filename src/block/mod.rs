//! Block tree data model
//!
//! A [`BlockNode`] is one block of the host content model: a namespaced name,
//! typed attributes, and inner content made of literal markup interleaved with
//! inner blocks. Control policies (`key`, template lock, editing mode) are kept
//! apart from ordinary attributes and hold only what the node declares itself;
//! [`Policy`] resolves the inherited values.

pub mod builder;
pub mod markup;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

pub use builder::{build, BuildError, BuildOutput};

/// Namespace assumed for block names written without one
pub const CORE_NAMESPACE: &str = "core";

/// Block that holds raw markup outside any block delimiters
pub const FREEFORM_BLOCK: &str = "core/freeform";

/// Block that holds markup with no better mapping
pub const HTML_BLOCK: &str = "core/html";

/// Expand a bare block name to `core/<name>`
pub fn qualify_name(name: &str) -> String {
    if name.contains('/') {
        name.to_string()
    } else {
        format!("{}/{}", CORE_NAMESPACE, name)
    }
}

/// Characters a block name may use inside wire delimiters
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/')
}

/// Whether a qualified name can be written to and read back from the wire format
pub fn is_wire_name(name: &str) -> bool {
    name.split_once('/').is_some_and(|(ns, local)| {
        !ns.is_empty() && !local.is_empty() && !local.contains('/')
    }) && name.chars().all(is_name_char)
}

/// Restriction on inserting, moving and removing blocks in a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateLock {
    /// Nothing may be inserted, moved or removed
    All,
    /// Blocks may be moved but not inserted or removed
    Insert,
    /// Only the content of existing blocks is editable
    ContentOnly,
    /// Explicitly unlocked, overriding an ancestor's lock
    Unlocked,
}

impl TemplateLock {
    /// Parse the template attribute form (`all`, `insert`, `contentOnly`, `false`)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(TemplateLock::All),
            "insert" => Some(TemplateLock::Insert),
            "contentOnly" => Some(TemplateLock::ContentOnly),
            "false" => Some(TemplateLock::Unlocked),
            _ => None,
        }
    }

    /// Read the wire form: a lock name or `false`
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if s != "false" => Self::parse(s),
            Value::Bool(false) => Some(TemplateLock::Unlocked),
            _ => None,
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            TemplateLock::All => Value::from("all"),
            TemplateLock::Insert => Value::from("insert"),
            TemplateLock::ContentOnly => Value::from("contentOnly"),
            TemplateLock::Unlocked => Value::Bool(false),
        }
    }

    /// Whether the lock fixes the set of inner blocks
    pub fn locks_structure(self) -> bool {
        !matches!(self, TemplateLock::Unlocked)
    }
}

/// Editor behaviour for a block and its descendants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditingMode {
    Default,
    ContentOnly,
    Disabled,
}

impl EditingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(EditingMode::Default),
            "contentOnly" => Some(EditingMode::ContentOnly),
            "disabled" => Some(EditingMode::Disabled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EditingMode::Default => "default",
            EditingMode::ContentOnly => "contentOnly",
            EditingMode::Disabled => "disabled",
        }
    }
}

/// Piece of a block's inner content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InnerContent {
    Html(String),
    Block(BlockNode),
}

/// One block with its attributes and inner content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockNode {
    pub name: String,
    pub attrs: BTreeMap<String, Value>,
    pub inner: Vec<InnerContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<TemplateLock>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "editingMode")]
    pub editing_mode: Option<EditingMode>,
}

impl BlockNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
            inner: Vec::new(),
            key: None,
            lock: None,
            editing_mode: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.push_html(html);
        self
    }

    pub fn with_block(mut self, block: BlockNode) -> Self {
        self.push_block(block);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_lock(mut self, lock: TemplateLock) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn with_editing_mode(mut self, mode: EditingMode) -> Self {
        self.editing_mode = Some(mode);
        self
    }

    /// Append literal markup, merging with a preceding markup piece
    pub fn push_html(&mut self, html: impl Into<String>) {
        let html = html.into();
        if html.is_empty() {
            return;
        }
        match self.inner.last_mut() {
            Some(InnerContent::Html(prev)) => prev.push_str(&html),
            _ => self.inner.push(InnerContent::Html(html)),
        }
    }

    pub fn push_block(&mut self, block: BlockNode) {
        self.inner.push(InnerContent::Block(block));
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn inner_blocks(&self) -> impl Iterator<Item = &BlockNode> {
        self.inner.iter().filter_map(|c| match c {
            InnerContent::Block(b) => Some(b),
            InnerContent::Html(_) => None,
        })
    }

    pub fn inner_blocks_mut(&mut self) -> impl Iterator<Item = &mut BlockNode> {
        self.inner.iter_mut().filter_map(|c| match c {
            InnerContent::Block(b) => Some(b),
            InnerContent::Html(_) => None,
        })
    }

    pub fn has_inner_blocks(&self) -> bool {
        self.inner_blocks().next().is_some()
    }

    /// All literal markup pieces joined, skipping inner blocks
    pub fn html(&self) -> String {
        self.inner
            .iter()
            .filter_map(|c| match c {
                InnerContent::Html(h) => Some(h.as_str()),
                InnerContent::Block(_) => None,
            })
            .collect()
    }

    /// Inner markup of the block's wrapper element
    ///
    /// When the literal markup is a single element, its children's markup is
    /// returned; otherwise the whole literal markup.
    pub fn content(&self) -> String {
        let html = self.html();
        let Ok(template) = crate::parser::parse(&html) else {
            return html;
        };
        let mut significant = template.nodes.iter().filter(|n| !n.node.is_blank_text());
        match (significant.next(), significant.next()) {
            (Some(only), None) => match only.node.as_element() {
                Some(el) => match (el.children.first(), el.children.last()) {
                    (Some(first), Some(last)) => html[first.span.start..last.span.end].to_string(),
                    _ => String::new(),
                },
                None => html,
            },
            _ => html,
        }
    }

    /// Visit this node and all descendants in document order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a BlockNode)) {
        visit(self);
        for child in self.inner_blocks() {
            child.walk(visit);
        }
    }

    /// Keys declared in this subtree, in document order
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.walk(&mut |node| {
            if let Some(key) = &node.key {
                keys.push(key.clone());
            }
        });
        keys
    }
}

/// Lock and editing mode in force at a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub lock: Option<TemplateLock>,
    pub editing_mode: Option<EditingMode>,
}

impl Policy {
    /// Policy for `node` given the policy of its parent
    pub fn inherit(self, node: &BlockNode) -> Self {
        Self {
            lock: node.lock.or(self.lock),
            editing_mode: node.editing_mode.or(self.editing_mode),
        }
    }

    /// Inner blocks may not be added, removed or reordered by users
    pub fn locks_structure(&self) -> bool {
        self.lock.is_some_and(TemplateLock::locks_structure)
            || self.editing_mode == Some(EditingMode::ContentOnly)
    }
}

/// Ordered top-level blocks from one compile
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedDocument {
    pub blocks: Vec<BlockNode>,
}

impl ParsedDocument {
    pub fn new(blocks: Vec<BlockNode>) -> Self {
        Self { blocks }
    }

    /// Serialize with the default wire settings
    pub fn to_wire(&self) -> String {
        crate::wire::serialize(&self.blocks)
    }

    /// Find the first block with `key` anywhere in the document
    pub fn find_key(&self, key: &str) -> Option<&BlockNode> {
        let mut found = None;
        for block in &self.blocks {
            block.walk(&mut |node| {
                if found.is_none() && node.key.as_deref() == Some(key) {
                    found = Some(node);
                }
            });
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_qualify_name() {
        assert_eq!(qualify_name("paragraph"), "core/paragraph");
        assert_eq!(qualify_name("acme/card"), "acme/card");
    }

    #[test]
    fn test_push_html_merges() {
        let block = BlockNode::new("core/group")
            .with_html("<div>")
            .with_html("")
            .with_block(BlockNode::new("core/paragraph"))
            .with_html("</div>");
        assert_eq!(block.inner.len(), 3);
        let merged = BlockNode::new("core/html").with_html("a").with_html("b");
        assert_eq!(merged.inner, vec![InnerContent::Html("ab".to_string())]);
    }

    #[test]
    fn test_content_of_single_wrapper() {
        let p = BlockNode::new("core/paragraph").with_html("<p>Hello <strong>world</strong></p>");
        assert_eq!(p.content(), "Hello <strong>world</strong>");
        let empty = BlockNode::new("core/paragraph").with_html("<p></p>");
        assert_eq!(empty.content(), "");
    }

    #[test]
    fn test_content_without_single_wrapper() {
        let text = BlockNode::new("any/thing").with_html("X");
        assert_eq!(text.content(), "X");
        let two = BlockNode::new("core/html").with_html("<b>a</b><i>b</i>");
        assert_eq!(two.content(), "<b>a</b><i>b</i>");
    }

    #[test]
    fn test_lock_values() {
        assert_eq!(TemplateLock::parse("contentOnly"), Some(TemplateLock::ContentOnly));
        assert_eq!(TemplateLock::parse("false"), Some(TemplateLock::Unlocked));
        assert_eq!(TemplateLock::from_value(&json!(false)), Some(TemplateLock::Unlocked));
        assert_eq!(TemplateLock::from_value(&json!("all")), Some(TemplateLock::All));
        assert_eq!(TemplateLock::from_value(&json!(true)), None);
        assert_eq!(TemplateLock::Unlocked.to_value(), json!(false));
    }

    #[test]
    fn test_policy_inheritance() {
        let parent = Policy::default().inherit(&BlockNode::new("core/group").with_lock(TemplateLock::All));
        assert!(parent.locks_structure());
        let child = parent.inherit(&BlockNode::new("core/group").with_lock(TemplateLock::Unlocked));
        assert!(!child.locks_structure());
        let content_only =
            Policy::default().inherit(&BlockNode::new("core/group").with_editing_mode(EditingMode::ContentOnly));
        assert!(content_only.locks_structure());
    }

    #[test]
    fn test_find_key_nested() {
        let doc = ParsedDocument::new(vec![BlockNode::new("core/group")
            .with_block(BlockNode::new("core/paragraph").with_key("intro"))]);
        assert_eq!(doc.find_key("intro").map(|b| b.name.as_str()), Some("core/paragraph"));
        assert!(doc.find_key("missing").is_none());
    }
}
