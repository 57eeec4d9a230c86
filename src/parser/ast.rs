//! Syntax tree types for template markup

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Elements that never take children or a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text up to the matching closing tag
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Check whether a (lower-cased) tag name is an HTML void element
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Syntax node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Root of a parsed template: the top-level node list
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub nodes: Vec<Spanned<RawNode>>,
}

/// A markup node: an element or a run of text
#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    Element(Element),
    /// Text exactly as written in the source (entities are not decoded)
    Text(String),
}

impl RawNode {
    /// Tag name, or `None` for text
    pub fn tag(&self) -> Option<&str> {
        match self {
            RawNode::Element(el) => Some(el.name.as_str()),
            RawNode::Text(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            RawNode::Element(el) => Some(el),
            RawNode::Text(_) => None,
        }
    }

    /// True for text nodes that contain only whitespace
    pub fn is_blank_text(&self) -> bool {
        matches!(self, RawNode::Text(t) if t.trim().is_empty())
    }
}

/// An element with its attributes and children
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lower-cased tag name
    pub name: String,
    pub attributes: Vec<Spanned<Attribute>>,
    pub children: Vec<Spanned<RawNode>>,
    /// Written as `<tag/>` in the source
    pub self_closing: bool,
}

impl Element {
    /// Look up an attribute by exact name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .map(|a| &a.node)
            .find(|a| a.name == name)
    }

    /// Value of an attribute; valueless attributes yield `Some("")`
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    /// Element children, skipping text
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| c.node.as_element())
    }

    /// First child element with the given tag
    pub fn first_child(&self, tag: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.name == tag)
    }
}

/// A single `name="value"` pair; `value` is `None` for bare attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// Entity-decoded value
    pub value: Option<String>,
}

/// 1-based line and column of a byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Compute the position of `offset` in `source`, counting columns in chars
    pub fn locate(source: &str, offset: usize) -> Self {
        let mut clamped = offset.min(source.len());
        while !source.is_char_boundary(clamped) {
            clamped -= 1;
        }
        let before = &source[..clamped];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_first_line() {
        assert_eq!(Position::locate("<p>hi</p>", 3), Position { line: 1, column: 4 });
    }

    #[test]
    fn test_position_after_newlines() {
        let src = "<div>\n  <p>\n</div>";
        assert_eq!(Position::locate(src, 8), Position { line: 2, column: 3 });
    }

    #[test]
    fn test_position_counts_chars_not_bytes() {
        let src = "é<p>";
        assert_eq!(Position::locate(src, 2), Position { line: 1, column: 2 });
    }

    #[test]
    fn test_void_elements() {
        assert!(is_void("img"));
        assert!(is_void("br"));
        assert!(!is_void("p"));
    }
}
