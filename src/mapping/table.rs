//! Mapping rules and the built-in tag table

use serde_json::Value;

/// Inline elements that are grouped with surrounding text into paragraphs
pub const PHRASING_TAGS: &[&str] = &[
    "a", "abbr", "b", "br", "cite", "code", "em", "i", "kbd", "mark", "q", "s", "small", "span",
    "strong", "sub", "sup", "time", "u",
];

pub fn is_phrasing(tag: &str) -> bool {
    PHRASING_TAGS.contains(&tag)
}

/// Bindings applied by every mapped element
const GLOBAL_BINDINGS: &[(&str, &str)] = &[("class", "className"), ("id", "anchor")];

/// Whether an HTML attribute is bound the same way on every mapped element
pub fn is_global_binding(html_attr: &str) -> bool {
    GLOBAL_BINDINGS.iter().any(|(from, _)| *from == html_attr)
}

/// Whether an attribute name can only be meant as a block attribute
///
/// HTML attribute names are lowercase; a camelCase name on a mapped element
/// names a block attribute.
pub fn is_block_only_attribute(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
}

const IMAGE_BINDINGS: &[(&str, &str)] = &[
    ("src", "url"),
    ("alt", "alt"),
    ("width", "width"),
    ("height", "height"),
    ("title", "title"),
];

/// One tag to block rule
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRule {
    pub tag: String,
    pub block: String,
    /// Attributes set regardless of the markup
    pub presets: Vec<(String, Value)>,
    /// HTML attribute to block attribute renames
    pub bindings: Vec<(String, String)>,
    /// Rule only applies when the element has a child with this tag
    pub requires_child: Option<String>,
    /// Read `bindings` from the first child with this tag instead of the element
    pub bind_from_child: Option<String>,
}

impl MappingRule {
    pub fn new(tag: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            block: block.into(),
            presets: Vec::new(),
            bindings: GLOBAL_BINDINGS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            requires_child: None,
            bind_from_child: None,
        }
    }

    pub fn with_preset(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.presets.push((name.into(), value.into()));
        self
    }

    pub fn with_binding(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.bindings.push((from.into(), to.into()));
        self
    }

    fn with_bindings(self, bindings: &[(&str, &str)]) -> Self {
        bindings
            .iter()
            .fold(self, |rule, (from, to)| rule.with_binding(*from, *to))
    }

    pub fn requiring_child(mut self, tag: impl Into<String>) -> Self {
        self.requires_child = Some(tag.into());
        self
    }

    pub fn binding_from_child(mut self, tag: impl Into<String>) -> Self {
        self.bind_from_child = Some(tag.into());
        self
    }

    /// Block attribute an HTML attribute is bound to, if any
    pub fn binding_for(&self, html_attr: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(from, _)| from == html_attr)
            .map(|(_, to)| to.as_str())
    }
}

/// Built-in rules in priority order
pub fn default_rules() -> Vec<MappingRule> {
    let mut rules: Vec<MappingRule> = (1..=6)
        .map(|level| {
            MappingRule::new(format!("h{}", level), "core/heading").with_preset("level", level)
        })
        .collect();

    rules.extend([
        MappingRule::new("p", "core/paragraph"),
        MappingRule::new("ul", "core/list"),
        MappingRule::new("ol", "core/list")
            .with_preset("ordered", true)
            .with_binding("start", "start")
            .with_binding("reversed", "reversed"),
        MappingRule::new("li", "core/list-item"),
        MappingRule::new("blockquote", "core/quote"),
        MappingRule::new("img", "core/image").with_bindings(IMAGE_BINDINGS),
        MappingRule::new("figure", "core/image")
            .requiring_child("img")
            .binding_from_child("img")
            .with_bindings(IMAGE_BINDINGS),
        MappingRule::new("pre", "core/code").requiring_child("code"),
        MappingRule::new("pre", "core/preformatted"),
        MappingRule::new("hr", "core/separator"),
        MappingRule::new("table", "core/table"),
        MappingRule::new("div", "core/group"),
        MappingRule::new("details", "core/details"),
    ]);

    for tag in ["section", "main", "article", "aside", "header", "footer", "nav"] {
        rules.push(MappingRule::new(tag, "core/group").with_preset("tagName", tag));
    }

    rules
}
