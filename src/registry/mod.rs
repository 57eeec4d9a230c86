//! Block type registry: known block names, attribute schemas and structure

mod builtin;

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub use self::builtin::CORE_BLOCKS;

/// Errors that can occur while defining block types
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Block type registered twice
    #[error("duplicate block type: {name}")]
    Duplicate { name: String },

    /// Block name is empty or not `namespace/name`
    #[error("invalid block name '{name}': expected 'namespace/name'")]
    InvalidName { name: String },

    /// Block table TOML did not parse
    #[error("invalid block table: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Value type of a block attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Boolean,
    Integer,
    Number,
    Object,
    Array,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AttributeType::String => "string",
            AttributeType::Boolean => "boolean",
            AttributeType::Integer => "integer",
            AttributeType::Number => "number",
            AttributeType::Object => "object",
            AttributeType::Array => "array",
        };
        write!(f, "{}", name)
    }
}

/// What an attribute holds from the editor's point of view
///
/// Attributes without a role are structural and always follow the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeRole {
    /// User-editable content, carried over from persisted blocks on sync
    Content,
}

/// Schema of one block attribute
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeSchema {
    #[serde(rename = "type")]
    pub ty: AttributeType,
    #[serde(default)]
    pub role: Option<AttributeRole>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
}

impl AttributeSchema {
    pub fn new(ty: AttributeType) -> Self {
        Self {
            ty,
            role: None,
            default: None,
            enum_values: None,
        }
    }

    pub fn with_role(mut self, role: AttributeRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn is_content(&self) -> bool {
        self.role == Some(AttributeRole::Content)
    }
}

/// Attributes every block type accepts
fn global_attributes() -> [(&'static str, AttributeSchema); 4] {
    [
        ("className", AttributeSchema::new(AttributeType::String)),
        ("anchor", AttributeSchema::new(AttributeType::String)),
        ("lock", AttributeSchema::new(AttributeType::Object)),
        ("metadata", AttributeSchema::new(AttributeType::Object)),
    ]
}

/// A registered block type
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockType {
    pub name: String,
    /// Holds inner blocks rather than literal markup
    #[serde(default)]
    pub container: bool,
    /// Block used to wrap children that do not fit `allowed_children`
    #[serde(default)]
    pub default_child: Option<String>,
    /// Block names accepted as direct children; `None` accepts all
    #[serde(default)]
    pub allowed_children: Option<Vec<String>>,
    /// Element wrapped around text when this block is created implicitly
    #[serde(default)]
    pub wrapper_tag: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSchema>,
}

impl BlockType {
    pub fn new(name: impl Into<String>) -> Self {
        let mut block = Self {
            name: name.into(),
            container: false,
            default_child: None,
            allowed_children: None,
            wrapper_tag: None,
            attributes: BTreeMap::new(),
        };
        block.add_global_attributes();
        block
    }

    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, schema: AttributeSchema) -> Self {
        self.attributes.insert(name.into(), schema);
        self
    }

    pub fn with_default_child(mut self, name: impl Into<String>) -> Self {
        self.default_child = Some(name.into());
        self
    }

    pub fn with_allowed_children(mut self, names: Vec<String>) -> Self {
        self.allowed_children = Some(names);
        self
    }

    pub fn with_wrapper_tag(mut self, tag: impl Into<String>) -> Self {
        self.wrapper_tag = Some(tag.into());
        self
    }

    fn add_global_attributes(&mut self) {
        for (name, schema) in global_attributes() {
            self.attributes.entry(name.to_string()).or_insert(schema);
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    /// True if the named attribute has the `content` role
    pub fn is_content_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some_and(|s| s.is_content())
    }

    /// Declared defaults by attribute name
    pub fn default_attrs(&self) -> BTreeMap<String, Value> {
        self.attributes
            .iter()
            .filter_map(|(name, schema)| schema.default.clone().map(|d| (name.clone(), d)))
            .collect()
    }

    /// Whether `child` may appear directly inside this block
    pub fn allows_child(&self, child: &str) -> bool {
        match &self.allowed_children {
            Some(allowed) => allowed.iter().any(|a| a == child),
            None => true,
        }
    }
}

/// Check a block name has the `namespace/name` shape
pub fn is_valid_block_name(name: &str) -> bool {
    match name.split_once('/') {
        Some((ns, local)) => {
            let part_ok = |s: &str| {
                !s.is_empty()
                    && s.starts_with(|c: char| c.is_ascii_lowercase())
                    && s.chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
            };
            part_ok(ns) && part_ok(local)
        }
        None => false,
    }
}

#[derive(Deserialize)]
struct BlockTable {
    #[serde(default)]
    blocks: Vec<BlockType>,
}

/// Registry of known block types
#[derive(Debug, Clone)]
pub struct Registry {
    blocks: HashMap<String, BlockType>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            blocks: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in core block types
    pub fn with_core_blocks() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.extend_from_toml(CORE_BLOCKS)?;
        Ok(registry)
    }

    /// Register a block type; fails if the name is taken
    pub fn register(&mut self, block: BlockType) -> Result<(), RegistryError> {
        if self.blocks.contains_key(&block.name) {
            return Err(RegistryError::Duplicate { name: block.name });
        }
        self.define(block)
    }

    /// Register a block type, replacing any existing definition
    pub fn define(&mut self, mut block: BlockType) -> Result<(), RegistryError> {
        if !is_valid_block_name(&block.name) {
            return Err(RegistryError::InvalidName { name: block.name });
        }
        block.add_global_attributes();
        self.blocks.insert(block.name.clone(), block);
        Ok(())
    }

    /// Merge block definitions from a TOML `[[blocks]]` table
    pub fn extend_from_toml(&mut self, content: &str) -> Result<(), RegistryError> {
        let table: BlockTable = toml::from_str(content)?;
        self.extend(table.blocks)
    }

    /// Merge block definitions, later definitions replacing earlier ones
    pub fn extend(&mut self, blocks: impl IntoIterator<Item = BlockType>) -> Result<(), RegistryError> {
        for block in blocks {
            self.define(block)?;
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&BlockType> {
        self.blocks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// Whether `name` is a registered container block
    pub fn is_container(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|b| b.container)
    }

    /// Registered block names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blocks.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_core_blocks().expect("Core block table should be valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register(
                BlockType::new("acme/card")
                    .container()
                    .with_attribute("title", AttributeSchema::new(AttributeType::String)),
            )
            .unwrap();
        let card = registry.lookup("acme/card").unwrap();
        assert!(card.container);
        assert!(card.attribute("title").is_some());
        // global attributes are always present
        assert!(card.attribute("className").is_some());
        assert!(registry.lookup("acme/other").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = Registry::new();
        registry.register(BlockType::new("acme/a")).unwrap();
        let err = registry.register(BlockType::new("acme/a")).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { .. }));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut registry = Registry::new();
        assert!(registry.register(BlockType::new("paragraph")).is_err());
        assert!(registry.register(BlockType::new("Acme/Thing")).is_err());
        assert!(registry.register(BlockType::new("acme/")).is_err());
    }

    #[test]
    fn test_extend_from_toml_replaces() {
        let mut registry = Registry::default();
        registry
            .extend_from_toml(
                r#"
                [[blocks]]
                name = "core/paragraph"
                [blocks.attributes.tone]
                type = "string"
                enum = ["warm", "cool"]
                default = "warm"
                "#,
            )
            .unwrap();
        let paragraph = registry.lookup("core/paragraph").unwrap();
        let tone = paragraph.attribute("tone").unwrap();
        assert_eq!(tone.ty, AttributeType::String);
        assert_eq!(tone.default, Some(json!("warm")));
        assert_eq!(paragraph.default_attrs().get("tone"), Some(&json!("warm")));
    }

    #[test]
    fn test_attribute_roles() {
        let mut registry = Registry::new();
        registry
            .extend_from_toml(
                r#"
                [[blocks]]
                name = "acme/quote"
                attributes.citation = { type = "string", role = "content" }
                attributes.tone = { type = "string" }
                "#,
            )
            .unwrap();
        let quote = registry.lookup("acme/quote").unwrap();
        assert!(quote.is_content_attribute("citation"));
        assert!(!quote.is_content_attribute("tone"));

        let err = registry.extend_from_toml(
            "[[blocks]]\nname = \"acme/x\"\nattributes.a = { type = \"string\", role = \"local\" }\n",
        );
        assert!(matches!(err, Err(RegistryError::Toml(_))));
    }

    #[test]
    fn test_allows_child() {
        let list = BlockType::new("core/list").with_allowed_children(vec!["core/list-item".into()]);
        assert!(list.allows_child("core/list-item"));
        assert!(!list.allows_child("core/paragraph"));
        assert!(BlockType::new("core/group").allows_child("core/paragraph"));
    }
}
