//! Element classification: which block a template element becomes
//!
//! Resolution order for an element:
//! 1. the generic block tag, naming its block directly
//! 2. override entries, the last one registered for a tag winning
//! 3. built-in rules
//! 4. phrasing elements, grouped with text into paragraphs
//! 5. anything else falls back to a raw HTML block

pub mod coerce;
pub mod table;

use serde::Deserialize;

use crate::block::{is_wire_name, qualify_name};
use crate::parser::ast::Element;
use crate::registry::RegistryError;

pub use coerce::{coerce, Coercion, RawValue};
pub use table::{
    default_rules, is_block_only_attribute, is_global_binding, is_phrasing, MappingRule,
    PHRASING_TAGS,
};

/// Tag of the generic block element unless configured otherwise
pub const DEFAULT_GENERIC_TAG: &str = "block";

/// An externally supplied tag to block mapping
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Override {
    pub tag: String,
    pub block: String,
}

impl Override {
    pub fn new(tag: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            block: block.into(),
        }
    }
}

/// Source of mapping overrides, in registration order
pub trait OverrideSupplier {
    fn overrides(&self) -> Vec<Override>;
}

impl OverrideSupplier for Vec<Override> {
    fn overrides(&self) -> Vec<Override> {
        self.clone()
    }
}

impl OverrideSupplier for [Override] {
    fn overrides(&self) -> Vec<Override> {
        self.to_vec()
    }
}

/// How an element is compiled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification<'a> {
    /// The generic block tag
    Generic,
    Mapped(&'a MappingRule),
    /// Inline content that joins the surrounding text run
    Phrasing,
    /// No mapping; kept verbatim in a raw HTML block
    Fallback,
}

/// Priority-ordered tag to block rules for one compile
#[derive(Debug, Clone)]
pub struct MappingTable {
    generic_tag: String,
    overrides: Vec<MappingRule>,
    defaults: Vec<MappingRule>,
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingTable {
    /// Table with the built-in rules and no overrides
    pub fn new() -> Self {
        Self {
            generic_tag: DEFAULT_GENERIC_TAG.to_string(),
            overrides: Vec::new(),
            defaults: default_rules(),
        }
    }

    /// Table with the built-in rules plus every override from `supplier`
    pub fn from_supplier(supplier: &(impl OverrideSupplier + ?Sized)) -> Result<Self, RegistryError> {
        let mut table = Self::new();
        for entry in supplier.overrides() {
            table.add_override(entry)?;
        }
        Ok(table)
    }

    pub fn with_generic_tag(mut self, tag: impl Into<String>) -> Self {
        self.set_generic_tag(tag);
        self
    }

    pub fn set_generic_tag(&mut self, tag: impl Into<String>) {
        self.generic_tag = tag.into().to_ascii_lowercase();
    }

    pub fn generic_tag(&self) -> &str {
        &self.generic_tag
    }

    pub fn with_override(
        mut self,
        tag: impl Into<String>,
        block: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        self.add_override(Override::new(tag, block))?;
        Ok(self)
    }

    /// Register an override; it takes precedence over earlier ones for the same tag
    ///
    /// Fails when the block name could not be written to the wire format.
    pub fn add_override(&mut self, entry: Override) -> Result<(), RegistryError> {
        let block = qualify_name(entry.block.trim());
        if !is_wire_name(&block) {
            return Err(RegistryError::InvalidName { name: entry.block });
        }
        let tag = entry.tag.to_ascii_lowercase();
        self.overrides.push(MappingRule::new(tag, block));
        Ok(())
    }

    /// Register a full rule ahead of the built-in rules
    pub fn add_rule(&mut self, rule: MappingRule) {
        self.overrides.push(rule);
    }

    /// Decide how an element compiles
    pub fn classify(&self, el: &Element) -> Classification<'_> {
        if el.name == self.generic_tag {
            return Classification::Generic;
        }
        if let Some(rule) = self
            .overrides
            .iter()
            .rev()
            .find(|r| r.tag == el.name && rule_applies(r, el))
        {
            return Classification::Mapped(rule);
        }
        if let Some(rule) = self
            .defaults
            .iter()
            .find(|r| r.tag == el.name && rule_applies(r, el))
        {
            return Classification::Mapped(rule);
        }
        if is_phrasing(&el.name) {
            return Classification::Phrasing;
        }
        Classification::Fallback
    }
}

fn rule_applies(rule: &MappingRule, el: &Element) -> bool {
    match &rule.requires_child {
        Some(tag) => el.first_child(tag).is_some(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn classify_first(table: &MappingTable, src: &str) -> String {
        let doc = parse(src).unwrap();
        let el = doc.nodes[0].node.as_element().unwrap();
        match table.classify(el) {
            Classification::Generic => "generic".to_string(),
            Classification::Mapped(rule) => rule.block.clone(),
            Classification::Phrasing => "phrasing".to_string(),
            Classification::Fallback => "fallback".to_string(),
        }
    }

    #[test]
    fn test_default_classification() {
        let table = MappingTable::new();
        assert_eq!(classify_first(&table, "<h2>x</h2>"), "core/heading");
        assert_eq!(classify_first(&table, "<figure><img src=a></figure>"), "core/image");
        assert_eq!(classify_first(&table, "<figure><span>x</span></figure>"), "fallback");
        assert_eq!(classify_first(&table, "<pre><code>x</code></pre>"), "core/code");
        assert_eq!(classify_first(&table, "<pre>x</pre>"), "core/preformatted");
        assert_eq!(classify_first(&table, "<em>x</em>"), "phrasing");
        assert_eq!(classify_first(&table, "<custom-tag>x</custom-tag>"), "fallback");
        assert_eq!(classify_first(&table, r#"<block name="a/b"></block>"#), "generic");
    }

    #[test]
    fn test_last_override_wins() {
        let table = MappingTable::new()
            .with_override("p", "acme/lead")
            .unwrap()
            .with_override("p", "acme/intro")
            .unwrap();
        assert_eq!(classify_first(&table, "<p>x</p>"), "acme/intro");
    }

    #[test]
    fn test_override_beats_phrasing_and_fallback() {
        let table = MappingTable::new()
            .with_override("span", "acme/badge")
            .unwrap()
            .with_override("x-card", "card")
            .unwrap();
        assert_eq!(classify_first(&table, "<span>x</span>"), "acme/badge");
        assert_eq!(classify_first(&table, "<x-card>x</x-card>"), "core/card");
    }

    #[test]
    fn test_generic_tag_configurable() {
        let table = MappingTable::new().with_generic_tag("wp-block");
        assert_eq!(classify_first(&table, r#"<wp-block name="a/b"/>"#), "generic");
        assert_eq!(classify_first(&table, r#"<block name="a/b"></block>"#), "fallback");
    }

    #[test]
    fn test_from_supplier() {
        let supplied = vec![Override::new("aside", "acme/note")];
        let table = MappingTable::from_supplier(&supplied).unwrap();
        assert_eq!(classify_first(&table, "<aside>x</aside>"), "acme/note");
    }

    #[test]
    fn test_override_rejects_names_the_wire_cannot_carry() {
        let mut table = MappingTable::new();
        for bad in ["acme/my.card", "acme/my card", "acme/", "a/b/c"] {
            let err = table.add_override(Override::new("aside", bad)).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidName { .. }), "{}", bad);
        }
        assert_eq!(classify_first(&table, "<aside>x</aside>"), "core/group");

        let supplied = vec![Override::new("p", "acme/ok"), Override::new("aside", "acme/not ok")];
        assert!(MappingTable::from_supplier(&supplied).is_err());
    }
}
