//! Project configuration loaded from TOML
//!
//! ```toml
//! [compiler]
//! generic_tag = "block"
//! max_depth = 64
//!
//! [sync]
//! max_retries = 3
//!
//! [[overrides]]
//! tag = "aside"
//! block = "acme/callout"
//!
//! [[blocks]]
//! name = "acme/callout"
//! container = true
//! default_child = "core/paragraph"
//! attributes.tone = { type = "string", enum = ["info", "warning"], default = "info" }
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::mapping::{MappingTable, Override, OverrideSupplier, DEFAULT_GENERIC_TAG};
use crate::parser::DEFAULT_MAX_DEPTH;
use crate::registry::{BlockType, Registry, RegistryError};
use crate::CompileOptions;

/// Retries after a revision conflict unless configured otherwise
pub const DEFAULT_MAX_RETRIES: usize = 3;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid block definition: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerSection {
    pub generic_tag: String,
    pub max_depth: usize,
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            generic_tag: DEFAULT_GENERIC_TAG.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    pub max_retries: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Settings for compiling and syncing one project
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub compiler: CompilerSection,
    pub sync: SyncSection,
    /// Tag to block overrides in registration order
    pub overrides: Vec<Override>,
    /// Block types added to the core registry
    pub blocks: Vec<BlockType>,
}

impl ProjectConfig {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load config from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Core block types plus the configured ones
    pub fn registry(&self) -> Result<Registry, ConfigError> {
        let mut registry = Registry::with_core_blocks()?;
        registry.extend(self.blocks.iter().cloned())?;
        Ok(registry)
    }

    /// Built-in mappings plus the configured overrides
    pub fn mapping_table(&self) -> Result<MappingTable, ConfigError> {
        Ok(MappingTable::from_supplier(self)?.with_generic_tag(&self.compiler.generic_tag))
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::new()
            .with_generic_tag(&self.compiler.generic_tag)
            .with_max_depth(self.compiler.max_depth)
    }
}

impl OverrideSupplier for ProjectConfig {
    fn overrides(&self) -> Vec<Override> {
        self.overrides.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Classification;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
[compiler]
generic_tag = "wp-block"

[[overrides]]
tag = "aside"
block = "acme/callout"

[[overrides]]
tag = "aside"
block = "acme/note"

[[blocks]]
name = "acme/note"
container = true
default_child = "core/paragraph"
attributes.tone = { type = "string", enum = ["info", "warning"], default = "info" }
"#;

    #[test]
    fn test_defaults() {
        let config = ProjectConfig::from_str("").unwrap();
        assert_eq!(config.compiler.generic_tag, "block");
        assert_eq!(config.compiler.max_depth, 64);
        assert_eq!(config.sync.max_retries, 3);
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn test_sample_config() {
        let config = ProjectConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.compiler.generic_tag, "wp-block");
        assert_eq!(config.compiler.max_depth, 64);
        assert_eq!(config.overrides.len(), 2);

        let registry = config.registry().unwrap();
        assert!(registry.is_container("acme/note"));
        assert!(registry.contains("core/paragraph"));

        let table = config.mapping_table().unwrap();
        assert_eq!(table.generic_tag(), "wp-block");
        let doc = parse("<aside>x</aside>").unwrap();
        let el = doc.nodes[0].node.as_element().unwrap();
        match table.classify(el) {
            Classification::Mapped(rule) => assert_eq!(rule.block, "acme/note"),
            other => panic!("unexpected classification {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ProjectConfig::from_str("[compiler]\ngeneric = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_invalid_block_name() {
        let config = ProjectConfig::from_str("[[blocks]]\nname = \"Bad Name\"\n").unwrap();
        assert!(matches!(config.registry(), Err(ConfigError::Registry(_))));
    }

    #[test]
    fn test_invalid_override_name() {
        let config = ProjectConfig::from_str("[[overrides]]\ntag = \"aside\"\nblock = \"acme/my.card\"\n").unwrap();
        assert!(matches!(config.mapping_table(), Err(ConfigError::Registry(_))));
        assert!(crate::Compiler::from_config(&config).is_err());
    }
}
