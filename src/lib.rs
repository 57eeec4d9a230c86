//! Blockweave - compile HTML-like templates into editor blocks
//!
//! This library parses template markup, maps its elements onto registered
//! block types, serializes the resulting block tree to the block wire format,
//! and reconciles fresh compiles with previously stored content.
//!
//! # Example
//!
//! ```rust
//! use blockweave::compile;
//!
//! let compiled = compile("<h1>Title</h1>").unwrap();
//! assert_eq!(
//!     compiled.document.to_wire(),
//!     r#"<!-- wp:heading {"level":1} --><h1>Title</h1><!-- /wp:heading -->"#
//! );
//! ```

pub mod block;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod mapping;
pub mod parser;
pub mod registry;
pub mod sync;
pub mod wire;

pub use block::{BlockNode, BuildError, EditingMode, InnerContent, ParsedDocument, TemplateLock};
pub use config::{ConfigError, ProjectConfig};
pub use diagnostics::{Warning, WarningCategory};
pub use error::ParseError;
pub use mapping::{MappingTable, Override, OverrideSupplier};
pub use parser::{parse, Template};
pub use registry::{AttributeSchema, BlockType, Registry, RegistryError};
pub use sync::{reconcile, Synchronizer};

use thiserror::Error;

/// Errors that can occur during a compile
#[derive(Debug, Error)]
pub enum CompileError {
    /// Error during parsing
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Error while building the block tree
    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl CompileError {
    /// Render the error against its source, with ariadne for parse errors
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Parse(e) => e.format(source, filename),
            CompileError::Build(e) => format!("{}: {}", filename, e),
            CompileError::Registry(e) => e.to_string(),
        }
    }
}

/// Options for a compile
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Templates nested deeper than this are rejected
    pub max_depth: usize,
    /// Tag of the generic block element
    pub generic_tag: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_depth: parser::DEFAULT_MAX_DEPTH,
            generic_tag: mapping::DEFAULT_GENERIC_TAG.to_string(),
        }
    }
}

impl CompileOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the generic block tag
    pub fn with_generic_tag(mut self, tag: impl Into<String>) -> Self {
        self.generic_tag = tag.into();
        self
    }
}

/// Result of a successful compile
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub document: ParsedDocument,
    pub warnings: Vec<Warning>,
}

/// A registry and mapping table ready to compile templates
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: Registry,
    table: MappingTable,
    options: CompileOptions,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Registry::default(), MappingTable::new())
    }
}

impl Compiler {
    pub fn new(registry: Registry, table: MappingTable) -> Self {
        let options = CompileOptions::new().with_generic_tag(table.generic_tag());
        Self {
            registry,
            table,
            options,
        }
    }

    /// Compiler with the registry, overrides and options of a project
    pub fn from_config(config: &ProjectConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.registry()?, config.mapping_table()?).with_options(config.compile_options()))
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.table.set_generic_tag(options.generic_tag.as_str());
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Parse and build a template
    pub fn compile(&self, source: &str) -> Result<Compiled, CompileError> {
        let template = parser::parse_with_depth(source, self.options.max_depth)?;
        let output = block::build(&template, source, &self.registry, &self.table)?;
        tracing::debug!(
            blocks = output.blocks.len(),
            warnings = output.warnings.len(),
            "compiled template"
        );
        Ok(Compiled {
            document: ParsedDocument::new(output.blocks),
            warnings: output.warnings,
        })
    }
}

/// Compile a template with the core blocks and default mappings
pub fn compile(source: &str) -> Result<Compiled, CompileError> {
    compile_with_options(source, CompileOptions::default())
}

/// Compile a template with the core blocks, default mappings and `options`
pub fn compile_with_options(source: &str, options: CompileOptions) -> Result<Compiled, CompileError> {
    let compiler = Compiler::new(Registry::with_core_blocks()?, MappingTable::new()).with_options(options);
    compiler.compile(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple() {
        let compiled = compile("<p>Hello</p>").unwrap();
        assert_eq!(compiled.document.blocks.len(), 1);
        assert_eq!(compiled.document.blocks[0].name, "core/paragraph");
        assert!(compiled.warnings.is_empty());
    }

    #[test]
    fn test_compile_parse_error() {
        let result = compile("<p>unclosed");
        assert!(matches!(result, Err(CompileError::Parse(_))));
    }

    #[test]
    fn test_compile_depth_limit() {
        let deep = "<div>".repeat(5) + &"</div>".repeat(5);
        let options = CompileOptions::new().with_max_depth(3);
        assert!(matches!(
            compile_with_options(&deep, options),
            Err(CompileError::Parse(ParseError::TooDeep { .. }))
        ));
        assert!(compile_with_options(&deep, CompileOptions::new()).is_ok());
    }

    #[test]
    fn test_compile_custom_generic_tag() {
        let options = CompileOptions::new().with_generic_tag("wp-block");
        let compiled = compile_with_options(r#"<wp-block name="acme/thing"></wp-block>"#, options).unwrap();
        assert_eq!(compiled.document.blocks[0].name, "acme/thing");
    }

    #[test]
    fn test_compiler_from_config() {
        let config = ProjectConfig::from_str(
            "[[overrides]]\ntag = \"aside\"\nblock = \"core/quote\"\n",
        )
        .unwrap();
        let compiler = Compiler::from_config(&config).unwrap();
        let compiled = compiler.compile("<aside><p>x</p></aside>").unwrap();
        assert_eq!(compiled.document.blocks[0].name, "core/quote");
    }

    #[test]
    fn test_build_error_surfaces() {
        let result = compile("<block>x</block>");
        assert!(matches!(
            result,
            Err(CompileError::Build(BuildError::MissingBlockName { .. }))
        ));
    }
}
