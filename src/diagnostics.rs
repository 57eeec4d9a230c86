//! Non-fatal diagnostics collected while compiling and reconciling
//!
//! Warnings never stop a compile. Each one names the node it concerns by a
//! block path and, where the node came from template markup, its source
//! position.

use std::fmt;

use crate::parser::ast::Position;

/// A non-fatal problem found while compiling or syncing
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub category: WarningCategory,
    pub message: String,
    pub path: NodePath,
    pub position: Option<Position>,
    pub content_id: Option<String>,
}

/// Category of warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCategory {
    /// Generic tag names a block the registry does not know
    UnknownBlock,
    /// Attribute value does not match its schema type
    AttributeType,
    /// Control attribute on markup that does not become a block
    ControlAttribute,
    /// Container child outside the allowed set
    Structure,
    Reconcile,
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningCategory::UnknownBlock => write!(f, "unknown-block"),
            WarningCategory::AttributeType => write!(f, "attribute-type"),
            WarningCategory::ControlAttribute => write!(f, "control-attribute"),
            WarningCategory::Structure => write!(f, "structure"),
            WarningCategory::Reconcile => write!(f, "reconcile"),
        }
    }
}

impl Warning {
    pub fn new(category: WarningCategory, message: impl Into<String>, path: NodePath) -> Self {
        Self {
            category,
            message: message.into(),
            path,
            position: None,
            content_id: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn for_content(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Emit the warning as a tracing event
    pub fn log(&self) {
        let position = self.position.map(|p| p.to_string()).unwrap_or_default();
        tracing::warn!(
            category = %self.category,
            path = %self.path,
            position = %position,
            content_id = self.content_id.as_deref().unwrap_or(""),
            "{}",
            self.message
        );
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.category)?;
        if let Some(id) = &self.content_id {
            write!(f, " {}:", id)?;
        }
        write!(f, " {}", self.path)?;
        if let Some(pos) = self.position {
            write!(f, " ({})", pos)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Location of a node in a block tree, as block names with sibling indices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath(Vec<(String, usize)>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of the `index`-th child named `name`
    pub fn child(&self, name: &str, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push((name.to_string(), index));
        Self(segments)
    }

    pub fn segments(&self) -> &[(String, usize)] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for (i, (name, index)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}[{}]", name, index)?;
        }
        Ok(())
    }
}

/// Collects warnings, logging each one as it is recorded
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        warning.log();
        self.warnings.push(warning);
    }

    pub fn warn(&mut self, category: WarningCategory, message: impl Into<String>, path: &NodePath) {
        self.push(Warning::new(category, message, path.clone()));
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
