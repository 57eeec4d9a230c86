//! Block tree construction from parsed template markup
//!
//! Walks sibling lists, grouping text and phrasing elements into runs and
//! turning every other element into a block through the mapping table.
//! Containers recurse into their children; leaves keep their markup verbatim.

use std::collections::HashSet;

use thiserror::Error;

use super::markup::{self, is_control_attribute};
use super::{is_wire_name, qualify_name, BlockNode, EditingMode, TemplateLock, HTML_BLOCK};
use crate::diagnostics::{Diagnostics, NodePath, Warning, WarningCategory};
use crate::mapping::{
    coerce, is_block_only_attribute, is_global_binding, Classification, MappingRule, MappingTable,
    RawValue,
};
use crate::parser::ast::{Element, Position, RawNode, Span, Spanned, Template};
use crate::registry::{BlockType, Registry};

/// Block created for loose text when the parent names no default child
const PARAGRAPH_BLOCK: &str = "core/paragraph";

/// Nesting limit when wrapping text in container default children
const MAX_WRAP_DEPTH: usize = 4;

/// Errors that stop a compile after parsing
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("duplicate key '{key}' at {position} among the children of {path}")]
    DuplicateKey {
        key: String,
        path: String,
        position: Position,
    },

    #[error("<{tag}> at {position} has no block name")]
    MissingBlockName { tag: String, position: Position },

    #[error("invalid block name '{name}' at {position}")]
    InvalidBlockName { name: String, position: Position },
}

impl BuildError {
    pub fn position(&self) -> Position {
        match self {
            BuildError::DuplicateKey { position, .. }
            | BuildError::MissingBlockName { position, .. }
            | BuildError::InvalidBlockName { position, .. } => *position,
        }
    }
}

/// Blocks built from one template with the warnings raised on the way
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub blocks: Vec<BlockNode>,
    pub warnings: Vec<Warning>,
}

/// Build the block tree for a parsed template
pub fn build(
    template: &Template,
    source: &str,
    registry: &Registry,
    table: &MappingTable,
) -> Result<BuildOutput, BuildError> {
    let mut builder = Builder {
        source,
        registry,
        table,
        diagnostics: Diagnostics::new(),
    };
    let blocks = builder.build_children(&template.nodes, None, &NodePath::root())?;
    Ok(BuildOutput {
        blocks,
        warnings: builder.diagnostics.into_warnings(),
    })
}

struct Builder<'a> {
    source: &'a str,
    registry: &'a Registry,
    table: &'a MappingTable,
    diagnostics: Diagnostics,
}

/// A block with the source position it was built from
struct Built {
    block: BlockNode,
    position: Position,
}

impl<'a> Builder<'a> {
    fn position(&self, span: &Span) -> Position {
        Position::locate(self.source, span.start)
    }

    fn warn(&mut self, category: WarningCategory, message: String, path: &NodePath, position: Position) {
        self.diagnostics
            .push(Warning::new(category, message, path.clone()).at(position));
    }

    fn build_children(
        &mut self,
        nodes: &[Spanned<RawNode>],
        parent: Option<&'a BlockType>,
        path: &NodePath,
    ) -> Result<Vec<BlockNode>, BuildError> {
        let table = self.table;
        let mut built: Vec<Built> = Vec::new();
        let mut run: Vec<&Spanned<RawNode>> = Vec::new();

        for node in nodes {
            let el = match &node.node {
                RawNode::Text(_) => {
                    run.push(node);
                    continue;
                }
                RawNode::Element(el) => el,
            };
            let classification = table.classify(el);
            if classification == Classification::Phrasing {
                run.push(node);
                continue;
            }
            self.flush_run(&mut run, parent, path, &mut built);
            let position = self.position(&node.span);
            let index = built.len();
            let block = match classification {
                Classification::Generic => self.build_generic(el, position, path, index)?,
                Classification::Mapped(rule) => self.build_mapped(el, rule, position, path, index)?,
                Classification::Phrasing | Classification::Fallback => {
                    self.build_fallback(el, position, path, index)
                }
            };
            built.push(Built { block, position });
        }
        self.flush_run(&mut run, parent, path, &mut built);

        let mut seen: HashSet<String> = HashSet::new();
        let mut blocks = Vec::with_capacity(built.len());
        for (index, Built { block, position }) in built.into_iter().enumerate() {
            if let Some(key) = &block.key {
                if !seen.insert(key.clone()) {
                    return Err(BuildError::DuplicateKey {
                        key: key.clone(),
                        path: path.to_string(),
                        position,
                    });
                }
            }
            let block = match parent {
                Some(parent) => self.conform(block, parent, path, index, position),
                None => block,
            };
            blocks.push(block);
        }
        Ok(blocks)
    }

    /// Turn a pending run of text and phrasing elements into one block
    fn flush_run(
        &mut self,
        run: &mut Vec<&Spanned<RawNode>>,
        parent: Option<&BlockType>,
        path: &NodePath,
        built: &mut Vec<Built>,
    ) {
        if run.is_empty() {
            return;
        }
        let nodes = std::mem::take(run);
        let markup = markup::render_nodes(nodes.iter().copied());
        let trimmed = markup.trim();
        if trimmed.is_empty() {
            return;
        }
        let child = parent
            .and_then(|p| p.default_child.as_deref())
            .unwrap_or(PARAGRAPH_BLOCK);
        let block = self.wrap_text(trimmed, child, 0);
        let position = self.position(&nodes[0].span);
        let path = path.child(&block.name, built.len());
        self.warn_stray_controls(nodes.iter().copied(), &path);
        tracing::debug!(block = %block.name, %position, "wrapped loose text");
        built.push(Built { block, position });
    }

    /// Build the block `name` around loose markup
    fn wrap_text(&self, markup: &str, name: &str, depth: usize) -> BlockNode {
        let block_type = self.registry.lookup(name);
        let wrapper = block_type.and_then(|bt| bt.wrapper_tag.as_deref());
        match block_type {
            Some(bt) if bt.container && depth < MAX_WRAP_DEPTH => {
                let inner_name = bt
                    .default_child
                    .as_deref()
                    .filter(|child| *child != name)
                    .unwrap_or(PARAGRAPH_BLOCK);
                let child = self.wrap_text(markup, inner_name, depth + 1);
                let mut block = BlockNode::new(name);
                match wrapper {
                    Some(tag) => {
                        block.push_html(format!("<{}>", tag));
                        block.push_block(child);
                        block.push_html(format!("</{}>", tag));
                    }
                    None => block.push_block(child),
                }
                block
            }
            _ => {
                let html = match wrapper {
                    Some(tag) => format!("<{0}>{1}</{0}>", tag, markup),
                    None => markup.to_string(),
                };
                BlockNode::new(name).with_html(html)
            }
        }
    }

    fn build_generic(
        &mut self,
        el: &Element,
        position: Position,
        path: &NodePath,
        index: usize,
    ) -> Result<BlockNode, BuildError> {
        let raw_name = el.attribute_value("name").map(str::trim).unwrap_or("");
        if raw_name.is_empty() {
            return Err(BuildError::MissingBlockName {
                tag: el.name.clone(),
                position,
            });
        }
        let name = qualify_name(raw_name);
        if !is_wire_name(&name) {
            return Err(BuildError::InvalidBlockName { name, position });
        }

        let path = path.child(&name, index);
        let registry = self.registry;
        let block_type = registry.lookup(&name);
        if block_type.is_none() {
            self.warn(
                WarningCategory::UnknownBlock,
                format!("block type '{}' is not registered", name),
                &path,
                position,
            );
        }

        let mut block = BlockNode::new(name.clone());
        for attr in &el.attributes {
            if attr.node.name == "name" || is_control_attribute(&attr.node.name) {
                continue;
            }
            let raw = RawValue::from_attribute(attr.node.value.as_deref());
            let attr_position = self.position(&attr.span);
            self.set_attribute(&mut block, block_type, &attr.node.name, raw, &path, attr_position);
        }
        self.apply_controls(&mut block, el, &path);

        let generic_tag = self.table.generic_tag();
        let container = match block_type {
            Some(bt) => bt.container,
            None => el.child_elements().any(|c| c.name == generic_tag),
        };
        tracing::debug!(block = %name, container, "generic block");

        if container {
            for child in self.build_children(&el.children, block_type, &path)? {
                block.push_block(child);
            }
        } else {
            self.warn_stray_controls(&el.children, &path);
            let html = markup::render_nodes(&el.children);
            if !html.trim().is_empty() {
                block.push_html(html);
            }
        }
        Ok(block)
    }

    fn build_mapped(
        &mut self,
        el: &Element,
        rule: &MappingRule,
        position: Position,
        path: &NodePath,
        index: usize,
    ) -> Result<BlockNode, BuildError> {
        let name = rule.block.clone();
        let path = path.child(&name, index);
        let registry = self.registry;
        let block_type = registry.lookup(&name);
        if block_type.is_none() {
            self.warn(
                WarningCategory::UnknownBlock,
                format!("<{}> maps to unregistered block type '{}'", el.name, name),
                &path,
                position,
            );
        }
        tracing::debug!(tag = %el.name, block = %name, "mapped element");

        let mut block = BlockNode::new(name);
        for (attr, value) in &rule.presets {
            self.set_attribute(
                &mut block,
                block_type,
                attr,
                RawValue::Typed(value.clone()),
                &path,
                position,
            );
        }

        let from_child = rule
            .bind_from_child
            .as_deref()
            .and_then(|tag| el.first_child(tag));
        // camelCase attributes are block attributes and leave the element's markup
        let mut block_only: Vec<&str> = Vec::new();
        for attr in &el.attributes {
            let html_name = attr.node.name.as_str();
            if is_control_attribute(html_name) {
                continue;
            }
            let target = match rule.binding_for(html_name) {
                Some(bound) if from_child.is_none() || is_global_binding(html_name) => Some(bound),
                Some(_) => None,
                None if is_block_only_attribute(html_name) => {
                    block_only.push(html_name);
                    Some(html_name)
                }
                None if block_type.is_some_and(|bt| bt.attribute(html_name).is_some()) => {
                    Some(html_name)
                }
                None => None,
            };
            if let Some(target) = target {
                let raw = RawValue::from_attribute(attr.node.value.as_deref());
                let attr_position = self.position(&attr.span);
                self.set_attribute(&mut block, block_type, target, raw, &path, attr_position);
            }
        }
        if let Some(child) = from_child {
            for attr in &child.attributes {
                let html_name = attr.node.name.as_str();
                if is_control_attribute(html_name) || is_global_binding(html_name) {
                    continue;
                }
                if let Some(target) = rule.binding_for(html_name) {
                    let raw = RawValue::from_attribute(attr.node.value.as_deref());
                    let attr_position = self.position(&attr.span);
                    self.set_attribute(&mut block, block_type, target, raw, &path, attr_position);
                }
            }
        }
        self.apply_controls(&mut block, el, &path);

        let container = block_type.is_some_and(|bt| bt.container)
            && !el.self_closing
            && !crate::parser::ast::is_void(&el.name);
        if container {
            block.push_html(markup::open_tag_except(el, &block_only));
            for child in self.build_children(&el.children, block_type, &path)? {
                block.push_block(child);
            }
            block.push_html(markup::close_tag(el));
        } else {
            self.warn_stray_controls(&el.children, &path);
            block.push_html(markup::render_element_except(el, &block_only));
        }
        Ok(block)
    }

    fn build_fallback(
        &mut self,
        el: &Element,
        position: Position,
        path: &NodePath,
        index: usize,
    ) -> BlockNode {
        let path = path.child(HTML_BLOCK, index);
        tracing::debug!(tag = %el.name, %position, "no mapping, keeping raw markup");
        let mut block = BlockNode::new(HTML_BLOCK);
        self.apply_controls(&mut block, el, &path);
        self.warn_stray_controls(&el.children, &path);
        block.push_html(markup::render_element(el));
        block
    }

    /// Coerce and store one attribute, omitting values equal to the schema default
    fn set_attribute(
        &mut self,
        block: &mut BlockNode,
        block_type: Option<&BlockType>,
        name: &str,
        raw: RawValue,
        path: &NodePath,
        position: Position,
    ) {
        let schema = block_type.and_then(|bt| bt.attribute(name));
        let coerced = coerce(name, &raw, schema);
        if let Some(message) = coerced.mismatch {
            self.warn(WarningCategory::AttributeType, message, path, position);
        }
        if schema.and_then(|s| s.default.as_ref()) == Some(&coerced.value) {
            block.attrs.remove(name);
            return;
        }
        block.attrs.insert(name.to_string(), coerced.value);
    }

    /// Read `key`, `templateLock` and `blockEditingMode` from the element
    fn apply_controls(&mut self, block: &mut BlockNode, el: &Element, path: &NodePath) {
        for attr in &el.attributes {
            let value = attr.node.value.as_deref().unwrap_or("").trim();
            let position = self.position(&attr.span);
            match attr.node.name.as_str() {
                "key" if !value.is_empty() => block.key = Some(value.to_string()),
                "key" => self.warn(
                    WarningCategory::ControlAttribute,
                    "empty key ignored".to_string(),
                    path,
                    position,
                ),
                "templateLock" => match TemplateLock::parse(value) {
                    Some(lock) => block.lock = Some(lock),
                    None => self.warn(
                        WarningCategory::ControlAttribute,
                        format!("unknown templateLock value {:?}", value),
                        path,
                        position,
                    ),
                },
                "blockEditingMode" => match EditingMode::parse(value) {
                    Some(mode) => block.editing_mode = Some(mode),
                    None => self.warn(
                        WarningCategory::ControlAttribute,
                        format!("unknown blockEditingMode value {:?}", value),
                        path,
                        position,
                    ),
                },
                _ => {}
            }
        }
    }

    fn warn_stray_controls<'n>(
        &mut self,
        nodes: impl IntoIterator<Item = &'n Spanned<RawNode>>,
        path: &NodePath,
    ) {
        for stray in markup::find_control_attributes(self.source, nodes) {
            self.warn(
                WarningCategory::ControlAttribute,
                format!(
                    "'{}' on <{}> ignored: the element does not become a block",
                    stray.attribute, stray.tag
                ),
                path,
                stray.position,
            );
        }
    }

    /// Fit a child block into a container's allowed children
    fn conform(
        &mut self,
        block: BlockNode,
        parent: &BlockType,
        path: &NodePath,
        index: usize,
        position: Position,
    ) -> BlockNode {
        if parent.allows_child(&block.name) {
            return block;
        }
        let registry = self.registry;
        let wrapper_type = parent
            .default_child
            .as_deref()
            .and_then(|name| registry.lookup(name))
            .filter(|dc| dc.container && dc.allows_child(&block.name));
        if let Some(dc) = wrapper_type {
            tracing::debug!(block = %block.name, wrapper = %dc.name, "wrapping child in default child");
            let mut wrapper = BlockNode::new(dc.name.clone());
            match &dc.wrapper_tag {
                Some(tag) => {
                    wrapper.push_html(format!("<{}>", tag));
                    wrapper.push_block(block);
                    wrapper.push_html(format!("</{}>", tag));
                }
                None => wrapper.push_block(block),
            }
            return wrapper;
        }
        let child_path = path.child(&block.name, index);
        self.warn(
            WarningCategory::Structure,
            format!("{} is not an allowed child of {}", block.name, parent.name),
            &child_path,
            position,
        );
        block
    }
}
