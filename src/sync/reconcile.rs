//! Key-based merge of a freshly compiled tree with persisted content
//!
//! The template decides structure. Persisted content survives only through
//! keyed blocks: a keyed template block matched by key in the corresponding
//! sibling list keeps the user-editable parts of its persisted counterpart.
//! Unkeyed blocks are the template's; their positional match in the persisted
//! tree only tells where to look for keyed descendants.

use std::collections::HashMap;

use crate::block::{BlockNode, EditingMode, InnerContent, Policy};
use crate::diagnostics::{Diagnostics, NodePath, Warning, WarningCategory};
use crate::registry::Registry;

/// Keys grouped by what reconciliation did with them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Keyed blocks whose persisted content was kept
    pub preserved: Vec<String>,
    /// Keyed blocks new in the template
    pub inserted: Vec<String>,
    /// Persisted keyed blocks no longer in the template
    pub dropped: Vec<String>,
    /// Keyed blocks matched but replaced by the template version
    pub replaced: Vec<String>,
}

impl ReconcileReport {
    pub fn is_unchanged(&self) -> bool {
        self.inserted.is_empty() && self.dropped.is_empty() && self.replaced.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub blocks: Vec<BlockNode>,
    pub report: ReconcileReport,
    pub warnings: Vec<Warning>,
}

/// Merge `template` with `persisted`
pub fn reconcile(template: &[BlockNode], persisted: &[BlockNode], registry: &Registry) -> Reconciled {
    let mut reconciler = Reconciler {
        registry,
        report: ReconcileReport::default(),
        diagnostics: Diagnostics::new(),
    };
    let template: Vec<&BlockNode> = template.iter().collect();
    let persisted: Vec<&BlockNode> = persisted.iter().collect();
    let blocks = reconciler.siblings(&template, &persisted, Policy::default(), &NodePath::root());
    tracing::debug!(
        preserved = reconciler.report.preserved.len(),
        inserted = reconciler.report.inserted.len(),
        dropped = reconciler.report.dropped.len(),
        replaced = reconciler.report.replaced.len(),
        "reconciled"
    );
    Reconciled {
        blocks,
        report: reconciler.report,
        warnings: reconciler.diagnostics.into_warnings(),
    }
}

struct Reconciler<'a> {
    registry: &'a Registry,
    report: ReconcileReport,
    diagnostics: Diagnostics,
}

impl Reconciler<'_> {
    fn siblings(
        &mut self,
        template: &[&BlockNode],
        persisted: &[&BlockNode],
        parent: Policy,
        path: &NodePath,
    ) -> Vec<BlockNode> {
        let mut consumed = vec![false; persisted.len()];
        let mut by_key: HashMap<&str, usize> = HashMap::new();
        for (i, node) in persisted.iter().enumerate() {
            let Some(key) = node.key.as_deref() else {
                continue;
            };
            if by_key.contains_key(key) {
                self.diagnostics.warn(
                    WarningCategory::Reconcile,
                    format!("duplicate persisted key '{}', keeping the first", key),
                    &path.child(&node.name, i),
                );
            } else {
                by_key.insert(key, i);
            }
        }

        let mut out = Vec::with_capacity(template.len());
        for (i, t) in template.iter().copied().enumerate() {
            let policy = parent.inherit(t);
            let child_path = path.child(&t.name, i);
            match t.key.as_deref() {
                Some(key) => match by_key.get(key).copied() {
                    Some(j) if !consumed[j] => {
                        consumed[j] = true;
                        out.push(self.merge(t, persisted[j], policy, &child_path));
                    }
                    _ => {
                        tracing::debug!(key, path = %child_path, "inserting keyed block");
                        self.report.inserted.push(key.to_string());
                        out.push(self.rescope(t, &[], policy, &child_path));
                    }
                },
                None => {
                    let matched = persisted
                        .iter()
                        .enumerate()
                        .position(|(j, p)| !consumed[j] && p.key.is_none() && p.name == t.name);
                    let scope: Vec<&BlockNode> = match matched {
                        Some(j) => {
                            consumed[j] = true;
                            persisted[j].inner_blocks().collect()
                        }
                        None => Vec::new(),
                    };
                    out.push(self.rescope(t, &scope, policy, &child_path));
                }
            }
        }

        for (j, p) in persisted.iter().enumerate() {
            if !consumed[j] {
                self.drop_subtree(p);
            }
        }
        out
    }

    /// Report every keyed block in a discarded persisted subtree
    fn drop_subtree(&mut self, p: &BlockNode) {
        p.walk(&mut |node| {
            if let Some(key) = &node.key {
                tracing::debug!(key = %key, "dropping persisted block");
                self.report.dropped.push(key.clone());
            }
        });
    }

    /// Template block whose inner blocks are reconciled against `scope`
    fn rescope(&mut self, t: &BlockNode, scope: &[&BlockNode], policy: Policy, path: &NodePath) -> BlockNode {
        let template: Vec<&BlockNode> = t.inner_blocks().collect();
        let mut children = self.siblings(&template, scope, policy, path).into_iter();
        let mut node = t.clone();
        for piece in &mut node.inner {
            if let InnerContent::Block(child) = piece {
                if let Some(merged) = children.next() {
                    *child = merged;
                }
            }
        }
        node
    }

    fn merge(&mut self, t: &BlockNode, p: &BlockNode, policy: Policy, path: &NodePath) -> BlockNode {
        let key = t.key.clone().unwrap_or_default();
        if policy.editing_mode == Some(EditingMode::Disabled) || t.name != p.name {
            tracing::debug!(key = %key, from = %p.name, to = %t.name, "template replaces keyed block");
            self.report.replaced.push(key);
            for child in p.inner_blocks() {
                self.drop_subtree(child);
            }
            return self.rescope(t, &[], policy, path);
        }

        let container = self.registry.is_container(&t.name) || t.has_inner_blocks();
        let mut node = if container && policy.locks_structure() {
            let scope: Vec<&BlockNode> = p.inner_blocks().collect();
            self.rescope(t, &scope, policy, path)
        } else {
            let mut node = t.clone();
            node.inner = p.inner.clone();
            node
        };
        self.carry_content_attributes(&mut node, p);
        tracing::debug!(key = %key, path = %path, "preserved keyed block");
        self.report.preserved.push(key);
        node
    }

    /// Replace content-role attributes with the persisted values
    fn carry_content_attributes(&self, node: &mut BlockNode, p: &BlockNode) {
        let Some(schema) = self.registry.lookup(&node.name) else {
            return;
        };
        node.attrs.retain(|name, _| !schema.is_content_attribute(name));
        for (name, value) in &p.attrs {
            if schema.is_content_attribute(name) {
                node.attrs.insert(name.clone(), value.clone());
            }
        }
    }
}
