// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use crate::{PathArgument, TreeNode, TreeRandomState, create_map, strategy::Strategy};
use std::{collections::HashMap, sync::Arc};

/// What a modification does to one node.
#[derive(Debug, Clone)]
pub(crate) enum Operation {
    /// Nothing, yet.
    None,
    /// Only descendants are modified.
    Touch,
    /// Replace the node with this one, then apply the child modifications on top.
    Write(TreeNode),
    /// Merge into the node. Holds the node without its children; merged children become child
    /// modifications.
    Merge(TreeNode),
    Delete,
}

/// One node of the overlay a modification records its operations in.
///
/// The overlay mirrors the shape of the data it modifies, but only along the paths that were
/// touched. Each node remembers the data it was modifying when it was created, which is what
/// conflict detection compares against the current state of the tree.
#[derive(Debug)]
pub(crate) struct ModifiedNode {
    identifier: PathArgument,
    operation: Operation,
    original: Option<TreeNode>,
    children: Vec<ModifiedNode>,
    index: HashMap<PathArgument, usize, TreeRandomState>,
}

impl ModifiedNode {
    fn new(identifier: PathArgument, original: Option<TreeNode>) -> Self {
        Self {
            identifier,
            operation: Operation::None,
            original,
            children: Vec::new(),
            index: create_map(),
        }
    }

    pub(crate) fn root(original: &TreeNode) -> Self {
        Self::new(original.identifier().clone(), Some(original.clone()))
    }

    pub(crate) fn identifier(&self) -> &PathArgument {
        &self.identifier
    }

    pub(crate) fn operation(&self) -> &Operation {
        &self.operation
    }

    pub(crate) fn original(&self) -> Option<&TreeNode> {
        self.original.as_ref()
    }

    /// Child modifications, in the order they were first made.
    pub(crate) fn children(&self) -> &[ModifiedNode] {
        &self.children
    }

    /// The modification of child `id`, created if necessary.
    ///
    /// A node whose descendants are modified is at least touched. A deleted node is rewritten
    /// as an empty node of the shape `strategy` gives it, so that the child can be added back.
    pub(crate) fn child_mut(&mut self, id: &PathArgument, strategy: &Strategy) -> &mut ModifiedNode {
        match self.operation {
            Operation::None => self.operation = Operation::Touch,
            Operation::Delete => {
                self.operation = Operation::Write(strategy.empty_node(&self.identifier));
            }
            Operation::Touch | Operation::Write(_) | Operation::Merge(_) => {}
        }
        let i = match self.index.get(id) {
            Some(&i) => i,
            None => {
                let original = self.original.as_ref().and_then(|o| o.child(id)).cloned();
                self.children.push(ModifiedNode::new(id.clone(), original));
                let i = self.children.len() - 1;
                self.index.insert(id.clone(), i);
                i
            }
        };
        &mut self.children[i]
    }

    fn clear_children(&mut self) {
        self.children.clear();
        self.index.clear();
    }

    pub(crate) fn write(&mut self, value: TreeNode) {
        self.operation = Operation::Write(value);
        self.clear_children();
    }

    pub(crate) fn delete(&mut self) {
        self.operation = Operation::Delete;
        self.clear_children();
    }

    /// Merges `value` into this node, expanding it into child modifications.
    ///
    /// Leaf-like nodes have no children to merge into, so the value is written instead.
    pub(crate) fn merge(&mut self, strategy: &Strategy, value: &TreeNode) {
        if strategy.is_leaf_like() {
            self.write(value.clone());
            return;
        }
        match self.operation {
            Operation::None | Operation::Touch => self.operation = Operation::Merge(value.shell()),
            Operation::Delete => self.operation = Operation::Write(value.shell()),
            Operation::Write(_) | Operation::Merge(_) => {}
        }
        for child in value.children() {
            let Some(child_strategy) = strategy.child(child.identifier()) else {
                continue;
            };
            let child_strategy = Arc::clone(child_strategy);
            self.child_mut(child.identifier(), strategy)
                .merge(&child_strategy, child);
        }
    }

    /// Drops child modifications that do nothing, recursively. A touched node left without
    /// child modifications does nothing either.
    pub(crate) fn seal(&mut self) {
        for child in &mut self.children {
            child.seal();
        }
        self.children
            .retain(|c| !matches!(c.operation, Operation::None));
        if matches!(self.operation, Operation::Touch) && self.children.is_empty() {
            self.operation = Operation::None;
        }
        self.index = self
            .children
            .iter()
            .enumerate()
            .map(|(i, c)| (c.identifier.clone(), i))
            .collect();
    }
}
