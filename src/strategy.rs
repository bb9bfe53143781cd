// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Apply strategies: how each shape of schema node applies writes, merges and deletes.
//!
//! The strategy tree is built once per schema and configuration and mirrors the schema: one
//! [`Strategy`] per schema node that can appear in data. Applying a [`ModifiedNode`] tree to a
//! [`TreeNode`] tree walks both in lockstep, producing the new nodes bottom-up together with the
//! [`CandidateNode`] describing what changed. After a node has been rebuilt its strategy checks
//! the constraints it enforces (mandatory descendants, element counts, unique tuples, case
//! exclusivity, key leaves), so a violation is reported at the deepest node that detects it.
use crate::{
    DataTreeConfiguration, NodeKind, Path, PathArgument, QName, TreeNode, TreeRandomState,
    candidate::{CandidateNode, ModificationType},
    config::TreeType,
    create_map,
    error::{UsageError, ValidationError},
    modification::{ModifiedNode, Operation},
    node::MutableTreeNode,
    schema::{DataChildren, Schema, SchemaKind, SchemaNode, UniqueConstraint},
    version::Version,
};
use std::{collections::HashMap, sync::Arc};

mod augmentation;
mod choice;
mod container;
mod element_count;
mod leaf;
mod list;
mod mandatory;
mod unique;

pub(crate) use augmentation::AugmentationStrategy;
pub(crate) use choice::ChoiceStrategy;
pub(crate) use container::{ContainerKind, ContainerStrategy};
pub(crate) use leaf::{LeafSetEntryStrategy, LeafStrategy};
pub(crate) use list::{LeafSetStrategy, MapEntryStrategy, MapStrategy};

/// The apply strategy of one schema node.
pub(crate) enum Strategy {
    Leaf(LeafStrategy),
    LeafSetEntry(LeafSetEntryStrategy),
    Container(ContainerStrategy),
    MapEntry(MapEntryStrategy),
    Map(MapStrategy),
    LeafSet(LeafSetStrategy),
    Choice(ChoiceStrategy),
    Augmentation(AugmentationStrategy),
}

/// Settings that shape the strategy tree.
pub(crate) struct BuildContext {
    tree_type: TreeType,
    mandatory: bool,
    unique: bool,
}

impl BuildContext {
    fn includes(&self, node: &SchemaNode) -> bool {
        node.is_config() || self.tree_type == TreeType::Operational
    }
}

/// The strategies of the children of a container-like node, by path argument.
pub(crate) struct ChildStrategies {
    named: HashMap<QName, Arc<Strategy>, TreeRandomState>,
    augmentations: HashMap<crate::AugmentationId, Arc<Strategy>, TreeRandomState>,
}

impl ChildStrategies {
    pub(crate) fn build(body: &DataChildren, ctx: &BuildContext) -> Self {
        let mut named = create_map();
        for child in body.children().iter().filter(|c| ctx.includes(c)) {
            named.insert(child.name().clone(), Arc::new(Strategy::from_schema(child, ctx)));
        }
        let mut augmentations = create_map();
        for augmentation in body.augmentations() {
            let strategy = AugmentationStrategy::new(augmentation, ctx);
            augmentations.insert(augmentation.id(), Arc::new(Strategy::Augmentation(strategy)));
        }
        Self {
            named,
            augmentations,
        }
    }

    /// Merges the children of several bodies, as a choice does with its cases.
    pub(crate) fn extend(&mut self, other: ChildStrategies) {
        self.named.extend(other.named);
        self.augmentations.extend(other.augmentations);
    }

    pub(crate) fn empty() -> Self {
        Self {
            named: create_map(),
            augmentations: create_map(),
        }
    }

    pub(crate) fn get(&self, id: &PathArgument) -> Option<&Arc<Strategy>> {
        match id {
            PathArgument::Node(name) => self.named.get(name),
            PathArgument::Augmentation(aug) => self.augmentations.get(aug),
            PathArgument::Entry(_) | PathArgument::LeafListEntry { .. } => None,
        }
    }
}

macro_rules! dispatch {
    ($strategy:expr, $s:ident => $body:expr) => {
        match $strategy {
            Strategy::Leaf($s) => $body,
            Strategy::LeafSetEntry($s) => $body,
            Strategy::Container($s) => $body,
            Strategy::MapEntry($s) => $body,
            Strategy::Map($s) => $body,
            Strategy::LeafSet($s) => $body,
            Strategy::Choice($s) => $body,
            Strategy::Augmentation($s) => $body,
        }
    };
}

impl Strategy {
    fn from_schema(node: &SchemaNode, ctx: &BuildContext) -> Self {
        let name = node.name().clone();
        match node.kind() {
            SchemaKind::Leaf { .. } => Strategy::Leaf(LeafStrategy::new(name)),
            SchemaKind::LeafList {
                ordered_by,
                elements,
            } => Strategy::LeafSet(LeafSetStrategy::new(name, *ordered_by, *elements)),
            SchemaKind::Container { presence, body } => {
                let kind = if *presence {
                    ContainerKind::Presence
                } else {
                    ContainerKind::Structural
                };
                Strategy::Container(ContainerStrategy::new(
                    PathArgument::Node(name),
                    kind,
                    body,
                    ctx,
                ))
            }
            SchemaKind::List {
                keys,
                ordered_by,
                elements,
                unique,
                body,
            } => {
                let entry = MapEntryStrategy::new(name.clone(), keys.clone(), body, ctx);
                let unique: &[UniqueConstraint] = if ctx.unique { unique } else { &[] };
                Strategy::Map(MapStrategy::new(
                    name,
                    *ordered_by,
                    *elements,
                    unique,
                    Strategy::MapEntry(entry),
                ))
            }
            SchemaKind::Choice { cases, .. } => {
                Strategy::Choice(ChoiceStrategy::new(name, cases, ctx))
            }
        }
    }

    /// Builds the strategy of the node at the configured root path.
    pub(crate) fn for_tree(
        schema: &Schema,
        config: &DataTreeConfiguration,
    ) -> Result<Arc<Strategy>, UsageError> {
        let ctx = BuildContext {
            tree_type: config.tree_type(),
            mandatory: config.mandatory_nodes_validation(),
            unique: config.unique_indexes(),
        };
        let mut strategy = Arc::new(Strategy::Container(ContainerStrategy::new(
            PathArgument::Node(QName::root()),
            ContainerKind::Root,
            &schema.body,
            &ctx,
        )));
        for arg in config.root_path() {
            strategy = strategy
                .child(arg)
                .cloned()
                .ok_or_else(|| UsageError::InvalidRootPath {
                    path: config.root_path().clone(),
                })?;
        }
        match strategy.node_kind() {
            NodeKind::Container | NodeKind::MapEntry | NodeKind::Map | NodeKind::OrderedMap => {
                Ok(strategy)
            }
            kind => Err(UsageError::UnsupportedRootPath {
                path: config.root_path().clone(),
                kind,
            }),
        }
    }

    /// The identifier of the root node of a tree rooted at `root_path`.
    pub(crate) fn root_identifier(root_path: &Path) -> PathArgument {
        root_path
            .last()
            .cloned()
            .unwrap_or_else(|| PathArgument::Node(QName::root()))
    }

    pub(crate) fn node_kind(&self) -> NodeKind {
        match self {
            Strategy::Leaf(_) => NodeKind::Leaf,
            Strategy::LeafSetEntry(_) => NodeKind::LeafSetEntry,
            Strategy::Container(_) => NodeKind::Container,
            Strategy::MapEntry(_) => NodeKind::MapEntry,
            Strategy::Map(s) => s.node_kind(),
            Strategy::LeafSet(s) => s.node_kind(),
            Strategy::Choice(_) => NodeKind::Choice,
            Strategy::Augmentation(_) => NodeKind::Augmentation,
        }
    }

    pub(crate) fn is_leaf_like(&self) -> bool {
        self.node_kind().is_leaf_like()
    }

    /// Whether this node exists only by virtue of having children: it is created when a child is
    /// added and removed together with its last child.
    pub(crate) fn is_automatic(&self) -> bool {
        match self {
            Strategy::Container(s) => s.kind() == ContainerKind::Structural,
            Strategy::Map(_)
            | Strategy::LeafSet(_)
            | Strategy::Choice(_)
            | Strategy::Augmentation(_) => true,
            Strategy::Leaf(_) | Strategy::LeafSetEntry(_) | Strategy::MapEntry(_) => false,
        }
    }

    /// Whether a node identified by `id` can be governed by this strategy.
    pub(crate) fn accepts(&self, id: &PathArgument) -> bool {
        dispatch!(self, s => s.accepts(id))
    }

    pub(crate) fn child(&self, id: &PathArgument) -> Option<&Arc<Strategy>> {
        match self {
            Strategy::Leaf(_) | Strategy::LeafSetEntry(_) => None,
            Strategy::Container(s) => s.children().get(id),
            Strategy::MapEntry(s) => s.children().get(id),
            Strategy::Map(s) => s.child(id),
            Strategy::LeafSet(s) => s.child(id),
            Strategy::Choice(s) => s.children().get(id),
            Strategy::Augmentation(s) => s.children().get(id),
        }
    }

    /// An empty node for `id`, the starting point of automatically created nodes and of
    /// rewritten deleted ones.
    pub(crate) fn empty_node(&self, id: &PathArgument) -> TreeNode {
        match (self, id) {
            (Strategy::MapEntry(_), PathArgument::Entry(entry)) => {
                TreeNode::map_entry(entry.clone(), [])
            }
            _ => TreeNode::empty(id.clone(), self.node_kind()),
        }
    }

    /// Checks that `node` has the shape this strategy expects, all the way down.
    ///
    /// Run when data enters a modification, so that malformed data is rejected before it
    /// alters anything.
    pub(crate) fn verify_structure(
        &self,
        path: &Path,
        node: &TreeNode,
    ) -> Result<(), ValidationError> {
        if node.kind() != self.node_kind() {
            return Err(ValidationError::WrongKind {
                path: path.clone(),
                expected: self.node_kind(),
                found: node.kind(),
            });
        }
        if !self.accepts(node.identifier()) {
            return Err(ValidationError::IdentifierMismatch {
                path: path.clone(),
                found: node.identifier().clone(),
            });
        }
        for child in node.children() {
            let child_path = path.child(child.identifier().clone());
            let Some(strategy) = self.child(child.identifier()) else {
                return Err(unknown_child(child_path, child.identifier()));
            };
            strategy.verify_structure(&child_path, child)?;
        }
        Ok(())
    }

    /// Checks the constraints this node enforces on its own new state.
    ///
    /// `changed` lists the children touched by an incremental edit, or is `None` if the node was
    /// written as a whole.
    fn verify_after(
        &self,
        path: &Path,
        before: Option<&TreeNode>,
        after: Option<&TreeNode>,
        changed: Option<&[PathArgument]>,
    ) -> Result<(), ValidationError> {
        match self {
            Strategy::Leaf(_) | Strategy::LeafSetEntry(_) | Strategy::Augmentation(_) => Ok(()),
            Strategy::Container(s) => s.verify(path, after),
            Strategy::MapEntry(s) => s.verify(path, after),
            Strategy::Map(s) => s.verify(path, before, after, changed),
            Strategy::LeafSet(s) => s.verify(path, after),
            Strategy::Choice(s) => s.verify(path, before, after),
        }
    }

    /// Checks the constraints of every node below `node`, deepest first, as if each had been
    /// written as a whole.
    fn verify_descendants(&self, path: &Path, node: &TreeNode) -> Result<(), ValidationError> {
        for child in node.children() {
            let child_path = path.child(child.identifier().clone());
            let Some(strategy) = self.child(child.identifier()) else {
                return Err(unknown_child(child_path, child.identifier()));
            };
            strategy.verify_descendants(&child_path, child)?;
            strategy.verify_after(&child_path, None, Some(child), None)?;
        }
        Ok(())
    }

    /// Applies `modification` to the node at `path`, currently `current`.
    pub(crate) fn apply(
        &self,
        path: &Path,
        modification: &ModifiedNode,
        current: Option<&TreeNode>,
        version: Version,
    ) -> Result<CandidateNode, ValidationError> {
        let id = modification.identifier();
        match modification.operation() {
            Operation::None => Ok(CandidateNode::unmodified(id.clone(), current.cloned())),
            Operation::Delete => {
                if current.is_some() {
                    self.verify_after(path, current, None, None)?;
                }
                Ok(CandidateNode::written(id.clone(), current.cloned(), None))
            }
            Operation::Write(value) => self.apply_write(path, modification, current, value, version),
            Operation::Merge(value) => match current {
                Some(current) if !self.is_leaf_like() => {
                    self.apply_touch(path, modification, Some(current), version)
                }
                _ => self.apply_write(path, modification, current, value, version),
            },
            Operation::Touch => self.apply_touch(path, modification, current, version),
        }
    }

    /// Applies `modification` to the root of a tree. The root never disappears; removing it
    /// leaves an empty root behind.
    pub(crate) fn apply_root(
        &self,
        path: &Path,
        modification: &ModifiedNode,
        current: &TreeNode,
        version: Version,
    ) -> Result<CandidateNode, ValidationError> {
        let candidate = self.apply(path, modification, Some(current), version)?;
        if candidate.data_after().is_some() {
            return Ok(candidate);
        }
        let empty = self.empty_node(current.identifier()).stamped(version);
        self.verify_after(path, Some(current), Some(&empty), None)?;
        Ok(CandidateNode::replaced(
            current.identifier().clone(),
            current.clone(),
            empty,
        ))
    }

    fn apply_write(
        &self,
        path: &Path,
        modification: &ModifiedNode,
        current: Option<&TreeNode>,
        value: &TreeNode,
        version: Version,
    ) -> Result<CandidateNode, ValidationError> {
        let base = value.stamped(version);
        let (after, _) = self.apply_children(path, modification, &base, version)?;
        let after = self.drop_if_vacant(after);
        if let Some(after) = &after {
            self.verify_descendants(path, after)?;
        }
        self.verify_after(path, current, after.as_ref(), None)?;
        Ok(CandidateNode::written(
            modification.identifier().clone(),
            current.cloned(),
            after,
        ))
    }

    fn apply_touch(
        &self,
        path: &Path,
        modification: &ModifiedNode,
        current: Option<&TreeNode>,
        version: Version,
    ) -> Result<CandidateNode, ValidationError> {
        let id = modification.identifier();
        if self.is_leaf_like() {
            return Ok(CandidateNode::unmodified(id.clone(), current.cloned()));
        }
        let base = match current {
            Some(current) => current.clone(),
            None if self.is_automatic() => self.empty_node(id).stamped(version),
            None => return Err(ValidationError::NodeDoesNotExist { path: path.clone() }),
        };
        let (after, children) = self.apply_children(path, modification, &base, version)?;
        if current.is_some() && children.is_empty() {
            return Ok(CandidateNode::unmodified(id.clone(), current.cloned()));
        }
        let after = self.drop_if_vacant(after);
        let changed: Vec<_> = children.iter().map(|c| c.identifier().clone()).collect();
        self.verify_after(path, current, after.as_ref(), Some(&changed))?;
        let modification_type = match (current, &after) {
            (None, None) => ModificationType::Unmodified,
            (None, Some(_)) => ModificationType::Appeared,
            (Some(_), None) => ModificationType::Disappeared,
            (Some(_), Some(_)) => ModificationType::SubtreeModified,
        };
        Ok(CandidateNode::applied(
            id.clone(),
            modification_type,
            current.cloned(),
            after,
            children,
        ))
    }

    /// Applies the child modifications of `modification` on top of `base`.
    ///
    /// Returns `base` itself if no child changed, along with the candidates of the children
    /// that did.
    fn apply_children(
        &self,
        path: &Path,
        modification: &ModifiedNode,
        base: &TreeNode,
        version: Version,
    ) -> Result<(TreeNode, Vec<CandidateNode>), ValidationError> {
        let mut node = MutableTreeNode::from_node(base);
        let mut candidates = Vec::new();
        for child in modification.children() {
            let child_id = child.identifier();
            let child_path = path.child(child_id.clone());
            let Some(strategy) = self.child(child_id) else {
                return Err(unknown_child(child_path, child_id));
            };
            let candidate = strategy.apply(&child_path, child, node.child(child_id), version)?;
            if candidate.modification_type() == ModificationType::Unmodified {
                continue;
            }
            match candidate.data_after() {
                Some(after) => node.put(after.clone()),
                None => node.remove(child_id),
            }
            candidates.push(candidate);
        }
        if !node.is_changed() {
            return Ok((base.clone(), candidates));
        }
        Ok((node.seal(version), candidates))
    }

    fn drop_if_vacant(&self, node: TreeNode) -> Option<TreeNode> {
        (!self.is_automatic() || node.child_count() > 0).then_some(node)
    }
}

pub(crate) fn unknown_child(path: Path, id: &PathArgument) -> ValidationError {
    match id {
        PathArgument::Augmentation(found) => ValidationError::UnknownAugmentation {
            found: found.clone(),
            path,
        },
        _ => ValidationError::UnknownElement { path },
    }
}
