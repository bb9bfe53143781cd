// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{
    BuildContext, ChildStrategies, LeafSetEntryStrategy, Strategy,
    element_count::ElementCountValidator, mandatory::MandatoryEnforcer, unique::UniqueValidator,
};
use crate::{
    NodeKind, Path, PathArgument, QName, TreeNode,
    error::ValidationError,
    schema::{DataChildren, ElementCount, OrderedBy, UniqueConstraint},
};
use std::sync::Arc;

/// A keyed list.
pub(crate) struct MapStrategy {
    name: QName,
    ordered: bool,
    entry: Arc<Strategy>,
    elements: Option<ElementCountValidator>,
    unique: Option<UniqueValidator>,
}

impl MapStrategy {
    pub(crate) fn new(
        name: QName,
        ordered_by: OrderedBy,
        elements: ElementCount,
        unique: &[UniqueConstraint],
        entry: Strategy,
    ) -> Self {
        Self {
            name,
            ordered: ordered_by == OrderedBy::User,
            entry: Arc::new(entry),
            elements: ElementCountValidator::new(elements),
            unique: UniqueValidator::new(unique),
        }
    }

    pub(crate) fn node_kind(&self) -> NodeKind {
        if self.ordered {
            NodeKind::OrderedMap
        } else {
            NodeKind::Map
        }
    }

    pub(crate) fn child(&self, id: &PathArgument) -> Option<&Arc<Strategy>> {
        self.entry.accepts(id).then_some(&self.entry)
    }

    pub(crate) fn accepts(&self, id: &PathArgument) -> bool {
        matches!(id, PathArgument::Node(name) if *name == self.name)
    }

    pub(crate) fn verify(
        &self,
        path: &Path,
        before: Option<&TreeNode>,
        after: Option<&TreeNode>,
        changed: Option<&[PathArgument]>,
    ) -> Result<(), ValidationError> {
        if let Some(elements) = &self.elements {
            elements.check(path, after)?;
        }
        if let Some(unique) = &self.unique {
            unique.check(path, before, after, changed)?;
        }
        Ok(())
    }
}

/// One entry of a keyed list.
pub(crate) struct MapEntryStrategy {
    name: QName,
    /// Sorted, like the keys of an [`EntryId`](crate::EntryId).
    keys: Vec<QName>,
    children: ChildStrategies,
    mandatory: Option<MandatoryEnforcer>,
}

impl MapEntryStrategy {
    pub(crate) fn new(
        name: QName,
        mut keys: Vec<QName>,
        body: &DataChildren,
        ctx: &BuildContext,
    ) -> Self {
        keys.sort();
        Self {
            name,
            keys,
            children: ChildStrategies::build(body, ctx),
            mandatory: MandatoryEnforcer::for_body(body, ctx),
        }
    }

    pub(crate) fn children(&self) -> &ChildStrategies {
        &self.children
    }

    pub(crate) fn accepts(&self, id: &PathArgument) -> bool {
        let PathArgument::Entry(entry) = id else {
            return false;
        };
        *entry.name() == self.name
            && entry.keys().len() == self.keys.len()
            && entry
                .keys()
                .iter()
                .zip(&self.keys)
                .all(|((name, _), key)| name == key)
    }

    /// Key leaves must be present and agree with the entry's identifier.
    pub(crate) fn verify(&self, path: &Path, after: Option<&TreeNode>) -> Result<(), ValidationError> {
        let Some(after) = after else {
            return Ok(());
        };
        if let PathArgument::Entry(entry) = after.identifier() {
            for (key, expected) in entry.keys() {
                let leaf = after
                    .child(&PathArgument::Node(key.clone()))
                    .and_then(TreeNode::value);
                match leaf {
                    None => {
                        return Err(ValidationError::MissingKeyLeaf {
                            path: path.clone(),
                            key: key.clone(),
                        });
                    }
                    Some(found) if found != expected => {
                        return Err(ValidationError::KeyLeafMismatch {
                            path: path.clone(),
                            key: key.clone(),
                            expected: expected.clone(),
                            found: found.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        match &self.mandatory {
            Some(mandatory) => mandatory.check(path, after),
            None => Ok(()),
        }
    }
}

/// A leaf-list.
pub(crate) struct LeafSetStrategy {
    name: QName,
    ordered: bool,
    entry: Arc<Strategy>,
    elements: Option<ElementCountValidator>,
}

impl LeafSetStrategy {
    pub(crate) fn new(name: QName, ordered_by: OrderedBy, elements: ElementCount) -> Self {
        Self {
            entry: Arc::new(Strategy::LeafSetEntry(LeafSetEntryStrategy::new(name.clone()))),
            name,
            ordered: ordered_by == OrderedBy::User,
            elements: ElementCountValidator::new(elements),
        }
    }

    pub(crate) fn node_kind(&self) -> NodeKind {
        if self.ordered {
            NodeKind::OrderedLeafSet
        } else {
            NodeKind::LeafSet
        }
    }

    pub(crate) fn child(&self, id: &PathArgument) -> Option<&Arc<Strategy>> {
        self.entry.accepts(id).then_some(&self.entry)
    }

    pub(crate) fn accepts(&self, id: &PathArgument) -> bool {
        matches!(id, PathArgument::Node(name) if *name == self.name)
    }

    pub(crate) fn verify(&self, path: &Path, after: Option<&TreeNode>) -> Result<(), ValidationError> {
        match &self.elements {
            Some(elements) => elements.check(path, after),
            None => Ok(()),
        }
    }
}
