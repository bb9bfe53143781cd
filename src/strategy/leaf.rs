// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use crate::{PathArgument, QName};

/// Leaves have no children; writes and merges both replace the value.
pub(crate) struct LeafStrategy {
    name: QName,
}

impl LeafStrategy {
    pub(crate) fn new(name: QName) -> Self {
        Self { name }
    }

    pub(crate) fn accepts(&self, id: &PathArgument) -> bool {
        matches!(id, PathArgument::Node(name) if *name == self.name)
    }
}

/// One value of a leaf-list, identified by that very value.
///
/// [`TreeNode::leaf_set_entry`](crate::TreeNode::leaf_set_entry) derives the identifier from the
/// value, so the two cannot disagree.
pub(crate) struct LeafSetEntryStrategy {
    name: QName,
}

impl LeafSetEntryStrategy {
    pub(crate) fn new(name: QName) -> Self {
        Self { name }
    }

    pub(crate) fn accepts(&self, id: &PathArgument) -> bool {
        matches!(id, PathArgument::LeafListEntry { name, .. } if *name == self.name)
    }
}
