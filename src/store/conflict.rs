// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Detection of conflicts between a modification and the commits made since its snapshot.
//!
//! Every node of a modification's overlay remembers the data it started from. Comparing that
//! with the node currently in the tree tells whether someone else changed it in the meantime:
//! the node-local version changes when a node is written, the subtree version whenever
//! anything below it changes.
use crate::{
    Path, TreeNode,
    error::{ConflictError, ConflictReason},
    modification::{ModifiedNode, Operation},
    strategy::Strategy,
};

pub(crate) fn check(
    path: &Path,
    modified: &ModifiedNode,
    current: Option<&TreeNode>,
    strategy: &Strategy,
) -> Result<(), ConflictError> {
    let original = modified.original();
    match modified.operation() {
        Operation::None => Ok(()),
        Operation::Write(_) => check_replaced(path, original, current),
        Operation::Delete => match (original, current) {
            (Some(_), None) => Err(ConflictError::NodeDoesNotExist {
                path: path.clone(),
                action: "Cannot delete it.",
            }),
            _ => check_replaced(path, original, current),
        },
        Operation::Merge(_) if strategy.is_leaf_like() => check_replaced(path, original, current),
        Operation::Merge(_) => match (original, current) {
            (Some(_), None) => Err(ConflictError::NodeDoesNotExist {
                path: path.clone(),
                action: "Cannot merge into it.",
            }),
            _ => check_children(path, modified, current, strategy),
        },
        Operation::Touch => match (original, current) {
            (_, None) if !strategy.is_automatic() => Err(ConflictError::NodeDoesNotExist {
                path: path.clone(),
                action: "Cannot apply modification to its children.",
            }),
            (Some(original), Some(current))
                if original.subtree_version() == current.subtree_version() =>
            {
                Ok(())
            }
            _ => check_children(path, modified, current, strategy),
        },
    }
}

/// A node the modification replaces must not have changed at all.
fn check_replaced(
    path: &Path,
    original: Option<&TreeNode>,
    current: Option<&TreeNode>,
) -> Result<(), ConflictError> {
    let reason = match (original, current) {
        (None, None) => return Ok(()),
        (Some(original), Some(current)) => {
            if original.version() != current.version() {
                ConflictReason::Replaced
            } else if original.subtree_version() != current.subtree_version() {
                ConflictReason::ChildrenModified
            } else {
                return Ok(());
            }
        }
        (Some(_), None) => ConflictReason::Deleted,
        (None, Some(_)) => ConflictReason::Created,
    };
    tracing::trace!(%path, ?reason, "conflict");
    Err(ConflictError::ConflictingModification {
        path: path.clone(),
        reason,
    })
}

fn check_children(
    path: &Path,
    modified: &ModifiedNode,
    current: Option<&TreeNode>,
    strategy: &Strategy,
) -> Result<(), ConflictError> {
    for child in modified.children() {
        let id = child.identifier();
        // children the current schema no longer knows fail when applied
        let Some(child_strategy) = strategy.child(id) else {
            continue;
        };
        check(
            &path.child(id.clone()),
            child,
            current.and_then(|c| c.child(id)),
            child_strategy,
        )?;
    }
    Ok(())
}
