// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Candidates: the diff a prepared modification would apply to a tree.
//!
//! A [`Candidate`] pairs the before and after state of every node the modification affected
//! with a [`ModificationType`] classifying the change. Nodes the modification wrote wholesale
//! compute the diff of their children lazily, on first access, by comparing the two subtrees.
//!
//! Besides being committed, candidates can be [aggregated](Candidate::aggregate) into a single
//! candidate covering a sequence of commits, and [replayed](Candidate::apply_to_modification)
//! onto another modification, possibly of another tree.
use crate::{
    Modification, ModificationCursor, Path, PathArgument, TreeNode,
    error::{Result, UsageError},
    version::Version,
};
use std::{
    fmt,
    sync::{Arc, OnceLock},
};

/// How a node changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum ModificationType {
    /// Neither the node nor anything below it changed.
    Unmodified,
    /// The node was written; its previous content, if any, is discarded.
    Write,
    /// The node was deleted.
    Delete,
    /// The node is retained, and at least one of its descendants changed.
    SubtreeModified,
    /// The node was created as a side effect of a descendant being written.
    Appeared,
    /// The node was removed as a side effect of its last descendant being removed.
    Disappeared,
}

/// The change to one node of a tree.
#[derive(Clone)]
pub struct CandidateNode(Arc<CandidateInner>);

struct CandidateInner {
    identifier: PathArgument,
    modification_type: ModificationType,
    before: Option<TreeNode>,
    after: Option<TreeNode>,
    children: OnceLock<Vec<CandidateNode>>,
}

impl CandidateNode {
    fn from_parts(
        identifier: PathArgument,
        modification_type: ModificationType,
        before: Option<TreeNode>,
        after: Option<TreeNode>,
        children: Option<Vec<CandidateNode>>,
    ) -> Self {
        let lock = OnceLock::new();
        if let Some(children) = children {
            let _ = lock.set(children);
        }
        Self(Arc::new(CandidateInner {
            identifier,
            modification_type,
            before,
            after,
            children: lock,
        }))
    }

    pub(crate) fn unmodified(identifier: PathArgument, node: Option<TreeNode>) -> Self {
        Self::from_parts(
            identifier,
            ModificationType::Unmodified,
            node.clone(),
            node,
            Some(Vec::new()),
        )
    }

    /// A node replaced wholesale, or deleted if `after` is `None`.
    pub(crate) fn written(
        identifier: PathArgument,
        before: Option<TreeNode>,
        after: Option<TreeNode>,
    ) -> Self {
        let modification_type = match (&before, &after) {
            (None, None) => ModificationType::Unmodified,
            (Some(_), None) => ModificationType::Delete,
            (_, Some(_)) => ModificationType::Write,
        };
        Self::from_parts(identifier, modification_type, before, after, None)
    }

    pub(crate) fn applied(
        identifier: PathArgument,
        modification_type: ModificationType,
        before: Option<TreeNode>,
        after: Option<TreeNode>,
        children: Vec<CandidateNode>,
    ) -> Self {
        Self::from_parts(identifier, modification_type, before, after, Some(children))
    }

    /// A node whose content was swapped for `after`, which cannot be absent.
    pub(crate) fn replaced(identifier: PathArgument, before: TreeNode, after: TreeNode) -> Self {
        let modification_type = if before == after {
            ModificationType::Unmodified
        } else {
            ModificationType::Write
        };
        Self::from_parts(identifier, modification_type, Some(before), Some(after), None)
    }

    pub fn identifier(&self) -> &PathArgument {
        &self.0.identifier
    }

    pub fn modification_type(&self) -> ModificationType {
        self.0.modification_type
    }

    pub fn data_before(&self) -> Option<&TreeNode> {
        self.0.before.as_ref()
    }

    pub fn data_after(&self) -> Option<&TreeNode> {
        self.0.after.as_ref()
    }

    /// The changes to the children of this node. Unchanged children are not listed.
    pub fn modified_children(&self) -> &[CandidateNode] {
        self.0
            .children
            .get_or_init(|| diff_children(self.data_before(), self.data_after()))
    }

    pub fn modified_child(&self, id: &PathArgument) -> Option<&CandidateNode> {
        self.modified_children()
            .iter()
            .find(|child| child.identifier() == id)
    }

    /// [`ModificationType::Unmodified`] for children not listed among the modified ones.
    pub fn child_modification_type(&self, id: &PathArgument) -> ModificationType {
        self.modified_child(id)
            .map_or(ModificationType::Unmodified, CandidateNode::modification_type)
    }
}

/// Children only on one side are deleted or written; children on both sides are written if
/// their data differs.
fn diff_children(before: Option<&TreeNode>, after: Option<&TreeNode>) -> Vec<CandidateNode> {
    let mut children = Vec::new();
    if let Some(after) = after {
        for new in after.children() {
            let old = before.and_then(|b| b.child(new.identifier()));
            match old {
                Some(old) if TreeNode::ptr_eq(old, new) || old == new => {}
                _ => children.push(CandidateNode::written(
                    new.identifier().clone(),
                    old.cloned(),
                    Some(new.clone()),
                )),
            }
        }
    }
    if let Some(before) = before {
        for old in before.children() {
            if after.and_then(|a| a.child(old.identifier())).is_none() {
                children.push(CandidateNode::written(
                    old.identifier().clone(),
                    Some(old.clone()),
                    None,
                ));
            }
        }
    }
    children
}

impl fmt::Debug for CandidateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("CandidateNode");
        s.field("identifier", self.identifier())
            .field("type", &self.modification_type());
        let children = self.modified_children();
        if !children.is_empty() {
            s.field("children", &children);
        }
        s.finish()
    }
}

/// The changes a modification makes to a tree rooted at [`Candidate::root_path`].
#[derive(Debug, Clone)]
pub struct Candidate {
    root_path: Path,
    root: CandidateNode,
    /// The version the tree moves to on commit. Only set for candidates a tree prepared.
    version: Option<Version>,
}

impl Candidate {
    /// Wraps `root`, the change to the node at `root_path`.
    ///
    /// Such a candidate can be inspected and replayed, but not committed.
    pub fn new(root_path: Path, root: CandidateNode) -> Self {
        Self {
            root_path,
            root,
            version: None,
        }
    }

    pub(crate) fn prepared(root_path: Path, root: CandidateNode, version: Version) -> Self {
        Self {
            root_path,
            root,
            version: Some(version),
        }
    }

    pub(crate) fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn root(&self) -> &CandidateNode {
        &self.root
    }

    /// The change to the node at `path`, relative to the root of the candidate.
    ///
    /// Returns `None` if that node did not change.
    pub fn node_at(&self, path: &[PathArgument]) -> Option<&CandidateNode> {
        path.iter()
            .try_fold(&self.root, |node, arg| node.modified_child(arg))
    }

    /// Combines a chain of candidates into one describing their combined effect.
    ///
    /// Each candidate must start from the state the previous one left behind, as is the case for
    /// candidates committed one after the other to the same tree. Nodes that end up as they
    /// started are [`ModificationType::Unmodified`], whatever happened in between.
    ///
    /// The aggregate cannot be committed.
    pub fn aggregate(candidates: impl IntoIterator<Item = Candidate>) -> Result<Candidate> {
        let candidates: Vec<_> = candidates.into_iter().collect();
        let Some(first) = candidates.first() else {
            return Err(UsageError::EmptyAggregate.into());
        };
        let root_path = first.root_path.clone();
        if let Some(other) = candidates.iter().find(|c| c.root_path != root_path) {
            return Err(UsageError::RootPathMismatch {
                candidate: other.root_path.clone(),
                tree: root_path,
            }
            .into());
        }
        let nodes: Vec<_> = candidates.iter().map(|c| &c.root).collect();
        let root = aggregate_nodes(&root_path, &nodes)?;
        Ok(Candidate::new(root_path, root))
    }

    /// Replays this candidate at the cursor's current position.
    pub fn apply_to_cursor(&self, cursor: &mut ModificationCursor<'_>) -> Result<()> {
        let root = &self.root;
        match root.modification_type() {
            ModificationType::Unmodified => Ok(()),
            ModificationType::Write => match root.data_after() {
                Some(after) => cursor.write_here(after.clone()),
                None => Ok(()),
            },
            ModificationType::Delete | ModificationType::Disappeared => cursor.delete_here(),
            ModificationType::SubtreeModified | ModificationType::Appeared => {
                replay_children(cursor, root)
            }
        }
    }

    /// Replays this candidate onto `modification`, at the candidate's root path.
    pub fn apply_to_modification(&self, modification: &mut Modification) -> Result<()> {
        let mut cursor = modification.open_cursor(&self.root_path)?;
        self.apply_to_cursor(&mut cursor)
    }
}

fn replay_children(cursor: &mut ModificationCursor<'_>, node: &CandidateNode) -> Result<()> {
    for child in node.modified_children() {
        let id = child.identifier().clone();
        match child.modification_type() {
            ModificationType::Unmodified => {}
            ModificationType::Write => {
                if let Some(after) = child.data_after() {
                    cursor.write(id, after.clone())?;
                }
            }
            ModificationType::Delete | ModificationType::Disappeared => cursor.delete(id)?,
            ModificationType::SubtreeModified | ModificationType::Appeared => {
                cursor.enter(id)?;
                replay_children(cursor, child)?;
                cursor.exit()?;
            }
        }
    }
    Ok(())
}

/// Aggregates the successive changes to one node.
fn aggregate_nodes(path: &Path, nodes: &[&CandidateNode]) -> Result<CandidateNode> {
    for pair in nodes.windows(2) {
        let chained = match (pair[0].data_after(), pair[1].data_before()) {
            (None, None) => true,
            (Some(after), Some(before)) => TreeNode::ptr_eq(after, before),
            _ => false,
        };
        if !chained {
            return Err(UsageError::InconsistentCandidates {
                path: path.clone(),
                reason: "a candidate does not start where the previous one ended",
            }
            .into());
        }
    }
    let (Some(first), Some(last)) = (nodes.first(), nodes.last()) else {
        return Err(UsageError::EmptyAggregate.into());
    };
    let id = first.identifier().clone();
    let before = first.data_before().cloned();
    let after = last.data_after().cloned();
    match (&before, &after) {
        (None, None) => return Ok(CandidateNode::unmodified(id, None)),
        (Some(b), Some(a)) if b == a => {
            return Ok(CandidateNode::applied(
                id,
                ModificationType::Unmodified,
                before,
                after,
                Vec::new(),
            ));
        }
        _ => {}
    }
    let wrote = nodes.iter().any(|n| {
        matches!(
            n.modification_type(),
            ModificationType::Write | ModificationType::Delete
        )
    });
    if wrote {
        return Ok(CandidateNode::written(id, before, after));
    }

    let mut ids: Vec<&PathArgument> = Vec::new();
    for node in nodes {
        for child in node.modified_children() {
            if !ids.contains(&child.identifier()) {
                ids.push(child.identifier());
            }
        }
    }
    let mut children = Vec::with_capacity(ids.len());
    for child_id in ids {
        let steps: Vec<_> = nodes
            .iter()
            .filter_map(|n| n.modified_child(child_id))
            .collect();
        let child = aggregate_nodes(&path.child(child_id.clone()), &steps)?;
        if child.modification_type() != ModificationType::Unmodified {
            children.push(child);
        }
    }
    let modification_type = match (&before, &after) {
        (None, _) => ModificationType::Appeared,
        (_, None) => ModificationType::Disappeared,
        _ => ModificationType::SubtreeModified,
    };
    Ok(CandidateNode::applied(
        id,
        modification_type,
        before,
        after,
        children,
    ))
}
