// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Modifications: transactions against a snapshot of a data tree.
//!
//! A [`Modification`] records writes, merges and deletes in an overlay on top of the snapshot it
//! was created from, without touching the snapshot. Nothing is validated against the schema's
//! constraints until [`Modification::ready`], which seals the modification and applies the
//! overlay once, caching the result. The data tree then [validates](crate::DataTree::validate)
//! it against concurrent commits, [prepares](crate::DataTree::prepare) a candidate from it, and
//! [commits](crate::DataTree::commit) that candidate.
//!
//! ```rust
//! use yangtree::{DataTree, DataTreeConfiguration, ModificationState, Path, Schema, SchemaNode, TreeNode};
//!
//! let schema = Schema::new([SchemaNode::container("c").child(SchemaNode::leaf("x"))]);
//! let tree = DataTree::new(schema, DataTreeConfiguration::default())?;
//!
//! let mut modification = tree.take_snapshot().new_modification();
//! let x = Path::root().child("c").child("x");
//! modification.write(&x, TreeNode::leaf("x", 42u64))?;
//! assert_eq!(modification.state(), ModificationState::Open);
//!
//! modification.ready()?;
//! assert_eq!(modification.read_node(&x)?, Some(TreeNode::leaf("x", 42u64)));
//! # Ok::<(), yangtree::DataTreeError>(())
//! ```
use crate::{
    Candidate, Path, PathArgument, TreeNode,
    candidate::CandidateNode,
    error::{DefunctError, Result, UsageError, ValidationError},
    strategy::{Strategy, unknown_child},
    version::{Version, VersionSource},
};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

mod cursor;
mod modified_node;

pub use cursor::ModificationCursor;
pub(crate) use modified_node::{ModifiedNode, Operation};

/// The life cycle of a [`Modification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum ModificationState {
    /// Accepting writes, merges and deletes.
    Open,
    /// Sealed and validated.
    Ready,
    /// Sealed without having changed anything.
    Noop,
    /// Sealed, and a chained modification was created on top of it.
    AppliedToSnapshot,
    /// A data tree prepared a candidate from it.
    Prepared,
    /// Failed unexpectedly. Every operation returns the original failure.
    Defunct,
}

/// A transaction against a snapshot of a [`DataTree`](crate::DataTree).
pub struct Modification {
    base: TreeNode,
    strategy: Arc<Strategy>,
    root_path: Path,
    versions: VersionSource,
    root: ModifiedNode,
    state: ModificationState,
    /// The result of applying the sealed overlay to `base`.
    applied: Option<(Version, CandidateNode)>,
    /// The last candidate prepared, with the root it was prepared against.
    prepared: Option<(TreeNode, Candidate)>,
    defunct: Option<DefunctError>,
}

impl Modification {
    pub(crate) fn new(
        base: TreeNode,
        strategy: Arc<Strategy>,
        root_path: Path,
        versions: VersionSource,
    ) -> Self {
        tracing::trace!(base = %base.subtree_version(), root = %root_path, "new modification");
        Self {
            root: ModifiedNode::root(&base),
            base,
            strategy,
            root_path,
            versions,
            state: ModificationState::Open,
            applied: None,
            prepared: None,
            defunct: None,
        }
    }

    pub fn state(&self) -> ModificationState {
        self.state
    }

    /// The path of the node this modification's tree is rooted at.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Replaces the node at `path` with `data`.
    ///
    /// `data` must be identified by the last argument of `path` and fit the schema there. Its
    /// constraints are only checked by [`Modification::ready`].
    pub fn write(&mut self, path: &Path, data: TreeNode) -> Result<()> {
        self.guarded(|this| {
            this.check_open("write")?;
            let strategies = this.strategies(path)?;
            this.check_data(path, &strategies, &data)?;
            let rel = this.relative(path)?;
            this.modified_node(rel, &strategies).write(data);
            Ok(())
        })
    }

    /// Merges `data` into the node at `path`: children of `data` are merged recursively into
    /// the existing ones, leaves are overwritten, and existing children not present in `data`
    /// are retained.
    pub fn merge(&mut self, path: &Path, data: TreeNode) -> Result<()> {
        self.guarded(|this| {
            this.check_open("merge")?;
            let strategies = this.strategies(path)?;
            this.check_data(path, &strategies, &data)?;
            let rel = this.relative(path)?;
            let strategy = Arc::clone(&strategies[rel.len()]);
            this.modified_node(rel, &strategies).merge(&strategy, &data);
            Ok(())
        })
    }

    /// Removes the node at `path`, if present. Deleting the root leaves an empty root.
    pub fn delete(&mut self, path: &Path) -> Result<()> {
        self.guarded(|this| {
            this.check_open("delete")?;
            let strategies = this.strategies(path)?;
            let rel = this.relative(path)?;
            this.modified_node(rel, &strategies).delete();
            Ok(())
        })
    }

    /// Opens a cursor positioned at `path`.
    pub fn open_cursor(&mut self, path: &Path) -> Result<ModificationCursor<'_>> {
        self.check_open("open_cursor")?;
        self.strategies(path)?;
        Ok(ModificationCursor::new(self, path.clone()))
    }

    /// Seals the modification and validates the resulting data against the schema.
    ///
    /// A modification that changes nothing becomes [`ModificationState::Noop`]. If validation
    /// fails the modification stays open, so that the offending data can be fixed. Readying a
    /// sealed modification again does nothing.
    pub fn ready(&mut self) -> Result<()> {
        self.guarded(|this| {
            if this.state != ModificationState::Open {
                return Ok(());
            }
            this.root.seal();
            if matches!(this.root.operation(), Operation::None) {
                tracing::trace!(root = %this.root_path, "modification changes nothing");
                this.state = ModificationState::Noop;
                return Ok(());
            }
            let version = this.versions.next();
            let root = this
                .strategy
                .apply_root(&this.root_path, &this.root, &this.base, version)?;
            this.applied = Some((version, root));
            this.state = ModificationState::Ready;
            Ok(())
        })
    }

    /// Reads the node at `path` as it is after this modification.
    pub fn read_node(&self, path: &Path) -> Result<Option<TreeNode>> {
        self.check_ready("read_node")?;
        let rel = self.relative(path)?;
        Ok(self.after_root().find(rel).cloned())
    }

    /// Starts a new modification on top of the state this one leads to.
    ///
    /// Committing this modification and then the new one, with nothing else committed in
    /// between, applies both.
    pub fn new_modification(&mut self) -> Result<Modification> {
        self.guarded(|this| {
            this.check_ready("new_modification")?;
            let base = this.after_root().clone();
            if this.state == ModificationState::Ready {
                this.state = ModificationState::AppliedToSnapshot;
            }
            Ok(Modification::new(
                base,
                Arc::clone(&this.strategy),
                this.root_path.clone(),
                this.versions.clone(),
            ))
        })
    }

    pub(crate) fn base(&self) -> &TreeNode {
        &self.base
    }

    pub(crate) fn modified_root(&self) -> &ModifiedNode {
        &self.root
    }

    /// Produces the candidate of this modification against `current`, the current root of the
    /// tree, which is governed by `strategy`.
    ///
    /// The result of [`Modification::ready`] is reused if nothing changed since this
    /// modification's snapshot was taken. Otherwise the overlay is applied again.
    pub(crate) fn prepare(&mut self, current: &TreeNode, strategy: &Arc<Strategy>) -> Result<Candidate> {
        self.guarded(|this| {
            this.check_ready("prepare")?;
            match &this.prepared {
                Some((root, candidate)) if TreeNode::ptr_eq(root, current) => {
                    return Ok(candidate.clone());
                }
                _ => {}
            }
            let root_path = this.root_path.clone();
            let candidate = match &this.applied {
                None => Candidate::prepared(
                    root_path,
                    CandidateNode::unmodified(current.identifier().clone(), Some(current.clone())),
                    current.subtree_version(),
                ),
                Some((version, root))
                    if TreeNode::ptr_eq(&this.base, current)
                        && Arc::ptr_eq(&this.strategy, strategy) =>
                {
                    Candidate::prepared(root_path, root.clone(), *version)
                }
                Some(_) => {
                    let version = this.versions.next();
                    tracing::trace!(
                        base = %this.base.subtree_version(),
                        current = %current.subtree_version(),
                        %version,
                        "re-applying modification onto a newer root"
                    );
                    let root = strategy.apply_root(&this.root_path, &this.root, current, version)?;
                    Candidate::prepared(root_path, root, version)
                }
            };
            this.prepared = Some((current.clone(), candidate.clone()));
            this.state = ModificationState::Prepared;
            Ok(candidate)
        })
    }

    fn after_root(&self) -> &TreeNode {
        let prepared = self
            .prepared
            .as_ref()
            .and_then(|(_, candidate)| candidate.root().data_after());
        let applied = self
            .applied
            .as_ref()
            .and_then(|(_, root)| root.data_after());
        prepared.or(applied).unwrap_or(&self.base)
    }

    /// Runs `f`, turning this modification defunct if it panics.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if let Some(defunct) = &self.defunct {
            return Err(defunct.clone().into());
        }
        match panic::catch_unwind(AssertUnwindSafe(|| f(self))) {
            Ok(result) => result,
            Err(payload) => {
                let defunct = DefunctError::from_panic(payload.as_ref());
                tracing::warn!(
                    root = %self.root_path,
                    cause = defunct.cause(),
                    thread = defunct.thread(),
                    "modification failed unexpectedly and is now defunct"
                );
                self.state = ModificationState::Defunct;
                self.defunct = Some(defunct.clone());
                Err(defunct.into())
            }
        }
    }

    fn check_defunct(&self) -> Result<()> {
        match &self.defunct {
            Some(defunct) => Err(defunct.clone().into()),
            None => Ok(()),
        }
    }

    fn check_open(&self, operation: &'static str) -> Result<()> {
        self.check_defunct()?;
        if self.state != ModificationState::Open {
            return Err(UsageError::Sealed { operation }.into());
        }
        Ok(())
    }

    pub(crate) fn check_ready(&self, operation: &'static str) -> Result<()> {
        self.check_defunct()?;
        if self.state == ModificationState::Open {
            return Err(UsageError::NotReady { operation }.into());
        }
        Ok(())
    }

    fn relative<'p>(&self, path: &'p Path) -> Result<&'p [PathArgument]> {
        path.strip_prefix(&self.root_path).ok_or_else(|| {
            UsageError::OutsideRoot {
                path: path.clone(),
                root: self.root_path.clone(),
            }
            .into()
        })
    }

    /// The strategies of the nodes along `path`, starting with the root's.
    fn strategies(&self, path: &Path) -> Result<Vec<Arc<Strategy>>> {
        let rel = self.relative(path)?;
        let mut strategies = Vec::with_capacity(rel.len() + 1);
        strategies.push(Arc::clone(&self.strategy));
        let mut current = self.root_path.clone();
        for arg in rel {
            current.push(arg.clone());
            let next = strategies
                .last()
                .and_then(|s| s.child(arg))
                .cloned()
                .ok_or_else(|| unknown_child(current.clone(), arg))?;
            strategies.push(next);
        }
        Ok(strategies)
    }

    /// Checks that `data` can be placed at `path`, whose last strategy is `strategies.last()`.
    fn check_data(
        &self,
        path: &Path,
        strategies: &[Arc<Strategy>],
        data: &TreeNode,
    ) -> Result<(), ValidationError> {
        let expected = path.last().unwrap_or(self.base.identifier());
        if data.identifier() != expected {
            return Err(ValidationError::IdentifierMismatch {
                path: path.clone(),
                found: data.identifier().clone(),
            });
        }
        match strategies.last() {
            Some(strategy) => strategy.verify_structure(path, data),
            None => Err(ValidationError::UnknownElement { path: path.clone() }),
        }
    }

    /// The overlay node at `rel`, created along with its ancestors if necessary.
    fn modified_node(
        &mut self,
        rel: &[PathArgument],
        strategies: &[Arc<Strategy>],
    ) -> &mut ModifiedNode {
        let mut node = &mut self.root;
        for (arg, strategy) in rel.iter().zip(strategies) {
            node = node.child_mut(arg, strategy);
        }
        node
    }
}

impl fmt::Debug for Modification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modification")
            .field("root_path", &self.root_path)
            .field("base", &self.base.subtree_version())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
