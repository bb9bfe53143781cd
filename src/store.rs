// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The data tree: the current root, and the pipeline that replaces it.
//!
//! Readers never block. [`DataTree::take_snapshot`] loads the current root from an atomic
//! pointer, and a [`Snapshot`] keeps the root it was taken from for as long as it lives.
//!
//! Writers go through three steps. [`DataTree::validate`] checks a ready modification for
//! conflicts with everything committed since its snapshot was taken. [`DataTree::prepare`]
//! validates, then produces the [`Candidate`] the modification would apply to the current root.
//! [`DataTree::commit`] installs the candidate's result as the new root. Validation and
//! preparation run concurrently with each other and with commits. Commits are serialized, and
//! a commit is rejected if the root changed since its candidate was prepared. The caller then
//! prepares again, which re-validates against the new root.
use crate::{
    Candidate, DataTreeConfiguration, Modification, Path, Schema, TreeNode,
    candidate::ModificationType,
    error::{Result, UsageError},
    strategy::Strategy,
    version::{Version, VersionInfo, VersionSource},
};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::{collections::BTreeMap, fmt, sync::Arc};

mod conflict;

/// What a snapshot pins.
struct TreeState {
    root: TreeNode,
    infos: Arc<BTreeMap<Version, VersionInfo>>,
    strategy: Arc<Strategy>,
}

/// An in-memory, schema-governed, versioned data tree.
///
/// ```rust
/// use yangtree::{DataTree, DataTreeConfiguration, Path, Schema, SchemaNode, TreeNode, VersionInfo};
///
/// let schema = Schema::new([SchemaNode::container("c").child(SchemaNode::leaf("x"))]);
/// let tree = DataTree::new(schema, DataTreeConfiguration::default())?;
/// let before = tree.take_snapshot();
///
/// let mut modification = before.new_modification();
/// let x = Path::root().child("c").child("x");
/// modification.write(&x, TreeNode::leaf("x", "hello"))?;
/// modification.ready()?;
/// tree.validate(&modification)?;
/// let candidate = tree.prepare(&mut modification)?;
/// let version = tree.commit(candidate, Some(VersionInfo::new("first")))?;
///
/// let after = tree.take_snapshot();
/// assert_eq!(after.version(), version);
/// assert_eq!(after.read_node(&x), Some(TreeNode::leaf("x", "hello")));
/// assert_eq!(
///     after.read_version_info(&x).and_then(|i| i.downcast_ref::<&str>().copied()),
///     Some("first")
/// );
/// assert_eq!(before.read_node(&x), None);
/// # Ok::<(), yangtree::DataTreeError>(())
/// ```
pub struct DataTree {
    state: ArcSwap<TreeState>,
    commit_lock: Mutex<()>,
    config: DataTreeConfiguration,
    versions: VersionSource,
}

impl DataTree {
    /// Creates an empty tree.
    ///
    /// Fails if the configured root path does not address a container, list or list entry of
    /// `schema`.
    pub fn new(schema: Schema, config: DataTreeConfiguration) -> Result<Self> {
        let strategy = Strategy::for_tree(&schema, &config)?;
        let root = strategy.empty_node(&Strategy::root_identifier(config.root_path()));
        tracing::debug!(
            tree_type = ?config.tree_type(),
            root = %config.root_path(),
            "created data tree"
        );
        Ok(Self {
            state: ArcSwap::from_pointee(TreeState {
                root,
                infos: Arc::default(),
                strategy,
            }),
            commit_lock: Mutex::new(()),
            config,
            versions: VersionSource::default(),
        })
    }

    pub fn config(&self) -> &DataTreeConfiguration {
        &self.config
    }

    pub fn take_snapshot(&self) -> Snapshot {
        let state = self.state.load();
        tracing::trace!(version = %state.root.subtree_version(), "snapshot");
        Snapshot {
            root: state.root.clone(),
            infos: Arc::clone(&state.infos),
            strategy: Arc::clone(&state.strategy),
            versions: self.versions.clone(),
            root_path: self.config.root_path().clone(),
        }
    }

    /// Replaces the schema for modifications made from now on.
    ///
    /// Existing snapshots and modifications keep the schema they were created with until they
    /// are prepared, at which point the new schema applies.
    pub fn set_schema(&self, schema: Schema) -> Result<()> {
        let strategy = Strategy::for_tree(&schema, &self.config)?;
        let _guard = self.commit_lock.lock();
        let state = self.state.load_full();
        self.state.store(Arc::new(TreeState {
            root: state.root.clone(),
            infos: Arc::clone(&state.infos),
            strategy,
        }));
        tracing::debug!(version = %state.root.subtree_version(), "schema replaced");
        Ok(())
    }

    /// Checks that `modification` can be applied to the current root without overwriting
    /// changes committed since its snapshot was taken.
    pub fn validate(&self, modification: &Modification) -> Result<()> {
        self.validate_against(modification, &self.state.load_full())
    }

    fn validate_against(&self, modification: &Modification, state: &TreeState) -> Result<()> {
        modification.check_ready("validate")?;
        if TreeNode::ptr_eq(modification.base(), &state.root) {
            return Ok(());
        }
        conflict::check(
            self.config.root_path(),
            modification.modified_root(),
            Some(&state.root),
            &state.strategy,
        )?;
        Ok(())
    }

    /// Validates `modification` and produces the candidate it would apply to the current root.
    ///
    /// Preparing again against the same root returns the same candidate.
    pub fn prepare(&self, modification: &mut Modification) -> Result<Candidate> {
        let state = self.state.load_full();
        self.validate_against(modification, &state)?;
        let candidate = modification.prepare(&state.root, &state.strategy)?;
        tracing::trace!(
            root = ?candidate.root().modification_type(),
            version = ?candidate.version(),
            "prepared"
        );
        Ok(candidate)
    }

    /// Installs the result of `candidate` as the new root, recording `info` for its version.
    ///
    /// Returns the version of the tree after the commit. A candidate that changes nothing
    /// leaves the tree, and its version, as they are: no version is minted for it and `info` is
    /// discarded.
    pub fn commit(&self, candidate: Candidate, info: Option<VersionInfo>) -> Result<Version> {
        let Some(version) = candidate.version() else {
            return Err(UsageError::NotCommittable.into());
        };
        if candidate.root_path() != self.config.root_path() {
            return Err(UsageError::RootPathMismatch {
                candidate: candidate.root_path().clone(),
                tree: self.config.root_path().clone(),
            }
            .into());
        }
        let _guard = self.commit_lock.lock();
        let state = self.state.load_full();
        let current = state.root.subtree_version();
        if candidate.root().modification_type() == ModificationType::Unmodified {
            tracing::trace!(version = %current, "nothing to commit");
            return Ok(current);
        }
        match candidate.root().data_before() {
            Some(before) if TreeNode::ptr_eq(before, &state.root) => {}
            _ => return Err(UsageError::StaleCandidate.into()),
        }
        let Some(after) = candidate.root().data_after() else {
            return Err(UsageError::NotCommittable.into());
        };
        let infos = match info {
            Some(info) => {
                let mut infos = BTreeMap::clone(&state.infos);
                infos.insert(version, info);
                Arc::new(infos)
            }
            None => Arc::clone(&state.infos),
        };
        self.state.store(Arc::new(TreeState {
            root: after.clone(),
            infos,
            strategy: Arc::clone(&state.strategy),
        }));
        tracing::debug!(from = %current, to = %version, "committed");
        Ok(version)
    }
}

impl fmt::Debug for DataTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTree")
            .field("config", &self.config)
            .field("version", &self.state.load().root.subtree_version())
            .finish_non_exhaustive()
    }
}

/// An immutable view of a [`DataTree`] at one version.
#[derive(Clone)]
pub struct Snapshot {
    root: TreeNode,
    infos: Arc<BTreeMap<Version, VersionInfo>>,
    strategy: Arc<Strategy>,
    versions: VersionSource,
    root_path: Path,
}

impl Snapshot {
    /// Starts a modification against this snapshot.
    pub fn new_modification(&self) -> Modification {
        Modification::new(
            self.root.clone(),
            Arc::clone(&self.strategy),
            self.root_path.clone(),
            self.versions.clone(),
        )
    }

    /// The node at `path`, if present. Paths outside the tree's root path have no node.
    pub fn read_node(&self, path: &Path) -> Option<TreeNode> {
        let rel = path.strip_prefix(&self.root_path)?;
        self.root.find(rel).cloned()
    }

    /// The information recorded with the commit that last changed the subtree at `path`.
    ///
    /// If that commit carried no information, the information of the closest earlier commit
    /// that did is returned.
    pub fn read_version_info(&self, path: &Path) -> Option<VersionInfo> {
        let node = self.read_node(path)?;
        self.infos
            .range(..=node.subtree_version())
            .next_back()
            .map(|(_, info)| info.clone())
    }

    /// The version of the tree this snapshot was taken at.
    pub fn version(&self) -> Version {
        self.root.subtree_version()
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// The root node of this snapshot.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.version())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataTreeError, SchemaNode, error::ConflictError, error::ConflictReason};

    fn tree() -> DataTree {
        let schema = Schema::new([SchemaNode::container("c")
            .child(SchemaNode::leaf("x"))
            .child(SchemaNode::leaf("y"))
            .child(SchemaNode::container("p").presence().child(SchemaNode::leaf("z")))]);
        DataTree::new(schema, DataTreeConfiguration::default()).unwrap()
    }

    fn commit(tree: &DataTree, edit: impl FnOnce(&mut Modification)) -> Version {
        let mut modification = tree.take_snapshot().new_modification();
        edit(&mut modification);
        modification.ready().unwrap();
        let candidate = tree.prepare(&mut modification).unwrap();
        tree.commit(candidate, None).unwrap()
    }

    fn path(names: &[&str]) -> Path {
        names.iter().map(|n| crate::PathArgument::node(*n)).collect()
    }

    #[test]
    fn versions_increase_with_commits() {
        let tree = tree();
        assert_eq!(tree.take_snapshot().version(), Version::INITIAL);
        let v1 = commit(&tree, |m| m.write(&path(&["c", "x"]), TreeNode::leaf("x", 1u64)).unwrap());
        let v2 = commit(&tree, |m| m.write(&path(&["c", "y"]), TreeNode::leaf("y", 1u64)).unwrap());
        assert!(Version::INITIAL < v1 && v1 < v2);
        let snapshot = tree.take_snapshot();
        assert_eq!(snapshot.version(), v2);
        let c = snapshot.read_node(&path(&["c"])).unwrap();
        // x was not touched by the second commit
        assert_eq!(c.child(&"x".into()).unwrap().subtree_version(), v1);
        assert_eq!(c.subtree_version(), v2);
    }

    #[test]
    fn version_info_falls_back_to_earlier_commits() {
        let tree = tree();
        let commit_with = |edit: &dyn Fn(&mut Modification), info: Option<&'static str>| {
            let mut modification = tree.take_snapshot().new_modification();
            edit(&mut modification);
            modification.ready().unwrap();
            let candidate = tree.prepare(&mut modification).unwrap();
            tree.commit(candidate, info.map(VersionInfo::new)).unwrap()
        };
        commit_with(
            &|m| m.write(&path(&["c", "x"]), TreeNode::leaf("x", 1u64)).unwrap(),
            Some("first"),
        );
        commit_with(
            &|m| m.write(&path(&["c", "y"]), TreeNode::leaf("y", 1u64)).unwrap(),
            None,
        );
        let snapshot = tree.take_snapshot();
        let info = |names: &[&str]| {
            snapshot
                .read_version_info(&path(names))
                .and_then(|i| i.downcast_ref::<&str>().copied())
        };
        assert_eq!(info(&["c", "x"]), Some("first"));
        assert_eq!(info(&["c", "y"]), Some("first"));
        assert_eq!(info(&["c", "p"]), None);
    }

    #[test]
    fn commits_that_change_nothing_keep_the_version() {
        let tree = tree();
        let v1 = commit(&tree, |m| m.write(&path(&["c", "x"]), TreeNode::leaf("x", 1u64)).unwrap());

        let mut modification = tree.take_snapshot().new_modification();
        modification.delete(&path(&["c", "y"])).unwrap();
        modification.ready().unwrap();
        let candidate = tree.prepare(&mut modification).unwrap();
        assert_eq!(candidate.root().modification_type(), ModificationType::Unmodified);
        assert_eq!(tree.commit(candidate, Some(VersionInfo::new("noop"))).unwrap(), v1);

        let snapshot = tree.take_snapshot();
        assert_eq!(snapshot.version(), v1);
        assert!(snapshot.read_version_info(&path(&["c", "x"])).is_none());
    }

    #[test]
    fn deleting_a_concurrently_deleted_node_conflicts() {
        let tree = tree();
        commit(&tree, |m| m.write(&path(&["c", "p"]), TreeNode::container("p", [])).unwrap());

        let mut first = tree.take_snapshot().new_modification();
        let mut second = tree.take_snapshot().new_modification();
        first.delete(&path(&["c", "p"])).unwrap();
        second.delete(&path(&["c", "p"])).unwrap();
        first.ready().unwrap();
        second.ready().unwrap();
        let candidate = tree.prepare(&mut first).unwrap();
        tree.commit(candidate, None).unwrap();

        let err = tree.validate(&second).unwrap_err();
        assert_eq!(err.to_string(), "Node /c/p does not exist. Cannot delete it.");
        assert_eq!(err.error_tag(), "data-missing");
    }

    #[test]
    fn touching_a_concurrently_removed_presence_container_conflicts() {
        let tree = tree();
        commit(&tree, |m| m.write(&path(&["c", "p"]), TreeNode::container("p", [])).unwrap());

        let mut writer = tree.take_snapshot().new_modification();
        writer
            .write(&path(&["c", "p", "z"]), TreeNode::leaf("z", 1u64))
            .unwrap();
        writer.ready().unwrap();
        commit(&tree, |m| m.delete(&path(&["c", "p"])).unwrap());

        assert!(matches!(
            tree.prepare(&mut writer),
            Err(DataTreeError::Conflict(ConflictError::NodeDoesNotExist { .. }))
        ));
    }

    #[test]
    fn stale_and_foreign_candidates_are_rejected() {
        let tree = tree();
        let mut first = tree.take_snapshot().new_modification();
        let mut second = tree.take_snapshot().new_modification();
        first.write(&path(&["c", "x"]), TreeNode::leaf("x", 1u64)).unwrap();
        second.write(&path(&["c", "y"]), TreeNode::leaf("y", 1u64)).unwrap();
        first.ready().unwrap();
        second.ready().unwrap();
        let first = tree.prepare(&mut first).unwrap();
        let stale = tree.prepare(&mut second).unwrap();
        tree.commit(first.clone(), None).unwrap();
        assert!(matches!(
            tree.commit(stale, None),
            Err(DataTreeError::Usage(UsageError::StaleCandidate))
        ));

        // preparing again against the new root succeeds, the edits are disjoint
        let fresh = tree.prepare(&mut second).unwrap();
        tree.commit(fresh, None).unwrap();
        let c = tree.take_snapshot().read_node(&path(&["c"])).unwrap();
        assert_eq!(c.child_count(), 2);

        let exported = Candidate::new(Path::root(), first.root().clone());
        assert!(matches!(
            tree.commit(exported, None),
            Err(DataTreeError::Usage(UsageError::NotCommittable))
        ));
    }

    #[test]
    fn conflicting_writes_name_the_path() {
        let tree = tree();
        let mut first = tree.take_snapshot().new_modification();
        let mut second = tree.take_snapshot().new_modification();
        first.write(&path(&["c", "x"]), TreeNode::leaf("x", 1u64)).unwrap();
        second.write(&path(&["c", "x"]), TreeNode::leaf("x", 2u64)).unwrap();
        first.ready().unwrap();
        second.ready().unwrap();
        let candidate = tree.prepare(&mut first).unwrap();
        tree.commit(candidate, None).unwrap();

        let err = tree.validate(&second).unwrap_err();
        assert!(matches!(
            &err,
            DataTreeError::Conflict(ConflictError::ConflictingModification {
                reason: ConflictReason::Created,
                ..
            })
        ));
        assert_eq!(
            err.to_string(),
            "Conflicting modification at /c/x: Node was created by other transaction."
        );
    }

    #[test]
    fn schema_can_be_replaced() {
        let tree = tree();
        let old = tree.take_snapshot();
        tree.set_schema(Schema::new([SchemaNode::container("c").child(SchemaNode::leaf("x"))]))
            .unwrap();
        let mut modification = tree.take_snapshot().new_modification();
        assert!(modification
            .write(&path(&["c", "y"]), TreeNode::leaf("y", 1u64))
            .is_err());

        // modifications from older snapshots are applied under the new schema
        let mut stale = old.new_modification();
        stale.write(&path(&["c", "y"]), TreeNode::leaf("y", 1u64)).unwrap();
        stale.ready().unwrap();
        let err = tree.prepare(&mut stale).unwrap_err();
        assert_eq!(err.to_string(), "Child /c/y is not present in schema tree");
    }
}
