// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Versions and commit provenance.
//!
//! Every [`TreeNode`](crate::TreeNode) carries two versions: the version at which the node itself
//! was last replaced, and the highest version found anywhere in its subtree. Conflict detection is
//! entirely driven by comparing these between the snapshot a modification was built against and
//! the current state of the tree.
use std::{
    any::Any,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// A totally ordered token identifying the modification that produced a node.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Version(u64);

impl Version {
    /// The version of nodes that were never committed to any tree, including freshly built ones.
    pub const INITIAL: Version = Version(0);

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Mints versions for one data tree.
///
/// Shared by the tree and every snapshot and modification derived from it. Versions are handed
/// out when a modification is sealed or re-applied, so every prepared candidate carries a version
/// strictly greater than that of the root it was applied to.
#[derive(Clone, Debug, Default)]
pub(crate) struct VersionSource(Arc<AtomicU64>);

impl VersionSource {
    pub(crate) fn next(&self) -> Version {
        Version(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

/// Opaque caller-supplied metadata attached to a commit.
///
/// The data tree never looks inside; it only hands the same value back from
/// [`Snapshot::read_version_info`](crate::Snapshot::read_version_info).
#[derive(Clone)]
pub struct VersionInfo(Arc<dyn Any + Send + Sync>);

impl VersionInfo {
    pub fn new<T: Any + Send + Sync>(info: T) -> Self {
        Self(Arc::new(info))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VersionInfo(..)")
    }
}
