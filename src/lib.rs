// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # yangtree: An In-Memory, Schema-Governed, Versioned Data Tree
//!
//! This crate provides a transactional, in-memory store for hierarchical data shaped by a
//! YANG-like schema: containers, lists keyed by leaf values, leaf-lists, choices with mutually
//! exclusive cases, and augmentations.
//!
//! Readers work on immutable [`Snapshot`]s and never block. Writers build a [`Modification`]
//! against a snapshot, seal it with [`Modification::ready`], and hand it to the [`DataTree`],
//! which checks it for conflicts with whatever was committed in the meantime, turns it into a
//! [`Candidate`] describing exactly what changes, and commits that candidate atomically.
//!
//! ## Core Concepts
//!
//! - [`TreeNode`]: an immutable node. Every node records the version that last wrote it and the
//!   version that last changed anything below it. Unchanged subtrees are shared between
//!   versions, so a commit only allocates new nodes along the paths it edits.
//! - [`Schema`]: the shape and the constraints of the data. Mandatory descendants,
//!   `min-elements`/`max-elements`, `unique` tuples, list keys and case exclusivity are enforced
//!   when a modification is readied.
//! - [`Modification`]: a transaction. Writes, merges and deletes are recorded in an overlay and
//!   applied in one go.
//! - [`Candidate`]: the diff a prepared modification applies, classifying every affected node
//!   with a [`ModificationType`]. Candidates can be aggregated and replayed onto other trees.
//!
//! ## Concurrency
//!
//! Modifications made from the same snapshot are independent. When one of them commits, the
//! others can still commit as long as they do not touch what changed: [`DataTree::validate`]
//! reports a [`ConflictError`] naming the path at which two transactions overlap. Nothing is
//! retried internally; on a conflict, take a new snapshot and rebuild the modification.
//!
//! ## Getting Started
//!
//! ```rust
//! use yangtree::{
//!     path, DataTree, DataTreeConfiguration, EntryId, ModificationType, Schema, SchemaNode,
//!     TreeNode,
//! };
//!
//! let schema = Schema::new([SchemaNode::container("interfaces").child(
//!     SchemaNode::list("interface", ["name"])
//!         .child(SchemaNode::leaf("name"))
//!         .child(SchemaNode::leaf("mtu"))
//!         .max_elements(16),
//! )]);
//! let tree = DataTree::new(schema, DataTreeConfiguration::default())?;
//!
//! let eth0 = EntryId::new("interface", [("name", "eth0")]);
//! let mut modification = tree.take_snapshot().new_modification();
//! modification.write(
//!     &path!("interfaces" / "interface" / "interface"[name = "eth0"]),
//!     TreeNode::map_entry(eth0, [TreeNode::leaf("mtu", 1500u64)]),
//! )?;
//! modification.ready()?;
//!
//! let candidate = tree.prepare(&mut modification)?;
//! assert_eq!(candidate.root().modification_type(), ModificationType::SubtreeModified);
//! tree.commit(candidate, None)?;
//!
//! let mtu = tree
//!     .take_snapshot()
//!     .read_node(&path!("interfaces" / "interface" / "interface"[name = "eth0"] / "mtu"));
//! assert_eq!(mtu, Some(TreeNode::leaf("mtu", 1500u64)));
//! # Ok::<(), yangtree::DataTreeError>(())
//! ```
//!
//! ## Features
//!
//! - `serde`: Provides `serde` support for values, paths, versions and configuration.
//! - `arbitrary`: Implements `quickcheck::Arbitrary` for values and paths, useful for
//!   property-based testing.
//! - `ulid`: Enables leaves to hold ulids. This feature is enabled by default.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

use ahash::RandomState;
use std::{
    hash::BuildHasher,
    sync::atomic::{AtomicBool, Ordering},
};

pub mod candidate;
pub use candidate::{Candidate, CandidateNode, ModificationType};
pub mod config;
pub use config::{DataTreeConfiguration, TreeType};
pub mod error;
pub use error::{
    ConflictError, ConflictReason, DataTreeError, DefunctError, Result, UsageError,
    ValidationError,
};
mod macros;
pub mod modification;
pub use modification::{Modification, ModificationCursor, ModificationState};
pub mod node;
pub use node::{Children, NodeKind, TreeNode};
pub mod path;
pub use path::{AugmentationId, EntryId, Path, PathArgument, QName};
pub mod schema;
pub use schema::{
    AugmentationSchema, CaseSchema, DataChildren, ElementCount, OrderedBy, Schema, SchemaKind,
    SchemaNode, UniqueConstraint,
};
pub mod store;
pub use store::{DataTree, Snapshot};
mod strategy;
pub mod value;
pub use value::Value;
pub mod version;
pub use version::{Version, VersionInfo};

static ENABLE_DETERMINISM: AtomicBool = AtomicBool::new(false);

pub(crate) const DETERMINISTIC_HASHER: RandomState = RandomState::with_seeds(48, 1516, 23, 42);

/// Makes all data structures behave deterministically.
///
/// This should only be enabled for testing, as it increases the odds of DoS
/// scenarios.
#[doc(hidden)]
pub fn enable_determinism() {
    ENABLE_DETERMINISM.store(true, Ordering::Release);
}

/// Checks if determinism is enabled.
///
/// Should be used internally and for testing.
#[doc(hidden)]
pub fn determinism_enabled() -> bool {
    ENABLE_DETERMINISM.load(Ordering::Acquire)
}

/// Returns a RandomState.
/// If `enable_determinism` has been used, this will return a deterministic
/// decidedly non-random RandomState, useful in tests.
#[inline]
fn make_random_state() -> RandomState {
    if determinism_enabled() {
        DETERMINISTIC_HASHER
    } else {
        RandomState::new()
    }
}

fn create_map<K, V>() -> std::collections::HashMap<K, V, TreeRandomState> {
    std::collections::HashMap::with_hasher(TreeRandomState::default())
}

/// This is a small wrapper around the standard RandomState.
/// This allows us to easily switch to a non-random RandomState for use in tests.
#[derive(Clone)]
pub struct TreeRandomState {
    inner: RandomState,
}

// Falls back on regular ahash::RandomState except when 'enable_determinism' has been called.
impl Default for TreeRandomState {
    #[inline]
    fn default() -> Self {
        Self {
            inner: make_random_state(),
        }
    }
}

impl BuildHasher for TreeRandomState {
    type Hasher = <RandomState as BuildHasher>::Hasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        self.inner.build_hasher()
    }
}
