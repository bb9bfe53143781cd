// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Enforcement of `unique` constraints.
//!
//! Every list node that passed validation carries an index from unique tuple to entry, one per
//! constraint. Validating an incremental edit only looks at the entries that changed: their old
//! tuples are dropped from the previous index, their new tuples are checked against it and
//! added. The resulting index is attached to the new list node for the next edit to build on.
//! Writing a list as a whole builds its index from scratch.
use crate::{
    Path, PathArgument, TreeNode, TreeRandomState, Value, create_map,
    error::ValidationError,
    schema::UniqueConstraint,
};
use smallvec::SmallVec;
use std::{collections::HashMap, sync::Arc};

type Tuple = SmallVec<[Value; 2]>;

struct Constraint {
    leaves: Vec<Box<[PathArgument]>>,
}

impl Constraint {
    /// The values of the constrained leaves of `entry`, or `None` if any of them is missing, in
    /// which case the entry takes no part in the constraint.
    fn tuple(&self, entry: &TreeNode) -> Option<Tuple> {
        self.leaves
            .iter()
            .map(|leaf| entry.find(leaf).and_then(TreeNode::value).cloned())
            .collect()
    }

    fn leaf_paths(&self) -> Vec<Path> {
        self.leaves.iter().map(|leaf| Path::from(&leaf[..])).collect()
    }
}

#[derive(Clone)]
pub(crate) struct UniqueIndexes {
    /// The constraints this index was built for.
    owner: Arc<[Constraint]>,
    maps: Vec<HashMap<Tuple, PathArgument, TreeRandomState>>,
}

pub(crate) struct UniqueValidator {
    constraints: Arc<[Constraint]>,
}

impl UniqueValidator {
    pub(crate) fn new(constraints: &[UniqueConstraint]) -> Option<Self> {
        if constraints.is_empty() {
            return None;
        }
        let constraints = constraints
            .iter()
            .map(|c| Constraint {
                leaves: c
                    .leaves()
                    .iter()
                    .map(|steps| steps.iter().cloned().map(PathArgument::Node).collect())
                    .collect(),
            })
            .collect();
        Some(Self { constraints })
    }

    fn empty_indexes(&self) -> UniqueIndexes {
        UniqueIndexes {
            owner: Arc::clone(&self.constraints),
            maps: self.constraints.iter().map(|_| create_map()).collect(),
        }
    }

    /// The index of a list that already passed validation.
    fn indexes_of(&self, list: &TreeNode) -> Arc<UniqueIndexes> {
        let build = || {
            let mut indexes = self.empty_indexes();
            for entry in list.children() {
                for (constraint, map) in self.constraints.iter().zip(&mut indexes.maps) {
                    if let Some(tuple) = constraint.tuple(entry) {
                        map.insert(tuple, entry.identifier().clone());
                    }
                }
            }
            indexes
        };
        let cached = list.derived(build);
        if Arc::ptr_eq(&cached.owner, &self.constraints) {
            cached
        } else {
            Arc::new(build())
        }
    }

    fn unindex(&self, indexes: &mut UniqueIndexes, id: &PathArgument, entry: &TreeNode) {
        for (constraint, map) in self.constraints.iter().zip(&mut indexes.maps) {
            let Some(tuple) = constraint.tuple(entry) else {
                continue;
            };
            if map.get(&tuple) == Some(id) {
                map.remove(&tuple);
            }
        }
    }

    fn index(
        &self,
        path: &Path,
        indexes: &mut UniqueIndexes,
        id: &PathArgument,
        entry: &TreeNode,
    ) -> Result<(), ValidationError> {
        for (constraint, map) in self.constraints.iter().zip(&mut indexes.maps) {
            let Some(tuple) = constraint.tuple(entry) else {
                continue;
            };
            match map.get(&tuple) {
                Some(other) if other != id => {
                    return Err(ValidationError::NotUnique {
                        path: path.clone(),
                        leaves: constraint.leaf_paths(),
                        values: tuple.into_vec(),
                        entry: id.clone(),
                        other: other.clone(),
                    });
                }
                _ => {
                    map.insert(tuple, id.clone());
                }
            }
        }
        Ok(())
    }

    /// Validates the list `after`, which replaced `before`.
    ///
    /// `changed` lists the entries that were added, removed or modified, or is `None` if the
    /// list was written as a whole.
    pub(crate) fn check(
        &self,
        path: &Path,
        before: Option<&TreeNode>,
        after: Option<&TreeNode>,
        changed: Option<&[PathArgument]>,
    ) -> Result<(), ValidationError> {
        let Some(after) = after else {
            return Ok(());
        };
        let indexes = match (before, changed) {
            (Some(before), Some(changed)) => {
                let mut indexes = UniqueIndexes::clone(&self.indexes_of(before));
                for id in changed {
                    if let Some(old) = before.child(id) {
                        self.unindex(&mut indexes, id, old);
                    }
                }
                for id in changed {
                    if let Some(new) = after.child(id) {
                        self.index(path, &mut indexes, id, new)?;
                    }
                }
                indexes
            }
            _ => {
                let mut indexes = self.empty_indexes();
                let mut entries: Vec<_> = after.children().collect();
                if !after.kind().is_user_ordered() {
                    // report violations deterministically
                    entries.sort_by(|a, b| a.identifier().cmp(b.identifier()));
                }
                for entry in entries {
                    self.index(path, &mut indexes, entry.identifier(), entry)?;
                }
                indexes
            }
        };
        after.seed_derived(Arc::new(indexes));
        Ok(())
    }
}
