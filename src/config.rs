// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Per-tree configuration.
use crate::Path;

/// Which kind of data a tree holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TreeType {
    /// Configuration data only. Schema nodes marked `config false` do not exist in such a tree.
    #[default]
    Configuration,
    /// Configuration and state data.
    Operational,
}

/// How a [`DataTree`](crate::DataTree) validates and where it is rooted.
///
/// ```rust
/// # use yangtree::{DataTreeConfiguration, Path, TreeType};
/// let config = DataTreeConfiguration::new(TreeType::Operational)
///     .with_root_path(Path::root().child("interfaces"))
///     .with_mandatory_nodes_validation(false);
/// assert_eq!(config.tree_type(), TreeType::Operational);
/// assert!(config.unique_indexes());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct DataTreeConfiguration {
    tree_type: TreeType,
    root_path: Path,
    mandatory_nodes_validation: bool,
    unique_indexes: bool,
}

impl Default for DataTreeConfiguration {
    fn default() -> Self {
        Self::new(TreeType::default())
    }
}

impl DataTreeConfiguration {
    pub fn new(tree_type: TreeType) -> Self {
        Self {
            tree_type,
            root_path: Path::root(),
            mandatory_nodes_validation: true,
            unique_indexes: true,
        }
    }

    /// Roots the tree at a container, list or list entry below the schema root.
    ///
    /// Modification paths stay absolute and must lie below this path.
    pub fn with_root_path(mut self, root_path: Path) -> Self {
        self.root_path = root_path;
        self
    }

    /// Whether missing mandatory leaves, choices and non-empty lists are reported.
    pub fn with_mandatory_nodes_validation(mut self, enabled: bool) -> Self {
        self.mandatory_nodes_validation = enabled;
        self
    }

    /// Whether `unique` constraints of lists are maintained and enforced.
    pub fn with_unique_indexes(mut self, enabled: bool) -> Self {
        self.unique_indexes = enabled;
        self
    }

    pub fn tree_type(&self) -> TreeType {
        self.tree_type
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn mandatory_nodes_validation(&self) -> bool {
        self.mandatory_nodes_validation
    }

    pub fn unique_indexes(&self) -> bool {
        self.unique_indexes
    }
}
