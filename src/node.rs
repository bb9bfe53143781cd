// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Immutable, versioned tree nodes.
//!
//! A [`TreeNode`] is a reference-counted, never-mutated node of a data tree. Edits produce new
//! nodes only along the path from the edited node to the root; every untouched subtree is shared
//! by reference between the old and the new tree, so taking a snapshot is a pointer copy and
//! holding on to an old snapshot costs only the nodes that have since been replaced.
//!
//! Nodes are built by hand with the constructors on [`TreeNode`]. Such nodes carry
//! [`Version::INITIAL`]; they are stamped with a real version when a modification writes them
//! into a tree.
//!
//! ```rust
//! # use yangtree::{EntryId, PathArgument, TreeNode};
//! let interfaces = TreeNode::container(
//!     "interfaces",
//!     [TreeNode::map(
//!         "interface",
//!         [TreeNode::map_entry(
//!             EntryId::new("interface", [("name", "eth0")]),
//!             [TreeNode::leaf("mtu", 1500u32)],
//!         )],
//!     )],
//! );
//! let mtu = interfaces.find(&[
//!     PathArgument::node("interface"),
//!     PathArgument::entry("interface", [("name", "eth0")]),
//!     PathArgument::node("mtu"),
//! ]);
//! assert_eq!(mtu.and_then(TreeNode::value), Some(&1500u64.into()));
//! ```
use crate::{
    AugmentationId, EntryId, PathArgument, QName, TreeRandomState, Value, create_map,
    version::Version,
};
use std::{
    any::Any,
    collections::{HashMap, hash_map},
    fmt,
    sync::{Arc, OnceLock},
};

/// The shape of a [`TreeNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum NodeKind {
    Leaf,
    /// One value of a leaf-list.
    LeafSetEntry,
    Container,
    /// One entry of a keyed list.
    MapEntry,
    /// A keyed list ordered by the system.
    Map,
    /// A keyed list ordered by the user.
    OrderedMap,
    LeafSet,
    OrderedLeafSet,
    Choice,
    Augmentation,
}

impl NodeKind {
    /// Whether this kind carries a [`Value`] rather than children.
    pub fn is_leaf_like(self) -> bool {
        matches!(self, NodeKind::Leaf | NodeKind::LeafSetEntry)
    }

    /// Whether the document order of children of this kind is significant.
    pub fn is_user_ordered(self) -> bool {
        matches!(self, NodeKind::OrderedMap | NodeKind::OrderedLeafSet)
    }
}

/// A node of a data tree.
///
/// Cloning a node is a reference count bump. Two nodes are `==` if they hold the same data,
/// regardless of their versions; use [`TreeNode::ptr_eq`] to test for identity.
#[derive(Clone)]
pub struct TreeNode(Arc<NodeInner>);

struct NodeInner {
    identifier: PathArgument,
    kind: NodeKind,
    body: Body,
    version: Version,
    subtree_version: Version,
    /// Data derived from this (immutable) node by validators, such as unique indexes.
    derived: OnceLock<Arc<dyn Any + Send + Sync>>,
}

enum Body {
    Value(Value),
    Children(ChildMap),
}

impl TreeNode {
    fn from_parts(
        identifier: PathArgument,
        kind: NodeKind,
        body: Body,
        version: Version,
        subtree_version: Version,
    ) -> Self {
        Self(Arc::new(NodeInner {
            identifier,
            kind,
            body,
            version,
            subtree_version,
            derived: OnceLock::new(),
        }))
    }

    fn with_children(
        identifier: PathArgument,
        kind: NodeKind,
        children: impl IntoIterator<Item = TreeNode>,
    ) -> Self {
        let mut map = ChildMap::new(kind.is_user_ordered());
        for child in children {
            map.insert(child);
        }
        Self::from_parts(
            identifier,
            kind,
            Body::Children(map),
            Version::INITIAL,
            Version::INITIAL,
        )
    }

    pub fn leaf(name: impl Into<QName>, value: impl Into<Value>) -> Self {
        Self::from_parts(
            PathArgument::Node(name.into()),
            NodeKind::Leaf,
            Body::Value(value.into()),
            Version::INITIAL,
            Version::INITIAL,
        )
    }

    pub fn leaf_set_entry(name: impl Into<QName>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::from_parts(
            PathArgument::LeafListEntry {
                name: name.into(),
                value: value.clone(),
            },
            NodeKind::LeafSetEntry,
            Body::Value(value),
            Version::INITIAL,
            Version::INITIAL,
        )
    }

    pub fn container(name: impl Into<QName>, children: impl IntoIterator<Item = TreeNode>) -> Self {
        Self::with_children(PathArgument::Node(name.into()), NodeKind::Container, children)
    }

    /// Builds a list entry.
    ///
    /// Key leaves named by `id` are added automatically unless `children` contains them already.
    pub fn map_entry(id: EntryId, children: impl IntoIterator<Item = TreeNode>) -> Self {
        let keys: Vec<_> = id
            .keys()
            .iter()
            .map(|(name, value)| TreeNode::leaf(name.clone(), value.clone()))
            .collect();
        Self::with_children(
            PathArgument::Entry(id),
            NodeKind::MapEntry,
            keys.into_iter().chain(children),
        )
    }

    pub fn map(name: impl Into<QName>, entries: impl IntoIterator<Item = TreeNode>) -> Self {
        Self::with_children(PathArgument::Node(name.into()), NodeKind::Map, entries)
    }

    pub fn ordered_map(name: impl Into<QName>, entries: impl IntoIterator<Item = TreeNode>) -> Self {
        Self::with_children(PathArgument::Node(name.into()), NodeKind::OrderedMap, entries)
    }

    pub fn leaf_set<V: Into<Value>>(
        name: impl Into<QName>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let name = name.into();
        let entries = values
            .into_iter()
            .map(|v| TreeNode::leaf_set_entry(name.clone(), v))
            .collect::<Vec<_>>();
        Self::with_children(PathArgument::Node(name), NodeKind::LeafSet, entries)
    }

    pub fn ordered_leaf_set<V: Into<Value>>(
        name: impl Into<QName>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let name = name.into();
        let entries = values
            .into_iter()
            .map(|v| TreeNode::leaf_set_entry(name.clone(), v))
            .collect::<Vec<_>>();
        Self::with_children(PathArgument::Node(name), NodeKind::OrderedLeafSet, entries)
    }

    pub fn choice(name: impl Into<QName>, children: impl IntoIterator<Item = TreeNode>) -> Self {
        Self::with_children(PathArgument::Node(name.into()), NodeKind::Choice, children)
    }

    /// Builds the node grouping the children contributed by one augmentation.
    ///
    /// `id` names every child the augmentation may contribute, not only those present.
    pub fn augmentation(id: AugmentationId, children: impl IntoIterator<Item = TreeNode>) -> Self {
        Self::with_children(PathArgument::Augmentation(id), NodeKind::Augmentation, children)
    }

    /// An empty node of the given shape. Leaf-like kinds get [`Value::Empty`].
    pub(crate) fn empty(identifier: PathArgument, kind: NodeKind) -> Self {
        let body = if kind.is_leaf_like() {
            Body::Value(Value::Empty)
        } else {
            Body::Children(ChildMap::new(kind.is_user_ordered()))
        };
        Self::from_parts(identifier, kind, body, Version::INITIAL, Version::INITIAL)
    }

    /// This node without any of its children. Leaf-like nodes are returned as-is.
    pub(crate) fn shell(&self) -> Self {
        match &self.0.body {
            Body::Value(_) => self.clone(),
            Body::Children(_) => Self::empty(self.0.identifier.clone(), self.0.kind),
        }
    }

    /// Returns this subtree with every node carrying `version`.
    ///
    /// Subtrees already stamped with `version` are reused.
    pub(crate) fn stamped(&self, version: Version) -> Self {
        if self.0.version == version && self.0.subtree_version == version {
            return self.clone();
        }
        let body = match &self.0.body {
            Body::Value(value) => Body::Value(value.clone()),
            Body::Children(children) => Body::Children(children.map_nodes(|c| c.stamped(version))),
        };
        Self::from_parts(
            self.0.identifier.clone(),
            self.0.kind,
            body,
            version,
            version,
        )
    }

    pub fn identifier(&self) -> &PathArgument {
        &self.0.identifier
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    /// The version at which this node was last written.
    pub fn version(&self) -> Version {
        self.0.version
    }

    /// The highest version found in this subtree, this node included.
    pub fn subtree_version(&self) -> Version {
        self.0.subtree_version
    }

    /// The payload of a leaf or leaf-list entry.
    pub fn value(&self) -> Option<&Value> {
        match &self.0.body {
            Body::Value(value) => Some(value),
            Body::Children(_) => None,
        }
    }

    pub fn child(&self, id: &PathArgument) -> Option<&TreeNode> {
        match &self.0.body {
            Body::Value(_) => None,
            Body::Children(children) => children.get(id),
        }
    }

    /// Iterates over the children of this node.
    ///
    /// User-ordered collections yield their entries in document order, everything else yields
    /// children in an unspecified order.
    pub fn children(&self) -> Children<'_> {
        match &self.0.body {
            Body::Value(_) => Children(ChildrenInner::Empty),
            Body::Children(children) => children.iter(),
        }
    }

    pub fn child_count(&self) -> usize {
        match &self.0.body {
            Body::Value(_) => 0,
            Body::Children(children) => children.len(),
        }
    }

    /// Looks up a descendant by its path relative to this node.
    pub fn find(&self, path: &[PathArgument]) -> Option<&TreeNode> {
        path.iter().try_fold(self, |node, arg| node.child(arg))
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Returns data derived from this node, computing it with `init` on first use.
    ///
    /// Falls back to an uncached value if the slot holds data of another type.
    pub(crate) fn derived<T, F>(&self, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: Fn() -> T,
    {
        let slot = self.0.derived.get_or_init(|| Arc::new(init()));
        match Arc::clone(slot).downcast::<T>() {
            Ok(cached) => cached,
            Err(_) => Arc::new(init()),
        }
    }

    /// Stores data derived from this node, unless some was derived already.
    pub(crate) fn seed_derived<T: Any + Send + Sync>(&self, value: Arc<T>) {
        let _ = self.0.derived.set(value);
    }

    /// Returns the derived data if it is present and of type `T`.
    #[cfg(test)]
    pub(crate) fn peek_derived<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0
            .derived
            .get()
            .and_then(|slot| Arc::clone(slot).downcast::<T>().ok())
    }
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.0.identifier != other.0.identifier || self.0.kind != other.0.kind {
            return false;
        }
        match (&self.0.body, &other.0.body) {
            (Body::Value(a), Body::Value(b)) => a == b,
            (Body::Children(a), Body::Children(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TreeNode {}

/// Renders the data only; versions are not shown.
struct DebugBody<'a>(&'a TreeNode);

impl fmt::Debug for DebugBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.0.body {
            Body::Value(value) => fmt::Debug::fmt(value, f),
            Body::Children(children) => {
                let mut entries: Vec<_> = children.iter().collect();
                if children.order.is_none() {
                    // unordered maps would otherwise print in hash order
                    entries.sort_by(|a, b| a.identifier().cmp(b.identifier()));
                }
                f.debug_map()
                    .entries(entries.into_iter().map(|c| (c.identifier(), DebugBody(c))))
                    .finish()
            }
        }
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.identifier())?;
        fmt::Debug::fmt(&DebugBody(self), f)
    }
}

/// The children of a node, keyed by their identifiers.
///
/// User-ordered collections additionally remember document order. Replacing an existing child
/// keeps its position; new children are appended. Removing a child from such a collection is
/// linear in its length.
#[derive(Clone)]
pub(crate) struct ChildMap {
    nodes: HashMap<PathArgument, TreeNode, TreeRandomState>,
    order: Option<Vec<PathArgument>>,
}

impl ChildMap {
    pub(crate) fn new(ordered: bool) -> Self {
        Self {
            nodes: create_map(),
            order: ordered.then(Vec::new),
        }
    }

    pub(crate) fn get(&self, id: &PathArgument) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn insert(&mut self, child: TreeNode) -> Option<TreeNode> {
        let id = child.identifier().clone();
        match self.nodes.entry(id) {
            hash_map::Entry::Occupied(mut slot) => Some(slot.insert(child)),
            hash_map::Entry::Vacant(slot) => {
                if let Some(order) = &mut self.order {
                    order.push(slot.key().clone());
                }
                slot.insert(child);
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, id: &PathArgument) -> Option<TreeNode> {
        let removed = self.nodes.remove(id)?;
        if let Some(order) = &mut self.order {
            order.retain(|o| o != id);
        }
        Some(removed)
    }

    pub(crate) fn iter(&self) -> Children<'_> {
        match &self.order {
            Some(order) => Children(ChildrenInner::Ordered {
                order: order.iter(),
                nodes: &self.nodes,
            }),
            None => Children(ChildrenInner::Unordered(self.nodes.values())),
        }
    }

    fn map_nodes(&self, mut f: impl FnMut(&TreeNode) -> TreeNode) -> Self {
        let mut mapped = Self::new(self.order.is_some());
        for child in self.iter() {
            mapped.insert(f(child));
        }
        mapped
    }
}

impl PartialEq for ChildMap {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .all(|(id, node)| other.nodes.get(id).is_some_and(|o| o == node))
    }
}

/// Iterator over the children of a [`TreeNode`].
pub struct Children<'a>(ChildrenInner<'a>);

enum ChildrenInner<'a> {
    Empty,
    Unordered(hash_map::Values<'a, PathArgument, TreeNode>),
    Ordered {
        order: std::slice::Iter<'a, PathArgument>,
        nodes: &'a HashMap<PathArgument, TreeNode, TreeRandomState>,
    },
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.0 {
            ChildrenInner::Empty => None,
            ChildrenInner::Unordered(values) => values.next(),
            ChildrenInner::Ordered { order, nodes } => order.find_map(|id| nodes.get(id)),
        }
    }
}

/// A node under construction, seeded from an existing node or an empty shell.
///
/// Used by apply strategies to build the new version of a node child by child before sealing it
/// into an immutable [`TreeNode`].
pub(crate) struct MutableTreeNode {
    identifier: PathArgument,
    kind: NodeKind,
    children: ChildMap,
    version: Version,
    changed: bool,
}

impl MutableTreeNode {
    /// Starts from `node`, keeping its node-local version.
    ///
    /// Copies the child map, so editing one child of a node costs time linear in its number of
    /// children. The children themselves are shared, not copied. Leaf-like nodes have no
    /// children to edit and start out empty.
    pub(crate) fn from_node(node: &TreeNode) -> Self {
        let children = match &node.0.body {
            Body::Children(children) => children.clone(),
            Body::Value(_) => ChildMap::new(false),
        };
        Self {
            identifier: node.0.identifier.clone(),
            kind: node.0.kind,
            children,
            version: node.0.version,
            changed: false,
        }
    }

    pub(crate) fn child(&self, id: &PathArgument) -> Option<&TreeNode> {
        self.children.get(id)
    }

    pub(crate) fn put(&mut self, child: TreeNode) {
        self.children.insert(child);
        self.changed = true;
    }

    pub(crate) fn remove(&mut self, id: &PathArgument) {
        if self.children.remove(id).is_some() {
            self.changed = true;
        }
    }

    pub(crate) fn is_changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn seal(self, subtree_version: Version) -> TreeNode {
        TreeNode::from_parts(
            self.identifier,
            self.kind,
            Body::Children(self.children),
            self.version,
            subtree_version.max(self.version),
        )
    }
}
