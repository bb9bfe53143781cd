// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Addressing nodes in a data tree.
//!
//! A [`Path`] is a sequence of [`PathArgument`]s, each of which selects one child of the node
//! reached so far:
//!
//! - [`PathArgument::Node`] selects a container, leaf, choice, list or leaf-list by name.
//! - [`PathArgument::Entry`] selects a list entry by the values of its key leaves.
//! - [`PathArgument::LeafListEntry`] selects a leaf-list entry by its value.
//! - [`PathArgument::Augmentation`] selects the node grouping the children contributed by one
//!   augmentation, identified by the set of their names.
//!
//! ```rust
//! # use yangtree::{Path, PathArgument};
//! let path = Path::from_iter([
//!     PathArgument::node("interfaces"),
//!     PathArgument::node("interface"),
//!     PathArgument::entry("interface", [("name", "eth0")]),
//!     PathArgument::node("mtu"),
//! ]);
//! assert_eq!(path.to_string(), "/interfaces/interface/interface[name=eth0]/mtu");
//! ```
use crate::Value;
use smallvec::SmallVec;
use std::{fmt, sync::Arc};

/// The name of a schema node.
///
/// Names are cheap to clone; namespaces are folded into the name by the schema layer if it needs
/// them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct QName(Arc<str>);

impl QName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name of the conceptual root node of every data tree.
    pub fn root() -> Self {
        Self::new("data")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for QName {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&QName> for QName {
    fn from(value: &QName) -> Self {
        value.clone()
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a single list entry: the list name plus the values of all key leaves.
///
/// Key predicates are kept sorted by key name so that two identifiers built from the same keys
/// in a different order compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct EntryId {
    name: QName,
    keys: SmallVec<[(QName, Value); 2]>,
}

impl EntryId {
    pub fn new<K, V>(name: impl Into<QName>, keys: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<QName>,
        V: Into<Value>,
    {
        let mut keys: SmallVec<[(QName, Value); 2]> = keys
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            name: name.into(),
            keys,
        }
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    /// The key predicates, sorted by key name.
    pub fn keys(&self) -> &[(QName, Value)] {
        &self.keys
    }

    pub fn key(&self, name: &QName) -> Option<&Value> {
        self.keys
            .binary_search_by(|(k, _)| k.cmp(name))
            .ok()
            .map(|i| &self.keys[i].1)
    }
}

/// Identifies the node holding the children contributed by one augmentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct AugmentationId(SmallVec<[QName; 4]>);

impl AugmentationId {
    pub fn new<N: Into<QName>>(children: impl IntoIterator<Item = N>) -> Self {
        let mut names: SmallVec<[QName; 4]> = children.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self(names)
    }

    /// The names of the augmenting children, sorted.
    pub fn children(&self) -> &[QName] {
        &self.0
    }

    pub fn contains(&self, name: &QName) -> bool {
        self.0.binary_search(name).is_ok()
    }
}

/// A single step in a [`Path`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum PathArgument {
    Node(QName),
    Entry(EntryId),
    LeafListEntry { name: QName, value: Value },
    Augmentation(AugmentationId),
}

impl PathArgument {
    pub fn node(name: impl Into<QName>) -> Self {
        Self::Node(name.into())
    }

    pub fn entry<K, V>(name: impl Into<QName>, keys: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<QName>,
        V: Into<Value>,
    {
        Self::Entry(EntryId::new(name, keys))
    }

    pub fn leaf_list_entry(name: impl Into<QName>, value: impl Into<Value>) -> Self {
        Self::LeafListEntry {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn augmentation<N: Into<QName>>(children: impl IntoIterator<Item = N>) -> Self {
        Self::Augmentation(AugmentationId::new(children))
    }

    /// The schema node name this argument selects.
    ///
    /// Augmentations have no name of their own.
    pub fn name(&self) -> Option<&QName> {
        match self {
            PathArgument::Node(name) => Some(name),
            PathArgument::Entry(entry) => Some(entry.name()),
            PathArgument::LeafListEntry { name, .. } => Some(name),
            PathArgument::Augmentation(_) => None,
        }
    }
}

impl From<&str> for PathArgument {
    fn from(value: &str) -> Self {
        Self::node(value)
    }
}

impl From<QName> for PathArgument {
    fn from(value: QName) -> Self {
        Self::Node(value)
    }
}

impl From<EntryId> for PathArgument {
    fn from(value: EntryId) -> Self {
        Self::Entry(value)
    }
}

impl From<AugmentationId> for PathArgument {
    fn from(value: AugmentationId) -> Self {
        Self::Augmentation(value)
    }
}

impl fmt::Display for PathArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathArgument::Node(name) => write!(f, "{name}"),
            PathArgument::Entry(entry) => {
                write!(f, "{}", entry.name)?;
                for (k, v) in &entry.keys {
                    write!(f, "[{k}={v}]")?;
                }
                Ok(())
            }
            PathArgument::LeafListEntry { name, value } => write!(f, "{name}[.={value}]"),
            PathArgument::Augmentation(aug) => {
                f.write_str("augmentation{")?;
                for (i, name) in aug.0.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{name}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Debug for PathArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An absolute, hierarchical address of a node in a data tree.
///
/// The empty path addresses the root.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Path(Vec<PathArgument>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn args(&self) -> &[PathArgument] {
        &self.0
    }

    pub fn last(&self) -> Option<&PathArgument> {
        self.0.last()
    }

    /// Returns this path extended by one more step.
    pub fn child(&self, arg: impl Into<PathArgument>) -> Self {
        let mut args = Vec::with_capacity(self.0.len() + 1);
        args.extend_from_slice(&self.0);
        args.push(arg.into());
        Self(args)
    }

    /// Returns this path extended by all of `args`.
    pub fn join(&self, args: &[PathArgument]) -> Self {
        let mut joined = self.0.clone();
        joined.extend_from_slice(args);
        Self(joined)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    pub fn push(&mut self, arg: PathArgument) {
        self.0.push(arg);
    }

    pub fn pop(&mut self) -> Option<PathArgument> {
        self.0.pop()
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Returns the steps of this path below `prefix`, if `prefix` is an ancestor-or-self.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<&[PathArgument]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }
}

impl FromIterator<PathArgument> for Path {
    fn from_iter<T: IntoIterator<Item = PathArgument>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<&[PathArgument]> for Path {
    fn from(value: &[PathArgument]) -> Self {
        Self(value.to_vec())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathArgument;
    type IntoIter = std::slice::Iter<'a, PathArgument>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for arg in &self.0 {
            write!(f, "/{arg}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(any(test, feature = "arbitrary"))]
impl quickcheck::Arbitrary for QName {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        // a small alphabet makes collisions (and thus interesting trees) likely
        let names = ["a", "b", "c", "d", "e"];
        Self::new(g.choose(&names).unwrap())
    }
}

#[cfg(any(test, feature = "arbitrary"))]
impl quickcheck::Arbitrary for PathArgument {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        match *g.choose(&[0u8, 1, 2, 3]).unwrap() {
            0 => Self::Node(<_>::arbitrary(g)),
            1 => Self::entry(QName::arbitrary(g), [(QName::arbitrary(g), Value::arbitrary(g))]),
            2 => Self::LeafListEntry {
                name: <_>::arbitrary(g),
                value: <_>::arbitrary(g),
            },
            _ => Self::augmentation(Vec::<QName>::arbitrary(g)),
        }
    }
}
