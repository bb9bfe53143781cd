// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The read-only schema a data tree enforces.
//!
//! This is a deliberately small model of a YANG schema: just the shapes and constraints the data
//! tree needs to validate data. Parsing YANG modules into it is left to the caller.
//!
//! ```rust
//! # use yangtree::schema::{CaseSchema, Schema, SchemaNode};
//! let schema = Schema::new([SchemaNode::container("interfaces").child(
//!     SchemaNode::list("interface", ["name"])
//!         .child(SchemaNode::leaf("name"))
//!         .child(SchemaNode::leaf("mtu").mandatory())
//!         .child(SchemaNode::leaf_list("address").max_elements(8))
//!         .child(
//!             SchemaNode::choice("duplex")
//!                 .case(CaseSchema::new("auto").child(SchemaNode::leaf("negotiate")))
//!                 .case(CaseSchema::new("fixed").child(SchemaNode::leaf("speed"))),
//!         )
//!         .unique(["mtu", "name"]),
//! )]);
//! assert_eq!(schema.children().len(), 1);
//! ```
use crate::{AugmentationId, QName};

/// Who decides the order of entries in a list or leaf-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderedBy {
    #[default]
    System,
    User,
}

/// `min-elements` / `max-elements` of a list or leaf-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementCount {
    pub min: u32,
    pub max: Option<u32>,
}

impl ElementCount {
    pub fn is_constrained(&self) -> bool {
        self.min > 0 || self.max.is_some()
    }
}

/// A `unique` statement: a set of descendant leaves whose values must, taken together, differ
/// between any two entries of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    leaves: Vec<Vec<QName>>,
}

impl UniqueConstraint {
    /// Each leaf is given as a `/`-separated path relative to the list entry, like `"ip"` or
    /// `"endpoint/port"`.
    pub fn new<S: AsRef<str>>(leaves: impl IntoIterator<Item = S>) -> Self {
        Self {
            leaves: leaves
                .into_iter()
                .map(|leaf| {
                    leaf.as_ref()
                        .split('/')
                        .filter(|step| !step.is_empty())
                        .map(QName::new)
                        .collect()
                })
                .collect(),
        }
    }

    pub fn leaves(&self) -> &[Vec<QName>] {
        &self.leaves
    }
}

/// The data children of a container-like schema node.
#[derive(Debug, Clone, Default)]
pub struct DataChildren {
    pub(crate) children: Vec<SchemaNode>,
    pub(crate) augmentations: Vec<AugmentationSchema>,
}

impl DataChildren {
    pub fn children(&self) -> &[SchemaNode] {
        &self.children
    }

    pub fn augmentations(&self) -> &[AugmentationSchema] {
        &self.augmentations
    }
}

/// Children contributed to a node by one `augment` statement.
///
/// In data, they are grouped under a node identified by the set of their names.
#[derive(Debug, Clone)]
pub struct AugmentationSchema {
    pub(crate) children: Vec<SchemaNode>,
}

impl AugmentationSchema {
    pub fn id(&self) -> AugmentationId {
        AugmentationId::new(self.children.iter().map(|c| c.name.clone()))
    }

    pub fn children(&self) -> &[SchemaNode] {
        &self.children
    }
}

/// One case of a choice.
#[derive(Debug, Clone)]
pub struct CaseSchema {
    pub(crate) name: QName,
    pub(crate) body: DataChildren,
}

impl CaseSchema {
    pub fn new(name: impl Into<QName>) -> Self {
        Self {
            name: name.into(),
            body: DataChildren::default(),
        }
    }

    pub fn child(mut self, child: SchemaNode) -> Self {
        self.body.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = SchemaNode>) -> Self {
        self.body.children.extend(children);
        self
    }

    pub fn augment(mut self, children: impl IntoIterator<Item = SchemaNode>) -> Self {
        self.body.augmentations.push(AugmentationSchema {
            children: children.into_iter().collect(),
        });
        self
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn body(&self) -> &DataChildren {
        &self.body
    }
}

/// The shape-specific part of a [`SchemaNode`].
#[derive(Debug, Clone)]
pub enum SchemaKind {
    Leaf {
        mandatory: bool,
    },
    LeafList {
        ordered_by: OrderedBy,
        elements: ElementCount,
    },
    Container {
        presence: bool,
        body: DataChildren,
    },
    List {
        keys: Vec<QName>,
        ordered_by: OrderedBy,
        elements: ElementCount,
        unique: Vec<UniqueConstraint>,
        body: DataChildren,
    },
    Choice {
        mandatory: bool,
        cases: Vec<CaseSchema>,
    },
}

/// A schema node, built with the constructors and chained setters below.
///
/// Setters that do not apply to the node's kind (say, [`SchemaNode::presence`] on a leaf) leave
/// the node unchanged.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub(crate) name: QName,
    pub(crate) config: bool,
    pub(crate) kind: SchemaKind,
}

impl SchemaNode {
    fn new(name: impl Into<QName>, kind: SchemaKind) -> Self {
        Self {
            name: name.into(),
            config: true,
            kind,
        }
    }

    pub fn leaf(name: impl Into<QName>) -> Self {
        Self::new(name, SchemaKind::Leaf { mandatory: false })
    }

    pub fn leaf_list(name: impl Into<QName>) -> Self {
        Self::new(
            name,
            SchemaKind::LeafList {
                ordered_by: OrderedBy::System,
                elements: ElementCount::default(),
            },
        )
    }

    pub fn container(name: impl Into<QName>) -> Self {
        Self::new(
            name,
            SchemaKind::Container {
                presence: false,
                body: DataChildren::default(),
            },
        )
    }

    pub fn list<K: Into<QName>>(name: impl Into<QName>, keys: impl IntoIterator<Item = K>) -> Self {
        Self::new(
            name,
            SchemaKind::List {
                keys: keys.into_iter().map(Into::into).collect(),
                ordered_by: OrderedBy::System,
                elements: ElementCount::default(),
                unique: Vec::new(),
                body: DataChildren::default(),
            },
        )
    }

    pub fn choice(name: impl Into<QName>) -> Self {
        Self::new(
            name,
            SchemaKind::Choice {
                mandatory: false,
                cases: Vec::new(),
            },
        )
    }

    /// Marks a leaf or choice as mandatory.
    pub fn mandatory(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::Leaf { mandatory } | SchemaKind::Choice { mandatory, .. } => {
                *mandatory = true
            }
            _ => {}
        }
        self
    }

    /// Marks this node as state data (`config false`).
    pub fn config(mut self, config: bool) -> Self {
        self.config = config;
        self
    }

    /// Makes a container a presence container.
    pub fn presence(mut self) -> Self {
        if let SchemaKind::Container { presence, .. } = &mut self.kind {
            *presence = true;
        }
        self
    }

    pub fn ordered_by_user(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::LeafList { ordered_by, .. } | SchemaKind::List { ordered_by, .. } => {
                *ordered_by = OrderedBy::User
            }
            _ => {}
        }
        self
    }

    pub fn min_elements(mut self, min: u32) -> Self {
        if let Some(elements) = self.elements_mut() {
            elements.min = min;
        }
        self
    }

    pub fn max_elements(mut self, max: u32) -> Self {
        if let Some(elements) = self.elements_mut() {
            elements.max = Some(max);
        }
        self
    }

    fn elements_mut(&mut self) -> Option<&mut ElementCount> {
        match &mut self.kind {
            SchemaKind::LeafList { elements, .. } | SchemaKind::List { elements, .. } => {
                Some(elements)
            }
            _ => None,
        }
    }

    /// Adds a `unique` constraint to a list, see [`UniqueConstraint::new`].
    pub fn unique<S: AsRef<str>>(mut self, leaves: impl IntoIterator<Item = S>) -> Self {
        if let SchemaKind::List { unique, .. } = &mut self.kind {
            unique.push(UniqueConstraint::new(leaves));
        }
        self
    }

    /// Adds a data child to a container or list.
    pub fn child(self, child: SchemaNode) -> Self {
        self.children([child])
    }

    pub fn children(mut self, children: impl IntoIterator<Item = SchemaNode>) -> Self {
        if let Some(body) = self.body_mut() {
            body.children.extend(children);
        }
        self
    }

    /// Adds the children of one augmentation to a container or list.
    pub fn augment(mut self, children: impl IntoIterator<Item = SchemaNode>) -> Self {
        if let Some(body) = self.body_mut() {
            body.augmentations.push(AugmentationSchema {
                children: children.into_iter().collect(),
            });
        }
        self
    }

    pub fn case(mut self, case: CaseSchema) -> Self {
        if let SchemaKind::Choice { cases, .. } = &mut self.kind {
            cases.push(case);
        }
        self
    }

    fn body_mut(&mut self) -> Option<&mut DataChildren> {
        match &mut self.kind {
            SchemaKind::Container { body, .. } | SchemaKind::List { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn is_config(&self) -> bool {
        self.config
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }
}

/// The schema of a whole data tree: the children of its root.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(crate) body: DataChildren,
}

impl Schema {
    pub fn new(children: impl IntoIterator<Item = SchemaNode>) -> Self {
        Self {
            body: DataChildren {
                children: children.into_iter().collect(),
                augmentations: Vec::new(),
            },
        }
    }

    /// Adds the children of one augmentation to the root.
    pub fn augment(mut self, children: impl IntoIterator<Item = SchemaNode>) -> Self {
        self.body.augmentations.push(AugmentationSchema {
            children: children.into_iter().collect(),
        });
        self
    }

    pub fn children(&self) -> &[SchemaNode] {
        &self.body.children
    }

    pub fn augmentations(&self) -> &[AugmentationSchema] {
        &self.body.augmentations
    }
}
