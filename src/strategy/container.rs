// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{BuildContext, ChildStrategies, mandatory::MandatoryEnforcer};
use crate::{Path, PathArgument, TreeNode, error::ValidationError, schema::DataChildren};

/// How a container comes into being and goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContainerKind {
    /// The root of the schema. It always exists, even if empty.
    Root,
    /// A presence container: it exists only when written explicitly, and its existence carries
    /// meaning even with no children.
    Presence,
    /// A non-presence container: it appears with its first child and vanishes with its last.
    Structural,
}

pub(crate) struct ContainerStrategy {
    id: PathArgument,
    kind: ContainerKind,
    children: ChildStrategies,
    mandatory: Option<MandatoryEnforcer>,
}

impl ContainerStrategy {
    pub(crate) fn new(
        id: PathArgument,
        kind: ContainerKind,
        body: &DataChildren,
        ctx: &BuildContext,
    ) -> Self {
        Self {
            id,
            kind,
            children: ChildStrategies::build(body, ctx),
            mandatory: MandatoryEnforcer::for_body(body, ctx),
        }
    }

    pub(crate) fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub(crate) fn children(&self) -> &ChildStrategies {
        &self.children
    }

    pub(crate) fn accepts(&self, id: &PathArgument) -> bool {
        *id == self.id
    }

    /// Mandatory descendants only matter while the container exists. Structural containers are
    /// checked too once they have been materialized by a child.
    pub(crate) fn verify(&self, path: &Path, after: Option<&TreeNode>) -> Result<(), ValidationError> {
        match (&self.mandatory, after) {
            (Some(mandatory), Some(after)) => mandatory.check(path, after),
            _ => Ok(()),
        }
    }
}
