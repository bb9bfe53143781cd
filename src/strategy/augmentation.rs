// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{BuildContext, ChildStrategies};
use crate::{AugmentationId, PathArgument, schema::AugmentationSchema};

/// The node grouping the children one augmentation contributes to its target.
///
/// Like a non-presence container it exists only while it has children. Mandatory children of
/// the augmentation are enforced by the augmented node.
pub(crate) struct AugmentationStrategy {
    id: AugmentationId,
    children: ChildStrategies,
}

impl AugmentationStrategy {
    pub(crate) fn new(augmentation: &AugmentationSchema, ctx: &BuildContext) -> Self {
        let body = crate::schema::DataChildren {
            children: augmentation.children().to_vec(),
            augmentations: Vec::new(),
        };
        Self {
            id: augmentation.id(),
            children: ChildStrategies::build(&body, ctx),
        }
    }

    pub(crate) fn children(&self) -> &ChildStrategies {
        &self.children
    }

    pub(crate) fn accepts(&self, id: &PathArgument) -> bool {
        matches!(id, PathArgument::Augmentation(aug) if *aug == self.id)
    }
}
