// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use crate::{Path, TreeNode, error::ValidationError, schema::ElementCount};

/// Enforces `min-elements` and `max-elements` of a list or leaf-list.
pub(crate) struct ElementCountValidator {
    min: u32,
    max: Option<u32>,
}

impl ElementCountValidator {
    pub(crate) fn new(elements: ElementCount) -> Option<Self> {
        elements.is_constrained().then_some(Self {
            min: elements.min,
            max: elements.max,
        })
    }

    /// An absent collection counts as empty.
    pub(crate) fn check(&self, path: &Path, after: Option<&TreeNode>) -> Result<(), ValidationError> {
        let count = after.map_or(0, TreeNode::child_count);
        match self.max {
            Some(max) if count > max as usize => {
                return Err(ValidationError::TooManyElements {
                    path: path.clone(),
                    count,
                    max,
                });
            }
            _ => {}
        }
        if count < self.min as usize {
            return Err(ValidationError::TooFewElements {
                path: path.clone(),
                count,
                min: self.min,
            });
        }
        Ok(())
    }
}
