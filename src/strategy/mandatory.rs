// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::BuildContext;
use crate::{
    Path, PathArgument, QName, TreeNode,
    error::ValidationError,
    schema::{DataChildren, SchemaKind},
};

enum Required {
    /// A mandatory leaf, or a list or leaf-list with `min-elements` above zero.
    Node(Box<[PathArgument]>),
    Choice(Box<[PathArgument]>, QName),
}

/// Checks that the mandatory descendants of a node are present.
///
/// Requirements are collected depth-first in schema order, looking through non-presence
/// containers and augmentations (which exist only by virtue of their children), so the first
/// violation reported is the first missing node in schema order.
pub(crate) struct MandatoryEnforcer {
    required: Vec<Required>,
}

impl MandatoryEnforcer {
    /// Returns `None` if nothing below `body` is mandatory, or if mandatory nodes are not
    /// validated at all.
    pub(crate) fn for_body(body: &DataChildren, ctx: &BuildContext) -> Option<Self> {
        if !ctx.mandatory {
            return None;
        }
        let mut required = Vec::new();
        collect(body, &mut Vec::new(), ctx, &mut required);
        (!required.is_empty()).then_some(Self { required })
    }

    pub(crate) fn check(&self, path: &Path, node: &TreeNode) -> Result<(), ValidationError> {
        for required in &self.required {
            match required {
                Required::Node(steps) if node.find(steps).is_none() => {
                    return Err(ValidationError::MissingMandatory {
                        path: path.clone(),
                        missing: Path::from(&steps[..]),
                    });
                }
                Required::Choice(steps, choice) if node.find(steps).is_none() => {
                    return Err(ValidationError::MissingChoice {
                        path: path.clone(),
                        choice: choice.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn collect(
    body: &DataChildren,
    prefix: &mut Vec<PathArgument>,
    ctx: &BuildContext,
    out: &mut Vec<Required>,
) {
    let step = |prefix: &[PathArgument], arg: PathArgument| -> Box<[PathArgument]> {
        prefix.iter().cloned().chain([arg]).collect()
    };
    for child in body.children().iter().filter(|c| ctx.includes(c)) {
        let arg = PathArgument::Node(child.name().clone());
        match child.kind() {
            SchemaKind::Leaf { mandatory: true } => out.push(Required::Node(step(prefix, arg))),
            SchemaKind::LeafList { elements, .. } | SchemaKind::List { elements, .. }
                if elements.min > 0 =>
            {
                out.push(Required::Node(step(prefix, arg)))
            }
            SchemaKind::Choice {
                mandatory: true, ..
            } => out.push(Required::Choice(step(prefix, arg), child.name().clone())),
            SchemaKind::Container {
                presence: false,
                body,
            } => {
                prefix.push(arg);
                collect(body, prefix, ctx, out);
                prefix.pop();
            }
            _ => {}
        }
    }
    for augmentation in body.augmentations() {
        prefix.push(PathArgument::Augmentation(augmentation.id()));
        let inner = DataChildren {
            children: augmentation.children().to_vec(),
            augmentations: Vec::new(),
        };
        collect(&inner, prefix, ctx, out);
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TreeType, schema::SchemaNode};

    fn ctx() -> BuildContext {
        BuildContext {
            tree_type: TreeType::Configuration,
            mandatory: true,
            unique: true,
        }
    }

    fn body(children: impl IntoIterator<Item = SchemaNode>) -> DataChildren {
        DataChildren {
            children: children.into_iter().collect(),
            augmentations: Vec::new(),
        }
    }

    #[test]
    fn reports_first_missing_descendant_in_schema_order() {
        let body = body([
            SchemaNode::leaf("optional"),
            SchemaNode::container("np")
                .child(SchemaNode::leaf("deep").mandatory())
                .child(SchemaNode::container("p").presence().child(SchemaNode::leaf("x").mandatory())),
            SchemaNode::leaf("top").mandatory(),
            SchemaNode::leaf("state").mandatory().config(false),
        ]);
        let enforcer = MandatoryEnforcer::for_body(&body, &ctx()).unwrap();
        let path = Path::root().child("c");

        let empty = TreeNode::container("c", []);
        let err = enforcer.check(&path, &empty).unwrap_err();
        assert_eq!(err.to_string(), "Node /c is missing mandatory descendant /np/deep");

        let partial = TreeNode::container(
            "c",
            [TreeNode::container("np", [TreeNode::leaf("deep", 1u64)])],
        );
        let err = enforcer.check(&path, &partial).unwrap_err();
        assert_eq!(err.to_string(), "Node /c is missing mandatory descendant /top");

        let complete = TreeNode::container(
            "c",
            [
                TreeNode::container("np", [TreeNode::leaf("deep", 1u64)]),
                TreeNode::leaf("top", 1u64),
            ],
        );
        enforcer.check(&path, &complete).unwrap();
    }

    #[test]
    fn mandatory_choices_and_non_empty_lists() {
        let body = body([
            SchemaNode::choice("how").mandatory(),
            SchemaNode::leaf_list("ll").min_elements(1),
        ]);
        let enforcer = MandatoryEnforcer::for_body(&body, &ctx()).unwrap();
        let err = enforcer
            .check(&Path::root(), &TreeNode::container("data", []))
            .unwrap_err();
        assert_eq!(err.error_app_tag(), Some("missing-choice"));
        let err = enforcer
            .check(
                &Path::root(),
                &TreeNode::container("data", [TreeNode::choice("how", [])]),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Node / is missing mandatory descendant /ll");
    }

    #[test]
    fn nothing_to_enforce() {
        let body = body([SchemaNode::leaf("x")]);
        assert!(MandatoryEnforcer::for_body(&body, &ctx()).is_none());
        let body = self::body([SchemaNode::leaf("x").mandatory()]);
        let disabled = BuildContext {
            mandatory: false,
            ..ctx()
        };
        assert!(MandatoryEnforcer::for_body(&body, &disabled).is_none());
    }
}
