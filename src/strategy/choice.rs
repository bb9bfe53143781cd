// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{BuildContext, ChildStrategies, mandatory::MandatoryEnforcer};
use crate::{
    Path, PathArgument, QName, TreeNode,
    error::ValidationError,
    schema::CaseSchema,
};

struct CaseEnforcer {
    name: QName,
    /// The data children this case may contribute, in schema order.
    children: Vec<PathArgument>,
    mandatory: Option<MandatoryEnforcer>,
}

impl CaseEnforcer {
    fn first_present<'a>(&'a self, node: &TreeNode) -> Option<&'a PathArgument> {
        self.children.iter().find(|id| node.child(id).is_some())
    }

    fn has_changed(&self, before: Option<&TreeNode>, after: &TreeNode) -> bool {
        self.children.iter().any(|id| match (before.and_then(|b| b.child(id)), after.child(id)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(old), Some(new)) => !TreeNode::ptr_eq(old, new),
        })
    }
}

/// A choice holds the children of at most one of its cases at a time.
pub(crate) struct ChoiceStrategy {
    name: QName,
    children: ChildStrategies,
    cases: Vec<CaseEnforcer>,
}

impl ChoiceStrategy {
    pub(crate) fn new(name: QName, cases: &[CaseSchema], ctx: &BuildContext) -> Self {
        let mut children = ChildStrategies::empty();
        let mut enforcers = Vec::with_capacity(cases.len());
        for case in cases {
            let body = case.body();
            children.extend(ChildStrategies::build(body, ctx));
            let ids = body
                .children()
                .iter()
                .filter(|c| ctx.includes(c))
                .map(|c| PathArgument::Node(c.name().clone()))
                .chain(
                    body.augmentations()
                        .iter()
                        .map(|a| PathArgument::Augmentation(a.id())),
                )
                .collect();
            enforcers.push(CaseEnforcer {
                name: case.name().clone(),
                children: ids,
                mandatory: MandatoryEnforcer::for_body(body, ctx),
            });
        }
        Self {
            name,
            children,
            cases: enforcers,
        }
    }

    pub(crate) fn children(&self) -> &ChildStrategies {
        &self.children
    }

    pub(crate) fn accepts(&self, id: &PathArgument) -> bool {
        matches!(id, PathArgument::Node(name) if *name == self.name)
    }

    /// Checks that children of a single case are present, and that the active case is
    /// complete.
    ///
    /// When several cases are present, the case that was written last (in declaration order,
    /// among those with changed children) wins, and the conflict is reported against the first
    /// other present case.
    pub(crate) fn verify(
        &self,
        path: &Path,
        before: Option<&TreeNode>,
        after: Option<&TreeNode>,
    ) -> Result<(), ValidationError> {
        let Some(after) = after else {
            return Ok(());
        };
        let present: Vec<_> = self
            .cases
            .iter()
            .filter_map(|case| case.first_present(after).map(|child| (case, child)))
            .collect();
        let (case, child) = match present.as_slice() {
            [] => return Ok(()),
            [single] => *single,
            _ => {
                let (case, child) = present
                    .iter()
                    .rev()
                    .find(|(case, _)| case.has_changed(before, after))
                    .unwrap_or(&present[0]);
                let (other_case, other_child) = present
                    .iter()
                    .find(|(other, _)| other.name != case.name)
                    .unwrap_or(&present[0]);
                return Err(ValidationError::CaseConflict {
                    path: path.clone(),
                    child: path.child((*child).clone()),
                    case: case.name.clone(),
                    other_child: path.child((*other_child).clone()),
                    other_case: other_case.name.clone(),
                });
            }
        };
        tracing::trace!(%path, case = %case.name, %child, "active case");
        match &case.mandatory {
            Some(mandatory) => mandatory.check(path, after),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TreeType, schema::SchemaNode, version::VersionSource};

    fn strategy() -> ChoiceStrategy {
        let ctx = BuildContext {
            tree_type: TreeType::Configuration,
            mandatory: true,
            unique: true,
        };
        ChoiceStrategy::new(
            QName::new("how"),
            &[
                CaseSchema::new("a")
                    .child(SchemaNode::leaf("a1"))
                    .child(SchemaNode::leaf("a2").mandatory()),
                CaseSchema::new("b").child(SchemaNode::leaf("b1")),
            ],
            &ctx,
        )
    }

    #[test]
    fn newly_written_case_conflicts_with_existing_one() {
        let strategy = strategy();
        let path = Path::root().child("how");
        let version = VersionSource::default().next();
        let before = TreeNode::choice("how", [TreeNode::leaf("b1", 1u64)]).stamped(version);
        strategy.verify(&path, None, Some(&before)).unwrap();

        let after = TreeNode::choice(
            "how",
            [
                before.child(&PathArgument::node("b1")).unwrap().clone(),
                TreeNode::leaf("a1", 1u64),
                TreeNode::leaf("a2", 2u64),
            ],
        );
        let err = strategy.verify(&path, Some(&before), Some(&after)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Child /how/a1 (from case a) implies non-presence of child /how/b1 (from case b), which is present"
        );
    }

    #[test]
    fn active_case_enforces_its_mandatory_children() {
        let strategy = strategy();
        let path = Path::root().child("how");
        let after = TreeNode::choice("how", [TreeNode::leaf("a1", 1u64)]);
        let err = strategy.verify(&path, None, Some(&after)).unwrap_err();
        assert_eq!(err.to_string(), "Node /how is missing mandatory descendant /a2");
        let inactive = TreeNode::choice("how", [TreeNode::leaf("b1", 1u64)]);
        strategy.verify(&path, None, Some(&inactive)).unwrap();
    }
}
