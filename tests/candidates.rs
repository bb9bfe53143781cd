mod common;

use common::{commit, entry_node, entry_path, tree};
use yangtree::{
    Candidate, DataTree, ModificationState, ModificationType, PathArgument, TreeNode, VersionInfo,
    path,
};

fn prepare_and_commit(
    tree: &DataTree,
    edit: impl FnOnce(&mut yangtree::Modification) -> yangtree::Result<()>,
) -> Candidate {
    let mut m = tree.take_snapshot().new_modification();
    edit(&mut m).unwrap();
    m.ready().unwrap();
    let candidate = tree.prepare(&mut m).unwrap();
    tree.commit(candidate.clone(), None).unwrap();
    candidate
}

#[test]
fn candidates_classify_every_changed_node() {
    let tree = tree();
    let top = PathArgument::node("top");

    let created = prepare_and_commit(&tree, |m| {
        m.write(
            &path!("top"),
            TreeNode::container(
                "top",
                [
                    TreeNode::leaf("name", "x"),
                    TreeNode::container("inner", [TreeNode::leaf("a", 1u64)]),
                ],
            ),
        )
    });
    assert_eq!(created.root().modification_type(), ModificationType::SubtreeModified);
    let node = created.node_at(&[top.clone()]).unwrap();
    assert_eq!(node.modification_type(), ModificationType::Write);
    assert_eq!(node.data_before(), None);

    let renamed = prepare_and_commit(&tree, |m| {
        m.write(&path!("top" / "name"), TreeNode::leaf("name", "y"))
    });
    let node = renamed.node_at(&[top]).unwrap();
    assert_eq!(node.modification_type(), ModificationType::SubtreeModified);
    assert_eq!(
        node.child_modification_type(&PathArgument::node("name")),
        ModificationType::Write
    );
    assert_eq!(
        node.child_modification_type(&PathArgument::node("inner")),
        ModificationType::Unmodified
    );
    assert_eq!(node.modified_children().len(), 1);
}

#[test]
fn containers_appear_and_disappear_with_their_children() {
    let tree = tree();
    let top = PathArgument::node("top");
    let name = path!("top" / "name");

    let added = prepare_and_commit(&tree, |m| m.write(&name, TreeNode::leaf("name", "x")));
    assert_eq!(
        added.node_at(&[top.clone()]).unwrap().modification_type(),
        ModificationType::Appeared
    );

    let removed = prepare_and_commit(&tree, |m| m.delete(&name));
    let node = removed.node_at(&[top.clone()]).unwrap();
    assert_eq!(node.modification_type(), ModificationType::Disappeared);
    assert_eq!(
        node.child_modification_type(&PathArgument::node("name")),
        ModificationType::Delete
    );

    // an insert followed by its removal amounts to nothing
    let aggregate = Candidate::aggregate([added, removed]).unwrap();
    assert_eq!(aggregate.root().modification_type(), ModificationType::Unmodified);
    assert!(aggregate.node_at(&[top]).is_none());
}

#[test]
fn aggregates_span_several_commits() {
    let tree = tree();
    let first = prepare_and_commit(&tree, |m| {
        m.write(&entry_path(1), entry_node(1, "a", "a"))?;
        m.write(&entry_path(2), entry_node(2, "b", "b"))
    });
    let second = prepare_and_commit(&tree, |m| {
        m.delete(&entry_path(1))?;
        m.write(&path!("top" / "name"), TreeNode::leaf("name", "n"))
    });

    let aggregate = Candidate::aggregate([first, second]).unwrap();
    let top = aggregate.node_at(&[PathArgument::node("top")]).unwrap();
    assert_eq!(top.modification_type(), ModificationType::Appeared);
    let list = top.modified_child(&PathArgument::node("list")).unwrap();
    assert_eq!(
        list.child_modification_type(entry_path(1).last().unwrap()),
        ModificationType::Unmodified
    );
    assert_eq!(
        list.child_modification_type(entry_path(2).last().unwrap()),
        ModificationType::Write
    );
    assert!(aggregate.root().data_after().is_some());
}

#[test]
fn committed_candidates_replay_onto_other_trees() {
    let source = tree();
    let replica = tree();
    commit(&source, |m| m.write(&path!("top" / "inner" / "b"), TreeNode::leaf("b", 0u64))).unwrap();
    commit(&replica, |m| m.write(&path!("top" / "inner" / "b"), TreeNode::leaf("b", 0u64)))
        .unwrap();

    let candidate = prepare_and_commit(&source, |m| {
        m.write(&path!("top" / "name"), TreeNode::leaf("name", "x"))?;
        m.write(&entry_path(7), entry_node(7, "a", "b"))?;
        m.delete(&path!("top" / "inner"))
    });

    let mut m = replica.take_snapshot().new_modification();
    candidate.apply_to_modification(&mut m).unwrap();
    m.ready().unwrap();
    let replayed = replica.prepare(&mut m).unwrap();
    replica.commit(replayed, None).unwrap();

    assert_eq!(
        replica.take_snapshot().read_node(&path!("top")),
        source.take_snapshot().read_node(&path!("top"))
    );
}

#[test]
fn subtree_candidates_replay_below_their_root() {
    let source = tree();
    let replica = tree();
    let candidate = prepare_and_commit(&source, |m| {
        m.write(&path!("top" / "tags"), TreeNode::leaf_set("tags", ["x", "y"]))
    });
    let top = candidate.node_at(&[PathArgument::node("top")]).unwrap().clone();

    let mut m = replica.take_snapshot().new_modification();
    Candidate::new(path!("top"), top)
        .apply_to_modification(&mut m)
        .unwrap();
    m.ready().unwrap();
    assert_eq!(
        m.read_node(&path!("top" / "tags")).unwrap(),
        Some(TreeNode::leaf_set("tags", ["x", "y"]))
    );
}

#[test]
fn chained_modifications_commit_in_sequence() {
    let tree = tree();
    let mut first = tree.take_snapshot().new_modification();
    first
        .write(&path!("top" / "name"), TreeNode::leaf("name", "first"))
        .unwrap();
    first.ready().unwrap();

    let mut second = first.new_modification().unwrap();
    assert_eq!(first.state(), ModificationState::AppliedToSnapshot);
    assert_eq!(
        second.read_node(&path!("top" / "name")).map_err(|e| e.to_string()),
        Err("read_node requires a ready modification".to_string())
    );
    second
        .write(&path!("top" / "inner" / "a"), TreeNode::leaf("a", 1u64))
        .unwrap();
    second.ready().unwrap();
    assert_eq!(
        second.read_node(&path!("top" / "name")).unwrap(),
        Some(TreeNode::leaf("name", "first"))
    );

    let candidate = tree.prepare(&mut first).unwrap();
    assert_eq!(first.state(), ModificationState::Prepared);
    tree.commit(candidate, Some(VersionInfo::new(1u32))).unwrap();
    let candidate = tree.prepare(&mut second).unwrap();
    tree.commit(candidate, Some(VersionInfo::new(2u32))).unwrap();

    let now = tree.take_snapshot();
    assert!(now.read_node(&path!("top" / "name")).is_some());
    assert!(now.read_node(&path!("top" / "inner" / "a")).is_some());

    let info = |p| now.read_version_info(&p).and_then(|i| i.downcast_ref::<u32>().copied());
    assert_eq!(info(path!("top" / "name")), Some(1));
    assert_eq!(info(path!("top" / "inner")), Some(2));
    assert_eq!(info(path!("top")), Some(2));
}
