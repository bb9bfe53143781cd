mod common;

use common::{commit, entry_node, entry_path, tree};
use yangtree::{
    ConflictError, ConflictReason, DataTreeError, ModificationState, TreeNode, UsageError, path,
};

#[test]
fn writes_to_the_same_leaf_conflict() {
    let tree = tree();
    let name = path!("top" / "name");
    commit(&tree, |m| m.write(&name, TreeNode::leaf("name", "seed"))).unwrap();

    let snapshot = tree.take_snapshot();
    let mut first = snapshot.new_modification();
    let mut second = snapshot.new_modification();
    first.write(&name, TreeNode::leaf("name", "first")).unwrap();
    second.write(&name, TreeNode::leaf("name", "second")).unwrap();
    first.ready().unwrap();
    second.ready().unwrap();

    let candidate = tree.prepare(&mut first).unwrap();
    tree.commit(candidate, None).unwrap();

    let err = tree.validate(&second).unwrap_err();
    assert!(matches!(
        &err,
        DataTreeError::Conflict(ConflictError::ConflictingModification {
            path,
            reason: ConflictReason::Replaced,
        }) if *path == name
    ));
    assert_eq!(err.error_tag(), "in-use");
    // validation has no side effects
    assert_eq!(tree.validate(&second).unwrap_err().to_string(), err.to_string());
    assert_eq!(second.state(), ModificationState::Ready);
}

#[test]
fn writes_to_disjoint_subtrees_both_commit() {
    let tree = tree();
    commit(&tree, |m| m.write(&path!("top" / "name"), TreeNode::leaf("name", "seed"))).unwrap();

    let snapshot = tree.take_snapshot();
    let mut first = snapshot.new_modification();
    let mut second = snapshot.new_modification();
    first
        .write(&path!("top" / "name"), TreeNode::leaf("name", "renamed"))
        .unwrap();
    second
        .write(&path!("top" / "inner" / "a"), TreeNode::leaf("a", 1u64))
        .unwrap();
    first.ready().unwrap();
    second.ready().unwrap();

    let candidate = tree.prepare(&mut first).unwrap();
    tree.commit(candidate, None).unwrap();
    tree.validate(&second).unwrap();
    let candidate = tree.prepare(&mut second).unwrap();
    tree.commit(candidate, None).unwrap();

    let now = tree.take_snapshot();
    assert_eq!(
        now.read_node(&path!("top" / "name")),
        Some(TreeNode::leaf("name", "renamed"))
    );
    assert_eq!(
        now.read_node(&path!("top" / "inner" / "a")),
        Some(TreeNode::leaf("a", 1u64))
    );
}

#[test]
fn replacing_an_ancestor_conflicts_with_edits_below_it() {
    let tree = tree();
    let a = path!("top" / "inner" / "a");
    commit(&tree, |m| m.write(&a, TreeNode::leaf("a", 1u64))).unwrap();

    let snapshot = tree.take_snapshot();
    let mut below = snapshot.new_modification();
    below.write(&a, TreeNode::leaf("a", 2u64)).unwrap();
    below.ready().unwrap();

    commit(&tree, |m| {
        m.write(
            &path!("top"),
            TreeNode::container("top", [TreeNode::leaf("name", "fresh")]),
        )
    })
    .unwrap();

    let err = tree.validate(&below).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Conflicting modification at /top/inner/a: Node was deleted by other transaction."
    );
}

#[test]
fn candidates_go_stale_when_another_commit_lands_first() {
    let tree = tree();
    let snapshot = tree.take_snapshot();
    let mut first = snapshot.new_modification();
    let mut second = snapshot.new_modification();
    first.write(&entry_path(1), entry_node(1, "a", "a")).unwrap();
    second.write(&entry_path(2), entry_node(2, "b", "b")).unwrap();
    first.ready().unwrap();
    second.ready().unwrap();

    let first_candidate = tree.prepare(&mut first).unwrap();
    let second_candidate = tree.prepare(&mut second).unwrap();
    tree.commit(first_candidate, None).unwrap();
    assert!(matches!(
        tree.commit(second_candidate, None),
        Err(DataTreeError::Usage(UsageError::StaleCandidate))
    ));

    // preparing again re-applies onto the new root
    let candidate = tree.prepare(&mut second).unwrap();
    tree.commit(candidate, None).unwrap();
    let list = tree.take_snapshot().read_node(&path!("top" / "list")).unwrap();
    assert_eq!(list.child_count(), 2);
}

#[test]
fn concurrent_writers_to_distinct_entries_all_land() {
    const WRITERS: u64 = 4;
    const ENTRIES: u64 = 8;

    let tree = tree();
    std::thread::scope(|s| {
        for writer in 0..WRITERS {
            let tree = &tree;
            s.spawn(move || {
                for n in 0..ENTRIES {
                    let id = writer * ENTRIES + n;
                    loop {
                        let mut m = tree.take_snapshot().new_modification();
                        m.write(&entry_path(id), entry_node(id, &id.to_string(), "w"))
                            .unwrap();
                        m.ready().unwrap();
                        match tree.prepare(&mut m).and_then(|c| tree.commit(c, None)) {
                            Ok(_) => break,
                            Err(DataTreeError::Conflict(_))
                            | Err(DataTreeError::Usage(UsageError::StaleCandidate)) => continue,
                            Err(e) => panic!("{e}"),
                        }
                    }
                }
            });
        }
    });

    let list = tree.take_snapshot().read_node(&path!("top" / "list")).unwrap();
    assert_eq!(list.child_count() as u64, WRITERS * ENTRIES);
}
