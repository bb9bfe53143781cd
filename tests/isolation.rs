mod common;

use common::{commit, entry_node, entry_path, tree};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use yangtree::{Path, TreeNode, path};

#[test]
fn snapshots_do_not_see_later_commits() {
    let tree = tree();
    let name = path!("top" / "name");
    commit(&tree, |m| m.write(&name, TreeNode::leaf("name", "one"))).unwrap();

    let old = tree.take_snapshot();
    commit(&tree, |m| m.write(&name, TreeNode::leaf("name", "two"))).unwrap();
    commit(&tree, |m| m.delete(&path!("top"))).unwrap();

    assert_eq!(old.read_node(&name), Some(TreeNode::leaf("name", "one")));
    assert_eq!(tree.take_snapshot().read_node(&name), None);
    assert!(old.version() < tree.take_snapshot().version());
}

#[test]
fn unchanged_subtrees_are_shared_between_versions() {
    let tree = tree();
    commit(&tree, |m| {
        m.write(
            &path!("top" / "inner"),
            TreeNode::container("inner", [TreeNode::leaf("a", 1u64), TreeNode::leaf("b", 1u64)]),
        )?;
        for id in 0..3 {
            m.write(&entry_path(id), entry_node(id, &id.to_string(), "x"))?;
        }
        Ok(())
    })
    .unwrap();
    let before = tree.take_snapshot();

    commit(&tree, |m| m.write(&path!("top" / "inner" / "a"), TreeNode::leaf("a", 2u64))).unwrap();
    let after = tree.take_snapshot();

    let node = |s: &yangtree::Snapshot, p: Path| s.read_node(&p).unwrap();
    for edited in [path!("top"), path!("top" / "inner"), path!("top" / "inner" / "a")] {
        assert!(!TreeNode::ptr_eq(
            &node(&before, edited.clone()),
            &node(&after, edited)
        ));
    }
    for untouched in [path!("top" / "inner" / "b"), path!("top" / "list")] {
        assert!(TreeNode::ptr_eq(
            &node(&before, untouched.clone()),
            &node(&after, untouched)
        ));
    }
    // versions follow the edited spine only
    let top_before = node(&before, path!("top"));
    let top_after = node(&after, path!("top"));
    assert_eq!(top_before.version(), top_after.version());
    assert!(top_before.subtree_version() < top_after.subtree_version());
}

#[derive(Debug, Clone)]
enum Edit {
    SetName(u8),
    SetInner(bool, u8),
    DeleteInner,
    PutEntry(u8),
    DeleteEntry(u8),
}

impl Arbitrary for Edit {
    fn arbitrary(g: &mut Gen) -> Self {
        let small = |g: &mut Gen| u8::arbitrary(g) % 4;
        match u8::arbitrary(g) % 5 {
            0 => Edit::SetName(small(g)),
            1 => Edit::SetInner(bool::arbitrary(g), small(g)),
            2 => Edit::DeleteInner,
            3 => Edit::PutEntry(small(g)),
            _ => Edit::DeleteEntry(small(g)),
        }
    }
}

impl Edit {
    fn apply(&self, m: &mut yangtree::Modification) -> yangtree::Result<()> {
        match *self {
            Edit::SetName(v) => m.write(&path!("top" / "name"), TreeNode::leaf("name", v)),
            Edit::SetInner(first, v) => {
                let leaf = if first { "a" } else { "b" };
                m.write(&path!("top" / "inner").child(leaf), TreeNode::leaf(leaf, v))
            }
            Edit::DeleteInner => m.delete(&path!("top" / "inner")),
            Edit::PutEntry(id) => {
                let id = u64::from(id);
                m.write(&entry_path(id), entry_node(id, &id.to_string(), "k"))
            }
            Edit::DeleteEntry(id) => m.delete(&entry_path(u64::from(id))),
        }
    }
}

#[quickcheck]
fn old_snapshots_never_change(edits: Vec<Edit>) -> bool {
    let tree = tree();
    let mut history = Vec::new();
    for edit in &edits {
        let snapshot = tree.take_snapshot();
        let seen = format!("{:?}", snapshot.root());
        history.push((snapshot, seen));
        if commit(&tree, |m| edit.apply(m)).is_err() {
            return false;
        }
    }
    history
        .iter()
        .all(|(snapshot, seen)| format!("{:?}", snapshot.root()) == *seen)
}
