#![allow(dead_code)]

use tracing_subscriber::EnvFilter;
use yangtree::{
    CaseSchema, DataTree, DataTreeConfiguration, EntryId, Modification, Path, Schema, SchemaNode,
    TreeNode, Version, path,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A schema touching every kind of node and every constraint.
pub fn schema() -> Schema {
    Schema::new([SchemaNode::container("top")
        .child(SchemaNode::leaf("name"))
        .child(
            SchemaNode::container("inner")
                .child(SchemaNode::leaf("a"))
                .child(SchemaNode::leaf("b")),
        )
        .child(
            SchemaNode::list("list", ["id"])
                .children([
                    SchemaNode::leaf("id"),
                    SchemaNode::leaf("k1"),
                    SchemaNode::leaf("k2"),
                    SchemaNode::leaf("v"),
                ])
                .unique(["k1", "k2"]),
        )
        .child(SchemaNode::leaf_list("tags").max_elements(3))
        .child(
            SchemaNode::choice("ch")
                .case(CaseSchema::new("a").child(SchemaNode::leaf("a1")))
                .case(CaseSchema::new("b").child(SchemaNode::leaf("b1"))),
        )
        .child(
            SchemaNode::container("p")
                .presence()
                .child(SchemaNode::leaf("required").mandatory())
                .child(SchemaNode::leaf("optional")),
        )
        .child(
            SchemaNode::list("ordered", ["id"])
                .ordered_by_user()
                .child(SchemaNode::leaf("id")),
        )
        .child(SchemaNode::leaf("counter").config(false))])
}

pub fn tree() -> DataTree {
    init_tracing();
    DataTree::new(schema(), DataTreeConfiguration::default()).expect("schema roots a tree")
}

pub fn entry(id: u64) -> EntryId {
    EntryId::new("list", [("id", id)])
}

pub fn entry_path(id: u64) -> Path {
    path!("top" / "list" / "list"[id = id])
}

/// A list entry with its unique leaves set.
pub fn entry_node(id: u64, k1: &str, k2: &str) -> TreeNode {
    TreeNode::map_entry(
        entry(id),
        [TreeNode::leaf("k1", k1), TreeNode::leaf("k2", k2)],
    )
}

/// Runs `edit` in a fresh modification and commits it.
pub fn commit(
    tree: &DataTree,
    edit: impl FnOnce(&mut Modification) -> yangtree::Result<()>,
) -> yangtree::Result<Version> {
    let mut modification = tree.take_snapshot().new_modification();
    edit(&mut modification)?;
    modification.ready()?;
    let candidate = tree.prepare(&mut modification)?;
    tree.commit(candidate, None)
}
