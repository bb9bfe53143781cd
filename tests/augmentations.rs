mod common;

use yangtree::{
    AugmentationId, DataTree, DataTreeConfiguration, DataTreeError, ModificationType, Path,
    PathArgument, Schema, SchemaNode, TreeNode, ValidationError,
};

fn tree() -> DataTree {
    common::init_tracing();
    let schema = Schema::new([SchemaNode::container("device")
        .presence()
        .child(SchemaNode::leaf("name"))
        .augment([SchemaNode::leaf("vendor").mandatory(), SchemaNode::leaf("model")])
        .augment([SchemaNode::leaf("colour")])]);
    DataTree::new(schema, DataTreeConfiguration::default()).unwrap()
}

fn hardware() -> AugmentationId {
    AugmentationId::new(["vendor", "model"])
}

fn device() -> Path {
    Path::root().child("device")
}

fn hardware_path() -> Path {
    device().child(hardware())
}

fn commit(tree: &DataTree, edit: impl FnOnce(&mut yangtree::Modification) -> yangtree::Result<()>) {
    let mut m = tree.take_snapshot().new_modification();
    edit(&mut m).unwrap();
    m.ready().unwrap();
    let candidate = tree.prepare(&mut m).unwrap();
    tree.commit(candidate, None).unwrap();
}

fn acme() -> TreeNode {
    TreeNode::container(
        "device",
        [
            TreeNode::leaf("name", "edge"),
            TreeNode::augmentation(hardware(), [TreeNode::leaf("vendor", "acme")]),
        ],
    )
}

#[test]
fn augmentations_are_written_merged_and_read_back() {
    let tree = tree();
    commit(&tree, |m| m.write(&device(), acme()));
    assert_eq!(
        tree.take_snapshot().read_node(&hardware_path().child("vendor")),
        Some(TreeNode::leaf("vendor", "acme"))
    );

    commit(&tree, |m| {
        m.merge(
            &hardware_path(),
            TreeNode::augmentation(hardware(), [TreeNode::leaf("model", "x1")]),
        )
    });
    assert_eq!(
        tree.take_snapshot().read_node(&hardware_path()),
        Some(TreeNode::augmentation(
            hardware(),
            [TreeNode::leaf("vendor", "acme"), TreeNode::leaf("model", "x1")],
        ))
    );
}

#[test]
fn augmentations_appear_with_their_first_child() {
    let tree = tree();
    commit(&tree, |m| m.write(&device(), acme()));

    let colour = AugmentationId::new(["colour"]);
    let mut m = tree.take_snapshot().new_modification();
    m.write(
        &device().child(colour.clone()).child("colour"),
        TreeNode::leaf("colour", "red"),
    )
    .unwrap();
    m.ready().unwrap();
    let candidate = tree.prepare(&mut m).unwrap();
    let node = candidate
        .node_at(&[PathArgument::node("device"), PathArgument::Augmentation(colour)])
        .unwrap();
    assert_eq!(node.modification_type(), ModificationType::Appeared);
    assert_eq!(
        node.child_modification_type(&PathArgument::node("colour")),
        ModificationType::Write
    );
}

#[test]
fn mandatory_augmenting_leaves_are_enforced_by_the_augmented_node() {
    let tree = tree();
    let mut m = tree.take_snapshot().new_modification();
    m.write(
        &device(),
        TreeNode::container("device", [TreeNode::leaf("name", "edge")]),
    )
    .unwrap();
    let Err(DataTreeError::Validation(err)) = m.ready() else {
        panic!("a device without a vendor was accepted");
    };
    assert_eq!(
        err.to_string(),
        "Node /device is missing mandatory descendant /augmentation{model,vendor}/vendor"
    );

    commit(&tree, |m| m.write(&device(), acme()));
    let mut m = tree.take_snapshot().new_modification();
    m.delete(&hardware_path().child("vendor")).unwrap();
    assert!(matches!(
        m.ready(),
        Err(DataTreeError::Validation(ValidationError::MissingMandatory { path, .. })) if path == device()
    ));
}

#[test]
fn unknown_augmentations_are_rejected() {
    let tree = tree();
    let paint = AugmentationId::new(["paint"]);

    let mut m = tree.take_snapshot().new_modification();
    assert!(matches!(
        m.write(
            &device().child(paint.clone()).child("paint"),
            TreeNode::leaf("paint", "red"),
        ),
        Err(DataTreeError::Validation(ValidationError::UnknownAugmentation { found, .. })) if found == paint
    ));

    let with_paint = TreeNode::container(
        "device",
        [
            TreeNode::leaf("name", "edge"),
            TreeNode::augmentation(paint, [TreeNode::leaf("paint", "red")]),
        ],
    );
    assert!(matches!(
        m.write(&device(), with_paint),
        Err(DataTreeError::Validation(ValidationError::UnknownAugmentation { .. }))
    ));
}
