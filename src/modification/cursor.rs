// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::Modification;
use crate::{
    Path, PathArgument, TreeNode,
    error::{Result, UsageError},
};

/// Positional access to a [`Modification`].
///
/// Operations take the argument of a child of the current position rather than a full path.
/// The cursor cannot exit above the position it was opened at.
///
/// ```rust
/// use yangtree::{DataTree, DataTreeConfiguration, Path, PathArgument, Schema, SchemaNode, TreeNode};
///
/// let schema = Schema::new([SchemaNode::container("a")
///     .child(SchemaNode::container("b").child(SchemaNode::leaf("x")))]);
/// let tree = DataTree::new(schema, DataTreeConfiguration::default())?;
/// let mut modification = tree.take_snapshot().new_modification();
///
/// let mut cursor = modification.open_cursor(&Path::root())?;
/// cursor.enter("a")?;
/// cursor.enter("b")?;
/// cursor.write("x", TreeNode::leaf("x", true))?;
/// assert_eq!(cursor.current_path().to_string(), "/a/b");
/// cursor.exit_n(2)?;
/// assert!(cursor.exit().is_err());
/// # Ok::<(), yangtree::DataTreeError>(())
/// ```
pub struct ModificationCursor<'a> {
    modification: &'a mut Modification,
    path: Path,
    depth: usize,
}

impl<'a> ModificationCursor<'a> {
    pub(super) fn new(modification: &'a mut Modification, path: Path) -> Self {
        let depth = path.len();
        Self {
            modification,
            path,
            depth,
        }
    }

    pub fn current_path(&self) -> &Path {
        &self.path
    }

    /// Moves to the child `arg` of the current position, which the schema must allow.
    pub fn enter(&mut self, arg: impl Into<PathArgument>) -> Result<()> {
        self.modification.check_open("enter")?;
        let path = self.path.child(arg);
        self.modification.strategies(&path)?;
        self.path = path;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        self.exit_n(1)
    }

    /// Moves `levels` levels up.
    pub fn exit_n(&mut self, levels: usize) -> Result<()> {
        if self.path.len() < self.depth + levels {
            return Err(UsageError::CursorUnderflow {
                path: self.path.clone(),
                levels,
            }
            .into());
        }
        for _ in 0..levels {
            self.path.pop();
        }
        Ok(())
    }

    pub fn write(&mut self, arg: impl Into<PathArgument>, data: TreeNode) -> Result<()> {
        self.modification.write(&self.path.child(arg), data)
    }

    pub fn merge(&mut self, arg: impl Into<PathArgument>, data: TreeNode) -> Result<()> {
        self.modification.merge(&self.path.child(arg), data)
    }

    pub fn delete(&mut self, arg: impl Into<PathArgument>) -> Result<()> {
        self.modification.delete(&self.path.child(arg))
    }

    /// Replaces the node at the current position.
    pub(crate) fn write_here(&mut self, data: TreeNode) -> Result<()> {
        self.modification.write(&self.path, data)
    }

    pub(crate) fn delete_here(&mut self) -> Result<()> {
        self.modification.delete(&self.path)
    }
}
