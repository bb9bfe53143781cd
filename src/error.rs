// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The errors a data tree can report.
//!
//! Errors fall into four kinds, one type each:
//!
//! - [`UsageError`]: the API was used out of order or with inconsistent arguments. These are bugs
//!   in the calling code.
//! - [`ValidationError`]: the data would violate the schema. Deterministic given the same data.
//! - [`ConflictError`]: another transaction committed an overlapping change since the snapshot a
//!   modification was built against.
//! - [`DefunctError`]: a modification failed unexpectedly and can no longer be used.
//!
//! Nothing is retried internally. A caller seeing a [`ConflictError`] is expected to take a new
//! snapshot and rebuild its modification.
use crate::{AugmentationId, NodeKind, Path, PathArgument, QName, Value};
use std::{fmt, sync::Arc};
use thiserror::Error;

pub type Result<T, E = DataTreeError> = std::result::Result<T, E>;

/// Any error returned by a data tree operation.
#[derive(Debug, Clone, Error)]
pub enum DataTreeError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Defunct(#[from] DefunctError),
}

impl DataTreeError {
    /// The protocol-level error tag, as used by NETCONF and RESTCONF.
    pub fn error_tag(&self) -> &'static str {
        match self {
            DataTreeError::Usage(_) | DataTreeError::Defunct(_) => "operation-failed",
            DataTreeError::Validation(e) => e.error_tag(),
            DataTreeError::Conflict(e) => e.error_tag(),
        }
    }
}

/// Misuse of the API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UsageError {
    #[error("{operation} requires a ready modification")]
    NotReady { operation: &'static str },

    #[error("modification is sealed, {operation} is no longer allowed")]
    Sealed { operation: &'static str },

    #[error("path {path} is outside of the tree rooted at {root}")]
    OutsideRoot { path: Path, root: Path },

    #[error("root path {path} does not exist in the schema")]
    InvalidRootPath { path: Path },

    #[error("root path {path} addresses a {kind:?}, which cannot root a data tree")]
    UnsupportedRootPath { path: Path, kind: NodeKind },

    #[error("cursor is already at {path}, cannot exit {levels} more level(s)")]
    CursorUnderflow { path: Path, levels: usize },

    #[error("candidate was prepared against a root which is no longer current")]
    StaleCandidate,

    #[error("candidate was not prepared by a data tree and cannot be committed")]
    NotCommittable,

    #[error("candidate is rooted at {candidate}, but the tree is rooted at {tree}")]
    RootPathMismatch { candidate: Path, tree: Path },

    #[error("cannot aggregate an empty sequence of candidates")]
    EmptyAggregate,

    #[error("candidates do not form a chain at {path}: {reason}")]
    InconsistentCandidates { path: Path, reason: &'static str },
}

/// The data would violate the schema.
///
/// Every variant carries the path of the node at which the violation was detected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Child {path} is not present in schema tree")]
    UnknownElement { path: Path },

    #[error("{path}: expected a {expected:?} node, found a {found:?}")]
    WrongKind {
        path: Path,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("{path}: data is identified as {found}, which does not match the path")]
    IdentifierMismatch { path: Path, found: PathArgument },

    #[error("{path}: list entry is missing key leaf {key}")]
    MissingKeyLeaf { path: Path, key: QName },

    #[error("{path}: key leaf {key} holds {found:?}, but the entry is keyed by {expected:?}")]
    KeyLeafMismatch {
        path: Path,
        key: QName,
        expected: Value,
        found: Value,
    },

    #[error("Node {path} is missing mandatory descendant {missing}")]
    MissingMandatory { path: Path, missing: Path },

    #[error("Node {path} is missing mandatory choice {choice}")]
    MissingChoice { path: Path, choice: QName },

    #[error("{path}: too many elements ({count}), can have at most {max}")]
    TooManyElements { path: Path, count: usize, max: u32 },

    #[error("{path}: too few elements ({count}), needs at least {min}")]
    TooFewElements { path: Path, count: usize, min: u32 },

    #[error("{path}: {}", unique_message(.leaves, .values, .entry, .other))]
    NotUnique {
        path: Path,
        leaves: Vec<Path>,
        values: Vec<Value>,
        entry: PathArgument,
        other: PathArgument,
    },

    #[error(
        "Child {child} (from case {case}) implies non-presence of child {other_child} \
         (from case {other_case}), which is present"
    )]
    CaseConflict {
        path: Path,
        child: Path,
        case: QName,
        other_child: Path,
        other_case: QName,
    },

    #[error("Node {path} does not exist. Cannot apply modification to its children.")]
    NodeDoesNotExist { path: Path },

    #[error("{path}: augmentation {found:?} is not allowed here")]
    UnknownAugmentation { path: Path, found: AugmentationId },
}

fn unique_message(
    leaves: &[Path],
    values: &[Value],
    entry: &PathArgument,
    other: &PathArgument,
) -> String {
    let mut message = format!("entry {entry} violates unique constraint on");
    for (leaf, value) in leaves.iter().zip(values) {
        message.push_str(&format!(" {leaf}={value}"));
    }
    message.push_str(&format!(", values are already used by entry {other}"));
    message
}

impl ValidationError {
    pub fn path(&self) -> &Path {
        match self {
            ValidationError::UnknownElement { path }
            | ValidationError::WrongKind { path, .. }
            | ValidationError::IdentifierMismatch { path, .. }
            | ValidationError::MissingKeyLeaf { path, .. }
            | ValidationError::KeyLeafMismatch { path, .. }
            | ValidationError::MissingMandatory { path, .. }
            | ValidationError::MissingChoice { path, .. }
            | ValidationError::TooManyElements { path, .. }
            | ValidationError::TooFewElements { path, .. }
            | ValidationError::NotUnique { path, .. }
            | ValidationError::CaseConflict { path, .. }
            | ValidationError::NodeDoesNotExist { path }
            | ValidationError::UnknownAugmentation { path, .. } => path,
        }
    }

    /// The protocol-level error tag (RFC 6241 appendix A).
    pub fn error_tag(&self) -> &'static str {
        match self {
            ValidationError::UnknownElement { .. } | ValidationError::UnknownAugmentation { .. } => {
                "unknown-element"
            }
            ValidationError::WrongKind { .. }
            | ValidationError::IdentifierMismatch { .. }
            | ValidationError::CaseConflict { .. } => "bad-element",
            ValidationError::KeyLeafMismatch { .. } => "invalid-value",
            ValidationError::MissingKeyLeaf { .. }
            | ValidationError::MissingMandatory { .. }
            | ValidationError::MissingChoice { .. }
            | ValidationError::NodeDoesNotExist { .. } => "data-missing",
            ValidationError::TooManyElements { .. }
            | ValidationError::TooFewElements { .. }
            | ValidationError::NotUnique { .. } => "operation-failed",
        }
    }

    /// The application-specific error tag (RFC 7950 section 15), if one is defined.
    pub fn error_app_tag(&self) -> Option<&'static str> {
        match self {
            ValidationError::TooManyElements { .. } => Some("too-many-elements"),
            ValidationError::TooFewElements { .. } => Some("too-few-elements"),
            ValidationError::NotUnique { .. } => Some("data-not-unique"),
            ValidationError::MissingChoice { .. } => Some("missing-choice"),
            _ => None,
        }
    }
}

/// Why a node is in conflict with a concurrently committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    Replaced,
    ChildrenModified,
    Deleted,
    Created,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictReason::Replaced => "Node was replaced by other transaction.",
            ConflictReason::ChildrenModified => "Node children was modified by other transaction.",
            ConflictReason::Deleted => "Node was deleted by other transaction.",
            ConflictReason::Created => "Node was created by other transaction.",
        })
    }
}

/// Another transaction committed an overlapping change.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConflictError {
    #[error("Node {path} does not exist. {action}")]
    NodeDoesNotExist { path: Path, action: &'static str },

    #[error("Conflicting modification at {path}: {reason}")]
    ConflictingModification { path: Path, reason: ConflictReason },
}

impl ConflictError {
    pub fn path(&self) -> &Path {
        match self {
            ConflictError::NodeDoesNotExist { path, .. }
            | ConflictError::ConflictingModification { path, .. } => path,
        }
    }

    pub fn error_tag(&self) -> &'static str {
        match self {
            ConflictError::NodeDoesNotExist { .. } => "data-missing",
            ConflictError::ConflictingModification {
                reason: ConflictReason::Created,
                ..
            } => "data-exists",
            ConflictError::ConflictingModification { .. } => "in-use",
        }
    }
}

/// A modification failed unexpectedly and has been taken out of service.
///
/// Every later operation on the modification returns a clone of this error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("modification is defunct: failed on thread {thread} with: {cause}")]
pub struct DefunctError {
    cause: Arc<str>,
    thread: Arc<str>,
}

impl DefunctError {
    /// Captures a panic payload together with the identity of the current thread.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let cause: Arc<str> = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Arc::from(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Arc::from(s.as_str())
        } else {
            Arc::from("unknown panic payload")
        };
        let current = std::thread::current();
        let thread = match current.name() {
            Some(name) => format!("{name} ({:?})", current.id()),
            None => format!("{:?}", current.id()),
        };
        Self {
            cause,
            thread: Arc::from(thread),
        }
    }

    /// The message of the original failure.
    pub fn cause(&self) -> &str {
        &self.cause
    }

    /// Name and id of the thread on which the failure happened.
    pub fn thread(&self) -> &str {
        &self.thread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn element_count_messages() {
        let err = ValidationError::TooManyElements {
            path: Path::root().child("top").child("ll"),
            count: 4,
            max: 3,
        };
        assert_snapshot!(err, @"/top/ll: too many elements (4), can have at most 3");
        assert_eq!(err.error_tag(), "operation-failed");
        assert_eq!(err.error_app_tag(), Some("too-many-elements"));

        let err = ValidationError::TooFewElements {
            path: Path::root().child("ll"),
            count: 0,
            min: 1,
        };
        assert_snapshot!(err, @"/ll: too few elements (0), needs at least 1");
        assert_eq!(err.error_app_tag(), Some("too-few-elements"));
    }

    #[test]
    fn unique_message_names_leaves_values_and_entries() {
        let err = ValidationError::NotUnique {
            path: Path::root().child("l"),
            leaves: vec![Path::root().child("k1"), Path::root().child("k2")],
            values: vec![Value::from("a"), Value::from("b")],
            entry: PathArgument::entry("l", [("id", 2u64)]),
            other: PathArgument::entry("l", [("id", 1u64)]),
        };
        assert_snapshot!(err, @"/l: entry l[id=2] violates unique constraint on /k1=a /k2=b, values are already used by entry l[id=1]");
        assert_eq!(err.error_app_tag(), Some("data-not-unique"));
    }

    #[test]
    fn conflict_messages() {
        let err = ConflictError::ConflictingModification {
            path: Path::root().child("c"),
            reason: ConflictReason::Replaced,
        };
        assert_snapshot!(err, @"Conflicting modification at /c: Node was replaced by other transaction.");
        assert_eq!(err.error_tag(), "in-use");
        let err = DataTreeError::from(ConflictError::ConflictingModification {
            path: Path::root(),
            reason: ConflictReason::Created,
        });
        assert_eq!(err.error_tag(), "data-exists");
    }

    #[test]
    fn defunct_error_captures_panic_payload() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 42)).unwrap_err();
        let err = DefunctError::from_panic(payload.as_ref());
        assert_eq!(err.cause(), "boom 42");
        assert!(!err.thread().is_empty());
    }
}
