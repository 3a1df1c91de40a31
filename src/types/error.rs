use thiserror::Error;

use super::NodeType;

/// Failures translating between rule nodes and specifications.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("node '{node}' ({node_type}) is missing required field '{field}'")]
    MissingField {
        node: String,
        node_type: NodeType,
        field: &'static str,
    },

    #[error("node '{node}' ({node_type}) expects {expected} child, found {actual}")]
    ChildCount {
        node: String,
        node_type: NodeType,
        expected: usize,
        actual: usize,
    },

    #[error("child '{child}' of node '{node}' is not embedded; build the complete tree first")]
    UnresolvedChild { node: String, child: String },

    #[error("function name '{name}' is reserved by the DSL")]
    ReservedFunctionName { name: String },

    #[error("specification has an empty {what}")]
    EmptyName { what: &'static str },

    #[error("field reference must be a field name, found {value}")]
    InvalidReference { value: String },

    #[error("tree is {depth} levels deep, more than the limit of {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// Failures rendering a specification as DSL text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("cannot render non-finite number {value} as a DSL literal")]
    NonFiniteNumber { value: f64 },

    #[error("'{name}' is not a valid {what} identifier")]
    InvalidIdentifier { name: String, what: &'static str },

    #[error("cannot encode metadata comment: {reason}")]
    Metadata { reason: String },

    #[error("specification is {depth} levels deep, more than the limit of {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// Problems with the shape of a flat node map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("node '{0}' does not exist")]
    UnknownNode(String),

    #[error("node '{parent}' lists child '{child}' which does not exist")]
    DanglingChild { parent: String, child: String },

    #[error("node '{node}' names parent '{parent}' which does not exist")]
    DanglingParent { node: String, parent: String },

    #[error("node '{node}' names parent '{parent}' which does not list it as a child")]
    ParentMismatch { node: String, parent: String },

    #[error("node '{parent}' lists child '{child}' which does not name it as parent")]
    UnclaimedChild { parent: String, child: String },

    #[error("node '{0}' is neither a root nor listed as a child")]
    Orphan(String),

    #[error("node '{0}' is referenced more than once")]
    DuplicateReference(String),

    #[error("cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("node '{node}' is nested more than {limit} levels deep")]
    TooDeep { node: String, limit: usize },

    #[error("root node '{node}' names parent '{parent}'")]
    RootWithParent { node: String, parent: String },
}

impl StructuralError {
    /// The node the problem is reported against.
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        match self {
            StructuralError::UnknownNode(id)
            | StructuralError::Orphan(id)
            | StructuralError::DuplicateReference(id) => Some(id),
            StructuralError::DanglingChild { parent, .. }
            | StructuralError::UnclaimedChild { parent, .. } => Some(parent),
            StructuralError::DanglingParent { node, .. }
            | StructuralError::ParentMismatch { node, .. }
            | StructuralError::RootWithParent { node, .. }
            | StructuralError::TooDeep { node, .. } => Some(node),
            StructuralError::Cycle { path } => path.first().map(String::as_str),
        }
    }
}
