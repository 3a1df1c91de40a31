mod condition;
mod diagnostic;
mod error;
mod kinds;
mod node;
mod report;
mod schema;
mod spec;
mod tree;
mod value;

pub use condition::{CompareOp, Condition, ValueType};
pub use diagnostic::{ErrorCode, Location, ValidationError};
pub use error::{BridgeError, CodecError, StructuralError};
pub use kinds::{
    is_reserved_call, Argument, BoolOp, CardinalityKind, ConditionalKind, LengthBound,
    OptionalKind, RESERVED_CALLS,
};
pub use node::{ChildEntry, NodeConfig, NodeMetadata, NodeType, RuleNode, Severity};
pub use report::{
    Expectation, RoundTripResult, RoundTripTestCase, Stage, StageResult, TestCaseOutcome,
    TestSuiteReport,
};
pub use schema::{FieldInfo, FieldLookup, FieldSchema, FieldType};
pub use spec::{field, FieldExpr, SpecKind, Specification, MAX_NESTING_DEPTH};
pub use tree::{build_complete_tree, flatten, NodeMap};
pub use value::Value;

pub(crate) use tree::{flatten_into, subtree_ids};
pub(crate) use value::write_quoted;
