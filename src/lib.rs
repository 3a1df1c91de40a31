mod bridge;
mod editor;
mod error;
mod export;
mod lint;
mod parse;
mod roundtrip;
mod types;

pub use bridge::{export_node, import_dsl, to_rule_node, to_specification};
pub use editor::history::{History, Snapshot};
pub use editor::structure::check_structure;
pub use editor::{
    EditorConfig, EditorError, EditorEvent, Format, ImportError, ImportOptions, NewNode,
    NodePatch, Phase, RuleEditor, SubscriptionId, ViewMode,
};
pub use error::RulespecError;
pub use export::{export, CommentPosition, ExportOptions};
pub use lint::{
    apply_fixes, DslLinter, Fix, LintCategory, LintConfig, LintDiagnostic, LintRule, TextEdit,
};
pub use parse::{parse, ParseError};
pub use roundtrip::{RoundTripOptions, RoundTripValidator};
pub use types::{
    build_complete_tree, field, flatten, is_reserved_call, Argument, BoolOp, BridgeError,
    CardinalityKind, ChildEntry, CodecError, CompareOp, Condition, ConditionalKind, ErrorCode,
    Expectation, FieldExpr, FieldInfo, FieldLookup, FieldSchema, FieldType, LengthBound,
    Location, NodeConfig, NodeMap, NodeMetadata, NodeType, OptionalKind, RoundTripResult,
    RoundTripTestCase, RuleNode, Severity, SpecKind, Specification, Stage, StageResult,
    StructuralError, TestCaseOutcome, TestSuiteReport, ValidationError, Value, ValueType,
    MAX_NESTING_DEPTH, RESERVED_CALLS,
};
