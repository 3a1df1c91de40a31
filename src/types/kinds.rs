//! Small closed enums shared by rule nodes and specifications.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Value, ValueType};

/// Boolean combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoolOp {
    And,
    Or,
    Not,
    Xor,
    Implies,
}

impl BoolOp {
    pub const ALL: [BoolOp; 5] = [
        BoolOp::And,
        BoolOp::Or,
        BoolOp::Not,
        BoolOp::Xor,
        BoolOp::Implies,
    ];

    /// The DSL keyword for this combinator.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
            BoolOp::Not => "NOT",
            BoolOp::Xor => "XOR",
            BoolOp::Implies => "IMPLIES",
        }
    }

    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.keyword().eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Validators that apply to a target field when a condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionalKind {
    RequiredIf,
    VisibleIf,
    DisabledIf,
    ReadonlyIf,
}

impl ConditionalKind {
    pub const ALL: [ConditionalKind; 4] = [
        ConditionalKind::RequiredIf,
        ConditionalKind::VisibleIf,
        ConditionalKind::DisabledIf,
        ConditionalKind::ReadonlyIf,
    ];

    #[must_use]
    pub fn call_name(self) -> &'static str {
        match self {
            ConditionalKind::RequiredIf => "requiredIf",
            ConditionalKind::VisibleIf => "visibleIf",
            ConditionalKind::DisabledIf => "disabledIf",
            ConditionalKind::ReadonlyIf => "readonlyIf",
        }
    }
}

/// Which side of a collection length constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LengthBound {
    Min,
    Max,
}

impl LengthBound {
    #[must_use]
    pub fn call_name(self) -> &'static str {
        match self {
            LengthBound::Min => "minLength",
            LengthBound::Max => "maxLength",
        }
    }
}

/// Guards that only evaluate their inner condition when a field is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionalKind {
    IfDefined,
    IfNotNull,
    IfExists,
}

impl OptionalKind {
    pub const ALL: [OptionalKind; 3] = [
        OptionalKind::IfDefined,
        OptionalKind::IfNotNull,
        OptionalKind::IfExists,
    ];

    #[must_use]
    pub fn call_name(self) -> &'static str {
        match self {
            OptionalKind::IfDefined => "ifDefined",
            OptionalKind::IfNotNull => "ifNotNull",
            OptionalKind::IfExists => "ifExists",
        }
    }
}

/// Counting combinators over a list of conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardinalityKind {
    AtLeast,
    Exactly,
}

impl CardinalityKind {
    #[must_use]
    pub fn call_name(self) -> &'static str {
        match self {
            CardinalityKind::AtLeast => "atLeast",
            CardinalityKind::Exactly => "exactly",
        }
    }
}

/// A function-call argument: a literal, or a reference to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub value: Value,
    #[serde(default)]
    pub kind: ValueType,
}

impl Argument {
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            kind: ValueType::Literal,
        }
    }

    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            value: Value::String(name.into()),
            kind: ValueType::FieldReference,
        }
    }
}

/// Call names that the DSL reserves for structural shapes. A plain function
/// call may not use any of them.
pub const RESERVED_CALLS: &[&str] = &[
    "requiredIf",
    "visibleIf",
    "disabledIf",
    "readonlyIf",
    "forEach",
    "uniqueBy",
    "minLength",
    "maxLength",
    "ifDefined",
    "ifNotNull",
    "ifExists",
    "withDefault",
    "atLeast",
    "exactly",
    "contextual",
    "template",
    "expression",
    "custom",
];

#[must_use]
pub fn is_reserved_call(name: &str) -> bool {
    RESERVED_CALLS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_round_trip() {
        for op in BoolOp::ALL {
            assert_eq!(BoolOp::from_keyword(op.keyword()), Some(op));
        }
        assert_eq!(BoolOp::from_keyword("and"), Some(BoolOp::And));
        assert_eq!(BoolOp::from_keyword("NAND"), None);
    }

    #[test]
    fn call_names_are_reserved() {
        for kind in ConditionalKind::ALL {
            assert!(is_reserved_call(kind.call_name()));
        }
        for kind in OptionalKind::ALL {
            assert!(is_reserved_call(kind.call_name()));
        }
        assert!(is_reserved_call(LengthBound::Min.call_name()));
        assert!(is_reserved_call(CardinalityKind::Exactly.call_name()));
        assert!(!is_reserved_call("isEmail"));
    }
}
