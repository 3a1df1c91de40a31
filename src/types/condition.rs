use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

/// Comparison operators supported by leaf conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    pub const ALL: [CompareOp; 9] = [
        CompareOp::Equals,
        CompareOp::NotEquals,
        CompareOp::GreaterThan,
        CompareOp::GreaterThanOrEqual,
        CompareOp::LessThan,
        CompareOp::LessThanOrEqual,
        CompareOp::Contains,
        CompareOp::StartsWith,
        CompareOp::EndsWith,
    ];

    /// The token used for this operator in DSL text.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equals => "==",
            CompareOp::NotEquals => "!=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEqual => ">=",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEqual => "<=",
            CompareOp::Contains => "contains",
            CompareOp::StartsWith => "startsWith",
            CompareOp::EndsWith => "endsWith",
        }
    }

    /// Operators that only make sense on ordered values.
    #[must_use]
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOp::GreaterThan
                | CompareOp::GreaterThanOrEqual
                | CompareOp::LessThan
                | CompareOp::LessThanOrEqual
        )
    }

    /// Operators that only make sense on strings and collections.
    #[must_use]
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How the right-hand side of a condition is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    #[default]
    Literal,
    /// The value is a string naming another field.
    FieldReference,
}

/// A leaf predicate: `field operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field: String,
    pub operator: CompareOp,
    pub value: Value,
    #[serde(default)]
    pub value_type: ValueType,
}

impl Condition {
    #[must_use]
    pub fn literal(field: impl Into<String>, operator: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            value_type: ValueType::Literal,
        }
    }

    #[must_use]
    pub fn field_ref(
        field: impl Into<String>,
        operator: CompareOp,
        other: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Value::String(other.into()),
            value_type: ValueType::FieldReference,
        }
    }
}
