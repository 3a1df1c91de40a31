use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::CompareOp;

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Array,
    Object,
}

impl FieldType {
    /// Operators that make sense for values of this type when the schema does
    /// not list them explicitly.
    #[must_use]
    pub fn default_operators(self) -> Vec<CompareOp> {
        fn matching(keep: fn(CompareOp) -> bool) -> Vec<CompareOp> {
            CompareOp::ALL.into_iter().filter(|op| keep(*op)).collect()
        }
        match self {
            FieldType::String => matching(|op| !op.is_ordering()),
            FieldType::Number | FieldType::Date => matching(|op| !op.is_textual()),
            FieldType::Boolean | FieldType::Object => {
                vec![CompareOp::Equals, CompareOp::NotEquals]
            }
            FieldType::Array => vec![CompareOp::Contains],
        }
    }
}

/// What the schema knows about one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    pub field_type: FieldType,
    /// Explicitly allowed operators; `None` means the type's defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<CompareOp>>,
}

impl FieldInfo {
    #[must_use]
    pub fn allows(&self, op: CompareOp) -> bool {
        match &self.operators {
            Some(ops) => ops.contains(&op),
            None => self.field_type.default_operators().contains(&op),
        }
    }
}

/// Field lookup used by the linter to flag unknown fields and operators a
/// field does not support. The round-trip engine itself never needs it.
pub trait FieldLookup {
    fn lookup(&self, path: &str) -> Option<FieldInfo>;
}

/// Maps field paths (e.g. `"user.profile.age"`) to their declared type and
/// operator set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSchema {
    fields: HashMap<String, FieldInfo>,
}

impl FieldSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field using its type's default operators.
    #[must_use]
    pub fn field(mut self, path: &str, field_type: FieldType) -> Self {
        self.fields.insert(
            path.to_owned(),
            FieldInfo {
                field_type,
                operators: None,
            },
        );
        self
    }

    /// Declare a field with an explicit operator set.
    #[must_use]
    pub fn field_with_operators(
        mut self,
        path: &str,
        field_type: FieldType,
        operators: Vec<CompareOp>,
    ) -> Self {
        self.fields.insert(
            path.to_owned(),
            FieldInfo {
                field_type,
                operators: Some(operators),
            },
        );
        self
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FieldInfo> {
        self.fields.get(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldInfo)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FieldLookup for FieldSchema {
    fn lookup(&self, path: &str) -> Option<FieldInfo> {
        self.fields.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_and_get() {
        let schema = FieldSchema::new().field("user.age", FieldType::Number);
        assert_eq!(schema.get("user.age").unwrap().field_type, FieldType::Number);
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn redeclare_overwrites() {
        let schema = FieldSchema::new()
            .field("x", FieldType::Number)
            .field("x", FieldType::String);
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("x").unwrap().field_type, FieldType::String);
    }

    #[test]
    fn default_operators_by_type() {
        let schema = FieldSchema::new()
            .field("age", FieldType::Number)
            .field("active", FieldType::Boolean);
        let age = schema.lookup("age").unwrap();
        assert!(age.allows(CompareOp::GreaterThan));
        assert!(!age.allows(CompareOp::Contains));
        let active = schema.lookup("active").unwrap();
        assert!(active.allows(CompareOp::Equals));
        assert!(!active.allows(CompareOp::LessThan));
    }

    #[test]
    fn default_operator_sets() {
        assert_eq!(
            FieldType::String.default_operators(),
            vec![
                CompareOp::Equals,
                CompareOp::NotEquals,
                CompareOp::Contains,
                CompareOp::StartsWith,
                CompareOp::EndsWith,
            ]
        );
        assert_eq!(
            FieldType::Date.default_operators(),
            vec![
                CompareOp::Equals,
                CompareOp::NotEquals,
                CompareOp::GreaterThan,
                CompareOp::GreaterThanOrEqual,
                CompareOp::LessThan,
                CompareOp::LessThanOrEqual,
            ]
        );
    }

    #[test]
    fn explicit_operators_override_defaults() {
        let schema = FieldSchema::new().field_with_operators(
            "status",
            FieldType::String,
            vec![CompareOp::Equals],
        );
        let status = schema.lookup("status").unwrap();
        assert!(status.allows(CompareOp::Equals));
        assert!(!status.allows(CompareOp::Contains));
    }

    #[test]
    fn missing_returns_none() {
        let schema = FieldSchema::new();
        assert!(schema.lookup("nonexistent").is_none());
        assert!(schema.is_empty());
    }
}
