use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::kinds::{
    Argument, BoolOp, CardinalityKind, ConditionalKind, LengthBound, OptionalKind,
};
use super::{CompareOp, Value};

/// Diagnostic severity, shared by node metadata, validation errors and lint
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Diagnostic information a rule author attaches to a node. Carried through
/// every translation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl NodeMetadata {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
            severity: Some(severity),
        }
    }
}

/// The closed set of rule node type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    FieldCondition,
    AndGroup,
    OrGroup,
    NotGroup,
    XorGroup,
    ImpliesGroup,
    RequiredIf,
    VisibleIf,
    DisabledIf,
    ReadonlyIf,
    ForEach,
    UniqueBy,
    MinLength,
    MaxLength,
    IfDefined,
    IfNotNull,
    IfExists,
    WithDefault,
    FunctionCall,
    FieldToField,
    Contextual,
    AtLeast,
    Exactly,
    Expression,
    ContextualTemplate,
    Custom,
}

impl NodeType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::FieldCondition => "fieldCondition",
            NodeType::AndGroup => "andGroup",
            NodeType::OrGroup => "orGroup",
            NodeType::NotGroup => "notGroup",
            NodeType::XorGroup => "xorGroup",
            NodeType::ImpliesGroup => "impliesGroup",
            NodeType::RequiredIf => "requiredIf",
            NodeType::VisibleIf => "visibleIf",
            NodeType::DisabledIf => "disabledIf",
            NodeType::ReadonlyIf => "readonlyIf",
            NodeType::ForEach => "forEach",
            NodeType::UniqueBy => "uniqueBy",
            NodeType::MinLength => "minLength",
            NodeType::MaxLength => "maxLength",
            NodeType::IfDefined => "ifDefined",
            NodeType::IfNotNull => "ifNotNull",
            NodeType::IfExists => "ifExists",
            NodeType::WithDefault => "withDefault",
            NodeType::FunctionCall => "functionCall",
            NodeType::FieldToField => "fieldToField",
            NodeType::Contextual => "contextual",
            NodeType::AtLeast => "atLeast",
            NodeType::Exactly => "exactly",
            NodeType::Expression => "expression",
            NodeType::ContextualTemplate => "contextualTemplate",
            NodeType::Custom => "custom",
        }
    }

    /// Label given to new nodes that arrive without one.
    #[must_use]
    pub fn default_label(self) -> &'static str {
        match self {
            NodeType::FieldCondition => "Field Condition",
            NodeType::AndGroup => "AND Group",
            NodeType::OrGroup => "OR Group",
            NodeType::NotGroup => "NOT Group",
            NodeType::XorGroup => "XOR Group",
            NodeType::ImpliesGroup => "IMPLIES Group",
            NodeType::RequiredIf => "Required If",
            NodeType::VisibleIf => "Visible If",
            NodeType::DisabledIf => "Disabled If",
            NodeType::ReadonlyIf => "Readonly If",
            NodeType::ForEach => "For Each",
            NodeType::UniqueBy => "Unique By",
            NodeType::MinLength => "Min Length",
            NodeType::MaxLength => "Max Length",
            NodeType::IfDefined => "If Defined",
            NodeType::IfNotNull => "If Not Null",
            NodeType::IfExists => "If Exists",
            NodeType::WithDefault => "With Default",
            NodeType::FunctionCall => "Function Call",
            NodeType::FieldToField => "Field Comparison",
            NodeType::Contextual => "Contextual",
            NodeType::AtLeast => "At Least",
            NodeType::Exactly => "Exactly",
            NodeType::Expression => "Expression",
            NodeType::ContextualTemplate => "Contextual Template",
            NodeType::Custom => "Custom",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific configuration of a rule node. The variant determines the
/// node's [`NodeType`].
///
/// Fields the bridge needs are optional here so that partially configured
/// nodes can live in the editor; translation reports what is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeConfig {
    #[serde(rename_all = "camelCase")]
    FieldCondition {
        field: Option<String>,
        operator: Option<CompareOp>,
        value: Option<Value>,
    },
    Group {
        operator: BoolOp,
    },
    #[serde(rename_all = "camelCase")]
    Conditional {
        conditional: ConditionalKind,
        target_field: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ForEach {
        array_field: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    UniqueBy {
        array_field: Option<String>,
        key: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Length {
        bound: LengthBound,
        array_field: Option<String>,
        length: Option<u64>,
    },
    Optional {
        guard: OptionalKind,
        field: Option<String>,
    },
    WithDefault {
        field: Option<String>,
        default: Option<Value>,
    },
    FunctionCall {
        name: Option<String>,
        #[serde(default)]
        args: Vec<Argument>,
    },
    FieldToField {
        left: Option<String>,
        operator: Option<CompareOp>,
        right: Option<String>,
    },
    Contextual {
        template: Option<String>,
    },
    Cardinality {
        cardinality: CardinalityKind,
        count: Option<u32>,
    },
    Expression {
        expression: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ContextualTemplate {
        template_id: Option<String>,
        #[serde(default)]
        params: BTreeMap<String, Value>,
    },
    Custom {
        name: Option<String>,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl NodeConfig {
    /// An unconfigured payload for the given type.
    #[must_use]
    pub fn empty(node_type: NodeType) -> Self {
        match node_type {
            NodeType::FieldCondition => NodeConfig::FieldCondition {
                field: None,
                operator: None,
                value: None,
            },
            NodeType::AndGroup => NodeConfig::Group { operator: BoolOp::And },
            NodeType::OrGroup => NodeConfig::Group { operator: BoolOp::Or },
            NodeType::NotGroup => NodeConfig::Group { operator: BoolOp::Not },
            NodeType::XorGroup => NodeConfig::Group { operator: BoolOp::Xor },
            NodeType::ImpliesGroup => NodeConfig::Group {
                operator: BoolOp::Implies,
            },
            NodeType::RequiredIf => conditional(ConditionalKind::RequiredIf),
            NodeType::VisibleIf => conditional(ConditionalKind::VisibleIf),
            NodeType::DisabledIf => conditional(ConditionalKind::DisabledIf),
            NodeType::ReadonlyIf => conditional(ConditionalKind::ReadonlyIf),
            NodeType::ForEach => NodeConfig::ForEach { array_field: None },
            NodeType::UniqueBy => NodeConfig::UniqueBy {
                array_field: None,
                key: None,
            },
            NodeType::MinLength => length(LengthBound::Min),
            NodeType::MaxLength => length(LengthBound::Max),
            NodeType::IfDefined => optional(OptionalKind::IfDefined),
            NodeType::IfNotNull => optional(OptionalKind::IfNotNull),
            NodeType::IfExists => optional(OptionalKind::IfExists),
            NodeType::WithDefault => NodeConfig::WithDefault {
                field: None,
                default: None,
            },
            NodeType::FunctionCall => NodeConfig::FunctionCall {
                name: None,
                args: Vec::new(),
            },
            NodeType::FieldToField => NodeConfig::FieldToField {
                left: None,
                operator: None,
                right: None,
            },
            NodeType::Contextual => NodeConfig::Contextual { template: None },
            NodeType::AtLeast => cardinality(CardinalityKind::AtLeast),
            NodeType::Exactly => cardinality(CardinalityKind::Exactly),
            NodeType::Expression => NodeConfig::Expression { expression: None },
            NodeType::ContextualTemplate => NodeConfig::ContextualTemplate {
                template_id: None,
                params: BTreeMap::new(),
            },
            NodeType::Custom => NodeConfig::Custom {
                name: None,
                payload: serde_json::Value::Null,
            },
        }
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeConfig::FieldCondition { .. } => NodeType::FieldCondition,
            NodeConfig::Group { operator } => match operator {
                BoolOp::And => NodeType::AndGroup,
                BoolOp::Or => NodeType::OrGroup,
                BoolOp::Not => NodeType::NotGroup,
                BoolOp::Xor => NodeType::XorGroup,
                BoolOp::Implies => NodeType::ImpliesGroup,
            },
            NodeConfig::Conditional { conditional, .. } => match conditional {
                ConditionalKind::RequiredIf => NodeType::RequiredIf,
                ConditionalKind::VisibleIf => NodeType::VisibleIf,
                ConditionalKind::DisabledIf => NodeType::DisabledIf,
                ConditionalKind::ReadonlyIf => NodeType::ReadonlyIf,
            },
            NodeConfig::ForEach { .. } => NodeType::ForEach,
            NodeConfig::UniqueBy { .. } => NodeType::UniqueBy,
            NodeConfig::Length { bound, .. } => match bound {
                LengthBound::Min => NodeType::MinLength,
                LengthBound::Max => NodeType::MaxLength,
            },
            NodeConfig::Optional { guard, .. } => match guard {
                OptionalKind::IfDefined => NodeType::IfDefined,
                OptionalKind::IfNotNull => NodeType::IfNotNull,
                OptionalKind::IfExists => NodeType::IfExists,
            },
            NodeConfig::WithDefault { .. } => NodeType::WithDefault,
            NodeConfig::FunctionCall { .. } => NodeType::FunctionCall,
            NodeConfig::FieldToField { .. } => NodeType::FieldToField,
            NodeConfig::Contextual { .. } => NodeType::Contextual,
            NodeConfig::Cardinality { cardinality, .. } => match cardinality {
                CardinalityKind::AtLeast => NodeType::AtLeast,
                CardinalityKind::Exactly => NodeType::Exactly,
            },
            NodeConfig::Expression { .. } => NodeType::Expression,
            NodeConfig::ContextualTemplate { .. } => NodeType::ContextualTemplate,
            NodeConfig::Custom { .. } => NodeType::Custom,
        }
    }

    /// How many children a node of this configuration accepts: `Some(n)` for
    /// a fixed count, `None` for any number.
    #[must_use]
    pub fn child_arity(&self) -> Option<usize> {
        match self {
            NodeConfig::Group { .. } | NodeConfig::Cardinality { .. } => None,
            NodeConfig::Conditional { .. }
            | NodeConfig::ForEach { .. }
            | NodeConfig::Optional { .. }
            | NodeConfig::WithDefault { .. } => Some(1),
            NodeConfig::FieldCondition { .. }
            | NodeConfig::UniqueBy { .. }
            | NodeConfig::Length { .. }
            | NodeConfig::FunctionCall { .. }
            | NodeConfig::FieldToField { .. }
            | NodeConfig::Contextual { .. }
            | NodeConfig::Expression { .. }
            | NodeConfig::ContextualTemplate { .. }
            | NodeConfig::Custom { .. } => Some(0),
        }
    }

    /// Required payload fields that are absent or empty, by their serialized
    /// names.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        fn text(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|s| !s.is_empty())
        }
        let checks: Vec<(&'static str, bool)> = match self {
            NodeConfig::FieldCondition {
                field,
                operator,
                value,
            } => vec![
                ("field", text(field)),
                ("operator", operator.is_some()),
                ("value", value.is_some()),
            ],
            NodeConfig::FieldToField {
                left,
                operator,
                right,
            } => vec![
                ("left", text(left)),
                ("operator", operator.is_some()),
                ("right", text(right)),
            ],
            NodeConfig::Group { .. } => Vec::new(),
            NodeConfig::Conditional { target_field, .. } => {
                vec![("targetField", text(target_field))]
            }
            NodeConfig::ForEach { array_field } => vec![("arrayField", text(array_field))],
            NodeConfig::UniqueBy { array_field, key } => {
                vec![("arrayField", text(array_field)), ("key", text(key))]
            }
            NodeConfig::Length {
                array_field,
                length,
                ..
            } => vec![("arrayField", text(array_field)), ("length", length.is_some())],
            NodeConfig::Optional { field, .. } => vec![("field", text(field))],
            NodeConfig::WithDefault { field, default } => {
                vec![("field", text(field)), ("default", default.is_some())]
            }
            NodeConfig::FunctionCall { name, .. } => vec![("name", text(name))],
            NodeConfig::Contextual { template } => vec![("template", text(template))],
            NodeConfig::Cardinality { count, .. } => vec![("count", count.is_some())],
            NodeConfig::Expression { expression } => vec![("expression", text(expression))],
            NodeConfig::ContextualTemplate { template_id, .. } => {
                vec![("templateId", text(template_id))]
            }
            NodeConfig::Custom { name, .. } => vec![("name", text(name))],
        };
        checks
            .into_iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| name)
            .collect()
    }

    /// Convenience constructor for a fully configured field condition.
    #[must_use]
    pub fn field_condition(
        field: impl Into<String>,
        operator: CompareOp,
        value: impl Into<Value>,
    ) -> Self {
        NodeConfig::FieldCondition {
            field: Some(field.into()),
            operator: Some(operator),
            value: Some(value.into()),
        }
    }
}

fn conditional(kind: ConditionalKind) -> NodeConfig {
    NodeConfig::Conditional {
        conditional: kind,
        target_field: None,
    }
}

fn length(bound: LengthBound) -> NodeConfig {
    NodeConfig::Length {
        bound,
        array_field: None,
        length: None,
    }
}

fn optional(guard: OptionalKind) -> NodeConfig {
    NodeConfig::Optional { guard, field: None }
}

fn cardinality(kind: CardinalityKind) -> NodeConfig {
    NodeConfig::Cardinality {
        cardinality: kind,
        count: None,
    }
}

/// One entry of a node's children list: a reference by id (flat form) or the
/// child itself (embedded form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildEntry {
    Id(String),
    Node(Box<RuleNode>),
}

impl ChildEntry {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            ChildEntry::Id(id) => id,
            ChildEntry::Node(node) => &node.id,
        }
    }
}

/// A node in the editable rule tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NodeMetadata>,
    #[serde(default)]
    pub children: Vec<ChildEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub config: NodeConfig,
}

impl RuleNode {
    #[must_use]
    pub fn new(id: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id: id.into(),
            label: None,
            metadata: None,
            children: Vec::new(),
            parent_id: None,
            config,
        }
    }

    /// Append an embedded child, setting its parent id.
    #[must_use]
    pub fn with_child(mut self, mut child: RuleNode) -> Self {
        child.parent_id = Some(self.id.clone());
        self.children.push(ChildEntry::Node(Box::new(child)));
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.config.node_type()
    }

    /// Ids of all direct children, whatever their form.
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(ChildEntry::id)
    }

    /// Embedded children only.
    pub fn embedded_children(&self) -> impl Iterator<Item = &RuleNode> {
        self.children.iter().filter_map(|c| match c {
            ChildEntry::Node(node) => Some(node.as_ref()),
            ChildEntry::Id(_) => None,
        })
    }

    /// Levels of embedded nodes below and including `self`.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(node.embedded_children().map(|c| (c, depth + 1)));
        }
        deepest
    }

    /// Number of nodes in this embedded tree, including `self`.
    #[must_use]
    pub fn count_nodes(&self) -> usize {
        1 + self
            .embedded_children()
            .map(RuleNode::count_nodes)
            .sum::<usize>()
    }
}
