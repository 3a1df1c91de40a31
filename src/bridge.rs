//! Translation between editable [`RuleNode`] trees and [`Specification`]s.

use tracing::debug;
use uuid::Uuid;

use crate::error::RulespecError;
use crate::export::{export, ExportOptions};
use crate::parse::parse;
use crate::types::{
    is_reserved_call, BridgeError, ChildEntry, Condition, NodeConfig, RuleNode, SpecKind,
    Specification, Value, ValueType, MAX_NESTING_DEPTH,
};

/// Translate an embedded rule tree into a [`Specification`].
///
/// Labels, ids and parent links are dropped; metadata is carried verbatim.
///
/// # Errors
///
/// Returns [`BridgeError`] if a node is missing a field its type requires,
/// a single-child wrapper does not have exactly one child, a child is still
/// an id reference, a function uses a reserved name, or the tree nests
/// deeper than [`MAX_NESTING_DEPTH`].
pub fn to_specification(node: &RuleNode) -> Result<Specification, BridgeError> {
    check_depth(node.depth())?;
    node_to_spec(node)
}

fn node_to_spec(node: &RuleNode) -> Result<Specification, BridgeError> {
    let children = embedded_children(node)?;
    if let Some(expected) = node.config.child_arity() {
        if children.len() != expected {
            return Err(BridgeError::ChildCount {
                node: node.id.clone(),
                node_type: node.node_type(),
                expected,
                actual: children.len(),
            });
        }
    }
    let missing = |field: &'static str| BridgeError::MissingField {
        node: node.id.clone(),
        node_type: node.node_type(),
        field,
    };
    let text = |value: &Option<String>, field: &'static str| {
        value
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| missing(field))
    };
    let only_child = || -> Result<Box<Specification>, BridgeError> {
        Ok(Box::new(node_to_spec(children[0])?))
    };

    let kind = match &node.config {
        NodeConfig::FieldCondition {
            field,
            operator,
            value,
        } => SpecKind::Field(Condition {
            field: text(field, "field")?,
            operator: operator.ok_or_else(|| missing("operator"))?,
            value: value.clone().ok_or_else(|| missing("value"))?,
            value_type: ValueType::Literal,
        }),
        NodeConfig::FieldToField {
            left,
            operator,
            right,
        } => SpecKind::Field(Condition::field_ref(
            text(left, "left")?,
            operator.ok_or_else(|| missing("operator"))?,
            text(right, "right")?,
        )),
        NodeConfig::Group { operator } => SpecKind::Composite {
            operator: *operator,
            specs: children
                .iter()
                .map(|c| node_to_spec(c))
                .collect::<Result<_, _>>()?,
        },
        NodeConfig::Conditional {
            conditional,
            target_field,
        } => SpecKind::Conditional {
            conditional: *conditional,
            target_field: text(target_field, "targetField")?,
            condition: only_child()?,
        },
        NodeConfig::ForEach { array_field } => SpecKind::ForEach {
            array_field: text(array_field, "arrayField")?,
            item: only_child()?,
        },
        NodeConfig::UniqueBy { array_field, key } => SpecKind::UniqueBy {
            array_field: text(array_field, "arrayField")?,
            key: text(key, "key")?,
        },
        NodeConfig::Length {
            bound,
            array_field,
            length,
        } => SpecKind::Length {
            bound: *bound,
            array_field: text(array_field, "arrayField")?,
            length: length.ok_or_else(|| missing("length"))?,
        },
        NodeConfig::Optional { guard, field } => SpecKind::Optional {
            guard: *guard,
            field: text(field, "field")?,
            spec: only_child()?,
        },
        NodeConfig::WithDefault { field, default } => SpecKind::WithDefault {
            field: text(field, "field")?,
            default: default.clone().ok_or_else(|| missing("default"))?,
            spec: only_child()?,
        },
        NodeConfig::FunctionCall { name, args } => {
            let name = text(name, "name")?;
            if is_reserved_call(&name) {
                return Err(BridgeError::ReservedFunctionName { name });
            }
            SpecKind::Function {
                name,
                args: args.clone(),
            }
        }
        NodeConfig::Contextual { template } => SpecKind::Contextual {
            template: text(template, "template")?,
        },
        NodeConfig::Cardinality { cardinality, count } => SpecKind::Cardinality {
            cardinality: *cardinality,
            count: count.ok_or_else(|| missing("count"))?,
            specs: children
                .iter()
                .map(|c| node_to_spec(c))
                .collect::<Result<_, _>>()?,
        },
        NodeConfig::Expression { expression } => SpecKind::Expression {
            expression: text(expression, "expression")?,
        },
        NodeConfig::ContextualTemplate {
            template_id,
            params,
        } => SpecKind::Template {
            template_id: text(template_id, "templateId")?,
            params: params.clone(),
        },
        NodeConfig::Custom { name, payload } => SpecKind::Custom {
            name: text(name, "name")?,
            payload: payload.clone(),
        },
    };

    Ok(Specification {
        kind,
        metadata: node.metadata.clone(),
    })
}

fn embedded_children(node: &RuleNode) -> Result<Vec<&RuleNode>, BridgeError> {
    node.children
        .iter()
        .map(|entry| match entry {
            ChildEntry::Node(child) => Ok(child.as_ref()),
            ChildEntry::Id(id) => Err(BridgeError::UnresolvedChild {
                node: node.id.clone(),
                child: id.clone(),
            }),
        })
        .collect()
}

/// Translate a [`Specification`] into an embedded rule tree with fresh ids.
///
/// Every node gets a new UUID v4 id and its parent's id; callers that need
/// stable ids re-key the result.
///
/// # Errors
///
/// Returns [`BridgeError`] for shapes a rule node cannot hold: empty names,
/// reserved function names, field references that are not strings and
/// trees nested deeper than [`MAX_NESTING_DEPTH`].
pub fn to_rule_node(spec: &Specification) -> Result<RuleNode, BridgeError> {
    check_depth(spec.depth())?;
    spec_to_node(spec)
}

fn check_depth(depth: usize) -> Result<(), BridgeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(BridgeError::TooDeep {
            depth,
            limit: MAX_NESTING_DEPTH,
        });
    }
    Ok(())
}

fn spec_to_node(spec: &Specification) -> Result<RuleNode, BridgeError> {
    let non_empty = |s: &str, what: &'static str| {
        if s.is_empty() {
            Err(BridgeError::EmptyName { what })
        } else {
            Ok(Some(s.to_owned()))
        }
    };

    let config = match &spec.kind {
        SpecKind::Field(cond) => match cond.value_type {
            ValueType::Literal => NodeConfig::FieldCondition {
                field: non_empty(&cond.field, "field name")?,
                operator: Some(cond.operator),
                value: Some(cond.value.clone()),
            },
            ValueType::FieldReference => {
                let right = match &cond.value {
                    Value::String(name) if !name.is_empty() => name.clone(),
                    other => {
                        return Err(BridgeError::InvalidReference {
                            value: other.to_string(),
                        })
                    }
                };
                NodeConfig::FieldToField {
                    left: non_empty(&cond.field, "field name")?,
                    operator: Some(cond.operator),
                    right: Some(right),
                }
            }
        },
        SpecKind::Composite { operator, .. } => NodeConfig::Group {
            operator: *operator,
        },
        SpecKind::Conditional {
            conditional,
            target_field,
            ..
        } => NodeConfig::Conditional {
            conditional: *conditional,
            target_field: non_empty(target_field, "target field")?,
        },
        SpecKind::ForEach { array_field, .. } => NodeConfig::ForEach {
            array_field: non_empty(array_field, "array field")?,
        },
        SpecKind::UniqueBy { array_field, key } => NodeConfig::UniqueBy {
            array_field: non_empty(array_field, "array field")?,
            key: non_empty(key, "key")?,
        },
        SpecKind::Length {
            bound,
            array_field,
            length,
        } => NodeConfig::Length {
            bound: *bound,
            array_field: non_empty(array_field, "array field")?,
            length: Some(*length),
        },
        SpecKind::Optional { guard, field, .. } => NodeConfig::Optional {
            guard: *guard,
            field: non_empty(field, "field name")?,
        },
        SpecKind::WithDefault { field, default, .. } => NodeConfig::WithDefault {
            field: non_empty(field, "field name")?,
            default: Some(default.clone()),
        },
        SpecKind::Function { name, args } => {
            if is_reserved_call(name) {
                return Err(BridgeError::ReservedFunctionName { name: name.clone() });
            }
            NodeConfig::FunctionCall {
                name: non_empty(name, "function name")?,
                args: args.clone(),
            }
        }
        SpecKind::Contextual { template } => NodeConfig::Contextual {
            template: non_empty(template, "template")?,
        },
        SpecKind::Cardinality {
            cardinality, count, ..
        } => NodeConfig::Cardinality {
            cardinality: *cardinality,
            count: Some(*count),
        },
        SpecKind::Expression { expression } => NodeConfig::Expression {
            expression: non_empty(expression, "expression")?,
        },
        SpecKind::Template {
            template_id,
            params,
        } => NodeConfig::ContextualTemplate {
            template_id: non_empty(template_id, "template id")?,
            params: params.clone(),
        },
        SpecKind::Custom { name, payload } => NodeConfig::Custom {
            name: non_empty(name, "custom kind")?,
            payload: payload.clone(),
        },
    };

    let mut node = RuleNode::new(Uuid::new_v4().to_string(), config);
    node.metadata = spec.metadata.clone();
    for child in spec.children() {
        node = node.with_child(spec_to_node(child)?);
    }
    Ok(node)
}

/// Render an embedded rule tree as DSL text.
///
/// # Errors
///
/// Returns [`RulespecError`] if the tree cannot be translated or rendered.
pub fn export_node(node: &RuleNode, options: &ExportOptions) -> Result<String, RulespecError> {
    let spec = to_specification(node)?;
    let text = export(&spec, options)?;
    debug!(node = %node.id, len = text.len(), "exported node as dsl");
    Ok(text)
}

/// Parse DSL text straight into an embedded rule tree. `Ok(None)` for empty
/// input.
///
/// # Errors
///
/// Returns [`RulespecError`] if the text does not parse or the result cannot
/// be held by rule nodes.
pub fn import_dsl(text: &str) -> Result<Option<RuleNode>, RulespecError> {
    let Some(spec) = parse(text)? else {
        return Ok(None);
    };
    let node = to_rule_node(&spec)?;
    debug!(node = %node.id, nodes = node.count_nodes(), "imported dsl");
    Ok(Some(node))
}
