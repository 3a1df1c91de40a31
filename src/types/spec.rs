use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::kinds::{
    Argument, BoolOp, CardinalityKind, ConditionalKind, LengthBound, OptionalKind,
};
use super::{CompareOp, Condition, NodeMetadata, Value};

/// Deepest tree accepted by the bridge, the exporter and tree building; a
/// lone leaf is one level. Deeper trees are rejected with an error, and the
/// parser bounds its own recursion to match.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Representation-independent predicate tree.
///
/// A `Specification` has no identity, labels or editor state. `metadata` is
/// carried as an opaque record so it can be restored on the rule node it
/// came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    #[serde(flatten)]
    pub kind: SpecKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NodeMetadata>,
}

/// The shapes a specification can take. Serialized with an explicit `type`
/// discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SpecKind {
    Field(Condition),
    Composite {
        operator: BoolOp,
        specs: Vec<Specification>,
    },
    #[serde(rename_all = "camelCase")]
    Conditional {
        conditional: ConditionalKind,
        target_field: String,
        condition: Box<Specification>,
    },
    #[serde(rename_all = "camelCase")]
    ForEach {
        array_field: String,
        item: Box<Specification>,
    },
    #[serde(rename_all = "camelCase")]
    UniqueBy {
        array_field: String,
        key: String,
    },
    #[serde(rename_all = "camelCase")]
    Length {
        bound: LengthBound,
        array_field: String,
        length: u64,
    },
    Optional {
        guard: OptionalKind,
        field: String,
        spec: Box<Specification>,
    },
    WithDefault {
        field: String,
        default: Value,
        spec: Box<Specification>,
    },
    Function {
        name: String,
        #[serde(default)]
        args: Vec<Argument>,
    },
    Contextual {
        template: String,
    },
    Cardinality {
        cardinality: CardinalityKind,
        count: u32,
        specs: Vec<Specification>,
    },
    Expression {
        expression: String,
    },
    #[serde(rename_all = "camelCase")]
    Template {
        template_id: String,
        #[serde(default)]
        params: BTreeMap<String, Value>,
    },
    Custom {
        name: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl Specification {
    #[must_use]
    pub fn new(kind: SpecKind) -> Self {
        Self {
            kind,
            metadata: None,
        }
    }

    #[must_use]
    pub fn leaf(condition: Condition) -> Self {
        Self::new(SpecKind::Field(condition))
    }

    #[must_use]
    pub fn composite(operator: BoolOp, specs: Vec<Specification>) -> Self {
        Self::new(SpecKind::Composite { operator, specs })
    }

    #[must_use]
    pub fn and(specs: Vec<Specification>) -> Self {
        Self::composite(BoolOp::And, specs)
    }

    #[must_use]
    pub fn or(specs: Vec<Specification>) -> Self {
        Self::composite(BoolOp::Or, specs)
    }

    #[must_use]
    pub fn not(specs: Vec<Specification>) -> Self {
        Self::composite(BoolOp::Not, specs)
    }

    #[must_use]
    pub fn xor(specs: Vec<Specification>) -> Self {
        Self::composite(BoolOp::Xor, specs)
    }

    #[must_use]
    pub fn implies(specs: Vec<Specification>) -> Self {
        Self::composite(BoolOp::Implies, specs)
    }

    #[must_use]
    pub fn function(name: impl Into<String>, args: Vec<Argument>) -> Self {
        Self::new(SpecKind::Function {
            name: name.into(),
            args,
        })
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Direct sub-specifications, in the order they map to rule node children.
    #[must_use]
    pub fn children(&self) -> Vec<&Specification> {
        match &self.kind {
            SpecKind::Composite { specs, .. } | SpecKind::Cardinality { specs, .. } => {
                specs.iter().collect()
            }
            SpecKind::Conditional { condition: inner, .. }
            | SpecKind::ForEach { item: inner, .. }
            | SpecKind::Optional { spec: inner, .. }
            | SpecKind::WithDefault { spec: inner, .. } => vec![inner.as_ref()],
            SpecKind::Field(_)
            | SpecKind::UniqueBy { .. }
            | SpecKind::Length { .. }
            | SpecKind::Function { .. }
            | SpecKind::Contextual { .. }
            | SpecKind::Expression { .. }
            | SpecKind::Template { .. }
            | SpecKind::Custom { .. } => Vec::new(),
        }
    }

    pub(crate) fn children_mut(&mut self) -> Vec<&mut Specification> {
        match &mut self.kind {
            SpecKind::Composite { specs, .. } | SpecKind::Cardinality { specs, .. } => {
                specs.iter_mut().collect()
            }
            SpecKind::Conditional { condition: inner, .. }
            | SpecKind::ForEach { item: inner, .. }
            | SpecKind::Optional { spec: inner, .. }
            | SpecKind::WithDefault { spec: inner, .. } => vec![inner.as_mut()],
            SpecKind::Field(_)
            | SpecKind::UniqueBy { .. }
            | SpecKind::Length { .. }
            | SpecKind::Function { .. }
            | SpecKind::Contextual { .. }
            | SpecKind::Expression { .. }
            | SpecKind::Template { .. }
            | SpecKind::Custom { .. } => Vec::new(),
        }
    }

    /// Follow a path of child indices from this node.
    pub(crate) fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Specification> {
        match path.split_first() {
            None => Some(self),
            Some((&first, rest)) => self
                .children_mut()
                .into_iter()
                .nth(first)?
                .descendant_mut(rest),
        }
    }

    /// Number of specifications in this tree, including `self`.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children().into_iter().map(Self::count).sum::<usize>()
    }

    /// Number of levels in this tree; a lone leaf has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((spec, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(spec.children().into_iter().map(|c| (c, depth + 1)));
        }
        deepest
    }

    /// Visit every specification depth-first, parents before children.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Specification)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }
}

/// Intermediate builder for field conditions.
/// Created by [`field()`]; a comparison method produces the [`Specification`].
#[derive(Debug, Clone)]
pub struct FieldExpr {
    path: String,
}

impl FieldExpr {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Specification {
        Specification::leaf(Condition::literal(self.path, op, value))
    }

    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> Specification {
        self.compare(CompareOp::Equals, value)
    }

    #[must_use]
    pub fn neq(self, value: impl Into<Value>) -> Specification {
        self.compare(CompareOp::NotEquals, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> Specification {
        self.compare(CompareOp::GreaterThan, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Value>) -> Specification {
        self.compare(CompareOp::GreaterThanOrEqual, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> Specification {
        self.compare(CompareOp::LessThan, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Value>) -> Specification {
        self.compare(CompareOp::LessThanOrEqual, value)
    }

    #[must_use]
    pub fn contains(self, value: impl Into<Value>) -> Specification {
        self.compare(CompareOp::Contains, value)
    }

    /// Compare against another field instead of a literal.
    #[must_use]
    pub fn cmp_field(self, op: CompareOp, other: &str) -> Specification {
        Specification::leaf(Condition::field_ref(self.path, op, other))
    }

    #[must_use]
    pub fn gt_field(self, other: &str) -> Specification {
        self.cmp_field(CompareOp::GreaterThan, other)
    }
}

#[must_use]
pub fn field(path: &str) -> FieldExpr {
    FieldExpr {
        path: path.to_owned(),
    }
}
