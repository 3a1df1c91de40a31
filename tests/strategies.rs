#![allow(dead_code)]

use std::collections::BTreeMap;

use proptest::prelude::*;
use rulespec::{
    field, Argument, BoolOp, CardinalityKind, CompareOp, Condition, ConditionalKind, LengthBound,
    NodeMetadata, OptionalKind, Severity, SpecKind, Specification, Value,
};

// --- Fixed vocabulary ---
// Field names are plain identifiers (some dotted, some keyword-prefixed) so
// every generated specification is exportable.

const FIELDS: &[&str] = &[
    "age",
    "status",
    "user.age",
    "user.profile.email",
    "notify",
    "order_total",
    "_internal",
];
const FUNCTIONS: &[&str] = &["isEmail", "matches", "between", "now"];
const SEVERITIES: &[Severity] = &[Severity::Error, Severity::Warning, Severity::Info];

fn arb_field() -> impl Strategy<Value = String> {
    prop::sample::select(FIELDS).prop_map(str::to_owned)
}

fn arb_op() -> impl Strategy<Value = CompareOp> {
    prop::sample::select(&CompareOp::ALL[..])
}

/// Literal values that survive the DSL unchanged.
pub fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1000_i32..1000, prop::sample::select(&[0.25_f64, 0.5, 0.75, 0.0][..]))
            .prop_map(|(whole, frac)| Value::Float(f64::from(whole) + frac)),
        "[a-zA-Z0-9 _\"\\\\\n\t.-]{0,12}".prop_map(Value::String),
    ]
}

fn arb_metadata() -> impl Strategy<Value = Option<NodeMetadata>> {
    prop::option::weighted(
        0.2,
        ("[A-Z_]{1,8}", "[a-z ]{0,16}", prop::sample::select(SEVERITIES))
            .prop_map(|(code, message, severity)| NodeMetadata::new(code, message, severity)),
    )
}

fn arb_leaf() -> impl Strategy<Value = Specification> {
    prop_oneof![
        4 => (arb_field(), arb_op(), arb_value())
            .prop_map(|(name, op, value)| Specification::leaf(Condition::literal(name, op, value))),
        1 => (arb_field(), arb_op(), arb_field())
            .prop_map(|(name, op, other)| field(&name).cmp_field(op, &other)),
        1 => (
            prop::sample::select(FUNCTIONS),
            prop::collection::vec(
                prop_oneof![
                    arb_value().prop_map(Argument::literal),
                    arb_field().prop_map(Argument::field),
                ],
                0..3,
            ),
        )
            .prop_map(|(name, args)| Specification::function(name, args)),
        1 => (arb_field(), "[a-z]{1,6}").prop_map(|(array_field, key)| {
            Specification::new(SpecKind::UniqueBy { array_field, key })
        }),
        1 => (arb_field(), any::<bool>(), 0_u64..100).prop_map(|(array_field, min, length)| {
            let bound = if min { LengthBound::Min } else { LengthBound::Max };
            Specification::new(SpecKind::Length {
                bound,
                array_field,
                length,
            })
        }),
        1 => "[a-z ${}.]{1,16}".prop_map(|template| {
            Specification::new(SpecKind::Contextual { template })
        }),
        1 => "[a-z0-9 <>=+*/.]{1,16}".prop_map(|expression| {
            Specification::new(SpecKind::Expression { expression })
        }),
        1 => (
            "[a-z-]{1,8}",
            prop::collection::btree_map("p_[a-z0-9]{0,5}", arb_value(), 0..3),
        )
            .prop_map(|(template_id, params): (String, BTreeMap<String, Value>)| {
                Specification::new(SpecKind::Template {
                    template_id,
                    params,
                })
            }),
        1 => ("[a-z]{1,6}", any::<i32>()).prop_map(|(name, n)| {
            Specification::new(SpecKind::Custom {
                name,
                payload: serde_json::json!({ "limit": n, "strict": n % 2 == 0 }),
            })
        }),
    ]
}

/// Generate a specification tree of bounded depth, covering every shape.
pub fn arb_specification(max_depth: u32) -> impl Strategy<Value = Specification> {
    let tree = arb_leaf().prop_recursive(max_depth, 32, 4, |inner| {
        prop_oneof![
            (
                prop::sample::select(&BoolOp::ALL[..]),
                prop::collection::vec(inner.clone(), 0..4),
            )
                .prop_map(|(op, specs)| Specification::composite(op, specs)),
            (
                prop::sample::select(&ConditionalKind::ALL[..]),
                arb_field(),
                inner.clone(),
            )
                .prop_map(|(conditional, target_field, condition)| {
                    Specification::new(SpecKind::Conditional {
                        conditional,
                        target_field,
                        condition: Box::new(condition),
                    })
                }),
            (arb_field(), inner.clone()).prop_map(|(array_field, item)| {
                Specification::new(SpecKind::ForEach {
                    array_field,
                    item: Box::new(item),
                })
            }),
            (
                prop::sample::select(&OptionalKind::ALL[..]),
                arb_field(),
                inner.clone(),
            )
                .prop_map(|(guard, field, spec)| {
                    Specification::new(SpecKind::Optional {
                        guard,
                        field,
                        spec: Box::new(spec),
                    })
                }),
            (arb_field(), arb_value(), inner.clone()).prop_map(|(field, default, spec)| {
                Specification::new(SpecKind::WithDefault {
                    field,
                    default,
                    spec: Box::new(spec),
                })
            }),
            (
                any::<bool>(),
                0_u32..5,
                prop::collection::vec(inner, 0..4),
            )
                .prop_map(|(at_least, count, specs)| {
                    let cardinality = if at_least {
                        CardinalityKind::AtLeast
                    } else {
                        CardinalityKind::Exactly
                    };
                    Specification::new(SpecKind::Cardinality {
                        cardinality,
                        count,
                        specs,
                    })
                }),
        ]
    });
    (tree, arb_metadata()).prop_map(|(mut spec, metadata)| {
        spec.metadata = metadata;
        spec
    })
}

/// Specifications with metadata sprinkled through the whole tree, not just
/// the root.
pub fn arb_annotated_specification() -> impl Strategy<Value = Specification> {
    (arb_specification(3), prop::collection::vec(arb_metadata(), 16)).prop_map(
        |(mut spec, metas)| {
            let mut metas = metas.into_iter();
            annotate(&mut spec, &mut metas);
            spec
        },
    )
}

fn annotate(spec: &mut Specification, metas: &mut impl Iterator<Item = Option<NodeMetadata>>) {
    if let Some(meta) = metas.next() {
        if meta.is_some() {
            spec.metadata = meta;
        }
    }
    match &mut spec.kind {
        SpecKind::Composite { specs, .. } | SpecKind::Cardinality { specs, .. } => {
            for child in specs {
                annotate(child, metas);
            }
        }
        SpecKind::Conditional { condition: inner, .. }
        | SpecKind::ForEach { item: inner, .. }
        | SpecKind::Optional { spec: inner, .. }
        | SpecKind::WithDefault { spec: inner, .. } => annotate(inner, metas),
        _ => {}
    }
}
