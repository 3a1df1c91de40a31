use std::sync::Arc;
use std::thread;

use rulespec::{
    parse, to_rule_node, CompareOp, DslLinter, FieldSchema, FieldType, NodeConfig, NodeType,
    RoundTripValidator, RuleNode,
};

fn tree(threshold: i64) -> RuleNode {
    RuleNode::new(format!("root-{threshold}"), NodeConfig::empty(NodeType::AndGroup))
        .with_child(RuleNode::new(
            format!("age-{threshold}"),
            NodeConfig::field_condition("user.age", CompareOp::GreaterThanOrEqual, threshold),
        ))
        .with_child(RuleNode::new(
            format!("status-{threshold}"),
            NodeConfig::field_condition("user.status", CompareOp::Equals, "active"),
        ))
}

#[test]
fn validate_across_threads() {
    let validator = Arc::new(RoundTripValidator::default());

    let handles: Vec<_> = (0..8_i64)
        .map(|i| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || {
                let result = validator.validate(&tree(18 + i));
                (result.success(), result.dsl().map(str::to_owned))
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let (success, dsl) = handle.join().unwrap();
        assert!(success);
        assert_eq!(
            dsl.as_deref(),
            Some(format!("(user.age >= {} AND user.status == \"active\")", 18 + i).as_str())
        );
    }
}

#[test]
fn parse_and_lint_across_threads() {
    let linter = Arc::new(
        DslLinter::default().with_schema(
            FieldSchema::new()
                .field("user.age", FieldType::Number)
                .field("user.status", FieldType::String),
        ),
    );
    let inputs = [
        "user.age >= 18 AND user.status == \"active\"",
        "user.age > 21 or user.status == \"trial\"",
        "user.country == \"NZ\"",
        "user.age >= (",
    ];

    let handles: Vec<_> = inputs
        .iter()
        .map(|&text| {
            let linter = Arc::clone(&linter);
            thread::spawn(move || {
                let parsed = parse(text).ok().flatten();
                let nodes = parsed
                    .as_ref()
                    .map(|spec| to_rule_node(spec).unwrap().count_nodes());
                (nodes, linter.lint(text).len())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0], (Some(3), 0));
    assert_eq!(results[1], (Some(3), 1));
    assert_eq!(results[2], (Some(1), 1));
    assert_eq!(results[3].0, None);
    assert!(results[3].1 >= 1);
}
