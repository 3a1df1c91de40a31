use rulespec::{
    build_complete_tree, export, field, flatten, import_dsl, parse, to_rule_node,
    to_specification, BridgeError, ChildEntry, CodecError, CommentPosition, CompareOp, Condition,
    DslLinter, ExportOptions, NodeConfig, NodeMetadata, NodeType, RoundTripValidator, RuleNode,
    Severity, SpecKind, Specification, StructuralError, Value, MAX_NESTING_DEPTH,
};

fn dsl(spec: &Specification) -> String {
    export(spec, &ExportOptions::default()).unwrap()
}

fn reparse(spec: &Specification) -> Specification {
    parse(&dsl(spec)).unwrap().unwrap()
}

#[test]
fn keyword_named_fields() {
    for name in ["and", "OR", "not", "Xor", "implies"] {
        let spec = field(name).eq(1_i64);
        let text = dsl(&spec);
        assert_eq!(text, format!("${{{name}}} == 1"));
        assert_eq!(reparse(&spec), spec);
    }
    // Literal and operator words are unambiguous in field position.
    for name in ["true", "null", "contains"] {
        let spec = field(name).eq(1_i64);
        assert_eq!(dsl(&spec), format!("{name} == 1"));
        assert_eq!(reparse(&spec), spec);
    }
}

#[test]
fn keyword_prefixed_identifiers_are_plain_fields() {
    for text in ["android == 1", "order == 1", "notes == 1", "xorder == 1", "implies_x == 1"] {
        let spec = parse(text).unwrap().unwrap();
        assert!(matches!(spec.kind, SpecKind::Field(_)), "{text} -> {spec:?}");
    }
}

#[test]
fn keywords_in_any_case() {
    let expected = Specification::and(vec![field("a").eq(1_i64), field("b").eq(2_i64)]);
    for text in ["a == 1 AND b == 2", "a == 1 and b == 2", "a == 1 aNd b == 2"] {
        assert_eq!(parse(text).unwrap().unwrap(), expected);
    }
}

#[test]
fn string_escapes_survive() {
    for s in [
        "",
        "plain",
        "say \"hi\"",
        "back\\slash",
        "line\nbreak",
        "tab\there",
        "# not a comment",
        "${not_a_ref}",
        "unicode: héllo ✓",
    ] {
        let spec = field("note").eq(s);
        assert_eq!(reparse(&spec), spec, "string {s:?}");
    }
}

#[test]
fn unknown_escape_is_kept_verbatim() {
    let spec = parse(r#"path == "C:\data""#).unwrap().unwrap();
    assert_eq!(spec, field("path").eq("C:\\data"));
}

#[test]
fn numeric_extremes() {
    for value in [
        Value::Int(0),
        Value::Int(-1),
        Value::Int(i64::MAX),
        Value::Int(i64::MIN),
        Value::Float(-0.5),
        Value::Float(3.0),
        Value::Float(1e15),
        Value::Float(0.000_123),
    ] {
        let spec = field("n").eq(value.clone());
        assert_eq!(reparse(&spec), spec, "value {value:?}");
    }
    assert_eq!(dsl(&field("n").eq(3.0)), "n == 3.0");
    assert!(parse("n == 99999999999999999999").is_err());
}

#[test]
fn null_and_booleans() {
    assert_eq!(dsl(&field("a").eq(Value::Null)), "a == null");
    assert_eq!(dsl(&field("a").neq(false)), "a != false");
    // Bare `true` on the right is a literal, `${true}` a reference.
    let spec = parse("a == ${true}").unwrap().unwrap();
    assert_eq!(spec, field("a").cmp_field(CompareOp::Equals, "true"));
}

#[test]
fn deep_nesting() {
    let mut spec = field("leaf").eq(0_i64);
    for depth in 1..=30_i64 {
        let sibling = field("x").eq(depth);
        spec = if depth % 2 == 0 {
            Specification::and(vec![sibling, spec])
        } else {
            Specification::or(vec![spec, sibling])
        };
    }
    assert_eq!(spec.count(), 61);
    assert_eq!(reparse(&spec), spec);

    let pretty = export(&spec, &ExportOptions::default().with_pretty(true)).unwrap();
    assert_eq!(parse(&pretty).unwrap().unwrap(), spec);

    let node = to_rule_node(&spec).unwrap();
    assert_eq!(node.count_nodes(), 61);
    assert_eq!(to_specification(&node).unwrap(), spec);
}

#[test]
fn deep_not_chain() {
    let text = format!("{}a == 1", "NOT ".repeat(30));
    let spec = parse(&text).unwrap().unwrap();
    let mut current = &spec;
    let mut depth = 0;
    while let SpecKind::Composite { specs, .. } = &current.kind {
        assert_eq!(specs.len(), 1);
        current = &specs[0];
        depth += 1;
    }
    assert_eq!(depth, 30);
    assert_eq!(*current, field("a").eq(1_i64));
}

fn not_chain(levels: usize) -> Specification {
    let mut spec = field("a").eq(1_i64);
    for _ in 1..levels {
        spec = Specification::not(vec![spec]);
    }
    spec
}

#[test]
fn runaway_nesting_is_an_error() {
    let opens = "(".repeat(10_000);
    assert!(parse(&opens).is_err());

    let balanced = format!("{}a == 1{}", "(".repeat(10_000), ")".repeat(10_000));
    let err = parse(&balanced).unwrap_err();
    assert!(err.message().contains("nesting depth"), "{err}");

    let nots = format!("{}a == 1", "NOT ".repeat(10_000));
    assert!(parse(&nots).is_err());

    let calls = format!("{}a == 1{}", "forEach(items, ".repeat(10_000), ")".repeat(10_000));
    assert!(parse(&calls).is_err());

    assert!(import_dsl(&balanced).is_err());
    let diagnostics = DslLinter::default().lint(&balanced);
    assert!(!diagnostics.is_empty());
}

#[test]
fn deepest_allowed_tree_round_trips() {
    let spec = not_chain(MAX_NESTING_DEPTH);
    assert_eq!(spec.depth(), MAX_NESTING_DEPTH);
    assert_eq!(reparse(&spec), spec);

    let pretty = export(&spec, &ExportOptions::default().with_pretty(true)).unwrap();
    assert_eq!(parse(&pretty).unwrap().unwrap(), spec);

    let node = to_rule_node(&spec).unwrap();
    assert_eq!(node.depth(), MAX_NESTING_DEPTH);
    assert!(RoundTripValidator::default().validate(&node).success());
}

#[test]
fn trees_past_the_limit_are_rejected() {
    let spec = not_chain(MAX_NESTING_DEPTH + 1);
    assert_eq!(
        export(&spec, &ExportOptions::default()).unwrap_err(),
        CodecError::TooDeep {
            depth: MAX_NESTING_DEPTH + 1,
            limit: MAX_NESTING_DEPTH,
        }
    );
    assert_eq!(
        to_rule_node(&spec).unwrap_err(),
        BridgeError::TooDeep {
            depth: MAX_NESTING_DEPTH + 1,
            limit: MAX_NESTING_DEPTH,
        }
    );

    let mut node = RuleNode::new(
        "leaf",
        NodeConfig::field_condition("a", CompareOp::Equals, 1_i64),
    );
    for i in 0..MAX_NESTING_DEPTH {
        node = RuleNode::new(format!("not-{i}"), NodeConfig::empty(NodeType::NotGroup))
            .with_child(node);
    }
    assert_eq!(node.depth(), MAX_NESTING_DEPTH + 1);
    assert!(matches!(
        to_specification(&node),
        Err(BridgeError::TooDeep { .. })
    ));
    let result = RoundTripValidator::default().validate(&node);
    assert!(!result.success());

    let (map, roots) = flatten(std::slice::from_ref(&node));
    assert!(matches!(
        build_complete_tree(&roots[0], &map),
        Err(StructuralError::TooDeep { .. })
    ));
}

#[test]
fn metadata_on_every_position() {
    let spec = Specification::or(vec![
        Specification::not(vec![field("a")
            .eq(1_i64)
            .with_metadata(NodeMetadata::new("A", "inner # hash", Severity::Warning))]),
        field("b")
            .eq("x")
            .with_metadata(NodeMetadata::new("B", "quote \" inside", Severity::Info)),
    ])
    .with_metadata(NodeMetadata::new("ROOT", "", Severity::Error));

    for position in [
        CommentPosition::Before,
        CommentPosition::After,
        CommentPosition::Inline,
    ] {
        let text = export(
            &spec,
            &ExportOptions::default()
                .with_comment_position(position)
                .with_pretty(true),
        )
        .unwrap();
        assert_eq!(text.matches("# @meta").count(), 3, "{text}");
        assert_eq!(parse(&text).unwrap().unwrap(), spec, "{position:?}:\n{text}");
    }
}

#[test]
fn partial_metadata_fields() {
    let meta = NodeMetadata {
        code: None,
        message: Some("only a message".into()),
        severity: None,
    };
    let spec = field("a").eq(1_i64).with_metadata(meta);
    assert_eq!(reparse(&spec), spec);
}

#[test]
fn unexportable_names() {
    let spaced = Specification::leaf(Condition::literal("first name", CompareOp::Equals, 1_i64));
    assert!(matches!(
        export(&spaced, &ExportOptions::default()),
        Err(CodecError::InvalidIdentifier { .. })
    ));
    let digit = Specification::leaf(Condition::literal("1st", CompareOp::Equals, 1_i64));
    assert!(export(&digit, &ExportOptions::default()).is_err());
}

#[test]
fn flat_storage_round_trip() {
    let tree = RuleNode::new("g", NodeConfig::empty(NodeType::OrGroup))
        .with_child(RuleNode::new(
            "a",
            NodeConfig::field_condition("a", CompareOp::Equals, 1_i64),
        ))
        .with_child(
            RuleNode::new("n", NodeConfig::empty(NodeType::NotGroup)).with_child(RuleNode::new(
                "b",
                NodeConfig::field_condition("b", CompareOp::LessThan, 2_i64),
            )),
        );

    let (map, roots) = flatten(std::slice::from_ref(&tree));
    assert_eq!(roots, vec!["g".to_owned()]);
    assert_eq!(map.len(), 4);
    assert_eq!(map["b"].parent_id.as_deref(), Some("n"));
    assert!(matches!(map["g"].children[0], ChildEntry::Id(_)));

    // Flat nodes cannot be bridged until they are materialized.
    assert!(to_specification(&map["g"]).is_err());
    let rebuilt = build_complete_tree("g", &map).unwrap();
    assert_eq!(rebuilt, tree);
    assert_eq!(
        to_specification(&rebuilt).unwrap(),
        Specification::or(vec![
            field("a").eq(1_i64),
            Specification::not(vec![field("b").lt(2_i64)]),
        ])
    );
}

#[test]
fn flat_storage_errors() {
    let (mut map, _) = flatten(&[RuleNode::new("g", NodeConfig::empty(NodeType::AndGroup))
        .with_child(RuleNode::new(
            "a",
            NodeConfig::field_condition("a", CompareOp::Equals, 1_i64),
        ))]);

    assert_eq!(
        build_complete_tree("missing", &map),
        Err(StructuralError::UnknownNode("missing".into()))
    );

    map.get_mut("a").unwrap().children.push(ChildEntry::Id("g".into()));
    assert!(matches!(
        build_complete_tree("g", &map),
        Err(StructuralError::Cycle { .. })
    ));

    map.get_mut("a").unwrap().children = vec![ChildEntry::Id("ghost".into())];
    assert_eq!(
        build_complete_tree("g", &map),
        Err(StructuralError::DanglingChild {
            parent: "a".into(),
            child: "ghost".into()
        })
    );
}

#[test]
fn empty_groups_everywhere() {
    let spec = Specification::and(vec![
        Specification::or(vec![]),
        Specification::xor(vec![]),
        Specification::implies(vec![]),
    ]);
    assert_eq!(dsl(&spec), "((OR) AND (XOR) AND (IMPLIES))");
    assert_eq!(reparse(&spec), spec);
}

#[test]
fn whitespace_and_comment_noise() {
    let text = "\n\n  # header\n\t(a==1)\t# trailing\n  OR\n\n  b!=2 # end";
    assert_eq!(
        parse(text).unwrap().unwrap(),
        Specification::or(vec![field("a").eq(1_i64), field("b").neq(2_i64)])
    );
}
