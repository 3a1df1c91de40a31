use rulespec::{
    field, parse, Argument, BoolOp, CardinalityKind, CompareOp, Condition, ConditionalKind,
    OptionalKind, Severity, SpecKind, Specification, Value,
};

fn one(dsl: &str) -> Specification {
    parse(dsl).unwrap().unwrap()
}

#[test]
fn dsl_parse_simple_leaf() {
    assert_eq!(one("user.age >= 18"), field("user.age").gte(18_i64));
    assert_eq!(one("status == \"active\""), field("status").eq("active"));
    assert_eq!(one("score < -2.5"), field("score").lt(-2.5));
    assert_eq!(one("deleted == null"), field("deleted").eq(Value::Null));
}

#[test]
fn dsl_operator_precedence() {
    // IMPLIES < OR < XOR < AND < NOT
    let spec = one("a == 1 IMPLIES b == 2 OR c == 3 XOR d == 4 AND NOT e == 5");
    let expected = Specification::implies(vec![
        field("a").eq(1_i64),
        Specification::or(vec![
            field("b").eq(2_i64),
            Specification::xor(vec![
                field("c").eq(3_i64),
                Specification::and(vec![
                    field("d").eq(4_i64),
                    Specification::not(vec![field("e").eq(5_i64)]),
                ]),
            ]),
        ]),
    ]);
    assert_eq!(spec, expected);
}

#[test]
fn dsl_chains_are_n_ary() {
    let spec = one("a == 1 AND b == 2 AND c == 3");
    let SpecKind::Composite { operator, specs } = &spec.kind else {
        panic!("expected composite, got {spec:?}");
    };
    assert_eq!(*operator, BoolOp::And);
    assert_eq!(specs.len(), 3);
}

#[test]
fn dsl_parentheses_group() {
    let spec = one("(a == 1 OR b == 2) AND c == 3");
    assert_eq!(
        spec,
        Specification::and(vec![
            Specification::or(vec![field("a").eq(1_i64), field("b").eq(2_i64)]),
            field("c").eq(3_i64),
        ])
    );
}

#[test]
fn dsl_prefix_groups() {
    assert_eq!(one("(AND)"), Specification::and(vec![]));
    assert_eq!(one("(OR a == 1)"), Specification::or(vec![field("a").eq(1_i64)]));
    assert_eq!(
        one("(NOT a == 1, b == 2)"),
        Specification::not(vec![field("a").eq(1_i64), field("b").eq(2_i64)])
    );
}

#[test]
fn dsl_multiline_with_comments() {
    let dsl = r#"
# eligibility
(
  user.age >= 18      # adults only
  AND user.status == "active"
)
"#;
    assert_eq!(
        one(dsl),
        Specification::and(vec![
            field("user.age").gte(18_i64),
            field("user.status").eq("active"),
        ])
    );
}

#[test]
fn dsl_field_references() {
    assert_eq!(
        one("end_date > ${start_date}"),
        field("end_date").gt_field("start_date")
    );
    // A keyword can be used as a field name through `${...}`.
    assert_eq!(one("${and} == 1"), field("and").eq(1_i64));
}

#[test]
fn dsl_text_operators() {
    assert_eq!(one("name contains \"x\""), field("name").contains("x"));
    let spec = one("email endsWith \".org\"");
    assert!(matches!(
        &spec.kind,
        SpecKind::Field(c) if c.operator == CompareOp::EndsWith
    ));
}

#[test]
fn dsl_structural_calls() {
    assert_eq!(
        one("requiredIf(email, newsletter == true)").kind,
        SpecKind::Conditional {
            conditional: ConditionalKind::RequiredIf,
            target_field: "email".into(),
            condition: Box::new(field("newsletter").eq(true)),
        }
    );
    assert_eq!(
        one("ifNotNull(middle_name, middle_name startsWith \"A\")").kind,
        SpecKind::Optional {
            guard: OptionalKind::IfNotNull,
            field: "middle_name".into(),
            spec: Box::new(Specification::leaf(Condition::literal(
                "middle_name",
                CompareOp::StartsWith,
                "A",
            ))),
        }
    );
    assert_eq!(
        one("atLeast(2, [a == 1, b == 2, c == 3])").kind,
        SpecKind::Cardinality {
            cardinality: CardinalityKind::AtLeast,
            count: 2,
            specs: vec![field("a").eq(1_i64), field("b").eq(2_i64), field("c").eq(3_i64)],
        }
    );
    assert_eq!(
        one("withDefault(age, 0, age > 18)").kind,
        SpecKind::WithDefault {
            field: "age".into(),
            default: Value::Int(0),
            spec: Box::new(field("age").gt(18_i64)),
        }
    );
}

#[test]
fn dsl_template_params() {
    let spec = one(r#"template("address", country = "US", max = 3)"#);
    let SpecKind::Template {
        template_id,
        params,
    } = &spec.kind
    else {
        panic!("expected template, got {spec:?}");
    };
    assert_eq!(template_id, "address");
    assert_eq!(params["country"], Value::String("US".into()));
    assert_eq!(params["max"], Value::Int(3));
}

#[test]
fn dsl_function_arguments() {
    assert_eq!(
        one("between(age, ${limit}, 18, \"x\", null)"),
        Specification::function(
            "between",
            vec![
                Argument::field("age"),
                Argument::field("limit"),
                Argument::literal(18_i64),
                Argument::literal("x"),
                Argument::literal(Value::Null),
            ],
        )
    );
    assert_eq!(one("now()"), Specification::function("now", vec![]));
}

#[test]
fn dsl_metadata_comments_attach_by_path() {
    let dsl = r#"
# @meta {"path":[1],"code":"B_REQUIRED","message":"b must be 2","severity":"warning"}
(a == 1 AND b == 2)
"#;
    let spec = one(dsl);
    assert!(spec.metadata.is_none());
    let meta = spec.children()[1].metadata.clone().unwrap();
    assert_eq!(meta.code.as_deref(), Some("B_REQUIRED"));
    assert_eq!(meta.severity, Some(Severity::Warning));
}

#[test]
fn dsl_empty_input() {
    assert_eq!(parse("").unwrap(), None);
    assert_eq!(parse("  \n\t ").unwrap(), None);
    assert_eq!(parse("# nothing here\n").unwrap(), None);
}

#[test]
fn dsl_syntax_errors() {
    for bad in [
        "a ==",
        "(a == 1",
        "a == 1)",
        "== 1",
        "${} == 1",
        "${ x } == 1",
        "a == \"unterminated",
        "requiredIf(email)",
        "atLeast(x, [a == 1])",
        "not valid dsl (((",
    ] {
        assert!(parse(bad).is_err(), "expected an error for {bad:?}");
    }
}

#[test]
fn dsl_error_location() {
    let err = parse("a == 1\nAND").unwrap_err();
    assert_eq!(err.location().line, 2);
    assert!(err.to_string().starts_with("parse error at line 2"));

    let err = parse("a == 1 b").unwrap_err();
    assert_eq!(err.location().line, 1);
    assert_eq!(err.location().column, 8);
}
