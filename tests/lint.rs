use rulespec::{
    apply_fixes, parse, CompareOp, DslLinter, FieldInfo, FieldLookup, FieldSchema, FieldType,
    LintCategory, LintConfig, LintDiagnostic, LintRule,
};

fn rules(found: &[LintDiagnostic]) -> Vec<LintRule> {
    found.iter().map(|d| d.rule).collect()
}

#[test]
fn fixes_produce_clean_equivalent_text() {
    let text = "a == 1 and not b == 2  \nor c == 3";
    let linter = DslLinter::default();
    let found = linter.lint(text);
    assert_eq!(
        rules(&found),
        vec![
            LintRule::LowercaseKeyword,
            LintRule::LowercaseKeyword,
            LintRule::TrailingWhitespace,
            LintRule::LowercaseKeyword,
        ]
    );
    assert!(found.iter().all(|d| d.fix.is_some()));

    let fixed = apply_fixes(text, &found);
    assert_eq!(fixed, "a == 1 AND NOT b == 2\nOR c == 3");
    assert!(linter.lint(&fixed).is_empty());
    assert_eq!(parse(&fixed).unwrap(), parse(text).unwrap());
}

#[test]
fn syntax_problems_block_semantic_checks() {
    let linter = DslLinter::default().with_schema(FieldSchema::new());
    let found = linter.lint("(ghost == 1 AND ghost == 1");
    assert!(rules(&found).contains(&LintRule::SyntaxError));
    assert!(rules(&found).contains(&LintRule::UnbalancedParens));
    assert!(!rules(&found).contains(&LintRule::UnknownField));
    assert!(!rules(&found).contains(&LintRule::DuplicateCondition));
    assert!(found.iter().any(LintDiagnostic::is_error));
}

#[test]
fn findings_are_ordered_and_located() {
    let text = "x == 1\n  and y == 2\nAND (OR z == 3)";
    let found = DslLinter::default().lint(text);
    assert_eq!(
        rules(&found),
        vec![LintRule::LowercaseKeyword, LintRule::SingleChildGroup]
    );
    assert_eq!((found[0].location.line, found[0].location.column), (2, 3));
    assert_eq!(found[1].location.line, 3);
    assert_eq!(found[1].category, LintCategory::Semantic);
    assert!(found[0].to_string().starts_with("2:3 [lowercase-keyword] warning"));
}

#[test]
fn schema_loaded_from_json() {
    let schema: FieldSchema = serde_json::from_str(
        r#"{"fields": {
            "age": {"fieldType": "number"},
            "tags": {"fieldType": "array"},
            "email": {"fieldType": "string", "operators": ["equals", "endsWith"]}
        }}"#,
    )
    .unwrap();
    let linter = DslLinter::default().with_schema(schema);

    assert!(linter
        .lint("age >= 18 AND tags contains \"vip\" AND email endsWith \".org\"")
        .is_empty());
    let found = linter.lint("email startsWith \"a\" OR phone == 1");
    assert_eq!(
        rules(&found),
        vec![LintRule::OperatorNotAllowed, LintRule::UnknownField]
    );
    assert!(found[0].message.contains("email"));
}

struct Prefixed(&'static str);

impl FieldLookup for Prefixed {
    fn lookup(&self, path: &str) -> Option<FieldInfo> {
        path.starts_with(self.0).then(|| FieldInfo {
            field_type: FieldType::Number,
            operators: Some(vec![CompareOp::Equals, CompareOp::GreaterThan]),
        })
    }
}

#[test]
fn custom_lookup() {
    let linter = DslLinter::default().with_schema(Prefixed("user."));
    assert!(linter.lint("user.age > 1 AND user.score == ${user.min}").is_empty());
    assert_eq!(
        rules(&linter.lint("user.age < 1")),
        vec![LintRule::OperatorNotAllowed]
    );
    assert_eq!(
        rules(&linter.lint("order.total == 1")),
        vec![LintRule::UnknownField]
    );
}

#[test]
fn config_from_json() {
    let config: LintConfig =
        serde_json::from_str(r#"{"disabled": ["trailing-whitespace", "line-too-long"]}"#).unwrap();
    assert_eq!(config.max_line_length, 120);
    assert!(!config.is_enabled(LintRule::TrailingWhitespace));
    assert!(config.is_enabled(LintRule::LowercaseKeyword));

    let linter = DslLinter::new(config);
    let conditions: Vec<String> = (0..20).map(|i| format!("f{i} == {i}")).collect();
    let long = format!("{}   ", conditions.join(" AND "));
    assert!(long.len() > 120);
    assert!(linter.lint(&long).is_empty());
}

#[test]
fn diagnostics_serialize_with_rule_ids() {
    let found = DslLinter::default().lint("NOT NOT a == 1");
    let json = serde_json::to_value(&found).unwrap();
    assert_eq!(json[0]["rule"], "double-negation");
    assert_eq!(json[0]["category"], "style");
    assert_eq!(json[0]["severity"], "warning");
    assert_eq!(json[0]["fix"]["edit"]["replacement"], "");
}
