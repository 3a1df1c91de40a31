mod strategies;

use proptest::prelude::*;
use rulespec::{
    build_complete_tree, export, flatten, parse, to_rule_node, to_specification, CommentPosition,
    ExportOptions, RoundTripValidator, Specification,
};
use strategies::{arb_annotated_specification, arb_specification};

fn arb_export_options() -> impl Strategy<Value = ExportOptions> {
    (
        any::<bool>(),
        1_usize..5,
        prop::sample::select(&[
            CommentPosition::Before,
            CommentPosition::After,
            CommentPosition::Inline,
        ][..]),
    )
        .prop_map(|(pretty, indent, position)| {
            ExportOptions::default()
                .with_pretty(pretty)
                .with_indent_width(indent)
                .with_comment_position(position)
        })
}

// ---------------------------------------------------------------------------
// Invariant 1: DSL re-parse stability
//
// Exporting a specification and parsing the text back yields the same
// specification, metadata included, whatever the layout options.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn reparse_is_stable(spec in arb_annotated_specification()) {
        let text = export(&spec, &ExportOptions::default()).unwrap();
        let back = parse(&text).unwrap();
        prop_assert_eq!(back.as_ref(), Some(&spec), "dsl was:\n{}", text);
    }

    #[test]
    fn reparse_is_stable_for_any_layout(
        spec in arb_annotated_specification(),
        options in arb_export_options(),
    ) {
        let text = export(&spec, &options).unwrap();
        let back = parse(&text).unwrap();
        prop_assert_eq!(back.as_ref(), Some(&spec), "dsl was:\n{}", text);
    }

    #[test]
    fn export_is_deterministic(spec in arb_specification(3)) {
        let options = ExportOptions::default();
        prop_assert_eq!(export(&spec, &options).unwrap(), export(&spec, &options).unwrap());
    }

    #[test]
    fn export_without_metadata_drops_only_metadata(spec in arb_annotated_specification()) {
        let text = export(&spec, &ExportOptions::default().with_metadata(false)).unwrap();
        prop_assert!(!text.contains("@meta"));
        let back = parse(&text).unwrap().unwrap();
        prop_assert_eq!(back.count(), spec.count());
        let mut annotated = 0;
        back.walk(&mut |s: &Specification| annotated += usize::from(s.metadata.is_some()));
        prop_assert_eq!(annotated, 0);
    }
}

// ---------------------------------------------------------------------------
// Invariant 2: Bridge idempotence
//
// Specification -> rule node -> specification is the identity, and the
// rule tree has one node per specification.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn bridge_round_trip_is_identity(spec in arb_annotated_specification()) {
        let node = to_rule_node(&spec).unwrap();
        prop_assert_eq!(node.count_nodes(), spec.count());
        let back = to_specification(&node).unwrap();
        prop_assert_eq!(back, spec);
    }

    #[test]
    fn bridge_ids_are_unique(spec in arb_specification(3)) {
        let node = to_rule_node(&spec).unwrap();
        let (map, roots) = flatten(std::slice::from_ref(&node));
        prop_assert_eq!(map.len(), spec.count());
        prop_assert_eq!(roots, vec![node.id.clone()]);
    }

    #[test]
    fn flatten_then_build_restores_tree(spec in arb_specification(3)) {
        let node = to_rule_node(&spec).unwrap();
        let (map, _) = flatten(std::slice::from_ref(&node));
        let rebuilt = build_complete_tree(&node.id, &map).unwrap();
        prop_assert_eq!(rebuilt, node);
    }

    #[test]
    fn json_round_trip(spec in arb_annotated_specification()) {
        let json = serde_json::to_string(&spec).unwrap();
        let back: Specification = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, spec);
    }
}

// ---------------------------------------------------------------------------
// Invariant 3: Full round trip
//
// Every rule tree built from a specification passes all four stages with no
// integrity warnings.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn validator_accepts_generated_trees(spec in arb_annotated_specification()) {
        let node = to_rule_node(&spec).unwrap();
        let result = RoundTripValidator::default().validate(&node);
        prop_assert!(result.success(), "{}\nerrors: {:?}", result, result.errors());
        prop_assert!(result.warnings().is_empty(), "warnings: {:?}", result.warnings());
        prop_assert_eq!(result.reparsed(), Some(&spec));
    }
}
