//! Four-stage fidelity check: rule node → specification → DSL →
//! specification → rule node.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::bridge::{to_rule_node, to_specification};
use crate::export::{export, ExportOptions};
use crate::parse::{parse, ParseError};
use crate::types::{
    BridgeError, CodecError, ErrorCode, Location, RoundTripResult, RoundTripTestCase, RuleNode,
    Stage, StageResult, TestCaseOutcome, TestSuiteReport, ValidationError,
};

/// Which integrity checks run and how the DSL leg is formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoundTripOptions {
    pub export: ExportOptions,
    pub check_metadata: bool,
    pub check_logic: bool,
}

impl Default for RoundTripOptions {
    fn default() -> Self {
        Self {
            export: ExportOptions::default(),
            check_metadata: true,
            check_logic: true,
        }
    }
}

impl RoundTripOptions {
    #[must_use]
    pub fn with_export(mut self, export: ExportOptions) -> Self {
        self.export = export;
        self
    }

    #[must_use]
    pub fn with_metadata_check(mut self, check: bool) -> Self {
        self.check_metadata = check;
        self
    }

    #[must_use]
    pub fn with_logic_check(mut self, check: bool) -> Self {
        self.check_logic = check;
        self
    }
}

/// Errors a stage can fail with.
trait StageError: fmt::Display {
    fn location(&self) -> Option<Location> {
        None
    }
}

impl StageError for BridgeError {}

impl StageError for CodecError {}

impl StageError for ParseError {
    fn location(&self) -> Option<Location> {
        Some(ParseError::location(self))
    }
}

/// Runs round trips over embedded rule trees.
#[derive(Debug, Clone, Default)]
pub struct RoundTripValidator {
    options: RoundTripOptions,
}

impl RoundTripValidator {
    #[must_use]
    pub fn new(options: RoundTripOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &RoundTripOptions {
        &self.options
    }

    /// Push `node` through all four stages. A failed stage is recorded as an
    /// error and the stages after it are marked skipped. When every stage
    /// passes, the reconstructed tree is compared with the original and any
    /// drift is reported as warnings.
    ///
    /// `node` must be an embedded tree; use
    /// [`build_complete_tree`](crate::build_complete_tree) on flat storage
    /// first.
    pub fn validate(&self, node: &RuleNode) -> RoundTripResult {
        let started = Instant::now();
        let mut result = RoundTripResult::new(node.clone());
        debug!(node = %node.id, nodes = node.count_nodes(), "round trip started");

        self.run_stages(&mut result, node);
        if result.stages.iter().all(|s| s.success) {
            if let Some(rebuilt) = &result.reconstructed {
                let mut warnings = Vec::new();
                if node.count_nodes() != rebuilt.count_nodes() {
                    warnings.push(
                        ValidationError::warning(
                            ErrorCode::RoundTripNodeCount,
                            format!(
                                "node count changed from {} to {}",
                                node.count_nodes(),
                                rebuilt.count_nodes()
                            ),
                        )
                        .on_node(&node.id),
                    );
                }
                self.compare(node, rebuilt, &mut warnings);
                result.warnings = warnings;
            }
        }

        result.duration = started.elapsed();
        debug!(
            node = %node.id,
            success = result.success(),
            warnings = result.warnings.len(),
            elapsed = ?result.duration,
            "round trip finished"
        );
        result
    }

    fn run_stages(&self, result: &mut RoundTripResult, node: &RuleNode) {
        let Some(spec) = run_stage(result, Stage::VisualToSpec, ErrorCode::BridgeError, || {
            to_specification(node)
        }) else {
            return;
        };
        result.specification = Some(spec.clone());

        let Some(dsl) = run_stage(result, Stage::SpecToDsl, ErrorCode::CodecError, || {
            export(&spec, &self.options.export)
        }) else {
            return;
        };
        result.dsl = Some(dsl.clone());

        let Some(reparsed) = run_stage(result, Stage::DslToSpec, ErrorCode::ParseError, || {
            parse(&dsl).and_then(|parsed| {
                parsed.ok_or_else(|| {
                    ParseError::new("dsl output is empty", Location { line: 1, column: 1 })
                })
            })
        }) else {
            return;
        };
        result.reparsed = Some(reparsed.clone());

        if let Some(rebuilt) = run_stage(result, Stage::SpecToVisual, ErrorCode::BridgeError, || {
            to_rule_node(&reparsed)
        }) {
            result.reconstructed = Some(rebuilt);
        }
    }

    /// Walk both trees in lockstep. A type or child-count mismatch stops the
    /// walk below that node; siblings are still compared.
    fn compare(&self, original: &RuleNode, rebuilt: &RuleNode, warnings: &mut Vec<ValidationError>) {
        if original.node_type() != rebuilt.node_type()
            || original.children.len() != rebuilt.children.len()
        {
            warnings.push(
                ValidationError::warning(
                    ErrorCode::RoundTripStructure,
                    format!(
                        "structure changed: {} with {} children became {} with {} children",
                        original.node_type(),
                        original.children.len(),
                        rebuilt.node_type(),
                        rebuilt.children.len()
                    ),
                )
                .on_node(&original.id),
            );
            return;
        }

        if self.options.check_metadata && original.metadata != rebuilt.metadata {
            warnings.push(
                ValidationError::warning(ErrorCode::RoundTripMetadata, "metadata was not preserved")
                    .on_node(&original.id),
            );
        }

        if self.options.check_logic
            && serde_json::to_value(&original.config).ok()
                != serde_json::to_value(&rebuilt.config).ok()
        {
            warnings.push(
                ValidationError::warning(
                    ErrorCode::RoundTripLogic,
                    format!("{} configuration changed", original.node_type()),
                )
                .on_node(&original.id),
            );
        }

        for (a, b) in original.embedded_children().zip(rebuilt.embedded_children()) {
            self.compare(a, b, warnings);
        }
    }

    /// Validate every case and check it against its expectation.
    pub fn run_suite(&self, cases: &[RoundTripTestCase]) -> TestSuiteReport {
        let started = Instant::now();
        let outcomes: Vec<TestCaseOutcome> = cases
            .iter()
            .map(|case| {
                let result = self.validate(&case.input);
                let expected = case.expected.clone().unwrap_or_default();
                let mut failures = Vec::new();

                if result.success() != expected.should_succeed {
                    failures.push(if expected.should_succeed {
                        "expected the round trip to succeed".to_owned()
                    } else {
                        "expected the round trip to fail".to_owned()
                    });
                }
                for needle in &expected.errors_contain {
                    if !result.errors().iter().any(|e| e.message.contains(needle)) {
                        failures.push(format!("no error containing {needle:?}"));
                    }
                }
                for needle in &expected.warnings_contain {
                    if !result.warnings().iter().any(|w| w.message.contains(needle)) {
                        failures.push(format!("no warning containing {needle:?}"));
                    }
                }

                trace!(case = %case.name, passed = failures.is_empty(), "test case finished");
                TestCaseOutcome {
                    name: case.name.clone(),
                    passed: failures.is_empty(),
                    failures,
                    result,
                }
            })
            .collect();

        let report = TestSuiteReport {
            outcomes,
            duration: started.elapsed(),
        };
        debug!(
            total = report.total(),
            passed = report.passed(),
            "round trip suite finished"
        );
        report
    }
}

/// Run one stage, recording its outcome. On failure the error is tied to
/// the root node and every later stage is marked skipped.
fn run_stage<T, E: StageError>(
    result: &mut RoundTripResult,
    stage: Stage,
    code: ErrorCode,
    f: impl FnOnce() -> Result<T, E>,
) -> Option<T> {
    let started = Instant::now();
    let outcome = f();
    let elapsed = started.elapsed();
    match outcome {
        Ok(value) => {
            trace!(%stage, ?elapsed, "stage passed");
            result.stages[stage.index()] = StageResult::passed(elapsed);
            Some(value)
        }
        Err(e) => {
            warn!(%stage, error = %e, "round trip stage failed");
            result.stages[stage.index()] = StageResult::failed(elapsed, e.to_string());
            let mut error = ValidationError::error(code, format!("{stage} failed: {e}"))
                .on_node(&result.original.id);
            if let Some(location) = e.location() {
                error = error.at(location);
            }
            result.errors.push(error);
            for later in &mut result.stages[stage.index() + 1..] {
                *later = StageResult::skipped();
            }
            None
        }
    }
}
