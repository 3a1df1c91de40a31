use std::fmt;
use std::time::Duration;

use super::{RuleNode, Specification, ValidationError};

/// The four conversions of a round trip, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    VisualToSpec,
    SpecToDsl,
    DslToSpec,
    SpecToVisual,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::VisualToSpec,
        Stage::SpecToDsl,
        Stage::DslToSpec,
        Stage::SpecToVisual,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::VisualToSpec => "visual-to-spec",
            Stage::SpecToDsl => "spec-to-dsl",
            Stage::DslToSpec => "dsl-to-spec",
            Stage::SpecToVisual => "spec-to-visual",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Stage::VisualToSpec => 0,
            Stage::SpecToDsl => 1,
            Stage::DslToSpec => 2,
            Stage::SpecToVisual => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageResult {
    pub success: bool,
    /// An earlier stage failed, so this one never ran.
    pub skipped: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

impl StageResult {
    pub(crate) fn passed(duration: Duration) -> Self {
        Self {
            success: true,
            skipped: false,
            duration,
            error: None,
        }
    }

    pub(crate) fn failed(duration: Duration, error: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: false,
            duration,
            error: Some(error.into()),
        }
    }

    pub(crate) fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Everything a round trip produced, returned by
/// [`RoundTripValidator::validate()`](crate::RoundTripValidator::validate).
///
/// Intermediate artifacts are present up to the stage that failed.
#[derive(Debug, Clone)]
#[must_use]
pub struct RoundTripResult {
    pub(crate) original: RuleNode,
    pub(crate) specification: Option<Specification>,
    pub(crate) dsl: Option<String>,
    pub(crate) reparsed: Option<Specification>,
    pub(crate) reconstructed: Option<RuleNode>,
    pub(crate) errors: Vec<ValidationError>,
    pub(crate) warnings: Vec<ValidationError>,
    pub(crate) stages: [StageResult; 4],
    pub(crate) duration: Duration,
}

impl RoundTripResult {
    pub(crate) fn new(original: RuleNode) -> Self {
        Self {
            original,
            specification: None,
            dsl: None,
            reparsed: None,
            reconstructed: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            stages: Default::default(),
            duration: Duration::ZERO,
        }
    }

    /// All stages succeeded and no errors were recorded. Warnings from the
    /// integrity checks do not affect this.
    #[must_use]
    pub fn success(&self) -> bool {
        self.errors.is_empty() && self.stages.iter().all(|s| s.success)
    }

    #[must_use]
    pub fn original(&self) -> &RuleNode {
        &self.original
    }

    #[must_use]
    pub fn specification(&self) -> Option<&Specification> {
        self.specification.as_ref()
    }

    #[must_use]
    pub fn dsl(&self) -> Option<&str> {
        self.dsl.as_deref()
    }

    #[must_use]
    pub fn reparsed(&self) -> Option<&Specification> {
        self.reparsed.as_ref()
    }

    #[must_use]
    pub fn reconstructed(&self) -> Option<&RuleNode> {
        self.reconstructed.as_ref()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    #[must_use]
    pub fn warnings(&self) -> &[ValidationError] {
        &self.warnings
    }

    #[must_use]
    pub fn stage(&self, stage: Stage) -> &StageResult {
        &self.stages[stage.index()]
    }

    pub fn stages(&self) -> impl Iterator<Item = (Stage, &StageResult)> {
        Stage::ALL.into_iter().zip(self.stages.iter())
    }

    /// Wall-clock duration of the whole round trip.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for RoundTripResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success() { "passed" } else { "failed" };
        write!(f, "round trip {status}")?;
        for (stage, result) in self.stages() {
            let outcome = if result.skipped {
                "skipped"
            } else if result.success {
                "ok"
            } else {
                "failed"
            };
            write!(f, ", {stage}: {outcome}")?;
        }
        write!(
            f,
            ", errors: {}, warnings: {}, duration: {:?}",
            self.errors.len(),
            self.warnings.len(),
            self.duration
        )
    }
}

/// What a test case expects from its round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub should_succeed: bool,
    /// Each string must appear in some error message.
    pub errors_contain: Vec<String>,
    /// Each string must appear in some warning message.
    pub warnings_contain: Vec<String>,
}

impl Default for Expectation {
    fn default() -> Self {
        Self {
            should_succeed: true,
            errors_contain: Vec::new(),
            warnings_contain: Vec::new(),
        }
    }
}

/// A named input for [`RoundTripValidator::run_suite()`](crate::RoundTripValidator::run_suite).
#[derive(Debug, Clone)]
pub struct RoundTripTestCase {
    pub name: String,
    pub input: RuleNode,
    /// Without an expectation a case passes when its round trip succeeds.
    pub expected: Option<Expectation>,
}

impl RoundTripTestCase {
    #[must_use]
    pub fn new(name: impl Into<String>, input: RuleNode) -> Self {
        Self {
            name: name.into(),
            input,
            expected: None,
        }
    }

    #[must_use]
    pub fn expecting(mut self, expectation: Expectation) -> Self {
        self.expected = Some(expectation);
        self
    }
}

/// Outcome of one test case.
#[derive(Debug, Clone)]
pub struct TestCaseOutcome {
    pub name: String,
    pub passed: bool,
    /// Why the case failed, one entry per unmet expectation.
    pub failures: Vec<String>,
    pub result: RoundTripResult,
}

/// Aggregate of a test-suite run.
#[derive(Debug, Clone)]
#[must_use]
pub struct TestSuiteReport {
    pub(crate) outcomes: Vec<TestCaseOutcome>,
    pub(crate) duration: Duration,
}

impl TestSuiteReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    #[must_use]
    pub fn outcomes(&self) -> &[TestCaseOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for TestSuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed of {} ({:?})",
            self.passed(),
            self.failed(),
            self.total(),
            self.duration
        )?;
        for outcome in self.outcomes.iter().filter(|o| !o.passed) {
            write!(f, "\n  {}: {}", outcome.name, outcome.failures.join("; "))?;
        }
        Ok(())
    }
}
