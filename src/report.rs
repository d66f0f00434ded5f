//! Structured run results.
//!
//! Every step attempted or skipped produces a [`StepReport`]; reports nest
//! into scenario, feature and suite reports. All report types serialise with
//! serde so a presenter can render them however it likes.

use std::error::Error as StdError;
use std::time::Duration;

use serde::Serialize;

use crate::model::Keyword;
use crate::registry::HookScope;
use crate::tags::TagSet;

/// The classification of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The invocable returned normally.
    Successful,
    /// The invocable, a chained sub-step, a transform, or a step hook failed.
    Failed,
    /// The invocable signalled work still to be done.
    Pending,
    /// No definition matched.
    Undefined,
    /// More than one definition matched.
    Ambiguous,
    /// The step was not attempted.
    Skipped,
}

impl Outcome {
    /// Returns whether the outcome makes a run fatal.
    ///
    /// `failed` and `ambiguous` always do; `undefined` and `pending` only do in
    /// strict mode.
    #[must_use]
    pub const fn is_fatal(self, strict: bool) -> bool {
        match self {
            Self::Failed | Self::Ambiguous => true,
            Self::Undefined | Self::Pending => strict,
            Self::Successful | Self::Skipped => false,
        }
    }

    /// Returns whether a scenario must skip its remaining steps after this
    /// outcome.
    #[must_use]
    pub const fn enters_failure_mode(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Pending | Self::Undefined | Self::Ambiguous
        )
    }
}

/// Why a step did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorDetail {
    /// The step signalled pending work.
    Pending {
        /// The optional pending message.
        message: Option<String>,
    },
    /// Several definitions matched.
    Ambiguous {
        /// The matching patterns in registration order.
        patterns: Vec<String>,
    },
    /// The step or something it depends on failed.
    Failed {
        /// The top-level error message.
        message: String,
        /// The messages of the error's cause chain, outermost first.
        causes: Vec<String>,
        /// The debug rendering of the error, including any captured backtrace.
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// A step hook failed around the step.
    Hook {
        /// The scope of the failing hook.
        scope: HookScope,
        /// The hook's error message.
        message: String,
    },
}

impl ErrorDetail {
    /// Builds a failure detail from a user-facing error report.
    #[must_use]
    pub fn from_report(report: &eyre::Report) -> Self {
        Self::Failed {
            message: report.to_string(),
            causes: report.chain().skip(1).map(ToString::to_string).collect(),
            details: Some(format!("{report:?}")),
        }
    }

    /// Builds a failure detail from a semantic error and its sources.
    ///
    /// `details` carries the debug rendering of the user error report that
    /// caused `error`, when there is one.
    #[must_use]
    pub fn from_error(error: &(dyn StdError + 'static), details: Option<&str>) -> Self {
        let causes = std::iter::successors(error.source(), |&cause| cause.source())
            .map(ToString::to_string)
            .collect();
        Self::Failed {
            message: error.to_string(),
            causes,
            details: details.map(str::to_owned),
        }
    }

    /// Returns a one-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Pending { message } => message
                .as_ref()
                .map_or_else(|| String::from("pending"), |text| format!("pending: {text}")),
            Self::Ambiguous { patterns } => format!("ambiguous: {}", patterns.join(", ")),
            Self::Failed { message, .. } => message.clone(),
            Self::Hook { scope, message } => format!("{scope} hook failed: {message}"),
        }
    }
}

/// The record of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// The step keyword.
    pub keyword: Keyword,
    /// The step text.
    pub text: String,
    /// The classification.
    pub outcome: Outcome,
    /// The raw captured arguments, before transformation.
    pub arguments: Vec<String>,
    /// The source of the matched pattern, when exactly one matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Why the step did not succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Wall-clock time spent on the step and its step hooks.
    pub duration: Duration,
}

/// A hook failure recorded against a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookFailure {
    /// The failing hook's scope.
    pub scope: HookScope,
    /// The error message.
    pub message: String,
    /// The messages of the error's cause chain.
    pub causes: Vec<String>,
}

impl HookFailure {
    /// Records a hook error.
    #[must_use]
    pub fn new(scope: HookScope, report: &eyre::Report) -> Self {
        Self {
            scope,
            message: report.to_string(),
            causes: report.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}

/// Terminal state of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Every step was attempted and succeeded.
    Completed,
    /// The scenario entered failure mode and skipped its remaining steps.
    Aborted,
}

/// Per-outcome step tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    /// Successful steps.
    pub successful: usize,
    /// Failed steps.
    pub failed: usize,
    /// Pending steps.
    pub pending: usize,
    /// Undefined steps.
    pub undefined: usize,
    /// Ambiguous steps.
    pub ambiguous: usize,
    /// Skipped steps.
    pub skipped: usize,
}

impl OutcomeCounts {
    /// Adds one step with `outcome`.
    pub const fn record(&mut self, outcome: Outcome) {
        let slot = match outcome {
            Outcome::Successful => &mut self.successful,
            Outcome::Failed => &mut self.failed,
            Outcome::Pending => &mut self.pending,
            Outcome::Undefined => &mut self.undefined,
            Outcome::Ambiguous => &mut self.ambiguous,
            Outcome::Skipped => &mut self.skipped,
        };
        *slot = slot.saturating_add(1);
    }

    /// Returns the tally for `outcome`.
    #[must_use]
    pub const fn get(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Successful => self.successful,
            Outcome::Failed => self.failed,
            Outcome::Pending => self.pending,
            Outcome::Undefined => self.undefined,
            Outcome::Ambiguous => self.ambiguous,
            Outcome::Skipped => self.skipped,
        }
    }

    /// Returns the number of steps counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.successful
            .saturating_add(self.failed)
            .saturating_add(self.pending)
            .saturating_add(self.undefined)
            .saturating_add(self.ambiguous)
            .saturating_add(self.skipped)
    }

    /// Returns whether any counted outcome is fatal.
    #[must_use]
    pub const fn has_fatal(&self, strict: bool) -> bool {
        self.failed > 0 || self.ambiguous > 0 || (strict && (self.undefined > 0 || self.pending > 0))
    }

    fn merge(&mut self, other: &Self) {
        self.successful = self.successful.saturating_add(other.successful);
        self.failed = self.failed.saturating_add(other.failed);
        self.pending = self.pending.saturating_add(other.pending);
        self.undefined = self.undefined.saturating_add(other.undefined);
        self.ambiguous = self.ambiguous.saturating_add(other.ambiguous);
        self.skipped = self.skipped.saturating_add(other.skipped);
    }
}

impl<'a> FromIterator<&'a StepReport> for OutcomeCounts {
    fn from_iter<I: IntoIterator<Item = &'a StepReport>>(iter: I) -> Self {
        let mut counts = Self::default();
        for step in iter {
            counts.record(step.outcome);
        }
        counts
    }
}

/// The record of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// The scenario name.
    pub name: String,
    /// The scenario's effective tags.
    pub tags: TagSet,
    /// Terminal state.
    pub status: ScenarioStatus,
    /// Step records in execution order.
    pub steps: Vec<StepReport>,
    /// Scenario-scope hook failures, plus step hook failures that did not
    /// change a step's outcome.
    pub hook_failures: Vec<HookFailure>,
}

impl ScenarioReport {
    /// Returns the step tallies.
    #[must_use]
    pub fn counts(&self) -> OutcomeCounts {
        self.steps.iter().collect()
    }

    /// Returns whether the scenario failed: a fatal step outcome or any hook
    /// failure.
    #[must_use]
    pub fn is_failed(&self, strict: bool) -> bool {
        !self.hook_failures.is_empty() || self.counts().has_fatal(strict)
    }
}

/// The record of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureReport {
    /// The feature name.
    pub name: String,
    /// The feature's tags.
    pub tags: TagSet,
    /// Reports of the selected scenarios, in order.
    pub scenarios: Vec<ScenarioReport>,
    /// Feature-scope hook failures.
    pub hook_failures: Vec<HookFailure>,
}

impl FeatureReport {
    /// Returns the step tallies across all scenarios.
    #[must_use]
    pub fn counts(&self) -> OutcomeCounts {
        self.scenarios
            .iter()
            .flat_map(|scenario| &scenario.steps)
            .collect()
    }

    /// Returns whether the feature failed: a failed scenario or a
    /// feature-scope hook failure.
    #[must_use]
    pub fn is_failed(&self, strict: bool) -> bool {
        !self.hook_failures.is_empty()
            || self
                .scenarios
                .iter()
                .any(|scenario| scenario.is_failed(strict))
    }
}

/// The aggregated result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Feature reports in input order.
    pub features: Vec<FeatureReport>,
    /// Suite-scope hook failures.
    pub hook_failures: Vec<HookFailure>,
    /// Step tallies across the whole run.
    pub counts: OutcomeCounts,
    /// Whether undefined and pending steps count as fatal.
    pub strict: bool,
}

impl SuiteReport {
    /// Aggregates feature reports.
    #[must_use]
    pub fn new(features: Vec<FeatureReport>, hook_failures: Vec<HookFailure>, strict: bool) -> Self {
        let mut counts = OutcomeCounts::default();
        for feature in &features {
            counts.merge(&feature.counts());
        }
        Self {
            features,
            hook_failures,
            counts,
            strict,
        }
    }

    /// Returns whether the run is fatal under the given strictness.
    #[must_use]
    pub fn has_fatal(&self, strict: bool) -> bool {
        self.counts.has_fatal(strict)
            || !self.hook_failures.is_empty()
            || self.features.iter().any(|feature| {
                !feature.hook_failures.is_empty()
                    || feature
                        .scenarios
                        .iter()
                        .any(|scenario| !scenario.hook_failures.is_empty())
            })
    }

    /// Returns the process exit code for the run: `0` when nothing fatal
    /// happened under the report's strictness, `1` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_fatal(self.strict))
    }

    /// Returns the number of scenarios run.
    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.features
            .iter()
            .map(|feature| feature.scenarios.len())
            .sum()
    }

    /// Returns the number of failed scenarios.
    #[must_use]
    pub fn failed_scenario_count(&self) -> usize {
        self.features
            .iter()
            .flat_map(|feature| &feature.scenarios)
            .filter(|scenario| scenario.is_failed(self.strict))
            .count()
    }

    /// Returns the number of failed features.
    #[must_use]
    pub fn failed_feature_count(&self) -> usize {
        self.features
            .iter()
            .filter(|feature| feature.is_failed(self.strict))
            .count()
    }
}
