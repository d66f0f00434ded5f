//! Run progress events for external presenters.

use serde::Serialize;

use crate::report::{HookFailure, OutcomeCounts, ScenarioStatus, StepReport};

/// A progress event emitted while a run executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// The run started.
    SuiteStarted {
        /// The number of features to run.
        features: usize,
    },
    /// A feature started.
    FeatureStarted {
        /// The feature name.
        name: String,
    },
    /// A scenario started.
    ScenarioStarted {
        /// The enclosing feature.
        feature: String,
        /// The scenario name.
        name: String,
    },
    /// A step finished or was skipped.
    StepFinished {
        /// The enclosing feature.
        feature: String,
        /// The enclosing scenario.
        scenario: String,
        /// The step record.
        step: StepReport,
    },
    /// A hook failed.
    HookFailed {
        /// The enclosing feature, outside suite scope.
        feature: Option<String>,
        /// The enclosing scenario, in scenario and step scope.
        scenario: Option<String>,
        /// The failure.
        failure: HookFailure,
    },
    /// A scenario finished.
    ScenarioFinished {
        /// The enclosing feature.
        feature: String,
        /// The scenario name.
        name: String,
        /// Terminal state.
        status: ScenarioStatus,
        /// Whether the scenario failed.
        failed: bool,
    },
    /// A feature finished.
    FeatureFinished {
        /// The feature name.
        name: String,
    },
    /// The run finished.
    SuiteFinished {
        /// Step tallies across the run.
        counts: OutcomeCounts,
    },
}

/// Receives [`RunEvent`]s as a run progresses.
///
/// Observers are called synchronously from whichever worker runs the feature,
/// so events of different features may interleave in concurrent runs.
pub trait Observer: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &RunEvent);
}
