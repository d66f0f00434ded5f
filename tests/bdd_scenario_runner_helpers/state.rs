//! Scenario state for runner behavioural tests.

use std::sync::{Arc, Mutex};

use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use stepwright::HookScope;
use stepwright::report::SuiteReport;

/// Hook invocations in the order they happened.
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Default, ScenarioState)]
pub(crate) struct RunnerState {
    /// Step texts of the scenario under test.
    pub(crate) steps: Slot<Vec<String>>,
    /// Scopes that get a failing hook ahead of the journal hooks.
    pub(crate) failing_hooks: Slot<Vec<HookScope>>,
    /// Shared with the journal hooks of the run.
    pub(crate) journal: Slot<Journal>,
    /// The finished run.
    pub(crate) report: Slot<SuiteReport>,
}

#[fixture]
pub(crate) fn runner_state() -> RunnerState {
    let state = RunnerState::default();
    state.failing_hooks.set(Vec::new());
    state.journal.set(Journal::default());
    state
}
