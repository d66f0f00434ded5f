//! Assertion helpers for scenario runner behavioural tests.

use rstest_bdd_macros::then;
use stepwright::report::{ErrorDetail, ScenarioReport, ScenarioStatus, StepReport, SuiteReport};

use super::StepResult;
use super::state::RunnerState;

fn report(runner_state: &RunnerState) -> StepResult<SuiteReport> {
    runner_state
        .report
        .get()
        .ok_or_else(|| String::from("report should be set"))
}

fn only_scenario(report: &SuiteReport) -> StepResult<&ScenarioReport> {
    report
        .features
        .first()
        .and_then(|feature| feature.scenarios.first())
        .ok_or_else(|| String::from("the run should contain a scenario"))
}

fn step_at(scenario: &ScenarioReport, index: usize) -> StepResult<&StepReport> {
    index
        .checked_sub(1)
        .and_then(|position| scenario.steps.get(position))
        .ok_or_else(|| format!("scenario has no step {index}"))
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',').map(|item| item.trim().to_owned()).collect()
}

#[then("the outcomes are {expected}")]
fn outcomes_are(runner_state: &RunnerState, expected: String) -> StepResult<()> {
    let report = report(runner_state)?;
    let actual: Vec<String> = only_scenario(&report)?
        .steps
        .iter()
        .map(|step| {
            serde_json::to_value(step.outcome)
                .ok()
                .and_then(|value| value.as_str().map(str::to_owned))
                .unwrap_or_default()
        })
        .collect();
    let wanted = split_list(&expected);
    if actual == wanted {
        Ok(())
    } else {
        Err(format!("expected outcomes {wanted:?}, got {actual:?}"))
    }
}

#[then("step {index} captured {arguments}")]
fn step_captured(runner_state: &RunnerState, index: usize, arguments: String) -> StepResult<()> {
    let report = report(runner_state)?;
    let step = step_at(only_scenario(&report)?, index)?;
    let wanted = split_list(&arguments);
    if step.arguments == wanted {
        Ok(())
    } else {
        Err(format!(
            "expected step {index} to capture {wanted:?}, got {:?}",
            step.arguments
        ))
    }
}

#[then("step {index} failed with a message containing {fragment}")]
fn step_failed_with(runner_state: &RunnerState, index: usize, fragment: String) -> StepResult<()> {
    let report = report(runner_state)?;
    let step = step_at(only_scenario(&report)?, index)?;
    let Some(ErrorDetail::Failed {
        message, causes, ..
    }) = &step.error
    else {
        return Err(format!("expected step {index} to fail, got {:?}", step.error));
    };
    if std::iter::once(message)
        .chain(causes)
        .any(|text| text.contains(&fragment))
    {
        Ok(())
    } else {
        Err(format!(
            "expected '{fragment}' in '{message}' or its causes {causes:?}"
        ))
    }
}

#[then("the exit code is {code}")]
fn exit_code_is(runner_state: &RunnerState, code: i32) -> StepResult<()> {
    let actual = report(runner_state)?.exit_code();
    if actual == code {
        Ok(())
    } else {
        Err(format!("expected exit code {code}, got {actual}"))
    }
}

#[then("the scenario is aborted")]
fn scenario_is_aborted(runner_state: &RunnerState) -> StepResult<()> {
    expect_status(runner_state, ScenarioStatus::Aborted)
}

#[then("the scenario is completed")]
fn scenario_is_completed(runner_state: &RunnerState) -> StepResult<()> {
    expect_status(runner_state, ScenarioStatus::Completed)
}

fn expect_status(runner_state: &RunnerState, expected: ScenarioStatus) -> StepResult<()> {
    let report = report(runner_state)?;
    let status = only_scenario(&report)?.status;
    if status == expected {
        Ok(())
    } else {
        Err(format!("expected {expected:?}, got {status:?}"))
    }
}

#[then("the scenario records {count} hook failure")]
fn scenario_records_hook_failures(runner_state: &RunnerState, count: usize) -> StepResult<()> {
    let report = report(runner_state)?;
    let failures = &only_scenario(&report)?.hook_failures;
    if failures.len() == count {
        Ok(())
    } else {
        Err(format!("expected {count} hook failures, got {failures:?}"))
    }
}

#[then("the hooks fired in order {expected}")]
fn hooks_fired_in_order(runner_state: &RunnerState, expected: String) -> StepResult<()> {
    let journal = runner_state
        .journal
        .get()
        .ok_or_else(|| String::from("journal should be set"))?;
    let fired = journal
        .lock()
        .map_err(|_| String::from("journal lock poisoned"))?
        .clone();
    let wanted = split_list(&expected);
    if fired == wanted {
        Ok(())
    } else {
        Err(format!("expected hooks {wanted:?}, got {fired:?}"))
    }
}
