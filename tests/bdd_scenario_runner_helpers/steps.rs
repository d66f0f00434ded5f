//! Given/when steps for scenario runner behavioural tests.

use std::sync::Arc;

use eyre::{bail, ensure};
use rstest_bdd_macros::{given, when};
use stepwright::model::{Feature, Scenario, Step};
use stepwright::error::RegistrationError;
use stepwright::{HookScope, Pending, RegistryBuilder, Runner, World};

use super::StepResult;
use super::state::{Journal, RunnerState};

/// The world the sample definitions work on.
#[derive(Debug, Default)]
struct Notebook {
    entries: Vec<String>,
    coins: u32,
}

impl World for Notebook {
    fn new() -> eyre::Result<Self> {
        Ok(Self::default())
    }
}

#[derive(Debug)]
struct Coins(u32);

const SCOPES: [HookScope; 8] = [
    HookScope::BeforeSuite,
    HookScope::AfterSuite,
    HookScope::BeforeFeature,
    HookScope::AfterFeature,
    HookScope::BeforeScenario,
    HookScope::AfterScenario,
    HookScope::BeforeStep,
    HookScope::AfterStep,
];

fn catalogue(name: &str) -> StepResult<Vec<String>> {
    let steps: &[&str] = match name {
        "captures" => &[r#"some step with "string" argument"#, "number step with 23"],
        "failing" => &[
            r#"some step with "string" argument"#,
            "number step with 13",
            "a step nobody defined",
        ],
        "pending" => &["a pending step", "number step with 23"],
        "ambiguous" => &["an ambiguous step", "number step with 23"],
        "chained" => &["a chained step", "the notebook holds 2 entries"],
        "broken-chain" => &["a broken chain"],
        "transformed" => &["I pocket 5 coins", "my pocket holds 5 coins"],
        other => return Err(format!("no scenario named {other}")),
    };
    Ok(steps.iter().map(|text| (*text).to_owned()).collect())
}

fn definitions(builder: &mut RegistryBuilder<Notebook>) -> Result<(), RegistrationError> {
    builder
        .step(r#"^some step with "([^"]*)" argument$"#, |notebook: &mut Notebook, args| {
            let text: &String = args.get(0)?;
            notebook.entries.push(text.clone());
            Ok(())
        })?
        .step(r"^number step with (\d+)$", |notebook: &mut Notebook, args| {
            let number: u32 = args.parse(0)?;
            if number == 13 {
                bail!("unlucky number");
            }
            notebook.entries.push(number.to_string());
            Ok(())
        })?
        .step("a pending step", |_, _| -> eyre::Result<()> {
            Err(Pending::with_message("not written yet").into())
        })?
        .step("^an ambiguous (step)$", |_, _| Ok(()))?
        .step("^an (ambiguous) step$", |_, _| Ok(()))?
        .step("a chained step", |_, _| {
            Ok(vec![
                Step::given("number step with 23"),
                Step::given(r#"some step with "chained" argument"#),
            ])
        })?
        .step("a broken chain", |_, _| Ok(Step::given("number step with 13")))?
        .step(
            "the notebook holds {count:usize} entries",
            |notebook: &mut Notebook, args| {
                let expected: usize = args.parse(0)?;
                ensure!(
                    notebook.entries.len() == expected,
                    "notebook holds {:?}",
                    notebook.entries
                );
                Ok(())
            },
        )?
        .transform(r"^(\d+) coins$", |_, captures| {
            let amount = captures
                .first()
                .ok_or_else(|| eyre::eyre!("no amount captured"))?
                .parse()?;
            Ok(Coins(amount))
        })?
        .step("I pocket {amount}", |notebook: &mut Notebook, args| {
            let Coins(amount) = args.get::<Coins>(0)?;
            notebook.coins += amount;
            Ok(())
        })?
        .step(
            "my pocket holds {amount:u32} coins",
            |notebook: &mut Notebook, args| {
                let expected: u32 = args.parse(0)?;
                ensure!(notebook.coins == expected, "pocket holds {}", notebook.coins);
                Ok(())
            },
        )?;
    Ok(())
}

/// Registers failing hooks first, so they pre-empt the journal hooks of the
/// same before-scope.
fn hooks(builder: &mut RegistryBuilder<Notebook>, failing: &[HookScope], journal: &Journal) {
    for &scope in failing {
        builder.hook(scope, None, move |_| bail!("{scope} hook failed"));
    }
    for scope in SCOPES {
        let sink = Arc::clone(journal);
        builder.hook(scope, None, move |_| {
            sink.lock()
                .map_err(|_| eyre::eyre!("journal lock poisoned"))?
                .push(scope.to_string());
            Ok(())
        });
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Lenient,
    Strict,
    DryRun,
}

fn run(runner_state: &RunnerState, mode: Mode) -> StepResult<()> {
    let steps = runner_state
        .steps
        .get()
        .ok_or_else(|| String::from("steps should be set"))?;
    let failing = runner_state.failing_hooks.get().unwrap_or_default();
    let journal = runner_state
        .journal
        .get()
        .ok_or_else(|| String::from("journal should be set"))?;

    let mut builder = RegistryBuilder::new();
    definitions(&mut builder).map_err(|e| e.to_string())?;
    hooks(&mut builder, &failing, &journal);
    let registry = builder.build().map_err(|e| e.to_string())?;
    let runner = Runner::new(Arc::new(registry));
    let runner = match mode {
        Mode::Lenient => runner,
        Mode::Strict => runner.strict(),
        Mode::DryRun => runner.dry_run(),
    };

    let scenario = Scenario::new(
        "scenario under test",
        steps.into_iter().map(Step::given).collect(),
    );
    let feature = Feature::new("behaviour", vec![scenario.into()]);
    runner_state.report.set(runner.run(&[feature]));
    Ok(())
}

#[given("the scenario named {name}")]
fn given_named_scenario(runner_state: &RunnerState, name: String) -> StepResult<()> {
    runner_state.steps.set(catalogue(&name)?);
    Ok(())
}

#[given("a failing {scope} hook")]
fn given_failing_hook(runner_state: &RunnerState, scope: String) -> StepResult<()> {
    let parsed = SCOPES
        .into_iter()
        .find(|candidate| candidate.to_string() == scope)
        .ok_or_else(|| format!("unknown hook scope {scope}"))?;
    let mut failing = runner_state.failing_hooks.get().unwrap_or_default();
    failing.push(parsed);
    runner_state.failing_hooks.set(failing);
    Ok(())
}

#[when("the scenario runs")]
fn when_scenario_runs(runner_state: &RunnerState) -> StepResult<()> {
    run(runner_state, Mode::Lenient)
}

#[when("the scenario runs in strict mode")]
fn when_scenario_runs_strict(runner_state: &RunnerState) -> StepResult<()> {
    run(runner_state, Mode::Strict)
}

#[when("the scenario runs as a dry run")]
fn when_scenario_runs_dry(runner_state: &RunnerState) -> StepResult<()> {
    run(runner_state, Mode::DryRun)
}
