//! Unit tests for the scenario runner.
//!
//! - [`hooks`] - Hook failure policies and world construction
//! - [`selection`] - Tag selection, dry runs and strictness
//! - [`events`] - Observer notifications and concurrent runs


use std::sync::{Arc, Mutex};

use eyre::{bail, ensure};
use rstest::fixture;

use crate::error::Pending;
use crate::model::{Feature, Scenario, Step};
use crate::registry::{HookScope, RegistryBuilder};
use crate::report::{Outcome, ScenarioReport, SuiteReport};
use crate::world::World;

use super::Runner;

/// An account the steps under test operate on.
#[derive(Debug, Default)]
pub struct Ledger {
    balance: i64,
}

impl World for Ledger {
    fn new() -> eyre::Result<Self> {
        Ok(Self::default())
    }
}

/// Ordered record of hook invocations, shared with hook closures.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .expect("journal lock should not be poisoned")
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0
            .lock()
            .expect("journal lock should not be poisoned")
            .clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|seen| *seen == entry).count()
    }
}

#[fixture]
pub fn journal() -> Journal {
    Journal::default()
}

/// A builder with the ledger steps registered and no hooks.
#[fixture]
pub fn builder() -> RegistryBuilder<Ledger> {
    let mut builder = RegistryBuilder::new();
    builder
        .given("a balance of {amount:i64}", |ledger: &mut Ledger, args| {
            ledger.balance = args.parse(0)?;
            Ok(())
        })
        .expect("step should register")
        .when("I withdraw {amount:i64}", |ledger: &mut Ledger, args| {
            let amount: i64 = args.parse(0)?;
            if amount > ledger.balance {
                bail!("insufficient funds");
            }
            ledger.balance -= amount;
            Ok(())
        })
        .expect("step should register")
        .then("the balance is {amount:i64}", |ledger: &mut Ledger, args| {
            let expected: i64 = args.parse(0)?;
            ensure!(ledger.balance == expected, "balance is {}", ledger.balance);
            Ok(())
        })
        .expect("step should register")
        .then("the audit is pending", |_, _| -> eyre::Result<()> {
            Err(Pending::with_message("audit rules not written").into())
        })
        .expect("step should register")
        .when("the vault jams", |_, _| -> eyre::Result<()> {
            panic!("vault mechanism jammed")
        })
        .expect("step should register")
        .when("a transfer to {account}", |_, _| Ok(()))
        .expect("step should register")
        .when("a transfer to {account:u32}", |_, _| Ok(()))
        .expect("step should register");
    builder
}

pub fn runner(builder: RegistryBuilder<Ledger>) -> Runner<Ledger> {
    Runner::new(Arc::new(builder.build().expect("registry should build")))
}

pub fn scenario(name: &str, steps: &[&str]) -> Scenario {
    Scenario::new(name, steps.iter().map(|text| Step::given(*text)).collect())
}

pub fn feature(name: &str, scenarios: Vec<Scenario>) -> Feature {
    Feature::new(name, scenarios.into_iter().map(Into::into).collect())
}

pub fn outcomes(report: &ScenarioReport) -> Vec<Outcome> {
    report.steps.iter().map(|step| step.outcome).collect()
}

/// Returns the only scenario of a single-feature, single-scenario run.
pub fn only_scenario(report: &SuiteReport) -> &ScenarioReport {
    let [feature] = report.features.as_slice() else {
        panic!("expected one feature, got {}", report.features.len());
    };
    let [scenario] = feature.scenarios.as_slice() else {
        panic!("expected one scenario, got {}", feature.scenarios.len());
    };
    scenario
}

/// Records every boundary of a run in `journal`.
pub fn trace_boundaries(builder: &mut RegistryBuilder<Ledger>, journal: &Journal) {
    let entries = [
        (HookScope::BeforeSuite, "before-suite"),
        (HookScope::AfterSuite, "after-suite"),
        (HookScope::BeforeFeature, "before-feature"),
        (HookScope::AfterFeature, "after-feature"),
        (HookScope::BeforeScenario, "before-scenario"),
        (HookScope::AfterScenario, "after-scenario"),
        (HookScope::BeforeStep, "before-step"),
        (HookScope::AfterStep, "after-step"),
    ];
    for (scope, entry) in entries {
        let sink = journal.clone();
        builder.hook(scope, None, move |_| {
            sink.push(entry);
            Ok(())
        });
    }
}
