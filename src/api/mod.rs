//! Orchestration API for running a suite.
//!
//! [`run_suite`] and [`run_suite_concurrent`] wire a [`RegistryBuilder`], a
//! [`RunnerConfig`] and a set of features into a finished run. They return
//! the full [`SuiteReport`] together with a [`SuiteOutcome`] that a host maps
//! to a process exit code. They do not print to stdout/stderr or call
//! `std::process::exit`.

use std::sync::Arc;

use crate::config::RunnerConfig;
use crate::engine::{Observer, Runner};
use crate::error::Result;
use crate::model::Feature;
use crate::registry::RegistryBuilder;
use crate::report::SuiteReport;
use crate::world::World;


/// Outcome of a suite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteOutcome {
    /// Nothing fatal happened (exit code 0).
    Success,
    /// At least one fatal step outcome or hook failure was recorded.
    Failed {
        /// The exit code to report.
        code: i32,
    },
}

impl SuiteOutcome {
    /// Classifies a finished run under the strictness it was run with.
    #[must_use]
    pub fn from_report(report: &SuiteReport) -> Self {
        match report.exit_code() {
            0 => Self::Success,
            code => Self::Failed { code },
        }
    }

    /// Returns the process exit code.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed { code } => code,
        }
    }
}

/// A finished run: its classification and its full report.
#[derive(Debug, Clone)]
pub struct SuiteRun {
    /// Success or the exit code to report.
    pub outcome: SuiteOutcome,
    /// Every feature, scenario and step result.
    pub report: SuiteReport,
}

impl From<SuiteReport> for SuiteRun {
    fn from(report: SuiteReport) -> Self {
        Self {
            outcome: SuiteOutcome::from_report(&report),
            report,
        }
    }
}

/// Parameters for running a suite.
///
/// Groups the arguments of [`run_suite`] into a single struct to keep the
/// function signatures short.
pub struct SuiteParams<'a, W> {
    /// Definitions to build into the registry. Registration errors surface
    /// before any scenario runs.
    pub registry: RegistryBuilder<W>,
    /// Strictness, dry run, scenario selection and worker count.
    pub config: &'a RunnerConfig,
    /// Features to run, in report order.
    pub features: Vec<Feature>,
    /// Observers notified as the run progresses.
    pub observers: Vec<Arc<dyn Observer>>,
}

impl<W: World> SuiteParams<'_, W> {
    fn into_runner(self) -> Result<(Runner<W>, Vec<Feature>)> {
        let Self {
            registry,
            config,
            features,
            observers,
        } = self;

        let registry = Arc::new(registry.build()?);
        let runner = observers.into_iter().fold(
            Runner::from_config(registry, config)?,
            Runner::with_observer,
        );
        Ok((runner, features))
    }
}

/// Runs every feature in order on the calling thread.
///
/// # Errors
///
/// Returns `StepwrightError` variants:
/// - `Registration` if the registry fails to build.
/// - `TagFilter` if the configured tag expression does not parse.
///
/// Step, hook and world failures never surface here; they are recorded in
/// the report.
pub fn run_suite<W: World>(params: SuiteParams<'_, W>) -> Result<SuiteRun> {
    let (runner, features) = params.into_runner()?;
    Ok(runner.run(&features).into())
}

/// Runs features in parallel on `runtime`'s blocking pool, at most
/// `config.execution.workers` at a time.
///
/// Blocks the calling thread until the run completes, so it must not be
/// called from within an asynchronous context on `runtime`.
///
/// # Errors
///
/// As [`run_suite`], plus `Run` when a worker cannot be joined.
pub fn run_suite_concurrent<W: World>(
    params: SuiteParams<'_, W>,
    runtime: &tokio::runtime::Handle,
) -> Result<SuiteRun> {
    let (runner, features) = params.into_runner()?;
    let report = runtime.block_on(runner.run_concurrent(features))?;
    Ok(report.into())
}
