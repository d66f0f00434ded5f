//! Scenario runner: step sequencing, failure mode, hooks and aggregation.

use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use tracing::{Instrument, Span, debug, debug_span, warn};

use crate::config::RunnerConfig;
use crate::error::{Result, RunError, StepwrightError, TagFilterError};
use crate::model::{Feature, Scenario, Step};
use crate::registry::{HookScope, Registry};
use crate::report::{
    ErrorDetail, FeatureReport, HookFailure, Outcome, ScenarioReport, ScenarioStatus,
    StepReport, SuiteReport,
};
use crate::tags::{TagFilter, TagSet};
use crate::world::World;

use super::executor::{Executor, skipped};
use super::guarded;
use super::hooks::{HookContext, fire};
use super::observer::{Observer, RunEvent};

#[cfg(test)]
mod tests;

/// Worker count used when none is configured.
const DEFAULT_WORKERS: usize = 4;

/// Drives features through the registry and collects their reports.
///
/// A runner is cheap to clone; clones share the registry and observers.
pub struct Runner<W> {
    registry: Arc<Registry<W>>,
    strict: bool,
    dry_run: bool,
    workers: usize,
    filter: Option<TagFilter>,
    observers: Vec<Arc<dyn Observer>>,
}

impl<W> Clone for Runner<W> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            strict: self.strict,
            dry_run: self.dry_run,
            workers: self.workers,
            filter: self.filter.clone(),
            observers: self.observers.clone(),
        }
    }
}

/// Whether a scenario still attempts its steps.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Progress {
    Running,
    FailureMode,
}

impl<W: World> Runner<W> {
    /// Creates a lenient runner without a tag filter.
    #[must_use]
    pub fn new(registry: Arc<Registry<W>>) -> Self {
        Self {
            registry,
            strict: false,
            dry_run: false,
            workers: DEFAULT_WORKERS,
            filter: None,
            observers: Vec::new(),
        }
    }

    /// Creates a runner configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StepwrightError::TagFilter`] when the configured
    /// tag expression does not parse.
    pub fn from_config(registry: Arc<Registry<W>>, config: &RunnerConfig) -> Result<Self> {
        let filter = config.tags.as_deref().map(TagFilter::parse).transpose()?;
        Ok(Self {
            strict: config.execution.strict,
            dry_run: config.execution.dry_run,
            filter,
            ..Self::new(registry).with_workers(config.execution.workers)
        })
    }

    /// Treats undefined and pending steps as fatal.
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Resolves steps without running hooks or invocables.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Runs only scenarios whose effective tags satisfy `filter`.
    #[must_use]
    pub fn with_tag_filter(mut self, filter: TagFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Parses and applies a tag filter expression.
    ///
    /// # Errors
    ///
    /// Returns [`TagFilterError`] when the expression does not parse.
    pub fn with_tags(self, expression: &str) -> std::result::Result<Self, TagFilterError> {
        Ok(self.with_tag_filter(TagFilter::parse(expression)?))
    }

    /// Sets how many features [`Runner::run_concurrent`] runs at once. Zero is
    /// treated as one.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Adds an observer notified of every [`RunEvent`].
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Returns whether undefined and pending steps are fatal.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Runs every feature in order on the calling thread.
    #[must_use]
    pub fn run(&self, features: &[Feature]) -> SuiteReport {
        let span = debug_span!("suite", features = features.len(), dry_run = self.dry_run);
        let _entered = span.enter();

        let before = self.start_suite(features.len());
        let blocked = !before.is_empty();
        let reports = features
            .iter()
            .filter_map(|feature| self.feature_report(feature, blocked))
            .collect();
        self.finish_suite(reports, before)
    }

    /// Runs features in parallel on Tokio's blocking pool, at most `workers`
    /// at a time. Reports keep the input order and suite hooks run once,
    /// around all features.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::WorkerFailed`] when a worker cannot be joined.
    pub async fn run_concurrent(&self, features: Vec<Feature>) -> Result<SuiteReport> {
        let span = debug_span!("suite", features = features.len(), workers = self.workers);
        async {
            let before = self.start_suite(features.len());
            let blocked = !before.is_empty();

            let results: Vec<_> = stream::iter(features)
                .map(|feature| {
                    let runner = self.clone();
                    let parent = Span::current();
                    async move {
                        let name = feature.name.clone();
                        tokio::task::spawn_blocking(move || {
                            parent.in_scope(|| runner.feature_report(&feature, blocked))
                        })
                        .await
                        .map_err(|err| RunError::WorkerFailed {
                            feature: name,
                            message: err.to_string(),
                        })
                    }
                })
                .buffered(self.workers)
                .collect()
                .await;

            let mut reports = Vec::with_capacity(results.len());
            for result in results {
                reports.extend(result?);
            }
            Ok::<_, StepwrightError>(self.finish_suite(reports, before))
        }
        .instrument(span)
        .await
    }

    /// Runs one feature, suite hooks included.
    #[must_use]
    pub fn run_feature(&self, feature: &Feature) -> SuiteReport {
        self.run(std::slice::from_ref(feature))
    }

    /// Runs one scenario on a fresh world, without suite or feature hooks.
    ///
    /// The runner's tag filter is not consulted.
    #[must_use]
    pub fn run_scenario(&self, feature: &str, scenario: &Scenario) -> ScenarioReport {
        self.scenario_report(feature, scenario, false)
    }

    fn emit(&self, event: &RunEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    fn emit_hook_failures(
        &self,
        failures: &[HookFailure],
        feature: Option<&str>,
        scenario: Option<&str>,
    ) {
        for failure in failures {
            self.emit(&RunEvent::HookFailed {
                feature: feature.map(str::to_owned),
                scenario: scenario.map(str::to_owned),
                failure: failure.clone(),
            });
        }
    }

    fn selects(&self, scenario: &Scenario) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|filter| filter.matches(&scenario.tags))
    }

    /// Fires before-suite hooks and returns their failures.
    fn start_suite(&self, features: usize) -> Vec<HookFailure> {
        self.emit(&RunEvent::SuiteStarted { features });
        if self.dry_run {
            return Vec::new();
        }
        let tags = TagSet::new();
        let failures = fire(
            &self.registry,
            HookContext::suite(HookScope::BeforeSuite, &tags),
        );
        if !failures.is_empty() {
            warn!("before-suite hook failed; every scenario will be skipped");
        }
        self.emit_hook_failures(&failures, None, None);
        failures
    }

    fn finish_suite(
        &self,
        features: Vec<FeatureReport>,
        mut hook_failures: Vec<HookFailure>,
    ) -> SuiteReport {
        if !self.dry_run {
            let tags = TagSet::new();
            let after = fire(
                &self.registry,
                HookContext::suite(HookScope::AfterSuite, &tags),
            );
            self.emit_hook_failures(&after, None, None);
            hook_failures.extend(after);
        }

        let report = SuiteReport::new(features, hook_failures, self.strict);
        debug!(
            scenarios = report.scenario_count(),
            failed = report.failed_scenario_count(),
            steps = report.counts.total(),
            exit_code = report.exit_code(),
            "suite finished"
        );
        self.emit(&RunEvent::SuiteFinished {
            counts: report.counts,
        });
        report
    }

    /// Runs the selected scenarios of `feature`; `None` when none is selected.
    fn feature_report(&self, feature: &Feature, suite_blocked: bool) -> Option<FeatureReport> {
        let scenarios: Vec<Scenario> = feature
            .scenarios()
            .into_iter()
            .filter(|scenario| self.selects(scenario))
            .collect();
        if scenarios.is_empty() {
            debug!(feature = %feature.name, "no scenario selected; feature omitted");
            return None;
        }

        let span = debug_span!("feature", name = %feature.name);
        let _entered = span.enter();
        self.emit(&RunEvent::FeatureStarted {
            name: feature.name.clone(),
        });

        let run_hooks = !suite_blocked && !self.dry_run;
        let mut hook_failures = if run_hooks {
            fire(
                &self.registry,
                HookContext::feature(HookScope::BeforeFeature, &feature.name, &feature.tags),
            )
        } else {
            Vec::new()
        };
        self.emit_hook_failures(&hook_failures, Some(&feature.name), None);
        let blocked = suite_blocked || !hook_failures.is_empty();

        let reports = scenarios
            .iter()
            .map(|scenario| self.scenario_report(&feature.name, scenario, blocked))
            .collect();

        if run_hooks {
            let after = fire(
                &self.registry,
                HookContext::feature(HookScope::AfterFeature, &feature.name, &feature.tags),
            );
            self.emit_hook_failures(&after, Some(&feature.name), None);
            hook_failures.extend(after);
        }

        self.emit(&RunEvent::FeatureFinished {
            name: feature.name.clone(),
        });
        Some(FeatureReport {
            name: feature.name.clone(),
            tags: feature.tags.clone(),
            scenarios: reports,
            hook_failures,
        })
    }

    fn scenario_report(&self, feature: &str, scenario: &Scenario, blocked: bool) -> ScenarioReport {
        let span = debug_span!("scenario", name = %scenario.name);
        let _entered = span.enter();
        self.emit(&RunEvent::ScenarioStarted {
            feature: feature.to_owned(),
            name: scenario.name.clone(),
        });

        let (steps, status, hook_failures) = if blocked {
            let steps = scenario
                .steps
                .iter()
                .map(|step| self.record(feature, scenario, skipped(step)))
                .collect();
            (steps, ScenarioStatus::Aborted, Vec::new())
        } else if self.dry_run {
            let executor = Executor::new(&self.registry);
            let steps = scenario
                .steps
                .iter()
                .map(|step| self.record(feature, scenario, executor.resolve(step)))
                .collect();
            (steps, ScenarioStatus::Completed, Vec::new())
        } else {
            self.execute_scenario(feature, scenario)
        };

        let report = ScenarioReport {
            name: scenario.name.clone(),
            tags: scenario.tags.clone(),
            status,
            steps,
            hook_failures,
        };
        let failed = report.is_failed(self.strict);
        if failed {
            warn!(status = ?report.status, "scenario failed");
        }
        self.emit(&RunEvent::ScenarioFinished {
            feature: feature.to_owned(),
            name: report.name.clone(),
            status: report.status,
            failed,
        });
        report
    }

    fn execute_scenario(
        &self,
        feature: &str,
        scenario: &Scenario,
    ) -> (Vec<StepReport>, ScenarioStatus, Vec<HookFailure>) {
        let mut world = match guarded(W::new) {
            Ok(world) => world,
            Err(report) => {
                let failure = HookFailure::new(
                    HookScope::BeforeScenario,
                    &report.wrap_err("failed to create the scenario world"),
                );
                warn!(error = %failure.message, "world construction failed");
                self.emit_hook_failures(
                    std::slice::from_ref(&failure),
                    Some(feature),
                    Some(&scenario.name),
                );
                let steps = scenario
                    .steps
                    .iter()
                    .map(|step| self.record(feature, scenario, skipped(step)))
                    .collect();
                return (steps, ScenarioStatus::Aborted, vec![failure]);
            }
        };

        let mut hook_failures = fire(
            &self.registry,
            HookContext::scenario(
                HookScope::BeforeScenario,
                feature,
                &scenario.name,
                &scenario.tags,
                &mut world,
            ),
        );
        self.emit_hook_failures(&hook_failures, Some(feature), Some(&scenario.name));

        let mut progress = if hook_failures.is_empty() {
            Progress::Running
        } else {
            Progress::FailureMode
        };
        let mut steps = Vec::with_capacity(scenario.steps.len());
        for step in &scenario.steps {
            let report = match progress {
                Progress::FailureMode => skipped(step),
                Progress::Running => {
                    let (report, unabsorbed) =
                        self.attempt_step(feature, scenario, step, &mut world);
                    hook_failures.extend(unabsorbed);
                    if report.outcome.enters_failure_mode() {
                        progress = Progress::FailureMode;
                    }
                    report
                }
            };
            steps.push(self.record(feature, scenario, report));
        }

        let after = fire(
            &self.registry,
            HookContext::scenario(
                HookScope::AfterScenario,
                feature,
                &scenario.name,
                &scenario.tags,
                &mut world,
            ),
        );
        self.emit_hook_failures(&after, Some(feature), Some(&scenario.name));
        hook_failures.extend(after);

        let status = match progress {
            Progress::Running => ScenarioStatus::Completed,
            Progress::FailureMode => ScenarioStatus::Aborted,
        };
        (steps, status, hook_failures)
    }

    /// Runs one step between its step hooks.
    ///
    /// Returns the step report and the step hook failures that did not
    /// change its outcome.
    fn attempt_step(
        &self,
        feature: &str,
        scenario: &Scenario,
        step: &Step,
        world: &mut W,
    ) -> (StepReport, Vec<HookFailure>) {
        let started = Instant::now();

        let before = fire(
            &self.registry,
            HookContext::scenario(
                HookScope::BeforeStep,
                feature,
                &scenario.name,
                &scenario.tags,
                &mut *world,
            )
            .with_step(step, None),
        );
        self.emit_hook_failures(&before, Some(feature), Some(&scenario.name));
        let mut report = match before.first() {
            Some(failure) => failed_by_hook(step, failure),
            None => Executor::new(&self.registry).execute(world, step),
        };

        let mut after = fire(
            &self.registry,
            HookContext::scenario(
                HookScope::AfterStep,
                feature,
                &scenario.name,
                &scenario.tags,
                world,
            )
            .with_step(step, Some(report.outcome)),
        );
        self.emit_hook_failures(&after, Some(feature), Some(&scenario.name));
        if report.outcome == Outcome::Successful && !after.is_empty() {
            let failure = after.remove(0);
            report = failed_by_hook(step, &failure);
        }
        report.duration = started.elapsed();

        match report.outcome {
            Outcome::Successful => debug!(step = %step.text, "step passed"),
            outcome => warn!(step = %step.text, ?outcome, "step did not pass"),
        }
        (report, after)
    }

    fn record(&self, feature: &str, scenario: &Scenario, report: StepReport) -> StepReport {
        self.emit(&RunEvent::StepFinished {
            feature: feature.to_owned(),
            scenario: scenario.name.clone(),
            step: report.clone(),
        });
        report
    }
}

fn failed_by_hook(step: &Step, failure: &HookFailure) -> StepReport {
    StepReport {
        outcome: Outcome::Failed,
        error: Some(ErrorDetail::Hook {
            scope: failure.scope,
            message: failure.message.clone(),
        }),
        ..skipped(step)
    }
}
