//! Step invocation and chaining.

use std::time::{Duration, Instant};

use crate::error::{ChainError, Pending};
use crate::model::{MultilineArgument, Step};
use crate::registry::{Registry, StepDefinition};
use crate::report::{ErrorDetail, Outcome, StepReport};

use super::guarded;
use super::matcher::{MatchResult, match_step};
use super::transform::transform_arguments;

/// A step requested by another step, executed on the same world.
pub type SubStep = Step;

/// What a step invocable returns on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StepReturn {
    /// The step finished.
    #[default]
    Completed,
    /// The step delegates to further steps, run in order before it finishes.
    ///
    /// Chains nest without a depth limit. A step that chains back to itself,
    /// directly or through other steps, recurses until the thread's stack
    /// overflows and the process aborts; it is not reported as a failure.
    Chained(Vec<SubStep>),
}

impl From<()> for StepReturn {
    fn from((): ()) -> Self {
        Self::Completed
    }
}

impl From<SubStep> for StepReturn {
    fn from(step: SubStep) -> Self {
        Self::Chained(vec![step])
    }
}

impl From<Vec<SubStep>> for StepReturn {
    fn from(steps: Vec<SubStep>) -> Self {
        Self::Chained(steps)
    }
}

/// Resolves, transforms and invokes steps against a registry.
pub struct Executor<'r, W> {
    registry: &'r Registry<W>,
}

impl<'r, W> Executor<'r, W> {
    /// Creates an executor over `registry`.
    #[must_use]
    pub const fn new(registry: &'r Registry<W>) -> Self {
        Self { registry }
    }

    /// Runs one top-level step on `world` and classifies the result.
    ///
    /// Nothing escapes: errors, pending signals and panics all become part of
    /// the returned report.
    pub fn execute(&self, world: &mut W, step: &Step) -> StepReport {
        let started = Instant::now();
        let mut report = skipped(step);

        match match_step(self.registry, &step.text) {
            MatchResult::NoMatch => report.outcome = Outcome::Undefined,
            ambiguous @ MatchResult::Ambiguous(_) => {
                report.outcome = Outcome::Ambiguous;
                report.error = Some(ErrorDetail::Ambiguous {
                    patterns: ambiguous.patterns(),
                });
            }
            MatchResult::Unique {
                definition,
                captures,
            } => {
                report.pattern = Some(definition.pattern().source().to_owned());
                let (outcome, error) =
                    self.invoke(definition, world, &captures, step.argument.as_ref());
                report.outcome = outcome;
                report.error = error;
                report.arguments = captures;
            }
        }

        report.duration = started.elapsed();
        report
    }

    /// Resolves a step without running anything.
    ///
    /// A unique match is reported `skipped` with its pattern and captures.
    #[must_use]
    pub fn resolve(&self, step: &Step) -> StepReport {
        let mut report = skipped(step);
        match match_step(self.registry, &step.text) {
            MatchResult::NoMatch => report.outcome = Outcome::Undefined,
            ambiguous @ MatchResult::Ambiguous(_) => {
                report.outcome = Outcome::Ambiguous;
                report.error = Some(ErrorDetail::Ambiguous {
                    patterns: ambiguous.patterns(),
                });
            }
            MatchResult::Unique {
                definition,
                captures,
            } => {
                report.outcome = Outcome::Skipped;
                report.pattern = Some(definition.pattern().source().to_owned());
                report.arguments = captures;
            }
        }
        report
    }

    fn invoke(
        &self,
        definition: &StepDefinition<W>,
        world: &mut W,
        captures: &[String],
        multiline: Option<&MultilineArgument>,
    ) -> (Outcome, Option<ErrorDetail>) {
        let arguments = match transform_arguments(self.registry, world, captures, multiline) {
            Ok(arguments) => arguments,
            Err(err) => {
                return (
                    Outcome::Failed,
                    Some(ErrorDetail::from_error(&err, err.details())),
                );
            }
        };

        match guarded(|| definition.invoke(world, arguments)) {
            Ok(StepReturn::Completed) => (Outcome::Successful, None),
            Ok(StepReturn::Chained(sub_steps)) => match self.run_chain(world, &sub_steps) {
                Ok(()) => (Outcome::Successful, None),
                Err(err) => (
                    Outcome::Failed,
                    Some(ErrorDetail::from_error(&err, err.details())),
                ),
            },
            Err(report) => report.downcast_ref::<Pending>().map_or_else(
                || (Outcome::Failed, Some(ErrorDetail::from_report(&report))),
                |pending| {
                    (
                        Outcome::Pending,
                        Some(ErrorDetail::Pending {
                            message: pending.message.clone(),
                        }),
                    )
                },
            ),
        }
    }

    /// Runs chained sub-steps in order, stopping at the first that does not
    /// succeed.
    fn run_chain(&self, world: &mut W, sub_steps: &[SubStep]) -> Result<(), ChainError> {
        for sub_step in sub_steps {
            self.run_sub_step(world, sub_step)?;
        }
        Ok(())
    }

    fn run_sub_step(&self, world: &mut W, sub_step: &SubStep) -> Result<(), ChainError> {
        let text = sub_step.text.clone();
        tracing::trace!(step = %text, "running chained step");

        let (definition, captures) = match match_step(self.registry, &text) {
            MatchResult::NoMatch => return Err(ChainError::Undefined { text }),
            ambiguous @ MatchResult::Ambiguous(_) => {
                return Err(ChainError::Ambiguous {
                    patterns: ambiguous.patterns(),
                    text,
                });
            }
            MatchResult::Unique {
                definition,
                captures,
            } => (definition, captures),
        };

        let arguments =
            transform_arguments(self.registry, world, &captures, sub_step.argument.as_ref())
                .map_err(|source| ChainError::Transform {
                    text: text.clone(),
                    source,
                })?;

        match guarded(|| definition.invoke(world, arguments)) {
            Ok(StepReturn::Completed) => Ok(()),
            Ok(StepReturn::Chained(nested)) => {
                self.run_chain(world, &nested)
                    .map_err(|source| ChainError::Nested {
                        text,
                        source: Box::new(source),
                    })
            }
            Err(report) => Err(match report.downcast_ref::<Pending>() {
                Some(pending) => ChainError::Pending {
                    message: pending.message.clone(),
                    text,
                },
                None => ChainError::Failed {
                    text,
                    details: format!("{report:?}"),
                    source: report.into(),
                },
            }),
        }
    }
}

/// Builds the report of a step that was never attempted.
pub(crate) fn skipped(step: &Step) -> StepReport {
    StepReport {
        keyword: step.keyword,
        text: step.text.clone(),
        outcome: Outcome::Skipped,
        arguments: Vec::new(),
        pattern: None,
        error: None,
        duration: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Table;
    use crate::registry::RegistryBuilder;
    use eyre::{bail, ensure};
    use rstest::{fixture, rstest};

    #[derive(Debug, Default)]
    struct Counter {
        value: i64,
        log: Vec<String>,
    }

    #[fixture]
    fn registry() -> Registry<Counter> {
        let mut builder = RegistryBuilder::<Counter>::new();
        builder
            .given(r#"^some step with "([^"]*)" argument$"#, |counter: &mut Counter, args| {
                counter.log.push(args.get::<String>(0)?.clone());
                Ok(())
            })
            .and_then(|b| {
                b.then(r"^number step with (\d+)$", |counter: &mut Counter, args| {
                    counter.value = args.parse(0)?;
                    Ok(())
                })
            })
            .and_then(|b| b.step("an unwritten step", |_, _| -> eyre::Result<()> {
                Err(Pending::with_message("todo").into())
            }))
            .and_then(|b| b.step("a broken step", |_, _| -> eyre::Result<()> {
                bail!("it broke")
            }))
            .and_then(|b| b.step("an asserting step", |_, _| -> eyre::Result<()> {
                panic!("assertion failed: totals differ")
            }))
            .and_then(|b| {
                b.step("I set up the basics", |_, _| {
                    Ok(vec![
                        Step::given("some step with \"chained\" argument"),
                        Step::then("number step with 7"),
                    ])
                })
            })
            .and_then(|b| b.step("I delegate to nothing", |_, _| Ok(Step::when("nobody handles this"))))
            .and_then(|b| b.step("I delegate to pending work", |_, _| Ok(Step::when("an unwritten step"))))
            .and_then(|b| b.step("I delegate twice", |_, _| Ok(Step::when("I delegate to nothing"))))
            .and_then(|b| {
                b.step("the table has {n:u32} rows", |_, args| {
                    let expected: usize = args.parse(0)?;
                    let table = args.table().ok_or_else(|| eyre::eyre!("missing table"))?;
                    ensure!(table.body().len() == expected, "row count mismatch");
                    Ok(())
                })
            })
            .and_then(|b| b.step("I delegate to a broken step", |_, _| Ok(Step::when("a broken step"))))
            .and_then(|b| {
                b.step("I delegate to breakage twice", |_, _| {
                    Ok(Step::when("I delegate to a broken step"))
                })
            })
            .and_then(|b| {
                b.step("count down from {n:u32}", |counter: &mut Counter, args| {
                    let remaining: u32 = args.parse(0)?;
                    counter.value += 1;
                    Ok(match remaining {
                        0 => StepReturn::Completed,
                        n => Step::when(format!("count down from {}", n - 1)).into(),
                    })
                })
            })
            .and_then(|b| {
                b.step("the {colour} widget", |counter: &mut Counter, _| {
                    counter.log.push(String::from("colour"));
                    Ok(())
                })
            })
            .and_then(|b| {
                b.step("the {size} widget", |counter: &mut Counter, _| {
                    counter.log.push(String::from("size"));
                    Ok(())
                })
            })
            .expect("steps should register");
        builder.build().expect("registry should build")
    }

    fn run(registry: &Registry<Counter>, counter: &mut Counter, step: &Step) -> StepReport {
        Executor::new(registry).execute(counter, step)
    }

    #[rstest]
    fn string_argument_is_passed_to_invocable(registry: Registry<Counter>) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::given(r#"some step with "string" argument"#));
        assert_eq!(report.outcome, Outcome::Successful);
        assert_eq!(report.arguments, vec![String::from("string")]);
        assert_eq!(counter.log, vec![String::from("string")]);
    }

    #[rstest]
    fn number_argument_is_parsed(registry: Registry<Counter>) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::then("number step with 23"));
        assert_eq!(report.outcome, Outcome::Successful);
        assert_eq!(report.pattern.as_deref(), Some(r"^number step with (\d+)$"));
        assert_eq!(counter.value, 23);
    }

    #[rstest]
    #[case("nobody defined this", Outcome::Undefined)]
    #[case("an unwritten step", Outcome::Pending)]
    #[case("a broken step", Outcome::Failed)]
    #[case("an asserting step", Outcome::Failed)]
    #[case("the blue widget", Outcome::Ambiguous)]
    fn outcomes_are_classified(
        registry: Registry<Counter>,
        #[case] text: &str,
        #[case] expected: Outcome,
    ) {
        let mut counter = Counter::default();
        assert_eq!(run(&registry, &mut counter, &Step::when(text)).outcome, expected);
    }

    #[rstest]
    fn pending_keeps_its_message(registry: Registry<Counter>) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::when("an unwritten step"));
        assert_eq!(
            report.error,
            Some(ErrorDetail::Pending {
                message: Some(String::from("todo"))
            })
        );
    }

    #[rstest]
    fn panic_message_is_reported(registry: Registry<Counter>) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::when("an asserting step"));
        let summary = report.error.map(|error| error.summary()).unwrap_or_default();
        assert!(summary.contains("assertion failed: totals differ"), "{summary}");
    }

    #[rstest]
    fn ambiguous_step_lists_patterns(registry: Registry<Counter>) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::when("the blue widget"));
        assert_eq!(
            report.error,
            Some(ErrorDetail::Ambiguous {
                patterns: vec![
                    String::from("the {colour} widget"),
                    String::from("the {size} widget"),
                ]
            })
        );
    }

    #[rstest]
    fn deep_chains_have_no_depth_limit(registry: Registry<Counter>) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::given("count down from 64"));
        assert_eq!(report.outcome, Outcome::Successful);
        assert_eq!(counter.value, 65);
    }

    #[rstest]
    fn ambiguous_step_invokes_no_candidate(registry: Registry<Counter>) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::when("the blue widget"));
        assert_eq!(report.outcome, Outcome::Ambiguous);
        assert!(counter.log.is_empty(), "ran {:?}", counter.log);
    }

    #[rstest]
    #[case::direct("I delegate to a broken step")]
    #[case::nested("I delegate to breakage twice")]
    fn chained_failure_keeps_the_originating_report(
        registry: Registry<Counter>,
        #[case] text: &str,
    ) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::given(text));
        assert_eq!(report.outcome, Outcome::Failed);
        let Some(ErrorDetail::Failed { causes, details, .. }) = &report.error else {
            panic!("expected a failure detail, got {:?}", report.error);
        };
        assert_eq!(causes.last().map(String::as_str), Some("it broke"));
        let rendered = details.as_deref().expect("the step's report should be rendered");
        assert!(rendered.contains("it broke"), "{rendered}");
    }

    #[rstest]
    fn chained_steps_share_the_world(registry: Registry<Counter>) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::given("I set up the basics"));
        assert_eq!(report.outcome, Outcome::Successful);
        assert_eq!(counter.log, vec![String::from("chained")]);
        assert_eq!(counter.value, 7);
    }

    #[rstest]
    #[case("I delegate to nothing", "chained step 'nobody handles this' is undefined")]
    #[case("I delegate to pending work", "chained step 'an unwritten step' is pending: todo")]
    #[case("I delegate twice", "chained step 'I delegate to nothing' failed in a nested chain")]
    fn failing_sub_step_fails_parent(
        registry: Registry<Counter>,
        #[case] text: &str,
        #[case] expected: &str,
    ) {
        let mut counter = Counter::default();
        let report = run(&registry, &mut counter, &Step::given(text));
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(report.error.map(|error| error.summary()).as_deref(), Some(expected));
    }

    #[rstest]
    fn table_argument_is_appended_last(registry: Registry<Counter>) {
        let mut counter = Counter::default();
        let step = Step::then("the table has 2 rows").with_table(Table::new([["a"], ["1"], ["2"]]));
        assert_eq!(run(&registry, &mut counter, &step).outcome, Outcome::Successful);
    }

    #[rstest]
    fn resolve_reports_match_without_invoking(registry: Registry<Counter>) {
        let executor = Executor::new(&registry);
        let report = executor.resolve(&Step::then("number step with 23"));
        assert_eq!(report.outcome, Outcome::Skipped);
        assert_eq!(report.arguments, vec![String::from("23")]);
        assert_eq!(
            executor.resolve(&Step::then("nothing here")).outcome,
            Outcome::Undefined
        );
    }

    #[rstest]
    fn step_return_conversions() {
        assert_eq!(StepReturn::from(()), StepReturn::Completed);
        assert_eq!(
            StepReturn::from(Step::when("x")),
            StepReturn::Chained(vec![Step::when("x")])
        );
    }
}
