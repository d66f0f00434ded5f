//! Behaviour-driven scenario execution.
//!
//! `stepwright` runs scenarios written as ordered natural-language steps
//! against step definitions registered in Rust. Each scenario gets a fresh
//! [`World`] value that its steps read and mutate. Step texts are matched
//! against registered patterns, captured arguments pass through user
//! transforms, and every step is classified as successful, failed, pending,
//! undefined, ambiguous or skipped. Lifecycle hooks run around the suite,
//! each feature, each scenario and each step.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use stepwright::model::{Feature, Scenario, Step};
//! use stepwright::{RegistryBuilder, Runner, World};
//!
//! #[derive(Default)]
//! struct Calculator {
//!     total: i64,
//! }
//!
//! impl World for Calculator {
//!     fn new() -> eyre::Result<Self> {
//!         Ok(Self::default())
//!     }
//! }
//!
//! let mut builder = RegistryBuilder::<Calculator>::new();
//! builder
//!     .when("I add {n:i64}", |calc, args| {
//!         calc.total += args.parse::<i64>(0)?;
//!         Ok(())
//!     })?
//!     .then("the total is {n:i64}", |calc, args| {
//!         eyre::ensure!(calc.total == args.parse::<i64>(0)?, "total is {}", calc.total);
//!         Ok(())
//!     })?;
//!
//! let feature = Feature::new(
//!     "Addition",
//!     vec![
//!         Scenario::new(
//!             "two numbers",
//!             vec![
//!                 Step::when("I add 2"),
//!                 Step::when("I add 3"),
//!                 Step::then("the total is 5"),
//!             ],
//!         )
//!         .into(),
//!     ],
//! );
//!
//! let report = Runner::new(Arc::new(builder.build()?)).run(&[feature]);
//! assert_eq!(report.exit_code(), 0);
//! # Ok::<(), stepwright::StepwrightError>(())
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Step, transform and hook definitions
//! - [`engine`]: Matching, transforms, execution and the scenario runner
//! - [`model`]: Features, scenarios, outlines and steps
//! - [`report`]: Outcomes and run reports
//! - [`config`]: Layered runner configuration
//! - [`api`]: Whole-suite orchestration
//! - [`error`]: Semantic error types

pub mod api;
pub mod arguments;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod report;
pub mod tags;
pub mod world;

pub use api::{SuiteOutcome, SuiteParams, SuiteRun, run_suite, run_suite_concurrent};
pub use arguments::{Argument, Arguments};
pub use engine::{HookContext, Observer, RunEvent, Runner, StepReturn, SubStep};
pub use error::{Pending, Result, StepwrightError};
pub use registry::{HookScope, Registry, RegistryBuilder};
pub use report::{Outcome, SuiteReport};
pub use tags::{TagFilter, TagSet};
pub use world::World;
