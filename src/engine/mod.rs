//! Scenario execution.
//!
//! Execution of one step flows through four stages:
//!
//! 1. [`matcher`] resolves the step text to zero, one, or several definitions;
//! 2. [`transform`] rewrites the captured arguments of a unique match;
//! 3. [`Executor`] invokes the definition on the scenario's world, recursing
//!    into any chained sub-steps;
//! 4. [`Runner`] classifies the outcome, fires hooks, and decides whether the
//!    remaining steps of the scenario run or are skipped.
//!
//! Panics raised by user invocables are caught at this boundary and reported
//! as failures, so a run always completes.

mod executor;
mod hooks;
pub mod matcher;
mod observer;
mod runner;
pub mod transform;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub use executor::{Executor, StepReturn, SubStep};
pub use hooks::HookContext;
pub use matcher::{MatchResult, match_step};
pub use observer::{Observer, RunEvent};
pub use runner::Runner;

/// Runs a user invocable, turning a panic into an error report.
pub(crate) fn guarded<T>(f: impl FnOnce() -> eyre::Result<T>) -> eyre::Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(eyre::eyre!("panicked: {}", panic_message(payload.as_ref())))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn guarded_passes_results_through() {
        assert_eq!(guarded(|| Ok(3)).ok(), Some(3));
        let err = guarded(|| -> eyre::Result<()> { Err(eyre::eyre!("plain failure")) })
            .expect_err("error should pass through");
        assert_eq!(err.to_string(), "plain failure");
    }

    #[rstest]
    #[case::str_payload(Box::new("left != right"))]
    #[case::string_payload(Box::new(String::from("left != right")))]
    fn guarded_converts_panics(#[case] payload: Box<dyn Any + Send>) {
        let err = guarded(|| -> eyre::Result<()> { panic::resume_unwind(payload) })
            .expect_err("panic should become an error");
        assert_eq!(err.to_string(), "panicked: left != right");
    }
}
