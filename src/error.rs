//! Semantic error types for the stepwright engine.
//!
//! This module defines the error hierarchy for stepwright, following the
//! principle of using semantic error enums (via `thiserror`) for conditions the
//! caller might inspect or map to an exit status, while reserving opaque errors
//! (`eyre::Report`) for the boundary where user-supplied step, hook, and
//! transform code plugs into the engine.
//!
//! Per-step conditions ([`TransformError`], [`ChainError`]) never escape the
//! scenario runner; they are folded into step reports. Only registration,
//! configuration, and worker errors reach the caller.

use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::registry::DefinitionKind;

/// Boxed error used to carry user failures through semantic error variants.
pub type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while registering definitions during the load phase.
///
/// These are fatal: the registry is never built and no scenario runs.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A definition with an identical pattern string is already registered.
    #[error("duplicate {kind} pattern: {pattern}")]
    DuplicatePattern {
        /// The kind of definition that clashed.
        kind: DefinitionKind,
        /// The offending pattern source.
        pattern: String,
    },

    /// A pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        /// Why compilation failed.
        reason: String,
    },

    /// The combined pattern set for a definition kind could not be built.
    #[error("failed to compile {kind} pattern set: {message}")]
    PatternSet {
        /// The kind of definition whose set failed.
        kind: DefinitionKind,
        /// A description of the failure.
        message: String,
    },
}

/// Errors raised while parsing a tag filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagFilterError {
    /// The expression contained no tags at all.
    #[error("tag filter expression is empty")]
    Empty,

    /// A `,` or `&&` separated term was empty.
    #[error("empty term in tag filter '{expression}'")]
    EmptyTerm {
        /// The full expression being parsed.
        expression: String,
    },

    /// A tag contained characters that cannot appear in a tag.
    #[error("invalid tag '{tag}' in tag filter '{expression}'")]
    InvalidTag {
        /// The full expression being parsed.
        expression: String,
        /// The offending tag.
        tag: String,
    },
}

/// Errors raised while transforming captured arguments.
#[derive(Debug, Error)]
pub enum TransformError {
    /// More than one transform pattern matched the same value.
    #[error("value '{value}' matches more than one transform: {}", .patterns.join(", "))]
    Ambiguous {
        /// The captured value or table signature.
        value: String,
        /// The matching transform patterns, in registration order.
        patterns: Vec<String>,
    },

    /// The transform invocable returned an error or panicked.
    #[error("transform '{pattern}' failed for value '{value}'")]
    Failed {
        /// The transform pattern that matched.
        pattern: String,
        /// The captured value or table signature.
        value: String,
        /// The debug rendering of the transform's error report.
        details: String,
        /// The underlying failure.
        #[source]
        source: BoxedError,
    },
}

impl TransformError {
    /// Returns the debug rendering of the originating error report, with any
    /// captured backtrace.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Failed { details, .. } => Some(details.as_str()),
            Self::Ambiguous { .. } => None,
        }
    }
}

/// Errors raised when a chained sub-step does not finish successfully.
///
/// Any non-successful sub-step escalates to a failure of the parent step.
#[derive(Debug, Error)]
pub enum ChainError {
    /// No definition matched the chained step.
    #[error("chained step '{text}' is undefined")]
    Undefined {
        /// The chained step text.
        text: String,
    },

    /// More than one definition matched the chained step.
    #[error("chained step '{text}' is ambiguous between: {}", .patterns.join(", "))]
    Ambiguous {
        /// The chained step text.
        text: String,
        /// The matching step patterns, in registration order.
        patterns: Vec<String>,
    },

    /// The chained step signalled pending work.
    #[error("chained step '{text}' is pending{}", pending_suffix(.message.as_deref()))]
    Pending {
        /// The chained step text.
        text: String,
        /// The optional pending message.
        message: Option<String>,
    },

    /// Transforming the chained step's arguments failed.
    #[error("chained step '{text}' could not transform its arguments")]
    Transform {
        /// The chained step text.
        text: String,
        /// The transform failure.
        #[source]
        source: TransformError,
    },

    /// The chained step raised an error.
    #[error("chained step '{text}' failed")]
    Failed {
        /// The chained step text.
        text: String,
        /// The debug rendering of the step's error report.
        details: String,
        /// The underlying failure.
        #[source]
        source: BoxedError,
    },

    /// A step chained further down from this one failed.
    #[error("chained step '{text}' failed in a nested chain")]
    Nested {
        /// The chained step text.
        text: String,
        /// The nested chain failure.
        #[source]
        source: Box<ChainError>,
    },
}

impl ChainError {
    /// Returns the debug rendering of the innermost error report, if the
    /// chain ended in an error rather than a missing or pending step.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Failed { details, .. } => Some(details.as_str()),
            Self::Transform { source, .. } => source.details(),
            Self::Nested { source, .. } => source.details(),
            Self::Undefined { .. } | Self::Ambiguous { .. } | Self::Pending { .. } => None,
        }
    }
}

/// Signal returned by a step to mark it as not yet implemented.
///
/// A step whose invocable returns an `eyre::Report` wrapping `Pending` is
/// classified `pending` instead of `failed`:
///
/// ```
/// use stepwright::Pending;
///
/// fn unwritten_step() -> eyre::Result<()> {
///     Err(Pending::with_message("write the checkout step").into())
/// }
///
/// let report = unwritten_step().expect_err("step is pending");
/// assert!(report.downcast_ref::<Pending>().is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("step is pending{}", pending_suffix(.message.as_deref()))]
pub struct Pending {
    /// What remains to be done.
    pub message: Option<String>,
}

impl Pending {
    /// Creates a pending signal without a message.
    #[must_use]
    pub const fn new() -> Self {
        Self { message: None }
    }

    /// Creates a pending signal with a message.
    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

fn pending_suffix(message: Option<&str>) -> String {
    message.map_or_else(String::new, |text| format!(": {text}"))
}

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path where the configuration file was expected.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised by the concurrent feature runner.
#[derive(Debug, Error)]
pub enum RunError {
    /// A worker running a feature could not be joined.
    #[error("worker running feature '{feature}' did not complete: {message}")]
    WorkerFailed {
        /// The feature the worker was running.
        feature: String,
        /// A description of the join failure.
        message: String,
    },
}

/// Top-level error type for the stepwright engine.
///
/// At an application boundary these errors are typically converted to
/// `eyre::Report` for human-readable error reporting.
#[derive(Debug, Error)]
pub enum StepwrightError {
    /// An error occurred while registering definitions.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A tag filter expression was malformed.
    #[error(transparent)]
    TagFilter(#[from] TagFilterError),

    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while running features concurrently.
    #[error(transparent)]
    Run(#[from] RunError),
}

/// A specialised `Result` type for stepwright operations.
pub type Result<T> = std::result::Result<T, StepwrightError>;
