//! Definition records stored in the registry.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::arguments::Arguments;
use crate::engine::{HookContext, StepReturn};
use crate::error::RegistrationError;
use crate::model::{Keyword, Table};
use crate::tags::{TagFilter, TagSet};

use super::pattern::Pattern;

/// Invocable bound to a step pattern.
pub type StepFn<W> = Arc<dyn Fn(&mut W, Arguments) -> eyre::Result<StepReturn> + Send + Sync>;

/// Invocable bound to a scalar transform pattern.
///
/// It receives the transform pattern's captures, or the whole argument when
/// the pattern has no groups.
pub type TransformFn<W> =
    Arc<dyn Fn(&mut W, &[String]) -> eyre::Result<Box<dyn Any + Send>> + Send + Sync>;

/// Invocable bound to a table transform pattern.
pub type TableTransformFn<W> =
    Arc<dyn Fn(&mut W, &Table) -> eyre::Result<Box<dyn Any + Send>> + Send + Sync>;

/// Invocable bound to a hook scope.
pub type HookFn<W> = Arc<dyn Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync>;

/// The kinds of pattern-bound definition a registry keeps unique.
///
/// Hooks carry no pattern and may repeat freely, so they have no kind here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    /// A step definition.
    Step,
    /// A scalar argument transform.
    Transform,
    /// A table argument transform.
    TableTransform,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Step => "step",
            Self::Transform => "transform",
            Self::TableTransform => "table transform",
        })
    }
}

/// The lifecycle boundary a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookScope {
    /// Once, before any feature runs.
    BeforeSuite,
    /// Once, after every feature ran.
    AfterSuite,
    /// Before each feature.
    BeforeFeature,
    /// After each feature.
    AfterFeature,
    /// Before each scenario, with access to its world.
    BeforeScenario,
    /// After each scenario, with access to its world.
    AfterScenario,
    /// Before each attempted step.
    BeforeStep,
    /// After each attempted step, with its outcome.
    AfterStep,
}

impl HookScope {
    /// Returns whether hooks of this scope run before their boundary.
    #[must_use]
    pub const fn is_before(self) -> bool {
        matches!(
            self,
            Self::BeforeSuite | Self::BeforeFeature | Self::BeforeScenario | Self::BeforeStep
        )
    }

    /// Returns whether the scope is suite-level, where tag filters do not apply.
    #[must_use]
    pub const fn is_suite(self) -> bool {
        matches!(self, Self::BeforeSuite | Self::AfterSuite)
    }
}

impl fmt::Display for HookScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeforeSuite => "before-suite",
            Self::AfterSuite => "after-suite",
            Self::BeforeFeature => "before-feature",
            Self::AfterFeature => "after-feature",
            Self::BeforeScenario => "before-scenario",
            Self::AfterScenario => "after-scenario",
            Self::BeforeStep => "before-step",
            Self::AfterStep => "after-step",
        })
    }
}

/// A step definition: a pattern, a presentation keyword, and an invocable.
pub struct StepDefinition<W> {
    keyword: Option<Keyword>,
    pattern: Pattern,
    invocable: StepFn<W>,
}

impl<W> StepDefinition<W> {
    /// Compiles `pattern` and binds it to `invocable`.
    ///
    /// `keyword` is presentation metadata; `None` registers a keyword-agnostic
    /// step. Matching never consults it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidPattern`] when the pattern does not
    /// compile.
    pub fn new(
        keyword: Option<Keyword>,
        pattern: &str,
        invocable: StepFn<W>,
    ) -> Result<Self, RegistrationError> {
        Ok(Self {
            keyword,
            pattern: Pattern::compile(pattern)?,
            invocable,
        })
    }

    /// Returns the presentation keyword, if any.
    #[must_use]
    pub const fn keyword(&self) -> Option<Keyword> {
        self.keyword
    }

    /// Returns the compiled pattern.
    #[must_use]
    pub const fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub(crate) fn invoke(&self, world: &mut W, arguments: Arguments) -> eyre::Result<StepReturn> {
        (self.invocable)(world, arguments)
    }
}

impl<W> fmt::Debug for StepDefinition<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("keyword", &self.keyword)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// A scalar transform applied to captured step arguments.
pub struct TransformDefinition<W> {
    pattern: Pattern,
    invocable: TransformFn<W>,
}

impl<W> TransformDefinition<W> {
    /// Compiles `pattern` and binds it to `invocable`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidPattern`] when the pattern does not
    /// compile.
    pub fn new(pattern: &str, invocable: TransformFn<W>) -> Result<Self, RegistrationError> {
        Ok(Self {
            pattern: Pattern::compile(pattern)?,
            invocable,
        })
    }

    /// Returns the compiled pattern.
    #[must_use]
    pub const fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub(crate) fn invoke(
        &self,
        world: &mut W,
        captures: &[String],
    ) -> eyre::Result<Box<dyn Any + Send>> {
        (self.invocable)(world, captures)
    }
}

impl<W> fmt::Debug for TransformDefinition<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformDefinition")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// A transform applied to table arguments whose header signature matches.
pub struct TableTransformDefinition<W> {
    pattern: Pattern,
    invocable: TableTransformFn<W>,
}

impl<W> TableTransformDefinition<W> {
    /// Compiles `pattern` and binds it to `invocable`.
    ///
    /// The pattern is matched against [`Table::signature`], for example
    /// `table:name,email`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidPattern`] when the pattern does not
    /// compile.
    pub fn new(pattern: &str, invocable: TableTransformFn<W>) -> Result<Self, RegistrationError> {
        Ok(Self {
            pattern: Pattern::compile(pattern)?,
            invocable,
        })
    }

    /// Returns the compiled pattern.
    #[must_use]
    pub const fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub(crate) fn invoke(&self, world: &mut W, table: &Table) -> eyre::Result<Box<dyn Any + Send>> {
        (self.invocable)(world, table)
    }
}

impl<W> fmt::Debug for TableTransformDefinition<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableTransformDefinition")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// A lifecycle hook: a scope, an optional tag filter, and an invocable.
pub struct HookDefinition<W> {
    scope: HookScope,
    filter: Option<TagFilter>,
    invocable: HookFn<W>,
}

impl<W> HookDefinition<W> {
    /// Creates a hook. A `None` filter fires for every tag set.
    #[must_use]
    pub fn new(scope: HookScope, filter: Option<TagFilter>, invocable: HookFn<W>) -> Self {
        Self {
            scope,
            filter,
            invocable,
        }
    }

    /// Returns the hook's scope.
    #[must_use]
    pub const fn scope(&self) -> HookScope {
        self.scope
    }

    /// Returns the hook's tag filter, if any.
    #[must_use]
    pub const fn filter(&self) -> Option<&TagFilter> {
        self.filter.as_ref()
    }

    /// Returns whether the hook fires for a boundary carrying `tags`.
    ///
    /// Suite hooks ignore their filter.
    #[must_use]
    pub fn applies_to(&self, tags: &TagSet) -> bool {
        self.scope.is_suite()
            || self
                .filter
                .as_ref()
                .is_none_or(|filter| filter.matches(tags))
    }

    pub(crate) fn invoke(&self, context: &mut HookContext<'_, W>) -> eyre::Result<()> {
        (self.invocable)(context)
    }
}

impl<W> fmt::Debug for HookDefinition<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDefinition")
            .field("scope", &self.scope)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
