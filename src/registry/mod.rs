//! Definition registry.
//!
//! Definitions are registered on a [`RegistryBuilder`] during the load phase.
//! [`RegistryBuilder::build`] freezes them into an immutable [`Registry`] that
//! is shared behind an `Arc` for the whole run. Building also compiles one
//! [`RegexSet`] per definition kind so that a step text is tested against all
//! patterns of a kind in a single pass.
//!
//! ```
//! use stepwright::registry::RegistryBuilder;
//!
//! #[derive(Default)]
//! struct Basket {
//!     items: u32,
//! }
//!
//! let mut builder = RegistryBuilder::<Basket>::new();
//! builder
//!     .given("a basket with {count:u32} items", |basket, args| {
//!         basket.items = args.parse(0)?;
//!         Ok(())
//!     })
//!     .expect("pattern should register");
//! let registry = builder.build().expect("registry should build");
//! assert_eq!(registry.steps().len(), 1);
//! ```

mod definition;
mod pattern;


use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use regex::RegexSet;

use crate::arguments::Arguments;
use crate::engine::{HookContext, StepReturn};
use crate::error::RegistrationError;
use crate::model::{Keyword, Table};
use crate::tags::TagFilter;

pub use definition::{
    DefinitionKind, HookDefinition, HookFn, HookScope, StepDefinition, StepFn,
    TableTransformDefinition, TableTransformFn, TransformDefinition, TransformFn,
};
pub use pattern::Pattern;

/// Collects definitions during the load phase.
pub struct RegistryBuilder<W> {
    steps: Vec<StepDefinition<W>>,
    transforms: Vec<TransformDefinition<W>>,
    table_transforms: Vec<TableTransformDefinition<W>>,
    hooks: Vec<HookDefinition<W>>,
    step_sources: HashSet<String>,
    transform_sources: HashSet<String>,
    table_transform_sources: HashSet<String>,
}

impl<W> Default for RegistryBuilder<W> {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            transforms: Vec::new(),
            table_transforms: Vec::new(),
            hooks: Vec::new(),
            step_sources: HashSet::new(),
            transform_sources: HashSet::new(),
            table_transform_sources: HashSet::new(),
        }
    }
}

fn claim(
    sources: &mut HashSet<String>,
    kind: DefinitionKind,
    pattern: &Pattern,
) -> Result<(), RegistrationError> {
    if sources.insert(pattern.source().to_owned()) {
        Ok(())
    } else {
        Err(RegistrationError::DuplicatePattern {
            kind,
            pattern: pattern.source().to_owned(),
        })
    }
}

impl<W: 'static> RegistryBuilder<W> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicatePattern`] when a step with an
    /// identical pattern string is already registered.
    pub fn register_step(
        &mut self,
        definition: StepDefinition<W>,
    ) -> Result<&mut Self, RegistrationError> {
        claim(&mut self.step_sources, DefinitionKind::Step, definition.pattern())?;
        self.steps.push(definition);
        Ok(self)
    }

    /// Registers a scalar transform.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicatePattern`] when a transform with an
    /// identical pattern string is already registered.
    pub fn register_transform(
        &mut self,
        definition: TransformDefinition<W>,
    ) -> Result<&mut Self, RegistrationError> {
        claim(
            &mut self.transform_sources,
            DefinitionKind::Transform,
            definition.pattern(),
        )?;
        self.transforms.push(definition);
        Ok(self)
    }

    /// Registers a table transform.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicatePattern`] when a table transform
    /// with an identical pattern string is already registered.
    pub fn register_table_transform(
        &mut self,
        definition: TableTransformDefinition<W>,
    ) -> Result<&mut Self, RegistrationError> {
        claim(
            &mut self.table_transform_sources,
            DefinitionKind::TableTransform,
            definition.pattern(),
        )?;
        self.table_transforms.push(definition);
        Ok(self)
    }

    /// Registers a hook. Hooks may freely share scope and filter.
    pub fn register_hook(&mut self, definition: HookDefinition<W>) -> &mut Self {
        self.hooks.push(definition);
        self
    }

    /// Registers a step for any keyword.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the pattern is invalid or already
    /// registered.
    pub fn step<F, R>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut W, Arguments) -> eyre::Result<R> + Send + Sync + 'static,
        R: Into<StepReturn> + 'static,
    {
        self.keyed_step(None, pattern, f)
    }

    /// Registers a step presented as `Given`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the pattern is invalid or already
    /// registered.
    pub fn given<F, R>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut W, Arguments) -> eyre::Result<R> + Send + Sync + 'static,
        R: Into<StepReturn> + 'static,
    {
        self.keyed_step(Some(Keyword::Given), pattern, f)
    }

    /// Registers a step presented as `When`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the pattern is invalid or already
    /// registered.
    pub fn when<F, R>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut W, Arguments) -> eyre::Result<R> + Send + Sync + 'static,
        R: Into<StepReturn> + 'static,
    {
        self.keyed_step(Some(Keyword::When), pattern, f)
    }

    /// Registers a step presented as `Then`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the pattern is invalid or already
    /// registered.
    pub fn then<F, R>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut W, Arguments) -> eyre::Result<R> + Send + Sync + 'static,
        R: Into<StepReturn> + 'static,
    {
        self.keyed_step(Some(Keyword::Then), pattern, f)
    }

    fn keyed_step<F, R>(
        &mut self,
        keyword: Option<Keyword>,
        pattern: &str,
        f: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut W, Arguments) -> eyre::Result<R> + Send + Sync + 'static,
        R: Into<StepReturn> + 'static,
    {
        let invocable: StepFn<W> =
            Arc::new(move |world: &mut W, args: Arguments| -> eyre::Result<StepReturn> {
                f(world, args).map(Into::into)
            });
        self.register_step(StepDefinition::new(keyword, pattern, invocable)?)
    }

    /// Registers a scalar transform returning any `Send` value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the pattern is invalid or already
    /// registered.
    pub fn transform<F, T>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut W, &[String]) -> eyre::Result<T> + Send + Sync + 'static,
        T: Any + Send,
    {
        let invocable: TransformFn<W> = Arc::new(move |world: &mut W, captures: &[String]| {
            f(world, captures).map(|value| Box::new(value) as Box<dyn Any + Send>)
        });
        self.register_transform(TransformDefinition::new(pattern, invocable)?)
    }

    /// Registers a table transform returning any `Send` value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the pattern is invalid or already
    /// registered.
    pub fn table_transform<F, T>(
        &mut self,
        pattern: &str,
        f: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut W, &Table) -> eyre::Result<T> + Send + Sync + 'static,
        T: Any + Send,
    {
        let invocable: TableTransformFn<W> = Arc::new(move |world: &mut W, table: &Table| {
            f(world, table).map(|value| Box::new(value) as Box<dyn Any + Send>)
        });
        self.register_table_transform(TableTransformDefinition::new(pattern, invocable)?)
    }

    /// Registers a hook for `scope`, optionally restricted by a tag filter.
    pub fn hook<F>(&mut self, scope: HookScope, filter: Option<TagFilter>, f: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.register_hook(HookDefinition::new(scope, filter, Arc::new(f)))
    }

    /// Registers an unfiltered before-suite hook.
    pub fn before_suite<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hook(HookScope::BeforeSuite, None, f)
    }

    /// Registers an unfiltered after-suite hook.
    pub fn after_suite<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hook(HookScope::AfterSuite, None, f)
    }

    /// Registers an unfiltered before-feature hook.
    pub fn before_feature<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hook(HookScope::BeforeFeature, None, f)
    }

    /// Registers an unfiltered after-feature hook.
    pub fn after_feature<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hook(HookScope::AfterFeature, None, f)
    }

    /// Registers an unfiltered before-scenario hook.
    pub fn before_scenario<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hook(HookScope::BeforeScenario, None, f)
    }

    /// Registers an unfiltered after-scenario hook.
    pub fn after_scenario<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hook(HookScope::AfterScenario, None, f)
    }

    /// Registers an unfiltered before-step hook.
    pub fn before_step<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hook(HookScope::BeforeStep, None, f)
    }

    /// Registers an unfiltered after-step hook.
    pub fn after_step<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut HookContext<'_, W>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        self.hook(HookScope::AfterStep, None, f)
    }

    /// Freezes the builder into an immutable registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::PatternSet`] when the combined pattern set
    /// of a definition kind exceeds the regex engine's limits.
    pub fn build(self) -> Result<Registry<W>, RegistrationError> {
        let step_set = pattern_set(
            DefinitionKind::Step,
            self.steps.iter().map(StepDefinition::pattern),
        )?;
        let transform_set = pattern_set(
            DefinitionKind::Transform,
            self.transforms.iter().map(TransformDefinition::pattern),
        )?;
        let table_transform_set = pattern_set(
            DefinitionKind::TableTransform,
            self.table_transforms
                .iter()
                .map(TableTransformDefinition::pattern),
        )?;
        tracing::debug!(
            steps = self.steps.len(),
            transforms = self.transforms.len(),
            table_transforms = self.table_transforms.len(),
            hooks = self.hooks.len(),
            "registry built"
        );
        Ok(Registry {
            steps: self.steps,
            step_set,
            transforms: self.transforms,
            transform_set,
            table_transforms: self.table_transforms,
            table_transform_set,
            hooks: self.hooks,
        })
    }
}

fn pattern_set<'p>(
    kind: DefinitionKind,
    patterns: impl Iterator<Item = &'p Pattern>,
) -> Result<RegexSet, RegistrationError> {
    RegexSet::new(patterns.map(|pattern| pattern.as_regex().as_str())).map_err(|err| {
        RegistrationError::PatternSet {
            kind,
            message: err.to_string(),
        }
    })
}

/// The frozen set of definitions consulted during execution.
///
/// A registry is read-only and safe to share across worker threads.
pub struct Registry<W> {
    steps: Vec<StepDefinition<W>>,
    step_set: RegexSet,
    transforms: Vec<TransformDefinition<W>>,
    transform_set: RegexSet,
    table_transforms: Vec<TableTransformDefinition<W>>,
    table_transform_set: RegexSet,
    hooks: Vec<HookDefinition<W>>,
}

impl<W> Registry<W> {
    /// Returns every step definition in registration order.
    #[must_use]
    pub fn steps(&self) -> &[StepDefinition<W>] {
        &self.steps
    }

    /// Returns every scalar transform in registration order.
    #[must_use]
    pub fn transforms(&self) -> &[TransformDefinition<W>] {
        &self.transforms
    }

    /// Returns every table transform in registration order.
    #[must_use]
    pub fn table_transforms(&self) -> &[TableTransformDefinition<W>] {
        &self.table_transforms
    }

    /// Returns the hooks of `scope` in registration order.
    pub fn hooks(&self, scope: HookScope) -> impl Iterator<Item = &HookDefinition<W>> {
        self.hooks.iter().filter(move |hook| hook.scope() == scope)
    }

    /// Returns the step definitions whose pattern matches `text`, in
    /// registration order.
    #[must_use]
    pub fn matching_steps(&self, text: &str) -> Vec<&StepDefinition<W>> {
        select(&self.step_set, &self.steps, text)
    }

    /// Returns the scalar transforms whose pattern matches `value`, in
    /// registration order.
    #[must_use]
    pub fn matching_transforms(&self, value: &str) -> Vec<&TransformDefinition<W>> {
        select(&self.transform_set, &self.transforms, value)
    }

    /// Returns the table transforms whose pattern matches `signature`, in
    /// registration order.
    #[must_use]
    pub fn matching_table_transforms(&self, signature: &str) -> Vec<&TableTransformDefinition<W>> {
        select(&self.table_transform_set, &self.table_transforms, signature)
    }
}

fn select<'r, T>(set: &RegexSet, definitions: &'r [T], text: &str) -> Vec<&'r T> {
    set.matches(text)
        .into_iter()
        .filter_map(|index| definitions.get(index))
        .collect()
}

impl<W> std::fmt::Debug for Registry<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("steps", &self.steps)
            .field("transforms", &self.transforms)
            .field("table_transforms", &self.table_transforms)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
