//! Lifecycle hook context and dispatch.

use crate::model::Step;
use crate::registry::{HookScope, Registry};
use crate::report::{HookFailure, Outcome};
use crate::tags::TagSet;

use super::guarded;

/// What a hook sees of the boundary it runs at.
///
/// Suite hooks see neither feature nor scenario. Feature hooks see the
/// feature. Scenario and step hooks also see the scenario and get mutable
/// access to its world; step hooks see the step, and after-step hooks its
/// outcome.
pub struct HookContext<'a, W> {
    scope: HookScope,
    feature: Option<&'a str>,
    scenario: Option<&'a str>,
    tags: &'a TagSet,
    step: Option<&'a Step>,
    outcome: Option<Outcome>,
    world: Option<&'a mut W>,
}

impl<'a, W> HookContext<'a, W> {
    pub(crate) const fn suite(scope: HookScope, tags: &'a TagSet) -> Self {
        Self {
            scope,
            feature: None,
            scenario: None,
            tags,
            step: None,
            outcome: None,
            world: None,
        }
    }

    pub(crate) const fn feature(scope: HookScope, feature: &'a str, tags: &'a TagSet) -> Self {
        Self {
            scope,
            feature: Some(feature),
            scenario: None,
            tags,
            step: None,
            outcome: None,
            world: None,
        }
    }

    pub(crate) const fn scenario(
        scope: HookScope,
        feature: &'a str,
        scenario: &'a str,
        tags: &'a TagSet,
        world: &'a mut W,
    ) -> Self {
        Self {
            scope,
            feature: Some(feature),
            scenario: Some(scenario),
            tags,
            step: None,
            outcome: None,
            world: Some(world),
        }
    }

    #[must_use]
    pub(crate) const fn with_step(mut self, step: &'a Step, outcome: Option<Outcome>) -> Self {
        self.step = Some(step);
        self.outcome = outcome;
        self
    }

    /// Returns the boundary the hook runs at.
    #[must_use]
    pub const fn scope(&self) -> HookScope {
        self.scope
    }

    /// Returns the current feature's name.
    #[must_use]
    pub const fn feature_name(&self) -> Option<&str> {
        self.feature
    }

    /// Returns the current scenario's name.
    #[must_use]
    pub const fn scenario_name(&self) -> Option<&str> {
        self.scenario
    }

    /// Returns the tags of the feature or scenario, depending on scope.
    #[must_use]
    pub const fn tags(&self) -> &TagSet {
        self.tags
    }

    /// Returns the step, for step hooks.
    #[must_use]
    pub const fn step(&self) -> Option<&Step> {
        self.step
    }

    /// Returns the step's outcome, for after-step hooks.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Returns the scenario's world, for scenario and step hooks.
    pub fn world(&mut self) -> Option<&mut W> {
        self.world.as_deref_mut()
    }
}

/// Runs the hooks of `context`'s scope whose filter accepts its tags.
///
/// Before-hooks stop at the first failure; after-hooks all run. Returns the
/// failures in order.
pub(crate) fn fire<W>(registry: &Registry<W>, mut context: HookContext<'_, W>) -> Vec<HookFailure> {
    let scope = context.scope;
    let tags = context.tags;
    let mut failures = Vec::new();
    for hook in registry.hooks(scope).filter(|hook| hook.applies_to(tags)) {
        if let Err(report) = guarded(|| hook.invoke(&mut context)) {
            tracing::warn!(%scope, error = %report, "hook failed");
            failures.push(HookFailure::new(scope, &report));
            if scope.is_before() {
                break;
            }
        }
    }
    failures
}
