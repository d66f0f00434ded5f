//! Scenario input model.
//!
//! These types describe already-tokenised features as handed over by an
//! external parser: a feature carries tags, an optional background, and a list
//! of scenarios or scenario outlines; each step is a keyword, its text, and an
//! optional multiline argument. All types are serde-compatible so a parser in
//! another process can hand features over as JSON or TOML.
//!
//! [`Feature::scenarios`] flattens a feature into the concrete scenarios the
//! runner executes: background steps are prepended, feature tags are
//! inherited, and outlines expand to one scenario per example row.

mod outline;
mod table;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tags::TagSet;

pub use table::{TABLE_SIGNATURE_PREFIX, Table};

/// The keyword introducing a step.
///
/// Keywords are presentation metadata only; matching ignores them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    /// `Given`.
    #[default]
    Given,
    /// `When`.
    When,
    /// `Then`.
    Then,
    /// `And`.
    And,
    /// `But`.
    But,
    /// `*`.
    Star,
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
            Self::Star => "*",
        })
    }
}

/// A multiline argument attached to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MultilineArgument {
    /// A table whose first row is the header.
    Table(Table),
    /// A free-text doc string.
    Text(String),
}

/// One step of a scenario.
///
/// The same type doubles as a chained sub-step returned from a step
/// definition (see [`crate::engine::SubStep`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// The keyword introducing the step.
    pub keyword: Keyword,
    /// The step text matched against definitions.
    pub text: String,
    /// The optional multiline argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<MultilineArgument>,
}

impl Step {
    /// Creates a step without a multiline argument.
    #[must_use]
    pub fn new(keyword: Keyword, text: impl Into<String>) -> Self {
        Self {
            keyword,
            text: text.into(),
            argument: None,
        }
    }

    /// Creates a `Given` step.
    #[must_use]
    pub fn given(text: impl Into<String>) -> Self {
        Self::new(Keyword::Given, text)
    }

    /// Creates a `When` step.
    #[must_use]
    pub fn when(text: impl Into<String>) -> Self {
        Self::new(Keyword::When, text)
    }

    /// Creates a `Then` step.
    #[must_use]
    pub fn then(text: impl Into<String>) -> Self {
        Self::new(Keyword::Then, text)
    }

    /// Attaches a table argument.
    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.argument = Some(MultilineArgument::Table(table));
        self
    }

    /// Attaches a doc string argument.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.argument = Some(MultilineArgument::Text(text.into()));
        self
    }
}

/// A concrete scenario: a named, tagged, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// The scenario title.
    pub name: String,
    /// Tags declared on the scenario.
    #[serde(default)]
    pub tags: TagSet,
    /// The steps, in execution order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Creates an untagged scenario.
    #[must_use]
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            tags: TagSet::new(),
            steps,
        }
    }

    /// Replaces the scenario's tags.
    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }
}

/// A scenario template expanded once per example row.
///
/// `<column>` tokens in step text, table cells, and doc strings are replaced
/// with the row's value for that column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// The outline title.
    pub name: String,
    /// Tags declared on the outline.
    #[serde(default)]
    pub tags: TagSet,
    /// The template steps.
    pub steps: Vec<Step>,
    /// The examples table; its header names the substitution columns.
    pub examples: Table,
}

/// Either a plain scenario or an outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioDefinition {
    /// A plain scenario.
    Scenario(Scenario),
    /// A scenario outline.
    Outline(Outline),
}

impl From<Scenario> for ScenarioDefinition {
    fn from(scenario: Scenario) -> Self {
        Self::Scenario(scenario)
    }
}

impl From<Outline> for ScenarioDefinition {
    fn from(outline: Outline) -> Self {
        Self::Outline(outline)
    }
}

/// A feature: a tagged group of scenarios sharing an optional background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// The feature title.
    pub name: String,
    /// Tags declared on the feature, inherited by every scenario.
    #[serde(default)]
    pub tags: TagSet,
    /// Steps prepended to every scenario.
    #[serde(default)]
    pub background: Vec<Step>,
    /// The scenarios and outlines, in declaration order.
    pub scenarios: Vec<ScenarioDefinition>,
}

impl Feature {
    /// Creates an untagged feature without a background.
    #[must_use]
    pub fn new(name: impl Into<String>, scenarios: Vec<ScenarioDefinition>) -> Self {
        Self {
            name: name.into(),
            tags: TagSet::new(),
            background: Vec::new(),
            scenarios,
        }
    }

    /// Replaces the feature's tags.
    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Replaces the feature's background steps.
    #[must_use]
    pub fn with_background(mut self, background: Vec<Step>) -> Self {
        self.background = background;
        self
    }

    /// Flattens the feature into the concrete scenarios the runner executes.
    ///
    /// Each returned scenario carries the union of feature and scenario tags
    /// and starts with the background steps.
    #[must_use]
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.scenarios
            .iter()
            .flat_map(|definition| match definition {
                ScenarioDefinition::Scenario(scenario) => vec![scenario.clone()],
                ScenarioDefinition::Outline(template) => template.expand(),
            })
            .map(|scenario| self.inherit(scenario))
            .collect()
    }

    fn inherit(&self, scenario: Scenario) -> Scenario {
        let Scenario { name, tags, steps } = scenario;
        Scenario {
            name,
            tags: self.tags.union(&tags),
            steps: self.background.iter().cloned().chain(steps).collect(),
        }
    }
}
