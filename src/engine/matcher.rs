//! Step text resolution.

use std::fmt;

use crate::registry::{Registry, StepDefinition};

/// The result of resolving a step text against the registry.
pub enum MatchResult<'r, W> {
    /// No definition matched.
    NoMatch,
    /// Exactly one definition matched.
    Unique {
        /// The matching definition.
        definition: &'r StepDefinition<W>,
        /// The captured groups, positionally; non-participating groups are
        /// empty strings.
        captures: Vec<String>,
    },
    /// Several definitions matched, in registration order.
    Ambiguous(Vec<&'r StepDefinition<W>>),
}

impl<W> fmt::Debug for MatchResult<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => f.write_str("NoMatch"),
            Self::Unique {
                definition,
                captures,
            } => f
                .debug_struct("Unique")
                .field("definition", definition)
                .field("captures", captures)
                .finish(),
            Self::Ambiguous(definitions) => f.debug_tuple("Ambiguous").field(definitions).finish(),
        }
    }
}

impl<W> MatchResult<'_, W> {
    /// Returns the pattern sources of every matching definition.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        match self {
            Self::NoMatch => Vec::new(),
            Self::Unique { definition, .. } => vec![definition.pattern().source().to_owned()],
            Self::Ambiguous(definitions) => definitions
                .iter()
                .map(|definition| definition.pattern().source().to_owned())
                .collect(),
        }
    }
}

/// Resolves `text` against every step pattern of `registry`.
///
/// Matching is anchored to the whole text and case-sensitive. The step keyword
/// is not part of the text and never affects the result.
#[must_use]
pub fn match_step<'r, W>(registry: &'r Registry<W>, text: &str) -> MatchResult<'r, W> {
    let mut candidates = registry.matching_steps(text);
    if candidates.len() > 1 {
        return MatchResult::Ambiguous(candidates);
    }
    match candidates.pop() {
        None => MatchResult::NoMatch,
        Some(definition) => definition.pattern().captures(text).map_or(
            MatchResult::NoMatch,
            |captures| MatchResult::Unique {
                definition,
                captures,
            },
        ),
    }
}

impl<W> Registry<W> {
    /// Resolves `text` to zero, one, or several step definitions.
    ///
    /// See [`match_step`].
    #[must_use]
    pub fn match_step(&self, text: &str) -> MatchResult<'_, W> {
        match_step(self, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> Registry<()> {
        let mut builder = RegistryBuilder::<()>::new();
        builder
            .given(r#"^some step with "([^"]*)" argument$"#, |_, _| Ok(()))
            .and_then(|b| b.then(r"^number step with (\d+)$", |_, _| Ok(())))
            .and_then(|b| b.step(r"^number step with (\w+)$", |_, _| Ok(())))
            .and_then(|b| b.when("I log in as {user}", |_, _| Ok(())))
            .expect("definitions should register");
        builder.build().expect("registry should build")
    }

    #[rstest]
    fn unique_match_returns_captures(registry: Registry<()>) {
        let result = registry.match_step(r#"some step with "string" argument"#);
        let MatchResult::Unique { definition, captures } = result else {
            panic!("expected a unique match");
        };
        assert_eq!(
            definition.pattern().source(),
            r#"^some step with "([^"]*)" argument$"#
        );
        assert_eq!(captures, vec![String::from("string")]);
    }

    #[rstest]
    fn overlapping_patterns_are_ambiguous_in_registration_order(registry: Registry<()>) {
        let result = registry.match_step("number step with 23");
        assert!(matches!(result, MatchResult::Ambiguous(_)));
        assert_eq!(
            result.patterns(),
            vec![
                String::from(r"^number step with (\d+)$"),
                String::from(r"^number step with (\w+)$"),
            ]
        );
    }

    #[rstest]
    #[case("number step with twenty three")]
    #[case("Some step with \"string\" argument")]
    #[case("I log in as")]
    fn unmatched_text_is_no_match(registry: Registry<()>, #[case] text: &str) {
        assert!(matches!(registry.match_step(text), MatchResult::NoMatch));
    }

    #[rstest]
    fn placeholder_patterns_resolve(registry: Registry<()>) {
        let result = match_step(&registry, "I log in as ada");
        assert_eq!(result.patterns(), vec![String::from("I log in as {user}")]);
    }
}
