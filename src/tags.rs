//! Scenario tags and boolean tag filter expressions.
//!
//! Tags are stored without their leading `@`. A [`TagFilter`] is parsed from an
//! expression where `,` separates alternatives inside a group, `&&` joins
//! groups that must all hold, and `~` negates a single tag:
//!
//! ```
//! use stepwright::tags::{TagFilter, TagSet};
//!
//! let filter: TagFilter = "@web,@api&&~@slow".parse().expect("valid filter");
//! assert!(filter.matches(&TagSet::from_iter(["web"])));
//! assert!(!filter.matches(&TagSet::from_iter(["api", "slow"])));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TagFilterError;

/// An ordered set of tags attached to a feature or scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    /// Creates an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a tag, stripping any leading `@`.
    pub fn insert(&mut self, tag: &str) {
        self.0.insert(normalise(tag).to_owned());
    }

    /// Returns whether the set contains `tag` (with or without `@`).
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(normalise(tag))
    }

    /// Returns the union of this set and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Iterates the tags in sorted order, without `@`.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the set has no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for TagSet {
    fn from(tags: Vec<String>) -> Self {
        tags.iter().collect()
    }
}

impl From<TagSet> for Vec<String> {
    fn from(tags: TagSet) -> Self {
        tags.0.into_iter().collect()
    }
}

fn normalise(tag: &str) -> &str {
    tag.trim().strip_prefix('@').unwrap_or_else(|| tag.trim())
}

/// A single, possibly negated, tag reference inside a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TagTerm {
    tag: String,
    negated: bool,
}

impl TagTerm {
    fn holds_for(&self, tags: &TagSet) -> bool {
        tags.contains(&self.tag) != self.negated
    }
}

/// A parsed boolean expression over a [`TagSet`].
///
/// The filter is a conjunction of groups; each group is a disjunction of
/// terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    source: String,
    groups: Vec<Vec<TagTerm>>,
}

impl TagFilter {
    /// Parses a tag filter expression.
    ///
    /// # Errors
    ///
    /// Returns [`TagFilterError`] when the expression is empty, contains an
    /// empty term, or contains a tag with whitespace or separator characters.
    pub fn parse(expression: &str) -> Result<Self, TagFilterError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(TagFilterError::Empty);
        }

        let groups = trimmed
            .split("&&")
            .map(|group| parse_group(group, trimmed))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: trimmed.to_owned(),
            groups,
        })
    }

    /// Returns whether `tags` satisfies the expression.
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        self.groups
            .iter()
            .all(|group| group.iter().any(|term| term.holds_for(tags)))
    }

    /// Returns the expression as written (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn parse_group(group: &str, expression: &str) -> Result<Vec<TagTerm>, TagFilterError> {
    group
        .split(',')
        .map(|raw| parse_term(raw, expression))
        .collect()
}

fn parse_term(raw: &str, expression: &str) -> Result<TagTerm, TagFilterError> {
    let term = raw.trim();
    let (negated, rest) = term
        .strip_prefix('~')
        .map_or((false, term), |stripped| (true, stripped.trim_start()));
    let tag = rest.strip_prefix('@').unwrap_or(rest);

    if tag.is_empty() {
        return Err(TagFilterError::EmptyTerm {
            expression: expression.to_owned(),
        });
    }
    if tag
        .chars()
        .any(|ch| ch.is_whitespace() || matches!(ch, '@' | '~' | ',' | '&'))
    {
        return Err(TagFilterError::InvalidTag {
            expression: expression.to_owned(),
            tag: tag.to_owned(),
        });
    }

    Ok(TagTerm {
        tag: tag.to_owned(),
        negated,
    })
}

impl FromStr for TagFilter {
    type Err = TagFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
