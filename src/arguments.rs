//! Arguments handed to step invocables.
//!
//! Captured groups come first, in pattern order, followed by the step's
//! multiline argument if it has one. A captured group matched by a transform
//! carries the transform's value alongside the raw text.

use std::any::{Any, type_name};
use std::fmt;
use std::str::FromStr;

use eyre::eyre;

use crate::model::Table;

/// One argument of a step invocation.
pub enum Argument {
    /// A captured group left as text.
    Captured(String),
    /// A captured group (or table) replaced by a transform's value.
    Transformed {
        /// The text the transform received; a table's signature for tables.
        raw: String,
        /// The transform's return value.
        value: Box<dyn Any + Send>,
    },
    /// A table multiline argument no transform claimed.
    Table(Table),
    /// A doc string multiline argument.
    Text(String),
}

impl Argument {
    /// Returns the argument's text: the capture, the transform input, or the
    /// doc string. Tables have none.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Captured(text) | Self::Text(text) | Self::Transformed { raw: text, .. } => {
                Some(text)
            }
            Self::Table(_) => None,
        }
    }

    fn as_any(&self) -> &dyn Any {
        match self {
            Self::Captured(text) | Self::Text(text) => text,
            Self::Transformed { value, .. } => &**value,
            Self::Table(table) => table,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Captured(text) => f.debug_tuple("Captured").field(text).finish(),
            Self::Transformed { raw, .. } => f
                .debug_struct("Transformed")
                .field("raw", raw)
                .finish_non_exhaustive(),
            Self::Table(table) => f.debug_tuple("Table").field(table).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}

/// The ordered arguments of one step invocation.
#[derive(Debug, Default)]
pub struct Arguments {
    items: Vec<Argument>,
}

impl Arguments {
    /// Wraps an ordered list of arguments.
    #[must_use]
    pub const fn new(items: Vec<Argument>) -> Self {
        Self { items }
    }

    /// Returns the number of arguments, the multiline argument included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates the arguments in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.items.iter()
    }

    /// Returns the raw text of argument `index`.
    #[must_use]
    pub fn raw(&self, index: usize) -> Option<&str> {
        self.items.get(index).and_then(Argument::raw)
    }

    /// Borrows argument `index` as `T`.
    ///
    /// Untransformed captures and doc strings are `String`s and tables are
    /// [`Table`]s; transformed arguments are whatever the transform returned.
    ///
    /// # Errors
    ///
    /// Fails when there is no argument at `index` or it does not hold a `T`.
    pub fn get<T: Any>(&self, index: usize) -> eyre::Result<&T> {
        self.argument(index)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| mismatch::<T>(index))
    }

    /// Parses the raw text of argument `index` with [`FromStr`].
    ///
    /// # Errors
    ///
    /// Fails when there is no argument at `index`, it has no text, or the
    /// text does not parse.
    pub fn parse<T>(&self, index: usize) -> eyre::Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self
            .argument(index)?
            .raw()
            .ok_or_else(|| eyre!("argument {index} has no text to parse"))?;
        raw.parse::<T>()
            .map_err(|err| eyre!("argument {index} ('{raw}') is not a valid {}: {err}", type_name::<T>()))
    }

    /// Moves argument `index` out as `T`, leaving its raw text behind.
    ///
    /// # Errors
    ///
    /// Fails when there is no argument at `index` or it does not hold a `T`.
    pub fn take<T: Any>(&mut self, index: usize) -> eyre::Result<T> {
        let slot = self.items.get_mut(index).ok_or_else(|| missing(index))?;
        if !slot.as_any().is::<T>() {
            return Err(mismatch::<T>(index));
        }
        let remnant = Argument::Captured(slot.raw().unwrap_or_default().to_owned());
        let boxed: Box<dyn Any + Send> = match std::mem::replace(slot, remnant) {
            Argument::Captured(text) | Argument::Text(text) => Box::new(text),
            Argument::Transformed { value, .. } => value,
            Argument::Table(table) => Box::new(table),
        };
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| mismatch::<T>(index))
    }

    /// Returns the table multiline argument, if the step has one and no
    /// transform replaced it.
    #[must_use]
    pub fn table(&self) -> Option<&Table> {
        self.items.iter().rev().find_map(|item| match item {
            Argument::Table(table) => Some(table),
            _ => None,
        })
    }

    /// Returns the doc string multiline argument, if the step has one.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.items.iter().rev().find_map(|item| match item {
            Argument::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    fn argument(&self, index: usize) -> eyre::Result<&Argument> {
        self.items.get(index).ok_or_else(|| missing(index))
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn missing(index: usize) -> eyre::Report {
    eyre!("step has no argument at position {index}")
}

fn mismatch<T>(index: usize) -> eyre::Report {
    eyre!("argument {index} does not hold a {}", type_name::<T>())
}
