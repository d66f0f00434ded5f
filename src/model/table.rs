//! Tabular multiline arguments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Marker prefixed to a table's header signature for table transforms.
pub const TABLE_SIGNATURE_PREFIX: &str = "table:";

/// A table argument attached to a step, or the examples of an outline.
///
/// The first row is the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from rows of cells; the first row is the header.
    pub fn new<R, C>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Returns every row, header included.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the header row, or an empty slice for an empty table.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        self.rows.first().map_or(&[][..], Vec::as_slice)
    }

    /// Returns the rows after the header.
    #[must_use]
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Returns each body row keyed by its column header.
    ///
    /// Cells beyond the header width are ignored.
    #[must_use]
    pub fn hashes(&self) -> Vec<BTreeMap<&str, &str>> {
        let headers = self.headers();
        self.body()
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .zip(row)
                    .map(|(header, cell)| (header.as_str(), cell.as_str()))
                    .collect()
            })
            .collect()
    }

    /// Returns the header signature matched by table transforms,
    /// e.g. `table:name,email`.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{TABLE_SIGNATURE_PREFIX}{}", self.headers().join(","))
    }

    /// Returns whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn map_cells(&self, mut f: impl FnMut(&str) -> String) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(|cell| f(cell)).collect())
                .collect(),
        }
    }
}
