//! Typed per-epoch feature tables
//!
//! A [`FeatureTable`] holds one row per epoch, in epoch order, together with
//! a column schema checked when the table is built.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use somno_core::{ShapeError, SleepStage};

/// One epoch's worth of numeric features plus its label
pub trait FeatureRow {
    /// Index of the epoch this row was computed from
    fn epoch(&self) -> usize;

    /// Sleep stage of that epoch
    fn stage(&self) -> SleepStage;

    /// Feature values in column order
    fn values(&self) -> Vec<f64>;
}

/// Rows of per-epoch features sharing one column schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable<R> {
    columns: Vec<String>,
    rows: Vec<R>,
}

impl<R: FeatureRow> FeatureTable<R> {
    /// Build a table, checking every row against the column schema.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::Ragged`] for the first row whose value count
    /// differs from the number of columns.
    pub fn new(columns: Vec<String>, rows: Vec<R>) -> Result<Self, ShapeError> {
        for (row, r) in rows.iter().enumerate() {
            let len = r.values().len();
            if len != columns.len() {
                return Err(ShapeError::Ragged { row, len, expected: columns.len() });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Column names, excluding the epoch index and label
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in epoch order
    #[must_use]
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Consume the table and return its rows
    #[must_use]
    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Labels in row order
    #[must_use]
    pub fn stages(&self) -> Vec<SleepStage> {
        self.rows.iter().map(FeatureRow::stage).collect()
    }

    /// Dense feature matrix: `[row][column]`
    #[must_use]
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(FeatureRow::values).collect()
    }

    /// Render as delimited text with an `epoch` column first and a `stage`
    /// column last.
    #[must_use]
    pub fn to_delimited(&self, separator: char) -> String {
        let mut out = String::new();
        out.push_str("epoch");
        for c in &self.columns {
            out.push(separator);
            out.push_str(c);
        }
        out.push(separator);
        out.push_str("stage\n");

        for row in &self.rows {
            let _ = write!(out, "{}", row.epoch());
            for v in row.values() {
                let _ = write!(out, "{separator}{v}");
            }
            let _ = writeln!(out, "{separator}{}", row.stage());
        }
        out
    }
}
