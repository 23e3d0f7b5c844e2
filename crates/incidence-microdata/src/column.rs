//! Typed column storage and scalar values.
//!
//! A column is numeric, boolean, or categorical. `None` marks a missing
//! value. Boolean columns take part in numeric statistics as 1/0, which is
//! how poverty flags turn into headcounts.

use serde::{Deserialize, Serialize};

/// A single value used in equality filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A boolean flag.
    Bool(bool),
    /// A numeric value.
    Number(f64),
    /// A categorical label.
    Text(String),
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Self::Number(x)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// One variable's values, one entry per table record.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric values.
    Numeric(Vec<Option<f64>>),
    /// Boolean flags; numeric statistics read them as 1/0.
    Boolean(Vec<Option<bool>>),
    /// Categorical labels; only equality filters apply.
    Categorical(Vec<Option<String>>),
}

impl Column {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Boolean(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    /// Whether the column has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether numeric statistics and range bounds apply.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_) | Self::Boolean(_))
    }

    /// Numeric reading of the entry at `row`.
    ///
    /// Returns `None` for missing entries, out-of-range rows, and every
    /// categorical entry.
    pub fn number_at(&self, row: usize) -> Option<f64> {
        match self {
            Self::Numeric(v) => v.get(row).copied().flatten(),
            Self::Boolean(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(|b| if b { 1.0 } else { 0.0 }),
            Self::Categorical(_) => None,
        }
    }

    /// Whether the entry at `row` is present.
    pub fn is_present(&self, row: usize) -> bool {
        match self {
            Self::Numeric(v) => v.get(row).is_some_and(Option::is_some),
            Self::Boolean(v) => v.get(row).is_some_and(Option::is_some),
            Self::Categorical(v) => v.get(row).is_some_and(Option::is_some),
        }
    }

    /// Whether the entry at `row` equals `scalar` exactly.
    ///
    /// Numbers compare by value, so a boolean entry equals `1.0`/`0.0` as
    /// well as `true`/`false`, and a numeric 0/1 flag equals `false`/`true`.
    /// Missing entries never match.
    #[allow(clippy::float_cmp)]
    pub fn equals_at(&self, row: usize, scalar: &Scalar) -> bool {
        match (self, scalar) {
            (Self::Categorical(v), Scalar::Text(s)) => {
                v.get(row).and_then(Option::as_deref) == Some(s.as_str())
            }
            (Self::Boolean(v), Scalar::Bool(b)) => v.get(row).copied().flatten() == Some(*b),
            (Self::Numeric(_) | Self::Boolean(_), Scalar::Number(x)) => {
                self.number_at(row).is_some_and(|value| value == *x)
            }
            (Self::Numeric(_), Scalar::Bool(b)) => self
                .number_at(row)
                .is_some_and(|value| value == if *b { 1.0 } else { 0.0 }),
            _ => false,
        }
    }

    /// Build a new column by picking entries by row; `None` yields a missing
    /// entry.
    pub fn gather(&self, rows: &[Option<usize>]) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(
                rows.iter()
                    .map(|r| r.and_then(|i| v.get(i).copied().flatten()))
                    .collect(),
            ),
            Self::Boolean(v) => Self::Boolean(
                rows.iter()
                    .map(|r| r.and_then(|i| v.get(i).copied().flatten()))
                    .collect(),
            ),
            Self::Categorical(v) => Self::Categorical(
                rows.iter()
                    .map(|r| r.and_then(|i| v.get(i).cloned().flatten()))
                    .collect(),
            ),
        }
    }

    /// Short kind label for log messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Boolean(_) => "boolean",
            Self::Categorical(_) => "categorical",
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Self::Numeric(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<f64>>> for Column {
    fn from(values: Vec<Option<f64>>) -> Self {
        Self::Numeric(values)
    }
}

impl From<Vec<bool>> for Column {
    fn from(values: Vec<bool>) -> Self {
        Self::Boolean(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<bool>>> for Column {
    fn from(values: Vec<Option<bool>>) -> Self {
        Self::Boolean(values)
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Self::Categorical(values.into_iter().map(|s| Some(s.to_owned())).collect())
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Self::Categorical(values.into_iter().map(Some).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn boolean_reads_as_one_or_zero() {
        let col = Column::from(vec![Some(true), Some(false), None]);
        assert_eq!(col.number_at(0), Some(1.0));
        assert_eq!(col.number_at(1), Some(0.0));
        assert_eq!(col.number_at(2), None);
        assert_eq!(col.number_at(9), None);
    }

    #[test]
    fn categorical_is_not_numeric() {
        let col = Column::from(vec!["north", "south"]);
        assert!(!col.is_numeric());
        assert_eq!(col.number_at(0), None);
        assert!(col.equals_at(1, &Scalar::from("south")));
        assert!(!col.equals_at(1, &Scalar::from(1.0)));
    }

    #[test]
    fn numeric_equality() {
        let col = Column::from(vec![Some(3.0), None]);
        assert!(col.equals_at(0, &Scalar::Number(3.0)));
        assert!(!col.equals_at(1, &Scalar::Number(3.0)));
    }

    #[test]
    fn numeric_flag_equals_bool() {
        let col = Column::from(vec![Some(1.0), Some(0.0), Some(0.5), None]);
        assert!(col.equals_at(0, &Scalar::Bool(true)));
        assert!(col.equals_at(1, &Scalar::Bool(false)));
        assert!(!col.equals_at(2, &Scalar::Bool(true)));
        assert!(!col.equals_at(3, &Scalar::Bool(false)));
    }

    #[test]
    fn gather_picks_rows_and_fills_missing() {
        let col = Column::from(vec![10.0, 20.0, 30.0]);
        let picked = col.gather(&[Some(2), None, Some(0), Some(0)]);
        assert_eq!(
            picked,
            Column::Numeric(vec![Some(30.0), None, Some(10.0), Some(10.0)])
        );
    }

    #[test]
    fn scalar_deserializes_untagged() {
        let n: Scalar = serde_json::from_str("3").unwrap();
        let b: Scalar = serde_json::from_str("true").unwrap();
        let s: Scalar = serde_json::from_str("\"male\"").unwrap();
        assert_eq!(n, Scalar::Number(3.0));
        assert_eq!(b, Scalar::Bool(true));
        assert_eq!(s, Scalar::Text("male".into()));
    }
}
