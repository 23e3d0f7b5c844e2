//! Filters selecting a weighted subpopulation.
//!
//! A [`Filter`] is either an absolute [`Filter::Threshold`] on a column's raw
//! values or a [`Filter::QuantileThreshold`] on the weighted rank bucket of
//! a column. Bounds are either a range or an exact match, never both, so
//! contradictory combinations cannot be expressed. Each side of a range may
//! be inclusive or strict, which lets adjacent bands such as `[0, 18)` and
//! `[18, 65)` tile the real line.
//!
//! Applying a filter yields a [`Selection`]: row indices into the original
//! table, not a copy.

use serde::{Deserialize, Serialize};

use incidence_types::Statistic;

use crate::column::Scalar;
use crate::error::MicrodataError;
use crate::rank::{DecileAssigner, UNRANKED_BUCKET};
use crate::stats::weighted_statistic;
use crate::sum::CompensatedSum;
use crate::table::WeightedTable;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Bound on an absolute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// Range; every present side must hold and an absent side is
    /// unbounded.
    Range {
        /// Inclusive lower bound (`value >= geq`).
        #[serde(default)]
        geq: Option<f64>,
        /// Inclusive upper bound (`value <= leq`).
        #[serde(default)]
        leq: Option<f64>,
        /// Strict lower bound (`value > gt`).
        #[serde(default)]
        gt: Option<f64>,
        /// Strict upper bound (`value < lt`).
        #[serde(default)]
        lt: Option<f64>,
    },
    /// Exact match.
    Eq(Scalar),
}

impl Bound {
    /// `value >= x`.
    pub const fn at_least(x: f64) -> Self {
        Self::Range {
            geq: Some(x),
            leq: None,
            gt: None,
            lt: None,
        }
    }

    /// `value <= x`.
    pub const fn at_most(x: f64) -> Self {
        Self::Range {
            geq: None,
            leq: Some(x),
            gt: None,
            lt: None,
        }
    }

    /// `value < x`.
    pub const fn below(x: f64) -> Self {
        Self::Range {
            geq: None,
            leq: None,
            gt: None,
            lt: Some(x),
        }
    }

    /// `lo <= value <= hi`.
    pub const fn between(lo: f64, hi: f64) -> Self {
        Self::Range {
            geq: Some(lo),
            leq: Some(hi),
            gt: None,
            lt: None,
        }
    }

    /// `lo <= value < hi`.
    pub const fn half_open(lo: f64, hi: f64) -> Self {
        Self::Range {
            geq: Some(lo),
            leq: None,
            gt: None,
            lt: Some(hi),
        }
    }

    /// `value == x`.
    pub fn equal(x: impl Into<Scalar>) -> Self {
        Self::Eq(x.into())
    }

    /// Whether a numeric value satisfies the bound.
    ///
    /// An exact bound on a non-numeric scalar never matches a number; `NaN`
    /// never matches anything.
    #[allow(clippy::float_cmp)]
    pub fn contains(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        match self {
            Self::Range { geq, leq, gt, lt } => {
                geq.is_none_or(|lo| value >= lo)
                    && leq.is_none_or(|hi| value <= hi)
                    && gt.is_none_or(|lo| value > lo)
                    && lt.is_none_or(|hi| value < hi)
            }
            Self::Eq(Scalar::Number(x)) => value == *x,
            Self::Eq(Scalar::Bool(b)) => value == if *b { 1.0 } else { 0.0 },
            Self::Eq(Scalar::Text(_)) => false,
        }
    }
}

/// Bound on a weighted rank bucket (`1..=bucket_count`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantileBound {
    /// Inclusive bucket range; an absent side is unbounded.
    Range {
        /// Lowest bucket kept.
        #[serde(default)]
        geq: Option<u32>,
        /// Highest bucket kept.
        #[serde(default)]
        leq: Option<u32>,
    },
    /// A single bucket.
    Eq(u32),
}

impl QuantileBound {
    /// Whether a bucket satisfies the bound. The unranked sentinel never
    /// does.
    pub fn contains(&self, bucket: i32) -> bool {
        if bucket == UNRANKED_BUCKET {
            return false;
        }
        let Ok(bucket) = u32::try_from(bucket) else {
            return false;
        };
        match self {
            Self::Range { geq, leq } => {
                geq.is_none_or(|lo| bucket >= lo) && leq.is_none_or(|hi| bucket <= hi)
            }
            Self::Eq(q) => bucket == *q,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A predicate selecting records of a [`WeightedTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Bound on the variable's raw values.
    Threshold {
        /// Variable tested.
        variable: String,
        /// Accepted values.
        bound: Bound,
    },
    /// Bound on the variable's weighted rank bucket, computed over the
    /// whole table the filter is applied to.
    QuantileThreshold {
        /// Variable ranked.
        variable: String,
        /// Number of rank buckets (10 for deciles).
        bucket_count: u32,
        /// Accepted buckets.
        bound: QuantileBound,
    },
}

impl Filter {
    /// Absolute-value filter.
    pub fn threshold(variable: impl Into<String>, bound: Bound) -> Self {
        Self::Threshold {
            variable: variable.into(),
            bound,
        }
    }

    /// Rank-bucket filter.
    pub fn quantile(variable: impl Into<String>, bucket_count: u32, bound: QuantileBound) -> Self {
        Self::QuantileThreshold {
            variable: variable.into(),
            bucket_count,
            bound,
        }
    }

    /// Records in bucket `q` of `bucket_count` (for example the 3rd decile).
    pub fn quantile_eq(variable: impl Into<String>, bucket_count: u32, q: u32) -> Self {
        Self::quantile(variable, bucket_count, QuantileBound::Eq(q))
    }

    /// Records in buckets `1..=q` (for example the bottom five deciles).
    pub fn quantile_leq(variable: impl Into<String>, bucket_count: u32, q: u32) -> Self {
        Self::quantile(
            variable,
            bucket_count,
            QuantileBound::Range {
                geq: None,
                leq: Some(q),
            },
        )
    }

    /// Records in buckets `q..=bucket_count` (for example the top two
    /// deciles).
    pub fn quantile_geq(variable: impl Into<String>, bucket_count: u32, q: u32) -> Self {
        Self::quantile(
            variable,
            bucket_count,
            QuantileBound::Range {
                geq: Some(q),
                leq: None,
            },
        )
    }

    /// The variable the filter reads.
    pub fn variable(&self) -> &str {
        match self {
            Self::Threshold { variable, .. } | Self::QuantileThreshold { variable, .. } => variable,
        }
    }

    /// One flag per table row: whether the record passes.
    ///
    /// # Errors
    ///
    /// - [`MicrodataError::VariableNotFound`] if the variable is absent.
    /// - [`MicrodataError::NonNumericVariable`] for a range bound or a
    ///   quantile filter on a categorical column.
    /// - [`MicrodataError::InvalidBucketCount`] for zero buckets.
    pub fn mask(&self, table: &WeightedTable) -> Result<Vec<bool>, MicrodataError> {
        match self {
            Self::Threshold { variable, bound } => {
                let column = table.column(variable)?;
                match bound {
                    Bound::Eq(scalar) => Ok((0..table.len())
                        .map(|row| column.equals_at(row, scalar))
                        .collect()),
                    Bound::Range { .. } => {
                        let column = table.numeric_column(variable)?;
                        Ok((0..table.len())
                            .map(|row| column.number_at(row).is_some_and(|v| bound.contains(v)))
                            .collect())
                    }
                }
            }
            Self::QuantileThreshold {
                variable,
                bucket_count,
                bound,
            } => {
                let ranking = DecileAssigner::new(*bucket_count)?.assign(table, variable)?;
                Ok(ranking.buckets().iter().map(|b| bound.contains(*b)).collect())
            }
        }
    }

    /// Select the records that pass.
    pub fn apply<'a>(&self, table: &'a WeightedTable) -> Result<Selection<'a>, MicrodataError> {
        let mask = self.mask(table)?;
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(row, _)| row)
            .collect();
        tracing::debug!(
            entity = table.entity(),
            variable = self.variable(),
            selected = rows.len(),
            records = table.len(),
            "Applied filter"
        );
        Ok(Selection { table, rows })
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// A view of some records of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    table: &'a WeightedTable,
    rows: Vec<usize>,
}

impl<'a> Selection<'a> {
    /// Every record of the table.
    pub fn all(table: &'a WeightedTable) -> Self {
        Self {
            table,
            rows: (0..table.len()).collect(),
        }
    }

    /// Select the given rows (out-of-range rows are dropped).
    pub fn from_rows(table: &'a WeightedTable, rows: impl IntoIterator<Item = usize>) -> Self {
        let len = table.len();
        Self {
            table,
            rows: rows.into_iter().filter(|row| *row < len).collect(),
        }
    }

    /// The underlying table.
    pub const fn table(&self) -> &'a WeightedTable {
        self.table
    }

    /// Selected row indices, in table order.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Number of selected records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Population weight of the selection.
    pub fn total_weight(&self) -> f64 {
        self.rows
            .iter()
            .map(|row| self.table.weight(*row))
            .collect::<CompensatedSum>()
            .value()
    }

    /// Compute `statistic` over `variable` for the selected records.
    pub fn statistic(&self, variable: &str, statistic: Statistic) -> Result<f64, MicrodataError> {
        let column = self.table.numeric_column(variable)?;
        Ok(weighted_statistic(
            statistic,
            self.rows
                .iter()
                .map(|row| (column.number_at(*row), self.table.weight(*row))),
        ))
    }
}
