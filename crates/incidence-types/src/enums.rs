//! Enumeration types for the Incidence engine.
//!
//! Statistic and outcome kinds are closed enums so that callers dispatch by
//! `match` rather than by comparing kind strings.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Statistic
// ---------------------------------------------------------------------------

/// A weighted statistic computed over a column of values.
///
/// Missing values are skipped by every statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Statistic {
    /// `sum(value * weight)`.
    Sum,
    /// `sum(value * weight) / sum(weight)`.
    Mean,
    /// `sum(weight)`: population represented, not raw record count.
    Count,
    /// `sum(value * weight) / sum(weight)` restricted to non-zero values.
    AverageAmongNonzero,
}

impl Statistic {
    /// Whether the statistic is a ratio that is undefined over an empty
    /// population (reported as NaN rather than zero).
    pub const fn is_ratio(self) -> bool {
        matches!(self, Self::Mean | Self::AverageAmongNonzero)
    }
}

// ---------------------------------------------------------------------------
// Winner / loser outcome buckets
// ---------------------------------------------------------------------------

/// One of the five mutually exclusive income-change outcomes.
///
/// Together the buckets partition the real line of percentage changes:
///
/// | Bucket | Percentage change `x` |
/// |--------|-----------------------|
/// | `LoseMoreThan5Pct` | `x < -5%` |
/// | `LoseUpTo5Pct` | `-5% <= x < -0.1%` |
/// | `NoChange` | `-0.1% <= x <= 0.1%` |
/// | `GainUpTo5Pct` | `0.1% < x <= 5%` |
/// | `GainMoreThan5Pct` | `x > 5%` |
///
/// The 5% and 0.1% cut points are configurable; the table shows defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OutcomeBucket {
    /// Lost more than the small-change threshold.
    LoseMoreThan5Pct,
    /// Lost at most the small-change threshold, beyond the no-change band.
    LoseUpTo5Pct,
    /// Change within the no-change band.
    NoChange,
    /// Gained at most the small-change threshold, beyond the no-change band.
    GainUpTo5Pct,
    /// Gained more than the small-change threshold.
    GainMoreThan5Pct,
}

impl OutcomeBucket {
    /// Every bucket, from largest loss to largest gain.
    pub const ALL: [Self; 5] = [
        Self::LoseMoreThan5Pct,
        Self::LoseUpTo5Pct,
        Self::NoChange,
        Self::GainUpTo5Pct,
        Self::GainMoreThan5Pct,
    ];

    /// Classify a fractional change (`0.05` = 5%).
    ///
    /// `small_change` is the magnitude separating small from large changes
    /// and `no_change_band` the half-width of the band treated as no change.
    /// NaN is classified as [`OutcomeBucket::NoChange`]; callers exclude
    /// missing values before classifying.
    pub fn classify(pct_change: f64, small_change: f64, no_change_band: f64) -> Self {
        if pct_change < -small_change {
            Self::LoseMoreThan5Pct
        } else if pct_change < -no_change_band {
            Self::LoseUpTo5Pct
        } else if pct_change <= no_change_band || pct_change.is_nan() {
            Self::NoChange
        } else if pct_change <= small_change {
            Self::GainUpTo5Pct
        } else {
            Self::GainMoreThan5Pct
        }
    }
}

// ---------------------------------------------------------------------------
// Programme kind
// ---------------------------------------------------------------------------

/// Whether a government programme raises revenue or spends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ProgrammeKind {
    /// A tax: increases are revenue gains.
    Tax,
    /// A benefit: increases are spending.
    Benefit,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn statistic_serializes_snake_case() {
        let json = serde_json::to_string(&Statistic::AverageAmongNonzero).unwrap();
        assert_eq!(json, "\"average_among_nonzero\"");
    }

    #[test]
    fn ratio_statistics() {
        assert!(Statistic::Mean.is_ratio());
        assert!(Statistic::AverageAmongNonzero.is_ratio());
        assert!(!Statistic::Sum.is_ratio());
        assert!(!Statistic::Count.is_ratio());
    }

    #[test]
    fn classify_boundaries() {
        let c = |x| OutcomeBucket::classify(x, 0.05, 1e-3);
        assert_eq!(c(-0.2), OutcomeBucket::LoseMoreThan5Pct);
        assert_eq!(c(-0.05), OutcomeBucket::LoseUpTo5Pct);
        assert_eq!(c(-0.01), OutcomeBucket::LoseUpTo5Pct);
        assert_eq!(c(-1e-3), OutcomeBucket::NoChange);
        assert_eq!(c(0.0), OutcomeBucket::NoChange);
        assert_eq!(c(1e-3), OutcomeBucket::NoChange);
        assert_eq!(c(0.002), OutcomeBucket::GainUpTo5Pct);
        assert_eq!(c(0.05), OutcomeBucket::GainUpTo5Pct);
        assert_eq!(c(0.051), OutcomeBucket::GainMoreThan5Pct);
    }
}
