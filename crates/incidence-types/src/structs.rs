//! Snapshot metadata and the report structures exposed to downstream
//! storage and rendering.
//!
//! Every report is a plain nested record: maps of bucket to metrics or lists
//! of groups. Ratios over empty populations are `NaN`, which `serde_json`
//! writes as `null`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{OutcomeBucket, ProgrammeKind};
use crate::ids::SnapshotId;

// ---------------------------------------------------------------------------
// Snapshot metadata
// ---------------------------------------------------------------------------

/// Identity and provenance of one microdata snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SnapshotMeta {
    /// Unique snapshot identifier, used as the memoisation key.
    pub id: SnapshotId,
    /// Policy scenario label (for example `baseline` or a reform name).
    pub scenario: String,
    /// Simulated period, usually a calendar year.
    pub period: i32,
    /// When the snapshot was assembled.
    pub created_at: DateTime<Utc>,
}

impl SnapshotMeta {
    /// Create metadata for a freshly produced snapshot.
    pub fn new(scenario: impl Into<String>, period: i32) -> Self {
        Self {
            id: SnapshotId::new(),
            scenario: scenario.into(),
            period,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Baseline / reform comparison
// ---------------------------------------------------------------------------

/// A scalar measured under baseline and reform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ComparisonMetric {
    /// Value under the baseline policy.
    pub baseline: f64,
    /// Value under the reform policy.
    pub reform: f64,
    /// `reform - baseline`.
    pub change: f64,
    /// `change / baseline`; `NaN` when the baseline is zero.
    pub relative_change: f64,
}

impl ComparisonMetric {
    /// Build a comparison from its two measurements.
    pub fn new(baseline: f64, reform: f64) -> Self {
        let change = reform - baseline;
        let relative_change = if baseline == 0.0 {
            f64::NAN
        } else {
            change / baseline
        };
        Self {
            baseline,
            reform,
            change,
            relative_change,
        }
    }
}

// ---------------------------------------------------------------------------
// Distributional impact
// ---------------------------------------------------------------------------

/// Population-weighted shares of the five winner/loser outcomes.
///
/// For any non-empty population the five shares sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WinnersLosers {
    /// Share losing more than 5%.
    pub lose_more_than_5pct: f64,
    /// Share losing up to 5%.
    pub lose_up_to_5pct: f64,
    /// Share with no material change.
    pub no_change: f64,
    /// Share gaining up to 5%.
    pub gain_up_to_5pct: f64,
    /// Share gaining more than 5%.
    pub gain_more_than_5pct: f64,
}

impl WinnersLosers {
    /// Shares for an empty population: every share is undefined.
    pub const fn undefined() -> Self {
        Self {
            lose_more_than_5pct: f64::NAN,
            lose_up_to_5pct: f64::NAN,
            no_change: f64::NAN,
            gain_up_to_5pct: f64::NAN,
            gain_more_than_5pct: f64::NAN,
        }
    }

    /// Share for a single outcome bucket.
    pub const fn share(&self, bucket: OutcomeBucket) -> f64 {
        match bucket {
            OutcomeBucket::LoseMoreThan5Pct => self.lose_more_than_5pct,
            OutcomeBucket::LoseUpTo5Pct => self.lose_up_to_5pct,
            OutcomeBucket::NoChange => self.no_change,
            OutcomeBucket::GainUpTo5Pct => self.gain_up_to_5pct,
            OutcomeBucket::GainMoreThan5Pct => self.gain_more_than_5pct,
        }
    }

    /// Sum of the five shares (1 for a non-empty population).
    pub fn total(&self) -> f64 {
        OutcomeBucket::ALL.iter().map(|b| self.share(*b)).sum()
    }

    /// Share losing anything beyond the no-change band.
    pub fn lose_share(&self) -> f64 {
        self.lose_more_than_5pct + self.lose_up_to_5pct
    }

    /// Share gaining anything beyond the no-change band.
    pub fn gain_share(&self) -> f64 {
        self.gain_up_to_5pct + self.gain_more_than_5pct
    }
}

/// Income change for one rank bucket, or for the whole population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BucketImpact {
    /// Weighted population in the bucket.
    pub population: f64,
    /// `sum(delta * w) / sum(w)`.
    pub average_change: f64,
    /// `sum(delta * w) / sum(baseline * w)`.
    pub relative_change: f64,
    /// Weighted mean baseline income.
    pub baseline_mean: f64,
    /// Weighted mean reform income.
    pub reform_mean: f64,
    /// Winner/loser shares.
    pub winners_losers: WinnersLosers,
}

/// How income changed across the weighted population, by rank bucket and
/// overall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DistributionalImpactReport {
    /// Entity level the report was computed at.
    pub entity: String,
    /// Variable whose change is measured.
    pub income_variable: String,
    /// Variable used to rank records into buckets.
    pub ranking_variable: String,
    /// Number of rank buckets (10 for deciles).
    pub bucket_count: u32,
    /// Per-bucket impacts keyed by bucket `1..=bucket_count`.
    pub buckets: BTreeMap<u32, BucketImpact>,
    /// Impact over every aligned record, ranked or not.
    pub all: BucketImpact,
    /// Weighted population that could not be ranked (non-positive or
    /// missing ranking variable).
    pub unranked_population: f64,
}

// ---------------------------------------------------------------------------
// Inequality
// ---------------------------------------------------------------------------

/// Dispersion summaries under baseline and reform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InequalityReport {
    /// Entity level the report was computed at.
    pub entity: String,
    /// Income variable measured.
    pub income_variable: String,
    /// Gini coefficient.
    pub gini: ComparisonMetric,
    /// Share of income held by the top 1%.
    pub top_1_pct_share: ComparisonMetric,
    /// Share of income held by the top 10%.
    pub top_10_pct_share: ComparisonMetric,
    /// Share of income held by the bottom 50%.
    pub bottom_50_pct_share: ComparisonMetric,
}

// ---------------------------------------------------------------------------
// Poverty
// ---------------------------------------------------------------------------

/// Poverty outcome for one demographic group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PovertyGroupImpact {
    /// Group label (for example `child`).
    pub group: String,
    /// Weighted population of the group under the baseline.
    pub population: f64,
    /// Weighted number of people in poverty.
    pub headcount: ComparisonMetric,
    /// Poverty rate: headcount over group population.
    pub rate: ComparisonMetric,
    /// Weighted number of people in deep poverty, when a deep-poverty
    /// variable is reported.
    pub deep_headcount: Option<ComparisonMetric>,
    /// Deep-poverty rate, when a deep-poverty variable is reported.
    pub deep_rate: Option<ComparisonMetric>,
}

/// Poverty headcount and rate by demographic group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PovertyImpactReport {
    /// Entity level the report counts (usually `person`).
    pub entity: String,
    /// Boolean poverty-status variable.
    pub poverty_variable: String,
    /// Boolean deep-poverty variable, if reported.
    pub deep_poverty_variable: Option<String>,
    /// One entry per configured group, in configuration order.
    pub groups: Vec<PovertyGroupImpact>,
}

impl PovertyImpactReport {
    /// Look up a group by label.
    pub fn group(&self, name: &str) -> Option<&PovertyGroupImpact> {
        self.groups.iter().find(|g| g.group == name)
    }
}

// ---------------------------------------------------------------------------
// Budgetary impact
// ---------------------------------------------------------------------------

/// Total of one programme under baseline and reform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProgrammeImpact {
    /// Programme label.
    pub name: String,
    /// Variable summed for the programme.
    pub variable: String,
    /// Tax or benefit.
    pub kind: ProgrammeKind,
    /// Weighted totals.
    pub total: ComparisonMetric,
}

/// Fiscal impact of a reform across programmes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BudgetaryImpactReport {
    /// Per-programme totals, in configuration order.
    pub programmes: Vec<ProgrammeImpact>,
    /// Change in revenue across tax programmes.
    pub tax_revenue_impact: f64,
    /// Change in spending across benefit programmes.
    pub benefit_spending_impact: f64,
    /// `tax_revenue_impact - benefit_spending_impact`.
    pub budgetary_impact: f64,
    /// Weighted household population under the baseline.
    pub households: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn comparison_metric_change() {
        let m = ComparisonMetric::new(200.0, 250.0);
        assert!((m.change - 50.0).abs() < 1e-12);
        assert!((m.relative_change - 0.25).abs() < 1e-12);
    }

    #[test]
    fn comparison_metric_zero_baseline_is_nan() {
        let m = ComparisonMetric::new(0.0, 10.0);
        assert!((m.change - 10.0).abs() < 1e-12);
        assert!(m.relative_change.is_nan());
    }

    #[test]
    fn winners_losers_totals() {
        let wl = WinnersLosers {
            lose_more_than_5pct: 0.1,
            lose_up_to_5pct: 0.2,
            no_change: 0.3,
            gain_up_to_5pct: 0.25,
            gain_more_than_5pct: 0.15,
        };
        assert!((wl.total() - 1.0).abs() < 1e-12);
        assert!((wl.lose_share() - 0.3).abs() < 1e-12);
        assert!((wl.gain_share() - 0.4).abs() < 1e-12);
        assert!(WinnersLosers::undefined().total().is_nan());
    }

    #[test]
    fn nan_serializes_as_null() {
        let json = serde_json::to_value(WinnersLosers::undefined()).unwrap();
        assert!(json["no_change"].is_null());
    }
}
