//! Baseline versus reform change analysis.
//!
//! Both snapshots are materialised at the same entity level and aligned
//! record by record on [`EntityId`]. The per-record change is
//! `delta = reform - baseline`; a value missing on either side makes the
//! delta missing. Filters are always evaluated on baseline values, and
//! baseline weights are used throughout.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use incidence_microdata::{Bound, Filter, Microdata, WeightedTable, weighted_statistic};
use incidence_types::{EntityId, Statistic};

use crate::error::AnalysisError;

/// One change statistic request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeQuery {
    /// Variable whose change is measured.
    pub variable: String,
    /// Statistic computed over the change (`Count` gives the population).
    pub statistic: Statistic,
    /// Subpopulation restriction, evaluated on baseline values.
    #[serde(default)]
    pub filter: Option<Filter>,
    /// Entity level to align at; defaults to the variable's own level.
    #[serde(default)]
    pub entity: Option<String>,
    /// Keep only records whose absolute change satisfies the bound.
    #[serde(default)]
    pub change: Option<Bound>,
    /// Keep only records whose relative change (`delta / baseline`)
    /// satisfies the bound. Records with a zero baseline never match.
    #[serde(default)]
    pub relative_change: Option<Bound>,
}

impl ChangeQuery {
    /// A query over every aligned record.
    pub fn new(variable: impl Into<String>, statistic: Statistic) -> Self {
        Self {
            variable: variable.into(),
            statistic,
            filter: None,
            entity: None,
            change: None,
            relative_change: None,
        }
    }

    /// Restrict to records passing `filter` under the baseline.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Align at another entity level.
    #[must_use]
    pub fn at_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Restrict by absolute change.
    #[must_use]
    pub fn with_change(mut self, bound: Bound) -> Self {
        self.change = Some(bound);
        self
    }

    /// Restrict by relative change.
    #[must_use]
    pub fn with_relative_change(mut self, bound: Bound) -> Self {
        self.relative_change = Some(bound);
        self
    }
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// A variable under baseline and reform, aligned record by record.
///
/// The table holds the baseline records at the aligned entity level, with
/// the requested extra variables projected from the baseline snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedChange {
    table: WeightedTable,
    baseline: Vec<Option<f64>>,
    reform: Vec<Option<f64>>,
}

impl AlignedChange {
    /// Baseline table at the aligned level.
    pub const fn table(&self) -> &WeightedTable {
        &self.table
    }

    /// Number of aligned records.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether there are no aligned records.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Baseline value of the record at `row`.
    pub fn baseline_at(&self, row: usize) -> Option<f64> {
        self.baseline.get(row).copied().flatten()
    }

    /// Reform value of the record at `row`.
    pub fn reform_at(&self, row: usize) -> Option<f64> {
        self.reform.get(row).copied().flatten()
    }

    /// `reform - baseline` for the record at `row`.
    pub fn delta_at(&self, row: usize) -> Option<f64> {
        Some(self.reform_at(row)? - self.baseline_at(row)?)
    }

    /// `delta / baseline` for the record at `row`; `None` when the baseline
    /// is zero or either value is missing.
    pub fn relative_at(&self, row: usize) -> Option<f64> {
        let baseline = self.baseline_at(row)?;
        if baseline == 0.0 {
            return None;
        }
        Some(self.delta_at(row)? / baseline)
    }

    /// Rows passing `filter` on baseline values (every row without one).
    pub fn select(&self, filter: Option<&Filter>) -> Result<Vec<usize>, AnalysisError> {
        match filter {
            Some(filter) => Ok(filter.apply(&self.table)?.rows().to_vec()),
            None => Ok((0..self.len()).collect()),
        }
    }

    /// `statistic` over the change for `rows`, keeping only records whose
    /// change satisfies both optional bounds.
    pub fn change_statistic(
        &self,
        rows: &[usize],
        statistic: Statistic,
        change: Option<&Bound>,
        relative_change: Option<&Bound>,
    ) -> f64 {
        let observations = rows.iter().filter_map(|row| {
            let delta = self.delta_at(*row);
            if let Some(bound) = change {
                if !delta.is_some_and(|d| bound.contains(d)) {
                    return None;
                }
            }
            if let Some(bound) = relative_change {
                if !self.relative_at(*row).is_some_and(|r| bound.contains(r)) {
                    return None;
                }
            }
            Some((delta, self.table.weight(*row)))
        });
        weighted_statistic(statistic, observations)
    }

    /// `statistic` over baseline values for `rows`.
    pub fn baseline_statistic(&self, rows: &[usize], statistic: Statistic) -> f64 {
        weighted_statistic(
            statistic,
            rows.iter()
                .map(|row| (self.baseline_at(*row), self.table.weight(*row))),
        )
    }

    /// `statistic` over reform values for `rows`, using baseline weights.
    pub fn reform_statistic(&self, rows: &[usize], statistic: Statistic) -> f64 {
        weighted_statistic(
            statistic,
            rows.iter()
                .map(|row| (self.reform_at(*row), self.table.weight(*row))),
        )
    }
}

// ---------------------------------------------------------------------------
// ChangeAggregator
// ---------------------------------------------------------------------------

/// Weighted aggregation of baseline-to-reform change.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeAggregator;

impl ChangeAggregator {
    /// Materialise `variable` (and `extra` baseline variables) at `entity`
    /// under both snapshots and align the records by id.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::Alignment`] if the two snapshots hold different
    ///   records at that level.
    /// - [`AnalysisError::Microdata`] for lookup and projection failures.
    pub fn align(
        baseline: &Microdata,
        reform: &Microdata,
        variable: &str,
        entity: Option<&str>,
        extra: &[&str],
    ) -> Result<AlignedChange, AnalysisError> {
        let entity = match entity {
            Some(entity) => entity,
            None => baseline.entity_of(variable)?,
        };

        let mut variables = vec![variable];
        variables.extend_from_slice(extra);
        let table = baseline.materialize(entity, &variables)?;

        let reform_table = reform.table(entity)?;
        check_same_records(entity, &table, reform_table)?;
        let reform_column = reform.values_at(variable, entity)?;

        let reform_values = table
            .ids()
            .iter()
            .map(|id| {
                reform_table
                    .row_of(*id)
                    .and_then(|row| reform_column.number_at(row))
            })
            .collect();
        let column = table.numeric_column(variable)?;
        let baseline_values = (0..table.len()).map(|row| column.number_at(row)).collect();

        tracing::debug!(
            variable,
            entity,
            records = table.len(),
            "Aligned baseline and reform"
        );
        Ok(AlignedChange {
            table,
            baseline: baseline_values,
            reform: reform_values,
        })
    }

    /// Compute the query's statistic over the change.
    ///
    /// `Sum`, `Mean` and `AverageAmongNonzero` are taken over the delta;
    /// `Count` gives the weighted population passing every restriction.
    pub fn aggregate_change(
        baseline: &Microdata,
        reform: &Microdata,
        query: &ChangeQuery,
    ) -> Result<f64, AnalysisError> {
        let extra: Vec<&str> = query.filter.iter().map(Filter::variable).collect();
        let aligned = Self::align(
            baseline,
            reform,
            &query.variable,
            query.entity.as_deref(),
            &extra,
        )?;
        let rows = aligned.select(query.filter.as_ref())?;
        let value = aligned.change_statistic(
            &rows,
            query.statistic,
            query.change.as_ref(),
            query.relative_change.as_ref(),
        );
        tracing::debug!(
            variable = %query.variable,
            statistic = ?query.statistic,
            selected = rows.len(),
            value,
            "Computed change aggregate"
        );
        Ok(value)
    }
}

fn check_same_records(
    entity: &str,
    baseline: &WeightedTable,
    reform: &WeightedTable,
) -> Result<(), AnalysisError> {
    let missing_in_reform: Vec<EntityId> = baseline
        .ids()
        .iter()
        .filter(|id| reform.row_of(**id).is_none())
        .copied()
        .collect();
    let baseline_ids: HashSet<EntityId> = baseline.ids().iter().copied().collect();
    let missing_in_baseline: Vec<EntityId> = reform
        .ids()
        .iter()
        .filter(|id| !baseline_ids.contains(*id))
        .copied()
        .collect();

    if missing_in_reform.is_empty() && missing_in_baseline.is_empty() {
        Ok(())
    } else {
        tracing::warn!(
            entity,
            missing_in_reform = missing_in_reform.len(),
            missing_in_baseline = missing_in_baseline.len(),
            "Baseline and reform records differ"
        );
        Err(AnalysisError::Alignment {
            entity: entity.to_owned(),
            missing_in_reform,
            missing_in_baseline,
        })
    }
}
