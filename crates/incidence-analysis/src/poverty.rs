//! Poverty headcount and rate by demographic group.
//!
//! A report covers one poverty variable and, optionally, a deep-poverty
//! variable measured over the same groups and weights. Other poverty
//! definitions are reported by calling [`poverty_impact`] again with a
//! different [`PovertyConfig::poverty_variable`].

use incidence_microdata::{CompensatedSum, Filter, Microdata, ratio};
use incidence_types::{ComparisonMetric, PovertyGroupImpact, PovertyImpactReport, Statistic};

use crate::change::{AlignedChange, ChangeAggregator};
use crate::config::PovertyConfig;
use crate::error::AnalysisError;

/// Build the poverty impact report of `reform` against `baseline`.
///
/// The poverty flag is read at the configured level (usually `person`), so
/// a household-level flag counts every member. Group membership is
/// evaluated on baseline values and baseline weights are used on both
/// sides.
///
/// # Errors
///
/// Fails if the variables cannot be resolved at the configured level or the
/// two snapshots hold different records.
pub fn poverty_impact(
    baseline: &Microdata,
    reform: &Microdata,
    config: &PovertyConfig,
) -> Result<PovertyImpactReport, AnalysisError> {
    let config_groups = config.groups();
    let extra: Vec<&str> = config_groups
        .iter()
        .filter_map(|group| group.filter.as_ref().map(Filter::variable))
        .collect();
    let entity = Some(config.entity.as_str());
    let aligned =
        ChangeAggregator::align(baseline, reform, &config.poverty_variable, entity, &extra)?;
    // Both alignments materialise the baseline table at the same level, so
    // row indices agree.
    let deep = config
        .deep_poverty_variable
        .as_deref()
        .map(|variable| ChangeAggregator::align(baseline, reform, variable, entity, &[]))
        .transpose()?;
    let table = aligned.table();

    let mut groups = Vec::with_capacity(config_groups.len());
    for group in config_groups.iter() {
        let rows = aligned.select(group.filter.as_ref())?;
        let population = rows
            .iter()
            .map(|row| table.weight(*row))
            .collect::<CompensatedSum>()
            .value();
        let (headcount, rate) = headcount_and_rate(&aligned, &rows, population);
        let (deep_headcount, deep_rate) = deep
            .as_ref()
            .map(|deep| headcount_and_rate(deep, &rows, population))
            .unzip();
        if population <= 0.0 {
            tracing::warn!(group = %group.name, "Empty poverty group: rates are undefined");
        }
        groups.push(PovertyGroupImpact {
            group: group.name.clone(),
            population,
            headcount,
            rate,
            deep_headcount,
            deep_rate,
        });
    }

    tracing::info!(
        entity = %config.entity,
        poverty_variable = %config.poverty_variable,
        deep_poverty_variable = ?config.deep_poverty_variable,
        groups = groups.len(),
        "Built poverty impact report"
    );
    Ok(PovertyImpactReport {
        entity: config.entity.clone(),
        poverty_variable: config.poverty_variable.clone(),
        deep_poverty_variable: config.deep_poverty_variable.clone(),
        groups,
    })
}

fn headcount_and_rate(
    aligned: &AlignedChange,
    rows: &[usize],
    population: f64,
) -> (ComparisonMetric, ComparisonMetric) {
    let headcount = ComparisonMetric::new(
        aligned.baseline_statistic(rows, Statistic::Sum),
        aligned.reform_statistic(rows, Statistic::Sum),
    );
    let rate = ComparisonMetric::new(
        ratio(headcount.baseline, population),
        ratio(headcount.reform, population),
    );
    (headcount, rate)
}
