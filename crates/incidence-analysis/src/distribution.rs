//! Distributional impact by weighted rank bucket.
//!
//! Records are ranked into buckets on the **baseline** ranking variable. For
//! each bucket, and once over every aligned record, the report gives the
//! average and relative income change, baseline and reform means, and the
//! five winner/loser shares.
//!
//! Percentage changes raise both incomes to [`INCOME_FLOOR`] first, so
//! records with zero or negative baseline income still classify. The shares
//! are population weighted, optionally by `weight * people`.

use std::collections::BTreeMap;

use incidence_microdata::{CompensatedSum, DecileAssigner, Microdata, UNRANKED_BUCKET, ratio};
use incidence_types::{
    BucketImpact, DistributionalImpactReport, OutcomeBucket, Statistic, WinnersLosers,
};

use crate::change::{AlignedChange, ChangeAggregator};
use crate::config::DistributionConfig;
use crate::error::AnalysisError;

/// Default lower bound applied to incomes before percentage changes.
pub const INCOME_FLOOR: f64 = 1.0;

/// Build the distributional impact report of `reform` against `baseline`.
///
/// # Errors
///
/// Fails if the variables cannot be resolved at the configured level, if
/// the two snapshots hold different records, or if the bucket count is 0.
pub fn distributional_impact(
    baseline: &Microdata,
    reform: &Microdata,
    config: &DistributionConfig,
) -> Result<DistributionalImpactReport, AnalysisError> {
    let ranking_variable = config.ranking_variable();
    let mut extra = vec![ranking_variable];
    if let Some(people) = &config.people_variable {
        extra.push(people.as_str());
    }

    let aligned = ChangeAggregator::align(
        baseline,
        reform,
        &config.income_variable,
        Some(config.entity.as_str()),
        &extra,
    )?;
    let table = aligned.table();

    let assigner = DecileAssigner::new(config.bucket_count)?;
    let ranking = match &config.people_variable {
        Some(people) => assigner.assign_weighted(table, ranking_variable, people)?,
        None => assigner.assign(table, ranking_variable)?,
    };

    let share_weights: Vec<f64> = match &config.people_variable {
        Some(people) => {
            let column = table.numeric_column(people)?;
            (0..table.len())
                .map(|row| table.weight(row) * column.number_at(row).unwrap_or(0.0).max(0.0))
                .collect()
        }
        None => table.weights().to_vec(),
    };

    let builder = BucketBuilder {
        aligned: &aligned,
        share_weights: &share_weights,
        config,
    };

    let mut buckets = BTreeMap::new();
    for bucket in 1..=config.bucket_count {
        let Ok(label) = i32::try_from(bucket) else {
            break;
        };
        let rows = ranking.rows_in_bucket(label);
        buckets.insert(bucket, builder.build(bucket, &rows));
    }
    let all_rows: Vec<usize> = (0..aligned.len()).collect();
    let all = builder.build(0, &all_rows);

    let unranked_population = ranking
        .rows_in_bucket(UNRANKED_BUCKET)
        .iter()
        .map(|row| table.weight(*row))
        .collect::<CompensatedSum>()
        .value();
    if unranked_population > 0.0 {
        tracing::warn!(
            ranking_variable,
            unranked_population,
            "Records with non-positive or missing ranking values left out of buckets"
        );
    }

    tracing::info!(
        entity = %config.entity,
        income_variable = %config.income_variable,
        ranking_variable,
        bucket_count = config.bucket_count,
        records = aligned.len(),
        average_change = all.average_change,
        "Built distributional impact report"
    );

    Ok(DistributionalImpactReport {
        entity: config.entity.clone(),
        income_variable: config.income_variable.clone(),
        ranking_variable: ranking_variable.to_owned(),
        bucket_count: config.bucket_count,
        buckets,
        all,
        unranked_population,
    })
}

/// Fractional change after raising both incomes to `floor`.
pub fn floored_pct_change(baseline: f64, reform: f64, floor: f64) -> f64 {
    let baseline = baseline.max(floor);
    let reform = reform.max(floor);
    (reform - baseline) / baseline
}

struct BucketBuilder<'a> {
    aligned: &'a AlignedChange,
    share_weights: &'a [f64],
    config: &'a DistributionConfig,
}

impl BucketBuilder<'_> {
    /// `bucket` 0 stands for the whole population in log messages.
    fn build(&self, bucket: u32, rows: &[usize]) -> BucketImpact {
        // Only records with income on both sides take part.
        let rows: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|row| self.aligned.delta_at(*row).is_some())
            .collect();
        let table = self.aligned.table();

        let mut weight = CompensatedSum::new();
        let mut weighted_delta = CompensatedSum::new();
        let mut weighted_baseline = CompensatedSum::new();
        for row in &rows {
            let w = table.weight(*row);
            weight.push(w);
            weighted_delta.push(self.aligned.delta_at(*row).unwrap_or(0.0) * w);
            weighted_baseline.push(self.aligned.baseline_at(*row).unwrap_or(0.0) * w);
        }

        BucketImpact {
            population: weight.value(),
            average_change: ratio(weighted_delta.value(), weight.value()),
            relative_change: ratio(weighted_delta.value(), weighted_baseline.value()),
            baseline_mean: self.aligned.baseline_statistic(&rows, Statistic::Mean),
            reform_mean: self.aligned.reform_statistic(&rows, Statistic::Mean),
            winners_losers: self.winners_losers(bucket, &rows),
        }
    }

    fn winners_losers(&self, bucket: u32, rows: &[usize]) -> WinnersLosers {
        let mut totals = [CompensatedSum::new(); 5];
        let mut population = CompensatedSum::new();
        for row in rows {
            let (Some(before), Some(after)) =
                (self.aligned.baseline_at(*row), self.aligned.reform_at(*row))
            else {
                continue;
            };
            let w = self.share_weights.get(*row).copied().unwrap_or(0.0);
            let pct = floored_pct_change(before, after, self.config.income_floor);
            let outcome = OutcomeBucket::classify(
                pct,
                self.config.small_change,
                self.config.no_change_band,
            );
            if let Some(total) = totals.get_mut(outcome_index(outcome)) {
                total.push(w);
            }
            population.push(w);
        }

        let population = population.value();
        if population <= 0.0 {
            tracing::warn!(bucket, "Empty bucket: winner/loser shares are undefined");
            return WinnersLosers::undefined();
        }
        let [lose_large, lose_small, no_change, gain_small, gain_large] =
            totals.map(|total| total.value() / population);
        WinnersLosers {
            lose_more_than_5pct: lose_large,
            lose_up_to_5pct: lose_small,
            no_change,
            gain_up_to_5pct: gain_small,
            gain_more_than_5pct: gain_large,
        }
    }
}

const fn outcome_index(outcome: OutcomeBucket) -> usize {
    match outcome {
        OutcomeBucket::LoseMoreThan5Pct => 0,
        OutcomeBucket::LoseUpTo5Pct => 1,
        OutcomeBucket::NoChange => 2,
        OutcomeBucket::GainUpTo5Pct => 3,
        OutcomeBucket::GainMoreThan5Pct => 4,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
mod tests {
    use incidence_microdata::WeightedTable;
    use incidence_types::{EntityId, SnapshotMeta};

    use super::*;

    fn snapshot(scenario: &str, incomes: Vec<f64>) -> Microdata {
        let n = incomes.len();
        let table = WeightedTable::builder("household", (1..=n as u64).map(EntityId), vec![1.0; n])
            .column("household_net_income", incomes)
            .column("household_count_people", vec![2.0; n])
            .build()
            .unwrap();
        Microdata::from_table(SnapshotMeta::new(scenario, 2025), table)
    }

    fn config() -> DistributionConfig {
        DistributionConfig::default()
    }

    #[test]
    fn floor_handles_zero_and_negative_income() {
        assert!((floored_pct_change(0.0, 100.0, INCOME_FLOOR) - 99.0).abs() < 1e-12);
        assert!(floored_pct_change(-50.0, -10.0, INCOME_FLOOR).abs() < 1e-12);
        assert!((floored_pct_change(100.0, 90.0, INCOME_FLOOR) + 0.1).abs() < 1e-12);
    }

    #[test]
    fn flat_ten_percent_rise() {
        let base: Vec<f64> = (1..=10_i32).map(|i| f64::from(i) * 10_000.0).collect();
        let reform = base.iter().map(|v| v * 1.1).collect();
        let report = distributional_impact(
            &snapshot("baseline", base),
            &snapshot("reform", reform),
            &config(),
        )
        .unwrap();

        assert_eq!(report.buckets.len(), 10);
        for impact in report.buckets.values() {
            assert!((impact.relative_change - 0.1).abs() < 1e-9);
            assert!((impact.winners_losers.gain_more_than_5pct - 1.0).abs() < 1e-12);
        }
        assert!((report.all.population - 10.0).abs() < 1e-12);
        assert!((report.all.average_change - 5_500.0).abs() < 1e-6);
        assert!(report.unranked_population.abs() < f64::EPSILON);
    }

    #[test]
    fn shares_partition_each_bucket() {
        let base = vec![100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0, 900.0, 1000.0];
        let reform = vec![50.0, 198.0, 300.0, 400.2, 600.0, 590.0, 700.0, 810.0, 900.0, 2000.0];
        let report = distributional_impact(
            &snapshot("baseline", base),
            &snapshot("reform", reform),
            &config(),
        )
        .unwrap();
        for impact in report.buckets.values().chain(std::iter::once(&report.all)) {
            assert!((impact.winners_losers.total() - 1.0).abs() < 1e-12);
        }
        let all = report.all.winners_losers;
        assert!((all.lose_more_than_5pct - 0.1).abs() < 1e-12);
        assert!((all.lose_up_to_5pct - 0.2).abs() < 1e-12);
        assert!((all.no_change - 0.4).abs() < 1e-12);
        assert!((all.gain_up_to_5pct - 0.1).abs() < 1e-12);
        assert!((all.gain_more_than_5pct - 0.2).abs() < 1e-12);
    }

    #[test]
    fn empty_bucket_is_undefined() {
        // Two records cannot fill ten deciles.
        let report = distributional_impact(
            &snapshot("baseline", vec![100.0, 200.0]),
            &snapshot("reform", vec![100.0, 200.0]),
            &config(),
        )
        .unwrap();
        let empty = report.buckets[&1];
        assert!(empty.population.abs() < f64::EPSILON);
        assert!(empty.average_change.is_nan());
        assert!(empty.winners_losers.no_change.is_nan());
        assert!((report.buckets[&5].winners_losers.no_change - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unranked_records_count_in_all() {
        let report = distributional_impact(
            &snapshot("baseline", vec![-100.0, 0.0, 100.0]),
            &snapshot("reform", vec![-100.0, 10.0, 100.0]),
            &config(),
        )
        .unwrap();
        assert!((report.unranked_population - 2.0).abs() < 1e-12);
        assert!((report.all.population - 3.0).abs() < 1e-12);
        let ranked: f64 = report.buckets.values().map(|b| b.population).sum();
        assert!((ranked - 1.0).abs() < 1e-12);
    }

    #[test]
    fn people_weighting_matches_plain_when_sizes_equal() {
        let base = vec![100.0, 200.0, 300.0];
        let reform = vec![90.0, 200.0, 330.0];
        let plain = distributional_impact(
            &snapshot("baseline", base.clone()),
            &snapshot("reform", reform.clone()),
            &config(),
        )
        .unwrap();
        let people = distributional_impact(
            &snapshot("baseline", base),
            &snapshot("reform", reform),
            &DistributionConfig {
                people_variable: Some("household_count_people".into()),
                ..config()
            },
        )
        .unwrap();
        assert_eq!(plain.all.winners_losers, people.all.winners_losers);
    }
}
