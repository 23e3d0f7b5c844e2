//! Gini coefficient and income shares under baseline and reform.

use incidence_microdata::{CompensatedSum, Microdata};
use incidence_types::{ComparisonMetric, InequalityReport};

use crate::change::{AlignedChange, ChangeAggregator};
use crate::config::InequalityConfig;
use crate::error::AnalysisError;

/// Slack on cumulative population shares so that accumulated rounding does
/// not move a record across a share boundary.
const SHARE_TOLERANCE: f64 = 1e-12;

/// A weighted income distribution sorted ascending by income.
#[derive(Debug, Clone, PartialEq)]
pub struct LorenzCurve {
    /// `(income, weight)` sorted by income; ties keep input order.
    points: Vec<(f64, f64)>,
    total_weight: f64,
    total_income: f64,
}

impl LorenzCurve {
    /// Build the curve from `(income, weight)` observations.
    pub fn new(observations: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut points: Vec<(f64, f64)> = observations.into_iter().collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let total_weight = points.iter().map(|(_, w)| *w).collect::<CompensatedSum>().value();
        let total_income = points
            .iter()
            .map(|(income, w)| income * w)
            .collect::<CompensatedSum>()
            .value();
        Self {
            points,
            total_weight,
            total_income,
        }
    }

    /// Weighted total income.
    pub const fn total_income(&self) -> f64 {
        self.total_income
    }

    /// Weighted population.
    pub const fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Gini coefficient: one minus twice the area under the Lorenz curve,
    /// integrated by trapezoids from the origin. Clipped to `[0, 1]`; 0 when
    /// total income or population is 0.
    pub fn gini(&self) -> f64 {
        if self.total_weight <= 0.0 || self.total_income == 0.0 {
            return 0.0;
        }
        let mut area = CompensatedSum::new();
        let mut weight = CompensatedSum::new();
        let mut income = CompensatedSum::new();
        let (mut prev_p, mut prev_i) = (0.0, 0.0);
        for (x, w) in &self.points {
            weight.push(*w);
            income.push(x * w);
            let p = weight.value() / self.total_weight;
            let i = income.value() / self.total_income;
            area.push((p - prev_p) * (i + prev_i) / 2.0);
            (prev_p, prev_i) = (p, i);
        }
        2.0f64.mul_add(-area.value(), 1.0).clamp(0.0, 1.0)
    }

    /// Share of income held by the top `fraction` of the population: records
    /// whose cumulative population share exceeds `1 - fraction`.
    pub fn top_share(&self, fraction: f64) -> f64 {
        self.share_where(|cumulative| cumulative > 1.0 - fraction + SHARE_TOLERANCE)
    }

    /// Share of income held by the bottom `fraction` of the population:
    /// records whose cumulative population share is at most `fraction`.
    pub fn bottom_share(&self, fraction: f64) -> f64 {
        self.share_where(|cumulative| cumulative <= fraction + SHARE_TOLERANCE)
    }

    fn share_where(&self, keep: impl Fn(f64) -> bool) -> f64 {
        if self.total_weight <= 0.0 || self.total_income == 0.0 {
            return 0.0;
        }
        let mut weight = CompensatedSum::new();
        let mut selected = CompensatedSum::new();
        for (x, w) in &self.points {
            weight.push(*w);
            if keep(weight.value() / self.total_weight) {
                selected.push(x * w);
            }
        }
        selected.value() / self.total_income
    }
}

/// Build the inequality report of `reform` against `baseline`.
///
/// Each record counts with `weight * people` when a people variable is
/// configured. The optional filter is evaluated on baseline values.
///
/// # Errors
///
/// Fails if the variables cannot be resolved at the configured level or the
/// two snapshots hold different records.
pub fn inequality_impact(
    baseline: &Microdata,
    reform: &Microdata,
    config: &InequalityConfig,
) -> Result<InequalityReport, AnalysisError> {
    let mut extra = Vec::new();
    if let Some(people) = &config.people_variable {
        extra.push(people.as_str());
    }
    if let Some(filter) = &config.filter {
        extra.push(filter.variable());
    }

    let aligned = ChangeAggregator::align(
        baseline,
        reform,
        &config.income_variable,
        Some(config.entity.as_str()),
        &extra,
    )?;
    let rows = aligned.select(config.filter.as_ref())?;
    let weights = effective_weights(&aligned, config.people_variable.as_deref())?;

    let curve = |value_at: fn(&AlignedChange, usize) -> Option<f64>| {
        LorenzCurve::new(rows.iter().filter_map(|row| {
            let value = value_at(&aligned, *row)?;
            Some((value, weights.get(*row).copied().unwrap_or(0.0)))
        }))
    };
    let before = curve(AlignedChange::baseline_at);
    let after = curve(AlignedChange::reform_at);

    let report = InequalityReport {
        entity: config.entity.clone(),
        income_variable: config.income_variable.clone(),
        gini: ComparisonMetric::new(before.gini(), after.gini()),
        top_1_pct_share: ComparisonMetric::new(before.top_share(0.01), after.top_share(0.01)),
        top_10_pct_share: ComparisonMetric::new(before.top_share(0.1), after.top_share(0.1)),
        bottom_50_pct_share: ComparisonMetric::new(
            before.bottom_share(0.5),
            after.bottom_share(0.5),
        ),
    };
    tracing::info!(
        entity = %config.entity,
        income_variable = %config.income_variable,
        records = rows.len(),
        gini_baseline = report.gini.baseline,
        gini_reform = report.gini.reform,
        "Built inequality report"
    );
    Ok(report)
}

fn effective_weights(
    aligned: &AlignedChange,
    people_variable: Option<&str>,
) -> Result<Vec<f64>, AnalysisError> {
    let table = aligned.table();
    let Some(people) = people_variable else {
        return Ok(table.weights().to_vec());
    };
    let column = table.numeric_column(people)?;
    Ok((0..table.len())
        .map(|row| table.weight(row) * column.number_at(row).unwrap_or(0.0).max(0.0))
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
mod tests {
    use incidence_microdata::{Bound, Filter, WeightedTable};
    use incidence_types::{EntityId, SnapshotMeta};

    use super::*;

    fn equal_weights(incomes: &[f64]) -> LorenzCurve {
        LorenzCurve::new(incomes.iter().map(|x| (*x, 1.0)))
    }

    #[test]
    fn equal_incomes_have_zero_gini() {
        let curve = equal_weights(&[500.0; 8]);
        assert!(curve.gini().abs() < 1e-12);
    }

    #[test]
    fn one_holder_gives_n_minus_one_over_n() {
        for n in [2_u32, 5, 10, 100] {
            let mut incomes = vec![0.0; n as usize - 1];
            incomes.push(1_000.0);
            let expected = f64::from(n - 1) / f64::from(n);
            assert!((equal_weights(&incomes).gini() - expected).abs() < 1e-9, "n = {n}");
        }
    }

    #[test]
    fn zero_income_gives_zero() {
        let curve = equal_weights(&[0.0, 0.0, 0.0]);
        assert!(curve.gini().abs() < f64::EPSILON);
        assert!(curve.top_share(0.1).abs() < f64::EPSILON);
        assert!(LorenzCurve::new(Vec::new()).gini().abs() < f64::EPSILON);
    }

    #[test]
    fn gini_stays_in_unit_interval() {
        let curve = equal_weights(&[-500.0, 10.0, 20.0]);
        let g = curve.gini();
        assert!((0.0..=1.0).contains(&g));
    }

    #[test]
    fn shares_of_ten_records() {
        let incomes: Vec<f64> = (1..=10_i32).map(f64::from).collect();
        let curve = equal_weights(&incomes);
        // Top 10% is the single richest record: 10 / 55.
        assert!((curve.top_share(0.1) - 10.0 / 55.0).abs() < 1e-12);
        // Bottom 50% is 1..=5: 15 / 55.
        assert!((curve.bottom_share(0.5) - 15.0 / 55.0).abs() < 1e-12);
    }

    #[test]
    fn weights_count_people_not_records() {
        // A record of weight 9 is 90% of the population.
        let curve = LorenzCurve::new([(1.0, 9.0), (100.0, 1.0)]);
        assert!((curve.top_share(0.1) - 100.0 / 109.0).abs() < 1e-12);
    }

    fn snapshot(scenario: &str, incomes: Vec<f64>, region: Vec<&str>) -> Microdata {
        let n = incomes.len();
        let table = WeightedTable::builder("household", (1..=n as u64).map(EntityId), vec![1.0; n])
            .column("equiv_household_net_income", incomes)
            .column("household_count_people", vec![1.0; n])
            .column("region", region)
            .build()
            .unwrap();
        Microdata::from_table(SnapshotMeta::new(scenario, 2025), table)
    }

    #[test]
    fn equalising_reform_lowers_gini() {
        let regions = vec!["north"; 4];
        let baseline = snapshot("baseline", vec![0.0, 0.0, 0.0, 400.0], regions.clone());
        let reform = snapshot("reform", vec![100.0, 100.0, 100.0, 100.0], regions);
        let report =
            inequality_impact(&baseline, &reform, &InequalityConfig::default()).unwrap();
        assert!((report.gini.baseline - 0.75).abs() < 1e-9);
        assert!(report.gini.reform.abs() < 1e-9);
        assert!((report.gini.change + 0.75).abs() < 1e-9);
        assert!((report.bottom_50_pct_share.reform - 0.5).abs() < 1e-12);
    }

    #[test]
    fn filter_restricts_population() {
        let regions = vec!["north", "north", "south", "south"];
        let baseline = snapshot("baseline", vec![100.0, 100.0, 0.0, 900.0], regions.clone());
        let reform = snapshot("reform", vec![100.0, 100.0, 0.0, 900.0], regions);
        let config = InequalityConfig {
            filter: Some(Filter::threshold("region", Bound::equal("north"))),
            ..InequalityConfig::default()
        };
        let report = inequality_impact(&baseline, &reform, &config).unwrap();
        assert!(report.gini.baseline.abs() < 1e-12);
        assert!(report.gini.change.abs() < 1e-12);
    }
}
