//! Budgetary impact across tax and benefit programmes.

use incidence_microdata::{CompensatedSum, Microdata};
use incidence_types::{
    BudgetaryImpactReport, ComparisonMetric, ProgrammeImpact, ProgrammeKind, Statistic,
};

use crate::aggregate::{AggregateQuery, Aggregator};
use crate::config::BudgetConfig;
use crate::error::AnalysisError;

/// Build the budgetary impact report of `reform` against `baseline`.
///
/// Each programme's variable is summed under both snapshots. The net
/// budgetary impact is the change in tax revenue minus the change in
/// benefit spending, so a positive value improves the public finances.
///
/// # Errors
///
/// Fails if a programme variable or the household level is missing from
/// either snapshot.
pub fn budgetary_impact(
    baseline: &Microdata,
    reform: &Microdata,
    config: &BudgetConfig,
) -> Result<BudgetaryImpactReport, AnalysisError> {
    let mut programmes = Vec::with_capacity(config.programmes.len());
    let mut tax = CompensatedSum::new();
    let mut benefit = CompensatedSum::new();

    for programme in &config.programmes {
        let mut query = AggregateQuery::new(programme.variable.as_str(), Statistic::Sum);
        query.entity.clone_from(&programme.entity);
        let total = ComparisonMetric::new(
            Aggregator::aggregate(baseline, &query)?,
            Aggregator::aggregate(reform, &query)?,
        );
        match programme.kind {
            ProgrammeKind::Tax => tax.push(total.change),
            ProgrammeKind::Benefit => benefit.push(total.change),
        }
        tracing::debug!(
            programme = %programme.name,
            baseline = total.baseline,
            reform = total.reform,
            "Compared programme totals"
        );
        programmes.push(ProgrammeImpact {
            name: programme.name.clone(),
            variable: programme.variable.clone(),
            kind: programme.kind,
            total,
        });
    }

    let households = baseline.table(&config.household_entity)?.total_weight();
    let tax_revenue_impact = tax.value();
    let benefit_spending_impact = benefit.value();
    let budgetary_impact = tax_revenue_impact - benefit_spending_impact;

    tracing::info!(
        programmes = programmes.len(),
        tax_revenue_impact,
        benefit_spending_impact,
        budgetary_impact,
        "Built budgetary impact report"
    );
    Ok(BudgetaryImpactReport {
        programmes,
        tax_revenue_impact,
        benefit_spending_impact,
        budgetary_impact,
        households,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use incidence_microdata::WeightedTable;
    use incidence_types::{EntityId, SnapshotMeta};

    use super::*;
    use crate::config::Programme;

    fn snapshot(scenario: &str, income_tax: Vec<f64>, child_benefit: Vec<f64>) -> Microdata {
        let people = WeightedTable::builder("person", (1..=3).map(EntityId), [10.0, 10.0, 20.0])
            .column("income_tax", income_tax)
            .membership("household", [EntityId(1), EntityId(1), EntityId(2)])
            .build()
            .unwrap();
        let households =
            WeightedTable::builder("household", [EntityId(1), EntityId(2)], [10.0, 20.0])
                .column("child_benefit", child_benefit)
                .build()
                .unwrap();
        Microdata::new(SnapshotMeta::new(scenario, 2025))
            .with_table(people)
            .unwrap()
            .with_table(households)
            .unwrap()
    }

    fn config() -> BudgetConfig {
        BudgetConfig {
            programmes: vec![
                Programme::new("income_tax", "income_tax", ProgrammeKind::Tax),
                Programme::new("child_benefit", "child_benefit", ProgrammeKind::Benefit),
            ],
            ..BudgetConfig::default()
        }
    }

    #[test]
    fn net_impact_is_tax_minus_benefit() {
        let baseline = snapshot("baseline", vec![100.0, 0.0, 50.0], vec![0.0, 30.0]);
        let reform = snapshot("reform", vec![110.0, 0.0, 60.0], vec![0.0, 40.0]);
        let report = budgetary_impact(&baseline, &reform, &config()).unwrap();

        // Tax: 2000 -> 2300. Benefit: 600 -> 800.
        assert!((report.programmes[0].total.baseline - 2_000.0).abs() < 1e-9);
        assert!((report.tax_revenue_impact - 300.0).abs() < 1e-9);
        assert!((report.benefit_spending_impact - 200.0).abs() < 1e-9);
        assert!((report.budgetary_impact - 100.0).abs() < 1e-9);
        assert!((report.households - 30.0).abs() < 1e-12);
    }

    #[test]
    fn programme_at_household_level() {
        let baseline = snapshot("baseline", vec![100.0, 0.0, 50.0], vec![0.0, 30.0]);
        let mut config = config();
        config.programmes[0].entity = Some("household".into());
        let report = budgetary_impact(&baseline, &baseline, &config).unwrap();
        // Household weights: 10 * (100 + 0) + 20 * 50.
        assert!((report.programmes[0].total.baseline - 2_000.0).abs() < 1e-9);
        assert!(report.budgetary_impact.abs() < 1e-12);
    }

    #[test]
    fn missing_programme_variable_fails() {
        let baseline = snapshot("baseline", vec![1.0, 1.0, 1.0], vec![1.0, 1.0]);
        let result = budgetary_impact(&baseline, &baseline, &BudgetConfig::default());
        assert!(matches!(result, Err(AnalysisError::Microdata(_))));
    }
}
