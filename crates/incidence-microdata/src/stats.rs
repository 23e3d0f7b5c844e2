//! Weighted statistics over `(value, weight)` observations.

use incidence_types::Statistic;

use crate::sum::CompensatedSum;

/// Compute `statistic` over weighted observations.
///
/// Observations with a missing value are skipped by every statistic. Over
/// an empty (or zero-weight) population `Sum` and `Count` are 0, while the
/// ratio statistics are `NaN`.
pub fn weighted_statistic<I>(statistic: Statistic, observations: I) -> f64
where
    I: IntoIterator<Item = (Option<f64>, f64)>,
{
    let mut total = CompensatedSum::new();
    let mut weight = CompensatedSum::new();
    for (value, w) in observations {
        let Some(value) = value else {
            continue;
        };
        if matches!(statistic, Statistic::AverageAmongNonzero) && value == 0.0 {
            continue;
        }
        total.push(value * w);
        weight.push(w);
    }

    if statistic.is_ratio() {
        ratio(total.value(), weight.value())
    } else if matches!(statistic, Statistic::Count) {
        weight.value()
    } else {
        total.value()
    }
}

/// `numerator / denominator`, or `NaN` when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}
