//! Compensated summation.
//!
//! Weighted totals over national microdata add hundreds of thousands of
//! products spanning many orders of magnitude. [`CompensatedSum`] uses the
//! Kahan-Babuska (Neumaier) variant, which keeps a running compensation term
//! and stays accurate when an addend is larger than the running sum.

/// Streaming Neumaier accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    /// An empty accumulator.
    pub const fn new() -> Self {
        Self {
            sum: 0.0,
            compensation: 0.0,
        }
    }

    /// Add one term.
    pub fn push(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    /// The compensated total.
    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl Extend<f64> for CompensatedSum {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for x in iter {
            self.push(x);
        }
    }
}

impl FromIterator<f64> for CompensatedSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        acc.extend(iter);
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sum_is_zero() {
        assert!(CompensatedSum::new().value().abs() < f64::EPSILON);
    }

    #[test]
    fn recovers_small_terms_next_to_large_ones() {
        // Naive summation returns 0 here.
        let acc: CompensatedSum = [1.0, 1e100, 1.0, -1e100].into_iter().collect();
        assert!((acc.value() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn many_tenths() {
        let acc: CompensatedSum = std::iter::repeat_n(0.1, 1_000_000).collect();
        assert!((acc.value() - 100_000.0).abs() < 1e-9);
    }
}
