//! Weighted quantile ranking.
//!
//! [`DecileAssigner`] places every record of a table into one of
//! `bucket_count` buckets holding roughly equal population weight, ordered
//! by a ranking variable:
//!
//! 1. Records with a non-positive or missing ranking value cannot be ranked
//!    and receive [`UNRANKED_BUCKET`].
//! 2. The remaining records are stably sorted ascending, so ties keep their
//!    table order.
//! 3. With `C_i` the cumulative weight after sorted record `i` and `T` the
//!    total, record `i` goes to bucket `ceil(N * C_i / T)`, clipped to
//!    `[1, N]`.
//!
//! A record is never split across buckets. The result depends only on the
//! table, so repeated runs are identical.

use std::collections::HashMap;

use incidence_types::EntityId;

use crate::error::MicrodataError;
use crate::sum::CompensatedSum;
use crate::table::WeightedTable;

/// Bucket assigned to records that cannot be ranked.
pub const UNRANKED_BUCKET: i32 = -1;

/// Absorbs accumulated rounding when `N * C_i / T` lands on a bucket edge.
const RANK_TOLERANCE: f64 = 1e-9;

/// Assigns weighted rank buckets (deciles by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecileAssigner {
    bucket_count: u32,
}

impl Default for DecileAssigner {
    fn default() -> Self {
        Self::deciles()
    }
}

impl DecileAssigner {
    /// Number of buckets for deciles.
    pub const DECILES: u32 = 10;

    /// An assigner with `bucket_count` buckets.
    ///
    /// # Errors
    ///
    /// Returns [`MicrodataError::InvalidBucketCount`] for zero buckets.
    pub fn new(bucket_count: u32) -> Result<Self, MicrodataError> {
        if bucket_count == 0 {
            Err(MicrodataError::InvalidBucketCount)
        } else {
            Ok(Self { bucket_count })
        }
    }

    /// An assigner producing deciles.
    pub const fn deciles() -> Self {
        Self {
            bucket_count: Self::DECILES,
        }
    }

    /// Number of buckets.
    pub const fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    /// Rank the table's records by `variable` using the record weights.
    pub fn assign(&self, table: &WeightedTable, variable: &str) -> Result<Ranking, MicrodataError> {
        let column = table.numeric_column(variable)?;
        let keys: Vec<Option<f64>> = (0..table.len()).map(|row| column.number_at(row)).collect();
        Ok(self.rank(table, &keys, table.weights()))
    }

    /// Rank by `variable` with each record's weight multiplied by the
    /// numeric column `weight_multiplier` (for example people per household,
    /// so buckets hold equal numbers of people). A missing multiplier counts
    /// as 0.
    pub fn assign_weighted(
        &self,
        table: &WeightedTable,
        variable: &str,
        weight_multiplier: &str,
    ) -> Result<Ranking, MicrodataError> {
        let column = table.numeric_column(variable)?;
        let multiplier = table.numeric_column(weight_multiplier)?;
        let keys: Vec<Option<f64>> = (0..table.len()).map(|row| column.number_at(row)).collect();
        let weights: Vec<f64> = table
            .weights()
            .iter()
            .enumerate()
            .map(|(row, w)| w * multiplier.number_at(row).unwrap_or(0.0).max(0.0))
            .collect();
        Ok(self.rank(table, &keys, &weights))
    }

    fn rank(&self, table: &WeightedTable, keys: &[Option<f64>], weights: &[f64]) -> Ranking {
        let mut buckets = vec![UNRANKED_BUCKET; table.len()];

        let mut order: Vec<(usize, f64)> = keys
            .iter()
            .enumerate()
            .filter_map(|(row, key)| key.filter(|v| *v > 0.0).map(|v| (row, v)))
            .collect();
        // `sort_by` is stable: equal keys keep table order.
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        let total = order
            .iter()
            .map(|(row, _)| weights.get(*row).copied().unwrap_or(0.0))
            .collect::<CompensatedSum>()
            .value();
        let n = f64::from(self.bucket_count);

        let mut cumulative = CompensatedSum::new();
        for (row, _) in &order {
            cumulative.push(weights.get(*row).copied().unwrap_or(0.0));
            let bucket = if total > 0.0 {
                bucket_for_position(n * cumulative.value() / total, n)
            } else {
                1
            };
            if let Some(slot) = buckets.get_mut(*row) {
                *slot = bucket;
            }
        }

        let unranked = buckets.iter().filter(|b| **b == UNRANKED_BUCKET).count();
        tracing::debug!(
            entity = table.entity(),
            records = table.len(),
            unranked,
            bucket_count = self.bucket_count,
            "Assigned weighted rank buckets"
        );

        Ranking::new(self.bucket_count, table.ids().to_vec(), buckets)
    }
}

/// `ceil(position)` clipped to `[1, n]`.
// Clamped to [1, bucket_count], which always fits in i32.
#[allow(clippy::cast_possible_truncation)]
fn bucket_for_position(position: f64, n: f64) -> i32 {
    (position - RANK_TOLERANCE).ceil().clamp(1.0, n) as i32
}

/// Rank buckets for the records of one table, parallel to its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    bucket_count: u32,
    ids: Vec<EntityId>,
    buckets: Vec<i32>,
    index: HashMap<EntityId, usize>,
}

impl Ranking {
    fn new(bucket_count: u32, ids: Vec<EntityId>, buckets: Vec<i32>) -> Self {
        let index = ids.iter().enumerate().map(|(row, id)| (*id, row)).collect();
        Self {
            bucket_count,
            ids,
            buckets,
            index,
        }
    }

    /// Number of buckets.
    pub const fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    /// Bucket per row, in table order.
    pub fn buckets(&self) -> &[i32] {
        &self.buckets
    }

    /// Bucket of the record at `row`.
    pub fn bucket_at(&self, row: usize) -> Option<i32> {
        self.buckets.get(row).copied()
    }

    /// Bucket of the record with id `id`.
    pub fn bucket_of(&self, id: EntityId) -> Option<i32> {
        self.index.get(&id).and_then(|row| self.bucket_at(*row))
    }

    /// `(id, bucket)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, i32)> + '_ {
        self.ids.iter().copied().zip(self.buckets.iter().copied())
    }

    /// Rows assigned to `bucket`.
    pub fn rows_in_bucket(&self, bucket: i32) -> Vec<usize> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == bucket)
            .map(|(row, _)| row)
            .collect()
    }

    /// Rows that could not be ranked.
    pub fn unranked_rows(&self) -> Vec<usize> {
        self.rows_in_bucket(UNRANKED_BUCKET)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
mod tests {
    use super::*;

    fn table(values: Vec<f64>, weights: Vec<f64>) -> WeightedTable {
        let ids: Vec<EntityId> = (1..=values.len() as u64).map(EntityId).collect();
        WeightedTable::builder("household", ids, weights)
            .column("income", values)
            .build()
            .unwrap()
    }

    #[test]
    fn ten_equal_records_fill_ten_deciles() {
        let t = table((1..=10_i32).map(f64::from).rev().collect(), vec![1.0; 10]);
        let ranking = DecileAssigner::deciles().assign(&t, "income").unwrap();
        // Values are descending in table order, so ranks are too.
        assert_eq!(ranking.buckets(), &[10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn non_positive_and_missing_are_unranked() {
        let ids: Vec<EntityId> = (1..=4).map(EntityId).collect();
        let t = WeightedTable::builder("household", ids, [1.0; 4])
            .column("income", vec![Some(-5.0), Some(0.0), None, Some(10.0)])
            .build()
            .unwrap();
        let ranking = DecileAssigner::deciles().assign(&t, "income").unwrap();
        assert_eq!(ranking.buckets(), &[-1, -1, -1, 10]);
        assert_eq!(ranking.unranked_rows(), vec![0, 1, 2]);
    }

    #[test]
    fn ties_keep_table_order() {
        let t = table(vec![5.0, 5.0, 5.0, 5.0], vec![1.0; 4]);
        let ranking = DecileAssigner::new(4).unwrap().assign(&t, "income").unwrap();
        assert_eq!(ranking.buckets(), &[1, 2, 3, 4]);
    }

    #[test]
    fn heavy_record_is_not_split() {
        // One record holds 90% of the weight; it lands in a single bucket.
        let t = table(vec![1.0, 2.0, 3.0], vec![0.5, 9.0, 0.5]);
        let ranking = DecileAssigner::deciles().assign(&t, "income").unwrap();
        assert_eq!(ranking.buckets(), &[1, 10, 10]);
    }

    #[test]
    fn zero_total_weight_ranks_into_first_bucket() {
        let t = table(vec![1.0, 2.0], vec![0.0, 0.0]);
        let ranking = DecileAssigner::deciles().assign(&t, "income").unwrap();
        assert_eq!(ranking.buckets(), &[1, 1]);
    }

    #[test]
    fn people_weighted_ranking() {
        let ids: Vec<EntityId> = (1..=2).map(EntityId).collect();
        let t = WeightedTable::builder("household", ids, [1.0, 1.0])
            .column("income", vec![10.0, 20.0])
            .column("people", vec![3.0, 1.0])
            .build()
            .unwrap();
        let ranking = DecileAssigner::new(4)
            .unwrap()
            .assign_weighted(&t, "income", "people")
            .unwrap();
        // Cumulative people: 3 of 4 then 4 of 4.
        assert_eq!(ranking.buckets(), &[3, 4]);
    }

    #[test]
    fn lookup_by_id() {
        let t = table(vec![1.0, 2.0], vec![1.0, 1.0]);
        let ranking = DecileAssigner::new(2).unwrap().assign(&t, "income").unwrap();
        assert_eq!(ranking.bucket_of(EntityId(2)), Some(2));
        assert_eq!(ranking.bucket_of(EntityId(99)), None);
        assert_eq!(ranking.iter().count(), 2);
    }

    #[test]
    fn zero_buckets_rejected() {
        assert_eq!(DecileAssigner::new(0), Err(MicrodataError::InvalidBucketCount));
    }
}
