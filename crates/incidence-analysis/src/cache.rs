//! Explicit memoisation of aggregate results.
//!
//! Snapshots are immutable, so a result is fully determined by the snapshot
//! ids and the query. [`ResultCache`] keys results on exactly that and is
//! invalidated per snapshot when a caller discards one.

use std::collections::HashMap;

use serde::Serialize;

use incidence_microdata::Microdata;
use incidence_types::SnapshotId;

use crate::aggregate::{AggregateQuery, Aggregator};
use crate::change::{ChangeAggregator, ChangeQuery};
use crate::error::AnalysisError;

/// Identity of one cached result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Snapshot the query ran on (the baseline for change queries).
    pub baseline: SnapshotId,
    /// Reform snapshot for change queries.
    pub reform: Option<SnapshotId>,
    /// Canonical JSON form of the query.
    pub query: String,
}

impl CacheKey {
    /// Whether the key depends on `snapshot`.
    pub fn involves(&self, snapshot: SnapshotId) -> bool {
        self.baseline == snapshot || self.reform == Some(snapshot)
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum KeyedQuery<'a> {
    Aggregate(&'a AggregateQuery),
    Change(&'a ChangeQuery),
}

/// Memoised [`Aggregator`] and [`ChangeAggregator`] results.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    entries: HashMap<CacheKey, f64>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// [`Aggregator::aggregate`], memoised.
    pub fn aggregate(
        &mut self,
        data: &Microdata,
        query: &AggregateQuery,
    ) -> Result<f64, AnalysisError> {
        let key = CacheKey {
            baseline: data.id(),
            reform: None,
            query: serde_json::to_string(&KeyedQuery::Aggregate(query))?,
        };
        self.get_or_compute(key, || Aggregator::aggregate(data, query))
    }

    /// [`ChangeAggregator::aggregate_change`], memoised.
    pub fn aggregate_change(
        &mut self,
        baseline: &Microdata,
        reform: &Microdata,
        query: &ChangeQuery,
    ) -> Result<f64, AnalysisError> {
        let key = CacheKey {
            baseline: baseline.id(),
            reform: Some(reform.id()),
            query: serde_json::to_string(&KeyedQuery::Change(query))?,
        };
        self.get_or_compute(key, || ChangeAggregator::aggregate_change(baseline, reform, query))
    }

    fn get_or_compute(
        &mut self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<f64, AnalysisError>,
    ) -> Result<f64, AnalysisError> {
        if let Some(value) = self.entries.get(&key) {
            self.hits = self.hits.saturating_add(1);
            return Ok(*value);
        }
        self.misses = self.misses.saturating_add(1);
        let value = compute()?;
        self.entries.insert(key, value);
        Ok(value)
    }

    /// Drop every result that depends on `snapshot`; returns how many were
    /// dropped.
    pub fn invalidate(&mut self, snapshot: SnapshotId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.involves(snapshot));
        let dropped = before.saturating_sub(self.entries.len());
        tracing::debug!(%snapshot, dropped, "Invalidated cached results");
        dropped
    }

    /// Drop every result.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from the cache.
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to compute.
    pub const fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use incidence_microdata::WeightedTable;
    use incidence_types::{EntityId, SnapshotMeta, Statistic};

    use super::*;

    fn snapshot(scenario: &str, values: Vec<f64>) -> Microdata {
        let table = WeightedTable::builder("household", [EntityId(1), EntityId(2)], [1.0, 3.0])
            .column("net_income", values)
            .build()
            .unwrap();
        Microdata::from_table(SnapshotMeta::new(scenario, 2025), table)
    }

    #[test]
    fn repeated_query_hits() {
        let data = snapshot("baseline", vec![10.0, 20.0]);
        let query = AggregateQuery::new("net_income", Statistic::Sum);
        let mut cache = ResultCache::new();
        let first = cache.aggregate(&data, &query).unwrap();
        let second = cache.aggregate(&data, &query).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
        assert!((first - 70.0).abs() < 1e-12);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn different_statistics_are_separate_entries() {
        let data = snapshot("baseline", vec![10.0, 20.0]);
        let mut cache = ResultCache::new();
        cache
            .aggregate(&data, &AggregateQuery::new("net_income", Statistic::Sum))
            .unwrap();
        cache
            .aggregate(&data, &AggregateQuery::new("net_income", Statistic::Mean))
            .unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_drops_dependent_results() {
        let baseline = snapshot("baseline", vec![10.0, 20.0]);
        let reform = snapshot("reform", vec![15.0, 20.0]);
        let other = snapshot("other", vec![1.0, 1.0]);
        let mut cache = ResultCache::new();
        cache
            .aggregate(&baseline, &AggregateQuery::new("net_income", Statistic::Sum))
            .unwrap();
        cache
            .aggregate(&other, &AggregateQuery::new("net_income", Statistic::Sum))
            .unwrap();
        let change = cache
            .aggregate_change(&baseline, &reform, &ChangeQuery::new("net_income", Statistic::Sum))
            .unwrap();
        assert!((change - 5.0).abs() < 1e-12);
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.invalidate(reform.id()), 1);
        assert_eq!(cache.invalidate(baseline.id()), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let data = snapshot("baseline", vec![10.0, 20.0]);
        let mut cache = ResultCache::new();
        let query = AggregateQuery::new("wealth", Statistic::Sum);
        assert!(cache.aggregate(&data, &query).is_err());
        assert!(cache.is_empty());
    }
}
