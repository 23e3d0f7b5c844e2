//! Filtered weighted aggregation over a single snapshot.

use serde::{Deserialize, Serialize};

use incidence_microdata::{Filter, Microdata, Selection};
use incidence_types::Statistic;

use crate::error::AnalysisError;

/// One weighted statistic request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateQuery {
    /// Variable aggregated.
    pub variable: String,
    /// Statistic computed.
    pub statistic: Statistic,
    /// Optional subpopulation restriction.
    #[serde(default)]
    pub filter: Option<Filter>,
    /// Entity level to aggregate at; defaults to the variable's own level.
    #[serde(default)]
    pub entity: Option<String>,
}

impl AggregateQuery {
    /// A query over the whole population at the variable's own level.
    pub fn new(variable: impl Into<String>, statistic: Statistic) -> Self {
        Self {
            variable: variable.into(),
            statistic,
            filter: None,
            entity: None,
        }
    }

    /// Restrict to records passing `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Aggregate at another entity level.
    #[must_use]
    pub fn at_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

/// Weighted aggregation over one snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    /// Compute the query's statistic.
    ///
    /// The variable and the filter variable are first projected to the
    /// target level; that level's weights are used.
    ///
    /// # Errors
    ///
    /// Fails with [`AnalysisError::Microdata`] for unknown variables or
    /// levels, unlinked levels, and numeric operations on categorical data.
    pub fn aggregate(data: &Microdata, query: &AggregateQuery) -> Result<f64, AnalysisError> {
        let entity = match &query.entity {
            Some(entity) => entity.as_str(),
            None => data.entity_of(&query.variable)?,
        };

        let mut variables = vec![query.variable.as_str()];
        if let Some(filter) = &query.filter {
            variables.push(filter.variable());
        }
        let table = data.materialize(entity, &variables)?;

        let selection = match &query.filter {
            Some(filter) => filter.apply(&table)?,
            None => Selection::all(&table),
        };
        let value = selection.statistic(&query.variable, query.statistic)?;

        tracing::debug!(
            variable = %query.variable,
            statistic = ?query.statistic,
            entity,
            selected = selection.len(),
            value,
            "Computed aggregate"
        );
        Ok(value)
    }
}
