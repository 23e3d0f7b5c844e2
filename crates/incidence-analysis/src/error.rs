//! Error types for the `incidence-analysis` crate.

use incidence_types::EntityId;
use incidence_microdata::MicrodataError;

/// Errors that can occur while running an analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A table or variable lookup failed.
    #[error(transparent)]
    Microdata(#[from] MicrodataError),

    /// Baseline and reform do not hold the same records.
    #[error(
        "baseline and reform {entity} records differ ({} only in baseline, {} only in reform)",
        .missing_in_reform.len(),
        .missing_in_baseline.len()
    )]
    Alignment {
        /// Entity level that was aligned.
        entity: String,
        /// Ids present in the baseline but not the reform.
        missing_in_reform: Vec<EntityId>,
        /// Ids present in the reform but not the baseline.
        missing_in_baseline: Vec<EntityId>,
    },

    /// A query could not be serialised into a cache key.
    #[error("failed to build cache key: {0}")]
    CacheKey(#[from] serde_json::Error),
}
