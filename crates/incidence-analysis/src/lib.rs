//! Weighted aggregation and reform impact analysis for the Incidence engine.
//!
//! Everything here is a pure function of immutable [`Microdata`] snapshots.
//! The [`Aggregator`] and [`ChangeAggregator`] primitives answer single
//! queries; the report builders combine them into the distributional,
//! inequality, poverty, and budgetary comparisons of a reform against a
//! baseline.
//!
//! # Modules
//!
//! - [`aggregate`] -- [`AggregateQuery`] and the single-snapshot
//!   [`Aggregator`].
//! - [`budget`] -- Programme totals and net budgetary impact.
//! - [`cache`] -- [`ResultCache`] memoisation keyed by snapshot id and
//!   query.
//! - [`change`] -- [`ChangeQuery`], record alignment, and the
//!   [`ChangeAggregator`].
//! - [`config`] -- [`AnalysisConfig`] loaded from YAML.
//! - [`distribution`] -- Per-bucket income change and winner/loser shares.
//! - [`error`] -- [`AnalysisError`].
//! - [`inequality`] -- [`LorenzCurve`], Gini coefficient, and income shares.
//! - [`poverty`] -- Poverty headcount and rate by demographic group.
//!
//! [`Microdata`]: incidence_microdata::Microdata

pub mod aggregate;
pub mod budget;
pub mod cache;
pub mod change;
pub mod config;
pub mod distribution;
pub mod error;
pub mod inequality;
pub mod poverty;

pub use aggregate::{AggregateQuery, Aggregator};
pub use budget::budgetary_impact;
pub use cache::{CacheKey, ResultCache};
pub use change::{AlignedChange, ChangeAggregator, ChangeQuery};
pub use config::{
    AnalysisConfig, BudgetConfig, ConfigError, DistributionConfig, InequalityConfig,
    PovertyConfig, PovertyGroup, Programme,
};
pub use distribution::{INCOME_FLOOR, distributional_impact, floored_pct_change};
pub use error::AnalysisError;
pub use inequality::{LorenzCurve, inequality_impact};
pub use poverty::poverty_impact;
