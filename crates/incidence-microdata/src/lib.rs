//! Weighted microdata tables for the Incidence engine.
//!
//! This crate owns the data model every analysis runs on: typed columns,
//! immutable per-entity weighted tables, snapshots tying the entity levels
//! of one simulation run together, filters, weighted rank buckets, and the
//! weighted statistics themselves.
//!
//! # Modules
//!
//! - [`column`] -- Numeric, boolean, and categorical columns plus filter
//!   scalars.
//! - [`error`] -- [`MicrodataError`].
//! - [`filter`] -- Absolute and rank-bucket filters producing a
//!   [`Selection`].
//! - [`microdata`] -- [`Microdata`] snapshots and projection between entity
//!   levels.
//! - [`rank`] -- [`DecileAssigner`] weighted quantile buckets.
//! - [`stats`] -- Weighted sum, mean, count, and average among non-zero.
//! - [`sum`] -- [`CompensatedSum`] accumulator.
//! - [`table`] -- [`WeightedTable`] and its validating builder.

pub mod column;
pub mod error;
pub mod filter;
pub mod microdata;
pub mod rank;
pub mod stats;
pub mod sum;
pub mod table;

pub use column::{Column, Scalar};
pub use error::MicrodataError;
pub use filter::{Bound, Filter, QuantileBound, Selection};
pub use microdata::Microdata;
pub use rank::{DecileAssigner, Ranking, UNRANKED_BUCKET};
pub use stats::{ratio, weighted_statistic};
pub use sum::CompensatedSum;
pub use table::{WeightedTable, WeightedTableBuilder};
