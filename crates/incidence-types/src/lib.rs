//! Shared type definitions for the Incidence engine.
//!
//! This crate is the single source of truth for the identifiers, enums, and
//! report structures shared by the microdata and analysis crates. Report
//! types flow downstream to `TypeScript` via `ts-rs` for chart rendering.
//!
//! # Modules
//!
//! - [`ids`] -- Snapshot and entity identifiers
//! - [`enums`] -- Statistic kinds, winner/loser outcome buckets, programme kinds
//! - [`structs`] -- Snapshot metadata and the report structures

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{OutcomeBucket, ProgrammeKind, Statistic};
pub use ids::{EntityId, SnapshotId};
pub use structs::{
    BucketImpact, BudgetaryImpactReport, ComparisonMetric, DistributionalImpactReport,
    InequalityReport, PovertyGroupImpact, PovertyImpactReport, ProgrammeImpact, SnapshotMeta,
    WinnersLosers,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the report types.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::SnapshotId::export_all();
        let _ = crate::ids::EntityId::export_all();

        // Enums
        let _ = crate::enums::Statistic::export_all();
        let _ = crate::enums::OutcomeBucket::export_all();
        let _ = crate::enums::ProgrammeKind::export_all();

        // Structs
        let _ = crate::structs::SnapshotMeta::export_all();
        let _ = crate::structs::ComparisonMetric::export_all();
        let _ = crate::structs::WinnersLosers::export_all();
        let _ = crate::structs::BucketImpact::export_all();
        let _ = crate::structs::DistributionalImpactReport::export_all();
        let _ = crate::structs::InequalityReport::export_all();
        let _ = crate::structs::PovertyGroupImpact::export_all();
        let _ = crate::structs::PovertyImpactReport::export_all();
        let _ = crate::structs::ProgrammeImpact::export_all();
        let _ = crate::structs::BudgetaryImpactReport::export_all();
    }
}
