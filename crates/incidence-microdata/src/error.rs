//! Error types for the `incidence-microdata` crate.
//!
//! Every structural problem with a table or a reference into it is a
//! [`MicrodataError`]. Numerical degeneracies (empty selections, zero
//! denominators) are never errors; they surface as `NaN` results.

use incidence_types::EntityId;

/// Errors that can occur while building or querying microdata.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MicrodataError {
    /// A referenced variable does not exist.
    #[error("variable '{variable}' not found in {scope}")]
    VariableNotFound {
        /// The missing variable.
        variable: String,
        /// Entity level or snapshot that was searched.
        scope: String,
    },

    /// No table exists for the requested entity level.
    #[error("unknown entity level: {0}")]
    UnknownEntity(String),

    /// Two entity levels are not linked by a membership column.
    #[error("no membership link between {from} and {to}")]
    MissingMembership {
        /// Level the variable is defined on.
        from: String,
        /// Level the variable was requested at.
        to: String,
    },

    /// A membership column refers to a record that does not exist.
    #[error("{entity} record {id} belongs to {group} {group_id}, which does not exist")]
    DanglingMembership {
        /// Level holding the membership column.
        entity: String,
        /// Member record.
        id: EntityId,
        /// Containing level.
        group: String,
        /// Id that could not be resolved.
        group_id: EntityId,
    },

    /// A numeric operation was requested on a categorical column.
    #[error("variable '{variable}' is not numeric")]
    NonNumericVariable {
        /// The categorical variable.
        variable: String,
    },

    /// A column's length does not match the table's record count.
    #[error("column '{name}' has {actual} values but the table has {expected} records")]
    ColumnLengthMismatch {
        /// Column or membership name.
        name: String,
        /// Number of records in the table.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// An entity id appears more than once in a table.
    #[error("duplicate {entity} id {id}")]
    DuplicateEntityId {
        /// Entity level of the table.
        entity: String,
        /// The repeated id.
        id: EntityId,
    },

    /// A weight is negative or not finite.
    #[error("invalid weight {weight} for record {id}")]
    InvalidWeight {
        /// Record carrying the weight.
        id: EntityId,
        /// The offending weight.
        weight: f64,
    },

    /// A variable is defined more than once (within a table or across the
    /// tables of one snapshot).
    #[error("variable '{0}' is defined more than once")]
    DuplicateVariable(String),

    /// A snapshot already holds a table for this entity level.
    #[error("duplicate table for entity level {0}")]
    DuplicateEntity(String),

    /// A ranking was requested with zero buckets.
    #[error("bucket count must be at least 1")]
    InvalidBucketCount,
}
