//! The immutable weighted table for one entity level.
//!
//! A [`WeightedTable`] holds the records of one entity level (persons,
//! benefit units, households) for one simulation run: a unique id and a
//! non-negative weight per record, any number of typed variable columns, and
//! membership columns linking each record to the coarser entities that
//! contain it. Tables are built once through [`WeightedTableBuilder`] and
//! never mutated; every derived computation produces a new table or scalar.

use std::collections::{BTreeMap, HashMap};

use incidence_types::EntityId;

use crate::column::Column;
use crate::error::MicrodataError;
use crate::sum::CompensatedSum;

/// Records of one entity level with their weights and variables.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTable {
    entity: String,
    ids: Vec<EntityId>,
    index: HashMap<EntityId, usize>,
    weights: Vec<f64>,
    columns: BTreeMap<String, Column>,
    memberships: BTreeMap<String, Vec<EntityId>>,
}

impl WeightedTable {
    /// Start building a table from its ids and weights.
    pub fn builder(
        entity: impl Into<String>,
        ids: impl IntoIterator<Item = EntityId>,
        weights: impl IntoIterator<Item = f64>,
    ) -> WeightedTableBuilder {
        WeightedTableBuilder {
            entity: entity.into(),
            ids: ids.into_iter().collect(),
            weights: weights.into_iter().collect(),
            columns: BTreeMap::new(),
            memberships: BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Entity level name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Record ids in table order.
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Record weights in table order.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weight of the record at `row` (0 for an out-of-range row).
    pub fn weight(&self, row: usize) -> f64 {
        self.weights.get(row).copied().unwrap_or(0.0)
    }

    /// Row index of the record with the given id.
    pub fn row_of(&self, id: EntityId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Total population weight.
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().copied().collect::<CompensatedSum>().value()
    }

    /// Whether the table defines `variable`.
    pub fn has_variable(&self, variable: &str) -> bool {
        self.columns.contains_key(variable)
    }

    /// Names of every variable, in sorted order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// The column for `variable`.
    pub fn column(&self, variable: &str) -> Result<&Column, MicrodataError> {
        self.columns
            .get(variable)
            .ok_or_else(|| MicrodataError::VariableNotFound {
                variable: variable.to_owned(),
                scope: self.entity.clone(),
            })
    }

    /// The column for `variable`, which must be numeric or boolean.
    pub fn numeric_column(&self, variable: &str) -> Result<&Column, MicrodataError> {
        let column = self.column(variable)?;
        if column.is_numeric() {
            Ok(column)
        } else {
            Err(MicrodataError::NonNumericVariable {
                variable: variable.to_owned(),
            })
        }
    }

    /// Containing-entity ids for the `group` level, one per record.
    pub fn membership(&self, group: &str) -> Option<&[EntityId]> {
        self.memberships.get(group).map(Vec::as_slice)
    }

    /// Coarser levels this table links to.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.memberships.keys().map(String::as_str)
    }

    /// A new table with the same records and memberships but only the given
    /// columns.
    pub fn with_columns(&self, columns: BTreeMap<String, Column>) -> Result<Self, MicrodataError> {
        let expected = self.len();
        for (name, column) in &columns {
            if column.len() != expected {
                return Err(MicrodataError::ColumnLengthMismatch {
                    name: name.clone(),
                    expected,
                    actual: column.len(),
                });
            }
        }
        Ok(Self {
            entity: self.entity.clone(),
            ids: self.ids.clone(),
            index: self.index.clone(),
            weights: self.weights.clone(),
            columns,
            memberships: self.memberships.clone(),
        })
    }
}

/// Validating builder for [`WeightedTable`].
#[derive(Debug, Clone)]
pub struct WeightedTableBuilder {
    entity: String,
    ids: Vec<EntityId>,
    weights: Vec<f64>,
    columns: BTreeMap<String, Column>,
    memberships: BTreeMap<String, Vec<EntityId>>,
    duplicates: Vec<String>,
}

impl WeightedTableBuilder {
    /// Add a variable column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, column: impl Into<Column>) -> Self {
        let name = name.into();
        if self.columns.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.columns.insert(name, column.into());
        }
        self
    }

    /// Link every record to its containing entity at the `group` level.
    #[must_use]
    pub fn membership(
        mut self,
        group: impl Into<String>,
        group_ids: impl IntoIterator<Item = EntityId>,
    ) -> Self {
        self.memberships
            .insert(group.into(), group_ids.into_iter().collect());
        self
    }

    /// Validate and build the table.
    ///
    /// # Errors
    ///
    /// - [`MicrodataError::ColumnLengthMismatch`] if the weights, a column,
    ///   or a membership does not have one entry per id.
    /// - [`MicrodataError::DuplicateEntityId`] if an id repeats.
    /// - [`MicrodataError::InvalidWeight`] if a weight is negative or not
    ///   finite.
    /// - [`MicrodataError::DuplicateVariable`] if a column name repeats.
    pub fn build(self) -> Result<WeightedTable, MicrodataError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(MicrodataError::DuplicateVariable(name));
        }

        let expected = self.ids.len();
        check_len("weight", expected, self.weights.len())?;
        for (name, column) in &self.columns {
            check_len(name, expected, column.len())?;
        }
        for (group, ids) in &self.memberships {
            check_len(group, expected, ids.len())?;
        }

        let mut index = HashMap::with_capacity(expected);
        for (row, (id, weight)) in self.ids.iter().zip(&self.weights).enumerate() {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(MicrodataError::InvalidWeight {
                    id: *id,
                    weight: *weight,
                });
            }
            if index.insert(*id, row).is_some() {
                return Err(MicrodataError::DuplicateEntityId {
                    entity: self.entity,
                    id: *id,
                });
            }
        }

        Ok(WeightedTable {
            entity: self.entity,
            ids: self.ids,
            index,
            weights: self.weights,
            columns: self.columns,
            memberships: self.memberships,
        })
    }
}

fn check_len(name: &str, expected: usize, actual: usize) -> Result<(), MicrodataError> {
    if expected == actual {
        Ok(())
    } else {
        Err(MicrodataError::ColumnLengthMismatch {
            name: name.to_owned(),
            expected,
            actual,
        })
    }
}
