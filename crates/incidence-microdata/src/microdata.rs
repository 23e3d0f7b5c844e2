//! A microdata snapshot: every entity-level table of one simulation run.
//!
//! Variables are defined on exactly one entity level. Reading a variable at
//! a different level projects it along a membership column:
//!
//! - **member to group** (person to household): values of all members are
//!   summed. Missing member values are skipped; a group with no present
//!   member values gets 0.
//! - **group to member** (household to person): each member receives its
//!   group's value.
//!
//! Projections never touch weights; the target table's weights are used.

use std::collections::BTreeMap;

use incidence_types::{EntityId, SnapshotId, SnapshotMeta};

use crate::column::Column;
use crate::error::MicrodataError;
use crate::sum::CompensatedSum;
use crate::table::WeightedTable;

/// All tables of one simulation run, keyed by entity level.
#[derive(Debug, Clone, PartialEq)]
pub struct Microdata {
    meta: SnapshotMeta,
    tables: BTreeMap<String, WeightedTable>,
}

impl Microdata {
    /// An empty snapshot.
    pub const fn new(meta: SnapshotMeta) -> Self {
        Self {
            meta,
            tables: BTreeMap::new(),
        }
    }

    /// A snapshot holding a single table.
    pub fn from_table(meta: SnapshotMeta, table: WeightedTable) -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(table.entity().to_owned(), table);
        Self { meta, tables }
    }

    /// Add an entity-level table.
    ///
    /// # Errors
    ///
    /// - [`MicrodataError::DuplicateEntity`] if the level is already present.
    /// - [`MicrodataError::DuplicateVariable`] if one of the table's
    ///   variables is already defined on another level.
    pub fn with_table(mut self, table: WeightedTable) -> Result<Self, MicrodataError> {
        if self.tables.contains_key(table.entity()) {
            return Err(MicrodataError::DuplicateEntity(table.entity().to_owned()));
        }
        if let Some(clash) = table
            .variables()
            .find(|v| self.tables.values().any(|t| t.has_variable(v)))
        {
            return Err(MicrodataError::DuplicateVariable(clash.to_owned()));
        }
        self.tables.insert(table.entity().to_owned(), table);
        Ok(self)
    }

    /// Snapshot metadata.
    pub const fn meta(&self) -> &SnapshotMeta {
        &self.meta
    }

    /// Snapshot identifier.
    pub const fn id(&self) -> SnapshotId {
        self.meta.id
    }

    /// The table for an entity level.
    pub fn table(&self, entity: &str) -> Result<&WeightedTable, MicrodataError> {
        self.tables
            .get(entity)
            .ok_or_else(|| MicrodataError::UnknownEntity(entity.to_owned()))
    }

    /// Entity levels present, in sorted order.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// The level `variable` is defined on.
    pub fn entity_of(&self, variable: &str) -> Result<&str, MicrodataError> {
        self.tables
            .iter()
            .find(|(_, table)| table.has_variable(variable))
            .map(|(entity, _)| entity.as_str())
            .ok_or_else(|| MicrodataError::VariableNotFound {
                variable: variable.to_owned(),
                scope: self.meta.scenario.clone(),
            })
    }

    /// Values of `variable` expressed at the `target` level, one per target
    /// record in table order.
    ///
    /// # Errors
    ///
    /// - [`MicrodataError::VariableNotFound`] / [`MicrodataError::UnknownEntity`]
    ///   for unknown names.
    /// - [`MicrodataError::MissingMembership`] if neither level links to the
    ///   other.
    /// - [`MicrodataError::NonNumericVariable`] when summing a categorical
    ///   variable up to a group.
    /// - [`MicrodataError::DanglingMembership`] if a membership id has no
    ///   record.
    pub fn values_at(&self, variable: &str, target: &str) -> Result<Column, MicrodataError> {
        let source_entity = self.entity_of(variable)?;
        let source = self.table(source_entity)?;
        let target_table = self.table(target)?;
        let column = source.column(variable)?;

        if source_entity == target {
            return Ok(column.clone());
        }

        if let Some(groups) = source.membership(target) {
            tracing::debug!(
                variable,
                from = source_entity,
                to = target,
                "Summing members into groups"
            );
            return sum_into_groups(variable, source, column, groups, target_table);
        }

        if let Some(groups) = target_table.membership(source_entity) {
            tracing::debug!(
                variable,
                from = source_entity,
                to = target,
                "Broadcasting group values"
            );
            let rows = resolve(target_table, groups, source)?;
            return Ok(column.gather(&rows));
        }

        Err(MicrodataError::MissingMembership {
            from: source_entity.to_owned(),
            to: target.to_owned(),
        })
    }

    /// A table at the `target` level holding the named variables, each
    /// projected to that level. The target's ids, weights, and memberships
    /// are kept.
    pub fn materialize(
        &self,
        target: &str,
        variables: &[&str],
    ) -> Result<WeightedTable, MicrodataError> {
        let table = self.table(target)?;
        let mut columns = BTreeMap::new();
        for variable in variables {
            if columns.contains_key(*variable) {
                continue;
            }
            columns.insert((*variable).to_owned(), self.values_at(variable, target)?);
        }
        table.with_columns(columns)
    }
}

/// For each member row, the row of its group in `groups_table`.
fn resolve(
    members: &WeightedTable,
    group_ids: &[EntityId],
    groups_table: &WeightedTable,
) -> Result<Vec<Option<usize>>, MicrodataError> {
    members
        .ids()
        .iter()
        .zip(group_ids)
        .map(|(id, group_id)| {
            groups_table
                .row_of(*group_id)
                .map(Some)
                .ok_or_else(|| MicrodataError::DanglingMembership {
                    entity: members.entity().to_owned(),
                    id: *id,
                    group: groups_table.entity().to_owned(),
                    group_id: *group_id,
                })
        })
        .collect()
}

fn sum_into_groups(
    variable: &str,
    members: &WeightedTable,
    column: &Column,
    group_ids: &[EntityId],
    groups_table: &WeightedTable,
) -> Result<Column, MicrodataError> {
    if !column.is_numeric() {
        return Err(MicrodataError::NonNumericVariable {
            variable: variable.to_owned(),
        });
    }
    let rows = resolve(members, group_ids, groups_table)?;

    let mut sums = vec![CompensatedSum::new(); groups_table.len()];
    for (member_row, group_row) in rows.iter().enumerate() {
        let (Some(group_row), Some(value)) = (group_row, column.number_at(member_row)) else {
            continue;
        };
        if let Some(sum) = sums.get_mut(*group_row) {
            sum.push(value);
        }
    }
    Ok(Column::Numeric(
        sums.iter().map(|sum| Some(sum.value())).collect(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot() -> Microdata {
        let people = WeightedTable::builder(
            "person",
            [EntityId(1), EntityId(2), EntityId(3)],
            [1.0, 1.0, 2.0],
        )
        .column("employment_income", vec![Some(10.0), None, Some(5.0)])
        .column("sex", vec!["female", "male", "female"])
        .membership("household", [EntityId(100), EntityId(100), EntityId(200)])
        .build()
        .unwrap();
        let households =
            WeightedTable::builder("household", [EntityId(100), EntityId(200)], [1.0, 2.0])
                .column("rent", vec![300.0, 400.0])
                .build()
                .unwrap();
        Microdata::new(SnapshotMeta::new("baseline", 2025))
            .with_table(people)
            .unwrap()
            .with_table(households)
            .unwrap()
    }

    #[test]
    fn sums_members_into_households() {
        let data = snapshot();
        let values = data.values_at("employment_income", "household").unwrap();
        assert_eq!(values, Column::Numeric(vec![Some(10.0), Some(5.0)]));
    }

    #[test]
    fn broadcasts_households_to_members() {
        let data = snapshot();
        let values = data.values_at("rent", "person").unwrap();
        assert_eq!(
            values,
            Column::Numeric(vec![Some(300.0), Some(300.0), Some(400.0)])
        );
    }

    #[test]
    fn categorical_cannot_be_summed() {
        let data = snapshot();
        let err = data.values_at("sex", "household").unwrap_err();
        assert!(matches!(err, MicrodataError::NonNumericVariable { .. }));
    }

    #[test]
    fn materialize_keeps_target_weights() {
        let data = snapshot();
        let table = data
            .materialize("household", &["employment_income", "rent"])
            .unwrap();
        assert_eq!(table.weights(), &[1.0, 2.0]);
        assert!(table.has_variable("employment_income"));
        assert!(table.has_variable("rent"));
    }

    #[test]
    fn unknown_variable_names_the_scenario() {
        let data = snapshot();
        let err = data.entity_of("wealth").unwrap_err();
        assert_eq!(
            err,
            MicrodataError::VariableNotFound {
                variable: "wealth".into(),
                scope: "baseline".into(),
            }
        );
    }

    #[test]
    fn rejects_variable_on_two_levels() {
        let data = snapshot();
        let clash = WeightedTable::builder("benunit", [EntityId(1)], [1.0])
            .column("rent", vec![1.0])
            .build()
            .unwrap();
        assert_eq!(
            data.with_table(clash).unwrap_err(),
            MicrodataError::DuplicateVariable("rent".into())
        );
    }

    #[test]
    fn dangling_membership_is_reported() {
        let people = WeightedTable::builder("person", [EntityId(1)], [1.0])
            .column("employment_income", vec![1.0])
            .membership("household", [EntityId(999)])
            .build()
            .unwrap();
        let households = WeightedTable::builder("household", [EntityId(100)], [1.0])
            .build()
            .unwrap();
        let data = Microdata::from_table(SnapshotMeta::new("baseline", 2025), people)
            .with_table(households)
            .unwrap();
        let err = data.values_at("employment_income", "household").unwrap_err();
        assert!(matches!(err, MicrodataError::DanglingMembership { .. }));
    }

    #[test]
    fn unlinked_levels_are_reported() {
        let data = snapshot()
            .with_table(
                WeightedTable::builder("benunit", [EntityId(7)], [1.0])
                    .column("uc_entitlement", vec![50.0])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let err = data.values_at("uc_entitlement", "household").unwrap_err();
        assert!(matches!(err, MicrodataError::MissingMembership { .. }));
    }
}
