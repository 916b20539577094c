//! Statement builder - turns a resolved entity into an insert or update
//!
//! Updates take one of two shapes:
//! - **Direct**: an `id` is present in the identity predicate or column values,
//!   so the WHERE clause is identifier equality, AND-joined with any resolved
//!   reference keys
//! - **Predicate**: the WHERE clause is built from resolved reference keys and
//!   identity predicate entries
//!
//! Both shapes share one SET rule: reference columns and unchanged identity
//! columns describe the target row, not new state, and are left out.

use serde_json::Value;
use crate::{Error, ID_COLUMN, Result};
use crate::request::EntityWrite;
use crate::resolver::Resolution;
use super::{InsertStatement, Predicate, UpdateStatement};

/// Builds statements from fully resolved entities
#[derive(Debug, Default, Clone, Copy)]
pub struct StatementBuilder;

impl StatementBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build an insert from the entity's column values, in payload order
    pub fn build_insert(&self, entity: &EntityWrite) -> Result<InsertStatement> {
        let mut columns = Vec::with_capacity(entity.column_values.len());
        let mut values = Vec::with_capacity(entity.column_values.len());

        for (column, value) in &entity.column_values {
            ensure_bindable(entity, column, value)?;
            columns.push(column.clone());
            values.push(value.clone());
        }

        Ok(InsertStatement {
            table: entity.name.clone(),
            columns,
            values,
        })
    }

    /// Build an update; `resolutions` are the entity's resolved reference keys
    pub fn build_update(&self, entity: &EntityWrite, resolutions: &[Resolution]) -> Result<UpdateStatement> {
        let direct_id = entity
            .identity_predicate
            .get(ID_COLUMN)
            .or_else(|| entity.column_values.get(ID_COLUMN));

        let predicates = match direct_id {
            Some(id) => {
                ensure_predicate_value(entity, ID_COLUMN, id)?;
                let mut predicates = vec![Predicate::for_value(ID_COLUMN, id.clone())];
                predicates.extend(reference_predicates(entity, resolutions)?);
                predicates
            }
            None => predicate_clause(entity, resolutions)?,
        };

        if predicates.is_empty() {
            return Err(Error::NoUpdateTarget {
                entity: entity.name.clone(),
            });
        }

        let set = set_clause(entity, direct_id.is_some())?;
        if set.is_empty() {
            return Err(Error::malformed(&entity.name, "nothing to update: every column describes the target row"));
        }

        Ok(UpdateStatement {
            table: entity.name.clone(),
            set,
            predicates,
        })
    }
}

/// WHERE predicates from reference keys, then identity predicate entries
fn predicate_clause(entity: &EntityWrite, resolutions: &[Resolution]) -> Result<Vec<Predicate>> {
    let mut predicates = reference_predicates(entity, resolutions)?;

    for (column, value) in &entity.identity_predicate {
        // `entity.column` keys pin reference values; they are not table columns
        let is_override = resolutions
            .iter()
            .filter_map(|r| r.reference.as_ref())
            .any(|reference| reference.registry_key() == *column);
        if is_override || predicates.iter().any(|p| p.column() == column) {
            continue;
        }
        ensure_predicate_value(entity, column, value)?;
        predicates.push(Predicate::for_value(column, value.clone()));
    }

    Ok(predicates)
}

/// One predicate per resolved reference key, in payload order
fn reference_predicates(entity: &EntityWrite, resolutions: &[Resolution]) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::with_capacity(resolutions.len());
    for resolution in resolutions {
        if resolution.column == ID_COLUMN {
            continue;
        }
        ensure_predicate_value(entity, &resolution.column, &resolution.value)?;
        predicates.push(Predicate::for_value(&resolution.column, resolution.value.clone()));
    }
    Ok(predicates)
}

/// SET pairs: every column value that is new state for the target row
fn set_clause(entity: &EntityWrite, exclude_id: bool) -> Result<Vec<(String, Value)>> {
    let mut set = Vec::new();

    for (column, value) in &entity.column_values {
        if exclude_id && column == ID_COLUMN {
            continue;
        }
        if entity.is_reference_column(column) {
            continue;
        }
        // An identity column stays in SET only when it is being changed
        if entity.identity_predicate.get(column).is_some_and(|current| current == value) {
            continue;
        }
        ensure_bindable(entity, column, value)?;
        set.push((column.clone(), value.clone()));
    }

    Ok(set)
}

/// Values bound to a single column must be scalars and fully resolved
fn ensure_bindable(entity: &EntityWrite, column: &str, value: &Value) -> Result<()> {
    match value {
        Value::Array(_) => Err(Error::malformed(
            &entity.name,
            format!("column `{}` holds a sequence; sequences are only valid as predicates", column),
        )),
        Value::Object(_) => Err(Error::malformed(
            &entity.name,
            format!("column `{}` holds an object; only scalar values can be written", column),
        )),
        Value::String(s) if entity.reference_for(column) == Some(s.as_str()) && crate::Reference::is_token(s) => {
            Err(Error::malformed(
                &entity.name,
                format!("column `{}` still holds the unresolved reference `{}`", column, s),
            ))
        }
        _ => Ok(()),
    }
}

/// Predicate values may be scalars or sequences of scalars
fn ensure_predicate_value(entity: &EntityWrite, column: &str, value: &Value) -> Result<()> {
    match value {
        Value::Array(items) => items.iter().try_for_each(|item| ensure_bindable(entity, column, item)),
        other => ensure_bindable(entity, column, other),
    }
}
