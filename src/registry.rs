//! Identifier registry - values produced while processing one request
//!
//! Keys are `entity.id` for a single identifier and `entity.ids` for the
//! rows affected by a multi-row update. Entries are never removed, and a
//! second record under the same key extends the entry instead of replacing it.

use serde::Serialize;
use serde_json::{Map, Value};

/// Suffix of the plural key recorded for multi-row updates
pub const PLURAL_SUFFIX: &str = "ids";

/// Per-request store of generated identifiers.
///
/// Created empty for every request and dropped with it; never shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IdRegistry {
    entries: Map<String, Value>,
}

impl IdRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the singular identifier of `entity`
    pub fn id_key(entity: &str) -> String {
        format!("{}.{}", entity, crate::ID_COLUMN)
    }

    /// Key of the plural identifier list of `entity`
    pub fn ids_key(entity: &str) -> String {
        format!("{}.{}", entity, PLURAL_SUFFIX)
    }

    /// Store `value` under `key`, or extend the existing entry into a sequence
    pub fn record(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(key, value);
            }
            Some(Value::Array(existing)) => match value {
                Value::Array(more) => existing.extend(more),
                single => existing.push(single),
            },
            Some(existing) => {
                let first = existing.take();
                let mut items = vec![first];
                match value {
                    Value::Array(more) => items.extend(more),
                    single => items.push(single),
                }
                *existing = Value::Array(items);
            }
        }
    }

    /// Look up a previously recorded value
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Record the identifier generated by an insert
    pub fn record_id(&mut self, entity: &str, id: Value) {
        self.record(Self::id_key(entity), id);
    }

    /// Record the identifiers of rows affected by an update.
    ///
    /// One row registers `entity.id`; several rows register the sequence under
    /// both `entity.ids` and `entity.id`. Returns false when nothing was affected.
    pub fn record_affected(&mut self, entity: &str, ids: Vec<Value>) -> bool {
        match ids.len() {
            0 => false,
            1 => {
                let id = ids.into_iter().next().unwrap_or(Value::Null);
                self.record_id(entity, id);
                true
            }
            _ => {
                self.record(Self::ids_key(entity), Value::Array(ids.clone()));
                self.record_id(entity, Value::Array(ids));
                true
            }
        }
    }

    /// Whether `entity` produced a plural result
    pub fn is_plural(&self, entity: &str) -> bool {
        self.entries.contains_key(&Self::ids_key(entity))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for IdRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Registered identifiers:")?;
        for (key, value) in &self.entries {
            writeln!(f, "  {} = {}", key, value)?;
        }
        Ok(())
    }
}
