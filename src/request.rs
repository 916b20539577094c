//! Request model - an ordered set of entity writes
//!
//! The envelope arrives as JSON:
//!
//! ```json
//! {
//!   "user": { "columnVals": { "name": "amirtha" }, "identityVal": { "id": "7" } },
//!   "address_details": {
//!     "columnVals": { "city": "saun" },
//!     "referenceKey": { "user_id": "$user.id" }
//!   }
//! }
//! ```
//!
//! Entity order is the order of the envelope's keys and is significant:
//! an entity may only reference entities that appear before it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Ordered column → value mapping
pub type ColumnMap = Map<String, Value>;

const COLUMN_VALS: &str = "columnVals";
const REFERENCE_KEY: &str = "referenceKey";
const IDENTITY_VAL: &str = "identityVal";

/// Placeholder entity name used for errors about the envelope itself
const ENVELOPE: &str = "<request>";

/// The kind of data-modification a request performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Create rows, collecting generated identifiers
    Insert,
    /// Modify existing rows located by id or predicates
    Update,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
        }
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "insert" | "post" | "create" => Ok(OperationKind::Insert),
            "update" | "patch" => Ok(OperationKind::Update),
            _ => Err(Error::InvalidOperation(s.to_string())),
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One named unit of work, targeting one table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityWrite {
    /// Entity / table name, unique within the request
    pub name: String,
    /// Column values; reference columns hold literals once resolved
    pub column_values: ColumnMap,
    /// Column → `$entity.column` token, in payload order
    pub reference_keys: Vec<(String, String)>,
    /// Literal predicates locating the rows an update targets
    pub identity_predicate: ColumnMap,
}

impl EntityWrite {
    /// Create an entity with no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set a column value
    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.column_values.insert(column.into(), value.into());
        self
    }

    /// Add a reference key
    pub fn with_reference(mut self, column: impl Into<String>, token: impl Into<String>) -> Self {
        self.reference_keys.push((column.into(), token.into()));
        self
    }

    /// Add an identity predicate entry
    pub fn with_identity(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.identity_predicate.insert(column.into(), value.into());
        self
    }

    /// Token registered for `column`, if it is a reference column
    pub fn reference_for(&self, column: &str) -> Option<&str> {
        self.reference_keys
            .iter()
            .find(|(col, _)| col == column)
            .map(|(_, token)| token.as_str())
    }

    pub fn is_reference_column(&self, column: &str) -> bool {
        self.reference_for(column).is_some()
    }

    pub fn has_identity_predicate(&self) -> bool {
        !self.identity_predicate.is_empty()
    }

    /// Parse one envelope entry
    pub fn from_json(name: &str, payload: &Value) -> Result<Self> {
        let object = payload
            .as_object()
            .ok_or_else(|| Error::malformed(name, "entity payload must be an object"))?;

        let column_values = match object.get(COLUMN_VALS) {
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(Error::malformed(name, format!("`{}` must be an object", COLUMN_VALS))),
            None => return Err(Error::malformed(name, format!("`{}` is missing", COLUMN_VALS))),
        };

        let mut reference_keys = Vec::new();
        match object.get(REFERENCE_KEY) {
            Some(Value::Object(map)) => {
                for (column, token) in map {
                    let token = token.as_str().ok_or_else(|| {
                        Error::malformed(name, format!("reference for column `{}` must be a string", column))
                    })?;
                    reference_keys.push((column.clone(), token.to_string()));
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => return Err(Error::malformed(name, format!("`{}` must be an object", REFERENCE_KEY))),
        }

        let identity_predicate = match object.get(IDENTITY_VAL) {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => ColumnMap::new(),
            Some(_) => return Err(Error::malformed(name, format!("`{}` must be an object", IDENTITY_VAL))),
        };

        Ok(Self {
            name: name.to_string(),
            column_values,
            reference_keys,
            identity_predicate,
        })
    }
}

/// An ordered collection of entity writes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteRequest {
    entities: Vec<EntityWrite>,
}

impl WriteRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity, rejecting duplicate names
    pub fn push(&mut self, entity: EntityWrite) -> Result<()> {
        if self.get(&entity.name).is_some() {
            return Err(Error::malformed(&entity.name, "entity appears more than once in the request"));
        }
        self.entities.push(entity);
        Ok(())
    }

    /// Builder-style [`WriteRequest::push`]
    pub fn with_entity(mut self, entity: EntityWrite) -> Result<Self> {
        self.push(entity)?;
        Ok(self)
    }

    /// Parse a JSON envelope
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    /// Build a request from an already-parsed envelope, keeping key order
    pub fn from_json_value(envelope: &Value) -> Result<Self> {
        let object = envelope
            .as_object()
            .ok_or_else(|| Error::malformed(ENVELOPE, "request envelope must be a JSON object"))?;

        let mut request = Self::new();
        for (name, payload) in object {
            request.push(EntityWrite::from_json(name, payload)?)?;
        }
        Ok(request)
    }

    pub fn get(&self, name: &str) -> Option<&EntityWrite> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entities(&self) -> &[EntityWrite] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn into_entities(self) -> Vec<EntityWrite> {
        self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_kind_aliases() {
        assert_eq!(OperationKind::from_str("POST").unwrap(), OperationKind::Insert);
        assert_eq!(OperationKind::from_str("insert").unwrap(), OperationKind::Insert);
        assert_eq!(OperationKind::from_str("PATCH").unwrap(), OperationKind::Update);
        assert_eq!(OperationKind::from_str("update").unwrap(), OperationKind::Update);
        assert!(OperationKind::from_str("delete").is_err());
    }

    #[test]
    fn test_envelope_keeps_entity_order() {
        let request = WriteRequest::from_json_str(
            r#"{
                "zeta": { "columnVals": { "a": 1 } },
                "alpha": { "columnVals": { "b": 2 }, "referenceKey": { "z_id": "$zeta.id" } },
                "mid": { "columnVals": {} }
            }"#,
        )
        .unwrap();

        let names: Vec<_> = request.entities().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(request.get("alpha").unwrap().reference_for("z_id"), Some("$zeta.id"));
    }

    #[test]
    fn test_envelope_keeps_column_order() {
        let request = WriteRequest::from_json_str(
            r#"{ "user": { "columnVals": { "name": "x", "email": "y", "age": 3 } } }"#,
        )
        .unwrap();
        let columns: Vec<_> = request.entities()[0].column_values.keys().cloned().collect();
        assert_eq!(columns, vec!["name", "email", "age"]);
    }

    #[test]
    fn test_missing_column_vals_is_malformed() {
        let err = WriteRequest::from_json_value(&json!({ "user": { "identityVal": { "id": 1 } } })).unwrap_err();
        assert!(matches!(err, Error::MalformedEntity { ref entity, .. } if entity == "user"));
    }

    #[test]
    fn test_non_object_column_vals_is_malformed() {
        let err = WriteRequest::from_json_value(&json!({ "user": { "columnVals": [1, 2] } })).unwrap_err();
        assert!(matches!(err, Error::MalformedEntity { .. }));
    }

    #[test]
    fn test_non_string_reference_is_malformed() {
        let err = WriteRequest::from_json_value(&json!({
            "user": { "columnVals": {}, "referenceKey": { "org_id": 5 } }
        }))
        .unwrap_err();
        assert!(matches!(err, Error::MalformedEntity { .. }));
    }

    #[test]
    fn test_identity_predicate_parsed() {
        let request = WriteRequest::from_json_value(&json!({
            "user": { "columnVals": { "name": "n" }, "identityVal": { "id": "7" } }
        }))
        .unwrap();
        let user = &request.entities()[0];
        assert!(user.has_identity_predicate());
        assert_eq!(user.identity_predicate.get("id"), Some(&json!("7")));
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut request = WriteRequest::new();
        request.push(EntityWrite::new("user")).unwrap();
        assert!(request.push(EntityWrite::new("user")).is_err());
        assert_eq!(request.len(), 1);
    }
}
