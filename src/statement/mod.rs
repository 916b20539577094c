//! Statements - parameterized INSERT/UPDATE operations
//!
//! Statements carry identifiers and bound values separately. Only identifiers
//! are interpolated into SQL text (quoted by a [`SchemaProvider`]); values are
//! always returned as positional parameters.

pub mod builder;

pub use builder::StatementBuilder;

use serde::Serialize;
use serde_json::Value;
use crate::schema::SchemaProvider;

/// A WHERE predicate of an update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Predicate {
    /// `column = value`
    Eq { column: String, value: Value },
    /// `column IN (values...)`
    In { column: String, values: Vec<Value> },
}

impl Predicate {
    /// Equality for scalars, set membership for sequences
    pub fn for_value(column: impl Into<String>, value: Value) -> Self {
        match value {
            Value::Array(values) => Predicate::In { column: column.into(), values },
            value => Predicate::Eq { column: column.into(), value },
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq { column, .. } | Predicate::In { column, .. } => column,
        }
    }

    fn params(&self) -> Vec<&Value> {
        match self {
            Predicate::Eq { value, .. } => vec![value],
            Predicate::In { values, .. } => values.iter().collect(),
        }
    }

    fn render<P: SchemaProvider + ?Sized>(&self, provider: &P, next: &mut usize) -> String {
        match self {
            Predicate::Eq { column, .. } => {
                let placeholder = provider.placeholder(*next);
                *next += 1;
                format!("{} = {}", provider.quote_identifier(column), placeholder)
            }
            // Empty membership matches nothing
            Predicate::In { values, .. } if values.is_empty() => "1 = 0".to_string(),
            Predicate::In { column, values } => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|_| {
                        let placeholder = provider.placeholder(*next);
                        *next += 1;
                        placeholder
                    })
                    .collect();
                format!("{} IN ({})", provider.quote_identifier(column), placeholders.join(", "))
            }
        }
    }
}

/// An insert returning the generated identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertStatement {
    pub table: String,
    /// Column names, in the same order as `values`
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl InsertStatement {
    /// Render the statement text
    pub fn render<P: SchemaProvider + ?Sized>(&self, provider: &P) -> String {
        let table = provider.quote_identifier(&self.table);
        let returning = provider.quote_identifier(crate::ID_COLUMN);

        if self.columns.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning);
        }

        let columns: Vec<String> = self.columns.iter().map(|c| provider.quote_identifier(c)).collect();
        let placeholders: Vec<String> = (1..=self.values.len()).map(|i| provider.placeholder(i)).collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            columns.join(", "),
            placeholders.join(", "),
            returning
        )
    }

    /// Bound parameters in placeholder order
    pub fn params(&self) -> Vec<&Value> {
        self.values.iter().collect()
    }
}

/// An update returning the identifiers of affected rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateStatement {
    pub table: String,
    /// `(column, new value)` pairs of the SET clause
    pub set: Vec<(String, Value)>,
    /// AND-joined WHERE predicates; never empty
    pub predicates: Vec<Predicate>,
}

impl UpdateStatement {
    /// Render the statement text
    pub fn render<P: SchemaProvider + ?Sized>(&self, provider: &P) -> String {
        let mut next = 1;

        let set: Vec<String> = self
            .set
            .iter()
            .map(|(column, _)| {
                let placeholder = provider.placeholder(next);
                next += 1;
                format!("{} = {}", provider.quote_identifier(column), placeholder)
            })
            .collect();

        let predicates: Vec<String> = self
            .predicates
            .iter()
            .map(|p| p.render(provider, &mut next))
            .collect();

        format!(
            "UPDATE {} SET {} WHERE {} RETURNING {}",
            provider.quote_identifier(&self.table),
            set.join(", "),
            predicates.join(" AND "),
            provider.quote_identifier(crate::ID_COLUMN)
        )
    }

    /// Bound parameters in placeholder order: SET values, then predicates
    pub fn params(&self) -> Vec<&Value> {
        self.set
            .iter()
            .map(|(_, value)| value)
            .chain(self.predicates.iter().flat_map(|p| p.params()))
            .collect()
    }

    pub fn set_columns(&self) -> Vec<&str> {
        self.set.iter().map(|(column, _)| column.as_str()).collect()
    }

    pub fn where_columns(&self) -> Vec<&str> {
        self.predicates.iter().map(|p| p.column()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Dialect;
    use serde_json::json;

    #[test]
    fn test_render_insert() {
        let stmt = InsertStatement {
            table: "user".to_string(),
            columns: vec!["name".to_string(), "email".to_string()],
            values: vec![json!("amirtha"), json!("a@b.c")],
        };

        assert_eq!(
            stmt.render(&Dialect::Postgres),
            r#"INSERT INTO "user" ("name", "email") VALUES ($1, $2) RETURNING "id""#
        );
        assert_eq!(
            stmt.render(&Dialect::MySql),
            "INSERT INTO `user` (`name`, `email`) VALUES (?, ?) RETURNING `id`"
        );
        assert_eq!(stmt.params(), vec![&json!("amirtha"), &json!("a@b.c")]);
    }

    #[test]
    fn test_render_empty_insert() {
        let stmt = InsertStatement {
            table: "audit".to_string(),
            columns: Vec::new(),
            values: Vec::new(),
        };
        assert_eq!(
            stmt.render(&Dialect::Sqlite),
            r#"INSERT INTO "audit" DEFAULT VALUES RETURNING "id""#
        );
    }

    #[test]
    fn test_render_update_with_membership() {
        let stmt = UpdateStatement {
            table: "address_details".to_string(),
            set: vec![("city".to_string(), json!("saun"))],
            predicates: vec![
                Predicate::for_value("user_id", json!([1, 2, 3])),
                Predicate::for_value("kind", json!("home")),
            ],
        };

        assert_eq!(
            stmt.render(&Dialect::Sqlite),
            r#"UPDATE "address_details" SET "city" = ?1 WHERE "user_id" IN (?2, ?3, ?4) AND "kind" = ?5 RETURNING "id""#
        );
        assert_eq!(
            stmt.params(),
            vec![&json!("saun"), &json!(1), &json!(2), &json!(3), &json!("home")]
        );
        assert_eq!(stmt.where_columns(), vec!["user_id", "kind"]);
    }

    #[test]
    fn test_render_empty_membership() {
        let stmt = UpdateStatement {
            table: "t".to_string(),
            set: vec![("a".to_string(), json!(1))],
            predicates: vec![Predicate::In { column: "b".to_string(), values: Vec::new() }],
        };
        assert_eq!(stmt.render(&Dialect::Postgres), r#"UPDATE "t" SET "a" = $1 WHERE 1 = 0 RETURNING "id""#);
        assert_eq!(stmt.params().len(), 1);
    }
}
