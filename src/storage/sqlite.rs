//! SQLite connection implementation

use std::path::Path;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, ToSql};
use serde_json::Value;
use crate::Result;
use crate::schema::Dialect;
use crate::statement::{InsertStatement, UpdateStatement};
use super::Connection;

/// SQLite-backed connection
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Run a schema script (one or more `;`-separated statements)
    pub fn apply_schema(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Underlying rusqlite connection
    pub fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    // ========== Transactions ==========

    /// Begin a transaction spanning one request
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Run `f` inside one transaction: commit on success, roll back on error.
    ///
    /// The error returned is always the one raised by `f`; a failed rollback
    /// is only logged.
    pub fn run_in_transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    tracing::warn!("Rollback failed after `{}`: {}", err, rollback_err);
                }
                Err(err)
            }
        }
    }
}

impl Connection for SqliteConnection {
    fn execute_insert(&mut self, stmt: &InsertStatement) -> Result<Value> {
        let sql = stmt.render(&Dialect::Sqlite);
        tracing::debug!("sqlite: {}", sql);

        let params = stmt.params().into_iter().map(SqlParam);
        let id = self
            .conn
            .query_row(&sql, params_from_iter(params), |row| row.get_ref(0).map(value_from_sql))?;
        Ok(id)
    }

    fn execute_update(&mut self, stmt: &UpdateStatement) -> Result<Vec<Value>> {
        let sql = stmt.render(&Dialect::Sqlite);
        tracing::debug!("sqlite: {}", sql);

        let params = stmt.params().into_iter().map(SqlParam);
        let mut prepared = self.conn.prepare(&sql)?;
        let ids = prepared
            .query_map(params_from_iter(params), |row| row.get_ref(0).map(value_from_sql))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

/// Binds a JSON scalar as an SQLite parameter
struct SqlParam<'a>(&'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self.0 {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Number(n) if n.is_u64() && n.as_i64().is_none() => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    format!("integer {} does not fit a signed 64-bit column", n).into(),
                ));
            }
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => ToSqlOutput::Owned(SqlValue::Integer(i)),
                (None, Some(f)) => ToSqlOutput::Owned(SqlValue::Real(f)),
                (None, None) => ToSqlOutput::Owned(SqlValue::Text(n.to_string())),
            },
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            // Builder only lets scalars through; anything else is stored as JSON text
            other => ToSqlOutput::Owned(SqlValue::Text(other.to_string())),
        };
        Ok(output)
    }
}

/// Convert a returned column into a JSON value
fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Predicate;
    use serde_json::json;

    const SCHEMA: &str = r#"
        CREATE TABLE user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT
        );
    "#;

    fn store() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.apply_schema(SCHEMA).unwrap();
        conn
    }

    fn insert_user(conn: &mut SqliteConnection, name: &str) -> Value {
        let stmt = InsertStatement {
            table: "user".to_string(),
            columns: vec!["name".to_string(), "email".to_string()],
            values: vec![json!(name), json!(format!("{name}@example.com"))],
        };
        conn.execute_insert(&stmt).unwrap()
    }

    #[test]
    fn test_insert_returns_generated_id() {
        let mut conn = store();
        assert_eq!(insert_user(&mut conn, "a"), json!(1));
        assert_eq!(insert_user(&mut conn, "b"), json!(2));
    }

    #[test]
    fn test_update_returns_affected_ids() {
        let mut conn = store();
        insert_user(&mut conn, "a");
        insert_user(&mut conn, "b");
        insert_user(&mut conn, "c");

        let stmt = UpdateStatement {
            table: "user".to_string(),
            set: vec![("email".to_string(), Value::Null)],
            predicates: vec![Predicate::for_value("id", json!([1, 3]))],
        };
        let mut ids = conn.execute_update(&stmt).unwrap();
        ids.sort_by_key(|v| v.as_i64());
        assert_eq!(ids, vec![json!(1), json!(3)]);

        let nulls: i64 = conn
            .connection()
            .query_row("SELECT COUNT(*) FROM user WHERE email IS NULL", [], |row| row.get(0))
            .unwrap();
        assert_eq!(nulls, 2);
    }

    #[test]
    fn test_text_id_matches_integer_column() {
        let mut conn = store();
        insert_user(&mut conn, "a");

        let stmt = UpdateStatement {
            table: "user".to_string(),
            set: vec![("name".to_string(), json!("renamed"))],
            predicates: vec![Predicate::for_value("id", json!("1"))],
        };
        assert_eq!(conn.execute_update(&stmt).unwrap(), vec![json!(1)]);
    }

    #[test]
    fn test_constraint_violation_is_error() {
        let mut conn = store();
        let stmt = InsertStatement {
            table: "user".to_string(),
            columns: vec!["email".to_string()],
            values: vec![json!("no-name@example.com")],
        };
        assert!(conn.execute_insert(&stmt).is_err());
    }

    #[test]
    fn test_rollback_discards_writes() {
        let mut conn = store();
        conn.begin_transaction().unwrap();
        insert_user(&mut conn, "a");
        conn.rollback().unwrap();

        let count: i64 = conn
            .connection()
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_unsigned_overflow_is_rejected() {
        let mut conn = store();
        let stmt = InsertStatement {
            table: "user".to_string(),
            columns: vec!["name".to_string(), "email".to_string()],
            values: vec![json!("big"), json!(u64::MAX)],
        };
        assert!(conn.execute_insert(&stmt).is_err());

        let count: i64 = conn
            .connection()
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let mut conn = store();
        let id = conn.run_in_transaction(|conn| Ok(insert_user(conn, "a"))).unwrap();
        assert_eq!(id, json!(1));

        let count: i64 = conn
            .connection()
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut conn = store();
        let err = conn
            .run_in_transaction(|conn| -> Result<()> {
                insert_user(conn, "a");
                Err(crate::Error::Connection("boom".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, crate::Error::Connection(ref m) if m == "boom"));

        let count: i64 = conn
            .connection()
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_failed_rollback_keeps_original_error() {
        let mut conn = store();
        let err = conn
            .run_in_transaction(|conn| -> Result<()> {
                conn.commit()?;
                Err(crate::Error::Connection("original".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, crate::Error::Connection(ref m) if m == "original"));
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("writes.db");
        {
            let mut conn = SqliteConnection::open(&path).unwrap();
            conn.apply_schema(SCHEMA).unwrap();
            insert_user(&mut conn, "a");
        }
        let conn = SqliteConnection::open(&path).unwrap();
        let count: i64 = conn
            .connection()
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
