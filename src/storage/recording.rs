//! Dry-run connection that records statements instead of executing them

use std::collections::VecDeque;
use serde::Serialize;
use serde_json::Value;
use crate::{Error, Result};
use crate::statement::{InsertStatement, UpdateStatement};
use super::Connection;

/// A statement seen by a [`RecordingConnection`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordedStatement {
    Insert(InsertStatement),
    Update(UpdateStatement),
}

impl RecordedStatement {
    pub fn table(&self) -> &str {
        match self {
            RecordedStatement::Insert(stmt) => &stmt.table,
            RecordedStatement::Update(stmt) => &stmt.table,
        }
    }
}

/// Connection that executes nothing.
///
/// Inserts get sequential identifiers. Updates return the next scripted id
/// list, or a single fresh identifier when nothing is scripted.
#[derive(Debug)]
pub struct RecordingConnection {
    next_id: i64,
    update_results: VecDeque<Vec<Value>>,
    pending_failure: Option<String>,
    executed: Vec<RecordedStatement>,
}

impl Default for RecordingConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Hand out generated identifiers starting at `first_id`
    pub fn starting_at(first_id: i64) -> Self {
        Self {
            next_id: first_id,
            update_results: VecDeque::new(),
            pending_failure: None,
            executed: Vec::new(),
        }
    }

    /// Script the affected ids returned by the next unscripted update
    pub fn script_update(&mut self, ids: Vec<Value>) -> &mut Self {
        self.update_results.push_back(ids);
        self
    }

    /// Make the next statement fail with `message`
    pub fn fail_next(&mut self, message: impl Into<String>) -> &mut Self {
        self.pending_failure = Some(message.into());
        self
    }

    /// Statements executed so far, in order
    pub fn executed(&self) -> &[RecordedStatement] {
        &self.executed
    }

    fn fresh_id(&mut self) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        Value::from(id)
    }

    fn check_failure(&mut self) -> Result<()> {
        match self.pending_failure.take() {
            Some(message) => Err(Error::Connection(message)),
            None => Ok(()),
        }
    }
}

impl Connection for RecordingConnection {
    fn execute_insert(&mut self, stmt: &InsertStatement) -> Result<Value> {
        self.check_failure()?;
        self.executed.push(RecordedStatement::Insert(stmt.clone()));
        Ok(self.fresh_id())
    }

    fn execute_update(&mut self, stmt: &UpdateStatement) -> Result<Vec<Value>> {
        self.check_failure()?;
        self.executed.push(RecordedStatement::Update(stmt.clone()));
        match self.update_results.pop_front() {
            Some(ids) => Ok(ids),
            None => Ok(vec![self.fresh_id()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Predicate;
    use serde_json::json;

    fn insert(table: &str) -> InsertStatement {
        InsertStatement {
            table: table.to_string(),
            columns: vec!["name".to_string()],
            values: vec![json!("x")],
        }
    }

    fn update(table: &str) -> UpdateStatement {
        UpdateStatement {
            table: table.to_string(),
            set: vec![("name".to_string(), json!("y"))],
            predicates: vec![Predicate::for_value("id", json!(1))],
        }
    }

    #[test]
    fn test_sequential_insert_ids() {
        let mut conn = RecordingConnection::starting_at(40);
        assert_eq!(conn.execute_insert(&insert("a")).unwrap(), json!(40));
        assert_eq!(conn.execute_insert(&insert("b")).unwrap(), json!(41));
        assert_eq!(conn.executed().len(), 2);
        assert_eq!(conn.executed()[1].table(), "b");
    }

    #[test]
    fn test_scripted_update() {
        let mut conn = RecordingConnection::new();
        conn.script_update(vec![json!(1), json!(2)]);

        assert_eq!(conn.execute_update(&update("a")).unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(conn.execute_update(&update("a")).unwrap(), vec![json!(1)]);
    }

    #[test]
    fn test_fail_next() {
        let mut conn = RecordingConnection::new();
        conn.fail_next("unique constraint violated");

        assert!(matches!(conn.execute_insert(&insert("a")), Err(Error::Connection(_))));
        assert!(conn.executed().is_empty());
        assert!(conn.execute_insert(&insert("a")).is_ok());
    }
}
