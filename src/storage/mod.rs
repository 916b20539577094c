//! Storage Layer - executes built statements
//!
//! The orchestrator only talks to a [`Connection`]. Two implementations ship:
//! - [`SqliteConnection`]: runs statements against SQLite with bound parameters
//! - [`RecordingConnection`]: a dry-run connection that records statements and
//!   hands out synthetic identifiers

pub mod recording;
pub mod sqlite;

pub use recording::{RecordedStatement, RecordingConnection};
pub use sqlite::SqliteConnection;

use serde_json::Value;
use crate::Result;
use crate::statement::{InsertStatement, UpdateStatement};

/// Executes parameterized statements against a store.
///
/// Calls are synchronous; timeouts and cancellation belong to implementations.
pub trait Connection {
    /// Run an insert, returning the generated identifier
    fn execute_insert(&mut self, stmt: &InsertStatement) -> Result<Value>;

    /// Run an update, returning the identifiers of every affected row
    fn execute_update(&mut self, stmt: &UpdateStatement) -> Result<Vec<Value>>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn execute_insert(&mut self, stmt: &InsertStatement) -> Result<Value> {
        (**self).execute_insert(stmt)
    }

    fn execute_update(&mut self, stmt: &UpdateStatement) -> Result<Vec<Value>> {
        (**self).execute_update(stmt)
    }
}
