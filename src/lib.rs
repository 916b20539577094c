//! # Refwrite - Multi-table write orchestration
//!
//! Accepts one request describing writes to several related tables and
//! turns it into parameterized INSERT/UPDATE statements, substituting
//! symbolic references (`$user.id`) with identifiers produced earlier in
//! the same request.
//!
//! Refwrite provides:
//! - An ordered request model parsed from a JSON envelope
//! - A per-request identifier registry
//! - Reference resolution against the registry and identity predicates
//! - Statement building with dialect-aware identifier quoting
//! - An orchestrator driving a pluggable `Connection` (SQLite or dry-run)

pub mod reference;
pub mod request;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod statement;
pub mod storage;
pub mod orchestrator;
pub mod output;
pub mod config;
pub mod ui;


// Re-exports for convenient access
pub use reference::Reference;
pub use request::{EntityWrite, OperationKind, WriteRequest};
pub use registry::IdRegistry;
pub use resolver::ReferenceResolver;
pub use schema::{Dialect, SchemaProvider};
pub use statement::{InsertStatement, Predicate, StatementBuilder, UpdateStatement};
pub use storage::{Connection, RecordingConnection, SqliteConnection};
pub use orchestrator::{EntityState, WriteOrchestrator, WriteReport};

/// Column every entity's generated identifier is read from
pub const ID_COLUMN: &str = "id";

/// Result type alias for Refwrite operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Refwrite operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed entity `{entity}`: {reason}")]
    MalformedEntity { entity: String, reason: String },

    #[error("Unresolved reference in `{entity}.{column}`: no value registered for `{key}`")]
    UnresolvedReference {
        entity: String,
        column: String,
        key: String,
    },

    #[error("No update target for `{entity}`: no id, identity predicate or resolvable reference")]
    NoUpdateTarget { entity: String },

    #[error("Execution failed for `{entity}`: {source}")]
    Execution {
        entity: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown dialect: {0}")]
    InvalidDialect(String),

    #[error("Unknown operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    pub(crate) fn malformed(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedEntity {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Name of the entity the error is attributed to, if any
    pub fn entity(&self) -> Option<&str> {
        match self {
            Error::MalformedEntity { entity, .. }
            | Error::UnresolvedReference { entity, .. }
            | Error::NoUpdateTarget { entity }
            | Error::Execution { entity, .. } => Some(entity.as_str()),
            _ => None,
        }
    }
}
