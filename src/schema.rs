//! Schema provider - identifier quoting and placeholder rules per dialect

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Formatting rules for interpolating identifiers into statement text.
///
/// Implementations must be pure: no I/O, same input gives the same output.
pub trait SchemaProvider {
    /// Quote a table or column name
    fn quote_identifier(&self, name: &str) -> String;

    /// Positional placeholder for the 1-based parameter `index`
    fn placeholder(&self, index: usize) -> String {
        let _ = index;
        "?".to_string()
    }
}

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    #[default]
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    pub fn all() -> &'static [Dialect] {
        &[Dialect::Postgres, Dialect::MySql, Dialect::Sqlite]
    }

    fn quote_char(&self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Postgres | Dialect::Sqlite => '"',
        }
    }
}

impl SchemaProvider for Dialect {
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.quote_char();
        let escaped = name.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::MySql => "?".to_string(),
            Dialect::Sqlite => format!("?{}", index),
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            _ => Err(Error::InvalidDialect(s.to_string())),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
