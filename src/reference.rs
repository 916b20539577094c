//! Reference tokens - symbolic pointers to values produced earlier in a request
//!
//! Format: `$<entity>.<column>`
//!
//! Examples:
//! - `$user.id` - the identifier generated for entity `user`
//! - `$address_details.id` - the identifier(s) produced for `address_details`
//!
//! Only a single level is supported: `$a.b.c` is rejected.

use crate::{Error, Result};
use std::fmt;

/// Prefix marking a string as a reference token rather than a literal
pub const TOKEN_PREFIX: char = '$';

/// A parsed `$entity.column` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Entity whose result is referenced
    pub entity: String,
    /// Column of that entity's result
    pub column: String,
}

impl Reference {
    /// Create a new Reference
    pub fn new(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            column: column.into(),
        }
    }

    /// Whether `token` is a reference token (as opposed to a literal)
    pub fn is_token(token: &str) -> bool {
        token.starts_with(TOKEN_PREFIX)
    }

    /// Parse a `$entity.column` token.
    ///
    /// The error carries no entity context; callers attach it with
    /// [`Reference::parse_for`].
    pub fn parse(token: &str) -> std::result::Result<Self, String> {
        let body = token
            .strip_prefix(TOKEN_PREFIX)
            .ok_or_else(|| format!("reference `{}` must start with `{}`", token, TOKEN_PREFIX))?;

        let (entity, column) = body
            .split_once('.')
            .ok_or_else(|| format!("reference `{}` must have the form $entity.column", token))?;

        if entity.is_empty() || column.is_empty() {
            return Err(format!("reference `{}` has an empty entity or column", token));
        }
        if column.contains('.') {
            return Err(format!("reference `{}` is nested; only $entity.column is supported", token));
        }

        Ok(Self::new(entity, column))
    }

    /// Parse a token found in `entity.column`, mapping failures to `MalformedEntity`
    pub fn parse_for(token: &str, entity: &str, column: &str) -> Result<Self> {
        Self::parse(token).map_err(|reason| Error::malformed(entity, format!("column `{}`: {}", column, reason)))
    }

    /// Key this reference is registered under (`entity.column`)
    pub fn registry_key(&self) -> String {
        format!("{}.{}", self.entity, self.column)
    }

    /// Whether this reference targets the singular identifier of `entity`
    pub fn targets_id_of(&self, entity: &str) -> bool {
        self.entity == entity && self.column == crate::ID_COLUMN
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}", TOKEN_PREFIX, self.entity, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        let reference = Reference::parse("$user.id").unwrap();
        assert_eq!(reference.entity, "user");
        assert_eq!(reference.column, "id");
        assert_eq!(reference.registry_key(), "user.id");
        assert_eq!(reference.to_string(), "$user.id");
    }

    #[test]
    fn test_is_token() {
        assert!(Reference::is_token("$user.id"));
        assert!(!Reference::is_token("user.id"));
        assert!(!Reference::is_token("42"));
    }

    #[test]
    fn test_invalid_references() {
        assert!(Reference::parse("user.id").is_err());
        assert!(Reference::parse("$user").is_err());
        assert!(Reference::parse("$.id").is_err());
        assert!(Reference::parse("$user.").is_err());
        assert!(Reference::parse("$a.b.c").is_err());
    }

    #[test]
    fn test_parse_for_attaches_entity() {
        let err = Reference::parse_for("$user", "profile", "user_id").unwrap_err();
        match err {
            Error::MalformedEntity { entity, reason } => {
                assert_eq!(entity, "profile");
                assert!(reason.contains("user_id"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_targets_id_of() {
        let reference = Reference::parse("$user.id").unwrap();
        assert!(reference.targets_id_of("user"));
        assert!(!reference.targets_id_of("profile"));
        assert!(!Reference::parse("$user.email").unwrap().targets_id_of("user"));
    }
}
