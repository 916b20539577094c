//! Reference Resolver
//!
//! Substitutes `$entity.column` tokens with literal values before a statement
//! is built.
//!
//! Resolution order:
//! 1. Identity predicate (updates only): an `identityVal` entry keyed by the
//!    full `entity.column` reference key, or by the referencing column itself,
//!    pins the value explicitly
//! 2. Registry: the value recorded for a previously processed entity
//!
//! Tokens without the `$` prefix are literals and are left untouched.

use serde_json::Value;
use crate::{Error, Result};
use crate::reference::Reference;
use crate::registry::IdRegistry;
use crate::request::{EntityWrite, OperationKind};

/// Where a reference column's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Pinned by the entity's own identity predicate
    IdentityPredicate,
    /// Recorded by an earlier entity in the request
    Registry,
    /// Not a token; the configured string is used as-is
    Literal,
}

/// Outcome for one `(column, token)` reference key
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub column: String,
    /// Parsed reference, `None` for literals
    pub reference: Option<Reference>,
    pub value: Value,
    pub source: ResolutionSource,
}

impl Resolution {
    /// Whether the resolved value is a sequence (multi-row fan-out)
    pub fn is_sequence(&self) -> bool {
        self.value.is_array()
    }
}

/// Resolves an entity's reference keys against the request's registry
pub struct ReferenceResolver<'a> {
    registry: &'a IdRegistry,
}

impl<'a> ReferenceResolver<'a> {
    /// Create a new resolver
    pub fn new(registry: &'a IdRegistry) -> Self {
        Self { registry }
    }

    /// Resolve every reference key of `entity`, writing resolved values into
    /// its column values.
    ///
    /// Stops at the first reference that cannot be resolved.
    pub fn resolve(&self, entity: &mut EntityWrite, kind: OperationKind) -> Result<Vec<Resolution>> {
        let mut resolutions = Vec::with_capacity(entity.reference_keys.len());

        for (column, token) in &entity.reference_keys {
            if !Reference::is_token(token) {
                resolutions.push(Resolution {
                    column: column.clone(),
                    reference: None,
                    value: Value::String(token.clone()),
                    source: ResolutionSource::Literal,
                });
                continue;
            }

            let reference = Reference::parse_for(token, &entity.name, column)?;
            let key = reference.registry_key();

            let pinned = match kind {
                OperationKind::Update => entity
                    .identity_predicate
                    .get(&key)
                    .or_else(|| entity.identity_predicate.get(column)),
                OperationKind::Insert => None,
            };

            let (value, source) = if let Some(value) = pinned {
                (value.clone(), ResolutionSource::IdentityPredicate)
            } else if let Some(value) = self.registry.lookup(&key) {
                (value.clone(), ResolutionSource::Registry)
            } else {
                return Err(Error::UnresolvedReference {
                    entity: entity.name.clone(),
                    column: column.clone(),
                    key,
                });
            };

            tracing::debug!("Resolved {}.{} = {} via {:?}", entity.name, column, value, source);
            resolutions.push(Resolution {
                column: column.clone(),
                reference: Some(reference),
                value,
                source,
            });
        }

        for resolution in &resolutions {
            if resolution.source != ResolutionSource::Literal {
                entity
                    .column_values
                    .insert(resolution.column.clone(), resolution.value.clone());
            }
        }

        Ok(resolutions)
    }
}
