//! Write Orchestrator
//!
//! Drives every entity of a request, strictly in the order supplied:
//!
//! `Pending → Resolving → Building → Executing → Registered`
//!
//! `Failed` is terminal and aborts the remaining entities. An entity's result
//! becomes visible to later entities only once it reaches `Registered`.
//! Nothing is reordered: an entity referencing one that comes later fails
//! with `UnresolvedReference`.

use serde::Serialize;
use serde_json::Value;
use crate::{Error, Result};
use crate::reference::Reference;
use crate::registry::IdRegistry;
use crate::request::{EntityWrite, OperationKind, WriteRequest};
use crate::resolver::ReferenceResolver;
use crate::schema::SchemaProvider;
use crate::statement::StatementBuilder;
use crate::storage::Connection;

/// Lifecycle of one entity within a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    Pending,
    Resolving,
    Building,
    Executing,
    Registered,
    Failed,
}

/// What happened to one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOutcome {
    pub entity: String,
    pub state: EntityState,
    /// Statement text as rendered by the orchestrator's schema provider
    pub sql: String,
    /// Bound parameters, in placeholder order
    pub params: Vec<Value>,
    /// Identifiers produced (generated id, or affected row ids)
    pub ids: Vec<Value>,
}

/// Result of a successful request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteReport {
    pub operation: OperationKind,
    pub entities: Vec<EntityOutcome>,
    pub registry: IdRegistry,
}

impl WriteReport {
    pub fn outcome(&self, entity: &str) -> Option<&EntityOutcome> {
        self.entities.iter().find(|o| o.entity == entity)
    }
}

impl std::fmt::Display for WriteReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Write Report ({}):", self.operation)?;
        for outcome in &self.entities {
            writeln!(f, "  {} [{:?}]", outcome.entity, outcome.state)?;
            writeln!(f, "    SQL: {}", outcome.sql)?;
            writeln!(f, "    Params: {}", Value::Array(outcome.params.clone()))?;
            writeln!(f, "    Ids: {}", Value::Array(outcome.ids.clone()))?;
        }
        write!(f, "{}", self.registry)
    }
}

/// Runs requests against a connection, one entity at a time.
pub struct WriteOrchestrator<C, P> {
    connection: C,
    provider: P,
    builder: StatementBuilder,
}

impl<C: Connection, P: SchemaProvider> WriteOrchestrator<C, P> {
    /// Create a new orchestrator
    pub fn new(connection: C, provider: P) -> Self {
        Self {
            connection,
            provider,
            builder: StatementBuilder::new(),
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Process every entity of `request`.
    ///
    /// The registry lives only for this call. On error, entities already
    /// registered stay written; undoing them is the caller's transaction.
    pub fn run(&mut self, kind: OperationKind, request: WriteRequest) -> Result<WriteReport> {
        let mut registry = IdRegistry::new();
        let mut entities = request.into_entities();
        let mut outcomes = Vec::with_capacity(entities.len());

        tracing::info!("Processing {} request with {} entities", kind, entities.len());

        for index in 0..entities.len() {
            let (current, pending) = entities[index..].split_at_mut(1);
            let entity = &mut current[0];

            match self.process(kind, entity, &mut registry) {
                Ok(outcome) => {
                    if registry.is_plural(&entity.name) {
                        fan_out(&entity.name, &registry, pending);
                    }
                    outcomes.push(outcome);
                }
                Err(err) => {
                    tracing::debug!("{}: -> {:?}", entity.name, EntityState::Failed);
                    tracing::warn!("Aborting request at `{}`: {}", entity.name, err);
                    return Err(err);
                }
            }
        }

        Ok(WriteReport {
            operation: kind,
            entities: outcomes,
            registry,
        })
    }

    fn process(&mut self, kind: OperationKind, entity: &mut EntityWrite, registry: &mut IdRegistry) -> Result<EntityOutcome> {
        transition(entity, EntityState::Resolving);
        let resolutions = ReferenceResolver::new(registry).resolve(entity, kind)?;

        transition(entity, EntityState::Building);
        let (sql, params, ids) = match kind {
            OperationKind::Insert => {
                let stmt = self.builder.build_insert(entity)?;
                let sql = stmt.render(&self.provider);

                transition(entity, EntityState::Executing);
                tracing::debug!("{}: {}", entity.name, sql);
                let id = self
                    .connection
                    .execute_insert(&stmt)
                    .map_err(|e| execution_error(entity, e))?;

                registry.record_id(&entity.name, id.clone());
                (sql, stmt.values, vec![id])
            }
            OperationKind::Update => {
                let stmt = self.builder.build_update(entity, &resolutions)?;
                let sql = stmt.render(&self.provider);
                let params: Vec<Value> = stmt.params().into_iter().cloned().collect();

                transition(entity, EntityState::Executing);
                tracing::debug!("{}: {}", entity.name, sql);
                let ids = self
                    .connection
                    .execute_update(&stmt)
                    .map_err(|e| execution_error(entity, e))?;

                if !registry.record_affected(&entity.name, ids.clone()) {
                    tracing::warn!("Update of `{}` affected no rows; nothing registered", entity.name);
                }
                (sql, params, ids)
            }
        };

        transition(entity, EntityState::Registered);
        tracing::info!("{} `{}`: {} id(s)", kind, entity.name, ids.len());

        Ok(EntityOutcome {
            entity: entity.name.clone(),
            state: EntityState::Registered,
            sql,
            params,
            ids,
        })
    }
}

fn transition(entity: &EntityWrite, state: EntityState) {
    tracing::debug!("{}: -> {:?}", entity.name, state);
}

fn execution_error(entity: &EntityWrite, source: Error) -> Error {
    Error::Execution {
        entity: entity.name.clone(),
        source: Box::new(source),
    }
}

/// Give every pending column referencing `$entity.id` the full id sequence
fn fan_out(entity: &str, registry: &IdRegistry, pending: &mut [EntityWrite]) {
    let Some(ids) = registry.lookup(&IdRegistry::ids_key(entity)) else {
        return;
    };

    for dependent in pending.iter_mut() {
        for (column, token) in &dependent.reference_keys {
            let targets = Reference::parse(token).is_ok_and(|r| r.targets_id_of(entity));
            if targets {
                tracing::debug!("Fan-out {} -> {}.{}", entity, dependent.name, column);
                dependent.column_values.insert(column.clone(), ids.clone());
            }
        }
    }
}
