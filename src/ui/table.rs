use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};
use crate::orchestrator::EntityOutcome;
use crate::registry::IdRegistry;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Params")]
    params: String,
    #[tabled(rename = "Ids")]
    ids: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, key: &str, value: &str) {
        self.rows.push(TableRow {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn registry_table(registry: &IdRegistry) -> String {
    let mut builder = TableBuilder::new();
    for (key, value) in registry.iter() {
        builder.add_row(key, &value.to_string());
    }
    builder.build()
}

pub fn outcome_table(outcomes: &[EntityOutcome]) -> String {
    if outcomes.is_empty() {
        return String::new();
    }

    let rows: Vec<OutcomeRow> = outcomes
        .iter()
        .map(|o| OutcomeRow {
            entity: o.entity.clone(),
            params: Value::Array(o.params.clone()).to_string(),
            ids: Value::Array(o.ids.clone()).to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_registry_renders_nothing() {
        assert!(registry_table(&IdRegistry::new()).is_empty());
    }

    #[test]
    fn test_registry_table_lists_keys() {
        let mut registry = IdRegistry::new();
        registry.record_id("user", json!(42));
        let table = registry_table(&registry);
        assert!(table.contains("user.id"));
        assert!(table.contains("42"));
    }
}
