//! Variable registry - the runtime's declared variables
//!
//! The store only serves rows for variables the registry knows about, and
//! falls back to the declared default when no row exists.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A declared variable: its name, owning table and default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub table: String,
    pub default: Value,
}

impl VariableDef {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            default: default.into(),
        }
    }
}

/// Lookup surface the store consumes
pub trait VariableRegistry: Send + Sync {
    fn has(&self, name: &str, table: &str) -> bool;

    fn get(&self, name: &str, table: &str) -> Option<&VariableDef>;
}

/// In-memory registry keyed by `(name, table)`
#[derive(Debug, Default, Clone)]
pub struct StaticRegistry {
    vars: HashMap<(String, String), VariableDef>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable, replacing any previous declaration for the same `(name, table)`
    pub fn insert(&mut self, def: VariableDef) {
        self.vars.insert((def.name.clone(), def.table.clone()), def);
    }

    pub fn with(mut self, def: VariableDef) -> Self {
        self.insert(def);
        self
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<VariableDef> for StaticRegistry {
    fn from_iter<I: IntoIterator<Item = VariableDef>>(iter: I) -> Self {
        let mut registry = Self::new();
        for def in iter {
            registry.insert(def);
        }
        registry
    }
}

impl VariableRegistry for StaticRegistry {
    fn has(&self, name: &str, table: &str) -> bool {
        self.vars.contains_key(&(name.to_string(), table.to_string()))
    }

    fn get(&self, name: &str, table: &str) -> Option<&VariableDef> {
        self.vars.get(&(name.to_string(), table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_per_table() {
        let registry = StaticRegistry::new()
            .with(VariableDef::new("money", "main", 0i64))
            .with(VariableDef::new("money", "bank", 100i64));

        assert!(registry.has("money", "main"));
        assert!(!registry.has("money", "points"));
        assert_eq!(registry.get("money", "bank").unwrap().default.to_text(), "100");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_redeclare_replaces() {
        let registry: StaticRegistry = vec![
            VariableDef::new("level", "main", 1i64),
            VariableDef::new("level", "main", 5i64),
        ]
        .into_iter()
        .collect();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("level", "main").unwrap().default.to_text(), "5");
    }
}
