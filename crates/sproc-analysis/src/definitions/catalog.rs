//! Case-insensitive procedure catalog.

use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};

use super::types::ProcedureDefinition;

/// Procedure definitions keyed by lowercase name, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct DefinitionCatalog {
    definitions: Vec<ProcedureDefinition>,
    index: FxHashMap<String, usize>,
}

impl DefinitionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, replacing and returning any definition with the
    /// same name. The replacement keeps the original position.
    pub fn insert(&mut self, definition: ProcedureDefinition) -> Option<ProcedureDefinition> {
        let key = definition.name.to_lowercase();
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.definitions[slot], definition)),
            None => {
                self.index.insert(key, self.definitions.len());
                self.definitions.push(definition);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProcedureDefinition> {
        self.index
            .get(&name.to_lowercase())
            .map(|&slot| &self.definitions[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcedureDefinition> {
        self.definitions.iter()
    }

    pub fn as_slice(&self) -> &[ProcedureDefinition] {
        &self.definitions
    }
}

impl FromIterator<ProcedureDefinition> for DefinitionCatalog {
    fn from_iter<I: IntoIterator<Item = ProcedureDefinition>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for definition in iter {
            catalog.insert(definition);
        }
        catalog
    }
}

impl Serialize for DefinitionCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.definitions.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, file: &str) -> ProcedureDefinition {
        ProcedureDefinition {
            name: name.to_string(),
            parameters: Vec::new(),
            source_file: file.to_string(),
        }
    }

    #[test]
    fn lookup_ignores_case() {
        let catalog: DefinitionCatalog = [def("inv_inventory_Get_All", "a.sql")].into_iter().collect();
        assert!(catalog.contains("INV_INVENTORY_GET_ALL"));
        assert!(!catalog.contains("inv_inventory_Get"));
    }

    #[test]
    fn later_definition_replaces_earlier() {
        let mut catalog = DefinitionCatalog::new();
        assert!(catalog.insert(def("usr_users_Get", "a.sql")).is_none());
        let previous = catalog.insert(def("USR_USERS_GET", "b.sql")).unwrap();
        assert_eq!(previous.source_file, "a.sql");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("usr_users_get").unwrap().source_file, "b.sql");
    }
}
