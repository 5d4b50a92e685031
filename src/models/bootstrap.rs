use std::collections::HashMap;

use serde::Serialize;

use super::column::{ColumnModule, ColumnTable};
use super::feature::FeatureModule;
use super::menu::MenuNode;
use crate::utils::{normalize_code, normalize_path};

/// Canonical model built from one bootstrap payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootstrapData {
    pub menu: Vec<MenuNode>,
    pub features: HashMap<String, FeatureModule>,
    pub columns: HashMap<String, ColumnModule>,
    #[serde(skip)]
    pub fields: FieldIndex,
}

impl BootstrapData {
    pub fn is_empty(&self) -> bool {
        self.menu.is_empty() && self.features.is_empty() && self.columns.is_empty()
    }

    pub fn feature_module(&self, module: &str) -> Option<&FeatureModule> {
        self.features.get(&normalize_code(module))
    }

    pub fn column_table(&self, module: &str, table: &str) -> Option<&ColumnTable> {
        self.columns.get(&normalize_code(module))?.table(table)
    }
}

/// Where a column lives in a permission tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub module: String,
    pub action: String,
    pub field: String,
    pub scopes: Vec<String>,
}

/// Bidirectional index between `module:action-path:field` composite keys
/// and concrete column identifiers.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    by_path: HashMap<String, String>,
    by_id: HashMap<String, FieldBinding>,
}

impl FieldIndex {
    pub fn composite_key(module: &str, action: &str, field: &str) -> String {
        format!(
            "{}:{}:{}",
            normalize_code(module),
            normalize_path(action),
            normalize_code(field)
        )
    }

    /// Registers a column. The first column bound to a composite key owns
    /// it; later ones are left out of both directions so the mapping stays
    /// one-to-one.
    pub fn register(&mut self, column_id: &str, binding: FieldBinding) -> bool {
        let key = Self::composite_key(&binding.module, &binding.action, &binding.field);
        if self.by_path.contains_key(&key) || self.by_id.contains_key(column_id) {
            return false;
        }
        self.by_path.insert(key, column_id.to_string());
        self.by_id.insert(column_id.to_string(), binding);
        true
    }

    pub fn resolve(&self, module: &str, action: &str, field: &str) -> Option<&str> {
        self.by_path
            .get(&Self::composite_key(module, action, field))
            .map(String::as_str)
    }

    pub fn binding(&self, column_id: &str) -> Option<&FieldBinding> {
        self.by_id.get(column_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(field: &str) -> FieldBinding {
        FieldBinding {
            module: "clientes".to_string(),
            action: "listar".to_string(),
            field: field.to_string(),
            scopes: vec!["view".to_string()],
        }
    }

    #[test]
    fn resolves_both_directions() {
        let mut index = FieldIndex::default();
        assert!(index.register("42", binding("cpf")));

        assert_eq!(index.resolve("Clientes", "Listar", "CPF"), Some("42"));
        assert_eq!(index.binding("42").unwrap().field, "cpf");
    }

    #[test]
    fn first_registration_owns_the_composite_key() {
        let mut index = FieldIndex::default();
        assert!(index.register("42", binding("cpf")));
        assert!(!index.register("43", binding("cpf")));

        assert_eq!(index.resolve("clientes", "listar", "cpf"), Some("42"));
        assert!(index.binding("43").is_none());
        assert_eq!(index.len(), 1);
    }
}
