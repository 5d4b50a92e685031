use std::sync::Arc;

use crate::models::{BootstrapData, Column, Feature, MenuNode};

/// Read-only lookups over one bootstrap snapshot.
///
/// Every lookup is total: a missing snapshot, module, table or code yields
/// an empty list, `None` or `false`.
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    data: Option<Arc<BootstrapData>>,
}

impl QueryEngine {
    pub fn new(data: Option<Arc<BootstrapData>>) -> Self {
        Self { data }
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&Arc<BootstrapData>> {
        self.data.as_ref()
    }

    /// Owned copy of the menu tree.
    pub fn menu(&self) -> Vec<MenuNode> {
        self.data
            .as_ref()
            .map(|data| data.menu.clone())
            .unwrap_or_default()
    }

    /// Each feature once, however many aliases point at it.
    pub fn features_for_module(&self, module: &str) -> Vec<&Feature> {
        self.data
            .as_deref()
            .and_then(|data| data.feature_module(module))
            .map(|m| m.features().iter().collect())
            .unwrap_or_default()
    }

    pub fn find_feature(&self, module: &str, code: &str) -> Option<&Feature> {
        self.data.as_deref()?.feature_module(module)?.get(code)
    }

    pub fn is_feature_enabled(&self, module: &str, code: &str, scope: Option<&str>) -> bool {
        match self.find_feature(module, code) {
            Some(feature) => feature.is_enabled(scope),
            None => {
                tracing::debug!(module, code, "feature not found, treating as disabled");
                false
            }
        }
    }

    pub fn columns(&self, module: &str, table: &str) -> Vec<Column> {
        self.data
            .as_deref()
            .and_then(|data| data.column_table(module, table))
            .map(|t| t.columns().to_vec())
            .unwrap_or_default()
    }

    pub fn column_ref(&self, module: &str, table: &str, code: &str) -> Option<&Column> {
        self.data.as_deref()?.column_table(module, table)?.get(code)
    }

    pub fn column(&self, module: &str, table: &str, code: &str) -> Option<Column> {
        self.column_ref(module, table, code).cloned()
    }

    /// A column shows when it is visible, viewable and its linked feature
    /// (if any) is enabled in the same module.
    pub fn is_column_visible(&self, module: &str, table: &str, code: &str) -> bool {
        let Some(column) = self.column_ref(module, table, code) else {
            return false;
        };
        if !column.is_visible() || !column.can_view {
            return false;
        }
        match &column.feature_code {
            Some(feature) => self.is_feature_enabled(module, feature, Some("view")),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_bootstrap;
    use serde_json::json;

    fn engine() -> QueryEngine {
        let data = normalize_bootstrap(&json!({
            "features": {
                "clientes": {
                    "editar": {"permitido": true, "aliases": ["edit"], "scopes": {"view": true, "delete": false}},
                    "exportar": {"permitido": false}
                }
            },
            "columns": {
                "clientes": {
                    "lista": [
                        {"code": "cpf", "mask": "***"},
                        {"code": "saldo", "feature": "exportar"},
                        {"code": "nome", "visible": false}
                    ]
                }
            }
        }));
        QueryEngine::new(Some(Arc::new(data)))
    }

    #[test]
    fn empty_engine_is_total() {
        let engine = QueryEngine::default();
        assert!(!engine.is_loaded());
        assert!(engine.menu().is_empty());
        assert!(engine.features_for_module("clientes").is_empty());
        assert!(!engine.is_feature_enabled("clientes", "editar", None));
        assert!(engine.column("clientes", "lista", "cpf").is_none());
    }

    #[test]
    fn alias_and_primary_resolve_to_the_same_feature() {
        let engine = engine();
        let primary = engine.find_feature("clientes", "editar").unwrap();
        let alias = engine.find_feature("clientes", "edit").unwrap();
        assert!(std::ptr::eq(primary, alias));
        assert_eq!(engine.features_for_module("clientes").len(), 2);
    }

    #[test]
    fn scope_overrides_fall_back_to_top_level_flag() {
        let engine = engine();
        assert!(engine.is_feature_enabled("clientes", "editar", None));
        assert!(engine.is_feature_enabled("clientes", "editar", Some("view")));
        assert!(!engine.is_feature_enabled("clientes", "editar", Some("delete")));
        assert!(engine.is_feature_enabled("clientes", "editar", Some("approve")));
        assert!(!engine.is_feature_enabled("clientes", "exportar", Some("view")));
        assert!(!engine.is_feature_enabled("clientes", "missing", None));
    }

    #[test]
    fn column_visibility_follows_linked_feature() {
        let engine = engine();
        assert!(engine.is_column_visible("clientes", "lista", "cpf"));
        assert!(!engine.is_column_visible("clientes", "lista", "saldo"));
        assert!(!engine.is_column_visible("clientes", "lista", "nome"));
        assert_eq!(engine.column("clientes", "lista", "cpf").unwrap().mask.as_deref(), Some("***"));
    }
}
