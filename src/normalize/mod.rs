//! Loosely shaped bootstrap JSON in, canonical model out.

pub mod columns;
pub mod features;
pub mod menu;
pub mod value;

use serde_json::{Map, Value};

use crate::models::BootstrapData;
use value::first_value;

pub use columns::normalize_columns;
pub use features::normalize_features;
pub use menu::normalize_menu;

const MENU_KEYS: &[&str] = &["menu", "menus", "navigation", "navegacao", "menuItems"];
const FEATURE_KEYS: &[&str] = &["features", "funcionalidades", "featureFlags", "permissions"];
const COLUMN_KEYS: &[&str] = &["columns", "colunas", "fields"];
const WRAPPER_KEYS: &[&str] = &["data", "bootstrap"];

/// Single entry point from a bootstrap payload to [`BootstrapData`].
pub fn normalize_bootstrap(payload: &Value) -> BootstrapData {
    let Some(root) = unwrap_payload(payload) else {
        return BootstrapData::default();
    };

    let menu = first_value(root, MENU_KEYS)
        .map(normalize_menu)
        .unwrap_or_default();
    let features = first_value(root, FEATURE_KEYS)
        .map(normalize_features)
        .unwrap_or_default();
    let (columns, fields) = first_value(root, COLUMN_KEYS)
        .map(normalize_columns)
        .unwrap_or_default();

    tracing::debug!(
        menu = menu.len(),
        feature_modules = features.len(),
        column_modules = columns.len(),
        fields = fields.len(),
        "bootstrap payload normalized"
    );

    BootstrapData {
        menu,
        features,
        columns,
        fields,
    }
}

/// The object holding the sections, looking through one `data`/`bootstrap`
/// wrapper when the top level carries none of them.
fn unwrap_payload(payload: &Value) -> Option<&Map<String, Value>> {
    let root = payload.as_object()?;
    let has_sections = [MENU_KEYS, FEATURE_KEYS, COLUMN_KEYS]
        .iter()
        .any(|keys| first_value(root, keys).is_some());
    if has_sections {
        return Some(root);
    }
    first_value(root, WRAPPER_KEYS)
        .and_then(Value::as_object)
        .or(Some(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapped_payload_is_unwrapped() {
        let data = normalize_bootstrap(&json!({"data": {"menu": [{"code": "a"}]}}));
        assert_eq!(data.menu.len(), 1);
    }

    #[test]
    fn empty_or_absent_payload_is_empty_model() {
        assert!(normalize_bootstrap(&Value::Null).is_empty());
        assert!(normalize_bootstrap(&json!({})).is_empty());
        assert!(normalize_bootstrap(&json!("garbage")).is_empty());
        assert!(normalize_bootstrap(&json!({"menu": 3, "features": true, "columns": []})).is_empty());
    }
}
