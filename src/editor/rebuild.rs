use super::{FlatSelection, MODULE_ACTIVATION_ACTION};
use crate::models::{FieldIndex, PermissionTree};
use crate::utils::{normalize_code, normalize_path};

pub(super) fn rebuild(fields: &FieldIndex, selection: &FlatSelection) -> PermissionTree {
    let mut tree = PermissionTree::new();

    for key in &selection.modules {
        let module = normalize_code(key);
        if module.is_empty() {
            tracing::debug!(key = %key, "empty module key dropped");
            continue;
        }
        activate(&mut tree, &module);
    }

    for key in &selection.actions {
        let (module, path) = match key.split_once('.') {
            Some((module, path)) => (normalize_code(module), normalize_path(path)),
            None => (normalize_code(key), String::new()),
        };
        if module.is_empty() {
            tracing::debug!(key = %key, "action key without module dropped");
            continue;
        }
        if path.is_empty() {
            activate(&mut tree, &module);
            continue;
        }
        tree.ensure_path(&module, &path).permitted = Some(true);
    }

    for column_id in &selection.fields {
        let Some(binding) = fields.binding(column_id) else {
            tracing::debug!(column = %column_id, "unknown field key dropped");
            continue;
        };
        let node = tree.ensure_path(&binding.module, &binding.action);
        let scopes = node.fields.entry(normalize_code(&binding.field)).or_default();
        if binding.scopes.is_empty() {
            scopes.insert("view".to_string(), true);
        }
        for scope in &binding.scopes {
            scopes.insert(scope.clone(), true);
        }
    }

    tree
}

fn activate(tree: &mut PermissionTree, module: &str) {
    tree.ensure_path(module, MODULE_ACTIVATION_ACTION).permitted = Some(true);
}
