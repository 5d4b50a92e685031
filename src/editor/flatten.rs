use super::{is_activation_action, FlatSelection};
use crate::models::{ActionNode, FieldIndex, PermissionTree};

pub(super) fn flatten(fields: &FieldIndex, tree: &PermissionTree) -> FlatSelection {
    let mut selection = FlatSelection::new();
    for (module, root) in tree.modules() {
        if root.is_permitted() {
            selection.modules.insert(module.to_string());
        }
        collect_fields(fields, module, "", root, &mut selection);
        for (name, child) in &root.children {
            if child.is_permitted() && is_activation_action(name) {
                selection.modules.insert(module.to_string());
                collect_fields(fields, module, name, child, &mut selection);
                walk(fields, module, name, child, &mut selection);
            } else {
                visit(fields, module, name.clone(), child, &mut selection);
            }
        }
    }
    selection
}

fn visit(
    fields: &FieldIndex,
    module: &str,
    path: String,
    node: &ActionNode,
    selection: &mut FlatSelection,
) {
    if node.is_permitted() {
        selection.actions.insert(format!("{module}.{path}"));
    }
    collect_fields(fields, module, &path, node, selection);
    walk(fields, module, &path, node, selection);
}

fn walk(
    fields: &FieldIndex,
    module: &str,
    path: &str,
    node: &ActionNode,
    selection: &mut FlatSelection,
) {
    for (name, child) in &node.children {
        visit(fields, module, format!("{path}.{name}"), child, selection);
    }
}

fn collect_fields(
    fields: &FieldIndex,
    module: &str,
    path: &str,
    node: &ActionNode,
    selection: &mut FlatSelection,
) {
    for (field, scopes) in &node.fields {
        if !scopes.values().any(|granted| *granted) {
            continue;
        }
        match fields.resolve(module, path, field) {
            Some(column_id) => {
                selection.fields.insert(column_id.to_string());
            }
            None => tracing::debug!(module, action = path, field = %field, "unresolvable field permission dropped"),
        }
    }
}
