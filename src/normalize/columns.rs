use std::collections::HashMap;

use serde_json::{Map, Value};

use super::features::{collect_aliases, METADATA_KEYS};
use super::value::{explicit_bool, first_bool, first_str, first_value, string_list};
use crate::models::{Column, ColumnModule, ColumnTable, FieldBinding, FieldIndex, Visibility};
use crate::utils::{normalize_code, normalize_key, normalize_path};

const LIST_KEYS: &[&str] = &["columns", "colunas", "fields", "campos"];
const TABLE_LABEL_KEYS: &[&str] = &["label", "nome", "title", "titulo"];
const CODE_KEYS: &[&str] = &["code", "codigo", "key", "field", "campo", "column", "coluna", "name"];
const LABEL_KEYS: &[&str] = &["label", "title", "titulo", "header", "nome"];
const ID_KEYS: &[&str] = &["columnId", "column_id", "id"];
const VISIBILITY_KEYS: &[&str] = &["visibility", "visibilidade"];
const VISIBLE_KEYS: &[&str] = &["visible", "visivel"];
const HIDDEN_KEYS: &[&str] = &["hidden", "oculto"];
const HIDDEN_WORDS: &[&str] = &["hidden", "oculto", "hide", "none", "false", "0"];
const MASK_KEYS: &[&str] = &["mask", "mascara"];
const CAN_VIEW: &[&str] = &["canView", "can_view"];
const CAN_EDIT: &[&str] = &["canEdit", "can_edit", "editable"];
const CAN_SORT: &[&str] = &["canSort", "can_sort", "sortable"];
const CAN_FILTER: &[&str] = &["canFilter", "can_filter", "filterable"];
const CAN_EXPORT: &[&str] = &["canExport", "can_export", "exportable"];
const FEATURE_KEYS: &[&str] = &["featureCode", "feature_code", "feature", "funcionalidade"];
const ACTION_KEYS: &[&str] = &["columnAction", "column_action"];
const META_ACTION_KEYS: &[&str] = &["action", "acao"];
const SCOPE_KEYS: &[&str] = &["columnScope", "column_scope"];
const FIELD_KEYS: &[&str] = &["columnField", "column_field"];
const FIELD_PREFIXES: &[&str] = &["col_", "coluna_", "campo_", "field_"];

/// Where a column sits while it is being parsed.
struct TableCtx<'a> {
    module: &'a str,
    table: &'a str,
    action: String,
}

/// Builds `module -> table -> columns` plus the editor field index.
pub fn normalize_columns(source: &Value) -> (HashMap<String, ColumnModule>, FieldIndex) {
    let mut modules = HashMap::new();
    let mut fields = FieldIndex::default();

    let Value::Object(by_module) = source else {
        if !source.is_null() {
            tracing::debug!("ignoring unrecognized columns section");
        }
        return (modules, fields);
    };

    for (module_key, tables) in by_module {
        let module_code = normalize_code(module_key);
        let Value::Object(tables) = tables else {
            tracing::debug!(module = %module_code, "dropping non-object column module");
            continue;
        };
        if module_code.is_empty() {
            continue;
        }

        let mut module = ColumnModule::new(module_code.clone());
        for (table_key, body) in tables {
            let table_code = normalize_code(table_key);
            if table_code.is_empty() {
                continue;
            }
            if let Some(table) = normalize_table(&module_code, &table_code, body, &mut fields) {
                module.tables.insert(table_code, table);
            }
        }
        modules.insert(module_code, module);
    }

    (modules, fields)
}

fn normalize_table(
    module: &str,
    table_code: &str,
    body: &Value,
    fields: &mut FieldIndex,
) -> Option<ColumnTable> {
    let mut table = ColumnTable::new(table_code);
    let mut ctx = TableCtx {
        module,
        table: table_code,
        action: table_code.to_string(),
    };

    let list = match body {
        Value::Array(_) => body,
        Value::Object(map) => match first_value(map, LIST_KEYS) {
            Some(list) => {
                table.label = first_str(map, TABLE_LABEL_KEYS);
                let metadata = first_value(map, METADATA_KEYS).and_then(Value::as_object);
                if let Some(action) = metadata.and_then(|meta| first_str(meta, META_ACTION_KEYS)) {
                    let action = normalize_path(&action);
                    if !action.is_empty() {
                        ctx.action = action;
                    }
                }
                list
            }
            None => body,
        },
        _ => {
            tracing::debug!(module = %module, table = %table_code, "dropping unrecognized column table");
            return None;
        }
    };

    let entries: Vec<(Option<&str>, &Value)> = match list {
        Value::Array(items) => items.iter().map(|item| (None, item)).collect(),
        Value::Object(map) => map.iter().map(|(key, item)| (Some(key.as_str()), item)).collect(),
        _ => Vec::new(),
    };

    for (fallback, item) in entries {
        let Some(column) = parse_column(item, fallback, &ctx) else {
            continue;
        };
        let binding = FieldBinding {
            module: module.to_string(),
            action: column.action.clone(),
            field: column.field.clone(),
            scopes: column.scopes.clone(),
        };
        let id = column.id.clone();
        let code = column.code.clone();
        if table.insert(column) {
            if !fields.register(&id, binding) {
                tracing::debug!(column = %id, "field binding already claimed, column not editable by key");
            }
        } else {
            tracing::debug!(module = %module, table = %table_code, column = %code, "dropping duplicate column code");
        }
    }

    Some(table)
}

fn parse_column(item: &Value, fallback: Option<&str>, ctx: &TableCtx<'_>) -> Option<Column> {
    let empty = Map::new();
    let (map, raw_code, scalar_visible) = match item {
        Value::Object(map) => {
            let raw = first_str(map, CODE_KEYS).or_else(|| fallback.map(str::to_string))?;
            (map, raw, None)
        }
        Value::String(code) if fallback.is_none() => (&empty, code.trim().to_string(), None),
        other => (&empty, fallback?.to_string(), explicit_bool(other)),
    };

    let code = normalize_code(&raw_code);
    if code.is_empty() {
        return None;
    }
    let metadata = first_value(map, METADATA_KEYS)
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let lookup_str = |keys: &[&str]| first_str(map, keys).or_else(|| first_str(metadata, keys));
    let lookup_bool = |keys: &[&str]| first_bool(map, keys).or_else(|| first_bool(metadata, keys));
    // Capabilities only turn off on an explicit falsy value.
    let capability = |keys: &[&str]| lookup_bool(keys).unwrap_or(true);

    let hidden = scalar_visible == Some(false)
        || lookup_str(VISIBILITY_KEYS)
            .map(|v| HIDDEN_WORDS.contains(&normalize_key(&v).as_str()))
            .unwrap_or(false)
        || lookup_bool(VISIBLE_KEYS) == Some(false)
        || lookup_bool(HIDDEN_KEYS) == Some(true);

    let can_edit = capability(CAN_EDIT);
    let action = lookup_str(ACTION_KEYS)
        .or_else(|| first_str(metadata, META_ACTION_KEYS))
        .map(|action| normalize_path(&action))
        .filter(|action| !action.is_empty())
        .unwrap_or_else(|| ctx.action.clone());

    let mut scopes: Vec<String> = first_value(map, SCOPE_KEYS)
        .or_else(|| first_value(metadata, SCOPE_KEYS))
        .map(string_list)
        .unwrap_or_default()
        .iter()
        .map(|scope| normalize_key(scope))
        .filter(|scope| !scope.is_empty())
        .collect();
    if scopes.is_empty() {
        scopes.push("view".to_string());
        if can_edit {
            scopes.push("edit".to_string());
        }
    }
    scopes.dedup();

    let field = lookup_str(FIELD_KEYS)
        .map(|field| normalize_code(&field))
        .filter(|field| !field.is_empty())
        .unwrap_or_else(|| derive_field(&raw_code));

    Some(Column {
        id: first_str(map, ID_KEYS)
            .unwrap_or_else(|| format!("{}.{}.{}", ctx.module, ctx.table, code)),
        label: first_str(map, LABEL_KEYS).unwrap_or_else(|| raw_code.clone()),
        visibility: if hidden {
            Visibility::Hidden
        } else {
            Visibility::Visible
        },
        mask: lookup_str(MASK_KEYS),
        can_view: capability(CAN_VIEW),
        can_edit,
        can_sort: capability(CAN_SORT),
        can_filter: capability(CAN_FILTER),
        can_export: capability(CAN_EXPORT),
        feature_code: lookup_str(FEATURE_KEYS)
            .map(|feature| normalize_code(&feature))
            .filter(|feature| !feature.is_empty()),
        aliases: collect_aliases(map, &code),
        action,
        scopes,
        field,
        code,
    })
}

/// Field key implied by a column name: a dotted qualifier or a conventional
/// `col_`-style prefix segment is stripped.
fn derive_field(raw: &str) -> String {
    let tail = raw.rsplit('.').next().unwrap_or(raw);
    let normalized = normalize_code(tail);
    let stripped = FIELD_PREFIXES
        .iter()
        .find_map(|prefix| normalized.strip_prefix(*prefix))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string);
    stripped.unwrap_or(normalized)
}
