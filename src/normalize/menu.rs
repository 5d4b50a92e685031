use std::collections::HashSet;

use serde_json::{Map, Value};

use super::value::{as_i64, first_str, first_value};
use crate::models::{MenuKind, MenuNode};
use crate::utils::normalize_key;

const CODE_KEYS: &[&str] = &["code", "codigo", "key", "id", "slug", "name"];
const LABEL_KEYS: &[&str] = &["label", "title", "titulo", "nome", "name", "text"];
const ICON_KEYS: &[&str] = &["icon", "icone"];
const PAGE_KEYS: &[&str] = &["pageRef", "page", "pagina", "route", "rota", "path", "href", "url"];
const ORDER_KEYS: &[&str] = &["order", "ordem", "position", "posicao", "sort"];
const CHILDREN_KEYS: &[&str] = &["children", "items", "submenu", "nodes", "filhos"];

/// Normalizes one level of menu entries. `source` may be an array of items
/// or an object keyed by code.
pub fn normalize_menu(source: &Value) -> Vec<MenuNode> {
    normalize_level(source, None)
}

fn normalize_level(source: &Value, parent: Option<&str>) -> Vec<MenuNode> {
    // Positions count every input entry, including the ones dropped here.
    let entries: Vec<(usize, Option<&str>, &Map<String, Value>)> = match source {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| item.as_object().map(|item| (index, None, item)))
            .collect(),
        Value::Object(map) => map
            .iter()
            .enumerate()
            .filter_map(|(index, (key, item))| {
                item.as_object().map(|item| (index, Some(key.as_str()), item))
            })
            .collect(),
        _ => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(entries.len());
    for (index, key, item) in entries {
        let positional = match parent {
            Some(parent) => format!("{parent}:{index}"),
            None => format!("item:{index}"),
        };
        let raw_code = first_str(item, CODE_KEYS).or_else(|| key.map(str::to_string));
        let mut code = raw_code
            .as_deref()
            .map(normalize_key)
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| positional.clone());
        if seen.contains(&code) {
            tracing::debug!(code = %code, "duplicate menu code among siblings, using positional key");
            code = unique_code(&seen, &positional);
        }
        seen.insert(code.clone());

        let children = first_value(item, CHILDREN_KEYS)
            .map(|children| normalize_level(children, Some(code.as_str())))
            .unwrap_or_default();
        let kind = if children.is_empty() {
            MenuKind::Item
        } else {
            MenuKind::Group
        };

        nodes.push(MenuNode {
            label: first_str(item, LABEL_KEYS)
                .or(raw_code)
                .unwrap_or_else(|| code.clone()),
            icon: first_str(item, ICON_KEYS),
            page_ref: first_str(item, PAGE_KEYS),
            kind,
            order: first_value(item, ORDER_KEYS)
                .and_then(as_i64)
                .unwrap_or(index as i64),
            children,
            code,
        });
    }

    // Vec::sort_by_key is stable, so equal orders keep input order.
    nodes.sort_by_key(|node| node.order);
    nodes
}

/// `base`, or `base_N` with the smallest N that no sibling has taken.
fn unique_code(seen: &HashSet<String>, base: &str) -> String {
    let mut code = base.to_string();
    let mut suffix = 1;
    while seen.contains(&code) {
        code = format!("{base}_{suffix}");
        suffix += 1;
    }
    code
}
