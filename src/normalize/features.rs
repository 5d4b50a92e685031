use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};

use super::value::{explicit_bool, first_bool, first_str, first_value, is_truthy, string_list};
use crate::models::{Feature, FeatureModule};
use crate::utils::{normalize_code, normalize_key};

const MODULE_KEYS: &[&str] = &["module", "modulo", "moduleCode", "module_code"];
const CODE_KEYS: &[&str] = &["code", "codigo", "key", "slug", "id", "name"];
const LABEL_KEYS: &[&str] = &["label", "nome", "name", "title", "titulo"];
const PERMITTED_KEYS: &[&str] = &["permitted", "allowed", "enabled", "permitido", "ativo", "active"];
const DISABLED_KEYS: &[&str] = &["disabled", "desabilitado"];
const SCOPE_KEYS: &[&str] = &["scopes", "escopos", "scope"];
pub(crate) const ALIAS_KEYS: &[&str] = &["aliases", "alias", "legacyCodes"];
pub(crate) const METADATA_KEYS: &[&str] = &["metadata", "meta"];
const LIST_KEYS: &[&str] = &["features", "funcionalidades", "items"];

/// Builds the per-module feature index from either an array of features
/// that name their module, or an object keyed by module code.
pub fn normalize_features(source: &Value) -> HashMap<String, FeatureModule> {
    let mut modules: HashMap<String, FeatureModule> = HashMap::new();
    match source {
        Value::Array(items) => {
            for item in items {
                let Some(map) = item.as_object() else {
                    tracing::debug!("dropping non-object feature entry");
                    continue;
                };
                let Some((module, label)) = module_ref(map) else {
                    tracing::debug!("dropping feature without module reference");
                    continue;
                };
                let entry = module_entry(&mut modules, &module);
                if entry.label.is_none() {
                    entry.label = label;
                }
                if let Some(feature) = parse_feature(item, None, &module) {
                    add(entry, feature);
                }
            }
        }
        Value::Object(by_module) => {
            for (module_key, body) in by_module {
                let module = normalize_code(module_key);
                if module.is_empty() {
                    continue;
                }
                let entry = module_entry(&mut modules, &module);
                match body {
                    Value::Array(_) => add_all(entry, body),
                    Value::Object(map) => match first_value(map, LIST_KEYS) {
                        Some(list) => {
                            entry.label = first_str(map, LABEL_KEYS);
                            add_all(entry, list);
                        }
                        None => add_all(entry, body),
                    },
                    _ => tracing::debug!(module = %module, "dropping unrecognized feature module body"),
                }
            }
        }
        Value::Null => {}
        _ => tracing::debug!("ignoring unrecognized features section"),
    }
    modules
}

fn module_entry<'a>(modules: &'a mut HashMap<String, FeatureModule>, code: &str) -> &'a mut FeatureModule {
    modules
        .entry(code.to_string())
        .or_insert_with(|| FeatureModule::new(code))
}

fn module_ref(map: &Map<String, Value>) -> Option<(String, Option<String>)> {
    let value = first_value(map, MODULE_KEYS)?;
    let (raw, label) = match value {
        Value::Object(module) => (first_str(module, CODE_KEYS)?, first_str(module, LABEL_KEYS)),
        other => (super::value::scalar_string(other)?, None),
    };
    let code = normalize_code(&raw);
    (!code.is_empty()).then_some((code, label))
}

/// Adds every feature of a list, or of a `code -> feature` object.
fn add_all(module: &mut FeatureModule, list: &Value) {
    let code = module.code.clone();
    match list {
        Value::Array(items) => {
            for item in items {
                if let Some(feature) = parse_feature(item, None, &code) {
                    add(module, feature);
                }
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                if let Some(feature) = parse_feature(item, Some(key), &code) {
                    add(module, feature);
                }
            }
        }
        _ => {}
    }
}

fn add(module: &mut FeatureModule, feature: Feature) {
    let code = feature.code.clone();
    if !module.insert(feature) {
        tracing::debug!(module = %module.code, feature = %code, "dropping duplicate feature code");
    }
}

/// Parses a feature object, or a scalar keyed by `fallback_code`
/// (`"editar": true`) or a bare code string.
fn parse_feature(item: &Value, fallback_code: Option<&str>, module: &str) -> Option<Feature> {
    let map = match item {
        Value::Object(map) => map,
        Value::String(code) if fallback_code.is_none() => {
            return bare_feature(code, true, module);
        }
        other => {
            let code = fallback_code?;
            return bare_feature(code, explicit_bool(other).unwrap_or(true), module);
        }
    };

    let raw_code = first_str(map, CODE_KEYS).or_else(|| fallback_code.map(str::to_string))?;
    let code = normalize_code(&raw_code);
    if code.is_empty() {
        return None;
    }

    let explicitly_denied = first_bool(map, PERMITTED_KEYS) == Some(false)
        || first_bool(map, DISABLED_KEYS) == Some(true);

    Some(Feature {
        label: first_str(map, LABEL_KEYS).unwrap_or(raw_code),
        permitted: !explicitly_denied,
        scopes: parse_scopes(first_value(map, SCOPE_KEYS)),
        aliases: collect_aliases(map, &code),
        module_code: module.to_string(),
        code,
    })
}

fn bare_feature(raw: &str, permitted: bool, module: &str) -> Option<Feature> {
    let code = normalize_code(raw);
    if code.is_empty() {
        return None;
    }
    Some(Feature {
        label: raw.trim().to_string(),
        permitted,
        scopes: BTreeMap::new(),
        aliases: BTreeSet::new(),
        module_code: module.to_string(),
        code,
    })
}

fn parse_scopes(value: Option<&Value>) -> BTreeMap<String, bool> {
    let mut scopes = BTreeMap::new();
    match value {
        Some(Value::Object(map)) => {
            for (name, flag) in map {
                let name = normalize_key(name);
                if !name.is_empty() {
                    scopes.insert(name, is_truthy(flag));
                }
            }
        }
        Some(other) => {
            for name in string_list(other) {
                scopes.insert(normalize_key(&name), true);
            }
        }
        None => {}
    }
    scopes
}

/// Aliases from the entry itself and from its metadata, normalized like
/// codes. The primary code is never its own alias.
pub(crate) fn collect_aliases(map: &Map<String, Value>, code: &str) -> BTreeSet<String> {
    let metadata = first_value(map, METADATA_KEYS).and_then(Value::as_object);
    let sources = ALIAS_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .chain(
            metadata
                .into_iter()
                .flat_map(|meta| ALIAS_KEYS.iter().filter_map(|key| meta.get(*key))),
        );

    sources
        .flat_map(string_list)
        .map(|alias| normalize_code(&alias))
        .filter(|alias| !alias.is_empty() && alias != code)
        .collect()
}
