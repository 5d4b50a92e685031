use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::normalize::value::{explicit_bool, is_truthy};
use crate::utils::{normalize_code, normalize_key};

/// Key carrying a node's own flag in the persisted shape.
pub const PERMITTED_KEY: &str = "permitido";
const PERMITTED_KEYS: &[&str] = &[PERMITTED_KEY, "permitted", "allowed"];
pub const FIELDS_KEY: &str = "fields";
const FIELDS_KEYS: &[&str] = &[FIELDS_KEY, "campos"];

/// One action in a permission tree. Children are nested sub-actions,
/// `fields` maps a field key to its scoped flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionNode {
    pub permitted: Option<bool>,
    pub fields: BTreeMap<String, BTreeMap<String, bool>>,
    pub children: BTreeMap<String, ActionNode>,
}

impl ActionNode {
    pub fn is_permitted(&self) -> bool {
        self.permitted == Some(true)
    }

    pub fn child_mut(&mut self, name: &str) -> &mut ActionNode {
        self.children.entry(normalize_code(name)).or_default()
    }

    fn from_value(value: &Value) -> ActionNode {
        let mut node = ActionNode::default();
        let map = match value {
            Value::Object(map) => map,
            other => {
                node.permitted = explicit_bool(other);
                return node;
            }
        };

        for (key, value) in map {
            if PERMITTED_KEYS.contains(&key.as_str()) {
                if node.permitted.is_none() {
                    node.permitted = explicit_bool(value);
                }
            } else if FIELDS_KEYS.contains(&key.as_str()) {
                parse_fields(value, &mut node.fields);
            } else if value.is_object() || value.is_boolean() {
                let name = normalize_code(key);
                if name.is_empty() {
                    continue;
                }
                node.children.insert(name, ActionNode::from_value(value));
            }
        }
        node
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(permitted) = self.permitted {
            map.insert(PERMITTED_KEY.to_string(), Value::Bool(permitted));
        }
        if !self.fields.is_empty() {
            let fields: Map<String, Value> = self
                .fields
                .iter()
                .map(|(field, scopes)| {
                    let scopes: Map<String, Value> = scopes
                        .iter()
                        .map(|(scope, flag)| (scope.clone(), Value::Bool(*flag)))
                        .collect();
                    (field.clone(), Value::Object(scopes))
                })
                .collect();
            map.insert(FIELDS_KEY.to_string(), Value::Object(fields));
        }
        for (name, child) in &self.children {
            map.insert(name.clone(), child.to_value());
        }
        Value::Object(map)
    }
}

fn parse_fields(value: &Value, fields: &mut BTreeMap<String, BTreeMap<String, bool>>) {
    let Value::Object(map) = value else {
        return;
    };
    for (field, scopes) in map {
        let field = normalize_code(field);
        if field.is_empty() {
            continue;
        }
        let entry = fields.entry(field).or_default();
        match scopes {
            Value::Object(scopes) => {
                for (scope, flag) in scopes {
                    let scope = normalize_key(scope);
                    if !scope.is_empty() {
                        entry.insert(scope, is_truthy(flag));
                    }
                }
            }
            Value::Array(names) => {
                for name in names.iter().filter_map(Value::as_str) {
                    let scope = normalize_key(name);
                    if !scope.is_empty() {
                        entry.insert(scope, true);
                    }
                }
            }
            other => {
                entry.insert("view".to_string(), is_truthy(other));
            }
        }
    }
}

/// Nested module -> action tree in the shape the server persists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTree {
    modules: BTreeMap<String, ActionNode>,
}

impl PermissionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tolerant parse: anything that is not an object of modules yields an
    /// empty tree.
    pub fn from_value(value: &Value) -> Self {
        let mut tree = PermissionTree::new();
        if let Value::Object(map) = value {
            for (module, node) in map {
                let code = normalize_code(module);
                if code.is_empty() {
                    continue;
                }
                tree.modules.insert(code, ActionNode::from_value(node));
            }
        }
        tree
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.modules
                .iter()
                .map(|(module, node)| (module.clone(), node.to_value()))
                .collect(),
        )
    }

    pub fn modules(&self) -> impl Iterator<Item = (&str, &ActionNode)> {
        self.modules.iter().map(|(code, node)| (code.as_str(), node))
    }

    pub fn module(&self, code: &str) -> Option<&ActionNode> {
        self.modules.get(&normalize_code(code))
    }

    pub fn module_mut(&mut self, code: &str) -> &mut ActionNode {
        self.modules.entry(normalize_code(code)).or_default()
    }

    /// Walks a dotted action path, creating bare nodes along the way.
    pub fn ensure_path(&mut self, module: &str, path: &str) -> &mut ActionNode {
        let mut node = self.module_mut(module);
        for segment in path.split('.').filter(|s| !s.trim().is_empty()) {
            node = node.child_mut(segment);
        }
        node
    }

    /// Looks up a node by dotted path; the empty path is the module root.
    pub fn node(&self, module: &str, path: &str) -> Option<&ActionNode> {
        let mut node = self.module(module)?;
        for segment in path.split('.').filter(|s| !s.trim().is_empty()) {
            node = node.children.get(&normalize_code(segment))?;
        }
        Some(node)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Serialize for PermissionTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PermissionTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// A permission profile as edited by administrative screens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, alias = "nome")]
    pub name: String,
    #[serde(default, alias = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "permissoes")]
    pub permissions: PermissionTree,
}

impl EditorProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn from_json(text: &str) -> AppResult<Self> {
        let de = &mut serde_json::Deserializer::from_str(text);
        Ok(serde_path_to_error::deserialize(de)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_shorthands_and_nested_actions() {
        let tree = PermissionTree::from_value(&json!({
            "Clientes": {
                "permissoes": {"permitido": true},
                "listar": true,
                "editar": {
                    "permitted": "1",
                    "endereco": {"permitido": false},
                    "fields": {"cpf": ["view", "Edit"], "nome": true}
                },
                "label": "ignored"
            }
        }));

        let module = tree.module("clientes").unwrap();
        assert!(module.children["permissoes"].is_permitted());
        assert!(module.children["listar"].is_permitted());
        let editar = &module.children["editar"];
        assert!(editar.is_permitted());
        assert_eq!(editar.children["endereco"].permitted, Some(false));
        assert_eq!(editar.fields["cpf"]["edit"], true);
        assert_eq!(editar.fields["nome"]["view"], true);
        assert!(!module.children.contains_key("label"));
    }

    #[test]
    fn to_value_uses_persisted_key_names() {
        let mut tree = PermissionTree::new();
        tree.ensure_path("clientes", "editar.endereco").permitted = Some(true);

        assert_eq!(
            tree.to_value(),
            json!({"clientes": {"editar": {"endereco": {"permitido": true}}}})
        );
    }

    #[test]
    fn non_object_payload_is_empty_tree() {
        assert!(PermissionTree::from_value(&json!([1, 2])).is_empty());
        assert!(PermissionTree::from_value(&Value::Null).is_empty());
    }
}
