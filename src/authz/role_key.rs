use std::sync::Arc;

use serde_json::{Map, Value};

use super::identity::IdentitySource;
use crate::normalize::value::{first_str, first_value, scalar_string};
use crate::utils::normalize_key;

/// Partition used when nothing identifies a role.
pub const DEFAULT_ROLE_KEY: &str = "default";

const NESTED_KEYS: &[&str] = &["user", "usuario"];
const ROLE_KEYS: &[&str] = &["role", "papel"];
const ROLE_OBJECT_KEYS: &[&str] = &["id", "code", "codigo", "slug", "key", "name", "nome"];
const LEGACY_KEYS: &[&str] = &[
    "roleId", "role_id", "perfilId", "perfil_id", "perfil", "profile", "grupo", "group", "roles",
];

/// Derives the cache partition key for the current caller.
///
/// Resolution order:
/// 1. explicit caller-supplied key
/// 2. identity context handed to the call
/// 3. the identity source's current user (`role`, then legacy fields)
/// 4. the default partition
///
/// Total: always yields a non-empty, trimmed, lower-cased key.
#[derive(Clone)]
pub struct RoleKeyResolver {
    identity: Arc<dyn IdentitySource>,
    default_key: String,
}

impl RoleKeyResolver {
    pub fn new(identity: Arc<dyn IdentitySource>) -> Self {
        Self {
            identity,
            default_key: DEFAULT_ROLE_KEY.to_string(),
        }
    }

    pub fn with_default_key(mut self, key: impl AsRef<str>) -> Self {
        let key = normalize_key(key.as_ref());
        if !key.is_empty() {
            self.default_key = key;
        }
        self
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    pub fn resolve(&self, explicit: Option<&str>) -> String {
        self.resolve_with(explicit, None)
    }

    pub fn resolve_with(&self, explicit: Option<&str>, context: Option<&Value>) -> String {
        explicit
            .map(normalize_key)
            .filter(|key| !key.is_empty())
            .or_else(|| context.and_then(role_from_identity))
            .or_else(|| {
                self.identity
                    .current_user()
                    .as_ref()
                    .and_then(role_from_identity)
            })
            .unwrap_or_else(|| self.default_key.clone())
    }
}

impl std::fmt::Debug for RoleKeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleKeyResolver")
            .field("default_key", &self.default_key)
            .finish_non_exhaustive()
    }
}

/// Role key named by a user record, looking through a `user`/`usuario`
/// wrapper when the record itself names none.
pub fn role_from_identity(user: &Value) -> Option<String> {
    let map = user.as_object()?;
    role_from_record(map).or_else(|| {
        first_value(map, NESTED_KEYS)
            .and_then(Value::as_object)
            .and_then(role_from_record)
    })
}

fn role_from_record(map: &Map<String, Value>) -> Option<String> {
    ROLE_KEYS
        .iter()
        .chain(LEGACY_KEYS)
        .filter_map(|key| map.get(*key))
        .find_map(role_value)
}

fn role_value(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Object(role) => first_str(role, ROLE_OBJECT_KEYS)?,
        Value::Array(roles) => return roles.iter().find_map(role_value),
        other => scalar_string(other)?,
    };
    let key = normalize_key(&raw);
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::identity::{AnonymousIdentity, StaticIdentity};
    use serde_json::json;

    fn resolver(user: Option<Value>) -> RoleKeyResolver {
        RoleKeyResolver::new(Arc::new(StaticIdentity(user)))
    }

    #[test]
    fn explicit_key_wins() {
        let r = resolver(Some(json!({"role": "admin"})));
        assert_eq!(r.resolve(Some(" Gerente ")), "gerente");
        assert_eq!(r.resolve(Some("  ")), "admin");
    }

    #[test]
    fn role_object_fields_are_checked_in_order() {
        let r = resolver(Some(json!({"role": {"name": "Admin", "id": 7}})));
        assert_eq!(r.resolve(None), "7");

        let r = resolver(Some(json!({"role": {"slug": "financeiro"}})));
        assert_eq!(r.resolve(None), "financeiro");
    }

    #[test]
    fn legacy_fields_and_nested_user_record() {
        assert_eq!(resolver(Some(json!({"perfil_id": 3}))).resolve(None), "3");
        assert_eq!(resolver(Some(json!({"roles": [{"code": "ops"}]}))).resolve(None), "ops");
        assert_eq!(
            resolver(Some(json!({"usuario": {"perfil": {"nome": "Vendas"}}}))).resolve(None),
            "vendas"
        );
    }

    #[test]
    fn context_overrides_identity_source() {
        let r = resolver(Some(json!({"role": "admin"})));
        let ctx = json!({"role": "auditor"});
        assert_eq!(r.resolve_with(None, Some(&ctx)), "auditor");
    }

    #[test]
    fn falls_back_to_default_partition() {
        let r = RoleKeyResolver::new(Arc::new(AnonymousIdentity));
        assert_eq!(r.resolve(None), DEFAULT_ROLE_KEY);

        let r = resolver(Some(json!({"role": "", "name": "x"}))).with_default_key("Guest");
        assert_eq!(r.resolve(None), "guest");
    }
}
