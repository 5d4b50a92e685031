use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::utils::{normalize_code, normalize_key};

/// A named capability with an overall flag and optional per-scope overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub code: String,
    pub label: String,
    pub permitted: bool,
    pub scopes: BTreeMap<String, bool>,
    pub aliases: BTreeSet<String>,
    pub module_code: String,
}

impl Feature {
    /// Scope-overrides-default evaluation.
    ///
    /// A non-permitted feature is never enabled. With no scope the top-level
    /// flag decides; an explicit scope entry wins, an absent one falls back
    /// to the top-level flag.
    pub fn is_enabled(&self, scope: Option<&str>) -> bool {
        if !self.permitted {
            return false;
        }
        match scope {
            None => self.permitted,
            Some(scope) => self
                .scopes
                .get(&normalize_key(scope))
                .copied()
                .unwrap_or(self.permitted),
        }
    }
}

/// Features of one module. Every feature is stored once in `features`;
/// `index` maps its primary code and each alias to that single slot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureModule {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    features: Vec<Feature>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    primary: HashMap<String, usize>,
}

impl FeatureModule {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// Adds a feature and indexes its aliases. The first feature registered
    /// under a primary code wins; an alias never shadows a primary code.
    /// Returns `false` when the feature was dropped as a duplicate.
    pub fn insert(&mut self, feature: Feature) -> bool {
        if self.primary.contains_key(&feature.code) {
            return false;
        }
        let slot = self.features.len();
        // A primary code replaces any alias that claimed the same key earlier.
        self.index.insert(feature.code.clone(), slot);
        self.primary.insert(feature.code.clone(), slot);
        for alias in &feature.aliases {
            if !self.primary.contains_key(alias) {
                self.index.entry(alias.clone()).or_insert(slot);
            }
        }
        self.features.push(feature);
        true
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Primary code first, then alias.
    pub fn get(&self, code: &str) -> Option<&Feature> {
        let code = normalize_code(code);
        self.primary
            .get(&code)
            .or_else(|| self.index.get(&code))
            .map(|&slot| &self.features[slot])
    }

    /// Mutable access through any key; edits are visible through every
    /// other key since all keys share the slot.
    pub fn get_mut(&mut self, code: &str) -> Option<&mut Feature> {
        let code = normalize_code(code);
        let slot = self
            .primary
            .get(&code)
            .or_else(|| self.index.get(&code))
            .copied()?;
        self.features.get_mut(slot)
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(code: &str, aliases: &[&str]) -> Feature {
        Feature {
            code: code.to_string(),
            label: code.to_string(),
            permitted: true,
            scopes: BTreeMap::new(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            module_code: "clientes".to_string(),
        }
    }

    #[test]
    fn alias_and_primary_share_one_slot() {
        let mut module = FeatureModule::new("clientes");
        module.insert(feature("editar", &["alterar"]));

        let by_code = module.get("editar").unwrap();
        let by_alias = module.get("Alterar").unwrap();
        assert!(std::ptr::eq(by_code, by_alias));

        module.get_mut("alterar").unwrap().permitted = false;
        assert!(!module.get("editar").unwrap().permitted);
        assert_eq!(module.features().len(), 1);
    }

    #[test]
    fn alias_never_shadows_primary_code() {
        let mut module = FeatureModule::new("clientes");
        module.insert(feature("editar", &["listar"]));
        module.insert(feature("listar", &[]));

        assert_eq!(module.get("listar").unwrap().code, "listar");
        assert_eq!(module.get("editar").unwrap().code, "editar");
    }

    #[test]
    fn duplicate_primary_is_dropped() {
        let mut module = FeatureModule::new("clientes");
        assert!(module.insert(feature("editar", &[])));
        assert!(!module.insert(feature("editar", &["x"])));
        assert_eq!(module.features().len(), 1);
        assert!(module.get("x").is_none());
    }
}
