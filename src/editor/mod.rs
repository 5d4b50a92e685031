//! Permission trees to flat checkbox selections and back.

mod flatten;
mod rebuild;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{FieldIndex, PermissionTree};

/// Action names that stand for "the module itself is enabled".
pub const MODULE_ACTIVATION_ACTIONS: &[&str] = &["permissoes", "permissions", "acessar", "access"];

/// Activation action written by [`EditorTransform::rebuild`].
pub const MODULE_ACTIVATION_ACTION: &str = "permissoes";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatSelection {
    /// Module codes whose activation action is granted.
    pub modules: BTreeSet<String>,
    /// Granted `module.action[.sub...]` paths.
    pub actions: BTreeSet<String>,
    /// Column ids, resolved through the bootstrap field index.
    pub fields: BTreeSet<String>,
}

impl FlatSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.actions.is_empty() && self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.modules.len() + self.actions.len() + self.fields.len()
    }
}

pub(crate) fn is_activation_action(name: &str) -> bool {
    MODULE_ACTIVATION_ACTIONS.contains(&name)
}

/// Flatten/rebuild pair bound to the field index of one bootstrap snapshot.
///
/// `flatten(rebuild(flatten(tree))) == flatten(tree)` for every tree, and
/// rebuilding the same selection twice gives equal trees.
#[derive(Debug, Clone, Copy)]
pub struct EditorTransform<'a> {
    fields: &'a FieldIndex,
}

impl<'a> EditorTransform<'a> {
    pub fn new(fields: &'a FieldIndex) -> Self {
        Self { fields }
    }

    pub fn flatten(&self, tree: &PermissionTree) -> FlatSelection {
        flatten::flatten(self.fields, tree)
    }

    pub fn rebuild(&self, selection: &FlatSelection) -> PermissionTree {
        rebuild::rebuild(self.fields, selection)
    }
}
