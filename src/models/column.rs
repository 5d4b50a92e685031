use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::utils::normalize_code;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Field permission for one data-grid column.
///
/// The `can_*` capabilities are permissive: they are `true` unless the
/// source explicitly said otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub code: String,
    pub id: String,
    pub label: String,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    pub can_view: bool,
    pub can_edit: bool,
    pub can_sort: bool,
    pub can_filter: bool,
    pub can_export: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_code: Option<String>,
    pub aliases: BTreeSet<String>,
    /// Action path the column is edited under.
    pub action: String,
    /// Scopes an editor grants when this column is checked.
    pub scopes: Vec<String>,
    /// Field key inside the action's `fields` map.
    pub field: String,
}

impl Column {
    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnTable {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    columns: Vec<Column>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    primary: HashMap<String, usize>,
}

impl ColumnTable {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// Same first-wins, primary-over-alias policy as feature modules.
    pub fn insert(&mut self, column: Column) -> bool {
        if self.primary.contains_key(&column.code) {
            return false;
        }
        let slot = self.columns.len();
        self.index.insert(column.code.clone(), slot);
        self.primary.insert(column.code.clone(), slot);
        for alias in &column.aliases {
            if !self.primary.contains_key(alias) {
                self.index.entry(alias.clone()).or_insert(slot);
            }
        }
        self.columns.push(column);
        true
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get(&self, code: &str) -> Option<&Column> {
        let code = normalize_code(code);
        self.primary
            .get(&code)
            .or_else(|| self.index.get(&code))
            .map(|&slot| &self.columns[slot])
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Column> {
        let code = normalize_code(code);
        let slot = self
            .primary
            .get(&code)
            .or_else(|| self.index.get(&code))
            .copied()?;
        self.columns.get_mut(slot)
    }
}

/// Tables of one module.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnModule {
    pub code: String,
    pub tables: HashMap<String, ColumnTable>,
}

impl ColumnModule {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            tables: HashMap::new(),
        }
    }

    pub fn table(&self, code: &str) -> Option<&ColumnTable> {
        self.tables.get(&normalize_code(code))
    }
}
