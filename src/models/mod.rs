pub mod bootstrap;
pub mod column;
pub mod feature;
pub mod menu;
pub mod profile;

pub use bootstrap::{BootstrapData, FieldBinding, FieldIndex};
pub use column::{Column, ColumnModule, ColumnTable, Visibility};
pub use feature::{Feature, FeatureModule};
pub use menu::{MenuKind, MenuNode};
pub use profile::{ActionNode, EditorProfile, PermissionTree};
