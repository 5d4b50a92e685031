pub mod authz;
pub mod cache;
pub mod config;
pub mod editor;
pub mod errors;
pub mod events;
pub mod models;
pub mod normalize;
pub mod query;
pub mod utils;

// Re-export commonly used items for tests
pub use cache::{BootstrapCache, LoadOptions};
pub use config::BootstrapConfig;
pub use editor::{EditorTransform, FlatSelection};
pub use errors::{AppError, AppResult};
pub use query::QueryEngine;
