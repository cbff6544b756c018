pub mod error;
pub mod model;

pub use error::CatalogError;
pub use model::{WordCatalog, WordEntry};
