/// Errors loading the word catalog. Both are fatal for the run that hit
/// them, never for the process.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("word list not found: {0}")]
    NotFound(String),

    #[error("word list is malformed: {0}")]
    Malformed(String),
}
