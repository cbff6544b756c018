/// Main application error type
///
/// The HTTP surface never reports errors to callers (the trigger endpoint
/// answers started/already-running regardless), so this only wraps the
/// database failures the ledger repository maps at its trait seam.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
