use async_trait::async_trait;

/// Processing status of a word in the completion ledger.
///
/// `Generated` is terminal: the engine never reprocesses such a word.
/// `Failed` is retryable on the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioStatus {
    Generated,
    Failed,
}

impl AudioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioStatus::Generated => "generated",
            AudioStatus::Failed => "failed",
        }
    }
}

/// Durable word -> status ledger used for idempotent resumption.
/// Abstracts the backing store so tests can run without a database.
#[async_trait]
pub trait AudioLedgerRepository: Send + Sync {
    /// Whether the word has already been generated.
    ///
    /// Callers treat an error as "not generated": duplicate work is
    /// preferred over silently skipping a word.
    async fn is_generated(&self, word: &str) -> Result<bool, String>;

    /// Inserts a new status row or overwrites the existing one for the word.
    async fn upsert_status(&self, word: &str, status: AudioStatus) -> Result<(), String>;
}
