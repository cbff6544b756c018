use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::AppResult;
use crate::infrastructure::db::DbPool;

use super::ledger_repository::{AudioLedgerRepository, AudioStatus};

/// Postgres implementation of the completion ledger.
///
/// One row per word in `word_audio(word TEXT PRIMARY KEY, status TEXT,
/// updated_at TIMESTAMPTZ)`.
pub struct PgAudioLedgerRepository {
    pool: Arc<DbPool>,
}

impl PgAudioLedgerRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    async fn status_of(&self, word: &str) -> AppResult<Option<String>> {
        let pool = self.pool.as_ref();

        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT status
            FROM word_audio
            WHERE word = $1
            "#,
        )
        .bind(word)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(status,)| status))
    }

    async fn upsert(&self, word: &str, status: AudioStatus) -> AppResult<()> {
        let pool = self.pool.as_ref();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO word_audio (word, status, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (word)
            DO UPDATE SET status = $2, updated_at = $3
            "#,
        )
        .bind(word)
        .bind(status.as_str())
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AudioLedgerRepository for PgAudioLedgerRepository {
    async fn is_generated(&self, word: &str) -> Result<bool, String> {
        let status = self
            .status_of(word)
            .await
            .map_err(|e| format!("ledger lookup failed: {}", e))?;

        Ok(status.as_deref() == Some(AudioStatus::Generated.as_str()))
    }

    async fn upsert_status(&self, word: &str, status: AudioStatus) -> Result<(), String> {
        self.upsert(word, status)
            .await
            .map_err(|e| format!("ledger upsert failed: {}", e))
    }
}
