pub mod gemini_tts_repository;
pub mod ledger_repository;
pub mod pg_ledger_repository;
pub mod storage_repository;
pub mod supabase_storage_repository;
pub mod tts_repository;

pub use gemini_tts_repository::GeminiTtsRepository;
pub use ledger_repository::{AudioLedgerRepository, AudioStatus};
pub use pg_ledger_repository::PgAudioLedgerRepository;
pub use storage_repository::StorageRepository;
pub use supabase_storage_repository::SupabaseStorageRepository;
pub use tts_repository::TtsRepository;
