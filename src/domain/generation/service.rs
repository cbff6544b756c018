use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::domain::catalog::{CatalogError, WordCatalog, WordEntry};
use crate::infrastructure::repositories::{
    AudioLedgerRepository, AudioStatus, StorageRepository, TtsRepository,
};

use super::audio::pcm_to_wav;
use super::voices::{GEMINI_VOICES, VOICE_FALLBACK_LIMIT};

/// Delays that keep a run inside the provider's coarse rate limits.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    /// Pause after a failed attempt before trying the next credential.
    pub key_rotation: Duration,
    /// Pause before moving on to the next fallback voice.
    pub voice_switch: Duration,
    /// Pause after any word that reached the provider at all. Skipped words
    /// pay nothing, so re-scans of completed ranges stay fast.
    pub between_words: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            key_rotation: Duration::from_secs(1),
            voice_switch: Duration::from_secs(1),
            between_words: Duration::from_secs(10),
        }
    }
}

/// Which slice of the catalog a run covers.
#[derive(Debug, Clone)]
pub struct RunTarget {
    pub wordlist_path: String,
    pub level: String,
    pub group_start: u32,
    pub group_end: u32,
}

/// Outcome of processing a single word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordOutcome {
    /// The ledger already has the word as generated; no provider call made.
    Skipped,
    Generated { voice: String },
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub generated: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Orchestrates one generation run: ledger check, synthesis with
/// credential rotation and voice fallback, artifact upload, status upsert.
pub struct GenerationService {
    ledger: Arc<dyn AudioLedgerRepository>,
    storage: Arc<dyn StorageRepository>,
    tts: Arc<dyn TtsRepository>,
    api_keys: Vec<String>,
    // Shared across all words of a run so load spreads round-robin over the
    // whole key list instead of every word starting at key 0.
    key_cursor: AtomicUsize,
    target: RunTarget,
    pacing: PacingConfig,
}

impl GenerationService {
    pub fn new(
        ledger: Arc<dyn AudioLedgerRepository>,
        storage: Arc<dyn StorageRepository>,
        tts: Arc<dyn TtsRepository>,
        api_keys: Vec<String>,
        target: RunTarget,
        pacing: PacingConfig,
    ) -> Self {
        Self {
            ledger,
            storage,
            tts,
            api_keys,
            key_cursor: AtomicUsize::new(0),
            target,
            pacing,
        }
    }

    /// Process the configured catalog slice, word by word in catalog order.
    ///
    /// Only a missing or malformed word list aborts the run; every other
    /// failure is absorbed per word and surfaces through the ledger.
    pub async fn run(&self) -> Result<RunSummary, CatalogError> {
        let catalog = WordCatalog::load(&self.target.wordlist_path)?;
        let entries = catalog.entries_in_range(
            &self.target.level,
            self.target.group_start,
            self.target.group_end,
        );

        tracing::info!(
            level = %self.target.level,
            group_start = self.target.group_start,
            group_end = self.target.group_end,
            word_count = entries.len(),
            "starting audio generation run"
        );

        let mut summary = RunSummary::default();
        for entry in &entries {
            match self.process_word(entry).await {
                WordOutcome::Skipped => summary.skipped += 1,
                outcome => {
                    match outcome {
                        WordOutcome::Generated { .. } => summary.generated += 1,
                        _ => summary.failed += 1,
                    }
                    // The provider was hit at least once for this word.
                    tokio::time::sleep(self.pacing.between_words).await;
                }
            }
        }

        tracing::info!(
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            "audio generation run finished"
        );

        Ok(summary)
    }

    /// Generate one word, or skip it if the ledger already has it.
    async fn process_word(&self, entry: &WordEntry) -> WordOutcome {
        match self.ledger.is_generated(&entry.text).await {
            Ok(true) => {
                tracing::debug!(word = %entry.text, "already generated, skipping");
                return WordOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                // An unreadable ledger counts as "not generated yet":
                // duplicate work beats losing a word.
                tracing::warn!(
                    word = %entry.text,
                    error = %e,
                    "ledger lookup failed, attempting generation anyway"
                );
            }
        }

        // Credentials exhaust inside a voice before the voice changes: a
        // provider failure is more often a quota problem than a voice one.
        let mut voices: Vec<&str> = GEMINI_VOICES.to_vec();
        voices.shuffle(&mut rand::thread_rng());
        voices.truncate(VOICE_FALLBACK_LIMIT);

        for voice in voices {
            let mut attempts = 0;
            while attempts < self.api_keys.len() {
                let api_key = self.current_key();
                match self.tts.synthesize(&entry.text, voice, api_key).await {
                    Ok(pcm) if !pcm.is_empty() => match pcm_to_wav(&pcm) {
                        Ok(wav) => {
                            self.store_artifact(entry, wav).await;
                            self.mark(entry, AudioStatus::Generated).await;
                            tracing::info!(word = %entry.text, voice, "word generated");
                            return WordOutcome::Generated {
                                voice: voice.to_string(),
                            };
                        }
                        Err(e) => {
                            tracing::warn!(
                                word = %entry.text,
                                voice,
                                error = %e,
                                "could not encode audio payload"
                            );
                        }
                    },
                    Ok(_) => {
                        tracing::warn!(
                            word = %entry.text,
                            voice,
                            "provider returned an empty audio payload"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            word = %entry.text,
                            voice,
                            error = %e,
                            "synthesis attempt failed"
                        );
                    }
                }

                self.rotate_key();
                attempts += 1;
                tokio::time::sleep(self.pacing.key_rotation).await;
            }

            tracing::warn!(
                word = %entry.text,
                voice,
                "all credentials exhausted for this voice, trying the next one"
            );
            tokio::time::sleep(self.pacing.voice_switch).await;
        }

        tracing::error!(word = %entry.text, "all fallback voices exhausted");
        self.mark(entry, AudioStatus::Failed).await;
        WordOutcome::Failed
    }

    async fn store_artifact(&self, entry: &WordEntry, wav: Vec<u8>) {
        let path = entry.artifact_path();
        if let Err(e) = self.storage.put(&path, wav, "audio/wav").await {
            // Upload failure does not unmark the word; the ledger stays the
            // source of truth and blob drift is reconciled out of band.
            tracing::warn!(word = %entry.text, path = %path, error = %e, "artifact upload failed");
        }
    }

    async fn mark(&self, entry: &WordEntry, status: AudioStatus) {
        if let Err(e) = self.ledger.upsert_status(&entry.text, status).await {
            tracing::error!(
                word = %entry.text,
                status = status.as_str(),
                error = %e,
                "ledger write failed; word stays eligible for retry"
            );
        }
    }

    fn current_key(&self) -> &str {
        let index = self.key_cursor.load(Ordering::SeqCst) % self.api_keys.len();
        &self.api_keys[index]
    }

    fn rotate_key(&self) {
        let next = self.key_cursor.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.api_keys.is_empty() {
            tracing::debug!(index = next % self.api_keys.len(), "rotating provider key");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeLedger {
        statuses: Mutex<HashMap<String, AudioStatus>>,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl FakeLedger {
        fn with_generated(word: &str) -> Self {
            let ledger = Self::default();
            ledger
                .statuses
                .lock()
                .insert(word.to_string(), AudioStatus::Generated);
            ledger
        }

        fn status_of(&self, word: &str) -> Option<AudioStatus> {
            self.statuses.lock().get(word).copied()
        }
    }

    #[async_trait]
    impl AudioLedgerRepository for FakeLedger {
        async fn is_generated(&self, word: &str) -> Result<bool, String> {
            if self.fail_reads {
                return Err("ledger down".to_string());
            }
            Ok(self.statuses.lock().get(word) == Some(&AudioStatus::Generated))
        }

        async fn upsert_status(&self, word: &str, status: AudioStatus) -> Result<(), String> {
            if self.fail_writes {
                return Err("ledger write rejected".to_string());
            }
            self.statuses.lock().insert(word.to_string(), status);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeStorage {
        puts: Mutex<Vec<String>>,
        fail_puts: bool,
    }

    #[async_trait]
    impl StorageRepository for FakeStorage {
        async fn put(
            &self,
            path: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<(), String> {
            self.puts.lock().push(path.to_string());
            if self.fail_puts {
                return Err("bucket unavailable".to_string());
            }
            Ok(())
        }
    }

    /// Fails the first `failures_before_success` calls, then returns the
    /// configured payload. Records every call with the credential used.
    struct ScriptedTts {
        calls: Mutex<Vec<(String, String, String)>>,
        failures_before_success: usize,
        payload: Vec<u8>,
    }

    impl ScriptedTts {
        fn always_failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failures_before_success: usize::MAX,
                payload: vec![0x01, 0x02],
            }
        }

        fn failing_first(n: usize) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failures_before_success: n,
                payload: vec![0x01, 0x02],
            }
        }

        fn always_empty_payload() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failures_before_success: 0,
                payload: Vec::new(),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        fn key_of_call(&self, index: usize) -> String {
            self.calls.lock()[index].2.clone()
        }
    }

    #[async_trait]
    impl TtsRepository for ScriptedTts {
        async fn synthesize(
            &self,
            text: &str,
            voice: &str,
            api_key: &str,
        ) -> Result<Vec<u8>, String> {
            let mut calls = self.calls.lock();
            calls.push((text.to_string(), voice.to_string(), api_key.to_string()));
            if calls.len() <= self.failures_before_success {
                Err("quota exhausted".to_string())
            } else {
                Ok(self.payload.clone())
            }
        }
    }

    fn service(
        ledger: Arc<FakeLedger>,
        storage: Arc<FakeStorage>,
        tts: Arc<ScriptedTts>,
        keys: &[&str],
        pacing: PacingConfig,
        wordlist_path: &str,
    ) -> GenerationService {
        GenerationService::new(
            ledger,
            storage,
            tts,
            keys.iter().map(|k| k.to_string()).collect(),
            RunTarget {
                wordlist_path: wordlist_path.to_string(),
                level: "A1".to_string(),
                group_start: 1,
                group_end: 2,
            },
            pacing,
        )
    }

    fn no_pacing() -> PacingConfig {
        PacingConfig {
            key_rotation: Duration::ZERO,
            voice_switch: Duration::ZERO,
            between_words: Duration::ZERO,
        }
    }

    fn entry(text: &str) -> WordEntry {
        WordEntry {
            text: text.to_string(),
            level: "A1".to_string(),
            group_name: "G1".to_string(),
            group_number: 1,
        }
    }

    #[tokio::test]
    async fn test_already_generated_word_is_skipped_without_provider_call() {
        let ledger = Arc::new(FakeLedger::with_generated("casa"));
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::failing_first(0));
        let svc = service(
            ledger,
            storage,
            tts.clone(),
            &["k0"],
            no_pacing(),
            "unused.json",
        );

        let outcome = svc.process_word(&entry("casa")).await;

        assert_eq!(outcome, WordOutcome::Skipped);
        assert_eq!(tts.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_exhaustion_is_bounded_and_marks_failed() {
        let ledger = Arc::new(FakeLedger::default());
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::always_failing());
        let svc = service(
            ledger.clone(),
            storage,
            tts.clone(),
            &["k0", "k1", "k2"],
            no_pacing(),
            "unused.json",
        );

        let outcome = svc.process_word(&entry("perro")).await;

        assert_eq!(outcome, WordOutcome::Failed);
        assert_eq!(tts.call_count(), VOICE_FALLBACK_LIMIT * 3);
        assert_eq!(ledger.status_of("perro"), Some(AudioStatus::Failed));
    }

    #[tokio::test]
    async fn test_empty_payload_drives_the_same_fallback_as_an_error() {
        let ledger = Arc::new(FakeLedger::default());
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::always_empty_payload());
        let svc = service(
            ledger.clone(),
            storage.clone(),
            tts.clone(),
            &["k0", "k1"],
            no_pacing(),
            "unused.json",
        );

        let outcome = svc.process_word(&entry("gato")).await;

        assert_eq!(outcome, WordOutcome::Failed);
        assert_eq!(tts.call_count(), VOICE_FALLBACK_LIMIT * 2);
        assert!(storage.puts.lock().is_empty());
        assert_eq!(ledger.status_of("gato"), Some(AudioStatus::Failed));
    }

    #[tokio::test]
    async fn test_success_uploads_artifact_and_marks_generated() {
        let ledger = Arc::new(FakeLedger::default());
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::failing_first(0));
        let svc = service(
            ledger.clone(),
            storage.clone(),
            tts.clone(),
            &["k0"],
            no_pacing(),
            "unused.json",
        );

        let outcome = svc.process_word(&entry("casa")).await;

        match outcome {
            WordOutcome::Generated { voice } => {
                assert!(GEMINI_VOICES.contains(&voice.as_str()));
            }
            other => panic!("expected Generated, got {:?}", other),
        }
        assert_eq!(tts.call_count(), 1);
        assert_eq!(*storage.puts.lock(), ["A1/G1/casa.wav"]);
        assert_eq!(ledger.status_of("casa"), Some(AudioStatus::Generated));
    }

    #[tokio::test]
    async fn test_storage_failure_is_non_fatal_and_word_is_still_generated() {
        let ledger = Arc::new(FakeLedger::default());
        let storage = Arc::new(FakeStorage {
            fail_puts: true,
            ..Default::default()
        });
        let tts = Arc::new(ScriptedTts::failing_first(0));
        let svc = service(
            ledger.clone(),
            storage.clone(),
            tts.clone(),
            &["k0"],
            no_pacing(),
            "unused.json",
        );

        let outcome = svc.process_word(&entry("casa")).await;

        // The upload was attempted and rejected, but the word is still
        // reported generated and recorded as such in the ledger.
        assert!(matches!(outcome, WordOutcome::Generated { .. }));
        assert_eq!(*storage.puts.lock(), ["A1/G1/casa.wav"]);
        assert_eq!(ledger.status_of("casa"), Some(AudioStatus::Generated));

        // Processing carries on to further words.
        let next = svc.process_word(&entry("perro")).await;
        assert!(matches!(next, WordOutcome::Generated { .. }));
        assert_eq!(tts.call_count(), 2);
    }

    #[tokio::test]
    async fn test_ledger_write_failure_is_swallowed() {
        let ledger = Arc::new(FakeLedger {
            fail_writes: true,
            ..Default::default()
        });
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::failing_first(0));
        let svc = service(
            ledger.clone(),
            storage.clone(),
            tts.clone(),
            &["k0"],
            no_pacing(),
            "unused.json",
        );

        let outcome = svc.process_word(&entry("casa")).await;

        // The artifact made it to storage and the word still counts as
        // generated; the missing ledger row just leaves it eligible for a
        // retry on the next run.
        assert!(matches!(outcome, WordOutcome::Generated { .. }));
        assert_eq!(*storage.puts.lock(), ["A1/G1/casa.wav"]);
        assert_eq!(ledger.status_of("casa"), None);

        let next = svc.process_word(&entry("perro")).await;
        assert!(matches!(next, WordOutcome::Generated { .. }));
        assert_eq!(tts.call_count(), 2);
    }

    #[tokio::test]
    async fn test_rotation_cursor_persists_across_words() {
        let ledger = Arc::new(FakeLedger::default());
        let storage = Arc::new(FakeStorage::default());
        // Word 1 fails twice (rotating k0 -> k1 -> k2) and succeeds on the
        // third call; word 2 must start where word 1 left off, not at k0.
        let tts = Arc::new(ScriptedTts::failing_first(2));
        let svc = service(
            ledger,
            storage,
            tts.clone(),
            &["k0", "k1", "k2"],
            no_pacing(),
            "unused.json",
        );

        let first = svc.process_word(&entry("uno")).await;
        assert!(matches!(first, WordOutcome::Generated { .. }));
        assert_eq!(tts.key_of_call(0), "k0");
        assert_eq!(tts.key_of_call(1), "k1");
        assert_eq!(tts.key_of_call(2), "k2");

        let second = svc.process_word(&entry("dos")).await;
        assert!(matches!(second, WordOutcome::Generated { .. }));
        assert_eq!(tts.key_of_call(3), "k2");
    }

    #[tokio::test]
    async fn test_empty_key_list_fails_immediately_without_calls() {
        let ledger = Arc::new(FakeLedger::default());
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::failing_first(0));
        let svc = service(
            ledger.clone(),
            storage,
            tts.clone(),
            &[],
            no_pacing(),
            "unused.json",
        );

        let outcome = svc.process_word(&entry("casa")).await;

        assert_eq!(outcome, WordOutcome::Failed);
        assert_eq!(tts.call_count(), 0);
        assert_eq!(ledger.status_of("casa"), Some(AudioStatus::Failed));
    }

    #[tokio::test]
    async fn test_ledger_read_error_biases_toward_generation() {
        let ledger = Arc::new(FakeLedger {
            fail_reads: true,
            ..Default::default()
        });
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::failing_first(0));
        let svc = service(
            ledger,
            storage,
            tts.clone(),
            &["k0"],
            no_pacing(),
            "unused.json",
        );

        let outcome = svc.process_word(&entry("casa")).await;

        assert!(matches!(outcome, WordOutcome::Generated { .. }));
        assert_eq!(tts.call_count(), 1);
    }

    #[tokio::test]
    async fn test_run_aborts_on_missing_wordlist() {
        let ledger = Arc::new(FakeLedger::default());
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::failing_first(0));
        let svc = service(
            ledger,
            storage,
            tts.clone(),
            &["k0"],
            no_pacing(),
            "/definitely/not/here.json",
        );

        let result = svc.run().await;

        assert!(matches!(result, Err(CatalogError::NotFound(_))));
        assert_eq!(tts.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_applies_only_to_words_that_hit_the_provider() {
        let path =
            std::env::temp_dir().join(format!("wordaudio-pacing-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"A1": [{"G1": ["casa", "perro"]}]}"#).unwrap();

        let ledger = Arc::new(FakeLedger::with_generated("casa"));
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::always_failing());
        let svc = service(
            ledger,
            storage,
            tts.clone(),
            &["k0"],
            PacingConfig::default(),
            path.to_str().unwrap(),
        );

        let start = tokio::time::Instant::now();
        let summary = svc.run().await.unwrap();
        let elapsed = start.elapsed();

        std::fs::remove_file(&path).ok();

        assert_eq!(
            summary,
            RunSummary {
                generated: 0,
                skipped: 1,
                failed: 1,
            }
        );
        // "casa" is skipped with zero delay. "perro" exhausts 5 voices with
        // one key each: 5 x 1s key-rotation pauses, 5 x 1s voice-switch
        // pauses, then the 10s inter-word pause.
        assert_eq!(elapsed, Duration::from_secs(20));
        assert_eq!(tts.call_count(), VOICE_FALLBACK_LIMIT);
    }

    #[tokio::test]
    async fn test_run_processes_range_in_catalog_order() {
        let path =
            std::env::temp_dir().join(format!("wordaudio-order-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"A1": [{"G1": ["uno"]}, {"G2": ["dos", "tres"]}, {"G3": ["cuatro"]}]}"#,
        )
        .unwrap();

        let ledger = Arc::new(FakeLedger::default());
        let storage = Arc::new(FakeStorage::default());
        let tts = Arc::new(ScriptedTts::failing_first(0));
        // Target covers groups 1..=2 only.
        let svc = service(
            ledger,
            storage,
            tts.clone(),
            &["k0"],
            no_pacing(),
            path.to_str().unwrap(),
        );

        let summary = svc.run().await.unwrap();

        std::fs::remove_file(&path).ok();

        assert_eq!(summary.generated, 3);
        let words: Vec<String> = tts.calls.lock().iter().map(|c| c.0.clone()).collect();
        assert_eq!(words, vec!["uno", "dos", "tres"]);
    }
}
