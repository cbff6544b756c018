use async_trait::async_trait;

/// Repository for TTS synthesis operations.
/// Abstracts the generative provider behind a single call so the engine can
/// rotate credentials and fall back across voices without knowing transport
/// details.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Synthesize one word with a specific voice and credential.
    ///
    /// Returns raw signed 16-bit little-endian PCM at 24 kHz, mono.
    ///
    /// # Errors
    /// Any provider problem (transport, quota, malformed or missing audio
    /// payload) is an opaque error; callers drive fallback off it without
    /// inspecting the cause.
    async fn synthesize(&self, text: &str, voice: &str, api_key: &str)
        -> Result<Vec<u8>, String>;
}
