use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::tts_repository::TtsRepository;

const GEMINI_TTS_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-tts:generateContent";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl GenerateContentResponse {
    /// Base64 audio payload of the first candidate part, if any.
    fn audio_payload(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.inline_data)
            .map(|inline| inline.data)
    }
}

/// Gemini implementation of the TTS repository.
///
/// One word per request, prebuilt voice, audio-only response modality. The
/// credential travels as a query parameter, per the generativelanguage API.
pub struct GeminiTtsRepository {
    http_client: reqwest::Client,
}

impl GeminiTtsRepository {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

impl Default for GeminiTtsRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsRepository for GeminiTtsRepository {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        api_key: &str,
    ) -> Result<Vec<u8>, String> {
        let start_time = std::time::Instant::now();

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![TextPart {
                    text: text.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                },
            },
        };

        let response = self
            .http_client
            .post(format!("{}?key={}", GEMINI_TTS_URL, api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Gemini request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!("Gemini returned status {}: {}", status, error_text));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse Gemini response: {}", e))?;

        let encoded = body
            .audio_payload()
            .ok_or_else(|| "Gemini response contained no audio payload".to_string())?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| format!("failed to decode Gemini audio payload: {}", e))?;

        let duration = start_time.elapsed();
        tracing::debug!(
            provider = "gemini",
            voice,
            latency_ms = duration.as_millis() as u64,
            audio_size_bytes = audio.len(),
            "TTS synthesis completed"
        );

        Ok(audio)
    }
}
