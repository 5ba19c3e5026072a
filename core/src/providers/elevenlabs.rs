/// ElevenLabs voice-cloning provider
///
/// Plain requests hit `/v1/text-to-speech/{voice}` and get MP3 bytes back.
/// Requests asking for timings use the `with-timestamps` variant, whose
/// character alignment is folded into word timings.
use super::{Provider, ProviderError, ProviderResult, VoiceListing, WordTiming};
use crate::request::SynthesisRequest;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

pub const NAME: &str = "elevenlabs";

/// Speed range accepted by the API's voice settings
const MIN_SPEED: f32 = 0.7;
const MAX_SPEED: f32 = 1.2;

/// Configuration for the ElevenLabs provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    /// API host (default: https://api.elevenlabs.io)
    pub base_url: String,
    pub default_voice_id: String,
    pub model_id: String,
    /// Timeout for API requests in milliseconds
    pub timeout_ms: u64,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ELEVENLABS_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            base_url: std::env::var("ELEVENLABS_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://api.elevenlabs.io".to_string()),
            default_voice_id: std::env::var("ELEVENLABS_VOICE_ID")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "21m00Tcm4TlvDq8EAC6e".to_string()),
            model_id: std::env::var("ELEVENLABS_MODEL_ID")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "eleven_multilingual_v2".to_string()),
            timeout_ms: std::env::var("ELEVENLABS_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(20_000),
        }
    }
}

/// Response of the `with-timestamps` endpoint
#[derive(Debug, Deserialize)]
struct TimestampedResponse {
    audio_base64: String,
    alignment: Option<Alignment>,
}

/// Per-character alignment as returned by the API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Alignment {
    pub characters: Vec<String>,
    pub character_start_times_seconds: Vec<f64>,
    pub character_end_times_seconds: Vec<f64>,
}

/// ElevenLabs TTS provider
pub struct ElevenLabsProvider {
    config: ElevenLabsConfig,
    http_client: reqwest::Client,
}

impl ElevenLabsProvider {
    pub fn new(config: ElevenLabsConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured(NAME))
    }

    fn payload(&self, request: &SynthesisRequest) -> serde_json::Value {
        json!({
            "text": request.text,
            "model_id": self.config.model_id,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.5,
                "style": 0.0,
                "use_speaker_boost": true,
                "speed": request.speed_factor.clamp(MIN_SPEED, MAX_SPEED),
            }
        })
    }

    async fn post(
        &self,
        path: &str,
        request: &SynthesisRequest,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http_client
            .post(self.url(path))
            .header("xi-api-key", self.api_key()?)
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|e| {
                warn!(target: "elevenlabs", error = %e, "Synthesis request failed");
                ProviderError::from_reqwest(NAME, e)
            })?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(target: "elevenlabs", status = %status, "ElevenLabs API returned error");
    Err(ProviderError::Status {
        provider: NAME,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Provider for ElevenLabsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<ProviderResult, ProviderError> {
        let voice = request
            .voice_id
            .as_deref()
            .unwrap_or(&self.config.default_voice_id);
        if !is_valid_voice_id(voice) {
            return Err(ProviderError::InvalidVoice {
                provider: NAME,
                voice: voice.to_string(),
            });
        }
        debug!(target: "elevenlabs", voice = %voice, timings = request.timings, "Synthesizing");

        if !request.timings {
            let audio = self
                .post(&format!("text-to-speech/{}", voice), request)
                .await?
                .bytes()
                .await
                .map_err(|e| ProviderError::from_reqwest(NAME, e))?;
            if audio.is_empty() {
                return Err(ProviderError::InvalidResponse {
                    provider: NAME,
                    message: "empty audio body".into(),
                });
            }
            return Ok(ProviderResult::audio_only(audio));
        }

        let body: TimestampedResponse = self
            .post(&format!("text-to-speech/{}/with-timestamps", voice), request)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                provider: NAME,
                message: e.to_string(),
            })?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(body.audio_base64.as_bytes())
            .map_err(|e| ProviderError::InvalidResponse {
                provider: NAME,
                message: format!("audio_base64: {}", e),
            })?;
        let word_timings = body
            .alignment
            .map(|a| words_from_alignment(&a))
            .unwrap_or_default();

        Ok(ProviderResult {
            audio: audio.into(),
            word_timings,
        })
    }

    async fn list_voices(&self) -> Result<VoiceListing, ProviderError> {
        let response = self
            .http_client
            .get(self.url("voices"))
            .header("xi-api-key", self.api_key()?)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

        check_status(response)
            .await?
            .json::<VoiceListing>()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                provider: NAME,
                message: e.to_string(),
            })
    }
}

/// Voice ids are interpolated into the request path; only plain id characters are allowed
pub fn is_valid_voice_id(voice: &str) -> bool {
    !voice.is_empty()
        && voice
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Group character alignment into whitespace separated words
pub fn words_from_alignment(alignment: &Alignment) -> Vec<WordTiming> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0.0f64;
    let mut end = 0.0f64;

    let n = alignment
        .characters
        .len()
        .min(alignment.character_start_times_seconds.len())
        .min(alignment.character_end_times_seconds.len());

    for i in 0..n {
        let ch = &alignment.characters[i];
        if ch.trim().is_empty() {
            flush_word(&mut words, &mut current, start, end);
            continue;
        }
        if current.is_empty() {
            start = alignment.character_start_times_seconds[i];
        }
        current.push_str(ch);
        end = alignment.character_end_times_seconds[i];
    }
    flush_word(&mut words, &mut current, start, end);
    words
}

fn flush_word(words: &mut Vec<WordTiming>, current: &mut String, start: f64, end: f64) {
    if current.is_empty() {
        return;
    }
    let offset_ms = (start * 1000.0).round() as i64;
    let end_ms = (end * 1000.0).round() as i64;
    words.push(WordTiming {
        word: std::mem::take(current),
        offset_ms,
        duration_ms: (end_ms - offset_ms).max(0),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(text: &str, step: f64) -> Alignment {
        let characters: Vec<String> = text.chars().map(|c| c.to_string()).collect();
        let starts = (0..characters.len()).map(|i| i as f64 * step).collect();
        let ends = (0..characters.len()).map(|i| (i + 1) as f64 * step).collect();
        Alignment {
            characters,
            character_start_times_seconds: starts,
            character_end_times_seconds: ends,
        }
    }

    #[test]
    fn alignment_groups_words() {
        let words = words_from_alignment(&alignment("hi there", 0.1));
        assert_eq!(
            words,
            vec![
                WordTiming {
                    word: "hi".into(),
                    offset_ms: 0,
                    duration_ms: 200
                },
                WordTiming {
                    word: "there".into(),
                    offset_ms: 300,
                    duration_ms: 500
                },
            ]
        );
    }

    #[test]
    fn alignment_skips_repeated_whitespace() {
        let words = words_from_alignment(&alignment("  a   b ", 0.05));
        let names: Vec<_> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn empty_alignment_yields_no_words() {
        assert!(words_from_alignment(&Alignment::default()).is_empty());
    }

    #[test]
    fn payload_clamps_speed() {
        let p = ElevenLabsProvider::new(ElevenLabsConfig {
            api_key: Some("xi".into()),
            ..ElevenLabsConfig::default()
        });
        let body = p.payload(&SynthesisRequest::new("hello").with_speed(2.0));
        assert_eq!(body["text"], "hello");
        assert_eq!(body["voice_settings"]["speed"].as_f64(), Some(1.2f32 as f64));
        assert_eq!(body["voice_settings"]["use_speaker_boost"], true);
    }

    #[test]
    fn voice_id_charset() {
        assert!(is_valid_voice_id("21m00Tcm4TlvDq8EAC6e"));
        assert!(is_valid_voice_id("my_voice-2"));
        assert!(!is_valid_voice_id(""));
        assert!(!is_valid_voice_id("../voices"));
        assert!(!is_valid_voice_id("abc?output_format=pcm_16000"));
        assert!(!is_valid_voice_id("abc#frag"));
        assert!(!is_valid_voice_id("a%2Fb"));
    }

    #[test]
    fn configured_only_with_key() {
        let mut cfg = ElevenLabsConfig::default();
        cfg.api_key = None;
        assert!(!ElevenLabsProvider::new(cfg.clone()).is_configured());
        cfg.api_key = Some("xi".into());
        assert!(ElevenLabsProvider::new(cfg).is_configured());
    }
}
