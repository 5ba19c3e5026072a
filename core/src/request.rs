//! Synthesis request model
//!
//! `TtsRequestBody` is the JSON body accepted on the wire; `SynthesisRequest`
//! is the validated, immutable form handed to the fallback selector.

use crate::{GatewayError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_SPEED: f32 = 1.0;
pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

/// Raw `POST /tts` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TtsRequestBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub provider: Option<String>,
    /// Ask for word timings (multipart response) when the provider can produce them
    #[serde(default)]
    pub timings: bool,
}

/// Validated synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: Option<String>,
    pub language_tag: String,
    pub speed_factor: f32,
    pub provider_hint: Option<String>,
    pub timings: bool,
}

impl SynthesisRequest {
    /// Plain request with defaults for everything but the text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: None,
            language_tag: DEFAULT_LANGUAGE.to_string(),
            speed_factor: DEFAULT_SPEED,
            provider_hint: None,
            timings: false,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_tag = language.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice_id = Some(voice.into());
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed_factor = speed;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider_hint = Some(provider.into());
        self
    }

    pub fn with_timings(mut self, timings: bool) -> Self {
        self.timings = timings;
        self
    }
}

impl TryFrom<TtsRequestBody> for SynthesisRequest {
    type Error = GatewayError;

    fn try_from(body: TtsRequestBody) -> Result<Self> {
        let text = body
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GatewayError::ValidationError("Missing 'text' field".to_string()))?;

        let speed_factor = match body.speed {
            None => DEFAULT_SPEED,
            Some(s) if s.is_finite() && s > 0.0 => s.clamp(MIN_SPEED, MAX_SPEED),
            Some(s) => {
                return Err(GatewayError::ValidationError(format!(
                    "Invalid 'speed' value: {}",
                    s
                )))
            }
        };

        // "default" was the placeholder voice of older clients
        let voice_id = body
            .voice
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "default");

        let language_tag = body
            .language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let provider_hint = body
            .provider
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty());

        Ok(Self {
            text,
            voice_id,
            language_tag,
            speed_factor,
            provider_hint,
            timings: body.timings,
        })
    }
}

/// Parse a raw JSON body into a validated request
pub fn parse_request(body: &[u8]) -> Result<SynthesisRequest> {
    let body: TtsRequestBody = serde_json::from_slice(body)
        .map_err(|e| GatewayError::ValidationError(format!("Invalid JSON body: {}", e)))?;
    SynthesisRequest::try_from(body)
}
