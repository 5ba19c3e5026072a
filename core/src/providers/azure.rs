/// Azure Speech (cognitive services) provider
///
/// Synthesizes through the REST endpoint: a short-lived bearer token is issued
/// from the subscription key, then an SSML document is posted and MP3 bytes are
/// returned. Speed is expressed as an SSML prosody rate.
use super::{Provider, ProviderError, ProviderResult, VoiceListing};
use crate::request::SynthesisRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const NAME: &str = "azure";

/// Configuration for the Azure provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    pub api_key: Option<String>,
    pub region: Option<String>,
    /// Voice used when the request names none and no language default applies
    pub default_voice: String,
    /// Value of the X-Microsoft-OutputFormat header
    pub output_format: String,
    /// Timeout for each API request in milliseconds
    pub timeout_ms: u64,
    /// Override of the token endpoint (default derived from region)
    pub token_url: Option<String>,
    /// Override of the speech host, e.g. `http://127.0.0.1:9999` (default derived from region)
    pub tts_base_url: Option<String>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("AZURE_TTS_KEY").ok().filter(|s| !s.is_empty()),
            region: std::env::var("AZURE_TTS_REGION")
                .ok()
                .filter(|s| !s.is_empty()),
            default_voice: std::env::var("AZURE_TTS_VOICE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "en-US-JennyNeural".to_string()),
            output_format: "audio-16khz-32kbitrate-mono-mp3".to_string(),
            timeout_ms: std::env::var("AZURE_TTS_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15_000),
            token_url: None,
            tts_base_url: None,
        }
    }
}

/// Azure cognitive-services TTS provider
pub struct AzureProvider {
    config: AzureConfig,
    http_client: reqwest::Client,
}

impl AzureProvider {
    pub fn new(config: AzureConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    fn region(&self) -> &str {
        self.config.region.as_deref().unwrap_or_default()
    }

    fn token_url(&self) -> String {
        self.config.token_url.clone().unwrap_or_else(|| {
            format!(
                "https://{}.api.cognitive.microsoft.com/sts/v1.0/issueToken",
                self.region()
            )
        })
    }

    fn tts_base_url(&self) -> String {
        self.config
            .tts_base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://{}.tts.speech.microsoft.com", self.region()))
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured(NAME))
    }

    /// Exchange the subscription key for a bearer token
    async fn issue_token(&self) -> Result<String, ProviderError> {
        let response = self
            .http_client
            .post(self.token_url())
            .header("Ocp-Apim-Subscription-Key", self.api_key()?)
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(|e| {
                warn!(target: "azure", error = %e, "Token request failed");
                ProviderError::from_reqwest(NAME, e)
            })?;

        let response = check_status(response).await?;
        let token = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;
        if token.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: NAME,
                message: "empty access token".into(),
            });
        }
        Ok(token.trim().to_string())
    }

    fn resolve_voice(&self, request: &SynthesisRequest) -> String {
        if let Some(voice) = &request.voice_id {
            return voice.clone();
        }
        if let Some(voice) = default_voice_for(&request.language_tag) {
            return voice.to_string();
        }
        debug!(
            target: "azure",
            language = %request.language_tag,
            voice = %self.config.default_voice,
            "No neural voice mapped for language; using default voice"
        );
        self.config.default_voice.clone()
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(target: "azure", status = %status, "Azure API returned error");
    Err(ProviderError::Status {
        provider: NAME,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Provider for AzureProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some() && self.config.region.is_some()
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<ProviderResult, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured(NAME));
        }
        let token = self.issue_token().await?;
        let voice = self.resolve_voice(request);
        let ssml = build_ssml(
            &request.language_tag,
            &voice,
            request.speed_factor,
            &request.text,
        );
        debug!(target: "azure", voice = %voice, language = %request.language_tag, "Synthesizing");

        let response = self
            .http_client
            .post(format!("{}/cognitiveservices/v1", self.tts_base_url()))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", &self.config.output_format)
            .body(ssml.into_bytes())
            .send()
            .await
            .map_err(|e| {
                warn!(target: "azure", error = %e, "Synthesis request failed");
                ProviderError::from_reqwest(NAME, e)
            })?;

        let audio = check_status(response)
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
        Ok(ProviderResult::audio_only(audio))
    }

    async fn list_voices(&self) -> Result<VoiceListing, ProviderError> {
        let response = self
            .http_client
            .get(format!(
                "{}/cognitiveservices/voices/list",
                self.tts_base_url()
            ))
            .header("Ocp-Apim-Subscription-Key", self.api_key()?)
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

/// Neural voices by language tag, regional tags before primary subtags
const NEURAL_VOICES: &[(&str, &str)] = &[
    ("en-gb", "en-GB-SoniaNeural"),
    ("en-au", "en-AU-NatashaNeural"),
    ("fr-ca", "fr-CA-SylvieNeural"),
    ("es-mx", "es-MX-DaliaNeural"),
    ("pt-br", "pt-BR-FranciscaNeural"),
    ("zh-tw", "zh-TW-HsiaoChenNeural"),
    ("ar", "ar-SA-ZariyahNeural"),
    ("cs", "cs-CZ-VlastaNeural"),
    ("da", "da-DK-ChristelNeural"),
    ("de", "de-DE-KatjaNeural"),
    ("el", "el-GR-AthinaNeural"),
    ("es", "es-ES-ElviraNeural"),
    ("fi", "fi-FI-NooraNeural"),
    ("fr", "fr-FR-DeniseNeural"),
    ("hi", "hi-IN-SwaraNeural"),
    ("hu", "hu-HU-NoemiNeural"),
    ("id", "id-ID-GadisNeural"),
    ("it", "it-IT-ElsaNeural"),
    ("ja", "ja-JP-NanamiNeural"),
    ("ko", "ko-KR-SunHiNeural"),
    ("nl", "nl-NL-ColetteNeural"),
    ("pl", "pl-PL-ZofiaNeural"),
    ("pt", "pt-PT-RaquelNeural"),
    ("ro", "ro-RO-AlinaNeural"),
    ("ru", "ru-RU-SvetlanaNeural"),
    ("sv", "sv-SE-SofieNeural"),
    ("th", "th-TH-PremwadeeNeural"),
    ("tr", "tr-TR-EmelNeural"),
    ("uk", "uk-UA-PolinaNeural"),
    ("vi", "vi-VN-HoaiMyNeural"),
    ("zh", "zh-CN-XiaoxiaoNeural"),
];

/// Neural voice for a language when the request names none.
/// Matches the full tag first, then the primary subtag. English and unmapped
/// languages return `None`, which selects the configured default voice.
pub fn default_voice_for(language_tag: &str) -> Option<&'static str> {
    let normalized = language_tag.trim().to_lowercase().replace('_', "-");
    let primary = normalized.split('-').next().unwrap_or_default();
    NEURAL_VOICES
        .iter()
        .find(|(tag, _)| *tag == normalized)
        .or_else(|| NEURAL_VOICES.iter().find(|(tag, _)| *tag == primary))
        .map(|(_, voice)| *voice)
}

/// SSML prosody rate for a speed factor, e.g. 1.25 -> "+25%"
pub fn prosody_rate(speed: f32) -> String {
    let pct = ((speed - 1.0) * 100.0).round();
    // avoid "-0%"
    let pct = if pct == 0.0 { 0.0 } else { pct };
    format!("{:+.0}%", pct)
}

/// Build the SSML document posted to the synthesis endpoint
pub fn build_ssml(language: &str, voice: &str, speed: f32, text: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{}'><voice name='{}'><prosody rate='{}'>{}</prosody></voice></speak>",
        escape_xml(language),
        escape_xml(voice),
        prosody_rate(speed),
        escape_xml(text)
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
