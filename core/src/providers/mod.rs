/// Text-to-speech providers behind a shared capability trait
pub mod azure;
pub mod elevenlabs;
pub mod local;

pub use azure::{AzureConfig, AzureProvider};
pub use elevenlabs::{ElevenLabsConfig, ElevenLabsProvider};
pub use local::{LocalConfig, LocalProvider};

use crate::config::GatewayConfig;
use crate::request::SynthesisRequest;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// MIME type of every provider's audio output
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// A provider's native voice listing, passed through untouched
pub type VoiceListing = serde_json::Value;

/// One spoken word aligned within the generated audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTiming {
    pub word: String,
    pub offset_ms: i64,
    pub duration_ms: i64,
}

/// Output of a single successful provider attempt
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderResult {
    pub audio: Bytes,
    pub word_timings: Vec<WordTiming>,
}

impl ProviderResult {
    pub fn audio_only(audio: impl Into<Bytes>) -> Self {
        Self {
            audio: audio.into(),
            word_timings: Vec::new(),
        }
    }
}

/// Failure of one provider attempt; recovered by moving to the next provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} rejected voice id '{voice}'")]
    InvalidVoice {
        provider: &'static str,
        voice: String,
    },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Speech engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub(crate) fn from_reqwest(provider: &'static str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(provider)
        } else {
            ProviderError::Transport {
                provider,
                message: e.to_string(),
            }
        }
    }
}

/// Capability shared by every speech provider
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable name used in the provider order, hints and responses
    fn name(&self) -> &'static str;

    /// False when required credentials are absent; the selector skips the provider
    fn is_configured(&self) -> bool;

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> std::result::Result<ProviderResult, ProviderError>;

    async fn list_voices(&self) -> std::result::Result<VoiceListing, ProviderError>;
}

/// Build the provider chain in configured order.
/// Unknown names are ignored; the local fallback is always present and always last.
pub fn build_providers(cfg: &GatewayConfig) -> Vec<Arc<dyn Provider>> {
    let mut chain: Vec<Arc<dyn Provider>> = Vec::new();
    for name in &cfg.provider_order {
        match name.as_str() {
            azure::NAME => chain.push(Arc::new(AzureProvider::new(cfg.azure.clone()))),
            elevenlabs::NAME => {
                chain.push(Arc::new(ElevenLabsProvider::new(cfg.elevenlabs.clone())))
            }
            local::NAME => {}
            other => {
                warn!(target: "providers", provider = %other, "Unknown provider in order; ignoring");
            }
        }
    }
    chain.push(Arc::new(LocalProvider::new(cfg.local.clone())));
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_timing_uses_camel_case() {
        let t = WordTiming {
            word: "hello".into(),
            offset_ms: 10,
            duration_ms: 250,
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"word": "hello", "offsetMs": 10, "durationMs": 250})
        );
    }

    #[test]
    fn chain_keeps_order_and_ends_with_local() {
        let mut cfg = GatewayConfig::default();
        cfg.provider_order = vec!["local".into(), "elevenlabs".into(), "bogus".into()];
        let names: Vec<_> = build_providers(&cfg).iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["elevenlabs", "local"]);

        cfg.provider_order = crate::config::default_provider_order();
        let names: Vec<_> = build_providers(&cfg).iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["azure", "elevenlabs", "local"]);
    }
}
