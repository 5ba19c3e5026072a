// TTS Gateway Core Library
// Provider clients, fallback selection and response shaping

pub mod audio;
pub mod config;
pub mod formatter;
pub mod providers;
pub mod request;
pub mod selector;

// Export core types
pub use config::GatewayConfig;
pub use formatter::{FormattedAudio, VoicesResponse, MULTIPART_BOUNDARY};
pub use providers::{Provider, ProviderError, ProviderResult, VoiceListing, WordTiming};
pub use request::{SynthesisRequest, TtsRequestBody};
pub use selector::{FallbackSelector, Selection};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    ValidationError(String),

    #[error("All TTS providers failed: {0}")]
    AllProvidersFailed(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl GatewayError {
    /// True when the caller sent a bad request (maps to HTTP 400)
    pub fn is_validation(&self) -> bool {
        matches!(self, GatewayError::ValidationError(_))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
