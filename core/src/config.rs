use std::fs;
use std::path::{Path, PathBuf};

use crate::providers::{AzureConfig, ElevenLabsConfig, LocalConfig};

pub const DEFAULT_PROVIDER_ORDER: [&str; 3] = ["azure", "elevenlabs", "local"];

/// Process-wide gateway configuration, loaded once at startup and shared read-only
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    /// Provider names in priority order
    pub provider_order: Vec<String>,
    pub azure: AzureConfig,
    pub elevenlabs: ElevenLabsConfig,
    pub local: LocalConfig,
}

/// HTTP listener settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TTS_GATEWAY_HOST")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: std::env::var("TTS_GATEWAY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10_000),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        // Each section's Default already considers env vars
        Self {
            server: ServerConfig::default(),
            provider_order: std::env::var("TTS_PROVIDER_ORDER")
                .ok()
                .map(|s| parse_provider_order(&s))
                .filter(|o| !o.is_empty())
                .unwrap_or_else(default_provider_order),
            azure: AzureConfig::default(),
            elevenlabs: ElevenLabsConfig::default(),
            local: LocalConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file (path via TTS_GATEWAY_CONFIG or ./tts_gateway.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let path =
            std::env::var("TTS_GATEWAY_CONFIG").unwrap_or_else(|_| "tts_gateway.toml".into());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Self {
        let default = Self::default();
        if !path.exists() {
            tracing::info!(target: "config", path = %path.display(), "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<GatewayToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target: "config", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "config", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    /// Overlay a TOML document onto the env-driven defaults
    pub fn from_toml_str(s: &str) -> crate::Result<Self> {
        let t: GatewayToml =
            toml::from_str(s).map_err(|e| crate::GatewayError::ConfigError(e.to_string()))?;
        Ok(t.overlay(Self::default()))
    }
}

pub fn default_provider_order() -> Vec<String> {
    DEFAULT_PROVIDER_ORDER.iter().map(|s| s.to_string()).collect()
}

/// Parse a comma separated provider list, lowercased, without blanks or duplicates
pub fn parse_provider_order(s: &str) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    for name in s.split(',').map(|p| p.trim().to_lowercase()) {
        if !name.is_empty() && !order.contains(&name) {
            order.push(name);
        }
    }
    order
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct GatewayToml {
    pub provider_order: Option<Vec<String>>,
    pub server: Option<ServerToml>,
    pub azure: Option<AzureToml>,
    pub elevenlabs: Option<ElevenLabsToml>,
    pub local: Option<LocalToml>,
}

impl GatewayToml {
    fn overlay(self, mut base: GatewayConfig) -> GatewayConfig {
        if let Some(o) = self.provider_order {
            let order = parse_provider_order(&o.join(","));
            if !order.is_empty() {
                base.provider_order = order;
            }
        }
        if let Some(s) = self.server {
            s.apply(&mut base.server);
        }
        if let Some(a) = self.azure {
            a.apply(&mut base.azure);
        }
        if let Some(e) = self.elevenlabs {
            e.apply(&mut base.elevenlabs);
        }
        if let Some(l) = self.local {
            l.apply(&mut base.local);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ServerToml {
    pub host: Option<String>,
    pub port: Option<u16>,
}
impl ServerToml {
    fn apply(self, s: &mut ServerConfig) {
        if let Some(x) = self.host {
            s.host = x;
        }
        if let Some(x) = self.port {
            s.port = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AzureToml {
    pub api_key: Option<String>,
    pub region: Option<String>,
    pub default_voice: Option<String>,
    pub output_format: Option<String>,
    pub timeout_ms: Option<u64>,
    pub token_url: Option<String>,
    pub tts_base_url: Option<String>,
}
impl AzureToml {
    fn apply(self, a: &mut AzureConfig) {
        if let Some(x) = self.api_key.filter(|s| !s.is_empty()) {
            a.api_key = Some(x);
        }
        if let Some(x) = self.region.filter(|s| !s.is_empty()) {
            a.region = Some(x);
        }
        if let Some(x) = self.default_voice {
            a.default_voice = x;
        }
        if let Some(x) = self.output_format {
            a.output_format = x;
        }
        if let Some(x) = self.timeout_ms {
            a.timeout_ms = x;
        }
        if let Some(x) = self.token_url {
            a.token_url = Some(x);
        }
        if let Some(x) = self.tts_base_url {
            a.tts_base_url = Some(x);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ElevenLabsToml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_voice_id: Option<String>,
    pub model_id: Option<String>,
    pub timeout_ms: Option<u64>,
}
impl ElevenLabsToml {
    fn apply(self, e: &mut ElevenLabsConfig) {
        if let Some(x) = self.api_key.filter(|s| !s.is_empty()) {
            e.api_key = Some(x);
        }
        if let Some(x) = self.base_url {
            e.base_url = x;
        }
        if let Some(x) = self.default_voice_id {
            e.default_voice_id = x;
        }
        if let Some(x) = self.model_id {
            e.model_id = x;
        }
        if let Some(x) = self.timeout_ms {
            e.timeout_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct LocalToml {
    pub espeak_bin: Option<PathBuf>,
    pub ffmpeg_bin: Option<PathBuf>,
    pub words_per_minute: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub temp_dir: Option<PathBuf>,
}
impl LocalToml {
    fn apply(self, l: &mut LocalConfig) {
        if let Some(x) = self.espeak_bin {
            l.espeak_bin = Some(x);
        }
        if let Some(x) = self.ffmpeg_bin {
            l.ffmpeg_bin = Some(x);
        }
        if let Some(x) = self.words_per_minute {
            l.words_per_minute = x.clamp(80, 450);
        }
        if let Some(x) = self.timeout_ms {
            l.timeout_ms = x;
        }
        if let Some(x) = self.temp_dir {
            l.temp_dir = x;
        }
    }
}
