/// Local offline fallback provider
///
/// Synthesizes with espeak-ng into a temporary WAV, applies the playback-rate
/// step when the request asks for a speed other than 1.0, then encodes MP3
/// with ffmpeg. Needs no credentials, so it always closes the fallback chain.
/// Engine processes are killed when the attempt times out.
///
/// Env overrides:
/// - ESPEAK_BIN, FFMPEG_BIN
/// - LOCAL_TTS_WPM, LOCAL_TTS_TIMEOUT_MS, LOCAL_TTS_TEMP_DIR
use super::{Provider, ProviderError, ProviderResult, VoiceListing};
use crate::audio::utils::{gen_id, get_from_env_or_path, get_from_path, TempFile};
use crate::audio::{adjust_playback_rate, encode_mp3};
use crate::request::SynthesisRequest;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

pub const NAME: &str = "local";

/// Language code, espeak-ng voice, display name
const SUPPORTED_LANGUAGES: &[(&str, &str, &str)] = &[
    ("af", "af", "Afrikaans"),
    ("ar", "ar", "Arabic"),
    ("bg", "bg", "Bulgarian"),
    ("bn", "bn", "Bengali"),
    ("ca", "ca", "Catalan"),
    ("cs", "cs", "Czech"),
    ("da", "da", "Danish"),
    ("de", "de", "German"),
    ("el", "el", "Greek"),
    ("en", "en", "English"),
    ("en-gb", "en-gb", "English (UK)"),
    ("en-us", "en-us", "English (US)"),
    ("es", "es", "Spanish"),
    ("et", "et", "Estonian"),
    ("fi", "fi", "Finnish"),
    ("fr", "fr", "French"),
    ("hi", "hi", "Hindi"),
    ("hr", "hr", "Croatian"),
    ("hu", "hu", "Hungarian"),
    ("id", "id", "Indonesian"),
    ("it", "it", "Italian"),
    ("ja", "ja", "Japanese"),
    ("ko", "ko", "Korean"),
    ("nl", "nl", "Dutch"),
    ("pl", "pl", "Polish"),
    ("pt", "pt", "Portuguese"),
    ("pt-br", "pt-br", "Portuguese (Brazil)"),
    ("ro", "ro", "Romanian"),
    ("ru", "ru", "Russian"),
    ("sk", "sk", "Slovak"),
    ("sv", "sv", "Swedish"),
    ("ta", "ta", "Tamil"),
    ("tr", "tr", "Turkish"),
    ("uk", "uk", "Ukrainian"),
    ("vi", "vi", "Vietnamese"),
    ("zh", "cmn", "Chinese (Mandarin)"),
];

#[derive(Clone, Debug)]
pub struct LocalConfig {
    pub espeak_bin: Option<PathBuf>,
    pub ffmpeg_bin: Option<PathBuf>,
    /// espeak-ng speaking rate at speed 1.0
    pub words_per_minute: u32,
    pub timeout_ms: u64,
    pub temp_dir: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            espeak_bin: get_from_env_or_path("ESPEAK_BIN", "espeak-ng")
                .or_else(|| get_from_path("espeak")),
            ffmpeg_bin: get_from_env_or_path("FFMPEG_BIN", "ffmpeg"),
            words_per_minute: std::env::var("LOCAL_TTS_WPM")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .map(|v| v.clamp(80, 450))
                .unwrap_or(160),
            timeout_ms: std::env::var("LOCAL_TTS_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(20_000),
            temp_dir: std::env::var("LOCAL_TTS_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
        }
    }
}

/// espeak-ng + ffmpeg provider
pub struct LocalProvider {
    cfg: LocalConfig,
}

impl LocalProvider {
    pub fn new(cfg: LocalConfig) -> Self {
        // Log detected engines once
        match &cfg.espeak_bin {
            Some(p) => info!(target: "local_tts", bin = ?p, "Detected espeak-ng binary"),
            None => warn!(target: "local_tts", "espeak-ng not found; local fallback will fail"),
        }
        match &cfg.ffmpeg_bin {
            Some(p) => info!(target: "local_tts", bin = ?p, "Detected ffmpeg binary"),
            None => warn!(target: "local_tts", "ffmpeg not found; local fallback will fail"),
        }
        Self { cfg }
    }
}

/// Resolve a language tag to an espeak-ng voice: full tag first, then primary subtag
pub fn resolve_language(tag: &str) -> Result<&'static str, ProviderError> {
    let normalized = tag.trim().to_lowercase().replace('_', "-");
    let primary = normalized.split('-').next().unwrap_or_default();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(code, _, _)| *code == normalized)
        .or_else(|| SUPPORTED_LANGUAGES.iter().find(|(code, _, _)| *code == primary))
        .map(|(_, voice, _)| *voice)
        .ok_or_else(|| ProviderError::UnsupportedLanguage(tag.to_string()))
}

/// Static listing of supported language codes and names
pub fn supported_languages() -> VoiceListing {
    let map: serde_json::Map<String, serde_json::Value> = SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, _, name)| (code.to_string(), serde_json::Value::from(*name)))
        .collect();
    serde_json::Value::Object(map)
}

#[async_trait]
impl Provider for LocalProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<ProviderResult, ProviderError> {
        let voice = resolve_language(&request.language_tag)?;
        let espeak = self
            .cfg
            .espeak_bin
            .clone()
            .ok_or_else(|| ProviderError::Engine("espeak-ng binary not found".into()))?;
        let ffmpeg = self
            .cfg
            .ffmpeg_bin
            .clone()
            .ok_or_else(|| ProviderError::Engine("ffmpeg binary not found".into()))?;

        let wav = TempFile(self.cfg.temp_dir.join(format!("tts_{}.wav", gen_id())));
        let speed = request.speed_factor;
        let wpm = self.cfg.words_per_minute;

        debug!(target: "local_tts", voice = %voice, speed = %speed, "Synthesizing");
        let pipeline = async {
            synth_with_espeak(&espeak, voice, wpm, &request.text, &wav.0).await?;
            let raw = Bytes::from(tokio::fs::read(&wav.0).await?);
            let input = raw.clone();
            let adjusted = task::spawn_blocking(move || adjust_playback_rate(input, speed))
                .await
                .map_err(|e| ProviderError::Engine(format!("resample task failed: {}", e)))??;
            if adjusted != raw {
                tokio::fs::write(&wav.0, &adjusted).await?;
            }
            encode_mp3(&ffmpeg, &wav.0).await
        };

        // Dropping the pipeline on timeout kills any running engine process
        match timeout(Duration::from_millis(self.cfg.timeout_ms), pipeline).await {
            Ok(audio) => audio.map(ProviderResult::audio_only),
            Err(_) => {
                warn!(target: "local_tts", timeout_ms = self.cfg.timeout_ms, "Local synthesis timed out");
                Err(ProviderError::Timeout(NAME))
            }
        }
    }

    async fn list_voices(&self) -> Result<VoiceListing, ProviderError> {
        Ok(supported_languages())
    }
}

async fn synth_with_espeak(
    espeak: &Path,
    voice: &str,
    wpm: u32,
    text: &str,
    out_wav: &Path,
) -> Result<(), ProviderError> {
    let mut cmd = Command::new(espeak);
    cmd.arg("-v").arg(voice);
    cmd.arg("-s").arg(wpm.to_string());
    // UTF-8 input read from stdin
    cmd.arg("-b").arg("1");
    cmd.arg("--stdin");
    cmd.arg("-w").arg(out_wav);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    debug!(target: "local_tts", command = ?cmd, "Running espeak-ng");
    let mut child = cmd.spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).await?;
    }
    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(ProviderError::Engine(format!(
            "espeak-ng failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}
