//! MP3 encoding through an external ffmpeg binary.

use crate::providers::ProviderError;
use bytes::Bytes;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Encode a WAV file to MP3, returning the encoded bytes.
/// ffmpeg is killed if the returned future is dropped before it exits.
pub async fn encode_mp3(ffmpeg: &Path, wav_path: &Path) -> Result<Bytes, ProviderError> {
    let mut cmd = Command::new(ffmpeg);
    cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin", "-i"])
        .arg(wav_path)
        .args(["-codec:a", "libmp3lame", "-q:a", "4", "-f", "mp3", "pipe:1"])
        .stdin(Stdio::null())
        .kill_on_drop(true);

    debug!(target: "local_tts", command = ?cmd, "Running ffmpeg");
    let output = cmd.output().await?;
    if !output.status.success() {
        return Err(ProviderError::Engine(format!(
            "ffmpeg failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    if output.stdout.is_empty() {
        return Err(ProviderError::Engine("ffmpeg produced no audio".into()));
    }
    Ok(Bytes::from(output.stdout))
}
