//! Response formatter
//!
//! Normalizes provider output into what HTTP callers receive: raw MP3 bytes,
//! a two-part multipart body (word timings, then audio), or the merged voice
//! listing.

use crate::providers::{Provider, ProviderResult, VoiceListing, WordTiming, AUDIO_MPEG};
use crate::Result;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed boundary token shared with clients
pub const MULTIPART_BOUNDARY: &str = "ttsboundary";

pub const MULTIPART_CONTENT_TYPE: &str = "multipart/mixed; boundary=ttsboundary";

/// Body of `GET /voices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicesResponse {
    pub default: Option<String>,
    pub providers: BTreeMap<String, VoiceListing>,
}

/// A synthesized response body and its content type
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedAudio {
    pub content_type: &'static str,
    pub body: Bytes,
}

/// Query every configured provider in chain order and keep the ones that answer.
/// `default` is the first provider that answered, else `fallback`.
pub async fn collect_voices(
    chain: &[Arc<dyn Provider>],
    fallback: Option<&'static str>,
) -> VoicesResponse {
    let mut default = None;
    let mut providers = BTreeMap::new();

    for provider in chain {
        let name = provider.name();
        if !provider.is_configured() {
            debug!(target: "formatter", provider = %name, "Skipping unconfigured provider for voices");
            continue;
        }
        match provider.list_voices().await {
            Ok(listing) => {
                if default.is_none() {
                    default = Some(name.to_string());
                }
                providers.insert(name.to_string(), listing);
            }
            Err(e) => {
                warn!(target: "formatter", provider = %name, error = %e, "Voice listing failed; omitting provider");
            }
        }
    }

    VoicesResponse {
        default: default.or_else(|| fallback.map(str::to_string)),
        providers,
    }
}

/// Shape a provider result into a response body.
/// Timed mode only applies when timings were requested and the provider produced some.
pub fn format_synthesis(timings_requested: bool, result: ProviderResult) -> Result<FormattedAudio> {
    if timings_requested && !result.word_timings.is_empty() {
        return Ok(FormattedAudio {
            content_type: MULTIPART_CONTENT_TYPE,
            body: encode_multipart(&result.word_timings, &result.audio)?,
        });
    }
    Ok(FormattedAudio {
        content_type: AUDIO_MPEG,
        body: result.audio,
    })
}

/// Two parts in fixed order: JSON word timings, then the audio bytes.
/// The JSON part is written completely before the audio part starts.
pub fn encode_multipart(timings: &[WordTiming], audio: &[u8]) -> Result<Bytes> {
    let json = serde_json::to_vec(timings)?;
    let mut buf = BytesMut::with_capacity(json.len() + audio.len() + 256);

    write_part(&mut buf, "application/json", &json);
    write_part(&mut buf, AUDIO_MPEG, audio);
    buf.put_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    Ok(buf.freeze())
}

fn write_part(buf: &mut BytesMut, content_type: &str, body: &[u8]) {
    buf.put_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    buf.put_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    buf.put_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
    buf.put_slice(body);
    buf.put_slice(b"\r\n");
}
