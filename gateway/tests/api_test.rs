/// HTTP-level tests driving the gateway router with mocked providers
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tts_gateway::{router, GatewayState, PROVIDER_HEADER};
use tts_gateway_core::providers::{MockProvider, Provider, ProviderError, ProviderResult};
use tts_gateway_core::{FallbackSelector, WordTiming};

fn app(chain: Vec<Arc<dyn Provider>>) -> Router {
    router(GatewayState::new(FallbackSelector::new(chain)))
}

fn provider(name: &'static str) -> MockProvider {
    let mut p = MockProvider::new();
    p.expect_name().return_const(name);
    p.expect_is_configured().return_const(true);
    p
}

fn succeeding(name: &'static str, audio: &'static [u8], calls: usize) -> Arc<dyn Provider> {
    let mut p = provider(name);
    p.expect_synthesize()
        .times(calls)
        .returning(move |_| Ok(ProviderResult::audio_only(Bytes::from_static(audio))));
    Arc::new(p)
}

fn failing(name: &'static str, calls: usize) -> Arc<dyn Provider> {
    let mut p = provider(name);
    p.expect_synthesize()
        .times(calls)
        .returning(move |_| Err(ProviderError::Timeout(name)));
    Arc::new(p)
}

fn untouched(name: &'static str) -> Arc<dyn Provider> {
    let mut p = provider(name);
    p.expect_synthesize().never();
    p.expect_list_voices().never();
    Arc::new(p)
}

async fn post_tts(app: Router, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/tts")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(resp: Response) -> Bytes {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap()
}

async fn body_json(resp: Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn content_type(resp: &Response) -> String {
    resp.headers()["content-type"].to_str().unwrap().to_string()
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_missing_text_is_400_without_provider_calls() {
        let app = app(vec![untouched("azure"), untouched("local")]);
        let resp = post_tts(app, json!({"voice": "x"})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({"error": "Missing 'text' field"}));
    }

    #[tokio::test]
    async fn test_empty_text_is_400() {
        let app = app(vec![untouched("azure"), untouched("local")]);
        let resp = post_tts(app, json!({"text": ""})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Missing 'text' field");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let app = app(vec![untouched("local")]);
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tts")
                    .body(Body::from("{text:"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err = body_json(resp).await;
        assert!(err["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }

    #[tokio::test]
    async fn test_unknown_provider_hint_is_400() {
        let app = app(vec![untouched("azure"), untouched("local")]);
        let resp = post_tts(app, json!({"text": "hi", "provider": "polly"})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

mod fallback {
    use super::*;

    #[tokio::test]
    async fn test_first_success_skips_the_rest() {
        let app = app(vec![
            succeeding("azure", b"azure-audio", 1),
            untouched("elevenlabs"),
            untouched("local"),
        ]);
        let resp = post_tts(app, json!({"text": "hello"})).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), "audio/mpeg");
        assert_eq!(resp.headers()[PROVIDER_HEADER], "azure");
        assert_eq!(&body_bytes(resp).await[..], b"azure-audio");
    }

    #[tokio::test]
    async fn test_second_provider_output_is_returned_verbatim() {
        let app = app(vec![
            failing("azure", 1),
            succeeding("elevenlabs", b"eleven-audio", 1),
            untouched("local"),
        ]);
        let resp = post_tts(app, json!({"text": "hello"})).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[PROVIDER_HEADER], "elevenlabs");
        assert_eq!(&body_bytes(resp).await[..], b"eleven-audio");
    }

    #[tokio::test]
    async fn test_local_fallback_for_supported_languages() {
        for language in ["en", "vi", "fr"] {
            let mut local = provider("local");
            local
                .expect_synthesize()
                .withf(move |req| req.language_tag == language)
                .times(1)
                .returning(|_| Ok(ProviderResult::audio_only(Bytes::from_static(b"local-mp3"))));

            let app = app(vec![failing("azure", 1), failing("elevenlabs", 1), Arc::new(local)]);
            let resp = post_tts(app, json!({"text": "hello", "language": language})).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(content_type(&resp), "audio/mpeg");
            assert_eq!(resp.headers()[PROVIDER_HEADER], "local");
            assert_eq!(&body_bytes(resp).await[..], b"local-mp3");
        }
    }

    #[tokio::test]
    async fn test_total_exhaustion_is_500() {
        let app = app(vec![failing("azure", 1), failing("local", 1)]);
        let resp = post_tts(app, json!({"text": "hello"})).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = body_json(resp).await;
        let msg = err["error"].as_str().unwrap();
        assert!(msg.starts_with("All TTS providers failed"));
        assert!(msg.contains("azure timed out"));
    }

    #[tokio::test]
    async fn test_hint_is_tried_first() {
        let app = app(vec![
            untouched("azure"),
            succeeding("elevenlabs", b"eleven-audio", 1),
            untouched("local"),
        ]);
        let resp = post_tts(app, json!({"text": "hello", "provider": "ElevenLabs"})).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[PROVIDER_HEADER], "elevenlabs");
    }
}

mod timed {
    use super::*;

    fn timed_provider(words: usize, audio: &'static [u8]) -> Arc<dyn Provider> {
        let mut p = provider("elevenlabs");
        p.expect_synthesize().times(1).returning(move |req| {
            let word_timings = if req.timings {
                (0..words)
                    .map(|i| WordTiming {
                        word: format!("w{i}"),
                        offset_ms: i as i64 * 400,
                        duration_ms: 350,
                    })
                    .collect()
            } else {
                Vec::new()
            };
            Ok(ProviderResult {
                audio: Bytes::from_static(audio),
                word_timings,
            })
        });
        Arc::new(p)
    }

    /// Split a `ttsboundary` multipart body into (headers, payload) pairs
    fn split_parts(body: &[u8]) -> Vec<(String, Vec<u8>)> {
        let delim = b"--ttsboundary\r\n";
        let mut parts = Vec::new();
        let mut rest = body;
        while rest.starts_with(delim) {
            rest = &rest[delim.len()..];
            let end = rest.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
            let headers = String::from_utf8_lossy(&rest[..end]).to_string();
            rest = &rest[end + 4..];
            let len: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("Content-Length: "))
                .unwrap()
                .trim()
                .parse()
                .unwrap();
            parts.push((headers, rest[..len].to_vec()));
            rest = &rest[len + 2..];
        }
        assert_eq!(rest, b"--ttsboundary--\r\n");
        parts
    }

    #[tokio::test]
    async fn test_multipart_response() {
        let audio: &'static [u8] = b"\xff\xfb--ttsboundary-inside-audio\r\n";
        let app = app(vec![timed_provider(4, audio), untouched("local")]);
        let resp = post_tts(app, json!({"text": "one two three four", "timings": true})).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), "multipart/mixed; boundary=ttsboundary");

        let parts = split_parts(&body_bytes(resp).await);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].0.contains("Content-Type: application/json"));
        assert!(parts[1].0.contains("Content-Type: audio/mpeg"));

        let words: Vec<Value> = serde_json::from_slice(&parts[0].1).unwrap();
        assert_eq!(words.len(), 4);
        assert_eq!(words[1], json!({"word": "w1", "offsetMs": 400, "durationMs": 350}));
        assert_eq!(parts[1].1.len(), audio.len());
    }

    #[tokio::test]
    async fn test_without_timings_flag_audio_is_plain() {
        let app = app(vec![timed_provider(4, b"mp3"), untouched("local")]);
        let resp = post_tts(app, json!({"text": "one two"})).await;
        assert_eq!(content_type(&resp), "audio/mpeg");
        assert_eq!(&body_bytes(resp).await[..], b"mp3");
    }
}

mod voices {
    use super::*;

    fn listing(name: &'static str, result: Option<Value>) -> Arc<dyn Provider> {
        let mut p = provider(name);
        p.expect_synthesize().never();
        p.expect_list_voices().times(1).returning(move || match &result {
            Some(v) => Ok(v.clone()),
            None => Err(ProviderError::Status {
                provider: name,
                status: 401,
                body: String::new(),
            }),
        });
        Arc::new(p)
    }

    #[tokio::test]
    async fn test_failed_providers_are_omitted() {
        let app = app(vec![
            listing("azure", None),
            listing("elevenlabs", Some(json!({"voices": [{"voice_id": "a"}]}))),
            listing("local", Some(json!({"en": "English"}))),
        ]);
        let resp = get(app, "/voices").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["default"], "elevenlabs");
        assert!(body["providers"].get("azure").is_none());
        assert_eq!(body["providers"]["local"]["en"], "English");
    }

    #[tokio::test]
    async fn test_all_failing_defaults_to_local() {
        let app = app(vec![listing("azure", None), listing("local", None)]);
        let resp = get(app, "/api/voices").await;
        assert_eq!(
            body_json(resp).await,
            json!({"default": "local", "providers": {}})
        );
    }
}

#[tokio::test]
async fn test_healthcheck() {
    let resp = get(app(vec![untouched("local")]), "/healthcheck").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"OK");
}
