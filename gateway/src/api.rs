// Gateway HTTP API
//
// Voices listing, synthesis and health endpoints

use crate::GatewayState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tts_gateway_core::formatter::format_synthesis;
use tts_gateway_core::request::parse_request;
use tts_gateway_core::{GatewayError, VoicesResponse};

/// Response header naming the provider that produced the audio
pub const PROVIDER_HEADER: &str = "x-tts-provider";

/// Error body returned to HTTP callers
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Build the gateway router
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/voices", get(voices_handler))
        .route("/api/voices", get(voices_handler))
        .route("/tts", post(tts_handler))
        .route("/api/tts", post(tts_handler))
        .route("/healthcheck", get(healthcheck_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([header::HeaderName::from_static(PROVIDER_HEADER)]),
        )
        .with_state(state)
}

async fn healthcheck_handler() -> &'static str {
    "OK"
}

/// Merged voice listings of every provider that answers
async fn voices_handler(State(state): State<GatewayState>) -> Json<VoicesResponse> {
    let voices = state.selector.list_voices().await;
    info!(
        target: "gateway",
        default = ?voices.default,
        providers = voices.providers.len(),
        "Voices listed"
    );
    Json(voices)
}

/// Synthesize speech with the first provider that succeeds
async fn tts_handler(
    State(state): State<GatewayState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = parse_request(&body).map_err(|e| {
        warn!(target: "gateway", error = %e, "Rejected TTS request");
        e
    })?;
    info!(
        target: "gateway",
        chars = request.text.chars().count(),
        language = %request.language_tag,
        speed = request.speed_factor,
        hint = ?request.provider_hint,
        timings = request.timings,
        "TTS request"
    );

    let selection = state.selector.synthesize(&request).await.map_err(|e| {
        if !e.is_validation() {
            error!(target: "gateway", error = %e, "TTS request failed");
        }
        e
    })?;
    let formatted = format_synthesis(request.timings, selection.result)?;

    let mut response = (StatusCode::OK, formatted.body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(formatted.content_type),
    );
    headers.insert(PROVIDER_HEADER, HeaderValue::from_static(selection.provider));
    Ok(response)
}
