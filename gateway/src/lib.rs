use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use tts_gateway_core::{FallbackSelector, GatewayConfig};

mod api;

pub use api::{router, ApiError, PROVIDER_HEADER};

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct GatewayState {
    pub selector: Arc<FallbackSelector>,
}

impl GatewayState {
    pub fn new(selector: FallbackSelector) -> Self {
        Self {
            selector: Arc::new(selector),
        }
    }

    pub fn from_config(cfg: &GatewayConfig) -> Self {
        Self::new(FallbackSelector::from_config(cfg))
    }
}

/// Bind the configured address and serve until the process stops
pub async fn start_server(cfg: &GatewayConfig) -> Result<()> {
    let state = GatewayState::from_config(cfg);
    let addr = cfg.server.addr();

    info!(
        target: "gateway",
        addr = %addr,
        providers = ?state.selector.provider_names(),
        "Starting TTS gateway"
    );

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(target: "gateway", url = %format!("http://{}", addr), "TTS gateway ready");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
