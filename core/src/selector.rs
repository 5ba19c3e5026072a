//! Fallback selector
//!
//! Walks the provider chain in priority order and returns the first successful
//! result. Every provider gets exactly one attempt per request; failures are
//! logged and the next provider is tried. Only total exhaustion is an error.

use crate::config::GatewayConfig;
use crate::formatter::{collect_voices, VoicesResponse};
use crate::providers::{build_providers, Provider, ProviderError, ProviderResult};
use crate::request::SynthesisRequest;
use crate::{GatewayError, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Successful synthesis and the provider that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub provider: &'static str,
    pub result: ProviderResult,
}

/// Ordered provider chain; the last entry is the always-available fallback
#[derive(Clone)]
pub struct FallbackSelector {
    chain: Vec<Arc<dyn Provider>>,
}

impl FallbackSelector {
    pub fn new(chain: Vec<Arc<dyn Provider>>) -> Self {
        Self { chain }
    }

    pub fn from_config(cfg: &GatewayConfig) -> Self {
        Self::new(build_providers(cfg))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|p| p.name()).collect()
    }

    /// Name of the provider closing the chain
    pub fn fallback_name(&self) -> Option<&'static str> {
        self.chain.last().map(|p| p.name())
    }

    /// Chain for one request: the hinted provider first, the rest in priority order
    fn attempt_order(&self, hint: Option<&str>) -> Result<Vec<&Arc<dyn Provider>>> {
        let Some(hint) = hint else {
            return Ok(self.chain.iter().collect());
        };
        let first = self
            .chain
            .iter()
            .find(|p| p.name() == hint)
            .ok_or_else(|| {
                GatewayError::ValidationError(format!(
                    "Unknown provider '{}'; expected one of: {}",
                    hint,
                    self.provider_names().join(", ")
                ))
            })?;
        let mut order = vec![first];
        order.extend(self.chain.iter().filter(|p| p.name() != hint));
        Ok(order)
    }

    /// Try providers in order until one succeeds
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<Selection> {
        let order = self.attempt_order(request.provider_hint.as_deref())?;
        let mut failures: Vec<String> = Vec::new();

        for provider in order {
            let name = provider.name();
            if !provider.is_configured() {
                debug!(target: "selector", provider = %name, "Skipping unconfigured provider");
                failures.push(ProviderError::NotConfigured(name).to_string());
                continue;
            }

            let started = Instant::now();
            match provider.synthesize(request).await {
                Ok(result) if result.audio.is_empty() => {
                    warn!(target: "selector", provider = %name, "Provider returned no audio; trying next");
                    failures.push(format!("{} returned no audio", name));
                }
                Ok(result) => {
                    info!(
                        target: "selector",
                        provider = %name,
                        bytes = result.audio.len(),
                        words = result.word_timings.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Synthesis succeeded"
                    );
                    return Ok(Selection {
                        provider: name,
                        result,
                    });
                }
                Err(e) => {
                    warn!(
                        target: "selector",
                        provider = %name,
                        error = %e,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Provider failed; trying next"
                    );
                    failures.push(e.to_string());
                }
            }
        }

        if failures.is_empty() {
            return Err(GatewayError::AllProvidersFailed(
                "no providers configured".to_string(),
            ));
        }
        Err(GatewayError::AllProvidersFailed(failures.join("; ")))
    }

    /// Merge voice listings of every provider that answers
    pub async fn list_voices(&self) -> VoicesResponse {
        collect_voices(&self.chain, self.fallback_name()).await
    }
}
