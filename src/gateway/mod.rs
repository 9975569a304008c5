//! Payment gateway port.
//!
//! The checkout workflow talks to processors exclusively through
//! [`GatewayPort`]; which implementation backs it is decided once at process
//! startup from configuration. Handlers and services never branch on the
//! demo/live distinction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;

pub mod demo;
pub mod live;

pub use demo::DemoGateway;
pub use live::HttpGateway;

/// Charge semantics: hold funds for later capture, or capture immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeMode {
    Authorize,
    Purchase,
}

impl ChargeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ChargeMode::Authorize => "authorize",
            ChargeMode::Purchase => "purchase",
        }
    }
}

/// Outbound charge request. Amounts are in minor units; the tokenized
/// payment method stands in for card data end to end.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub payment_method_token: String,
    pub order_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub retain_on_success: bool,
}

/// Processor verdict for one attempt. `succeeded == false` is a business
/// decline, not an error; transport problems surface as [`GatewayError`].
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeOutcome {
    pub succeeded: bool,
    pub transaction_token: Option<String>,
    pub message: String,
    pub response_code: String,
    pub avs_code: Option<String>,
    pub cvv_code: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway transport failure: {0}")]
    Transport(String),
    #[error("gateway rejected credentials: {0}")]
    Credentials(String),
    #[error("gateway returned malformed response: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait GatewayPort: Send + Sync {
    /// Run a single charge attempt against the processor identified by
    /// `gateway_token`.
    async fn charge(
        &self,
        mode: ChargeMode,
        gateway_token: &str,
        request: &ChargeRequest,
    ) -> Result<ChargeOutcome, GatewayError>;
}

/// Resolve the configured gateway port. Called once from `main`; everything
/// downstream holds the trait object.
pub fn from_config(config: &AppConfig) -> Arc<dyn GatewayPort> {
    if config.gateway_demo_mode {
        Arc::new(DemoGateway::new())
    } else {
        Arc::new(HttpGateway::new(
            config.gateway_base_url.clone(),
            config.gateway_timeout(),
        ))
    }
}
