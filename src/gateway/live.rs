use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{error, warn};

use super::{ChargeMode, ChargeOutcome, ChargeRequest, GatewayError, GatewayPort};

/// JSON gateway client. One POST per attempt with a bounded timeout; a
/// timeout or wire failure is reported as a transport error and handled by
/// the caller as a decline, never left pending.
pub struct HttpGateway {
    http: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client construction cannot fail with static config");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GatewayPort for HttpGateway {
    async fn charge(
        &self,
        mode: ChargeMode,
        gateway_token: &str,
        request: &ChargeRequest,
    ) -> Result<ChargeOutcome, GatewayError> {
        let url = format!("{}/v1/charges/{}", self.base_url, mode.as_str());

        let response = self
            .http
            .post(&url)
            .bearer_auth(gateway_token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!(url = %url, "gateway charge timed out");
                    GatewayError::Transport(format!("timeout: {}", e))
                } else {
                    error!(url = %url, error = %e, "gateway charge transport failure");
                    GatewayError::Transport(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GatewayError::Credentials(format!(
                    "processor rejected credentials ({})",
                    response.status()
                )));
            }
            status if status.is_server_error() => {
                return Err(GatewayError::Transport(format!(
                    "processor unavailable ({})",
                    status
                )));
            }
            _ => {}
        }

        response
            .json::<ChargeOutcome>()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))
    }
}
