use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use super::{ChargeMode, ChargeOutcome, ChargeRequest, GatewayError, GatewayPort};

/// Card suffixes that always decline, for exercising the decline path
/// without a processor account.
const DECLINE_SUFFIXES: &[&str] = &["0002", "0341"];

/// Network-free gateway for demos and tests. Tokens whose trailing four
/// digits are on the reserved list decline; everything else approves.
#[derive(Debug, Default, Clone)]
pub struct DemoGateway;

impl DemoGateway {
    pub fn new() -> Self {
        Self
    }

    fn fabricate_token() -> String {
        let nonce: u64 = rand::thread_rng().gen();
        format!("demo_{:016x}", nonce)
    }
}

#[async_trait]
impl GatewayPort for DemoGateway {
    async fn charge(
        &self,
        mode: ChargeMode,
        _gateway_token: &str,
        request: &ChargeRequest,
    ) -> Result<ChargeOutcome, GatewayError> {
        let suffix: String = request
            .payment_method_token
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        if DECLINE_SUFFIXES.contains(&suffix.as_str()) {
            info!(
                mode = mode.as_str(),
                amount_cents = request.amount_cents,
                "demo gateway declining reserved card suffix"
            );
            return Ok(ChargeOutcome {
                succeeded: false,
                transaction_token: None,
                message: "Declined (demo reserved card)".to_string(),
                response_code: "DEMO_DECLINE".to_string(),
                avs_code: Some("N".to_string()),
                cvv_code: Some("N".to_string()),
            });
        }

        info!(
            mode = mode.as_str(),
            amount_cents = request.amount_cents,
            "demo gateway approving charge"
        );
        Ok(ChargeOutcome {
            succeeded: true,
            transaction_token: Some(Self::fabricate_token()),
            message: "Approved".to_string(),
            response_code: "00".to_string(),
            avs_code: Some("Y".to_string()),
            cvv_code: Some("M".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(token: &str) -> ChargeRequest {
        ChargeRequest {
            amount_cents: 3_499,
            currency: "USD".to_string(),
            payment_method_token: token.to_string(),
            order_ref: "ref-1".to_string(),
            description: None,
            email: None,
            ip: None,
            retain_on_success: true,
        }
    }

    #[tokio::test]
    async fn reserved_suffix_declines_with_demo_code() {
        let gateway = DemoGateway::new();
        let outcome = gateway
            .charge(ChargeMode::Purchase, "gw_test", &request("tok_4000000000000002"))
            .await
            .unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.response_code, "DEMO_DECLINE");
        assert!(outcome.transaction_token.is_none());
    }

    #[tokio::test]
    async fn other_suffixes_approve_with_transaction_token() {
        let gateway = DemoGateway::new();
        let outcome = gateway
            .charge(ChargeMode::Authorize, "gw_test", &request("tok_4111111111111111"))
            .await
            .unwrap();

        assert!(outcome.succeeded);
        assert!(outcome.transaction_token.unwrap().starts_with("demo_"));
        assert_eq!(outcome.response_code, "00");
    }

    #[tokio::test]
    async fn short_tokens_fall_through_to_approval() {
        let gateway = DemoGateway::new();
        let outcome = gateway
            .charge(ChargeMode::Purchase, "gw_test", &request("ab"))
            .await
            .unwrap();

        assert!(outcome.succeeded);
    }
}
