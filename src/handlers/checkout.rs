use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{
    errors::ApiError,
    services::checkout::{PaymentInput, PaymentOutcome},
    services::pricing::CheckoutTotals,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payment", post(submit_payment))
        .route("/retry", post(retry_payment))
}

/// Submit the payment step of checkout
#[utoipa::path(
    post,
    path = "/api/v1/checkout/payment",
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Charge attempted; body carries paid or declined", body = PaymentResponse),
        (status = 400, description = "Validation or funnel precondition failure"),
        (status = 404, description = "Unknown customer"),
        (status = 409, description = "Concurrent payment attempt in flight"),
        (status = 500, description = "Gateway configuration or order commit failure"),
    ),
    tag = "checkout"
)]
pub async fn submit_payment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let input = payload.into_input()?;

    let outcome = state
        .services
        .checkout
        .pay(input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaymentResponse::from_outcome(
        outcome, false,
    )))
}

/// Re-attempt payment for a declined checkout
#[utoipa::path(
    post,
    path = "/api/v1/checkout/retry",
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Charge attempted; body carries paid or declined with decline_count", body = PaymentResponse),
        (status = 400, description = "Wrong funnel state or retry limit reached"),
        (status = 404, description = "Unknown customer"),
        (status = 409, description = "Concurrent payment attempt in flight"),
        (status = 500, description = "Gateway configuration or order commit failure"),
    ),
    tag = "checkout"
)]
pub async fn retry_payment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let input = payload.into_input()?;

    let outcome = state
        .services
        .checkout
        .retry(input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaymentResponse::from_outcome(
        outcome, true,
    )))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PaymentRequest {
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(min = 1, message = "payment_method_token is required"))]
    pub payment_method_token: String,
    #[serde(default = "default_card_type")]
    pub card_type: String,
    #[serde(default)]
    #[validate(length(min = 2, max = 4))]
    pub card_last_four: String,
    #[validate(range(min = 1, max = 12))]
    pub card_exp_month: i32,
    #[validate(range(min = 2000, max = 2099))]
    pub card_exp_year: i32,
    pub checkout_totals: Option<CheckoutTotals>,
}

fn default_card_type() -> String {
    "card".to_string()
}

impl PaymentRequest {
    fn into_input(self) -> Result<PaymentInput, ApiError> {
        let customer_id = self.customer_id.ok_or_else(|| ApiError::BadRequest {
            message: "customer_id is required".to_string(),
            error_code: Some("MISSING_CUSTOMER_ID".to_string()),
        })?;

        Ok(PaymentInput {
            customer_id,
            payment_method_token: self.payment_method_token,
            card_type: self.card_type,
            card_last_four: self.card_last_four,
            card_exp_month: self.card_exp_month,
            card_exp_year: self.card_exp_year,
            supplied_totals: self.checkout_totals,
        })
    }
}

/// Body for both paid and declined results. Declines are HTTP 200: an
/// expected business outcome the checkout UI renders, not an error.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub success: bool,
    pub status: String,
    pub customer_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decline_count: Option<i32>,
}

impl PaymentResponse {
    fn from_outcome(outcome: PaymentOutcome, include_decline_count: bool) -> Self {
        match outcome {
            PaymentOutcome::Paid {
                customer_id,
                order_id,
                order_number,
            } => Self {
                success: true,
                status: "paid".to_string(),
                customer_id,
                order_id: Some(order_id),
                order_number: Some(order_number),
                error: None,
                response_code: None,
                decline_count: None,
            },
            PaymentOutcome::Declined {
                customer_id,
                reason,
                response_code,
                decline_count,
            } => Self {
                success: false,
                status: "declined".to_string(),
                customer_id,
                order_id: None,
                order_number: None,
                error: Some(reason),
                response_code,
                decline_count: include_decline_count.then_some(decline_count),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_outcome_serializes_without_decline_fields() {
        let response = PaymentResponse::from_outcome(
            PaymentOutcome::Paid {
                customer_id: Uuid::nil(),
                order_id: Uuid::nil(),
                order_number: "ORD-00001001".to_string(),
            },
            false,
        );
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["status"], "paid");
        assert_eq!(value["order_number"], "ORD-00001001");
        assert!(value.get("error").is_none());
        assert!(value.get("decline_count").is_none());
    }

    #[test]
    fn declined_retry_outcome_carries_decline_count() {
        let response = PaymentResponse::from_outcome(
            PaymentOutcome::Declined {
                customer_id: Uuid::nil(),
                reason: "Declined (demo reserved card)".to_string(),
                response_code: Some("DEMO_DECLINE".to_string()),
                decline_count: 2,
            },
            true,
        );
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["status"], "declined");
        assert_eq!(value["response_code"], "DEMO_DECLINE");
        assert_eq!(value["decline_count"], 2);
        assert!(value.get("order_id").is_none());
    }

    #[test]
    fn payment_request_requires_customer_id() {
        let payload: PaymentRequest = serde_json::from_value(serde_json::json!({
            "payment_method_token": "tok_x",
            "card_last_four": "1111",
            "card_exp_month": 12,
            "card_exp_year": 2030
        }))
        .unwrap();

        assert!(payload.into_input().is_err());
    }
}
