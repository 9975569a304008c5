//! Integration tests for the checkout payment flow: approval commit
//! cascade, decline bookkeeping, funnel preconditions, and gateway mode
//! selection, all against the demo gateway over in-memory SQLite.

mod common;

use axum::http::StatusCode;
use common::{expect_status, TestApp};
use funnelcrm_api::entities::{
    address, campaign_analytics, customer::CustomerStatus, order_item, payment_method,
    transaction::{TransactionKind, TransactionStatus},
    Address, CampaignAnalytics, OrderItem, PaymentMethod,
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use uuid::Uuid;

const APPROVE_TOKEN: &str = "tok_4111111111111111";
const DECLINE_TOKEN: &str = "tok_4000000000000002";

fn payment_body(customer_id: Uuid, token: &str) -> Value {
    let last_four: String = token.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    json!({
        "customer_id": customer_id,
        "payment_method_token": token,
        "card_type": "visa",
        "card_last_four": last_four,
        "card_exp_month": 12,
        "card_exp_year": 2030
    })
}

async fn seed_checkout(app: &TestApp, preauth_only: bool) -> (Uuid, Uuid) {
    app.seed_gateway("primary", 10, true).await;
    let campaign = app.seed_campaign("USD", preauth_only).await;
    let product = app.seed_product("KIT-1", dec!(49.99), dec!(7.50)).await;
    let offer = app
        .seed_offer(&campaign, &product, Some(dec!(29.99)), Some(dec!(5.00)), None)
        .await;
    let customer = app
        .seed_customer(CustomerStatus::Partial, &campaign, &offer)
        .await;
    (customer.id, campaign.id)
}

// ==================== Approval path ====================

#[tokio::test]
async fn approved_payment_commits_the_full_cascade() {
    let app = TestApp::new().await;
    let (customer_id, campaign_id) = seed_checkout(&app, false).await;

    let response = app
        .post_json("/api/v1/checkout/payment", payment_body(customer_id, APPROVE_TOKEN))
        .await;
    let body = expect_status(response, StatusCode::OK).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "paid");
    assert_eq!(body["customer_id"], customer_id.to_string());
    assert_eq!(body["order_number"], "ORD-00001001");

    // Funnel record converted exactly once
    let customer = app.reload_customer(customer_id).await;
    assert_eq!(customer.status, CustomerStatus::Customer);
    assert_eq!(customer.total_orders, 1);
    assert_eq!(customer.lifetime_value, dec!(34.99));
    assert!(customer.converted_at.is_some());

    // One order with the derived totals
    let orders = app.orders_for(customer_id).await;
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(customer.first_order_id, Some(order.id));
    assert_eq!(order.subtotal, dec!(29.99));
    assert_eq!(order.shipping, dec!(5.00));
    assert_eq!(order.tax, dec!(0));
    assert_eq!(order.total, dec!(34.99));
    assert_eq!(order.currency, "USD");
    assert_eq!(order.status, "processing");
    assert_eq!(order.payment_status, "paid");
    assert_eq!(order.fulfillment_status, "unfulfilled");
    assert_eq!(order.display_id, 1001);

    // Exactly one snapshot line whose total matches the subtotal
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 1);
    assert_eq!(items[0].unit_price, dec!(29.99));
    assert_eq!(items[0].total, dec!(29.99));
    assert_eq!(items[0].name, "Starter Kit");

    // One succeeded purchase transaction tied to the order
    let transactions = app.transactions_for(customer_id).await;
    assert_eq!(transactions.len(), 1);
    let txn = &transactions[0];
    assert_eq!(txn.status, TransactionStatus::Succeeded);
    assert_eq!(txn.kind, TransactionKind::Purchase);
    assert_eq!(txn.amount, dec!(34.99));
    assert_eq!(txn.order_id, Some(order.id));
    assert!(txn.gateway_txn_id.as_deref().unwrap().starts_with("demo_"));

    // Billing aliases shipping when bill_same_as_ship
    assert_eq!(order.billing_address_id, order.shipping_address_id);
    let addresses = Address::find()
        .filter(address::Column::CustomerId.eq(customer_id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].line1, "123 Main St");

    // Stored payment method, default and active
    let methods = PaymentMethod::find()
        .filter(payment_method::Column::CustomerId.eq(customer_id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(methods.len(), 1);
    assert!(methods[0].is_default);
    assert!(methods[0].active);
    assert_eq!(methods[0].last_four, "1111");

    // Daily rollup incremented for the campaign
    let rollups = CampaignAnalytics::find()
        .filter(campaign_analytics::Column::CampaignId.eq(campaign_id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(rollups.len(), 1);
    assert_eq!(rollups[0].orders_count, 1);
    assert_eq!(rollups[0].orders_value, dec!(34.99));
}

#[tokio::test]
async fn preauth_campaign_authorizes_instead_of_capturing() {
    let app = TestApp::new().await;
    let (customer_id, _) = seed_checkout(&app, true).await;

    let response = app
        .post_json("/api/v1/checkout/payment", payment_body(customer_id, APPROVE_TOKEN))
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    assert_eq!(body["success"], true);

    let orders = app.orders_for(customer_id).await;
    assert_eq!(orders[0].payment_status, "authorized");

    let transactions = app.transactions_for(customer_id).await;
    assert_eq!(transactions[0].kind, TransactionKind::Authorize);
    assert_eq!(transactions[0].status, TransactionStatus::Succeeded);
}

#[tokio::test]
async fn supplied_totals_override_the_catalog_price() {
    let app = TestApp::new().await;
    let (customer_id, _) = seed_checkout(&app, false).await;

    let mut body = payment_body(customer_id, APPROVE_TOKEN);
    body["checkout_totals"] = json!({
        "subtotal": "50.00",
        "discount": "10.00",
        "shipping": "4.99",
        "tax": "2.50",
        "total": "47.49"
    });

    let response = app.post_json("/api/v1/checkout/payment", body).await;
    let payload = expect_status(response, StatusCode::OK).await;
    assert_eq!(payload["success"], true);

    let orders = app.orders_for(customer_id).await;
    assert_eq!(orders[0].total, dec!(47.49));
    assert_eq!(orders[0].discount, dec!(10.00));

    let customer = app.reload_customer(customer_id).await;
    assert_eq!(customer.lifetime_value, dec!(47.49));
}

#[tokio::test]
async fn sequential_orders_get_monotonic_display_ids() {
    let app = TestApp::new().await;
    app.seed_gateway("primary", 10, true).await;
    let campaign = app.seed_campaign("USD", false).await;
    let product = app.seed_product("KIT-1", dec!(20.00), dec!(0)).await;
    let offer = app
        .seed_offer(&campaign, &product, None, None, None)
        .await;

    let first = app
        .seed_customer(CustomerStatus::Partial, &campaign, &offer)
        .await;
    let second = app
        .seed_customer(CustomerStatus::Partial, &campaign, &offer)
        .await;

    let body = expect_status(
        app.post_json("/api/v1/checkout/payment", payment_body(first.id, APPROVE_TOKEN))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["order_number"], "ORD-00001001");

    let body = expect_status(
        app.post_json("/api/v1/checkout/payment", payment_body(second.id, APPROVE_TOKEN))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["order_number"], "ORD-00001002");
}

// ==================== Decline path ====================

#[tokio::test]
async fn declined_payment_records_bookkeeping_and_no_order() {
    let app = TestApp::new().await;
    let (customer_id, _) = seed_checkout(&app, false).await;

    let response = app
        .post_json("/api/v1/checkout/payment", payment_body(customer_id, DECLINE_TOKEN))
        .await;
    let body = expect_status(response, StatusCode::OK).await;

    // A decline is a business outcome, not an HTTP error
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "declined");
    assert_eq!(body["response_code"], "DEMO_DECLINE");

    let customer = app.reload_customer(customer_id).await;
    assert_eq!(customer.status, CustomerStatus::Declined);
    assert_eq!(customer.decline_count, 1);
    assert_eq!(customer.last_decline_code.as_deref(), Some("DEMO_DECLINE"));
    assert!(customer.first_order_id.is_none());

    let transactions = app.transactions_for(customer_id).await;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].status, TransactionStatus::Declined);
    assert_eq!(transactions[0].response_code.as_deref(), Some("DEMO_DECLINE"));
    assert!(transactions[0].order_id.is_none());

    assert_eq!(app.count_all_orders().await, 0);
}

#[tokio::test]
async fn each_decline_increments_the_count_by_one() {
    let app = TestApp::new().await;
    let (customer_id, _) = seed_checkout(&app, false).await;

    for expected in 1..=2 {
        let response = app
            .post_json("/api/v1/checkout/payment", payment_body(customer_id, DECLINE_TOKEN))
            .await;
        expect_status(response, StatusCode::OK).await;

        let customer = app.reload_customer(customer_id).await;
        assert_eq!(customer.decline_count, expected);
    }

    assert_eq!(app.transactions_for(customer_id).await.len(), 2);
}

// ==================== Preconditions ====================

#[tokio::test]
async fn converted_customer_cannot_pay_again() {
    let app = TestApp::new().await;
    let (customer_id, _) = seed_checkout(&app, false).await;

    expect_status(
        app.post_json("/api/v1/checkout/payment", payment_body(customer_id, APPROVE_TOKEN))
            .await,
        StatusCode::OK,
    )
    .await;

    // Second attempt is rejected with zero new rows of any kind
    let response = app
        .post_json("/api/v1/checkout/payment", payment_body(customer_id, APPROVE_TOKEN))
        .await;
    let body = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("already converted"));

    assert_eq!(app.orders_for(customer_id).await.len(), 1);
    assert_eq!(app.transactions_for(customer_id).await.len(), 1);

    let customer = app.reload_customer(customer_id).await;
    assert_eq!(customer.status, CustomerStatus::Customer);
    assert_eq!(customer.total_orders, 1);
}

#[tokio::test]
async fn lead_status_customer_must_finish_earlier_steps() {
    let app = TestApp::new().await;
    app.seed_gateway("primary", 10, true).await;
    let campaign = app.seed_campaign("USD", false).await;
    let product = app.seed_product("KIT-1", dec!(20.00), dec!(0)).await;
    let offer = app.seed_offer(&campaign, &product, None, None, None).await;
    let customer = app
        .seed_customer(CustomerStatus::Lead, &campaign, &offer)
        .await;

    let response = app
        .post_json("/api/v1/checkout/payment", payment_body(customer.id, APPROVE_TOKEN))
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;

    // No mutation of any kind
    let reloaded = app.reload_customer(customer.id).await;
    assert_eq!(reloaded.status, CustomerStatus::Lead);
    assert!(app.transactions_for(customer.id).await.is_empty());
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let app = TestApp::new().await;
    app.seed_gateway("primary", 10, true).await;

    let response = app
        .post_json(
            "/api/v1/checkout/payment",
            payment_body(Uuid::new_v4(), APPROVE_TOKEN),
        )
        .await;
    expect_status(response, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn missing_payment_token_is_rejected_without_mutation() {
    let app = TestApp::new().await;
    let (customer_id, _) = seed_checkout(&app, false).await;

    let mut body = payment_body(customer_id, APPROVE_TOKEN);
    body["payment_method_token"] = json!("");

    let response = app.post_json("/api/v1/checkout/payment", body).await;
    expect_status(response, StatusCode::BAD_REQUEST).await;

    let customer = app.reload_customer(customer_id).await;
    assert_eq!(customer.status, CustomerStatus::Partial);
    assert!(app.transactions_for(customer_id).await.is_empty());
}

#[tokio::test]
async fn missing_customer_id_is_a_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/v1/checkout/payment",
            json!({
                "payment_method_token": APPROVE_TOKEN,
                "card_last_four": "1111",
                "card_exp_month": 12,
                "card_exp_year": 2030
            }),
        )
        .await;
    let body = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert!(body["message"].as_str().unwrap().contains("customer_id"));
}

// ==================== Gateway selection & configuration ====================

#[tokio::test]
async fn no_active_gateway_is_an_operator_error_with_no_mutation() {
    let app = TestApp::new().await;
    // Only an inactive gateway exists
    app.seed_gateway("disabled", 10, false).await;
    let campaign = app.seed_campaign("USD", false).await;
    let product = app.seed_product("KIT-1", dec!(20.00), dec!(0)).await;
    let offer = app.seed_offer(&campaign, &product, None, None, None).await;
    let customer = app
        .seed_customer(CustomerStatus::Partial, &campaign, &offer)
        .await;

    let response = app
        .post_json("/api/v1/checkout/payment", payment_body(customer.id, APPROVE_TOKEN))
        .await;
    expect_status(response, StatusCode::INTERNAL_SERVER_ERROR).await;

    // The claim is handed back untouched; no decline, no transaction
    let reloaded = app.reload_customer(customer.id).await;
    assert_eq!(reloaded.status, CustomerStatus::Partial);
    assert_eq!(reloaded.decline_count, 0);
    assert!(app.transactions_for(customer.id).await.is_empty());
}

#[tokio::test]
async fn offer_pinned_gateway_wins_over_priority() {
    let app = TestApp::new().await;
    let high_priority = app.seed_gateway("fallback", 100, true).await;
    let pinned = app.seed_gateway("pinned", 1, true).await;
    let campaign = app.seed_campaign("USD", false).await;
    let product = app.seed_product("KIT-1", dec!(20.00), dec!(0)).await;
    let offer = app
        .seed_offer(&campaign, &product, None, None, Some(pinned.id))
        .await;
    let customer = app
        .seed_customer(CustomerStatus::Partial, &campaign, &offer)
        .await;

    expect_status(
        app.post_json("/api/v1/checkout/payment", payment_body(customer.id, APPROVE_TOKEN))
            .await,
        StatusCode::OK,
    )
    .await;

    let transactions = app.transactions_for(customer.id).await;
    assert_eq!(transactions[0].gateway_id, Some(pinned.id));
    assert_ne!(transactions[0].gateway_id, Some(high_priority.id));
}
