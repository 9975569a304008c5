use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        address::{self, AddressKind},
        campaign, customer,
        customer::CustomerStatus,
        gateway as gateway_entity, offer, order,
        order::order_number_for,
        order_item, payment_method, product,
        transaction::{self, TransactionKind, TransactionStatus},
        Customer, Gateway, Offer, Order, Product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::{ChargeMode, ChargeOutcome, ChargeRequest, GatewayError, GatewayPort},
    services::analytics::CampaignAnalyticsService,
    services::pricing::{resolve_totals, CheckoutTotals},
};

/// Ceiling on recorded declines before retry is refused outright.
pub const MAX_PAYMENT_RETRIES: i32 = 5;

/// Attempts at allocating a display id before giving up. A lost race shows
/// up as a unique violation and the whole commit transaction is retried.
const DISPLAY_ID_ALLOC_ATTEMPTS: u32 = 3;

const ORDER_STATUS_PROCESSING: &str = "processing";
const FULFILLMENT_UNFULFILLED: &str = "unfulfilled";
const PAYMENT_STATUS_AUTHORIZED: &str = "authorized";
const PAYMENT_STATUS_PAID: &str = "paid";
const DECLINE_CODE_GATEWAY_ERROR: &str = "GATEWAY_ERROR";

/// Whether this attempt entered through `pay` or `retry`. The two share one
/// code path; only the precondition table and bookkeeping tags differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptKind {
    Initial,
    Retry,
}

/// Input for one payment attempt: the tokenized card plus optional totals
/// carried over from an earlier pricing step.
#[derive(Debug, Clone)]
pub struct PaymentInput {
    pub customer_id: Uuid,
    pub payment_method_token: String,
    pub card_type: String,
    pub card_last_four: String,
    pub card_exp_month: i32,
    pub card_exp_year: i32,
    pub supplied_totals: Option<CheckoutTotals>,
}

/// Terminal result of a payment attempt. A decline is a normal outcome, not
/// an error; callers translate it to a 200 response with `success: false`.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Paid {
        customer_id: Uuid,
        order_id: Uuid,
        order_number: String,
    },
    Declined {
        customer_id: Uuid,
        reason: String,
        response_code: Option<String>,
        decline_count: i32,
    },
}

/// Entities resolved for an attempt. Each may be absent in the catalog;
/// absence flows through pricing as zeros rather than optional chaining at
/// every use site.
struct ResolvedCheckout {
    campaign: Option<campaign::Model>,
    offer: Option<offer::Model>,
    product: Option<product::Model>,
    gateway: gateway_entity::Model,
}

/// Checkout payment orchestrator: owns every funnel-status transition the
/// payment workflow makes and is the sole writer of checkout transaction
/// rows.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn GatewayPort>,
    event_sender: Arc<EventSender>,
    default_currency: String,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn GatewayPort>,
        event_sender: Arc<EventSender>,
        default_currency: String,
    ) -> Self {
        Self {
            db,
            gateway,
            event_sender,
            default_currency,
        }
    }

    /// Initial payment attempt for a customer in `partial` or `declined`.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn pay(&self, input: PaymentInput) -> Result<PaymentOutcome, ServiceError> {
        self.process_payment(AttemptKind::Initial, input).await
    }

    /// Bounded re-attempt, valid only from `declined`.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn retry(&self, input: PaymentInput) -> Result<PaymentOutcome, ServiceError> {
        self.process_payment(AttemptKind::Retry, input).await
    }

    async fn process_payment(
        &self,
        kind: AttemptKind,
        input: PaymentInput,
    ) -> Result<PaymentOutcome, ServiceError> {
        if input.payment_method_token.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "payment_method_token is required".to_string(),
            ));
        }

        let customer = Customer::find_by_id(input.customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", input.customer_id))
            })?;

        // Idempotency guard: a converted customer never re-enters this
        // workflow for the same purchase.
        if customer.status == CustomerStatus::Customer {
            return Err(ServiceError::AlreadyConverted(customer.id));
        }

        match kind {
            AttemptKind::Initial => {
                if !customer.status.can_start_payment() {
                    return Err(ServiceError::StepsIncomplete(
                        "contact and address steps must be completed before payment".to_string(),
                    ));
                }
            }
            AttemptKind::Retry => {
                if customer.status != CustomerStatus::Declined {
                    return Err(ServiceError::StepsIncomplete(
                        "retry is only valid for a declined checkout".to_string(),
                    ));
                }
                // Checked before the claim so a capped customer causes no
                // writes and no gateway traffic.
                if customer.decline_count >= MAX_PAYMENT_RETRIES {
                    self.event_sender
                        .send_or_log(Event::RetryLimitReached {
                            customer_id: customer.id,
                            decline_count: customer.decline_count,
                        })
                        .await;
                    return Err(ServiceError::RetryLimitExceeded(MAX_PAYMENT_RETRIES));
                }
            }
        }

        let prior_status = customer.status;
        self.claim_customer(customer.id, prior_status).await?;

        let resolved = match self.resolve_checkout(&customer).await {
            Ok(resolved) => resolved,
            Err(err) => {
                // Configuration problems are the operator's fault, not the
                // customer's; hand the claim back untouched.
                self.release_claim(customer.id, prior_status).await;
                return Err(err);
            }
        };

        let totals = resolve_totals(
            resolved.offer.as_ref(),
            resolved.product.as_ref(),
            input.supplied_totals.as_ref(),
        );
        let currency = resolved
            .campaign
            .as_ref()
            .map(|c| c.currency.clone())
            .unwrap_or_else(|| self.default_currency.clone());
        let mode = if resolved.campaign.as_ref().is_some_and(|c| c.preauth_only) {
            ChargeMode::Authorize
        } else {
            ChargeMode::Purchase
        };
        let retry_attempt = match kind {
            AttemptKind::Initial => None,
            AttemptKind::Retry => Some(customer.decline_count + 1),
        };

        let charge_request = ChargeRequest {
            amount_cents: to_cents(totals.total),
            currency: currency.clone(),
            payment_method_token: input.payment_method_token.clone(),
            order_ref: customer.id.to_string(),
            description: resolved.offer.as_ref().map(|o| o.name.clone()),
            email: Some(customer.email.clone()),
            ip: customer.ip_address.clone(),
            retain_on_success: true,
        };

        info!(
            customer_id = %customer.id,
            amount = %totals.total,
            currency = %currency,
            mode = mode.as_str(),
            gateway = %resolved.gateway.name,
            "Submitting charge to gateway"
        );

        let result = match self
            .gateway
            .charge(mode, &resolved.gateway.token, &charge_request)
            .await
        {
            Err(gateway_err) => {
                warn!(
                    customer_id = %customer.id,
                    error = %gateway_err,
                    "Gateway call failed; recording decline"
                );
                self.record_decline(
                    &customer,
                    &resolved,
                    &totals,
                    &currency,
                    mode,
                    &input,
                    retry_attempt,
                    DeclineDetails::from_gateway_error(&gateway_err),
                )
                .await
            }
            Ok(outcome) if !outcome.succeeded => {
                self.record_decline(
                    &customer,
                    &resolved,
                    &totals,
                    &currency,
                    mode,
                    &input,
                    retry_attempt,
                    DeclineDetails::from_decline(&outcome),
                )
                .await
            }
            Ok(outcome) => {
                self.commit_approved(
                    &customer,
                    prior_status,
                    &resolved,
                    &totals,
                    &currency,
                    mode,
                    &input,
                    retry_attempt,
                    &outcome,
                )
                .await
            }
        };

        // A store failure mid-bookkeeping must not strand the customer in
        // the transient claim state.
        if matches!(&result, Err(ServiceError::DatabaseError(_))) {
            self.release_claim(customer.id, prior_status).await;
        }

        result
    }

    /// Take the customer-row mutex: `prior -> processing`, guarded on the
    /// expected prior value so two concurrent attempts cannot both pass.
    async fn claim_customer(
        &self,
        customer_id: Uuid,
        expected: CustomerStatus,
    ) -> Result<(), ServiceError> {
        let result = Customer::update_many()
            .col_expr(
                customer::Column::Status,
                Expr::value(CustomerStatus::Processing),
            )
            .col_expr(customer::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(customer::Column::Id.eq(customer_id))
            .filter(customer::Column::Status.eq(expected))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            warn!(customer_id = %customer_id, "Lost payment claim race");
            return Err(ServiceError::PaymentInProgress);
        }
        Ok(())
    }

    /// Hand the claim back. Best-effort: the claim holder is the only writer,
    /// but if the release itself fails there is nothing left to do except
    /// log it for the operator.
    async fn release_claim(&self, customer_id: Uuid, restore_to: CustomerStatus) {
        let result = Customer::update_many()
            .col_expr(customer::Column::Status, Expr::value(restore_to))
            .col_expr(customer::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(customer::Column::Id.eq(customer_id))
            .filter(customer::Column::Status.eq(CustomerStatus::Processing))
            .exec(&*self.db)
            .await;

        if let Err(e) = result {
            error!(
                customer_id = %customer_id,
                error = %e,
                "Failed to release payment claim"
            );
        }
    }

    /// Load the campaign/offer/product context and pick a gateway: the
    /// offer's own when active, else the highest-priority active one.
    async fn resolve_checkout(
        &self,
        customer: &customer::Model,
    ) -> Result<ResolvedCheckout, ServiceError> {
        let offer = match customer.source_offer_id {
            Some(offer_id) => Offer::find_by_id(offer_id).one(&*self.db).await?,
            None => None,
        };

        let campaign_id = offer
            .as_ref()
            .map(|o| o.campaign_id)
            .or(customer.source_campaign_id);
        let campaign = match campaign_id {
            Some(id) => campaign::Entity::find_by_id(id).one(&*self.db).await?,
            None => None,
        };

        let product = match offer.as_ref().map(|o| o.product_id) {
            Some(id) => Product::find_by_id(id).one(&*self.db).await?,
            None => None,
        };

        let attached_gateway = match offer.as_ref().and_then(|o| o.gateway_id) {
            Some(id) => Gateway::find_by_id(id)
                .one(&*self.db)
                .await?
                .filter(|g| g.active),
            None => None,
        };

        let gateway = match attached_gateway {
            Some(gateway) => gateway,
            None => Gateway::find()
                .filter(gateway_entity::Column::Active.eq(true))
                .order_by_desc(gateway_entity::Column::Priority)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    error!("No active payment gateway configured");
                    ServiceError::GatewayConfig("no active payment gateway".to_string())
                })?,
        };

        Ok(ResolvedCheckout {
            campaign,
            offer,
            product,
            gateway,
        })
    }

    /// Decline bookkeeping: exactly one declined transaction row plus the
    /// funnel update (declined, decline_count += 1).
    #[allow(clippy::too_many_arguments)]
    async fn record_decline(
        &self,
        customer: &customer::Model,
        resolved: &ResolvedCheckout,
        totals: &CheckoutTotals,
        currency: &str,
        mode: ChargeMode,
        input: &PaymentInput,
        retry_attempt: Option<i32>,
        details: DeclineDetails,
    ) -> Result<PaymentOutcome, ServiceError> {
        transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(None),
            customer_id: Set(customer.id),
            gateway_id: Set(Some(resolved.gateway.id)),
            kind: Set(transaction_kind(mode)),
            status: Set(TransactionStatus::Declined),
            amount: Set(totals.total),
            currency: Set(currency.to_string()),
            payment_method_token: Set(input.payment_method_token.clone()),
            gateway_txn_id: Set(None),
            response_code: Set(details.response_code.clone()),
            response_message: Set(Some(details.reason.clone())),
            avs_code: Set(details.avs_code.clone()),
            cvv_code: Set(details.cvv_code.clone()),
            error_code: Set(details.error_code.clone()),
            retry_attempt: Set(retry_attempt),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        let decline_count = customer.decline_count + 1;
        let mut update: customer::ActiveModel = customer.clone().into();
        update.status = Set(CustomerStatus::Declined);
        update.decline_count = Set(decline_count);
        update.last_decline_reason = Set(Some(details.reason.clone()));
        update.last_decline_code = Set(Some(details.decline_code.clone()));
        update.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PaymentDeclined {
                customer_id: customer.id,
                decline_count,
                decline_code: Some(details.decline_code.clone()),
            })
            .await;

        Ok(PaymentOutcome::Declined {
            customer_id: customer.id,
            reason: details.reason,
            response_code: details.response_code,
            decline_count,
        })
    }

    /// An approved charge: run the commit sequence, compensating if the
    /// order cannot be recorded after money moved.
    #[allow(clippy::too_many_arguments)]
    async fn commit_approved(
        &self,
        customer: &customer::Model,
        prior_status: CustomerStatus,
        resolved: &ResolvedCheckout,
        totals: &CheckoutTotals,
        currency: &str,
        mode: ChargeMode,
        input: &PaymentInput,
        retry_attempt: Option<i32>,
        outcome: &ChargeOutcome,
    ) -> Result<PaymentOutcome, ServiceError> {
        match self
            .commit_order(customer, resolved, totals, currency, mode, input, retry_attempt, outcome)
            .await
        {
            Ok(order) => {
                self.event_sender
                    .send_or_log(Event::OrderCreated(order.id))
                    .await;
                self.event_sender
                    .send_or_log(Event::CustomerConverted {
                        customer_id: customer.id,
                        order_id: order.id,
                        order_total: order.total,
                    })
                    .await;

                info!(
                    customer_id = %customer.id,
                    order_id = %order.id,
                    order_number = %order.order_number,
                    "Checkout committed"
                );

                Ok(PaymentOutcome::Paid {
                    customer_id: customer.id,
                    order_id: order.id,
                    order_number: order.order_number,
                })
            }
            Err(commit_err) => {
                error!(
                    customer_id = %customer.id,
                    error = %commit_err,
                    "Order commit failed after approved charge"
                );

                // The rolled-back transaction took the succeeded audit row
                // with it; restore it standalone so every gateway attempt
                // still has exactly one row, then alert for reconciliation.
                let audit_txn_id = self
                    .record_orphan_capture(
                        customer,
                        resolved,
                        totals,
                        currency,
                        mode,
                        input,
                        retry_attempt,
                        outcome,
                    )
                    .await;

                self.release_claim(customer.id, prior_status).await;

                self.event_sender
                    .send_or_log(Event::PaymentCapturedOrderMissing {
                        customer_id: customer.id,
                        transaction_id: audit_txn_id.unwrap_or_else(Uuid::nil),
                        amount: totals.total,
                        timestamp: Utc::now(),
                    })
                    .await;

                Err(ServiceError::PaymentCapturedOrderFailed(
                    commit_err.to_string(),
                ))
            }
        }
    }

    /// The commit sequence, atomically: addresses, payment method, order +
    /// item, succeeded transaction, conversion, analytics rollup. Retried as
    /// a whole when the display-id allocation loses its race.
    #[allow(clippy::too_many_arguments)]
    async fn commit_order(
        &self,
        customer: &customer::Model,
        resolved: &ResolvedCheckout,
        totals: &CheckoutTotals,
        currency: &str,
        mode: ChargeMode,
        input: &PaymentInput,
        retry_attempt: Option<i32>,
        outcome: &ChargeOutcome,
    ) -> Result<order::Model, ServiceError> {
        let mut last_err: Option<ServiceError> = None;

        for attempt in 1..=DISPLAY_ID_ALLOC_ATTEMPTS {
            match self
                .try_commit_order(customer, resolved, totals, currency, mode, input, retry_attempt, outcome)
                .await
            {
                Err(ServiceError::DatabaseError(db_err)) if is_unique_violation(&db_err) => {
                    warn!(
                        customer_id = %customer.id,
                        attempt,
                        "Display id allocation raced; retrying commit"
                    );
                    last_err = Some(ServiceError::DatabaseError(db_err));
                }
                other => return other,
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ServiceError::InternalError("order commit retries exhausted".to_string())
        }))
    }

    #[allow(clippy::too_many_arguments)]
    async fn try_commit_order(
        &self,
        customer: &customer::Model,
        resolved: &ResolvedCheckout,
        totals: &CheckoutTotals,
        currency: &str,
        mode: ChargeMode,
        input: &PaymentInput,
        retry_attempt: Option<i32>,
        outcome: &ChargeOutcome,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let shipping = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer.id),
            kind: Set(AddressKind::Shipping),
            line1: Set(customer.ship_address1.clone()),
            line2: Set(customer.ship_address2.clone()),
            city: Set(customer.ship_city.clone()),
            state: Set(customer.ship_state.clone()),
            postal_code: Set(customer.ship_postal.clone()),
            country: Set(customer.ship_country.clone()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let billing_address_id = if customer.bill_same_as_ship {
            shipping.id
        } else {
            let billing = address::ActiveModel {
                id: Set(Uuid::new_v4()),
                customer_id: Set(customer.id),
                kind: Set(AddressKind::Billing),
                line1: Set(customer
                    .bill_address1
                    .clone()
                    .unwrap_or_else(|| customer.ship_address1.clone())),
                line2: Set(customer.bill_address2.clone()),
                city: Set(customer
                    .bill_city
                    .clone()
                    .unwrap_or_else(|| customer.ship_city.clone())),
                state: Set(customer
                    .bill_state
                    .clone()
                    .unwrap_or_else(|| customer.ship_state.clone())),
                postal_code: Set(customer
                    .bill_postal
                    .clone()
                    .unwrap_or_else(|| customer.ship_postal.clone())),
                country: Set(customer
                    .bill_country
                    .clone()
                    .unwrap_or_else(|| customer.ship_country.clone())),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            billing.id
        };

        payment_method::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer.id),
            token: Set(input.payment_method_token.clone()),
            card_type: Set(input.card_type.clone()),
            last_four: Set(input.card_last_four.clone()),
            exp_month: Set(input.card_exp_month),
            exp_year: Set(input.card_exp_year),
            is_default: Set(true),
            active: Set(true),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let display_id = next_display_id(&txn).await?;
        let order_number = order_number_for(display_id);

        let metadata = match retry_attempt {
            Some(_) => Some(json!({ "retry_conversion": true })),
            None => None,
        };

        let order_id = Uuid::new_v4();
        let order = order::ActiveModel {
            id: Set(order_id),
            display_id: Set(display_id),
            order_number: Set(order_number),
            customer_id: Set(customer.id),
            campaign_id: Set(resolved.campaign.as_ref().map(|c| c.id)),
            offer_id: Set(resolved.offer.as_ref().map(|o| o.id)),
            status: Set(ORDER_STATUS_PROCESSING.to_string()),
            payment_status: Set(payment_status(mode).to_string()),
            fulfillment_status: Set(FULFILLMENT_UNFULFILLED.to_string()),
            subtotal: Set(totals.subtotal),
            discount: Set(totals.discount),
            shipping: Set(totals.shipping),
            tax: Set(totals.tax),
            total: Set(totals.total),
            currency: Set(currency.to_string()),
            shipping_address_id: Set(shipping.id),
            billing_address_id: Set(billing_address_id),
            metadata: Set(metadata),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await?;

        let quantity = resolved
            .offer
            .as_ref()
            .map(|o| o.qty_per_order.max(1))
            .unwrap_or(1);
        let item_name = resolved
            .offer
            .as_ref()
            .map(|o| o.name.clone())
            .or_else(|| resolved.product.as_ref().map(|p| p.name.clone()))
            .unwrap_or_else(|| "Checkout item".to_string());
        let item_sku = resolved
            .product
            .as_ref()
            .map(|p| p.sku.clone())
            .unwrap_or_default();

        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(resolved.product.as_ref().map(|p| p.id)),
            offer_id: Set(resolved.offer.as_ref().map(|o| o.id)),
            sku: Set(item_sku),
            name: Set(item_name),
            quantity: Set(quantity),
            unit_price: Set(unit_price(totals.subtotal, quantity)),
            total: Set(totals.subtotal),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await?;

        transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(Some(order_id)),
            customer_id: Set(customer.id),
            gateway_id: Set(Some(resolved.gateway.id)),
            kind: Set(transaction_kind(mode)),
            status: Set(TransactionStatus::Succeeded),
            amount: Set(totals.total),
            currency: Set(currency.to_string()),
            payment_method_token: Set(input.payment_method_token.clone()),
            gateway_txn_id: Set(outcome.transaction_token.clone()),
            response_code: Set(Some(outcome.response_code.clone())),
            response_message: Set(Some(outcome.message.clone())),
            avs_code: Set(outcome.avs_code.clone()),
            cvv_code: Set(outcome.cvv_code.clone()),
            error_code: Set(None),
            retry_attempt: Set(retry_attempt),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        // Conversion. lifetime_value/total_orders are set, not accumulated:
        // the AlreadyConverted guard makes this path at-most-once per
        // customer.
        let mut update: customer::ActiveModel = customer.clone().into();
        update.status = Set(CustomerStatus::Customer);
        if customer.first_order_id.is_none() {
            update.first_order_id = Set(Some(order_id));
        }
        update.converted_at = Set(Some(now));
        update.lifetime_value = Set(totals.total);
        update.total_orders = Set(1);
        update.update(&txn).await?;

        if let Some(campaign) = resolved.campaign.as_ref() {
            CampaignAnalyticsService::record_order_on(
                &txn,
                campaign.id,
                now.date_naive(),
                totals.total,
            )
            .await?;
        }

        txn.commit().await?;

        Ok(order)
    }

    /// After a rolled-back commit, restore the succeeded transaction row so
    /// the captured charge stays auditable. Best-effort: if even this write
    /// fails, the operator alert still fires with a nil transaction id.
    #[allow(clippy::too_many_arguments)]
    async fn record_orphan_capture(
        &self,
        customer: &customer::Model,
        resolved: &ResolvedCheckout,
        totals: &CheckoutTotals,
        currency: &str,
        mode: ChargeMode,
        input: &PaymentInput,
        retry_attempt: Option<i32>,
        outcome: &ChargeOutcome,
    ) -> Option<Uuid> {
        let txn_id = Uuid::new_v4();
        let result = transaction::ActiveModel {
            id: Set(txn_id),
            order_id: Set(None),
            customer_id: Set(customer.id),
            gateway_id: Set(Some(resolved.gateway.id)),
            kind: Set(transaction_kind(mode)),
            status: Set(TransactionStatus::Succeeded),
            amount: Set(totals.total),
            currency: Set(currency.to_string()),
            payment_method_token: Set(input.payment_method_token.clone()),
            gateway_txn_id: Set(outcome.transaction_token.clone()),
            response_code: Set(Some(outcome.response_code.clone())),
            response_message: Set(Some(outcome.message.clone())),
            avs_code: Set(outcome.avs_code.clone()),
            cvv_code: Set(outcome.cvv_code.clone()),
            error_code: Set(None),
            retry_attempt: Set(retry_attempt),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await;

        match result {
            Ok(_) => Some(txn_id),
            Err(e) => {
                error!(
                    customer_id = %customer.id,
                    error = %e,
                    "Failed to persist audit row for captured charge"
                );
                None
            }
        }
    }
}

struct DeclineDetails {
    reason: String,
    decline_code: String,
    response_code: Option<String>,
    error_code: Option<String>,
    avs_code: Option<String>,
    cvv_code: Option<String>,
}

impl DeclineDetails {
    fn from_gateway_error(err: &GatewayError) -> Self {
        Self {
            reason: err.to_string(),
            decline_code: DECLINE_CODE_GATEWAY_ERROR.to_string(),
            response_code: None,
            error_code: Some(DECLINE_CODE_GATEWAY_ERROR.to_string()),
            avs_code: None,
            cvv_code: None,
        }
    }

    fn from_decline(outcome: &ChargeOutcome) -> Self {
        Self {
            reason: outcome.message.clone(),
            decline_code: outcome.response_code.clone(),
            response_code: Some(outcome.response_code.clone()),
            error_code: None,
            avs_code: outcome.avs_code.clone(),
            cvv_code: outcome.cvv_code.clone(),
        }
    }
}

fn transaction_kind(mode: ChargeMode) -> TransactionKind {
    match mode {
        ChargeMode::Authorize => TransactionKind::Authorize,
        ChargeMode::Purchase => TransactionKind::Purchase,
    }
}

fn payment_status(mode: ChargeMode) -> &'static str {
    match mode {
        ChargeMode::Authorize => PAYMENT_STATUS_AUTHORIZED,
        ChargeMode::Purchase => PAYMENT_STATUS_PAID,
    }
}

/// Dollars-and-cents to the gateway's minor units.
fn to_cents(amount: Decimal) -> i64 {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(i64::MAX)
}

fn unit_price(subtotal: Decimal, quantity: i32) -> Decimal {
    if quantity > 1 {
        subtotal / Decimal::from(quantity)
    } else {
        subtotal
    }
}

/// Next order display id: `max(existing, 1000) + 1`. The caller's unique
/// index turns a concurrent duplicate into a retryable error.
async fn next_display_id(txn: &DatabaseTransaction) -> Result<i64, ServiceError> {
    let current: Option<Option<i64>> = Order::find()
        .select_only()
        .column_as(order::Column::DisplayId.max(), "max_display_id")
        .into_tuple()
        .one(txn)
        .await?;

    let current = current.flatten().unwrap_or(0);
    Ok(current.max(1000) + 1)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn to_cents_rounds_to_minor_units() {
        assert_eq!(to_cents(dec!(34.99)), 3499);
        assert_eq!(to_cents(dec!(0.005)), 1);
        assert_eq!(to_cents(Decimal::ZERO), 0);
    }

    #[test]
    fn unit_price_divides_only_for_multi_quantity() {
        assert_eq!(unit_price(dec!(29.99), 1), dec!(29.99));
        assert_eq!(unit_price(dec!(30.00), 3), dec!(10.00));
        assert_eq!(unit_price(dec!(29.99), 0), dec!(29.99));
    }

    #[test]
    fn payment_status_follows_charge_mode() {
        assert_eq!(payment_status(ChargeMode::Authorize), "authorized");
        assert_eq!(payment_status(ChargeMode::Purchase), "paid");
        assert_eq!(transaction_kind(ChargeMode::Authorize), TransactionKind::Authorize);
        assert_eq!(transaction_kind(ChargeMode::Purchase), TransactionKind::Purchase);
    }
}
