use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer funnel record. Carries the lead-capture snapshot plus the
/// checkout funnel state the payment workflow advances.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(nullable)]
    pub phone: Option<String>,
    pub status: CustomerStatus,
    /// Monotonic; never reset by the workflow.
    pub decline_count: i32,
    #[sea_orm(nullable)]
    pub last_decline_reason: Option<String>,
    #[sea_orm(nullable)]
    pub last_decline_code: Option<String>,
    #[sea_orm(nullable)]
    pub source_campaign_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub source_offer_id: Option<Uuid>,
    pub ship_address1: String,
    #[sea_orm(nullable)]
    pub ship_address2: Option<String>,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_postal: String,
    pub ship_country: String,
    pub bill_same_as_ship: bool,
    #[sea_orm(nullable)]
    pub bill_address1: Option<String>,
    #[sea_orm(nullable)]
    pub bill_address2: Option<String>,
    #[sea_orm(nullable)]
    pub bill_city: Option<String>,
    #[sea_orm(nullable)]
    pub bill_state: Option<String>,
    #[sea_orm(nullable)]
    pub bill_postal: Option<String>,
    #[sea_orm(nullable)]
    pub bill_country: Option<String>,
    #[sea_orm(nullable)]
    pub ip_address: Option<String>,
    /// Set exactly once, when the funnel reaches `customer`.
    #[sea_orm(nullable)]
    pub first_order_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub converted_at: Option<DateTime<Utc>>,
    pub lifetime_value: Decimal,
    pub total_orders: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::address::Entity")]
    Addresses,
    #[sea_orm(has_many = "super::payment_method::Entity")]
    PaymentMethods,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Addresses.def()
    }
}

impl Related<super::payment_method::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentMethods.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

/// Funnel status. `processing` is transient: it is the claim a payment
/// attempt holds while a gateway call is in flight, so two concurrent
/// attempts for the same customer cannot both charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    #[sea_orm(string_value = "prospect")]
    Prospect,
    #[sea_orm(string_value = "lead")]
    Lead,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "declined")]
    Declined,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl CustomerStatus {
    /// Statuses from which an initial payment attempt may start.
    pub fn can_start_payment(self) -> bool {
        matches!(self, CustomerStatus::Partial | CustomerStatus::Declined)
    }
}
