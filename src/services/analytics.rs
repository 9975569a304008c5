use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{campaign_analytics, CampaignAnalytics},
    errors::ServiceError,
};

/// Maintains the per-campaign daily conversion rollup.
#[derive(Clone)]
pub struct CampaignAnalyticsService {
    db: Arc<DatabaseConnection>,
}

impl CampaignAnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Count one committed order against `(campaign, date)`.
    #[instrument(skip(self))]
    pub async fn record_order(
        &self,
        campaign_id: Uuid,
        date: NaiveDate,
        order_total: Decimal,
    ) -> Result<(), ServiceError> {
        Self::record_order_on(&*self.db, campaign_id, date, order_total).await
    }

    /// Transaction-friendly variant: the checkout commit sequence calls this
    /// with its open transaction so the rollup lands atomically with the
    /// order. A single upsert statement; concurrent commits both land as
    /// increments rather than one clobbering the other.
    pub async fn record_order_on<C: ConnectionTrait>(
        conn: &C,
        campaign_id: Uuid,
        date: NaiveDate,
        order_total: Decimal,
    ) -> Result<(), ServiceError> {
        let row = campaign_analytics::ActiveModel {
            id: Set(Uuid::new_v4()),
            campaign_id: Set(campaign_id),
            date: Set(date),
            orders_count: Set(1),
            orders_value: Set(order_total),
        };

        CampaignAnalytics::insert(row)
            .on_conflict(
                OnConflict::columns([
                    campaign_analytics::Column::CampaignId,
                    campaign_analytics::Column::Date,
                ])
                .value(
                    campaign_analytics::Column::OrdersCount,
                    Expr::col(campaign_analytics::Column::OrdersCount).add(1),
                )
                .value(
                    campaign_analytics::Column::OrdersValue,
                    Expr::col(campaign_analytics::Column::OrdersValue).add(order_total),
                )
                .to_owned(),
            )
            .exec(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(())
    }
}
