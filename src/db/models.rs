//! Database row types for all tables.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbTrackedGame {
    pub app_id: i64,
    pub name: String,
    pub is_free: bool,
    pub image_url: Option<String>,
    pub added_at: DateTime<Utc>,
    pub last_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbPriceObservation {
    pub app_id: i64,
    pub region: String,
    pub price: f64,
    pub discount: i64,
    pub currency: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbHistoricalLow {
    pub app_id: i64,
    pub region: String,
    pub lowest_price: f64,
    pub set_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbNewLowEvent {
    pub id: i64,
    pub app_id: i64,
    pub game_name: String,
    pub region: String,
    pub price: f64,
    pub currency: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbFreeGameEvent {
    pub id: i64,
    pub app_id: i64,
    pub game_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbServerChannel {
    pub group_id: i64,
    pub channel_id: i64,
    pub promotions_enabled: bool,
    pub setup_at: DateTime<Utc>,
}
