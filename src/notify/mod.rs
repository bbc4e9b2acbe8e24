pub mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;

/// A notification ready for delivery to subscriber channels.
#[derive(Debug, Clone)]
pub enum NotifyEvent {
    NewLow {
        app_id: i64,
        name: String,
        region: String,
        price: f64,
        previous_low: f64,
        drop_percent: f64,
        discount: i64,
        currency: String,
    },
    FreeGame {
        app_id: i64,
        name: String,
    },
    PromotionDue {
        name: String,
        emoji: String,
        starts_on: NaiveDate,
        days_until: i64,
        duration_days: u32,
    },
}

/// Delivers one event to one channel. Implemented by the Telegram notifier
/// in production and by scripted sinks in tests.
#[async_trait]
pub trait NotifySink: Send + Sync {
    /// False when the sink has no credentials; callers skip delivery
    /// (and anything gated on it) without error.
    fn enabled(&self) -> bool;

    async fn deliver(&self, channel_id: i64, event: &NotifyEvent) -> Result<()>;
}
