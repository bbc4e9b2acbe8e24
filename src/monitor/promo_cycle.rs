//! Seasonal sale check — announces upcoming sale windows at most once per
//! (sale, year).
//!
//! A window is marked announced only after at least one delivery lands, so
//! a failed dispatch leaves it eligible for the next check.

use chrono::{DateTime, Datelike, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use super::stats::CycleStats;
use crate::config::Config;
use crate::db::queries;
use crate::error::Result;
use crate::notify::{NotifyEvent, NotifySink};
use crate::promotions::due_announcements;

/// Check the sale calendar once and announce anything newly due.
/// Returns how many announcements were delivered.
pub async fn run_promotion_check(
    pool: &SqlitePool,
    sink: &dyn NotifySink,
    lookahead_days: i64,
    now: DateTime<Utc>,
) -> Result<u64> {
    let due = due_announcements(now, lookahead_days);
    if due.is_empty() {
        debug!("no sales inside the lookahead window");
        return Ok(0);
    }

    let channels = queries::all_server_channels(pool).await?;
    if !sink.enabled() || channels.is_empty() {
        info!("no way to deliver sale announcements, leaving them pending");
        return Ok(0);
    }

    let mut total_sent = 0;
    for sale in &due {
        let year = sale.starts_on.year();
        if queries::is_sale_announced(pool, sale.name, year).await? {
            continue;
        }

        let notification = NotifyEvent::PromotionDue {
            name: sale.name.to_string(),
            emoji: sale.emoji.to_string(),
            starts_on: sale.starts_on,
            days_until: sale.days_until,
            duration_days: sale.duration_days,
        };

        let mut sent = 0;
        for channel in channels.iter().filter(|c| c.promotions_enabled) {
            match sink.deliver(channel.channel_id, &notification).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!(
                        channel_id = channel.channel_id,
                        sale = sale.name,
                        error = %e,
                        "sale announcement delivery failed"
                    );
                }
            }
        }

        if sent > 0 {
            queries::mark_sale_announced(pool, sale.name, year).await?;
            info!(sale = sale.name, year, sent, "sale announced");
            total_sent += sent;
        } else {
            debug!(sale = sale.name, year, "no delivery landed, will retry next check");
        }
    }

    Ok(total_sent)
}

/// Run sale checks forever, pausing `sale_check_interval` between them.
pub async fn run_promotion_loop(
    config: Arc<Config>,
    pool: SqlitePool,
    sink: Arc<dyn NotifySink>,
    stats: Arc<CycleStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    let check_interval = Duration::from_secs(config.monitor.sale_check_interval_secs);
    let lookahead_days = config.monitor.sale_lookahead_days;

    info!(
        interval_secs = config.monitor.sale_check_interval_secs,
        lookahead_days,
        "sale calendar monitor started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        match run_promotion_check(&pool, sink.as_ref(), lookahead_days, Utc::now()).await {
            Ok(sent) => stats.sale_check_finished(sent),
            Err(e) => warn!(error = %e, "sale calendar check failed"),
        }

        tokio::select! {
            _ = time::sleep(check_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    info!("sale calendar monitor stopped");
}
