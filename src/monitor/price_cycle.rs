//! Price poll cycle — the scheduled walk over every tracked app.
//!
//! 1. Load the tracked list and the channel fan-out set
//! 2. Fetch each app's storefront snapshot, one at a time, with a
//!    courtesy delay between fetches
//! 3. Feed the observation to the price engine
//! 4. Deliver notable events to every registered channel
//!
//! One app failing never aborts the cycle.

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use super::stats::CycleStats;
use crate::config::Config;
use crate::db::models::DbServerChannel;
use crate::db::queries;
use crate::engine::{Observation, PriceEngine, PriceEvent};
use crate::notify::{NotifyEvent, NotifySink};
use crate::steam::PriceFetcher;

/// What one full cycle did.
#[derive(Debug, Default, Clone)]
pub struct CycleOutcome {
    pub apps_checked: usize,
    pub failures: usize,
    pub events_emitted: usize,
    pub notifications_sent: u64,
}

/// Walk the tracked list once.
pub async fn run_price_cycle(
    pool: &SqlitePool,
    fetcher: &dyn PriceFetcher,
    engine: &PriceEngine,
    sink: &dyn NotifySink,
    region: &str,
    inter_app_delay: Duration,
) -> CycleOutcome {
    let mut outcome = CycleOutcome::default();

    let games = match queries::list_tracked_games(pool).await {
        Ok(games) => games,
        Err(e) => {
            warn!(error = %e, "could not load tracked games, skipping cycle");
            return outcome;
        }
    };
    let channels = match queries::all_server_channels(pool).await {
        Ok(channels) => channels,
        Err(e) => {
            warn!(error = %e, "could not load notification channels");
            Vec::new()
        }
    };
    if channels.is_empty() {
        debug!("no notification channels configured, recording prices only");
    }

    for (i, game) in games.iter().enumerate() {
        if i > 0 {
            time::sleep(inter_app_delay).await;
        }

        let snapshot = match fetcher.fetch_app(game.app_id, region).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!(app_id = game.app_id, name = %game.name, "app not listed in store");
                continue;
            }
            Err(e) => {
                warn!(app_id = game.app_id, name = %game.name, error = %e, "price fetch failed");
                outcome.failures += 1;
                continue;
            }
        };

        let Some(obs) = Observation::from_snapshot(game.app_id, region, &snapshot, Utc::now())
        else {
            debug!(app_id = game.app_id, name = %game.name, "no listed price, skipping");
            continue;
        };

        let events = match engine.record_observation(&obs).await {
            Ok(events) => events,
            Err(e) => {
                warn!(app_id = game.app_id, name = %game.name, error = %e, "observation processing failed");
                outcome.failures += 1;
                continue;
            }
        };

        outcome.apps_checked += 1;
        outcome.events_emitted += events.len();

        if sink.enabled() && !channels.is_empty() {
            for event in &events {
                if let Some(notification) = to_notification(event) {
                    outcome.notifications_sent +=
                        fan_out(sink, &channels, &notification).await;
                }
            }
        }
    }

    outcome
}

/// Deliver one notification to every channel; returns how many sends landed.
async fn fan_out(
    sink: &dyn NotifySink,
    channels: &[DbServerChannel],
    notification: &NotifyEvent,
) -> u64 {
    let mut sent = 0;
    for channel in channels {
        match sink.deliver(channel.channel_id, notification).await {
            Ok(()) => sent += 1,
            Err(e) => {
                warn!(
                    channel_id = channel.channel_id,
                    error = %e,
                    "notification delivery failed"
                );
            }
        }
    }
    sent
}

/// Baselines are bookkeeping, not news; everything else goes out.
fn to_notification(event: &PriceEvent) -> Option<NotifyEvent> {
    match event {
        PriceEvent::BaselineEstablished { .. } => None,
        PriceEvent::NewLow {
            app_id,
            name,
            region,
            price,
            previous_low,
            drop_percent,
            discount,
            currency,
        } => Some(NotifyEvent::NewLow {
            app_id: *app_id,
            name: name.clone(),
            region: region.clone(),
            price: *price,
            previous_low: *previous_low,
            drop_percent: *drop_percent,
            discount: *discount,
            currency: currency.clone(),
        }),
        PriceEvent::BecameFree { app_id, name } => Some(NotifyEvent::FreeGame {
            app_id: *app_id,
            name: name.clone(),
        }),
    }
}

/// Run price cycles forever, pausing `poll_interval` between them.
///
/// The shutdown signal is only honored between cycles; an in-flight cycle
/// always finishes.
pub async fn run_price_loop(
    config: Arc<Config>,
    pool: SqlitePool,
    fetcher: Arc<dyn PriceFetcher>,
    engine: Arc<PriceEngine>,
    sink: Arc<dyn NotifySink>,
    stats: Arc<CycleStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    let poll_interval = Duration::from_secs(config.monitor.poll_interval_secs);
    let inter_app_delay = Duration::from_millis(config.monitor.inter_app_delay_ms);
    let region = config.steam.default_region.clone();

    info!(
        interval_secs = config.monitor.poll_interval_secs,
        region = %region,
        "price monitor started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        stats.cycle_started(Utc::now());
        let outcome = run_price_cycle(
            &pool,
            fetcher.as_ref(),
            engine.as_ref(),
            sink.as_ref(),
            &region,
            inter_app_delay,
        )
        .await;
        stats.cycle_finished(
            outcome.apps_checked,
            outcome.failures,
            outcome.notifications_sent,
            Utc::now(),
        );

        info!(
            apps = outcome.apps_checked,
            failures = outcome.failures,
            events = outcome.events_emitted,
            sent = outcome.notifications_sent,
            "price cycle complete"
        );

        tokio::select! {
            _ = time::sleep(poll_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    info!("price monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::test_pool;
    use crate::monitor::testing::{RecordingSink, ScriptedFetcher, Step};

    async fn setup() -> (SqlitePool, PriceEngine) {
        let pool = test_pool().await;
        let engine = PriceEngine::new(pool.clone());
        (pool, engine)
    }

    #[tokio::test]
    async fn new_low_reaches_every_channel() {
        let (pool, engine) = setup().await;
        queries::upsert_tracked_game(&pool, 620, "Portal 2", false, None)
            .await
            .unwrap();
        queries::set_server_channel(&pool, 1, 100, true).await.unwrap();
        queries::set_server_channel(&pool, 2, 200, false).await.unwrap();

        let fetcher = ScriptedFetcher::new();
        fetcher.script(620, vec![Step::Price(100.0), Step::Price(90.0)]);
        let sink = RecordingSink::enabled();

        // First cycle only establishes the baseline.
        let outcome =
            run_price_cycle(&pool, &fetcher, &engine, &sink, "tw", Duration::ZERO).await;
        assert_eq!(outcome.apps_checked, 1);
        assert_eq!(outcome.notifications_sent, 0);
        assert!(sink.deliveries().is_empty());

        // Second cycle sees the drop and fans out to both channels.
        let outcome =
            run_price_cycle(&pool, &fetcher, &engine, &sink, "tw", Duration::ZERO).await;
        assert_eq!(outcome.notifications_sent, 2);

        let delivered = sink.deliveries();
        assert_eq!(delivered.len(), 2);
        assert!(delivered.iter().any(|(id, kind)| *id == 100 && kind == "new_low"));
        assert!(delivered.iter().any(|(id, kind)| *id == 200 && kind == "new_low"));
    }

    #[tokio::test]
    async fn one_failing_app_does_not_abort_the_cycle() {
        let (pool, engine) = setup().await;
        queries::upsert_tracked_game(&pool, 10, "Broken", false, None)
            .await
            .unwrap();
        queries::upsert_tracked_game(&pool, 620, "Portal 2", false, None)
            .await
            .unwrap();

        let fetcher = ScriptedFetcher::new();
        fetcher.script(10, vec![Step::Fail]);
        fetcher.script(620, vec![Step::Price(100.0)]);
        let sink = RecordingSink::enabled();

        let outcome =
            run_price_cycle(&pool, &fetcher, &engine, &sink, "tw", Duration::ZERO).await;

        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.apps_checked, 1);

        // The healthy app's observation still landed.
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM price_history WHERE app_id = 620",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn free_transition_fans_out_regardless_of_promotion_flag() {
        let (pool, engine) = setup().await;
        queries::upsert_tracked_game(&pool, 570, "Dota 2", false, None)
            .await
            .unwrap();
        queries::set_server_channel(&pool, 1, 100, false).await.unwrap();

        let fetcher = ScriptedFetcher::new();
        fetcher.script(570, vec![Step::Free]);
        let sink = RecordingSink::enabled();

        let outcome =
            run_price_cycle(&pool, &fetcher, &engine, &sink, "tw", Duration::ZERO).await;

        assert_eq!(outcome.notifications_sent, 1);
        let delivered = sink.deliveries();
        assert_eq!(delivered[0], (100, "free_game".to_string()));
    }

    #[tokio::test]
    async fn prices_are_recorded_even_without_channels() {
        let (pool, engine) = setup().await;
        queries::upsert_tracked_game(&pool, 620, "Portal 2", false, None)
            .await
            .unwrap();

        let fetcher = ScriptedFetcher::new();
        fetcher.script(620, vec![Step::Price(100.0)]);
        let sink = RecordingSink::enabled();

        let outcome =
            run_price_cycle(&pool, &fetcher, &engine, &sink, "tw", Duration::ZERO).await;

        assert_eq!(outcome.apps_checked, 1);
        assert_eq!(outcome.notifications_sent, 0);

        let low = queries::get_historical_low(&pool, 620, "tw").await.unwrap();
        assert!(low.is_some());
    }

    #[tokio::test]
    async fn delisted_apps_are_skipped_without_counting_as_failures() {
        let (pool, engine) = setup().await;
        queries::upsert_tracked_game(&pool, 999, "Gone", false, None)
            .await
            .unwrap();

        let fetcher = ScriptedFetcher::new();
        fetcher.script(999, vec![Step::Missing]);
        let sink = RecordingSink::enabled();

        let outcome =
            run_price_cycle(&pool, &fetcher, &engine, &sink, "tw", Duration::ZERO).await;

        assert_eq!(outcome.apps_checked, 0);
        assert_eq!(outcome.failures, 0);
    }

    #[tokio::test]
    async fn failed_deliveries_are_logged_not_fatal() {
        let (pool, engine) = setup().await;
        queries::upsert_tracked_game(&pool, 570, "Dota 2", false, None)
            .await
            .unwrap();
        queries::set_server_channel(&pool, 1, 100, true).await.unwrap();

        let fetcher = ScriptedFetcher::new();
        fetcher.script(570, vec![Step::Free]);
        let sink = RecordingSink::enabled();
        sink.fail_next_deliveries(true);

        let outcome =
            run_price_cycle(&pool, &fetcher, &engine, &sink, "tw", Duration::ZERO).await;

        // The event happened and was recorded; delivery just didn't land.
        assert_eq!(outcome.events_emitted, 1);
        assert_eq!(outcome.notifications_sent, 0);
        assert_eq!(outcome.failures, 0);
    }
}
