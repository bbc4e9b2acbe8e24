//! Historical-low and free-transition detection.
//!
//! `record_observation` is the single entry point: one observation goes in,
//! zero or more notable events come out, and every state change it implies
//! commits in one transaction. The stored low for an (app, region) pair only
//! ever decreases.

use dashmap::DashMap;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::observation::{Observation, PriceEvent};
use crate::db::queries;
use crate::error::Result;

pub struct PriceEngine {
    pool: SqlitePool,
    /// Serializes observations for the same (app, region) pair.
    locks: DashMap<(i64, String), Arc<Mutex<()>>>,
}

impl PriceEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, app_id: i64, region: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry((app_id, region.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Process one observation.
    ///
    /// Emits `BecameFree` on a paid-to-free edge, `BaselineEstablished` for
    /// the first paid observation of an (app, region) pair, and `NewLow`
    /// when a paid observation beats the stored low. The raw observation is
    /// appended to the price log on every path.
    pub async fn record_observation(&self, obs: &Observation) -> Result<Vec<PriceEvent>> {
        let lock = self.lock_for(obs.app_id, &obs.region);
        let _guard = lock.lock().await;

        let mut tx = self.pool.begin().await?;
        let mut events = Vec::new();

        // 1. Free-transition edge detection
        let was_free = queries::get_free_status(&mut *tx, obs.app_id).await?;
        if obs.is_free {
            if was_free != Some(true) {
                queries::set_free_status(&mut *tx, obs.app_id, true).await?;
                queries::insert_free_game_event(&mut *tx, obs.app_id, &obs.name, obs.observed_at)
                    .await?;
                events.push(PriceEvent::BecameFree {
                    app_id: obs.app_id,
                    name: obs.name.clone(),
                });
            }
        } else if was_free == Some(true) {
            // Going paid again re-arms the detector, silently.
            queries::set_free_status(&mut *tx, obs.app_id, false).await?;
        }

        // 2. Historical-low compare-and-set, paid apps only
        if !obs.is_free {
            let stored = queries::get_historical_low(&mut *tx, obs.app_id, &obs.region).await?;
            match stored {
                None => {
                    queries::insert_historical_low(
                        &mut *tx,
                        obs.app_id,
                        &obs.region,
                        obs.price,
                        obs.observed_at,
                    )
                    .await?;
                    events.push(PriceEvent::BaselineEstablished {
                        app_id: obs.app_id,
                        region: obs.region.clone(),
                        price: obs.price,
                        currency: obs.currency.clone(),
                    });
                }
                Some(low) if obs.price < low.lowest_price && obs.price > 0.0 => {
                    let drop_percent =
                        (low.lowest_price - obs.price) / low.lowest_price * 100.0;
                    queries::update_historical_low(
                        &mut *tx,
                        obs.app_id,
                        &obs.region,
                        obs.price,
                        obs.observed_at,
                    )
                    .await?;
                    queries::insert_new_low_event(
                        &mut *tx,
                        obs.app_id,
                        &obs.name,
                        &obs.region,
                        obs.price,
                        &obs.currency,
                        obs.observed_at,
                    )
                    .await?;
                    events.push(PriceEvent::NewLow {
                        app_id: obs.app_id,
                        name: obs.name.clone(),
                        region: obs.region.clone(),
                        price: obs.price,
                        previous_low: low.lowest_price,
                        drop_percent,
                        discount: obs.discount,
                        currency: obs.currency.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        // 3. Every observation lands in the price log
        queries::insert_observation(
            &mut *tx,
            obs.app_id,
            &obs.region,
            if obs.is_free { 0.0 } else { obs.price },
            obs.discount,
            &obs.currency,
            obs.observed_at,
        )
        .await?;

        // 4. Stamp the check time
        queries::touch_last_check(&mut *tx, obs.app_id, obs.observed_at).await?;

        tx.commit().await?;

        for event in &events {
            match event {
                PriceEvent::BaselineEstablished { region, price, .. } => {
                    debug!(app_id = obs.app_id, region = %region, price, "price baseline established");
                }
                PriceEvent::NewLow {
                    price,
                    previous_low,
                    drop_percent,
                    ..
                } => {
                    info!(
                        app_id = obs.app_id,
                        name = %obs.name,
                        region = %obs.region,
                        price,
                        previous_low,
                        drop_percent = format!("{drop_percent:.1}"),
                        "new historical low"
                    );
                }
                PriceEvent::BecameFree { name, .. } => {
                    info!(app_id = obs.app_id, name = %name, "app became free");
                }
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::test_pool;
    use chrono::Utc;

    async fn engine_with_game(app_id: i64, name: &str) -> PriceEngine {
        let pool = test_pool().await;
        queries::upsert_tracked_game(&pool, app_id, name, false, None)
            .await
            .unwrap();
        PriceEngine::new(pool)
    }

    fn paid_obs(app_id: i64, region: &str, price: f64) -> Observation {
        Observation {
            app_id,
            name: "Test Game".into(),
            region: region.into(),
            price,
            discount: 0,
            currency: "TWD".into(),
            is_free: false,
            observed_at: Utc::now(),
        }
    }

    fn free_obs(app_id: i64, region: &str) -> Observation {
        Observation {
            app_id,
            name: "Test Game".into(),
            region: region.into(),
            price: 0.0,
            discount: 0,
            currency: "FREE".into(),
            is_free: true,
            observed_at: Utc::now(),
        }
    }

    async fn stored_low(engine: &PriceEngine, app_id: i64, region: &str) -> Option<f64> {
        queries::get_historical_low(&engine.pool, app_id, region)
            .await
            .unwrap()
            .map(|l| l.lowest_price)
    }

    #[tokio::test]
    async fn baseline_then_new_low_then_silence() {
        let engine = engine_with_game(620, "Portal 2").await;

        let events = engine
            .record_observation(&paid_obs(620, "tw", 100.0))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            PriceEvent::BaselineEstablished { price, .. } if *price == 100.0
        ));

        let events = engine
            .record_observation(&paid_obs(620, "tw", 90.0))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            PriceEvent::NewLow {
                price,
                previous_low,
                drop_percent,
                ..
            } => {
                assert_eq!(*price, 90.0);
                assert_eq!(*previous_low, 100.0);
                assert!((drop_percent - 10.0).abs() < 1e-9);
            }
            other => panic!("expected NewLow, got {other:?}"),
        }

        let events = engine
            .record_observation(&paid_obs(620, "tw", 95.0))
            .await
            .unwrap();
        assert!(events.is_empty());

        assert_eq!(stored_low(&engine, 620, "tw").await, Some(90.0));
    }

    #[tokio::test]
    async fn first_observation_is_never_a_new_low() {
        let engine = engine_with_game(440, "Team Fortress 2").await;

        let events = engine
            .record_observation(&paid_obs(440, "us", 19.99))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], PriceEvent::BaselineEstablished { .. }));

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM new_low_events")
            .fetch_one(&engine.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn equal_price_mutates_nothing() {
        let engine = engine_with_game(620, "Portal 2").await;

        engine
            .record_observation(&paid_obs(620, "tw", 100.0))
            .await
            .unwrap();
        let events = engine
            .record_observation(&paid_obs(620, "tw", 100.0))
            .await
            .unwrap();

        assert!(events.is_empty());
        assert_eq!(stored_low(&engine, 620, "tw").await, Some(100.0));
    }

    #[tokio::test]
    async fn zero_price_never_beats_the_stored_low() {
        let engine = engine_with_game(620, "Portal 2").await;

        engine
            .record_observation(&paid_obs(620, "tw", 100.0))
            .await
            .unwrap();
        let events = engine
            .record_observation(&paid_obs(620, "tw", 0.0))
            .await
            .unwrap();

        assert!(events.is_empty());
        assert_eq!(stored_low(&engine, 620, "tw").await, Some(100.0));
    }

    #[tokio::test]
    async fn free_transition_fires_once_per_edge() {
        let engine = engine_with_game(570, "Dota 2").await;

        let sequence = [false, true, true, false, true];
        let mut fired_at = Vec::new();

        for (i, is_free) in sequence.iter().enumerate() {
            let obs = if *is_free {
                free_obs(570, "tw")
            } else {
                paid_obs(570, "tw", 49.0)
            };
            let events = engine.record_observation(&obs).await.unwrap();
            if events
                .iter()
                .any(|e| matches!(e, PriceEvent::BecameFree { .. }))
            {
                fired_at.push(i);
            }
        }

        assert_eq!(fired_at, vec![1, 4]);

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM free_game_events")
            .fetch_one(&engine.pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn every_observation_lands_in_the_price_log() {
        let engine = engine_with_game(620, "Portal 2").await;

        engine
            .record_observation(&paid_obs(620, "tw", 100.0))
            .await
            .unwrap();
        engine
            .record_observation(&paid_obs(620, "tw", 90.0))
            .await
            .unwrap();
        engine
            .record_observation(&paid_obs(620, "tw", 95.0))
            .await
            .unwrap();
        engine.record_observation(&free_obs(620, "tw")).await.unwrap();

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM price_history")
            .fetch_one(&engine.pool)
            .await
            .unwrap();
        assert_eq!(count, 4);

        let free_price = sqlx::query_scalar::<_, f64>(
            "SELECT price FROM price_history ORDER BY observed_at DESC, rowid DESC LIMIT 1",
        )
        .fetch_one(&engine.pool)
        .await
        .unwrap();
        assert_eq!(free_price, 0.0);
    }

    #[tokio::test]
    async fn lows_are_tracked_per_region() {
        let engine = engine_with_game(620, "Portal 2").await;

        engine
            .record_observation(&paid_obs(620, "tw", 100.0))
            .await
            .unwrap();
        engine
            .record_observation(&paid_obs(620, "us", 9.99))
            .await
            .unwrap();
        let events = engine
            .record_observation(&paid_obs(620, "us", 4.99))
            .await
            .unwrap();

        assert!(matches!(events[0], PriceEvent::NewLow { .. }));
        assert_eq!(stored_low(&engine, 620, "tw").await, Some(100.0));
        assert_eq!(stored_low(&engine, 620, "us").await, Some(4.99));
    }

    #[tokio::test]
    async fn concurrent_observations_for_one_pair_serialize() {
        let engine = Arc::new(engine_with_game(620, "Portal 2").await);

        engine
            .record_observation(&paid_obs(620, "tw", 100.0))
            .await
            .unwrap();

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .record_observation(&paid_obs(620, "tw", 90.0))
                    .await
                    .unwrap()
            })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .record_observation(&paid_obs(620, "tw", 95.0))
                    .await
                    .unwrap()
            })
        };
        let (events_a, events_b) = (a.await.unwrap(), b.await.unwrap());

        // Interleaving decides how many drops were seen; the floor must hold
        // either way.
        assert_eq!(stored_low(&engine, 620, "tw").await, Some(90.0));

        let emitted = events_a
            .iter()
            .chain(events_b.iter())
            .filter(|e| matches!(e, PriceEvent::NewLow { .. }))
            .count() as i64;
        let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM new_low_events")
            .fetch_one(&engine.pool)
            .await
            .unwrap();
        assert_eq!(emitted, rows);
        assert!(emitted >= 1);
    }

    #[tokio::test]
    async fn last_check_is_stamped_by_each_observation() {
        let engine = engine_with_game(620, "Portal 2").await;

        let before = queries::get_tracked_game(&engine.pool, 620)
            .await
            .unwrap()
            .unwrap();
        assert!(before.last_check.is_none());

        engine
            .record_observation(&paid_obs(620, "tw", 100.0))
            .await
            .unwrap();

        let after = queries::get_tracked_game(&engine.pool, 620)
            .await
            .unwrap()
            .unwrap();
        assert!(after.last_check.is_some());
    }
}
