//! SQL query functions for all tables.
//!
//! Engine-path helpers take `impl SqliteExecutor<'_>` so they run either
//! directly on the pool or inside a transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use super::models::*;
use crate::error::Result;

// ── Tracked games ────────────────────────────────────────────────

/// Register an app for monitoring, replacing any prior registration.
/// `added_at` is preserved when the row already exists.
pub async fn upsert_tracked_game(
    pool: &SqlitePool,
    app_id: i64,
    name: &str,
    is_free: bool,
    image_url: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO tracked_games (app_id, name, is_free, image_url, added_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (app_id) DO UPDATE SET
           name = excluded.name,
           is_free = excluded.is_free,
           image_url = excluded.image_url",
    )
    .bind(app_id)
    .bind(name)
    .bind(is_free)
    .bind(image_url)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns true if a row existed and was removed.
pub async fn remove_tracked_game(pool: &SqlitePool, app_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tracked_games WHERE app_id = ?")
        .bind(app_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_tracked_game(
    pool: &SqlitePool,
    app_id: i64,
) -> Result<Option<DbTrackedGame>> {
    let row = sqlx::query_as::<_, DbTrackedGame>(
        "SELECT * FROM tracked_games WHERE app_id = ?",
    )
    .bind(app_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_tracked_games(pool: &SqlitePool) -> Result<Vec<DbTrackedGame>> {
    let rows = sqlx::query_as::<_, DbTrackedGame>(
        "SELECT * FROM tracked_games ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_free_status(
    exec: impl SqliteExecutor<'_>,
    app_id: i64,
) -> Result<Option<bool>> {
    let row = sqlx::query_scalar::<_, bool>(
        "SELECT is_free FROM tracked_games WHERE app_id = ?",
    )
    .bind(app_id)
    .fetch_optional(exec)
    .await?;
    Ok(row)
}

pub async fn set_free_status(
    exec: impl SqliteExecutor<'_>,
    app_id: i64,
    is_free: bool,
) -> Result<()> {
    sqlx::query("UPDATE tracked_games SET is_free = ? WHERE app_id = ?")
        .bind(is_free)
        .bind(app_id)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn touch_last_check(
    exec: impl SqliteExecutor<'_>,
    app_id: i64,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE tracked_games SET last_check = ? WHERE app_id = ?")
        .bind(at)
        .bind(app_id)
        .execute(exec)
        .await?;
    Ok(())
}

// ── Price history ────────────────────────────────────────────────

pub async fn insert_observation(
    exec: impl SqliteExecutor<'_>,
    app_id: i64,
    region: &str,
    price: f64,
    discount: i64,
    currency: &str,
    observed_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO price_history (app_id, region, price, discount, currency, observed_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(app_id)
    .bind(region)
    .bind(price)
    .bind(discount)
    .bind(currency)
    .bind(observed_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn recent_observations(
    pool: &SqlitePool,
    app_id: i64,
    limit: i64,
) -> Result<Vec<DbPriceObservation>> {
    let rows = sqlx::query_as::<_, DbPriceObservation>(
        "SELECT * FROM price_history WHERE app_id = ? ORDER BY observed_at DESC LIMIT ?",
    )
    .bind(app_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ── Historical lows ──────────────────────────────────────────────

pub async fn get_historical_low(
    exec: impl SqliteExecutor<'_>,
    app_id: i64,
    region: &str,
) -> Result<Option<DbHistoricalLow>> {
    let row = sqlx::query_as::<_, DbHistoricalLow>(
        "SELECT * FROM historical_low WHERE app_id = ? AND region = ?",
    )
    .bind(app_id)
    .bind(region)
    .fetch_optional(exec)
    .await?;
    Ok(row)
}

pub async fn insert_historical_low(
    exec: impl SqliteExecutor<'_>,
    app_id: i64,
    region: &str,
    price: f64,
    set_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO historical_low (app_id, region, lowest_price, set_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(app_id)
    .bind(region)
    .bind(price)
    .bind(set_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn update_historical_low(
    exec: impl SqliteExecutor<'_>,
    app_id: i64,
    region: &str,
    price: f64,
    set_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE historical_low SET lowest_price = ?, set_at = ?
         WHERE app_id = ? AND region = ?",
    )
    .bind(price)
    .bind(set_at)
    .bind(app_id)
    .bind(region)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn lows_for_app(pool: &SqlitePool, app_id: i64) -> Result<Vec<DbHistoricalLow>> {
    let rows = sqlx::query_as::<_, DbHistoricalLow>(
        "SELECT * FROM historical_low WHERE app_id = ? ORDER BY region",
    )
    .bind(app_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ── Events ───────────────────────────────────────────────────────

pub async fn insert_new_low_event(
    exec: impl SqliteExecutor<'_>,
    app_id: i64,
    game_name: &str,
    region: &str,
    price: f64,
    currency: &str,
    occurred_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO new_low_events (app_id, game_name, region, price, currency, occurred_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(app_id)
    .bind(game_name)
    .bind(region)
    .bind(price)
    .bind(currency)
    .bind(occurred_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn insert_free_game_event(
    exec: impl SqliteExecutor<'_>,
    app_id: i64,
    game_name: &str,
    occurred_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO free_game_events (app_id, game_name, occurred_at) VALUES (?, ?, ?)",
    )
    .bind(app_id)
    .bind(game_name)
    .bind(occurred_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn recent_new_low_events(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<DbNewLowEvent>> {
    let rows = sqlx::query_as::<_, DbNewLowEvent>(
        "SELECT * FROM new_low_events ORDER BY occurred_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn recent_free_game_events(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<DbFreeGameEvent>> {
    let rows = sqlx::query_as::<_, DbFreeGameEvent>(
        "SELECT * FROM free_game_events ORDER BY occurred_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ── Sale announcements ───────────────────────────────────────────

pub async fn is_sale_announced(pool: &SqlitePool, sale_name: &str, year: i32) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sale_announcements WHERE sale_name = ? AND year = ?",
    )
    .bind(sale_name)
    .bind(year)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Idempotent: marking an already-announced (sale, year) is a no-op.
pub async fn mark_sale_announced(pool: &SqlitePool, sale_name: &str, year: i32) -> Result<()> {
    sqlx::query(
        "INSERT INTO sale_announcements (sale_name, year, announced_at)
         VALUES (?, ?, ?)
         ON CONFLICT (sale_name, year) DO NOTHING",
    )
    .bind(sale_name)
    .bind(year)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

// ── Server channels ──────────────────────────────────────────────

pub async fn set_server_channel(
    pool: &SqlitePool,
    group_id: i64,
    channel_id: i64,
    promotions_enabled: bool,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO server_channels (group_id, channel_id, promotions_enabled, setup_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT (group_id) DO UPDATE SET
           channel_id = excluded.channel_id,
           promotions_enabled = excluded.promotions_enabled,
           setup_at = excluded.setup_at",
    )
    .bind(group_id)
    .bind(channel_id)
    .bind(promotions_enabled)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn all_server_channels(pool: &SqlitePool) -> Result<Vec<DbServerChannel>> {
    let rows = sqlx::query_as::<_, DbServerChannel>(
        "SELECT * FROM server_channels ORDER BY group_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
