//! HTTP route handlers for the operational API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{pool, queries};
use crate::promotions::due_announcements;
use crate::steam::PriceFetcher;

use super::server::AppState;

/// Build all API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/tracked", get(tracked))
        .route(
            "/api/tracked/{app_id}",
            get(tracked_game).post(track_app).delete(untrack_app),
        )
        .route("/api/lows/{app_id}", get(lows))
        .route("/api/history/{app_id}", get(history))
        .route("/api/compare/{app_id}", get(compare))
        .route("/api/events", get(events))
        .route("/api/channels", get(channels).post(set_channel))
        .route("/api/sales", get(sales))
        .route("/health", get(health))
}

/// GET /api/status — overall monitor status.
async fn status(State(state): State<AppState>) -> Json<Value> {
    let monitor = state.stats.snapshot();
    let tracked = match queries::list_tracked_games(&state.db).await {
        Ok(rows) => rows.len(),
        Err(e) => return Json(json!({ "error": e.to_string() })),
    };
    let channels = match queries::all_server_channels(&state.db).await {
        Ok(rows) => rows.len(),
        Err(e) => return Json(json!({ "error": e.to_string() })),
    };

    Json(json!({
        "status": "running",
        "tracked_games": tracked,
        "notify_channels": channels,
        "monitor": monitor,
    }))
}

/// GET /api/tracked — all monitored apps.
async fn tracked(State(state): State<AppState>) -> Json<Value> {
    match queries::list_tracked_games(&state.db).await {
        Ok(rows) => Json(json!({ "tracked": rows })),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

/// POST /api/tracked/{app_id} — start monitoring an app.
///
/// Metadata (name, free flag, artwork) comes from the storefront at
/// registration time; the next poll cycle records its first price.
async fn track_app(State(state): State<AppState>, Path(app_id): Path<i64>) -> Json<Value> {
    let region = &state.config.steam.default_region;
    let snap = match state.steam.fetch_app(app_id, region).await {
        Ok(Some(snap)) => snap,
        Ok(None) => {
            return Json(json!({ "error": format!("app {app_id} not found on the store") }))
        }
        Err(e) => return Json(json!({ "error": e.to_string() })),
    };

    if let Err(e) = queries::upsert_tracked_game(
        &state.db,
        app_id,
        &snap.name,
        snap.is_free,
        snap.header_image.as_deref(),
    )
    .await
    {
        return Json(json!({ "error": e.to_string() }));
    }

    Json(json!({
        "app_id": app_id,
        "name": snap.name,
        "is_free": snap.is_free,
        "current_price": snap.price,
    }))
}

/// GET /api/tracked/{app_id} — one monitored app, or null when not tracked.
async fn tracked_game(State(state): State<AppState>, Path(app_id): Path<i64>) -> Json<Value> {
    match queries::get_tracked_game(&state.db, app_id).await {
        Ok(row) => Json(json!({ "app_id": app_id, "tracked": row })),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

/// DELETE /api/tracked/{app_id} — stop monitoring an app.
async fn untrack_app(State(state): State<AppState>, Path(app_id): Path<i64>) -> Json<Value> {
    match queries::remove_tracked_game(&state.db, app_id).await {
        Ok(removed) => Json(json!({ "app_id": app_id, "removed": removed })),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

#[derive(Deserialize)]
struct LowsQuery {
    region: Option<String>,
}

/// GET /api/lows/{app_id} — recorded historical lows, optionally one region.
async fn lows(
    State(state): State<AppState>,
    Path(app_id): Path<i64>,
    Query(query): Query<LowsQuery>,
) -> Json<Value> {
    let result = match query.region.as_deref() {
        Some(region) => queries::get_historical_low(&state.db, app_id, region)
            .await
            .map(|row| row.into_iter().collect()),
        None => queries::lows_for_app(&state.db, app_id).await,
    };

    match result {
        Ok(rows) => Json(json!({ "app_id": app_id, "lows": rows })),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

/// GET /api/history/{app_id} — most recent raw price observations.
async fn history(State(state): State<AppState>, Path(app_id): Path<i64>) -> Json<Value> {
    match queries::recent_observations(&state.db, app_id, 50).await {
        Ok(rows) => Json(json!({ "app_id": app_id, "history": rows })),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

/// GET /api/compare/{app_id} — current price across the compare regions.
async fn compare(State(state): State<AppState>, Path(app_id): Path<i64>) -> Json<Value> {
    let prices = state
        .steam
        .multi_region_prices(app_id, &state.config.steam.compare_regions)
        .await;
    Json(json!({ "app_id": app_id, "regions": prices }))
}

/// GET /api/events — recent price events from DB.
async fn events(State(state): State<AppState>) -> Json<Value> {
    let new_lows = match queries::recent_new_low_events(&state.db, 50).await {
        Ok(rows) => rows,
        Err(e) => return Json(json!({ "error": e.to_string() })),
    };
    let free_games = match queries::recent_free_game_events(&state.db, 50).await {
        Ok(rows) => rows,
        Err(e) => return Json(json!({ "error": e.to_string() })),
    };
    Json(json!({ "new_lows": new_lows, "free_games": free_games }))
}

/// GET /api/channels — registered delivery channels.
async fn channels(State(state): State<AppState>) -> Json<Value> {
    match queries::all_server_channels(&state.db).await {
        Ok(rows) => Json(json!({ "channels": rows })),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

#[derive(Deserialize)]
struct SetChannelBody {
    group_id: i64,
    channel_id: i64,
    #[serde(default = "default_promotions_enabled")]
    promotions_enabled: bool,
}

fn default_promotions_enabled() -> bool {
    true
}

/// POST /api/channels — register or update a group's delivery channel.
async fn set_channel(
    State(state): State<AppState>,
    Json(body): Json<SetChannelBody>,
) -> Json<Value> {
    match queries::set_server_channel(
        &state.db,
        body.group_id,
        body.channel_id,
        body.promotions_enabled,
    )
    .await
    {
        Ok(()) => Json(json!({
            "group_id": body.group_id,
            "channel_id": body.channel_id,
            "promotions_enabled": body.promotions_enabled,
        })),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

/// GET /api/sales — sale windows inside the announcement horizon.
async fn sales(State(state): State<AppState>) -> Json<Value> {
    let due = due_announcements(Utc::now(), state.config.monitor.sale_lookahead_days);
    Json(json!({ "sales": due }))
}

/// GET /health — liveness check with a database round-trip.
async fn health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match pool::health_check(&state.db).await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "database unreachable"),
    }
}
