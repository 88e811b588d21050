//! Read-only informational routes: `/rules`, `/state`, `/leaderboard`,
//! `/perf`, and `/admin/state`. Grounded one-to-one on the source's routes
//! of the same names.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::auth::{require_admin, AuthedUser};
use crate::error::AppResult;
use crate::state::AppState;

pub async fn rules(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "tick_hz": state.config.tick_hz,
        "world_ring": { "x": state.config.world.ring.x, "y": state.config.world.ring.y, "r": state.config.world.ring.r },
        "sub_max_speed": state.config.sub.max_speed,
        "torpedo_blast_radius": state.config.torpedo.blast_radius,
    }))
}

/// Public world snapshot: every living submarine's position, no per-owner
/// filtering. Matches the source's unauthenticated `/state` route.
pub async fn state(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let world = state.world.lock().unwrap();
    let subs: Vec<_> = world
        .subs
        .values()
        .filter(|s| s.alive)
        .map(|s| json!({"id": s.id.to_string(), "x": s.x, "y": s.y, "depth": s.depth}))
        .collect();
    Json(json!({ "subs": subs, "sim_time": world.sim_time, "tick_count": world.tick_count }))
}

/// Per-user kill/score aggregation across every submarine a user has ever
/// owned, sorted descending by score (`/leaderboard` in the source).
pub async fn leaderboard(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let world = state.world.lock().unwrap();
    let mut rows: Vec<_> = world
        .users
        .values()
        .map(|u| {
            let (kills, score) = world
                .subs_owned_by(u.id)
                .fold((0u32, 0u32), |(k, s), sub| (k + sub.kills, s + sub.score));
            json!({ "username": u.username, "kills": kills, "score": score })
        })
        .collect();
    rows.sort_by(|a, b| {
        b["score"]
            .as_u64()
            .unwrap_or(0)
            .cmp(&a["score"].as_u64().unwrap_or(0))
    });
    Json(json!({ "leaderboard": rows }))
}

/// Deliberately unauthenticated, matching the source (whose OpenAPI doc
/// claims admin-only but whose route handler never checks) — see
/// SPEC_FULL.md Open Question 2.
pub async fn perf(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let perf = state.perf.lock().unwrap();
    Json(json!({
        "tick_count": perf.tick_count,
        "last_tick_ms": perf.last_tick_ms,
        "max_tick_ms": perf.max_tick_ms,
        "avg_tick_ms": perf.avg_tick_ms,
    }))
}

pub async fn admin_state(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&user)?;
    let world = state.world.lock().unwrap();
    Ok(Json(json!({
        "user_count": world.users.len(),
        "sub_count": world.subs.len(),
        "torpedo_count": world.torpedoes.len(),
        "fueler_count": world.fuelers.len(),
        "weather_cloud_count": world.weather.len(),
        "tick_count": world.tick_count,
    })))
}
