//! Fueler dispatch and refuel binding: `/call_fueler` and `/start_refuel`.
//! Grounded on `_spawn_fueler_near_sub`/`/call_fueler`/`/start_refuel` in
//! the source.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use subsim_shared::ids::{FuelerId, SubId};
use subsim_shared::weather::is_outside_ring;
use subsim_shared::world::Fueler;
use subsim_shared::ApiError;

use crate::auth::AuthedUser;
use crate::error::AppResult;
use crate::state::AppState;

const SPAWN_MIN_DISTANCE_M: f64 = 1000.0;
const SPAWN_MAX_DISTANCE_M: f64 = 3000.0;
const SPAWN_RETRIES: u32 = 20;

#[derive(Deserialize)]
pub struct CallFuelerRequest {
    pub sub_id: SubId,
}

pub async fn call_fueler(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<CallFuelerRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let now = state.sim_now();
    let mut world = state.world.lock().unwrap();
    let sub = world.subs.get(&req.sub_id).ok_or(ApiError::NotFound("submarine"))?;
    if sub.owner != user.user_id {
        return Err(ApiError::NotOwner.into());
    }
    if world.fuelers.values().any(|f| f.target_sub == req.sub_id) {
        return Err(ApiError::PreconditionFailed("a fueler is already en route".into()).into());
    }
    let (sub_x, sub_y, sub_depth) = (sub.x, sub.y, sub.depth);
    let cfg = state.config.sub.battery.clone();
    let ring = state.config.world.ring.clone();

    let mut rng = rand::thread_rng();
    let mut spawn = None;
    for _ in 0..SPAWN_RETRIES {
        let r = rng.gen_range(SPAWN_MIN_DISTANCE_M..=SPAWN_MAX_DISTANCE_M);
        let theta: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let x = sub_x + r * theta.cos();
        let y = sub_y + r * theta.sin();
        if is_outside_ring(x, y, &ring) {
            continue;
        }
        let inside_weather = world.weather.iter().any(|c| {
            c.contains_point_2d(x, y) && c.contains_depth(sub_depth)
        });
        if inside_weather {
            continue;
        }
        spawn = Some((x, y));
        break;
    }
    let (x, y) = spawn.ok_or_else(|| {
        ApiError::PreconditionFailed("no clear spawn point found for fueler".into())
    })?;

    let fueler = Fueler {
        id: FuelerId::new(),
        target_sub: req.sub_id,
        x,
        y,
        depth: sub_depth,
        fuel_remaining: cfg.max_fuel_capacity * 0.5,
        capacity: cfg.max_fuel_capacity * 0.5,
        spawned_at: now,
        refuel_began_at: None,
        empty_since: None,
    };
    let id = fueler.id;
    world.fuelers.insert(id, fueler);
    Ok(Json(json!({ "ok": true, "fueler_id": id.to_string(), "x": x, "y": y })))
}

#[derive(Deserialize)]
pub struct StartRefuelRequest {
    pub sub_id: SubId,
    pub fueler_id: FuelerId,
}

/// Bind a fueler to the requesting sub once it is within range. Committing
/// this binding also forces the sub's snorkel on, matching the source: a
/// submarine taking on fuel at the surface needs its induction mast raised
/// regardless of what the player had it set to beforehand.
pub async fn start_refuel(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<StartRefuelRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let now = state.sim_now();
    let mut world = state.world.lock().unwrap();
    let sub = world.subs.get(&req.sub_id).ok_or(ApiError::NotFound("submarine"))?;
    if sub.owner != user.user_id {
        return Err(ApiError::NotOwner.into());
    }
    let (sub_x, sub_y, sub_depth) = (sub.x, sub.y, sub.depth);

    let in_range = {
        let fueler = world
            .fuelers
            .get(&req.fueler_id)
            .ok_or(ApiError::NotFound("fueler"))?;
        if fueler.target_sub != req.sub_id {
            return Err(ApiError::NotOwner.into());
        }
        subsim_shared::geometry::distance3d(sub_x, sub_y, sub_depth, fueler.x, fueler.y, fueler.depth)
            <= subsim_shared::refuel::BIND_RANGE_M
    };
    if !in_range {
        return Err(ApiError::PreconditionFailed("fueler out of range".into()).into());
    }

    world.fuelers.get_mut(&req.fueler_id).unwrap().refuel_began_at = Some(now);
    let snorkel_depth = state.config.sub.snorkel_depth;
    let sub = world.subs.get_mut(&req.sub_id).unwrap();
    sub.snorkel = true;
    sub.refuel_active = true;
    sub.refuel_fueler_id = Some(req.fueler_id);
    sub.refuel_timer = 0.0;
    sub.target_depth = snorkel_depth;

    Ok(Json(json!({ "ok": true, "warmup_began_at": now })))
}
