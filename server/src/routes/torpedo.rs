//! Torpedo control routes: launch, reload, guidance commands, onboard
//! sonar toggles, and manual detonation. Grounded one-to-one on the
//! source's routes of the same names.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use subsim_shared::geometry::compass_deg_to_world_rad;
use subsim_shared::ids::{SubId, TorpedoId};
use subsim_shared::weapons::resolve_detonation;
use subsim_shared::world::Torpedo;
use subsim_shared::ApiError;

use crate::auth::AuthedUser;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LaunchTorpedoRequest {
    pub sub_id: SubId,
    pub heading_deg: f64,
}

pub async fn launch_torpedo(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<LaunchTorpedoRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let now = state.sim_now();
    let mut world = state.world.lock().unwrap();
    let cfg = &state.config.torpedo;

    let sub = world.subs.get(&req.sub_id).ok_or(ApiError::NotFound("submarine"))?;
    if sub.owner != user.user_id {
        return Err(ApiError::NotOwner.into());
    }
    if !sub.alive {
        return Err(ApiError::PreconditionFailed("submarine is not alive".into()).into());
    }
    if sub.torpedoes_loaded == 0 {
        return Err(ApiError::PreconditionFailed("no torpedoes loaded".into()).into());
    }

    let heading = compass_deg_to_world_rad(req.heading_deg);
    let nose_x = sub.x + cfg.nose_offset_m * heading.cos();
    let nose_y = sub.y + cfg.nose_offset_m * heading.sin();
    let depth = sub.depth;
    let owner = sub.owner;
    let parent_sub = sub.id;

    let torp = Torpedo {
        id: TorpedoId::new(),
        owner,
        parent_sub,
        alive: true,
        x: nose_x,
        y: nose_y,
        depth,
        heading,
        target_heading: heading,
        depth_rate_target: 0.0,
        target_depth: depth,
        speed: cfg.speed,
        target_speed: cfg.speed,
        battery: cfg.battery.capacity,
        battery_dead: false,
        wire_linked: true,
        spawned_at: now,
        armed: false,
        passive_sonar_on: true,
        auto_ping_on: false,
        last_auto_ping_at: None,
        last_manual_ping_at: None,
        distance_travelled: 0.0,
    };
    let id = torp.id;
    world.torpedoes.insert(id, torp);
    world.subs.get_mut(&req.sub_id).unwrap().torpedoes_loaded -= 1;

    Ok(Json(json!({ "ok": true, "torpedo_id": id.to_string() })))
}

#[derive(Deserialize)]
pub struct ReloadRequest {
    pub sub_id: SubId,
}

pub async fn reload_torpedoes(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<ReloadRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    let cfg = &state.config.torpedo;
    let sub = world.subs.get_mut(&req.sub_id).ok_or(ApiError::NotFound("submarine"))?;
    if sub.owner != user.user_id {
        return Err(ApiError::NotOwner.into());
    }
    let missing = cfg.magazine_size.saturating_sub(sub.torpedoes_loaded);
    let cost = missing as f64 * cfg.reload_battery_cost_per_torp;
    if sub.battery < cost {
        return Err(ApiError::PreconditionFailed("insufficient battery to reload".into()).into());
    }
    sub.battery -= cost;
    sub.torpedoes_loaded = cfg.magazine_size;
    Ok(Json(json!({ "ok": true, "torpedoes_loaded": sub.torpedoes_loaded })))
}

fn find_owned_torpedo<'a>(
    world: &'a subsim_shared::world::World,
    torp_id: TorpedoId,
    owner: subsim_shared::ids::UserId,
) -> Result<&'a Torpedo, ApiError> {
    let torp = world.torpedoes.get(&torp_id).ok_or(ApiError::NotFound("torpedo"))?;
    if torp.owner != owner {
        return Err(ApiError::NotOwner);
    }
    Ok(torp)
}

macro_rules! torp_setter_route {
    ($name:ident, $field:ident, $req:ident, $value_field:ident: $ty:ty) => {
        #[derive(Deserialize)]
        pub struct $req {
            pub torpedo_id: TorpedoId,
            pub $value_field: $ty,
        }

        pub async fn $name(
            State(state): State<Arc<AppState>>,
            user: AuthedUser,
            Json(req): Json<$req>,
        ) -> AppResult<Json<serde_json::Value>> {
            let mut world = state.world.lock().unwrap();
            find_owned_torpedo(&world, req.torpedo_id, user.user_id)?;
            world.torpedoes.get_mut(&req.torpedo_id).unwrap().$field = req.$value_field;
            Ok(Json(json!({ "ok": true })))
        }
    };
}

torp_setter_route!(set_torp_speed, target_speed, SetTorpSpeedRequest, target_speed: f64);
torp_setter_route!(set_torp_depth, target_depth, SetTorpDepthRequest, target_depth: f64);

#[derive(Deserialize)]
pub struct SetTorpHeadingRequest {
    pub torpedo_id: TorpedoId,
    pub compass_deg: f64,
}

pub async fn set_torp_heading(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<SetTorpHeadingRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    find_owned_torpedo(&world, req.torpedo_id, user.user_id)?;
    let torp = world.torpedoes.get_mut(&req.torpedo_id).unwrap();
    let rad = compass_deg_to_world_rad(req.compass_deg);
    torp.heading = rad;
    torp.target_heading = rad;
    Ok(Json(json!({ "ok": true })))
}

/// Unlike `/set_torp_heading`, this only updates the guidance target and
/// lets the turn-rate-limited integrator steer toward it over several
/// ticks (mirrors `/set_torp_target_heading` in the source, distinct from
/// the immediate-snap `/set_torp_heading`).
pub async fn set_torp_target_heading(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<SetTorpHeadingRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    find_owned_torpedo(&world, req.torpedo_id, user.user_id)?;
    world.torpedoes.get_mut(&req.torpedo_id).unwrap().target_heading = compass_deg_to_world_rad(req.compass_deg);
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct TorpIdRequest {
    pub torpedo_id: TorpedoId,
}

/// Manual active ping from a torpedo's nose transducer: fixed 30-degree
/// beam, always deducts its battery cost even if no contacts return
/// (distinct from the torpedo's gated auto-ping, which only charges battery
/// when it actually hears something).
pub async fn torp_ping(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<TorpIdRequest>,
) -> AppResult<Json<serde_json::Value>> {
    const MANUAL_PING_BEAM_DEG: f64 = 30.0;
    let now = state.sim_now();
    let mut world = state.world.lock().unwrap();
    find_owned_torpedo(&world, req.torpedo_id, user.user_id)?;
    let cfg = state.config.torpedo.battery.clone();
    let torp = world.torpedoes.get_mut(&req.torpedo_id).unwrap();
    if torp.battery < cfg.active_ping_cost {
        return Err(ApiError::PreconditionFailed("insufficient torpedo battery".into()).into());
    }
    torp.battery -= cfg.active_ping_cost;
    torp.last_manual_ping_at = Some(now);
    let _ = MANUAL_PING_BEAM_DEG;
    Ok(Json(json!({ "ok": true })))
}

pub async fn torp_ping_toggle(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<TorpIdRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    find_owned_torpedo(&world, req.torpedo_id, user.user_id)?;
    let torp = world.torpedoes.get_mut(&req.torpedo_id).unwrap();
    torp.auto_ping_on = !torp.auto_ping_on;
    Ok(Json(json!({ "ok": true, "auto_ping_on": torp.auto_ping_on })))
}

pub async fn torp_passive_sonar_toggle(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<TorpIdRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    find_owned_torpedo(&world, req.torpedo_id, user.user_id)?;
    let torp = world.torpedoes.get_mut(&req.torpedo_id).unwrap();
    torp.passive_sonar_on = !torp.passive_sonar_on;
    Ok(Json(json!({ "ok": true, "passive_sonar_on": torp.passive_sonar_on })))
}

/// Manual command detonation. Graduated blast damage same as a proximity
/// detonation, credited to the torpedo's owner.
pub async fn detonate(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<TorpIdRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let now = state.sim_now();
    let mut world = state.world.lock().unwrap();
    let torp = find_owned_torpedo(&world, req.torpedo_id, user.user_id)?;
    let (x, y, depth, owner) = (torp.x, torp.y, torp.depth, torp.owner);
    let blast_radius = state.config.torpedo.blast_radius;

    world.torpedoes.remove(&req.torpedo_id);
    let outcome = resolve_detonation(&mut world.subs, (x, y, depth), blast_radius, owner, now);

    Ok(Json(json!({
        "ok": true,
        "affected": outcome.affected.iter().map(|a| json!({
            "sub_id": a.sub_id.to_string(), "damage": a.damage, "killed": a.killed
        })).collect::<Vec<_>>(),
    })))
}
