//! Submarine control routes: registration, movement commands, snorkel,
//! emergency blow, the passive array toggle, weather scanning, and active
//! pinging. One handler per Flask route of the same name in the source.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use subsim_shared::geometry::{clamp, compass_deg_to_world_rad, distance, world_rad_to_compass_deg};
use subsim_shared::ids::SubId;
use subsim_shared::sonar::active::ping_cost;
use subsim_shared::world::Submarine;
use subsim_shared::ApiError;

use crate::auth::AuthedUser;
use crate::error::AppResult;
use crate::state::{AppState, PendingPing};

fn find_owned_sub<'a>(
    world: &'a subsim_shared::world::World,
    sub_id: SubId,
    owner: subsim_shared::ids::UserId,
) -> Result<&'a Submarine, ApiError> {
    let sub = world.subs.get(&sub_id).ok_or(ApiError::NotFound("submarine"))?;
    if sub.owner != owner {
        return Err(ApiError::NotOwner);
    }
    Ok(sub)
}

#[derive(Deserialize)]
pub struct RegisterSubRequest {
    pub name: String,
}

pub async fn register_sub(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<RegisterSubRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let now = state.sim_now();
    let mut world = state.world.lock().unwrap();
    let cfg = &state.config;

    let alive_count = world.living_subs_owned_by(user.user_id).count();
    if alive_count >= cfg.sub.max_per_user as usize {
        return Err(ApiError::PreconditionFailed("max submarines already registered".into()).into());
    }
    if let Some(blocking) = world
        .subs_owned_by(user.user_id)
        .filter(|s| !s.alive)
        .filter_map(|s| s.died_at.map(|d| (s.id, d)))
        .find(|(_, died_at)| now - died_at < cfg.sub.respawn_cooldown_s)
    {
        let remaining = cfg.sub.respawn_cooldown_s - (now - blocking.1);
        return Err(ApiError::TooManyRequests(format!(
            "respawn cooldown active, {remaining:.0}s remaining"
        ))
        .into());
    }

    let mut rng = rand::thread_rng();
    let (x, y) = loop {
        let r = rng.gen_range(cfg.world.spawn_min_r..cfg.world.spawn_max_r);
        let theta: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let x = cfg.world.ring.x + r * theta.cos();
        let y = cfg.world.ring.y + r * theta.sin();
        let too_close = world
            .subs
            .values()
            .filter(|s| s.alive)
            .any(|s| distance(s.x, s.y, x, y) < cfg.world.safe_spawn_separation);
        if !too_close {
            break (x, y);
        }
    };

    let sub = Submarine {
        id: SubId::new(),
        owner: user.user_id,
        name: req.name,
        alive: true,
        x,
        y,
        depth: 50.0,
        heading: 0.0,
        target_heading: 0.0,
        rudder_rad: 0.0,
        target_rudder_rad: 0.0,
        manual_rudder: false,
        pitch: 0.0,
        planes: 0.0,
        target_depth: 50.0,
        throttle: 0.0,
        speed: 0.0,
        battery: rng.gen_range(cfg.sub.battery.initial_min..=cfg.sub.battery.initial_max),
        fuel: cfg.sub.battery.initial_fuel,
        health: 100.0,
        snorkel: false,
        blow_active: false,
        blow_charge: 1.0,
        blow_end: None,
        refuel_active: false,
        refuel_timer: 0.0,
        refuel_fueler_id: None,
        passive_array_active: true,
        last_active_ping_at: None,
        scanner_noise_until: None,
        kills: 0,
        score: 0,
        died_at: None,
        respawn_at: None,
        torpedoes_loaded: cfg.torpedo.magazine_size,
        last_register_at: Some(now),
    };
    let id = sub.id;
    world.subs.insert(id, sub);
    Ok(Json(json!({ "ok": true, "sub_id": id.to_string(), "x": x, "y": y })))
}

#[derive(Deserialize)]
pub struct ControlRequest {
    pub sub_id: SubId,
    pub target_heading_deg: Option<f64>,
    pub throttle: Option<f64>,
    pub target_depth: Option<f64>,
    /// Commanded planes deflection in `[-1, 1]`. Takes pitch authority away
    /// from the depth-hold autopilot once its magnitude is above 0.05.
    pub planes: Option<f64>,
    /// Absolute rudder command in `[-1, 1]`, scaled to `max_rudder_deg`.
    pub rudder_cmd: Option<f64>,
    /// Additive rudder nudge in `[-1, 1]`, scaled to `max_rudder_deg` and
    /// clamped against the current commanded deflection.
    pub rudder_nudge: Option<f64>,
}

pub async fn control(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<ControlRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    find_owned_sub(&world, req.sub_id, user.user_id)?;
    let max_rudder = state.config.sub.max_rudder_deg.to_radians();
    let sub = world.subs.get_mut(&req.sub_id).unwrap();
    if !sub.alive {
        return Err(ApiError::PreconditionFailed("submarine is not alive".into()).into());
    }
    if let Some(deg) = req.target_heading_deg {
        sub.target_heading = compass_deg_to_world_rad(deg);
        sub.manual_rudder = false;
    }
    if let Some(t) = req.throttle {
        sub.throttle = clamp(t, 0.0, 1.0);
    }
    if let Some(d) = req.target_depth {
        sub.target_depth = d.max(0.0);
    }
    if let Some(p) = req.planes {
        sub.planes = clamp(p, -1.0, 1.0);
    }
    if let Some(rudder_cmd) = req.rudder_cmd {
        sub.target_rudder_rad = clamp(rudder_cmd, -1.0, 1.0) * max_rudder;
        sub.manual_rudder = true;
    }
    if let Some(nudge) = req.rudder_nudge {
        sub.target_rudder_rad = clamp(
            sub.target_rudder_rad + clamp(nudge, -1.0, 1.0) * max_rudder,
            -max_rudder,
            max_rudder,
        );
        sub.manual_rudder = true;
    }
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct SnorkelRequest {
    pub sub_id: SubId,
    pub on: bool,
}

pub async fn snorkel(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<SnorkelRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    let sub = find_owned_sub(&world, req.sub_id, user.user_id)?;
    if req.on && sub.depth > state.config.sub.snorkel_depth {
        return Err(ApiError::PreconditionFailed("too deep to raise the snorkel mast".into()).into());
    }
    world.subs.get_mut(&req.sub_id).unwrap().snorkel = req.on;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct SubIdRequest {
    pub sub_id: SubId,
}

pub async fn emergency_blow(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<SubIdRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let now = state.sim_now();
    let mut world = state.world.lock().unwrap();
    find_owned_sub(&world, req.sub_id, user.user_id)?;
    let cfg = &state.config.sub.emergency_blow;
    let sub = world.subs.get_mut(&req.sub_id).unwrap();
    if sub.blow_charge <= 0.0 {
        return Err(ApiError::PreconditionFailed("no charge for blow".into()).into());
    }
    sub.blow_active = true;
    sub.blow_end = Some(now + cfg.duration_s);
    Ok(Json(json!({ "ok": true, "until": now + cfg.duration_s })))
}

#[derive(Deserialize)]
pub struct SetHeadingRequest {
    pub sub_id: SubId,
    pub compass_deg: f64,
}

pub async fn set_sub_heading(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<SetHeadingRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    find_owned_sub(&world, req.sub_id, user.user_id)?;
    let sub = world.subs.get_mut(&req.sub_id).unwrap();
    sub.target_heading = compass_deg_to_world_rad(req.compass_deg);
    sub.manual_rudder = false;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct TurnSubRequest {
    pub sub_id: SubId,
    pub relative_deg: f64,
}

/// A relative helm order: nudges the commanded rudder deflection instead of
/// setting an absolute target heading, and switches the sub out of
/// auto-heading mode until the next `/set_sub_heading` or `/control`
/// heading command.
pub async fn turn_sub(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<TurnSubRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    find_owned_sub(&world, req.sub_id, user.user_id)?;
    let cfg = &state.config.sub;
    let sub = world.subs.get_mut(&req.sub_id).unwrap();
    sub.manual_rudder = true;
    let max_rudder = cfg.max_rudder_deg.to_radians();
    sub.target_rudder_rad = clamp(
        sub.target_rudder_rad + req.relative_deg.to_radians(),
        -max_rudder,
        max_rudder,
    );
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct SetPassiveArrayRequest {
    pub sub_id: SubId,
    pub active: bool,
}

pub async fn set_passive_array(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<SetPassiveArrayRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let mut world = state.world.lock().unwrap();
    find_owned_sub(&world, req.sub_id, user.user_id)?;
    world.subs.get_mut(&req.sub_id).unwrap().passive_array_active = req.active;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct WeatherScanRequest {
    pub sub_id: SubId,
}

#[derive(Serialize)]
struct SectorHit {
    bearing_deg: f64,
    distance_m: f64,
}

/// A full 360-degree sweep sectorized into 36 ten-degree bins. Each bin
/// reports the nearest cloud edge inside it, if any, with range/bearing
/// noise applied. Costs battery up front and leaves the sub acoustically
/// noisy for `noise_duration_s` afterward (see `scanner_noise_bonus_db` in
/// the passive sonar model).
pub async fn weather_scan(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<WeatherScanRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let now = state.sim_now();
    let mut world = state.world.lock().unwrap();
    find_owned_sub(&world, req.sub_id, user.user_id)?;
    let scanner_cfg = state.config.world.weather.scanner.clone();

    let (sx, sy, battery_after) = {
        let sub = world.subs.get_mut(&req.sub_id).unwrap();
        if sub.battery < scanner_cfg.battery_cost {
            return Err(ApiError::PreconditionFailed("insufficient battery for weather scan".into()).into());
        }
        sub.battery -= scanner_cfg.battery_cost;
        sub.scanner_noise_until = Some(now + scanner_cfg.noise_duration_s);
        (sub.x, sub.y, sub.battery)
    };

    let mut rng = rand::thread_rng();
    let mut hits: Vec<SectorHit> = Vec::with_capacity(36);
    for bin in 0..36u32 {
        let bin_center = bin as f64 * 10.0;
        let nearest = world
            .weather
            .iter()
            .filter_map(|c| {
                let dx = c.x - sx;
                let dy = c.y - sy;
                let bearing = world_rad_to_compass_deg(dy.atan2(dx));
                let mut diff = (bearing - bin_center).abs() % 360.0;
                if diff > 180.0 {
                    diff = 360.0 - diff;
                }
                if diff > 5.0 {
                    return None;
                }
                let edge = (distance(sx, sy, c.x, c.y) - c.radius).max(0.0);
                if edge > scanner_cfg.max_range_m {
                    return None;
                }
                Some((edge, bearing))
            })
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        if let Some((edge, bearing)) = nearest {
            let noisy_range =
                (edge + rng.gen_range(-scanner_cfg.rng_sigma_m..=scanner_cfg.rng_sigma_m)).max(0.0);
            let noisy_bearing = (bearing
                + rng.gen_range(-scanner_cfg.brg_sigma_deg..=scanner_cfg.brg_sigma_deg))
            .rem_euclid(360.0);
            hits.push(SectorHit {
                bearing_deg: noisy_bearing,
                distance_m: noisy_range,
            });
        }
    }

    Ok(Json(json!({ "ok": true, "hits": hits, "battery": battery_after })))
}

#[derive(Deserialize)]
pub struct PingRequest {
    pub sub_id: SubId,
    pub beam_deg: f64,
    pub range_m: f64,
}

/// Active sonar ping: deducts battery, enforces the per-sub cooldown,
/// schedules an echo for the owner to receive at
/// `now + 2*range/sound_speed`, and separately evaluates whether any other
/// living sub is close/loud enough to notice the ping itself.
pub async fn ping(
    State(state): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<PingRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let now = state.sim_now();
    let mut world = state.world.lock().unwrap();
    find_owned_sub(&world, req.sub_id, user.user_id)?;
    let power_cfg = state.config.sonar.active_power.clone();
    let active_cfg = &state.config.sonar.active;

    let sub = world.subs.get_mut(&req.sub_id).unwrap();
    if let Some(last) = sub.last_active_ping_at {
        if now - last < power_cfg.cooldown_s {
            return Err(ApiError::TooManyRequests("active sonar cooling down".into()).into());
        }
    }
    let beam = req.beam_deg.clamp(1.0, active_cfg.max_angle);
    let range = req.range_m.clamp(1.0, active_cfg.max_range);
    let cost = ping_cost(beam, range, &power_cfg);
    if sub.battery < power_cfg.min_battery || sub.battery < cost {
        return Err(ApiError::PreconditionFailed("insufficient battery for active ping".into()).into());
    }
    sub.battery -= cost;
    sub.last_active_ping_at = Some(now);
    let sound_speed = active_cfg.sound_speed;
    let eta = subsim_shared::sonar::active::echo_eta(now, range, sound_speed);

    drop(world);
    let mut pending = state.pending_pings.lock().unwrap();
    pending.push(PendingPing {
        observer_sub: req.sub_id,
        eta,
        contacts: Vec::new(),
    });

    Ok(Json(json!({ "ok": true, "cost": cost, "eta": eta })))
}
