//! Persisted and in-memory entity records and the `World` store that holds
//! them for one tick. These are deliberately plain data: the source keeps
//! them as SQLAlchemy ORM rows (`User`, `ApiKey`, `SubModel`, `TorpedoModel`,
//! `FuelerModel`) with lazy-loaded relationships; per the Design Notes
//! ("ORM row objects -> plain data records"), here they are flat structs in
//! `HashMap`s behind a single `World`, with no hidden query machinery.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ids::{ApiKeyId, FuelerId, SubId, TorpedoId, UserId};

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub user_id: UserId,
    /// Opaque bearer token. Never logged; see `auth.rs` for the extractor.
    pub key: String,
    pub created_at: f64,
    pub last_used_at: Option<f64>,
}

/// One submarine. `heading`/`target_heading`/`rudder_rad` are world-frame
/// radians (see `geometry::compass_deg_to_world_rad`); the Control API
/// accepts and returns compass degrees and converts at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submarine {
    pub id: SubId,
    pub owner: UserId,
    pub name: String,
    pub alive: bool,

    pub x: f64,
    pub y: f64,
    pub depth: f64,

    pub heading: f64,
    pub target_heading: f64,
    /// Current rudder deflection in radians, servoed toward
    /// `target_rudder_rad` at `rudder_rate_deg_s`.
    pub rudder_rad: f64,
    /// Commanded rudder deflection. In auto-heading mode this is recomputed
    /// every tick from the heading-hold P controller; `turn_sub` overrides it
    /// directly and flips `manual_rudder` until the next `/control` heading
    /// command.
    pub target_rudder_rad: f64,
    pub manual_rudder: bool,

    pub pitch: f64,
    /// Commanded planes deflection in `[-1, 1]`. Drives the pitch servo
    /// directly (`planes * planes_effect * 30deg`); the depth-hold autopilot
    /// only takes over pitch authority when this is near zero.
    pub planes: f64,
    pub target_depth: f64,

    pub throttle: f64,
    pub speed: f64,

    pub battery: f64,
    pub fuel: f64,
    /// Hull integrity, independent of `fuel`. Blast, crush, and weather
    /// damage all drain this; it reaches 0 on a kill. Refueling tops up
    /// `fuel` only and never repairs `health`.
    pub health: f64,
    pub snorkel: bool,

    pub blow_active: bool,
    /// Compressed-air reserve for the emergency blow, `[0, 1]`. Drains over
    /// `emergency_blow.duration_s` while blowing, recharges while snorkeling
    /// with fuel remaining.
    pub blow_charge: f64,
    pub blow_end: Option<f64>,

    /// Whether this sub is currently bound to and taking on fuel from
    /// `refuel_fueler_id`. While set, `step_submarine` forces throttle and
    /// target speed to zero and moors the sub at `snorkel_depth`.
    pub refuel_active: bool,
    pub refuel_timer: f64,
    pub refuel_fueler_id: Option<FuelerId>,

    pub passive_array_active: bool,
    pub last_active_ping_at: Option<f64>,
    /// Set by `/weather_scan` to `now + noise_duration_s`; while in the
    /// future, other observers' passive SNR against this sub gets
    /// `scanner_noise_bonus_db` added.
    pub scanner_noise_until: Option<f64>,

    pub kills: u32,
    pub score: u32,

    pub died_at: Option<f64>,
    pub respawn_at: Option<f64>,

    pub torpedoes_loaded: u32,
    pub last_register_at: Option<f64>,
}

impl Submarine {
    pub fn speed_ratio(&self, max_speed: f64) -> f64 {
        if max_speed <= 0.0 {
            0.0
        } else {
            (self.speed.abs() / max_speed).clamp(0.0, 2.0)
        }
    }
}

/// A fired torpedo. `wire_linked` tracks whether the guidance wire to
/// `parent_sub` is still intact; once severed it stays severed for the
/// torpedo's lifetime (the source never re-links a wire).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Torpedo {
    pub id: TorpedoId,
    pub owner: UserId,
    pub parent_sub: SubId,
    pub alive: bool,

    pub x: f64,
    pub y: f64,
    pub depth: f64,

    pub heading: f64,
    pub target_heading: f64,

    pub depth_rate_target: f64,
    pub target_depth: f64,

    pub speed: f64,
    pub target_speed: f64,

    pub battery: f64,
    pub battery_dead: bool,

    pub wire_linked: bool,
    pub spawned_at: f64,
    pub armed: bool,

    pub passive_sonar_on: bool,
    pub auto_ping_on: bool,
    pub last_auto_ping_at: Option<f64>,
    pub last_manual_ping_at: Option<f64>,

    pub distance_travelled: f64,
}

/// Server-spawned resupply vessel. Has no human owner; `target_sub` is the
/// submarine it was dispatched to and is the only sub it will transfer fuel
/// to (see `start_refuel`'s proximity + binding check in `refuel.rs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fueler {
    pub id: FuelerId,
    pub target_sub: SubId,
    pub x: f64,
    pub y: f64,
    pub depth: f64,
    pub fuel_remaining: f64,
    pub capacity: f64,
    pub spawned_at: f64,
    pub refuel_began_at: Option<f64>,
    /// Set on the tick of the *first* nonzero transfer, not when the tank
    /// empties. The despawn rule reads this field, not a fuel==0 check.
    pub empty_since: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeatherCloud {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub depth_min: f64,
    pub depth_max: f64,
    pub spawned_at: f64,
    /// `None` for ring-generation clouds (permanent until trimmed by the
    /// global cap); `Some(expiry)` for locally-spawned ones.
    pub expires_at: Option<f64>,
}

impl WeatherCloud {
    pub fn contains_depth(&self, depth: f64) -> bool {
        depth >= self.depth_min && depth <= self.depth_max
    }

    pub fn contains_point_2d(&self, x: f64, y: f64) -> bool {
        crate::geometry::distance(x, y, self.x, self.y) <= self.radius
    }
}

/// The entire mutable simulation state for one tick, held behind a single
/// mutex in `subsim-server`'s `AppState`. Mirrors the union of SQLAlchemy
/// tables the source keeps live in its in-memory mirror (`*_mem` dicts)
/// rather than the on-disk SQLite tables themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    pub users: HashMap<UserId, User>,
    pub api_keys: HashMap<ApiKeyId, ApiKey>,
    pub subs: HashMap<SubId, Submarine>,
    pub torpedoes: HashMap<TorpedoId, Torpedo>,
    pub fuelers: HashMap<FuelerId, Fueler>,
    pub weather: Vec<WeatherCloud>,
    pub next_weather_id: u64,
    pub sim_time: f64,
    pub tick_count: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.values().find(|k| k.key == key)
    }

    pub fn subs_owned_by(&self, user: UserId) -> impl Iterator<Item = &Submarine> {
        self.subs.values().filter(move |s| s.owner == user)
    }

    pub fn living_subs_owned_by(&self, user: UserId) -> impl Iterator<Item = &Submarine> {
        self.subs_owned_by(user).filter(|s| s.alive)
    }

    pub fn next_weather_id(&mut self) -> u64 {
        let id = self.next_weather_id;
        self.next_weather_id += 1;
        id
    }
}

pub fn unix_now() -> f64 {
    now_unix()
}
