//! Tuning configuration: compiled-in defaults deep-merged with an optional
//! user-supplied JSON document, mirroring `deep_merge(DEFAULT_CFG, user_cfg)`
//! in the source. Every numeric default below is lifted directly from
//! `DEFAULT_CFG` in `examples/original_source/server_world_db.py`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

fn deep_merge(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                deep_merge(dst_map.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingConfig {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, r: 6000.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudsConfig {
    pub count: u32,
    pub min_r: f64,
    pub max_r: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    pub min_depth: f64,
    pub max_depth: f64,
    pub min_thickness: f64,
    pub max_thickness: f64,
    pub attenuation_db: f64,
    pub damage_dps: f64,
    pub max_count_factor: f64,
    pub local_spawn: LocalSpawnConfig,
}

impl Default for CloudsConfig {
    fn default() -> Self {
        Self {
            count: 24,
            min_r: 6500.0,
            max_r: 9500.0,
            min_radius: 400.0,
            max_radius: 1200.0,
            min_depth: 0.0,
            max_depth: 350.0,
            min_thickness: 60.0,
            max_thickness: 200.0,
            attenuation_db: 8.0,
            damage_dps: 2.0,
            max_count_factor: 4.0,
            local_spawn: LocalSpawnConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSpawnConfig {
    pub enabled: bool,
    pub far_margin_m: f64,
    pub inner_offset_m: f64,
    pub outer_offset_m: f64,
    pub min_local_clouds: u32,
    pub ttl_s: f64,
}

impl Default for LocalSpawnConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            far_margin_m: 2000.0,
            inner_offset_m: 2000.0,
            outer_offset_m: 6000.0,
            min_local_clouds: 40,
            ttl_s: 900.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub max_range_m: f64,
    pub battery_cost: f64,
    pub rng_sigma_m: f64,
    pub brg_sigma_deg: f64,
    pub noise_duration_s: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_range_m: 500.0,
            battery_cost: 1.0,
            rng_sigma_m: 40.0,
            brg_sigma_deg: 5.0,
            noise_duration_s: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub storm_damage_dps: f64,
    pub sonar_attenuation_db: f64,
    pub cloud_close_hear_range_m: f64,
    pub clouds: CloudsConfig,
    pub scanner: ScannerConfig,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            storm_damage_dps: 4.0,
            sonar_attenuation_db: 3.0,
            cloud_close_hear_range_m: 400.0,
            clouds: CloudsConfig::default(),
            scanner: ScannerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub ring: RingConfig,
    pub spawn_min_r: f64,
    pub spawn_max_r: f64,
    pub safe_spawn_separation: f64,
    pub weather: WeatherConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            ring: RingConfig::default(),
            spawn_min_r: 500.0,
            spawn_max_r: 4500.0,
            safe_spawn_separation: 800.0,
            weather: WeatherConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyBlowConfig {
    pub duration_s: f64,
    pub upward_mps: f64,
    pub recharge_per_s_at_snorkel: f64,
    pub cooldown_s: f64,
}

impl Default for EmergencyBlowConfig {
    fn default() -> Self {
        Self {
            duration_s: 10.0,
            upward_mps: 5.0,
            recharge_per_s_at_snorkel: 0.06,
            cooldown_s: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubBatteryConfig {
    pub initial_min: f64,
    pub initial_max: f64,
    pub drain_per_throttle_per_s: f64,
    pub high_speed_multiplier: f64,
    pub recharge_per_s_snorkel: f64,
    pub max_fuel_capacity: f64,
    pub initial_fuel: f64,
    pub refuel_rate_per_s: f64,
}

impl Default for SubBatteryConfig {
    fn default() -> Self {
        Self {
            initial_min: 40.0,
            initial_max: 80.0,
            drain_per_throttle_per_s: 0.1,
            high_speed_multiplier: 15.0,
            recharge_per_s_snorkel: 0.25,
            max_fuel_capacity: 1000.0,
            initial_fuel: 1000.0,
            refuel_rate_per_s: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubConfig {
    pub max_speed: f64,
    pub acceleration: f64,
    pub yaw_rate_deg_s: f64,
    pub pitch_rate_deg_s: f64,
    pub planes_effect: f64,
    pub neutral_bias: f64,
    pub depth_damping: f64,
    pub snorkel_depth: f64,
    pub snorkel_off_hysteresis: f64,
    pub max_per_user: u32,
    pub max_rudder_deg: f64,
    pub rudder_rate_deg_s: f64,
    pub respawn_cooldown_s: f64,
    pub emergency_blow: EmergencyBlowConfig,
    pub battery: SubBatteryConfig,
    pub crush_depth: f64,
    pub crush_dps_per_100m: f64,
}

impl Default for SubConfig {
    fn default() -> Self {
        Self {
            max_speed: 12.0,
            acceleration: 2.0,
            yaw_rate_deg_s: 3.0,
            pitch_rate_deg_s: 12.0,
            planes_effect: 1.0,
            neutral_bias: 0.008,
            depth_damping: 0.35,
            snorkel_depth: 15.0,
            snorkel_off_hysteresis: 2.0,
            max_per_user: 2,
            max_rudder_deg: 30.0,
            rudder_rate_deg_s: 60.0,
            respawn_cooldown_s: 7200.0,
            emergency_blow: EmergencyBlowConfig::default(),
            battery: SubBatteryConfig::default(),
            crush_depth: 500.0,
            crush_dps_per_100m: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TorpedoBatteryConfig {
    pub capacity: f64,
    pub drain_per_mps_per_s: f64,
    pub active_ping_cost: f64,
    pub min_for_ping: f64,
}

impl Default for TorpedoBatteryConfig {
    fn default() -> Self {
        Self {
            capacity: 100.0,
            drain_per_mps_per_s: 0.0015,
            active_ping_cost: 2.0,
            min_for_ping: 5.0,
        }
    }
}

/// Torpedo-mounted passive/active sonar (distinct from a submarine's own sonar).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TorpedoSonarConfig {
    pub passive_max_range: f64,
    pub passive_report_interval_s: [f64; 2],
    pub passive_bearing_jitter_deg: f64,
    pub active_max_range: f64,
    pub active_ping_interval_s: f64,
}

impl Default for TorpedoSonarConfig {
    fn default() -> Self {
        Self {
            passive_max_range: 2000.0,
            passive_report_interval_s: [1.0, 3.0],
            passive_bearing_jitter_deg: 8.0,
            active_max_range: 1500.0,
            active_ping_interval_s: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TorpedoConfig {
    pub speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub speed_accel_mps2: f64,
    pub turn_rate_deg_s: f64,
    pub depth_rate_m_s: f64,
    pub blast_radius: f64,
    pub lifetime_s: f64,
    pub max_range: f64,
    /// Legacy per-shot battery drain. Parsed for config-file compatibility but
    /// never applied — see SPEC_FULL.md Open Question 1.
    pub battery_cost_per_100m: f64,
    pub proximity_fuze_m: f64,
    pub arming_delay_s: f64,
    pub min_safe_distance_m: f64,
    pub magazine_size: u32,
    pub reload_battery_cost_per_torp: f64,
    pub nose_offset_m: f64,
    pub battery: TorpedoBatteryConfig,
    pub sonar: TorpedoSonarConfig,
}

impl Default for TorpedoConfig {
    fn default() -> Self {
        Self {
            speed: 6.0,
            min_speed: 8.0,
            max_speed: 18.0,
            speed_accel_mps2: 5.0,
            turn_rate_deg_s: 5.0,
            depth_rate_m_s: 6.0,
            blast_radius: 60.0,
            lifetime_s: 240.0,
            max_range: 6000.0,
            battery_cost_per_100m: 0.0,
            proximity_fuze_m: 60.0,
            arming_delay_s: 1.0,
            min_safe_distance_m: 150.0,
            magazine_size: 4,
            reload_battery_cost_per_torp: 10.0,
            nose_offset_m: 12.0,
            battery: TorpedoBatteryConfig::default(),
            sonar: TorpedoSonarConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveSonarConfig {
    pub base_snr: f64,
    pub speed_noise_gain: f64,
    pub snorkel_bonus: f64,
    pub scanner_noise_bonus_db: f64,
    pub bearing_jitter_deg: f64,
    pub report_interval_s: [f64; 2],
}

impl Default for PassiveSonarConfig {
    fn default() -> Self {
        Self {
            base_snr: 8.0,
            speed_noise_gain: 0.6,
            snorkel_bonus: 15.0,
            scanner_noise_bonus_db: 8.0,
            bearing_jitter_deg: 3.0,
            report_interval_s: [2.0, 4.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveSonarConfig {
    pub max_range: f64,
    pub max_angle: f64,
    pub sound_speed: f64,
    pub rng_sigma_m: f64,
    pub brg_sigma_deg: f64,
}

impl Default for ActiveSonarConfig {
    fn default() -> Self {
        Self {
            max_range: 6000.0,
            max_angle: 210.0,
            sound_speed: 1500.0,
            rng_sigma_m: 40.0,
            brg_sigma_deg: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivePowerConfig {
    pub base_cost: f64,
    pub cost_per_degree: f64,
    pub cost_per_100m_range: f64,
    pub min_battery: f64,
    pub cooldown_s: f64,
}

impl Default for ActivePowerConfig {
    fn default() -> Self {
        Self {
            base_cost: 0.5,
            cost_per_degree: 0.04,
            cost_per_100m_range: 0.2683,
            min_battery: 5.0,
            cooldown_s: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SonarConfig {
    pub passive: PassiveSonarConfig,
    pub active: ActiveSonarConfig,
    pub active_power: ActivePowerConfig,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            passive: PassiveSonarConfig::default(),
            active: ActiveSonarConfig::default(),
            active_power: ActivePowerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tick_hz: u32,
    pub world: WorldConfig,
    pub sub: SubConfig,
    pub torpedo: TorpedoConfig,
    pub sonar: SonarConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_hz: 10,
            world: WorldConfig::default(),
            sub: SubConfig::default(),
            torpedo: TorpedoConfig::default(),
            sonar: SonarConfig::default(),
        }
    }
}

impl Config {
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_hz as f64)
    }

    /// Load defaults, deep-merge a user document on top if `path` exists,
    /// and deserialize the result. Matches `deep_merge(DEFAULT_CFG, user_cfg)`.
    pub fn load(path: &Path) -> anyhow_compat::Result<Config> {
        let default_value = serde_json::to_value(Config::default())?;
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let user_value: Value = serde_json::from_str(&raw)?;
        let mut merged = default_value;
        deep_merge(&mut merged, &user_value);
        Ok(serde_json::from_value(merged)?)
    }
}

/// Small local stand-in for a boxed-error `Result` alias, so `config.rs`
/// doesn't need to pull in `anyhow` just for this one loader function.
mod anyhow_compat {
    pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.tick_hz, 10);
        assert_eq!(cfg.world.ring.r, 6000.0);
        assert_eq!(cfg.sub.max_speed, 12.0);
        assert_eq!(cfg.torpedo.blast_radius, 60.0);
        assert_eq!(cfg.sonar.passive.base_snr, 8.0);
    }

    #[test]
    fn deep_merge_overrides_leaf_but_keeps_siblings() {
        let mut dst = serde_json::json!({"a": {"x": 1, "y": 2}, "b": 3});
        let src = serde_json::json!({"a": {"x": 99}});
        deep_merge(&mut dst, &src);
        assert_eq!(dst["a"]["x"], 99);
        assert_eq!(dst["a"]["y"], 2);
        assert_eq!(dst["b"], 3);
    }

    #[test]
    fn load_without_file_returns_defaults() {
        let cfg = Config::load(Path::new("/nonexistent/path/game_config.json")).unwrap();
        assert_eq!(cfg.tick_hz, 10);
    }
}
