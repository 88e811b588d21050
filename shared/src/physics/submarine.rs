//! Submarine motion integrator: `update_sub` in the source, step for step.
//!
//! Order matters and is preserved exactly, including the one quirk the
//! source has and this port keeps on purpose (see step 7 below and
//! `SPEC_FULL.md` §9 Open Question 6): the snorkel-derated max speed feeds
//! the speed-target calculation, but the battery-drain ratio is computed
//! against the un-derated `cfg.max_speed`.

use crate::config::SubConfig;
use crate::geometry::{clamp, wrap_angle};
use crate::world::Submarine;

pub fn step_submarine(sub: &mut Submarine, cfg: &SubConfig, dt: f64, now: f64) {
    if !sub.alive {
        return;
    }

    // 1. Rudder servo: ease the actual deflection toward the commanded one
    // at a fixed angular rate, independent of whether the command came from
    // a manual turn or the auto-heading controller below.
    let max_rudder = cfg.max_rudder_deg.to_radians();
    let rudder_rate = cfg.rudder_rate_deg_s.to_radians() * dt;
    sub.target_rudder_rad = clamp(sub.target_rudder_rad, -max_rudder, max_rudder);
    let rudder_err = sub.target_rudder_rad - sub.rudder_rad;
    sub.rudder_rad += clamp(rudder_err, -rudder_rate, rudder_rate);

    // 2. Auto-heading vs manual rudder: when not under a manual turn, the
    // commanded rudder is a proportional function of heading error (P=0.5),
    // clamped to the rudder's mechanical limit.
    if !sub.manual_rudder {
        let heading_err = wrap_angle(sub.target_heading - sub.heading);
        sub.target_rudder_rad = clamp(0.5 * heading_err, -max_rudder, max_rudder);
    }

    // Yaw rate is proportional to rudder deflection scaled by the hull's
    // rated yaw rate at full rudder.
    let yaw_rate = cfg.yaw_rate_deg_s.to_radians() * (sub.rudder_rad / max_rudder.max(1e-9));
    sub.heading = wrap_angle(sub.heading + yaw_rate * dt);

    // 3. Pitch servo. Tracks planes deflection directly; the depth-hold
    // autopilot (step 6) only takes pitch authority when the planes are
    // left near neutral.
    let autopilot_active = sub.planes.abs() < 0.05;
    let depth_err = sub.target_depth - sub.depth;
    let target_pitch = if autopilot_active {
        clamp(depth_err * 0.05, -1.0, 1.0) * cfg.planes_effect * 30f64.to_radians()
    } else {
        clamp(sub.planes, -1.0, 1.0) * cfg.planes_effect * 30f64.to_radians()
    };
    let pitch_rate = cfg.pitch_rate_deg_s.to_radians() * dt;
    let pitch_err = target_pitch - sub.pitch;
    sub.pitch += clamp(pitch_err, -pitch_rate, pitch_rate);

    // 4 & 5. Throttle/speed integration, snorkel-derated target speed.
    // While refueling, throttle is forced to zero and the sub holds station.
    let snorkel_derate = if sub.snorkel { 0.75 } else { 1.0 };
    let max_spd = cfg.max_speed * snorkel_derate;
    let effective_throttle = if sub.refuel_active { 0.0 } else { clamp(sub.throttle, 0.0, 1.0) };
    let target_speed = if sub.refuel_active { 0.0 } else { effective_throttle * max_spd };
    let speed_err = target_speed - sub.speed;
    let accel_step = cfg.acceleration * dt;
    sub.speed += clamp(speed_err, -accel_step, accel_step);
    sub.speed = sub.speed.max(0.0);

    sub.x += sub.speed * sub.heading.cos() * dt;
    sub.y += sub.speed * sub.heading.sin() * dt;

    // 6. Vertical velocity composition.
    let mut vz = -cfg.neutral_bias;
    if sub.speed < 1.0 {
        vz -= 0.05 * (1.0 - sub.speed);
    }
    if sub.blow_active {
        if let Some(end) = sub.blow_end {
            if now < end && sub.blow_charge > 0.0 {
                vz -= cfg.emergency_blow.upward_mps;
                sub.blow_charge = (sub.blow_charge - dt / cfg.emergency_blow.duration_s).max(0.0);
            } else {
                sub.blow_active = false;
                sub.blow_end = None;
            }
        } else {
            sub.blow_active = false;
        }
    }
    if autopilot_active {
        let depth_err2 = sub.target_depth - sub.depth;
        vz += clamp(depth_err2 * 0.02, -1.5, 1.5);
    }
    // Hydrodynamic lift from planes deflection at speed.
    vz += sub.pitch.sin() * sub.speed.max(0.0) * 0.45;
    sub.depth = (sub.depth + vz * dt).max(0.0);

    // 11. Moor while refueling: overrides the integrated depth above.
    if sub.refuel_active {
        sub.depth = cfg.snorkel_depth;
    }

    // 7. Battery drain. NOTE: `speed_ratio` below intentionally reads
    // `cfg.max_speed` (un-derated), not `max_spd` used for `target_speed`
    // above — preserved from the source, see module doc.
    let speed_ratio = sub.speed_ratio(cfg.max_speed);
    let mut drain = cfg.battery.drain_per_throttle_per_s * effective_throttle * dt;
    if speed_ratio > 0.5 {
        let over = speed_ratio - 0.5;
        drain *= 1.0 + over * cfg.battery.high_speed_multiplier;
    }
    sub.battery = (sub.battery - drain).max(0.0);

    // 8. Snorkel recharge with hysteresis auto-off: once the battery reaches
    // full it snaps off; it does not turn off again until depth exceeds
    // `snorkel_depth + snorkel_off_hysteresis`. Blow charge recharges
    // alongside it, proportionally, as long as fuel remains.
    if sub.snorkel {
        sub.battery =
            (sub.battery + cfg.battery.recharge_per_s_snorkel * dt).min(cfg.battery.max_fuel_capacity);
        if sub.fuel > 0.0 {
            sub.blow_charge = (sub.blow_charge + cfg.emergency_blow.recharge_per_s_at_snorkel * dt).min(1.0);
        }
        if sub.depth > cfg.snorkel_depth + cfg.snorkel_off_hysteresis {
            sub.snorkel = false;
        }
    }

    // 9. Crush depth damage: past the hull's rated crush depth, hull
    // integrity drains proportional to the overage in 100m increments.
    if sub.depth > cfg.crush_depth {
        let overage_100m = (sub.depth - cfg.crush_depth) / 100.0;
        sub.health = (sub.health - cfg.crush_dps_per_100m * overage_100m * dt).max(0.0);
        if sub.health <= 0.0 {
            sub.alive = false;
            sub.died_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubConfig;

    fn sub_at(depth: f64, battery: f64) -> Submarine {
        Submarine {
            id: crate::ids::SubId::new(),
            owner: crate::ids::UserId::new(),
            name: "test".into(),
            alive: true,
            x: 0.0,
            y: 0.0,
            depth,
            heading: 0.0,
            target_heading: 0.0,
            rudder_rad: 0.0,
            target_rudder_rad: 0.0,
            manual_rudder: false,
            pitch: 0.0,
            planes: 0.0,
            target_depth: depth,
            throttle: 0.0,
            speed: 0.0,
            battery,
            fuel: 1000.0,
            health: 100.0,
            snorkel: false,
            blow_active: false,
            blow_charge: 1.0,
            blow_end: None,
            refuel_active: false,
            refuel_timer: 0.0,
            refuel_fueler_id: None,
            passive_array_active: false,
            last_active_ping_at: None,
            scanner_noise_until: None,
            kills: 0,
            score: 0,
            died_at: None,
            respawn_at: None,
            torpedoes_loaded: 4,
            last_register_at: None,
        }
    }

    #[test]
    fn throttle_accelerates_toward_target_speed_bounded_by_acceleration() {
        let cfg = SubConfig::default();
        let mut sub = sub_at(0.0, 80.0);
        sub.throttle = 1.0;
        step_submarine(&mut sub, &cfg, 0.1, 0.0);
        assert!(sub.speed <= cfg.acceleration * 0.1 + 1e-9);
        assert!(sub.speed > 0.0);
    }

    #[test]
    fn snorkel_derates_target_speed_by_three_quarters() {
        let cfg = SubConfig::default();
        let mut sub = sub_at(0.0, 80.0);
        sub.throttle = 1.0;
        sub.snorkel = true;
        sub.speed = cfg.max_speed;
        step_submarine(&mut sub, &cfg, 0.1, 0.0);
        assert!(sub.speed < cfg.max_speed);
    }

    #[test]
    fn crush_depth_drains_health_and_can_kill() {
        let cfg = SubConfig::default();
        let mut sub = sub_at(cfg.crush_depth + 500.0, 80.0);
        sub.health = 1.0;
        step_submarine(&mut sub, &cfg, 1.0, 10.0);
        assert!(!sub.alive);
        assert_eq!(sub.died_at, Some(10.0));
    }
}
