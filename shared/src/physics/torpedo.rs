//! Torpedo motion integrator: `update_torpedo` in the source.
//!
//! Returns `true` if the torpedo should detonate this tick (battery exhausted
//! or maximum range exceeded); proximity-fuze detonation is resolved
//! separately in `weapons.rs` once all subs/torpedoes have moved for the
//! tick, since it depends on other entities' post-move positions.

use crate::config::TorpedoConfig;
use crate::geometry::{distance, wrap_angle};
use crate::world::Torpedo;

pub struct TorpedoStepOutcome {
    pub self_destruct: bool,
}

pub fn step_torpedo(
    torp: &mut Torpedo,
    cfg: &TorpedoConfig,
    dt: f64,
    now: f64,
    parent_pos: Option<(f64, f64, f64)>,
) -> TorpedoStepOutcome {
    if !torp.alive {
        return TorpedoStepOutcome { self_destruct: false };
    }

    // 1. Wire-link severance: once the straight-line distance to the parent
    // sub exceeds the wire's physical length, the link is gone for good.
    if torp.wire_linked {
        if let Some((px, py, pz)) = parent_pos {
            let d = crate::geometry::distance3d(torp.x, torp.y, torp.depth, px, py, pz);
            if d > cfg.max_range.min(2000.0) {
                torp.wire_linked = false;
            }
        } else {
            torp.wire_linked = false;
        }
    }

    // 2. Heading guidance: turn toward target_heading at the rated turn rate.
    let turn_rate = cfg.turn_rate_deg_s.to_radians() * dt;
    let heading_err = wrap_angle(torp.target_heading - torp.heading);
    torp.heading = wrap_angle(torp.heading + heading_err.clamp(-turn_rate, turn_rate));

    // 3. Depth guidance: move toward target_depth at the rated depth rate.
    let depth_err = torp.target_depth - torp.depth;
    let depth_step = cfg.depth_rate_m_s * dt;
    torp.depth = (torp.depth + depth_err.clamp(-depth_step, depth_step)).max(0.0);

    // 4. Speed: fixed acceleration toward target_speed, clamped to the
    // torpedo's mechanical speed envelope (distinct from the launch default
    // `cfg.speed` — see SPEC_FULL.md §9).
    let target = torp.target_speed.clamp(cfg.min_speed, cfg.max_speed);
    let accel_step = cfg.speed_accel_mps2 * dt;
    let speed_err = target - torp.speed;
    torp.speed += speed_err.clamp(-accel_step, accel_step);

    // 5. XY integration.
    let dx = torp.speed * torp.heading.cos() * dt;
    let dy = torp.speed * torp.heading.sin() * dt;
    torp.x += dx;
    torp.y += dy;
    torp.distance_travelled += (dx * dx + dy * dy).sqrt();

    // 6. Battery drain proportional to speed squared.
    let drain = cfg.battery.drain_per_mps_per_s * torp.speed * torp.speed * dt;
    torp.battery = (torp.battery - drain).max(0.0);
    if torp.battery <= 0.0 && !torp.battery_dead {
        torp.battery_dead = true;
    }

    // 7. Proximity-fuze arming delay.
    if !torp.armed && now - torp.spawned_at >= cfg.arming_delay_s {
        torp.armed = true;
    }

    // 8. Battery-dead terminal detonation: an exhausted torpedo detonates
    // unconditionally next tick, bypassing the minimum safe distance check
    // that otherwise protects the firing sub (see `weapons.rs`).
    let battery_self_destruct = torp.battery_dead;

    // 9. Max-range self-destruct.
    let range_self_destruct = torp.distance_travelled >= cfg.max_range;

    // 10. unused-wire-lock parent following is handled by the caller, which
    // may override target_heading/target_speed from a wire-guided sub before
    // the next tick's call to this function.
    let _ = parent_pos;

    TorpedoStepOutcome {
        self_destruct: battery_self_destruct || range_self_destruct,
    }
}

/// True once a torpedo is far enough from `parent` to be fair game for its
/// own proximity fuze (`min_safe_distance_m`), except when the torpedo is
/// detonating from battery death, which ignores this check entirely.
pub fn clears_minimum_safe_distance(
    torp: &Torpedo,
    parent_pos: (f64, f64, f64),
    cfg: &TorpedoConfig,
) -> bool {
    if torp.battery_dead {
        return true;
    }
    distance(torp.x, torp.y, parent_pos.0, parent_pos.1) >= cfg.min_safe_distance_m
        || (torp.depth - parent_pos.2).abs() >= cfg.min_safe_distance_m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{SubId, TorpedoId, UserId};

    fn torp() -> Torpedo {
        Torpedo {
            id: TorpedoId::new(),
            owner: UserId::new(),
            parent_sub: SubId::new(),
            alive: true,
            x: 0.0,
            y: 0.0,
            depth: 50.0,
            heading: 0.0,
            target_heading: 0.0,
            depth_rate_target: 0.0,
            target_depth: 50.0,
            speed: 6.0,
            target_speed: 6.0,
            battery: 100.0,
            battery_dead: false,
            wire_linked: true,
            spawned_at: 0.0,
            armed: false,
            passive_sonar_on: true,
            auto_ping_on: false,
            last_auto_ping_at: None,
            last_manual_ping_at: None,
            distance_travelled: 0.0,
        }
    }

    #[test]
    fn speed_clamped_to_mechanical_envelope_not_launch_default() {
        let cfg = TorpedoConfig::default();
        let mut t = torp();
        t.target_speed = 100.0;
        for _ in 0..200 {
            step_torpedo(&mut t, &cfg, 0.1, 0.0, None);
        }
        assert!((t.speed - cfg.max_speed).abs() < 1e-6);
    }

    #[test]
    fn battery_exhaustion_flags_self_destruct() {
        let cfg = TorpedoConfig::default();
        let mut t = torp();
        t.battery = 0.01;
        t.speed = cfg.max_speed;
        let outcome = step_torpedo(&mut t, &cfg, 1.0, 0.0, None);
        assert!(t.battery_dead);
        assert!(outcome.self_destruct);
    }

    #[test]
    fn arming_delay_gates_armed_flag() {
        let cfg = TorpedoConfig::default();
        let mut t = torp();
        step_torpedo(&mut t, &cfg, 0.5, 0.5, None);
        assert!(!t.armed);
        step_torpedo(&mut t, &cfg, 0.6, 1.1, None);
        assert!(t.armed);
    }
}
