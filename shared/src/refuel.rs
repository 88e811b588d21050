//! Fueler logistics: proximity binding, warmup, rate-limited transfer, and
//! the lifecycle rules that despawn an idle or drained fueler. Grounded on
//! `process_refueling_mem` / `_spawn_fueler_near_sub` in the source.

use crate::geometry::distance3d;
use crate::world::{Fueler, Submarine};

pub const BIND_RANGE_M: f64 = 50.0;
pub const WARMUP_S: f64 = 120.0;
pub const MAX_AGE_S: f64 = 1200.0;
pub const EMPTY_GRACE_S: f64 = 300.0;

pub fn within_bind_range(sub: &Submarine, fueler: &Fueler) -> bool {
    distance3d(sub.x, sub.y, sub.depth, fueler.x, fueler.y, fueler.depth) <= BIND_RANGE_M
}

/// Advance one tick of an active refuel. Returns the amount transferred.
/// Requires the caller to have already checked `fueler.target_sub == sub.id`.
/// Drives warmup off `sub.refuel_timer`, accumulated tick by tick, rather
/// than off `/start_refuel`'s wall-clock timestamp, so that moving out of
/// range or surfacing mid-warmup resets progress instead of silently
/// resuming it later. Any of the four cancellation conditions (tank full,
/// snorkel dropped, too deep, out of bind range) clears the binding on
/// both sides and zeroes the warmup timer.
pub fn tick_refuel(
    fueler: &mut Fueler,
    sub: &mut Submarine,
    sub_max_fuel: f64,
    rate_per_s: f64,
    snorkel_depth: f64,
    dt: f64,
    now: f64,
) -> f64 {
    if !sub.refuel_active || sub.refuel_fueler_id != Some(fueler.id) {
        return 0.0;
    }

    let cancel = sub.fuel >= sub_max_fuel
        || !sub.snorkel
        || sub.depth > snorkel_depth + 0.5
        || !within_bind_range(sub, fueler);
    if cancel {
        sub.refuel_active = false;
        sub.refuel_fueler_id = None;
        sub.refuel_timer = 0.0;
        return 0.0;
    }

    sub.refuel_timer += dt;
    if sub.refuel_timer < WARMUP_S {
        return 0.0;
    }

    let room = (sub_max_fuel - sub.fuel).max(0.0);
    let available = fueler.fuel_remaining.max(0.0);
    let amount = (rate_per_s * dt).min(room).min(available);
    if amount <= 0.0 {
        return 0.0;
    }
    sub.fuel += amount;
    fueler.fuel_remaining -= amount;
    if fueler.empty_since.is_none() {
        fueler.empty_since = Some(now);
    }
    if sub.fuel >= sub_max_fuel || fueler.fuel_remaining <= 0.0 {
        sub.refuel_active = false;
        sub.refuel_fueler_id = None;
        sub.refuel_timer = 0.0;
    }
    amount
}

/// Whether a fueler should be despawned this tick: either it has simply
/// aged out, or it made its first transfer more than `EMPTY_GRACE_S` ago
/// (note: measured from the first transfer, not from the tank reaching
/// zero).
pub fn should_despawn(fueler: &Fueler, now: f64) -> bool {
    if now - fueler.spawned_at > MAX_AGE_S {
        return true;
    }
    if let Some(empty_since) = fueler.empty_since {
        if now - empty_since > EMPTY_GRACE_S {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FuelerId, SubId, UserId};

    fn sub(fuel: f64) -> Submarine {
        Submarine {
            id: SubId::new(),
            owner: UserId::new(),
            name: "s".into(),
            alive: true,
            x: 0.0,
            y: 0.0,
            depth: 15.0,
            heading: 0.0,
            target_heading: 0.0,
            rudder_rad: 0.0,
            target_rudder_rad: 0.0,
            manual_rudder: false,
            pitch: 0.0,
            planes: 0.0,
            target_depth: 15.0,
            throttle: 0.0,
            speed: 0.0,
            battery: 80.0,
            fuel,
            health: 100.0,
            snorkel: true,
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

    fn fueler() -> Fueler {
        Fueler {
            id: FuelerId::new(),
            target_sub: SubId::new(),
            x: 0.0,
            y: 0.0,
            depth: 15.0,
            fuel_remaining: 500.0,
            capacity: 500.0,
            spawned_at: 0.0,
            refuel_began_at: None,
            empty_since: None,
        }
    }

    fn bound(sub: &mut Submarine, f: &Fueler) {
        sub.refuel_active = true;
        sub.refuel_fueler_id = Some(f.id);
        sub.refuel_timer = 0.0;
    }

    #[test]
    fn no_transfer_before_warmup_elapses() {
        let mut f = fueler();
        let mut s = sub(500.0);
        bound(&mut s, &f);
        let amount = tick_refuel(&mut f, &mut s, 1000.0, 50.0, 15.0, 60.0, 60.0);
        assert_eq!(amount, 0.0);
        assert!(s.refuel_active);
    }

    #[test]
    fn transfer_begins_after_warmup() {
        let mut f = fueler();
        let mut s = sub(500.0);
        bound(&mut s, &f);
        s.refuel_timer = WARMUP_S;
        let amount = tick_refuel(&mut f, &mut s, 1000.0, 50.0, 15.0, 1.0, 121.0);
        assert_eq!(amount, 50.0);
        assert_eq!(s.fuel, 550.0);
        assert!(f.empty_since.is_some());
    }

    #[test]
    fn moving_out_of_bind_range_cancels_and_clears_binding() {
        let mut f = fueler();
        let mut s = sub(500.0);
        bound(&mut s, &f);
        s.refuel_timer = WARMUP_S;
        s.x = BIND_RANGE_M + 1.0;
        let amount = tick_refuel(&mut f, &mut s, 1000.0, 50.0, 15.0, 1.0, 121.0);
        assert_eq!(amount, 0.0);
        assert!(!s.refuel_active);
        assert!(s.refuel_fueler_id.is_none());
        assert_eq!(s.refuel_timer, 0.0);
    }

    #[test]
    fn despawn_on_max_age() {
        let mut f = fueler();
        f.spawned_at = 0.0;
        assert!(should_despawn(&f, 1201.0));
    }

    #[test]
    fn despawn_grace_measured_from_first_transfer_not_from_empty_tank() {
        let mut f = fueler();
        f.empty_since = Some(100.0);
        assert!(!should_despawn(&f, 100.0 + EMPTY_GRACE_S - 1.0));
        assert!(should_despawn(&f, 100.0 + EMPTY_GRACE_S + 1.0));
    }
}
