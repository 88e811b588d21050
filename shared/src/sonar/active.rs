//! Active sonar: ping cost, echo scheduling, and the separate "did a
//! bystander hear this ping" check. Grounded on `schedule_active_ping` /
//! `process_active_pings` in the source.

use crate::config::{ActivePowerConfig, ActiveSonarConfig};

/// Battery cost of one active ping: a fixed base plus a cost proportional to
/// beam width and a cost proportional to commanded range in 100m units.
pub fn ping_cost(beam_deg: f64, range_m: f64, power_cfg: &ActivePowerConfig) -> f64 {
    power_cfg.base_cost + beam_deg * power_cfg.cost_per_degree + (range_m / 100.0) * power_cfg.cost_per_100m_range
}

/// Simulated time the echo arrives back at the observer: sound travels the
/// round trip at `sound_speed` m/s.
pub fn echo_eta(now: f64, range_m: f64, sound_speed: f64) -> f64 {
    now + 2.0 * range_m / sound_speed
}

/// Signal strength of a returning echo, before being folded into a quality
/// score. Falls off with range and is boosted by target size/aspect
/// (`reflectivity`, roughly 0..1).
pub fn echo_level(range_m: f64, reflectivity: f64, cfg: &ActiveSonarConfig) -> f64 {
    let range_term = 30.0 * (1.0 - (range_m / cfg.max_range).clamp(0.0, 1.0));
    range_term + 10.0 * reflectivity
}

/// Map a raw echo level to a `0..1` quality score via a logistic curve
/// centered at level 10 with a width of 6.
pub fn echo_quality(level: f64) -> f64 {
    let z = (level - 10.0) / 6.0;
    1.0 / (1.0 + (-z).exp())
}

/// Range-estimate noise (meters, 1-sigma), worse as quality drops, floored
/// at 5m so even a perfect echo isn't reported with zero uncertainty.
pub fn range_noise_m(quality: f64) -> f64 {
    (20.0 / quality.max(0.02)).max(5.0)
}

/// Depth-estimate noise (meters, 1-sigma), same shape as range noise but a
/// looser floor since depth is inherently harder to resolve acoustically.
pub fn depth_noise_m(quality: f64) -> f64 {
    (60.0 / quality.max(0.02)).max(15.0)
}

/// Whether a ping transmitted with the given beam width and max range is
/// loud enough for a bystander at `range_to_bystander_m` to notice it (and
/// get an `active_ping_detected` event of their own), independent of whether
/// that bystander was actually the intended target.
pub fn ping_heard_by_bystander(beam_deg: f64, max_range_m: f64, range_to_bystander_m: f64) -> bool {
    let snr = 15.0 * (beam_deg / 90.0) + (max_range_m / 1000.0) * 3.0 - range_to_bystander_m / 600.0;
    snr > 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_eta_round_trips_at_sound_speed() {
        let eta = echo_eta(0.0, 1500.0, 1500.0);
        assert!((eta - 2.0).abs() < 1e-9);
    }

    #[test]
    fn quality_increases_with_level() {
        assert!(echo_quality(20.0) > echo_quality(0.0));
    }

    #[test]
    fn noise_floors_are_respected_even_at_high_quality() {
        assert!(range_noise_m(1.0) >= 5.0);
        assert!(depth_noise_m(1.0) >= 15.0);
    }

    #[test]
    fn noise_shrinks_as_quality_improves() {
        assert!(range_noise_m(0.9) < range_noise_m(0.1));
        assert!(depth_noise_m(0.9) < depth_noise_m(0.1));
    }

    #[test]
    fn wide_beam_close_ping_is_heard_by_bystanders() {
        assert!(ping_heard_by_bystander(90.0, 6000.0, 100.0));
    }

    #[test]
    fn narrow_distant_ping_is_not_heard_far_away() {
        assert!(!ping_heard_by_bystander(5.0, 1500.0, 5000.0));
    }
}
