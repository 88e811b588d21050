//! Passive contact model shared by sub-on-sub, sub-on-torpedo, and
//! torpedo-on-sub detection. Grounded on
//! `schedule_passive_contacts` in the source.

use rand::Rng;

use crate::config::PassiveSonarConfig;
use crate::geometry::{distance, distance3d, wrap_angle, world_rad_to_compass_deg};
use crate::sonar::{PassiveContact, RangeClass, TargetKind};

/// Per-target-type SNR threshold a contact must clear to be reported.
pub const THRESHOLD_SUB_OBSERVER_SUB_TARGET: f64 = 5.0;
pub const THRESHOLD_SUB_OBSERVER_TORPEDO_TARGET: f64 = 4.0;
pub const THRESHOLD_TORPEDO_OBSERVER_SUB_TARGET: f64 = 3.0;

pub const FALLOFF_PER_KM_SUB_SUB: f64 = 2.0;
pub const FALLOFF_PER_KM_TORPEDO_TARGET: f64 = 2.5;
pub const FALLOFF_PER_KM_SUB_TARGET_OF_TORPEDO: f64 = 2.0;

/// Torpedo passive array half-beam. Total coverage is 2x this (210 degrees).
pub const TORPEDO_PASSIVE_HALF_BEAM_DEG: f64 = 105.0;

pub fn sample_next_report_interval_s(range: [f64; 2]) -> f64 {
    rand::thread_rng().gen_range(range[0]..=range[1])
}

/// SNR model shared by all three passive pairings. `target_depth` is the
/// depth of the *target* being listened for (deeper targets are quieter).
#[allow(clippy::too_many_arguments)]
pub fn passive_snr(
    range_m: f64,
    target_depth: f64,
    target_speed: f64,
    target_snorkel: bool,
    target_blowing: bool,
    scanner_noise_bonus_db: f64,
    falloff_per_km: f64,
    cfg: &PassiveSonarConfig,
) -> f64 {
    let mut snr = cfg.base_snr + cfg.speed_noise_gain * target_speed;
    if target_snorkel {
        snr += cfg.snorkel_bonus;
    }
    if target_blowing {
        snr += 25.0;
    }
    snr += scanner_noise_bonus_db;
    snr -= (range_m / 1000.0) * falloff_per_km;
    snr -= target_depth / 200.0;
    snr
}

/// Bearing from `observer` to `target`, in compass degrees, with Gaussian-ish
/// jitter. Jitter is tighter when the observer is shallow (< 50m depth).
pub fn bearing_with_jitter(
    observer_xy: (f64, f64),
    target_xy: (f64, f64),
    observer_depth: f64,
    jitter_deg: f64,
) -> f64 {
    let dx = target_xy.0 - observer_xy.0;
    let dy = target_xy.1 - observer_xy.1;
    let world_rad = dy.atan2(dx);
    let compass = world_rad_to_compass_deg(world_rad);
    let sigma = if observer_depth < 50.0 {
        jitter_deg * 0.3
    } else {
        jitter_deg
    };
    let jitter = rand::thread_rng().gen_range(-sigma..=sigma);
    (compass + jitter).rem_euclid(360.0)
}

/// Evaluate a sub-observes-sub passive contact.
pub fn sub_observes_sub(
    observer_xy: (f64, f64),
    observer_depth: f64,
    target_xy: (f64, f64),
    target_depth: f64,
    target_speed: f64,
    target_snorkel: bool,
    target_blowing: bool,
    scanner_noise_bonus_db: f64,
    cfg: &PassiveSonarConfig,
) -> Option<PassiveContact> {
    let range = distance(observer_xy.0, observer_xy.1, target_xy.0, target_xy.1);
    let snr = passive_snr(
        range,
        target_depth,
        target_speed,
        target_snorkel,
        target_blowing,
        scanner_noise_bonus_db,
        FALLOFF_PER_KM_SUB_SUB,
        cfg,
    );
    if snr < THRESHOLD_SUB_OBSERVER_SUB_TARGET {
        return None;
    }
    Some(PassiveContact {
        target_kind: TargetKind::Submarine,
        bearing_deg: bearing_with_jitter(observer_xy, target_xy, observer_depth, cfg.bearing_jitter_deg),
        range_class: RangeClass::classify(range),
        snr,
    })
}

/// Evaluate a sub-observes-torpedo passive contact (torpedoes are noisier
/// per meter of range than a sub hearing another sub).
pub fn sub_observes_torpedo(
    observer_xy: (f64, f64),
    observer_depth: f64,
    torp_xy: (f64, f64),
    torp_depth: f64,
    torp_speed: f64,
    scanner_noise_bonus_db: f64,
    cfg: &PassiveSonarConfig,
) -> Option<PassiveContact> {
    let range = distance(observer_xy.0, observer_xy.1, torp_xy.0, torp_xy.1);
    let snr = passive_snr(
        range,
        torp_depth,
        torp_speed,
        false,
        false,
        scanner_noise_bonus_db,
        FALLOFF_PER_KM_TORPEDO_TARGET,
        cfg,
    );
    if snr < THRESHOLD_SUB_OBSERVER_TORPEDO_TARGET {
        return None;
    }
    Some(PassiveContact {
        target_kind: TargetKind::Torpedo,
        bearing_deg: bearing_with_jitter(observer_xy, torp_xy, observer_depth, cfg.bearing_jitter_deg),
        range_class: RangeClass::classify(range),
        snr,
    })
}

/// Evaluate a torpedo-observes-sub passive contact. The torpedo's own
/// passive array only covers a 210-degree arc centered on its heading
/// (`TORPEDO_PASSIVE_HALF_BEAM_DEG` either side); targets outside the arc
/// are never reported regardless of SNR.
#[allow(clippy::too_many_arguments)]
pub fn torpedo_observes_sub(
    torp_xy: (f64, f64),
    torp_depth: f64,
    torp_heading_rad: f64,
    target_xy: (f64, f64),
    target_depth: f64,
    target_speed: f64,
    target_snorkel: bool,
    target_blowing: bool,
    cfg: &PassiveSonarConfig,
) -> Option<PassiveContact> {
    let dx = target_xy.0 - torp_xy.0;
    let dy = target_xy.1 - torp_xy.1;
    let bearing_rad = dy.atan2(dx);
    let rel = wrap_angle(bearing_rad - torp_heading_rad).to_degrees().abs();
    if rel > TORPEDO_PASSIVE_HALF_BEAM_DEG {
        return None;
    }
    let range = distance(torp_xy.0, torp_xy.1, target_xy.0, target_xy.1);
    let snr = passive_snr(
        range,
        target_depth,
        target_speed,
        target_snorkel,
        target_blowing,
        0.0,
        FALLOFF_PER_KM_SUB_TARGET_OF_TORPEDO,
        cfg,
    );
    if snr < THRESHOLD_TORPEDO_OBSERVER_SUB_TARGET {
        return None;
    }
    Some(PassiveContact {
        target_kind: TargetKind::Submarine,
        bearing_deg: bearing_with_jitter(torp_xy, target_xy, torp_depth, cfg.bearing_jitter_deg),
        range_class: RangeClass::classify(range),
        snr,
    })
}

pub fn distance3d_between(a: (f64, f64, f64), b: (f64, f64, f64)) -> f64 {
    distance3d(a.0, a.1, a.2, b.0, b.1, b.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_distant_target_produces_no_contact() {
        let cfg = PassiveSonarConfig::default();
        let contact = sub_observes_sub(
            (0.0, 0.0),
            20.0,
            (50_000.0, 0.0),
            20.0,
            1.0,
            false,
            false,
            0.0,
            &cfg,
        );
        assert!(contact.is_none());
    }

    #[test]
    fn snorkel_target_is_louder_than_silent_target() {
        let cfg = PassiveSonarConfig::default();
        let quiet = passive_snr(1000.0, 20.0, 4.0, false, false, 0.0, FALLOFF_PER_KM_SUB_SUB, &cfg);
        let loud = passive_snr(1000.0, 20.0, 4.0, true, false, 0.0, FALLOFF_PER_KM_SUB_SUB, &cfg);
        assert!(loud > quiet);
    }

    #[test]
    fn torpedo_passive_array_ignores_targets_outside_beam() {
        let cfg = PassiveSonarConfig::default();
        // Torpedo heading +x (0 rad); target directly behind it (180deg off).
        let contact = torpedo_observes_sub(
            (0.0, 0.0),
            20.0,
            0.0,
            (-100.0, 0.0),
            20.0,
            4.0,
            false,
            false,
            &cfg,
        );
        assert!(contact.is_none());
    }
}
