//! Dynamic weather/cloud hazard field: boot-time generation, outward
//! extension as players roam, local per-sub density maintenance, and the
//! attenuation/occlusion/damage queries other systems consult.
//!
//! Grounded on `_generate_weather_clouds` / `ensure_dynamic_weather_clouds` /
//! `weather_cloud_attenuation` / `weather_cloud_damage` in the source.

use std::f64::consts::TAU;

use rand::Rng;

use crate::config::{CloudsConfig, LocalSpawnConfig, RingConfig};
use crate::geometry::distance;
use crate::world::WeatherCloud;

pub fn is_outside_ring(x: f64, y: f64, ring: &RingConfig) -> bool {
    distance(x, y, ring.x, ring.y) > ring.r
}

/// Outward-biased radius sample in `[min_r, max_r)`: squaring `u` before
/// inverting it concentrates samples toward `max_r`, so the ring's outer
/// reaches are denser than a uniform-radius sample would give.
fn biased_radius(min_r: f64, max_r: f64, rng: &mut impl Rng) -> f64 {
    let u: f64 = rng.gen_range(0.0..1.0);
    min_r + (max_r - min_r) * (1.0 - u * u)
}

fn random_cloud_at_radius(
    ring: &RingConfig,
    cfg: &CloudsConfig,
    r: f64,
    id: u64,
    now: f64,
    expires_at: Option<f64>,
    rng: &mut impl Rng,
) -> WeatherCloud {
    let theta: f64 = rng.gen_range(0.0..TAU);
    let x = ring.x + r * theta.cos();
    let y = ring.y + r * theta.sin();
    let radius = rng.gen_range(cfg.min_radius..=cfg.max_radius);
    let depth_min = rng.gen_range(cfg.min_depth..cfg.max_depth.max(cfg.min_depth + 1.0));
    let thickness = rng.gen_range(cfg.min_thickness..=cfg.max_thickness);
    WeatherCloud {
        id,
        x,
        y,
        radius,
        depth_min,
        depth_max: depth_min + thickness,
        spawned_at: now,
        expires_at,
    }
}

/// Boot-time annulus generation: `cfg.count` clouds scattered between
/// `cfg.min_r` and `cfg.max_r` around the ring center.
pub fn generate_ring_clouds(
    ring: &RingConfig,
    cfg: &CloudsConfig,
    start_id: u64,
    now: f64,
    rng: &mut impl Rng,
) -> Vec<WeatherCloud> {
    (0..cfg.count)
        .map(|i| {
            let r = biased_radius(cfg.min_r, cfg.max_r, rng);
            random_cloud_at_radius(ring, cfg, r, start_id + i as u64, now, None, rng)
        })
        .collect()
}

/// Extend the ring annulus outward if any player has roamed past it.
/// `target_r = max(current_max_r, furthest_player_r + 1500)`; new clouds
/// fill the annulus between the old and new outer radius.
pub fn extend_for_roaming_players(
    clouds: &mut Vec<WeatherCloud>,
    next_id: &mut u64,
    ring: &RingConfig,
    cfg: &CloudsConfig,
    furthest_player_r: f64,
    now: f64,
    rng: &mut impl Rng,
) {
    let current_max_r = clouds
        .iter()
        .map(|c| distance(c.x, c.y, ring.x, ring.y) + c.radius)
        .fold(cfg.max_r, f64::max);
    let target_r = current_max_r.max(furthest_player_r + 1500.0);
    if target_r <= current_max_r + 1e-6 {
        return;
    }
    let new_count = ((cfg.count as f64) / 4.0).ceil().max(1.0) as u32;
    for _ in 0..new_count {
        let r = current_max_r + (target_r - current_max_r) * (1.0 - rng.gen_range(0.0..1.0).powi(2));
        let id = *next_id;
        *next_id += 1;
        clouds.push(random_cloud_at_radius(ring, cfg, r, id, now, None, rng));
    }
}

/// Top up a submarine's locally-visible cloud cover: if fewer than
/// `min_local_clouds` exist within `outer_offset_m` of the sub, spawn more
/// with a TTL so they eventually expire rather than accumulating forever.
pub fn maintain_local_clouds(
    clouds: &mut Vec<WeatherCloud>,
    next_id: &mut u64,
    cfg: &LocalSpawnConfig,
    clouds_cfg: &CloudsConfig,
    sub_xy: (f64, f64),
    now: f64,
    rng: &mut impl Rng,
) {
    if !cfg.enabled {
        return;
    }
    let nearby = clouds
        .iter()
        .filter(|c| distance(c.x, c.y, sub_xy.0, sub_xy.1) <= cfg.outer_offset_m)
        .count() as u32;
    if nearby >= cfg.min_local_clouds {
        return;
    }
    let deficit = cfg.min_local_clouds - nearby;
    for _ in 0..deficit {
        let r = rng.gen_range(cfg.inner_offset_m..=cfg.outer_offset_m);
        let theta: f64 = rng.gen_range(0.0..TAU);
        let x = sub_xy.0 + r * theta.cos();
        let y = sub_xy.1 + r * theta.sin();
        let id = *next_id;
        *next_id += 1;
        let ring_origin = RingConfig { x, y, r: 0.0 };
        let mut cloud = random_cloud_at_radius(&ring_origin, clouds_cfg, 0.0, id, now, Some(now + cfg.ttl_s), rng);
        cloud.x = x;
        cloud.y = y;
        clouds.push(cloud);
    }
}

/// Drop locally-spawned clouds past their TTL. Ring-generated clouds have
/// `expires_at == None` and are never touched here.
pub fn expire_local_clouds(clouds: &mut Vec<WeatherCloud>, now: f64) {
    clouds.retain(|c| c.expires_at.map(|t| t > now).unwrap_or(true));
}

/// Enforce the global cloud cap (`base_count * max_count_factor`), trimming
/// the innermost clouds first since those are the oldest/most-crowded
/// (outer clouds exist because a player roamed out there and still needs
/// cover).
pub fn trim_to_cap(clouds: &mut Vec<WeatherCloud>, cfg: &CloudsConfig, ring: &RingConfig) {
    let cap = (cfg.count as f64 * cfg.max_count_factor).round() as usize;
    if clouds.len() <= cap {
        return;
    }
    clouds.sort_by(|a, b| {
        let da = distance(a.x, a.y, ring.x, ring.y);
        let db = distance(b.x, b.y, ring.x, ring.y);
        da.partial_cmp(&db).unwrap()
    });
    let excess = clouds.len() - cap;
    clouds.drain(0..excess);
}

fn seg_point_dist(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let abx = bx - ax;
    let aby = by - ay;
    let ab_len2 = abx * abx + aby * aby;
    let t = if ab_len2 > 1e-12 {
        (((px - ax) * abx + (py - ay) * aby) / ab_len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cx = ax + t * abx;
    let cy = ay + t * aby;
    distance(px, py, cx, cy)
}

fn cloud_crosses_segment(cloud: &WeatherCloud, a: (f64, f64, f64), b: (f64, f64, f64)) -> bool {
    if seg_point_dist(cloud.x, cloud.y, a.0, a.1, b.0, b.1) > cloud.radius {
        return false;
    }
    let avg_depth = (a.2 + b.2) / 2.0;
    cloud.contains_depth(avg_depth)
}

/// Total sonar attenuation in dB between two positions, summing each cloud
/// the line of sight crosses. Line-of-sight pairs closer than
/// `cloud_close_hear_range_m` ignore weather entirely (close-range contacts
/// punch through).
pub fn total_attenuation_db(
    clouds: &[WeatherCloud],
    a: (f64, f64, f64),
    b: (f64, f64, f64),
    cfg: &CloudsConfig,
    close_hear_range_m: f64,
) -> f64 {
    if distance(a.0, a.1, b.0, b.1) <= close_hear_range_m {
        return 0.0;
    }
    clouds
        .iter()
        .filter(|c| cloud_crosses_segment(c, a, b))
        .map(|_| cfg.attenuation_db)
        .sum()
}

/// Storm damage-per-second applied to a submarine whose position falls
/// inside any cloud.
pub fn weather_damage_dps(clouds: &[WeatherCloud], sub_xy: (f64, f64), sub_depth: f64, dps: f64) -> f64 {
    let inside = clouds
        .iter()
        .any(|c| c.contains_point_2d(sub_xy.0, sub_xy.1) && c.contains_depth(sub_depth));
    if inside {
        dps
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generated_clouds_fall_within_ring_annulus() {
        let ring = RingConfig { x: 0.0, y: 0.0, r: 6000.0 };
        let cfg = CloudsConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let clouds = generate_ring_clouds(&ring, &cfg, 0, 0.0, &mut rng);
        assert_eq!(clouds.len() as u32, cfg.count);
        for c in &clouds {
            let r = distance(c.x, c.y, ring.x, ring.y);
            assert!(r >= cfg.min_r - 1e-6 && r <= cfg.max_r + 1e-6);
        }
    }

    #[test]
    fn trim_to_cap_keeps_outermost_clouds() {
        let ring = RingConfig { x: 0.0, y: 0.0, r: 0.0 };
        let cfg = CloudsConfig {
            count: 2,
            max_count_factor: 1.0,
            ..CloudsConfig::default()
        };
        let mut clouds = vec![
            WeatherCloud { id: 0, x: 10.0, y: 0.0, radius: 100.0, depth_min: 0.0, depth_max: 100.0, spawned_at: 0.0, expires_at: None },
            WeatherCloud { id: 1, x: 1000.0, y: 0.0, radius: 100.0, depth_min: 0.0, depth_max: 100.0, spawned_at: 0.0, expires_at: None },
        ];
        trim_to_cap(&mut clouds, &cfg, &ring);
        assert_eq!(clouds.len(), 2);
        let cfg_tight = CloudsConfig { count: 1, max_count_factor: 1.0, ..cfg };
        trim_to_cap(&mut clouds, &cfg_tight, &ring);
        assert_eq!(clouds.len(), 1);
        assert_eq!(clouds[0].id, 1);
    }

    #[test]
    fn close_range_contacts_ignore_weather_attenuation() {
        let cloud = WeatherCloud { id: 0, x: 0.0, y: 0.0, radius: 1000.0, depth_min: 0.0, depth_max: 400.0, spawned_at: 0.0, expires_at: None };
        let cfg = CloudsConfig::default();
        let db = total_attenuation_db(&[cloud], (0.0, 0.0, 50.0), (50.0, 0.0, 50.0), &cfg, 400.0);
        assert_eq!(db, 0.0);
    }
}
