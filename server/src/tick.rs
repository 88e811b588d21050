//! The fixed-rate tick loop: `game_loop()` in the source. Runs at
//! `config.tick_hz`, clamps wall-clock `dt` to `[0, 0.25]` seconds so a
//! stalled process doesn't integrate a huge catch-up step on resume, and
//! never lets one tick's panic take the process down: physics runs on a
//! snapshot taken outside the lock, and a panicked tick is discarded,
//! leaving the previous committed state in place for the next tick to
//! retry from.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use subsim_shared::config::Config;
use subsim_shared::physics::{step_submarine, step_torpedo};
use subsim_shared::refuel;
use subsim_shared::weapons;
use subsim_shared::weather;
use subsim_shared::world::World;

use crate::state::AppState;

pub async fn run_tick_loop(state: Arc<AppState>) {
    let period = state.config.tick_period();
    let mut interval = tokio::time::interval(period);
    let mut last = Instant::now();
    info!(hz = state.config.tick_hz, "starting tick loop");
    loop {
        interval.tick().await;
        let now = Instant::now();
        let dt = (now - last).as_secs_f64().clamp(0.0, 0.25);
        last = now;
        run_one_tick(&state, dt);
    }
}

fn run_one_tick(state: &Arc<AppState>, dt: f64) {
    let start = Instant::now();
    let sim_now = state.sim_now();

    let snapshot = { state.world.lock().unwrap().clone() };

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut world = snapshot;
        simulate_physics(&mut world, &state.config, dt, sim_now);
        world
    }));

    match result {
        Ok(mut new_world) => {
            new_world.tick_count += 1;
            new_world.sim_time = sim_now;
            {
                let mut world = state.world.lock().unwrap();
                *world = new_world;
            }
            emit_tick_events(state, sim_now);
        }
        Err(_) => {
            error!("tick panicked; discarding this tick's physics, previous state retained");
        }
    }

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let mut perf = state.perf.lock().unwrap();
    perf.tick_count += 1;
    perf.last_tick_ms = elapsed_ms;
    perf.max_tick_ms = perf.max_tick_ms.max(elapsed_ms);
    perf.avg_tick_ms += (elapsed_ms - perf.avg_tick_ms) / perf.tick_count as f64;
    if elapsed_ms > state.config.tick_period().as_secs_f64() * 1000.0 {
        warn!(elapsed_ms, "tick overran its budget");
    }
}

/// Pure physics: submarine/torpedo integration, proximity-fuze and
/// battery-dead detonation, refuel transfer, and weather field maintenance.
/// No locking, no I/O, no SSE fan-out — those happen in `emit_tick_events`
/// once the result is committed.
fn simulate_physics(world: &mut World, cfg: &Config, dt: f64, now: f64) {
    for sub in world.subs.values_mut() {
        step_submarine(sub, &cfg.sub, dt, now);
        if sub.alive {
            let dps = weather::weather_damage_dps(&world.weather, (sub.x, sub.y), sub.depth, cfg.world.weather.storm_damage_dps);
            if dps > 0.0 {
                sub.health = (sub.health - dps * dt).max(0.0);
                if sub.health <= 0.0 {
                    sub.alive = false;
                    sub.died_at = Some(now);
                }
            }
        }
    }

    let sub_positions: std::collections::HashMap<_, _> = world
        .subs
        .values()
        .map(|s| (s.id, (s.x, s.y, s.depth)))
        .collect();

    let mut detonations = Vec::new();
    for torp in world.torpedoes.values_mut() {
        if !torp.alive {
            continue;
        }
        let parent_pos = sub_positions.get(&torp.parent_sub).copied();
        let outcome = step_torpedo(torp, &cfg.torpedo, dt, now, parent_pos);

        let mut should_detonate = outcome.self_destruct;
        if !should_detonate && torp.armed {
            for (sub_id, pos) in sub_positions.iter() {
                let d = subsim_shared::geometry::distance3d(torp.x, torp.y, torp.depth, pos.0, pos.1, pos.2);
                if d <= cfg.torpedo.proximity_fuze_m {
                    let clears = parent_pos
                        .map(|pp| {
                            *sub_id != torp.parent_sub
                                || subsim_shared::physics::torpedo::clears_minimum_safe_distance(torp, pp, &cfg.torpedo)
                        })
                        .unwrap_or(true);
                    if clears {
                        should_detonate = true;
                        break;
                    }
                }
            }
        }

        if should_detonate {
            torp.alive = false;
            detonations.push((torp.x, torp.y, torp.depth, cfg.torpedo.blast_radius, torp.owner));
        }
    }
    world.torpedoes.retain(|_, t| t.alive);

    for (x, y, depth, blast_radius, owner) in detonations {
        weapons::resolve_detonation(&mut world.subs, (x, y, depth), blast_radius, owner, now);
    }

    let mut to_despawn = Vec::new();
    for fueler in world.fuelers.values_mut() {
        if let Some(sub) = world.subs.get_mut(&fueler.target_sub) {
            refuel::tick_refuel(
                fueler,
                sub,
                cfg.sub.battery.max_fuel_capacity,
                cfg.sub.battery.refuel_rate_per_s,
                cfg.sub.snorkel_depth,
                dt,
                now,
            );
        }
        if refuel::should_despawn(fueler, now) {
            to_despawn.push(fueler.id);
        }
    }
    for id in to_despawn {
        world.fuelers.remove(&id);
    }

    weather::expire_local_clouds(&mut world.weather, now);
    let furthest_r = world
        .subs
        .values()
        .map(|s| subsim_shared::geometry::distance(s.x, s.y, cfg.world.ring.x, cfg.world.ring.y))
        .fold(0.0, f64::max);
    let mut rng = rand::thread_rng();
    let mut next_id = world.next_weather_id;
    weather::extend_for_roaming_players(
        &mut world.weather,
        &mut next_id,
        &cfg.world.ring,
        &cfg.world.weather.clouds,
        furthest_r,
        now,
        &mut rng,
    );
    world.next_weather_id = next_id;
    weather::trim_to_cap(&mut world.weather, &cfg.world.weather.clouds, &cfg.world.ring);
}

/// Fan out per-tick SSE updates once the new state is committed. Kept
/// deliberately thin: full sub/torpedo/fueler snapshots are pushed to each
/// owner's queue, matching the source's `_sub_pub`/`_torp_pub`/`_fueler_pub`
/// broadcasts after every `game_loop` iteration.
fn emit_tick_events(state: &Arc<AppState>, now: f64) {
    use serde_json::json;
    use subsim_shared::events::ServerEvent;

    let world = state.world.lock().unwrap();
    for sub in world.subs.values() {
        let payload = json!({
            "x": sub.x, "y": sub.y, "depth": sub.depth,
            "heading": subsim_shared::geometry::world_rad_to_compass_deg(sub.heading),
            "alive": sub.alive, "battery": sub.battery, "fuel": sub.fuel, "health": sub.health,
        });
        state.send_private(
            sub.owner,
            ServerEvent::SubUpdate {
                sub_id: sub.id,
                state: payload,
            },
        );
    }
    let _ = now;
}
