//! End-to-end scenario tests, exercising route handlers directly against a
//! constructed `AppState` (no real HTTP listener). Each test below grounds
//! one of SPEC_FULL.md's Testable Properties / end-to-end scenarios.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use subsim_shared::config::Config;
use subsim_shared::ids::UserId;
use subsim_shared::world::World;

use subsim_server::auth::AuthedUser;
use subsim_server::routes::fueler::{call_fueler, start_refuel, CallFuelerRequest, StartRefuelRequest};
use subsim_server::routes::submarine::{register_sub, RegisterSubRequest};
use subsim_server::routes::torpedo::{detonate, launch_torpedo, LaunchTorpedoRequest, TorpIdRequest};
use subsim_server::state::AppState;

fn new_state() -> Arc<AppState> {
    Arc::new(AppState::new(Config::default(), World::new(), std::env::temp_dir()))
}

fn user() -> AuthedUser {
    AuthedUser {
        user_id: UserId::new(),
        is_admin: false,
    }
}

/// S1-equivalent: registering a submarine places it within the configured
/// spawn annulus, alive, with a full torpedo magazine.
#[tokio::test]
async fn register_sub_spawns_within_annulus_and_fully_armed() {
    let state = new_state();
    let u = user();
    let resp = register_sub(
        State(state.clone()),
        u,
        Json(RegisterSubRequest { name: "Nautilus".into() }),
    )
    .await
    .unwrap();
    let sub_id: String = resp.0["sub_id"].as_str().unwrap().to_string();

    let world = state.world.lock().unwrap();
    let sub = world
        .subs
        .values()
        .find(|s| s.id.to_string() == sub_id)
        .unwrap();
    assert!(sub.alive);
    assert_eq!(sub.torpedoes_loaded, state.config.torpedo.magazine_size);
    let r = subsim_shared::geometry::distance(sub.x, sub.y, state.config.world.ring.x, state.config.world.ring.y);
    assert!(r >= state.config.world.spawn_min_r && r <= state.config.world.spawn_max_r);
}

/// A second submarine past the per-user cap is rejected.
#[tokio::test]
async fn register_sub_enforces_max_per_user() {
    let state = new_state();
    let u = user();
    for _ in 0..state.config.sub.max_per_user {
        register_sub(State(state.clone()), u, Json(RegisterSubRequest { name: "a".into() }))
            .await
            .unwrap();
    }
    let result = register_sub(State(state.clone()), u, Json(RegisterSubRequest { name: "one-too-many".into() })).await;
    assert!(result.is_err());
}

/// S-equivalent: launching a torpedo deducts one round from the magazine
/// and spawns it ahead of the bow at the configured nose offset.
#[tokio::test]
async fn launch_torpedo_consumes_magazine_and_offsets_from_bow() {
    let state = new_state();
    let u = user();
    let reg = register_sub(State(state.clone()), u, Json(RegisterSubRequest { name: "Skipjack".into() }))
        .await
        .unwrap();
    let sub_id: subsim_shared::ids::SubId = reg.0["sub_id"].as_str().unwrap().parse().unwrap();

    let before_loaded = {
        let world = state.world.lock().unwrap();
        world.subs.get(&sub_id).unwrap().torpedoes_loaded
    };

    let launch = launch_torpedo(
        State(state.clone()),
        u,
        Json(LaunchTorpedoRequest { sub_id, heading_deg: 90.0 }),
    )
    .await
    .unwrap();

    let world = state.world.lock().unwrap();
    assert_eq!(world.subs.get(&sub_id).unwrap().torpedoes_loaded, before_loaded - 1);
    let torp_id: subsim_shared::ids::TorpedoId = launch.0["torpedo_id"].as_str().unwrap().parse().unwrap();
    let torp = world.torpedoes.get(&torp_id).unwrap();
    let sub = world.subs.get(&sub_id).unwrap();
    let dist = subsim_shared::geometry::distance(torp.x, torp.y, sub.x, sub.y);
    assert!((dist - state.config.torpedo.nose_offset_m).abs() < 1e-6);
}

/// A torpedo detonated on top of its own target applies full blast damage
/// and credits the firing sub with a kill and score.
#[tokio::test]
async fn detonation_kills_target_and_credits_shooter() {
    let state = new_state();
    let shooter = user();
    let victim_owner = user();

    let shooter_reg = register_sub(State(state.clone()), shooter, Json(RegisterSubRequest { name: "Shooter".into() }))
        .await
        .unwrap();
    let shooter_sub_id: subsim_shared::ids::SubId = shooter_reg.0["sub_id"].as_str().unwrap().parse().unwrap();

    let (victim_sub_id, x, y, depth) = {
        let mut world = state.world.lock().unwrap();
        let shooter_sub = world.subs.get(&shooter_sub_id).unwrap().clone();
        let mut victim = shooter_sub.clone();
        victim.id = subsim_shared::ids::SubId::new();
        victim.owner = victim_owner.user_id;
        victim.x = shooter_sub.x + 10.0;
        victim.y = shooter_sub.y;
        let id = victim.id;
        let (x, y, depth) = (victim.x, victim.y, victim.depth);
        world.subs.insert(id, victim);
        (id, x, y, depth)
    };

    let launch = launch_torpedo(
        State(state.clone()),
        shooter,
        Json(LaunchTorpedoRequest { sub_id: shooter_sub_id, heading_deg: 90.0 }),
    )
    .await
    .unwrap();
    let torp_id: subsim_shared::ids::TorpedoId = launch.0["torpedo_id"].as_str().unwrap().parse().unwrap();
    {
        let mut world = state.world.lock().unwrap();
        let torp = world.torpedoes.get_mut(&torp_id).unwrap();
        torp.x = x;
        torp.y = y;
        torp.depth = depth;
    }

    detonate(State(state.clone()), shooter, Json(TorpIdRequest { torpedo_id: torp_id }))
        .await
        .unwrap();

    let world = state.world.lock().unwrap();
    assert!(!world.subs.get(&victim_sub_id).unwrap().alive);
    assert_eq!(world.subs.get(&shooter_sub_id).unwrap().kills, 1);
    assert_eq!(world.subs.get(&shooter_sub_id).unwrap().score, 100);
}

/// A fueler bound and warmed up transfers fuel at the configured rate once
/// `tick_refuel` is driven directly (the tick loop's per-tick call).
#[tokio::test]
async fn call_and_bind_fueler_then_transfers_after_warmup() {
    let state = new_state();
    let u = user();
    let reg = register_sub(State(state.clone()), u, Json(RegisterSubRequest { name: "Thirsty".into() }))
        .await
        .unwrap();
    let sub_id: subsim_shared::ids::SubId = reg.0["sub_id"].as_str().unwrap().parse().unwrap();

    {
        let mut world = state.world.lock().unwrap();
        world.subs.get_mut(&sub_id).unwrap().fuel = 0.0;
    }

    let call = call_fueler(State(state.clone()), u, Json(CallFuelerRequest { sub_id })).await.unwrap();
    let fueler_id: subsim_shared::ids::FuelerId = call.0["fueler_id"].as_str().unwrap().parse().unwrap();

    {
        let mut world = state.world.lock().unwrap();
        let (fx, fy, fdepth) = {
            let f = world.fuelers.get(&fueler_id).unwrap();
            (f.x, f.y, f.depth)
        };
        let sub = world.subs.get_mut(&sub_id).unwrap();
        sub.x = fx;
        sub.y = fy;
        sub.depth = fdepth;
    }

    start_refuel(
        State(state.clone()),
        u,
        Json(StartRefuelRequest { sub_id, fueler_id }),
    )
    .await
    .unwrap();

    {
        let mut world = state.world.lock().unwrap();
        let began_at = world.fuelers.get(&fueler_id).unwrap().refuel_began_at.unwrap();
        let (mut fueler, mut sub) = {
            let f = world.fuelers.remove(&fueler_id).unwrap();
            let s = world.subs.remove(&sub_id).unwrap();
            (f, s)
        };
        // Simulate the physics loop having moored the sub at snorkel depth
        // (step_submarine's step 11), which isn't run in this handler-only test.
        sub.depth = state.config.sub.snorkel_depth;
        sub.refuel_timer = subsim_shared::refuel::WARMUP_S;
        let transferred = subsim_shared::refuel::tick_refuel(
            &mut fueler,
            &mut sub,
            state.config.sub.battery.max_fuel_capacity,
            state.config.sub.battery.refuel_rate_per_s,
            state.config.sub.snorkel_depth,
            1.0,
            began_at + subsim_shared::refuel::WARMUP_S + 1.0,
        );
        assert!(transferred > 0.0);
        assert!(sub.fuel > 0.0);
        world.fuelers.insert(fueler_id, fueler);
        world.subs.insert(sub_id, sub);
    }
}
