//! Authoritative submarine combat server: loads configuration and any
//! existing save, spawns the fixed-rate tick loop, and serves the HTTP/SSE
//! control API. Wiring mirrors the teacher's `main.rs` (headless app setup,
//! resource/plugin registration, a single `run` at the bottom) translated
//! from a Bevy `App` to a tokio runtime plus an axum `Router`.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use subsim_shared::config::Config;
use subsim_shared::world::World;

use subsim_server::persistence::{self, Persistence};
use subsim_server::routes;
use subsim_server::state::AppState;
use subsim_server::tick;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const SAVE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let data_dir = std::env::var("SUBSIM_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| persistence::default_data_dir());
    let config_path = std::env::var("SUBSIM_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("game_config.json"));

    let config = Config::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!("failed to load {:?}: {e}, using defaults", config_path);
        Config::default()
    });

    let mut world = World::new();
    let persistence = Persistence::new(data_dir.clone());
    if let Err(e) = persistence.load(&mut world) {
        tracing::error!("failed to load save: {e}");
    }
    if world.weather.is_empty() {
        let mut rng = rand::thread_rng();
        world.weather = subsim_shared::weather::generate_ring_clouds(
            &config.world.ring,
            &config.world.weather.clouds,
            0,
            0.0,
            &mut rng,
        );
        world.next_weather_id = world.weather.len() as u64;
        info!(count = world.weather.len(), "generated boot-time weather field");
    }

    let state = Arc::new(AppState::new(config, world, data_dir));

    tokio::spawn(tick::run_tick_loop(state.clone()));
    tokio::spawn(periodic_save(state.clone()));

    let bind_addr = std::env::var("SUBSIM_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind listener");
    info!(bind_addr, "starting subsim-server");

    let app = routes::build_router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .expect("server error");
}

async fn periodic_save(state: Arc<AppState>) {
    let persistence = Persistence::new(state.data_dir.clone());
    let mut interval = tokio::time::interval(SAVE_INTERVAL);
    loop {
        interval.tick().await;
        let world = state.world.lock().unwrap().clone();
        if let Err(e) = persistence.save(&world) {
            tracing::error!("periodic save failed: {e}");
        }
    }
}

async fn shutdown_signal(state: Arc<AppState>) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
    info!("shutdown requested, saving world state");
    let persistence = Persistence::new(state.data_dir.clone());
    let world = state.world.lock().unwrap().clone();
    if let Err(e) = persistence.save(&world) {
        tracing::error!("shutdown save failed: {e}");
    }
}
