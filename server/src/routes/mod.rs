//! Route module layout, one file per functional area, matching the
//! source's single-file Flask app's route groupings.

pub mod auth;
pub mod fueler;
pub mod public;
pub mod submarine;
pub mod torpedo;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::sse::stream_handler;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rules", get(public::rules))
        .route("/state", get(public::state))
        .route("/leaderboard", get(public::leaderboard))
        .route("/perf", get(public::perf))
        .route("/admin/state", get(public::admin_state))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/register_sub", post(submarine::register_sub))
        .route("/control", post(submarine::control))
        .route("/snorkel", post(submarine::snorkel))
        .route("/emergency_blow", post(submarine::emergency_blow))
        .route("/set_sub_heading", post(submarine::set_sub_heading))
        .route("/turn_sub", post(submarine::turn_sub))
        .route("/set_passive_array", post(submarine::set_passive_array))
        .route("/weather_scan", post(submarine::weather_scan))
        .route("/ping", post(submarine::ping))
        .route("/launch_torpedo", post(torpedo::launch_torpedo))
        .route("/reload_torpedoes", post(torpedo::reload_torpedoes))
        .route("/set_torp_speed", post(torpedo::set_torp_speed))
        .route("/set_torp_depth", post(torpedo::set_torp_depth))
        .route("/set_torp_heading", post(torpedo::set_torp_heading))
        .route("/set_torp_target_heading", post(torpedo::set_torp_target_heading))
        .route("/torp_ping", post(torpedo::torp_ping))
        .route("/torp_ping_toggle", post(torpedo::torp_ping_toggle))
        .route("/torp_passive_sonar_toggle", post(torpedo::torp_passive_sonar_toggle))
        .route("/detonate", post(torpedo::detonate))
        .route("/call_fueler", post(fueler::call_fueler))
        .route("/start_refuel", post(fueler::start_refuel))
        .route("/stream", get(stream_handler))
        .with_state(state)
}
