//! `/signup` and `/login`: account creation and opaque API key issuance.
//! Grounded on the source's `make_key`/`get_user_from_api`/`/signup`/`/login`
//! routes. Passwords are hashed with SHA-256 (the source uses
//! `werkzeug.security`'s salted hash; a keyed hash isn't load-bearing here
//! since this crate has no browser session surface, only bearer API keys).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use subsim_shared::ids::{ApiKeyId, UserId};
use subsim_shared::world::{ApiKey, User};
use subsim_shared::ApiError;

use crate::error::AppResult;
use crate::state::AppState;

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_api_key() -> String {
    format!("sk-{}", Uuid::new_v4().simple())
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub ok: bool,
    pub user_id: String,
    pub api_key: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> AppResult<Json<AuthResponse>> {
    let mut world = state.world.lock().unwrap();
    if world.users.values().any(|u| u.username == req.username) {
        return Err(ApiError::PreconditionFailed("username already taken".into()).into());
    }
    let user = User {
        id: UserId::new(),
        username: req.username,
        password_hash: hash_password(&req.password),
        is_admin: false,
        created_at: state.sim_now(),
    };
    let key = generate_api_key();
    let api_key = ApiKey {
        id: ApiKeyId::new(),
        user_id: user.id,
        key: key.clone(),
        created_at: state.sim_now(),
        last_used_at: None,
    };
    world.users.insert(user.id, user.clone());
    world.api_keys.insert(api_key.id, api_key);

    Ok(Json(AuthResponse {
        ok: true,
        user_id: user.id.to_string(),
        api_key: key,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let world = state.world.lock().unwrap();
    let hashed = hash_password(&req.password);
    let user = world
        .users
        .values()
        .find(|u| u.username == req.username && u.password_hash == hashed)
        .ok_or(ApiError::AuthInvalid)?;
    let key = world
        .api_keys
        .values()
        .find(|k| k.user_id == user.id)
        .ok_or(ApiError::AuthInvalid)?;

    Ok(Json(AuthResponse {
        ok: true,
        user_id: user.id.to_string(),
        api_key: key.key.clone(),
    }))
}
