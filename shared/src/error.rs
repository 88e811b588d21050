//! API error kinds and their HTTP status mapping.
//!
//! Mirrors `require_key`/route-level error returns in the source, which each
//! hand back `{"ok": false, "error": "..."}` with an explicit status code.
//! Here the kinds are a closed enum instead of ad hoc tuples so every call
//! site is forced to pick one of the documented failure modes (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing API key")]
    AuthMissing,
    #[error("invalid API key")]
    AuthInvalid,
    #[error("not the owner of this entity")]
    NotOwner,
    #[error("admin privileges required")]
    AdminRequired,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("{0}")]
    TooManyRequests(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::AuthMissing | ApiError::AuthInvalid => 401,
            ApiError::NotOwner | ApiError::AdminRequired => 403,
            ApiError::NotFound(_) => 404,
            ApiError::PreconditionFailed(_) => 400,
            ApiError::TooManyRequests(_) => 400,
        }
    }
}
