//! Library surface for `subsim-server`: everything the binary wires
//! together, split out so integration tests can call route handlers and
//! tick logic directly without standing up a real TCP listener.

pub mod auth;
pub mod error;
pub mod persistence;
pub mod routes;
pub mod sse;
pub mod state;
pub mod tick;
