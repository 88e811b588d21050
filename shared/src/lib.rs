//! Shared simulation types and pure logic for the submarine combat server:
//! entity records, configuration, physics integrators, weapons resolution,
//! sonar, weather, and refuel logistics. Nothing in this crate touches the
//! network or the filesystem; `subsim-server` wires it all together behind
//! locks and an axum router.

pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod ids;
pub mod physics;
pub mod refuel;
pub mod sonar;
pub mod weapons;
pub mod weather;
pub mod world;

pub use error::ApiError;
