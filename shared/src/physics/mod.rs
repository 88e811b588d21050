//! Per-tick physics integrators. Each `step_*` function takes `&mut` state
//! and a `dt` in seconds and is free of any I/O or locking concerns, mirroring
//! `shared/src/physics.rs::step_character`/`shared/src/vehicle.rs::step_vehicle_physics`
//! in the teacher: plain functions over plain structs, called once per tick
//! from the server's tick loop with the world lock already released.

pub mod submarine;
pub mod torpedo;

pub use submarine::step_submarine;
pub use torpedo::step_torpedo;
