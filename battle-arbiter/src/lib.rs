//! # Battle Arbiter
//!
//! The reference game manager for tank-sim battles: a toroidal grid, flying
//! shells with two half-moves per step, two-hit walls, mines, the backward
//! move delay and the standard terminal conditions.
//!
//! The crate builds both as a library (so the driver test-suite can run
//! battles in-process) and as a `cdylib` artefact loadable by the simulator.
//! Artefact activation goes through [`tank_sim_register_arbiter`].

mod board;
mod game_manager;
mod snapshot;

pub use game_manager::{EdgePolicy, GameManager, NO_AMMO_GRACE_STEPS};

use battle_interface::registration::ArbiterRegistration;

/// Attach this crate's arbiter factory to a pending registration.
pub fn register(registration: &mut ArbiterRegistration) {
    registration.register_arbiter(|verbose| Box::new(GameManager::new(verbose)));
}

/// Artefact entry point resolved by the simulator's plugin loader.
#[no_mangle]
pub fn tank_sim_register_arbiter(registration: &mut ArbiterRegistration) {
    register(registration);
}
