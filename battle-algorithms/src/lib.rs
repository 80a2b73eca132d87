//! # Battle Algorithms
//!
//! The reference algorithm bundle for tank-sim: a board-reconstructing
//! strategist plus two controllers, the aggressive hunter and the simple
//! evasive tank.
//!
//! The crate builds both as a library (used in-process by the driver
//! test-suite) and as a `cdylib` artefact. The artefact entry point
//! [`tank_sim_register_algorithm`] registers the aggressive bundle; the
//! simple bundle is available to embedders through [`register_simple`].

mod aggressive;
mod simple;
mod strategist;

pub use aggressive::AggressiveController;
pub use simple::SimpleController;
pub use strategist::BoardStrategist;

use battle_interface::registration::AlgorithmRegistration;

/// Register the aggressive bundle: board strategist + hunting controller.
pub fn register_aggressive(registration: &mut AlgorithmRegistration) {
    registration.register_strategist(|side, width, height, max_steps, num_shells| {
        Box::new(BoardStrategist::new(side, width, height, max_steps, num_shells))
    });
    registration.register_controller(|side, tank_index| {
        Box::new(AggressiveController::new(side, tank_index))
    });
}

/// Register the simple bundle: board strategist + evasive random controller.
pub fn register_simple(registration: &mut AlgorithmRegistration) {
    registration.register_strategist(|side, width, height, max_steps, num_shells| {
        Box::new(BoardStrategist::new(side, width, height, max_steps, num_shells))
    });
    registration.register_controller(|side, tank_index| {
        Box::new(SimpleController::new(side, tank_index))
    });
}

/// Artefact entry point resolved by the simulator's plugin loader.
#[no_mangle]
pub fn tank_sim_register_algorithm(registration: &mut AlgorithmRegistration) {
    register_aggressive(registration);
}
