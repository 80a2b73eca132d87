//! The simple controller: a defensive, weighted-random policy.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use battle_interface::{Action, Briefing, Controller, Side};

const MOVES: [Action; 4] = [
    Action::MoveForward,
    Action::MoveBackward,
    Action::RotateLeft90,
    Action::RotateRight90,
];

const ROTATIONS: [Action; 4] = [
    Action::RotateLeft90,
    Action::RotateRight90,
    Action::RotateLeft45,
    Action::RotateRight45,
];

/// Evasive reference controller. Mostly repositions, occasionally shoots.
///
/// The RNG is seeded from the tank's identity so that identical battles
/// replay identically.
pub struct SimpleController {
    rng: SmallRng,
    briefing: Option<Briefing>,
}

impl SimpleController {
    pub fn new(side: Side, tank_index: usize) -> SimpleController {
        let seed = 0x7461_6e6b_0000_0000u64 ^ ((side.number() as u64) << 32) ^ tank_index as u64;
        SimpleController {
            rng: SmallRng::seed_from_u64(seed),
            briefing: None,
        }
    }
}

impl Controller for SimpleController {
    fn next_action(&mut self) -> Action {
        let dry = self
            .briefing
            .as_ref()
            .is_some_and(|b| b.shells_remaining == 0);
        match self.rng.gen_range(0..11u8) {
            // 4 in 11: reposition.
            0..=3 => MOVES[self.rng.gen_range(0..MOVES.len())],
            // 3 in 11: turn toward a better lane.
            4..=6 => ROTATIONS[self.rng.gen_range(0..ROTATIONS.len())],
            // 2 in 11: fire, unless known to be out of shells.
            7..=8 if !dry => Action::Shoot,
            7..=8 => MOVES[self.rng.gen_range(0..MOVES.len())],
            // 1 in 11 each: look around, or wait.
            9 => Action::GetBattleInfo,
            _ => Action::DoNothing,
        }
    }

    fn update_briefing(&mut self, briefing: Briefing) {
        self.briefing = Some(briefing);
    }
}
