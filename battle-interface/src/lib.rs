//! # Battle Interface
//!
//! Shared contracts between the simulator driver, battle arbiters and
//! algorithm bundles.
//!
//! It provides:
//! - The symbolic vocabulary of a battle ([`Action`], [`Direction`], [`Side`])
//! - The read-only board oracle handed to strategists ([`BattleView`])
//! - The polymorphic seams every plugin implements ([`Arbiter`],
//!   [`Strategist`], [`Controller`])
//! - The outcome types an arbiter produces ([`GameResult`], [`Grid`],
//!   [`Reason`])
//! - The registration builders an artefact fills in during activation
//!   (see [`registration`])
//!
//! An *arbiter* runs one battle to completion. A *strategist* is created once
//! per side per battle and translates board snapshots into [`Briefing`]s. A
//! *controller* is created once per tank and emits one [`Action`] per step.
//!
//! All four seams are object-safe so the driver can hold them behind boxes
//! produced by factories loaded at runtime.

pub mod action;
pub mod outcome;
pub mod registration;
pub mod view;

pub use action::{Action, Direction, Side};
pub use outcome::{GameResult, Grid, Reason};
pub use registration::{
    AlgorithmRegistration, ArbiterFactory, ArbiterRegistration, ControllerFactory,
    RegistrationError, StrategistFactory,
};
pub use view::{markers, BattleView};

/// Everything a tank controller learns from one `GetBattleInfo` round trip.
///
/// Built by the side's [`Strategist`] from a [`BattleView`] snapshot and
/// passed to the controller by value, so no reference back into the arbiter
/// survives the call.
#[derive(Debug, Clone)]
pub struct Briefing {
    /// Board height in cells.
    pub rows: usize,
    /// Board width in cells.
    pub cols: usize,
    /// Row-major copy of the board as snapshot characters. The requesting
    /// tank's own cell is normalised to empty; its location is carried in
    /// `self_row`/`self_col` instead.
    pub board: Vec<String>,
    /// Row of the requesting tank.
    pub self_row: usize,
    /// Column of the requesting tank.
    pub self_col: usize,
    /// Facing of the requesting tank, if the strategist tracks it. The
    /// reference strategist does not; controllers must cope with `None`.
    pub facing: Option<Direction>,
    /// Shells left for the requesting tank, or the initial allotment when
    /// the strategist cannot observe expenditure.
    pub shells_remaining: usize,
}

/// Per-tank action producer. One instance per tank, created through a
/// [`ControllerFactory`] and owned by the arbiter for the tank's lifetime.
pub trait Controller {
    /// The action this tank wants to perform on the current step.
    fn next_action(&mut self) -> Action;

    /// Deliver a briefing. Called synchronously while the controller's
    /// `GetBattleInfo` request is being served.
    fn update_briefing(&mut self, briefing: Briefing);
}

/// Per-side planner, invoked only when one of its tanks asks for battle
/// info. Lives for the duration of one battle.
pub trait Strategist {
    /// Reconstruct whatever the side tracks from `view` and brief the
    /// requesting tank's controller. `view` marks the requesting tank with
    /// [`markers::SELF_TANK`].
    fn brief(&mut self, controller: &mut dyn Controller, view: &dyn BattleView);
}

/// Everything an arbiter needs to run one battle.
///
/// Strategists are owned by the driver and borrowed for the battle;
/// controllers are created inside the arbiter through the factories, which
/// keeps tank ownership (and therefore controller ownership) entirely on the
/// arbiter's side.
pub struct Battle<'a> {
    /// Board width in cells.
    pub width: usize,
    /// Board height in cells.
    pub height: usize,
    /// Initial board snapshot. Not updated during the battle.
    pub map: &'a dyn BattleView,
    /// Display name of the map, for logging only.
    pub map_name: &'a str,
    /// Step limit.
    pub max_steps: usize,
    /// Initial shells per tank.
    pub num_shells: usize,
    /// Side-1 planner.
    pub strategist1: &'a mut dyn Strategist,
    /// Side-2 planner.
    pub strategist2: &'a mut dyn Strategist,
    /// Factory for side-1 tank controllers.
    pub controllers1: ControllerFactory,
    /// Factory for side-2 tank controllers.
    pub controllers2: ControllerFactory,
}

/// A battle arbiter: runs one battle to a terminal state.
pub trait Arbiter {
    /// Run the battle to completion and report the outcome.
    fn run(&mut self, battle: Battle<'_>) -> GameResult;
}
