//! One battle task, from factories to a finished outcome.

use std::sync::Arc;

use tracing::{instrument, trace};

use battle_interface::{Battle, GameResult, Side};

use crate::map_loader::MapData;
use crate::plugin_loader::{AlgorithmHandle, ArbiterHandle};

/// Everything a worker needs to run one battle.
pub struct GameTask {
    pub arbiter: ArbiterHandle,
    pub algorithm1: AlgorithmHandle,
    pub algorithm2: AlgorithmHandle,
    pub map: Arc<MapData>,
    pub verbose: bool,
}

/// One finished battle, tagged with who played it and where.
pub struct MatchOutcome {
    pub arbiter_name: String,
    pub algorithm1_name: String,
    pub algorithm2_name: String,
    pub map_file: String,
    pub result: GameResult,
}

/// Instantiate the arbiter and both strategists, run the battle, and tag
/// the result. Everything battle-scoped is created and dropped in here.
#[instrument(skip_all, fields(arbiter = %task.arbiter.name, map = %task.map.file_name))]
pub fn run_match(task: GameTask) -> MatchOutcome {
    trace!("battle started");
    let map = &task.map;

    let mut arbiter = (task.arbiter.factory)(task.verbose);
    let mut strategist1 = (task.algorithm1.strategist)(
        Side::One,
        map.cols,
        map.rows,
        map.max_steps,
        map.num_shells,
    );
    let mut strategist2 = (task.algorithm2.strategist)(
        Side::Two,
        map.cols,
        map.rows,
        map.max_steps,
        map.num_shells,
    );

    let view = map.view();
    let result = arbiter.run(Battle {
        width: map.cols,
        height: map.rows,
        map: &view,
        map_name: &map.file_name,
        max_steps: map.max_steps,
        num_shells: map.num_shells,
        strategist1: strategist1.as_mut(),
        strategist2: strategist2.as_mut(),
        controllers1: task.algorithm1.controller.clone(),
        controllers2: task.algorithm2.controller.clone(),
    });

    trace!(rounds = result.rounds, "battle finished");
    MatchOutcome {
        arbiter_name: task.arbiter.name,
        algorithm1_name: task.algorithm1.name,
        algorithm2_name: task.algorithm2.name,
        map_file: task.map.file_name.clone(),
        result,
    }
}
