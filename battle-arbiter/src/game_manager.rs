//! The battle state machine.
//!
//! One [`GameManager`] runs one battle to a terminal state. Each step is a
//! fixed sequence of phases: shells advance half a move and collide, every
//! living tank is queried (snapshots are served synchronously), actions are
//! applied, staged moves are validated and committed, shells advance the
//! second half-move and collide again, and terminal conditions are checked.
//! The two half-moves per step are what make crossing collisions (two
//! objects exchanging cells) detectable.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, trace, warn};

use battle_interface::{
    Action, Arbiter, Battle, BattleView, Controller, Direction, GameResult, Grid, Reason, Side,
    Strategist,
};

use crate::board::{Board, Cell};
use crate::snapshot::Snapshot;

/// Consecutive all-out-of-ammo steps after which a battle ends in a tie.
pub const NO_AMMO_GRACE_STEPS: usize = 40;

/// Steps a tank must wait between shots.
const SHOOT_COOLDOWN: u8 = 4;

/// What happens at the edge of the board.
///
/// The reference arbiter wraps toroidally. `Closed` is the bounds-blocked
/// variant: a move off the board is rejected and a shell leaving the board
/// dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePolicy {
    Wrap,
    Closed,
}

/// The reference arbiter.
pub struct GameManager {
    verbose: bool,
    edge_policy: EdgePolicy,
}

impl GameManager {
    /// Toroidal arbiter. `verbose` turns on per-step action records.
    pub fn new(verbose: bool) -> GameManager {
        GameManager::with_edge_policy(verbose, EdgePolicy::Wrap)
    }

    /// Arbiter with an explicit edge behaviour.
    pub fn with_edge_policy(verbose: bool, edge_policy: EdgePolicy) -> GameManager {
        GameManager {
            verbose,
            edge_policy,
        }
    }
}

impl Arbiter for GameManager {
    fn run(&mut self, battle: Battle<'_>) -> GameResult {
        Engine::new(battle, self.edge_policy, self.verbose).run()
    }
}

struct Tank {
    side: Side,
    index: usize,
    row: usize,
    col: usize,
    facing: Direction,
    shells: usize,
    alive: bool,
    cooldown: u8,
    backward_wait: u8,
    repeat_backward: bool,
    controller: Box<dyn Controller>,
}

struct Shell {
    row: usize,
    col: usize,
    prev_row: usize,
    prev_col: usize,
    dir: Direction,
    live: bool,
}

#[derive(Debug, Clone, Copy)]
struct StagedMove {
    to: (usize, usize),
    backward: bool,
}

enum StepEnd {
    Continue,
    Terminal(Option<Side>, Reason),
    Forfeit(Side),
}

/// Mutable state of one running battle.
struct Engine<'a> {
    rows: usize,
    cols: usize,
    max_steps: usize,
    policy: EdgePolicy,
    verbose: bool,
    map_name: String,
    board: Board,
    tanks: Vec<Tank>,
    shells: Vec<Shell>,
    strategist1: &'a mut dyn Strategist,
    strategist2: &'a mut dyn Strategist,
    dry_steps: usize,
}

/// One cell in `dir` from `(row, col)`, or `None` when a closed board edge
/// is in the way.
fn step_cell(
    rows: usize,
    cols: usize,
    policy: EdgePolicy,
    row: usize,
    col: usize,
    dir: Direction,
) -> Option<(usize, usize)> {
    let (dr, dc) = dir.delta();
    match policy {
        EdgePolicy::Wrap => {
            let r = (row as i64 + dr as i64).rem_euclid(rows as i64) as usize;
            let c = (col as i64 + dc as i64).rem_euclid(cols as i64) as usize;
            Some((r, c))
        }
        EdgePolicy::Closed => {
            let r = row as i64 + dr as i64;
            let c = col as i64 + dc as i64;
            if r < 0 || c < 0 || r >= rows as i64 || c >= cols as i64 {
                None
            } else {
                Some((r as usize, c as usize))
            }
        }
    }
}

impl<'a> Engine<'a> {
    fn new(battle: Battle<'a>, policy: EdgePolicy, verbose: bool) -> Engine<'a> {
        let rows = battle.height;
        let cols = battle.width;
        let board = Board::from_view(battle.map, rows, cols);

        let mut tanks = Vec::new();
        let mut counts = [0usize; 2];
        for row in 0..rows {
            for col in 0..cols {
                let Some(side) = Side::from_glyph(battle.map.object_at(col, row)) else {
                    continue;
                };
                let index = counts[side.index()];
                counts[side.index()] += 1;
                let factory = match side {
                    Side::One => &battle.controllers1,
                    Side::Two => &battle.controllers2,
                };
                tanks.push(Tank {
                    side,
                    index,
                    row,
                    col,
                    // Side 1 starts facing left, side 2 facing right.
                    facing: match side {
                        Side::One => Direction::Left,
                        Side::Two => Direction::Right,
                    },
                    shells: battle.num_shells,
                    alive: true,
                    cooldown: 0,
                    backward_wait: 0,
                    repeat_backward: false,
                    controller: factory(side, index),
                });
            }
        }
        // Controllers are queried side-major, then by tank index.
        tanks.sort_by_key(|t| (t.side.index(), t.index));

        debug!(
            map = %battle.map_name,
            rows,
            cols,
            max_steps = battle.max_steps,
            tanks1 = counts[0],
            tanks2 = counts[1],
            "battle started"
        );

        Engine {
            rows,
            cols,
            max_steps: battle.max_steps,
            policy,
            verbose,
            map_name: battle.map_name.to_string(),
            board,
            tanks,
            shells: Vec::new(),
            strategist1: battle.strategist1,
            strategist2: battle.strategist2,
            dry_steps: 0,
        }
    }

    fn run(mut self) -> GameResult {
        let alive = self.alive_counts();
        if alive[0] == 0 || alive[1] == 0 {
            let winner = match (alive[0], alive[1]) {
                (0, 0) => None,
                (0, _) => Some(Side::Two),
                (_, _) => Some(Side::One),
            };
            return self.finish(0, winner, Reason::AllTanksDead);
        }

        let mut step = 0;
        while step < self.max_steps {
            step += 1;
            match self.play_step(step) {
                StepEnd::Continue => {}
                StepEnd::Terminal(winner, reason) => return self.finish(step, winner, reason),
                StepEnd::Forfeit(side) => {
                    warn!(map = %self.map_name, side = %side, "strategist failure; side forfeits");
                    for tank in &mut self.tanks {
                        if tank.side == side {
                            tank.alive = false;
                        }
                    }
                    return self.finish(step, Some(side.opponent()), Reason::AllTanksDead);
                }
            }
        }

        let alive = self.alive_counts();
        let winner = match alive[0].cmp(&alive[1]) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        };
        self.finish(self.max_steps, winner, Reason::MaxSteps)
    }

    fn play_step(&mut self, step: usize) -> StepEnd {
        let alive_at_start: Vec<bool> = self.tanks.iter().map(|t| t.alive).collect();

        // Shell half-move A; tanks have not moved yet.
        self.advance_shells();
        let stationary: Vec<(usize, usize)> = self.tanks.iter().map(|t| (t.row, t.col)).collect();
        self.resolve_collisions(&stationary);
        self.shells.retain(|s| s.live);

        // Query every living tank, serving snapshots synchronously. A tank
        // waiting out a backward delay gets nothing served; its request is
        // ignored like any other action below.
        let mut labels: Vec<String> = self.tanks.iter().map(|_| "killed".to_string()).collect();
        let mut actions: Vec<Option<Action>> = vec![None; self.tanks.len()];
        for i in 0..self.tanks.len() {
            if !self.tanks[i].alive {
                continue;
            }
            let action = self.query_controller(i);
            if self.tanks[i].backward_wait == 0 && action == Action::GetBattleInfo {
                if let Err(side) = self.serve_battle_info(i) {
                    return StepEnd::Forfeit(side);
                }
            }
            actions[i] = Some(action);
        }

        // Apply: rotations and shots are immediate, moves are staged.
        let mut staged: Vec<Option<StagedMove>> = vec![None; self.tanks.len()];
        for i in 0..self.tanks.len() {
            if let Some(action) = actions[i] {
                self.apply_action(i, action, &mut staged, &mut labels);
            }
        }

        self.validate_moves(&mut staged, &mut labels);

        let before_commit: Vec<(usize, usize)> =
            self.tanks.iter().map(|t| (t.row, t.col)).collect();
        self.commit_moves(&staged);

        // Shell half-move B; tank previous positions are the pre-commit
        // cells so a tank walking into an oncoming shell registers as a
        // crossing.
        self.advance_shells();
        self.resolve_collisions(&before_commit);
        self.shells.retain(|s| s.live);

        for i in 0..self.tanks.len() {
            if alive_at_start[i] && !self.tanks[i].alive && labels[i] != "killed" {
                labels[i].push_str(" (killed)");
            }
        }
        if self.verbose {
            debug!(step, actions = %labels.join(", "));
        } else {
            trace!(step, actions = %labels.join(", "));
        }

        self.evaluate_termination()
    }

    fn query_controller(&mut self, i: usize) -> Action {
        let tank = &mut self.tanks[i];
        let controller = tank.controller.as_mut();
        match catch_unwind(AssertUnwindSafe(|| controller.next_action())) {
            Ok(action) => action,
            Err(_) => {
                warn!(
                    side = %tank.side,
                    tank = tank.index,
                    "controller panicked; treating as DoNothing"
                );
                Action::DoNothing
            }
        }
    }

    fn serve_battle_info(&mut self, i: usize) -> Result<(), Side> {
        let side = self.tanks[i].side;
        let snap = self.render_snapshot(i);
        let Engine {
            tanks,
            strategist1,
            strategist2,
            ..
        } = self;
        let strategist: &mut dyn Strategist = match side {
            Side::One => &mut **strategist1,
            Side::Two => &mut **strategist2,
        };
        let controller = tanks[i].controller.as_mut();
        match catch_unwind(AssertUnwindSafe(move || strategist.brief(controller, &snap))) {
            Ok(()) => Ok(()),
            Err(_) => Err(side),
        }
    }

    fn apply_action(
        &mut self,
        i: usize,
        action: Action,
        staged: &mut [Option<StagedMove>],
        labels: &mut [String],
    ) {
        if self.tanks[i].backward_wait > 0 {
            if action == Action::MoveForward {
                // A forward request cancels the pending backward move.
                self.tanks[i].backward_wait = 0;
                staged[i] = self.stage_move(i, false);
                labels[i] = match staged[i] {
                    Some(_) => "MoveForward".to_string(),
                    None => "MoveForward (ignored)".to_string(),
                };
            } else {
                self.tanks[i].backward_wait -= 1;
                labels[i] = format!("{action} (ignored)");
                if self.tanks[i].backward_wait == 0 {
                    staged[i] = self.stage_move(i, true);
                }
            }
            return;
        }

        if let Some(steps) = action.rotation_steps() {
            let tank = &mut self.tanks[i];
            tank.facing = tank.facing.rotated(steps);
            labels[i] = action.label().to_string();
            return;
        }

        match action {
            Action::GetBattleInfo | Action::DoNothing => {
                labels[i] = action.label().to_string();
            }
            Action::Shoot => {
                let tank = &mut self.tanks[i];
                if tank.shells > 0 && tank.cooldown == 0 {
                    tank.shells -= 1;
                    tank.cooldown = SHOOT_COOLDOWN;
                    let (row, col, dir) = (tank.row, tank.col, tank.facing);
                    self.shells.push(Shell {
                        row,
                        col,
                        prev_row: row,
                        prev_col: col,
                        dir,
                        live: true,
                    });
                    labels[i] = "Shoot".to_string();
                } else {
                    labels[i] = "Shoot (ignored)".to_string();
                }
            }
            Action::MoveForward => {
                staged[i] = self.stage_move(i, false);
                labels[i] = match staged[i] {
                    Some(_) => "MoveForward".to_string(),
                    None => "MoveForward (ignored)".to_string(),
                };
            }
            Action::MoveBackward => {
                if self.tanks[i].repeat_backward {
                    staged[i] = self.stage_move(i, true);
                    labels[i] = match staged[i] {
                        Some(_) => "MoveBackward".to_string(),
                        None => "MoveBackward (ignored)".to_string(),
                    };
                } else {
                    // The move is deferred, not refused; it commits two
                    // steps from now unless cancelled.
                    self.tanks[i].backward_wait = 2;
                    labels[i] = "MoveBackward".to_string();
                }
            }
            _ => unreachable!("rotations handled above"),
        }
    }

    fn stage_move(&self, i: usize, backward: bool) -> Option<StagedMove> {
        let tank = &self.tanks[i];
        let dir = if backward {
            tank.facing.opposite()
        } else {
            tank.facing
        };
        step_cell(self.rows, self.cols, self.policy, tank.row, tank.col, dir)
            .map(|to| StagedMove { to, backward })
    }

    fn validate_moves(&self, staged: &mut [Option<StagedMove>], labels: &mut [String]) {
        for i in 0..staged.len() {
            let Some(mv) = staged[i] else { continue };
            let blocked = self.board.get(mv.to.0, mv.to.1).blocks_movement()
                || self
                    .tanks
                    .iter()
                    .any(|t| t.alive && (t.row, t.col) == mv.to);
            if blocked {
                staged[i] = None;
                labels[i].push_str(" (ignored)");
            }
        }

        // No pair of moves may swap two tanks.
        for a in 0..staged.len() {
            for b in a + 1..staged.len() {
                let (Some(ma), Some(mb)) = (staged[a], staged[b]) else {
                    continue;
                };
                if ma.to == (self.tanks[b].row, self.tanks[b].col)
                    && mb.to == (self.tanks[a].row, self.tanks[a].col)
                {
                    staged[a] = None;
                    staged[b] = None;
                    labels[a].push_str(" (ignored)");
                    labels[b].push_str(" (ignored)");
                }
            }
        }
    }

    fn commit_moves(&mut self, staged: &[Option<StagedMove>]) {
        for (tank, mv) in self.tanks.iter_mut().zip(staged) {
            match mv {
                Some(mv) if tank.alive => {
                    tank.row = mv.to.0;
                    tank.col = mv.to.1;
                    tank.repeat_backward = mv.backward;
                }
                _ => {
                    if tank.backward_wait == 0 {
                        tank.repeat_backward = false;
                    }
                }
            }
            if tank.cooldown > 0 {
                tank.cooldown -= 1;
            }
        }
    }

    fn advance_shells(&mut self) {
        for shell in &mut self.shells {
            if !shell.live {
                continue;
            }
            shell.prev_row = shell.row;
            shell.prev_col = shell.col;
            match step_cell(
                self.rows, self.cols, self.policy, shell.row, shell.col, shell.dir,
            ) {
                Some((row, col)) => {
                    shell.row = row;
                    shell.col = col;
                }
                None => shell.live = false,
            }
        }
    }

    fn resolve_collisions(&mut self, tank_prev: &[(usize, usize)]) {
        let Engine {
            board,
            tanks,
            shells,
            ..
        } = self;

        // Shells over walls die and damage the wall.
        for shell in shells.iter_mut() {
            if shell.live && board.hit_wall(shell.row, shell.col) {
                shell.live = false;
            }
        }

        // Tanks on mines die; the mine is consumed. Shells overfly mines.
        for tank in tanks.iter_mut() {
            if tank.alive && board.get(tank.row, tank.col) == Cell::Mine {
                tank.alive = false;
                board.set(tank.row, tank.col, Cell::Empty);
            }
        }

        // Same-cell and crossing collisions among all live objects.
        struct Obj {
            is_tank: bool,
            idx: usize,
            cur: (usize, usize),
            prev: (usize, usize),
        }
        let mut objs = Vec::with_capacity(tanks.len() + shells.len());
        for (idx, tank) in tanks.iter().enumerate() {
            if tank.alive {
                objs.push(Obj {
                    is_tank: true,
                    idx,
                    cur: (tank.row, tank.col),
                    prev: tank_prev[idx],
                });
            }
        }
        for (idx, shell) in shells.iter().enumerate() {
            if shell.live {
                objs.push(Obj {
                    is_tank: false,
                    idx,
                    cur: (shell.row, shell.col),
                    prev: (shell.prev_row, shell.prev_col),
                });
            }
        }

        let mut tank_hit = vec![false; tanks.len()];
        let mut shell_hit = vec![false; shells.len()];
        for a in 0..objs.len() {
            for b in a + 1..objs.len() {
                let same = objs[a].cur == objs[b].cur;
                let crossed = objs[a].cur == objs[b].prev && objs[b].cur == objs[a].prev;
                if !same && !crossed {
                    continue;
                }
                for obj in [&objs[a], &objs[b]] {
                    if obj.is_tank {
                        tank_hit[obj.idx] = true;
                    } else {
                        shell_hit[obj.idx] = true;
                    }
                }
            }
        }
        for (tank, hit) in tanks.iter_mut().zip(tank_hit) {
            if hit {
                tank.alive = false;
            }
        }
        for (shell, hit) in shells.iter_mut().zip(shell_hit) {
            if hit {
                shell.live = false;
            }
        }
    }

    fn evaluate_termination(&mut self) -> StepEnd {
        let alive = self.alive_counts();
        if alive[0] == 0 && alive[1] == 0 {
            return StepEnd::Terminal(None, Reason::AllTanksDead);
        }
        if alive[1] == 0 {
            return StepEnd::Terminal(Some(Side::One), Reason::AllTanksDead);
        }
        if alive[0] == 0 {
            return StepEnd::Terminal(Some(Side::Two), Reason::AllTanksDead);
        }

        let all_dry = self.tanks.iter().filter(|t| t.alive).all(|t| t.shells == 0);
        if all_dry {
            self.dry_steps += 1;
        } else {
            self.dry_steps = 0;
        }
        if self.dry_steps >= NO_AMMO_GRACE_STEPS {
            return StepEnd::Terminal(None, Reason::ZeroShells);
        }
        StepEnd::Continue
    }

    fn alive_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for tank in &self.tanks {
            if tank.alive {
                counts[tank.side.index()] += 1;
            }
        }
        counts
    }

    /// Visibility snapshot bound to tank `i`: board base, live tanks, and
    /// shells overlaid on top of everything.
    fn render_snapshot(&self, i: usize) -> Snapshot {
        let mut grid = self.render_base();
        for (idx, tank) in self.tanks.iter().enumerate() {
            if tank.alive {
                let glyph = if idx == i { '%' } else { tank.side.glyph() };
                grid[tank.row][tank.col] = glyph;
            }
        }
        for shell in &self.shells {
            if shell.live {
                grid[shell.row][shell.col] = '*';
            }
        }
        Snapshot::new(grid.into_iter().map(|row| row.into_iter().collect()).collect())
    }

    /// Final grid: walls, mines and surviving tanks. Shells are omitted.
    fn render_final_grid(&self) -> Grid {
        let mut grid = self.render_base();
        for tank in &self.tanks {
            if tank.alive {
                grid[tank.row][tank.col] = tank.side.glyph();
            }
        }
        Grid::from_rows(grid.into_iter().map(|row| row.into_iter().collect()).collect())
    }

    fn render_base(&self) -> Vec<Vec<char>> {
        (0..self.rows)
            .map(|row| (0..self.cols).map(|col| self.board.get(row, col).glyph()).collect())
            .collect()
    }

    fn finish(&mut self, rounds: usize, winner: Option<Side>, reason: Reason) -> GameResult {
        let remaining_tanks = self.alive_counts();
        let result = GameResult {
            winner,
            reason,
            remaining_tanks,
            rounds,
            final_grid: self.render_final_grid(),
        };
        debug!(
            map = %self.map_name,
            rounds,
            winner = winner.map(|s| s.number()).unwrap_or(0),
            reason = ?reason,
            "battle finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_interface::ControllerFactory;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct Scripted {
        actions: Vec<Action>,
        next: usize,
    }

    impl Controller for Scripted {
        fn next_action(&mut self) -> Action {
            let action = self.actions.get(self.next).copied().unwrap_or(Action::DoNothing);
            self.next += 1;
            action
        }
        fn update_briefing(&mut self, _briefing: battle_interface::Briefing) {}
    }

    fn scripted(scripts: Vec<((Side, usize), Vec<Action>)>) -> ControllerFactory {
        let scripts: HashMap<(Side, usize), Vec<Action>> = scripts.into_iter().collect();
        Arc::new(move |side, index| {
            Box::new(Scripted {
                actions: scripts.get(&(side, index)).cloned().unwrap_or_default(),
                next: 0,
            })
        })
    }

    struct Passive;
    impl Strategist for Passive {
        fn brief(&mut self, _controller: &mut dyn Controller, _view: &dyn BattleView) {}
    }

    fn engine<'a>(
        map: &'a Grid,
        num_shells: usize,
        s1: &'a mut Passive,
        s2: &'a mut Passive,
        factory1: ControllerFactory,
        factory2: ControllerFactory,
        policy: EdgePolicy,
    ) -> Engine<'a> {
        let battle = Battle {
            width: map.width(),
            height: map.height(),
            map,
            map_name: "test",
            max_steps: 100,
            num_shells,
            strategist1: s1,
            strategist2: s2,
            controllers1: factory1,
            controllers2: factory2,
        };
        Engine::new(battle, policy, false)
    }

    fn grid(rows: &[&str]) -> Grid {
        Grid::from_rows(rows.iter().map(|r| r.to_string()).collect())
    }

    #[test]
    fn tanks_are_discovered_side_major_with_default_facings() {
        let map = grid(&["2 1", " 1 ", "2  "]);
        let (mut s1, mut s2) = (Passive, Passive);
        let eng = engine(
            &map,
            3,
            &mut s1,
            &mut s2,
            scripted(vec![]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        let poses: Vec<_> = eng
            .tanks
            .iter()
            .map(|t| (t.side, t.index, t.row, t.col, t.facing))
            .collect();
        assert_eq!(
            poses,
            vec![
                (Side::One, 0, 0, 2, Direction::Left),
                (Side::One, 1, 1, 1, Direction::Left),
                (Side::Two, 0, 0, 0, Direction::Right),
                (Side::Two, 1, 2, 0, Direction::Right),
            ]
        );
    }

    #[test]
    fn forward_move_wraps_toroidally() {
        // A tank at (0,0) turned to face up wraps to the bottom row.
        let map = grid(&["1 2", "   ", "   "]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            scripted(vec![(
                (Side::One, 0),
                vec![Action::RotateRight90, Action::MoveForward],
            )]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        assert!(matches!(eng.play_step(1), StepEnd::Continue));
        assert_eq!(eng.tanks[0].facing, Direction::Up);
        assert!(matches!(eng.play_step(2), StepEnd::Continue));
        assert_eq!((eng.tanks[0].row, eng.tanks[0].col), (2, 0));
    }

    #[test]
    fn closed_edge_rejects_moves_and_kills_shells() {
        let map = grid(&["1 2", "   ", "   "]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            1,
            &mut s1,
            &mut s2,
            scripted(vec![(
                (Side::One, 0),
                vec![Action::MoveForward, Action::Shoot],
            )]),
            scripted(vec![]),
            EdgePolicy::Closed,
        );
        // Facing left at the left edge: move rejected.
        eng.play_step(1);
        assert_eq!((eng.tanks[0].row, eng.tanks[0].col), (0, 0));
        // The shell leaves the board on its first half-move and dies.
        eng.play_step(2);
        assert_eq!(eng.shells.len(), 0);
    }

    #[test]
    fn shoot_without_shells_is_ignored() {
        let map = grid(&["1 2"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            scripted(vec![((Side::One, 0), vec![Action::Shoot])]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        eng.play_step(1);
        assert!(eng.shells.is_empty());
        assert_eq!(eng.tanks[0].shells, 0);
    }

    #[test]
    fn shoot_cooldown_blocks_for_four_steps() {
        let map = grid(&["1   2"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            10,
            &mut s1,
            &mut s2,
            scripted(vec![((Side::One, 0), vec![Action::Shoot; 6])]),
            scripted(vec![]),
            EdgePolicy::Closed,
        );
        eng.play_step(1);
        assert_eq!(eng.tanks[0].shells, 9);
        // Steps 2-4: still cooling down, every shot ignored.
        for step in 2..=4 {
            eng.play_step(step);
            assert_eq!(eng.tanks[0].shells, 9, "cooldown violated at step {step}");
        }
        // Step 5: cooldown has expired.
        eng.play_step(5);
        assert_eq!(eng.tanks[0].shells, 8);
    }

    #[test]
    fn backward_takes_three_steps_then_repeats_immediately() {
        let map = grid(&["  1 2"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            scripted(vec![((Side::One, 0), vec![Action::MoveBackward; 4])]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        // Facing left, so backward moves right, toward (0,3).
        eng.play_step(1);
        assert_eq!(eng.tanks[0].col, 2, "move must not execute on request step");
        eng.play_step(2);
        assert_eq!(eng.tanks[0].col, 2, "move must not execute during the delay");
        eng.play_step(3);
        assert_eq!(eng.tanks[0].col, 3, "backward commits when the delay expires");
        // The immediate repeat targets (0,4), which holds the enemy tank.
        eng.play_step(4);
        assert_eq!(
            eng.tanks[0].col, 3,
            "backward into an occupied cell is rejected"
        );
    }

    #[test]
    fn repeat_backward_is_one_step() {
        let map = grid(&["1    ", "     ", "2    "]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            // Facing left; backward moves right along row 0.
            scripted(vec![((Side::One, 0), vec![Action::MoveBackward; 5])]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        eng.play_step(1);
        eng.play_step(2);
        eng.play_step(3);
        assert_eq!(eng.tanks[0].col, 1);
        eng.play_step(4);
        assert_eq!(eng.tanks[0].col, 2, "repeat backward executes immediately");
        eng.play_step(5);
        assert_eq!(eng.tanks[0].col, 3);
    }

    #[test]
    fn forward_cancels_pending_backward() {
        let map = grid(&[" 1  2"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            scripted(vec![(
                (Side::One, 0),
                vec![Action::MoveBackward, Action::MoveForward],
            )]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        eng.play_step(1);
        assert_eq!(eng.tanks[0].col, 1);
        eng.play_step(2);
        // Forward (facing left) executes at once and clears the delay.
        assert_eq!(eng.tanks[0].col, 0);
        assert_eq!(eng.tanks[0].backward_wait, 0);
    }

    #[test]
    fn rotations_are_ignored_during_backward_delay() {
        let map = grid(&["  1 2"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            scripted(vec![(
                (Side::One, 0),
                vec![Action::MoveBackward, Action::RotateRight90, Action::RotateLeft45],
            )]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        eng.play_step(1);
        eng.play_step(2);
        eng.play_step(3);
        assert_eq!(eng.tanks[0].facing, Direction::Left, "rotation must not apply");
        assert_eq!(eng.tanks[0].col, 3, "backward still commits on schedule");
    }

    #[test]
    fn swap_moves_are_rejected() {
        let map = grid(&["21  "]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            // Side 1 at (0,1) faces left toward side 2 at (0,0); side 2
            // faces right toward side 1. Forward moves would swap them.
            scripted(vec![((Side::One, 0), vec![Action::MoveForward])]),
            scripted(vec![((Side::Two, 0), vec![Action::MoveForward])]),
            EdgePolicy::Wrap,
        );
        eng.play_step(1);
        assert_eq!((eng.tanks[0].row, eng.tanks[0].col), (0, 1));
        assert_eq!((eng.tanks[1].row, eng.tanks[1].col), (0, 0));
        assert!(eng.tanks[0].alive && eng.tanks[1].alive);
    }

    #[test]
    fn two_tanks_entering_one_cell_both_die() {
        let map = grid(&["1 2"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            // Side 1 at (0,0) backs up rightward; side 2 rotates twice then
            // drives forward leftward; both converge on (0,1) at step 3.
            scripted(vec![((Side::One, 0), vec![Action::MoveBackward; 3])]),
            scripted(vec![(
                (Side::Two, 0),
                vec![
                    Action::RotateRight90,
                    Action::RotateRight90,
                    Action::MoveForward,
                ],
            )]),
            EdgePolicy::Wrap,
        );
        eng.play_step(1);
        eng.play_step(2);
        assert!(eng.tanks[0].alive && eng.tanks[1].alive);
        eng.play_step(3);
        assert!(!eng.tanks[0].alive, "side 1 dies in the shared cell");
        assert!(!eng.tanks[1].alive, "side 2 dies in the shared cell");
    }

    #[test]
    fn mine_kills_entering_tank_and_is_consumed() {
        let map = grid(&["1@ 2"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            // Backward (facing left) moves right onto the mine.
            scripted(vec![((Side::One, 0), vec![Action::MoveBackward; 3])]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        eng.play_step(1);
        eng.play_step(2);
        let end = eng.play_step(3);
        assert!(!eng.tanks[0].alive);
        assert_eq!(eng.board.get(0, 1), Cell::Empty, "mine is consumed");
        assert!(matches!(end, StepEnd::Terminal(Some(Side::Two), Reason::AllTanksDead)));
    }

    #[test]
    fn head_on_shells_meet_in_the_middle_cell() {
        // Two cells of separation: both shells land on (0,1) at half-move B
        // of the firing step and die in a same-cell collision.
        let map = grid(&["2 1"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            1,
            &mut s1,
            &mut s2,
            scripted(vec![((Side::One, 0), vec![Action::Shoot])]),
            scripted(vec![((Side::Two, 0), vec![Action::Shoot])]),
            EdgePolicy::Closed,
        );
        eng.play_step(1);
        assert!(eng.shells.is_empty(), "both shells die in the middle cell");
        assert!(eng.tanks.iter().all(|t| t.alive));
    }

    #[test]
    fn crossing_shells_annihilate() {
        // Three cells of separation: after the firing step the shells sit at
        // (0,1) and (0,2); on the next half-move they exchange cells, which
        // only the crossing rule can catch.
        let map = grid(&["2  1"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            1,
            &mut s1,
            &mut s2,
            scripted(vec![((Side::One, 0), vec![Action::Shoot])]),
            scripted(vec![((Side::Two, 0), vec![Action::Shoot])]),
            EdgePolicy::Closed,
        );
        eng.play_step(1);
        assert_eq!(eng.shells.len(), 2);
        eng.play_step(2);
        assert!(eng.shells.is_empty(), "crossing shells destroy each other");
        assert!(
            eng.tanks.iter().all(|t| t.alive),
            "shells crossed before reaching either tank"
        );
    }

    #[test]
    fn zero_shell_grace_window_ends_in_tie() {
        let map = grid(&["1 2"]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            0,
            &mut s1,
            &mut s2,
            scripted(vec![]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        for step in 1..NO_AMMO_GRACE_STEPS {
            assert!(matches!(eng.play_step(step), StepEnd::Continue));
        }
        assert!(matches!(
            eng.play_step(NO_AMMO_GRACE_STEPS),
            StepEnd::Terminal(None, Reason::ZeroShells)
        ));
    }

    #[test]
    fn snapshot_marks_requester_shells_and_range() {
        let map = grid(&["1#2", "   "]);
        let (mut s1, mut s2) = (Passive, Passive);
        let mut eng = engine(
            &map,
            1,
            &mut s1,
            &mut s2,
            scripted(vec![]),
            scripted(vec![]),
            EdgePolicy::Wrap,
        );
        eng.shells.push(Shell {
            row: 1,
            col: 1,
            prev_row: 1,
            prev_col: 1,
            dir: Direction::Left,
            live: true,
        });
        let snap = eng.render_snapshot(0);
        assert_eq!(snap.object_at(0, 0), '%');
        assert_eq!(snap.object_at(1, 0), '#');
        assert_eq!(snap.object_at(2, 0), '2');
        assert_eq!(snap.object_at(1, 1), '*');
        assert_eq!(snap.object_at(3, 0), '&');

        // Shell over a tank renders as the shell.
        eng.shells[0].row = 0;
        eng.shells[0].col = 2;
        let snap = eng.render_snapshot(0);
        assert_eq!(snap.object_at(2, 0), '*');
    }

    #[test]
    fn strategist_panic_forfeits_the_side() {
        struct Exploding;
        impl Strategist for Exploding {
            fn brief(&mut self, _controller: &mut dyn Controller, _view: &dyn BattleView) {
                panic!("strategist bug");
            }
        }

        let map = grid(&["1 2"]);
        let mut bad = Exploding;
        let mut good = Passive;
        let battle = Battle {
            width: 3,
            height: 1,
            map: &map,
            map_name: "test",
            max_steps: 10,
            num_shells: 1,
            strategist1: &mut bad,
            strategist2: &mut good,
            controllers1: scripted(vec![((Side::One, 0), vec![Action::GetBattleInfo])]),
            controllers2: scripted(vec![]),
        };
        let mut gm = GameManager::new(false);
        let result = gm.run(battle);
        assert_eq!(result.winner, Some(Side::Two));
        assert_eq!(result.reason, Reason::AllTanksDead);
        assert_eq!(result.remaining_tanks, [0, 1]);
        assert_eq!(result.rounds, 1);
    }

    #[test]
    fn controller_panic_degrades_to_do_nothing() {
        struct Exploding;
        impl Controller for Exploding {
            fn next_action(&mut self) -> Action {
                panic!("controller bug");
            }
            fn update_briefing(&mut self, _briefing: battle_interface::Briefing) {}
        }

        let map = grid(&["1 2"]);
        let mut s1 = Passive;
        let mut s2 = Passive;
        let battle = Battle {
            width: 3,
            height: 1,
            map: &map,
            map_name: "test",
            max_steps: 3,
            num_shells: 1,
            strategist1: &mut s1,
            strategist2: &mut s2,
            controllers1: Arc::new(|_, _| Box::new(Exploding)),
            controllers2: scripted(vec![]),
        };
        let mut gm = GameManager::new(false);
        let result = gm.run(battle);
        // The panicking controller's tank survives the whole battle.
        assert_eq!(result.remaining_tanks, [1, 1]);
        assert_eq!(result.reason, Reason::MaxSteps);
        assert_eq!(result.rounds, 3);
    }
}
