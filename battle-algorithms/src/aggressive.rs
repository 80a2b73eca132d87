//! The aggressive controller: breadth-first search for the shortest plan
//! that ends in a firing position.

use std::collections::VecDeque;

use battle_interface::{Action, Briefing, Controller, Direction, Side};

/// Steps a briefing stays trusted before a fresh one is requested.
const INFO_REFRESH_TURNS: u32 = 4;

/// Shots are spaced at least this many turns apart, mirroring the arbiter's
/// cooldown so the controller never wastes a turn on an ignored shot.
const SHOT_SPACING: u8 = 4;

/// Neighbour expansion order of the search; earlier entries win ties.
const EXPANSION_ORDER: [Action; 6] = [
    Action::RotateRight45,
    Action::RotateLeft45,
    Action::RotateRight90,
    Action::RotateLeft90,
    Action::MoveForward,
    Action::MoveBackward,
];

/// Per-tank controller that hunts the nearest firing position.
///
/// The reference briefing does not carry facing or live shell counts, so
/// the controller keeps its own model: facing starts at the side default
/// and follows issued rotations, the pose follows issued moves, and shells
/// and shot spacing are tracked locally. The periodic briefing refresh
/// bounds any drift between the model and the arbiter's ground truth.
pub struct AggressiveController {
    side: Side,
    briefing: Option<Briefing>,
    facing: Direction,
    row: usize,
    col: usize,
    shells: Option<usize>,
    cooldown: u8,
    turns_since_info: u32,
    plan: Vec<Action>,
}

impl AggressiveController {
    pub fn new(side: Side, _tank_index: usize) -> AggressiveController {
        AggressiveController {
            side,
            briefing: None,
            facing: match side {
                Side::One => Direction::Left,
                Side::Two => Direction::Right,
            },
            row: 0,
            col: 0,
            shells: None,
            cooldown: 0,
            turns_since_info: 0,
            plan: Vec::new(),
        }
    }

    fn can_fire(&self) -> bool {
        self.shells.unwrap_or(0) > 0 && self.cooldown == 0
    }

    /// Track the effect of the action we are about to issue, so the next
    /// call plans from the predicted pose.
    fn note_issued(&mut self, action: Action) {
        if let Some(steps) = action.rotation_steps() {
            self.facing = self.facing.rotated(steps);
            return;
        }
        match action {
            Action::MoveForward => self.note_move(self.facing),
            Action::MoveBackward => self.note_move(self.facing.opposite()),
            Action::Shoot => {
                if let Some(shells) = self.shells.as_mut() {
                    *shells = shells.saturating_sub(1);
                }
                self.cooldown = SHOT_SPACING;
            }
            _ => {}
        }
    }

    fn note_move(&mut self, dir: Direction) {
        let Some(briefing) = self.briefing.as_ref() else {
            return;
        };
        if let Some((row, col)) = offset(self.row, self.col, dir, briefing.rows, briefing.cols) {
            self.row = row;
            self.col = col;
        }
    }

    /// Shortest action sequence from the current pose to a firing pose.
    fn search_plan(&self) -> Option<Vec<Action>> {
        let briefing = self.briefing.as_ref()?;
        let rows = briefing.rows;
        let cols = briefing.cols;
        if rows == 0 || cols == 0 || self.row >= rows || self.col >= cols {
            return None;
        }
        let board: Vec<Vec<char>> = briefing.board.iter().map(|l| l.chars().collect()).collect();
        let me = self.side.glyph();

        let state_of = |row: usize, col: usize, dir: Direction| -> usize {
            (row * cols + col) * Direction::COUNT + dir.index()
        };
        let mut visited = vec![false; rows * cols * Direction::COUNT];
        let mut parent: Vec<Option<(usize, Action)>> = vec![None; visited.len()];
        let mut queue = VecDeque::new();

        let start = state_of(self.row, self.col, self.facing);
        visited[start] = true;
        queue.push_back((self.row, self.col, self.facing));

        let mut goal = None;
        while let Some((row, col, dir)) = queue.pop_front() {
            if clear_shot(&board, row, col, dir, me) {
                goal = Some(state_of(row, col, dir));
                break;
            }
            let here = state_of(row, col, dir);
            for action in EXPANSION_ORDER {
                let next = if let Some(steps) = action.rotation_steps() {
                    Some((row, col, dir.rotated(steps)))
                } else {
                    let move_dir = if action == Action::MoveForward {
                        dir
                    } else {
                        dir.opposite()
                    };
                    passable_step(&board, row, col, move_dir).map(|(r, c)| (r, c, dir))
                };
                let Some((nr, nc, nd)) = next else { continue };
                let state = state_of(nr, nc, nd);
                if !visited[state] {
                    visited[state] = true;
                    parent[state] = Some((here, action));
                    queue.push_back((nr, nc, nd));
                }
            }
        }

        let goal = goal?;
        let mut actions = Vec::new();
        let mut state = goal;
        while state != start {
            let (prev, action) = parent[state].expect("every reached state has a parent");
            actions.push(action);
            state = prev;
        }
        actions.reverse();
        Some(actions)
    }
}

impl Controller for AggressiveController {
    fn next_action(&mut self) -> Action {
        if self.cooldown > 0 {
            self.cooldown -= 1;
        }
        self.turns_since_info += 1;

        if self.briefing.is_none() || self.turns_since_info > INFO_REFRESH_TURNS {
            return Action::GetBattleInfo;
        }

        // Fire as soon as a straight ray reaches an enemy.
        if self.can_fire() {
            let briefing = self.briefing.as_ref().expect("briefing checked above");
            let board: Vec<Vec<char>> =
                briefing.board.iter().map(|l| l.chars().collect()).collect();
            if clear_shot(&board, self.row, self.col, self.facing, self.side.glyph()) {
                self.note_issued(Action::Shoot);
                return Action::Shoot;
            }
        }

        if self.shells.unwrap_or(0) == 0 {
            // Nothing left to plan toward; keep scanning.
            self.note_issued(Action::RotateRight90);
            return Action::RotateRight90;
        }

        // Re-plan from the predicted pose and take the first step.
        match self.search_plan() {
            Some(plan) => {
                self.plan = plan;
                match self.plan.first() {
                    Some(&action) => {
                        self.note_issued(action);
                        action
                    }
                    // Already in a firing pose; the next shot is still
                    // spaced out.
                    None => Action::DoNothing,
                }
            }
            None => {
                self.plan.clear();
                self.note_issued(Action::RotateRight90);
                Action::RotateRight90
            }
        }
    }

    fn update_briefing(&mut self, briefing: Briefing) {
        self.row = briefing.self_row;
        self.col = briefing.self_col;
        if let Some(facing) = briefing.facing {
            self.facing = facing;
        }
        if self.shells.is_none() {
            self.shells = Some(briefing.shells_remaining);
        }
        self.briefing = Some(briefing);
        self.turns_since_info = 0;
        self.plan.clear();
    }
}

/// Cells a tank cannot plan through: walls, mines and any tank.
fn blocks(board: &[Vec<char>], row: usize, col: usize) -> bool {
    matches!(board[row][col], '#' | '@' | '1' | '2')
}

/// One passable cell in `dir`, honouring the corner-cut rule: a diagonal
/// step needs both flanking cells clear as well.
fn passable_step(
    board: &[Vec<char>],
    row: usize,
    col: usize,
    dir: Direction,
) -> Option<(usize, usize)> {
    let rows = board.len();
    let cols = board.first().map_or(0, Vec::len);
    let (nr, nc) = offset(row, col, dir, rows, cols)?;
    if blocks(board, nr, nc) {
        return None;
    }
    if nr != row && nc != col && (blocks(board, row, nc) || blocks(board, nr, col)) {
        return None;
    }
    Some((nr, nc))
}

/// Bounded (non-wrapping) neighbour cell.
fn offset(
    row: usize,
    col: usize,
    dir: Direction,
    rows: usize,
    cols: usize,
) -> Option<(usize, usize)> {
    let (dr, dc) = dir.delta();
    let nr = row as i64 + dr as i64;
    let nc = col as i64 + dc as i64;
    if nr < 0 || nc < 0 || nr >= rows as i64 || nc >= cols as i64 {
        None
    } else {
        Some((nr as usize, nc as usize))
    }
}

/// Does a straight ray from `(row, col)` in `dir` reach an enemy tank
/// before a wall, a mine or a friend? Shells in flight are overflown.
fn clear_shot(board: &[Vec<char>], row: usize, col: usize, dir: Direction, me: char) -> bool {
    let rows = board.len();
    let cols = board.first().map_or(0, Vec::len);
    let mut pos = (row, col);
    while let Some((r, c)) = offset(pos.0, pos.1, dir, rows, cols) {
        match board[r][c] {
            '#' | '@' => return false,
            c2 @ ('1' | '2') => return c2 != me,
            _ => {}
        }
        pos = (r, c);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn briefing(rows: &[&str], self_row: usize, self_col: usize, shells: usize) -> Briefing {
        Briefing {
            rows: rows.len(),
            cols: rows.first().map_or(0, |r| r.len()),
            board: rows.iter().map(|r| r.to_string()).collect(),
            self_row,
            self_col,
            facing: None,
            shells_remaining: shells,
        }
    }

    fn board_of(rows: &[&str]) -> Vec<Vec<char>> {
        rows.iter().map(|r| r.chars().collect()).collect()
    }

    #[test]
    fn requests_info_before_anything_else() {
        let mut tank = AggressiveController::new(Side::One, 0);
        assert_eq!(tank.next_action(), Action::GetBattleInfo);
    }

    #[test]
    fn refreshes_info_after_four_turns() {
        let mut tank = AggressiveController::new(Side::One, 0);
        tank.update_briefing(briefing(&["  2  1  "], 0, 5, 3));
        // Facing left with a clear line: keeps acting for four turns.
        for _ in 0..INFO_REFRESH_TURNS {
            assert_ne!(tank.next_action(), Action::GetBattleInfo);
        }
        assert_eq!(tank.next_action(), Action::GetBattleInfo);
    }

    #[test]
    fn shoots_when_an_enemy_is_in_the_line_of_fire() {
        let mut tank = AggressiveController::new(Side::One, 0);
        tank.update_briefing(briefing(&["2    1"], 0, 5, 2));
        assert_eq!(tank.next_action(), Action::Shoot);
        // Spacing: the follow-up shot waits even though the line is clear.
        assert_ne!(tank.next_action(), Action::Shoot);
    }

    #[test]
    fn does_not_shoot_through_walls_or_friends() {
        for row in ["2 # 1", "2 1 1"] {
            let board = board_of(&[row]);
            assert!(
                !clear_shot(&board, 0, 4, Direction::Left, '1'),
                "ray must be blocked in {row:?}"
            );
        }
        let board = board_of(&["2 * 1"]);
        assert!(
            clear_shot(&board, 0, 4, Direction::Left, '1'),
            "shells are overflown"
        );
    }

    #[test]
    fn plans_a_rotation_when_the_enemy_is_behind() {
        // Enemy sits to the right of a left-facing tank; the shortest plan
        // is a 180° turn, which BFS reaches through two right-90 steps with
        // the fixed tie-break order.
        let mut tank = AggressiveController::new(Side::One, 0);
        tank.update_briefing(briefing(&["1    2"], 0, 0, 2));
        assert_eq!(tank.next_action(), Action::RotateRight90);
        assert_eq!(tank.next_action(), Action::RotateRight90);
        assert_eq!(tank.next_action(), Action::Shoot);
    }

    #[test]
    fn walks_around_a_wall_to_a_firing_lane() {
        // A wall hides the enemy from the whole left column. The shortest
        // plans go through the open row below.
        let rows = ["1#2", " # ", "   "];
        let mut tank = AggressiveController::new(Side::One, 0);
        tank.update_briefing(briefing(&rows, 0, 0, 2));
        let plan = tank.search_plan().expect("a firing lane is reachable");
        assert!(!plan.is_empty());
        assert!(
            plan.iter().all(|a| *a != Action::Shoot),
            "plans end at a pose, the shot is issued separately"
        );
        // The plan must be executable: replay it over the briefing board.
        let board = board_of(&rows);
        let (mut row, mut col, mut facing) = (0usize, 0usize, Direction::Left);
        for action in &plan {
            if let Some(steps) = action.rotation_steps() {
                facing = facing.rotated(steps);
            } else {
                let dir = if *action == Action::MoveForward {
                    facing
                } else {
                    facing.opposite()
                };
                let (r, c) = passable_step(&board, row, col, dir).expect("plan step is legal");
                row = r;
                col = c;
            }
        }
        assert!(clear_shot(&board, row, col, facing, '1'));
    }

    #[test]
    fn corner_cut_is_forbidden() {
        let board = board_of(&[" #", "# "]);
        assert_eq!(passable_step(&board, 0, 0, Direction::DownRight), None);
        let open = board_of(&["  ", "  "]);
        assert_eq!(passable_step(&open, 0, 0, Direction::DownRight), Some((1, 1)));
    }

    #[test]
    fn spins_when_no_shot_is_reachable() {
        // Sealed in: no reachable firing pose at all.
        let mut tank = AggressiveController::new(Side::One, 0);
        tank.update_briefing(briefing(&["1#2"], 0, 0, 2));
        assert_eq!(tank.next_action(), Action::RotateRight90);
    }

    #[test]
    fn spins_without_ammunition() {
        let mut tank = AggressiveController::new(Side::One, 0);
        tank.update_briefing(briefing(&["2    1"], 0, 5, 0));
        assert_eq!(tank.next_action(), Action::RotateRight90);
    }
}
