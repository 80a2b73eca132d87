//! The reference strategist: rebuilds the board from a snapshot and hands
//! the requesting tank a briefing.

use battle_interface::{markers, BattleView, Briefing, Controller, Side, Strategist};

/// Per-side planner that forwards a full board reconstruction to whichever
/// tank asked for it. It tracks nothing between requests; facing is left
/// unknown and the shell count reported is the initial allotment.
pub struct BoardStrategist {
    side: Side,
    width: usize,
    height: usize,
    num_shells: usize,
}

impl BoardStrategist {
    pub fn new(
        side: Side,
        width: usize,
        height: usize,
        _max_steps: usize,
        num_shells: usize,
    ) -> BoardStrategist {
        BoardStrategist {
            side,
            width,
            height,
            num_shells,
        }
    }
}

impl Strategist for BoardStrategist {
    fn brief(&mut self, controller: &mut dyn Controller, view: &dyn BattleView) {
        let mut board = Vec::with_capacity(self.height);
        let mut self_pos = None;
        for row in 0..self.height {
            let mut line = String::with_capacity(self.width);
            for col in 0..self.width {
                let ch = view.object_at(col, row);
                if ch == markers::SELF_TANK {
                    self_pos = Some((row, col));
                    line.push(markers::EMPTY);
                } else {
                    line.push(ch);
                }
            }
            board.push(line);
        }

        // The self marker should always be present; fall back to the first
        // own-side glyph if a foreign arbiter omitted it.
        if self_pos.is_none() {
            self_pos = board.iter().enumerate().find_map(|(row, line)| {
                line.chars()
                    .position(|c| c == self.side.glyph())
                    .map(|col| (row, col))
            });
            if let Some((row, col)) = self_pos {
                let line: String = board[row]
                    .chars()
                    .enumerate()
                    .map(|(i, c)| if i == col { markers::EMPTY } else { c })
                    .collect();
                board[row] = line;
            }
        }
        let (self_row, self_col) = self_pos.unwrap_or((0, 0));

        controller.update_briefing(Briefing {
            rows: self.height,
            cols: self.width,
            board,
            self_row,
            self_col,
            facing: None,
            shells_remaining: self.num_shells,
        });
    }
}
