//! Result artefact writers.
//!
//! Both modes write a timestamped text file into the working directory. If
//! the file cannot be created the report goes to stdout with a warning;
//! writing results is never fatal.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use time::format_description;
use time::OffsetDateTime;
use tracing::{info, warn};

use battle_interface::{GameResult, Reason};

use crate::simulator::OutcomeGroup;

/// Header lines of a comparative report.
pub struct ComparativeHeader {
    pub game_map: String,
    pub algorithm1: String,
    pub algorithm2: String,
}

/// Header lines of a competition report.
pub struct CompetitionHeader {
    pub game_maps_folder: String,
    pub game_manager: String,
}

/// `YYYYMMDD_HHMMSS`, UTC.
pub fn timestamp() -> String {
    let format = format_description::parse("[year][month][day]_[hour][minute][second]")
        .expect("static format description");
    OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| "00000000_000000".to_string())
}

/// Human-readable outcome line, shared by both report flavours.
pub fn result_message(result: &GameResult, max_steps: usize) -> String {
    match (result.winner, result.reason) {
        (Some(side), _) => format!(
            "Player {side} won with {} tanks still alive",
            result.remaining_tanks[side.index()]
        ),
        (None, Reason::AllTanksDead) => "Tie, both players have zero tanks".to_string(),
        (None, Reason::MaxSteps) => format!(
            "Tie, reached max steps = {max_steps}, player 1 has {} tanks, player 2 has {} tanks",
            result.remaining_tanks[0], result.remaining_tanks[1]
        ),
        (None, Reason::ZeroShells) => {
            "Tie, both players have zero shells for 40 steps".to_string()
        }
    }
}

/// Render a comparative report into `out`.
pub fn render_comparative(
    out: &mut dyn Write,
    header: &ComparativeHeader,
    groups: &[OutcomeGroup],
    max_steps: usize,
) -> std::io::Result<()> {
    writeln!(out, "game_map={}", header.game_map)?;
    writeln!(out, "algorithm1={}", header.algorithm1)?;
    writeln!(out, "algorithm2={}", header.algorithm2)?;
    writeln!(out)?;
    for (index, group) in groups.iter().enumerate() {
        writeln!(out, "{}", group.arbiters.join(","))?;
        writeln!(out, "{}", result_message(&group.result, max_steps))?;
        writeln!(out, "{}", group.result.rounds)?;
        for row in group.result.final_grid.rows() {
            writeln!(out, "{row}")?;
        }
        if index + 1 < groups.len() {
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Render a competition report into `out`.
pub fn render_competition(
    out: &mut dyn Write,
    header: &CompetitionHeader,
    scores: &[(String, u32)],
) -> std::io::Result<()> {
    writeln!(out, "game_maps_folder={}", header.game_maps_folder)?;
    writeln!(out, "game_manager={}", header.game_manager)?;
    writeln!(out)?;
    for (name, score) in scores {
        writeln!(out, "{name} {score}")?;
    }
    Ok(())
}

/// Write `comparative_results_<timestamp>.txt`, degrading to stdout.
pub fn write_comparative_report(
    header: &ComparativeHeader,
    groups: &[OutcomeGroup],
    max_steps: usize,
) -> anyhow::Result<()> {
    let path = PathBuf::from(format!("comparative_results_{}.txt", timestamp()));
    write_or_dump(&path, |out| {
        render_comparative(out, header, groups, max_steps)
    })
}

/// Write `competition_<timestamp>.txt`, degrading to stdout.
pub fn write_competition_report(
    header: &CompetitionHeader,
    scores: &[(String, u32)],
) -> anyhow::Result<()> {
    let path = PathBuf::from(format!("competition_{}.txt", timestamp()));
    write_or_dump(&path, |out| render_competition(out, header, scores))
}

fn write_or_dump(
    path: &PathBuf,
    render: impl Fn(&mut dyn Write) -> std::io::Result<()>,
) -> anyhow::Result<()> {
    match std::fs::File::create(path) {
        Ok(mut file) => {
            render(&mut file).with_context(|| format!("writing '{}'", path.display()))?;
            info!("results written to {}", path.display());
        }
        Err(err) => {
            warn!(
                "cannot create '{}' ({err}); printing results to stdout",
                path.display()
            );
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            render(&mut lock).context("writing results to stdout")?;
        }
    }
    Ok(())
}
