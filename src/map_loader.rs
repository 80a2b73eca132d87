//! Map file parsing.
//!
//! Plain text format: line 1 is a free-form description, lines 2-5 carry
//! `MaxSteps`, `NumShells`, `Rows` and `Cols` in that order (whitespace
//! around `=` is allowed, keys are case-sensitive), and the remaining lines
//! are the grid. Grid lines are padded with spaces or truncated to `Cols`;
//! missing rows are blank. Unrecognised characters become empty cells.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::warn;

use battle_interface::{markers, BattleView, Side};

/// A parsed and validated map.
#[derive(Debug, Clone)]
pub struct MapData {
    /// Free-form description from line 1.
    pub name: String,
    /// File name the map was loaded from.
    pub file_name: String,
    pub max_steps: usize,
    pub num_shells: usize,
    pub rows: usize,
    pub cols: usize,
    /// Sanitised grid, exactly `rows` lines of `cols` characters.
    pub grid: Vec<String>,
}

impl MapData {
    /// Snapshot view of the initial grid, as handed to arbiters.
    pub fn view(&self) -> MapView<'_> {
        MapView { map: self }
    }

    fn tank_count(&self, side: Side) -> usize {
        self.grid
            .iter()
            .flat_map(|line| line.chars())
            .filter(|&c| c == side.glyph())
            .count()
    }
}

/// [`BattleView`] over an initial map grid.
pub struct MapView<'a> {
    map: &'a MapData,
}

impl BattleView for MapView<'_> {
    fn object_at(&self, col: usize, row: usize) -> char {
        self.map
            .grid
            .get(row)
            .and_then(|line| line.chars().nth(col))
            .unwrap_or(markers::OUT_OF_RANGE)
    }
}

fn header_value(line: Option<&str>, key: &str, line_no: usize) -> anyhow::Result<usize> {
    let line = line.with_context(|| format!("line {line_no}: missing '{key} = <n>'"))?;
    let (found_key, value) = line
        .split_once('=')
        .with_context(|| format!("line {line_no}: expected '{key} = <n>', got '{line}'"))?;
    if found_key.trim() != key {
        bail!(
            "line {line_no}: expected key '{key}', got '{}'",
            found_key.trim()
        );
    }
    value
        .trim()
        .parse::<usize>()
        .with_context(|| format!("line {line_no}: invalid {key} value '{}'", value.trim()))
}

fn sanitise(c: char) -> char {
    match c {
        '#' | '@' | '1' | '2' | ' ' => c,
        _ => ' ',
    }
}

/// Parse map text. The `file_name` is carried along for reporting.
pub fn parse_map(text: &str, file_name: &str) -> anyhow::Result<MapData> {
    let mut lines = text.lines();
    let name = lines
        .next()
        .context("line 1: missing map description")?
        .to_string();
    let max_steps = header_value(lines.next(), "MaxSteps", 2)?;
    let num_shells = header_value(lines.next(), "NumShells", 3)?;
    let rows = header_value(lines.next(), "Rows", 4)?;
    let cols = header_value(lines.next(), "Cols", 5)?;
    if rows == 0 || cols == 0 {
        bail!("map dimensions must be positive, got {rows}x{cols}");
    }

    let mut grid: Vec<String> = Vec::with_capacity(rows);
    for line in lines.take(rows) {
        let mut row: String = line.chars().take(cols).map(sanitise).collect();
        while row.chars().count() < cols {
            row.push(' ');
        }
        grid.push(row);
    }
    while grid.len() < rows {
        grid.push(" ".repeat(cols));
    }

    let map = MapData {
        name,
        file_name: file_name.to_string(),
        max_steps,
        num_shells,
        rows,
        cols,
        grid,
    };
    for side in [Side::One, Side::Two] {
        if map.tank_count(side) == 0 {
            bail!("map has no tanks for player {side}");
        }
    }
    Ok(map)
}

/// Load and parse one map file.
pub fn load_map(path: &Path) -> anyhow::Result<MapData> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read map file '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_map(&text, &file_name).with_context(|| format!("invalid map '{}'", path.display()))
}

/// All `.txt` map files in a folder, sorted by file name so competition
/// map indices are deterministic.
pub fn collect_map_files(folder: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("cannot read maps folder '{}'", folder.display()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    Ok(files)
}

/// Parse every map in `files`, skipping invalid ones with a warning.
pub fn load_valid_maps(files: &[PathBuf]) -> Vec<Arc<MapData>> {
    let mut maps = Vec::new();
    for path in files {
        match load_map(path) {
            Ok(map) => maps.push(Arc::new(map)),
            Err(err) => warn!("skipping map: {err:#}"),
        }
    }
    maps
}
