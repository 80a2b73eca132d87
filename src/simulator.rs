//! Mode orchestration: load plugins, schedule battles, aggregate results.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, instrument, warn};

use crate::configuration::{Configuration, Mode};
use crate::map_loader::{self, MapData};
use crate::match_runner::{run_match, GameTask, MatchOutcome};
use crate::output;
use crate::plugin_loader::{AlgorithmHandle, ArbiterHandle, PluginHost};
use crate::scheduler::competition_pairings;
use crate::worker_pool::WorkerPool;
use battle_interface::Side;

/// Results of one comparative run: arbiters grouped by identical outcome.
pub struct OutcomeGroup {
    /// Arbiter artefact names sharing the outcome, sorted by name.
    pub arbiters: Vec<String>,
    /// The shared outcome.
    pub result: battle_interface::GameResult,
}

/// The main driver type: runs one configured evaluation.
pub struct Simulator {
    config: Configuration,
}

impl Simulator {
    pub fn new(config: Configuration) -> Simulator {
        Simulator { config }
    }

    /// Execute the configured mode to completion, writing the result
    /// artefact at the end.
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.config.mode {
            Mode::Comparative {
                game_map,
                game_managers_folder,
                algorithm1,
                algorithm2,
            } => self.run_comparative(game_map, game_managers_folder, algorithm1, algorithm2),
            Mode::Competition {
                game_maps_folder,
                game_manager,
                algorithms_folder,
            } => self.run_competition(game_maps_folder, game_manager, algorithms_folder),
        }
    }

    #[instrument(skip_all)]
    fn run_comparative(
        &self,
        game_map: &Path,
        game_managers_folder: &Path,
        algorithm1: &Path,
        algorithm2: &Path,
    ) -> anyhow::Result<()> {
        require_file(game_map, "game_map")?;
        require_dir(game_managers_folder, "game_managers_folder")?;
        require_file(algorithm1, "algorithm1")?;
        require_file(algorithm2, "algorithm2")?;

        // Map problems are fatal in comparative mode.
        let map = Arc::new(map_loader::load_map(game_map)?);

        // Activation order: algorithm 1, algorithm 2, then the arbiters.
        // Either algorithm failing to load is fatal.
        let mut host = PluginHost::new();
        let alg1 = host.load_algorithm(algorithm1)?;
        let alg2 = if same_file(algorithm1, algorithm2) {
            // The same artefact may be fielded on both sides; it is
            // activated only once.
            alg1.clone()
        } else {
            host.load_algorithm(algorithm2)?
        };

        let arbiter_files = collect_artefacts(game_managers_folder)?;
        if arbiter_files.is_empty() {
            bail!(
                "no arbiter artefacts found in '{}'",
                game_managers_folder.display()
            );
        }
        let mut arbiters = Vec::new();
        for path in &arbiter_files {
            match host.load_arbiter(path) {
                Ok(handle) => arbiters.push(handle),
                Err(err) => warn!("skipping arbiter: {err}"),
            }
        }
        if arbiters.is_empty() {
            bail!("no arbiter artefact could be loaded");
        }

        let outcomes = run_comparative_battles(
            arbiters,
            alg1,
            alg2,
            map.clone(),
            self.config.num_threads,
            self.config.verbose,
        );
        let groups = group_outcomes(outcomes);

        output::write_comparative_report(
            &output::ComparativeHeader {
                game_map: file_name_of(game_map),
                algorithm1: file_name_of(algorithm1),
                algorithm2: file_name_of(algorithm2),
            },
            &groups,
            map.max_steps,
        )?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn run_competition(
        &self,
        game_maps_folder: &Path,
        game_manager: &Path,
        algorithms_folder: &Path,
    ) -> anyhow::Result<()> {
        require_dir(game_maps_folder, "game_maps_folder")?;
        require_file(game_manager, "game_manager")?;
        require_dir(algorithms_folder, "algorithms_folder")?;

        let algorithm_files = collect_artefacts(algorithms_folder)?;
        if algorithm_files.len() < 2 {
            bail!(
                "competition needs at least 2 algorithm artefacts in '{}', found {}",
                algorithms_folder.display(),
                algorithm_files.len()
            );
        }

        // Activation order: every algorithm (sorted by file name), then the
        // arbiter. A failing algorithm is excluded, not fatal.
        let mut host = PluginHost::new();
        let mut algorithms = Vec::new();
        for path in &algorithm_files {
            match host.load_algorithm(path) {
                Ok(handle) => algorithms.push(handle),
                Err(err) => warn!("excluding algorithm: {err}"),
            }
        }
        if algorithms.len() < 2 {
            bail!(
                "competition needs at least 2 loadable algorithms, {} left",
                algorithms.len()
            );
        }
        let arbiter = host
            .load_arbiter(game_manager)
            .context("game_manager failed to load")?;

        // Invalid maps are skipped with a warning.
        let map_files = map_loader::collect_map_files(game_maps_folder)?;
        if map_files.is_empty() {
            bail!("no map files found in '{}'", game_maps_folder.display());
        }
        let maps = map_loader::load_valid_maps(&map_files);
        if maps.is_empty() {
            bail!("no valid maps in '{}'", game_maps_folder.display());
        }

        let outcomes = run_competition_battles(
            arbiter,
            &algorithms,
            &maps,
            self.config.num_threads,
            self.config.verbose,
        );
        let names: Vec<String> = algorithms.iter().map(|a| a.name.clone()).collect();
        let scores = competition_scores(&names, &outcomes);

        output::write_competition_report(
            &output::CompetitionHeader {
                game_maps_folder: file_name_of(game_maps_folder),
                game_manager: file_name_of(game_manager),
            },
            &scores,
        )?;
        Ok(())
    }
}

/// One battle per arbiter over a single map and algorithm pair.
pub fn run_comparative_battles(
    arbiters: Vec<ArbiterHandle>,
    algorithm1: AlgorithmHandle,
    algorithm2: AlgorithmHandle,
    map: Arc<MapData>,
    num_threads: usize,
    verbose: bool,
) -> Vec<MatchOutcome> {
    let tasks: Vec<GameTask> = arbiters
        .into_iter()
        .map(|arbiter| GameTask {
            arbiter,
            algorithm1: algorithm1.clone(),
            algorithm2: algorithm2.clone(),
            map: map.clone(),
            verbose,
        })
        .collect();
    run_all(tasks, num_threads)
}

/// The dedup round-robin schedule over every valid map.
pub fn run_competition_battles(
    arbiter: ArbiterHandle,
    algorithms: &[AlgorithmHandle],
    maps: &[Arc<MapData>],
    num_threads: usize,
    verbose: bool,
) -> Vec<MatchOutcome> {
    let mut tasks = Vec::new();
    for (map_index, map) in maps.iter().enumerate() {
        for (i, j) in competition_pairings(algorithms.len(), map_index) {
            tasks.push(GameTask {
                arbiter: arbiter.clone(),
                algorithm1: algorithms[i].clone(),
                algorithm2: algorithms[j].clone(),
                map: map.clone(),
                verbose,
            });
        }
    }
    run_all(tasks, num_threads)
}

/// Push every task through the worker pool and collect all results.
/// Results may arrive in any order; aggregation sorts on explicit keys.
fn run_all(tasks: Vec<GameTask>, num_threads: usize) -> Vec<MatchOutcome> {
    let total = tasks.len();
    info!(battles = total, workers = num_threads.max(1), "scheduling battles");
    let (sender, receiver) = mpsc::channel();
    let runner = |task: GameTask| {
        // A panicking plugin factory must not wedge result collection.
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run_match(task))).ok()
    };
    let mut pool = WorkerPool::new(num_threads, runner, sender);
    for task in tasks {
        pool.submit(task);
    }
    let outcomes: Vec<MatchOutcome> = (0..total)
        .filter_map(|_| receiver.recv().expect("worker pool hung up early"))
        .collect();
    pool.join();
    if outcomes.len() < total {
        warn!(lost = total - outcomes.len(), "battles aborted by plugin panics");
    }
    outcomes
}

/// Group comparative outcomes on the exact key
/// `(winner, reason, rounds, final_grid)`; groups are ordered by size
/// descending, ties by their lexicographically first arbiter name.
pub fn group_outcomes(mut outcomes: Vec<MatchOutcome>) -> Vec<OutcomeGroup> {
    outcomes.sort_by(|a, b| a.arbiter_name.cmp(&b.arbiter_name));
    let mut groups: Vec<OutcomeGroup> = Vec::new();
    for outcome in outcomes {
        match groups.iter_mut().find(|g| g.result == outcome.result) {
            Some(group) => group.arbiters.push(outcome.arbiter_name),
            None => groups.push(OutcomeGroup {
                arbiters: vec![outcome.arbiter_name],
                result: outcome.result,
            }),
        }
    }
    groups.sort_by(|a, b| {
        b.arbiters
            .len()
            .cmp(&a.arbiters.len())
            .then_with(|| a.arbiters[0].cmp(&b.arbiters[0]))
    });
    groups
}

/// Total 3/1/0 scores in rank order: score descending, ties broken
/// lexicographically by name.
pub fn competition_scores(names: &[String], outcomes: &[MatchOutcome]) -> Vec<(String, u32)> {
    let mut scores: Vec<(String, u32)> = names.iter().map(|n| (n.clone(), 0)).collect();
    let mut add = |name: &str, points: u32| {
        if let Some(entry) = scores.iter_mut().find(|(n, _)| n == name) {
            entry.1 += points;
        }
    };
    for outcome in outcomes {
        match outcome.result.winner {
            Some(Side::One) => add(&outcome.algorithm1_name, 3),
            Some(Side::Two) => add(&outcome.algorithm2_name, 3),
            None => {
                add(&outcome.algorithm1_name, 1);
                add(&outcome.algorithm2_name, 1);
            }
        }
    }
    scores.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scores
}

/// Artefact files (platform dynamic-library extension) in a folder,
/// sorted by file name for deterministic activation order.
pub fn collect_artefacts(folder: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("cannot read folder '{}'", folder.display()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn require_file(path: &Path, what: &str) -> anyhow::Result<()> {
    if !path.is_file() {
        bail!("{what} '{}' does not exist or is not a file", path.display());
    }
    Ok(())
}

fn require_dir(path: &Path, what: &str) -> anyhow::Result<()> {
    if !path.is_dir() {
        bail!(
            "{what} '{}' does not exist or is not a directory",
            path.display()
        );
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
