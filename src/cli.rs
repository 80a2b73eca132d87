//! Command line parsing.
//!
//! Arguments may appear in any order. Mode flags start with `-`; everything
//! else must be a `key=value` token. Problems are collected rather than
//! reported one at a time, so a bad invocation lists everything wrong with
//! it next to the usage block.

use std::fmt;
use std::path::PathBuf;

use crate::configuration::{Configuration, Mode};

pub const USAGE: &str = "\
Usage:
  tank-sim -comparative game_map=<file> game_managers_folder=<folder> \
algorithm1=<file> algorithm2=<file> [num_threads=<num>] [-verbose]
  tank-sim -competition game_maps_folder=<folder> game_manager=<file> \
algorithms_folder=<folder> [num_threads=<num>] [-verbose]";

/// A bad invocation: every unsupported token and missing argument found.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliError {
    pub unsupported: Vec<String>,
    pub missing: Vec<String>,
}

impl CliError {
    fn is_empty(&self) -> bool {
        self.unsupported.is_empty() && self.missing.is_empty()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.unsupported.is_empty() {
            writeln!(
                f,
                "Error: Unsupported command line arguments: {}",
                self.unsupported.join(" ")
            )?;
        }
        if !self.missing.is_empty() {
            writeln!(
                f,
                "Error: Missing required arguments: {}",
                self.missing.join(", ")
            )?;
        }
        f.write_str(USAGE)
    }
}

impl std::error::Error for CliError {}

#[derive(Default)]
struct RawArgs {
    comparative: bool,
    competition: bool,
    verbose: bool,
    game_map: Option<PathBuf>,
    game_maps_folder: Option<PathBuf>,
    game_managers_folder: Option<PathBuf>,
    game_manager: Option<PathBuf>,
    algorithm1: Option<PathBuf>,
    algorithm2: Option<PathBuf>,
    algorithms_folder: Option<PathBuf>,
    num_threads: usize,
}

/// Parse the process arguments (without the binary name).
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Configuration, CliError> {
    let mut raw = RawArgs {
        num_threads: 1,
        ..RawArgs::default()
    };
    let mut error = CliError::default();

    for arg in args {
        match arg.as_str() {
            "-comparative" => {
                raw.comparative = true;
                continue;
            }
            "-competition" => {
                raw.competition = true;
                continue;
            }
            "-verbose" => {
                raw.verbose = true;
                continue;
            }
            _ => {}
        }

        let Some((key, value)) = arg.split_once('=') else {
            error
                .unsupported
                .push(format!("{arg} (expected key=value)"));
            continue;
        };
        // Whitespace around `=` is tolerated.
        let key = key.trim();
        let value = value.trim();
        if value.is_empty() {
            error.unsupported.push(format!("{arg} (empty value)"));
            continue;
        }

        match key {
            "game_map" => raw.game_map = Some(PathBuf::from(value)),
            "game_maps_folder" => raw.game_maps_folder = Some(PathBuf::from(value)),
            "game_managers_folder" => raw.game_managers_folder = Some(PathBuf::from(value)),
            "game_manager" => raw.game_manager = Some(PathBuf::from(value)),
            "algorithm1" => raw.algorithm1 = Some(PathBuf::from(value)),
            "algorithm2" => raw.algorithm2 = Some(PathBuf::from(value)),
            "algorithms_folder" => raw.algorithms_folder = Some(PathBuf::from(value)),
            "num_threads" => match value.parse::<usize>() {
                Ok(n) if n >= 1 => raw.num_threads = n,
                _ => error
                    .unsupported
                    .push(format!("{arg} (num_threads must be a number >= 1)")),
            },
            _ => error.unsupported.push(arg.clone()),
        }
    }

    if raw.comparative && raw.competition {
        error
            .unsupported
            .push("both -comparative and -competition".to_string());
    } else if !raw.comparative && !raw.competition {
        error
            .missing
            .push("mode (-comparative or -competition)".to_string());
    }

    let mut require = |name: &str, value: Option<PathBuf>| -> Option<PathBuf> {
        if value.is_none() {
            error.missing.push(name.to_string());
        }
        value
    };

    let mode = if raw.comparative && !raw.competition {
        let game_map = require("game_map", raw.game_map);
        let game_managers_folder = require("game_managers_folder", raw.game_managers_folder);
        let algorithm1 = require("algorithm1", raw.algorithm1);
        let algorithm2 = require("algorithm2", raw.algorithm2);
        match (game_map, game_managers_folder, algorithm1, algorithm2) {
            (Some(game_map), Some(game_managers_folder), Some(algorithm1), Some(algorithm2)) => {
                Some(Mode::Comparative {
                    game_map,
                    game_managers_folder,
                    algorithm1,
                    algorithm2,
                })
            }
            _ => None,
        }
    } else if raw.competition && !raw.comparative {
        let game_maps_folder = require("game_maps_folder", raw.game_maps_folder);
        let game_manager = require("game_manager", raw.game_manager);
        let algorithms_folder = require("algorithms_folder", raw.algorithms_folder);
        match (game_maps_folder, game_manager, algorithms_folder) {
            (Some(game_maps_folder), Some(game_manager), Some(algorithms_folder)) => {
                Some(Mode::Competition {
                    game_maps_folder,
                    game_manager,
                    algorithms_folder,
                })
            }
            _ => None,
        }
    } else {
        None
    };

    match (mode, error.is_empty()) {
        (Some(mode), true) => Ok(Configuration::new(mode)
            .with_num_threads(raw.num_threads)
            .with_verbose(raw.verbose)),
        _ => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_a_full_comparative_invocation() {
        let config = parse_args(args(&[
            "-comparative",
            "game_map=maps/duel.txt",
            "game_managers_folder=arbiters",
            "algorithm1=algos/a.so",
            "algorithm2=algos/b.so",
            "num_threads=4",
            "-verbose",
        ]))
        .unwrap();
        assert!(config.verbose());
        assert_eq!(config.num_threads, 4);
        match config.mode {
            Mode::Comparative {
                game_map,
                algorithm2,
                ..
            } => {
                assert_eq!(game_map, PathBuf::from("maps/duel.txt"));
                assert_eq!(algorithm2, PathBuf::from("algos/b.so"));
            }
            _ => panic!("expected comparative mode"),
        }
    }

    #[test]
    fn parses_a_competition_invocation_in_any_order() {
        let config = parse_args(args(&[
            "algorithms_folder=algos",
            "-competition",
            "game_manager=gm.so",
            "game_maps_folder=maps",
        ]))
        .unwrap();
        assert!(!config.verbose());
        assert_eq!(config.num_threads, 1);
        assert!(matches!(config.mode, Mode::Competition { .. }));
    }

    #[test]
    fn tolerates_whitespace_around_the_equals_sign() {
        let config = parse_args(args(&[
            "-competition",
            "game_maps_folder= maps",
            "game_manager =gm.so",
            "algorithms_folder = algos",
        ]))
        .unwrap();
        match config.mode {
            Mode::Competition { game_manager, .. } => {
                assert_eq!(game_manager, PathBuf::from("gm.so"));
            }
            _ => panic!("expected competition mode"),
        }
    }

    #[test]
    fn missing_arguments_are_all_reported() {
        let err = parse_args(args(&["-comparative", "game_map=m.txt"])).unwrap_err();
        assert_eq!(
            err.missing,
            vec!["game_managers_folder", "algorithm1", "algorithm2"]
        );
        assert!(err.to_string().contains("Usage:"));
    }

    #[test]
    fn missing_mode_is_an_error() {
        let err = parse_args(args(&["game_map=m.txt"])).unwrap_err();
        assert!(err.missing.iter().any(|m| m.contains("mode")));
    }

    #[test]
    fn both_modes_at_once_are_rejected() {
        let err = parse_args(args(&["-comparative", "-competition"])).unwrap_err();
        assert!(err
            .unsupported
            .iter()
            .any(|u| u.contains("both -comparative and -competition")));
    }

    #[test]
    fn unknown_keys_and_bad_threads_are_collected() {
        let err = parse_args(args(&[
            "-competition",
            "game_maps_folder=maps",
            "game_manager=gm.so",
            "algorithms_folder=algos",
            "frobnicate=yes",
            "num_threads=zero",
            "loose-token",
        ]))
        .unwrap_err();
        assert_eq!(err.unsupported.len(), 3);
        assert!(err.missing.is_empty());
    }

    #[test]
    fn empty_values_are_rejected() {
        let err = parse_args(args(&["-competition", "game_maps_folder="])).unwrap_err();
        assert!(err.unsupported.iter().any(|u| u.contains("empty value")));
    }
}
