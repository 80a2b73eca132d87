//! # Tank Sim
//!
//! A turn-based tank-combat simulator for benchmarking competing control
//! algorithms. Two families of pluggable artefacts are combined at run time
//! by the driver in this crate: *arbiters* that run one battle each, and
//! *algorithm bundles* that supply a per-side strategist plus per-tank
//! controllers.
//!
//! Two evaluation modes are supported:
//! - **Comparative**: one map, one algorithm pair, every arbiter found in a
//!   folder; identical outcomes are grouped in the report.
//! - **Competition**: one arbiter, every map in a folder, a deduplicated
//!   round-robin over all algorithms; 3/1/0 scoring.
//!
//! Independent battles run in parallel on a bounded worker pool. Artefacts
//! are loaded once per process through [`plugin_loader::PluginHost`] and
//! their factories shared across workers.
//!
//! The battle contracts live in the `battle-interface` crate; the reference
//! arbiter and algorithms live in `battle-arbiter` and `battle-algorithms`,
//! which double as loadable artefacts.

pub mod cli;
pub mod configuration;
pub mod logger;
pub mod map_loader;
pub mod match_runner;
pub mod output;
pub mod plugin_loader;
pub mod scheduler;
pub mod simulator;
pub mod worker_pool;

pub use configuration::{Configuration, Mode};
pub use simulator::Simulator;
