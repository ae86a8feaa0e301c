#![warn(
    // Pedantic on purpose: inline allows mark the places worth a second look.
    clippy::nursery,
    clippy::pedantic,
    missing_docs,
)]

//! # lc-partition – bike/car lane partitioning of street networks
//!
//! Given a directed lane graph of a city, decide which lanes become dedicated bike lanes while the
//! remaining car network stays strongly connected.
//!
//! ## Pipeline overview
//! 1. Model ([`model`]) – junctions, lanes with physical attributes, lane subsets
//!    ([`LaneMask`]) and bike/car [`Partition`]s, loaded from JSON plus an optional OD matrix.
//! 2. Greedy partitioning ([`partitioning`]) – repeatedly hand the least central lane (edge
//!    betweenness) to bikes unless that breaks strong connectivity of the car network.
//! 3. Evaluation ([`metrics`]) – mean shortest travel time for bikes and cars under a
//!    gradient-aware cost model, over all pairs or an OD matrix.
//! 4. Trade-off curve ([`pareto`]) and local search ([`refine`]) built on the first three.
//! 5. Baselines ([`decomposition`], [`orientation`]) – spanning-tree or one-way bike networks with
//!    randomly or degree-balanced oriented car lanes, for comparison.
//!
//! [`planner`] wires these into the `lanecut` subcommands and writes run artefacts (CSV, JSON and
//! DOT files) into a timestamped directory under `runs/`.
//!
//! All long-running stages are annotated with [`tracing`] spans.

pub mod decomposition;
pub mod metrics;
pub mod model;
pub mod orientation;
pub mod pareto;
pub mod partitioning;
pub mod planner;
pub mod refine;
pub mod utils;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

#[cfg(test)]
mod tests;

pub use metrics::{
    evaluate_partition,
    EvaluationConfig,
    PartitionMetrics,
};
pub use model::{
    LaneGraph,
    LaneMask,
    OdPair,
    Partition,
};
pub use pareto::{
    betweenness_pareto,
    ParetoRow,
};
pub use partitioning::{
    greedy_betweenness,
    GreedyConfig,
};
pub use refine::{
    optimized_betweenness,
    RefinementEnv,
};
