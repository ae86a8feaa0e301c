//! End-to-end runs behind the `lanecut` subcommands.
//!
//! Each run validates its input, calls into the library and dumps its artefacts (tables, JSON
//! summaries and DOT renderings of both networks) into a caller-provided output directory,
//! normally one made by [`create_timestamped_output_dir`](crate::utils::create_timestamped_output_dir).

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{
    Context,
    Result,
};
use clap::ValueEnum;
use indicatif::{
    ProgressBar,
    ProgressFinish,
    ProgressStyle,
};
use itertools::Itertools;
use rand::Rng;
use serde::Serialize;
use tracing::{
    info,
    instrument,
    warn,
};

use crate::decomposition::{
    extract_oneway_subnet,
    extract_spanning_tree,
};
use crate::metrics::{
    EvaluationConfig,
    PartitionMetrics,
};
use crate::model::{
    LaneGraph,
    LaneId,
    LaneMask,
    OdPair,
    Partition,
};
use crate::orientation::{
    degree_balanced_orientation,
    random_orientation,
};
use crate::pareto::{
    write_pareto_csv,
    ParetoRow,
    ParetoSweep,
    SweepConfig,
};
use crate::partitioning::{
    greedy_betweenness,
    unreachable_pairs,
    GreedyConfig,
    GreedyOutcome,
};
use crate::refine::{
    optimized_betweenness,
    HillClimbStats,
    RefineConfig,
    RefinementOutcome,
};
use crate::utils::{
    write_dot_file,
    write_json_file,
};

/// Summary persisted as `partition.json`.
#[derive(Debug, Serialize)]
struct PartitionReport<'a> {
    bike_lanes: Vec<LaneId>,
    car_lanes: Vec<LaneId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    removal_order: Option<&'a [LaneId]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fixed: Option<&'a [LaneId]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refinement: Option<HillClimbStats>,
    metrics: PartitionMetrics,
}

/// Write `partition.json` plus DOT files of both networks.
fn write_partition(
    output_dir: &Path,
    graph: &LaneGraph,
    partition: &Partition,
    metrics: PartitionMetrics,
    greedy: Option<&GreedyOutcome>,
    refinement: Option<HillClimbStats>,
) -> Result<()> {
    let report = PartitionReport {
        bike_lanes: partition.bike_lanes(),
        car_lanes: partition.car_lanes(),
        removal_order: greedy.map(|g| g.removal_order.as_slice()),
        fixed: greedy.map(|g| g.fixed.as_slice()),
        refinement,
        metrics,
    };
    write_json_file(output_dir, "partition.json", &report)?;
    write_dot_file(output_dir, "bike_network.dot", &graph.to_digraph(partition.bike_lanes()))?;
    write_dot_file(output_dir, "car_network.dot", &graph.to_digraph(partition.car_lanes()))?;
    Ok(())
}

/// Greedy betweenness partition of `graph`, scored and written to `output_dir`.
///
/// # Errors
///
/// Fails on invalid input or if an artefact cannot be written.
#[instrument(skip_all, fields(lanes = graph.lane_count(), output_dir = %output_dir.display()))]
pub fn run_partition(
    graph: &LaneGraph,
    od: Option<&[OdPair]>,
    greedy: &GreedyConfig,
    evaluation: &EvaluationConfig,
    output_dir: &Path,
) -> Result<GreedyOutcome> {
    let outcome = greedy_betweenness(graph, greedy).context("greedy partitioning failed")?;
    let metrics = evaluation.evaluator(graph, od)?.evaluate(&outcome.partition);
    info!(
        bike_lanes = outcome.partition.bike_count(),
        fixed = %outcome.fixed.iter().join(","),
        bike_time = metrics.bike.mean_time,
        car_time = metrics.car.mean_time,
        "Partition complete"
    );

    write_partition(output_dir, graph, &outcome.partition, metrics, Some(&outcome), None)?;
    Ok(outcome)
}

/// Pareto sweep over `graph`, written to `output_dir/pareto.csv`.
///
/// # Errors
///
/// Fails on invalid input, on the first failing row, or if the table cannot be written.
#[instrument(skip_all, fields(lanes = graph.lane_count(), output_dir = %output_dir.display()))]
pub fn run_pareto(
    graph: &LaneGraph,
    od: Option<&[OdPair]>,
    config: &SweepConfig,
    output_dir: &Path,
) -> Result<Vec<ParetoRow>> {
    let sweep = ParetoSweep::new(graph, od, config).context("cannot start pareto sweep")?;

    let max_rows = graph.lane_count().saturating_sub(1);
    let pb = ProgressBar::new(max_rows as u64)
        .with_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} targets ({percent}%) {msg}")?
                .progress_chars("#>-"),
        )
        .with_finish(ProgressFinish::AndLeave);

    let mut rows = Vec::with_capacity(max_rows);
    for row in sweep {
        let row = row.context("pareto sweep row failed")?;
        pb.set_message(format!("{} bike lanes", row.actual_bike_edges));
        pb.inc(1);
        rows.push(row);
    }
    pb.finish_with_message(format!("{} rows", rows.len()));

    let file_path = output_dir.join("pareto.csv");
    let file = File::create(&file_path).with_context(|| format!("creating {}", file_path.display()))?;
    write_pareto_csv(&rows, BufWriter::new(file))?;
    info!(rows = rows.len(), path = %file_path.display(), "Pareto table written");
    Ok(rows)
}

/// Greedy partition refined by hill climbing, written to `output_dir`.
///
/// # Errors
///
/// Fails on invalid input or if an artefact cannot be written.
#[instrument(skip_all, fields(lanes = graph.lane_count(), iterations = config.iterations))]
pub fn run_refine<R>(
    graph: &LaneGraph,
    od: Option<&[OdPair]>,
    config: &RefineConfig,
    rng: &mut R,
    output_dir: &Path,
) -> Result<RefinementOutcome>
where
    R: Rng + ?Sized,
{
    let outcome = optimized_betweenness(graph, od, config, rng).context("refinement failed")?;
    let metrics = config.evaluation.evaluator(graph, od)?.evaluate(&outcome.partition);
    info!(
        bike_lanes = outcome.partition.bike_count(),
        initial_reward = outcome.stats.initial_reward,
        final_reward = outcome.stats.final_reward,
        "Refinement complete"
    );

    write_partition(output_dir, graph, &outcome.partition, metrics, None, Some(outcome.stats))?;
    Ok(outcome)
}

/// Which bike network a baseline run extracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BikeNetworkKind {
    /// Minimum spanning tree.
    SpanningTree,
    /// One lane per street.
    Oneway,
}

/// How a baseline run orients the remaining car lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationKind {
    /// Uniformly random direction per lane.
    Random,
    /// Keep in- and out-degrees balanced.
    Balanced,
}

/// Summary persisted as `baseline.json`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BaselineSummary {
    /// Bike network extraction used.
    pub bike_network: BikeNetworkKind,
    /// Orientation heuristic used.
    pub orientation: OrientationKind,
    /// Lane ids given to bikes.
    pub bike_lanes: Vec<LaneId>,
    /// Number of lanes in the oriented car network.
    pub car_lanes: usize,
    /// Ordered junction pairs that cannot reach each other by car.
    pub unreachable_pairs: usize,
    /// Whether the oriented car network is strongly connected.
    pub strongly_connected: bool,
}

/// Baseline: extract a bike network, orient the rest for cars and report how connected the car
/// network turned out. Writes `baseline.json`, `bike_network.dot`, `car_network.dot` and the
/// oriented car network as `car_network.json`.
///
/// # Errors
///
/// Fails on invariant violations or if an artefact cannot be written.
#[instrument(skip(graph, rng, output_dir), fields(lanes = graph.lane_count()))]
pub fn run_baseline<R>(
    graph: &LaneGraph,
    bike_network: BikeNetworkKind,
    orientation: OrientationKind,
    rng: &mut R,
    output_dir: &Path,
) -> Result<BaselineSummary>
where
    R: Rng + ?Sized,
{
    let baseline = match bike_network {
        BikeNetworkKind::SpanningTree => extract_spanning_tree(graph)?,
        BikeNetworkKind::Oneway => extract_oneway_subnet(graph)?,
    };
    let car_network = match orientation {
        OrientationKind::Random => random_orientation(graph, &baseline.residual, rng)?,
        OrientationKind::Balanced => degree_balanced_orientation(graph, &baseline.residual)?,
    };

    let unreachable = unreachable_pairs(&car_network, &LaneMask::full(car_network.lane_count()));
    let summary = BaselineSummary {
        bike_network,
        orientation,
        bike_lanes: baseline.bike_lanes(),
        car_lanes: car_network.lane_count(),
        unreachable_pairs: unreachable,
        strongly_connected: unreachable == 0 && car_network.lane_count() > 0,
    };
    if summary.strongly_connected {
        info!(bike_lanes = summary.bike_lanes.len(), "Baseline car network is strongly connected");
    } else {
        warn!(unreachable_pairs = unreachable, "Baseline car network is not strongly connected");
    }

    write_json_file(output_dir, "baseline.json", &summary)?;
    write_dot_file(output_dir, "bike_network.dot", &baseline.labelled_bike(graph))?;
    write_dot_file(output_dir, "car_network.dot", &car_network.to_digraph(0..car_network.lane_count()))?;
    std::fs::write(output_dir.join("car_network.json"), car_network.to_json()?)?;
    Ok(summary)
}
