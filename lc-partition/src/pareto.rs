//! Trade-off curve between bike and car travel time.
//!
//! The sweep asks the greedy partitioner for 1, 2, 3, ... bike lanes and scores each result. Once
//! the partitioner saturates (asking for one more lane no longer yields one) the sweep stops,
//! since every further row would repeat the last one.
use std::io::Write;

use lc_core::{
    LaneError,
    LaneResult,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    instrument,
};

use crate::metrics::{
    EvaluationConfig,
    Evaluator,
};
use crate::model::{
    LaneGraph,
    LaneMask,
    OdPair,
};
use crate::partitioning::{
    ensure_strongly_connected,
    greedy_betweenness,
    CentralityWeight,
    GreedyConfig,
};

/// One point of the trade-off curve.
///
/// Field order and serialised names are the column layout of the persisted sweep table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParetoRow {
    /// Number of bike lanes requested from the partitioner.
    #[serde(rename = "bike_edges_added")]
    pub target_bike_edges: usize,
    /// Number of bike lanes actually obtained.
    #[serde(rename = "bike_edges")]
    pub actual_bike_edges: usize,
    /// Number of lanes left to cars.
    #[serde(rename = "car_edges")]
    pub actual_car_edges: usize,
    /// Mean bike travel time (minutes).
    pub bike_time: f64,
    /// Mean car travel time (minutes).
    pub car_time: f64,
}

/// Settings of a sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SweepConfig {
    /// How each row is scored.
    pub evaluation: EvaluationConfig,
    /// Lane length used by the partitioner's centrality ranking.
    pub centrality: CentralityWeight,
}

/// Lazily evaluated sweep; stop iterating to cancel.
pub struct ParetoSweep<'a> {
    graph: &'a LaneGraph,
    evaluator: Evaluator<'a>,
    greedy: GreedyConfig,
    next_target: usize,
    previous_bike_edges: Option<usize>,
    done: bool,
}

impl<'a> ParetoSweep<'a> {
    /// Prepare a sweep over `graph`.
    ///
    /// # Errors
    ///
    /// Input errors for an empty or disconnected graph or an unusable evaluation setup.
    pub fn new(graph: &'a LaneGraph, od: Option<&[OdPair]>, config: &SweepConfig) -> LaneResult<Self> {
        ensure_strongly_connected(graph, &LaneMask::full(graph.lane_count()))?;
        let evaluator = config.evaluation.evaluator(graph, od)?;
        let greedy = GreedyConfig {
            target_bike_lanes: None,
            centrality: config.centrality,
            cost: config.evaluation.cost,
        };
        Ok(Self { graph, evaluator, greedy, next_target: 1, previous_bike_edges: None, done: false })
    }

    fn row(&mut self, target: usize) -> LaneResult<Option<ParetoRow>> {
        let outcome = greedy_betweenness(self.graph, &GreedyConfig { target_bike_lanes: Some(target), ..self.greedy })?;
        let partition = outcome.partition;
        partition.check_covers(self.graph)?;

        let bike_edges = partition.bike_count();
        if target > 1 && self.previous_bike_edges == Some(bike_edges) {
            info!(target, bike_edges, "Partitioner saturated, stopping sweep early");
            return Ok(None);
        }
        self.previous_bike_edges = Some(bike_edges);

        let metrics = self.evaluator.evaluate(&partition);
        if metrics.car.unreachable > 0 {
            return Err(LaneError::CarNetworkDisconnected { stage: "pareto sweep row" });
        }
        let row = ParetoRow {
            target_bike_edges: target,
            actual_bike_edges: bike_edges,
            actual_car_edges: partition.car_count(),
            bike_time: metrics.bike.mean_time,
            car_time: metrics.car.mean_time,
        };
        debug!(?row, "Pareto row");
        Ok(Some(row))
    }
}

impl Iterator for ParetoSweep<'_> {
    type Item = LaneResult<ParetoRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next_target >= self.graph.lane_count() {
            return None;
        }
        let target = self.next_target;
        self.next_target += 1;

        match self.row(target) {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            },
            Err(e) => {
                self.done = true;
                Some(Err(e))
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        (0, Some(self.graph.lane_count().saturating_sub(self.next_target)))
    }
}

/// Run the whole sweep and collect its rows.
///
/// # Errors
///
/// Whatever the first failing row reports.
#[instrument(skip(graph, od, config), fields(lanes = graph.lane_count()))]
pub fn betweenness_pareto(graph: &LaneGraph, od: Option<&[OdPair]>, config: &SweepConfig) -> LaneResult<Vec<ParetoRow>> {
    let rows = ParetoSweep::new(graph, od, config)?.collect::<LaneResult<Vec<_>>>()?;
    info!(rows = rows.len(), "Pareto sweep finished");
    Ok(rows)
}

/// Write sweep rows as CSV with a header line.
///
/// # Errors
///
/// Fails if writing or serialising a row fails.
pub fn write_pareto_csv<W: Write>(rows: &[ParetoRow], writer: W) -> LaneResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
