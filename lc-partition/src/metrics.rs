//! Travel-time cost model and shortest-path evaluation of a partition.
//!
//! Cars may only use car lanes, in their direction of travel. Bikes may use bike lanes in both
//! directions at bike speed, and may share car lanes (in the car direction) at a penalty of
//! `shared_lane_factor` times their normal travel time. Travel times are in minutes.
use std::collections::BTreeMap;

use clap::ValueEnum;
use lc_core::constants::{
    BIKE_SPEED_LOSS_PER_GRADIENT_PCT,
    DEFAULT_BIKE_SPEED_KMH,
    DEFAULT_SHARED_LANE_FACTOR,
    MIN_BIKE_SPEED_KMH,
};
use lc_core::{
    LaneError,
    LaneResult,
};
use petgraph::algo::dijkstra;
use petgraph::graph::{
    DiGraph,
    NodeIndex,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    instrument,
    warn,
};

use crate::model::{
    JunctionId,
    LaneAttributes,
    LaneGraph,
    OdPair,
    Partition,
};

/// Maps the physical attributes of a lane to a travel time.
pub trait TravelCost {
    /// Minutes a car needs for the lane.
    fn car_time(&self, lane: &LaneAttributes) -> f64;

    /// Minutes a bike needs for the lane on a dedicated bike lane.
    fn bike_time(&self, lane: &LaneAttributes) -> f64;
}

/// Default cost model: cars drive a fraction of the speed limit, bikes slow down uphill.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientAwareCost {
    /// Bike speed on flat ground (km/h).
    pub bike_speed: f64,
    /// Lower bound on the bike speed on climbs (km/h).
    pub min_bike_speed: f64,
    /// Speed lost per percent of uphill gradient (km/h).
    pub speed_loss_per_gradient: f64,
    /// Fraction of the speed limit cars actually drive.
    pub car_speed_factor: f64,
}

impl Default for GradientAwareCost {
    fn default() -> Self {
        Self {
            bike_speed: DEFAULT_BIKE_SPEED_KMH,
            min_bike_speed: MIN_BIKE_SPEED_KMH,
            speed_loss_per_gradient: BIKE_SPEED_LOSS_PER_GRADIENT_PCT,
            car_speed_factor: 1.0,
        }
    }
}

impl GradientAwareCost {
    /// Bike speed on a lane with the given gradient; downhill does not speed bikes up.
    #[must_use]
    pub fn bike_speed_on(&self, gradient: f64) -> f64 {
        let loss = self.speed_loss_per_gradient * gradient.max(0.0);
        (self.bike_speed - loss).max(self.min_bike_speed)
    }
}

impl TravelCost for GradientAwareCost {
    fn car_time(&self, lane: &LaneAttributes) -> f64 {
        60.0 * lane.distance / (lane.speed_limit * self.car_speed_factor)
    }

    fn bike_time(&self, lane: &LaneAttributes) -> f64 {
        60.0 * lane.distance / self.bike_speed_on(lane.gradient)
    }
}

/// Which junction pairs travel times are averaged over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PathMode {
    /// Every ordered pair of distinct junctions, unweighted.
    #[default]
    AllPairs,
    /// Only the pairs of an OD matrix, weighted by trip volume.
    Od,
}

/// How partitions are scored; shared by the Pareto sweep and the refinement pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvaluationConfig {
    /// Pairs to average over.
    pub mode: PathMode,
    /// Penalty on bikes using car lanes.
    pub shared_lane_factor: f64,
    /// Lane cost model.
    pub cost: GradientAwareCost,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            mode: PathMode::AllPairs,
            shared_lane_factor: DEFAULT_SHARED_LANE_FACTOR,
            cost: GradientAwareCost::default(),
        }
    }
}

impl EvaluationConfig {
    /// Build an evaluator for `graph` with this configuration.
    ///
    /// # Errors
    ///
    /// See [`Evaluator::new`].
    pub fn evaluator<'a>(&self, graph: &'a LaneGraph, od: Option<&[OdPair]>) -> LaneResult<Evaluator<'a>> {
        Evaluator::new(graph, self.cost, self.mode, self.shared_lane_factor, od)
    }
}

/// Mean travel time for one mode of transport.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TravelTimeReport {
    /// Mean (or demand-weighted mean) travel time over reachable pairs, in minutes.
    pub mean_time: f64,
    /// Pairs evaluated, reachable or not.
    pub pairs: usize,
    /// Pairs without any path; excluded from the mean.
    pub unreachable: usize,
}

/// Travel times of both networks of a partition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PartitionMetrics {
    /// Bikes on bike lanes plus shared car lanes.
    pub bike: TravelTimeReport,
    /// Cars on car lanes.
    pub car: TravelTimeReport,
}

/// Scores partitions of one lane graph.
#[derive(Clone, Debug)]
pub struct Evaluator<'a, C: TravelCost = GradientAwareCost> {
    /// The full lane graph.
    graph: &'a LaneGraph,
    /// Lane cost model.
    cost: C,
    /// Pairs to average over.
    mode: PathMode,
    /// Penalty on bikes using car lanes.
    shared_lane_factor: f64,
    /// Demand grouped by origin: origin -> [(destination, trips)].
    demand: BTreeMap<JunctionId, Vec<(JunctionId, f64)>>,
}

impl<'a, C: TravelCost> Evaluator<'a, C> {
    /// Create an evaluator.
    ///
    /// OD pairs naming junctions outside `graph` are dropped with a warning. If every remaining
    /// pair has zero trips, all pairs count equally.
    ///
    /// # Errors
    ///
    /// [`LaneError::InvalidParameter`] for a non-positive or non-finite penalty factor or when no
    /// OD pair lies inside the graph, [`LaneError::MissingOdMatrix`] for OD mode without a matrix.
    pub fn new(
        graph: &'a LaneGraph,
        cost: C,
        mode: PathMode,
        shared_lane_factor: f64,
        od: Option<&[OdPair]>,
    ) -> LaneResult<Self> {
        if !shared_lane_factor.is_finite() || shared_lane_factor <= 0.0 {
            return Err(LaneError::InvalidParameter(format!(
                "shared lane factor must be positive, got {shared_lane_factor}"
            )));
        }

        let mut demand: BTreeMap<JunctionId, Vec<(JunctionId, f64)>> = BTreeMap::new();
        if mode == PathMode::Od {
            let od = od.ok_or(LaneError::MissingOdMatrix)?;
            for pair in od {
                let (Some(origin), Some(destination)) =
                    (graph.junction_index(pair.origin), graph.junction_index(pair.destination))
                else {
                    warn!(origin = pair.origin, destination = pair.destination, "OD pair outside the lane graph, dropping");
                    continue;
                };
                if origin != destination {
                    demand.entry(origin).or_default().push((destination, pair.trips));
                }
            }
            if demand.is_empty() {
                return Err(LaneError::InvalidParameter("no OD pair lies inside the lane graph".into()));
            }
        }

        Ok(Self { graph, cost, mode, shared_lane_factor, demand })
    }

    /// The lane graph being evaluated.
    #[must_use]
    pub const fn graph(&self) -> &'a LaneGraph {
        self.graph
    }

    /// Travel times for bikes and cars under `partition`.
    #[instrument(level = "debug", skip_all, fields(bike_lanes = partition.bike_count(), car_lanes = partition.car_count()))]
    pub fn evaluate(&self, partition: &Partition) -> PartitionMetrics {
        PartitionMetrics {
            bike: self.mean_travel_time(&self.bike_network(partition)),
            car: self.mean_travel_time(&self.car_network(partition)),
        }
    }

    /// Car network weighted by car time; node indices line up with junction ids.
    fn car_network(&self, partition: &Partition) -> DiGraph<(), f64> {
        let mut network = self.empty_network();
        for lane_id in partition.car_lanes() {
            let lane = self.graph.lane(lane_id);
            let time = self.cost.car_time(&lane.attributes);
            if time.is_finite() {
                network.add_edge(NodeIndex::new(lane.source), NodeIndex::new(lane.target), time);
            }
        }
        network
    }

    /// Bike network: bike lanes both ways, car lanes forwards at the shared-lane penalty.
    fn bike_network(&self, partition: &Partition) -> DiGraph<(), f64> {
        let mut network = self.empty_network();
        for (lane_id, lane) in self.graph.lanes().iter().enumerate() {
            let (source, target) = (NodeIndex::new(lane.source), NodeIndex::new(lane.target));
            let forward = self.cost.bike_time(&lane.attributes);
            if partition.car_mask().contains(lane_id) {
                push_finite(&mut network, source, target, forward * self.shared_lane_factor);
            } else {
                push_finite(&mut network, source, target, forward);
                push_finite(&mut network, target, source, self.cost.bike_time(&lane.attributes.reversed()));
            }
        }
        network
    }

    fn empty_network(&self) -> DiGraph<(), f64> {
        let mut network = DiGraph::with_capacity(self.graph.junction_count(), 2 * self.graph.lane_count());
        for _ in 0..self.graph.junction_count() {
            network.add_node(());
        }
        network
    }

    fn mean_travel_time(&self, network: &DiGraph<(), f64>) -> TravelTimeReport {
        let mut acc = MeanAccumulator::default();
        match self.mode {
            PathMode::AllPairs => {
                for origin in network.node_indices() {
                    let times = dijkstra(network, origin, None, |e| *e.weight());
                    for destination in network.node_indices().filter(|&d| d != origin) {
                        acc.add(times.get(&destination).copied(), 1.0);
                    }
                }
            },
            PathMode::Od => {
                for (&origin, destinations) in &self.demand {
                    let times = dijkstra(network, NodeIndex::new(origin), None, |e| *e.weight());
                    for &(destination, trips) in destinations {
                        acc.add(times.get(&NodeIndex::new(destination)).copied(), trips);
                    }
                }
            },
        }
        acc.report()
    }
}

fn push_finite(network: &mut DiGraph<(), f64>, source: NodeIndex, target: NodeIndex, time: f64) {
    if time.is_finite() {
        network.add_edge(source, target, time);
    }
}

/// Running weighted and unweighted sums of reachable travel times.
#[derive(Default)]
struct MeanAccumulator {
    pairs: usize,
    unreachable: usize,
    sum: f64,
    weighted_sum: f64,
    total_weight: f64,
}

impl MeanAccumulator {
    fn add(&mut self, time: Option<f64>, weight: f64) {
        self.pairs += 1;
        match time {
            Some(t) => {
                self.sum += t;
                self.weighted_sum += t * weight;
                self.total_weight += weight;
            },
            None => self.unreachable += 1,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn report(&self) -> TravelTimeReport {
        let reachable = self.pairs - self.unreachable;
        let mean_time = if self.total_weight > 0.0 {
            self.weighted_sum / self.total_weight
        } else if reachable > 0 {
            self.sum / reachable as f64
        } else {
            f64::INFINITY
        };
        TravelTimeReport { mean_time, pairs: self.pairs, unreachable: self.unreachable }
    }
}

/// Score `partition` of `graph` with the default cost model.
///
/// # Errors
///
/// See [`Evaluator::new`].
pub fn evaluate_partition(
    graph: &LaneGraph,
    partition: &Partition,
    config: &EvaluationConfig,
    od: Option<&[OdPair]>,
) -> LaneResult<PartitionMetrics> {
    Ok(config.evaluator(graph, od)?.evaluate(partition))
}
