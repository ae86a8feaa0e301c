use clap::ValueEnum;
use lc_core::constants::{
    CENTRALITY_TIE_TOLERANCE,
    MAX_ITERS_PER_LANE,
};
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

use super::betweenness::edge_betweenness;
use super::connectivity::{
    ensure_strongly_connected,
    is_strongly_connected,
};
use crate::metrics::{
    GradientAwareCost,
    TravelCost,
};
use crate::model::{
    LaneGraph,
    LaneId,
    LaneMask,
    Partition,
};

/// Which lane length the betweenness computation uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CentralityWeight {
    /// Every lane counts as one hop.
    #[default]
    Unit,
    /// Lanes weighted by car travel time.
    CarTime,
    /// Lanes weighted by bike travel time.
    BikeTime,
}

impl CentralityWeight {
    /// Per-lane lengths for [`edge_betweenness`], `None` for hop counts.
    fn lane_lengths<C: TravelCost>(self, graph: &LaneGraph, cost: &C) -> Option<Vec<f64>> {
        match self {
            Self::Unit => None,
            Self::CarTime => Some(graph.lanes().iter().map(|l| cost.car_time(&l.attributes)).collect()),
            Self::BikeTime => Some(graph.lanes().iter().map(|l| cost.bike_time(&l.attributes)).collect()),
        }
    }
}

/// Knobs of the greedy betweenness partitioner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GreedyConfig {
    /// How many lanes to move to the bike network; half of all lanes (rounded down) if `None`.
    pub target_bike_lanes: Option<usize>,
    /// Lane length used for the centrality ranking.
    pub centrality: CentralityWeight,
    /// Cost model behind the weighted centrality variants.
    pub cost: GradientAwareCost,
}

impl GreedyConfig {
    /// Default configuration aiming for `target` bike lanes.
    #[must_use]
    pub fn with_target(target: usize) -> Self {
        Self { target_bike_lanes: Some(target), ..Self::default() }
    }
}

/// Result of a greedy partitioning run.
#[derive(Clone, Debug)]
pub struct GreedyOutcome {
    /// The bike/car split; the car network is strongly connected.
    pub partition: Partition,
    /// Bike lanes in the order they were removed from the car network.
    pub removal_order: Vec<LaneId>,
    /// Lanes that were found to be required for connectivity, in the order they were fixed.
    pub fixed: Vec<LaneId>,
    /// Number of tentative removals performed.
    pub iterations: usize,
}

/// The un-fixed car lane with the lowest centrality; near-ties go to the lowest lane id.
fn least_central(centrality: &[f64], working: &LaneMask, fixed: &LaneMask) -> Option<LaneId> {
    let mut best: Option<(LaneId, f64)> = None;
    for lane in working.iter().filter(|&l| !fixed.contains(l)) {
        let score = centrality[lane];
        match best {
            Some((_, best_score)) if score + CENTRALITY_TIE_TOLERANCE >= best_score => {},
            _ => best = Some((lane, score)),
        }
    }
    best.map(|(lane, _)| lane)
}

/// Greedily move the least central lanes of a strongly connected lane graph to the bike network.
///
/// Every iteration ranks the remaining car lanes by edge betweenness and tentatively removes the
/// least central lane that is not yet fixed. If the car network stays strongly connected the lane
/// becomes a bike lane, otherwise it is put back and fixed for the rest of the run. The run stops
/// once the target is reached, no un-fixed lane is left, or after `10 * |lanes|` iterations.
///
/// # Errors
///
/// Input errors for an empty or not strongly connected graph; invariant errors if the result
/// fails its postconditions.
#[instrument(skip(graph, config), fields(junctions = graph.junction_count(), lanes = graph.lane_count()))]
pub fn greedy_betweenness(graph: &LaneGraph, config: &GreedyConfig) -> LaneResult<GreedyOutcome> {
    let lane_count = graph.lane_count();
    let mut working = LaneMask::full(lane_count);
    ensure_strongly_connected(graph, &working)?;

    let target = config.target_bike_lanes.unwrap_or(lane_count / 2);
    let lengths = config.centrality.lane_lengths(graph, &config.cost);
    let max_iters = MAX_ITERS_PER_LANE * lane_count;

    let mut fixed = LaneMask::empty(lane_count);
    let mut fixed_order = Vec::new();
    let mut removal_order = Vec::new();
    let mut iterations = 0;
    // Only valid while `working` is unchanged; a rejected removal leaves it as it was.
    let mut centrality: Option<Vec<f64>> = None;

    while removal_order.len() < target && iterations < max_iters {
        let scores = centrality.get_or_insert_with(|| edge_betweenness(graph, &working, lengths.as_deref()));
        let Some(lane) = least_central(scores, &working, &fixed) else {
            debug!("every remaining car lane is fixed");
            break;
        };
        let score = scores[lane];
        iterations += 1;

        working.remove(lane);
        if is_strongly_connected(graph, &working) {
            debug!(lane, score, "moved lane to bike network");
            removal_order.push(lane);
            centrality = None;
        } else {
            debug!(lane, score, "lane is required for connectivity, fixing it");
            working.insert(lane);
            fixed.insert(lane);
            fixed_order.push(lane);
            if fixed.len() == working.len() {
                debug!("every remaining car lane is fixed");
                break;
            }
        }
    }

    check_postconditions(graph, &working, &removal_order)?;
    info!(
        bike_lanes = removal_order.len(),
        car_lanes = working.len(),
        fixed = fixed_order.len(),
        iterations,
        "Greedy partitioning finished"
    );

    Ok(GreedyOutcome {
        partition: Partition::from_car_mask(working),
        removal_order,
        fixed: fixed_order,
        iterations,
    })
}

fn check_postconditions(graph: &LaneGraph, working: &LaneMask, removed: &[LaneId]) -> LaneResult<()> {
    if !is_strongly_connected(graph, working) {
        return Err(LaneError::CarNetworkDisconnected { stage: "greedy partitioning" });
    }
    if let Some(lane) = removed.iter().find(|&&l| working.contains(l)) {
        return Err(LaneError::PartitionOverlap(format!("lane {lane} is both a bike and a car lane")));
    }
    if removed.len() + working.len() != graph.lane_count() {
        return Err(LaneError::LostEdges {
            stage: "greedy partitioning",
            expected: graph.lane_count(),
            actual: removed.len() + working.len(),
        });
    }
    Ok(())
}
