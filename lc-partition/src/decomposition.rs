//! Undirected views of a lane graph and the two simple bike-network baselines built on them.
use std::collections::HashSet;

use lc_core::{
    LaneError,
    LaneResult,
};
use petgraph::graph::{
    NodeIndex,
    UnGraph,
};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use tracing::{
    info,
    instrument,
};

use crate::model::{
    JunctionId,
    LaneGraph,
    LaneId,
};

/// Undirected lane multigraph; node weights are junction ids, edge weights the original lane ids.
pub type UndirectedLanes = UnGraph<JunctionId, LaneId>;

/// Undirected multigraph over all junctions of `graph` made of the given lanes, one undirected
/// edge per lane (parallel and reciprocal lanes are kept).
pub fn undirected_subgraph<I>(graph: &LaneGraph, lanes: I) -> UndirectedLanes
where
    I: IntoIterator<Item = LaneId>,
{
    let mut undirected = UnGraph::with_capacity(graph.junction_count(), graph.lane_count());
    for junction in 0..graph.junction_count() {
        undirected.add_node(junction);
    }
    for lane_id in lanes {
        let lane = graph.lane(lane_id);
        undirected.add_edge(NodeIndex::new(lane.source), NodeIndex::new(lane.target), lane_id);
    }
    undirected
}

/// Undirected copy of the whole lane graph that loses no lane.
///
/// # Errors
///
/// [`LaneError::LostEdges`] if the edge count does not match the lane count.
pub fn lossless_to_undirected(graph: &LaneGraph) -> LaneResult<UndirectedLanes> {
    let undirected = undirected_subgraph(graph, 0..graph.lane_count());
    if undirected.edge_count() != graph.lane_count() {
        return Err(LaneError::LostEdges {
            stage: "undirected conversion",
            expected: graph.lane_count(),
            actual: undirected.edge_count(),
        });
    }
    Ok(undirected)
}

/// A candidate bike network and what is left of the lane graph for cars.
#[derive(Clone, Debug)]
pub struct BikeBaseline {
    /// Lanes given to bikes.
    pub bike: UndirectedLanes,
    /// Remaining lanes, still undirected; see [`crate::orientation`] to orient them.
    pub residual: UndirectedLanes,
}

impl BikeBaseline {
    /// Original ids of the bike lanes, sorted.
    #[must_use]
    pub fn bike_lanes(&self) -> Vec<LaneId> {
        sorted_lane_ids(&self.bike)
    }

    /// Original ids of the residual lanes, sorted.
    #[must_use]
    pub fn residual_lanes(&self) -> Vec<LaneId> {
        sorted_lane_ids(&self.residual)
    }

    /// The bike network with nodes relabelled to the external junction ids of `graph`.
    #[must_use]
    pub fn labelled_bike(&self, graph: &LaneGraph) -> UnGraph<u64, LaneId> {
        self.bike.map(|_, &junction| graph.junction(junction).id, |_, &lane| lane)
    }
}

fn sorted_lane_ids(graph: &UndirectedLanes) -> Vec<LaneId> {
    let mut lanes: Vec<_> = graph.edge_weights().copied().collect();
    lanes.sort_unstable();
    lanes
}

/// Split the undirected lanes into `chosen` and the rest, checking nothing got lost.
fn split(graph: &LaneGraph, undirected: &UndirectedLanes, chosen: &HashSet<LaneId>, stage: &'static str) -> LaneResult<BikeBaseline> {
    let lanes: Vec<LaneId> = undirected.edge_weights().copied().collect();
    let bike = undirected_subgraph(graph, lanes.iter().copied().filter(|l| chosen.contains(l)));
    let residual = undirected_subgraph(graph, lanes.iter().copied().filter(|l| !chosen.contains(l)));

    let actual = bike.edge_count() + residual.edge_count();
    if actual != graph.lane_count() {
        return Err(LaneError::LostEdges { stage, expected: graph.lane_count(), actual });
    }
    Ok(BikeBaseline { bike, residual })
}

/// Minimum spanning tree (Kruskal, by lane `weight`, default 1, ties by lane id) as the bike
/// network; everything else stays with cars.
///
/// # Errors
///
/// [`LaneError::LostEdges`] if a conversion loses lanes.
#[instrument(skip(graph), fields(lanes = graph.lane_count()))]
pub fn extract_spanning_tree(graph: &LaneGraph) -> LaneResult<BikeBaseline> {
    let undirected = lossless_to_undirected(graph)?;

    let mut candidates: Vec<(f64, LaneId, usize, usize)> = undirected
        .edge_references()
        .map(|e| {
            let lane = *e.weight();
            let weight = graph.lane(lane).attributes.weight.unwrap_or(1.0);
            (weight, lane, e.source().index(), e.target().index())
        })
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut components = UnionFind::<usize>::new(undirected.node_count());
    let tree: HashSet<LaneId> = candidates
        .into_iter()
        .filter(|&(_, _, u, v)| components.union(u, v))
        .map(|(_, lane, _, _)| lane)
        .collect();

    let baseline = split(graph, &undirected, &tree, "spanning tree extraction")?;
    info!(tree_lanes = baseline.bike.edge_count(), residual_lanes = baseline.residual.edge_count(), "Extracted spanning tree");
    Ok(baseline)
}

/// One lane per street as the bike network: the simple graph underlying the lane multigraph,
/// keeping the lowest lane id per junction pair. Parallel and reciprocal lanes stay with cars.
///
/// # Errors
///
/// [`LaneError::LostEdges`] if a conversion loses lanes.
#[instrument(skip(graph), fields(lanes = graph.lane_count()))]
pub fn extract_oneway_subnet(graph: &LaneGraph) -> LaneResult<BikeBaseline> {
    let undirected = lossless_to_undirected(graph)?;

    let mut streets = HashSet::new();
    let mut chosen = HashSet::new();
    for lane in 0..graph.lane_count() {
        let l = graph.lane(lane);
        if streets.insert((l.source.min(l.target), l.source.max(l.target))) {
            chosen.insert(lane);
        }
    }

    let baseline = split(graph, &undirected, &chosen, "one-way subnet extraction")?;
    info!(bike_lanes = baseline.bike.edge_count(), residual_lanes = baseline.residual.edge_count(), "Extracted one-way subnet");
    Ok(baseline)
}
