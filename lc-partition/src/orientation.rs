//! Reference heuristics that turn an undirected lane set into a directed car network.
//!
//! Neither heuristic tries to keep the result strongly connected; they exist as comparison points
//! for the greedy partitioner.
use std::collections::VecDeque;

use lc_core::{
    LaneError,
    LaneResult,
};
use petgraph::visit::EdgeRef;
use rand::Rng;
use tracing::{
    debug,
    instrument,
};

use crate::decomposition::UndirectedLanes;
use crate::model::{
    JunctionId,
    LaneAttributes,
    LaneGraph,
    LaneId,
};

/// An undirected lane with its endpoints in stored order.
#[derive(Clone, Copy, Debug)]
struct UndirectedLane {
    u: JunctionId,
    v: JunctionId,
    lane: LaneId,
}

fn undirected_lanes(undirected: &UndirectedLanes) -> Vec<UndirectedLane> {
    let mut lanes: Vec<_> = undirected
        .edge_references()
        .map(|e| UndirectedLane { u: undirected[e.source()], v: undirected[e.target()], lane: *e.weight() })
        .collect();
    lanes.sort_by_key(|l| l.lane);
    lanes
}

/// Attributes of `lane` travelled from `from`: reversed if the lane originally pointed the other
/// way.
fn oriented(graph: &LaneGraph, lane: LaneId, from: JunctionId, to: JunctionId) -> (JunctionId, JunctionId, LaneAttributes) {
    let original = graph.lane(lane);
    let attributes = if original.source == from { original.attributes } else { original.attributes.reversed() };
    (from, to, attributes)
}

fn build(graph: &LaneGraph, expected: usize, directed: Vec<(JunctionId, JunctionId, LaneAttributes)>) -> LaneResult<LaneGraph> {
    if directed.len() != expected {
        return Err(LaneError::IncompleteOrientation { expected, emitted: directed.len() });
    }
    graph.with_same_junctions(directed)
}

/// Give every undirected lane one of its two directions with equal probability.
///
/// # Errors
///
/// Invariant errors only.
#[instrument(skip_all, fields(lanes = undirected.edge_count()))]
pub fn random_orientation<R>(graph: &LaneGraph, undirected: &UndirectedLanes, rng: &mut R) -> LaneResult<LaneGraph>
where
    R: Rng + ?Sized,
{
    let lanes = undirected_lanes(undirected);
    let directed = lanes
        .iter()
        .map(|l| if rng.gen_bool(0.5) { oriented(graph, l.lane, l.u, l.v) } else { oriented(graph, l.lane, l.v, l.u) })
        .collect();
    build(graph, lanes.len(), directed)
}

/// Orient lanes so that in- and out-degrees stay roughly balanced.
///
/// Lanes are processed from a work queue seeded with the lanes at junction 0. A lane `{u, v}`
/// points `u -> v` unless `u` already has more outgoing than incoming lanes, in which case it
/// points `v -> u`. After orienting a lane, the unprocessed lanes at its head are queued. When
/// the queue runs dry before every lane is oriented (several components), the lowest-numbered
/// unprocessed lane seeds it again.
///
/// # Errors
///
/// [`LaneError::IncompleteOrientation`] if not exactly one directed lane was emitted per input
/// lane.
#[instrument(skip_all, fields(lanes = undirected.edge_count()))]
pub fn degree_balanced_orientation(graph: &LaneGraph, undirected: &UndirectedLanes) -> LaneResult<LaneGraph> {
    let lanes = undirected_lanes(undirected);
    let junctions = graph.junction_count();

    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); junctions];
    for (i, l) in lanes.iter().enumerate() {
        incident[l.u].push(i);
        incident[l.v].push(i);
    }

    let mut out_degree = vec![0usize; junctions];
    let mut in_degree = vec![0usize; junctions];
    let mut queued = vec![false; lanes.len()];
    let mut queue = VecDeque::new();
    let mut directed = Vec::with_capacity(lanes.len());

    if let Some(seed) = incident.first() {
        for &i in seed {
            if !queued[i] {
                queued[i] = true;
                queue.push_back(i);
            }
        }
    }

    while directed.len() < lanes.len() {
        let Some(i) = queue.pop_front() else {
            let Some(next) = queued.iter().position(|&q| !q) else { break };
            debug!(lane = lanes[next].lane, "work queue empty, reseeding");
            queued[next] = true;
            queue.push_back(next);
            continue;
        };

        let UndirectedLane { u, v, lane } = lanes[i];
        let (tail, head) = if out_degree[u] > in_degree[u] { (v, u) } else { (u, v) };
        out_degree[tail] += 1;
        in_degree[head] += 1;
        directed.push(oriented(graph, lane, tail, head));

        for &j in &incident[head] {
            if !queued[j] {
                queued[j] = true;
                queue.push_back(j);
            }
        }
    }

    build(graph, lanes.len(), directed)
}
