use lc_core::{
    LaneError,
    LaneResult,
};
use petgraph::Direction;

use crate::model::{
    JunctionId,
    LaneGraph,
    LaneMask,
};

/// Junctions reachable from `start` using only lanes in `lanes`, following lanes forwards
/// (`Outgoing`) or backwards (`Incoming`).
fn reachable(graph: &LaneGraph, lanes: &LaneMask, start: JunctionId, direction: Direction) -> Vec<bool> {
    let mut seen = vec![false; graph.junction_count()];
    let mut stack = vec![start];
    seen[start] = true;

    while let Some(junction) = stack.pop() {
        let adjacent = match direction {
            Direction::Outgoing => graph.outgoing(junction),
            Direction::Incoming => graph.incoming(junction),
        };
        for &lane in adjacent {
            if !lanes.contains(lane) {
                continue;
            }
            let next = match direction {
                Direction::Outgoing => graph.lane(lane).target,
                Direction::Incoming => graph.lane(lane).source,
            };
            if !seen[next] {
                seen[next] = true;
                stack.push(next);
            }
        }
    }
    seen
}

/// Number of junctions that cannot reach junction 0 or cannot be reached from it over `lanes`.
///
/// A directed graph is strongly connected exactly when every junction is reachable from some
/// fixed root both forwards and backwards, so zero means strongly connected.
#[must_use]
pub fn unreachable_count(graph: &LaneGraph, lanes: &LaneMask) -> usize {
    if graph.junction_count() == 0 {
        return 0;
    }
    let forward = reachable(graph, lanes, 0, Direction::Outgoing);
    let backward = reachable(graph, lanes, 0, Direction::Incoming);
    forward.iter().zip(&backward).filter(|(&f, &b)| !(f && b)).count()
}

/// Ordered junction pairs `(s, t)` with `s != t` and no path from `s` to `t` over `lanes`.
///
/// Quadratic in the junction count; meant for reporting, not for the partitioner's inner loop.
#[must_use]
pub fn unreachable_pairs(graph: &LaneGraph, lanes: &LaneMask) -> usize {
    (0..graph.junction_count())
        .map(|source| reachable(graph, lanes, source, Direction::Outgoing).iter().filter(|&&seen| !seen).count())
        .sum()
}

/// Is the subgraph made of `lanes` (over all junctions of `graph`) strongly connected?
#[must_use]
pub fn is_strongly_connected(graph: &LaneGraph, lanes: &LaneMask) -> bool {
    unreachable_count(graph, lanes) == 0
}

/// Reject empty or not strongly connected car networks before running an algorithm on them.
///
/// # Errors
///
/// [`LaneError::EmptyGraph`] or [`LaneError::NotStronglyConnected`].
pub fn ensure_strongly_connected(graph: &LaneGraph, lanes: &LaneMask) -> LaneResult<()> {
    if graph.junction_count() == 0 || lanes.is_empty() {
        return Err(LaneError::EmptyGraph);
    }
    match unreachable_count(graph, lanes) {
        0 => Ok(()),
        unreachable => Err(LaneError::NotStronglyConnected { unreachable }),
    }
}
