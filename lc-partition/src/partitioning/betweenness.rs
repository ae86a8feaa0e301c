use std::cmp::Reverse;
use std::collections::{
    BinaryHeap,
    VecDeque,
};

use ordered_float::OrderedFloat;

use crate::model::{
    JunctionId,
    LaneGraph,
    LaneId,
    LaneMask,
};

/// Shortest-path DAG from a single source, as needed for the Brandes dependency accumulation.
struct ShortestPathDag {
    /// Junctions in order of non-decreasing distance from the source.
    order: Vec<JunctionId>,
    /// For each junction, the lanes entering it on some shortest path.
    predecessors: Vec<Vec<LaneId>>,
    /// Number of shortest paths from the source to each junction.
    sigma: Vec<f64>,
}

impl ShortestPathDag {
    fn new(junctions: usize, source: JunctionId) -> Self {
        let mut sigma = vec![0.0; junctions];
        sigma[source] = 1.0;
        Self {
            order: Vec::with_capacity(junctions),
            predecessors: vec![Vec::new(); junctions],
            sigma,
        }
    }
}

/// Breadth-first search counting shortest paths, every lane has length one.
fn unit_dag(graph: &LaneGraph, lanes: &LaneMask, source: JunctionId) -> ShortestPathDag {
    let mut dag = ShortestPathDag::new(graph.junction_count(), source);
    let mut hops: Vec<Option<usize>> = vec![None; graph.junction_count()];
    hops[source] = Some(0);

    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        dag.order.push(v);
        let next_hop = hops[v].map_or(0, |h| h + 1);
        for &lane in graph.outgoing(v) {
            if !lanes.contains(lane) {
                continue;
            }
            let w = graph.lane(lane).target;
            if hops[w].is_none() {
                hops[w] = Some(next_hop);
                queue.push_back(w);
            }
            if hops[w] == Some(next_hop) {
                dag.sigma[w] += dag.sigma[v];
                dag.predecessors[w].push(lane);
            }
        }
    }
    dag
}

/// Dijkstra counting shortest paths, lane lengths from `lengths` (must be positive).
fn weighted_dag(graph: &LaneGraph, lanes: &LaneMask, lengths: &[f64], source: JunctionId) -> ShortestPathDag {
    let mut dag = ShortestPathDag::new(graph.junction_count(), source);
    let mut dist: Vec<Option<f64>> = vec![None; graph.junction_count()];
    let mut settled = vec![false; graph.junction_count()];
    dist[source] = Some(0.0);

    let mut heap = BinaryHeap::from([Reverse((OrderedFloat(0.0), source))]);
    while let Some(Reverse((OrderedFloat(d), v))) = heap.pop() {
        if settled[v] {
            continue;
        }
        settled[v] = true;
        dag.order.push(v);

        for &lane in graph.outgoing(v) {
            if !lanes.contains(lane) || !lengths[lane].is_finite() {
                continue;
            }
            let w = graph.lane(lane).target;
            if settled[w] {
                continue;
            }
            let candidate = d + lengths[lane];
            match dist[w] {
                Some(current) if candidate > current => {},
                #[allow(clippy::float_cmp)] // path counting needs exact ties, as in Brandes' paper
                Some(current) if candidate == current => {
                    dag.sigma[w] += dag.sigma[v];
                    dag.predecessors[w].push(lane);
                },
                _ => {
                    dist[w] = Some(candidate);
                    dag.sigma[w] = dag.sigma[v];
                    dag.predecessors[w].clear();
                    dag.predecessors[w].push(lane);
                    heap.push(Reverse((OrderedFloat(candidate), w)));
                },
            }
        }
    }
    dag
}

/// Edge betweenness centrality of every lane in `lanes`, computed with Brandes' algorithm.
///
/// The score of a lane is the fraction of shortest paths over all ordered junction pairs that
/// run through it, normalised by `n * (n - 1)`. Parallel lanes share the paths between them.
/// With `lengths == None` every lane has length one, otherwise `lengths[lane]` is used and
/// lanes with a non-finite length are treated as absent.
///
/// The returned vector is indexed by [`LaneId`]; lanes outside `lanes` score zero.
#[must_use]
pub fn edge_betweenness(graph: &LaneGraph, lanes: &LaneMask, lengths: Option<&[f64]>) -> Vec<f64> {
    let n = graph.junction_count();
    let mut centrality = vec![0.0; graph.lane_count()];
    let mut delta = vec![0.0; n];

    for source in 0..n {
        let mut dag = match lengths {
            None => unit_dag(graph, lanes, source),
            Some(lengths) => weighted_dag(graph, lanes, lengths, source),
        };

        delta.iter_mut().for_each(|d| *d = 0.0);
        while let Some(w) = dag.order.pop() {
            for &lane in &dag.predecessors[w] {
                let v = graph.lane(lane).source;
                let share = dag.sigma[v] / dag.sigma[w] * (1.0 + delta[w]);
                centrality[lane] += share;
                delta[v] += share;
            }
        }
    }

    if n > 1 {
        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / (n * (n - 1)) as f64;
        centrality.iter_mut().for_each(|c| *c *= scale);
    }
    centrality
}
