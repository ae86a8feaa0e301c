//! Greedy construction of a bike/car lane partition.
//!
//! The car network has to stay strongly connected, so the partitioner only ever hands lanes to
//! the bike network that the car network can spare. Which lane to try next is decided by edge
//! betweenness centrality: lanes that few shortest paths use are the cheapest to give up, and
//! lanes whose removal would break connectivity get "fixed" as soon as a tentative removal proves
//! them necessary.
//!
//! Both the connectivity check and the centrality are recomputed on every iteration, so they are
//! written directly against the [`LaneGraph`](crate::model::LaneGraph) adjacency lists and a
//! [`LaneMask`](crate::model::LaneMask) rather than on a copied graph.

/// Brandes' edge betweenness centrality
mod betweenness;
/// Strong connectivity of lane subsets
mod connectivity;
/// The greedy partitioner itself
mod greedy;

pub use betweenness::edge_betweenness;
pub use connectivity::{
    ensure_strongly_connected,
    is_strongly_connected,
    unreachable_count,
    unreachable_pairs,
};
pub use greedy::{
    greedy_betweenness,
    CentralityWeight,
    GreedyConfig,
    GreedyOutcome,
};
