//! Small lane graphs with known answers, shared by the unit tests and downstream crates.
#![allow(missing_docs)]

use rstest::fixture;

use crate::model::{
    LaneAttributes,
    LaneGraph,
    Location,
    OdPair,
};

/// External id of the junction with dense index 0 in every fixture graph.
pub const FIRST_JUNCTION_ID: u64 = 100;

fn with_junctions(count: usize) -> LaneGraph {
    let mut graph = LaneGraph::new();
    for i in 0..count {
        #[allow(clippy::cast_precision_loss)]
        graph.add_junction(FIRST_JUNCTION_ID + i as u64, Location { x: i as f64, y: 0.0, z: None });
    }
    graph
}

/// Build a graph with `junctions` junctions and the given lanes, 1 km long at 30 km/h.
#[must_use]
pub fn lane_graph(junctions: usize, lanes: &[(usize, usize)]) -> LaneGraph {
    let mut graph = with_junctions(junctions);
    for &(source, target) in lanes {
        graph
            .add_lane(source, target, LaneAttributes::with_distance(1.0))
            .expect("fixture lanes are valid");
    }
    graph
}

/// Directed 4-cycle `0 -> 1 -> 2 -> 3 -> 0` (lanes 0 to 3) plus the chord pair `0 -> 2`
/// (lane 4) and `2 -> 0` (lane 5).
///
/// Every lane has betweenness 0.25. The cycle lanes are all required for strong connectivity,
/// the chords are not.
#[fixture]
pub fn ring_with_chords() -> LaneGraph {
    lane_graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0), (0, 2), (2, 0)])
}

/// Two routes `0 -> 1 -> 3` and `0 -> 2 -> 3` closed by the return lane `3 -> 0` (lane 4).
#[fixture]
pub fn diamond() -> LaneGraph {
    lane_graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 0)])
}

/// Directed cycle over `n` junctions; no lane can be spared.
#[must_use]
pub fn one_way_cycle(n: usize) -> LaneGraph {
    let lanes: Vec<_> = (0..n).map(|i| (i, (i + 1) % n)).collect();
    lane_graph(n, &lanes)
}

/// Two separate two-way streets, `0 <-> 1` and `2 <-> 3`.
#[fixture]
pub fn two_islands() -> LaneGraph {
    lane_graph(4, &[(0, 1), (1, 0), (2, 3), (3, 2)])
}

/// `rows x cols` grid of two-way streets, 200 m between neighbours, junction `r * cols + c`.
///
/// Each street contributes two consecutive lanes, the first one pointing east or south. The grid
/// climbs eastwards: eastbound lanes rise 2 %, westbound lanes fall 2 %.
#[must_use]
pub fn two_way_grid(rows: usize, cols: usize) -> LaneGraph {
    let mut graph = with_junctions(rows * cols);
    let street = LaneAttributes { distance: 0.2, ..LaneAttributes::default() };
    for r in 0..rows {
        for c in 0..cols {
            let here = r * cols + c;
            if c + 1 < cols {
                let east = LaneAttributes { gradient: 2.0, ..street };
                graph.add_lane(here, here + 1, east).expect("fixture lanes are valid");
                graph.add_lane(here + 1, here, east.reversed()).expect("fixture lanes are valid");
            }
            if r + 1 < rows {
                graph.add_lane(here, here + cols, street).expect("fixture lanes are valid");
                graph.add_lane(here + cols, here, street).expect("fixture lanes are valid");
            }
        }
    }
    graph
}

#[fixture]
pub fn grid() -> LaneGraph {
    two_way_grid(2, 3)
}

/// OD pairs from `(origin, destination, trips)` given as dense junction indices.
#[must_use]
pub fn od_pairs(pairs: &[(usize, usize, f64)]) -> Vec<OdPair> {
    pairs
        .iter()
        .map(|&(origin, destination, trips)| OdPair {
            origin: FIRST_JUNCTION_ID + origin as u64,
            destination: FIRST_JUNCTION_ID + destination as u64,
            trips,
        })
        .collect()
}

/// A three-junction lane graph in the on-disk JSON format.
pub const TRIANGLE_JSON: &str = r#"{
    "junctions": [
        {"id": 7, "location": {"x": 0.0, "y": 0.0, "z": 12.5}},
        {"id": 8, "location": {"x": 1.0, "y": 0.0}},
        {"id": 9}
    ],
    "lanes": [
        {"source": 7, "target": 8, "distance": 0.5, "gradient": 1.5, "speed_limit": 50.0},
        {"source": 8, "target": 9, "distance": 0.7},
        {"source": 9, "target": 7, "distance": 0.4, "capacity": 2.0, "weight": 3.0}
    ]
}"#;
