use assertables::*;
use lc_core::LaneError;
use rstest::*;
use tracing_test::traced_test;

use crate::model::{
    LaneGraph,
    LaneMode,
};
use crate::partitioning::*;
use crate::testutils::*;

#[rstest]
#[traced_test]
fn test_ring_gives_up_one_chord(ring_with_chords: LaneGraph) {
    let outcome = greedy_betweenness(&ring_with_chords, &GreedyConfig::with_target(1)).unwrap();

    assert_eq!(outcome.partition.bike_lanes(), vec![4]);
    assert_eq!(outcome.removal_order, vec![4]);
    assert_eq!(outcome.fixed, vec![0, 1, 2, 3]);
    assert_eq!(outcome.iterations, 5);
    assert!(logs_contain("lane is required for connectivity"));
    assert!(logs_contain("moved lane to bike network"));
}

#[rstest]
fn test_ring_gives_up_both_chords(ring_with_chords: LaneGraph) {
    let outcome = greedy_betweenness(&ring_with_chords, &GreedyConfig::with_target(2)).unwrap();

    assert_eq!(outcome.partition.bike_lanes(), vec![4, 5]);
    assert_eq!(outcome.partition.car_lanes(), vec![0, 1, 2, 3]);
    assert_eq!(outcome.fixed, vec![0, 1, 2, 3]);
    assert_eq!(outcome.iterations, 6);
}

#[rstest]
fn test_default_target_is_half_the_lanes(grid: LaneGraph) {
    let outcome = greedy_betweenness(&grid, &GreedyConfig::default()).unwrap();
    assert_le!(outcome.partition.bike_count(), grid.lane_count() / 2);
    assert_eq!(outcome.partition.bike_count(), outcome.removal_order.len());
}

#[rstest]
fn test_zero_target_removes_nothing(ring_with_chords: LaneGraph) {
    let outcome = greedy_betweenness(&ring_with_chords, &GreedyConfig::with_target(0)).unwrap();

    assert_eq!(outcome.partition.bike_count(), 0);
    assert_eq!(outcome.iterations, 0);
    assert!(outcome.fixed.is_empty());
}

#[rstest]
#[case(3)]
#[case(4)]
#[case(5)]
fn test_one_way_cycle_cannot_spare_a_lane(#[case] n: usize) {
    let graph = one_way_cycle(n);
    let outcome = greedy_betweenness(&graph, &GreedyConfig::with_target(n)).unwrap();

    assert_eq!(outcome.partition.bike_count(), 0);
    assert_eq!(outcome.fixed.len(), n);
    assert_eq!(outcome.iterations, n);
}

#[rstest]
#[case::unit(CentralityWeight::Unit)]
#[case::car_time(CentralityWeight::CarTime)]
#[case::bike_time(CentralityWeight::BikeTime)]
fn test_result_is_a_connected_split(grid: LaneGraph, #[case] centrality: CentralityWeight) {
    let config = GreedyConfig { target_bike_lanes: Some(grid.lane_count()), centrality, ..GreedyConfig::default() };
    let outcome = greedy_betweenness(&grid, &config).unwrap();
    let partition = &outcome.partition;

    partition.check_covers(&grid).unwrap();
    assert_eq!(partition.bike_count() + partition.car_count(), grid.lane_count());
    assert_gt!(partition.bike_count(), 0);
    assert!(is_strongly_connected(&grid, partition.car_mask()));

    // Fixed lanes are never given away.
    for &lane in &outcome.fixed {
        assert_eq!(partition.mode(lane), LaneMode::Car);
    }
    // Lanes are only ever removed once.
    let mut removed = outcome.removal_order.clone();
    removed.sort_unstable();
    removed.dedup();
    assert_eq!(removed, partition.bike_lanes());
}

#[rstest]
fn test_saturated_target_is_idempotent(grid: LaneGraph) {
    let saturated = greedy_betweenness(&grid, &GreedyConfig::with_target(grid.lane_count())).unwrap();
    let achieved = saturated.partition.bike_count();
    assert_lt!(achieved, grid.lane_count());

    for target in [achieved, achieved + 1, achieved + 5] {
        let outcome = greedy_betweenness(&grid, &GreedyConfig::with_target(target)).unwrap();
        assert_eq!(outcome.partition, saturated.partition);
    }
}

#[rstest]
fn test_iteration_cap_is_respected(grid: LaneGraph) {
    let outcome = greedy_betweenness(&grid, &GreedyConfig::with_target(grid.lane_count())).unwrap();
    assert_le!(outcome.iterations, 10 * grid.lane_count());
    assert_eq!(outcome.iterations, outcome.removal_order.len() + outcome.fixed.len());
}

#[rstest]
fn test_disconnected_graph_is_rejected(two_islands: LaneGraph) {
    let err = greedy_betweenness(&two_islands, &GreedyConfig::default()).unwrap_err();
    assert!(matches!(err, LaneError::NotStronglyConnected { .. }));
}

#[rstest]
fn test_empty_graph_is_rejected() {
    let err = greedy_betweenness(&LaneGraph::new(), &GreedyConfig::default()).unwrap_err();
    assert!(matches!(err, LaneError::EmptyGraph));
}
