use assertables::*;
use lc_core::LaneError;
use rstest::*;
use tracing_test::traced_test;

use crate::metrics::{
    EvaluationConfig,
    PathMode,
};
use crate::model::LaneGraph;
use crate::pareto::*;
use crate::testutils::*;

#[rstest]
#[traced_test]
fn test_ring_sweep_stops_at_saturation(ring_with_chords: LaneGraph) {
    let rows = betweenness_pareto(&ring_with_chords, None, &SweepConfig::default()).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].target_bike_edges, 1);
    assert_eq!(rows[0].actual_bike_edges, 1);
    assert_eq!(rows[1].actual_bike_edges, 2);
    assert_eq!(rows[1].actual_car_edges, 4);
    assert!(logs_contain("Partitioner saturated"));
}

#[rstest]
fn test_sweep_rows_are_consistent(grid: LaneGraph) {
    let rows = betweenness_pareto(&grid, None, &SweepConfig::default()).unwrap();
    assert_gt!(rows.len(), 1);

    let mut previous = 0;
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.target_bike_edges, i + 1);
        assert_eq!(row.actual_bike_edges + row.actual_car_edges, grid.lane_count());
        assert_le!(row.actual_bike_edges, row.target_bike_edges);
        assert_ge!(row.actual_bike_edges, previous);
        assert!(row.car_time.is_finite());
        assert!(row.bike_time.is_finite());
        previous = row.actual_bike_edges;
    }
}

#[rstest]
fn test_fewer_car_lanes_never_speed_cars_up(grid: LaneGraph) {
    let rows = betweenness_pareto(&grid, None, &SweepConfig::default()).unwrap();
    for pair in rows.windows(2) {
        assert_ge!(pair[1].car_time + 1e-9, pair[0].car_time);
    }
}

#[rstest]
fn test_sweep_is_lazy(grid: LaneGraph) {
    let mut sweep = ParetoSweep::new(&grid, None, &SweepConfig::default()).unwrap();
    assert_eq!(sweep.size_hint(), (0, Some(grid.lane_count() - 1)));

    let first = sweep.next().unwrap().unwrap();
    assert_eq!(first.target_bike_edges, 1);
    assert_eq!(sweep.size_hint(), (0, Some(grid.lane_count() - 2)));
}

#[rstest]
fn test_one_way_cycle_yields_nothing_useful() {
    let graph = one_way_cycle(4);
    let rows = betweenness_pareto(&graph, None, &SweepConfig::default()).unwrap();

    // Target 1 cannot be met; target 2 repeats it and ends the sweep.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].actual_bike_edges, 0);
}

#[rstest]
fn test_od_sweep(ring_with_chords: LaneGraph) {
    let od = od_pairs(&[(1, 0, 1.0), (3, 2, 1.0)]);
    let config = SweepConfig {
        evaluation: EvaluationConfig { mode: PathMode::Od, ..EvaluationConfig::default() },
        ..SweepConfig::default()
    };
    let rows = betweenness_pareto(&ring_with_chords, Some(&od), &config).unwrap();

    // Without the chords 1 -> 0 and 3 -> 2 both take three hops of 2 minutes.
    assert_in_delta!(rows[1].car_time, 6.0, 1e-9);
}

#[rstest]
fn test_disconnected_graph_is_rejected(two_islands: LaneGraph) {
    let err = ParetoSweep::new(&two_islands, None, &SweepConfig::default()).err().unwrap();
    assert!(matches!(err, LaneError::NotStronglyConnected { .. }));
}

#[rstest]
fn test_csv_columns(ring_with_chords: LaneGraph) {
    let rows = betweenness_pareto(&ring_with_chords, None, &SweepConfig::default()).unwrap();
    let mut out = Vec::new();
    write_pareto_csv(&rows, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("bike_edges_added,bike_edges,car_edges,bike_time,car_time"));
    assert_starts_with!(lines.next().unwrap(), "1,1,5,");
    assert_starts_with!(lines.next().unwrap(), "2,2,4,");
    assert_eq!(lines.next(), None);
}
