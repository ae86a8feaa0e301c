use assertables::*;
use lc_core::LaneError;
use rstest::*;
use tracing_test::traced_test;

use crate::metrics::*;
use crate::model::{
    LaneAttributes,
    LaneGraph,
    LaneMask,
    Partition,
};
use crate::testutils::*;

const EPS: f64 = 1e-9;

/// Minutes a bike needs for 1 km on the flat at the default speed.
const BIKE_KM: f64 = 60.0 / 18.0;

fn chords_to_bikes() -> Partition {
    Partition::from_car_mask(LaneMask::from_lanes(6, [0, 1, 2, 3]))
}

#[rstest]
#[case::flat(0.0, 18.0)]
#[case::downhill(-3.0, 18.0)]
#[case::climb(5.0, 10.8)]
#[case::wall(20.0, 4.0)]
fn test_bike_speed_on_gradient(#[case] gradient: f64, #[case] expected: f64) {
    assert_in_delta!(GradientAwareCost::default().bike_speed_on(gradient), expected, EPS);
}

#[rstest]
#[case(1.0, 2.0)]
#[case(0.5, 4.0)]
fn test_car_time(#[case] car_speed_factor: f64, #[case] expected: f64) {
    let cost = GradientAwareCost { car_speed_factor, ..GradientAwareCost::default() };
    assert_in_delta!(cost.car_time(&LaneAttributes::with_distance(1.0)), expected, EPS);
}

#[rstest]
fn test_bike_time_depends_on_direction() {
    let cost = GradientAwareCost::default();
    let uphill = LaneAttributes { gradient: 5.0, ..LaneAttributes::with_distance(0.9) };

    assert_in_delta!(cost.bike_time(&uphill), 5.0, EPS);
    assert_in_delta!(cost.bike_time(&uphill.reversed()), 3.0, EPS);
}

#[rstest]
fn test_all_car_network(ring_with_chords: LaneGraph) {
    let metrics =
        evaluate_partition(&ring_with_chords, &Partition::all_car(6), &EvaluationConfig::default(), None).unwrap();

    // 18 hops over 12 ordered pairs at 2 minutes per hop.
    assert_eq!(metrics.car.pairs, 12);
    assert_eq!(metrics.car.unreachable, 0);
    assert_in_delta!(metrics.car.mean_time, 3.0, EPS);
    // Bikes follow the same routes at twice their own travel time.
    assert_in_delta!(metrics.bike.mean_time, 1.5 * 2.0 * BIKE_KM, EPS);
}

#[rstest]
fn test_bike_lanes_work_both_ways(ring_with_chords: LaneGraph) {
    let metrics = evaluate_partition(&ring_with_chords, &chords_to_bikes(), &EvaluationConfig::default(), None).unwrap();

    assert_in_delta!(metrics.car.mean_time, 4.0, EPS);
    assert_in_delta!(metrics.bike.mean_time, 2.5 * BIKE_KM, EPS);
    assert_eq!(metrics.bike.unreachable, 0);
}

#[rstest]
fn test_shared_lane_factor(ring_with_chords: LaneGraph) {
    let config = EvaluationConfig { shared_lane_factor: 1.0, ..EvaluationConfig::default() };
    let metrics = evaluate_partition(&ring_with_chords, &Partition::all_car(6), &config, None).unwrap();
    assert_in_delta!(metrics.bike.mean_time, 1.5 * BIKE_KM, EPS);
}

#[rstest]
#[case::zero(0.0)]
#[case::negative(-1.0)]
#[case::nan(f64::NAN)]
fn test_bad_shared_lane_factor_is_rejected(ring_with_chords: LaneGraph, #[case] shared_lane_factor: f64) {
    let config = EvaluationConfig { shared_lane_factor, ..EvaluationConfig::default() };
    let err = config.evaluator(&ring_with_chords, None).unwrap_err();
    assert!(matches!(err, LaneError::InvalidParameter(_)));
}

#[rstest]
fn test_unreachable_pairs_are_excluded(two_islands: LaneGraph) {
    let metrics = evaluate_partition(&two_islands, &Partition::all_car(4), &EvaluationConfig::default(), None).unwrap();

    assert_eq!(metrics.car.pairs, 12);
    assert_eq!(metrics.car.unreachable, 8);
    assert_in_delta!(metrics.car.mean_time, 2.0, EPS);
}

#[rstest]
fn test_od_mode_weights_by_trips(ring_with_chords: LaneGraph) {
    let od = od_pairs(&[(0, 1, 2.0), (1, 0, 1.0)]);
    let config = EvaluationConfig { mode: PathMode::Od, ..EvaluationConfig::default() };
    let metrics = evaluate_partition(&ring_with_chords, &Partition::all_car(6), &config, Some(&od)).unwrap();

    // 0 -> 1 takes one hop, 1 -> 0 two.
    assert_eq!(metrics.car.pairs, 2);
    assert_in_delta!(metrics.car.mean_time, (2.0 * 2.0 + 4.0) / 3.0, EPS);
}

#[rstest]
fn test_od_mode_without_trips_is_unweighted(ring_with_chords: LaneGraph) {
    let od = od_pairs(&[(0, 1, 0.0), (1, 0, 0.0)]);
    let config = EvaluationConfig { mode: PathMode::Od, ..EvaluationConfig::default() };
    let metrics = evaluate_partition(&ring_with_chords, &Partition::all_car(6), &config, Some(&od)).unwrap();
    assert_in_delta!(metrics.car.mean_time, 3.0, EPS);
}

#[rstest]
fn test_od_mode_requires_a_matrix(ring_with_chords: LaneGraph) {
    let config = EvaluationConfig { mode: PathMode::Od, ..EvaluationConfig::default() };
    let err = config.evaluator(&ring_with_chords, None).unwrap_err();
    assert!(matches!(err, LaneError::MissingOdMatrix));
}

#[rstest]
#[traced_test]
fn test_od_pairs_outside_the_graph_are_dropped(ring_with_chords: LaneGraph) {
    let mut od = od_pairs(&[(0, 2, 1.0)]);
    od.extend(od_pairs(&[(0, 40, 5.0)]));
    let config = EvaluationConfig { mode: PathMode::Od, ..EvaluationConfig::default() };
    let metrics = evaluate_partition(&ring_with_chords, &Partition::all_car(6), &config, Some(&od)).unwrap();

    assert_eq!(metrics.car.pairs, 1);
    assert_in_delta!(metrics.car.mean_time, 2.0, EPS);
    assert!(logs_contain("OD pair outside the lane graph"));
}

#[rstest]
fn test_od_matrix_entirely_outside_the_graph(ring_with_chords: LaneGraph) {
    let od = od_pairs(&[(10, 11, 1.0)]);
    let config = EvaluationConfig { mode: PathMode::Od, ..EvaluationConfig::default() };
    let err = config.evaluator(&ring_with_chords, Some(&od)).unwrap_err();
    assert!(matches!(err, LaneError::InvalidParameter(_)));
}

#[rstest]
fn test_all_pairs_mode_ignores_the_matrix(ring_with_chords: LaneGraph) {
    let od = od_pairs(&[(0, 1, 100.0)]);
    let with_od =
        evaluate_partition(&ring_with_chords, &chords_to_bikes(), &EvaluationConfig::default(), Some(&od)).unwrap();
    let without = evaluate_partition(&ring_with_chords, &chords_to_bikes(), &EvaluationConfig::default(), None).unwrap();
    assert_eq!(with_od, without);
}

#[rstest]
fn test_climbs_slow_bikes_down(grid: LaneGraph) {
    let metrics = evaluate_partition(&grid, &Partition::all_car(grid.lane_count()), &EvaluationConfig::default(), None)
        .unwrap();
    let flat = grid
        .with_same_junctions(
            grid.lanes().iter().map(|l| (l.source, l.target, LaneAttributes { gradient: 0.0, ..l.attributes })),
        )
        .unwrap();
    let flat_metrics =
        evaluate_partition(&flat, &Partition::all_car(flat.lane_count()), &EvaluationConfig::default(), None).unwrap();

    assert_gt!(metrics.bike.mean_time, flat_metrics.bike.mean_time);
    assert_in_delta!(metrics.car.mean_time, flat_metrics.car.mean_time, EPS);
}
