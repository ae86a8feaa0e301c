use assertables::*;
use lc_core::LaneError;
use rstest::*;

use crate::model::*;
use crate::testutils::*;

#[rstest]
fn test_load_lane_graph_json() {
    let graph = LaneGraph::from_json_reader(TRIANGLE_JSON.as_bytes()).unwrap();

    assert_eq!(graph.junction_count(), 3);
    assert_eq!(graph.lane_count(), 3);
    assert_eq!(graph.junction_index(8), Some(1));
    assert_eq!(graph.junction(0).location.z, Some(12.5));
    assert_eq!(graph.junction(2).location, Location::default());

    let first = graph.lane(0);
    assert_eq!((first.source, first.target), (0, 1));
    assert_eq!(first.attributes.speed_limit, 50.0);
    assert_eq!(first.attributes.gradient, 1.5);

    let defaults = graph.lane(1).attributes;
    assert_eq!(defaults.speed_limit, 30.0);
    assert_eq!(defaults.capacity, 1.0);
    assert_eq!(defaults.weight, None);
    assert_eq!(graph.lane(2).attributes.weight, Some(3.0));

    assert_eq!(graph.outgoing(1), &[1]);
    assert_eq!(graph.incoming(0), &[2]);
}

#[rstest]
fn test_lane_graph_json_survives_reload() {
    let graph = LaneGraph::from_json_reader(TRIANGLE_JSON.as_bytes()).unwrap();
    let reloaded = LaneGraph::from_json_reader(graph.to_json().unwrap().as_bytes()).unwrap();

    assert_eq!(reloaded.junctions(), graph.junctions());
    assert_eq!(reloaded.lanes(), graph.lanes());
}

#[rstest]
fn test_lane_to_undeclared_junction_is_rejected() {
    let json = r#"{"junctions": [{"id": 1}], "lanes": [{"source": 1, "target": 2, "distance": 1.0}]}"#;
    let err = LaneGraph::from_json_reader(json.as_bytes()).unwrap_err();
    assert!(matches!(err, LaneError::UnknownJunction(2)));
    assert!(err.is_input_error());
}

#[rstest]
fn test_self_loop_is_rejected() {
    let mut graph = lane_graph(2, &[(0, 1)]);
    let err = graph.add_lane(1, 1, LaneAttributes::default()).unwrap_err();
    assert!(matches!(err, LaneError::SelfLoop { lane: 1, junction: 101 }));
    assert_eq!(graph.lane_count(), 1);
}

#[rstest]
fn test_lane_to_missing_junction_index_is_rejected() {
    let mut graph = lane_graph(2, &[(0, 1)]);
    let err = graph.add_lane(0, 5, LaneAttributes::default()).unwrap_err();
    assert!(matches!(err, LaneError::UnknownJunctionIndex(5)));
    assert_eq!(err.to_string(), "unknown junction index 5");
    assert_eq!(graph.lane_count(), 1);
}

#[rstest]
#[case::zero_distance(LaneAttributes::with_distance(0.0), "distance")]
#[case::negative_distance(LaneAttributes::with_distance(-5.0), "distance")]
#[case::nan_distance(LaneAttributes::with_distance(f64::NAN), "distance")]
#[case::infinite_distance(LaneAttributes::with_distance(f64::INFINITY), "distance")]
#[case::zero_speed(LaneAttributes { speed_limit: 0.0, ..LaneAttributes::default() }, "speed_limit")]
#[case::negative_speed(LaneAttributes { speed_limit: -30.0, ..LaneAttributes::default() }, "speed_limit")]
#[case::infinite_speed(LaneAttributes { speed_limit: f64::INFINITY, ..LaneAttributes::default() }, "speed_limit")]
#[case::nan_gradient(LaneAttributes { gradient: f64::NAN, ..LaneAttributes::default() }, "gradient")]
fn test_out_of_range_lane_is_rejected(#[case] attributes: LaneAttributes, #[case] field: &str) {
    let mut graph = lane_graph(2, &[(0, 1)]);
    let err = graph.add_lane(1, 0, attributes).unwrap_err();

    assert!(matches!(err, LaneError::InvalidParameter(_)));
    assert!(err.is_input_error());
    assert_contains!(err.to_string(), "lane 1");
    assert_contains!(err.to_string(), field);
    assert_eq!(graph.lane_count(), 1);
    assert!(graph.incoming(0).is_empty());
}

#[rstest]
#[case::negative_distance(r#"{"source": 1, "target": 2, "distance": -1.0}"#)]
#[case::zero_speed(r#"{"source": 1, "target": 2, "distance": 1.0, "speed_limit": 0.0}"#)]
fn test_out_of_range_lane_in_json_is_rejected(#[case] lane: &str) {
    let json = format!(r#"{{"junctions": [{{"id": 1}}, {{"id": 2}}], "lanes": [{lane}]}}"#);
    let err = LaneGraph::from_json_reader(json.as_bytes()).unwrap_err();
    assert!(matches!(err, LaneError::InvalidParameter(_)));
    assert!(err.is_input_error());
}

#[rstest]
fn test_add_junction_twice_updates_location() {
    let mut graph = LaneGraph::new();
    let first = graph.add_junction(5, Location::default());
    let again = graph.add_junction(5, Location { x: 3.0, y: 4.0, z: None });

    assert_eq!(first, again);
    assert_eq!(graph.junction_count(), 1);
    assert_eq!(graph.junction(first).location.x, 3.0);
}

#[rstest]
fn test_reversed_lane_negates_gradient() {
    let attrs = LaneAttributes { gradient: 3.0, ..LaneAttributes::with_distance(0.5) };
    let back = attrs.reversed();
    assert_eq!(back.gradient, -3.0);
    assert_eq!(back.distance, 0.5);
}

#[rstest]
fn test_lane_mask_membership() {
    let mut mask = LaneMask::empty(5);
    assert!(mask.is_empty());
    assert!(mask.insert(3));
    assert!(!mask.insert(3));
    assert!(mask.insert(1));
    assert_eq!(mask.iter().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(mask.complement().iter().collect::<Vec<_>>(), vec![0, 2, 4]);

    assert!(mask.remove(3));
    assert!(!mask.remove(3));
    assert_eq!(mask.len(), 1);
    assert_eq!(mask.capacity(), 5);
    assert_eq!(LaneMask::from_lanes(5, [4, 0]).iter().collect::<Vec<_>>(), vec![0, 4]);
}

#[rstest]
fn test_partition_moves(ring_with_chords: LaneGraph) {
    let mut partition = Partition::all_car(ring_with_chords.lane_count());
    assert!(partition.move_to_bike(4));
    assert!(!partition.move_to_bike(4));

    assert_eq!(partition.mode(4), LaneMode::Bike);
    assert_eq!(partition.mode(0), LaneMode::Car);
    assert_eq!(partition.bike_lanes(), vec![4]);
    assert_eq!(partition.car_lanes(), vec![0, 1, 2, 3, 5]);
    assert_eq!(partition.bike_count() + partition.car_count(), 6);
    partition.check_covers(&ring_with_chords).unwrap();

    assert!(partition.move_to_car(4));
    assert_eq!(partition, Partition::all_car(6));
}

#[rstest]
fn test_partition_of_another_graph_is_rejected(ring_with_chords: LaneGraph) {
    let err = Partition::all_car(3).check_covers(&ring_with_chords).unwrap_err();
    assert!(matches!(err, LaneError::PartitionOverlap(_)));
    assert!(err.is_invariant_violation());
}

#[rstest]
fn test_to_digraph_keeps_external_ids(ring_with_chords: LaneGraph) {
    let digraph = ring_with_chords.to_digraph([4, 5]);
    assert_eq!(digraph.node_count(), 4);
    assert_eq!(digraph.edge_count(), 2);
    assert_eq!(digraph.node_weights().copied().collect::<Vec<_>>(), vec![100, 101, 102, 103]);
    assert_eq!(digraph.edge_weights().copied().collect::<Vec<_>>(), vec![4, 5]);
}

#[rstest]
fn test_read_od_csv() {
    let csv = "s,t,trips_per_day\n100,101,3.5\n101,101,2\n102,100,0\n";
    let pairs = read_od_csv(csv.as_bytes()).unwrap();

    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0], OdPair { origin: 100, destination: 101, trips: 3.5 });
    assert_eq!(pairs[1].trips, 0.0);
}

#[rstest]
fn test_read_od_csv_without_trips_column() {
    let pairs = read_od_csv("s,t\n1,2\n2,1\n".as_bytes()).unwrap();
    assert_eq!(pairs.len(), 2);
    assert!(pairs.iter().all(|p| p.trips == 1.0));
}

#[rstest]
fn test_read_od_csv_rejects_garbage() {
    let err = read_od_csv("s,t\nfoo,2\n".as_bytes()).unwrap_err();
    assert!(matches!(err, LaneError::Csv(_)));
}
