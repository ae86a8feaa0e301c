//! Default parameters shared by the algorithms and the command line.

/// Travel-time multiplier for a bike forced to ride on a car-only lane.
pub const DEFAULT_SHARED_LANE_FACTOR: f64 = 2.0;

/// The greedy partitioner gives up after `MAX_ITERS_PER_LANE * |lanes|` iterations.
pub const MAX_ITERS_PER_LANE: usize = 10;

/// Cruising speed of an e-bike on flat ground, in km/h.
pub const DEFAULT_BIKE_SPEED_KMH: f64 = 18.0;

/// Slowest speed a bike is assumed to keep on steep climbs, in km/h.
pub const MIN_BIKE_SPEED_KMH: f64 = 4.0;

/// Speed lost per percent of uphill gradient, in km/h (0.4002 m/s).
pub const BIKE_SPEED_LOSS_PER_GRADIENT_PCT: f64 = 1.44;

/// Default number of local search iterations for the refinement pass.
pub const DEFAULT_REFINE_ITERATIONS: usize = 1000;

/// Two centrality scores closer than this (absolute) are considered a tie.
pub const CENTRALITY_TIE_TOLERANCE: f64 = 1e-12;
