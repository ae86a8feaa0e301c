//! Local search on top of the greedy partition.
//!
//! The search talks to its state only through [`RefinementEnv`]: reset, list the legal moves,
//! apply one, undo the last one. [`hill_climb`] samples a legal move uniformly, keeps it if the
//! reward did not drop and reverts it immediately otherwise, so the reward never decreases.
use std::cmp::Ordering;
use std::fmt::Debug;

use lc_core::constants::DEFAULT_REFINE_ITERATIONS;
use lc_core::{
    LaneError,
    LaneResult,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{
    debug,
    info,
    instrument,
};

use crate::metrics::{
    EvaluationConfig,
    Evaluator,
    TravelCost,
};
use crate::model::{
    LaneGraph,
    LaneId,
    LaneMode,
    OdPair,
    Partition,
};
use crate::partitioning::{
    ensure_strongly_connected,
    greedy_betweenness,
    is_strongly_connected,
    GreedyConfig,
};

/// State-and-action interface driven by [`hill_climb`].
pub trait RefinementEnv {
    /// A discrete move.
    type Action: Clone + Debug;

    /// Return to the starting partition and compute its reward.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn reset(&mut self) -> LaneResult<f64>;

    /// Moves that are legal in the current state.
    fn available_actions(&self) -> Vec<Self::Action>;

    /// Apply `action` and return the new reward.
    ///
    /// # Errors
    ///
    /// Fails if `action` is not legal in the current state.
    fn step(&mut self, action: &Self::Action) -> LaneResult<f64>;

    /// Undo the most recent [`RefinementEnv::step`] and return the restored reward.
    ///
    /// # Errors
    ///
    /// Fails when there is nothing to undo.
    fn revert_last_action(&mut self) -> LaneResult<f64>;

    /// Reward of the current state.
    fn reward(&self) -> f64;

    /// The current partition.
    fn partition(&self) -> &Partition;

    /// Lanes currently in the bike network.
    fn bike_lanes(&self) -> Vec<LaneId> {
        self.partition().bike_lanes()
    }

    /// Lanes currently in the car network.
    fn car_lanes(&self) -> Vec<LaneId> {
        self.partition().car_lanes()
    }
}

/// A single lane changing networks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LaneMove {
    /// Give a car lane to bikes; only offered when the car network stays strongly connected.
    ToBike(LaneId),
    /// Give a bike lane back to cars.
    ToCar(LaneId),
}

impl LaneMove {
    const fn undo(self) -> Self {
        match self {
            Self::ToBike(lane) => Self::ToCar(lane),
            Self::ToCar(lane) => Self::ToBike(lane),
        }
    }
}

/// Refinement environment over the lane partition of a street network.
///
/// The reward is `-(bike_time + car_weight * car_time)`.
pub struct StreetNetworkEnv<'a, C: TravelCost = crate::metrics::GradientAwareCost> {
    evaluator: Evaluator<'a, C>,
    car_weight: f64,
    initial: Partition,
    state: Partition,
    reward: f64,
    /// Applied moves with the reward before each of them.
    history: Vec<(LaneMove, f64)>,
}

impl<'a, C: TravelCost> StreetNetworkEnv<'a, C> {
    /// Environment starting from `initial`. Call [`RefinementEnv::reset`] before stepping.
    ///
    /// # Errors
    ///
    /// Input errors if `initial` does not cover the evaluator's graph or its car network is not
    /// strongly connected.
    pub fn new(evaluator: Evaluator<'a, C>, initial: Partition, car_weight: f64) -> LaneResult<Self> {
        let graph = evaluator.graph();
        if initial.lane_count() != graph.lane_count() {
            return Err(LaneError::InvalidParameter(format!(
                "starting partition has {} lanes, the graph has {}",
                initial.lane_count(),
                graph.lane_count()
            )));
        }
        ensure_strongly_connected(graph, initial.car_mask())?;
        if !car_weight.is_finite() || car_weight < 0.0 {
            return Err(LaneError::InvalidParameter(format!("car weight must be non-negative, got {car_weight}")));
        }

        Ok(Self {
            evaluator,
            car_weight,
            state: initial.clone(),
            initial,
            reward: f64::NEG_INFINITY,
            history: Vec::new(),
        })
    }

    fn graph(&self) -> &'a LaneGraph {
        self.evaluator.graph()
    }

    fn compute_reward(&self) -> f64 {
        let metrics = self.evaluator.evaluate(&self.state);
        if metrics.bike.unreachable > 0 || metrics.car.unreachable > 0 {
            return f64::NEG_INFINITY;
        }
        -(metrics.bike.mean_time + self.car_weight * metrics.car.mean_time)
    }

    /// Would removing `lane` keep the car network strongly connected?
    fn can_give_to_bikes(&self, lane: LaneId) -> bool {
        let mut car = self.state.car_mask().clone();
        car.remove(lane) && is_strongly_connected(self.graph(), &car)
    }

    fn apply(&mut self, action: LaneMove) -> LaneResult<()> {
        match action {
            LaneMove::ToBike(lane) => {
                if lane >= self.state.lane_count() || !self.can_give_to_bikes(lane) {
                    return Err(LaneError::IllegalAction(format!("{action:?}")));
                }
                self.state.move_to_bike(lane);
            },
            LaneMove::ToCar(lane) => {
                if lane >= self.state.lane_count() || !self.state.move_to_car(lane) {
                    return Err(LaneError::IllegalAction(format!("{action:?}")));
                }
            },
        }
        Ok(())
    }
}

impl<C: TravelCost> RefinementEnv for StreetNetworkEnv<'_, C> {
    type Action = LaneMove;

    fn reset(&mut self) -> LaneResult<f64> {
        self.state = self.initial.clone();
        self.history.clear();
        self.reward = self.compute_reward();
        Ok(self.reward)
    }

    fn available_actions(&self) -> Vec<LaneMove> {
        let mut car = self.state.car_mask().clone();
        let mut actions = Vec::new();
        for lane in 0..self.state.lane_count() {
            match self.state.mode(lane) {
                LaneMode::Bike => actions.push(LaneMove::ToCar(lane)),
                LaneMode::Car => {
                    car.remove(lane);
                    if is_strongly_connected(self.graph(), &car) {
                        actions.push(LaneMove::ToBike(lane));
                    }
                    car.insert(lane);
                },
            }
        }
        actions
    }

    fn step(&mut self, action: &LaneMove) -> LaneResult<f64> {
        self.apply(*action)?;
        self.history.push((*action, self.reward));
        self.reward = self.compute_reward();
        Ok(self.reward)
    }

    fn revert_last_action(&mut self) -> LaneResult<f64> {
        let (action, previous_reward) = self.history.pop().ok_or(LaneError::NoActionToRevert)?;
        self.apply(action.undo())?;
        self.reward = previous_reward;
        Ok(self.reward)
    }

    fn reward(&self) -> f64 {
        self.reward
    }

    fn partition(&self) -> &Partition {
        &self.state
    }
}

/// Counters from one [`hill_climb`] run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HillClimbStats {
    /// Reward after the initial reset.
    pub initial_reward: f64,
    /// Reward when the loop ended.
    pub final_reward: f64,
    /// Moves that were kept.
    pub accepted: usize,
    /// Moves that were undone.
    pub reverted: usize,
}

/// Strict hill climbing: `iterations` random legal moves, each reverted at once if it lowers the
/// reward. Stops early only if no move is legal.
///
/// # Errors
///
/// Propagates environment failures.
#[instrument(skip(env, rng))]
pub fn hill_climb<E, R>(env: &mut E, iterations: usize, rng: &mut R) -> LaneResult<HillClimbStats>
where
    E: RefinementEnv,
    R: Rng + ?Sized,
{
    let initial_reward = env.reset()?;
    let mut previous = initial_reward;
    let (mut accepted, mut reverted) = (0, 0);

    for iteration in 0..iterations {
        let actions = env.available_actions();
        let Some(action) = actions.choose(rng) else {
            debug!(iteration, "no legal action left");
            break;
        };

        let mut reward = env.step(action)?;
        // NaN counts as worse
        if matches!(reward.partial_cmp(&previous), Some(Ordering::Less) | None) {
            debug!(iteration, ?action, reward, previous, "reverting");
            reward = env.revert_last_action()?;
            reverted += 1;
        } else {
            accepted += 1;
        }
        previous = reward;
    }

    info!(initial_reward, final_reward = previous, accepted, reverted, "Hill climbing finished");
    Ok(HillClimbStats { initial_reward, final_reward: previous, accepted, reverted })
}

/// Settings of [`optimized_betweenness`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefineConfig {
    /// Settings of the greedy starting point.
    pub greedy: GreedyConfig,
    /// How partitions are scored.
    pub evaluation: EvaluationConfig,
    /// Weight of car time relative to bike time in the reward.
    pub car_weight: f64,
    /// Number of local search iterations.
    pub iterations: usize,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            greedy: GreedyConfig::default(),
            evaluation: EvaluationConfig::default(),
            car_weight: 1.0,
            iterations: DEFAULT_REFINE_ITERATIONS,
        }
    }
}

/// Result of [`optimized_betweenness`].
#[derive(Clone, Debug)]
pub struct RefinementOutcome {
    /// The refined partition.
    pub partition: Partition,
    /// Search counters, including the greedy and the final reward.
    pub stats: HillClimbStats,
}

/// Greedy betweenness partition followed by [`hill_climb`] in a [`StreetNetworkEnv`].
///
/// # Errors
///
/// Anything the greedy partitioner, the evaluator or the environment reports.
#[instrument(skip(graph, od, config, rng), fields(lanes = graph.lane_count(), iterations = config.iterations))]
pub fn optimized_betweenness<R>(
    graph: &LaneGraph,
    od: Option<&[OdPair]>,
    config: &RefineConfig,
    rng: &mut R,
) -> LaneResult<RefinementOutcome>
where
    R: Rng + ?Sized,
{
    let greedy = greedy_betweenness(graph, &config.greedy)?;
    let evaluator = config.evaluation.evaluator(graph, od)?;
    let mut env = StreetNetworkEnv::new(evaluator, greedy.partition, config.car_weight)?;

    let stats = hill_climb(&mut env, config.iterations, rng)?;
    Ok(RefinementOutcome { partition: env.partition().clone(), stats })
}
