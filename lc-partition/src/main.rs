#![warn(clippy::nursery, clippy::pedantic, missing_docs)]
//! `lanecut` command line interface
//!
//! Partitions the lanes of a street network between bikes and cars. Every subcommand reads a lane
//! graph (JSON), runs one of the algorithms in the `lc_partition` library and writes its results
//! into a fresh timestamped directory under `--output-dir`. See `--help` for more information.

use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    Context,
    Result,
};
use clap::{
    Args,
    Parser,
    Subcommand,
};
use lc_core::constants::{
    DEFAULT_BIKE_SPEED_KMH,
    DEFAULT_REFINE_ITERATIONS,
    DEFAULT_SHARED_LANE_FACTOR,
};
use lc_partition::metrics::{
    EvaluationConfig,
    GradientAwareCost,
    PathMode,
};
use lc_partition::model::{
    load_od_csv,
    LaneGraph,
    OdPair,
};
use lc_partition::pareto::SweepConfig;
use lc_partition::partitioning::{
    CentralityWeight,
    GreedyConfig,
};
use lc_partition::planner::{
    self,
    BikeNetworkKind,
    OrientationKind,
};
use lc_partition::refine::RefineConfig;
use lc_partition::utils::create_timestamped_output_dir;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

/// lanecut: find bike lanes a street network can spare while cars still reach every junction
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Logging verbosity level (`trace`, `debug`, `info`, `warn`, `error`).
    #[arg(short, long, default_value = "info", global = true)]
    verbosity: String,

    /// Seed for every random choice (local search, random orientation).
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Directory under which a timestamped run directory is created.
    #[arg(short, long, default_value = "runs", global = true)]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// What to run.
#[derive(Subcommand)]
enum Command {
    /// Greedy betweenness partition with a target number of bike lanes.
    Partition {
        #[command(flatten)]
        input: InputArgs,

        /// Number of lanes to give to bikes (default: half of all lanes).
        #[arg(short = 'k', long)]
        bike_lanes: Option<usize>,

        /// Lane length used by the centrality ranking.
        #[arg(long, value_enum, default_value_t = CentralityWeight::Unit)]
        centrality: CentralityWeight,

        #[command(flatten)]
        evaluation: EvaluationArgs,
    },

    /// Sweep the number of bike lanes and record bike and car travel times.
    Pareto {
        #[command(flatten)]
        input: InputArgs,

        /// Lane length used by the centrality ranking.
        #[arg(long, value_enum, default_value_t = CentralityWeight::Unit)]
        centrality: CentralityWeight,

        #[command(flatten)]
        evaluation: EvaluationArgs,
    },

    /// Greedy partition followed by hill-climbing local search.
    Refine {
        #[command(flatten)]
        input: InputArgs,

        /// Number of local search iterations.
        #[arg(short = 'n', long, default_value_t = DEFAULT_REFINE_ITERATIONS)]
        iterations: usize,

        /// Weight of car time relative to bike time in the objective.
        #[arg(long, default_value_t = 1.0, value_parser = parse_non_negative)]
        car_weight: f64,

        #[command(flatten)]
        evaluation: EvaluationArgs,
    },

    /// Reference heuristics: a simple bike network plus oriented car lanes.
    Baseline {
        #[command(flatten)]
        input: InputArgs,

        /// How the bike network is extracted.
        #[arg(long, value_enum)]
        bike_network: BikeNetworkKind,

        /// How the remaining car lanes are oriented.
        #[arg(long, value_enum)]
        orientation: OrientationKind,
    },
}

/// Input files.
#[derive(Args)]
struct InputArgs {
    /// Lane graph as JSON (`{"junctions": [...], "lanes": [...]}`).
    #[arg(short, long)]
    graph: PathBuf,

    /// Origin-destination matrix as CSV with columns `s,t[,trips_per_day]`.
    #[arg(long)]
    od: Option<PathBuf>,
}

/// Travel time evaluation settings.
#[derive(Args)]
struct EvaluationArgs {
    /// Which junction pairs travel times are averaged over.
    #[arg(long, value_enum, default_value_t = PathMode::AllPairs)]
    sp_method: PathMode,

    /// Travel time multiplier for bikes sharing a car lane.
    #[arg(long, default_value_t = DEFAULT_SHARED_LANE_FACTOR, value_parser = parse_positive)]
    penalty_shared: f64,

    /// Bike speed on flat ground (km/h).
    #[arg(long, default_value_t = DEFAULT_BIKE_SPEED_KMH, value_parser = parse_positive)]
    bike_speed: f64,

    /// Fraction of the speed limit cars actually drive.
    #[arg(long, default_value_t = 1.0, value_parser = parse_positive)]
    car_speed_factor: f64,
}

impl EvaluationArgs {
    fn config(&self) -> EvaluationConfig {
        EvaluationConfig {
            mode: self.sp_method,
            shared_lane_factor: self.penalty_shared,
            cost: GradientAwareCost {
                bike_speed: self.bike_speed,
                car_speed_factor: self.car_speed_factor,
                ..GradientAwareCost::default()
            },
        }
    }
}

fn parse_float(s: &str) -> Result<f64, String> {
    let val: f64 = s.parse().map_err(|_| format!("'{s}' isn't a valid float number"))?;
    if val.is_finite() {
        Ok(val)
    } else {
        Err(format!("value must be finite, got: {val}"))
    }
}

/// Custom parser for factors and speeds, which must be strictly positive
fn parse_positive(s: &str) -> Result<f64, String> {
    let val = parse_float(s)?;
    if val > 0.0 {
        Ok(val)
    } else {
        Err(format!("value must be greater than 0, got: {val}"))
    }
}

/// Custom parser for weights, which must not be negative
fn parse_non_negative(s: &str) -> Result<f64, String> {
    let val = parse_float(s)?;
    if val >= 0.0 {
        Ok(val)
    } else {
        Err(format!("value must be at least 0, got: {val}"))
    }
}

/// Loads the lane graph and, if given, the OD matrix
fn load_inputs(input: &InputArgs) -> Result<(LaneGraph, Option<Vec<OdPair>>)> {
    info!("Loading lane graph from {}", input.graph.display());
    let graph = LaneGraph::from_json_file(&input.graph)
        .with_context(|| format!("failed to load lane graph from {}", input.graph.display()))?;
    info!(junctions = graph.junction_count(), lanes = graph.lane_count(), "Lane graph loaded");

    let od = input
        .od
        .as_deref()
        .map(|path: &Path| {
            info!("Loading OD matrix from {}", path.display());
            load_od_csv(path).with_context(|| format!("failed to load OD matrix from {}", path.display()))
        })
        .transpose()?;
    Ok((graph, od))
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Conform to crate-standard logging.
    lc_core::logging::setup(&args.verbosity);

    let output_dir = create_timestamped_output_dir(&args.output_dir)?;
    info!("Writing results to {}", output_dir.display());
    let mut rng = StdRng::seed_from_u64(args.seed);

    match args.command {
        Command::Partition { input, bike_lanes, centrality, evaluation } => {
            let (graph, od) = load_inputs(&input)?;
            let greedy = GreedyConfig { target_bike_lanes: bike_lanes, centrality, cost: evaluation.config().cost };
            planner::run_partition(&graph, od.as_deref(), &greedy, &evaluation.config(), &output_dir)?;
        },
        Command::Pareto { input, centrality, evaluation } => {
            let (graph, od) = load_inputs(&input)?;
            let config = SweepConfig { evaluation: evaluation.config(), centrality };
            planner::run_pareto(&graph, od.as_deref(), &config, &output_dir)?;
        },
        Command::Refine { input, iterations, car_weight, evaluation } => {
            let (graph, od) = load_inputs(&input)?;
            let evaluation = evaluation.config();
            let config = RefineConfig {
                greedy: GreedyConfig { cost: evaluation.cost, ..GreedyConfig::default() },
                evaluation,
                car_weight,
                iterations,
            };
            planner::run_refine(&graph, od.as_deref(), &config, &mut rng, &output_dir)?;
        },
        Command::Baseline { input, bike_network, orientation } => {
            let (graph, _) = load_inputs(&input)?;
            planner::run_baseline(&graph, bike_network, orientation, &mut rng, &output_dir)?;
        },
    }

    info!("Done");
    Ok(())
}
