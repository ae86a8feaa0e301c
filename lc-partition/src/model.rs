//! Data models for lane graphs, lane subsets and bike/car partitions.
use std::collections::HashMap;
use std::fs::File;
use std::io::{
    BufReader,
    Read,
};
use std::path::Path;

use lc_core::{
    LaneError,
    LaneResult,
};
use petgraph::graph::DiGraph;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    instrument,
    warn,
};

/// Dense index of a junction inside a [`LaneGraph`] (insertion order).
pub type JunctionId = usize;

/// Dense index of a lane inside a [`LaneGraph`] (insertion order).
pub type LaneId = usize;

/// Planar or 3-D position of a junction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Easting (or x) coordinate.
    pub x: f64,
    /// Northing (or y) coordinate.
    pub y: f64,
    /// Elevation, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

/// A street intersection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    /// External identifier (for example an OSM node id); OD matrices refer to this id.
    pub id: u64,
    /// Where the junction is.
    #[serde(default)]
    pub location: Location,
}

const fn default_capacity() -> f64 {
    1.0
}

const fn default_speed_limit() -> f64 {
    30.0
}

/// Physical attributes of a single lane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneAttributes {
    /// Length in kilometres.
    pub distance: f64,
    /// Rise in percent (positive is uphill in the lane's direction).
    #[serde(default)]
    pub gradient: f64,
    /// Speed limit in km/h.
    #[serde(default = "default_speed_limit")]
    pub speed_limit: f64,
    /// Lane capacity (number of lane widths).
    #[serde(default = "default_capacity")]
    pub capacity: f64,
    /// Optional weight used by the spanning-tree baseline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl LaneAttributes {
    /// Attributes with the given length and defaults for everything else.
    #[must_use]
    pub const fn with_distance(distance: f64) -> Self {
        Self {
            distance,
            gradient: 0.0,
            speed_limit: default_speed_limit(),
            capacity: default_capacity(),
            weight: None,
        }
    }

    /// Check that the attributes describe a lane a vehicle can actually travel.
    ///
    /// # Errors
    ///
    /// [`LaneError::InvalidParameter`] when `distance` or `speed_limit` is not finite and positive,
    /// or when `gradient` is not finite.
    pub fn validate(&self, lane: LaneId) -> LaneResult<()> {
        for (name, value) in [("distance", self.distance), ("speed_limit", self.speed_limit)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(LaneError::InvalidParameter(format!(
                    "lane {lane}: {name} must be finite and positive, got {value}"
                )));
            }
        }
        if !self.gradient.is_finite() {
            return Err(LaneError::InvalidParameter(format!("lane {lane}: gradient must be finite, got {}", self.gradient)));
        }
        Ok(())
    }

    /// The same lane travelled in the opposite direction: uphill becomes downhill.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self { gradient: -self.gradient, ..*self }
    }
}

impl Default for LaneAttributes {
    fn default() -> Self {
        Self::with_distance(1.0)
    }
}

/// One directed traffic lane.
#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    /// Junction the lane leaves from.
    pub source: JunctionId,
    /// Junction the lane leads to.
    pub target: JunctionId,
    /// Physical attributes.
    pub attributes: LaneAttributes,
}

/// Directed multigraph of lanes, stored as lane records plus per-junction adjacency lists.
///
/// Lanes and junctions are never removed; algorithms that need a shrinking graph work on a
/// [`LaneMask`] over the lanes instead.
#[derive(Clone, Debug, Default)]
pub struct LaneGraph {
    /// All junctions, indexed by [`JunctionId`].
    junctions: Vec<Junction>,
    /// All lanes, indexed by [`LaneId`].
    lanes: Vec<Lane>,
    /// Outgoing lanes per junction, in insertion order.
    outgoing: Vec<Vec<LaneId>>,
    /// Incoming lanes per junction, in insertion order.
    incoming: Vec<Vec<LaneId>>,
    /// External junction id to dense index.
    index: HashMap<u64, JunctionId>,
}

/// On-disk representation of a lane graph.
#[derive(Debug, Serialize, Deserialize)]
struct LaneGraphFile {
    junctions: Vec<Junction>,
    lanes: Vec<LaneRecord>,
}

/// A lane as written in a lane graph file, endpoints given by external junction id.
#[derive(Debug, Serialize, Deserialize)]
struct LaneRecord {
    source: u64,
    target: u64,
    #[serde(flatten)]
    attributes: LaneAttributes,
}

impl LaneGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a junction, or update the location of an existing one with the same external id.
    pub fn add_junction(&mut self, id: u64, location: Location) -> JunctionId {
        if let Some(&existing) = self.index.get(&id) {
            self.junctions[existing].location = location;
            return existing;
        }
        let idx = self.junctions.len();
        self.junctions.push(Junction { id, location });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.index.insert(id, idx);
        idx
    }

    /// Add a lane between two existing junctions.
    ///
    /// # Errors
    ///
    /// Fails if either endpoint is not a junction of this graph, if the lane is a self-loop or if
    /// its attributes are out of range (see [`LaneAttributes::validate`]).
    pub fn add_lane(
        &mut self,
        source: JunctionId,
        target: JunctionId,
        attributes: LaneAttributes,
    ) -> LaneResult<LaneId> {
        for endpoint in [source, target] {
            if endpoint >= self.junctions.len() {
                return Err(LaneError::UnknownJunctionIndex(endpoint));
            }
        }
        let lane = self.lanes.len();
        if source == target {
            return Err(LaneError::SelfLoop { lane, junction: self.junctions[source].id });
        }
        attributes.validate(lane)?;
        self.lanes.push(Lane { source, target, attributes });
        self.outgoing[source].push(lane);
        self.incoming[target].push(lane);
        Ok(lane)
    }

    /// Number of junctions.
    #[must_use]
    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    /// Number of lanes.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// All junctions in index order.
    #[must_use]
    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    /// All lanes in index order.
    #[must_use]
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// A single junction.
    #[must_use]
    pub fn junction(&self, id: JunctionId) -> &Junction {
        &self.junctions[id]
    }

    /// A single lane.
    #[must_use]
    pub fn lane(&self, id: LaneId) -> &Lane {
        &self.lanes[id]
    }

    /// Lanes leaving `junction`.
    #[must_use]
    pub fn outgoing(&self, junction: JunctionId) -> &[LaneId] {
        &self.outgoing[junction]
    }

    /// Lanes arriving at `junction`.
    #[must_use]
    pub fn incoming(&self, junction: JunctionId) -> &[LaneId] {
        &self.incoming[junction]
    }

    /// Dense index of the junction with external id `id`.
    #[must_use]
    pub fn junction_index(&self, id: u64) -> Option<JunctionId> {
        self.index.get(&id).copied()
    }

    /// Build a new graph with the same junctions and the given `(source, target, attributes)`
    /// lanes.
    ///
    /// # Errors
    ///
    /// Same as [`LaneGraph::add_lane`].
    pub fn with_same_junctions<I>(&self, lanes: I) -> LaneResult<Self>
    where
        I: IntoIterator<Item = (JunctionId, JunctionId, LaneAttributes)>,
    {
        let mut graph = Self::new();
        for junction in &self.junctions {
            graph.add_junction(junction.id, junction.location);
        }
        for (source, target, attributes) in lanes {
            graph.add_lane(source, target, attributes)?;
        }
        Ok(graph)
    }

    /// Parse a lane graph from JSON.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, lanes referring to undeclared junctions, self-loops and lanes with
    /// out-of-range attributes.
    pub fn from_json_reader<R: Read>(reader: R) -> LaneResult<Self> {
        let file: LaneGraphFile = serde_json::from_reader(reader)?;

        let mut graph = Self::new();
        for junction in file.junctions {
            graph.add_junction(junction.id, junction.location);
        }
        for record in file.lanes {
            let source = graph.junction_index(record.source).ok_or(LaneError::UnknownJunction(record.source))?;
            let target = graph.junction_index(record.target).ok_or(LaneError::UnknownJunction(record.target))?;
            graph.add_lane(source, target, record.attributes)?;
        }
        Ok(graph)
    }

    /// Load a lane graph from a JSON file.
    ///
    /// # Errors
    ///
    /// See [`LaneGraph::from_json_reader`]; also fails if the file cannot be opened.
    #[instrument]
    pub fn from_json_file(path: &Path) -> LaneResult<Self> {
        let file = File::open(path)?;
        let graph = Self::from_json_reader(BufReader::new(file))?;
        debug!(junctions = graph.junction_count(), lanes = graph.lane_count(), "Loaded lane graph");
        Ok(graph)
    }

    /// Serialise the graph in the same format [`LaneGraph::from_json_reader`] reads.
    ///
    /// # Errors
    ///
    /// Only fails if serialisation itself fails.
    pub fn to_json(&self) -> LaneResult<String> {
        let file = LaneGraphFile {
            junctions: self.junctions.clone(),
            lanes: self
                .lanes
                .iter()
                .map(|lane| LaneRecord {
                    source: self.junctions[lane.source].id,
                    target: self.junctions[lane.target].id,
                    attributes: lane.attributes,
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// A `petgraph` view of a subset of lanes, for DOT output.
    ///
    /// Node weights are external junction ids and edge weights are lane ids; node indices line
    /// up with [`JunctionId`]s.
    pub fn to_digraph<I>(&self, lanes: I) -> DiGraph<u64, LaneId>
    where
        I: IntoIterator<Item = LaneId>,
    {
        let mut graph = DiGraph::with_capacity(self.junction_count(), self.lane_count());
        let nodes: Vec<_> = self.junctions.iter().map(|j| graph.add_node(j.id)).collect();
        for lane in lanes {
            let Lane { source, target, .. } = self.lanes[lane];
            graph.add_edge(nodes[source], nodes[target], lane);
        }
        graph
    }
}

/// Membership bitmap over the lanes of one [`LaneGraph`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneMask {
    /// `members[lane]` is true when the lane is in the set.
    members: Vec<bool>,
    /// Cached number of members.
    len: usize,
}

impl LaneMask {
    /// Mask containing every lane.
    #[must_use]
    pub fn full(lane_count: usize) -> Self {
        Self { members: vec![true; lane_count], len: lane_count }
    }

    /// Mask containing no lane.
    #[must_use]
    pub fn empty(lane_count: usize) -> Self {
        Self { members: vec![false; lane_count], len: 0 }
    }

    /// Mask containing exactly `lanes`.
    pub fn from_lanes<I>(lane_count: usize, lanes: I) -> Self
    where
        I: IntoIterator<Item = LaneId>,
    {
        let mut mask = Self::empty(lane_count);
        for lane in lanes {
            mask.insert(lane);
        }
        mask
    }

    /// Is `lane` in the set?
    #[must_use]
    pub fn contains(&self, lane: LaneId) -> bool {
        self.members.get(lane).copied().unwrap_or(false)
    }

    /// Add `lane`; returns false if it was already present.
    pub fn insert(&mut self, lane: LaneId) -> bool {
        if self.members[lane] {
            return false;
        }
        self.members[lane] = true;
        self.len += 1;
        true
    }

    /// Remove `lane`; returns false if it was not present.
    pub fn remove(&mut self, lane: LaneId) -> bool {
        if !self.members[lane] {
            return false;
        }
        self.members[lane] = false;
        self.len -= 1;
        true
    }

    /// Number of lanes in the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when no lane is in the set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of lanes of the underlying graph.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.members.len()
    }

    /// Member lanes in increasing id order.
    pub fn iter(&self) -> impl Iterator<Item = LaneId> + '_ {
        self.members.iter().enumerate().filter_map(|(lane, &member)| member.then_some(lane))
    }

    /// The lanes not in this set.
    #[must_use]
    pub fn complement(&self) -> Self {
        Self {
            members: self.members.iter().map(|m| !m).collect(),
            len: self.members.len() - self.len,
        }
    }
}

/// Which network a lane is assigned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneMode {
    /// Reserved for bicycles; ridable in both directions.
    Bike,
    /// Left to motor vehicles; directed.
    Car,
}

/// Assignment of every lane to exactly one of the bike and car networks.
///
/// Stored as the car lane set; the bike lanes are its complement, so the two sets are disjoint
/// and cover the graph by construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    /// Lanes left to cars.
    car: LaneMask,
}

impl Partition {
    /// Every lane is a car lane.
    #[must_use]
    pub fn all_car(lane_count: usize) -> Self {
        Self { car: LaneMask::full(lane_count) }
    }

    /// Partition whose car network is exactly `car`.
    #[must_use]
    pub const fn from_car_mask(car: LaneMask) -> Self {
        Self { car }
    }

    /// The car lanes as a mask.
    #[must_use]
    pub const fn car_mask(&self) -> &LaneMask {
        &self.car
    }

    /// Which network `lane` belongs to.
    #[must_use]
    pub fn mode(&self, lane: LaneId) -> LaneMode {
        if self.car.contains(lane) {
            LaneMode::Car
        } else {
            LaneMode::Bike
        }
    }

    /// Bike lanes in increasing id order.
    #[must_use]
    pub fn bike_lanes(&self) -> Vec<LaneId> {
        (0..self.car.capacity()).filter(|&lane| !self.car.contains(lane)).collect()
    }

    /// Car lanes in increasing id order.
    #[must_use]
    pub fn car_lanes(&self) -> Vec<LaneId> {
        self.car.iter().collect()
    }

    /// Number of bike lanes.
    #[must_use]
    pub fn bike_count(&self) -> usize {
        self.car.capacity() - self.car.len()
    }

    /// Number of car lanes.
    #[must_use]
    pub const fn car_count(&self) -> usize {
        self.car.len()
    }

    /// Number of lanes in the underlying graph.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.car.capacity()
    }

    /// Move `lane` to the bike network; returns false if it already was a bike lane.
    pub fn move_to_bike(&mut self, lane: LaneId) -> bool {
        self.car.remove(lane)
    }

    /// Move `lane` to the car network; returns false if it already was a car lane.
    pub fn move_to_car(&mut self, lane: LaneId) -> bool {
        self.car.insert(lane)
    }

    /// Check that the partition covers exactly the lanes of `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::PartitionOverlap`] if the counts do not add up.
    pub fn check_covers(&self, graph: &LaneGraph) -> LaneResult<()> {
        if self.lane_count() != graph.lane_count() || self.bike_count() + self.car_count() != graph.lane_count() {
            return Err(LaneError::PartitionOverlap(format!(
                "{} bike + {} car lanes for a graph of {} lanes",
                self.bike_count(),
                self.car_count(),
                graph.lane_count()
            )));
        }
        Ok(())
    }
}

const fn default_trips() -> f64 {
    1.0
}

/// One origin-destination demand entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OdPair {
    /// External id of the origin junction.
    #[serde(rename = "s")]
    pub origin: u64,
    /// External id of the destination junction.
    #[serde(rename = "t")]
    pub destination: u64,
    /// Trip volume (trips per day).
    #[serde(rename = "trips_per_day", default = "default_trips")]
    pub trips: f64,
}

/// Read an OD matrix from CSV with columns `s`, `t` and optionally `trips_per_day`.
///
/// Pairs with identical origin and destination are dropped.
///
/// # Errors
///
/// Fails on malformed CSV.
pub fn read_od_csv<R: Read>(reader: R) -> LaneResult<Vec<OdPair>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut pairs = Vec::new();
    for record in csv_reader.deserialize() {
        let pair: OdPair = record?;
        if pair.origin == pair.destination {
            warn!(junction = pair.origin, "Dropping OD pair with identical origin and destination");
            continue;
        }
        pairs.push(pair);
    }
    Ok(pairs)
}

/// Load an OD matrix from a CSV file; see [`read_od_csv`].
///
/// # Errors
///
/// Fails if the file cannot be opened or parsed.
#[instrument]
pub fn load_od_csv(path: &Path) -> LaneResult<Vec<OdPair>> {
    let pairs = read_od_csv(BufReader::new(File::open(path)?))?;
    debug!(pairs = pairs.len(), "Loaded OD matrix");
    Ok(pairs)
}
