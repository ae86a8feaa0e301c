//! Typed errors for the library crates.
//!
//! Errors fall into two classes. Input errors mean the caller handed us something outside the
//! contract (an empty or disconnected lane graph, an OD pair naming an unknown junction). Invariant
//! errors mean one of the algorithms broke a guarantee it is supposed to uphold; they indicate a
//! bug and are never retried. Binaries wrap both in `anyhow` at the boundary.
use thiserror::Error;

/// Result alias used throughout the library crates.
pub type LaneResult<T> = Result<T, LaneError>;

/// Everything that can go wrong inside the partitioning core.
#[derive(Debug, Error)]
pub enum LaneError {
    /// The lane graph has no lanes (or no junctions).
    #[error("lane graph is empty")]
    EmptyGraph,

    /// The car network handed to an algorithm is not strongly connected.
    #[error("lane graph is not strongly connected ({unreachable} junctions unreachable from junction 0 or unable to reach it)")]
    NotStronglyConnected {
        /// Number of junctions failing the forward or backward reachability check.
        unreachable: usize,
    },

    /// A lane or OD pair refers to an external junction id that does not exist.
    #[error("unknown junction {0}")]
    UnknownJunction(u64),

    /// A lane refers to a dense junction index past the end of the graph.
    #[error("unknown junction index {0}")]
    UnknownJunctionIndex(usize),

    /// A lane starts and ends at the same junction.
    #[error("lane {lane} is a self-loop at junction {junction}")]
    SelfLoop {
        /// Index of the offending lane.
        lane: usize,
        /// External id of the junction.
        junction: u64,
    },

    /// A numeric parameter is outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// OD-restricted evaluation was requested without an OD matrix.
    #[error("shortest-path mode `od` requires an OD matrix")]
    MissingOdMatrix,

    /// `revert_last_action` was called with nothing to revert.
    #[error("no action to revert")]
    NoActionToRevert,

    /// An action was applied that is not legal in the current state.
    #[error("illegal action: {0}")]
    IllegalAction(String),

    /// A lossless conversion dropped or duplicated lanes.
    #[error("lost edges during {stage}: expected {expected}, found {actual}")]
    LostEdges {
        /// Which conversion produced the mismatch.
        stage: &'static str,
        /// Lane count before the conversion.
        expected: usize,
        /// Lane count after the conversion.
        actual: usize,
    },

    /// The car network lost strong connectivity where it must not.
    #[error("car network is no longer strongly connected after {stage}")]
    CarNetworkDisconnected {
        /// Where the check failed.
        stage: &'static str,
    },

    /// A lane ended up in both (or neither) of the bike and car networks.
    #[error("partition is not a clean split: {0}")]
    PartitionOverlap(String),

    /// An orientation baseline emitted the wrong number of directed lanes.
    #[error("orientation emitted {emitted} directed lanes for {expected} undirected lanes")]
    IncompleteOrientation {
        /// Number of undirected input lanes.
        expected: usize,
        /// Number of directed lanes produced.
        emitted: usize,
    },

    /// Filesystem failure while reading inputs.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed JSON input.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Malformed CSV input.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl LaneError {
    /// True when the error is the caller's fault rather than a defect in the algorithms.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        !self.is_invariant_violation()
    }

    /// True when an internal guarantee was broken.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::LostEdges { .. }
                | Self::CarNetworkDisconnected { .. }
                | Self::PartitionOverlap(_)
                | Self::IncompleteOrientation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty(LaneError::EmptyGraph, true)]
    #[case::disconnected(LaneError::NotStronglyConnected { unreachable: 2 }, true)]
    #[case::missing_od(LaneError::MissingOdMatrix, true)]
    #[case::junction_index(LaneError::UnknownJunctionIndex(4), true)]
    #[case::bad_lane(LaneError::InvalidParameter("lane 0: distance must be finite and positive, got -1".into()), true)]
    #[case::lost(LaneError::LostEdges { stage: "test", expected: 3, actual: 2 }, false)]
    #[case::car(LaneError::CarNetworkDisconnected { stage: "test" }, false)]
    #[case::orientation(LaneError::IncompleteOrientation { expected: 3, emitted: 2 }, false)]
    fn test_error_classes(#[case] err: LaneError, #[case] input: bool) {
        assert_eq!(err.is_input_error(), input);
        assert_eq!(err.is_invariant_violation(), !input);
    }

    #[rstest]
    fn test_unknown_junction_messages() {
        assert_eq!(LaneError::UnknownJunction(4).to_string(), "unknown junction 4");
        assert_eq!(LaneError::UnknownJunctionIndex(4).to_string(), "unknown junction index 4");
    }

    #[rstest]
    fn test_lost_edges_message() {
        let err = LaneError::LostEdges { stage: "undirected conversion", expected: 6, actual: 4 };
        assert_eq!(err.to_string(), "lost edges during undirected conversion: expected 6, found 4");
    }
}
