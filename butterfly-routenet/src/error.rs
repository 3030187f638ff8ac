//! Fatal errors for a tile.
//!
//! Bad input (unknown via node, ambiguous way, unusable arcs) never shows up
//! here: it is logged and the element is skipped. These variants are
//! invariant violations that stop the tile.

use crate::network::BuildStage;
use crate::road::RoadId;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("{op} is not allowed while the network is {stage}")]
    WrongStage { op: &'static str, stage: BuildStage },

    #[error("{pass} has already run on this network")]
    PassRepeated { pass: &'static str },

    #[error("arc class table is frozen, cannot register road {0}")]
    Frozen(RoadId),

    #[error("arc class table is still being built")]
    NotFrozen,

    #[error("arc class index requested from an empty table")]
    EmptyTable,

    #[error("road {0} is not registered in the arc class table")]
    UnknownRoad(RoadId),

    #[error("{what} exceeds its capacity of {limit}")]
    CapacityOverflow { what: &'static str, limit: usize },

    #[error("network has not been partitioned yet")]
    NotPartitioned,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Common(#[from] butterfly_common::Error),
}

pub type Result<T> = std::result::Result<T, NetError>;
