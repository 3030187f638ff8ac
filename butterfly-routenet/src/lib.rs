//! Routing network compiler for embedded navigation maps
//!
//! Turns road geometry and turn-restriction descriptors into a directed
//! multigraph of routing nodes and arcs, then:
//!
//! 1. resolves restrictions into forbidden-path records on via nodes
//! 2. runs consistency checks (roundabouts, flares, duplicated arcs)
//! 3. removes small disconnected islands
//! 4. inserts shortcut arcs along major roads
//! 5. groups the finished graph into capacity-bounded partitions, each with
//!    its own arc class table
//!
//! One [`RoadNetwork`] belongs to exactly one tile. Tiles are independent and
//! can be compiled in parallel with [`pipeline::compile_tiles`].

pub mod arc_class;
pub mod config;
pub mod error;
pub mod network;
pub mod partition;
pub mod pipeline;
pub mod restriction;
pub mod road;

pub use arc_class::{ArcCategory, ArcClassTable, TableState};
pub use config::NetConfig;
pub use error::{NetError, Result};
pub use network::{
    ArcId, BuildStage, CheckReport, CompileSummary, IslandReport, NodeId, RoadNetwork, RouteArc,
    RouteNode,
};
pub use partition::{CapacityModel, Partition, PartitionCapacity, PartitionSet, PartitionStats};
pub use pipeline::{compile_tile, compile_tiles, CompiledTile, TileInput};
pub use restriction::{
    DirectionHint, DropReason, FilterReason, Restriction, RestrictionDescriptor, RestrictionKind,
    RestrictionReport, Stage,
};
pub use road::{AccessMask, Road, RoadDef, RoadId, RoadPoint};

pub use butterfly_common::Coord;
