//! Directed arcs between routing nodes

use std::fmt;

use super::NodeId;
use crate::road::RoadId;

/// Stable index into the network's arc arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArcId(pub u32);

impl ArcId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Directed edge `source -> dest` along one road.
///
/// Direct arcs come in forward/reverse pairs linked through `reverse`.
/// Indirect (shortcut) arcs skip intermediate nodes and have no reverse.
#[derive(Debug, Clone)]
pub struct RouteArc {
    pub(crate) source: NodeId,
    pub(crate) dest: NodeId,
    pub(crate) road: RoadId,
    pub(crate) initial_bearing: f64,
    pub(crate) final_bearing: f64,
    pub(crate) direct_bearing: f64,
    pub(crate) length: f64,
    pub(crate) direct_length: f64,
    pub(crate) forward: bool,
    pub(crate) indirect: bool,
    pub(crate) class: u8,
    pub(crate) reverse: Option<ArcId>,
}

impl RouteArc {
    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn dest(&self) -> NodeId {
        self.dest
    }

    pub fn road(&self) -> RoadId {
        self.road
    }

    /// Heading when leaving `source`.
    pub fn initial_bearing(&self) -> f64 {
        self.initial_bearing
    }

    /// Heading when arriving at `dest`.
    pub fn final_bearing(&self) -> f64 {
        self.final_bearing
    }

    /// Bearing of the straight chord `source -> dest`.
    pub fn direct_bearing(&self) -> f64 {
        self.direct_bearing
    }

    /// Length along the road geometry in metres.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Straight-line distance in metres.
    pub fn direct_length(&self) -> f64 {
        self.direct_length
    }

    /// Travels in the road's drawing direction.
    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn is_direct(&self) -> bool {
        !self.indirect
    }

    pub fn is_indirect(&self) -> bool {
        self.indirect
    }

    /// Road class for direct arcs; the class reached for shortcuts.
    pub fn class(&self) -> u8 {
        self.class
    }

    pub fn reverse(&self) -> Option<ArcId> {
        self.reverse
    }
}
