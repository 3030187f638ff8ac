//! Road descriptors as handed over by the style layer, and the network's
//! per-road bookkeeping.

use std::fmt;
use std::ops::BitOr;

use butterfly_common::Coord;

use crate::network::NodeId;

/// Highest road class and speed category.
pub const MAX_CLASS: u8 = 7;
pub const MAX_SPEED: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoadId(pub u32);

impl RoadId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Vehicle classes, one bit each.
///
/// Used both for road access and for restriction exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessMask(pub u8);

impl AccessMask {
    pub const NONE: AccessMask = AccessMask(0);
    pub const FOOT: AccessMask = AccessMask(0x01);
    pub const BIKE: AccessMask = AccessMask(0x02);
    pub const CAR: AccessMask = AccessMask(0x04);
    pub const DELIVERY: AccessMask = AccessMask(0x08);
    pub const TRUCK: AccessMask = AccessMask(0x10);
    pub const BUS: AccessMask = AccessMask(0x20);
    pub const TAXI: AccessMask = AccessMask(0x40);
    pub const EMERGENCY: AccessMask = AccessMask(0x80);
    pub const ALL: AccessMask = AccessMask(0xff);

    const NAMES: [(AccessMask, &'static str); 8] = [
        (Self::FOOT, "foot"),
        (Self::BIKE, "bike"),
        (Self::CAR, "car"),
        (Self::DELIVERY, "delivery"),
        (Self::TRUCK, "truck"),
        (Self::BUS, "bus"),
        (Self::TAXI, "taxi"),
        (Self::EMERGENCY, "emergency"),
    ];

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn contains(self, other: AccessMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Vehicles in `self` that are not in `other`.
    #[inline]
    pub fn without(self, other: AccessMask) -> AccessMask {
        AccessMask(self.0 & !other.0)
    }
}

impl BitOr for AccessMask {
    type Output = AccessMask;

    fn bitor(self, rhs: AccessMask) -> AccessMask {
        AccessMask(self.0 | rhs.0)
    }
}

impl fmt::Display for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (bit, name) in Self::NAMES {
            if self.contains(bit) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Road attributes produced upstream. The network never looks at tags.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadDef {
    /// Source way id, used to match restriction members.
    pub way_id: i64,
    pub access: AccessMask,
    pub oneway: bool,
    /// 0 (minor) ..= 7 (major)
    pub class: u8,
    /// 0 ..= 7
    pub speed: u8,
    pub paved: bool,
    pub ferry: bool,
    pub roundabout: bool,
    pub synthesised: bool,
    /// Keep out of the routing graph.
    pub skip: bool,
}

impl Default for RoadDef {
    fn default() -> Self {
        Self {
            way_id: 0,
            access: AccessMask::ALL,
            oneway: false,
            class: 0,
            speed: 0,
            paved: true,
            ferry: false,
            roundabout: false,
            synthesised: false,
            skip: false,
        }
    }
}

impl RoadDef {
    pub fn new(way_id: i64, class: u8) -> Self {
        Self {
            way_id,
            class,
            ..Self::default()
        }
    }
}

/// One geometry point of a road.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadPoint {
    pub coord: Coord,
    /// Positive id when the point is a routing node.
    pub node_key: Option<u64>,
    /// Lies on a clipped tile edge.
    pub boundary: bool,
    /// Address-only node, never used for bearings.
    pub number_node: bool,
}

impl RoadPoint {
    pub fn shape(coord: Coord) -> Self {
        Self {
            coord,
            node_key: None,
            boundary: false,
            number_node: false,
        }
    }

    pub fn node(key: u64, coord: Coord) -> Self {
        Self {
            node_key: Some(key),
            ..Self::shape(coord)
        }
    }

    pub fn boundary_node(key: u64, coord: Coord) -> Self {
        Self {
            boundary: true,
            ..Self::node(key, coord)
        }
    }

    pub fn number_node(coord: Coord) -> Self {
        Self {
            number_node: true,
            ..Self::shape(coord)
        }
    }

    /// The routing node key, if any. Zero is not a valid key.
    #[inline]
    pub fn routing_key(&self) -> Option<u64> {
        self.node_key.filter(|&k| k > 0)
    }
}

/// A road registered in a network.
#[derive(Debug, Clone)]
pub struct Road {
    pub(crate) def: RoadDef,
    pub(crate) length: f64,
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) point_count: usize,
    pub(crate) routing_point_count: usize,
}

impl Road {
    pub(crate) fn new(def: RoadDef) -> Self {
        Self {
            def,
            length: 0.0,
            nodes: Vec::new(),
            point_count: 0,
            routing_point_count: 0,
        }
    }

    pub fn def(&self) -> &RoadDef {
        &self.def
    }

    /// Total geometric length in metres.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Routing nodes in road order. Empty for skipped roads.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn routing_point_count(&self) -> usize {
        self.routing_point_count
    }

    pub fn is_routable(&self) -> bool {
        !self.def.skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mask_without() {
        let road = AccessMask::FOOT | AccessMask::BIKE;
        assert!(road.without(AccessMask::FOOT | AccessMask::BIKE).is_empty());
        assert_eq!(road.without(AccessMask::FOOT), AccessMask::BIKE);
        assert_eq!(AccessMask::ALL.without(AccessMask::NONE), AccessMask::ALL);
    }

    #[test]
    fn test_access_mask_display() {
        assert_eq!(AccessMask::NONE.to_string(), "none");
        assert_eq!((AccessMask::CAR | AccessMask::BUS).to_string(), "car|bus");
    }

    #[test]
    fn test_zero_key_is_not_a_routing_node() {
        let p = RoadPoint::node(0, Coord::new(1.0, 1.0));
        assert_eq!(p.routing_key(), None);
        assert_eq!(RoadPoint::node(7, Coord::new(1.0, 1.0)).routing_key(), Some(7));
    }
}
