//! Routing nodes

use std::fmt;

use butterfly_common::Coord;

use super::ArcId;
use crate::restriction::Restriction;
use crate::road::MAX_CLASS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A routing-graph vertex.
///
/// Owns its outgoing arc list (ids into the network's arc arena, in encoding
/// order) and the restriction records whose path passes through it.
#[derive(Debug, Clone)]
pub struct RouteNode {
    pub(crate) key: u64,
    pub(crate) coord: Coord,
    pub(crate) boundary: bool,
    pub(crate) class: u8,
    pub(crate) group: u8,
    pub(crate) arcs: Vec<ArcId>,
    pub(crate) restrictions: Vec<Restriction>,
    pub(crate) discarded: bool,
}

impl RouteNode {
    pub(crate) fn new(key: u64, coord: Coord, boundary: bool) -> Self {
        Self {
            key,
            coord,
            boundary,
            class: 0,
            group: 0,
            arcs: Vec::new(),
            restrictions: Vec::new(),
            discarded: false,
        }
    }

    /// Upstream coordinate id.
    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    /// Lies on a clipped tile edge; never discarded.
    pub fn is_boundary(&self) -> bool {
        self.boundary
    }

    /// Highest class of the incident roads.
    pub fn class(&self) -> u8 {
        self.class
    }

    /// Partition group, set just before partitioning.
    pub fn group(&self) -> u8 {
        self.group
    }

    pub fn arcs(&self) -> &[ArcId] {
        &self.arcs
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }
}

/// Group of a node from the classes of its distinct incident roads.
///
/// The highest class shared by at least two roads wins. Failing that, a node
/// that only sees one class keeps its own class, and a node joining several
/// classes gets the second highest of them.
pub(crate) fn node_group(road_classes: &[u8], own_class: u8) -> u8 {
    let mut per_class = [0usize; MAX_CLASS as usize + 1];
    for &class in road_classes {
        per_class[class.min(MAX_CLASS) as usize] += 1;
    }

    if let Some(shared) = (0..=MAX_CLASS).rev().find(|&c| per_class[c as usize] >= 2) {
        return shared;
    }

    let mut distinct = (0..=MAX_CLASS).rev().filter(|&c| per_class[c as usize] > 0);
    match (distinct.next(), distinct.next()) {
        (Some(_), Some(second)) => second,
        _ => own_class,
    }
}
