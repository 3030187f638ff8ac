//! Turn restrictions
//!
//! Upstream hands us abstract descriptors (ways and node ids, a kind, a
//! direction hint). [`RoadNetwork::resolve_restrictions`] turns each one into
//! concrete arc paths and attaches a [`Restriction`] record to every via node
//! the path passes through.
//!
//! [`RoadNetwork::resolve_restrictions`]: crate::RoadNetwork::resolve_restrictions

mod angle;
mod resolver;

use std::fmt;

use butterfly_common::Coord;

use crate::network::{ArcId, NodeId};
use crate::road::AccessMask;

pub use angle::{choose_group, AngleChoice};

/// Most arcs a descriptor may expand to, summed over all stages.
pub const MAX_RESTRICTION_ARCS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    /// The named path is forbidden.
    Forbid,
    /// Only the named path is allowed; every other exit is forbidden.
    Only,
    /// No traffic through the via node at all.
    NoThrough,
}

impl fmt::Display for RestrictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestrictionKind::Forbid => "forbid",
            RestrictionKind::Only => "only",
            RestrictionKind::NoThrough => "no_through",
        };
        f.write_str(name)
    }
}

/// Which way the restricted turn goes, used to pick between to-way candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionHint {
    Left,
    Right,
    UTurn,
    Straight,
    Unknown,
}

impl DirectionHint {
    pub fn from_char(c: char) -> Self {
        match c {
            'l' => DirectionHint::Left,
            'r' => DirectionHint::Right,
            'u' => DirectionHint::UTurn,
            's' => DirectionHint::Straight,
            _ => DirectionHint::Unknown,
        }
    }

    /// Turning angle this hint stands for; positive turns right.
    pub fn ideal_angle(self) -> Option<f64> {
        match self {
            DirectionHint::Left => Some(-90.0),
            DirectionHint::Right => Some(90.0),
            DirectionHint::UTurn => Some(180.0),
            DirectionHint::Straight => Some(0.0),
            DirectionHint::Unknown => None,
        }
    }
}

/// A restriction as produced by the upstream relation parser.
#[derive(Debug, Clone)]
pub struct RestrictionDescriptor {
    /// Where the restriction came from, for diagnostics only.
    pub source: String,
    pub kind: RestrictionKind,
    /// Via node keys in travel order.
    pub via_nodes: Vec<(u64, Coord)>,
    /// Way between `via_nodes[i]` and `via_nodes[i + 1]`.
    pub via_ways: Vec<i64>,
    pub from_way: Option<i64>,
    pub from_node: Option<u64>,
    pub to_way: Option<i64>,
    pub to_node: Option<u64>,
    pub dir_indicator: char,
    /// Vehicles the restriction does not apply to.
    pub exceptions: AccessMask,
}

impl RestrictionDescriptor {
    /// Restriction over a single via node between two ways.
    pub fn new(source: impl Into<String>, kind: RestrictionKind, via: (u64, Coord)) -> Self {
        Self {
            source: source.into(),
            kind,
            via_nodes: vec![via],
            via_ways: Vec::new(),
            from_way: None,
            from_node: None,
            to_way: None,
            to_node: None,
            dir_indicator: '?',
            exceptions: AccessMask::NONE,
        }
    }

    pub fn direction(&self) -> DirectionHint {
        DirectionHint::from_char(self.dir_indicator)
    }
}

/// A concrete forbidden path stored at a via node.
#[derive(Debug, Clone, PartialEq)]
pub struct Restriction {
    pub(crate) arcs: Vec<ArcId>,
    pub(crate) via_nodes: Vec<NodeId>,
    pub(crate) exceptions: AccessMask,
    pub(crate) last: bool,
}

impl Restriction {
    /// `[from, via.., to]`
    pub fn arcs(&self) -> &[ArcId] {
        &self.arcs
    }

    pub fn via_nodes(&self) -> &[NodeId] {
        &self.via_nodes
    }

    pub fn exceptions(&self) -> AccessMask {
        self.exceptions
    }

    /// Last record in its node's list.
    pub fn is_last(&self) -> bool {
        self.last
    }
}

/// Position along a restriction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    From,
    /// Arcs between via node `i` and `i + 1`.
    Via(usize),
    To,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::From => f.write_str("from"),
            Stage::Via(i) => write!(f, "via[{i}]"),
            Stage::To => f.write_str("to"),
        }
    }
}

/// Why an arc was removed from a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    /// Every vehicle allowed on the road is exempt.
    NoEffectForRestrictedVehicles,
    /// Travelled against a oneway road.
    WrongOnewayDirection,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterReason::NoEffectForRestrictedVehicles => {
                f.write_str("no effect for restricted vehicles")
            }
            FilterReason::WrongOnewayDirection => f.write_str("wrong oneway direction"),
        }
    }
}

/// Why a descriptor produced no restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NoViaNodes,
    MissingViaNode(u64),
    MissingFromNode(u64),
    MissingToNode(u64),
    ViaWayMismatch { via_nodes: usize, via_ways: usize },
    NoArcs(Stage),
    AmbiguousFromWay(i64),
    Filtered { stage: Stage, reason: FilterReason },
    RevisitsVia(Stage),
    OnlyIsNoOp,
    NoThroughNeedsSingleVia,
    TooManyArcs(usize),
    InconsistentPath,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoViaNodes => f.write_str("no via node"),
            DropReason::MissingViaNode(key) => write!(f, "via node {key} not in network"),
            DropReason::MissingFromNode(key) => write!(f, "from node {key} not in network"),
            DropReason::MissingToNode(key) => write!(f, "to node {key} not in network"),
            DropReason::ViaWayMismatch { via_nodes, via_ways } => {
                write!(f, "{via_nodes} via nodes need {} via ways, got {via_ways}", via_nodes - 1)
            }
            DropReason::NoArcs(stage) => write!(f, "no {stage} arc found"),
            DropReason::AmbiguousFromWay(way) => write!(f, "from way {way} is ambiguous"),
            DropReason::Filtered { stage, reason } => write!(f, "{stage} arcs unusable: {reason}"),
            DropReason::RevisitsVia(stage) => write!(f, "every {stage} arc revisits a via node"),
            DropReason::OnlyIsNoOp => f.write_str("only restriction forbids nothing"),
            DropReason::NoThroughNeedsSingleVia => {
                f.write_str("no-through needs exactly one via node")
            }
            DropReason::TooManyArcs(n) => {
                write!(f, "{n} arcs exceed the limit of {MAX_RESTRICTION_ARCS}")
            }
            DropReason::InconsistentPath => f.write_str("no path joins the via nodes"),
        }
    }
}

/// Outcome of [`resolve_restrictions`](crate::RoadNetwork::resolve_restrictions).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionReport {
    /// Logical restrictions, one per expanded path.
    pub added: usize,
    /// Physical records, one per via node of each path.
    pub records: usize,
    /// Descriptors that produced nothing.
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_hint_chars() {
        assert_eq!(DirectionHint::from_char('l'), DirectionHint::Left);
        assert_eq!(DirectionHint::from_char('r'), DirectionHint::Right);
        assert_eq!(DirectionHint::from_char('u'), DirectionHint::UTurn);
        assert_eq!(DirectionHint::from_char('s'), DirectionHint::Straight);
        assert_eq!(DirectionHint::from_char('x'), DirectionHint::Unknown);
        assert_eq!(DirectionHint::Unknown.ideal_angle(), None);
    }

    #[test]
    fn test_drop_reason_names_stage() {
        let reason = DropReason::Filtered {
            stage: Stage::Via(1),
            reason: FilterReason::WrongOnewayDirection,
        };
        assert_eq!(reason.to_string(), "via[1] arcs unusable: wrong oneway direction");
        assert_eq!(
            DropReason::ViaWayMismatch { via_nodes: 3, via_ways: 1 }.to_string(),
            "3 via nodes need 2 via ways, got 1"
        );
    }
}
