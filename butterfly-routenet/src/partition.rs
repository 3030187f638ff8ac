//! Capacity-bounded partitions of the finished network.
//!
//! Nodes arrive sorted by group. The partitioner bisects their bounding box
//! on the longer axis until every part fits the capacity contract, keeping
//! the incoming order inside each part.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arc_class::{ArcClassTable, MAX_ARC_CLASSES};
use crate::error::{NetError, Result};
use crate::network::{NodeId, RoadNetwork};
use crate::road::RoadId;

/// Size of a candidate partition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartitionStats {
    pub nodes: usize,
    /// Outgoing arcs, shortcuts included.
    pub arcs: usize,
    /// Distinct roads referenced by those arcs.
    pub roads: usize,
    pub span_lat: f64,
    pub span_lon: f64,
}

/// Limits a partition must respect. Implemented by the downstream writer.
pub trait CapacityModel {
    fn admits(&self, stats: &PartitionStats) -> bool;

    /// Node ceiling, reported when a single node cannot be placed.
    fn max_nodes(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartitionCapacity {
    pub max_nodes: usize,
    pub max_arcs: usize,
    /// Largest latitude or longitude extent in degrees.
    pub max_span: f64,
}

impl Default for PartitionCapacity {
    fn default() -> Self {
        Self {
            max_nodes: 1024,
            max_arcs: 4096,
            max_span: 0.25,
        }
    }
}

impl CapacityModel for PartitionCapacity {
    fn admits(&self, stats: &PartitionStats) -> bool {
        stats.nodes <= self.max_nodes
            && stats.arcs <= self.max_arcs
            && stats.roads <= MAX_ARC_CLASSES
            && stats.span_lat.max(stats.span_lon) <= self.max_span
    }

    fn max_nodes(&self) -> usize {
        self.max_nodes
    }
}

#[derive(Debug, Clone)]
pub struct Partition {
    index: usize,
    nodes: Vec<NodeId>,
    arc_classes: ArcClassTable,
    /// First restriction record and record count per node.
    restriction_slots: FxHashMap<NodeId, (usize, usize)>,
    restriction_count: usize,
}

impl Partition {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Nodes in group order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn arc_classes(&self) -> &ArcClassTable {
        &self.arc_classes
    }

    pub fn arc_class_index(&self, road: RoadId) -> Result<u8> {
        self.arc_classes.lookup(road)
    }

    /// Record number of the `i`th restriction stored at `node`.
    pub fn restriction_offset(&self, node: NodeId, i: usize) -> Option<usize> {
        let &(start, count) = self.restriction_slots.get(&node)?;
        (i < count).then_some(start + i)
    }

    pub fn restriction_count(&self) -> usize {
        self.restriction_count
    }
}

#[derive(Debug, Clone, Default)]
pub struct PartitionSet {
    partitions: Vec<Partition>,
    node_partition: FxHashMap<NodeId, usize>,
}

impl PartitionSet {
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Partition> {
        self.partitions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> + '_ {
        self.partitions.iter()
    }

    pub fn partition_of(&self, node: NodeId) -> Option<usize> {
        self.node_partition.get(&node).copied()
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Lat,
    Lon,
}

pub(crate) struct Partitioner<'a, C> {
    network: &'a RoadNetwork,
    capacity: &'a C,
}

impl<'a, C: CapacityModel> Partitioner<'a, C> {
    pub(crate) fn new(network: &'a RoadNetwork, capacity: &'a C) -> Self {
        Self { network, capacity }
    }

    pub(crate) fn run(self, ordered: Vec<NodeId>) -> Result<PartitionSet> {
        let mut parts = Vec::new();
        if !ordered.is_empty() {
            self.split(ordered, &mut parts)?;
        }

        let mut set = PartitionSet::default();
        for (index, nodes) in parts.into_iter().enumerate() {
            let partition = self.build(index, nodes)?;
            debug!(
                index,
                nodes = partition.nodes.len(),
                arc_classes = partition.arc_classes.len(),
                restrictions = partition.restriction_count,
                "partition built"
            );
            for &node in &partition.nodes {
                set.node_partition.insert(node, index);
            }
            set.partitions.push(partition);
        }
        Ok(set)
    }

    fn split(&self, nodes: Vec<NodeId>, out: &mut Vec<Vec<NodeId>>) -> Result<()> {
        let stats = self.stats(&nodes);
        if self.capacity.admits(&stats) {
            out.push(nodes);
            return Ok(());
        }
        if nodes.len() == 1 {
            return Err(NetError::CapacityOverflow {
                what: "partition",
                limit: self.capacity.max_nodes(),
            });
        }

        let axes = if stats.span_lat >= stats.span_lon {
            [Axis::Lat, Axis::Lon]
        } else {
            [Axis::Lon, Axis::Lat]
        };
        for axis in axes {
            if let Some((low, high)) = self.bisect(&nodes, axis) {
                self.split(low, out)?;
                return self.split(high, out);
            }
        }

        // every node on the same coordinate
        let mut low = nodes;
        let high = low.split_off(low.len() / 2);
        self.split(low, out)?;
        self.split(high, out)
    }

    /// Median split along `axis`; `None` when all nodes share that value.
    fn bisect(&self, nodes: &[NodeId], axis: Axis) -> Option<(Vec<NodeId>, Vec<NodeId>)> {
        let value = |id: &NodeId| {
            let coord = self.network.node(*id).coord();
            match axis {
                Axis::Lat => coord.lat,
                Axis::Lon => coord.lon,
            }
        };
        let mut sorted: Vec<f64> = nodes.iter().map(value).collect();
        sorted.sort_by(f64::total_cmp);
        let median = sorted[sorted.len() / 2];

        let below: (Vec<NodeId>, Vec<NodeId>) =
            nodes.iter().copied().partition(|id| value(id) < median);
        if !below.0.is_empty() && !below.1.is_empty() {
            return Some(below);
        }
        let upto: (Vec<NodeId>, Vec<NodeId>) =
            nodes.iter().copied().partition(|id| value(id) <= median);
        (!upto.0.is_empty() && !upto.1.is_empty()).then_some(upto)
    }

    fn stats(&self, nodes: &[NodeId]) -> PartitionStats {
        let mut roads = FxHashSet::default();
        let mut arcs = 0;
        let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
        let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);

        for &id in nodes {
            let coord = self.network.node(id).coord();
            min_lat = min_lat.min(coord.lat);
            max_lat = max_lat.max(coord.lat);
            min_lon = min_lon.min(coord.lon);
            max_lon = max_lon.max(coord.lon);
            for (_, arc) in self.network.arcs_of(id) {
                arcs += 1;
                roads.insert(arc.road());
            }
        }

        PartitionStats {
            nodes: nodes.len(),
            arcs,
            roads: roads.len(),
            span_lat: (max_lat - min_lat).max(0.0),
            span_lon: (max_lon - min_lon).max(0.0),
        }
    }

    fn build(&self, index: usize, nodes: Vec<NodeId>) -> Result<Partition> {
        let mut arc_classes = ArcClassTable::new();
        let mut restriction_slots = FxHashMap::default();
        let mut restriction_count = 0;

        for &id in &nodes {
            for (_, arc) in self.network.arcs_of(id) {
                arc_classes.register(arc.road(), self.network.road(arc.road()).def())?;
            }
            let count = self.network.node(id).restrictions().len();
            if count > 0 {
                restriction_slots.insert(id, (restriction_count, count));
                restriction_count += count;
            }
        }
        arc_classes.freeze();

        Ok(Partition {
            index,
            nodes,
            arc_classes,
            restriction_slots,
            restriction_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetConfig;
    use crate::network::tests::{at, straight};
    use crate::road::RoadDef;

    struct MaxNodes(usize);

    impl CapacityModel for MaxNodes {
        fn admits(&self, stats: &PartitionStats) -> bool {
            stats.nodes <= self.0
        }

        fn max_nodes(&self) -> usize {
            self.0
        }
    }

    struct NoArcs;

    impl CapacityModel for NoArcs {
        fn admits(&self, stats: &PartitionStats) -> bool {
            stats.arcs == 0
        }

        fn max_nodes(&self) -> usize {
            usize::MAX
        }
    }

    fn line(nodes: u64) -> RoadNetwork {
        let mut net = RoadNetwork::new(NetConfig::default());
        let points: Vec<_> = (0..nodes).map(|i| at(i + 1, 45.0, i as f64 * 50.0)).collect();
        straight(&mut net, RoadDef::new(1, 2), &points);
        net.resolve_restrictions().unwrap();
        net
    }

    #[test]
    fn test_every_node_in_exactly_one_partition() {
        let mut net = line(10);
        let set = net.partition_with(&MaxNodes(3)).unwrap();
        assert!(set.len() >= 4);
        let mut seen = FxHashSet::default();
        for partition in set.iter() {
            assert!(partition.nodes().len() <= 3);
            for &node in partition.nodes() {
                assert!(seen.insert(node));
                assert_eq!(set.partition_of(node), Some(partition.index()));
            }
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn test_coincident_nodes_split_by_count() {
        let mut net = RoadNetwork::new(NetConfig::default());
        for i in 0..4u64 {
            let points = [at(10 + i, 0.0, 0.0), at(20 + i, 0.0, 0.0)];
            straight(&mut net, RoadDef::new(i as i64, 1), &points);
        }
        net.resolve_restrictions().unwrap();
        let set = net.partition_with(&MaxNodes(2)).unwrap();
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_single_node_over_capacity_is_fatal() {
        let mut net = line(2);
        assert!(matches!(
            net.partition_with(&NoArcs),
            Err(NetError::CapacityOverflow { what: "partition", .. })
        ));
    }

    #[test]
    fn test_empty_network_has_no_partitions() {
        let mut net = RoadNetwork::new(NetConfig::default());
        net.resolve_restrictions().unwrap();
        assert!(net.partition().unwrap().is_empty());
    }

    #[test]
    fn test_arc_classes_are_frozen_per_partition() {
        let mut net = line(4);
        let set = net.partition().unwrap();
        assert_eq!(set.len(), 1);
        let partition = set.get(0).unwrap();
        assert_eq!(partition.arc_classes().len(), 1);
        assert_eq!(partition.arc_class_index(RoadId(0)).unwrap(), 0);
        assert!(matches!(
            partition.arc_class_index(RoadId(7)),
            Err(NetError::UnknownRoad(RoadId(7)))
        ));
    }

    #[test]
    fn test_default_capacity_respects_span() {
        let capacity = PartitionCapacity::default();
        let stats = PartitionStats {
            nodes: 10,
            arcs: 10,
            roads: 1,
            span_lat: 0.3,
            span_lon: 0.0,
        };
        assert!(!capacity.admits(&stats));
        assert!(capacity.admits(&PartitionStats { span_lat: 0.1, ..stats }));
        assert!(!capacity.admits(&PartitionStats { roads: 300, span_lat: 0.1, ..stats }));
    }
}
