//! The routing network of one tile.
//!
//! ## Pipeline
//!
//! 1. `add_road` / `add_restriction` for every input element
//! 2. `resolve_restrictions` (graph is complete from here on)
//! 3. `check`, `remove_islands`, `add_shortcuts` in any order, each at most once
//! 4. `partition`, after which the network is frozen
//!
//! [`RoadNetwork::compile`] runs steps 2-4 in that order.
//!
//! Nodes and arcs live in arenas owned by the network and are addressed by
//! [`NodeId`] and [`ArcId`]. A node holds the ids of its outgoing arcs; the
//! forward/reverse pairing of direct arcs is an id lookup.

mod arc;
mod builder;
mod checks;
mod islands;
mod node;
mod shortcuts;

use std::fmt;

use butterfly_common::Coord;
use rustc_hash::FxHashMap;
use tracing::info;

pub use arc::{ArcId, RouteArc};
pub use checks::CheckReport;
pub use islands::IslandReport;
pub use node::{NodeId, RouteNode};

use crate::config::NetConfig;
use crate::error::{NetError, Result};
use crate::partition::{CapacityModel, PartitionSet, Partitioner};
use crate::restriction::{RestrictionDescriptor, RestrictionReport};
use crate::road::{Road, RoadId};

/// Where a network is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    /// Roads and restriction descriptors are being registered.
    Ingesting,
    /// Restrictions resolved; optimisation passes may run.
    Resolved,
    /// Partitions assigned; nothing may change any more.
    Partitioned,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::Ingesting => "ingesting",
            BuildStage::Resolved => "resolved",
            BuildStage::Partitioned => "partitioned",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Pass {
    Check,
    Islands,
    Shortcuts,
}

impl Pass {
    fn name(self) -> &'static str {
        match self {
            Pass::Check => "check",
            Pass::Islands => "remove_islands",
            Pass::Shortcuts => "add_shortcuts",
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PassLog {
    checked: bool,
    islands: bool,
    shortcuts: bool,
}

/// Everything `compile` did, for the caller's logs.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CompileSummary {
    pub roads: usize,
    pub nodes: usize,
    pub arcs: usize,
    pub restrictions: RestrictionReport,
    pub checks: CheckReport,
    pub islands: IslandReport,
    pub shortcuts: usize,
    pub partitions: usize,
}

pub struct RoadNetwork {
    pub(crate) config: NetConfig,
    pub(crate) stage: BuildStage,
    pub(crate) nodes: Vec<RouteNode>,
    node_table: FxHashMap<u64, NodeId>,
    pub(crate) arcs: Vec<RouteArc>,
    pub(crate) roads: Vec<Road>,
    /// Roads by their first routing node.
    road_starts: FxHashMap<NodeId, Vec<RoadId>>,
    pub(crate) pending_restrictions: Vec<RestrictionDescriptor>,
    passes: PassLog,
    partitions: Option<PartitionSet>,
}

impl RoadNetwork {
    pub fn new(config: NetConfig) -> Self {
        Self {
            config,
            stage: BuildStage::Ingesting,
            nodes: Vec::new(),
            node_table: FxHashMap::default(),
            arcs: Vec::new(),
            roads: Vec::new(),
            road_starts: FxHashMap::default(),
            pending_restrictions: Vec::new(),
            passes: PassLog::default(),
            partitions: None,
        }
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// Run every pass after ingestion and partition with the configured capacity.
    pub fn compile(&mut self) -> Result<CompileSummary> {
        let restrictions = self.resolve_restrictions()?;
        let checks = self.check()?;
        let islands = self.remove_islands()?;
        let shortcuts = self.add_shortcuts()?;
        let capacity = self.config.partition;
        let partitions = self.partition_with(&capacity)?.len();

        let summary = CompileSummary {
            roads: self.roads.iter().filter(|r| r.is_routable()).count(),
            nodes: self.node_table.len(),
            arcs: self.arcs.len(),
            restrictions,
            checks,
            islands,
            shortcuts,
            partitions,
        };
        info!(
            roads = summary.roads,
            nodes = summary.nodes,
            arcs = summary.arcs,
            partitions = summary.partitions,
            "routing network compiled"
        );
        Ok(summary)
    }

    /// Assign node groups and split live nodes into partitions.
    pub fn partition(&mut self) -> Result<&PartitionSet> {
        let capacity = self.config.partition;
        self.partition_with(&capacity)
    }

    /// Like [`partition`](Self::partition) with a caller supplied capacity contract.
    pub fn partition_with<C: CapacityModel>(&mut self, capacity: &C) -> Result<&PartitionSet> {
        self.require_stage(BuildStage::Resolved, "partition")?;

        let live: Vec<NodeId> = self.live_node_ids().collect();
        for &id in &live {
            let group = self.compute_group(id);
            self.nodes[id.index()].group = group;
        }

        let mut ordered = live;
        ordered.sort_by_key(|&id| {
            let node = &self.nodes[id.index()];
            (node.group, node.key)
        });

        let set = Partitioner::new(self, capacity).run(ordered)?;
        info!(partitions = set.len(), "nodes partitioned");
        self.stage = BuildStage::Partitioned;
        Ok(self.partitions.insert(set))
    }

    pub fn partitions(&self) -> Result<&PartitionSet> {
        self.partitions.as_ref().ok_or(NetError::NotPartitioned)
    }

    // ---- lookups ----

    pub fn node(&self, id: NodeId) -> &RouteNode {
        &self.nodes[id.index()]
    }

    /// Live node for an upstream coordinate id.
    pub fn node_by_key(&self, key: u64) -> Option<NodeId> {
        self.node_table.get(&key).copied()
    }

    /// Live (not discarded) nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &RouteNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.discarded)
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn node_count(&self) -> usize {
        self.node_table.len()
    }

    pub fn arc(&self, id: ArcId) -> &RouteArc {
        &self.arcs[id.index()]
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// Outgoing arcs of a node in list order.
    pub fn arcs_of(&self, node: NodeId) -> impl Iterator<Item = (ArcId, &RouteArc)> + '_ {
        self.nodes[node.index()]
            .arcs
            .iter()
            .map(move |&id| (id, &self.arcs[id.index()]))
    }

    pub(crate) fn direct_arcs(
        &self,
        node: NodeId,
    ) -> impl Iterator<Item = (ArcId, &RouteArc)> + '_ {
        self.arcs_of(node).filter(|(_, a)| a.is_direct())
    }

    pub fn road(&self, id: RoadId) -> &Road {
        &self.roads[id.index()]
    }

    pub fn roads(&self) -> impl Iterator<Item = (RoadId, &Road)> + '_ {
        self.roads
            .iter()
            .enumerate()
            .map(|(i, r)| (RoadId(i as u32), r))
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    // ---- internals shared by the passes ----

    pub(crate) fn require_stage(&self, expected: BuildStage, op: &'static str) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(NetError::WrongStage {
                op,
                stage: self.stage,
            })
        }
    }

    fn live_node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes().map(|(id, _)| id)
    }

    /// First reference creates the node, later ones return it.
    pub(crate) fn ensure_node(&mut self, key: u64, coord: Coord, boundary: bool) -> NodeId {
        if let Some(&id) = self.node_table.get(&key) {
            let node = &mut self.nodes[id.index()];
            node.boundary |= boundary;
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(RouteNode::new(key, coord, boundary));
        self.node_table.insert(key, id);
        id
    }

    fn compute_group(&self, id: NodeId) -> u8 {
        let mut seen: Vec<RoadId> = Vec::new();
        let mut classes: Vec<u8> = Vec::new();
        for (_, arc) in self.direct_arcs(id) {
            if !seen.contains(&arc.road) {
                seen.push(arc.road);
                classes.push(self.roads[arc.road.index()].def.class);
            }
        }
        node::node_group(&classes, self.nodes[id.index()].class)
    }

    /// Optimisation passes need a resolved graph and run at most once.
    pub(crate) fn begin_pass(&mut self, pass: Pass) -> Result<()> {
        self.require_stage(BuildStage::Resolved, pass.name())?;
        let done = match pass {
            Pass::Check => &mut self.passes.checked,
            Pass::Islands => &mut self.passes.islands,
            Pass::Shortcuts => &mut self.passes.shortcuts,
        };
        if *done {
            return Err(NetError::PassRepeated { pass: pass.name() });
        }
        *done = true;
        Ok(())
    }
}
