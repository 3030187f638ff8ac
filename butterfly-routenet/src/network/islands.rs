//! Disconnected sub-network ("island") detection and removal

use rustc_hash::FxHashSet;
use tracing::{debug, info};

use super::{NodeId, Pass, RoadNetwork};
use crate::error::Result;
use crate::road::RoadId;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IslandReport {
    pub components: usize,
    pub discarded_components: usize,
    pub discarded_nodes: usize,
    pub discarded_roads: usize,
}

impl RoadNetwork {
    /// Find connected components and discard the small ones.
    ///
    /// Threshold is `routing_island_len` in metres: negative disables the
    /// pass, zero discards every component that does not reach the tile
    /// boundary, positive discards such components shorter than the threshold.
    pub fn remove_islands(&mut self) -> Result<IslandReport> {
        self.begin_pass(Pass::Islands)?;

        let threshold = self.config.routing_island_len;
        let mut report = IslandReport::default();
        if threshold < 0 {
            debug!("island detection disabled");
            return Ok(report);
        }

        let mut visited = vec![0u32; self.nodes.len()];
        let mut visit_id = 0u32;

        for start in 0..self.nodes.len() {
            if visited[start] != 0 || self.nodes[start].discarded {
                continue;
            }
            visit_id += 1;
            let component = self.collect_component(NodeId(start as u32), visit_id, &mut visited);
            report.components += 1;

            if component.iter().any(|n| self.nodes[n.index()].boundary) {
                continue;
            }
            let roads = self.component_roads(&component);
            let length: f64 = roads.iter().map(|r| self.roads[r.index()].length).sum();
            if threshold > 0 && length >= f64::from(threshold) {
                continue;
            }

            info!(
                nodes = component.len(),
                roads = roads.len(),
                length_m = length.round(),
                first_key = self.nodes[component[0].index()].key,
                "discarding routing island"
            );
            for node in &component {
                self.nodes[node.index()].discarded = true;
            }
            for road in &roads {
                self.roads[road.index()].def.skip = true;
            }
            report.discarded_components += 1;
            report.discarded_nodes += component.len();
            report.discarded_roads += roads.len();
        }

        self.cleanup_node_table();
        info!(
            components = report.components,
            discarded = report.discarded_components,
            "island detection complete"
        );
        Ok(report)
    }

    /// Undirected traversal over direct arcs, tagging nodes with `visit_id`.
    fn collect_component(
        &self,
        start: NodeId,
        visit_id: u32,
        visited: &mut [u32],
    ) -> Vec<NodeId> {
        let mut component = Vec::new();
        let mut stack = vec![start];
        visited[start.index()] = visit_id;

        while let Some(node) = stack.pop() {
            component.push(node);
            for (_, arc) in self.direct_arcs(node) {
                let next = arc.dest;
                if visited[next.index()] == 0 && !self.nodes[next.index()].discarded {
                    visited[next.index()] = visit_id;
                    stack.push(next);
                }
            }
        }
        component
    }

    /// Roads with a direct arc in the component, plus roads starting in it.
    fn component_roads(&self, component: &[NodeId]) -> Vec<RoadId> {
        let mut seen = FxHashSet::default();
        let mut roads = Vec::new();
        for &node in component {
            let arc_roads = self.direct_arcs(node).map(|(_, a)| a.road);
            let start_roads = self.road_starts.get(&node).into_iter().flatten().copied();
            for road in arc_roads.chain(start_roads) {
                if seen.insert(road) {
                    roads.push(road);
                }
            }
        }
        roads
    }

    /// Drop discarded nodes from the live key table.
    fn cleanup_node_table(&mut self) {
        let nodes = &self.nodes;
        self.node_table.retain(|_, id| !nodes[id.index()].discarded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetConfig;
    use crate::network::tests::{at, straight, ORIGIN};
    use crate::road::{RoadDef, RoadPoint};

    fn config(threshold: i32) -> NetConfig {
        NetConfig {
            routing_island_len: threshold,
            ..NetConfig::default()
        }
    }

    /// Main line 1-2-3 with boundary end at 3, plus an isolated 10-11 stub.
    fn network(threshold: i32, stub_len: f64) -> RoadNetwork {
        let mut net = RoadNetwork::new(config(threshold));
        let boundary = RoadPoint {
            boundary: true,
            ..at(3, 0.0, 2000.0)
        };
        let main = [at(1, 0.0, 0.0), at(2, 0.0, 1000.0), boundary];
        straight(&mut net, RoadDef::new(1, 2), &main);
        let stub = [at(10, 90.0, 500.0), at(11, 90.0, 500.0 + stub_len)];
        straight(&mut net, RoadDef::new(2, 0), &stub);
        net.resolve_restrictions().unwrap();
        net
    }

    #[test]
    fn test_negative_threshold_disables() {
        let mut net = network(-1, 100.0);
        let report = net.remove_islands().unwrap();
        assert_eq!(report, IslandReport::default());
        assert_eq!(net.node_count(), 5);
    }

    #[test]
    fn test_short_island_removed_boundary_component_kept() {
        let mut net = network(500, 100.0);
        let report = net.remove_islands().unwrap();
        assert_eq!(report.components, 2);
        assert_eq!(report.discarded_components, 1);
        assert_eq!(report.discarded_nodes, 2);
        assert!(net.node_by_key(10).is_none());
        assert!(net.node_by_key(1).is_some());
        assert!(!net.road(RoadId(1)).is_routable());
        assert!(net.road(RoadId(0)).is_routable());
    }

    #[test]
    fn test_long_island_survives_positive_threshold() {
        let mut net = network(500, 800.0);
        let report = net.remove_islands().unwrap();
        assert_eq!(report.discarded_components, 0);
        assert!(net.node_by_key(10).is_some());
    }

    #[test]
    fn test_zero_threshold_removes_every_inner_component() {
        let mut net = network(0, 5000.0);
        let report = net.remove_islands().unwrap();
        assert_eq!(report.discarded_components, 1);
        assert!(net.node_by_key(11).is_none());
        assert_eq!(net.node_count(), 3);
    }

    #[test]
    fn test_visit_ids_cover_component() {
        let net = network(0, 100.0);
        let mut visited = vec![0u32; net.nodes.len()];
        let start = net.node_by_key(1).unwrap();
        let component = net.collect_component(start, 7, &mut visited);
        assert_eq!(component.len(), 3);
        assert_eq!(visited.iter().filter(|&&v| v == 7).count(), 3);
    }

    /// Stub 10-11 of 100 m plus a 400 m road whose only routing node is 11.
    fn network_with_tail(threshold: i32) -> RoadNetwork {
        let mut net = RoadNetwork::new(config(threshold));
        let boundary = RoadPoint {
            boundary: true,
            ..at(3, 0.0, 2000.0)
        };
        straight(&mut net, RoadDef::new(1, 2), &[at(1, 0.0, 0.0), boundary]);
        straight(&mut net, RoadDef::new(2, 0), &[at(10, 90.0, 500.0), at(11, 90.0, 600.0)]);
        let tail = [at(11, 90.0, 600.0), RoadPoint::shape(ORIGIN.offset(90.0, 1000.0))];
        straight(&mut net, RoadDef::new(3, 0), &tail);
        net.resolve_restrictions().unwrap();
        net
    }

    #[test]
    fn test_road_starting_in_island_counts_towards_length() {
        let mut net = network_with_tail(450);
        assert!(net.direct_arcs(net.node_by_key(11).unwrap()).all(|(_, a)| a.road != RoadId(2)));
        let report = net.remove_islands().unwrap();
        assert_eq!(report.discarded_components, 0);
        assert!(net.node_by_key(11).is_some());
        assert!(net.road(RoadId(2)).is_routable());
    }

    #[test]
    fn test_road_starting_in_island_is_skipped_with_it() {
        let mut net = network_with_tail(1000);
        let report = net.remove_islands().unwrap();
        assert_eq!(report.discarded_components, 1);
        assert_eq!(report.discarded_roads, 2);
        assert!(!net.road(RoadId(1)).is_routable());
        assert!(!net.road(RoadId(2)).is_routable());
        assert!(net.road(RoadId(0)).is_routable());
    }
}
