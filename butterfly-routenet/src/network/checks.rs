//! Consistency checks that point at upstream modelling problems.
//!
//! Every finding is a warning; the map stays usable.

use butterfly_common::geo::bearing_delta;
use tracing::{info, warn};

use super::{ArcId, NodeId, Pass, RoadNetwork, RouteArc};
use crate::error::Result;

/// Arcs closer than this in length (metres) and bearing (degrees) look duplicated.
const SIMILAR_LENGTH_M: f64 = 0.5;
const SIMILAR_BEARING_DEG: f64 = 1.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub roundabout_issues: usize,
    pub flare_issues: usize,
    pub similar_arcs: usize,
}

impl RoadNetwork {
    /// Run the checks enabled in the configuration.
    pub fn check(&mut self) -> Result<CheckReport> {
        self.begin_pass(Pass::Check)?;

        let mut report = CheckReport::default();
        if self.config.check_roundabouts {
            report.roundabout_issues = self.check_roundabouts();
        }
        if self.config.check_roundabout_flares {
            report.flare_issues = self.check_roundabout_flares(self.config.max_flare_length_ratio);
        }
        if self.config.report_similar_arcs {
            report.similar_arcs = self.report_similar_arcs();
        }

        if report != CheckReport::default() {
            info!(
                roundabout = report.roundabout_issues,
                flares = report.flare_issues,
                similar_arcs = report.similar_arcs,
                "consistency checks found issues"
            );
        }
        Ok(report)
    }

    fn check_roundabouts(&self) -> usize {
        let mut issues = 0;

        for road in self.roads.iter().filter(|r| r.is_routable() && r.def.roundabout) {
            if !road.def.oneway {
                warn!(way_id = road.def.way_id, "roundabout road is not oneway");
                issues += 1;
            }
        }

        for (id, node) in self.nodes() {
            let mut leaving = 0;
            let mut arriving = 0;
            for (_, arc) in self.direct_arcs(id) {
                if !self.roads[arc.road.index()].def.roundabout {
                    continue;
                }
                if arc.forward {
                    leaving += 1;
                } else {
                    arriving += 1;
                }
            }
            if leaving > 1 {
                warn!(node = node.key, leaving, "roundabout forks");
                issues += 1;
            }
            if arriving > 1 {
                warn!(node = node.key, arriving, "roundabouts merge or overlap");
                issues += 1;
            }
        }
        issues
    }

    /// A flare is a pair of roads `A -> C -> B` beside the roundabout arc
    /// `A -> B`, typically a split entry/exit.
    fn check_roundabout_flares(&self, max_ratio: u32) -> usize {
        let mut issues = 0;

        for (a, _) in self.nodes() {
            for (_, ab) in self.direct_arcs(a) {
                if !ab.forward || !self.is_roundabout(ab) {
                    continue;
                }
                for (_, ac) in self.direct_arcs(a) {
                    if self.is_roundabout(ac) || ac.dest == ab.dest || ac.dest == a {
                        continue;
                    }
                    let Some(cb) = self.flare_return(ac.dest, ab.dest) else {
                        continue;
                    };
                    let flare_len = ac.length + cb.length;
                    if max_ratio > 0 && flare_len > ab.length * f64::from(max_ratio) {
                        continue;
                    }
                    issues += self.check_flare_pair(a, ac, cb);
                }
            }
        }
        issues
    }

    fn flare_return(&self, c: NodeId, b: NodeId) -> Option<&RouteArc> {
        self.direct_arcs(c)
            .map(|(_, arc)| arc)
            .find(|arc| arc.dest == b && !self.is_roundabout(arc))
    }

    fn check_flare_pair(&self, a: NodeId, out: &RouteArc, back: &RouteArc) -> usize {
        let mut issues = 0;
        let node = self.nodes[a.index()].key;
        for arc in [out, back] {
            let def = &self.roads[arc.road.index()].def;
            if !def.oneway {
                warn!(node, way_id = def.way_id, "roundabout flare road is not oneway");
                issues += 1;
            } else if !arc.forward {
                warn!(
                    node,
                    way_id = def.way_id,
                    "roundabout flare road runs against the roundabout"
                );
                issues += 1;
            }
        }
        let out_def = &self.roads[out.road.index()].def;
        let back_def = &self.roads[back.road.index()].def;
        if out_def.class != back_def.class {
            warn!(
                node,
                out_way = out_def.way_id,
                back_way = back_def.way_id,
                "roundabout flare roads differ in class"
            );
            issues += 1;
        }
        issues
    }

    fn report_similar_arcs(&self) -> usize {
        let mut found = 0;
        for (id, node) in self.nodes() {
            let arcs: Vec<(ArcId, &RouteArc)> = self
                .direct_arcs(id)
                .filter(|(_, a)| !self.roads[a.road.index()].def.synthesised)
                .collect();
            for (i, (_, first)) in arcs.iter().enumerate() {
                for (_, second) in &arcs[i + 1..] {
                    if first.dest == second.dest
                        && (first.length - second.length).abs() < SIMILAR_LENGTH_M
                        && bearing_delta(first.initial_bearing, second.initial_bearing).abs()
                            < SIMILAR_BEARING_DEG
                    {
                        warn!(
                            node = node.key,
                            way_a = self.roads[first.road.index()].def.way_id,
                            way_b = self.roads[second.road.index()].def.way_id,
                            "similar arcs, possibly duplicated ways"
                        );
                        found += 1;
                    }
                }
            }
        }
        found
    }

    fn is_roundabout(&self, arc: &RouteArc) -> bool {
        self.roads[arc.road.index()].def.roundabout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetConfig;
    use crate::network::tests::{at, straight};
    use crate::road::RoadDef;

    fn all_checks() -> NetConfig {
        NetConfig {
            check_roundabouts: true,
            check_roundabout_flares: true,
            max_flare_length_ratio: 5,
            report_similar_arcs: true,
            ..NetConfig::default()
        }
    }

    fn roundabout(way_id: i64) -> RoadDef {
        RoadDef {
            roundabout: true,
            oneway: true,
            ..RoadDef::new(way_id, 2)
        }
    }

    fn oneway(way_id: i64) -> RoadDef {
        RoadDef {
            oneway: true,
            ..RoadDef::new(way_id, 2)
        }
    }

    #[test]
    fn test_clean_roundabout_has_no_issues() {
        let mut net = RoadNetwork::new(all_checks());
        let ring = [at(1, 0.0, 30.0), at(2, 120.0, 30.0), at(3, -120.0, 30.0), at(1, 0.0, 30.0)];
        straight(&mut net, roundabout(1), &ring);
        net.resolve_restrictions().unwrap();
        assert_eq!(net.check().unwrap(), CheckReport::default());
    }

    #[test]
    fn test_two_way_roundabout_and_fork_reported() {
        let mut net = RoadNetwork::new(all_checks());
        let two_way = RoadDef {
            oneway: false,
            ..roundabout(1)
        };
        straight(&mut net, two_way, &[at(1, 0.0, 30.0), at(2, 120.0, 30.0)]);
        straight(&mut net, roundabout(2), &[at(1, 0.0, 30.0), at(3, -120.0, 30.0)]);
        net.resolve_restrictions().unwrap();
        let report = net.check().unwrap();
        // not oneway + two roundabout arcs leaving node 1
        assert_eq!(report.roundabout_issues, 2);
    }

    #[test]
    fn test_flare_with_two_way_leg_reported() {
        let mut net = RoadNetwork::new(all_checks());
        straight(&mut net, roundabout(1), &[at(1, 0.0, 30.0), at(2, 90.0, 30.0)]);
        straight(&mut net, oneway(2), &[at(1, 0.0, 30.0), at(9, 45.0, 80.0)]);
        straight(&mut net, RoadDef::new(3, 2), &[at(9, 45.0, 80.0), at(2, 90.0, 30.0)]);
        net.resolve_restrictions().unwrap();
        let report = net.check().unwrap();
        assert_eq!(report.flare_issues, 1);
    }

    #[test]
    fn test_long_flare_is_ignored() {
        let mut net = RoadNetwork::new(NetConfig {
            max_flare_length_ratio: 1,
            ..all_checks()
        });
        straight(&mut net, roundabout(1), &[at(1, 0.0, 30.0), at(2, 90.0, 30.0)]);
        straight(&mut net, oneway(2), &[at(1, 0.0, 30.0), at(9, 45.0, 300.0)]);
        straight(&mut net, RoadDef::new(3, 2), &[at(9, 45.0, 300.0), at(2, 90.0, 30.0)]);
        net.resolve_restrictions().unwrap();
        assert_eq!(net.check().unwrap().flare_issues, 0);
    }

    #[test]
    fn test_duplicated_ways_reported_as_similar() {
        let mut net = RoadNetwork::new(all_checks());
        straight(&mut net, RoadDef::new(1, 1), &[at(1, 0.0, 0.0), at(2, 0.0, 100.0)]);
        straight(&mut net, RoadDef::new(2, 1), &[at(1, 0.0, 0.0), at(2, 0.0, 100.0)]);
        net.resolve_restrictions().unwrap();
        // once at each end
        assert_eq!(net.check().unwrap().similar_arcs, 2);
    }

    #[test]
    fn test_checks_disabled_by_default() {
        let mut net = RoadNetwork::new(NetConfig::default());
        straight(&mut net, RoadDef::new(1, 1), &[at(1, 0.0, 0.0), at(2, 0.0, 100.0)]);
        straight(&mut net, RoadDef::new(2, 1), &[at(1, 0.0, 0.0), at(2, 0.0, 100.0)]);
        net.resolve_restrictions().unwrap();
        assert_eq!(net.check().unwrap(), CheckReport::default());
    }
}
