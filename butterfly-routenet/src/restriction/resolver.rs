//! Descriptor → arc path resolution.

use butterfly_common::geo::bearing_delta;
use tracing::{debug, info, warn};

use super::{
    choose_group, AngleChoice, DropReason, FilterReason, Restriction, RestrictionDescriptor,
    RestrictionKind, RestrictionReport, Stage, MAX_RESTRICTION_ARCS,
};
use crate::error::Result;
use crate::network::{ArcId, BuildStage, NodeId, RoadNetwork, RouteArc};
use crate::road::AccessMask;

/// Arcs shorter than this make turning angles meaningless.
const NEAR_ZERO_LENGTH_M: f64 = 0.5;

type Resolution<T> = std::result::Result<T, DropReason>;

/// Via nodes plus every concrete `[from, via.., to]` path of one descriptor.
struct Resolved {
    via: Vec<NodeId>,
    paths: Vec<Vec<ArcId>>,
}

impl RoadNetwork {
    /// Queue a restriction; it is resolved once the graph is complete.
    pub fn add_restriction(&mut self, desc: RestrictionDescriptor) -> Result<()> {
        self.require_stage(BuildStage::Ingesting, "add_restriction")?;
        self.pending_restrictions.push(desc);
        Ok(())
    }

    /// Resolve every queued descriptor and close ingestion.
    ///
    /// Descriptors that cannot be resolved are logged and counted, never fatal.
    pub fn resolve_restrictions(&mut self) -> Result<RestrictionReport> {
        self.require_stage(BuildStage::Ingesting, "resolve_restrictions")?;

        let pending = std::mem::take(&mut self.pending_restrictions);
        let mut report = RestrictionReport::default();

        for desc in &pending {
            match self.materialize(desc) {
                Ok(Resolved { via, paths }) => {
                    debug!(
                        source = %desc.source,
                        kind = %desc.kind,
                        paths = paths.len(),
                        "restriction resolved"
                    );
                    for arcs in paths {
                        report.added += 1;
                        report.records += self.attach(&via, arcs, desc.exceptions);
                    }
                }
                Err(reason @ DropReason::MissingViaNode(_)) => {
                    // common on clipped tiles
                    info!(source = %desc.source, kind = %desc.kind, %reason, "restriction dropped");
                    report.dropped += 1;
                }
                Err(reason) => {
                    warn!(source = %desc.source, kind = %desc.kind, %reason, "restriction dropped");
                    report.dropped += 1;
                }
            }
        }

        self.mark_last_restrictions();
        self.stage = BuildStage::Resolved;
        info!(
            added = report.added,
            records = report.records,
            dropped = report.dropped,
            "restrictions resolved"
        );
        Ok(report)
    }

    fn materialize(&self, desc: &RestrictionDescriptor) -> Resolution<Resolved> {
        if desc.via_nodes.is_empty() {
            return Err(DropReason::NoViaNodes);
        }
        let via = desc
            .via_nodes
            .iter()
            .map(|&(key, _)| self.node_by_key(key).ok_or(DropReason::MissingViaNode(key)))
            .collect::<Resolution<Vec<_>>>()?;

        let paths = match desc.kind {
            RestrictionKind::NoThrough => self.no_through_paths(&via, desc.exceptions)?,
            RestrictionKind::Forbid | RestrictionKind::Only => self.turn_paths(desc, &via)?,
        };
        let paths = self.consistent_paths(&via, paths)?;
        Ok(Resolved { via, paths })
    }

    /// Keep the paths that join at every via node and leave the via set.
    fn consistent_paths(
        &self,
        via: &[NodeId],
        paths: Vec<Vec<ArcId>>,
    ) -> Resolution<Vec<Vec<ArcId>>> {
        let total = paths.len();
        let kept: Vec<Vec<ArcId>> = paths
            .into_iter()
            .filter(|arcs| self.path_is_consistent(arcs, via))
            .collect();
        if kept.len() < total {
            warn!(
                via = self.nodes[via[0].index()].key,
                discarded = total - kept.len(),
                "restriction path does not join its via nodes"
            );
        }
        if kept.is_empty() {
            return Err(DropReason::InconsistentPath);
        }
        Ok(kept)
    }

    fn turn_paths(
        &self,
        desc: &RestrictionDescriptor,
        via: &[NodeId],
    ) -> Resolution<Vec<Vec<ArcId>>> {
        if desc.via_ways.len() + 1 != via.len() {
            return Err(DropReason::ViaWayMismatch {
                via_nodes: via.len(),
                via_ways: desc.via_ways.len(),
            });
        }

        let mut stages = Vec::with_capacity(via.len() + 1);
        let from = self.from_candidates(desc, via[0])?;
        stages.push(self.filter_stage(Stage::From, from, desc.exceptions, via)?);

        for (i, pair) in via.windows(2).enumerate() {
            let way = desc.via_ways[i];
            let candidates: Vec<ArcId> = self
                .direct_arcs(pair[0])
                .filter(|(_, a)| a.dest == pair[1] && self.way_of(a) == way)
                .map(|(id, _)| id)
                .collect();
            if candidates.is_empty() {
                return Err(DropReason::NoArcs(Stage::Via(i)));
            }
            stages.push(self.filter_stage(Stage::Via(i), candidates, desc.exceptions, via)?);
        }

        let last = via[via.len() - 1];
        let to = self.to_candidates(desc, last, &stages)?;
        let last_stage = match desc.kind {
            RestrictionKind::Only => {
                let forbidden: Vec<ArcId> = self
                    .direct_arcs(last)
                    .map(|(id, _)| id)
                    .filter(|id| !to.contains(id))
                    .collect();
                if forbidden.is_empty() {
                    return Err(DropReason::OnlyIsNoOp);
                }
                match self.filter_stage(Stage::To, forbidden, desc.exceptions, via) {
                    Ok(arcs) => arcs,
                    Err(DropReason::Filtered { .. } | DropReason::RevisitsVia(_)) => {
                        return Err(DropReason::OnlyIsNoOp)
                    }
                    Err(other) => return Err(other),
                }
            }
            _ => self.filter_stage(Stage::To, to, desc.exceptions, via)?,
        };
        stages.push(last_stage);

        let total: usize = stages.iter().map(Vec::len).sum();
        if total > MAX_RESTRICTION_ARCS {
            return Err(DropReason::TooManyArcs(total));
        }
        Ok(cartesian(&stages))
    }

    fn from_candidates(
        &self,
        desc: &RestrictionDescriptor,
        first_via: NodeId,
    ) -> Resolution<Vec<ArcId>> {
        if let Some(key) = desc.from_node {
            let node = self.node_by_key(key).ok_or(DropReason::MissingFromNode(key))?;
            let arcs: Vec<ArcId> = self
                .direct_arcs(node)
                .filter(|(_, a)| a.dest == first_via && self.on_way(a, desc.from_way))
                .map(|(id, _)| id)
                .collect();
            return non_empty(arcs, Stage::From);
        }

        let Some(way) = desc.from_way else {
            return Err(DropReason::NoArcs(Stage::From));
        };
        // arcs arriving at the via node are the reverses of those leaving it
        let arcs: Vec<ArcId> = self
            .direct_arcs(first_via)
            .filter(|(_, a)| self.way_of(a) == way)
            .filter_map(|(_, a)| a.reverse)
            .collect();
        let arcs = non_empty(arcs, Stage::From)?;

        let far = self.arcs[arcs[0].index()].source;
        if arcs.iter().any(|id| self.arcs[id.index()].source != far) {
            return Err(DropReason::AmbiguousFromWay(way));
        }
        Ok(arcs)
    }

    /// To-arc candidates leaving `last`, narrowed by the direction hint.
    fn to_candidates(
        &self,
        desc: &RestrictionDescriptor,
        last: NodeId,
        stages: &[Vec<ArcId>],
    ) -> Resolution<Vec<ArcId>> {
        if let Some(key) = desc.to_node {
            let node = self.node_by_key(key).ok_or(DropReason::MissingToNode(key))?;
            let arcs: Vec<ArcId> = self
                .direct_arcs(last)
                .filter(|(_, a)| a.dest == node && self.on_way(a, desc.to_way))
                .map(|(id, _)| id)
                .collect();
            return non_empty(arcs, Stage::To);
        }

        let Some(way) = desc.to_way else {
            return Err(DropReason::NoArcs(Stage::To));
        };
        let candidates: Vec<ArcId> = self
            .direct_arcs(last)
            .filter(|(_, a)| self.way_of(a) == way)
            .map(|(id, _)| id)
            .collect();
        let candidates = non_empty(candidates, Stage::To)?;
        if candidates.len() == 1 {
            return Ok(candidates);
        }

        let near_zero = stages
            .iter()
            .flatten()
            .chain(&candidates)
            .any(|id| self.arcs[id.index()].length < NEAR_ZERO_LENGTH_M);
        if near_zero {
            return Ok(candidates);
        }

        // the via path is short, so treat each candidate as leaving from the
        // from-arc's destination
        let heading = self.arcs[stages[0][0].index()].final_bearing;
        let angles: Vec<f64> = candidates
            .iter()
            .map(|id| bearing_delta(heading, self.arcs[id.index()].initial_bearing))
            .collect();
        match choose_group(&angles, desc.direction()) {
            AngleChoice::All => Ok(candidates),
            AngleChoice::Group(members) => Ok(members.into_iter().map(|i| candidates[i]).collect()),
        }
    }

    /// Drop candidates that revisit a via node or that the restriction can
    /// never apply to.
    fn filter_stage(
        &self,
        stage: Stage,
        candidates: Vec<ArcId>,
        exceptions: AccessMask,
        via: &[NodeId],
    ) -> Resolution<Vec<ArcId>> {
        let mut kept = Vec::with_capacity(candidates.len());
        let mut revisits = 0;
        let mut last_reason = None;

        for id in candidates {
            let arc = &self.arcs[id.index()];
            let far = match stage {
                Stage::From => Some(arc.source),
                Stage::To => Some(arc.dest),
                Stage::Via(_) => None,
            };
            if let Some(far) = far.filter(|n| via.contains(n)) {
                warn!(
                    %stage,
                    arc = %id,
                    node = self.nodes[far.index()].key,
                    "restriction arc revisits a via node"
                );
                revisits += 1;
                continue;
            }
            match self.arc_usable(arc, exceptions) {
                Ok(()) => kept.push(id),
                Err(reason) => last_reason = Some(reason),
            }
        }

        if !kept.is_empty() {
            return Ok(kept);
        }
        match last_reason {
            Some(reason) => Err(DropReason::Filtered { stage, reason }),
            None if revisits > 0 => Err(DropReason::RevisitsVia(stage)),
            None => Err(DropReason::NoArcs(stage)),
        }
    }

    fn arc_usable(
        &self,
        arc: &RouteArc,
        exceptions: AccessMask,
    ) -> std::result::Result<(), FilterReason> {
        let def = &self.roads[arc.road.index()].def;
        if def.access.without(exceptions).is_empty() {
            return Err(FilterReason::NoEffectForRestrictedVehicles);
        }
        if def.oneway && !arc.forward {
            return Err(FilterReason::WrongOnewayDirection);
        }
        Ok(())
    }

    /// Every usable in/out pair through a single via node. U-turns and
    /// arcs looping back onto the via node are excluded.
    fn no_through_paths(
        &self,
        via: &[NodeId],
        exceptions: AccessMask,
    ) -> Resolution<Vec<Vec<ArcId>>> {
        let &[node] = via else {
            return Err(DropReason::NoThroughNeedsSingleVia);
        };
        let mut revisits = 0;
        let outgoing: Vec<(ArcId, &RouteArc)> = self
            .direct_arcs(node)
            .filter(|(id, a)| {
                if a.dest != node {
                    return true;
                }
                warn!(
                    stage = %Stage::To,
                    arc = %id,
                    node = self.nodes[node.index()].key,
                    "restriction arc revisits a via node"
                );
                revisits += 1;
                false
            })
            .collect();
        // reverses of non-loop exits never start at the via node
        let incoming: Vec<ArcId> = outgoing.iter().filter_map(|(_, a)| a.reverse).collect();

        let mut paths = Vec::new();
        let mut last_reason = None;
        for &in_id in &incoming {
            let arc_in = &self.arcs[in_id.index()];
            for &(out_id, arc_out) in &outgoing {
                if arc_in.source == arc_out.dest {
                    continue;
                }
                match self
                    .arc_usable(arc_in, exceptions)
                    .and_then(|()| self.arc_usable(arc_out, exceptions))
                {
                    Ok(()) => paths.push(vec![in_id, out_id]),
                    Err(reason) => last_reason = Some(reason),
                }
            }
        }

        if !paths.is_empty() {
            return Ok(paths);
        }
        Err(match last_reason {
            Some(reason) => DropReason::Filtered {
                stage: Stage::To,
                reason,
            },
            None if revisits > 0 => DropReason::RevisitsVia(Stage::To),
            None => DropReason::NoArcs(Stage::To),
        })
    }

    /// Store one record of the path at every via node it passes.
    fn attach(&mut self, via: &[NodeId], arcs: Vec<ArcId>, exceptions: AccessMask) -> usize {
        let record = Restriction {
            arcs,
            via_nodes: via.to_vec(),
            exceptions,
            last: false,
        };
        for node in via {
            self.nodes[node.index()].restrictions.push(record.clone());
        }
        via.len()
    }

    fn mark_last_restrictions(&mut self) {
        for node in &mut self.nodes {
            let count = node.restrictions.len();
            for (i, record) in node.restrictions.iter_mut().enumerate() {
                record.last = i + 1 == count;
            }
        }
    }

    /// Arc `i` ends at via node `i` and the next arc leaves from it; neither
    /// the first arc's source nor the final arc's destination is a via node.
    fn path_is_consistent(&self, arcs: &[ArcId], via: &[NodeId]) -> bool {
        if arcs.len() != via.len() + 1 {
            return false;
        }
        let arc = |i: usize| &self.arcs[arcs[i].index()];
        let joins = via
            .iter()
            .enumerate()
            .all(|(i, &node)| arc(i).dest == node && arc(i + 1).source == node);
        joins && !via.contains(&arc(0).source) && !via.contains(&arc(via.len()).dest)
    }

    fn way_of(&self, arc: &RouteArc) -> i64 {
        self.roads[arc.road.index()].def.way_id
    }

    /// Whether `arc` lies on `way`, when one is given.
    fn on_way(&self, arc: &RouteArc, way: Option<i64>) -> bool {
        way.map_or(true, |w| self.way_of(arc) == w)
    }
}

fn non_empty(arcs: Vec<ArcId>, stage: Stage) -> Resolution<Vec<ArcId>> {
    if arcs.is_empty() {
        Err(DropReason::NoArcs(stage))
    } else {
        Ok(arcs)
    }
}

/// One path per combination of one arc from each stage, in stage order.
fn cartesian(stages: &[Vec<ArcId>]) -> Vec<Vec<ArcId>> {
    let mut paths: Vec<Vec<ArcId>> = vec![Vec::with_capacity(stages.len())];
    for stage in stages {
        paths = paths
            .iter()
            .flat_map(|prefix| {
                stage.iter().map(move |&arc| {
                    let mut path = prefix.clone();
                    path.push(arc);
                    path
                })
            })
            .collect();
    }
    paths
}
