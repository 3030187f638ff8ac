//! Indirect arcs along major roads.
//!
//! A path search that wants to reach a road of class `c` can follow a
//! shortcut from the last node where it saw a lower class straight to the
//! next node where class `c` becomes reachable, instead of walking every minor
//! junction in between.

use tracing::{debug, info};

use super::{ArcId, NodeId, Pass, RoadNetwork, RouteArc};
use crate::error::Result;
use crate::road::RoadId;

impl RoadNetwork {
    /// Insert shortcut arcs along every routable road with class >= 1.
    ///
    /// Returns the number of arcs added.
    pub fn add_shortcuts(&mut self) -> Result<usize> {
        self.begin_pass(Pass::Shortcuts)?;

        let mut added = 0;
        for idx in 0..self.roads.len() {
            let road = &self.roads[idx];
            if road.def.skip || road.def.class == 0 || road.nodes.len() < 3 {
                continue;
            }
            let road_id = RoadId(idx as u32);
            let class = road.def.class;
            let mut sequence = road.nodes.clone();

            added += self.shortcuts_along(road_id, class, &sequence, true);
            sequence.reverse();
            added += self.shortcuts_along(road_id, class, &sequence, false);
        }

        info!(added, "shortcut arcs inserted");
        Ok(added)
    }

    fn shortcuts_along(
        &mut self,
        road: RoadId,
        road_class: u8,
        sequence: &[NodeId],
        forward: bool,
    ) -> usize {
        let mut added = 0;
        let mut anchor = 0;
        let mut reached = self.other_road_class(sequence[0], road).map(|c| c.min(road_class));

        for i in 1..sequence.len() {
            if reached == Some(road_class) {
                break;
            }
            let other = self.other_road_class(sequence[i], road);
            let Some(class) = other.map(|c| c.min(road_class)) else {
                continue;
            };
            if reached.is_some_and(|r| class <= r) {
                continue;
            }
            // the direct arc already links immediate neighbours
            if i - anchor > 1 && self.insert_shortcut(road, &sequence[anchor..=i], class, forward) {
                added += 1;
            }
            reached = Some(class);
            anchor = i;
        }
        added
    }

    /// Highest class of the other routable roads meeting at `node`.
    fn other_road_class(&self, node: NodeId, road: RoadId) -> Option<u8> {
        self.direct_arcs(node)
            .filter(|(_, a)| a.road != road)
            .map(|(_, a)| &self.roads[a.road.index()].def)
            .filter(|def| !def.skip)
            .map(|def| def.class)
            .max()
    }

    /// Add `path[0] -> path[last]` right after the first direct arc of the path.
    fn insert_shortcut(&mut self, road: RoadId, path: &[NodeId], class: u8, forward: bool) -> bool {
        let mut legs: Vec<ArcId> = Vec::with_capacity(path.len() - 1);
        for pair in path.windows(2) {
            match self.find_road_arc(pair[0], pair[1], road, forward) {
                Some(id) => legs.push(id),
                None => {
                    debug!(
                        %road,
                        from = %pair[0],
                        to = %pair[1],
                        "no direct arc along road, shortcut skipped"
                    );
                    return false;
                }
            }
        }

        let (Some(&first), Some(&last)) = (legs.first(), legs.last()) else {
            return false;
        };
        let source = path[0];
        let dest = path[path.len() - 1];
        let from = self.nodes[source.index()].coord;
        let to = self.nodes[dest.index()].coord;

        let arc = RouteArc {
            source,
            dest,
            road,
            initial_bearing: self.arcs[first.index()].initial_bearing,
            final_bearing: self.arcs[last.index()].final_bearing,
            direct_bearing: from.bearing_to(&to),
            length: legs.iter().map(|id| self.arcs[id.index()].length).sum(),
            direct_length: from.distance(&to),
            forward,
            indirect: true,
            class,
            reverse: None,
        };
        let id = ArcId(self.arcs.len() as u32);
        self.arcs.push(arc);

        let list = &mut self.nodes[source.index()].arcs;
        let position = list.iter().position(|&a| a == first).map_or(list.len(), |p| p + 1);
        list.insert(position, id);
        true
    }

    fn find_road_arc(
        &self,
        from: NodeId,
        to: NodeId,
        road: RoadId,
        forward: bool,
    ) -> Option<ArcId> {
        self.direct_arcs(from)
            .find(|(_, a)| a.dest == to && a.road == road && a.forward == forward)
            .map(|(id, _)| id)
    }
}
