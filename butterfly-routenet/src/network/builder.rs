//! Road ingestion: nodes and forward/reverse arc pairs

use butterfly_common::geo::reverse_bearing;
use tracing::{error, trace, warn};

use super::{ArcId, BuildStage, NodeId, RoadNetwork, RouteArc};
use crate::error::Result;
use crate::road::{Road, RoadDef, RoadId, RoadPoint, MAX_CLASS, MAX_SPEED};

impl RoadNetwork {
    /// Register a road and connect its routing nodes.
    ///
    /// Returns `Ok(None)` when the road is unusable (fewer than two points);
    /// the problem is logged and ingestion continues.
    pub fn add_road(&mut self, mut def: RoadDef, points: &[RoadPoint]) -> Result<Option<RoadId>> {
        self.require_stage(BuildStage::Ingesting, "add_road")?;

        if points.len() < 2 {
            error!(
                way_id = def.way_id,
                points = points.len(),
                "road has fewer than 2 points, dropped"
            );
            return Ok(None);
        }
        if def.class > MAX_CLASS {
            warn!(way_id = def.way_id, class = def.class, "road class out of range, clamped");
            def.class = MAX_CLASS;
        }
        if def.speed > MAX_SPEED {
            warn!(way_id = def.way_id, speed = def.speed, "road speed out of range, clamped");
            def.speed = MAX_SPEED;
        }

        let road_id = RoadId(self.roads.len() as u32);
        let mut road = Road::new(def);
        road.point_count = points.len();

        // (point index, node) of the previous routing node on this road
        let mut prev: Option<(usize, NodeId)> = None;
        let mut segment_len = 0.0;

        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                let d = points[i - 1].coord.distance(&point.coord);
                segment_len += d;
                road.length += d;
            }

            let Some(key) = point.routing_key() else {
                continue;
            };
            road.routing_point_count += 1;
            if road.def.skip {
                continue;
            }

            let node = self.ensure_node(key, point.coord, point.boundary);
            let entry = &mut self.nodes[node.index()];
            entry.class = entry.class.max(road.def.class);

            if road.nodes.is_empty() {
                self.road_starts.entry(node).or_default().push(road_id);
            }
            road.nodes.push(node);

            if let Some((start_idx, start_node)) = prev {
                let start = (start_idx, start_node);
                self.connect(road_id, &road.def, points, start, (i, node), segment_len);
            }
            prev = Some((i, node));
            segment_len = 0.0;
        }

        trace!(
            way_id = road.def.way_id,
            nodes = road.nodes.len(),
            length_m = road.length,
            "road added"
        );
        self.roads.push(road);
        Ok(Some(road_id))
    }

    /// Create the forward arc `from -> to` and its reverse.
    fn connect(
        &mut self,
        road: RoadId,
        def: &RoadDef,
        points: &[RoadPoint],
        (from_idx, from): (usize, NodeId),
        (to_idx, to): (usize, NodeId),
        length: f64,
    ) {
        let start = points[from_idx].coord;
        let end = points[to_idx].coord;
        if start == end {
            warn!(
                way_id = def.way_id,
                from = self.nodes[from.index()].key,
                to = self.nodes[to.index()].key,
                "consecutive routing nodes share a coordinate, zero-length arc"
            );
        }

        let direct_length = start.distance(&end);
        let direct_bearing = start.bearing_to(&end);
        let initial_bearing = interior_bearing(points, from_idx, to_idx).unwrap_or(direct_bearing);
        let final_bearing = interior_bearing(points, to_idx, from_idx)
            .map(reverse_bearing)
            .unwrap_or(direct_bearing);

        let forward_id = ArcId(self.arcs.len() as u32);
        let reverse_id = ArcId(forward_id.0 + 1);

        self.arcs.push(RouteArc {
            source: from,
            dest: to,
            road,
            initial_bearing,
            final_bearing,
            direct_bearing,
            length,
            direct_length,
            forward: true,
            indirect: false,
            class: def.class,
            reverse: Some(reverse_id),
        });
        // bearings along a line reverse by half a turn
        self.arcs.push(RouteArc {
            source: to,
            dest: from,
            road,
            initial_bearing: reverse_bearing(final_bearing),
            final_bearing: reverse_bearing(initial_bearing),
            direct_bearing: reverse_bearing(direct_bearing),
            length,
            direct_length,
            forward: false,
            indirect: false,
            class: def.class,
            reverse: Some(forward_id),
        });

        self.nodes[from.index()].arcs.push(forward_id);
        self.nodes[to.index()].arcs.push(reverse_id);
    }
}

/// Bearing from the point at `node_idx` towards the nearest usable point in
/// the direction of `toward_idx`.
///
/// Points on top of the node and address-only points are stepped over; the
/// far routing node itself is always usable. `None` when every point up to
/// and including the far node coincides with the node.
fn interior_bearing(points: &[RoadPoint], node_idx: usize, toward_idx: usize) -> Option<f64> {
    let origin = points[node_idx].coord;
    let usable = |k: usize| {
        let p = &points[k];
        p.coord != origin && (k == toward_idx || !p.number_node)
    };

    let found = if toward_idx > node_idx {
        (node_idx + 1..=toward_idx).find(|&k| usable(k))
    } else {
        (toward_idx..node_idx).rev().find(|&k| usable(k))
    };
    found.map(|k| origin.bearing_to(&points[k].coord))
}
