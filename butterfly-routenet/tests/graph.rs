mod common;

use butterfly_common::geo::{bearing_delta, reverse_bearing};
use butterfly_routenet::{BuildStage, NetConfig, NetError, RoadDef, RoadNetwork, RoadPoint};
use common::{add, network, node_at, node_near, ORIGIN};

#[test]
fn test_every_direct_arc_has_a_mirror() {
    let mut net = network();
    let points = [
        node_at(1, 0.0, 0.0),
        RoadPoint::shape(ORIGIN.offset(10.0, 60.0)),
        node_at(2, 0.0, 120.0),
        RoadPoint::number_node(ORIGIN.offset(30.0, 150.0)),
        node_at(3, 45.0, 200.0),
        node_at(4, 80.0, 300.0),
    ];
    let road = add(&mut net, RoadDef::new(7, 2), &points);
    add(&mut net, RoadDef::new(8, 1), &[node_at(2, 0.0, 120.0), node_at(5, -90.0, 100.0)]);

    assert_eq!(net.road(road).nodes().len(), 4);
    assert_eq!(net.arc_count(), 2 * (3 + 1));

    let mut forward = 0;
    for (id, _) in net.nodes() {
        for (arc_id, arc) in net.arcs_of(id) {
            let rev = arc.reverse().expect("direct arcs are paired");
            assert_eq!(net.arc(rev).reverse(), Some(arc_id));
            assert_eq!(net.arc(rev).road(), arc.road());
            assert_ne!(net.arc(rev).is_forward(), arc.is_forward());
            if arc.road() == road && arc.is_forward() {
                forward += 1;
            }
        }
    }
    assert_eq!(forward, 3);
}

#[test]
fn test_reverse_direct_bearing_is_half_a_turn() {
    let mut net = network();
    for (i, bearing) in [0.0, 33.0, 90.0, 135.0, 179.0, -120.0, -45.0].into_iter().enumerate() {
        let key = 10 + i as u64;
        let points = [node_at(1, 0.0, 0.0), node_at(key, bearing, 250.0)];
        add(&mut net, RoadDef::new(i as i64, 1), &points);
    }

    for (id, _) in net.nodes() {
        for (_, arc) in net.arcs_of(id) {
            let rev = net.arc(arc.reverse().unwrap());
            assert!(arc.direct_length() > 0.0);
            let expected = reverse_bearing(arc.direct_bearing());
            assert!(
                bearing_delta(expected, rev.direct_bearing()).abs() < 1e-9,
                "{} vs {}",
                expected,
                rev.direct_bearing()
            );
        }
    }
}

#[test]
fn test_small_triangles_are_discarded() {
    let mut net = RoadNetwork::new(NetConfig {
        routing_island_len: 1000,
        ..NetConfig::default()
    });

    // main road reaching the tile edge
    let edge = RoadPoint::boundary_node(100, ORIGIN.offset(180.0, 3000.0));
    let main = add(&mut net, RoadDef::new(100, 3), &[node_at(101, 180.0, 500.0), edge]);

    let mut triangle_roads = Vec::new();
    for (n, center) in [ORIGIN, ORIGIN.offset(90.0, 2000.0)].into_iter().enumerate() {
        let base = 10 * (n as u64 + 1);
        let corners: Vec<RoadPoint> = [0.0, 120.0, -120.0]
            .iter()
            .enumerate()
            .map(|(i, &b)| node_near(center, base + i as u64, b, 100.0))
            .collect();
        for i in 0..3 {
            let way = (base + i as u64) as i64;
            let side = [corners[i], corners[(i + 1) % 3]];
            triangle_roads.push(add(&mut net, RoadDef::new(way, 1), &side));
        }
    }
    assert_eq!(net.node_count(), 8);

    net.resolve_restrictions().unwrap();
    let report = net.remove_islands().unwrap();

    assert_eq!(report.components, 3);
    assert_eq!(report.discarded_components, 2);
    assert_eq!(report.discarded_nodes, 6);
    assert_eq!(net.node_count(), 2);
    for key in [10, 11, 12, 20, 21, 22] {
        assert!(net.node_by_key(key).is_none(), "node {key} survived");
    }
    for road in triangle_roads {
        assert!(!net.road(road).is_routable());
    }
    assert!(net.road(main).is_routable());
}

#[test]
fn test_islands_kept_when_disabled() {
    let mut net = network();
    add(&mut net, RoadDef::new(1, 1), &[node_at(1, 0.0, 0.0), node_at(2, 0.0, 50.0)]);
    let summary = net.compile().unwrap();
    assert_eq!(summary.islands.discarded_components, 0);
    assert_eq!(summary.nodes, 2);
}

#[test]
fn test_shortcuts_in_compiled_network() {
    let mut net = network();
    let main: Vec<_> = (0..6).map(|i| node_at(i + 1, 90.0, i as f64 * 150.0)).collect();
    add(&mut net, RoadDef::new(1, 4), &main);
    add(&mut net, RoadDef::new(2, 2), &[node_at(4, 90.0, 450.0), node_at(40, 0.0, 300.0)]);
    add(&mut net, RoadDef::new(3, 4), &[node_at(6, 90.0, 750.0), node_at(60, 100.0, 900.0)]);

    let summary = net.compile().unwrap();
    assert!(summary.shortcuts >= 2);

    for (id, node) in net.nodes() {
        let arcs: Vec<_> = net.arcs_of(id).map(|(_, a)| a.clone()).collect();
        for (i, arc) in arcs.iter().enumerate() {
            if arc.is_indirect() {
                assert!(i > 0, "shortcut first in list at node {}", node.key());
                let before = &arcs[i - 1];
                assert_eq!(before.road(), arc.road());
                assert_eq!(before.is_forward(), arc.is_forward());
                assert!(arc.length() > before.length());
            }
        }
    }
}

#[test]
fn test_one_point_road_dropped_and_ingestion_closes() {
    let mut net = network();
    assert!(net.add_road(RoadDef::new(1, 1), &[node_at(1, 0.0, 0.0)]).unwrap().is_none());
    let points = [node_at(1, 0.0, 0.0), node_at(3, 0.0, 0.0), node_at(2, 0.0, 10.0)];
    add(&mut net, RoadDef::new(2, 1), &points);
    assert_eq!(net.road_count(), 1);

    net.resolve_restrictions().unwrap();
    assert_eq!(net.stage(), BuildStage::Resolved);
    let err = net
        .add_road(RoadDef::new(3, 1), &[node_at(5, 0.0, 0.0), node_at(6, 0.0, 10.0)])
        .unwrap_err();
    assert!(matches!(err, NetError::WrongStage { op: "add_road", stage: BuildStage::Resolved }));
}
