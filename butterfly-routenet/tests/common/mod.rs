#![allow(dead_code)]

use butterfly_routenet::{Coord, NetConfig, RoadDef, RoadId, RoadNetwork, RoadPoint};
use tracing_subscriber::EnvFilter;

pub const ORIGIN: Coord = Coord::new(47.37, 8.54);

/// Log to the test writer when RUST_LOG is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Routing node `key`, `metres` from `center` along `bearing`.
pub fn node_near(center: Coord, key: u64, bearing: f64, metres: f64) -> RoadPoint {
    RoadPoint::node(key, center.offset(bearing, metres))
}

pub fn node_at(key: u64, bearing: f64, metres: f64) -> RoadPoint {
    node_near(ORIGIN, key, bearing, metres)
}

pub fn add(net: &mut RoadNetwork, def: RoadDef, points: &[RoadPoint]) -> RoadId {
    net.add_road(def, points)
        .expect("network is ingesting")
        .expect("road has at least two points")
}

pub fn network() -> RoadNetwork {
    init_tracing();
    RoadNetwork::new(NetConfig::default())
}
