//! Common utilities for the butterfly-osm toolkit

pub mod error;
pub mod geo;

pub use error::{Error, Result};
pub use geo::Coord;
