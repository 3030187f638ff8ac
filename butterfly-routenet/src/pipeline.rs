//! Compile independent tiles, one network each.

use rayon::prelude::*;
use tracing::{info, info_span};

use crate::config::NetConfig;
use crate::error::Result;
use crate::network::{CompileSummary, RoadNetwork};
use crate::restriction::RestrictionDescriptor;
use crate::road::{RoadDef, RoadPoint};

/// Everything the style layer produced for one tile.
#[derive(Debug, Clone, Default)]
pub struct TileInput {
    pub name: String,
    pub roads: Vec<(RoadDef, Vec<RoadPoint>)>,
    pub restrictions: Vec<RestrictionDescriptor>,
}

impl TileInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

pub struct CompiledTile {
    pub name: String,
    pub network: RoadNetwork,
    pub summary: CompileSummary,
}

/// Ingest a tile and run every pass on it.
pub fn compile_tile(tile: TileInput, config: &NetConfig) -> Result<CompiledTile> {
    let span = info_span!("tile", name = %tile.name);
    let _guard = span.enter();

    let mut network = RoadNetwork::new(config.clone());
    let mut dropped = 0;
    for (def, points) in &tile.roads {
        if network.add_road(def.clone(), points)?.is_none() {
            dropped += 1;
        }
    }
    for desc in tile.restrictions {
        network.add_restriction(desc)?;
    }
    if dropped > 0 {
        info!(dropped, "roads dropped during ingestion");
    }

    let summary = network.compile()?;
    Ok(CompiledTile {
        name: tile.name,
        network,
        summary,
    })
}

/// Compile tiles in parallel. Results keep the input order; a fatal error
/// in one tile does not affect the others.
pub fn compile_tiles(tiles: Vec<TileInput>, config: &NetConfig) -> Vec<Result<CompiledTile>> {
    tiles
        .into_par_iter()
        .map(|tile| compile_tile(tile, config))
        .collect()
}
