//! Network build options, read once when a network is created.
//!
//! ```toml
//! check_roundabouts = true
//! routing_island_len = 500
//!
//! [partition]
//! max_nodes = 2048
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NetError, Result};
use crate::partition::PartitionCapacity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetConfig {
    /// Warn about non-oneway, forking and merging roundabouts.
    pub check_roundabouts: bool,
    pub check_roundabout_flares: bool,
    /// Flares longer than this multiple of the roundabout arc are ignored; 0 checks all.
    pub max_flare_length_ratio: u32,
    pub report_similar_arcs: bool,
    /// Metres. Negative disables island removal, 0 removes every island.
    pub routing_island_len: i32,
    pub partition: PartitionCapacity,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            check_roundabouts: false,
            check_roundabout_flares: false,
            max_flare_length_ratio: 0,
            report_similar_arcs: false,
            routing_island_len: -1,
            partition: PartitionCapacity::default(),
        }
    }
}

impl NetConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: NetConfig = toml::from_str(content)
            .map_err(|e| butterfly_common::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|source| butterfly_common::Error::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let capacity = &self.partition;
        if capacity.max_nodes == 0 || capacity.max_arcs == 0 {
            return Err(NetError::Config(
                "partition.max_nodes and partition.max_arcs must be positive".into(),
            ));
        }
        if capacity.max_span.is_nan() || capacity.max_span <= 0.0 {
            return Err(NetError::Config(format!(
                "partition.max_span must be positive, got {}",
                capacity.max_span
            )));
        }
        Ok(())
    }
}
