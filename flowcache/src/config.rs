use std::io::Read;
use serde::Deserialize;
use crate::error::ConfigError;
use crate::multi_layer::CachePolicy;

/// The seed used by random caches when the configuration doesn't give one
pub const DEFAULT_SEED: u64 = 42;

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// A simulator configuration, usually parsed from JSON
///
/// Only `SimpleCacheSimulator` exists, which replays a trace against a single top-level cache
#[derive(Debug, Deserialize)]
#[serde(tag = "Type")]
pub enum SimulatorConfig {
    SimpleCacheSimulator {
        #[serde(rename = "Cache")]
        cache: CacheConfig,
    },
}

impl SimulatorConfig {
    /// Parses a JSON configuration. Unknown `Type` tags and missing fields are rejected
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn cache(&self) -> &CacheConfig {
        match self {
            SimulatorConfig::SimpleCacheSimulator { cache } => cache,
        }
    }
}

/// A configuration for a single cache, tagged by its `Type`
///
/// The decorator and the hierarchy nest further cache configurations
#[derive(Debug, Deserialize)]
#[serde(tag = "Type")]
pub enum CacheConfig {
    #[serde(rename = "FullAssociativeFIFOCache")]
    FullAssociativeFifo {
        #[serde(rename = "Size")]
        size: usize,
    },
    #[serde(rename = "FullAssociativeLRUCache")]
    FullAssociativeLru {
        #[serde(rename = "Size")]
        size: usize,
    },
    #[serde(rename = "FullAssociativeLFUCache")]
    FullAssociativeLfu {
        #[serde(rename = "Size")]
        size: usize,
    },
    #[serde(rename = "FullAssociativeRandomCache")]
    FullAssociativeRandom {
        #[serde(rename = "Size")]
        size: usize,
        #[serde(rename = "Seed", default = "default_seed")]
        seed: u64,
    },
    #[serde(rename = "FullAssociativeTreePLRUCache")]
    FullAssociativeTreePlru {
        #[serde(rename = "Size")]
        size: usize,
    },
    #[serde(rename = "NWaySetAssociativeFIFOCache")]
    SetAssociativeFifo {
        #[serde(rename = "Size")]
        size: usize,
        #[serde(rename = "Way")]
        way: usize,
    },
    #[serde(rename = "NWaySetAssociativeLRUCache")]
    SetAssociativeLru {
        #[serde(rename = "Size")]
        size: usize,
        #[serde(rename = "Way")]
        way: usize,
    },
    #[serde(rename = "NWaySetAssociativeLFUCache")]
    SetAssociativeLfu {
        #[serde(rename = "Size")]
        size: usize,
        #[serde(rename = "Way")]
        way: usize,
    },
    #[serde(rename = "NWaySetAssociativeRandomCache")]
    SetAssociativeRandom {
        #[serde(rename = "Size")]
        size: usize,
        #[serde(rename = "Way")]
        way: usize,
        #[serde(rename = "Seed", default = "default_seed")]
        seed: u64,
    },
    #[serde(rename = "NWaySetAssociativeTreePLRUCache")]
    SetAssociativeTreePlru {
        #[serde(rename = "Size")]
        size: usize,
        #[serde(rename = "Way")]
        way: usize,
    },
    #[serde(rename = "CacheWithLookAhead")]
    LookAhead {
        #[serde(rename = "InnerCache")]
        inner_cache: Box<CacheConfig>,
    },
    #[serde(rename = "MultiLayerCache")]
    MultiLayer {
        #[serde(rename = "CacheLayers")]
        cache_layers: Vec<CacheConfig>,
        #[serde(rename = "CachePolicies")]
        cache_policies: Vec<CachePolicy>,
    },
}
