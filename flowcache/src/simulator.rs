use std::io::BufRead;
use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::cache::{
    Cache, FullAssociativeFifoCache, FullAssociativeLfuCache, FullAssociativeLruCache,
    FullAssociativeRandomCache, FullAssociativeTreePlruCache, GenericCache, SetAssociativeFifoCache,
    SetAssociativeLfuCache, SetAssociativeLruCache, SetAssociativeRandomCache, SetAssociativeTreePlruCache,
};
use crate::config::{CacheConfig, SimulatorConfig};
use crate::error::ConfigError;
use crate::flow_key::Packet;
use crate::look_ahead::CacheWithLookAhead;
use crate::multi_layer::MultiLayerCache;
use crate::trace::parse_record;

/// Replays report progress each time this many more packets have been processed
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// The simulator replays packets against a top-level cache and collects results.
///
/// It supports calling simulate multiple times, and will update the time taken to simulate and the
/// results accordingly
pub struct Simulator {
    cache: GenericCache,
    result: SimulationResult,
    skipped_records: u64,
    ignored_packets: u64,
    simulation_time: Duration,
}

/// The result of a simulation. Can be serialised to the output format
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SimulationResult {
    #[serde(rename = "Type")]
    cache_type: String,
    parameter: Value,
    processed: u64,
    hit: u64,
    hit_rate: f64,
    stat_detail: Option<Value>,
}

impl SimulationResult {
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn hit(&self) -> u64 {
        self.hit
    }

    pub fn hit_rate(&self) -> f64 {
        self.hit_rate
    }

    pub fn stat_detail(&self) -> Option<&Value> {
        self.stat_detail.as_ref()
    }
}

impl Simulator {
    /// Creates a new simulator for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: A simulator configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, ConfigError>
    pub fn new(config: &SimulatorConfig) -> Result<Self, ConfigError> {
        let cache = build_cache(config.cache())?;
        debug!(cache = %cache.describe(), parameters = %cache.parameter_string(), "built simulator");
        Ok(Self::with_cache(cache))
    }

    /// Creates a simulator around an already built cache
    pub fn with_cache(cache: GenericCache) -> Self {
        let result = SimulationResult {
            cache_type: cache.describe(),
            parameter: cache.parameters(),
            processed: 0,
            hit: 0,
            hit_rate: 0.0,
            stat_detail: None,
        };
        Self {
            cache,
            result,
            skipped_records: 0,
            ignored_packets: 0,
            simulation_time: Duration::new(0, 0),
        }
    }

    /// Processes a single packet, returning true on a hit
    ///
    /// Packets without a flow key are ignored and don't count as processed. On a miss the key is
    /// inserted
    pub fn process(&mut self, packet: &Packet) -> bool {
        let Some(key) = packet.flow_key() else {
            self.ignored_packets += 1;
            return false;
        };
        let hit = self.cache.probe(&key, true);
        if hit {
            self.result.hit += 1;
        } else {
            self.cache.insert(key);
        }
        self.result.processed += 1;
        if self.result.processed % PROGRESS_INTERVAL == 0 {
            info!(
                processed = self.result.processed,
                hit = self.result.hit,
                hit_rate = self.result.hit as f64 / self.result.processed as f64,
                "progress"
            );
        }
        hit
    }

    /// Replays a tab separated trace, one packet per line.
    ///
    /// Malformed records are logged and skipped, blank lines are ignored. Reads from the reader are
    /// sequential, so a memory mapped file can be advised accordingly
    ///
    /// # Arguments
    ///
    /// * `reader`: The trace
    ///
    /// returns: Result<&SimulationResult, std::io::Error>
    pub fn simulate<R: BufRead>(&mut self, reader: R) -> Result<&SimulationResult, std::io::Error> {
        let start = Instant::now();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(&line) {
                Ok(packet) => {
                    self.process(&packet);
                }
                Err(error) => {
                    warn!(line = number + 1, %error, "skipping malformed trace record");
                    self.skipped_records += 1;
                }
            }
        }
        self.simulation_time += start.elapsed();
        debug!(
            processed = self.result.processed,
            hit = self.result.hit,
            skipped = self.skipped_records,
            ignored = self.ignored_packets,
            "replay finished"
        );
        Ok(self.result())
    }

    /// The results so far, including the cache's own counters
    pub fn result(&mut self) -> &SimulationResult {
        self.result.hit_rate = if self.result.processed == 0 {
            0.0
        } else {
            self.result.hit as f64 / self.result.processed as f64
        };
        let detail = self.cache.stat_string();
        self.result.stat_detail = if detail.is_empty() {
            None
        } else {
            let parsed: Result<Value, _> = serde_json::from_str(&detail);
            Some(parsed.unwrap_or(Value::String(detail)))
        };
        &self.result
    }

    pub fn cache(&self) -> &GenericCache {
        &self.cache
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of trace records which couldn't be parsed
    pub fn get_skipped_record_count(&self) -> u64 {
        self.skipped_records
    }

    /// Gets the number of packets which had no flow key, such as ICMP
    pub fn get_ignored_packet_count(&self) -> u64 {
        self.ignored_packets
    }
}

/// Creates a new cache from a cache configuration, recursing into decorators and hierarchies
pub fn build_cache(config: &CacheConfig) -> Result<GenericCache, ConfigError> {
    let cache = match config {
        CacheConfig::FullAssociativeFifo { size } => {
            GenericCache::from(FullAssociativeFifoCache::fifo(*size)?)
        }
        CacheConfig::FullAssociativeLru { size } => {
            GenericCache::from(FullAssociativeLruCache::lru(*size)?)
        }
        CacheConfig::FullAssociativeLfu { size } => {
            GenericCache::from(FullAssociativeLfuCache::lfu(*size)?)
        }
        CacheConfig::FullAssociativeRandom { size, seed } => {
            GenericCache::from(FullAssociativeRandomCache::random(*size, *seed)?)
        }
        CacheConfig::FullAssociativeTreePlru { size } => {
            GenericCache::from(FullAssociativeTreePlruCache::tree_plru(*size)?)
        }
        CacheConfig::SetAssociativeFifo { size, way } => {
            GenericCache::from(SetAssociativeFifoCache::fifo(*size, *way)?)
        }
        CacheConfig::SetAssociativeLru { size, way } => {
            GenericCache::from(SetAssociativeLruCache::lru(*size, *way)?)
        }
        CacheConfig::SetAssociativeLfu { size, way } => {
            GenericCache::from(SetAssociativeLfuCache::lfu(*size, *way)?)
        }
        CacheConfig::SetAssociativeRandom { size, way, seed } => {
            GenericCache::from(SetAssociativeRandomCache::random(*size, *way, *seed)?)
        }
        CacheConfig::SetAssociativeTreePlru { size, way } => {
            GenericCache::from(SetAssociativeTreePlruCache::tree_plru(*size, *way)?)
        }
        CacheConfig::LookAhead { inner_cache } => {
            GenericCache::from(CacheWithLookAhead::new(build_cache(inner_cache)?))
        }
        CacheConfig::MultiLayer { cache_layers, cache_policies } => {
            let layers = cache_layers.iter()
                .map(build_cache)
                .collect::<Result<Vec<_>, _>>()?;
            GenericCache::from(MultiLayerCache::new(layers, cache_policies.clone())?)
        }
    };
    Ok(cache)
}
