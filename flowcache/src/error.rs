use std::net::AddrParseError;
use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;
use crate::flow_key::FlowKey;

/// Errors raised while building a cache. A cache which fails any of these checks is never built
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cache capacity must be at least one entry")]
    ZeroCapacity,

    #[error("size {size} must be a multiple of way {way}")]
    SizeNotMultipleOfWay { size: usize, way: usize },

    #[error("tree pseudo-LRU caches must hold 8 or 16 entries, got {0}")]
    TreePlruSize(usize),

    #[error("`CachePolicies` ({policies} items) must have `CacheLayers` length - 1 ({layers} - 1) items")]
    PolicyCount { policies: usize, layers: usize },

    #[error("layer {layer} ({description}) is below an exclusive boundary but can't invalidate entries")]
    ExclusiveWithoutInvalidate { layer: usize, description: String },

    #[error("couldn't parse the cache configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Misuse of a cache. These leave eviction state inconsistent if ignored, so callers should treat
/// them as fatal
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheError {
    #[error("{0} is not cached")]
    NotCached(FlowKey),

    #[error("{0} does not support invalidation")]
    InvalidateUnsupported(String),
}

/// A malformed trace record. The simulator skips these and carries on
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("record must have 7 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid timestamp: {0}")]
    Timestamp(#[source] ParseFloatError),

    #[error("invalid length: {0}")]
    Length(#[source] ParseIntError),

    #[error("invalid address {value:?}: {source}")]
    Address { value: String, source: AddrParseError },

    #[error("unknown packet protocol: {0}")]
    UnknownProtocol(String),

    #[error("invalid port {value:?}: {source}")]
    Port { value: String, source: ParseIntError },
}
