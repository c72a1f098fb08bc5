//! # FlowCache
//!
//! FlowCache is a library for simulating flow-cache replacement on packet traces
//!
//! Flows are identified by their five-tuple. The library provides fully associative caches
//! parameterised by a replacement policy (FIFO, LRU, LFU, random and tree pseudo-LRU),
//! set-associative caches sharded by a hash of the key, a look-ahead decorator for bidirectional
//! flows, and multi-layer hierarchies with write-through or write-back boundaries
//!
//! A simulator replays traces against any of these, configured from JSON

/// Contains the cache trait, the fully associative and set-associative caches, and a utility enum
/// covering every kind of cache
pub mod cache;

/// Contains definitions for the JSON configuration format
pub mod config;

pub mod error;

/// Contains the flow key and the decoded packet it is derived from
pub mod flow_key;

pub mod io;

/// Contains the look-ahead decorator
pub mod look_ahead;

/// Contains the multi-layer cache hierarchy and its boundary policies
pub mod multi_layer;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Contains the simulator used to replay a trace against a cache configuration
pub mod simulator;

/// Contains the trace record parser
pub mod trace;

#[cfg(test)]
mod test;

/// Contains utilities for running tests and benchmarks.
pub mod util;
