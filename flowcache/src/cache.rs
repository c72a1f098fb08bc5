use std::collections::HashMap;
use serde_json::{json, Value};
use tracing::trace;
use crate::error::{CacheError, ConfigError};
use crate::flow_key::FlowKey;
use crate::look_ahead::CacheWithLookAhead;
use crate::multi_layer::MultiLayerCache;
use crate::replacement_policies::{Fifo, Lfu, Lru, Random, ReplacementPolicy, TreePlru};

/// The contract shared by every cache: leaf engines, set-associative wrappers, the look-ahead
/// decorator and the multi-layer hierarchy
///
/// Caches are single threaded, every call runs to completion before the next one starts
pub trait Cache {
    /// Tests whether `key` is resident, returning true on a hit
    ///
    /// With `update` set a hit increments the entry's reference count and may reorder the
    /// replacement state. Without it nothing is mutated, which makes it safe for look-ahead checks
    fn probe(&mut self, key: &FlowKey, update: bool) -> bool;

    /// Inserts `key`, evicting according to the replacement policy if needed, and returns every
    /// real key displaced by the insertion
    ///
    /// Inserting a resident key only performs the bookkeeping of `probe(key, true)` and returns
    /// nothing
    fn insert(&mut self, key: FlowKey) -> Vec<FlowKey>;

    /// Removes a resident key, freeing its slot as if it had never been used
    ///
    /// # Errors
    ///
    /// `CacheError::NotCached` if `key` is absent, `CacheError::InvalidateUnsupported` if this
    /// cache can't invalidate at all
    fn invalidate(&mut self, key: &FlowKey) -> Result<(), CacheError>;

    /// Empties the cache and resets its replacement state
    fn clear(&mut self);

    /// The variant name, e.g. `CacheWithLookAhead[FullAssociativeLRUCache]`
    fn describe(&self) -> String;

    /// The structured parameters this cache was built with
    fn parameters(&self) -> Value;

    fn parameter_string(&self) -> String {
        self.parameters().to_string()
    }

    /// Internal counters as JSON, empty where the cache doesn't track any
    fn stat_string(&self) -> String {
        String::new()
    }

    /// The number of keys currently held. Useful for analysing cache performance or debugging
    fn resident_count(&self) -> usize;

    fn supports_invalidate(&self) -> bool {
        true
    }
}

/// A resident key and the number of times it has been hit since insertion
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CacheEntry {
    pub key: FlowKey,
    pub references: u64,
}

impl CacheEntry {
    pub fn new(key: FlowKey) -> Self {
        Self {
            key,
            references: 0,
        }
    }
}

/// A fully associative cache, parameterised by a replacement policy
///
/// Any key can be held in any slot. The cache keeps the slot table and the key to slot lookup, the
/// policy decides which slot is reused on a miss. As with the set-associative wrapper this relies
/// on monomorphisation, every policy gets its own specialised copy of the lookup code
pub struct FullAssociativeCache<P: ReplacementPolicy> {
    slots: Vec<Option<CacheEntry>>,
    index: HashMap<FlowKey, usize>,
    policy: P,
}

pub type FullAssociativeFifoCache = FullAssociativeCache<Fifo>;
pub type FullAssociativeLruCache = FullAssociativeCache<Lru>;
pub type FullAssociativeLfuCache = FullAssociativeCache<Lfu>;
pub type FullAssociativeRandomCache = FullAssociativeCache<Random>;
pub type FullAssociativeTreePlruCache = FullAssociativeCache<TreePlru>;

impl<P: ReplacementPolicy> FullAssociativeCache<P> {
    /// Creates an empty cache with one slot per entry the policy manages
    pub fn new(policy: P) -> Self {
        let size = policy.capacity();
        Self {
            slots: vec![None; size],
            index: HashMap::with_capacity(size),
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, key: &FlowKey) -> bool {
        self.index.contains_key(key)
    }

    /// The slot a key currently occupies
    pub fn slot_of(&self, key: &FlowKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn references(&self, key: &FlowKey) -> Option<u64> {
        self.slot_of(key)
            .and_then(|slot| self.slots[slot].as_ref())
            .map(|entry| entry.references)
    }

    pub fn slots(&self) -> &[Option<CacheEntry>] {
        &self.slots
    }

    pub fn keys(&self) -> impl Iterator<Item = &FlowKey> {
        self.slots.iter().flatten().map(|entry| &entry.key)
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl FullAssociativeCache<Fifo> {
    pub fn fifo(size: usize) -> Result<Self, ConfigError> {
        Ok(Self::new(Fifo::new(size)?))
    }
}

impl FullAssociativeCache<Lru> {
    pub fn lru(size: usize) -> Result<Self, ConfigError> {
        Ok(Self::new(Lru::new(size)?))
    }
}

impl FullAssociativeCache<Lfu> {
    pub fn lfu(size: usize) -> Result<Self, ConfigError> {
        Ok(Self::new(Lfu::new(size)?))
    }
}

impl FullAssociativeCache<Random> {
    pub fn random(size: usize, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self::new(Random::new(size, seed)?))
    }
}

impl FullAssociativeCache<TreePlru> {
    pub fn tree_plru(size: usize) -> Result<Self, ConfigError> {
        Ok(Self::new(TreePlru::new(size)?))
    }
}

impl<P: ReplacementPolicy> Cache for FullAssociativeCache<P> {
    fn probe(&mut self, key: &FlowKey, update: bool) -> bool {
        let Some(&slot) = self.index.get(key) else {
            return false;
        };
        if update {
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.references += 1;
            }
            self.policy.update_on_hit(slot, &self.slots);
        }
        true
    }

    fn insert(&mut self, key: FlowKey) -> Vec<FlowKey> {
        if self.probe(&key, true) {
            return Vec::new();
        }
        let slot = self.policy.get_victim_slot(&self.slots);
        let evicted = self.slots[slot].replace(CacheEntry::new(key));
        if let Some(old) = &evicted {
            trace!(evicted = %old.key, inserted = %key, slot, "replaced entry");
            self.index.remove(&old.key);
        }
        self.index.insert(key, slot);
        self.policy.update_on_insert(slot, &self.slots);
        evicted.map(|entry| entry.key).into_iter().collect()
    }

    fn invalidate(&mut self, key: &FlowKey) -> Result<(), CacheError> {
        let slot = self.index.remove(key).ok_or(CacheError::NotCached(*key))?;
        self.slots[slot] = None;
        self.policy.update_on_invalidate(slot);
        Ok(())
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.index.clear();
        self.policy.reset();
    }

    fn describe(&self) -> String {
        format!("FullAssociative{}Cache", P::NAME)
    }

    fn parameters(&self) -> Value {
        json!({
            "Type": self.describe(),
            "Size": self.capacity(),
        })
    }

    fn resident_count(&self) -> usize {
        self.index.len()
    }
}

/// An N-way set-associative cache: `size / way` independent fully associative sets of `way`
/// entries each
///
/// A key is routed to its set by the CRC-32 of its big-endian encoding. Sets never rebalance, so
/// keys in different sets never evict each other
pub struct SetAssociativeCache<P: ReplacementPolicy> {
    sets: Vec<FullAssociativeCache<P>>,
    way: usize,
    size: usize,
}

pub type SetAssociativeFifoCache = SetAssociativeCache<Fifo>;
pub type SetAssociativeLruCache = SetAssociativeCache<Lru>;
pub type SetAssociativeLfuCache = SetAssociativeCache<Lfu>;
pub type SetAssociativeRandomCache = SetAssociativeCache<Random>;
pub type SetAssociativeTreePlruCache = SetAssociativeCache<TreePlru>;

impl<P: ReplacementPolicy> SetAssociativeCache<P> {
    /// Creates a new set-associative cache
    ///
    /// # Arguments
    ///
    /// * `size`: The total number of entries
    /// * `way`: The number of entries per set
    /// * `new_policy`: Builds the replacement policy for the set with the given index, each set
    /// must manage exactly `way` entries
    ///
    /// returns: Result<SetAssociativeCache<P>, ConfigError>
    pub fn new(size: usize, way: usize, mut new_policy: impl FnMut(usize) -> Result<P, ConfigError>) -> Result<Self, ConfigError> {
        if size == 0 || way == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if size % way != 0 {
            return Err(ConfigError::SizeNotMultipleOfWay { size, way });
        }
        let sets = (0..size / way)
            .map(|set| new_policy(set).map(FullAssociativeCache::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { sets, way, size })
    }

    /// The set `key` belongs to, for its whole lifetime
    pub fn set_index(&self, key: &FlowKey) -> usize {
        crc32fast::hash(&key.to_be_bytes()) as usize % self.sets.len()
    }

    pub fn sets(&self) -> &[FullAssociativeCache<P>] {
        &self.sets
    }

    pub fn way(&self) -> usize {
        self.way
    }

    pub fn capacity(&self) -> usize {
        self.size
    }

    fn set_for(&mut self, key: &FlowKey) -> &mut FullAssociativeCache<P> {
        let index = self.set_index(key);
        &mut self.sets[index]
    }
}

impl SetAssociativeCache<Fifo> {
    pub fn fifo(size: usize, way: usize) -> Result<Self, ConfigError> {
        Self::new(size, way, |_| Fifo::new(way))
    }
}

impl SetAssociativeCache<Lru> {
    pub fn lru(size: usize, way: usize) -> Result<Self, ConfigError> {
        Self::new(size, way, |_| Lru::new(way))
    }
}

impl SetAssociativeCache<Lfu> {
    pub fn lfu(size: usize, way: usize) -> Result<Self, ConfigError> {
        Self::new(size, way, |_| Lfu::new(way))
    }
}

impl SetAssociativeCache<Random> {
    /// Each set draws from its own generator, seeded with `seed` plus the set index
    pub fn random(size: usize, way: usize, seed: u64) -> Result<Self, ConfigError> {
        Self::new(size, way, |set| Random::new(way, seed.wrapping_add(set as u64)))
    }
}

impl SetAssociativeCache<TreePlru> {
    pub fn tree_plru(size: usize, way: usize) -> Result<Self, ConfigError> {
        Self::new(size, way, |_| TreePlru::new(way))
    }
}

impl<P: ReplacementPolicy> Cache for SetAssociativeCache<P> {
    fn probe(&mut self, key: &FlowKey, update: bool) -> bool {
        self.set_for(key).probe(key, update)
    }

    fn insert(&mut self, key: FlowKey) -> Vec<FlowKey> {
        self.set_for(&key).insert(key)
    }

    fn invalidate(&mut self, key: &FlowKey) -> Result<(), CacheError> {
        self.set_for(key).invalidate(key)
    }

    fn clear(&mut self) {
        self.sets.iter_mut().for_each(Cache::clear);
    }

    fn describe(&self) -> String {
        format!("NWaySetAssociative{}Cache", P::NAME)
    }

    fn parameters(&self) -> Value {
        json!({
            "Type": self.describe(),
            "Way": self.way,
            "Size": self.size,
        })
    }

    fn resident_count(&self) -> usize {
        self.sets.iter().map(Cache::resident_count).sum()
    }
}

/// Enum for every kind of cache the library provides
///
/// Using trait objects would be less boilerplate, but it's opaque to the compiler and every packet
/// in a trace goes through at least one dynamic call per layer
///
/// Explicitly branching on the variants lets the compiler reason about the concrete types and
/// inline the replacement policies. The decorator and the hierarchy are the recursive cases, they
/// hold further GenericCaches
pub enum GenericCache {
    FullAssociativeFifo(FullAssociativeFifoCache),
    FullAssociativeLru(FullAssociativeLruCache),
    FullAssociativeLfu(FullAssociativeLfuCache),
    FullAssociativeRandom(FullAssociativeRandomCache),
    FullAssociativeTreePlru(FullAssociativeTreePlruCache),
    SetAssociativeFifo(SetAssociativeFifoCache),
    SetAssociativeLru(SetAssociativeLruCache),
    SetAssociativeLfu(SetAssociativeLfuCache),
    SetAssociativeRandom(SetAssociativeRandomCache),
    SetAssociativeTreePlru(SetAssociativeTreePlruCache),
    LookAhead(Box<CacheWithLookAhead>),
    MultiLayer(MultiLayerCache),
}

macro_rules! dispatch {
    ($self:ident, $cache:ident => $body:expr) => {
        match $self {
            GenericCache::FullAssociativeFifo($cache) => $body,
            GenericCache::FullAssociativeLru($cache) => $body,
            GenericCache::FullAssociativeLfu($cache) => $body,
            GenericCache::FullAssociativeRandom($cache) => $body,
            GenericCache::FullAssociativeTreePlru($cache) => $body,
            GenericCache::SetAssociativeFifo($cache) => $body,
            GenericCache::SetAssociativeLru($cache) => $body,
            GenericCache::SetAssociativeLfu($cache) => $body,
            GenericCache::SetAssociativeRandom($cache) => $body,
            GenericCache::SetAssociativeTreePlru($cache) => $body,
            GenericCache::LookAhead($cache) => $body,
            GenericCache::MultiLayer($cache) => $body,
        }
    };
}

macro_rules! impl_from {
    ($variant:ident, $cache:ty) => {
        impl From<$cache> for GenericCache {
            fn from(value: $cache) -> Self {
                Self::$variant(value)
            }
        }
    };
}

impl_from!(FullAssociativeFifo, FullAssociativeFifoCache);
impl_from!(FullAssociativeLru, FullAssociativeLruCache);
impl_from!(FullAssociativeLfu, FullAssociativeLfuCache);
impl_from!(FullAssociativeRandom, FullAssociativeRandomCache);
impl_from!(FullAssociativeTreePlru, FullAssociativeTreePlruCache);
impl_from!(SetAssociativeFifo, SetAssociativeFifoCache);
impl_from!(SetAssociativeLru, SetAssociativeLruCache);
impl_from!(SetAssociativeLfu, SetAssociativeLfuCache);
impl_from!(SetAssociativeRandom, SetAssociativeRandomCache);
impl_from!(SetAssociativeTreePlru, SetAssociativeTreePlruCache);
impl_from!(MultiLayer, MultiLayerCache);

impl From<CacheWithLookAhead> for GenericCache {
    fn from(value: CacheWithLookAhead) -> Self {
        Self::LookAhead(Box::new(value))
    }
}

impl Cache for GenericCache {
    fn probe(&mut self, key: &FlowKey, update: bool) -> bool {
        dispatch!(self, c => c.probe(key, update))
    }

    fn insert(&mut self, key: FlowKey) -> Vec<FlowKey> {
        dispatch!(self, c => c.insert(key))
    }

    fn invalidate(&mut self, key: &FlowKey) -> Result<(), CacheError> {
        dispatch!(self, c => c.invalidate(key))
    }

    fn clear(&mut self) {
        dispatch!(self, c => c.clear())
    }

    fn describe(&self) -> String {
        dispatch!(self, c => c.describe())
    }

    fn parameters(&self) -> Value {
        dispatch!(self, c => c.parameters())
    }

    fn stat_string(&self) -> String {
        dispatch!(self, c => c.stat_string())
    }

    fn resident_count(&self) -> usize {
        dispatch!(self, c => c.resident_count())
    }

    fn supports_invalidate(&self) -> bool {
        dispatch!(self, c => c.supports_invalidate())
    }
}
