use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use crate::cache::CacheEntry;
use crate::error::ConfigError;

/// A generic trait for implementing new replacement policies. Can be used to parameterise a
/// FullAssociativeCache.
///
/// The cache owns the slots and the key lookup, the policy only decides which slot is reused next.
/// Slots are passed in read-only so policies which order by reference count can inspect them
pub trait ReplacementPolicy {
    /// Short policy name, used to build cache descriptions such as `FullAssociativeLRUCache`
    const NAME: &'static str;

    /// The number of slots this policy manages
    fn capacity(&self) -> usize;

    /// Updates the policy when a resident entry is hit with `update` set. The entry's reference
    /// count has already been incremented
    ///
    /// Not applicable for some policies, a default which does nothing is provided
    fn update_on_hit(&mut self, _slot: usize, _slots: &[Option<CacheEntry>]) {}

    /// Used by the cache to get a slot when a new key needs adding.
    ///
    /// The returned slot may be free or occupied, if occupied the cache evicts its entry. The
    /// cache calls `update_on_insert` with the same slot once the new entry is in place
    fn get_victim_slot(&mut self, slots: &[Option<CacheEntry>]) -> usize;

    /// Places a newly filled slot in the eviction order
    fn update_on_insert(&mut self, _slot: usize, _slots: &[Option<CacheEntry>]) {}

    /// Called after a slot has been freed by invalidation
    fn update_on_invalidate(&mut self, _slot: usize) {}

    /// Returns the policy to its freshly constructed state
    fn reset(&mut self);
}

fn references(slots: &[Option<CacheEntry>], slot: usize) -> u64 {
    slots[slot].as_ref().map_or(0, |entry| entry.references)
}

fn check_capacity(size: usize) -> Result<(), ConfigError> {
    if size == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    Ok(())
}

/// Every slot index, ordered from the most protected (front) to the next one evicted (back)
///
/// Free slots are kept in the order too, so the first `size` insertions consume them before any
/// real entry is displaced
#[derive(Debug, Clone)]
struct EvictionOrder {
    order: Vec<usize>,
}

impl EvictionOrder {
    fn new(size: usize) -> Self {
        Self {
            order: (0..size).collect(),
        }
    }

    fn back(&self) -> usize {
        self.order[self.order.len() - 1]
    }

    /// Removes a slot from the order, returning where it was
    fn take(&mut self, slot: usize) -> Option<usize> {
        let position = self.order.iter().position(|s| *s == slot)?;
        self.order.remove(position);
        Some(position)
    }

    fn move_to_front(&mut self, slot: usize) {
        if self.take(slot).is_some() {
            self.order.insert(0, slot);
        }
    }

    fn move_to_back(&mut self, slot: usize) {
        if self.take(slot).is_some() {
            self.order.push(slot);
        }
    }
}

/// First in first out. Hits don't change the order, the oldest insertion is always evicted
#[derive(Debug, Clone)]
pub struct Fifo {
    order: EvictionOrder,
}

impl Fifo {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        check_capacity(size)?;
        Ok(Self {
            order: EvictionOrder::new(size),
        })
    }
}

impl ReplacementPolicy for Fifo {
    const NAME: &'static str = "FIFO";

    fn capacity(&self) -> usize {
        self.order.order.len()
    }

    fn get_victim_slot(&mut self, _slots: &[Option<CacheEntry>]) -> usize {
        self.order.back()
    }

    fn update_on_insert(&mut self, slot: usize, _slots: &[Option<CacheEntry>]) {
        self.order.move_to_front(slot);
    }

    fn update_on_invalidate(&mut self, slot: usize) {
        self.order.move_to_back(slot);
    }

    fn reset(&mut self) {
        self.order = EvictionOrder::new(self.capacity());
    }
}

/// Least recently used. Hits and insertions both move the slot to the front
#[derive(Debug, Clone)]
pub struct Lru {
    order: EvictionOrder,
}

impl Lru {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        check_capacity(size)?;
        Ok(Self {
            order: EvictionOrder::new(size),
        })
    }
}

impl ReplacementPolicy for Lru {
    const NAME: &'static str = "LRU";

    fn capacity(&self) -> usize {
        self.order.order.len()
    }

    fn update_on_hit(&mut self, slot: usize, _slots: &[Option<CacheEntry>]) {
        self.order.move_to_front(slot);
    }

    fn get_victim_slot(&mut self, _slots: &[Option<CacheEntry>]) -> usize {
        self.order.back()
    }

    fn update_on_insert(&mut self, slot: usize, _slots: &[Option<CacheEntry>]) {
        self.order.move_to_front(slot);
    }

    fn update_on_invalidate(&mut self, slot: usize) {
        self.order.move_to_back(slot);
    }

    fn reset(&mut self) {
        self.order = EvictionOrder::new(self.capacity());
    }
}

/// Least frequently used
///
/// The order is kept non-increasing by reference count, so the back is always a lowest-count slot.
/// A new entry is placed ahead of the run of zero-count entries at the back rather than behind it:
/// entries which have sat unused the longest go first
#[derive(Debug, Clone)]
pub struct Lfu {
    order: EvictionOrder,
}

impl Lfu {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        check_capacity(size)?;
        Ok(Self {
            order: EvictionOrder::new(size),
        })
    }
}

impl ReplacementPolicy for Lfu {
    const NAME: &'static str = "LFU";

    fn capacity(&self) -> usize {
        self.order.order.len()
    }

    fn update_on_hit(&mut self, slot: usize, slots: &[Option<CacheEntry>]) {
        let Some(mut index) = self.order.take(slot) else {
            return;
        };
        let count = references(slots, slot);
        // Pass every entry used as often or less, stop behind the first used more
        while index > 0 && references(slots, self.order.order[index - 1]) <= count {
            index -= 1;
        }
        self.order.order.insert(index, slot);
    }

    fn get_victim_slot(&mut self, _slots: &[Option<CacheEntry>]) -> usize {
        self.order.back()
    }

    fn update_on_insert(&mut self, slot: usize, slots: &[Option<CacheEntry>]) {
        if self.order.take(slot).is_none() {
            return;
        }
        let mut index = self.order.order.len();
        while index > 0 && references(slots, self.order.order[index - 1]) == 0 {
            index -= 1;
        }
        self.order.order.insert(index, slot);
    }

    fn update_on_invalidate(&mut self, slot: usize) {
        self.order.move_to_back(slot);
    }

    fn reset(&mut self) {
        self.order = EvictionOrder::new(self.capacity());
    }
}

/// Random replacement. Free slots are filled first, once full a uniformly random slot is evicted
///
/// The generator is owned and explicitly seeded so runs are reproducible
#[derive(Debug, Clone)]
pub struct Random {
    size: usize,
    seed: u64,
    rng: Xoshiro256PlusPlus,
}

impl Random {
    pub fn new(size: usize, seed: u64) -> Result<Self, ConfigError> {
        check_capacity(size)?;
        Ok(Self {
            size,
            seed,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl ReplacementPolicy for Random {
    const NAME: &'static str = "Random";

    fn capacity(&self) -> usize {
        self.size
    }

    fn get_victim_slot(&mut self, slots: &[Option<CacheEntry>]) -> usize {
        match slots.iter().position(Option::is_none) {
            Some(free) => free,
            None => self.rng.random_range(0..slots.len()),
        }
    }

    fn reset(&mut self) {
        self.rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
    }
}

/// Tree based pseudo least recently used replacement, as found in hardware caches
///
/// The tree is a heap of `size - 1` bits, node i has children 2i + 1 and 2i + 2. A set bit points
/// to the right subtree. Leaf numbers are read from the root down, so the root decides the most
/// significant bit of the slot index
///
/// ```text
/// [0] [1] [3] - 0, 1
///         [4] - 2, 3
///     [2] [5] - 4, 5
///         [6] - 6, 7
/// ```
#[derive(Debug, Clone)]
pub struct TreePlru {
    bits: Vec<bool>,
    levels: u32,
}

impl TreePlru {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        if size != 8 && size != 16 {
            return Err(ConfigError::TreePlruSize(size));
        }
        Ok(Self {
            bits: vec![false; size - 1],
            levels: size.trailing_zeros(),
        })
    }

    /// Sets every bit on the path to `leaf` to point towards it, or away from it
    fn point(&mut self, leaf: usize, towards: bool) {
        let mut node = 0;
        for level in (0..self.levels).rev() {
            let right = (leaf >> level) & 1 == 1;
            self.bits[node] = if towards { right } else { !right };
            node = 2 * node + 1 + right as usize;
        }
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }
}

impl ReplacementPolicy for TreePlru {
    const NAME: &'static str = "TreePLRU";

    fn capacity(&self) -> usize {
        self.bits.len() + 1
    }

    fn update_on_hit(&mut self, slot: usize, _slots: &[Option<CacheEntry>]) {
        self.point(slot, false);
    }

    // Follow the bits down, flipping each one on the way so the next miss takes the other branch
    fn get_victim_slot(&mut self, _slots: &[Option<CacheEntry>]) -> usize {
        let mut node = 0;
        let mut leaf = 0;
        for _ in 0..self.levels {
            let right = self.bits[node];
            leaf = (leaf << 1) | right as usize;
            self.bits[node] = !right;
            node = 2 * node + 1 + right as usize;
        }
        leaf
    }

    // Freed slots become the next victim
    fn update_on_invalidate(&mut self, slot: usize) {
        self.point(slot, true);
    }

    fn reset(&mut self) {
        self.bits.iter_mut().for_each(|bit| *bit = false);
    }
}
