use serde_json::{json, Value};
use tracing::trace;
use crate::cache::{Cache, GenericCache};
use crate::error::CacheError;
use crate::flow_key::{FlowKey, Protocol};

/// Wraps a cache, inserting the reply direction of every TCP flow along with the flow itself
///
/// TCP flows are bidirectional, so caching the reverse key up front saves the miss on the first
/// reply packet. Probing and invalidation pass straight through
pub struct CacheWithLookAhead<C: Cache = GenericCache> {
    inner: C,
}

impl<C: Cache> CacheWithLookAhead<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: Cache> Cache for CacheWithLookAhead<C> {
    fn probe(&mut self, key: &FlowKey, update: bool) -> bool {
        self.inner.probe(key, update)
    }

    fn insert(&mut self, key: FlowKey) -> Vec<FlowKey> {
        let mut evicted = self.inner.insert(key);
        if key.protocol == Protocol::Tcp {
            let reversed = key.reversed();
            if !self.inner.probe(&reversed, false) {
                trace!(key = %reversed, "looking ahead");
                evicted.extend(self.inner.insert(reversed));
            }
        }
        evicted
    }

    fn invalidate(&mut self, key: &FlowKey) -> Result<(), CacheError> {
        self.inner.invalidate(key)
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn describe(&self) -> String {
        format!("CacheWithLookAhead[{}]", self.inner.describe())
    }

    fn parameters(&self) -> Value {
        json!([self.inner.parameters()])
    }

    fn stat_string(&self) -> String {
        self.inner.stat_string()
    }

    fn resident_count(&self) -> usize {
        self.inner.resident_count()
    }

    fn supports_invalidate(&self) -> bool {
        self.inner.supports_invalidate()
    }
}
