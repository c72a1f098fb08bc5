use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::trace;
use crate::cache::{Cache, GenericCache};
use crate::error::{CacheError, ConfigError};
use crate::flow_key::FlowKey;

/// The policy on the boundary between one layer and the next
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum CachePolicy {
    /// Every key inserted into the upper layer is also inserted into the lower one
    WriteThrough,
    /// Only keys evicted from the upper layer move down, a promoted key stays in the lower layer
    WriteBackInclusive,
    /// Only keys evicted from the upper layer move down, a promoted key leaves the lower layer
    WriteBackExclusive,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WritePolicy {
    WriteThrough,
    WriteBack,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InclusionPolicy {
    Inclusive,
    Exclusive,
}

impl CachePolicy {
    pub fn write_policy(self) -> WritePolicy {
        match self {
            CachePolicy::WriteThrough => WritePolicy::WriteThrough,
            CachePolicy::WriteBackInclusive | CachePolicy::WriteBackExclusive => WritePolicy::WriteBack,
        }
    }

    pub fn inclusion_policy(self) -> InclusionPolicy {
        match self {
            CachePolicy::WriteThrough | CachePolicy::WriteBackInclusive => InclusionPolicy::Inclusive,
            CachePolicy::WriteBackExclusive => InclusionPolicy::Exclusive,
        }
    }
}

/// One level of the hierarchy and its counters
pub struct Layer<C: Cache = GenericCache> {
    cache: C,
    /// Policy towards the next layer, the last layer has none
    policy: Option<CachePolicy>,
    referenced: u64,
    replaced: u64,
    hit: u64,
}

impl<C: Cache> Layer<C> {
    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn policy(&self) -> Option<CachePolicy> {
        self.policy
    }

    /// The number of probes which reached this layer
    pub fn referenced(&self) -> u64 {
        self.referenced
    }

    /// The number of keys this layer has evicted
    pub fn replaced(&self) -> u64 {
        self.replaced
    }

    pub fn hit(&self) -> u64 {
        self.hit
    }
}

/// A hierarchy of caches, modelled on L1..Ln hardware caches
///
/// Layer 0 is the smallest and fastest and is probed first. A hit below layer 0 promotes the key
/// back to the top, and insertions cascade down according to each boundary's write policy
pub struct MultiLayerCache<C: Cache = GenericCache> {
    layers: Vec<Layer<C>>,
}

impl<C: Cache> MultiLayerCache<C> {
    /// Creates a new hierarchy
    ///
    /// # Arguments
    ///
    /// * `caches`: The layers, fastest first
    /// * `policies`: The boundary policies, `policies[i]` sits between layer i and i + 1
    ///
    /// returns: Result<MultiLayerCache<C>, ConfigError>
    pub fn new(caches: Vec<C>, policies: Vec<CachePolicy>) -> Result<Self, ConfigError> {
        if policies.len() + 1 != caches.len() {
            return Err(ConfigError::PolicyCount {
                policies: policies.len(),
                layers: caches.len(),
            });
        }
        for (index, policy) in policies.iter().enumerate() {
            let lower = &caches[index + 1];
            if policy.inclusion_policy() == InclusionPolicy::Exclusive && !lower.supports_invalidate() {
                return Err(ConfigError::ExclusiveWithoutInvalidate {
                    layer: index + 1,
                    description: lower.describe(),
                });
            }
        }
        let mut policies = policies.into_iter();
        let layers = caches.into_iter()
            .map(|cache| Layer {
                cache,
                policy: policies.next(),
                referenced: 0,
                replaced: 0,
                hit: 0,
            })
            .collect();
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Layer<C>] {
        &self.layers
    }

    /// Probes each layer in turn, returning the index of the first one holding `key`
    ///
    /// With `update` set, a hit below layer 0 promotes the key to the top. If the boundary above
    /// the hit is exclusive the key is invalidated at the hit layer first
    pub fn probe_layer(&mut self, key: &FlowKey, update: bool) -> Option<usize> {
        let mut hit_layer = None;
        for (index, layer) in self.layers.iter_mut().enumerate() {
            if update {
                layer.referenced += 1;
            }
            if layer.cache.probe(key, update) {
                if update {
                    layer.hit += 1;
                }
                hit_layer = Some(index);
                break;
            }
        }
        if update {
            if let Some(index) = hit_layer.filter(|index| *index > 0) {
                if matches!(self.layers[index - 1].policy, Some(CachePolicy::WriteBackExclusive)) {
                    // The key was just found here
                    self.layers[index].cache.invalidate(key)
                        .expect("construction rejects exclusive boundaries over layers that can't invalidate");
                }
                trace!(%key, from = index, "promoting");
                self.insert(*key);
            }
        }
        hit_layer
    }
}

impl<C: Cache> Cache for MultiLayerCache<C> {
    fn probe(&mut self, key: &FlowKey, update: bool) -> bool {
        self.probe_layer(key, update).is_some()
    }

    /// Inserts into layer 0 and cascades down the hierarchy. Returns the keys evicted from the last
    /// layer, which have left the hierarchy entirely
    fn insert(&mut self, key: FlowKey) -> Vec<FlowKey> {
        let mut pending = vec![key];
        let mut evicted_from_last = Vec::new();
        for (index, layer) in self.layers.iter_mut().enumerate() {
            let mut next = Vec::new();
            for key in &pending {
                let evicted = layer.cache.insert(*key);
                layer.replaced += evicted.len() as u64;
                match layer.policy.map(CachePolicy::write_policy) {
                    None => evicted_from_last.extend(evicted),
                    Some(WritePolicy::WriteBack) => next.extend(evicted),
                    Some(WritePolicy::WriteThrough) => next.push(*key),
                }
            }
            if next.is_empty() {
                break;
            }
            trace!(layer = index, keys = next.len(), "cascading to next layer");
            pending = next;
        }
        evicted_from_last
    }

    fn invalidate(&mut self, _key: &FlowKey) -> Result<(), CacheError> {
        Err(CacheError::InvalidateUnsupported(self.describe()))
    }

    /// Empties every layer. The counters describe the whole run and are kept
    fn clear(&mut self) {
        self.layers.iter_mut().for_each(|layer| layer.cache.clear());
    }

    fn describe(&self) -> String {
        let layers = self.layers.iter()
            .map(|layer| layer.cache.describe())
            .collect::<Vec<_>>()
            .join(", ");
        format!("MultiLayerCache[{layers}]")
    }

    fn parameters(&self) -> Value {
        let layers = self.layers.iter().map(|layer| layer.cache.parameters()).collect::<Vec<_>>();
        let policies = self.layers.iter().filter_map(|layer| layer.policy).collect::<Vec<_>>();
        json!({
            "Type": "MultiLayerCache",
            "CacheLayers": layers,
            "CachePolicies": policies,
        })
    }

    fn stat_string(&self) -> String {
        json!({
            "Referenced": self.layers.iter().map(Layer::referenced).collect::<Vec<_>>(),
            "Replaced": self.layers.iter().map(Layer::replaced).collect::<Vec<_>>(),
            "Hit": self.layers.iter().map(Layer::hit).collect::<Vec<_>>(),
        }).to_string()
    }

    fn resident_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.cache.resident_count()).sum()
    }

    fn supports_invalidate(&self) -> bool {
        false
    }
}
