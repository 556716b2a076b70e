//! Capability and visibility-matrix cache.
//!
//! # Purpose
//! Keeps aggregated capability sets (per actor) and visibility matrices (per scope) so decision
//! checks avoid reloading every source on each call.
//!
//! # Key invariants
//! - Entries expire after the configured TTL.
//! - Every entry remembers the cache generation observed *before* its sources were loaded. An
//!   invalidation bumps the generation and stamps the invalidated entity keys with it; an entry
//!   depending on a key stamped later than the entry's generation is stale and never served. This
//!   closes the window where a reader loads old data, a writer commits and invalidates, and the
//!   reader then inserts its stale result.
//! - Stamps no live entry depends on are pruned after each invalidation; entries observed before
//!   the pruned range are treated as stale instead.
use crate::governance::locks::{binding_key, matrix_key, profile_key, role_key};
use dashmap::DashMap;
use gatehouse_authz::{
    ActorId, AggregatedCapabilitySet, UserAccessBinding, VisibilityMatrix, VisibilityScope,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedCapabilities {
    set: Arc<AggregatedCapabilitySet>,
    /// Entity keys this set was derived from.
    sources: Vec<String>,
    generation: u64,
    cached_at: Instant,
}

#[derive(Debug, Clone)]
struct CachedMatrix {
    matrix: Arc<VisibilityMatrix>,
    generation: u64,
    cached_at: Instant,
}

/// Source keys an actor's aggregated set depends on.
fn source_keys(binding: &UserAccessBinding) -> Vec<String> {
    let mut keys = Vec::with_capacity(binding.role_ids.len() + 2);
    keys.push(binding_key(&binding.actor_id));
    if let Some(profile_id) = &binding.profile_id {
        keys.push(profile_key(profile_id));
    }
    keys.extend(binding.role_ids.iter().map(role_key));
    keys
}

#[derive(Debug)]
pub struct CapabilityCache {
    ttl: Duration,
    generation: AtomicU64,
    /// Generation at which each entity key was last invalidated.
    invalidated_at: DashMap<String, u64>,
    /// Entries observed before this generation may depend on a pruned stamp.
    pruned_below: AtomicU64,
    capabilities: DashMap<ActorId, CachedCapabilities>,
    matrices: DashMap<VisibilityScope, CachedMatrix>,
}

impl CapabilityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            generation: AtomicU64::new(0),
            invalidated_at: DashMap::new(),
            pruned_below: AtomicU64::new(0),
            capabilities: DashMap::new(),
            matrices: DashMap::new(),
        }
    }

    /// Current generation; read it before loading sources and pass it to `insert_*`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_stale(&self, keys: &[String], generation: u64) -> bool {
        generation < self.pruned_below.load(Ordering::SeqCst)
            || keys.iter().any(|key| {
                self.invalidated_at
                    .get(key)
                    .is_some_and(|stamp| *stamp > generation)
            })
    }

    pub fn get_capabilities(&self, actor_id: &ActorId) -> Option<Arc<AggregatedCapabilitySet>> {
        if let Some(cached) = self.capabilities.get(actor_id) {
            if cached.cached_at.elapsed() < self.ttl
                && !self.is_stale(&cached.sources, cached.generation)
            {
                return Some(cached.set.clone());
            }
            drop(cached);
            self.capabilities.remove(actor_id);
        }
        None
    }

    pub fn insert_capabilities(
        &self,
        binding: &UserAccessBinding,
        set: Arc<AggregatedCapabilitySet>,
        generation: u64,
    ) {
        let sources = source_keys(binding);
        if self.is_stale(&sources, generation) {
            return;
        }
        self.capabilities.insert(
            binding.actor_id.clone(),
            CachedCapabilities {
                set,
                sources,
                generation,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn get_matrix(&self, scope: VisibilityScope) -> Option<Arc<VisibilityMatrix>> {
        if let Some(cached) = self.matrices.get(&scope) {
            let key = [matrix_key(scope)];
            if cached.cached_at.elapsed() < self.ttl && !self.is_stale(&key, cached.generation) {
                return Some(cached.matrix.clone());
            }
            drop(cached);
            self.matrices.remove(&scope);
        }
        None
    }

    pub fn insert_matrix(&self, scope: VisibilityScope, matrix: Arc<VisibilityMatrix>, generation: u64) {
        if self.is_stale(&[matrix_key(scope)], generation) {
            return;
        }
        self.matrices.insert(
            scope,
            CachedMatrix {
                matrix,
                generation,
                cached_at: Instant::now(),
            },
        );
    }

    /// Invalidate everything derived from the given entity keys.
    pub fn invalidate<I>(&self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        let keys: Vec<String> = keys.into_iter().collect();
        if keys.is_empty() {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        for key in &keys {
            self.invalidated_at.insert(key.clone(), generation);
        }
        self.capabilities
            .retain(|_, cached| !cached.sources.iter().any(|source| keys.contains(source)));
        self.matrices
            .retain(|scope, _| !keys.contains(&matrix_key(*scope)));
        self.prune_stamps(generation);
        metrics::counter!("gatehouse_cache_invalidations_total").increment(keys.len() as u64);
        tracing::debug!(?keys, generation, "capability cache invalidated");
    }

    /// Drop stamps at or below the oldest live entry's generation.
    fn prune_stamps(&self, current: u64) {
        let oldest_live = self
            .capabilities
            .iter()
            .map(|entry| entry.generation)
            .chain(self.matrices.iter().map(|entry| entry.generation))
            .min()
            .unwrap_or(current);
        self.pruned_below.fetch_max(oldest_live, Ordering::SeqCst);
        self.invalidated_at.retain(|_, stamp| *stamp > oldest_live);
    }

    /// Invalidation stamps still retained.
    pub fn stamp_count(&self) -> usize {
        self.invalidated_at.len()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}
