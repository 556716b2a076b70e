//! Governance engine: access decisions, change-request workflow, administrative edits, audit
//! queries, and access reporting over the store traits.
//!
//! # Purpose
//! [`GovernanceEngine`] is the single entry point the HTTP layer (and tests) talk to. It loads
//! permission sources through [`crate::store`], hands them to `gatehouse_authz` for aggregation and
//! resolution, and routes every mutation through the store's atomic governed-change commit.
//!
//! # Key invariants
//! - Decisions never surface errors; a missing binding or a failing store denies with a
//!   [`DenialReason`].
//! - Every mutating operation holds the entity locks of what it reads and writes, captures old
//!   values under those locks, and commits exactly one audit entry with the mutation.
//! - Cached capabilities are invalidated after every successful commit.
mod admin;
pub mod cache;
mod decisions;
mod error;
pub mod locks;
mod report;
mod workflow;

pub use decisions::AttemptMetadata;
pub use error::{GovernanceError, GovernanceResult};

use crate::governance::cache::CapabilityCache;
use crate::governance::locks::EntityLocks;
use crate::store::{GovernanceStore, StoreError, StoreResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_REPORT_TOP_N: usize = 10;

/// Actor recorded on audit entries written by the service itself.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub cache_ttl: Duration,
    /// Upper bound for any single store call.
    pub store_timeout: Duration,
    /// Also log granted checks, not just denials.
    pub log_granted_attempts: bool,
    pub report_top_n: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            log_granted_attempts: true,
            report_top_n: DEFAULT_REPORT_TOP_N,
        }
    }
}

pub struct GovernanceEngine {
    store: Arc<dyn GovernanceStore>,
    cache: CapabilityCache,
    locks: EntityLocks,
    settings: EngineSettings,
}

impl GovernanceEngine {
    pub fn new(store: Arc<dyn GovernanceStore>, settings: EngineSettings) -> Self {
        Self {
            store,
            cache: CapabilityCache::new(settings.cache_ttl),
            locks: EntityLocks::new(),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn GovernanceStore> {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run a store call under the configured timeout; a timeout reads as `Unavailable`.
    async fn bounded<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.settings.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "store call exceeded {}ms",
                self.settings.store_timeout.as_millis()
            ))),
        }
    }
}
