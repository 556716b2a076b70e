//! Per-entity write serialization.
//!
//! Every mutation path locks the keys of the entities it reads and writes before loading them,
//! so read-modify-write sequences on the same profile, role, binding, matrix, or request never
//! interleave. Multiple keys are always acquired in sorted order.
use dashmap::DashMap;
use gatehouse_authz::{ActorId, ProfileId, RoleId, VisibilityScope};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::RequestId;

pub fn binding_key(id: &ActorId) -> String {
    format!("binding:{id}")
}

pub fn profile_key(id: &ProfileId) -> String {
    format!("profile:{id}")
}

pub fn role_key(id: &RoleId) -> String {
    format!("role:{id}")
}

pub fn matrix_key(scope: VisibilityScope) -> String {
    format!("matrix:{scope}")
}

pub fn request_key(id: RequestId) -> String {
    format!("request:{id}")
}

type LockTable = DashMap<String, Arc<Mutex<()>>>;

#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: Arc<LockTable>,
}

/// Guards released together when dropped. A key's table entry goes away with its last holder.
#[derive(Debug)]
pub struct EntityGuard {
    table: Arc<LockTable>,
    keys: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        self.guards.clear();
        for key in &self.keys {
            self.table
                .remove_if(key, |_, handle| Arc::strong_count(handle) == 1);
        }
    }
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn lock(&self, key: String) -> EntityGuard {
        self.lock_all(vec![key]).await
    }

    pub async fn lock_all(&self, mut keys: Vec<String>) -> EntityGuard {
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let handle = self.handle(key);
            guards.push(handle.lock_owned().await);
        }
        EntityGuard {
            table: self.locks.clone(),
            keys,
            guards,
        }
    }

    /// Keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(EntityLocks::new());
        let guard = locks.lock(profile_key(&ProfileId::new("staff"))).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(profile_key(&ProfileId::new("staff"))).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("released")
            .expect("join");
    }

    #[tokio::test]
    async fn released_keys_leave_the_table() {
        let locks = Arc::new(EntityLocks::new());
        let guard = locks
            .lock_all(vec![request_key(7), binding_key(&ActorId::new("bob"))])
            .await;
        assert_eq!(locks.len(), 2);

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(request_key(7)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("released")
            .expect("join");

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn lock_all_dedupes_keys() {
        let locks = EntityLocks::new();
        let key = role_key(&RoleId::new("ops"));
        let _guard = locks.lock_all(vec![key.clone(), key]).await;
    }
}
