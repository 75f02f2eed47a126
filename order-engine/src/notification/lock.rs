//! In-flight de-duplication for notification sends
//!
//! [`InFlightLock`] is the seam for a distributed lock; [`LocalInFlightLock`]
//! is process-local. Entries expire after a TTL so a crashed dispatch cannot
//! block an order forever.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::order::NotificationKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Identifies one acquisition of a key
pub type LockToken = u64;

pub trait InFlightLock: Send + Sync {
    /// Returns `None` if `key` is already held
    fn try_acquire(&self, key: &str) -> Option<LockToken>;

    /// No-op unless `token` still owns `key`
    fn release(&self, key: &str, token: LockToken);
}

/// Lock key for one notification kind on one order
pub fn lock_key(kind: NotificationKind, order_id: &str) -> String {
    format!("{}:{}", kind, order_id)
}

#[derive(Debug, Clone, Copy)]
struct Holder {
    token: LockToken,
    acquired_at: Instant,
}

#[derive(Debug)]
pub struct LocalInFlightLock {
    held: DashMap<String, Holder>,
    next_token: AtomicU64,
    ttl: Duration,
}

impl LocalInFlightLock {
    pub fn new(ttl: Duration) -> Self {
        Self {
            held: DashMap::new(),
            next_token: AtomicU64::new(1),
            ttl,
        }
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    fn holder(&self) -> Holder {
        Holder {
            token: self.next_token.fetch_add(1, Ordering::Relaxed),
            acquired_at: Instant::now(),
        }
    }
}

impl InFlightLock for LocalInFlightLock {
    fn try_acquire(&self, key: &str) -> Option<LockToken> {
        match self.held.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().acquired_at.elapsed() >= self.ttl {
                    tracing::warn!(key = %key, "In-flight lock expired, taking over");
                    let holder = self.holder();
                    entry.insert(holder);
                    Some(holder.token)
                } else {
                    None
                }
            }
            Entry::Vacant(entry) => {
                let holder = self.holder();
                entry.insert(holder);
                Some(holder.token)
            }
        }
    }

    fn release(&self, key: &str, token: LockToken) {
        if self.held.remove_if(key, |_, holder| holder.token == token).is_none() {
            tracing::debug!(key = %key, token, "Stale release ignored, lock was taken over");
        }
    }
}

/// Releases the key on drop, if this guard still owns it
pub struct InFlightGuard {
    lock: Arc<dyn InFlightLock>,
    key: String,
    token: LockToken,
}

impl InFlightGuard {
    pub fn acquire(lock: &Arc<dyn InFlightLock>, key: String) -> Option<Self> {
        let token = lock.try_acquire(&key)?;
        Some(Self {
            lock: Arc::clone(lock),
            key,
            token,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.lock.release(&self.key, self.token);
    }
}
