//! In-process cache backend.
//!
//! Keeps pinned payloads in memory. Used when running without a pinning
//! service and as a controllable backend in tests: reachability can be
//! toggled to simulate an outage.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::DateTime;

use super::backend::{CacheBackend, CachePayload, ContentId, PinRecord};
use crate::{Result, SolverError};

#[derive(Default)]
struct State {
    pins: HashMap<ContentId, CachePayload>,
    next_id: u64,
}

/// Cache backend holding payloads in process memory.
pub struct MemoryBackend {
    state: RwLock<State>,
    reachable: AtomicBool,
    pins: AtomicU32,
    fetches: AtomicU32,
    unpins: AtomicU32,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            reachable: AtomicBool::new(true),
            pins: AtomicU32::new(0),
            fetches: AtomicU32::new(0),
            unpins: AtomicU32::new(0),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of successful pins.
    pub fn pin_count(&self) -> u32 {
        self.pins.load(Ordering::SeqCst)
    }

    /// Number of successful fetches.
    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of successful unpins.
    pub fn unpin_count(&self) -> u32 {
        self.unpins.load(Ordering::SeqCst)
    }

    /// Number of payloads currently pinned.
    pub fn len(&self) -> usize {
        self.read(|state| state.pins.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SolverError::Http("memory backend unreachable".into()))
        }
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        match self.state.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn pin(&self, payload: &CachePayload) -> Result<ContentId> {
        self.ensure_reachable()?;
        let cid = self.write(|state| {
            state.next_id += 1;
            let cid = ContentId::new(format!("mem-{}-{}", payload.cache_key, state.next_id));
            state.pins.insert(cid.clone(), payload.clone());
            cid
        });
        self.pins.fetch_add(1, Ordering::SeqCst);
        Ok(cid)
    }

    async fn fetch(&self, cid: &ContentId) -> Result<CachePayload> {
        self.ensure_reachable()?;
        let payload = self
            .read(|state| state.pins.get(cid).cloned())
            .ok_or_else(|| SolverError::NotFound(cid.to_string()))?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(payload)
    }

    async fn list(&self) -> Result<Vec<PinRecord>> {
        self.ensure_reachable()?;
        Ok(self.read(|state| {
            state
                .pins
                .iter()
                .filter_map(|(cid, payload)| {
                    Some(PinRecord {
                        key: payload.cache_key,
                        cid: cid.clone(),
                        created_at: DateTime::from_timestamp(payload.timestamp, 0)?,
                    })
                })
                .collect()
        }))
    }

    async fn unpin(&self, cid: &ContentId) -> Result<()> {
        self.ensure_reachable()?;
        self.write(|state| state.pins.remove(cid))
            .ok_or_else(|| SolverError::NotFound(cid.to_string()))?;
        self.unpins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn check(&self) -> Result<()> {
        self.ensure_reachable()
    }
}
