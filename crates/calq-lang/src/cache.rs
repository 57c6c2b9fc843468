use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;
use tracing::debug;

use crate::executor::Formula;

pub const DEFAULT_MAXIMUM_SIZE: usize = 500;
pub const DEFAULT_REDUCTION_SIZE: usize = 50;

#[derive(Debug)]
struct Slot<V> {
    value: Mutex<Option<V>>,
    last_access: AtomicU64,
}

impl<V> Slot<V> {
    fn new(tick: u64) -> Self {
        Self {
            value: Mutex::new(None),
            last_access: AtomicU64::new(tick),
        }
    }
}

/// Concurrent memo of built formulas keyed by formula fingerprint.
///
/// Each key is built at most once at a time: callers asking for a key that is being built wait
/// for that build instead of starting their own. A failed build is dropped from the cache so the
/// next caller retries. Once the cache grows past `maximum_size` the least recently used entries are
/// dropped until at most `maximum_size - reduction_size` remain.
#[derive(Debug)]
pub struct FormulaCache<V = Formula> {
    maximum_size: usize,
    reduction_size: usize,
    entries: DashMap<SmolStr, Arc<Slot<V>>, FxBuildHasher>,
    clock: AtomicU64,
}

impl<V: Clone> Default for FormulaCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAXIMUM_SIZE, DEFAULT_REDUCTION_SIZE)
    }
}

impl<V: Clone> FormulaCache<V> {
    pub fn new(maximum_size: usize, reduction_size: usize) -> Self {
        Self {
            maximum_size,
            reduction_size,
            entries: DashMap::with_hasher(FxBuildHasher),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the cached value for `key`, if it has been built.
    pub fn get(&self, key: &str) -> Option<V> {
        let slot = self.entries.get(key).map(|entry| Arc::clone(entry.value()))?;
        slot.last_access.store(self.tick(), Ordering::Relaxed);
        let value = slot.value.lock().unwrap_or_else(PoisonError::into_inner);
        value.clone()
    }

    /// Returns the value for `key`, running `factory` to build it on a miss.
    pub fn get_or_add<E>(&self, key: &str, factory: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        let tick = self.tick();
        let slot = Arc::clone(
            self.entries
                .entry(SmolStr::new(key))
                .or_insert_with(|| Arc::new(Slot::new(tick)))
                .value(),
        );
        slot.last_access.store(tick, Ordering::Relaxed);

        let mut value = slot.value.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = value.as_ref() {
            debug!(key, "formula cache hit");
            return Ok(value.clone());
        }

        debug!(key, "formula cache miss");
        let built = match factory() {
            Ok(built) => built,
            Err(e) => {
                self.entries.remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
                return Err(e);
            }
        };
        *value = Some(built.clone());
        drop(value);

        self.ensure_capacity();
        Ok(built)
    }

    fn ensure_capacity(&self) {
        if self.entries.len() <= self.maximum_size {
            return;
        }

        let target = self.maximum_size.saturating_sub(self.reduction_size);
        let mut candidates: Vec<(SmolStr, u64)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_access.load(Ordering::Relaxed)))
            .collect();
        candidates.sort_unstable_by_key(|(_, last_access)| *last_access);

        let mut evicted = 0usize;
        for (key, _) in candidates {
            if self.entries.len() <= target {
                break;
            }

            // Only built values go. An empty slot is waiting for its builder, a locked one is
            // being built or read.
            let removed = self
                .entries
                .remove_if(&key, |_, slot| {
                    slot.value.try_lock().is_ok_and(|value| value.is_some())
                })
                .is_some();
            if removed {
                evicted += 1;
            }
        }

        debug!(evicted, remaining = self.entries.len(), "formula cache evicted entries");
    }

    /// Whether a built value is stored under `key`. Waits for an in-flight build of that key.
    pub fn contains_key(&self, key: &str) -> bool {
        let Some(slot) = self.entries.get(key).map(|entry| Arc::clone(entry.value())) else {
            return false;
        };
        let value = slot.value.lock().unwrap_or_else(PoisonError::into_inner);
        value.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }

    pub fn reduction_size(&self) -> usize {
        self.reduction_size
    }
}
