//! Tap registry: preset taps, hash-keyed buckets and removal handles

use crate::hooks::{BucketKey, HookValue, Tap, TapFn, TapId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::debug;

/// Function from call arguments to the bucket whose taps should also run
pub type BucketHash<V, K> = Arc<dyn Fn(&[V]) -> Option<K> + Send + Sync>;

/// Entry for a registered tap
struct TapEntry<V, K> {
    tap: Arc<Tap<V>>,
    /// `None` means the tap lives in the preset set
    bucket: Option<K>,
}

struct RegistryState<V, K> {
    /// Never reset, so ids stay unique across `exhaust()`
    next_id: u64,
    /// Always-active taps; ids are monotonic so set order is insertion order
    preset: BTreeSet<TapId>,
    buckets: HashMap<K, BTreeSet<TapId>>,
    taps: HashMap<TapId, TapEntry<V, K>>,
}

impl<V, K: BucketKey> RegistryState<V, K> {
    /// Unlink a tap and hand back its entry; the caller drops it once unlocked
    fn remove(&mut self, id: TapId) -> Option<TapEntry<V, K>> {
        let entry = self.taps.remove(&id)?;

        match &entry.bucket {
            None => {
                self.preset.remove(&id);
            }
            Some(key) => {
                if let Some(ids) = self.buckets.get_mut(key) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        self.buckets.remove(key);
                    }
                }
            }
        }
        Some(entry)
    }
}

/// Removal side of the registry, erased so handles don't carry its type parameters
trait RemoveTap: Send + Sync {
    fn remove_tap(&self, id: TapId) -> bool;
}

impl<V: HookValue, K: BucketKey> RemoveTap for RwLock<RegistryState<V, K>> {
    fn remove_tap(&self, id: TapId) -> bool {
        let removed = self
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        match removed {
            Some(entry) => {
                drop(entry);
                debug!(tap = %id, "Tap removed");
                true
            }
            None => false,
        }
    }
}

/// Handle returned by registration; removes exactly the tap it was returned for
#[derive(Clone)]
pub struct TapHandle {
    id: TapId,
    registry: Weak<dyn RemoveTap>,
}

impl TapHandle {
    pub fn id(&self) -> TapId {
        self.id
    }

    /// Remove the tap from its hook.
    ///
    /// Returns `true` if the tap was still registered. Removing twice, removing after
    /// `exhaust()` or after the hook was dropped is a no-op.
    pub fn remove(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.remove_tap(self.id))
            .unwrap_or(false)
    }
}

impl fmt::Debug for TapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapHandle").field("id", &self.id).finish()
    }
}

/// Storage for the taps of one hook
pub struct Registry<V, K = String> {
    state: Arc<RwLock<RegistryState<V, K>>>,
    bucket_hash: Option<BucketHash<V, K>>,
}

impl<V: HookValue, K: BucketKey> Registry<V, K> {
    /// Create a registry that only ever resolves preset taps
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a registry that also resolves the bucket `hash(args)` points at
    pub fn with_bucket_hash<F>(hash: F) -> Self
    where
        F: Fn(&[V]) -> Option<K> + Send + Sync + 'static,
    {
        Self::build(Some(Arc::new(hash)))
    }

    fn build(bucket_hash: Option<BucketHash<V, K>>) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                next_id: 0,
                preset: BTreeSet::new(),
                buckets: HashMap::new(),
                taps: HashMap::new(),
            })),
            bucket_hash,
        }
    }

    /// Store a tap, in `bucket` if given, otherwise in the preset set
    pub fn register(&self, func: TapFn<V>, bucket: Option<K>) -> TapHandle {
        let kind = func.kind();
        let bucketed = bucket.is_some();

        let id = {
            let mut state = self.write();
            state.next_id += 1;
            let id = TapId(state.next_id);

            match &bucket {
                Some(key) => {
                    state.buckets.entry(key.clone()).or_default().insert(id);
                }
                None => {
                    state.preset.insert(id);
                }
            }
            state.taps.insert(
                id,
                TapEntry {
                    tap: Arc::new(Tap::new(id, func)),
                    bucket,
                },
            );
            id
        };

        debug!(tap = %id, kind = %kind, bucketed, "Tap registered");

        let state: Arc<dyn RemoveTap> = self.state.clone();
        TapHandle {
            id,
            registry: Arc::downgrade(&state),
        }
    }

    /// Taps that apply to a call with `args`: preset taps, then the matching bucket's
    /// taps, each in registration order.
    pub fn resolve(&self, args: &[V]) -> Vec<Arc<Tap<V>>> {
        // Hash before locking; the hash function is caller code.
        let key = self.bucket_hash.as_ref().and_then(|hash| hash(args));

        let state = self.read();
        let bucket_ids = key
            .as_ref()
            .and_then(|key| state.buckets.get(key))
            .into_iter()
            .flatten();

        let mut seen = HashSet::new();
        let taps: Vec<Arc<Tap<V>>> = state
            .preset
            .iter()
            .chain(bucket_ids)
            .filter(|id| seen.insert(**id))
            .filter_map(|id| state.taps.get(id).map(|entry| entry.tap.clone()))
            .collect();
        taps
    }

    /// Remove a tap by id; unknown ids are ignored
    pub fn remove(&self, id: TapId) -> bool {
        self.state.remove_tap(id)
    }

    /// Remove every tap from every storage
    pub fn exhaust(&self) {
        let entries = {
            let mut state = self.write();
            state.preset.clear();
            state.buckets.clear();
            std::mem::take(&mut state.taps)
        };
        let removed = entries.len();
        drop(entries);
        debug!(removed, "Registry exhausted");
    }

    /// Number of registered taps across all storages
    pub fn len(&self) -> usize {
        self.read().taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all registered taps in registration order
    pub fn tap_ids(&self) -> Vec<TapId> {
        let mut ids: Vec<TapId> = self.read().taps.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Whether a bucket hash function was configured
    pub fn is_bucketed(&self) -> bool {
        self.bucket_hash.is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState<V, K>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState<V, K>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: HookValue, K: BucketKey> Default for Registry<V, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HookValue, K: BucketKey> fmt::Debug for Registry<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("taps", &self.len())
            .field("bucketed", &self.is_bucketed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    fn noop() -> TapFn<i64> {
        TapFn::sync(|_args: &[i64]| Ok(None))
    }

    fn ids(taps: &[Arc<Tap<i64>>]) -> Vec<TapId> {
        taps.iter().map(|tap| tap.id()).collect()
    }

    #[test]
    fn test_registration_order() {
        let registry: Registry<i64> = Registry::new();
        let a = registry.register(noop(), None);
        let b = registry.register(noop(), None);
        let c = registry.register(noop(), None);

        assert_eq!(ids(&registry.resolve(&[])), vec![a.id(), b.id(), c.id()]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_removal_is_idempotent() {
        let registry: Registry<i64> = Registry::new();
        let a = registry.register(noop(), None);
        let b = registry.register(noop(), None);

        assert!(a.remove());
        assert!(!a.remove());
        assert!(!registry.remove(TapId(999)));

        assert_eq!(ids(&registry.resolve(&[])), vec![b.id()]);
    }

    #[test]
    fn test_bucket_routing() {
        let registry = Registry::with_bucket_hash(|args: &[i64]| Some(args.iter().sum::<i64>()));
        let preset = registry.register(noop(), None);
        let three = registry.register(noop(), Some(3));

        assert_eq!(ids(&registry.resolve(&[1, 2])), vec![preset.id(), three.id()]);
        assert_eq!(ids(&registry.resolve(&[2, 3])), vec![preset.id()]);

        three.remove();
        assert_eq!(ids(&registry.resolve(&[1, 2])), vec![preset.id()]);
    }

    #[test]
    fn test_buckets_ignored_without_hash() {
        let registry: Registry<i64, i64> = Registry::new();
        registry.register(noop(), Some(3));

        assert!(registry.resolve(&[1, 2]).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_exhaust_keeps_ids_unique() {
        let registry: Registry<i64> = Registry::new();
        let before = registry.register(noop(), None);

        registry.exhaust();
        registry.exhaust();
        assert!(registry.is_empty());
        assert!(registry.resolve(&[]).is_empty());
        assert!(!before.remove());

        let after = registry.register(noop(), None);
        assert!(after.id() > before.id());
        assert_eq!(registry.tap_ids(), vec![after.id()]);
    }

    #[test]
    fn test_resolved_snapshot_survives_removal() {
        let registry: Registry<i64> = Registry::new();
        let a = registry.register(noop(), None);

        let snapshot = registry.resolve(&[]);
        a.remove();

        assert_eq!(ids(&snapshot), vec![a.id()]);
        assert!(registry.resolve(&[]).is_empty());
    }

    #[test]
    fn test_handle_outlives_registry() {
        let registry: Registry<i64> = Registry::new();
        let handle = registry.register(noop(), None);
        drop(registry);

        assert!(!handle.remove());
    }

    /// Touches the registry when dropped, as a captured value of a tap might
    struct ReentrantDrop {
        registry: Arc<Registry<i64>>,
        dropped: Arc<AtomicUsize>,
    }

    impl Drop for ReentrantDrop {
        fn drop(&mut self) {
            let _ = self.registry.len();
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn reentrant_tap(registry: &Arc<Registry<i64>>, dropped: &Arc<AtomicUsize>) -> TapFn<i64> {
        let guard = ReentrantDrop {
            registry: registry.clone(),
            dropped: dropped.clone(),
        };
        TapFn::sync(move |_args: &[i64]| {
            let _keep = &guard;
            Ok(None)
        })
    }

    #[test]
    fn test_taps_dropped_outside_the_lock() {
        let registry = Arc::new(Registry::new());
        let dropped = Arc::new(AtomicUsize::new(0));

        let handle = registry.register(reentrant_tap(&registry, &dropped), None);
        assert!(handle.remove());
        assert_eq!(dropped.load(Ordering::SeqCst), 1);

        registry.register(reentrant_tap(&registry, &dropped), None);
        registry.register(reentrant_tap(&registry, &dropped), Some("x".to_string()));
        registry.exhaust();
        assert_eq!(dropped.load(Ordering::SeqCst), 3);
        assert!(registry.is_empty());
    }

    #[test]
    #[traced_test]
    fn test_mutations_are_logged() {
        let registry: Registry<i64> = Registry::new();
        let handle = registry.register(noop(), None);
        handle.remove();
        registry.exhaust();

        assert!(logs_contain("Tap registered"));
        assert!(logs_contain("Tap removed"));
        assert!(logs_contain("Registry exhausted"));
    }
}
