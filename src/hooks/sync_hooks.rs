//! Hooks called synchronously on the caller's thread

use crate::hooks::hook::resolve_call;
use crate::hooks::invoke::invoke_synchronously;
use crate::hooks::{
    BucketKey, HookKind, HookResult, HookValue, Modifiers, Registry, SyncTaps, TapResult,
    Tappable,
};

/// Calls every tap in order; tap results are ignored
pub struct SyncHook<V, K = String> {
    registry: Registry<V, K>,
}

impl<V: HookValue> SyncHook<V> {
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }
}

impl<V: HookValue, K: BucketKey> SyncHook<V, K> {
    /// Create a hook whose bucketed taps run when `hash(args)` matches their bucket
    pub fn with_bucket_hash<F>(hash: F) -> Self
    where
        F: Fn(&[V]) -> Option<K> + Send + Sync + 'static,
    {
        Self::from_registry(Registry::with_bucket_hash(hash))
    }

    pub fn from_registry(registry: Registry<V, K>) -> Self {
        Self { registry }
    }

    /// Call every tap with `args`. A failing tap stops the call.
    pub fn call(&self, args: Vec<V>) -> HookResult<()> {
        let taps = resolve_call(self, &args);
        invoke_synchronously(args, Modifiers::PLAIN, &taps).map(|_| ())
    }
}

impl<V: HookValue> Default for SyncHook<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HookValue, K: BucketKey> Tappable<V, K> for SyncHook<V, K> {
    fn registry(&self) -> &Registry<V, K> {
        &self.registry
    }

    fn kind(&self) -> HookKind {
        HookKind::Sync
    }
}

impl<V: HookValue, K: BucketKey> SyncTaps<V, K> for SyncHook<V, K> {}

/// Stops at the first tap returning a value
pub struct SyncBailHook<V, K = String> {
    registry: Registry<V, K>,
}

impl<V: HookValue> SyncBailHook<V> {
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }
}

impl<V: HookValue, K: BucketKey> SyncBailHook<V, K> {
    pub fn with_bucket_hash<F>(hash: F) -> Self
    where
        F: Fn(&[V]) -> Option<K> + Send + Sync + 'static,
    {
        Self::from_registry(Registry::with_bucket_hash(hash))
    }

    pub fn from_registry(registry: Registry<V, K>) -> Self {
        Self { registry }
    }

    /// Returns the first defined tap result, or the first argument if no tap bails
    pub fn call(&self, args: Vec<V>) -> TapResult<V> {
        let taps = resolve_call(self, &args);
        invoke_synchronously(args, Modifiers::BAIL, &taps)
    }
}

impl<V: HookValue> Default for SyncBailHook<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HookValue, K: BucketKey> Tappable<V, K> for SyncBailHook<V, K> {
    fn registry(&self) -> &Registry<V, K> {
        &self.registry
    }

    fn kind(&self) -> HookKind {
        HookKind::SyncBail
    }
}

impl<V: HookValue, K: BucketKey> SyncTaps<V, K> for SyncBailHook<V, K> {}

/// Threads each defined tap result into the next tap's first argument
pub struct SyncWaterfallHook<V, K = String> {
    registry: Registry<V, K>,
}

impl<V: HookValue> SyncWaterfallHook<V> {
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }
}

impl<V: HookValue, K: BucketKey> SyncWaterfallHook<V, K> {
    pub fn with_bucket_hash<F>(hash: F) -> Self
    where
        F: Fn(&[V]) -> Option<K> + Send + Sync + 'static,
    {
        Self::from_registry(Registry::with_bucket_hash(hash))
    }

    pub fn from_registry(registry: Registry<V, K>) -> Self {
        Self { registry }
    }

    /// Returns the first argument as left by the last tap that overrode it
    pub fn call(&self, args: Vec<V>) -> TapResult<V> {
        let taps = resolve_call(self, &args);
        invoke_synchronously(args, Modifiers::WATERFALL, &taps)
    }
}

impl<V: HookValue> Default for SyncWaterfallHook<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HookValue, K: BucketKey> Tappable<V, K> for SyncWaterfallHook<V, K> {
    fn registry(&self) -> &Registry<V, K> {
        &self.registry
    }

    fn kind(&self) -> HookKind {
        HookKind::SyncWaterfall
    }
}

impl<V: HookValue, K: BucketKey> SyncTaps<V, K> for SyncWaterfallHook<V, K> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookError;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<Vec<i32>>>>, impl Fn(&[i32]) + Clone) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |args: &[i32]| sink.lock().unwrap().push(args.to_vec()))
    }

    #[test]
    fn test_sync_hook_calls_every_tap() {
        let hook = SyncHook::new();
        let (calls, record) = recorder();
        let first = record.clone();
        hook.tap(move |args: &[i32]| {
            first(args);
            Ok(Some(99))
        });
        hook.tap(move |args: &[i32]| {
            record(args);
            Ok(None)
        });

        hook.call(vec![1, 2, 3]).unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![vec![1, 2, 3], vec![1, 2, 3]]);
    }

    #[test]
    fn test_sync_hook_propagates_errors() {
        let hook: SyncHook<i32> = SyncHook::new();
        hook.tap(|_args: &[i32]| Err(HookError::custom("tap failed")));

        let err = hook.call(vec![]).unwrap_err();
        assert_eq!(err.to_string(), "tap failed");
    }

    #[test]
    fn test_sync_bail_scenario() {
        let hook = SyncBailHook::new();
        let (calls, record) = recorder();
        let cb1 = {
            let record = record.clone();
            move |args: &[i32]| {
                record(args);
                Ok(None)
            }
        };
        hook.tap(cb1.clone());
        hook.tap(|_args: &[i32]| Ok(Some(-1)));
        hook.tap(cb1);

        assert_eq!(hook.call(vec![1, 2, 3]).unwrap(), Some(-1));
        assert_eq!(*calls.lock().unwrap(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_sync_bail_without_bail_returns_first_arg() {
        let hook = SyncBailHook::new();
        hook.tap(|_args: &[i32]| Ok(None));

        assert_eq!(hook.call(vec![7, 8]).unwrap(), Some(7));
        assert_eq!(hook.call(vec![]).unwrap(), None);
    }

    #[test]
    fn test_sync_waterfall_scenario() {
        let hook = SyncWaterfallHook::new();
        let (calls, record) = recorder();
        hook.tap(|_args: &[i32]| Ok(None));
        hook.tap(|_args: &[i32]| Ok(Some(10)));
        hook.tap(move |args: &[i32]| {
            record(args);
            Ok(None)
        });

        assert_eq!(hook.call(vec![1, 2]).unwrap(), Some(10));
        assert_eq!(*calls.lock().unwrap(), vec![vec![10, 2]]);
    }

    #[test]
    fn test_tap_can_remove_itself_mid_call() {
        let hook = SyncHook::new();
        let own_handle = Arc::new(Mutex::new(None::<crate::hooks::TapHandle>));
        let slot = own_handle.clone();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();

        let registered = hook.tap(move |_args: &[i32]| {
            *counter.lock().unwrap() += 1;
            if let Some(handle) = slot.lock().unwrap().as_ref() {
                handle.remove();
            }
            Ok(None)
        });
        *own_handle.lock().unwrap() = Some(registered);

        hook.call(vec![]).unwrap();
        hook.call(vec![]).unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(hook.is_empty());
    }
}
