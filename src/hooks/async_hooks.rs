//! Hooks whose taps may complete asynchronously
//!
//! Every hook here can be called two ways:
//!
//! - `call_async(args, callback)` starts the run and reports its outcome to an
//!   error-first callback, exactly once.
//! - `call_future(args)` starts the run and returns a future of its outcome.
//!
//! Both start the run immediately. Synchronous taps are accepted too and complete as
//! soon as they return.

use crate::hooks::hook::{callback_sink, completion_future, discard, keep, resolve_call};
use crate::hooks::invoke::{invoke_parallel, invoke_series};
use crate::hooks::{
    AsyncTaps, BucketKey, Done, HookKind, HookResult, HookValue, Modifiers, Registry, SyncTaps,
    Tap, TapResult, Tappable,
};
use std::future::Future;
use std::sync::Arc;

type Executor<V> = fn(Vec<V>, Modifiers, Vec<Arc<Tap<V>>>, Done<V>);

/// Resolve the taps for `args` and hand them to `execute`
fn start<V, K, H>(hook: &H, execute: Executor<V>, args: Vec<V>, done: Done<V>)
where
    V: HookValue,
    K: BucketKey,
    H: Tappable<V, K>,
{
    let taps = resolve_call(hook, &args);
    execute(args, hook.kind().modifiers(), taps, done);
}

/// Runs every tap at once and completes when all have completed
pub struct AsyncParallelHook<V, K = String> {
    registry: Registry<V, K>,
}

impl<V: HookValue> AsyncParallelHook<V> {
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }
}

impl<V: HookValue, K: BucketKey> AsyncParallelHook<V, K> {
    pub fn with_bucket_hash<F>(hash: F) -> Self
    where
        F: Fn(&[V]) -> Option<K> + Send + Sync + 'static,
    {
        Self::from_registry(Registry::with_bucket_hash(hash))
    }

    pub fn from_registry(registry: Registry<V, K>) -> Self {
        Self { registry }
    }

    /// Start the run; `callback` receives the first error, or `Ok(())` once every tap
    /// has completed
    pub fn call_async<C>(&self, args: Vec<V>, callback: C)
    where
        C: FnOnce(HookResult<()>) + Send + 'static,
    {
        start(self, invoke_parallel, args, callback_sink(discard, callback));
    }

    pub fn call_future(
        &self,
        args: Vec<V>,
    ) -> impl Future<Output = HookResult<()>> + Send + 'static {
        let (done, result) = completion_future(discard);
        start(self, invoke_parallel, args, done);
        result
    }
}

impl<V: HookValue> Default for AsyncParallelHook<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HookValue, K: BucketKey> Tappable<V, K> for AsyncParallelHook<V, K> {
    fn registry(&self) -> &Registry<V, K> {
        &self.registry
    }

    fn kind(&self) -> HookKind {
        HookKind::AsyncParallel
    }
}

impl<V: HookValue, K: BucketKey> SyncTaps<V, K> for AsyncParallelHook<V, K> {}

impl<V: HookValue, K: BucketKey> AsyncTaps<V, K> for AsyncParallelHook<V, K> {}

/// Runs every tap at once; the first tap to produce a value completes the run
pub struct AsyncParallelBailHook<V, K = String> {
    registry: Registry<V, K>,
}

impl<V: HookValue> AsyncParallelBailHook<V> {
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }
}

impl<V: HookValue, K: BucketKey> AsyncParallelBailHook<V, K> {
    pub fn with_bucket_hash<F>(hash: F) -> Self
    where
        F: Fn(&[V]) -> Option<K> + Send + Sync + 'static,
    {
        Self::from_registry(Registry::with_bucket_hash(hash))
    }

    pub fn from_registry(registry: Registry<V, K>) -> Self {
        Self { registry }
    }

    /// Start the run. The outcome is the first error or value signalled in completion
    /// order; if every tap completes without a value it is the first argument.
    pub fn call_async<C>(&self, args: Vec<V>, callback: C)
    where
        C: FnOnce(TapResult<V>) + Send + 'static,
    {
        start(self, invoke_parallel, args, callback_sink(keep, callback));
    }

    pub fn call_future(
        &self,
        args: Vec<V>,
    ) -> impl Future<Output = TapResult<V>> + Send + 'static {
        let (done, result) = completion_future(keep);
        start(self, invoke_parallel, args, done);
        result
    }
}

impl<V: HookValue> Default for AsyncParallelBailHook<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HookValue, K: BucketKey> Tappable<V, K> for AsyncParallelBailHook<V, K> {
    fn registry(&self) -> &Registry<V, K> {
        &self.registry
    }

    fn kind(&self) -> HookKind {
        HookKind::AsyncParallelBail
    }
}

impl<V: HookValue, K: BucketKey> SyncTaps<V, K> for AsyncParallelBailHook<V, K> {}

impl<V: HookValue, K: BucketKey> AsyncTaps<V, K> for AsyncParallelBailHook<V, K> {}

/// Runs taps one after another, each starting once the previous one completed
pub struct AsyncSeriesHook<V, K = String> {
    registry: Registry<V, K>,
}

impl<V: HookValue> AsyncSeriesHook<V> {
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }
}

impl<V: HookValue, K: BucketKey> AsyncSeriesHook<V, K> {
    pub fn with_bucket_hash<F>(hash: F) -> Self
    where
        F: Fn(&[V]) -> Option<K> + Send + Sync + 'static,
    {
        Self::from_registry(Registry::with_bucket_hash(hash))
    }

    pub fn from_registry(registry: Registry<V, K>) -> Self {
        Self { registry }
    }

    pub fn call_async<C>(&self, args: Vec<V>, callback: C)
    where
        C: FnOnce(HookResult<()>) + Send + 'static,
    {
        start(self, invoke_series, args, callback_sink(discard, callback));
    }

    pub fn call_future(
        &self,
        args: Vec<V>,
    ) -> impl Future<Output = HookResult<()>> + Send + 'static {
        let (done, result) = completion_future(discard);
        start(self, invoke_series, args, done);
        result
    }
}

impl<V: HookValue> Default for AsyncSeriesHook<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HookValue, K: BucketKey> Tappable<V, K> for AsyncSeriesHook<V, K> {
    fn registry(&self) -> &Registry<V, K> {
        &self.registry
    }

    fn kind(&self) -> HookKind {
        HookKind::AsyncSeries
    }
}

impl<V: HookValue, K: BucketKey> SyncTaps<V, K> for AsyncSeriesHook<V, K> {}

impl<V: HookValue, K: BucketKey> AsyncTaps<V, K> for AsyncSeriesHook<V, K> {}

/// Runs taps in series and stops at the first one producing a value
pub struct AsyncSeriesBailHook<V, K = String> {
    registry: Registry<V, K>,
}

impl<V: HookValue> AsyncSeriesBailHook<V> {
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }
}

impl<V: HookValue, K: BucketKey> AsyncSeriesBailHook<V, K> {
    pub fn with_bucket_hash<F>(hash: F) -> Self
    where
        F: Fn(&[V]) -> Option<K> + Send + Sync + 'static,
    {
        Self::from_registry(Registry::with_bucket_hash(hash))
    }

    pub fn from_registry(registry: Registry<V, K>) -> Self {
        Self { registry }
    }

    /// Start the run; the outcome is the bailed value, or the first argument
    pub fn call_async<C>(&self, args: Vec<V>, callback: C)
    where
        C: FnOnce(TapResult<V>) + Send + 'static,
    {
        start(self, invoke_series, args, callback_sink(keep, callback));
    }

    pub fn call_future(
        &self,
        args: Vec<V>,
    ) -> impl Future<Output = TapResult<V>> + Send + 'static {
        let (done, result) = completion_future(keep);
        start(self, invoke_series, args, done);
        result
    }
}

impl<V: HookValue> Default for AsyncSeriesBailHook<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HookValue, K: BucketKey> Tappable<V, K> for AsyncSeriesBailHook<V, K> {
    fn registry(&self) -> &Registry<V, K> {
        &self.registry
    }

    fn kind(&self) -> HookKind {
        HookKind::AsyncSeriesBail
    }
}

impl<V: HookValue, K: BucketKey> SyncTaps<V, K> for AsyncSeriesBailHook<V, K> {}

impl<V: HookValue, K: BucketKey> AsyncTaps<V, K> for AsyncSeriesBailHook<V, K> {}

/// Runs taps in series, threading each produced value into the next tap's first argument
pub struct AsyncSeriesWaterfallHook<V, K = String> {
    registry: Registry<V, K>,
}

impl<V: HookValue> AsyncSeriesWaterfallHook<V> {
    pub fn new() -> Self {
        Self::from_registry(Registry::new())
    }
}

impl<V: HookValue, K: BucketKey> AsyncSeriesWaterfallHook<V, K> {
    pub fn with_bucket_hash<F>(hash: F) -> Self
    where
        F: Fn(&[V]) -> Option<K> + Send + Sync + 'static,
    {
        Self::from_registry(Registry::with_bucket_hash(hash))
    }

    pub fn from_registry(registry: Registry<V, K>) -> Self {
        Self { registry }
    }

    /// Start the run; the outcome is the first argument as left by the last tap
    pub fn call_async<C>(&self, args: Vec<V>, callback: C)
    where
        C: FnOnce(TapResult<V>) + Send + 'static,
    {
        start(self, invoke_series, args, callback_sink(keep, callback));
    }

    pub fn call_future(
        &self,
        args: Vec<V>,
    ) -> impl Future<Output = TapResult<V>> + Send + 'static {
        let (done, result) = completion_future(keep);
        start(self, invoke_series, args, done);
        result
    }
}

impl<V: HookValue> Default for AsyncSeriesWaterfallHook<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: HookValue, K: BucketKey> Tappable<V, K> for AsyncSeriesWaterfallHook<V, K> {
    fn registry(&self) -> &Registry<V, K> {
        &self.registry
    }

    fn kind(&self) -> HookKind {
        HookKind::AsyncSeriesWaterfall
    }
}

impl<V: HookValue, K: BucketKey> SyncTaps<V, K> for AsyncSeriesWaterfallHook<V, K> {}

impl<V: HookValue, K: BucketKey> AsyncTaps<V, K> for AsyncSeriesWaterfallHook<V, K> {}
