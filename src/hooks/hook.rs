//! Tapping traits shared by every hook
//!
//! Each hook type owns a [`Registry`] and fixes one discipline. The traits here give
//! all of them the same registration surface: [`SyncTaps`] for hooks called
//! synchronously, [`AsyncTaps`] for hooks whose taps may complete later.

use crate::hooks::{
    BucketKey, Done, HookError, HookKind, HookResult, HookValue, Registry, Tap, TapFn, TapHandle,
    TapId, TapResult,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::trace;

/// Common surface of all hooks
pub trait Tappable<V: HookValue, K: BucketKey> {
    /// The hook's tap storage
    fn registry(&self) -> &Registry<V, K>;

    /// The hook's invocation discipline
    fn kind(&self) -> HookKind;

    /// Remove every tap; the hook then behaves like a fresh one
    fn exhaust(&self) {
        self.registry().exhaust();
    }

    /// Alias of [`exhaust`](Self::exhaust)
    fn destroy(&self) {
        self.exhaust();
    }

    /// Number of registered taps
    fn len(&self) -> usize {
        self.registry().len()
    }

    fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    fn tap_ids(&self) -> Vec<TapId> {
        self.registry().tap_ids()
    }
}

/// Registration for hooks whose taps return their result directly
pub trait SyncTaps<V: HookValue, K: BucketKey>: Tappable<V, K> {
    /// Register an always-active tap
    fn tap<F>(&self, f: F) -> TapHandle
    where
        F: Fn(&[V]) -> TapResult<V> + Send + Sync + 'static,
    {
        self.registry().register(TapFn::sync(f), None)
    }

    /// Register a tap that only runs when the call hashes to `bucket`
    fn tap_in<F>(&self, bucket: K, f: F) -> TapHandle
    where
        F: Fn(&[V]) -> TapResult<V> + Send + Sync + 'static,
    {
        self.registry().register(TapFn::sync(f), Some(bucket))
    }
}

/// Registration for hooks whose taps complete through a handle or a future.
///
/// Synchronous taps are accepted as well through [`SyncTaps`].
pub trait AsyncTaps<V: HookValue, K: BucketKey>: SyncTaps<V, K> {
    /// Register a tap that signals completion through [`Done`]
    fn tap_async<F>(&self, f: F) -> TapHandle
    where
        F: Fn(&[V], Done<V>) -> HookResult<()> + Send + Sync + 'static,
    {
        self.registry().register(TapFn::callback(f), None)
    }

    fn tap_async_in<F>(&self, bucket: K, f: F) -> TapHandle
    where
        F: Fn(&[V], Done<V>) -> HookResult<()> + Send + Sync + 'static,
    {
        self.registry().register(TapFn::callback(f), Some(bucket))
    }

    /// Register a tap that returns a future of its result
    fn tap_future<F, Fut>(&self, f: F) -> TapHandle
    where
        F: Fn(Vec<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TapResult<V>> + Send + 'static,
    {
        self.registry().register(TapFn::future(f), None)
    }

    fn tap_future_in<F, Fut>(&self, bucket: K, f: F) -> TapHandle
    where
        F: Fn(Vec<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TapResult<V>> + Send + 'static,
    {
        self.registry().register(TapFn::future(f), Some(bucket))
    }
}

/// Snapshot of the taps a call will run
pub(crate) fn resolve_call<V, K, H>(hook: &H, args: &[V]) -> Vec<Arc<Tap<V>>>
where
    V: HookValue,
    K: BucketKey,
    H: Tappable<V, K> + ?Sized,
{
    let taps = hook.registry().resolve(args);
    trace!(kind = %hook.kind(), taps = taps.len(), args = args.len(), "Hook called");
    taps
}

/// Completion sink that hands the projected result to an error-first callback
pub(crate) fn callback_sink<V, R, C>(project: fn(Option<V>) -> R, callback: C) -> Done<V>
where
    V: HookValue,
    R: 'static,
    C: FnOnce(HookResult<R>) + Send + 'static,
{
    Done::new(move |outcome: TapResult<V>| {
        trace!(failed = outcome.is_err(), "Hook run completed");
        callback(outcome.map(project))
    })
}

/// Completion handle for a run together with a future of its projected result.
///
/// If every clone of the handle is dropped without signalling, the future resolves to
/// [`HookError::Abandoned`].
pub(crate) fn completion_future<V, R>(
    project: fn(Option<V>) -> R,
) -> (Done<V>, impl Future<Output = HookResult<R>> + Send + 'static)
where
    V: HookValue,
    R: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let done = callback_sink(project, move |result| {
        let _ = tx.send(result);
    });

    (done, async move { rx.await.unwrap_or_else(|_| Err(HookError::Abandoned)) })
}

/// Projection for disciplines that report a value
pub(crate) fn keep<V>(value: Option<V>) -> Option<V> {
    value
}

/// Projection for plain disciplines, whose value channel is unused
pub(crate) fn discard<V>(_value: Option<V>) {}
