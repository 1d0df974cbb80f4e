//! Tap representation and calling-convention adapters
//!
//! Every tap, whatever convention it was registered with, is invoked through the same
//! normalized contract: `invoke(args, done)`. Synchronous taps complete `done` before
//! returning, callback taps complete it whenever they like, and future-returning taps
//! complete it once their future resolves on the tokio runtime.

use crate::hooks::{HookError, HookResult, TapId, TapKind, TapResult};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

type Sink<V> = Box<dyn FnOnce(TapResult<V>) + Send>;

type SyncFn<V> = Arc<dyn Fn(&[V]) -> TapResult<V> + Send + Sync>;
type CallbackFn<V> = Arc<dyn Fn(&[V], Done<V>) -> HookResult<()> + Send + Sync>;
type FutureFn<V> = Arc<dyn Fn(Vec<V>) -> BoxFuture<'static, TapResult<V>> + Send + Sync>;

/// Completion handle handed to a tap for one invocation.
///
/// Clones share the same slot: whichever clone signals first wins and every later
/// signal is dropped.
pub struct Done<V> {
    slot: Arc<Mutex<Option<Sink<V>>>>,
}

impl<V> Done<V> {
    pub fn new(sink: impl FnOnce(TapResult<V>) + Send + 'static) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(Box::new(sink)))),
        }
    }

    /// Signal completion with an outcome
    pub fn complete(&self, outcome: TapResult<V>) {
        // Guard is released before the sink runs; the sink may start the next tap.
        let sink = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sink) = sink {
            sink(outcome);
        }
    }

    /// Signal success, with or without a value
    pub fn resolve(&self, value: impl Into<Option<V>>) {
        self.complete(Ok(value.into()));
    }

    /// Signal failure
    pub fn reject(&self, error: HookError) {
        self.complete(Err(error));
    }

    /// Whether some clone of this handle already signalled
    pub fn is_done(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl<V> Clone for Done<V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<V> fmt::Debug for Done<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done").field("done", &self.is_done()).finish()
    }
}

/// A callback in one of the three supported calling conventions
pub enum TapFn<V> {
    Sync(SyncFn<V>),
    Callback(CallbackFn<V>),
    Future(FutureFn<V>),
}

impl<V: Send + 'static> TapFn<V> {
    /// A tap that returns its result directly
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&[V]) -> TapResult<V> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// A tap that signals its result through a [`Done`] handle.
    ///
    /// An `Err` returned directly is forwarded to the handle, so a failing tap
    /// completes exactly once whichever way it fails.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&[V], Done<V>) -> HookResult<()> + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// A tap that returns a future of its result.
    ///
    /// Plain values can be returned through `std::future::ready`.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TapResult<V>> + Send + 'static,
    {
        Self::Future(Arc::new(move |args| f(args).boxed()))
    }
}

impl<V> TapFn<V> {
    pub fn kind(&self) -> TapKind {
        match self {
            Self::Sync(_) => TapKind::Sync,
            Self::Callback(_) => TapKind::Callback,
            Self::Future(_) => TapKind::Future,
        }
    }
}

/// A registered tap
pub struct Tap<V> {
    id: TapId,
    func: TapFn<V>,
}

impl<V: Clone + Send + 'static> Tap<V> {
    pub(crate) fn new(id: TapId, func: TapFn<V>) -> Self {
        Self { id, func }
    }

    pub fn id(&self) -> TapId {
        self.id
    }

    pub fn kind(&self) -> TapKind {
        self.func.kind()
    }

    /// Invoke through the normalized contract.
    ///
    /// A panicking tap completes `done` with [`HookError::TapPanicked`].
    pub fn invoke(&self, args: &[V], done: Done<V>) {
        match &self.func {
            TapFn::Sync(f) => done.complete(self.catch_panic(|| f(args))),
            TapFn::Callback(f) => {
                if let Err(error) = self.catch_panic(|| f(args, done.clone())) {
                    done.reject(error);
                }
            }
            TapFn::Future(f) => {
                let future = match self.catch_panic(|| Ok(f(args.to_vec()))) {
                    Ok(future) => future,
                    Err(error) => return done.reject(error),
                };
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        let id = self.id;
                        let task = handle.spawn(future);
                        handle.spawn(async move {
                            let outcome = task.await.unwrap_or_else(|error| {
                                if error.is_panic() {
                                    let error = HookError::panicked(id, error.into_panic());
                                    warn!(tap = %id, %error, "Tap panicked");
                                    Err(error)
                                } else {
                                    Err(HookError::failed(error))
                                }
                            });
                            done.complete(outcome);
                        });
                    }
                    Err(_) => done.reject(HookError::NoRuntime { tap: self.id }),
                }
            }
        }
    }

    fn catch_panic<T>(&self, call: impl FnOnce() -> HookResult<T>) -> HookResult<T> {
        panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
            let error = HookError::panicked(self.id, payload);
            warn!(tap = %self.id, %error, "Tap panicked");
            Err(error)
        })
    }

    /// Call a synchronous tap and return its result directly
    pub fn call_sync(&self, args: &[V]) -> TapResult<V> {
        match &self.func {
            TapFn::Sync(f) => f(args),
            other => Err(HookError::IncompatibleTap {
                tap: self.id,
                kind: other.kind(),
            }),
        }
    }
}

impl<V> fmt::Debug for Tap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tap")
            .field("id", &self.id)
            .field("kind", &self.func.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn recording_done(calls: Arc<AtomicUsize>, seen: Arc<Mutex<Vec<TapResult<i32>>>>) -> Done<i32> {
        Done::new(move |outcome| {
            calls.fetch_add(1, Ordering::SeqCst);
            seen.lock().unwrap().push(outcome);
        })
    }

    #[test]
    fn test_done_signals_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = recording_done(calls.clone(), seen.clone());
        let other = done.clone();

        assert!(!done.is_done());
        done.resolve(Some(1));
        other.reject(HookError::custom("late"));
        done.complete(Ok(None));

        assert!(other.is_done());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(seen.lock().unwrap()[0], Ok(Some(1))));
    }

    #[test]
    fn test_sync_tap_completes_before_returning() {
        let tap = Tap::new(TapId(1), TapFn::sync(|args: &[i32]| Ok(Some(args[0] * 2))));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        tap.invoke(&[21], recording_done(calls.clone(), seen.clone()));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(seen.lock().unwrap()[0], Ok(Some(42))));
        assert_eq!(tap.call_sync(&[5]).unwrap(), Some(10));
    }

    #[test]
    fn test_callback_error_return_is_forwarded() {
        let tap = Tap::new(
            TapId(2),
            TapFn::callback(|_args: &[i32], _done| Err(HookError::custom("thrown"))),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        tap.invoke(&[], recording_done(calls.clone(), seen.clone()));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].as_ref().unwrap_err().to_string(), "thrown");
    }

    #[test]
    fn test_callback_error_after_signal_is_dropped() {
        let tap = Tap::new(
            TapId(3),
            TapFn::callback(|_args: &[i32], done: Done<i32>| {
                done.resolve(Some(7));
                Err(HookError::custom("too late"))
            }),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        tap.invoke(&[], recording_done(calls.clone(), seen.clone()));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(seen.lock().unwrap()[0], Ok(Some(7))));
    }

    #[test]
    fn test_async_taps_refuse_sync_call() {
        let tap = Tap::new(
            TapId(4),
            TapFn::future(|_args: Vec<i32>| async { Ok(None) }),
        );
        let err = tap.call_sync(&[]).unwrap_err();
        assert!(matches!(
            err,
            HookError::IncompatibleTap {
                kind: TapKind::Future,
                ..
            }
        ));
    }

    #[test]
    fn test_future_tap_without_runtime() {
        let tap = Tap::new(
            TapId(5),
            TapFn::future(|_args: Vec<i32>| async { Ok(Some(1)) }),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        tap.invoke(&[], recording_done(calls.clone(), seen.clone()));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            seen.lock().unwrap()[0],
            Err(HookError::NoRuntime { tap: TapId(5) })
        ));
    }

    #[tokio::test]
    async fn test_future_tap_resolves_on_runtime() {
        let tap = Tap::new(
            TapId(6),
            TapFn::future(|args: Vec<i32>| async move {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Ok(Some(args.iter().sum()))
            }),
        );
        let (tx, rx) = oneshot::channel();

        tap.invoke(&[1, 2, 3], Done::new(move |outcome| {
            let _ = tx.send(outcome);
        }));

        assert_eq!(rx.await.unwrap().unwrap(), Some(6));
    }

    #[test]
    fn test_sync_and_callback_panics_are_reported() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sync = Tap::new(
            TapId(8),
            TapFn::sync(|_args: &[i32]| -> TapResult<i32> { panic!("sync blew up") }),
        );
        sync.invoke(&[], recording_done(calls.clone(), seen.clone()));

        let callback = Tap::new(
            TapId(9),
            TapFn::callback(|_args: &[i32], _done: Done<i32>| -> HookResult<()> {
                panic!("callback blew up")
            }),
        );
        callback.invoke(&[], recording_done(calls.clone(), seen.clone()));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0].as_ref().unwrap_err().to_string(),
            "Tap 'tap:8' panicked: sync blew up"
        );
        assert_eq!(
            seen[1].as_ref().unwrap_err().to_string(),
            "Tap 'tap:9' panicked: callback blew up"
        );
    }

    #[tokio::test]
    async fn test_future_tap_panic_is_reported() {
        let tap = Tap::new(
            TapId(10),
            TapFn::future(|args: Vec<i32>| async move {
                tokio::task::yield_now().await;
                if args.is_empty() {
                    panic!("future blew up");
                }
                Ok(Some(1))
            }),
        );
        let (tx, rx) = oneshot::channel();

        tap.invoke(&[], Done::new(move |outcome| {
            let _ = tx.send(outcome);
        }));

        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(err, HookError::TapPanicked { tap: TapId(10), .. }));
        assert_eq!(err.to_string(), "Tap 'tap:10' panicked: future blew up");
    }

    #[tokio::test]
    async fn test_future_tap_rejection() {
        let tap = Tap::new(
            TapId(7),
            TapFn::future(|_args: Vec<i32>| async { Err(HookError::custom("rejected")) }),
        );
        let (tx, rx) = oneshot::channel();

        tap.invoke(&[], Done::new(move |outcome| {
            let _ = tx.send(outcome);
        }));

        assert_eq!(rx.await.unwrap().unwrap_err().to_string(), "rejected");
    }
}
