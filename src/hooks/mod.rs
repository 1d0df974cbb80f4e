//! Hooks and taps
//!
//! A hook is an extension point: producers register taps on it, and its owner calls
//! every applicable tap under one fixed discipline. Synchronous hooks run taps on the
//! caller's thread, async series hooks run them one at a time and async parallel hooks
//! start them all at once. Bail variants stop at the first tap producing a value;
//! waterfall variants thread each produced value into the next tap's first argument.

pub mod async_hooks;
pub mod builtin;
pub mod config;
pub mod dynamic;
pub mod errors;
pub mod hook;
pub mod invoke;
pub mod registry;
pub mod sync_hooks;
pub mod tap;
pub mod types;

// Re-export commonly used types
pub use self::async_hooks::{
    AsyncParallelBailHook, AsyncParallelHook, AsyncSeriesBailHook, AsyncSeriesHook,
    AsyncSeriesWaterfallHook,
};
pub use self::builtin::{BuiltinTap, LogLevel};
pub use self::config::{HookConfig, HooksConfig, TapConfig, SAMPLE_CONFIG};
pub use self::dynamic::{bucket_key, DynamicHook, HookSet};
pub use self::errors::{HookError, HookResult, TapResult};
pub use self::hook::{AsyncTaps, SyncTaps, Tappable};
pub use self::invoke::{invoke_parallel, invoke_series, invoke_synchronously};
pub use self::registry::{BucketHash, Registry, TapHandle};
pub use self::sync_hooks::{SyncBailHook, SyncHook, SyncWaterfallHook};
pub use self::tap::{Done, Tap, TapFn};
pub use self::types::{BucketKey, HookKind, HookValue, Modifiers, TapId, TapKind};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        AsyncParallelBailHook, AsyncParallelHook, AsyncSeriesBailHook, AsyncSeriesHook,
        AsyncSeriesWaterfallHook, AsyncTaps, Done, HookError, HookKind, HookResult,
        SyncBailHook, SyncHook, SyncTaps, SyncWaterfallHook, TapHandle, TapResult, Tappable,
    };
}
