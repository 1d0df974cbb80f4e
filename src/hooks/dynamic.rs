//! JSON-valued hooks whose discipline is picked at runtime

use crate::hooks::{
    AsyncParallelBailHook, AsyncParallelHook, AsyncSeriesBailHook, AsyncSeriesHook,
    AsyncSeriesWaterfallHook, BuiltinTap, HookConfig, HookError, HookKind, HookResult,
    HooksConfig, Registry, SyncBailHook, SyncHook, SyncWaterfallHook, TapHandle, TapKind,
    TapResult, Tappable,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Bucket key of a JSON argument: strings as-is, anything else as its JSON text
pub fn bucket_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One of the eight hooks over JSON values
pub enum DynamicHook {
    Sync(SyncHook<Value>),
    SyncBail(SyncBailHook<Value>),
    SyncWaterfall(SyncWaterfallHook<Value>),
    AsyncParallel(AsyncParallelHook<Value>),
    AsyncParallelBail(AsyncParallelBailHook<Value>),
    AsyncSeries(AsyncSeriesHook<Value>),
    AsyncSeriesBail(AsyncSeriesBailHook<Value>),
    AsyncSeriesWaterfall(AsyncSeriesWaterfallHook<Value>),
}

impl DynamicHook {
    /// Create an empty hook. With `bucket_by`, calls are routed to the bucket named by
    /// the argument at that index.
    pub fn new(kind: HookKind, bucket_by: Option<usize>) -> Self {
        let registry = match bucket_by {
            Some(index) => {
                Registry::with_bucket_hash(move |args: &[Value]| args.get(index).map(bucket_key))
            }
            None => Registry::new(),
        };

        match kind {
            HookKind::Sync => Self::Sync(SyncHook::from_registry(registry)),
            HookKind::SyncBail => Self::SyncBail(SyncBailHook::from_registry(registry)),
            HookKind::SyncWaterfall => {
                Self::SyncWaterfall(SyncWaterfallHook::from_registry(registry))
            }
            HookKind::AsyncParallel => {
                Self::AsyncParallel(AsyncParallelHook::from_registry(registry))
            }
            HookKind::AsyncParallelBail => {
                Self::AsyncParallelBail(AsyncParallelBailHook::from_registry(registry))
            }
            HookKind::AsyncSeries => Self::AsyncSeries(AsyncSeriesHook::from_registry(registry)),
            HookKind::AsyncSeriesBail => {
                Self::AsyncSeriesBail(AsyncSeriesBailHook::from_registry(registry))
            }
            HookKind::AsyncSeriesWaterfall => {
                Self::AsyncSeriesWaterfall(AsyncSeriesWaterfallHook::from_registry(registry))
            }
        }
    }

    /// Build a hook and register every tap of its configuration
    pub fn from_config(config: &HookConfig) -> HookResult<Self> {
        config.validate()?;

        let hook = Self::new(config.kind, config.bucket_by);
        for tap in &config.taps {
            hook.tap_builtin(
                tap.action.clone(),
                tap.style_for(config.kind),
                tap.bucket.clone(),
            )?;
        }
        Ok(hook)
    }

    fn as_tappable(&self) -> &dyn Tappable<Value, String> {
        match self {
            Self::Sync(hook) => hook,
            Self::SyncBail(hook) => hook,
            Self::SyncWaterfall(hook) => hook,
            Self::AsyncParallel(hook) => hook,
            Self::AsyncParallelBail(hook) => hook,
            Self::AsyncSeries(hook) => hook,
            Self::AsyncSeriesBail(hook) => hook,
            Self::AsyncSeriesWaterfall(hook) => hook,
        }
    }

    pub fn kind(&self) -> HookKind {
        self.as_tappable().kind()
    }

    /// Register a built-in tap. Synchronous hooks only accept `TapKind::Sync`, and async
    /// hooks refuse a sync-style `delay`.
    pub fn tap_builtin(
        &self,
        tap: BuiltinTap,
        style: TapKind,
        bucket: Option<String>,
    ) -> HookResult<TapHandle> {
        if let Some(reason) = tap.style_conflict(self.kind(), style) {
            return Err(HookError::invalid_config(reason));
        }

        Ok(self
            .as_tappable()
            .registry()
            .register(tap.into_tap_fn(style), bucket))
    }

    /// Call the hook and wait for its terminal value; plain disciplines report `None`
    pub async fn run(&self, args: Vec<Value>) -> TapResult<Value> {
        match self {
            Self::Sync(hook) => hook.call(args).map(|()| None),
            Self::SyncBail(hook) => hook.call(args),
            Self::SyncWaterfall(hook) => hook.call(args),
            Self::AsyncParallel(hook) => hook.call_future(args).await.map(|()| None),
            Self::AsyncParallelBail(hook) => hook.call_future(args).await,
            Self::AsyncSeries(hook) => hook.call_future(args).await.map(|()| None),
            Self::AsyncSeriesBail(hook) => hook.call_future(args).await,
            Self::AsyncSeriesWaterfall(hook) => hook.call_future(args).await,
        }
    }

    pub fn exhaust(&self) {
        self.as_tappable().exhaust();
    }

    pub fn len(&self) -> usize {
        self.as_tappable().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_tappable().is_empty()
    }
}

/// Named collection of dynamic hooks
#[derive(Default)]
pub struct HookSet {
    hooks: BTreeMap<String, DynamicHook>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every hook declared in `config`
    pub fn from_config(config: &HooksConfig) -> HookResult<Self> {
        config.validate()?;

        let mut set = Self::new();
        for hook in &config.hooks {
            set.insert(hook.name.clone(), DynamicHook::from_config(hook)?);
        }
        debug!(hooks = set.len(), "Hook set built");
        Ok(set)
    }

    /// Add or replace a hook
    pub fn insert(&mut self, name: impl Into<String>, hook: DynamicHook) -> Option<DynamicHook> {
        self.hooks.insert(name.into(), hook)
    }

    pub fn get(&self, name: &str) -> Option<&DynamicHook> {
        self.hooks.get(name)
    }

    /// Hook names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DynamicHook)> {
        self.hooks.iter().map(|(name, hook)| (name.as_str(), hook))
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run the named hook
    pub async fn run(&self, name: &str, args: Vec<Value>) -> TapResult<Value> {
        let hook = self
            .get(name)
            .ok_or_else(|| HookError::UnknownHook(name.to_string()))?;
        hook.run(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::SAMPLE_CONFIG;
    use serde_json::json;

    #[test]
    fn test_bucket_key() {
        assert_eq!(bucket_key(&json!("release")), "release");
        assert_eq!(bucket_key(&json!(3)), "3");
        assert_eq!(bucket_key(&json!([1, 2])), "[1,2]");
    }

    #[tokio::test]
    async fn test_every_kind_runs_empty() {
        for kind in HookKind::all() {
            let hook = DynamicHook::new(kind, None);
            assert_eq!(hook.kind(), kind);

            let result = hook.run(vec![json!("first")]).await.unwrap();
            if kind.returns_value() {
                assert_eq!(result, Some(json!("first")), "{}", kind);
            } else {
                assert_eq!(result, None, "{}", kind);
            }
        }
    }

    #[tokio::test]
    async fn test_sample_config_runs() {
        let config = HooksConfig::from_toml(SAMPLE_CONFIG).unwrap();
        let set = HookSet::from_config(&config).unwrap();

        assert_eq!(set.names().collect::<Vec<_>>(), vec!["compile", "emit", "resolve"]);
        assert_eq!(set.run("resolve", vec![]).await.unwrap(), Some(json!("resolved")));
        assert_eq!(
            set.run("compile", vec![json!("src"), json!("debug")]).await.unwrap(),
            Some(json!("compiled"))
        );
        assert_eq!(
            set.run("compile", vec![json!("src"), json!("release")]).await.unwrap(),
            Some(json!("optimized"))
        );
        assert_eq!(set.run("emit", vec![json!(1)]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_hook() {
        let set = HookSet::new();
        let err = set.run("missing", vec![]).await.unwrap_err();
        assert!(matches!(err, HookError::UnknownHook(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let hook = DynamicHook::new(HookKind::AsyncSeries, None);
        hook.tap_builtin(
            BuiltinTap::Fail {
                message: "no disk".to_string(),
            },
            TapKind::Callback,
            None,
        )
        .unwrap();

        let err = hook.run(vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "Tap failed: no disk");
    }

    #[test]
    fn test_sync_hook_refuses_async_taps() {
        let hook = DynamicHook::new(HookKind::SyncBail, None);
        let result = hook.tap_builtin(BuiltinTap::Pass, TapKind::Future, None);

        assert!(matches!(result, Err(HookError::InvalidConfiguration(_))));
        assert!(hook.is_empty());
    }

    #[test]
    fn test_async_hook_refuses_sync_delay() {
        let hook = DynamicHook::new(HookKind::AsyncParallel, None);
        let delay = BuiltinTap::Delay { ms: 200, value: None };

        let result = hook.tap_builtin(delay.clone(), TapKind::Sync, None);
        assert!(matches!(result, Err(HookError::InvalidConfiguration(_))));

        hook.tap_builtin(delay, TapKind::Callback, None).unwrap();
        assert_eq!(hook.len(), 1);
    }

    #[tokio::test]
    async fn test_removal_and_exhaust() {
        let hook = DynamicHook::new(HookKind::AsyncParallelBail, None);
        let handle = hook
            .tap_builtin(BuiltinTap::Return { value: json!(1) }, TapKind::Future, None)
            .unwrap();
        hook.tap_builtin(BuiltinTap::Pass, TapKind::Sync, None).unwrap();

        assert_eq!(hook.run(vec![json!(0)]).await.unwrap(), Some(json!(1)));
        assert!(handle.remove());
        assert_eq!(hook.run(vec![json!(0)]).await.unwrap(), Some(json!(0)));

        hook.exhaust();
        assert_eq!(hook.len(), 0);
    }
}
