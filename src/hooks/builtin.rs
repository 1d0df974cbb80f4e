//! Built-in taps
//!
//! Small JSON-valued taps that can be declared in configuration instead of written as
//! closures. Each one can be registered under any of the three calling conventions.

use crate::hooks::{Done, HookError, HookKind, TapFn, TapKind, TapResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, info, trace, warn};

/// Level a `log` tap emits at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[serde(alias = "warning")]
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Action performed by a built-in tap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BuiltinTap {
    /// Complete without a value
    Pass,

    /// Complete with a fixed value
    Return { value: Value },

    /// Fail with a message
    Fail { message: String },

    /// Log the call arguments, then complete without a value
    Log {
        #[serde(default)]
        level: LogLevel,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Wait, then complete with `value` if given
    Delay {
        ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
}

impl BuiltinTap {
    /// Outcome of the tap for `args`, ignoring any delay
    pub fn evaluate(&self, args: &[Value]) -> TapResult<Value> {
        match self {
            Self::Pass => Ok(None),
            Self::Return { value } => Ok(Some(value.clone())),
            Self::Fail { message } => Err(HookError::failed(message.clone())),
            Self::Log { level, message } => {
                let args = Value::Array(args.to_vec());
                let message = message.as_deref().unwrap_or("Tap called");
                match level {
                    LogLevel::Error => error!(%args, "{}", message),
                    LogLevel::Warn => warn!(%args, "{}", message),
                    LogLevel::Info => info!(%args, "{}", message),
                    LogLevel::Debug => debug!(%args, "{}", message),
                    LogLevel::Trace => trace!(%args, "{}", message),
                }
                Ok(None)
            }
            Self::Delay { value, .. } => Ok(value.clone()),
        }
    }

    fn delay(&self) -> Option<Duration> {
        match self {
            Self::Delay { ms, .. } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }

    /// Reason the tap cannot be registered with `style` on a hook of `kind`, if any.
    ///
    /// Synchronous hooks only take sync taps. Async hooks refuse a sync `delay`, which
    /// would hold a runtime worker for the whole delay.
    pub fn style_conflict(&self, kind: HookKind, style: TapKind) -> Option<String> {
        if !kind.is_async() && style != TapKind::Sync {
            return Some(format!("{} hooks only accept sync taps, got {}", kind, style));
        }
        if kind.is_async() && style == TapKind::Sync && self.delay().is_some() {
            return Some(format!(
                "{} hooks need a callback or future style for delay taps",
                kind
            ));
        }
        None
    }

    /// Materialise the tap under the given calling convention.
    ///
    /// Delays block the calling thread for synchronous taps and use the tokio timer
    /// otherwise. Callback taps invoked outside a runtime wait on a helper thread.
    pub fn into_tap_fn(self, kind: TapKind) -> TapFn<Value> {
        let tap = Arc::new(self);
        match kind {
            TapKind::Sync => TapFn::sync(move |args: &[Value]| {
                if let Some(delay) = tap.delay() {
                    block_for(delay);
                }
                tap.evaluate(args)
            }),
            TapKind::Callback => TapFn::callback(move |args: &[Value], done: Done<Value>| {
                let Some(delay) = tap.delay() else {
                    done.complete(tap.evaluate(args));
                    return Ok(());
                };

                let tap = tap.clone();
                let args = args.to_vec();
                match Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            tokio::time::sleep(delay).await;
                            done.complete(tap.evaluate(&args));
                        });
                    }
                    Err(_) => {
                        thread::spawn(move || {
                            thread::sleep(delay);
                            done.complete(tap.evaluate(&args));
                        });
                    }
                }
                Ok(())
            }),
            TapKind::Future => TapFn::future(move |args: Vec<Value>| {
                let tap = tap.clone();
                async move {
                    if let Some(delay) = tap.delay() {
                        tokio::time::sleep(delay).await;
                    }
                    tap.evaluate(&args)
                }
            }),
        }
    }
}

/// Sleep on the calling thread, letting a multi-thread runtime move its other tasks
/// off this worker first
fn block_for(delay: Duration) {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| thread::sleep(delay));
        }
        _ => thread::sleep(delay),
    }
}
