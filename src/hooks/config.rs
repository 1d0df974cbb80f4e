//! TOML configuration for declaring hooks and their built-in taps

use crate::hooks::{BuiltinTap, HookError, HookKind, HookResult, TapKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Sample configuration printed by `hook-taps init`
pub const SAMPLE_CONFIG: &str = r#"# Hooks are called by name: `hook-taps run <hook> [-c hooks.toml] [--args '[...]']`

[[hooks]]
name = "resolve"
kind = "sync_bail"

[[hooks.taps]]
action = "log"
level = "info"
message = "resolving"

[[hooks.taps]]
action = "return"
value = "resolved"

[[hooks]]
name = "compile"
kind = "async_series_waterfall"
bucket_by = 1

[[hooks.taps]]
action = "delay"
ms = 10

[[hooks.taps]]
action = "return"
value = "compiled"
style = "callback"

[[hooks.taps]]
bucket = "release"
action = "return"
value = "optimized"

[[hooks]]
name = "emit"
kind = "async_parallel"

[[hooks.taps]]
action = "delay"
ms = 20

[[hooks.taps]]
action = "log"
level = "debug"
"#;

/// Main hooks configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub hooks: Vec<HookConfig>,
}

/// One named hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
    pub name: String,

    /// Invocation discipline
    pub kind: HookKind,

    /// Index of the argument whose value selects the bucket for a call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_by: Option<usize>,

    #[serde(default)]
    pub taps: Vec<TapConfig>,
}

/// One built-in tap of a hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapConfig {
    /// Only run when the call's bucket argument equals this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Calling convention; defaults to `sync` on synchronous hooks and `future` otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TapKind>,

    #[serde(flatten)]
    pub action: BuiltinTap,
}

impl HooksConfig {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Save configuration to TOML string.
    ///
    /// TOML has no null, so a `return` tap whose value is (or contains) JSON `null`
    /// cannot be written and yields an error.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Read and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> HookResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> HookResult<()> {
        let mut names = HashSet::new();
        for hook in &self.hooks {
            if !names.insert(hook.name.as_str()) {
                return Err(HookError::invalid_config(format!(
                    "Duplicate hook name: {}",
                    hook.name
                )));
            }
            hook.validate()?;
        }
        Ok(())
    }

    /// Find a hook by name
    pub fn hook(&self, name: &str) -> Option<&HookConfig> {
        self.hooks.iter().find(|hook| hook.name == name)
    }
}

impl HookConfig {
    /// Validate hook configuration
    pub fn validate(&self) -> HookResult<()> {
        if self.name.trim().is_empty() {
            return Err(HookError::invalid_config("Hook name cannot be empty"));
        }

        for tap in &self.taps {
            if tap.bucket.is_some() && self.bucket_by.is_none() {
                return Err(HookError::invalid_config(format!(
                    "Hook '{}' has a bucketed tap but no bucket_by",
                    self.name
                )));
            }
            if let Some(reason) = tap.action.style_conflict(self.kind, tap.style_for(self.kind)) {
                return Err(HookError::invalid_config(format!(
                    "Hook '{}': {}",
                    self.name, reason
                )));
            }
        }

        Ok(())
    }
}

impl TapConfig {
    /// A preset tap with the default calling convention
    pub fn new(action: BuiltinTap) -> Self {
        Self {
            bucket: None,
            style: None,
            action,
        }
    }

    /// Calling convention this tap is registered with on a hook of `kind`
    pub fn style_for(&self, kind: HookKind) -> TapKind {
        self.style.unwrap_or(if kind.is_async() {
            TapKind::Future
        } else {
            TapKind::Sync
        })
    }
}
