//! Error handling for the hooks system

use std::any::Any;
use std::error::Error;
use std::fmt;

use crate::hooks::types::{TapId, TapKind};

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;

/// Completion of a single tap: `Ok(None)` is "no value", `Ok(Some(v))` a defined result.
pub type TapResult<V> = HookResult<Option<V>>;

/// Hook system error types
#[derive(Debug)]
pub enum HookError {
    /// A tap failed, either by returning an error or by signalling one
    TapFailed {
        source: Box<dyn Error + Send + Sync>,
    },

    /// A tap that cannot complete synchronously reached the synchronous algorithm
    IncompatibleTap {
        tap: TapId,
        kind: TapKind,
    },

    /// A tap panicked; the panic is caught and reported like any other failure
    TapPanicked {
        tap: TapId,
        message: String,
    },

    /// A future-returning tap was invoked outside of a tokio runtime
    NoRuntime {
        tap: TapId,
    },

    /// Every completion handle of a run was dropped before one of them signalled
    Abandoned,

    /// Invalid configuration
    InvalidConfiguration(String),

    /// No hook with this name exists in the set
    UnknownHook(String),

    /// Serialization/deserialization error
    SerializationError(serde_json::Error),

    /// TOML parse error
    TomlError(toml::de::Error),

    /// IO error
    IoError(std::io::Error),

    /// Custom error
    Custom(String),
}

impl HookError {
    /// Wrap any error as a tap failure
    pub fn failed(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::TapFailed {
            source: source.into(),
        }
    }

    /// Report a caught panic of `tap`
    pub fn panicked(tap: TapId, payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .unwrap_or_else(|| "opaque panic payload".to_string()),
        };
        Self::TapPanicked { tap, message }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Create a custom error
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TapFailed { source } => write!(f, "Tap failed: {}", source),
            Self::IncompatibleTap { tap, kind } => {
                write!(f, "Tap '{}' is a {} tap and cannot be called synchronously", tap, kind)
            }
            Self::TapPanicked { tap, message } => write!(f, "Tap '{}' panicked: {}", tap, message),
            Self::NoRuntime { tap } => {
                write!(f, "Tap '{}' returned a future but no tokio runtime is running", tap)
            }
            Self::Abandoned => write!(f, "Hook run was abandoned before completion"),
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::UnknownHook(name) => write!(f, "Hook not found: {}", name),
            Self::SerializationError(e) => write!(f, "Serialization error: {}", e),
            Self::TomlError(e) => write!(f, "TOML error: {}", e),
            Self::IoError(e) => write!(f, "IO error: {}", e),
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for HookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TapFailed { source } => Some(source.as_ref() as &(dyn Error + 'static)),
            Self::SerializationError(e) => Some(e),
            Self::TomlError(e) => Some(e),
            Self::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HookError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError(error)
    }
}

impl From<toml::de::Error> for HookError {
    fn from(error: toml::de::Error) -> Self {
        Self::TomlError(error)
    }
}

impl From<std::io::Error> for HookError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}
