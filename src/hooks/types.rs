//! Core types for the hooks system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Values passed to taps as arguments and returned from them
pub trait HookValue: Clone + Send + Sync + 'static {}

impl<T> HookValue for T where T: Clone + Send + Sync + 'static {}

/// Keys partitioning taps into buckets
pub trait BucketKey: Eq + Hash + Clone + Send + Sync + 'static {}

impl<T> BucketKey for T where T: Eq + Hash + Clone + Send + Sync + 'static {}

/// Identifier of a registered tap, unique for the lifetime of one hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TapId(pub u64);

impl fmt::Display for TapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tap:{}", self.0)
    }
}

/// Calling convention a tap was registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapKind {
    /// Returns its result directly
    Sync,
    /// Signals completion through a [`Done`](crate::hooks::Done) handle
    Callback,
    /// Returns a future that resolves to its result
    Future,
}

impl fmt::Display for TapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Callback => write!(f, "callback"),
            Self::Future => write!(f, "future"),
        }
    }
}

/// Policy flags for the invocation algorithms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Complete with the first defined tap result
    pub should_bail: bool,
    /// Thread each defined tap result into the next tap's first argument
    pub should_waterfall: bool,
}

impl Modifiers {
    pub const PLAIN: Self = Self {
        should_bail: false,
        should_waterfall: false,
    };

    pub const BAIL: Self = Self {
        should_bail: true,
        should_waterfall: false,
    };

    pub const WATERFALL: Self = Self {
        should_bail: false,
        should_waterfall: true,
    };
}

/// The eight invocation disciplines a hook can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    Sync,
    SyncBail,
    SyncWaterfall,
    AsyncParallel,
    AsyncParallelBail,
    AsyncSeries,
    AsyncSeriesBail,
    AsyncSeriesWaterfall,
}

impl HookKind {
    /// All disciplines, synchronous ones first
    pub fn all() -> [Self; 8] {
        [
            Self::Sync,
            Self::SyncBail,
            Self::SyncWaterfall,
            Self::AsyncParallel,
            Self::AsyncParallelBail,
            Self::AsyncSeries,
            Self::AsyncSeriesBail,
            Self::AsyncSeriesWaterfall,
        ]
    }

    /// Whether taps of this hook may complete asynchronously
    pub fn is_async(&self) -> bool {
        !matches!(self, Self::Sync | Self::SyncBail | Self::SyncWaterfall)
    }

    /// Fixed modifiers for this discipline
    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::Sync | Self::AsyncParallel | Self::AsyncSeries => Modifiers::PLAIN,
            Self::SyncBail | Self::AsyncParallelBail | Self::AsyncSeriesBail => Modifiers::BAIL,
            Self::SyncWaterfall | Self::AsyncSeriesWaterfall => Modifiers::WATERFALL,
        }
    }

    /// Whether the run's terminal value is reported to the caller
    pub fn returns_value(&self) -> bool {
        self.modifiers() != Modifiers::PLAIN
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::SyncBail => "sync_bail",
            Self::SyncWaterfall => "sync_waterfall",
            Self::AsyncParallel => "async_parallel",
            Self::AsyncParallelBail => "async_parallel_bail",
            Self::AsyncSeries => "async_series",
            Self::AsyncSeriesBail => "async_series_bail",
            Self::AsyncSeriesWaterfall => "async_series_waterfall",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::all()
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("Unknown hook kind: {}", s))
    }
}

/// First element of an argument vector, the "no-op" value of every discipline
pub(crate) fn first_arg<V: Clone>(args: &[V]) -> Option<V> {
    args.first().cloned()
}

/// Replace the first argument, growing an empty vector to hold it
pub(crate) fn replace_first<V>(args: &mut Vec<V>, value: V) {
    match args.first_mut() {
        Some(slot) => *slot = value,
        None => args.push(value),
    }
}
