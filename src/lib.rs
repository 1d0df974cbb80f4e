//! Extension-point dispatcher.
//!
//! Register taps against a hook, then call the hook synchronously, as an async series
//! or as an async parallel fan-out:
//!
//! ```
//! use hook_taps::hooks::prelude::*;
//!
//! let hook = SyncBailHook::new();
//! hook.tap(|_args: &[i32]| Ok(None));
//! let handle = hook.tap(|args: &[i32]| Ok(Some(args[0] + args[1])));
//!
//! assert_eq!(hook.call(vec![1, 2]).unwrap(), Some(3));
//! handle.remove();
//! assert_eq!(hook.call(vec![1, 2]).unwrap(), Some(1));
//! ```

pub mod hooks;
pub mod platform_dirs;
