//! Invocation algorithms
//!
//! Three executors drive a resolved tap list: a synchronous loop, an asynchronous
//! series chain and an asynchronous parallel fan-out. They differ only in scheduling;
//! bail and waterfall policy comes from [`Modifiers`].

use crate::hooks::types::{first_arg, replace_first};
use crate::hooks::{Done, HookValue, Modifiers, Tap, TapResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Run synchronous taps in order on the caller's thread.
///
/// Returns the bailed value, or the first argument after waterfalling. A failing tap
/// stops the run and its error is returned as is.
pub fn invoke_synchronously<V: HookValue>(
    mut args: Vec<V>,
    modifiers: Modifiers,
    taps: &[Arc<Tap<V>>],
) -> TapResult<V> {
    trace!(taps = taps.len(), ?modifiers, "Synchronous run started");

    for tap in taps {
        match tap.call_sync(&args)? {
            Some(value) if modifiers.should_bail => {
                trace!(tap = %tap.id(), "Synchronous run bailed");
                return Ok(Some(value));
            }
            Some(value) if modifiers.should_waterfall => replace_first(&mut args, value),
            _ => {}
        }
    }

    Ok(first_arg(&args))
}

/// Run taps one at a time; each tap starts only after the previous one completed.
///
/// `on_complete` receives an error, the bailed value, or the first argument once the
/// list is exhausted. Remaining taps are never started after an error or a bail.
pub fn invoke_series<V: HookValue>(
    args: Vec<V>,
    modifiers: Modifiers,
    taps: Vec<Arc<Tap<V>>>,
    on_complete: Done<V>,
) {
    trace!(taps = taps.len(), ?modifiers, "Series run started");
    series_next(args, modifiers, taps.into(), on_complete);
}

fn series_next<V: HookValue>(
    mut args: Vec<V>,
    modifiers: Modifiers,
    mut taps: VecDeque<Arc<Tap<V>>>,
    on_complete: Done<V>,
) {
    let Some(tap) = taps.pop_front() else {
        on_complete.resolve(first_arg(&args));
        return;
    };

    let current = args.clone();
    let done = Done::new(move |outcome: TapResult<V>| match outcome {
        Err(error) => on_complete.reject(error),
        Ok(Some(value)) if modifiers.should_bail => on_complete.resolve(Some(value)),
        Ok(Some(value)) if modifiers.should_waterfall => {
            replace_first(&mut args, value);
            series_next(args, modifiers, taps, on_complete);
        }
        Ok(_) => series_next(args, modifiers, taps, on_complete),
    });

    tap.invoke(&current, done);
}

/// Start every tap at once with the same arguments.
///
/// The first error, or with `should_bail` the first defined result, completes the run;
/// otherwise it completes with the first argument once every tap has completed.
/// Waterfalling does not apply: parallel taps have no successor.
pub fn invoke_parallel<V: HookValue>(
    args: Vec<V>,
    modifiers: Modifiers,
    taps: Vec<Arc<Tap<V>>>,
    on_complete: Done<V>,
) {
    trace!(taps = taps.len(), ?modifiers, "Parallel run started");

    if taps.is_empty() {
        on_complete.resolve(first_arg(&args));
        return;
    }

    let pending = Arc::new(AtomicUsize::new(taps.len()));
    let fallback = first_arg(&args);

    for tap in &taps {
        let on_complete = on_complete.clone();
        let pending = pending.clone();
        let fallback = fallback.clone();

        let done = Done::new(move |outcome: TapResult<V>| match outcome {
            Err(error) => on_complete.reject(error),
            Ok(Some(value)) if modifiers.should_bail => on_complete.resolve(Some(value)),
            Ok(_) => {
                if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                    on_complete.resolve(fallback);
                }
            }
        });

        tap.invoke(&args, done);
    }
}
