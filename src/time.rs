//! Timing helpers for the fetch-cycle loop.

use std::{cmp, thread};
use std::time::{Duration, Instant};
use token::Context;

/// Longest single sleep taken while waiting out an interval. Bounds how late
/// a cancelled context is noticed.
const PAUSE_SLICE_MS: u64 = 100;

/// Nanoseconds elapsed since `i`, saturating.
pub fn elapsed_ns(i: Instant) -> u64 {
    let elapsed = i.elapsed();
    (elapsed.as_secs().saturating_mul(1_000_000_000))
        .saturating_add(u64::from(elapsed.subsec_nanos()))
}

/// Sleep for `interval`, returning early once `ctx` is done.
///
/// Returns `true` if the whole interval elapsed, `false` if the context ended
/// the wait.
pub fn pause(ctx: &Context, interval: Duration) -> bool {
    let start = Instant::now();
    let slice = Duration::from_millis(PAUSE_SLICE_MS);
    loop {
        if ctx.is_done() {
            return false;
        }
        let spent = start.elapsed();
        if spent >= interval {
            return true;
        }
        thread::sleep(cmp::min(slice, interval - spent));
    }
}
