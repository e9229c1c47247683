//! Verbose diagnostics switch
//!
//! Conditions that are worth knowing about but never fail an operation
//! (a skipped struct slot, a forced write to an immutable field, a region
//! reclaimed without an explicit close) are reported through [`diag!`]
//! only while verbose mode is on.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    OnceLock,
};

/// Environment variable consulted for the initial verbose state
pub const VERBOSE_ENV: &str = "VELLUM_VERBOSE";

static VERBOSE: OnceLock<AtomicBool> = OnceLock::new();

fn flag() -> &'static AtomicBool {
    VERBOSE.get_or_init(|| {
        let initial = std::env::var(VERBOSE_ENV)
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);
        AtomicBool::new(initial)
    })
}

/// Whether verbose diagnostics are currently emitted
pub fn is_verbose() -> bool {
    flag().load(Ordering::Relaxed)
}

/// Toggle verbose diagnostics, returning the previous state
pub fn set_verbose(verbose: bool) -> bool {
    flag().swap(verbose, Ordering::Relaxed)
}

/// Log a diagnostic under the `vellum::diag` target when verbose mode is on
macro_rules! diag {
    ($($arg:tt)+) => {
        if $crate::diagnostics::is_verbose() {
            log::debug!(target: "vellum::diag", $($arg)+);
        }
    };
}

pub(crate) use diag;
