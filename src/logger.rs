//! Process-wide logging setup. No persisted state (§6): structured logs
//! go to stdout via `tracing-subscriber`, leveled by `RUST_LOG`
//! (default `info`). Call sites throughout `gateway`, `routing`, and
//! `parsers` use `tracing::{trace,debug,info,warn}!` directly — this
//! module only wires the subscriber once at process start.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Idempotent in practice (only called
/// once from `main`), but tolerant of being called twice in tests.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
