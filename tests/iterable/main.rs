//! Integration tests for Layer 2: Iterables
//!
//! Tests for the query arena, link filtering, handles, and invalidation
//! routing, driven through a real store.
//!
//! Set `RUST_LOG=lodestore_iterable=trace` to see node construction and
//! materialization events.

mod filter_links;
mod invalidation;

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
