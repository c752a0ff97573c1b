//! The explicit level given to `init_logging` beats `RUST_LOG`
//!
//! Kept in its own test binary: it installs the global subscriber.

use drawschema::core::logging::init_logging;
use tracing::level_filters::LevelFilter;

#[test]
fn test_explicit_level_overrides_rust_log() {
    std::env::set_var("RUST_LOG", "error");
    std::env::remove_var("DRAWSCHEMA_LOG_LEVEL");

    init_logging(Some("trace"), Some("compact")).unwrap();
    assert_eq!(LevelFilter::current(), LevelFilter::TRACE);
}
