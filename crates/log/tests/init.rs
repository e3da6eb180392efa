//! Installing the global subscriber.
//!
//! Kept in its own test binary: the subscriber is process-wide.

use wharf_log::{Config, Format, LogError};

#[test]
fn installs_once_then_refuses() {
    let guard = wharf_log::init_with(
        Config {
            level: "debug".into(),
            format: Format::Json,
            ..Config::default()
        }
        .with_service("wharf-test"),
    )
    .expect("first install succeeds");

    wharf_log::info!(answer = 42, "logged through the installed subscriber");

    let second = wharf_log::init();
    assert!(matches!(second, Err(LogError::AlreadyInitialized(_))));

    drop(guard);
}

#[test]
fn bad_filter_fails_before_installing() {
    let err = wharf_log::init_with(Config {
        level: "wharf=nonsense".into(),
        ..Config::default()
    })
    .unwrap_err();
    assert!(matches!(err, LogError::Filter { .. }));
}
