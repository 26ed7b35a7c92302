//! Global subscriber installation. Kept in its own binary so the subscriber
//! does not leak into other tests.

#![allow(clippy::unwrap_used)]

use upgradewatch::observability::{init_logging, LogFormat};

#[test]
fn init_logging_installs_once() {
    init_logging(LogFormat::Json).unwrap();
    tracing::info!(stage = "wait log", "subscriber installed");

    assert!(init_logging(LogFormat::Json).is_err());
    assert!(init_logging(LogFormat::Pretty).is_err());
}
