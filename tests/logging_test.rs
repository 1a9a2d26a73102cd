//! Global subscriber installation.
//!
//! Kept in its own test binary because `logging::init` installs the
//! process-wide default subscriber, which would stop `#[traced_test]` unit
//! tests from capturing events.

use param_transfer::config::Settings;
use param_transfer::logging::{self, OutputFormat, TracingConfig};
use tracing::Level;

#[test]
fn init_is_idempotent() {
    let config = TracingConfig::new(Level::WARN)
        .with_format(OutputFormat::Compact)
        .with_ansi(false);
    assert!(logging::init(config.clone()).is_ok());
    assert!(logging::init(config).is_ok());

    // A later init from settings is also a no-op rather than an error
    assert!(logging::init_from_settings(&Settings::default()).is_ok());
}

#[test]
fn invalid_settings_are_rejected_before_install() {
    let mut settings = Settings::default();
    settings.logging.format = "xml".to_string();
    assert!(logging::init_from_settings(&settings).is_err());
}
