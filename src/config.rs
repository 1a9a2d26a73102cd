//! Configuration loading using Figment.
//!
//! Settings are merged from, in increasing priority:
//! 1. built-in defaults,
//! 2. a TOML file (`config/param_transfer.toml` unless another path is given),
//! 3. environment variables prefixed with `PARAM_TRANSFER_`, nested keys
//!    separated by a double underscore.
//!
//! # Example
//! ```no_run
//! use param_transfer::config::Settings;
//!
//! // PARAM_TRANSFER_DEVICE__HOST=192.168.10.10 overrides the file
//! let settings = Settings::load()?;
//! settings.validate()?;
//! # Ok::<(), param_transfer::ParamError>(())
//! ```

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::client::ClientOptions;
use crate::error::{ParamError, ParamResult};
use crate::validation;
use crate::wire;

/// Default configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/param_transfer.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "PARAM_TRANSFER_";

/// Longest I/O timeout accepted; beyond this the protocol stops feeling
/// synchronous to interactive callers.
const MAX_TIMEOUT_MS: u64 = 10_000;

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Device connection settings
    #[serde(default)]
    pub device: DeviceSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where and how to reach the device's parameter service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Hostname or IPv4 address
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port of the parameter service
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-exchange I/O timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Maximum enumeration payload in bytes
    #[serde(default = "default_receive_buffer_capacity")]
    pub receive_buffer_capacity: usize,
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_host() -> String {
    "192.168.10.10".to_string()
}

fn default_port() -> u16 {
    wire::DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_receive_buffer_capacity() -> usize {
    wire::DEFAULT_RECEIVE_BUFFER_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            receive_buffer_capacity: default_receive_buffer_capacity(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load from the default file and the environment.
    pub fn load() -> ParamResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file and the environment. A missing file is not
    /// an error; defaults apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ParamResult<Self> {
        Self::figment(path.as_ref()).extract().map_err(ParamError::from)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> ParamResult<()> {
        let invalid = |msg: String| Err(ParamError::Configuration(msg));
        let device = &self.device;

        if let Err(e) = validation::is_valid_host(&device.host) {
            return invalid(format!("device.host: {e}"));
        }
        if let Err(e) = validation::is_valid_port(device.port) {
            return invalid(format!("device.port: {e}"));
        }
        if let Err(e) = validation::is_in_range(device.timeout_ms, 1..=MAX_TIMEOUT_MS) {
            return invalid(format!(
                "device.timeout_ms = {}: {e} (1..={MAX_TIMEOUT_MS})",
                device.timeout_ms
            ));
        }
        if device.connect_timeout_ms == 0 {
            return invalid("device.connect_timeout_ms must be greater than 0".to_string());
        }
        if device.receive_buffer_capacity < wire::ENTRY_RECORD_LEN {
            return invalid(format!(
                "device.receive_buffer_capacity must hold at least one {}-byte entry",
                wire::ENTRY_RECORD_LEN
            ));
        }

        validation::is_one_of(
            &self.logging.level,
            &["trace", "debug", "info", "warn", "error"],
        )
        .map_err(|e| ParamError::Configuration(format!("logging.level: {e}")))?;
        validation::is_one_of(&self.logging.format, &["pretty", "compact", "json"])
            .map_err(|e| ParamError::Configuration(format!("logging.format: {e}")))?;

        Ok(())
    }
}

impl DeviceSettings {
    /// Client options derived from these settings.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            receive_buffer_capacity: self.receive_buffer_capacity,
            ..ClientOptions::default()
        }
    }

    /// The port as a service string for resolution.
    pub fn service(&self) -> String {
        self.port.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.device.port, 7683);
        assert_eq!(settings.device.timeout_ms, 500);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.device, DeviceSettings::default());
    }

    #[test]
    fn loads_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[device]\nhost = \"10.0.0.7\"\ntimeout_ms = 250\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.device.host, "10.0.0.7");
        assert_eq!(settings.device.timeout_ms, 250);
        assert_eq!(settings.device.port, 7683);
        assert_eq!(settings.logging.format, "json");
        assert_eq!(settings.logging.level, "info");
        assert!(settings.validate().is_ok());

        let options = settings.device.client_options();
        assert_eq!(options.timeout, Duration::from_millis(250));
        assert_eq!(options.expected_version, wire::PROTOCOL_VERSION);
    }

    #[test]
    fn rejects_bad_values() {
        let mut settings = Settings::default();
        settings.device.port = 0;
        assert!(matches!(
            settings.validate(),
            Err(ParamError::Configuration(_))
        ));

        let mut settings = Settings::default();
        settings.device.timeout_ms = 60_000;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.device.receive_buffer_capacity = 8;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        assert!(settings.validate().is_err());
    }
}
