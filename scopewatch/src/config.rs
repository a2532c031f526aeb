/*!
Configuration management for the scopewatch application.
*/

use anyhow::{ensure, Context, Result};
use nexstar::link::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
use nexstar::target::{DEFAULT_ELEVATION_M, DEFAULT_TOLERANCE_RAD};
use nexstar::{LinkAddress, Precision, StarCatalog, TargetIdentifier};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub link: LinkConfig,
    pub observer: ObserverConfig,
    pub target: TargetConfig,
    pub watch: WatchConfig,
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse config file as TOML")?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Reject values that would panic or fail later when the link is opened
    pub fn validate(&self) -> Result<()> {
        let timeout = self.link.read_timeout_secs;
        ensure!(
            timeout.is_finite() && timeout > 0.0,
            "link.read_timeout_secs must be a positive number of seconds, got {}",
            timeout
        );
        ensure!(
            self.target.tolerance_rad.is_finite() && self.target.tolerance_rad >= 0.0,
            "target.tolerance_rad must be a non-negative number, got {}",
            self.target.tolerance_rad
        );
        Ok(())
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}

/// How to reach the mount
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial device path, `tcp://host:port`, or `sim://`
    pub device: String,

    /// Serial baud rate
    pub baud_rate: u32,

    /// Per-byte read timeout in seconds
    pub read_timeout_secs: f64,
}

impl LinkConfig {
    pub fn address(&self) -> LinkAddress {
        LinkAddress::parse(&self.device, self.baud_rate)
    }

    /// Read timeout, falling back to the default for values that are not a
    /// positive finite number of seconds
    pub fn read_timeout(&self) -> Duration {
        match Duration::try_from_secs_f64(self.read_timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => timeout,
            _ => DEFAULT_READ_TIMEOUT,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB1".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_secs: DEFAULT_READ_TIMEOUT.as_secs_f64(),
        }
    }
}

/// Observer details the mount does not report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Height above sea level in metres
    pub elevation_m: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            elevation_m: DEFAULT_ELEVATION_M,
        }
    }
}

/// Target identification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Match tolerance on both axes, in radians
    pub tolerance_rad: f64,

    /// Optional TOML star catalog replacing the built-in bright stars
    pub catalog: Option<String>,
}

impl TargetConfig {
    /// Build the identifier from the configured catalog and tolerance
    pub fn identifier(&self) -> Result<TargetIdentifier> {
        let catalog = match &self.catalog {
            Some(path) => StarCatalog::load_from_file(path)
                .with_context(|| format!("Failed to load star catalog: {}", path))?,
            None => StarCatalog::bright_stars(),
        };
        Ok(TargetIdentifier::from_catalog(catalog).with_tolerance(self.tolerance_rad))
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            tolerance_rad: DEFAULT_TOLERANCE_RAD,
            catalog: None,
        }
    }
}

/// Poll loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Delay between polls in milliseconds
    pub interval_ms: u64,

    /// Position command variant to poll with
    pub precision: Precision,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            precision: Precision::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_roundtrip() {
        let original_config = AppConfig::new();

        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = temp_file.path();

        // Save and load
        original_config.save_to_file(temp_path).unwrap();
        let loaded_config = AppConfig::load_from_file(temp_path).unwrap();

        // Compare (using debug format since we don't have PartialEq)
        assert_eq!(format!("{:?}", original_config), format!("{:?}", loaded_config));
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::new();

        assert_eq!(config.link.device, "/dev/ttyUSB1");
        assert_eq!(config.link.baud_rate, 9600);
        assert_eq!(config.link.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.observer.elevation_m, 63.0);
        assert_eq!(config.target.tolerance_rad, 0.025);
        assert!(config.target.catalog.is_none());
        assert_eq!(config.watch.interval_ms, 500);
        assert_eq!(config.watch.precision, Precision::High);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [link]
            device = "tcp://10.0.0.5:2000"

            [watch]
            precision = "low"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.link.address(),
            LinkAddress::Tcp { addr: "10.0.0.5:2000".to_string() }
        );
        assert_eq!(config.link.baud_rate, 9600);
        assert_eq!(config.watch.precision, Precision::Low);
        assert_eq!(config.watch.interval_ms, 500);
    }

    #[test]
    fn test_missing_catalog_is_reported() {
        let target = TargetConfig {
            catalog: Some("/nonexistent/stars.toml".to_string()),
            ..TargetConfig::default()
        };
        let err = target.identifier().unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/stars.toml"));
    }

    #[test]
    fn test_bad_read_timeout_is_rejected_at_load() {
        for value in ["0", "-1.5", "inf", "nan"] {
            let temp_file = NamedTempFile::new().unwrap();
            std::fs::write(temp_file.path(), format!("[link]\nread_timeout_secs = {}\n", value)).unwrap();

            let err = AppConfig::load_from_file(temp_file.path()).unwrap_err();
            assert!(format!("{:#}", err).contains("read_timeout_secs"), "value = {}", value);
        }
    }

    #[test]
    fn test_read_timeout_never_panics() {
        let mut link = LinkConfig {
            read_timeout_secs: f64::INFINITY,
            ..LinkConfig::default()
        };
        assert_eq!(link.read_timeout(), DEFAULT_READ_TIMEOUT);
        link.read_timeout_secs = 0.0;
        assert_eq!(link.read_timeout(), DEFAULT_READ_TIMEOUT);
        link.read_timeout_secs = 0.25;
        assert_eq!(link.read_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config = AppConfig::load_or_default("/nonexistent/scopewatch.toml").unwrap();
        assert_eq!(config.link.device, "/dev/ttyUSB1");
    }
}
