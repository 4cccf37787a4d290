//! Configuration management for the range-test node
//!
//! Loads configuration from config.toml with environment variable overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Complete node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub wifi: WifiConfig,
    pub report: ReportConfig,
    pub lorawan: LorawanConfig,
    pub device: DeviceConfig,
}

/// Local network credentials, handed to the platform network stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiConfig {
    pub enabled: bool,
    pub ssid: String,
    pub password: String,
}

/// HTTP side-channel collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub url: String,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_connect_retry_ms")]
    pub connect_retry_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// OTAA identifiers and uplink cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LorawanConfig {
    pub dev_eui: String,
    pub join_eui: String,
    pub app_key: String,
    #[serde(default = "default_tx_interval_secs")]
    pub tx_interval_secs: u64,
}

/// Device-side constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Supply voltage placeholder until battery monitoring is implemented
    #[serde(default = "default_battery_volts")]
    pub battery_volts: f32,
}

fn default_connect_attempts() -> u32 {
    20
}

fn default_connect_retry_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_tx_interval_secs() -> u64 {
    30
}

fn default_battery_volts() -> f32 {
    3.3
}

impl Config {
    /// Load configuration from file
    ///
    /// Environment variables override config file values:
    /// - WIFI_PASSWORD: Override WiFi password
    /// - APP_KEY: Override the OTAA application key
    pub fn load(path: &str) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let mut config = Self::parse(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        // Override with environment variables
        if let Ok(password) = std::env::var("WIFI_PASSWORD") {
            tracing::info!("Using WIFI_PASSWORD from environment");
            config.wifi.password = password;
        }
        if let Ok(key) = std::env::var("APP_KEY") {
            tracing::info!("Using APP_KEY from environment");
            config.lorawan.app_key = key;
        }

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string (no env overrides, no validation)
    pub fn parse(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate collector URL
        if !self.report.url.starts_with("http://") && !self.report.url.starts_with("https://") {
            anyhow::bail!(
                "Invalid collector URL: {} (must start with http:// or https://)",
                self.report.url
            );
        }

        if self.report.connect_attempts == 0 {
            anyhow::bail!("report.connect_attempts must be at least 1");
        }

        if self.lorawan.tx_interval_secs == 0 {
            anyhow::bail!("lorawan.tx_interval_secs must be at least 1");
        }

        // Validate OTAA identifiers
        self.lorawan.dev_eui_bytes().context("Invalid dev_eui")?;
        self.lorawan.join_eui_bytes().context("Invalid join_eui")?;
        self.lorawan.app_key_bytes().context("Invalid app_key")?;

        Ok(())
    }
}

impl LorawanConfig {
    /// Device EUI as raw bytes
    pub fn dev_eui_bytes(&self) -> Result<[u8; 8]> {
        parse_hex(&self.dev_eui)
    }

    /// Join (application) EUI as raw bytes
    pub fn join_eui_bytes(&self) -> Result<[u8; 8]> {
        parse_hex(&self.join_eui)
    }

    /// Application key as raw bytes
    pub fn app_key_bytes(&self) -> Result<[u8; 16]> {
        parse_hex(&self.app_key)
    }
}

/// Decode a hex string into an exact-width byte array
fn parse_hex<const N: usize>(value: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(value).with_context(|| format!("Not valid hex: {}", value))?;
    let bytes: [u8; N] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("Expected {} bytes, got {}", N, b.len()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [wifi]
        enabled = true
        ssid = "lab"
        password = "secret"

        [report]
        url = "http://192.168.1.10:9000/api/rangetest"

        [lorawan]
        dev_eui = "70b3d57ed0051a2b"
        join_eui = "70b3d57ed0000001"
        app_key = "2b7e151628aed2a6abf7158809cf4f3c"

        [device]
    "#;

    #[test]
    fn test_parse_sample_config() {
        let config = Config::parse(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.report.connect_attempts, 20);
        assert_eq!(config.lorawan.tx_interval_secs, 30);
        assert_eq!(config.device.battery_volts, 3.3);
        assert_eq!(
            config.lorawan.dev_eui_bytes().unwrap(),
            [0x70, 0xb3, 0xd5, 0x7e, 0xd0, 0x05, 0x1a, 0x2b]
        );
    }

    #[test]
    fn test_rejects_bad_url_scheme() {
        let mut config = Config::parse(SAMPLE).unwrap();
        config.report.url = "ftp://192.168.1.10/api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_short_app_key() {
        let mut config = Config::parse(SAMPLE).unwrap();
        config.lorawan.app_key = "2b7e1516".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_hex_eui() {
        let mut config = Config::parse(SAMPLE).unwrap();
        config.lorawan.dev_eui = "not-hex-at-all!!".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = Config::parse(SAMPLE).unwrap();
        config.lorawan.tx_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
