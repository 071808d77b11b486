use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

pub const MIN_SCAN_INTERVAL_SECS: u64 = 10;
pub const MAX_SCAN_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub device: DeviceSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_port() -> u16 {
    80
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    20
}

fn default_scan_interval() -> u64 {
    30
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl DeviceSettings {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Budget for a whole request, body included.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl PollingSettings {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

impl ServerSettings {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("invalid server.bind address '{}'", self.bind))
    }
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.device.host.trim().is_empty() {
            bail!("device.host must not be empty");
        }
        let interval = self.polling.scan_interval_secs;
        if !(MIN_SCAN_INTERVAL_SECS..=MAX_SCAN_INTERVAL_SECS).contains(&interval) {
            bail!(
                "polling.scan_interval_secs must be between {} and {}, got {}",
                MIN_SCAN_INTERVAL_SECS,
                MAX_SCAN_INTERVAL_SECS,
                interval
            );
        }
        self.server.addr()?;
        Ok(())
    }
}

/// Load `config/homevolt.{toml,...}` if present, overridden by
/// `HOMEVOLT__SECTION__KEY` environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/homevolt").required(false))
        .add_source(config::Environment::with_prefix("HOMEVOLT").separator("__"))
        .build()?;

    parse_settings(settings)
}

fn parse_settings(raw: config::Config) -> anyhow::Result<Settings> {
    let settings: Settings = raw
        .try_deserialize()
        .context("failed to read Homevolt settings")?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> anyhow::Result<Settings> {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        parse_settings(raw)
    }

    #[test]
    fn test_defaults() {
        let settings = from_toml("[device]\nhost = \"192.168.70.12\"\n").unwrap();

        assert_eq!(settings.device.port, 80);
        assert_eq!(settings.device.password, None);
        assert!(!settings.device.use_ssl);
        assert_eq!(settings.device.connect_timeout(), Duration::from_secs(5));
        assert_eq!(settings.device.read_timeout(), Duration::from_secs(20));
        assert_eq!(settings.polling.scan_interval(), Duration::from_secs(30));
        assert_eq!(settings.server.addr().unwrap().port(), 8080);
        assert_eq!(settings.device.base_url(), "http://192.168.70.12:80");
    }

    #[test]
    fn test_full_config() {
        let settings = from_toml(
            r#"
            [device]
            host = "homevolt.local"
            port = 8443
            password = "secret"
            use_ssl = true

            [polling]
            scan_interval_secs = 60

            [server]
            bind = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(settings.device.base_url(), "https://homevolt.local:8443");
        assert_eq!(settings.device.password.as_deref(), Some("secret"));
        assert_eq!(settings.polling.scan_interval_secs, 60);
        assert_eq!(settings.server.addr().unwrap().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn test_rejects_out_of_range_interval() {
        for interval in [5, 301] {
            let toml = format!("[device]\nhost = \"h\"\n[polling]\nscan_interval_secs = {interval}\n");
            let err = from_toml(&toml).unwrap_err();
            assert!(err.to_string().contains("scan_interval_secs"), "{err}");
        }
        assert!(from_toml("[device]\nhost = \"h\"\n[polling]\nscan_interval_secs = 10\n").is_ok());
        assert!(from_toml("[device]\nhost = \"h\"\n[polling]\nscan_interval_secs = 300\n").is_ok());
    }

    #[test]
    fn test_rejects_missing_or_empty_host() {
        assert!(from_toml("[polling]\nscan_interval_secs = 30\n").is_err());
        assert!(from_toml("[device]\nhost = \"  \"\n").is_err());
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let err = from_toml("[device]\nhost = \"h\"\n[server]\nbind = \"not-an-addr\"\n").unwrap_err();
        assert!(err.to_string().contains("server.bind"));
    }
}
