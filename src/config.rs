//! Device configuration.
//!
//! Settings are compiled in from `cfg.toml` (section `[fieldlink]`, see
//! `cfg.toml.example`) and converted once at boot into a validated
//! [`DeviceConfig`]. Nothing is persisted or changed at runtime.

use core::fmt;

/// Upper bound on telemetry endpoints and on delivery workers.
pub const MAX_ENDPOINTS: usize = 4;
pub const MAX_WORKERS: usize = 4;

/// Build-time settings. Every value can be overridden in `cfg.toml`.
#[toml_cfg::toml_config]
pub struct Settings {
    #[default("")]
    wifi_ssid: &'static str,
    #[default("")]
    eap_identity: &'static str,
    #[default("")]
    eap_secret: &'static str,
    // comma-separated
    #[default("")]
    telemetry_urls: &'static str,
    #[default("")]
    version_url: &'static str,
    #[default("")]
    firmware_url: &'static str,
    #[default(60000)]
    interval_ms: u64,
    #[default(60)]
    connect_attempts: u32,
    #[default(2)]
    delivery_workers: usize,
    #[default(10000)]
    http_timeout_ms: u64,
    #[default(3232)]
    local_ota_port: u16,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// SSID must be 1-32 printable ASCII bytes.
    InvalidSsid,
    MissingIdentity,
    NoEndpoints,
    TooManyEndpoints,
    /// The named URL does not start with `http://` or `https://`.
    InvalidUrl(&'static str),
    ZeroInterval,
    ZeroAttempts,
    InvalidWorkerCount,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::MissingIdentity => write!(f, "EAP identity is empty"),
            Self::NoEndpoints => write!(f, "no telemetry endpoints configured"),
            Self::TooManyEndpoints => write!(f, "more than {MAX_ENDPOINTS} telemetry endpoints"),
            Self::InvalidUrl(which) => write!(f, "{which} must start with http:// or https://"),
            Self::ZeroInterval => write!(f, "interval must be > 0 ms"),
            Self::ZeroAttempts => write!(f, "connect attempt ceiling must be > 0"),
            Self::InvalidWorkerCount => write!(f, "delivery workers must be 1-{MAX_WORKERS}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// String whose `Debug` output never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Who the device is and where it talks to. Fixed for the whole boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub ssid: String,
    pub eap_identity: String,
    pub eap_secret: Secret,
    pub telemetry_urls: Vec<String>,
    pub version_url: String,
    pub firmware_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub identity: DeviceIdentity,
    /// Periodic phase interval.
    pub interval_ms: u64,
    /// Join attempts (one per second) before giving up at boot.
    pub connect_attempts: u32,
    pub delivery_workers: usize,
    pub http_timeout_ms: u64,
    pub local_ota_port: u16,
}

impl DeviceConfig {
    /// Build from the compiled-in [`SETTINGS`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_settings(&SETTINGS)
    }

    pub fn from_settings(s: &Settings) -> Result<Self, ConfigError> {
        let config = Self {
            identity: DeviceIdentity {
                ssid: s.wifi_ssid.to_owned(),
                eap_identity: s.eap_identity.to_owned(),
                eap_secret: Secret::new(s.eap_secret),
                telemetry_urls: split_urls(s.telemetry_urls),
                version_url: s.version_url.trim().to_owned(),
                firmware_url: s.firmware_url.trim().to_owned(),
            },
            interval_ms: s.interval_ms,
            connect_attempts: s.connect_attempts,
            delivery_workers: s.delivery_workers,
            http_timeout_ms: s.http_timeout_ms,
            local_ota_port: s.local_ota_port,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = &self.identity;
        if id.ssid.is_empty() || id.ssid.len() > 32 || !is_printable_ascii(&id.ssid) {
            return Err(ConfigError::InvalidSsid);
        }
        if id.eap_identity.is_empty() {
            return Err(ConfigError::MissingIdentity);
        }
        if id.telemetry_urls.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        if id.telemetry_urls.len() > MAX_ENDPOINTS {
            return Err(ConfigError::TooManyEndpoints);
        }
        if !id.telemetry_urls.iter().all(|u| is_http_url(u)) {
            return Err(ConfigError::InvalidUrl("telemetry_urls"));
        }
        if !is_http_url(&id.version_url) {
            return Err(ConfigError::InvalidUrl("version_url"));
        }
        if !is_http_url(&id.firmware_url) {
            return Err(ConfigError::InvalidUrl("firmware_url"));
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.delivery_workers == 0 || self.delivery_workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount);
        }
        Ok(())
    }
}

fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_owned)
        .collect()
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn is_http_url(url: &str) -> bool {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty())
}
