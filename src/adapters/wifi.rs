//! WiFi station-mode adapter (WPA2-Enterprise).
//!
//! Implements [`ConnectivityPort`]. The adapter only issues requests; the
//! join is asynchronous in the driver and [`ConnectivitySupervisor`]
//! polls [`is_connected`](ConnectivityPort::is_connected) to find out
//! when it completes.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspWifi` plus the `esp_eap_client_*`
//!   calls for PEAP/TTLS credentials.
//! - **all other targets**: a simulated link whose state tests drive
//!   through [`WifiAdapter::set_link`].
//!
//! [`ConnectivitySupervisor`]: crate::app::connectivity::ConnectivitySupervisor

use core::net::Ipv4Addr;

use log::{debug, info, warn};

use crate::app::ports::{ConnectivityError, ConnectivityPort};
use crate::config::{DeviceIdentity, Secret};

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_credentials(ssid: &str, identity: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidCredentials);
    }
    if identity.is_empty() {
        return Err(ConnectivityError::InvalidCredentials);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    ssid: String,
    identity: String,
    secret: Secret,
    join_requests: u32,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_ip: Option<Ipv4Addr>,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: esp_idf_hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
        identity: &DeviceIdentity,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let wifi = esp_idf_svc::wifi::EspWifi::new(modem, sysloop, Some(nvs))?;
        Ok(Self {
            ssid: identity.ssid.clone(),
            identity: identity.eap_identity.clone(),
            secret: identity.eap_secret.clone(),
            join_requests: 0,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(identity: &DeviceIdentity) -> Self {
        Self {
            ssid: identity.ssid.clone(),
            identity: identity.eap_identity.clone(),
            secret: identity.eap_secret.clone(),
            join_requests: 0,
            sim_link_up: false,
            sim_ip: None,
        }
    }

    /// Number of join requests issued (`begin_join` + `rejoin`).
    pub fn join_requests(&self) -> u32 {
        self.join_requests
    }

    /// Simulation: force the link state the driver would report.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_link(&mut self, up: bool) {
        self.sim_link_up = up;
        self.sim_ip = up.then_some(Ipv4Addr::new(192, 168, 4, 20));
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_configure(&mut self) -> Result<(), ConnectivityError> {
        use esp_idf_svc::sys::{
            esp, esp_eap_client_set_identity, esp_eap_client_set_password,
            esp_eap_client_set_username, esp_wifi_sta_enterprise_enable,
        };
        use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let _ = self.wifi.disconnect();

        let ssid = self
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| ConnectivityError::InvalidCredentials)?;
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid,
                auth_method: AuthMethod::WPA2Enterprise,
                ..Default::default()
            }))
            .map_err(|e| {
                warn!("WiFi: set_configuration failed: {:?}", e);
                ConnectivityError::DriverFailed
            })?;

        let identity = self.identity.as_bytes();
        let secret = self.secret.expose().as_bytes();
        // SAFETY: the EAP client copies each buffer before returning; the
        // lengths passed match the slices.
        unsafe {
            esp!(esp_eap_client_set_identity(identity.as_ptr(), identity.len() as i32))
                .and_then(|_| {
                    esp!(esp_eap_client_set_username(
                        identity.as_ptr(),
                        identity.len() as i32
                    ))
                })
                .and_then(|_| {
                    esp!(esp_eap_client_set_password(secret.as_ptr(), secret.len() as i32))
                })
                .map_err(|e| {
                    warn!("WiFi: EAP credentials rejected: {:?}", e);
                    ConnectivityError::InvalidCredentials
                })?;
            esp!(esp_wifi_sta_enterprise_enable()).map_err(|e| {
                warn!("WiFi: enterprise mode unavailable: {:?}", e);
                ConnectivityError::DriverFailed
            })?;
        }

        self.wifi.start().map_err(|e| {
            warn!("WiFi: start failed: {:?}", e);
            ConnectivityError::DriverFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_configure(&mut self) -> Result<(), ConnectivityError> {
        info!("WiFi(sim): configured enterprise STA for '{}'", self.ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_join(&mut self) -> Result<(), ConnectivityError> {
        self.wifi.connect().map_err(|e| {
            warn!("WiFi: connect request failed: {:?}", e);
            ConnectivityError::JoinFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_join(&mut self) -> Result<(), ConnectivityError> {
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn begin_join(&mut self) -> Result<(), ConnectivityError> {
        validate_credentials(&self.ssid, &self.identity)?;
        info!("WiFi: joining '{}' as '{}'", self.ssid, self.identity);
        self.platform_configure()?;
        self.join_requests = self.join_requests.saturating_add(1);
        self.platform_join()
    }

    #[cfg(target_os = "espidf")]
    fn is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn is_connected(&self) -> bool {
        self.sim_link_up
    }

    fn rejoin(&mut self) {
        self.join_requests = self.join_requests.saturating_add(1);
        if let Err(e) = self.platform_join() {
            debug!("WiFi: rejoin request failed: {}", e);
        }
    }

    #[cfg(target_os = "espidf")]
    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.sim_ip
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
