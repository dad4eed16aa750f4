//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements             | Connects to                   |
//! |-------------|------------------------|-------------------------------|
//! | `wifi`      | ConnectivityPort       | ESP-IDF WiFi STA (EAP)        |
//! | `http`      | HttpClientPort         | `esp_http_client` (espidf)    |
//! | `time`      | ClockPort, DelayPort   | ESP32 system timer, SNTP      |
//! | `local_ota` | LocalOtaPort           | TCP push listener + OTA flash |
//! | `log_sink`  | EventSink              | Serial log output             |
//! | `restart`   | RestartPort            | `esp_restart()`               |

#[cfg(target_os = "espidf")]
pub mod http;
pub mod local_ota;
pub mod log_sink;
pub mod restart;
pub mod time;
pub mod wifi;
