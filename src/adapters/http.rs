//! ESP-IDF HTTP(S) client adapter.
//!
//! Implements [`HttpClientPort`] on top of `esp_http_client`. Every call
//! opens its own connection, so clones can be handed to delivery workers
//! running on other tasks.
//!
//! [`TlsPolicy::Verified`] attaches the Mozilla certificate bundle.
//! [`TlsPolicy::Insecure`] attaches nothing; with
//! `CONFIG_ESP_TLS_INSECURE` + `CONFIG_ESP_TLS_SKIP_SERVER_CERT_VERIFY`
//! set in `sdkconfig.defaults` the handshake then accepts any server.

use core::time::Duration;

use embedded_svc::http::client::Client;
use embedded_svc::http::{Headers, Status};
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::io::{EspIOError, Read, Write};
use log::{debug, warn};

use crate::app::ports::{HttpClientPort, HttpError, ResponseSink, TlsPolicy};

const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone)]
pub struct EspHttpAdapter {
    timeout: Duration,
}

impl EspHttpAdapter {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn connect(&self, tls: TlsPolicy) -> Result<Client<EspHttpConnection>, HttpError> {
        let crt_bundle_attach = match tls {
            TlsPolicy::Verified => Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            TlsPolicy::Insecure => None,
        };
        let conf = Configuration {
            timeout: Some(self.timeout),
            buffer_size: Some(2048),
            crt_bundle_attach,
            ..Default::default()
        };
        let connection = EspHttpConnection::new(&conf).map_err(|e| {
            warn!("HTTP: client init failed: {:?}", e);
            HttpError::ConnectionFailed
        })?;
        Ok(Client::wrap(connection))
    }
}

/// `ESP_ERR_HTTP_EAGAIN` is what the client reports when the socket
/// timeout expires mid-read.
fn read_error(e: EspIOError) -> HttpError {
    if e.0.code() == esp_idf_svc::sys::ESP_ERR_HTTP_EAGAIN as i32 {
        HttpError::ReadTimeout
    } else {
        HttpError::ConnectionLost
    }
}

impl HttpClientPort for EspHttpAdapter {
    fn post(
        &mut self,
        url: &str,
        tls: TlsPolicy,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, HttpError> {
        let mut client = self.connect(tls)?;

        let length = body.len().to_string();
        let mut all_headers: Vec<(&str, &str)> = headers.to_vec();
        all_headers.push(("Content-Length", &length));

        let mut request = client.post(url, &all_headers).map_err(|e| {
            debug!("HTTP: POST {} open failed: {:?}", url, e);
            HttpError::ConnectionFailed
        })?;
        request.write_all(body).map_err(|_| HttpError::SendFailed)?;
        request.flush().map_err(|_| HttpError::SendFailed)?;
        let response = request.submit().map_err(read_error)?;
        Ok(response.status())
    }

    fn get(
        &mut self,
        url: &str,
        tls: TlsPolicy,
        sink: &mut dyn ResponseSink,
    ) -> Result<u16, HttpError> {
        let mut client = self.connect(tls)?;

        let request = client.get(url).map_err(|e| {
            debug!("HTTP: GET {} open failed: {:?}", url, e);
            HttpError::ConnectionFailed
        })?;
        let mut response = request.submit().map_err(|e| {
            debug!("HTTP: GET {} failed: {:?}", url, e);
            HttpError::ConnectionFailed
        })?;

        let status = response.status();
        let content_length = response
            .header("Content-Length")
            .or_else(|| response.header("content-length"))
            .and_then(|v| v.trim().parse::<u64>().ok());

        if !sink.on_response(status, content_length) {
            return Ok(status);
        }

        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = response.read(&mut buf).map_err(read_error)?;
            if n == 0 {
                break;
            }
            if !sink.on_chunk(&buf[..n]) {
                return Err(HttpError::Aborted);
            }
        }
        Ok(status)
    }
}
