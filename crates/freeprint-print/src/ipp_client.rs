// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP-over-HTTP client used to enrich discovered printers.
//
// Printers commonly present self-signed certificates whose names match
// nothing, so this client accepts any certificate.  That setting lives on
// this client's private `reqwest::Client` only and must not be reused for
// any other HTTP traffic.

use std::time::Duration;

use freeprint_core::PropertyMap;
use freeprint_core::error::{FreeprintError, Result};
use tracing::{debug, instrument, warn};

use crate::ipp;

/// Resource path queried on every printer.
pub const IPP_PATH: &str = "/ipp/print";

pub const IPP_CONTENT_TYPE: &str = "application/ipp";

/// Property holding the undecoded response, as upper-case hex bytes.
pub const RAW_HEX_ATTRIBUTE: &str = "raw_ipp_response_hex";

/// Client for Get-Printer-Attributes.
#[derive(Debug, Clone)]
pub struct IppClient {
    http: reqwest::Client,
}

impl IppClient {
    /// Build a client whose requests give up after `timeout`.
    ///
    /// Certificate and hostname verification are disabled.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()
            .map_err(|e| FreeprintError::IppRequest(format!("HTTP client error: {e}")))?;
        Ok(Self { http })
    }

    /// `http://<host>:<port>/ipp/print`
    pub fn printer_uri(host: &str, port: u16) -> String {
        format!("http://{host}:{port}{IPP_PATH}")
    }

    /// Query a printer's attributes.
    ///
    /// The returned map carries the decoded attributes, the status under
    /// `ipp-status-code`, and the raw response under
    /// [`RAW_HEX_ATTRIBUTE`].  A non-2xx HTTP status is an error; an IPP
    /// error status is not.
    #[instrument(skip(self))]
    pub async fn get_printer_attributes(&self, printer_uri: &str) -> Result<PropertyMap> {
        let body = ipp::build_get_attributes_request(printer_uri);

        let response = self
            .http
            .post(printer_uri)
            .header(reqwest::header::CONTENT_TYPE, IPP_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| FreeprintError::IppRequest(format!("{printer_uri}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "IPP request rejected");
            return Err(FreeprintError::IppRequest(format!(
                "{printer_uri}: HTTP {status}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FreeprintError::IppRequest(format!("{printer_uri}: {e}")))?;

        let mut attrs = ipp::parse_response(&bytes);
        attrs.insert(RAW_HEX_ATTRIBUTE.to_string(), to_hex(&bytes));
        debug!(count = attrs.len(), "received printer attributes");
        Ok(attrs)
    }
}

/// `[0x01, 0xab]` → `"01 AB"`
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the port.
    async fn serve_once(status_line: &'static str, body: Vec<u8>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/ipp\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            let _ = socket.shutdown().await;
        });
        port
    }

    #[test]
    fn hex_is_upper_case_and_spaced() {
        assert_eq!(to_hex(&[0x01, 0xab, 0x00]), "01 AB 00");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn printer_uri_uses_ipp_path() {
        assert_eq!(IppClient::printer_uri("10.0.0.5", 631), "http://10.0.0.5:631/ipp/print");
    }

    #[tokio::test]
    async fn decodes_response_and_keeps_raw_bytes() {
        let mut builder = ipp::IppMessageBuilder::new(ipp::STATUS_OK, 1);
        builder
            .begin_group(ipp::TAG_PRINTER_ATTRIBUTES)
            .text("printer-make-and-model", "Acme LaserJet");
        let body = builder.build();
        let expected_hex = to_hex(&body);
        let port = serve_once("200 OK", body).await;

        let client = IppClient::new(Duration::from_secs(5)).unwrap();
        let attrs = client
            .get_printer_attributes(&IppClient::printer_uri("127.0.0.1", port))
            .await
            .unwrap();

        assert!(ipp::is_successful(&attrs));
        assert_eq!(attrs["printer-make-and-model"], "Acme LaserJet");
        assert_eq!(attrs[RAW_HEX_ATTRIBUTE], expected_hex);
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let port = serve_once("404 Not Found", Vec::new()).await;
        let client = IppClient::new(Duration::from_secs(5)).unwrap();
        let err = client
            .get_printer_attributes(&IppClient::printer_uri("127.0.0.1", port))
            .await
            .unwrap_err();
        assert!(matches!(err, FreeprintError::IppRequest(_)));
    }
}
