// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Passive mDNS listener.
//
// Browses for the four printer service types using `mdns-sd`.  Each browse
// gets its own thread draining the daemon's event channel; resolved services
// are converted to `PrinterRecord`s and pushed into the discovery channel.
// Dropping the `MdnsListener` stops every browse and shuts the daemon down.

use std::net::IpAddr;

use freeprint_core::error::{FreeprintError, Result};
use freeprint_core::{PrinterRecord, PropertyMap, Transport};
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::txt;

/// Service types browsed, in subscription order.
pub const SERVICE_TYPES: [&str; 4] = [
    "_ipp._tcp.local.",
    "_ipps._tcp.local.",
    "_pdl-datastream._tcp.local.",
    "_printer._tcp.local.",
];

/// A running mDNS browse.  Released on drop.
pub struct MdnsListener {
    daemon: ServiceDaemon,
    browsing: Vec<&'static str>,
}

impl MdnsListener {
    /// Start browsing all printer service types, sending resolved printers
    /// to `tx`.
    pub fn start(tx: mpsc::Sender<PrinterRecord>) -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| FreeprintError::Discovery(format!("failed to start mDNS daemon: {e}")))?;
        let mut listener = Self {
            daemon,
            browsing: Vec::with_capacity(SERVICE_TYPES.len()),
        };

        for service_type in SERVICE_TYPES {
            let receiver = listener
                .daemon
                .browse(service_type)
                .map_err(|e| FreeprintError::Discovery(format!("browse {service_type}: {e}")))?;
            listener.browsing.push(service_type);
            spawn_listener(service_type, receiver, tx.clone())?;
        }

        info!("mDNS printer discovery started");
        Ok(listener)
    }
}

impl Drop for MdnsListener {
    fn drop(&mut self) {
        for service_type in &self.browsing {
            if let Err(e) = self.daemon.stop_browse(service_type) {
                debug!(service_type, error = %e, "stop browse failed");
            }
        }
        if let Err(e) = self.daemon.shutdown() {
            debug!(error = %e, "mDNS daemon shutdown failed");
        }
        info!("mDNS printer discovery stopped");
    }
}

/// Drain one browse channel until the search stops or nobody is listening.
fn spawn_listener(
    service_type: &'static str,
    receiver: mdns_sd::Receiver<ServiceEvent>,
    tx: mpsc::Sender<PrinterRecord>,
) -> Result<()> {
    std::thread::Builder::new()
        .name(format!("mdns-{service_type}"))
        .spawn(move || {
            while let Ok(event) = receiver.recv() {
                match event {
                    ServiceEvent::SearchStarted(stype) => {
                        debug!(service_type = %stype, "mDNS search started");
                    }
                    ServiceEvent::ServiceFound(stype, fullname) => {
                        debug!(service_type = %stype, name = %fullname, "service found");
                    }
                    ServiceEvent::ServiceResolved(info) => {
                        let Some(printer) = record_from_service(&info) else {
                            debug!(name = %info.get_fullname(), "resolved service is not a usable printer");
                            continue;
                        };
                        info!(name = %printer.name, host = %printer.host_address, "printer resolved");
                        if tx.blocking_send(printer).is_err() {
                            break;
                        }
                    }
                    ServiceEvent::ServiceRemoved(stype, fullname) => {
                        debug!(service_type = %stype, name = %fullname, "service removed");
                    }
                    ServiceEvent::SearchStopped(stype) => {
                        debug!(service_type = %stype, "mDNS search stopped");
                        break;
                    }
                }
            }
        })
        .map(|_| ())
        .map_err(|e| FreeprintError::Discovery(format!("failed to spawn mDNS listener thread: {e}")))
}

/// Map an advertised service type to a transport.
pub fn transport_for(service_type: &str) -> Option<Transport> {
    if service_type.contains("_ipp") {
        Some(Transport::Ipp)
    } else if service_type.contains("_pdl-datastream") || service_type.contains("_printer") {
        Some(Transport::RawSocket)
    } else {
        None
    }
}

/// Convert a resolved service.  Services without an IPv4 address or of an
/// unknown type are dropped.
pub fn record_from_service(info: &ServiceInfo) -> Option<PrinterRecord> {
    let transport = transport_for(info.get_type())?;
    let host = info
        .get_addresses()
        .iter()
        .find(|a| a.is_ipv4())
        .map(IpAddr::to_string);
    let Some(host) = host else {
        warn!(name = %info.get_fullname(), "service has no IPv4 address");
        return None;
    };

    let properties = txt::decode(&txt::encode(info.get_properties()));
    let name = best_name(&properties, instance_name(info));

    let mut record = PrinterRecord::new(name, host, info.get_port(), transport);
    record.properties = properties;
    Some(record)
}

/// `"Acme 9000._ipp._tcp.local."` → `"Acme 9000"`
fn instance_name(info: &ServiceInfo) -> &str {
    let fullname = info.get_fullname();
    fullname
        .strip_suffix(info.get_type())
        .map(|n| n.trim_end_matches('.'))
        .unwrap_or(fullname)
}

/// `product` without its parentheses, else `ty`, else the service name.
fn best_name(properties: &PropertyMap, service_name: &str) -> String {
    if let Some(product) = properties.get("product").filter(|p| !p.is_empty()) {
        let stripped = product
            .strip_prefix('(')
            .and_then(|p| p.strip_suffix(')'))
            .unwrap_or(product);
        return stripped.to_string();
    }
    properties
        .get("ty")
        .filter(|t| !t.is_empty())
        .cloned()
        .unwrap_or_else(|| service_name.to_string())
}
