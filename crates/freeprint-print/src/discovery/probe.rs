// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Active /24 subnet probe.
//
// Every host is tested on the raw and IPP ports.  Hosts answering on either
// are named via SNMP; IPP hosts are additionally queried for their
// attributes.  Individual probe failures are silent.

use std::future::Future;
use std::sync::Arc;

use freeprint_core::config::DiscoveryConfig;
use freeprint_core::error::Result;
use freeprint_core::{PrinterRecord, PropertyMap, Transport};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::ipp;
use crate::ipp_client::IppClient;
use crate::network::{is_port_open, subnet_hosts};
use crate::snmp::SysDescrSource;

/// Property holding the SNMP system description.
pub const SNMP_DESCR_ATTRIBUTE: &str = "snmp_sysDescr";

const MAKE_AND_MODEL: &str = "printer-make-and-model";

/// Anything that can answer a Get-Printer-Attributes query.
pub trait AttributeSource: Send + Sync + 'static {
    fn printer_attributes(&self, printer_uri: &str) -> impl Future<Output = Result<PropertyMap>> + Send;
}

impl AttributeSource for IppClient {
    fn printer_attributes(&self, printer_uri: &str) -> impl Future<Output = Result<PropertyMap>> + Send {
        self.get_printer_attributes(printer_uri)
    }
}

/// Probes one /24 for printers.
pub struct SubnetProbe<S, A> {
    config: DiscoveryConfig,
    network_id: Option<String>,
    snmp: S,
    ipp: A,
}

impl<S: SysDescrSource, A: AttributeSource> SubnetProbe<S, A> {
    pub fn new(config: DiscoveryConfig, network_id: Option<String>, snmp: S, ipp: A) -> Self {
        Self {
            config,
            network_id,
            snmp,
            ipp,
        }
    }

    /// Probe every host of `prefix`, sending each hit to `tx`.
    ///
    /// Returns when the subnet is exhausted, the receiver is gone, or
    /// `cancel` fires.
    #[instrument(skip(self, tx, cancel))]
    pub async fn run(self: Arc<Self>, prefix: String, tx: mpsc::Sender<PrinterRecord>, cancel: CancellationToken) {
        info!(concurrency = self.config.concurrency, "active probe started");
        let hosts: Vec<String> = subnet_hosts(&prefix).collect();

        let mut results = futures::stream::iter(hosts)
            .map(|host| {
                let probe = Arc::clone(&self);
                async move { probe.probe_host(&host).await }
            })
            .buffer_unordered(self.config.concurrency.max(1));

        loop {
            let found = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("active probe cancelled");
                    return;
                }
                next = results.next() => match next {
                    Some(found) => found,
                    None => break,
                },
            };
            for record in found {
                if tx.send(record).await.is_err() {
                    return;
                }
            }
        }
        info!("active probe finished");
    }

    /// Probe a single host.  Returns zero, one or two records (raw and IPP).
    pub async fn probe_host(&self, host: &str) -> Vec<PrinterRecord> {
        let timeout = self.config.connect_timeout();
        let (raw_open, ipp_open) = tokio::join!(
            is_port_open(host, self.config.raw_port, timeout),
            is_port_open(host, self.config.ipp_port, timeout),
        );
        if !raw_open && !ipp_open {
            return Vec::new();
        }
        debug!(host, raw_open, ipp_open, "potential printer");

        let mut base_properties = PropertyMap::new();
        let base_name = match self.snmp.sys_descr(host).await {
            Some(descr) => {
                base_properties.insert(SNMP_DESCR_ATTRIBUTE.to_string(), descr.clone());
                descr
            }
            None => PrinterRecord::generic_name(host),
        };

        let mut found = Vec::with_capacity(2);
        if raw_open {
            found.push(self.record(&base_name, host, self.config.raw_port, Transport::RawSocket, base_properties.clone()));
        }
        if ipp_open {
            let uri = IppClient::printer_uri(host, self.config.ipp_port);
            match self.ipp.printer_attributes(&uri).await {
                Ok(attrs) if ipp::is_successful(&attrs) => {
                    let name = attrs
                        .get(MAKE_AND_MODEL)
                        .filter(|n| !n.trim().is_empty())
                        .cloned()
                        .unwrap_or_else(|| base_name.clone());
                    let mut properties = base_properties;
                    properties.extend(attrs);
                    info!(host, %name, "IPP printer found");
                    found.push(self.record(&name, host, self.config.ipp_port, Transport::Ipp, properties));
                }
                Ok(attrs) => {
                    debug!(host, status = ?attrs.get(ipp::STATUS_ATTRIBUTE), "IPP query unsuccessful");
                }
                Err(e) => debug!(host, error = %e, "IPP query failed"),
            }
        }
        found
    }

    fn record(&self, name: &str, host: &str, port: u16, transport: Transport, properties: PropertyMap) -> PrinterRecord {
        let mut record = PrinterRecord::new(name, host, port, transport);
        record.properties = properties;
        record.network_id = self.network_id.clone();
        record
    }
}
