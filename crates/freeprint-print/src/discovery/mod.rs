// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer discovery.
//
// Two producers feed one bounded channel: the active subnet probe and the
// passive mDNS listener.  A merge task folds their results per host and
// forwards every changed record to the session's stream.  The stream runs
// until the session is stopped or dropped; both release their resources
// either way.

pub mod mdns;
pub mod merge;
pub mod probe;
pub mod txt;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use freeprint_core::config::DiscoveryConfig;
use freeprint_core::error::Result;
use freeprint_core::{AppConfig, PrinterRecord};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ipp_client::IppClient;
use crate::network;
use crate::snmp::{SnmpClient, SysDescrSource};

pub use merge::{MergeTable, merge};
pub use probe::{AttributeSource, SubnetProbe};

use mdns::MdnsListener;

/// Discovery settings plus the collaborators the active probe uses.
///
/// Each [`start`](Self::start) begins a fresh scan.
pub struct Discovery<S = SnmpClient, A = IppClient> {
    config: DiscoveryConfig,
    network_id: Option<String>,
    subnet_prefix: Option<String>,
    passive: bool,
    snmp: S,
    ipp: A,
}

impl Discovery {
    /// Discovery with the real SNMP and IPP clients.  The subnet is taken
    /// from the configuration, else detected from the local address.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let discovery = &config.discovery;
        let ipp = IppClient::new(discovery.ipp_request_timeout())?;
        let snmp = SnmpClient::from_config(discovery);
        let subnet_prefix = discovery
            .subnet_prefix
            .clone()
            .or_else(network::local_subnet_prefix);
        Ok(Self::with_sources(discovery.clone(), config.network_id.clone(), snmp, ipp).subnet_prefix(subnet_prefix))
    }
}

impl<S, A> Discovery<S, A>
where
    S: SysDescrSource + Clone,
    A: AttributeSource + Clone,
{
    pub fn with_sources(
        config: DiscoveryConfig,
        network_id: Option<String>,
        snmp: S,
        ipp: A,
    ) -> Self {
        Self {
            config,
            network_id,
            subnet_prefix: None,
            passive: true,
            snmp,
            ipp,
        }
    }

    /// Subnet to probe; `None` disables the active probe.
    pub fn subnet_prefix(mut self, prefix: Option<String>) -> Self {
        self.subnet_prefix = prefix;
        self
    }

    /// Whether to run the mDNS listener.
    pub fn passive(mut self, enabled: bool) -> Self {
        self.passive = enabled;
        self
    }

    /// Start both producers.  Must be called within a Tokio runtime.
    ///
    /// A failure to start mDNS is logged and the session continues with the
    /// active probe alone.
    pub fn start(&self) -> DiscoverySession {
        let cancel = CancellationToken::new();
        let capacity = self.config.channel_capacity.max(1);
        let (found_tx, found_rx) = mpsc::channel(capacity);
        let (out_tx, out_rx) = mpsc::channel(capacity);

        match &self.subnet_prefix {
            Some(prefix) => {
                let probe = Arc::new(SubnetProbe::new(
                    self.config.clone(),
                    self.network_id.clone(),
                    self.snmp.clone(),
                    self.ipp.clone(),
                ));
                tokio::spawn(probe.run(prefix.clone(), found_tx.clone(), cancel.clone()));
            }
            None => error!("could not determine local subnet, active probe skipped"),
        }

        let listener = if self.passive {
            MdnsListener::start(found_tx.clone())
                .inspect_err(|e| warn!(error = %e, "mDNS discovery unavailable"))
                .ok()
        } else {
            None
        };
        drop(found_tx);

        let table = Arc::new(MergeTable::new());
        tokio::spawn(forward_merged(found_rx, out_tx, Arc::clone(&table), cancel.clone()));

        info!(active = self.subnet_prefix.is_some(), passive = listener.is_some(), "discovery started");
        DiscoverySession {
            stream: ReceiverStream::new(out_rx),
            table,
            cancel,
            listener,
        }
    }
}

/// Fold producer output into `table` and forward records that changed.
async fn forward_merged(
    mut found: mpsc::Receiver<PrinterRecord>,
    out: mpsc::Sender<PrinterRecord>,
    table: Arc<MergeTable>,
    cancel: CancellationToken,
) {
    loop {
        let record = tokio::select! {
            _ = cancel.cancelled() => break,
            next = found.recv() => match next {
                Some(record) => record,
                None => break,
            },
        };
        let Some(merged) = table.offer(record) else {
            continue;
        };
        let sent = tokio::select! {
            _ = cancel.cancelled() => break,
            sent = out.send(merged) => sent,
        };
        if sent.is_err() {
            break;
        }
    }
    debug!("discovery merge task finished");
}

/// A running discovery.  Yields the merged record for a host whenever it
/// changes.
pub struct DiscoverySession {
    stream: ReceiverStream<PrinterRecord>,
    table: Arc<MergeTable>,
    cancel: CancellationToken,
    listener: Option<MdnsListener>,
}

impl DiscoverySession {
    /// Current de-duplicated results, one per host.
    pub fn printers(&self) -> Arc<Vec<PrinterRecord>> {
        self.table.snapshot()
    }

    /// Stop both producers.  The stream ends once buffered records are read.
    pub fn stop(&mut self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            self.listener.take();
            info!("discovery stopped");
        }
    }
}

impl Stream for DiscoverySession {
    type Item = PrinterRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}

impl Drop for DiscoverySession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freeprint_core::{FreeprintError, PropertyMap, Transport};
    use futures::StreamExt;
    use tokio::net::TcpListener;

    #[derive(Clone)]
    struct NoSnmp;

    impl SysDescrSource for NoSnmp {
        async fn sys_descr(&self, _host: &str) -> Option<String> {
            None
        }
    }

    #[derive(Clone)]
    struct NoIpp;

    impl AttributeSource for NoIpp {
        async fn printer_attributes(&self, printer_uri: &str) -> Result<PropertyMap> {
            Err(FreeprintError::IppRequest(printer_uri.to_string()))
        }
    }

    fn discovery(raw_port: u16, ipp_port: u16) -> Discovery<NoSnmp, NoIpp> {
        let config = DiscoveryConfig {
            raw_port,
            ipp_port,
            connect_timeout_ms: 300,
            ..DiscoveryConfig::default()
        };
        Discovery::with_sources(config, None, NoSnmp, NoIpp)
            .subnet_prefix(Some("127.0.0".into()))
            .passive(false)
    }

    #[tokio::test]
    async fn probe_results_reach_the_stream_once_per_host() {
        let raw = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let raw_port = raw.local_addr().unwrap().port();
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ipp_port = closed.local_addr().unwrap().port();
        drop(closed);

        let session = discovery(raw_port, ipp_port).start();
        let found: Vec<PrinterRecord> = session.collect().await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].host_address, "127.0.0.1");
        assert_eq!(found[0].transport, Transport::RawSocket);
    }

    #[tokio::test]
    async fn stop_ends_the_stream() {
        let raw = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let raw_port = raw.local_addr().unwrap().port();

        let mut session = discovery(raw_port, raw_port).start();
        session.stop();
        // Whatever was already buffered may still arrive; the stream must end.
        while session.next().await.is_some() {}
        assert!(session.printers().len() <= 1);
    }

    #[tokio::test]
    async fn no_subnet_and_no_mdns_yields_empty_stream() {
        let session = discovery(9, 9).subnet_prefix(None).start();
        let found: Vec<PrinterRecord> = session.collect().await;
        assert!(found.is_empty());
    }
}
