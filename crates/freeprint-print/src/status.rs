// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Periodic reachability check for saved printers.

use std::collections::HashMap;
use std::sync::Arc;

use freeprint_core::config::StatusConfig;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::network::is_port_open;
use crate::printers::PrinterStore;

/// Marks saved printers online or offline.
///
/// A printer is online only when it was saved on the current network and
/// its port accepts a TCP connection.
pub struct StatusMonitor {
    printers: Arc<PrinterStore>,
    config: StatusConfig,
    network_id: Option<String>,
}

impl StatusMonitor {
    pub fn new(printers: Arc<PrinterStore>, config: StatusConfig, network_id: Option<String>) -> Self {
        Self {
            printers,
            config,
            network_id,
        }
    }

    /// Check every saved printer once and record the results.
    pub async fn check_all(&self) -> HashMap<String, bool> {
        let printers = self.printers.printers();
        let checks = printers.iter().map(|printer| async move {
            let online = printer.network_id == self.network_id
                && is_port_open(&printer.host_address, printer.port, self.config.connect_timeout()).await;
            (printer.host_address.clone(), online)
        });
        let statuses: HashMap<String, bool> = join_all(checks).await.into_iter().collect();

        self.printers.set_online(&statuses);
        debug!(
            online = statuses.values().filter(|&&o| o).count(),
            total = statuses.len(),
            "printer status refreshed"
        );
        statuses
    }

    /// Re-check on a fixed interval until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(interval_ms = self.config.poll_interval_ms, "status monitor started");
        loop {
            self.check_all().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
        info!("status monitor stopped");
    }
}
