// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Persistent application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Subnet probing and mDNS listening.
    pub discovery: DiscoveryConfig,
    /// Print queue worker.
    pub queue: QueueConfig,
    /// Background reachability monitor.
    pub status: StatusConfig,
    /// Identifier of the network this host is attached to (the Wi-Fi SSID on
    /// a phone).  Attached to actively probed printers and compared by the
    /// reachability monitor.
    pub network_id: Option<String>,
}

/// Tunables for both discovery producers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// JetDirect raw port probed on every host.
    pub raw_port: u16,
    /// IPP port probed on every host.
    pub ipp_port: u16,
    /// Per-port TCP connect timeout.
    pub connect_timeout_ms: u64,
    /// Maximum number of hosts probed at once.
    pub concurrency: usize,
    /// Deadline for the Get-Printer-Attributes HTTP POST.
    pub ipp_request_timeout_ms: u64,
    pub snmp_timeout_ms: u64,
    pub snmp_retries: u32,
    pub snmp_community: String,
    /// Override for the auto-detected /24 prefix, e.g. `"192.168.1"`.
    pub subnet_prefix: Option<String>,
    /// Capacity of the channel between the producers and the consumer.
    pub channel_capacity: usize,
}

impl DiscoveryConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn ipp_request_timeout(&self) -> Duration {
        Duration::from_millis(self.ipp_request_timeout_ms)
    }

    pub fn snmp_timeout(&self) -> Duration {
        Duration::from_millis(self.snmp_timeout_ms)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            raw_port: 9100,
            ipp_port: 631,
            connect_timeout_ms: 500,
            concurrency: 50,
            ipp_request_timeout_ms: 10_000,
            snmp_timeout_ms: 1500,
            snmp_retries: 1,
            snmp_community: "public".into(),
            subnet_prefix: None,
            channel_capacity: 64,
        }
    }
}

/// Tunables for the sequential job worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Delay between two looks at the queue.
    pub poll_interval_ms: u64,
    /// Timeout for writing the whole print stream to the printer.
    pub write_timeout_ms: u64,
    /// PJL `ENTER LANGUAGE` value.
    pub page_language: String,
    /// Port the generated stream is pushed to.
    pub raw_port: u16,
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            write_timeout_ms: 60_000,
            page_language: "POSTSCRIPT".into(),
            raw_port: 9100,
        }
    }
}

/// Tunables for the reachability monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub poll_interval_ms: u64,
    pub connect_timeout_ms: u64,
}

impl StatusConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            connect_timeout_ms: 1500,
        }
    }
}
