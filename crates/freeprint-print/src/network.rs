// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local network helpers shared by the probe and the reachability monitor.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Whether a TCP connection to `host:port` succeeds within `timeout`.
pub async fn is_port_open(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// The /24 prefix (`"a.b.c"`) of this host's primary IPv4 address.
pub fn local_subnet_prefix() -> Option<String> {
    match local_ip_address::local_ip() {
        Ok(IpAddr::V4(ip)) => {
            let prefix = subnet_prefix(ip);
            debug!(%ip, %prefix, "local subnet detected");
            Some(prefix)
        }
        Ok(IpAddr::V6(ip)) => {
            warn!(%ip, "primary address is IPv6, no subnet to probe");
            None
        }
        Err(e) => {
            warn!(error = %e, "could not determine local address");
            None
        }
    }
}

pub fn subnet_prefix(ip: Ipv4Addr) -> String {
    let [a, b, c, _] = ip.octets();
    format!("{a}.{b}.{c}")
}

/// Every host address of a /24: `.1` through `.254`.
pub fn subnet_hosts(prefix: &str) -> impl Iterator<Item = String> + '_ {
    (1..=254u8).map(move |i| format!("{prefix}.{i}"))
}
