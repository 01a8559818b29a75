// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SNMPv2c sysDescr lookup, used as a naming hint during subnet probing.

use std::future::Future;
use std::time::Duration;

use freeprint_core::config::DiscoveryConfig;
use freeprint_core::error::{FreeprintError, Result};
use snmp2::{Oid, SyncSession, Value};
use tracing::{debug, trace};

/// SNMPv2-MIB::sysDescr.0
pub const OID_SYS_DESCR: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 1, 0];

pub const SNMP_PORT: u16 = 161;

/// Anything that can name a host by its system description.
pub trait SysDescrSource: Send + Sync + 'static {
    /// `None` when the host does not answer or has no description.
    fn sys_descr(&self, host: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Blocking `snmp2` session run on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SnmpClient {
    community: Vec<u8>,
    timeout: Duration,
    retries: u32,
}

impl SnmpClient {
    pub fn new(community: &str, timeout: Duration, retries: u32) -> Self {
        Self {
            community: community.as_bytes().to_vec(),
            timeout,
            retries,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(&config.snmp_community, config.snmp_timeout(), config.snmp_retries)
    }
}

impl SysDescrSource for SnmpClient {
    async fn sys_descr(&self, host: &str) -> Option<String> {
        let target = format!("{host}:{SNMP_PORT}");
        let client = self.clone();

        let result = tokio::task::spawn_blocking(move || {
            let mut last_err = None;
            for attempt in 0..=client.retries {
                match get_sys_descr(&target, &client.community, client.timeout) {
                    Ok(descr) => return Ok(descr),
                    Err(e) => {
                        trace!(%target, attempt, error = %e, "SNMP attempt failed");
                        last_err = Some(e);
                    }
                }
            }
            Err(last_err.unwrap_or_else(|| FreeprintError::Snmp("no attempts made".into())))
        })
        .await;

        match result {
            Ok(Ok(descr)) => descr,
            Ok(Err(e)) => {
                debug!(host, error = %e, "no SNMP answer");
                None
            }
            Err(e) => {
                debug!(host, error = %e, "SNMP task failed");
                None
            }
        }
    }
}

fn get_sys_descr(target: &str, community: &[u8], timeout: Duration) -> Result<Option<String>> {
    let mut session = SyncSession::new_v2c(target, community, Some(timeout), 0)
        .map_err(|e| FreeprintError::Snmp(format!("{target}: {e}")))?;
    let oid = Oid::from(OID_SYS_DESCR)
        .map_err(|e| FreeprintError::Snmp(format!("bad OID: {e:?}")))?;
    let response = session
        .get(&oid)
        .map_err(|e| FreeprintError::Snmp(format!("{target}: {e:?}")))?;

    let descr = match response.varbinds.into_iter().next() {
        Some((_, Value::OctetString(bytes))) => {
            let text = String::from_utf8_lossy(bytes).trim().to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    };
    Ok(descr)
}
