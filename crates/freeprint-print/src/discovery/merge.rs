// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-host merging of discovery results.

use std::sync::Arc;

use freeprint_core::{PrinterRecord, SnapshotStore, Transport, is_generic_name};

/// Combine two records describing the same host.
///
/// The incoming record is primary if it is IPP, otherwise the existing one
/// is.  The primary supplies transport and port and wins property
/// collisions; the secondary fills in a missing network id.  A generic
/// `"Printer @ <host>"` name never replaces a descriptive one.
pub fn merge(existing: &PrinterRecord, incoming: &PrinterRecord) -> PrinterRecord {
    let (primary, secondary) = if incoming.transport == Transport::Ipp {
        (incoming, existing)
    } else {
        (existing, incoming)
    };

    let name = if is_more_descriptive(&primary.name, &secondary.name) {
        &primary.name
    } else {
        &secondary.name
    };

    let mut properties = secondary.properties.clone();
    properties.extend(primary.properties.iter().map(|(k, v)| (k.clone(), v.clone())));

    PrinterRecord {
        name: name.clone(),
        host_address: primary.host_address.clone(),
        port: primary.port,
        transport: primary.transport,
        properties,
        network_id: primary.network_id.clone().or_else(|| secondary.network_id.clone()),
        driver_ref: primary.driver_ref.or(secondary.driver_ref),
        online: primary.online,
    }
}

/// Whether `candidate` should be kept over `current`.
fn is_more_descriptive(candidate: &str, current: &str) -> bool {
    !is_generic_name(candidate) || is_generic_name(current)
}

/// Running set of merged discovery results, one per host.
#[derive(Debug, Default)]
pub struct MergeTable {
    printers: SnapshotStore<PrinterRecord>,
}

impl MergeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `record` into the table.
    ///
    /// Returns the merged record for its host when that record changed,
    /// `None` when the table already held exactly this result.
    pub fn offer(&self, record: PrinterRecord) -> Option<PrinterRecord> {
        let current = self.printers.snapshot();
        let existing = current.iter().find(|p| p.host_address == record.host_address);
        let merged = match existing {
            Some(existing) => merge(existing, &record),
            None => record,
        };
        if existing == Some(&merged) {
            return None;
        }

        let update = merged.clone();
        self.printers.update_transient(move |printers| {
            let mut next = printers.to_vec();
            match next.iter_mut().find(|p| p.host_address == update.host_address) {
                Some(slot) => *slot = update.clone(),
                None => next.push(update.clone()),
            }
            next
        });
        Some(merged)
    }

    /// De-duplicated results so far, in first-seen order.
    pub fn snapshot(&self) -> Arc<Vec<PrinterRecord>> {
        self.printers.snapshot()
    }
}
