// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Saved printers, keyed by host address.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use freeprint_core::error::{FreeprintError, Result};
use freeprint_core::{DriverId, PrinterRecord, SnapshotStore};
use tracing::{debug, info, instrument};

pub const PRINTERS_FILE: &str = "saved_printers.json";

/// The user's saved printers, persisted to `saved_printers.json`.
#[derive(Debug, Default)]
pub struct PrinterStore {
    store: SnapshotStore<PrinterRecord>,
}

impl PrinterStore {
    pub fn open(data_dir: &Path) -> Self {
        let store = SnapshotStore::open(data_dir.join(PRINTERS_FILE));
        debug!(count = store.len(), "saved printers loaded");
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn printers(&self) -> Arc<Vec<PrinterRecord>> {
        self.store.snapshot()
    }

    pub fn find(&self, host: &str) -> Option<PrinterRecord> {
        self.store
            .snapshot()
            .iter()
            .find(|p| p.host_address == host)
            .cloned()
    }

    /// Insert `record`, or fold it into the saved printer with the same host.
    ///
    /// On update the new name, port, transport and driver reference win; the
    /// old network id survives when the new record has none; properties are
    /// combined with the new values winning.
    #[instrument(skip(self, record), fields(host = %record.host_address))]
    pub fn upsert(&self, record: PrinterRecord) -> PrinterRecord {
        let saved = self.store.update(|printers| {
            let mut next = printers.to_vec();
            match next.iter_mut().find(|p| p.host_address == record.host_address) {
                Some(existing) => *existing = combine(existing, &record),
                None => next.push(record.clone()),
            }
            next
        });
        info!(name = %record.name, "printer saved");
        saved
            .iter()
            .find(|p| p.host_address == record.host_address)
            .cloned()
            .unwrap_or(record)
    }

    /// Forget a printer.  Returns whether it was saved.
    pub fn remove(&self, host: &str) -> bool {
        let before = self.store.len();
        let after = self
            .store
            .update(|printers| printers.iter().filter(|p| p.host_address != host).cloned().collect());
        before != after.len()
    }

    /// Point a saved printer at a driver, or clear its driver.
    pub fn assign_driver(&self, host: &str, driver: Option<DriverId>) -> Result<()> {
        if self.find(host).is_none() {
            return Err(FreeprintError::PrinterNotFound(host.to_string()));
        }
        self.store.update(|printers| {
            printers
                .iter()
                .map(|p| {
                    let mut p = p.clone();
                    if p.host_address == host {
                        p.driver_ref = driver;
                    }
                    p
                })
                .collect()
        });
        Ok(())
    }

    /// Record reachability results.  Nothing is written to disk.
    pub fn set_online(&self, statuses: &HashMap<String, bool>) {
        self.store.update_transient(|printers| {
            printers
                .iter()
                .map(|p| {
                    let mut p = p.clone();
                    if let Some(&online) = statuses.get(&p.host_address) {
                        p.online = online;
                    }
                    p
                })
                .collect()
        });
    }
}

fn combine(existing: &PrinterRecord, update: &PrinterRecord) -> PrinterRecord {
    let mut properties = existing.properties.clone();
    properties.extend(update.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    PrinterRecord {
        name: update.name.clone(),
        host_address: update.host_address.clone(),
        port: update.port,
        transport: update.transport,
        properties,
        network_id: update.network_id.clone().or_else(|| existing.network_id.clone()),
        driver_ref: update.driver_ref,
        online: existing.online,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freeprint_core::Transport;

    fn printer(name: &str) -> PrinterRecord {
        PrinterRecord::new(name, "10.0.0.5", 9100, Transport::RawSocket)
    }

    #[test]
    fn upsert_keeps_one_record_per_host() {
        let store = PrinterStore::in_memory();
        let mut first = printer("Old");
        first.network_id = Some("office".into());
        first.properties.insert("a".into(), "1".into());
        first.properties.insert("b".into(), "1".into());
        store.upsert(first);

        let mut second = printer("New");
        second.properties.insert("b".into(), "2".into());
        let saved = store.upsert(second);

        assert_eq!(store.printers().len(), 1);
        assert_eq!(saved.name, "New");
        assert_eq!(saved.network_id.as_deref(), Some("office"));
        assert_eq!(saved.properties["a"], "1");
        assert_eq!(saved.properties["b"], "2");
    }

    #[test]
    fn driver_assignment_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrinterStore::open(dir.path());
        store.upsert(printer("Acme"));

        let driver = DriverId::new();
        store.assign_driver("10.0.0.5", Some(driver)).unwrap();
        assert!(matches!(
            store.assign_driver("10.9.9.9", Some(driver)),
            Err(FreeprintError::PrinterNotFound(_))
        ));

        let reopened = PrinterStore::open(dir.path());
        assert_eq!(reopened.find("10.0.0.5").unwrap().driver_ref, Some(driver));
    }

    #[test]
    fn online_flag_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrinterStore::open(dir.path());
        store.upsert(printer("Acme"));

        store.set_online(&HashMap::from([("10.0.0.5".to_string(), true)]));
        assert!(store.find("10.0.0.5").unwrap().online);

        let reopened = PrinterStore::open(dir.path());
        assert!(!reopened.find("10.0.0.5").unwrap().online);
    }

    #[test]
    fn remove_reports_whether_anything_went() {
        let store = PrinterStore::in_memory();
        store.upsert(printer("Acme"));
        assert!(store.remove("10.0.0.5"));
        assert!(!store.remove("10.0.0.5"));
        assert!(store.printers().is_empty());
    }
}
