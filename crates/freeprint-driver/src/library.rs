// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Library of imported PPD driver files.
//
// Imported files are copied into `<data dir>/drivers/` and tracked in
// `saved_drivers.json`.  Printers refer to drivers by `DriverId`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use freeprint_core::error::Result;
use freeprint_core::{DriverId, DriverRecord, FreeprintError, PpdOption, PrinterRecord, SnapshotStore};
use tracing::{debug, info, instrument, warn};

use crate::ppd;

pub const DRIVERS_FILE: &str = "saved_drivers.json";
pub const DRIVERS_DIR: &str = "drivers";

/// Bytes read from a candidate file before deciding whether it is a PPD.
const SNIFF_LEN: usize = 512;

/// Imported drivers and their on-disk copies.
#[derive(Debug)]
pub struct DriverLibrary {
    dir: PathBuf,
    store: SnapshotStore<DriverRecord>,
}

impl DriverLibrary {
    /// Open the library kept under `data_dir`, creating the driver directory
    /// if needed.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join(DRIVERS_DIR);
        std::fs::create_dir_all(&dir)?;
        let store = SnapshotStore::open(data_dir.join(DRIVERS_FILE));
        debug!(count = store.len(), dir = %dir.display(), "driver library opened");
        Ok(Self { dir, store })
    }

    pub fn drivers(&self) -> Arc<Vec<DriverRecord>> {
        self.store.snapshot()
    }

    pub fn get(&self, id: DriverId) -> Option<DriverRecord> {
        self.store.snapshot().iter().find(|d| d.id == id).cloned()
    }

    fn find_by_file_name(&self, original_name: &str) -> Option<DriverRecord> {
        self.store
            .snapshot()
            .iter()
            .find(|d| d.original_file_name.eq_ignore_ascii_case(original_name))
            .cloned()
    }

    /// Import a driver from its bytes.
    ///
    /// A file already imported under the same name (ignoring case) is not
    /// copied again; the existing record is returned instead.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn import(&self, bytes: &[u8], original_name: &str) -> Result<DriverRecord> {
        let file_name = Path::new(original_name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FreeprintError::NotADriver(original_name.to_string()))?;

        if !ppd::looks_like_ppd(file_name, bytes) {
            return Err(FreeprintError::NotADriver(file_name.to_string()));
        }
        if let Some(existing) = self.find_by_file_name(file_name) {
            debug!(id = %existing.id, "driver already imported");
            return Ok(existing);
        }

        let storage_path = self.dir.join(file_name);
        std::fs::write(&storage_path, bytes)?;

        let record = DriverRecord {
            display_name: ppd::display_name(bytes).unwrap_or_else(|| file_name.to_string()),
            original_file_name: file_name.to_string(),
            storage_path: storage_path.to_string_lossy().into_owned(),
            id: DriverId::new(),
        };
        let added = record.clone();
        self.store.update(move |drivers| {
            let mut next = drivers.to_vec();
            next.push(added.clone());
            next
        });

        info!(id = %record.id, name = %record.display_name, "driver imported");
        Ok(record)
    }

    /// Import a driver file from disk.
    pub fn import_path(&self, path: &Path) -> Result<DriverRecord> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.import(&bytes, &name)
    }

    /// Walk `root` recursively and import every PPD not yet in the library.
    ///
    /// Returns how many drivers were added.  Files that cannot be read are
    /// logged and skipped.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn import_directory(&self, root: &Path) -> Result<usize> {
        let mut pending = vec![root.to_path_buf()];
        let mut imported = 0;

        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if self.find_by_file_name(name).is_some() {
                    continue;
                }
                match self.import_candidate(&path, name) {
                    Ok(true) => imported += 1,
                    Ok(false) => {}
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
                }
            }
        }

        info!(imported, "directory import finished");
        Ok(imported)
    }

    /// Import `path` if it is a PPD.  Only the head of non-`.ppd` files is
    /// read before deciding.
    fn import_candidate(&self, path: &Path, name: &str) -> Result<bool> {
        if !name.to_ascii_lowercase().ends_with(".ppd") {
            let mut head = Vec::with_capacity(SNIFF_LEN);
            std::fs::File::open(path)?
                .take(SNIFF_LEN as u64)
                .read_to_end(&mut head)?;
            if !ppd::looks_like_ppd(name, &head) {
                return Ok(false);
            }
        }
        self.import_path(path).map(|_| true)
    }

    /// Remove one driver and its stored file.
    pub fn remove(&self, id: DriverId) -> Result<()> {
        let record = self
            .get(id)
            .ok_or_else(|| FreeprintError::DriverNotFound(id.to_string()))?;
        delete_file(Path::new(&record.storage_path));
        self.store
            .update(|drivers| drivers.iter().filter(|d| d.id != id).cloned().collect());
        info!(%id, "driver removed");
        Ok(())
    }

    /// Delete every stored driver file and forget all drivers.
    pub fn remove_all(&self) -> Result<usize> {
        let removed = self.store.len();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() {
                delete_file(&path);
            }
        }
        self.store.replace(Vec::new());
        info!(removed, "all drivers removed");
        Ok(removed)
    }

    /// Remove drivers no printer refers to.  Returns how many went.
    pub fn remove_unused(&self, printers: &[PrinterRecord]) -> usize {
        let unused: Vec<DriverRecord> = self
            .store
            .snapshot()
            .iter()
            .filter(|d| !is_in_use(d.id, printers))
            .cloned()
            .collect();
        if unused.is_empty() {
            return 0;
        }

        for driver in &unused {
            delete_file(Path::new(&driver.storage_path));
        }
        self.store
            .update(|drivers| drivers.iter().filter(|d| is_in_use(d.id, printers)).cloned().collect());
        info!(removed = unused.len(), "unused drivers removed");
        unused.len()
    }

    /// Options of a driver, synthetic defaults included.
    pub fn options(&self, id: DriverId) -> Result<Vec<PpdOption>> {
        let record = self
            .get(id)
            .ok_or_else(|| FreeprintError::DriverNotFound(id.to_string()))?;
        parse_driver(Path::new(&record.storage_path))
    }
}

/// Read a stored PPD and return its options, synthetic defaults included.
pub fn parse_driver(path: &Path) -> Result<Vec<PpdOption>> {
    let bytes = std::fs::read(path)?;
    Ok(ppd::with_synthetic_options(ppd::parse(&bytes)))
}

fn is_in_use(id: DriverId, printers: &[PrinterRecord]) -> bool {
    printers.iter().any(|p| p.driver_ref == Some(id))
}

fn delete_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to delete driver file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freeprint_core::Transport;

    const PPD: &[u8] = b"*PPD-Adobe: \"4.3\"\n*NickName: \"Acme Laser\"\n\
*OpenUI *Duplex: PickOne\n*Duplex None/Off: \"<</Duplex false>>setpagedevice\"\n*CloseUI: *Duplex\n";

    fn library() -> (tempfile::TempDir, DriverLibrary) {
        let dir = tempfile::tempdir().unwrap();
        let library = DriverLibrary::open(dir.path()).unwrap();
        (dir, library)
    }

    #[test]
    fn import_copies_file_and_names_driver() {
        let (_dir, library) = library();
        let record = library.import(PPD, "acme.ppd").unwrap();

        assert_eq!(record.display_name, "Acme Laser");
        assert_eq!(record.original_file_name, "acme.ppd");
        assert_eq!(std::fs::read(&record.storage_path).unwrap(), PPD);
        assert_eq!(library.drivers().len(), 1);
    }

    #[test]
    fn non_ppd_is_rejected() {
        let (_dir, library) = library();
        let err = library.import(b"just text", "notes.txt").unwrap_err();
        assert!(matches!(err, FreeprintError::NotADriver(_)));
        assert!(library.drivers().is_empty());
    }

    #[test]
    fn magic_marker_is_enough_without_extension() {
        let (_dir, library) = library();
        let record = library.import(PPD, "acme.bin").unwrap();
        assert_eq!(record.display_name, "Acme Laser");
    }

    #[test]
    fn file_name_is_the_fallback_display_name() {
        let (_dir, library) = library();
        let record = library.import(b"*OpenUI *X: PickOne\n", "plain.PPD").unwrap();
        assert_eq!(record.display_name, "plain.PPD");
    }

    #[test]
    fn duplicate_import_returns_existing_record() {
        let (_dir, library) = library();
        let first = library.import(PPD, "acme.ppd").unwrap();
        let second = library.import(PPD, "ACME.PPD").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(library.drivers().len(), 1);
    }

    #[test]
    fn library_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = DriverLibrary::open(dir.path()).unwrap().import(PPD, "acme.ppd").unwrap().id;

        let reopened = DriverLibrary::open(dir.path()).unwrap();
        assert_eq!(reopened.get(id).unwrap().display_name, "Acme Laser");
        let options = reopened.options(id).unwrap();
        assert!(options.iter().any(|o| o.keyword == "Duplex"));
        assert_eq!(options[0].keyword, "PageSize");
    }

    #[test]
    fn directory_import_is_recursive_and_counts() {
        let (_dir, library) = library();
        let source = tempfile::tempdir().unwrap();
        std::fs::create_dir(source.path().join("vendor")).unwrap();
        std::fs::write(source.path().join("a.ppd"), PPD).unwrap();
        std::fs::write(source.path().join("vendor").join("b.drv"), PPD).unwrap();
        std::fs::write(source.path().join("readme.txt"), b"hello").unwrap();

        assert_eq!(library.import_directory(source.path()).unwrap(), 2);
        // Already imported files are not counted again.
        assert_eq!(library.import_directory(source.path()).unwrap(), 0);
        assert_eq!(library.drivers().len(), 2);
    }

    #[test]
    fn empty_directory_import_changes_nothing() {
        let (_dir, library) = library();
        let source = tempfile::tempdir().unwrap();
        assert_eq!(library.import_directory(source.path()).unwrap(), 0);
        assert!(library.drivers().is_empty());
    }

    #[test]
    fn remove_deletes_file_and_record() {
        let (_dir, library) = library();
        let record = library.import(PPD, "acme.ppd").unwrap();
        library.remove(record.id).unwrap();

        assert!(library.drivers().is_empty());
        assert!(!Path::new(&record.storage_path).exists());
        assert!(matches!(library.remove(record.id), Err(FreeprintError::DriverNotFound(_))));
    }

    #[test]
    fn remove_all_empties_driver_dir() {
        let (dir, library) = library();
        library.import(PPD, "a.ppd").unwrap();
        library.import(PPD, "b.ppd").unwrap();

        assert_eq!(library.remove_all().unwrap(), 2);
        assert!(library.drivers().is_empty());
        assert_eq!(std::fs::read_dir(dir.path().join(DRIVERS_DIR)).unwrap().count(), 0);
    }

    #[test]
    fn remove_unused_keeps_assigned_drivers() {
        let (_dir, library) = library();
        let used = library.import(PPD, "used.ppd").unwrap();
        let unused = library.import(PPD, "unused.ppd").unwrap();

        let mut printer = PrinterRecord::new("Acme", "10.0.0.5", 9100, Transport::RawSocket);
        printer.driver_ref = Some(used.id);

        assert_eq!(library.remove_unused(&[printer]), 1);
        assert!(library.get(used.id).is_some());
        assert!(library.get(unused.id).is_none());
        assert!(!Path::new(&unused.storage_path).exists());
    }
}
