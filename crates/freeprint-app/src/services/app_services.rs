// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: opens every store from the data directory and
// runs the background tasks (queue worker, reachability monitor).
//
// The stores are snapshot based, so they are shared as plain `Arc`s: every
// reader sees a complete list and every writer swaps in a new one.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use freeprint_core::error::{FreeprintError, Result};
use freeprint_core::{AppConfig, DriverId, DriverRecord, JobId, PpdOption, PrinterRecord, SelectedOptions};
use freeprint_driver::DriverLibrary;
use freeprint_print::{Discovery, JobQueue, JobStore, PrinterStore, StatusMonitor};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";

/// Everything the command-line host works with.
pub struct AppServices {
    data_dir: PathBuf,
    config: AppConfig,
    printers: Arc<PrinterStore>,
    drivers: Arc<DriverLibrary>,
    queue: Arc<JobQueue>,
}

impl AppServices {
    /// Open every store under `data_dir`.  Interrupted jobs are requeued.
    pub fn init(data_dir: &Path) -> Result<Self> {
        info!(path = %data_dir.display(), "initialising app services");

        let config = load_config(data_dir);
        let printers = Arc::new(PrinterStore::open(data_dir));
        let drivers = Arc::new(DriverLibrary::open(data_dir)?);
        let jobs = Arc::new(JobStore::open(data_dir));
        let queue = Arc::new(JobQueue::new(
            jobs,
            Arc::clone(&printers),
            Arc::clone(&drivers),
            config.queue.clone(),
        ));

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            printers,
            drivers,
            queue,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn save_config(&mut self, config: AppConfig) -> Result<()> {
        persist_config(&self.data_dir, &config)?;
        self.config = config;
        Ok(())
    }

    // -- Discovery -----------------------------------------------------------

    /// Run discovery for `duration`, calling `on_found` for every update.
    /// Returns the de-duplicated results.
    pub async fn discover<F>(&self, duration: Duration, mut on_found: F) -> Result<Vec<PrinterRecord>>
    where
        F: FnMut(&PrinterRecord),
    {
        let mut session = Discovery::new(&self.config)?.start();
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                next = session.next() => match next {
                    Some(printer) => on_found(&printer),
                    None => break,
                },
            }
        }
        session.stop();
        Ok(session.printers().to_vec())
    }

    /// Save a discovered printer.  A driver already assigned to the host is
    /// kept when the new record carries none.
    pub fn save_printer(&self, mut printer: PrinterRecord) -> PrinterRecord {
        if printer.driver_ref.is_none()
            && let Some(saved) = self.printers.find(&printer.host_address)
        {
            printer.driver_ref = saved.driver_ref;
        }
        self.printers.upsert(printer)
    }

    pub fn printers(&self) -> Arc<Vec<PrinterRecord>> {
        self.printers.printers()
    }

    pub fn forget_printer(&self, host: &str) -> Result<()> {
        if self.printers.remove(host) {
            Ok(())
        } else {
            Err(FreeprintError::PrinterNotFound(host.to_string()))
        }
    }

    // -- Drivers -------------------------------------------------------------

    /// Import one driver file, or every driver below a directory.  Returns
    /// how many were imported.
    pub fn import_drivers(&self, path: &Path) -> Result<usize> {
        if path.is_dir() {
            self.drivers.import_directory(path)
        } else {
            self.drivers.import_path(path).map(|_| 1)
        }
    }

    pub fn drivers(&self) -> Arc<Vec<DriverRecord>> {
        self.drivers.drivers()
    }

    pub fn remove_driver(&self, id: DriverId) -> Result<()> {
        self.drivers.remove(id)
    }

    pub fn remove_all_drivers(&self) -> Result<usize> {
        self.drivers.remove_all()
    }

    pub fn remove_unused_drivers(&self) -> usize {
        self.drivers.remove_unused(&self.printers.printers())
    }

    /// Point a saved printer at an imported driver.
    pub fn assign_driver(&self, host: &str, id: DriverId) -> Result<()> {
        if self.drivers.get(id).is_none() {
            return Err(FreeprintError::DriverNotFound(id.to_string()));
        }
        self.printers.assign_driver(host, Some(id))
    }

    pub fn driver_options(&self, id: DriverId) -> Result<Vec<PpdOption>> {
        self.drivers.options(id)
    }

    // -- Jobs ----------------------------------------------------------------

    pub fn enqueue(&self, file: &Path, host: &str, options: SelectedOptions) -> Result<JobId> {
        let printer = self
            .printers
            .find(host)
            .ok_or_else(|| FreeprintError::PrinterNotFound(host.to_string()))?;
        if !file.is_file() {
            return Err(FreeprintError::DocumentMissing(file.display().to_string()));
        }
        let file = std::path::absolute(file)?;
        self.queue.enqueue(&file, &printer, options)
    }

    pub fn jobs(&self) -> &JobStore {
        self.queue.jobs()
    }

    pub fn clear_history(&self) -> usize {
        self.queue.jobs().clear_finished()
    }

    // -- Runtime -------------------------------------------------------------

    /// Run the queue worker and reachability monitor until `shutdown`
    /// resolves.  A job being printed is allowed to finish.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let cancel = CancellationToken::new();
        let monitor = Arc::new(StatusMonitor::new(
            Arc::clone(&self.printers),
            self.config.status.clone(),
            self.config.network_id.clone(),
        ));

        let worker = tokio::spawn(Arc::clone(&self.queue).run(cancel.clone()));
        let status = tokio::spawn(monitor.run(cancel.clone()));
        info!("print services running");

        shutdown.await;
        info!("shutting down");
        cancel.cancel();

        for task in [worker, status] {
            if let Err(e) = task.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
    }
}

/// Load `config.json`, falling back to defaults.  A missing file is written
/// out so the defaults can be edited.
fn load_config(data_dir: &Path) -> AppConfig {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        let config = AppConfig::default();
        if let Err(e) = persist_config(data_dir, &config) {
            warn!(error = %e, "could not write default config");
        }
        return config;
    }
    match std::fs::read_to_string(&path)
        .map_err(FreeprintError::from)
        .and_then(|data| Ok(serde_json::from_str::<AppConfig>(&data)?))
    {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            AppConfig::default()
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
