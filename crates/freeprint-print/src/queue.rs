// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent print job queue and its sequential worker.
//
// Jobs live in `print_jobs.json`.  A single worker wakes on a fixed interval,
// takes the first queued job, and runs it to completion before looking
// again: jobs never execute concurrently and only the worker moves a job
// out of `Queued`.

use std::path::Path;
use std::sync::Arc;

use freeprint_core::config::QueueConfig;
use freeprint_core::error::{FreeprintError, Result};
use freeprint_core::{
    DriverRecord, JobId, JobStatus, PrintJob, PrinterRecord, SelectedOptions, SnapshotStore,
};
use freeprint_driver::{DriverLibrary, parse_driver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::printers::PrinterStore;
use crate::raw_client::send_raw;

pub const JOBS_FILE: &str = "print_jobs.json";

/// Job history, persisted after every change.
#[derive(Debug, Default)]
pub struct JobStore {
    store: SnapshotStore<PrintJob>,
}

impl JobStore {
    /// Load the job list, returning any job left `Printing` by a previous
    /// run to `Queued`.
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join(JOBS_FILE);
        let jobs = SnapshotStore::<PrintJob>::read_file(&path).unwrap_or_else(|e| {
            error!(path = %path.display(), error = %e, "failed to load jobs, starting empty");
            Vec::new()
        });
        let (jobs, recovered) = recover(jobs);
        let store = SnapshotStore::from_items(jobs, Some(path));
        if recovered > 0 {
            warn!(recovered, "interrupted jobs returned to the queue");
            store.update(<[PrintJob]>::to_vec);
        }
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Arc<Vec<PrintJob>> {
        self.store.snapshot()
    }

    pub fn get(&self, id: JobId) -> Option<PrintJob> {
        self.store.snapshot().iter().find(|j| j.id == id).cloned()
    }

    pub fn add(&self, job: PrintJob) {
        self.store.update(|jobs| {
            let mut next = jobs.to_vec();
            next.push(job.clone());
            next
        });
    }

    /// First queued job in list order.
    pub fn next_queued(&self) -> Option<PrintJob> {
        self.store
            .snapshot()
            .iter()
            .find(|j| j.status == JobStatus::Queued)
            .cloned()
    }

    /// Move a job along its state machine.
    pub fn set_status(&self, id: JobId, status: JobStatus) -> Result<()> {
        let current = self
            .get(id)
            .ok_or_else(|| FreeprintError::Store(format!("job {id} not found")))?;
        if !current.status.can_transition_to(status) {
            return Err(FreeprintError::Store(format!(
                "job {id}: {:?} -> {status:?} not allowed",
                current.status
            )));
        }
        self.store.update(|jobs| {
            jobs.iter()
                .map(|j| {
                    let mut j = j.clone();
                    if j.id == id {
                        j.status = status;
                    }
                    j
                })
                .collect()
        });
        Ok(())
    }

    /// Drop completed and failed jobs.  Returns how many went.
    pub fn clear_finished(&self) -> usize {
        let before = self.store.len();
        let after = self
            .store
            .update(|jobs| jobs.iter().filter(|j| !j.status.is_terminal()).cloned().collect());
        before - after.len()
    }
}

/// Return every `Printing` job to `Queued`.  No other job is touched.
fn recover(mut jobs: Vec<PrintJob>) -> (Vec<PrintJob>, usize) {
    let mut recovered = 0;
    for job in jobs.iter_mut().filter(|j| j.status == JobStatus::Printing) {
        job.status = JobStatus::Queued;
        recovered += 1;
    }
    (jobs, recovered)
}

/// Queue front end plus the worker that executes jobs.
pub struct JobQueue {
    jobs: Arc<JobStore>,
    printers: Arc<PrinterStore>,
    drivers: Arc<DriverLibrary>,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(
        jobs: Arc<JobStore>,
        printers: Arc<PrinterStore>,
        drivers: Arc<DriverLibrary>,
        config: QueueConfig,
    ) -> Self {
        Self {
            jobs,
            printers,
            drivers,
            config,
        }
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    /// Queue `file_path` for `printer`.  The printer must have a driver.
    #[instrument(skip(self, printer, options), fields(host = %printer.host_address))]
    pub fn enqueue(&self, file_path: &Path, printer: &PrinterRecord, options: SelectedOptions) -> Result<JobId> {
        if printer.driver_ref.is_none() {
            return Err(FreeprintError::NoDriverAssigned(printer.host_address.clone()));
        }
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.to_string_lossy().into_owned());

        let job = PrintJob::new(file_path.to_string_lossy(), file_name, printer, options);
        let id = job.id;
        self.jobs.add(job);
        info!(job_id = %id, "job queued");
        Ok(id)
    }

    /// Poll for queued jobs until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(interval_ms = self.config.poll_interval_ms, "queue worker started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
            // A job in flight is never interrupted by cancellation.
            self.process_next().await;
        }
        info!("queue worker stopped");
    }

    /// Run the first queued job, if any.  Returns its id and final status.
    pub async fn process_next(&self) -> Option<(JobId, JobStatus)> {
        let job = self.jobs.next_queued()?;
        if let Err(e) = self.jobs.set_status(job.id, JobStatus::Printing) {
            error!(job_id = %job.id, error = %e, "could not start job");
            return None;
        }
        info!(job_id = %job.id, file = %job.file_name, "printing");

        let status = match self.execute(&job).await {
            Ok(()) => JobStatus::Completed,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "job failed");
                JobStatus::Failed
            }
        };
        if let Err(e) = self.jobs.set_status(job.id, status) {
            error!(job_id = %job.id, error = %e, "could not finish job");
        }
        info!(job_id = %job.id, ?status, "job finished");
        Some((job.id, status))
    }

    async fn execute(&self, job: &PrintJob) -> Result<()> {
        let printer = self
            .printers
            .find(&job.printer_host_address)
            .ok_or_else(|| FreeprintError::PrinterNotFound(job.printer_host_address.clone()))?;
        if !Path::new(&job.file_path).is_file() {
            return Err(FreeprintError::DocumentMissing(job.file_path.clone()));
        }
        let driver_id = printer
            .driver_ref
            .ok_or_else(|| FreeprintError::NoDriverAssigned(printer.host_address.clone()))?;
        let driver = self
            .drivers
            .get(driver_id)
            .ok_or_else(|| FreeprintError::DriverNotFound(driver_id.to_string()))?;

        if self.generate_and_send(job, &printer, &driver).await {
            Ok(())
        } else {
            Err(FreeprintError::RawSend(format!("job {} not delivered", job.id)))
        }
    }

    /// Build the print stream for `job` and push it to the printer's raw
    /// port.  Returns whether every byte was written.
    #[instrument(skip_all, fields(job_id = %job.id, host = %printer.host_address))]
    pub async fn generate_and_send(&self, job: &PrintJob, printer: &PrinterRecord, driver: &DriverRecord) -> bool {
        let options = match parse_driver(Path::new(&driver.storage_path)) {
            Ok(options) => options,
            Err(e) => {
                warn!(driver = %driver.display_name, error = %e, "driver unreadable");
                return false;
            }
        };
        let document = match tokio::fs::read(&job.file_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %job.file_path, error = %e, "document unreadable");
                return false;
            }
        };

        let stream = freeprint_driver::generate(
            &options,
            &job.selected_options,
            &job.file_name,
            &self.config.page_language,
            &document,
        );
        debug!(bytes = stream.len(), "sending print stream");

        match send_raw(&printer.host_address, self.config.raw_port, &stream, self.config.write_timeout()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "print stream not delivered");
                false
            }
        }
    }
}
