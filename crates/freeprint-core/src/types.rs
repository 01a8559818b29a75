// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for FreePrint.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of the placeholder name given to printers nothing better is known
/// about.
pub const GENERIC_NAME_PREFIX: &str = "Printer @ ";

/// Option keywords every usable option set carries.
pub const OPTION_PAGE_SIZE: &str = "PageSize";
pub const OPTION_ORIENTATION: &str = "Orientation";
pub const OPTION_COPIES: &str = "Copies";

/// Ordered string map used for printer properties and IPP attributes.
pub type PropertyMap = IndexMap<String, String>;

/// Option keyword → choice keyword, as picked by the user.
///
/// The key set is driver-defined; `PageSize`, `Orientation` and `Copies` are
/// the only keys the print-stream generator treats specially.
pub type SelectedOptions = IndexMap<String, String>;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an imported driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriverId(pub Uuid);

impl DriverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DriverId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DriverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DriverId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// How a printer was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transport {
    Ipp,
    RawSocket,
    Unknown,
}

/// A printer, either freshly discovered or saved by the user.
///
/// Identity is `host_address`: two records with the same host are the same
/// printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterRecord {
    pub name: String,
    pub host_address: String,
    pub port: u16,
    pub transport: Transport,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub driver_ref: Option<DriverId>,
    /// Last reachability result.  Never persisted.
    #[serde(skip)]
    pub online: bool,
}

impl PrinterRecord {
    pub fn new(name: impl Into<String>, host_address: impl Into<String>, port: u16, transport: Transport) -> Self {
        Self {
            name: name.into(),
            host_address: host_address.into(),
            port,
            transport,
            properties: PropertyMap::new(),
            network_id: None,
            driver_ref: None,
            online: false,
        }
    }

    /// Placeholder display name for a host nothing descriptive is known about.
    pub fn generic_name(host: &str) -> String {
        format!("{GENERIC_NAME_PREFIX}{host}")
    }

    pub fn has_generic_name(&self) -> bool {
        is_generic_name(&self.name)
    }
}

/// Whether `name` is a `"Printer @ <host>"` placeholder.
pub fn is_generic_name(name: &str) -> bool {
    name.starts_with(GENERIC_NAME_PREFIX)
}

/// An imported PPD driver file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRecord {
    /// `*NickName` / `*ModelName` of the driver, or the file name.
    pub display_name: String,
    pub original_file_name: String,
    /// Copy of the file inside the data directory.
    pub storage_path: String,
    #[serde(default)]
    pub id: DriverId,
}

/// One selectable value of a [`PpdOption`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpdChoice {
    pub keyword: String,
    pub display_name: String,
    /// PostScript fragment injected when this choice is selected.  Empty for
    /// synthetic choices, whose code the generator produces itself.
    pub invocation_code: String,
}

impl PpdChoice {
    pub fn new(keyword: impl Into<String>, display_name: impl Into<String>, invocation_code: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            display_name: display_name.into(),
            invocation_code: invocation_code.into(),
        }
    }
}

/// A user-selectable feature of a printer driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpdOption {
    pub keyword: String,
    pub display_name: String,
    pub default_choice: String,
    /// Lower sorts first.
    pub display_order: i32,
    pub choices: Vec<PpdChoice>,
}

impl PpdOption {
    /// Case-insensitive choice lookup.
    pub fn choice(&self, keyword: &str) -> Option<&PpdChoice> {
        self.choices
            .iter()
            .find(|c| c.keyword.eq_ignore_ascii_case(keyword))
    }
}

/// Lifecycle states of a print job.
///
/// `Queued → Printing → {Completed | Failed}`; nothing leaves a terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Waiting for the worker.
    Queued,
    /// Picked up by the worker; bytes may be on the wire.
    Printing,
    /// Stream generated and fully written.
    Completed,
    /// Printer, file or driver missing, or generation/transmission failed.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Printing)
                | (Self::Printing, Self::Completed)
                | (Self::Printing, Self::Failed)
        )
    }
}

/// A queued request to print one file on one printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    pub file_path: String,
    pub file_name: String,
    #[serde(default)]
    pub printer_name: String,
    pub printer_host_address: String,
    pub printer_port: u16,
    pub status: JobStatus,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub selected_options: SelectedOptions,
}

impl PrintJob {
    pub fn new(
        file_path: impl Into<String>,
        file_name: impl Into<String>,
        printer: &PrinterRecord,
        selected_options: SelectedOptions,
    ) -> Self {
        Self {
            id: JobId::new(),
            file_path: file_path.into(),
            file_name: file_name.into(),
            printer_name: printer.name.clone(),
            printer_host_address: printer.host_address.clone(),
            printer_port: printer.port,
            status: JobStatus::Queued,
            enqueued_at: Utc::now(),
            selected_options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_name_is_recognised() {
        let record = PrinterRecord::new(PrinterRecord::generic_name("10.0.0.5"), "10.0.0.5", 9100, Transport::RawSocket);
        assert_eq!(record.name, "Printer @ 10.0.0.5");
        assert!(record.has_generic_name());
        assert!(!is_generic_name("Acme LaserJet"));
    }

    #[test]
    fn status_transitions_follow_the_state_machine() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Printing));
        assert!(JobStatus::Printing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Printing.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Printing));
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Printing.is_terminal());
    }

    #[test]
    fn online_flag_is_not_persisted() {
        let mut record = PrinterRecord::new("Acme", "10.0.0.5", 631, Transport::Ipp);
        record.online = true;
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("online"));
        assert!(json.contains("\"IPP\""));

        let back: PrinterRecord = serde_json::from_str(&json).unwrap();
        assert!(!back.online);
        assert_eq!(back.host_address, "10.0.0.5");
    }

    #[test]
    fn choice_lookup_ignores_case() {
        let option = PpdOption {
            keyword: "Duplex".into(),
            display_name: "Duplex".into(),
            default_choice: "None".into(),
            display_order: 100,
            choices: vec![PpdChoice::new("DuplexNoTumble", "Long Edge", "<</Duplex true>>setpagedevice")],
        };
        assert!(option.choice("duplexnotumble").is_some());
        assert!(option.choice("DuplexTumble").is_none());
    }
}
