// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FreePrint Print — network side of the system: subnet and mDNS printer
// discovery, the IPP Get-Printer-Attributes client, saved printers, and the
// persistent job queue that pushes generated streams to port 9100.

pub mod discovery;
pub mod ipp;
pub mod ipp_client;
pub mod network;
pub mod printers;
pub mod queue;
pub mod raw_client;
pub mod snmp;
pub mod status;

pub use discovery::{Discovery, DiscoverySession};
pub use ipp_client::IppClient;
pub use printers::PrinterStore;
pub use queue::{JobQueue, JobStore};
pub use snmp::SnmpClient;
pub use status::StatusMonitor;
