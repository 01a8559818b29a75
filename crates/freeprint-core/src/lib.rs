// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FreePrint — Core types, error definitions, configuration and the snapshot
// store shared across all crates.

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use error::FreeprintError;
pub use store::SnapshotStore;
pub use types::*;
