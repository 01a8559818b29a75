// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for FreePrint.

use thiserror::Error;

/// Top-level error type for all FreePrint operations.
#[derive(Debug, Error)]
pub enum FreeprintError {
    // -- Discovery errors --
    #[error("printer discovery failed: {0}")]
    Discovery(String),

    #[error("IPP request failed: {0}")]
    IppRequest(String),

    #[error("SNMP query failed: {0}")]
    Snmp(String),

    // -- Driver errors --
    #[error("not a PPD driver file: {0}")]
    NotADriver(String),

    #[error("driver {0} not found")]
    DriverNotFound(String),

    // -- Job errors --
    #[error("printer {0} not found")]
    PrinterNotFound(String),

    #[error("printer {0} has no driver assigned")]
    NoDriverAssigned(String),

    #[error("document not found: {0}")]
    DocumentMissing(String),

    #[error("raw print transmission failed: {0}")]
    RawSend(String),

    // -- Storage / persistence --
    #[error("store error: {0}")]
    Store(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FreeprintError>;
