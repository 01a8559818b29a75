// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// freeprint-driver — PostScript Printer Description handling.
//
// Parses PPD files into selectable options, keeps the library of imported
// driver files, and turns a document plus the user's option selections into
// a PJL-wrapped PostScript stream ready for a raw printer port.

mod lines;

pub mod library;
pub mod ppd;
pub mod stream;

pub use library::{DriverLibrary, parse_driver};
pub use stream::generate;
