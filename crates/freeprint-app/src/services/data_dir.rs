// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::PathBuf;

/// Return the application data directory, creating it if needed.
///
/// `$FREEPRINT_DATA_DIR` wins, then `$XDG_DATA_HOME/freeprint`, then
/// `$HOME/.local/share/freeprint`.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = resolve(
        std::env::var_os("FREEPRINT_DATA_DIR").map(PathBuf::from),
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    );
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn resolve(explicit: Option<PathBuf>, xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit.filter(|d| !d.as_os_str().is_empty()) {
        return dir;
    }
    if let Some(xdg) = xdg_data_home.filter(|d| !d.as_os_str().is_empty()) {
        return xdg.join("freeprint");
    }
    // Last resort
    home.unwrap_or_else(std::env::temp_dir)
        .join(".local")
        .join("share")
        .join("freeprint")
}
