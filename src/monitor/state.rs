//! Last-run timestamp persistence.
//!
//! The file holds a single integer: epoch seconds of the start of the last
//! completed run.

use std::path::Path;

use chrono::{TimeZone, Utc};
use tracing::{info, warn};

use crate::error::Result;
use crate::feed::writer::write_atomic;

/// Read the last-run timestamp.
///
/// A missing file means "never ran" and yields 0. An unreadable or corrupt
/// file also yields 0, with a warning, so the next search covers all mail.
pub fn load_last_run(path: &Path) -> i64 {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read timestamp file, checking all mail");
            return 0;
        }
    };

    match text.trim().parse::<i64>() {
        Ok(ts) if ts >= 0 => {
            if let Some(dt) = Utc.timestamp_opt(ts, 0).single() {
                info!("Last run timestamp: {}", dt);
            }
            ts
        }
        _ => {
            warn!(path = %path.display(), "Corrupt timestamp file, checking all mail");
            0
        }
    }
}

/// Persist the last-run timestamp atomically.
pub fn save_last_run(path: &Path, epoch: i64) -> Result<()> {
    write_atomic(path, epoch.to_string().as_bytes())?;
    info!("Saved last-run timestamp: {}", epoch);
    Ok(())
}
