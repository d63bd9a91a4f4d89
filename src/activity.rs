//! Append-only activity log: one timestamped human-readable line per
//! significant event (login, skip, mirror, failure). The file is never
//! rotated or pruned here. Lines also go to the tracing subscriber so the
//! console shows the same story.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Appends one line. A failed write must never take the mirror loop down,
    /// so IO errors are swallowed after a console warning.
    pub fn line(&self, msg: &str) {
        info!("{msg}");
        let stamped = format!("[{}] {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
        let res = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(stamped.as_bytes()));
        if let Err(e) = res {
            tracing::warn!("activity log write failed: {e}");
        }
    }
}
