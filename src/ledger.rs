//! Persisted order-mapping ledger.
//!
//! One JSON file holds every source order ever seen and its mirroring
//! outcome, plus a single `started` watermark written on first run. The file
//! is rewritten in full, synchronously, after each mutation; on restart it is
//! the sole source of truth for what has already been handled. There is no
//! separate write-ahead log.

use crate::models::OrderSide;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("duplicate ledger record for order {0}")]
    DuplicateRecord(String),

    #[error("watermark already set")]
    WatermarkAlreadySet,
}

/// Outcome of one source order. Written once, never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerEntry {
    Mirrored {
        target_order_id: String,
        symbol: String,
        side: OrderSide,
        source_qty: i64,
        target_qty: i64,
    },
    Skipped {
        skipped: bool,
        reason: String,
    },
}

impl LedgerEntry {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            skipped: true,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started: Option<String>,
    #[serde(default)]
    orders: BTreeMap<String, LedgerEntry>,
}

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    state: LedgerFile,
}

impl Ledger {
    /// Loads the ledger, treating a missing file as a fresh first-run state.
    /// A file that exists but does not parse is fatal; silently starting over
    /// would re-mirror every historical order.
    pub fn load(path: PathBuf) -> Result<Self, LedgerError> {
        let state = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => LedgerFile::default(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, state })
    }

    pub fn has_seen(&self, order_id: &str) -> bool {
        self.state.orders.contains_key(order_id)
    }

    /// All recorded source order ids; the loop rebuilds its seen set from
    /// this at startup.
    pub fn order_ids(&self) -> impl Iterator<Item = &str> {
        self.state.orders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.state.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.orders.is_empty()
    }

    pub fn entry(&self, order_id: &str) -> Option<&LedgerEntry> {
        self.state.orders.get(order_id)
    }

    /// Write-once per key. A second record for the same order id means the
    /// loop's seen-set bookkeeping broke; that is an invariant violation, not
    /// something to paper over.
    pub fn record(&mut self, order_id: &str, entry: LedgerEntry) -> Result<(), LedgerError> {
        if self.state.orders.contains_key(order_id) {
            return Err(LedgerError::DuplicateRecord(order_id.to_string()));
        }
        self.state.orders.insert(order_id.to_string(), entry);
        self.save()
    }

    pub fn is_first_run(&self) -> bool {
        self.state.started.is_none()
    }

    pub fn mark_started(&mut self) -> Result<(), LedgerError> {
        if self.state.started.is_some() {
            return Err(LedgerError::WatermarkAlreadySet);
        }
        self.state.started = Some(Local::now().format("%Y-%m-%dT%H:%M:%S").to_string());
        self.save()
    }

    fn save(&self) -> Result<(), LedgerError> {
        fs::write(&self.path, serde_json::to_vec_pretty(&self.state)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_ledger() -> (TempDir, Ledger) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("copy_map.json");
        let ledger = Ledger::load(path).unwrap();
        (dir, ledger)
    }

    #[test]
    fn missing_file_is_first_run() {
        let (_dir, ledger) = temp_ledger();
        assert!(ledger.is_first_run());
        assert!(ledger.is_empty());
    }

    #[test]
    fn record_is_write_once() {
        let (_dir, mut ledger) = temp_ledger();
        ledger.record("z1", LedgerEntry::skipped("no quote")).unwrap();
        assert!(ledger.has_seen("z1"));
        let err = ledger.record("z1", LedgerEntry::skipped("again")).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateRecord(id) if id == "z1"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn mutations_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("copy_map.json");

        let mut ledger = Ledger::load(path.clone()).unwrap();
        ledger.mark_started().unwrap();
        ledger
            .record(
                "z1",
                LedgerEntry::Mirrored {
                    target_order_id: "5p-77".into(),
                    symbol: "NIFTY25N0425800PE".into(),
                    side: OrderSide::Buy,
                    source_qty: 50,
                    target_qty: 150,
                },
            )
            .unwrap();
        ledger.record("z2", LedgerEntry::skipped("opened before start")).unwrap();
        // No explicit save call: every mutation persists on its own.

        let reloaded = Ledger::load(path).unwrap();
        assert!(!reloaded.is_first_run());
        assert!(reloaded.has_seen("z1"));
        assert!(reloaded.has_seen("z2"));
        assert_eq!(reloaded.len(), 2);
        match reloaded.entry("z1").unwrap() {
            LedgerEntry::Mirrored { target_order_id, target_qty, .. } => {
                assert_eq!(target_order_id, "5p-77");
                assert_eq!(*target_qty, 150);
            }
            other => panic!("expected mirrored entry, got {other:?}"),
        }
        match reloaded.entry("z2").unwrap() {
            LedgerEntry::Skipped { skipped, reason } => {
                assert!(*skipped);
                assert_eq!(reason, "opened before start");
            }
            other => panic!("expected skipped entry, got {other:?}"),
        }
    }

    #[test]
    fn watermark_is_exactly_once() {
        let (_dir, mut ledger) = temp_ledger();
        assert!(ledger.is_first_run());
        ledger.mark_started().unwrap();
        assert!(!ledger.is_first_run());
        assert!(matches!(ledger.mark_started(), Err(LedgerError::WatermarkAlreadySet)));
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("copy_map.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(Ledger::load(path), Err(LedgerError::Corrupt(_))));
    }

    #[test]
    fn order_ids_rebuild_seen_set() {
        let (_dir, mut ledger) = temp_ledger();
        ledger.record("a", LedgerEntry::skipped("x")).unwrap();
        ledger.record("b", LedgerEntry::skipped("y")).unwrap();
        let ids: Vec<&str> = ledger.order_ids().collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
