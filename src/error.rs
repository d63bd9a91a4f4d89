use thiserror::Error;

/// Per-order failures inside the mirror pipeline. Every variant finalizes the
/// source order as `skipped` in the ledger; none of them aborts the loop.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("malformed option symbol {0:?}")]
    MalformedSymbol(String),

    #[error("no expiry date for {underlying} matching {month:02}/{year}")]
    NoMatchingExpiry {
        underlying: String,
        month: u32,
        year: i32,
    },

    #[error("instrument resolution failed for {symbol}: {detail}")]
    ResolutionFailed { symbol: String, detail: String },

    #[error("no {side} quote for instrument {instrument_id}")]
    NoQuote { side: &'static str, instrument_id: i64 },

    #[error("order placement rejected: {detail}")]
    PlacementRejected { detail: String },
}

impl MirrorError {
    /// Short reason string written into the ledger's `skipped` entry.
    pub fn skip_reason(&self) -> String {
        match self {
            Self::MalformedSymbol(_) => "malformed symbol".to_string(),
            Self::NoMatchingExpiry { .. } => "no matching expiry".to_string(),
            Self::ResolutionFailed { .. } => "resolve failed".to_string(),
            Self::NoQuote { side, .. } => format!("no {side} quote"),
            Self::PlacementRejected { .. } => "placement rejected".to_string(),
        }
    }
}
