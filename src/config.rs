use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    // Source broker (Kite-style)
    pub kite_api_base: String,
    pub kite_api_key: String,
    pub kite_access_token: String,

    // Target broker (XTS-style); separate keys for the interactive (trading)
    // and market-data sessions
    pub xts_api_base: String,
    pub xts_interactive_key: String,
    pub xts_interactive_secret: String,
    pub xts_market_key: String,
    pub xts_market_secret: String,
    pub xts_source: String,

    // Mirroring behavior
    pub qty_multiplier: i64,
    pub poll_interval_ms: u64,
    pub ledger_path: PathBuf,
    pub activity_log_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let kite_api_base = env::var("KITE_API_BASE").unwrap_or_else(|_| "https://api.kite.trade".into());
        let kite_api_key = env::var("KITE_API_KEY").context("KITE_API_KEY not set")?;
        let kite_access_token =
            env::var("KITE_ACCESS_TOKEN").context("KITE_ACCESS_TOKEN not set")?;

        let xts_api_base = env::var("XTS_API_BASE").context("XTS_API_BASE not set")?;
        let xts_interactive_key =
            env::var("XTS_INTERACTIVE_KEY").context("XTS_INTERACTIVE_KEY not set")?;
        let xts_interactive_secret =
            env::var("XTS_INTERACTIVE_SECRET").context("XTS_INTERACTIVE_SECRET not set")?;
        let xts_market_key = env::var("XTS_MARKET_KEY").context("XTS_MARKET_KEY not set")?;
        let xts_market_secret =
            env::var("XTS_MARKET_SECRET").context("XTS_MARKET_SECRET not set")?;
        let xts_source = env::var("XTS_SOURCE").unwrap_or_else(|_| "WEBAPI".into());

        let qty_multiplier = read_multiplier();
        let poll_interval_ms = env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2000);
        let ledger_path =
            PathBuf::from(env::var("LEDGER_PATH").unwrap_or_else(|_| "copy_map.json".into()));
        let activity_log_path =
            PathBuf::from(env::var("ORDER_LOG_PATH").unwrap_or_else(|_| "Orderlog.txt".into()));

        Ok(Self {
            kite_api_base,
            kite_api_key,
            kite_access_token,
            xts_api_base,
            xts_interactive_key,
            xts_interactive_secret,
            xts_market_key,
            xts_market_secret,
            xts_source,
            qty_multiplier,
            poll_interval_ms,
            ledger_path,
            activity_log_path,
        })
    }
}

/// Quantity multiplier: default 1, never below 1. Fractional values are
/// accepted and truncated, mirroring how operators tend to write "2.0".
fn read_multiplier() -> i64 {
    env::var("QTY_MULTIPLIER")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .map(|v| (v as i64).max(1))
        .unwrap_or(1)
}
