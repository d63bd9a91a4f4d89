mod activity;
mod broker;
mod config;
mod error;
mod kite;
mod ledger;
mod mirror;
mod models;
mod quote;
mod resolver;
mod symbol;
mod xts;

use activity::ActivityLog;
use anyhow::{Context, Result};
use config::Config;
use dotenvy::dotenv;
use kite::KiteClient;
use ledger::Ledger;
use mirror::Mirror;
use std::time::Duration;
use tracing::info;
use xts::{XtsClient, XtsSession};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cfg = Config::from_env()?;
    info!("KITE_API_BASE={} XTS_API_BASE={}", cfg.kite_api_base, cfg.xts_api_base);

    let activity = ActivityLog::new(cfg.activity_log_path.clone());

    // Either login failing here is fatal; nothing proceeds half-authenticated.
    let source = KiteClient::new(
        cfg.kite_api_base.clone(),
        cfg.kite_api_key.clone(),
        cfg.kite_access_token.clone(),
    );
    source
        .verify_session()
        .await
        .context("source broker session check failed")?;
    activity.line("Successful login to source broker");

    let trading = XtsClient::new(
        cfg.xts_api_base.clone(),
        cfg.xts_interactive_key.clone(),
        cfg.xts_interactive_secret.clone(),
        cfg.xts_source.clone(),
        XtsSession::Interactive,
    );
    trading
        .login()
        .await
        .context("target broker interactive login failed")?;
    activity.line("Target broker interactive login successful");

    let market_data = XtsClient::new(
        cfg.xts_api_base.clone(),
        cfg.xts_market_key.clone(),
        cfg.xts_market_secret.clone(),
        cfg.xts_source.clone(),
        XtsSession::MarketData,
    );
    market_data
        .login()
        .await
        .context("target broker market-data login failed")?;
    activity.line("Target broker market-data login successful");

    // A corrupt ledger is fatal too: restarting with an empty ledger would
    // replay every historical execution.
    let ledger = Ledger::load(cfg.ledger_path.clone()).context("failed to load order ledger")?;
    activity.line(&format!("Loaded ledger: {} orders tracked", ledger.len()));

    let mut mirror = Mirror::new(
        source,
        market_data,
        trading,
        ledger,
        activity,
        cfg.qty_multiplier,
        Duration::from_millis(cfg.poll_interval_ms),
    );
    mirror.run().await
}
