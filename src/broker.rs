//! Capability seams over the two brokers. The mirror loop only ever talks to
//! these traits, so it can run against in-memory fakes in tests while the
//! binary wires in the reqwest-backed clients.

use crate::models::{MarketDepth, OptionInstrument, PlaceOrderReq, PlaceOrderResult, SourceOrder};
use anyhow::Result;
use async_trait::async_trait;

/// Source broker: the account whose executions get mirrored.
#[async_trait]
pub trait SourceBroker: Send + Sync {
    /// Full order book for the day, in the order the broker returns it.
    /// Transport errors are transient; the caller retries next poll.
    async fn list_orders(&self) -> Result<Vec<SourceOrder>>;
}

/// Target broker market-data capability: expiry lists, instrument lookup,
/// top-of-book quotes.
#[async_trait]
pub trait TargetMarketData: Send + Sync {
    async fn expiry_dates(&self, segment: i32, series: &str, underlying: &str)
        -> Result<Vec<String>>;

    /// Resolves one option contract to tradable instruments. An empty vec is a
    /// valid response (no match); broker error envelopes surface as Err.
    #[allow(clippy::too_many_arguments)]
    async fn option_instruments(
        &self,
        segment: i32,
        series: &str,
        underlying: &str,
        expiry: &str,
        option_type: &str,
        strike: u32,
    ) -> Result<Vec<OptionInstrument>>;

    async fn market_depth(&self, segment: i32, instrument_id: i64) -> Result<MarketDepth>;
}

/// Target broker trading capability.
#[async_trait]
pub trait TargetTrading: Send + Sync {
    async fn place_order(&self, req: &PlaceOrderReq<'_>) -> Result<PlaceOrderResult>;
}
