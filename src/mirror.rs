//! The poll-detect-translate-place control loop.
//!
//! Single task, sequential awaits. Each poll fetches the source order book,
//! walks it in broker order, and for every not-yet-seen COMPLETE order runs
//! decode -> resolve -> quote -> place. Every terminal order produces exactly
//! one ledger write through `finalize`, whatever the outcome; per-order
//! failures never touch the rest of the batch. Nothing is ever retried:
//! re-attempting a mirror on a fast-moving option risks duplicate fills.

use crate::activity::ActivityLog;
use crate::broker::{SourceBroker, TargetMarketData, TargetTrading};
use crate::error::MirrorError;
use crate::ledger::{Ledger, LedgerEntry, LedgerError};
use crate::models::{PlaceOrderReq, SourceOrder};
use crate::quote::{self, TICK_SIZE};
use crate::resolver;
use crate::symbol;
use ahash::AHashSet;
use anyhow::Result;
use std::time::Duration;
use tracing::warn;

const PRODUCT_MIS: &str = "MIS";
const ORDER_TYPE_LIMIT: &str = "Limit";
const VALIDITY_DAY: &str = "DAY";

struct Placed {
    target_order_id: String,
    target_qty: i64,
}

pub struct Mirror<S, M, T> {
    source: S,
    market_data: M,
    trading: T,
    ledger: Ledger,
    activity: ActivityLog,
    // Derived index over the ledger's keys; the ledger stays authoritative.
    seen: AHashSet<String>,
    multiplier: i64,
    poll_interval: Duration,
}

impl<S, M, T> Mirror<S, M, T>
where
    S: SourceBroker,
    M: TargetMarketData,
    T: TargetTrading,
{
    pub fn new(
        source: S,
        market_data: M,
        trading: T,
        ledger: Ledger,
        activity: ActivityLog,
        multiplier: i64,
        poll_interval: Duration,
    ) -> Self {
        let seen: AHashSet<String> = ledger.order_ids().map(String::from).collect();
        Self {
            source,
            market_data,
            trading,
            ledger,
            activity,
            seen,
            multiplier: multiplier.max(1),
            poll_interval,
        }
    }

    /// Runs until externally terminated. Only a ledger invariant violation
    /// comes back as Err.
    pub async fn run(&mut self) -> Result<()> {
        self.activity
            .line(&format!("Mirror loop started. Multiplier={}", self.multiplier));
        loop {
            self.poll_once().await?;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One poll iteration. Exposed separately so tests can drive the state
    /// machine without the sleep.
    pub async fn poll_once(&mut self) -> Result<(), LedgerError> {
        let orders = match self.source.list_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                // Transient: no state changes, next poll retries.
                warn!("source order fetch failed: {:#}", e);
                return Ok(());
            }
        };

        if self.ledger.is_first_run() {
            return self.snapshot_existing(&orders);
        }

        for order in &orders {
            self.process_order(order).await?;
        }
        Ok(())
    }

    /// First-run snapshot: every order already present on the source account
    /// is recorded as skipped so historical activity is never replayed. The
    /// watermark then flips and normal polling begins next cycle.
    fn snapshot_existing(&mut self, orders: &[SourceOrder]) -> Result<(), LedgerError> {
        self.activity.line(&format!(
            "Fetched {} existing orders before mirror start. These will NOT be mirrored.",
            orders.len()
        ));
        for order in orders {
            if self.ledger.has_seen(&order.order_id) {
                continue;
            }
            self.finalize(&order.order_id, LedgerEntry::skipped("opened before start"))?;
            self.activity.line(&format!(
                "Pre-start order not tracked: {} symbol={} status={} ts={}",
                order.order_id,
                order.tradingsymbol,
                order.status,
                order.order_timestamp.as_deref().unwrap_or("-")
            ));
        }
        self.ledger.mark_started()
    }

    async fn process_order(&mut self, order: &SourceOrder) -> Result<(), LedgerError> {
        if self.seen.contains(&order.order_id) {
            return Ok(());
        }
        // Not terminal yet: no ledger entry, the order is reconsidered on the
        // next poll.
        if !order.is_complete() {
            return Ok(());
        }

        match self.mirror_one(order).await {
            Ok(placed) => {
                self.activity.line(&format!(
                    "Mapped {} -> {}",
                    order.order_id, placed.target_order_id
                ));
                self.finalize(
                    &order.order_id,
                    LedgerEntry::Mirrored {
                        target_order_id: placed.target_order_id,
                        symbol: order.tradingsymbol.clone(),
                        side: order.transaction_type,
                        source_qty: order.executed_qty(),
                        target_qty: placed.target_qty,
                    },
                )
            }
            Err(e) => {
                self.activity.line(&format!(
                    "Skipping {} ({}): {}",
                    order.order_id, order.tradingsymbol, e
                ));
                self.finalize(&order.order_id, LedgerEntry::skipped(e.skip_reason()))
            }
        }
    }

    /// The translate-and-place pipeline for one completed source order.
    async fn mirror_one(&self, order: &SourceOrder) -> Result<Placed, MirrorError> {
        let desc = symbol::decode(&order.tradingsymbol)?;
        let instrument = resolver::resolve(&self.market_data, &desc).await?;

        let side = order.transaction_type;
        let best = quote::best_price(&self.market_data, &instrument, side).await?;
        let limit_price = quote::adjust_limit_price(side, best, TICK_SIZE);

        let target_qty = (order.executed_qty() * self.multiplier).max(1);
        self.activity.line(&format!(
            "COMPLETE {} {} {} {} srcqty={} -> qty={} inst={} price={:.2} adjusted={:.2}",
            order.order_id,
            order.exchange,
            order.tradingsymbol,
            side.as_str(),
            order.executed_qty(),
            target_qty,
            instrument.exchange_instrument_id,
            best,
            limit_price
        ));

        let req = PlaceOrderReq {
            exchange_segment: instrument.order_segment,
            exchange_instrument_id: instrument.exchange_instrument_id,
            product_type: PRODUCT_MIS,
            order_type: ORDER_TYPE_LIMIT,
            order_side: side.as_str(),
            time_in_force: VALIDITY_DAY,
            disclosed_quantity: 0,
            order_quantity: target_qty,
            limit_price,
            stop_price: 0.0,
            // Deterministic tag: correlates source and target even if the
            // ledger write is lost before a restart.
            order_unique_identifier: format!("MIR-{}", order.order_id),
            api_order_source: "WEBAPI",
        };

        let placed = self
            .trading
            .place_order(&req)
            .await
            .map_err(|e| MirrorError::PlacementRejected {
                detail: format!("{e:#}"),
            })?;

        Ok(Placed {
            target_order_id: placed.app_order_id.to_string(),
            target_qty,
        })
    }

    /// The single bookkeeping step per terminal source order: one ledger
    /// write, one seen-set insert. Nothing else in the loop records outcomes.
    fn finalize(&mut self, order_id: &str, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.ledger.record(order_id, entry)?;
        self.seen.insert(order_id.to_string());
        Ok(())
    }

    #[cfg(test)]
    fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
