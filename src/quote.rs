//! Top-of-book pricing with slippage and tick rounding.
//!
//! The mirrored order must be marketable against the book we just observed:
//! a BUY pays up (best ask + 1%, rounded up to the tick), a SELL gives way
//! (best bid - 1%, rounded down). Rounding direction matters; rounding a buy
//! down could leave the limit below the ask.

use crate::broker::TargetMarketData;
use crate::error::MirrorError;
use crate::models::{OrderSide, ResolvedInstrument};
use tracing::warn;

pub const SLIPPAGE: f64 = 0.01;
pub const TICK_SIZE: f64 = 0.05;

/// Fetches one depth snapshot and returns the best price on the side the
/// mirror order will hit: ask for BUY, bid for SELL.
pub async fn best_price(
    md: &dyn TargetMarketData,
    inst: &ResolvedInstrument,
    side: OrderSide,
) -> Result<f64, MirrorError> {
    let no_quote = |side: &'static str| MirrorError::NoQuote {
        side,
        instrument_id: inst.exchange_instrument_id,
    };

    let depth = md
        .market_depth(inst.data_segment, inst.exchange_instrument_id)
        .await
        .map_err(|e| {
            warn!(
                "depth fetch failed for instrument {}: {:#}",
                inst.exchange_instrument_id, e
            );
            no_quote(match side {
                OrderSide::Buy => "ask",
                OrderSide::Sell => "bid",
            })
        })?;

    match side {
        // Best ask = first entry (lowest price).
        OrderSide::Buy => depth
            .asks
            .first()
            .map(|l| l.price)
            .ok_or_else(|| no_quote("ask")),
        // Best bid = first entry (highest price).
        OrderSide::Sell => depth
            .bids
            .first()
            .map(|l| l.price)
            .ok_or_else(|| no_quote("bid")),
    }
}

/// Applies 1% slippage in the order's favor-to-fill direction and rounds to
/// the tick: up for BUY, down for SELL.
pub fn adjust_limit_price(side: OrderSide, best: f64, tick: f64) -> f64 {
    match side {
        OrderSide::Buy => {
            let p = best * (1.0 + SLIPPAGE);
            (p / tick).ceil() * tick
        }
        OrderSide::Sell => {
            let p = best * (1.0 - SLIPPAGE);
            (p / tick).floor() * tick
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DepthLevel, MarketDepth, OptionInstrument};
    use anyhow::Result;
    use async_trait::async_trait;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn buy_rounds_up_to_tick() {
        // 10.02 * 1.01 = 10.1202 -> next 0.05 multiple above is 10.15
        assert!(close(adjust_limit_price(OrderSide::Buy, 10.02, TICK_SIZE), 10.15));
    }

    #[test]
    fn sell_rounds_down_to_tick() {
        // 10.02 * 0.99 = 9.9198 -> next 0.05 multiple below is 9.90
        assert!(close(adjust_limit_price(OrderSide::Sell, 10.02, TICK_SIZE), 9.90));
    }

    #[test]
    fn adjustment_is_asymmetric() {
        let buy = adjust_limit_price(OrderSide::Buy, 100.0, TICK_SIZE);
        let sell = adjust_limit_price(OrderSide::Sell, 100.0, TICK_SIZE);
        assert!(buy >= 101.0);
        assert!(sell <= 99.0);
    }

    struct FixedDepth {
        depth: MarketDepth,
    }

    #[async_trait]
    impl TargetMarketData for FixedDepth {
        async fn expiry_dates(&self, _: i32, _: &str, _: &str) -> Result<Vec<String>> {
            unreachable!()
        }
        async fn option_instruments(
            &self,
            _: i32,
            _: &str,
            _: &str,
            _: &str,
            _: &str,
            _: u32,
        ) -> Result<Vec<OptionInstrument>> {
            unreachable!()
        }
        async fn market_depth(&self, _: i32, _: i64) -> Result<MarketDepth> {
            Ok(self.depth.clone())
        }
    }

    fn inst() -> ResolvedInstrument {
        ResolvedInstrument {
            exchange_instrument_id: 99,
            data_segment: 2,
            order_segment: "NSEFO",
        }
    }

    #[tokio::test]
    async fn buy_takes_best_ask_sell_takes_best_bid() {
        let md = FixedDepth {
            depth: MarketDepth {
                bids: vec![
                    DepthLevel { price: 9.95 },
                    DepthLevel { price: 9.90 },
                ],
                asks: vec![
                    DepthLevel { price: 10.05 },
                    DepthLevel { price: 10.10 },
                ],
            },
        };
        assert!(close(best_price(&md, &inst(), OrderSide::Buy).await.unwrap(), 10.05));
        assert!(close(best_price(&md, &inst(), OrderSide::Sell).await.unwrap(), 9.95));
    }

    #[tokio::test]
    async fn empty_side_is_no_quote() {
        let md = FixedDepth {
            depth: MarketDepth { bids: vec![], asks: vec![] },
        };
        let err = best_price(&md, &inst(), OrderSide::Buy).await.unwrap_err();
        assert!(matches!(err, MirrorError::NoQuote { side: "ask", .. }));
        let err = best_price(&md, &inst(), OrderSide::Sell).await.unwrap_err();
        assert!(matches!(err, MirrorError::NoQuote { side: "bid", .. }));
    }
}
