//! Resolution of a decoded option descriptor to a concrete tradable
//! instrument on the target broker.

use crate::broker::TargetMarketData;
use crate::error::MirrorError;
use crate::models::ResolvedInstrument;
use crate::symbol::{self, OptionDescriptor};
use chrono::{Datelike, NaiveDateTime};
use tracing::{info, warn};

/// Resolves `desc` against the target broker. Monthly tickers carry no day, so
/// the expiry list is consulted first: among dates in the ticker's month and
/// year, the latest one is the monthly contract (weeklies in the same month
/// sort earlier).
pub async fn resolve(
    md: &dyn TargetMarketData,
    desc: &OptionDescriptor,
) -> Result<ResolvedInstrument, MirrorError> {
    let data_segment = symbol::data_segment(&desc.underlying);
    let order_segment = symbol::order_segment(&desc.underlying);

    let expiry = if desc.expiry_is_ambiguous_month() {
        resolve_monthly_expiry(md, desc, data_segment).await?
    } else {
        desc.expiry_token()
    };

    let instruments = md
        .option_instruments(
            data_segment,
            desc.series.xts_code(),
            &desc.underlying,
            &expiry,
            desc.option_type.code(),
            desc.strike,
        )
        .await
        .map_err(|e| {
            warn!("optionSymbol lookup error for {:?}: {:#}", desc, e);
            MirrorError::ResolutionFailed {
                symbol: desc.underlying.clone(),
                detail: format!("{e:#}"),
            }
        })?;

    let Some(inst) = instruments.first() else {
        warn!("optionSymbol returned no match for {:?} expiry={}", desc, expiry);
        return Err(MirrorError::ResolutionFailed {
            symbol: desc.underlying.clone(),
            detail: format!("no instrument for expiry {expiry} strike {}", desc.strike),
        });
    };

    info!(
        "resolved {} {} strike {} -> instrument {} {}",
        desc.underlying,
        expiry,
        desc.strike,
        inst.exchange_instrument_id,
        inst.display_name.as_deref().unwrap_or("")
    );

    Ok(ResolvedInstrument {
        exchange_instrument_id: inst.exchange_instrument_id,
        data_segment,
        order_segment,
    })
}

async fn resolve_monthly_expiry(
    md: &dyn TargetMarketData,
    desc: &OptionDescriptor,
    data_segment: i32,
) -> Result<String, MirrorError> {
    let dates = md
        .expiry_dates(data_segment, desc.series.xts_code(), &desc.underlying)
        .await
        .map_err(|e| {
            warn!("expiryDate query error for {:?}: {:#}", desc, e);
            MirrorError::ResolutionFailed {
                symbol: desc.underlying.clone(),
                detail: format!("expiry list: {e:#}"),
            }
        })?;

    // Broker format: "2025-11-25T14:30:00". Unparseable entries are ignored.
    let best = dates
        .iter()
        .filter_map(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .filter(|dt| dt.month() == desc.month && dt.year() == desc.year)
        .max();

    match best {
        Some(dt) => {
            let token = symbol::expiry_token(dt.day(), dt.month(), dt.year());
            info!(
                "monthly expiry for {} {:02}/{}: using {}",
                desc.underlying, desc.month, desc.year, token
            );
            Ok(token)
        }
        None => Err(MirrorError::NoMatchingExpiry {
            underlying: desc.underlying.clone(),
            month: desc.month,
            year: desc.year,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketDepth, OptionInstrument};
    use crate::symbol::decode;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeMarketData {
        expiries: Vec<String>,
        instruments: Vec<OptionInstrument>,
        expiry_calls: AtomicUsize,
        lookup_error: bool,
    }

    impl FakeMarketData {
        fn new(expiries: Vec<&str>, ids: Vec<i64>) -> Self {
            Self {
                expiries: expiries.into_iter().map(String::from).collect(),
                instruments: ids
                    .into_iter()
                    .map(|id| OptionInstrument {
                        exchange_instrument_id: id,
                        display_name: None,
                    })
                    .collect(),
                expiry_calls: AtomicUsize::new(0),
                lookup_error: false,
            }
        }
    }

    #[async_trait]
    impl TargetMarketData for FakeMarketData {
        async fn expiry_dates(&self, _: i32, _: &str, _: &str) -> Result<Vec<String>> {
            self.expiry_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.expiries.clone())
        }

        async fn option_instruments(
            &self,
            _segment: i32,
            _series: &str,
            _underlying: &str,
            _expiry: &str,
            _option_type: &str,
            _strike: u32,
        ) -> Result<Vec<OptionInstrument>> {
            if self.lookup_error {
                return Err(anyhow!("broker says no"));
            }
            Ok(self.instruments.clone())
        }

        async fn market_depth(&self, _: i32, _: i64) -> Result<MarketDepth> {
            unreachable!("resolver never fetches quotes")
        }
    }

    #[tokio::test]
    async fn weekly_symbol_skips_expiry_query() {
        let md = FakeMarketData::new(vec![], vec![42]);
        let desc = decode("NIFTY25N0425800PE").unwrap();
        let inst = resolve(&md, &desc).await.unwrap();
        assert_eq!(inst.exchange_instrument_id, 42);
        assert_eq!(inst.data_segment, 2);
        assert_eq!(inst.order_segment, "NSEFO");
        assert_eq!(md.expiry_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn monthly_symbol_picks_latest_matching_expiry() {
        // Two November dates: the weekly (04) and the monthly (25). The later
        // one must win. Other months are noise.
        let md = FakeMarketData::new(
            vec![
                "2025-11-04T14:30:00",
                "2025-11-25T14:30:00",
                "2025-12-30T14:30:00",
                "2024-11-28T14:30:00",
                "garbage",
            ],
            vec![7],
        );
        let desc = decode("BANKNIFTY25NOV59500CE").unwrap();
        let inst = resolve(&md, &desc).await.unwrap();
        assert_eq!(inst.exchange_instrument_id, 7);
        assert_eq!(md.expiry_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn monthly_symbol_without_matching_month_fails() {
        let md = FakeMarketData::new(vec!["2025-12-30T14:30:00"], vec![7]);
        let desc = decode("BANKNIFTY25NOV59500CE").unwrap();
        let err = resolve(&md, &desc).await.unwrap_err();
        assert!(matches!(err, MirrorError::NoMatchingExpiry { .. }));
    }

    #[tokio::test]
    async fn empty_lookup_is_resolution_failure() {
        let md = FakeMarketData::new(vec![], vec![]);
        let desc = decode("NIFTY25N0425800PE").unwrap();
        let err = resolve(&md, &desc).await.unwrap_err();
        assert!(matches!(err, MirrorError::ResolutionFailed { .. }));
    }

    #[tokio::test]
    async fn broker_error_is_resolution_failure() {
        let mut md = FakeMarketData::new(vec![], vec![1]);
        md.lookup_error = true;
        let desc = decode("NIFTY25N0425800PE").unwrap();
        let err = resolve(&md, &desc).await.unwrap_err();
        assert!(matches!(err, MirrorError::ResolutionFailed { .. }));
    }
}
