use serde::{Deserialize, Serialize};

// ===== Source broker (Kite-style) =====

/// Envelope around every Kite REST response: `{"status": "success", "data": ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct KiteEnvelope<T> {
    pub status: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Read-only view of one entry from the source order book at poll time.
/// Field names match the Kite wire format (snake_case, no rename needed).
#[derive(Debug, Clone, Deserialize)]
pub struct SourceOrder {
    pub order_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub order_timestamp: Option<String>,
    #[serde(default)]
    pub exchange: String,
    pub tradingsymbol: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub filled_quantity: i64,
    pub transaction_type: OrderSide,
}

impl SourceOrder {
    pub fn is_complete(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETE")
    }

    /// Filled quantity when the broker reports one, total quantity otherwise.
    pub fn executed_qty(&self) -> i64 {
        if self.filled_quantity > 0 {
            self.filled_quantity
        } else {
            self.quantity
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

// ===== Target broker (XTS-style) =====

/// Tagged XTS response envelope. Modeling the `type` discriminator here means
/// nothing downstream ever pokes at raw JSON to find out whether a call worked.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum XtsResponse<T> {
    Success {
        result: T,
    },
    Error {
        #[serde(default)]
        code: Option<serde_json::Value>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl<T> XtsResponse<T> {
    /// Flattens the envelope into a Result, stringifying the error side.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Success { result } => Ok(result),
            Self::Error { code, description } => Err(format!(
                "code={} description={}",
                code.map(|c| c.to_string()).unwrap_or_else(|| "?".into()),
                description.unwrap_or_else(|| "?".into()),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResult {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReq<'a> {
    pub app_key: &'a str,
    pub secret_key: &'a str,
    pub source: &'a str,
}

/// The expiryDate endpoint returns its list without the tagged envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpiryListRes {
    #[serde(default)]
    pub result: Vec<String>,
}

/// One instrument row from the optionSymbol lookup. The broker reports many
/// more fields; only the id is load-bearing here.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionInstrument {
    #[serde(rename = "ExchangeInstrumentID")]
    pub exchange_instrument_id: i64,
    #[serde(default, rename = "DisplayName")]
    pub display_name: Option<String>,
}

/// Outcome of instrument resolution. Lives for one mirroring attempt only;
/// monthly symbols can resolve to a different contract tomorrow.
#[derive(Debug, Clone)]
pub struct ResolvedInstrument {
    pub exchange_instrument_id: i64,
    pub data_segment: i32,
    pub order_segment: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInstrumentRef {
    pub exchange_segment: i32,
    #[serde(rename = "exchangeInstrumentID")]
    pub exchange_instrument_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteReq {
    pub instruments: Vec<QuoteInstrumentRef>,
    pub xts_message_code: i32,
    pub publish_format: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    #[serde(default)]
    pub list_quotes: Vec<String>,
}

/// Depth payload embedded as a JSON string inside `listQuotes`.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketDepth {
    #[serde(default, rename = "Bids")]
    pub bids: Vec<DepthLevel>,
    #[serde(default, rename = "Asks")]
    pub asks: Vec<DepthLevel>,
}

/// One depth level. The broker reports size and order counts too; only price
/// matters for the mirrored limit.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthLevel {
    #[serde(rename = "Price")]
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderReq<'a> {
    pub exchange_segment: &'a str,
    #[serde(rename = "exchangeInstrumentID")]
    pub exchange_instrument_id: i64,
    pub product_type: &'a str,
    pub order_type: &'a str,
    pub order_side: &'a str,
    pub time_in_force: &'a str,
    pub disclosed_quantity: i64,
    pub order_quantity: i64,
    pub limit_price: f64,
    pub stop_price: f64,
    pub order_unique_identifier: String,
    pub api_order_source: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderResult {
    #[serde(rename = "AppOrderID", alias = "appOrderID")]
    pub app_order_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xts_envelope_tags_success_and_error() {
        let ok: XtsResponse<Vec<i32>> =
            serde_json::from_str(r#"{"type":"success","result":[1,2]}"#).unwrap();
        assert_eq!(ok.into_result().unwrap(), vec![1, 2]);

        let err: XtsResponse<Vec<i32>> = serde_json::from_str(
            r#"{"type":"error","code":"e-apim-0011","description":"Invalid token"}"#,
        )
        .unwrap();
        let msg = err.into_result().unwrap_err();
        assert!(msg.contains("Invalid token"));
    }

    #[test]
    fn source_order_parses_kite_shape() {
        let o: SourceOrder = serde_json::from_str(
            r#"{
                "order_id": "231109000000001",
                "status": "COMPLETE",
                "order_timestamp": "2025-11-09 10:15:00",
                "exchange": "NFO",
                "tradingsymbol": "NIFTY25N0425800PE",
                "quantity": 50,
                "filled_quantity": 50,
                "transaction_type": "BUY"
            }"#,
        )
        .unwrap();
        assert!(o.is_complete());
        assert_eq!(o.transaction_type, OrderSide::Buy);
        assert_eq!(o.executed_qty(), 50);
    }

    #[test]
    fn executed_qty_falls_back_to_total() {
        let o: SourceOrder = serde_json::from_str(
            r#"{"order_id":"1","tradingsymbol":"X","quantity":75,"transaction_type":"SELL"}"#,
        )
        .unwrap();
        assert_eq!(o.executed_qty(), 75);
        assert!(!o.is_complete());
    }

    #[test]
    fn depth_parses_pascal_case_levels() {
        let d: MarketDepth =
            serde_json::from_str(r#"{"Bids":[{"Price":10.0,"Size":150}],"Asks":[]}"#).unwrap();
        assert_eq!(d.bids[0].price, 10.0);
        assert!(d.asks.is_empty());
    }
}
