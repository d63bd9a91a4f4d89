use crate::broker::{TargetMarketData, TargetTrading};
use crate::models::{
    ExpiryListRes, LoginReq, LoginResult, MarketDepth, OptionInstrument, PlaceOrderReq,
    PlaceOrderResult, QuoteInstrumentRef, QuoteReq, QuoteResult, XtsResponse,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

// =============== Target broker client (XTS-style REST) =================
//
// The broker runs two independent sessions: an interactive one for order
// placement and a market-data one for instruments and quotes. The binary
// constructs one client per session; both share this implementation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XtsSession {
    Interactive,
    MarketData,
}

pub struct XtsClient {
    pub api_base: String,
    pub app_key: String,
    pub secret_key: String,
    pub source: String,
    pub session: XtsSession,
    pub http: Client,
    pub token: RwLock<Option<String>>,
}

impl XtsClient {
    pub fn new(
        api_base: String,
        app_key: String,
        secret_key: String,
        source: String,
        session: XtsSession,
    ) -> Self {
        Self {
            api_base,
            app_key,
            secret_key,
            source,
            session,
            http: Client::new(),
            token: RwLock::new(None),
        }
    }

    fn login_path(&self) -> &'static str {
        match self.session {
            XtsSession::Interactive => "/interactive/user/session",
            XtsSession::MarketData => "/apimarketdata/auth/login",
        }
    }

    pub async fn login(&self) -> Result<String> {
        let url = format!("{}{}", self.api_base, self.login_path());
        let body = LoginReq {
            app_key: &self.app_key,
            secret_key: &self.secret_key,
            source: &self.source,
        };
        let resp = self.http.post(url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{:?} login failed: {} — {}", self.session, status, txt));
        }
        let env: XtsResponse<LoginResult> = resp.json().await?;
        let token = env
            .into_result()
            .map_err(|e| anyhow!("{:?} login rejected: {}", self.session, e))?
            .token;
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    async fn bearer(&self) -> Result<String> {
        if let Some(tok) = self.token.read().await.clone() {
            return Ok(tok);
        }
        self.login().await
    }

    async fn authed_get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let token = self.bearer().await?;
            let url = format!("{}{}", self.api_base, path);
            let resp = self
                .http
                .get(url)
                .header("authorization", &token)
                .query(query)
                .send()
                .await?;

            if resp.status() == StatusCode::UNAUTHORIZED && attempts < 2 {
                // refresh token once
                self.login().await?;
                continue;
            }
            if !resp.status().is_success() {
                let status = resp.status();
                let txt = resp.text().await.unwrap_or_default();
                return Err(anyhow!("GET {} failed: {} — {}", path, status, txt));
            }
            return Ok(resp.json().await?);
        }
    }

    async fn authed_post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let token = self.bearer().await?;
            let url = format!("{}{}", self.api_base, path);
            let resp = self
                .http
                .post(url)
                .header("authorization", &token)
                .json(body)
                .send()
                .await?;

            if resp.status() == StatusCode::UNAUTHORIZED && attempts < 2 {
                self.login().await?;
                continue;
            }
            if !resp.status().is_success() {
                let status = resp.status();
                let txt = resp.text().await.unwrap_or_default();
                return Err(anyhow!("POST {} failed: {} — {}", path, status, txt));
            }
            return Ok(resp.json().await?);
        }
    }
}

#[async_trait]
impl TargetMarketData for XtsClient {
    async fn expiry_dates(
        &self,
        segment: i32,
        series: &str,
        underlying: &str,
    ) -> Result<Vec<String>> {
        // This endpoint returns its result list without the tagged envelope.
        let res: ExpiryListRes = self
            .authed_get(
                "/apimarketdata/instruments/instrument/expiryDate",
                &[
                    ("exchangeSegment", segment.to_string()),
                    ("series", series.to_string()),
                    ("symbol", underlying.to_string()),
                ],
            )
            .await?;
        Ok(res.result)
    }

    async fn option_instruments(
        &self,
        segment: i32,
        series: &str,
        underlying: &str,
        expiry: &str,
        option_type: &str,
        strike: u32,
    ) -> Result<Vec<OptionInstrument>> {
        let env: XtsResponse<Vec<OptionInstrument>> = self
            .authed_get(
                "/apimarketdata/instruments/instrument/optionSymbol",
                &[
                    ("exchangeSegment", segment.to_string()),
                    ("series", series.to_string()),
                    ("symbol", underlying.to_string()),
                    ("expiryDate", expiry.to_string()),
                    ("optionType", option_type.to_string()),
                    ("strikePrice", strike.to_string()),
                ],
            )
            .await?;
        env.into_result()
            .map_err(|e| anyhow!("optionSymbol lookup rejected: {}", e))
    }

    async fn market_depth(&self, segment: i32, instrument_id: i64) -> Result<MarketDepth> {
        let req = QuoteReq {
            instruments: vec![QuoteInstrumentRef {
                exchange_segment: segment,
                exchange_instrument_id: instrument_id,
            }],
            xts_message_code: 1502, // market depth
            publish_format: "JSON",
        };
        let env: XtsResponse<QuoteResult> =
            self.authed_post("/apimarketdata/instruments/quotes", &req).await?;
        let result = env
            .into_result()
            .map_err(|e| anyhow!("quote request rejected: {}", e))?;
        // Each listQuotes entry is itself a JSON document.
        let raw = result
            .list_quotes
            .first()
            .ok_or_else(|| anyhow!("quote response had no listQuotes entry"))?;
        Ok(serde_json::from_str(raw)?)
    }
}

#[async_trait]
impl TargetTrading for XtsClient {
    async fn place_order(&self, req: &PlaceOrderReq<'_>) -> Result<PlaceOrderResult> {
        let env: XtsResponse<PlaceOrderResult> =
            self.authed_post("/interactive/orders", req).await?;
        env.into_result()
            .map_err(|e| anyhow!("order rejected: {}", e))
    }
}
