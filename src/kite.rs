use crate::broker::SourceBroker;
use crate::models::{KiteEnvelope, SourceOrder};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde_json::Value;

// =============== Source broker client (Kite-style REST) =================
//
// The interactive login flow that produces the access token lives outside this
// binary; we consume a ready token from configuration and only verify it.

pub struct KiteClient {
    pub api_base: String,
    pub api_key: String,
    pub access_token: String,
    pub http: Client,
}

impl KiteClient {
    pub fn new(api_base: String, api_key: String, access_token: String) -> Self {
        Self {
            api_base,
            api_key,
            access_token,
            http: Client::new(),
        }
    }

    fn auth_header(&self) -> String {
        format!("token {}:{}", self.api_key, self.access_token)
    }

    async fn get<T: for<'de> serde::Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.api_base, path);
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.auth_header())
            .header("X-Kite-Version", "3")
            .send()
            .await?;

        if resp.status() == StatusCode::FORBIDDEN || resp.status() == StatusCode::UNAUTHORIZED {
            return Err(anyhow!("GET {} unauthorized: session expired or token invalid", path));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("GET {} failed: {} — {}", path, status, txt));
        }

        let env: KiteEnvelope<T> = resp.json().await?;
        if env.status != "success" {
            return Err(anyhow!(
                "API status {}: {}",
                env.status,
                env.message.unwrap_or_default()
            ));
        }
        env.data
            .ok_or_else(|| anyhow!("GET {}: success envelope with no data", path))
    }

    /// Startup session probe. A bad or expired token fails here instead of on
    /// the first poll.
    pub async fn verify_session(&self) -> Result<()> {
        let _: Value = self.get("/user/profile").await?;
        Ok(())
    }
}

#[async_trait]
impl SourceBroker for KiteClient {
    async fn list_orders(&self) -> Result<Vec<SourceOrder>> {
        self.get("/orders").await
    }
}
