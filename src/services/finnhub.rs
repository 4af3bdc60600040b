use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    error::AlertError,
    models::{alert::normalize_symbol, MarketObservation},
    services::market_data::MarketDataProvider,
};

const QUOTE_URL: &str = "https://finnhub.io/api/v1/quote";

#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            api_key,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub async fn quote(&self, symbol: &str) -> Result<QuoteResponse, String> {
        if !self.has_key() {
            return Err("FINNHUB_API_KEY is missing in .env".to_string());
        }

        let res = self
            .http
            .get(QUOTE_URL)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("Finnhub quote failed: {status} {body}"));
        }

        res.json::<QuoteResponse>().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubClient {
    async fn observation(&self, symbol: &str) -> Result<MarketObservation, AlertError> {
        let sym = normalize_symbol(symbol);
        let quote = self
            .quote(&sym)
            .await
            .map_err(|e| AlertError::fetch(&sym, e))?;

        quote.into_observation(&sym)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuoteResponse {
    // current
    pub c: f64,
    // change
    pub d: Option<f64>,
    // percent change
    pub dp: Option<f64>,
    // previous close
    pub pc: f64,
    // timestamp, seconds
    pub t: i64,
}

impl QuoteResponse {
    pub fn into_observation(self, symbol: &str) -> Result<MarketObservation, AlertError> {
        // Finnhub answers unknown symbols with an all-zero quote
        if !self.c.is_finite() || self.c <= 0.0 {
            return Err(AlertError::fetch(symbol, format!("no usable price ({})", self.c)));
        }

        Ok(MarketObservation {
            symbol: symbol.to_string(),
            price: self.c,
            percent_change: self.dp.unwrap_or(0.0),
            volume: None,
            observed_at: self.t.saturating_mul(1000),
        })
    }
}
