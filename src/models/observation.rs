use serde::{Deserialize, Serialize};

use super::alert::SentimentDirection;

/// One market-data reading for a symbol. Consumed by the monitor, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketObservation {
    pub symbol: String,
    pub price: f64,
    pub percent_change: f64,
    pub volume: Option<f64>,
    pub observed_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl SentimentLabel {
    pub fn direction(self) -> Option<SentimentDirection> {
        match self {
            SentimentLabel::Bullish => Some(SentimentDirection::Bullish),
            SentimentLabel::Bearish => Some(SentimentDirection::Bearish),
            SentimentLabel::Neutral => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentObservation {
    pub symbol: String,
    pub label: SentimentLabel,
    // 0..=100
    pub score: u8,
}
