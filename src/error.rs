use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("alert store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("market data fetch failed for {symbol}: {reason}")]
    FetchFailure { symbol: String, reason: String },

    #[error("malformed alert: {0}")]
    MalformedAlert(String),
}

impl AlertError {
    pub fn fetch(symbol: &str, reason: impl ToString) -> Self {
        AlertError::FetchFailure {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        AlertError::MalformedAlert(reason.into())
    }
}

impl From<mongodb::error::Error> for AlertError {
    fn from(e: mongodb::error::Error) -> Self {
        AlertError::StoreUnavailable(e.to_string())
    }
}
