use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use tokio::{sync::Mutex, time::Instant};

use crate::{error::AlertError, models::MarketObservation};

/// Source of fresh market observations. Any call may be slow or fail.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn observation(&self, symbol: &str) -> Result<MarketObservation, AlertError>;
}

/// Per-symbol TTL cache in front of another provider. Failures are not cached.
pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, MarketObservation)>>,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    async fn observation(&self, symbol: &str) -> Result<MarketObservation, AlertError> {
        let key = symbol.to_uppercase();

        if let Some((at, obs)) = self.entries.lock().await.get(&key) {
            if at.elapsed() < self.ttl {
                return Ok(obs.clone());
            }
        }

        let fresh = self.inner.observation(&key).await?;
        self.entries
            .lock()
            .await
            .insert(key, (Instant::now(), fresh.clone()));

        Ok(fresh)
    }
}
