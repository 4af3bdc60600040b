use std::{env, str::FromStr, time::Duration};

use crate::services::alert_monitor::MonitorSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_db: String,

    pub finnhub_api_key: String,
    pub quote_cache_ttl_secs: u64,

    pub monitor_user_id: String,
    pub poll_interval_secs: u64,
    pub fetch_timeout_ms: u64,
    pub alert_cooldown_secs: u64,
    pub reference_avg_volume: f64,
}

impl Settings {
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms.max(1)),
        }
    }

    pub fn cooldown_window_ms(&self) -> i64 {
        i64::try_from(self.alert_cooldown_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000)
    }

    pub fn quote_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.quote_cache_ttl_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: "127.0.0.1".to_string(),
            port: 3000,
            store_backend: StoreBackend::Mongo,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "marketalerts".to_string(),
            finnhub_api_key: String::new(),
            quote_cache_ttl_secs: 300,
            monitor_user_id: "demo-user".to_string(),
            poll_interval_secs: 10,
            fetch_timeout_ms: 3000,
            alert_cooldown_secs: 3600,
            reference_avg_volume: 1_000_000.0,
        }
    }
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let d = Settings::default();

    let store_backend = match env::var("ALERT_STORE").map(|s| s.to_lowercase()) {
        Ok(s) if s == "memory" => StoreBackend::Memory,
        _ => StoreBackend::Mongo,
    };

    Settings {
        host: env::var("HOST").unwrap_or(d.host),
        port: var_or("PORT", d.port),
        store_backend,
        mongodb_uri: env::var("MONGODB_URI").unwrap_or(d.mongodb_uri),
        mongodb_db: env::var("MONGODB_DB").unwrap_or(d.mongodb_db),
        finnhub_api_key: env::var("FINNHUB_API_KEY").unwrap_or(d.finnhub_api_key),
        quote_cache_ttl_secs: var_or("QUOTE_CACHE_TTL_SECS", d.quote_cache_ttl_secs),
        monitor_user_id: env::var("MONITOR_USER_ID").unwrap_or(d.monitor_user_id),
        poll_interval_secs: var_or("POLL_INTERVAL_SECS", d.poll_interval_secs),
        fetch_timeout_ms: var_or("FETCH_TIMEOUT_MS", d.fetch_timeout_ms),
        alert_cooldown_secs: var_or("ALERT_COOLDOWN_SECS", d.alert_cooldown_secs),
        reference_avg_volume: var_or("REFERENCE_AVG_VOLUME", d.reference_avg_volume),
    }
}
