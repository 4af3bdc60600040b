#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::broadcast;

use marketalerts::{
    config::Settings,
    error::AlertError,
    models::{Alert, MarketObservation, NewAlert, Notification, Trigger},
    services::{
        alert_monitor::{AlertMonitor, MonitorSession, MonitorSettings},
        alerts_service::{AlertStore, MemoryAlertStore},
        clock::ManualClock,
        market_data::MarketDataProvider,
        notifier::{BroadcastSurface, Dispatcher},
    },
    AppState,
};

pub const T0: i64 = 1_700_000_000_000;
pub const USER: &str = "demo-user";

/// Scriptable market: fixed prices, optional failures and latency per symbol.
#[derive(Default)]
pub struct FakeMarket {
    prices: Mutex<HashMap<String, f64>>,
    volumes: Mutex<HashMap<String, f64>>,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl FakeMarket {
    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn set_volume(&self, symbol: &str, volume: f64) {
        self.volumes.lock().unwrap().insert(symbol.to_string(), volume);
    }

    pub fn fail(&self, symbol: &str) {
        self.failing.lock().unwrap().insert(symbol.to_string());
    }

    pub fn delay(&self, symbol: &str, by: Duration) {
        self.delays.lock().unwrap().insert(symbol.to_string(), by);
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|s| *s == symbol).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn observation(&self, symbol: &str) -> Result<MarketObservation, AlertError> {
        self.calls.lock().unwrap().push(symbol.to_string());

        let delay = self.delays.lock().unwrap().get(symbol).copied();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        if self.failing.lock().unwrap().contains(symbol) {
            return Err(AlertError::fetch(symbol, "upstream 500"));
        }

        let price = self.prices.lock().unwrap().get(symbol).copied();
        let price = price.ok_or_else(|| AlertError::fetch(symbol, "unknown symbol"))?;
        let volume = self.volumes.lock().unwrap().get(symbol).copied();

        Ok(MarketObservation {
            symbol: symbol.to_string(),
            price,
            percent_change: 0.0,
            volume,
            observed_at: T0,
        })
    }
}

pub struct Harness {
    pub store: Arc<MemoryAlertStore>,
    pub market: Arc<FakeMarket>,
    pub clock: Arc<ManualClock>,
    pub dispatcher: Arc<Dispatcher>,
    pub monitor: Arc<AlertMonitor>,
    pub rx: broadcast::Receiver<Notification>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(MonitorSettings::default())
    }

    pub fn with_settings(settings: MonitorSettings) -> Self {
        let store = Arc::new(MemoryAlertStore::new());
        let market = Arc::new(FakeMarket::default());
        let clock = Arc::new(ManualClock::new(T0));
        let (tx, rx) = broadcast::channel(64);

        let dispatcher = Arc::new(Dispatcher::new(store.clone(), Arc::new(BroadcastSurface::new(tx))));
        let monitor = Arc::new(
            AlertMonitor::new(store.clone(), market.clone(), dispatcher.clone(), clock.clone())
                .with_settings(settings),
        );

        Harness {
            store,
            market,
            clock,
            dispatcher,
            monitor,
            rx,
        }
    }

    pub async fn add(&self, symbol: &str, trigger: Trigger) -> Alert {
        let new = NewAlert::new(USER, symbol, trigger, T0).unwrap();
        self.store.create(new).await.unwrap()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.rx.try_recv() {
            out.push(n);
        }
        out
    }
}

/// Full HTTP state over `store`, with a monitor for `USER` polling `market`.
pub fn app_state(store: Arc<dyn AlertStore>, market: Arc<FakeMarket>) -> AppState {
    let (tx, _rx) = broadcast::channel(64);
    let clock = Arc::new(ManualClock::new(T0));

    let dispatcher = Arc::new(Dispatcher::new(store.clone(), Arc::new(BroadcastSurface::new(tx.clone()))));
    let monitor = Arc::new(AlertMonitor::new(store.clone(), market, dispatcher, clock.clone()));

    AppState {
        settings: Settings::default(),
        store,
        clock,
        notifications: tx,
        monitor: Arc::new(MonitorSession::new(monitor, USER)),
    }
}
