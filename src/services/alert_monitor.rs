use std::{collections::BTreeSet, sync::Arc, time::Duration};

use futures_util::{stream::FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    error::AlertError,
    models::{Alert, FiringEvent, SentimentObservation},
    services::{
        alerts_service::AlertStore,
        clock::Clock,
        evaluator::Evaluator,
        market_data::MarketDataProvider,
        notifier::{DispatchOutcome, Dispatcher},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// Applied to every fetch on top of whatever the provider does itself.
    pub fetch_timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            fetch_timeout: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Idle,
    Polling,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub symbols: usize,
    pub fetched: usize,
    // sorted
    pub failed: Vec<String>,
    pub fired: usize,
    pub suppressed: usize,
    // observations that arrived after the session was stopped
    pub discarded: usize,
}

/// Polls market data for a user's alerts and feeds every observation through
/// the evaluator and dispatcher.
///
/// The alert set is loaded once per session in `start` and never re-queried
/// while polling; alerts created afterwards show up in the next session.
pub struct AlertMonitor {
    store: Arc<dyn AlertStore>,
    provider: Arc<dyn MarketDataProvider>,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    evaluator: Evaluator,
    settings: MonitorSettings,
}

impl AlertMonitor {
    pub fn new(
        store: Arc<dyn AlertStore>,
        provider: Arc<dyn MarketDataProvider>,
        dispatcher: Arc<Dispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            provider,
            dispatcher,
            clock,
            evaluator: Evaluator::default(),
            settings: MonitorSettings::default(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_settings(mut self, settings: MonitorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Loads `user_id`'s alerts and, if there are any, starts the polling timer.
    /// The first tick runs one poll interval after start.
    pub async fn start(self: &Arc<Self>, user_id: &str) -> MonitorHandle {
        let snapshot: Arc<[Alert]> = self.store.list_by_user(user_id).await.into();

        if snapshot.is_empty() {
            tracing::info!(user_id, "no alerts, monitor idle");
            return MonitorHandle {
                monitor: Arc::clone(self),
                state: MonitorState::Idle,
                snapshot,
                cancel: None,
                task: None,
            };
        }

        tracing::info!(
            user_id,
            alerts = snapshot.len(),
            interval_ms = self.settings.poll_interval.as_millis() as u64,
            "alert monitor polling"
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(self).poll_loop(Arc::clone(&snapshot), cancel_rx));

        MonitorHandle {
            monitor: Arc::clone(self),
            state: MonitorState::Polling,
            snapshot,
            cancel: Some(cancel_tx),
            task: Some(task),
        }
    }

    async fn poll_loop(self: Arc<Self>, snapshot: Arc<[Alert]>, mut cancel: watch::Receiver<bool>) {
        let period = self.settings.poll_interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // a dropped handle counts as a stop
                _ = cancel.changed() => break,
                _ = interval.tick() => {
                    let report = self.tick(&snapshot, || *cancel.borrow()).await;
                    tracing::debug!(?report, "alert monitor tick");
                }
            }
        }

        tracing::info!("alert monitor stopped");
    }

    /// Runs one polling pass over `alerts` right now.
    pub async fn run_tick(&self, alerts: &[Alert]) -> TickReport {
        self.tick(alerts, || false).await
    }

    async fn tick(&self, alerts: &[Alert], cancelled: impl Fn() -> bool) -> TickReport {
        let symbols: BTreeSet<String> = alerts
            .iter()
            .filter(|a| a.is_active)
            .map(|a| a.symbol.to_uppercase())
            .collect();

        let mut report = TickReport {
            symbols: symbols.len(),
            ..TickReport::default()
        };

        let mut fetches: FuturesUnordered<_> = symbols
            .iter()
            .map(|sym| async move {
                let res = match time::timeout(self.settings.fetch_timeout, self.provider.observation(sym)).await {
                    Ok(res) => res,
                    Err(_) => Err(AlertError::fetch(sym, "timed out")),
                };
                (sym, res)
            })
            .collect();

        while let Some((sym, res)) = fetches.next().await {
            let obs = match res {
                Ok(obs) => obs,
                Err(e) => {
                    tracing::warn!(symbol = %sym, error = %e, "quote fetch failed, skipping symbol this tick");
                    report.failed.push(sym.clone());
                    continue;
                }
            };
            report.fetched += 1;

            if cancelled() {
                report.discarded += 1;
                continue;
            }

            let events = self.evaluator.evaluate(alerts, &obs);
            self.dispatch_all(alerts, &events, &mut report);
        }

        report.failed.sort();
        report
    }

    fn dispatch_all(&self, alerts: &[Alert], events: &[FiringEvent], report: &mut TickReport) {
        let now = self.clock.now_millis();

        for event in events {
            let Some(alert) = alerts.iter().find(|a| a.id == event.alert_id) else {
                continue;
            };

            match self.dispatcher.dispatch(alert, event, now) {
                DispatchOutcome::Fired => report.fired += 1,
                DispatchOutcome::Suppressed => report.suppressed += 1,
            }
        }
    }
}

/// A running (or idle) monitoring session.
pub struct MonitorHandle {
    monitor: Arc<AlertMonitor>,
    state: MonitorState,
    snapshot: Arc<[Alert]>,
    cancel: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn snapshot(&self) -> &[Alert] {
        &self.snapshot
    }

    /// Sentiment readings arrive outside the price loop but go through the
    /// same dispatcher, so they share the cooldown.
    pub fn observe_sentiment(&self, obs: &SentimentObservation) -> Vec<DispatchOutcome> {
        let monitor = &self.monitor;
        let now = monitor.clock.now_millis();

        monitor
            .evaluator
            .evaluate_sentiment(&self.snapshot, obs)
            .iter()
            .filter_map(|event| {
                let alert = self.snapshot.iter().find(|a| a.id == event.alert_id)?;
                Some(monitor.dispatcher.dispatch(alert, event, now))
            })
            .collect()
    }

    /// Stops the timer. A tick already running finishes, but observations it
    /// receives from here on are dropped. Pending cooldown writes are awaited.
    pub async fn stop(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(true);
        }

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "alert monitor task ended abnormally");
            }
        }

        self.monitor.dispatcher.flush().await;
    }
}

/// The one monitoring session a host keeps for its user. `reload` replaces
/// the current session with a fresh one so the alert set is re-read.
pub struct MonitorSession {
    monitor: Arc<AlertMonitor>,
    user_id: String,
    current: Mutex<Option<MonitorHandle>>,
}

impl MonitorSession {
    pub fn new(monitor: Arc<AlertMonitor>, user_id: impl Into<String>) -> Self {
        Self {
            monitor,
            user_id: user_id.into(),
            current: Mutex::new(None),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// None until the first `reload`, and again after `shutdown`.
    pub async fn state(&self) -> Option<MonitorState> {
        self.current.lock().await.as_ref().map(MonitorHandle::state)
    }

    /// Stops the running session, if any, and starts a new one from the store.
    pub async fn reload(&self) -> MonitorState {
        let mut current = self.current.lock().await;

        if let Some(old) = current.take() {
            old.stop().await;
        }

        let handle = self.monitor.start(&self.user_id).await;
        let state = handle.state();
        *current = Some(handle);
        state
    }

    pub async fn shutdown(&self) {
        if let Some(old) = self.current.lock().await.take() {
            old.stop().await;
        }
    }
}
