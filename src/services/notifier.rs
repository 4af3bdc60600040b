use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use tokio::{sync::broadcast, task::JoinHandle};

use crate::{
    models::{Alert, FiringEvent, Notification},
    services::alerts_service::AlertStore,
};

/// Minimum time between two notifications for the same alert.
pub const COOLDOWN_WINDOW_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Fired,
    Suppressed,
}

/// Where notifications are shown. Fire-and-forget.
pub trait NotificationSurface: Send + Sync {
    fn show(&self, notification: &Notification);
}

/// Fans notifications out to every open `/events` stream.
#[derive(Clone)]
pub struct BroadcastSurface {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastSurface {
    pub fn new(tx: broadcast::Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl NotificationSurface for BroadcastSurface {
    fn show(&self, n: &Notification) {
        tracing::info!(alert_id = %n.alert_id, symbol = %n.symbol, "{}", n.message);
        // no subscribers is fine
        let _ = self.tx.send(n.clone());
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shows a notification for each firing that is outside its cooldown window
/// and records the firing time.
///
/// The stored `last_triggered_at` is written in the background and may lag or
/// be lost. The dispatcher therefore also keeps its own record of when each
/// alert last fired, checked and updated under a single lock, so within one
/// process an alert notifies at most once per window no matter how ticks
/// interleave or whether the store write landed. A lost write is only
/// visible to a fresh dispatcher (e.g. after a restart), which may fire once
/// more inside the window.
pub struct Dispatcher {
    store: Arc<dyn AlertStore>,
    surface: Arc<dyn NotificationSurface>,
    cooldown_ms: i64,
    fired: Mutex<HashMap<String, i64>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn AlertStore>, surface: Arc<dyn NotificationSurface>) -> Self {
        Self {
            store,
            surface,
            cooldown_ms: COOLDOWN_WINDOW_MS,
            fired: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn with_cooldown_ms(mut self, cooldown_ms: i64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Must run inside a Tokio runtime; the cooldown write is spawned onto it.
    pub fn dispatch(&self, alert: &Alert, event: &FiringEvent, now: i64) -> DispatchOutcome {
        {
            let mut fired = lock(&self.fired);
            let last = alert.last_triggered_at.max(fired.get(&alert.id).copied());

            if let Some(last) = last {
                if now - last < self.cooldown_ms {
                    tracing::debug!(alert_id = %alert.id, last, now, "firing suppressed by cooldown");
                    return DispatchOutcome::Suppressed;
                }
            }

            fired.insert(alert.id.clone(), now);
        }

        let notification = Notification {
            alert_id: alert.id.clone(),
            symbol: event.symbol.clone(),
            message: event.message.clone(),
            description: DateTime::<Utc>::from_timestamp_millis(now)
                .map(|t| t.format("Triggered at %H:%M:%S UTC").to_string())
                .unwrap_or_default(),
            action_ref: format!("/stocks/{}", event.symbol),
            triggered_at: now,
        };
        self.surface.show(&notification);

        let store = Arc::clone(&self.store);
        let id = alert.id.clone();
        let write = tokio::spawn(async move {
            store.update_last_triggered(&id, now).await;
        });

        let mut pending = lock(&self.pending);
        pending.retain(|h| !h.is_finished());
        pending.push(write);

        DispatchOutcome::Fired
    }

    /// Waits for every cooldown write spawned so far.
    pub async fn flush(&self) {
        let writes = std::mem::take(&mut *lock(&self.pending));
        for w in writes {
            if let Err(e) = w.await {
                tracing::warn!(error = %e, "cooldown write task failed");
            }
        }
    }
}
