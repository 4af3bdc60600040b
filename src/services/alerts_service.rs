use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::{Collection, Database};
use tokio::sync::RwLock;

use crate::{
    error::AlertError,
    models::{Alert, AlertDocument, NewAlert},
};

pub const ALERTS_COLLECTION: &str = "alerts";

/// Persistence for alert records.
///
/// Reads degrade to "no alerts" and cooldown writes are best-effort, so the
/// monitor never has to handle a store outage. `create`, `delete` and
/// `set_active` are explicit user actions and do report `StoreUnavailable`.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn create(&self, alert: NewAlert) -> Result<Alert, AlertError>;

    /// All alerts owned by `user_id`, active and inactive, in no particular order.
    async fn list_by_user(&self, user_id: &str) -> Vec<Alert>;

    /// Deleting an id that does not exist is not an error.
    async fn delete(&self, id: &str) -> Result<(), AlertError>;

    /// Returns false when no alert has this id.
    async fn set_active(&self, id: &str, active: bool) -> Result<bool, AlertError>;

    /// Moves `last_triggered_at` forward to `at`; never backwards. Failures are logged.
    async fn update_last_triggered(&self, id: &str, at: i64);
}

#[derive(Clone)]
pub struct MongoAlertStore {
    db: Database,
}

impl MongoAlertStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn raw(&self) -> Collection<Document> {
        self.db.collection::<Document>(ALERTS_COLLECTION)
    }

    async fn try_list(&self, user_id: &str) -> Result<Vec<Alert>, AlertError> {
        let mut cursor = self.raw().find(doc! { "user_id": user_id }, None).await?;

        let mut raw: Vec<Document> = Vec::new();
        while let Some(res) = cursor.next().await {
            raw.push(res?);
        }

        Ok(decode_alerts(raw))
    }
}

/// Converts raw `alerts` documents, dropping (and logging) any that don't
/// describe a valid alert so one bad record can't hide the rest.
pub fn decode_alerts(docs: impl IntoIterator<Item = Document>) -> Vec<Alert> {
    docs.into_iter()
        .filter_map(|raw| {
            let id = raw.get_object_id("_id").map(|id| id.to_hex()).unwrap_or_default();
            let decoded = bson::from_document::<AlertDocument>(raw)
                .map_err(|e| AlertError::malformed(e.to_string()))
                .and_then(Alert::try_from);

            match decoded {
                Ok(a) => Some(a),
                Err(e) => {
                    tracing::warn!(alert_id = %id, error = %e, "skipping stored alert");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn create(&self, alert: NewAlert) -> Result<Alert, AlertError> {
        let id = ObjectId::new();
        let document = AlertDocument::from_new(id, &alert);

        self.db
            .collection::<AlertDocument>(ALERTS_COLLECTION)
            .insert_one(&document, None)
            .await?;

        Ok(Alert::from_new(id.to_hex(), alert))
    }

    async fn list_by_user(&self, user_id: &str) -> Vec<Alert> {
        match self.try_list(user_id).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "listing alerts failed, returning none");
                Vec::new()
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<(), AlertError> {
        // an id that can't be an ObjectId can't exist either
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(());
        };

        self.raw().delete_one(doc! { "_id": oid }, None).await?;
        Ok(())
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<bool, AlertError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(false);
        };

        let res = self
            .raw()
            .update_one(doc! { "_id": oid }, doc! { "$set": { "is_active": active } }, None)
            .await?;

        Ok(res.matched_count > 0)
    }

    async fn update_last_triggered(&self, id: &str, at: i64) {
        let Ok(oid) = ObjectId::parse_str(id) else {
            tracing::warn!(alert_id = id, "cooldown write skipped: invalid id");
            return;
        };

        let res = self
            .raw()
            .update_one(doc! { "_id": oid }, doc! { "$max": { "last_triggered_at": at } }, None)
            .await;

        if let Err(e) = res {
            tracing::warn!(alert_id = id, error = %e, "cooldown write failed");
        }
    }
}

/// In-process store. Used with `ALERT_STORE=memory` and throughout the tests.
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<HashMap<String, Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<Alert> {
        self.alerts.read().await.get(id).cloned()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn create(&self, alert: NewAlert) -> Result<Alert, AlertError> {
        let stored = Alert::from_new(ObjectId::new().to_hex(), alert);
        self.alerts
            .write()
            .await
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn list_by_user(&self, user_id: &str) -> Vec<Alert> {
        self.alerts
            .read()
            .await
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn delete(&self, id: &str) -> Result<(), AlertError> {
        self.alerts.write().await.remove(id);
        Ok(())
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<bool, AlertError> {
        match self.alerts.write().await.get_mut(id) {
            Some(a) => {
                a.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_last_triggered(&self, id: &str, at: i64) {
        match self.alerts.write().await.get_mut(id) {
            Some(a) => {
                a.last_triggered_at = Some(a.last_triggered_at.map_or(at, |prev| prev.max(at)));
            }
            None => tracing::warn!(alert_id = id, "cooldown write skipped: unknown alert"),
        }
    }
}
