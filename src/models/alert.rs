use std::fmt;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::AlertError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    PriceAbove,
    PriceBelow,
    PercentChange,
    SentimentChange,
    VolumeSpike,
}

/// Direction a sentiment alert waits for. Persisted as +1 / -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentDirection {
    Bullish,
    Bearish,
}

impl SentimentDirection {
    pub fn from_target(value: f64) -> Option<Self> {
        if value == 1.0 {
            Some(SentimentDirection::Bullish)
        } else if value == -1.0 {
            Some(SentimentDirection::Bearish)
        } else {
            None
        }
    }

    pub fn target_value(self) -> f64 {
        match self {
            SentimentDirection::Bullish => 1.0,
            SentimentDirection::Bearish => -1.0,
        }
    }
}

impl fmt::Display for SentimentDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentDirection::Bullish => f.write_str("Bullish"),
            SentimentDirection::Bearish => f.write_str("Bearish"),
        }
    }
}

/// The condition an alert watches for. Each kind carries only the fields it
/// needs, so a percent alert without a baseline cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Trigger {
    PriceAbove { target_price: f64 },
    PriceBelow { target_price: f64 },
    PercentChange { percent: f64, initial_price: f64 },
    SentimentChange { direction: SentimentDirection },
    VolumeSpike { multiplier: f64 },
}

impl Trigger {
    /// Builds a trigger from the flat `(type, targetValue, initialPrice)` shape
    /// used by stored documents and the create-alert form.
    pub fn from_parts(
        kind: AlertKind,
        target_value: f64,
        initial_price: Option<f64>,
    ) -> Result<Trigger, AlertError> {
        if !target_value.is_finite() {
            return Err(AlertError::malformed("target value must be a finite number"));
        }

        match kind {
            AlertKind::PriceAbove | AlertKind::PriceBelow => {
                if target_value <= 0.0 {
                    return Err(AlertError::malformed("target price must be > 0"));
                }
                Ok(if kind == AlertKind::PriceAbove {
                    Trigger::PriceAbove { target_price: target_value }
                } else {
                    Trigger::PriceBelow { target_price: target_value }
                })
            }
            AlertKind::PercentChange => {
                let initial_price = initial_price
                    .ok_or_else(|| AlertError::malformed("percent change alert needs an initial price"))?;
                if !initial_price.is_finite() || initial_price == 0.0 {
                    return Err(AlertError::malformed("initial price must be finite and non-zero"));
                }
                if target_value == 0.0 {
                    return Err(AlertError::malformed("percent change threshold must be non-zero"));
                }
                Ok(Trigger::PercentChange {
                    percent: target_value,
                    initial_price,
                })
            }
            AlertKind::SentimentChange => SentimentDirection::from_target(target_value)
                .map(|direction| Trigger::SentimentChange { direction })
                .ok_or_else(|| AlertError::malformed("sentiment target must be +1 or -1")),
            AlertKind::VolumeSpike => {
                if target_value <= 0.0 {
                    return Err(AlertError::malformed("volume multiplier must be > 0"));
                }
                Ok(Trigger::VolumeSpike {
                    multiplier: target_value,
                })
            }
        }
    }

    pub fn kind(&self) -> AlertKind {
        match self {
            Trigger::PriceAbove { .. } => AlertKind::PriceAbove,
            Trigger::PriceBelow { .. } => AlertKind::PriceBelow,
            Trigger::PercentChange { .. } => AlertKind::PercentChange,
            Trigger::SentimentChange { .. } => AlertKind::SentimentChange,
            Trigger::VolumeSpike { .. } => AlertKind::VolumeSpike,
        }
    }

    pub fn target_value(&self) -> f64 {
        match *self {
            Trigger::PriceAbove { target_price } | Trigger::PriceBelow { target_price } => target_price,
            Trigger::PercentChange { percent, .. } => percent,
            Trigger::SentimentChange { direction } => direction.target_value(),
            Trigger::VolumeSpike { multiplier } => multiplier,
        }
    }

    pub fn initial_price(&self) -> Option<f64> {
        match *self {
            Trigger::PercentChange { initial_price, .. } => Some(initial_price),
            _ => None,
        }
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub user_id: String,
    pub symbol: String,

    #[serde(flatten)]
    pub trigger: Trigger,

    pub is_active: bool,

    // epoch millis
    pub created_at: i64,
    pub last_triggered_at: Option<i64>,
}

impl Alert {
    pub fn from_new(id: String, new: NewAlert) -> Alert {
        Alert {
            id,
            user_id: new.user_id,
            symbol: new.symbol,
            trigger: new.trigger,
            is_active: true,
            created_at: new.created_at,
            last_triggered_at: None,
        }
    }
}

/// An alert that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub user_id: String,
    pub symbol: String,
    pub trigger: Trigger,
    pub created_at: i64,
}

impl NewAlert {
    pub fn new(
        user_id: impl Into<String>,
        symbol: &str,
        trigger: Trigger,
        created_at: i64,
    ) -> Result<NewAlert, AlertError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(AlertError::malformed("alert must have an owner"));
        }

        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(AlertError::malformed("symbol cannot be empty"));
        }

        Ok(NewAlert {
            user_id,
            symbol,
            trigger,
            created_at,
        })
    }
}

/// Flat form stored in the `alerts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: String,
    pub symbol: String,

    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub target_value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_price: Option<f64>,

    pub is_active: bool,
    pub created_at: i64,

    #[serde(default)]
    pub last_triggered_at: Option<i64>,
}

impl AlertDocument {
    pub fn from_new(id: ObjectId, new: &NewAlert) -> AlertDocument {
        AlertDocument {
            id,
            user_id: new.user_id.clone(),
            symbol: new.symbol.clone(),
            kind: new.trigger.kind(),
            target_value: new.trigger.target_value(),
            initial_price: new.trigger.initial_price(),
            is_active: true,
            created_at: new.created_at,
            last_triggered_at: None,
        }
    }
}

impl TryFrom<AlertDocument> for Alert {
    type Error = AlertError;

    fn try_from(doc: AlertDocument) -> Result<Alert, AlertError> {
        let trigger = Trigger::from_parts(doc.kind, doc.target_value, doc.initial_price)
            .map_err(|e| AlertError::malformed(format!("alert {}: {}", doc.id.to_hex(), e)))?;

        Ok(Alert {
            id: doc.id.to_hex(),
            user_id: doc.user_id,
            symbol: normalize_symbol(&doc.symbol),
            trigger,
            is_active: doc.is_active,
            created_at: doc.created_at,
            last_triggered_at: doc.last_triggered_at,
        })
    }
}
