use serde::Serialize;

/// Produced by the evaluator when an alert's condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiringEvent {
    pub alert_id: String,
    pub symbol: String,
    pub message: String,
}

/// What the user actually sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub alert_id: String,
    pub symbol: String,
    pub message: String,
    pub description: String,
    // link to the symbol's detail view
    pub action_ref: String,
    pub triggered_at: i64,
}
