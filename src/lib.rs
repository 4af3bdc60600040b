//! Library entrypoint for market-alerts.
//!
//! The monitoring engine lives in `services`; `controllers` and `routes` are
//! the HTTP surface the front end talks to. Integration tests under `tests/`
//! import everything from here.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

pub mod services;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: Arc<dyn services::alerts_service::AlertStore>,
    pub clock: Arc<dyn services::clock::Clock>,
    pub notifications: tokio::sync::broadcast::Sender<models::Notification>,
    pub monitor: Arc<services::alert_monitor::MonitorSession>,
}
