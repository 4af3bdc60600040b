pub mod db_init;
pub mod finnhub;
pub mod market_data;

pub mod alerts_service;
pub mod clock;
pub mod evaluator;
pub mod notifier;
pub mod alert_monitor;
