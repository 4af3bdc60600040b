use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use marketalerts::{
    config::{self, StoreBackend},
    routes,
    services::{
        alert_monitor::{AlertMonitor, MonitorSession},
        alerts_service::{AlertStore, MemoryAlertStore, MongoAlertStore},
        clock::{Clock, SystemClock},
        db_init,
        evaluator::Evaluator,
        finnhub::FinnhubClient,
        market_data::CachedProvider,
        notifier::{BroadcastSurface, Dispatcher},
    },
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    let store: Arc<dyn AlertStore> = match settings.store_backend {
        StoreBackend::Memory => {
            tracing::info!("using in-memory alert store");
            Arc::new(MemoryAlertStore::new())
        }
        StoreBackend::Mongo => {
            let db = db_init::connect(&settings.mongodb_uri, &settings.mongodb_db)
                .await
                .expect("Failed to configure MongoDB client");

            // the store degrades on its own if mongo is down; don't refuse to start
            if let Err(e) = db_init::ensure_indexes(&db).await {
                tracing::warn!(error = %e, "could not ensure indexes");
            }
            Arc::new(MongoAlertStore::new(db))
        }
    };

    let (notifications, _) = broadcast::channel(64);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let provider = CachedProvider::new(
        FinnhubClient::new(settings.finnhub_api_key.clone()),
        settings.quote_cache_ttl(),
    );
    let dispatcher = Dispatcher::new(store.clone(), Arc::new(BroadcastSurface::new(notifications.clone())))
        .with_cooldown_ms(settings.cooldown_window_ms());

    let monitor = Arc::new(
        AlertMonitor::new(store.clone(), Arc::new(provider), Arc::new(dispatcher), clock.clone())
            .with_evaluator(Evaluator::new(settings.reference_avg_volume))
            .with_settings(settings.monitor_settings()),
    );
    let session = Arc::new(MonitorSession::new(monitor, settings.monitor_user_id.clone()));
    session.reload().await;

    let state = AppState {
        settings: settings.clone(),
        store,
        clock,
        notifications,
        monitor: session.clone(),
    };
    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<IpAddr>()
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    session.shutdown().await;
}
