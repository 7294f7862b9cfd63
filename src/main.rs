use social_realtime::{
    config::Config,
    prelude::*,
    routes::{self, AppState},
    telemetry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    telemetry::init(config.log_json);

    info!("social-realtime v{} starting", env!("CARGO_PKG_VERSION"));

    let registry = Arc::new(ConnectionRegistry::new());
    let hub = NotificationHub::new(registry);
    let store: Arc<dyn NotificationStore> = Arc::new(InMemoryNotificationStore::new());
    let notifier = Notifier::new(hub.clone(), Arc::clone(&store), config.push_format);

    let app = routes::router(AppState::new(hub, store, notifier));

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(push_format = ?config.push_format, "Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
