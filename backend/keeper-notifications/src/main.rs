use keeper_notifications::{
    shutdown, AmqpConnector, Config, ConnectionManager, ConsumerWorker, FcmNotifier,
    NotificationDispatcher, Result,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,lapin=warn".into());

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "failed to initialize notification service");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    tracing::info!(
        app_env = %config.app_env,
        port = %config.port,
        "configuration loaded"
    );

    let notifier = FcmNotifier::from_credentials_file(&config.fcm_credentials_file_path)?;

    let (shutdown_tx, mut shutdown_rx) = shutdown::channel();
    let signal_handle = shutdown::install_signal_handler(shutdown_tx);

    let dispatcher = NotificationDispatcher::new(Arc::new(notifier));
    let manager = ConnectionManager::new(
        Arc::new(AmqpConnector::new(config.rabbitmq_url.clone())),
        dispatcher,
    )
    .with_reconnect_delay(config.reconnect_delay());
    let worker = ConsumerWorker::spawn(manager, shutdown_rx.clone());

    tracing::info!("notification service started. awaiting events.");

    shutdown::wait_for_shutdown(&mut shutdown_rx).await;
    tracing::info!("shutdown signal received, terminating service.");

    worker.join().await;
    signal_handle.abort();
    Ok(())
}
