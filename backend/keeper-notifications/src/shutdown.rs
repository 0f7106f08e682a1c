//! Process-wide shutdown flag.
//!
//! A `watch::channel(false)` flipped to `true` exactly once. A dropped
//! sender counts as shutdown: nobody is left to keep the process alive.

use std::future::Future;
use tokio::sync::watch;

pub type ShutdownSender = watch::Sender<bool>;
pub type ShutdownReceiver = watch::Receiver<bool>;

pub fn channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

pub fn is_shutdown(rx: &ShutdownReceiver) -> bool {
    *rx.borrow() || rx.has_changed().is_err()
}

/// Resolves once shutdown has been requested
pub async fn wait_for_shutdown(rx: &mut ShutdownReceiver) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

/// Drive `fut` unless shutdown arrives first, in which case `None`.
/// Shutdown wins when both are ready.
pub async fn until_shutdown<F>(rx: &mut ShutdownReceiver, fut: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = wait_for_shutdown(rx) => None,
        output = fut => Some(output),
    }
}

/// Wait for SIGINT or SIGTERM
pub async fn signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, listening for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Flip the shutdown flag when the process receives SIGINT or SIGTERM
pub fn install_signal_handler(tx: ShutdownSender) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        signal().await;
        tx.send_replace(true);
    })
}
