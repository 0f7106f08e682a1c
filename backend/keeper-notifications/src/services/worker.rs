use tokio::task::JoinHandle;

use super::rabbitmq_consumer::ConnectionManager;
use crate::shutdown::ShutdownReceiver;

/// Background task running a `ConnectionManager` until shutdown.
///
/// The task is owned, not detached: call `join` during shutdown so the
/// consumer loop never outlives the process.
pub struct ConsumerWorker {
    handle: JoinHandle<ConnectionManager>,
}

impl ConsumerWorker {
    pub fn spawn(mut manager: ConnectionManager, shutdown: ShutdownReceiver) -> Self {
        let handle = tokio::spawn(async move {
            manager.run(shutdown).await;
            manager
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the consumer loop to stop, handing the manager back.
    /// `None` if the task panicked or was aborted.
    pub async fn join(self) -> Option<ConnectionManager> {
        match self.handle.await {
            Ok(manager) => {
                tracing::info!("rabbitmq consumer stopped");
                Some(manager)
            }
            Err(e) => {
                tracing::error!(error = %e, "rabbitmq consumer task failed");
                None
            }
        }
    }
}
