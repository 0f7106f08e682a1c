//! RabbitMQ subscription lifecycle.
//!
//! `ConnectionManager` owns the broker connection and walks it through
//! disconnected → connecting → subscribed, feeding every delivered body to
//! the dispatcher one at a time. Any channel or topology failure tears the
//! whole session down and reconnects; only a failed connect waits the fixed
//! delay. Only shutdown ends the loop.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use super::broker::{BrokerChannel, BrokerConnection, BrokerConnector, BrokerError, Topology};
use super::dispatcher::NotificationDispatcher;
use crate::models::ConnectionState;
use crate::shutdown::{is_shutdown, until_shutdown, ShutdownReceiver};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How a connected session ended
#[derive(Debug)]
enum SessionEnd {
    Shutdown,
    /// Delivery stream closed under us; reconnect right away
    StreamEnded,
    /// Channel or topology step failed; session released, reconnect right away
    Failed(BrokerError),
}

pub struct ConnectionManager {
    connector: Arc<dyn BrokerConnector>,
    dispatcher: NotificationDispatcher,
    topology: Topology,
    reconnect_delay: Duration,
    state: ConnectionState,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn BrokerConnector>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            connector,
            dispatcher,
            topology: Topology::default(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consume until shutdown. Never returns early on broker failures.
    pub async fn run(&mut self, mut shutdown: ShutdownReceiver) {
        tracing::info!(
            exchange = %self.topology.exchange,
            queue = %self.topology.queue,
            routing_key = %self.topology.routing_key,
            "starting rabbitmq consumer"
        );

        while !is_shutdown(&shutdown) {
            self.transition(ConnectionState::Connecting);

            let connection = match until_shutdown(&mut shutdown, self.connector.connect()).await {
                None => break,
                Some(Ok(connection)) => connection,
                Some(Err(e)) => {
                    tracing::error!(
                        error = %e,
                        retry_in_secs = self.reconnect_delay.as_secs(),
                        "failed to connect to rabbitmq, retrying"
                    );
                    self.transition(ConnectionState::Disconnected);
                    if !self.backoff(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            let end = self.run_session(connection.as_ref(), &mut shutdown).await;
            if let Err(e) = connection.close().await {
                tracing::debug!(error = %e, "error closing rabbitmq connection");
            }
            self.transition(ConnectionState::Disconnected);

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::StreamEnded => {
                    tracing::warn!("rabbitmq delivery stream closed, reconnecting");
                }
                SessionEnd::Failed(e) => {
                    tracing::error!(error = %e, "rabbitmq session setup failed, reconnecting");
                }
            }
        }

        self.transition(ConnectionState::Stopped);
        tracing::info!("context cancelled, stopping consumer");
    }

    /// Channel lifetime is scoped to this call; it is closed on every exit.
    async fn run_session(
        &mut self,
        connection: &dyn BrokerConnection,
        shutdown: &mut ShutdownReceiver,
    ) -> SessionEnd {
        let channel = match until_shutdown(shutdown, connection.open_channel()).await {
            None => return SessionEnd::Shutdown,
            Some(Err(e)) => return SessionEnd::Failed(e),
            Some(Ok(channel)) => channel,
        };

        let end = self.consume(channel.as_ref(), shutdown).await;
        if let Err(e) = channel.close().await {
            tracing::debug!(error = %e, "error closing rabbitmq channel");
        }
        end
    }

    async fn consume(
        &mut self,
        channel: &dyn BrokerChannel,
        shutdown: &mut ShutdownReceiver,
    ) -> SessionEnd {
        let topology = self.topology.clone();

        macro_rules! step {
            ($op:expr) => {
                match until_shutdown(shutdown, $op).await {
                    None => return SessionEnd::Shutdown,
                    Some(Err(e)) => return SessionEnd::Failed(e),
                    Some(Ok(value)) => value,
                }
            };
        }

        step!(channel.declare_exchange(&topology.exchange));
        step!(channel.declare_queue(&topology.queue));
        step!(channel.bind_queue(&topology.queue, &topology.exchange, &topology.routing_key));
        let mut deliveries = step!(channel.consume(&topology.queue));

        self.transition(ConnectionState::Subscribed);
        tracing::info!("rabbitmq consumer connected and waiting for messages");

        loop {
            match until_shutdown(shutdown, deliveries.next()).await {
                None => return SessionEnd::Shutdown,
                Some(None) => return SessionEnd::StreamEnded,
                Some(Some(Err(e))) => {
                    tracing::warn!(error = %e, "rabbitmq delivery failed");
                    return SessionEnd::StreamEnded;
                }
                Some(Some(Ok(body))) => {
                    self.dispatcher.handle(&body).await;
                }
            }
        }
    }

    /// Sleep the reconnect delay. `false` if shutdown cut it short.
    async fn backoff(&self, shutdown: &mut ShutdownReceiver) -> bool {
        until_shutdown(shutdown, tokio::time::sleep(self.reconnect_delay))
            .await
            .is_some()
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "rabbitmq consumer state change");
            self.state = next;
        }
    }
}
