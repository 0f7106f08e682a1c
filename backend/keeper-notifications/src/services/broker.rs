//! Transport seam between the connection manager and the message broker.
//!
//! The connection manager drives these traits through the
//! connect → channel → declare → bind → consume sequence; `AmqpConnector`
//! is the production implementation.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

pub const EXCHANGE_NAME: &str = "keeper.exchange";
pub const NOTIFICATIONS_QUEUE: &str = "keeper.notifications";
pub const ROUTING_KEY: &str = "event.notification.#";

/// Names the subscription is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            exchange: EXCHANGE_NAME.to_string(),
            queue: NOTIFICATIONS_QUEUE.to_string(),
            routing_key: ROUTING_KEY.to_string(),
        }
    }
}

/// Broker failures, keyed by the lifecycle stage that produced them
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("failed to connect to broker: {0}")]
    Connect(String),

    #[error("failed to open a channel: {0}")]
    Channel(String),

    #[error("failed to declare exchange: {0}")]
    ExchangeDeclare(String),

    #[error("failed to declare queue: {0}")]
    QueueDeclare(String),

    #[error("failed to bind queue: {0}")]
    QueueBind(String),

    #[error("failed to register consumer: {0}")]
    Consume(String),

    #[error("delivery stream error: {0}")]
    Delivery(String),
}

/// Raw message bodies in broker delivery order
pub type DeliveryStream = BoxStream<'static, Result<Vec<u8>, BrokerError>>;

#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, BrokerError>;
}

#[async_trait]
pub trait BrokerConnection: Send + Sync {
    async fn open_channel(&self) -> Result<Box<dyn BrokerChannel>, BrokerError>;

    /// Best-effort close
    async fn close(&self) -> Result<(), BrokerError>;
}

/// A logical channel. Declarations are idempotent: re-declaring with the
/// same properties is a no-op on the broker.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Durable topic exchange
    async fn declare_exchange(&self, exchange: &str) -> Result<(), BrokerError>;

    /// Durable, non-exclusive, non-auto-delete queue
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError>;

    /// Start an auto-acknowledged consumer on `queue`
    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError>;

    /// Best-effort close
    async fn close(&self) -> Result<(), BrokerError>;
}
