//! RabbitMQ transport built on `lapin`, driven by the tokio runtime.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};

use super::broker::{
    BrokerChannel, BrokerConnection, BrokerConnector, BrokerError, DeliveryStream,
};

const REPLY_SUCCESS: u16 = 200;

/// Connects to RabbitMQ at an `amqp://` URL
#[derive(Debug, Clone)]
pub struct AmqpConnector {
    url: String,
}

impl AmqpConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl BrokerConnector for AmqpConnector {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, BrokerError> {
        let properties = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);

        let connection = Connection::connect(&self.url, properties)
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        Ok(Box::new(AmqpConnection { connection }))
    }
}

struct AmqpConnection {
    connection: Connection,
}

#[async_trait]
impl BrokerConnection for AmqpConnection {
    async fn open_channel(&self) -> Result<Box<dyn BrokerChannel>, BrokerError> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Channel(e.to_string()))?;

        Ok(Box::new(AmqpChannel { channel }))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.connection
            .close(REPLY_SUCCESS, "consumer shutting down")
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))
    }
}

struct AmqpChannel {
    channel: Channel,
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    async fn declare_exchange(&self, exchange: &str) -> Result<(), BrokerError> {
        self.channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    internal: false,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::ExchangeDeclare(e.to_string()))
    }

    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map(|_| ())
            .map_err(|e| BrokerError::QueueDeclare(e.to_string()))
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::QueueBind(e.to_string()))
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError> {
        // Empty tag: the broker generates one.
        let consumer = self
            .channel
            .basic_consume(
                queue,
                "",
                BasicConsumeOptions {
                    no_ack: true,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;

        Ok(consumer
            .map(|delivery| {
                delivery
                    .map(|delivery| delivery.data)
                    .map_err(|e| BrokerError::Delivery(e.to_string()))
            })
            .boxed())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.channel
            .close(REPLY_SUCCESS, "consumer shutting down")
            .await
            .map_err(|e| BrokerError::Channel(e.to_string()))
    }
}
