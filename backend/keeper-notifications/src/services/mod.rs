pub mod amqp;
pub mod broker;
pub mod dispatcher;
pub mod notifier;
pub mod rabbitmq_consumer;
pub mod worker;

pub use amqp::*;
pub use broker::*;
pub use dispatcher::*;
pub use notifier::*;
pub use rabbitmq_consumer::*;
pub use worker::*;
