#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use keeper_notifications::{
    BrokerChannel, BrokerConnection, BrokerConnector, BrokerError, DeliveryError, DeliveryStream,
    Notifier, ProviderReceipt,
};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::fmt::MakeWriter;

pub const VALID_BODY: &str = r#"{"recipientUsername":"alice","senderUsername":"bob","messageContent":"hi","roomId":42,"fcmToken":"tok123"}"#;
pub const EMPTY_TOKEN_BODY: &str = r#"{"recipientUsername":"alice","senderUsername":"bob","messageContent":"hi","roomId":42,"fcmToken":""}"#;
pub const TRUNCATED_BODY: &str = r#"{"recipientUsername":"alice""#;

pub fn body_for(token: &str, content: &str) -> Vec<u8> {
    serde_json::json!({
        "recipientUsername": "alice",
        "senderUsername": "bob",
        "messageContent": content,
        "roomId": 42,
        "fcmToken": token,
    })
    .to_string()
    .into_bytes()
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPush {
    pub token: String,
    pub title: String,
    pub body: String,
}

/// Records every push; fails them all when `failing` is set
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentPush>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        })
    }

    pub fn sent(&self) -> Vec<SentPush> {
        self.sent.lock().unwrap().clone()
    }

    /// Poll until at least `count` pushes were attempted
    pub async fn wait_for(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(60), async {
            while self.sent.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("notifier was not called in time");
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
    ) -> Result<ProviderReceipt, DeliveryError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentPush {
            token: token.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });

        if self.failing {
            return Err(DeliveryError::Provider(
                "FCM API error: 503 Service Unavailable - backend down".to_string(),
            ));
        }

        Ok(ProviderReceipt {
            message_id: format!("projects/keeper-test/messages/{}", sent.len()),
        })
    }
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Channel,
    Exchange,
    Queue,
    Bind,
    Consume,
}

/// Bodies a session delivers, and whether the stream then closes
/// (broker dropped) or stays open forever.
struct ScriptedSession {
    bodies: Vec<Vec<u8>>,
    closes: bool,
}

#[derive(Default)]
struct BrokerState {
    connect_failures: usize,
    stage_failures: VecDeque<Stage>,
    sessions: VecDeque<ScriptedSession>,
    connect_attempts: Vec<Instant>,
    operations: Vec<String>,
    connections_closed: usize,
    channels_closed: usize,
}

/// Scripted in-memory broker
#[derive(Clone, Default)]
pub struct FakeBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` connect attempts are refused
    pub fn refuse_connections(self, count: usize) -> Self {
        self.state.lock().unwrap().connect_failures = count;
        self
    }

    /// Refuse every connect attempt
    pub fn unreachable(self) -> Self {
        self.refuse_connections(usize::MAX)
    }

    /// Fail at `stage` on the next session that reaches it
    pub fn fail_at(self, stage: Stage) -> Self {
        self.state.lock().unwrap().stage_failures.push_back(stage);
        self
    }

    /// Next subscribed session delivers `bodies` and then stays open
    pub fn session(self, bodies: Vec<Vec<u8>>) -> Self {
        self.state
            .lock()
            .unwrap()
            .sessions
            .push_back(ScriptedSession {
                bodies,
                closes: false,
            });
        self
    }

    /// Next subscribed session delivers `bodies` and then drops
    pub fn dropped_session(self, bodies: Vec<Vec<u8>>) -> Self {
        self.state
            .lock()
            .unwrap()
            .sessions
            .push_back(ScriptedSession {
                bodies,
                closes: true,
            });
        self
    }

    pub fn connect_attempts(&self) -> Vec<Instant> {
        self.state.lock().unwrap().connect_attempts.clone()
    }

    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn connections_closed(&self) -> usize {
        self.state.lock().unwrap().connections_closed
    }

    pub fn channels_closed(&self) -> usize {
        self.state.lock().unwrap().channels_closed
    }

    fn check(&self, stage: Stage, err: fn(String) -> BrokerError) -> Result<(), BrokerError> {
        let mut state = self.state.lock().unwrap();
        if state.stage_failures.front() == Some(&stage) {
            state.stage_failures.pop_front();
            return Err(err(format!("{:?} refused by fake broker", stage)));
        }
        Ok(())
    }

    fn record(&self, operation: String) {
        self.state.lock().unwrap().operations.push(operation);
    }
}

#[async_trait]
impl BrokerConnector for FakeBroker {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, BrokerError> {
        let mut state = self.state.lock().unwrap();
        state.connect_attempts.push(Instant::now());
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(BrokerError::Connect("connection refused".to_string()));
        }
        state.operations.push("connect".to_string());
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl BrokerConnection for FakeBroker {
    async fn open_channel(&self) -> Result<Box<dyn BrokerChannel>, BrokerError> {
        self.check(Stage::Channel, BrokerError::Channel)?;
        self.record("open_channel".to_string());
        Ok(Box::new(FakeChannel {
            broker: self.clone(),
        }))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.state.lock().unwrap().connections_closed += 1;
        Err(BrokerError::Connect(
            "close errors are ignored".to_string(),
        ))
    }
}

pub struct FakeChannel {
    broker: FakeBroker,
}

#[async_trait]
impl BrokerChannel for FakeChannel {
    async fn declare_exchange(&self, exchange: &str) -> Result<(), BrokerError> {
        self.broker
            .check(Stage::Exchange, BrokerError::ExchangeDeclare)?;
        self.broker.record(format!("declare_exchange {}", exchange));
        Ok(())
    }

    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.broker.check(Stage::Queue, BrokerError::QueueDeclare)?;
        self.broker.record(format!("declare_queue {}", queue));
        Ok(())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError> {
        self.broker.check(Stage::Bind, BrokerError::QueueBind)?;
        self.broker
            .record(format!("bind {} {} {}", queue, exchange, routing_key));
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError> {
        self.broker.check(Stage::Consume, BrokerError::Consume)?;
        self.broker.record(format!("consume {}", queue));

        let session = self
            .broker
            .state
            .lock()
            .unwrap()
            .sessions
            .pop_front()
            .unwrap_or(ScriptedSession {
                bodies: Vec::new(),
                closes: false,
            });

        let deliveries = stream::iter(session.bodies.into_iter().map(Ok::<_, BrokerError>));
        if session.closes {
            Ok(deliveries.boxed())
        } else {
            Ok(deliveries.chain(stream::pending()).boxed())
        }
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.broker.state.lock().unwrap().channels_closed += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// In-memory sink for formatted tracing output
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
