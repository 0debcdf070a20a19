//! In-memory broker for testing and single-process scenarios.
//!
//! [`InMemoryBroker`] implements every broker capability trait without any
//! network I/O. It is useful for:
//! - Unit and integration testing of code that sends messages
//! - Checking that resources are opened and closed in the right order
//! - Simulating broker failures at a chosen step
//!
//! Every open and close is appended to a lifecycle log, and every
//! transmitted message is kept together with the producer settings it was
//! sent with.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{
    AcknowledgeMode, Close, Connection, ConnectionFactory, DeliveryMode, Message, Producer,
    Session,
};
use crate::error::{BrokerError, Resource};

/// A broker operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    OpenConnection,
    OpenSession,
    CreateDestination,
    CreateProducer,
    SetDeliveryMode,
    SetTimeToLive,
    CreateMessage,
    SetProperty,
    Send,
    CloseConnection,
    CloseSession,
    CloseProducer,
}

impl Fault {
    fn error(self) -> BrokerError {
        match self {
            Fault::OpenConnection => BrokerError::ConnectionFailed("broker unavailable".into()),
            Fault::CreateDestination => {
                BrokerError::InvalidDestination("unknown destination".into())
            }
            other => BrokerError::Rejected(format!("{:?} failed", other)),
        }
    }
}

/// Identity of a handle handed out by an [`InMemoryBroker`].
///
/// `handle` is unique per broker. `connection` is the handle of the
/// connection it was created under, so a connection's own id has
/// `connection == handle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId {
    pub connection: u64,
    pub handle: u64,
}

/// A resource open or close, in the order the broker observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Opened(Resource, HandleId),
    Closed(Resource, HandleId),
}

impl Lifecycle {
    pub fn resource(&self) -> Resource {
        match self {
            Lifecycle::Opened(resource, _) | Lifecycle::Closed(resource, _) => *resource,
        }
    }

    pub fn id(&self) -> HandleId {
        match self {
            Lifecycle::Opened(_, id) | Lifecycle::Closed(_, id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InMemoryDestination {
    Queue(String),
    Topic(String),
}

impl InMemoryDestination {
    pub fn name(&self) -> &str {
        match self {
            InMemoryDestination::Queue(name) | InMemoryDestination::Topic(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Bytes(Vec<u8>),
}

/// A message as it was handed to a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: InMemoryDestination,
    pub body: Body,
    pub properties: BTreeMap<String, String>,
    pub delivery_mode: DeliveryMode,
    pub time_to_live: Option<Duration>,
}

impl SentMessage {
    /// Get the body as text (if it is a text message).
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            Body::Text(text) => Some(text),
            Body::Bytes(_) => None,
        }
    }

    /// Get the body as bytes (if it is a bytes message).
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Bytes(bytes) => Some(bytes),
            Body::Text(_) => None,
        }
    }
}

#[derive(Default)]
struct BrokerState {
    lifecycle: Vec<Lifecycle>,
    sent: Vec<SentMessage>,
    faults: HashSet<Fault>,
    sessions: Vec<(bool, AcknowledgeMode)>,
    next_handle: u64,
}

/// In-memory broker for testing and single-process scenarios.
///
/// Features:
/// - Thread-safe (can be shared across threads via `Clone`)
/// - Records resource opens/closes and sent messages in order
/// - Injectable faults for every broker operation
///
/// ## Example
///
/// ```
/// use broker_sender::{BrokerSender, MessageSender, SenderConfig};
/// use broker_sender::broker::InMemoryBroker;
///
/// let broker = InMemoryBroker::new();
/// let sender = BrokerSender::new(broker.clone(), SenderConfig::new("orders.in").unwrap());
///
/// sender.send_json(r#"{"id":"123"}"#).unwrap();
///
/// let sent = broker.sent();
/// assert_eq!(sent.len(), 1);
/// assert_eq!(sent[0].text(), Some(r#"{"id":"123"}"#));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `fault` fail every time until [`InMemoryBroker::clear_faults`].
    pub fn inject(&self, fault: Fault) {
        self.state().faults.insert(fault);
    }

    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    /// Get every open and close observed so far.
    pub fn lifecycle(&self) -> Vec<Lifecycle> {
        self.state().lifecycle.clone()
    }

    /// Count how many times `resource` was opened.
    pub fn opened(&self, resource: Resource) -> usize {
        self.count(|event| matches!(event, Lifecycle::Opened(r, _) if *r == resource))
    }

    /// Count how many times `resource` was closed.
    pub fn closed(&self, resource: Resource) -> usize {
        self.count(|event| matches!(event, Lifecycle::Closed(r, _) if *r == resource))
    }

    /// Get all transmitted messages.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state().sent.clone()
    }

    /// Get the `(transacted, acknowledge)` settings of every session opened.
    pub fn session_settings(&self) -> Vec<(bool, AcknowledgeMode)> {
        self.state().sessions.clone()
    }

    /// Clear recorded history and faults (useful for test cleanup).
    ///
    /// Handle ids keep counting up, so ids never repeat within one broker.
    pub fn clear(&self) {
        let mut state = self.state();
        state.lifecycle.clear();
        state.sent.clear();
        state.faults.clear();
        state.sessions.clear();
    }

    fn count(&self, predicate: impl Fn(&Lifecycle) -> bool) -> usize {
        self.state()
            .lifecycle
            .iter()
            .filter(|event| predicate(event))
            .count()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, fault: Fault) -> Result<(), BrokerError> {
        if self.state().faults.contains(&fault) {
            Err(fault.error())
        } else {
            Ok(())
        }
    }

    /// Allocate an id for a new handle and record it as opened.
    ///
    /// `connection` is `None` when the handle is itself a connection.
    fn open(&self, resource: Resource, connection: Option<u64>) -> HandleId {
        let mut state = self.state();
        state.next_handle += 1;
        let handle = state.next_handle;
        let id = HandleId {
            connection: connection.unwrap_or(handle),
            handle,
        };
        state.lifecycle.push(Lifecycle::Opened(resource, id));
        id
    }

    fn record(&self, event: Lifecycle) {
        self.state().lifecycle.push(event);
    }
}

#[derive(Clone)]
struct Handle {
    resource: Resource,
    id: HandleId,
    open: Arc<AtomicBool>,
}

impl Handle {
    fn new(resource: Resource, id: HandleId) -> Self {
        Handle {
            resource,
            id,
            open: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Open flags of a handle and every handle it was created from.
#[derive(Clone)]
struct Liveness(Vec<Handle>);

impl Liveness {
    fn root(resource: Resource, id: HandleId) -> Self {
        Liveness(vec![Handle::new(resource, id)])
    }

    fn child(&self, resource: Resource, id: HandleId) -> Self {
        let mut chain = self.0.clone();
        chain.push(Handle::new(resource, id));
        Liveness(chain)
    }

    fn connection(&self) -> Option<u64> {
        self.0.first().map(|handle| handle.id.connection)
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        match self.0.iter().find(|handle| !handle.open.load(Ordering::SeqCst)) {
            Some(handle) => Err(BrokerError::Closed(handle.resource)),
            None => Ok(()),
        }
    }

    /// Mark this handle closed. Returns `None` if it already was.
    fn shut(&self) -> Option<Lifecycle> {
        let handle = self.0.last()?;
        handle
            .open
            .swap(false, Ordering::SeqCst)
            .then(|| Lifecycle::Closed(handle.resource, handle.id))
    }
}

fn close_handle(
    broker: &InMemoryBroker,
    liveness: &Liveness,
    fault: Fault,
) -> Result<(), BrokerError> {
    broker.check(fault)?;
    if let Some(event) = liveness.shut() {
        broker.record(event);
    }
    Ok(())
}

impl ConnectionFactory for InMemoryBroker {
    type Connection = InMemoryConnection;

    fn create_connection(&self) -> Result<InMemoryConnection, BrokerError> {
        self.check(Fault::OpenConnection)?;
        let id = self.open(Resource::Connection, None);
        Ok(InMemoryConnection {
            broker: self.clone(),
            liveness: Liveness::root(Resource::Connection, id),
        })
    }
}

pub struct InMemoryConnection {
    broker: InMemoryBroker,
    liveness: Liveness,
}

impl Connection for InMemoryConnection {
    type Session = InMemorySession;

    fn create_session(
        &self,
        transacted: bool,
        acknowledge: AcknowledgeMode,
    ) -> Result<InMemorySession, BrokerError> {
        self.liveness.ensure_open()?;
        self.broker.check(Fault::OpenSession)?;
        self.broker.state().sessions.push((transacted, acknowledge));
        let id = self
            .broker
            .open(Resource::Session, self.liveness.connection());
        Ok(InMemorySession {
            broker: self.broker.clone(),
            liveness: self.liveness.child(Resource::Session, id),
        })
    }
}

impl Close for InMemoryConnection {
    fn close(&mut self) -> Result<(), BrokerError> {
        close_handle(&self.broker, &self.liveness, Fault::CloseConnection)
    }
}

pub struct InMemorySession {
    broker: InMemoryBroker,
    liveness: Liveness,
}

impl InMemorySession {
    fn create_message(&self, body: Body) -> Result<InMemoryMessage, BrokerError> {
        self.liveness.ensure_open()?;
        self.broker.check(Fault::CreateMessage)?;
        Ok(InMemoryMessage {
            broker: self.broker.clone(),
            body,
            properties: BTreeMap::new(),
        })
    }

    fn create_destination(
        &self,
        destination: InMemoryDestination,
    ) -> Result<InMemoryDestination, BrokerError> {
        self.liveness.ensure_open()?;
        self.broker.check(Fault::CreateDestination)?;
        Ok(destination)
    }
}

impl Session for InMemorySession {
    type Destination = InMemoryDestination;
    type Message = InMemoryMessage;
    type Producer = InMemoryProducer;

    fn create_queue(&self, name: &str) -> Result<InMemoryDestination, BrokerError> {
        self.create_destination(InMemoryDestination::Queue(name.to_string()))
    }

    fn create_topic(&self, name: &str) -> Result<InMemoryDestination, BrokerError> {
        self.create_destination(InMemoryDestination::Topic(name.to_string()))
    }

    fn create_producer(
        &self,
        destination: &InMemoryDestination,
    ) -> Result<InMemoryProducer, BrokerError> {
        self.liveness.ensure_open()?;
        self.broker.check(Fault::CreateProducer)?;
        let id = self
            .broker
            .open(Resource::Producer, self.liveness.connection());
        Ok(InMemoryProducer {
            broker: self.broker.clone(),
            liveness: self.liveness.child(Resource::Producer, id),
            destination: destination.clone(),
            delivery_mode: DeliveryMode::Persistent,
            time_to_live: None,
        })
    }

    fn create_text_message(&self, text: &str) -> Result<InMemoryMessage, BrokerError> {
        self.create_message(Body::Text(text.to_string()))
    }

    fn create_bytes_message(&self, bytes: &[u8]) -> Result<InMemoryMessage, BrokerError> {
        self.create_message(Body::Bytes(bytes.to_vec()))
    }
}

impl Close for InMemorySession {
    fn close(&mut self) -> Result<(), BrokerError> {
        close_handle(&self.broker, &self.liveness, Fault::CloseSession)
    }
}

pub struct InMemoryMessage {
    broker: InMemoryBroker,
    body: Body,
    properties: BTreeMap<String, String>,
}

impl InMemoryMessage {
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

impl Message for InMemoryMessage {
    fn set_string_property(&mut self, name: &str, value: &str) -> Result<(), BrokerError> {
        self.broker.check(Fault::SetProperty)?;
        self.properties.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

pub struct InMemoryProducer {
    broker: InMemoryBroker,
    liveness: Liveness,
    destination: InMemoryDestination,
    delivery_mode: DeliveryMode,
    time_to_live: Option<Duration>,
}

impl Producer for InMemoryProducer {
    type Message = InMemoryMessage;

    fn set_delivery_mode(&mut self, mode: DeliveryMode) -> Result<(), BrokerError> {
        self.liveness.ensure_open()?;
        self.broker.check(Fault::SetDeliveryMode)?;
        self.delivery_mode = mode;
        Ok(())
    }

    fn set_time_to_live(&mut self, ttl: Duration) -> Result<(), BrokerError> {
        self.liveness.ensure_open()?;
        self.broker.check(Fault::SetTimeToLive)?;
        self.time_to_live = Some(ttl);
        Ok(())
    }

    fn send(&mut self, message: InMemoryMessage) -> Result<(), BrokerError> {
        self.liveness.ensure_open()?;
        self.broker.check(Fault::Send)?;
        let sent = SentMessage {
            destination: self.destination.clone(),
            body: message.body,
            properties: message.properties,
            delivery_mode: self.delivery_mode,
            time_to_live: self.time_to_live,
        };
        self.broker.state().sent.push(sent);
        Ok(())
    }
}

impl Close for InMemoryProducer {
    fn close(&mut self) -> Result<(), BrokerError> {
        close_handle(&self.broker, &self.liveness, Fault::CloseProducer)
    }
}
