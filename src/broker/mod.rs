//! Broker client capabilities
//!
//! These traits describe the slice of a message-broker client the sender
//! needs: a connection factory, connections, sessions, producers and
//! messages. Implement them over a concrete client library to plug it in.
//!
//! ## Lifetimes
//!
//! ```text
//! ConnectionFactory
//!        │ create_connection()
//!        ▼
//!    Connection ──────────────── closed last
//!        │ create_session()
//!        ▼
//!     Session ─────────────────── closed second
//!        │ create_queue() / create_topic() -> Destination
//!        │ create_producer(&Destination)
//!        │ create_text_message() / create_bytes_message() -> Message
//!        ▼
//!     Producer ────────────────── closed first
//! ```
//!
//! The sender opens a full connection/session/producer triple for every
//! message and closes it again afterwards. That is only reasonable when the
//! [`ConnectionFactory`] hands out pooled connections, so implementations are
//! expected to pool.

mod in_memory;

use std::sync::Arc;
use std::time::Duration;

use crate::error::BrokerError;

pub use in_memory::{
    Body, Fault, HandleId, InMemoryBroker, InMemoryConnection, InMemoryDestination,
    InMemoryMessage, InMemoryProducer, InMemorySession, Lifecycle, SentMessage,
};

/// Whether the broker stores messages durably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryMode {
    /// Broker stores the message durably before acknowledging it
    Persistent,
    /// Best effort, lost if the broker restarts
    NonPersistent,
}

impl From<bool> for DeliveryMode {
    fn from(persistent: bool) -> Self {
        if persistent {
            DeliveryMode::Persistent
        } else {
            DeliveryMode::NonPersistent
        }
    }
}

/// How messages received through a session are acknowledged.
///
/// A send-only session never receives, so the session acknowledges
/// automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AcknowledgeMode {
    Auto,
}

/// A broker resource that must be released after use.
pub trait Close {
    fn close(&mut self) -> Result<(), BrokerError>;
}

/// Source of broker connections.
///
/// Called once per send, so implementations should pool connections rather
/// than open a socket on every call.
pub trait ConnectionFactory: Send + Sync {
    type Connection: Connection;

    fn create_connection(&self) -> Result<Self::Connection, BrokerError>;
}

impl<F: ConnectionFactory> ConnectionFactory for Arc<F> {
    type Connection = F::Connection;

    fn create_connection(&self) -> Result<Self::Connection, BrokerError> {
        (**self).create_connection()
    }
}

pub trait Connection: Close {
    type Session: Session;

    fn create_session(
        &self,
        transacted: bool,
        acknowledge: AcknowledgeMode,
    ) -> Result<Self::Session, BrokerError>;
}

/// A broker context used to create destinations, producers and messages.
pub trait Session: Close {
    type Destination;
    type Message: Message;
    type Producer: Producer<Message = Self::Message>;

    fn create_queue(&self, name: &str) -> Result<Self::Destination, BrokerError>;

    fn create_topic(&self, name: &str) -> Result<Self::Destination, BrokerError>;

    fn create_producer(&self, destination: &Self::Destination)
        -> Result<Self::Producer, BrokerError>;

    fn create_text_message(&self, text: &str) -> Result<Self::Message, BrokerError>;

    fn create_bytes_message(&self, bytes: &[u8]) -> Result<Self::Message, BrokerError>;
}

pub trait Message {
    fn set_string_property(&mut self, name: &str, value: &str) -> Result<(), BrokerError>;
}

/// Transmits messages to the destination it was created for.
pub trait Producer: Close {
    type Message;

    fn set_delivery_mode(&mut self, mode: DeliveryMode) -> Result<(), BrokerError>;

    /// Messages expire this long after being sent.
    fn set_time_to_live(&mut self, ttl: Duration) -> Result<(), BrokerError>;

    fn send(&mut self, message: Self::Message) -> Result<(), BrokerError>;
}

/// Session type produced by a factory's connections.
pub type SessionOf<F> = <<F as ConnectionFactory>::Connection as Connection>::Session;

/// Message type produced by a factory's sessions.
pub type MessageOf<F> = <SessionOf<F> as Session>::Message;
