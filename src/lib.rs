//! Publish-side message broker sender.
//!
//! [`BrokerSender`] sends JSON text, serializable objects, raw bytes with
//! string properties, or caller-built messages to one configured destination.
//! Each send opens a connection, session and producer from a (pooled)
//! [`ConnectionFactory`](broker::ConnectionFactory), transmits, and closes all
//! three in reverse order whether or not the send succeeded.

pub mod broker;
mod config;
mod destination;
mod error;
mod message;
mod pipeline;
mod scope;
mod sender;
mod serializer;

pub use broker::{AcknowledgeMode, DeliveryMode};
pub use config::SenderConfig;
pub use destination::{DestinationResolver, PrefixDestinationResolver};
pub use error::{
    BrokerError, ConfigError, EncodingError, Resource, SendError, SendFailure, TeardownError,
};
pub use message::{MessageBuilder, MessageSpec, PayloadSummary};
pub use pipeline::SendPipeline;
pub use sender::{BrokerSender, MessageSender};
pub use serializer::{BitcodeSerializer, JsonSerializer, PayloadSerializer};
