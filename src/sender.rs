//! Public send API.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::broker::{ConnectionFactory, MessageOf, SessionOf};
use crate::config::SenderConfig;
use crate::destination::{DestinationResolver, PrefixDestinationResolver};
use crate::error::{BrokerError, SendError, SendFailure};
use crate::message::MessageSpec;
use crate::pipeline::SendPipeline;
use crate::serializer::{JsonSerializer, PayloadSerializer};

/// Trait for sending messages to a fixed destination.
///
/// Implementations might include:
/// - [`BrokerSender`] - sends through a broker client
/// - A recording sender - for testing code that sends messages
pub trait MessageSender: Send + Sync {
    /// Send `json` as a text message. The text is not validated.
    fn send_json(&self, json: &str) -> Result<(), SendError>;

    /// Serialize `object` and send it as a text message.
    fn send<T: Serialize + ?Sized>(&self, object: &T) -> Result<(), SendError>;

    /// Send `data` as a bytes message, attaching `properties` as string
    /// properties.
    fn send_bytes(
        &self,
        data: &[u8],
        properties: Option<&HashMap<String, String>>,
    ) -> Result<(), SendError>;
}

/// Sends messages to one destination through a broker connection factory.
///
/// Every send opens its own connection, session and producer and closes them
/// again before returning, so `factory` should hand out pooled connections.
/// A sender is `Send + Sync` whenever its collaborators are and can be shared
/// between threads; concurrent sends never share broker resources.
///
/// ## Example
///
/// ```
/// use std::collections::HashMap;
/// use broker_sender::{BrokerSender, MessageSender, SenderConfig};
/// use broker_sender::broker::InMemoryBroker;
///
/// let broker = InMemoryBroker::new();
/// let config = SenderConfig::new("topic:audit").unwrap().with_time_to_live(60);
/// let sender = BrokerSender::new(broker.clone(), config);
///
/// let properties = HashMap::from([("env".to_string(), "prod".to_string())]);
/// sender.send_bytes(&[1, 2, 3], Some(&properties)).unwrap();
///
/// assert_eq!(broker.sent()[0].bytes(), Some(&[1u8, 2, 3][..]));
/// ```
pub struct BrokerSender<F, R = PrefixDestinationResolver, S = JsonSerializer> {
    factory: F,
    resolver: R,
    serializer: S,
    config: SenderConfig,
}

impl<F: ConnectionFactory> BrokerSender<F> {
    /// Sender with prefix-based destination resolution and JSON payloads.
    pub fn new(factory: F, config: SenderConfig) -> Self {
        BrokerSender {
            factory,
            resolver: PrefixDestinationResolver,
            serializer: JsonSerializer::new(),
            config,
        }
    }
}

impl<F, R, S> BrokerSender<F, R, S>
where
    F: ConnectionFactory,
    R: DestinationResolver<SessionOf<F>>,
    S: PayloadSerializer,
{
    pub fn with_resolver<R2>(self, resolver: R2) -> BrokerSender<F, R2, S>
    where
        R2: DestinationResolver<SessionOf<F>>,
    {
        BrokerSender {
            factory: self.factory,
            resolver,
            serializer: self.serializer,
            config: self.config,
        }
    }

    pub fn with_serializer<S2: PayloadSerializer>(self, serializer: S2) -> BrokerSender<F, R, S2> {
        BrokerSender {
            factory: self.factory,
            resolver: self.resolver,
            serializer,
            config: self.config,
        }
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Send a message built by `builder` from the open session.
    ///
    /// Delivery mode, time-to-live and resource cleanup are still handled by
    /// the sender.
    pub fn send_custom<B>(&self, builder: B) -> Result<(), SendError>
    where
        B: FnOnce(&SessionOf<F>) -> Result<MessageOf<F>, BrokerError>,
    {
        self.dispatch(MessageSpec::builder(builder))
    }

    /// Run `spec` through a fresh send pipeline.
    pub fn dispatch(&self, spec: MessageSpec<'_, SessionOf<F>>) -> Result<(), SendError> {
        info!(
            destination = %self.config.destination(),
            payload = %spec.summary(),
            "Sending message"
        );
        SendPipeline::new(&self.factory, &self.resolver, &self.config)
            .run(spec)
            .map_err(|cause| self.failed(cause))
    }

    fn failed(&self, cause: impl Into<SendFailure>) -> SendError {
        SendError::new(self.config.destination(), cause.into())
    }
}

impl<F, R, S> MessageSender for BrokerSender<F, R, S>
where
    F: ConnectionFactory,
    R: DestinationResolver<SessionOf<F>>,
    S: PayloadSerializer,
{
    fn send_json(&self, json: &str) -> Result<(), SendError> {
        self.dispatch(MessageSpec::Json(json))
    }

    fn send<T: Serialize + ?Sized>(&self, object: &T) -> Result<(), SendError> {
        let json = self
            .serializer
            .serialize(object)
            .map_err(|err| self.failed(err))?;
        self.send_json(&json)
    }

    fn send_bytes(
        &self,
        data: &[u8],
        properties: Option<&HashMap<String, String>>,
    ) -> Result<(), SendError> {
        self.dispatch(MessageSpec::Bytes { data, properties })
    }
}
