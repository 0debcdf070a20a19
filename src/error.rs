use std::fmt;

use thiserror::Error;

/// A broker resource the send pipeline acquires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Connection,
    Session,
    Destination,
    Producer,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Connection => "connection",
            Resource::Session => "session",
            Resource::Destination => "destination",
            Resource::Producer => "producer",
        };
        f.write_str(name)
    }
}

/// Error reported by a broker client collaborator.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker could not be reached or refused the connection
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// The handle was used after it (or its owner) was closed
    #[error("{0} is closed")]
    Closed(Resource),
    /// A destination name could not be mapped to a queue or topic
    #[error("invalid destination: {0}")]
    InvalidDestination(String),
    /// The broker rejected the operation
    #[error("rejected by broker: {0}")]
    Rejected(String),
    /// Other error
    #[error("broker error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Serializing an object into a message payload failed.
#[derive(Debug, Error)]
#[error("failed to encode payload: {0}")]
pub struct EncodingError(#[source] Box<dyn std::error::Error + Send + Sync>);

impl EncodingError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        EncodingError(source.into())
    }
}

impl From<serde_json::Error> for EncodingError {
    fn from(err: serde_json::Error) -> Self {
        EncodingError::new(err)
    }
}

impl From<bitcode::Error> for EncodingError {
    fn from(err: bitcode::Error) -> Self {
        EncodingError::new(err)
    }
}

/// The stage-specific reason a send failed.
#[derive(Debug, Error)]
pub enum SendFailure {
    #[error("could not acquire {resource}")]
    ResourceAcquisition {
        resource: Resource,
        #[source]
        source: BrokerError,
    },
    #[error("could not apply delivery settings to producer")]
    ProducerConfiguration(#[source] BrokerError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("could not build message")]
    MessageBuild(#[source] BrokerError),
    #[error("could not attach property `{key}` to message")]
    PropertyAttach {
        key: String,
        #[source]
        source: BrokerError,
    },
    #[error("broker failed to transmit message")]
    Transmit(#[source] BrokerError),
}

impl SendFailure {
    pub(crate) fn acquire(resource: Resource) -> impl FnOnce(BrokerError) -> SendFailure {
        move |source| SendFailure::ResourceAcquisition { resource, source }
    }
}

/// The error every send operation returns.
///
/// The failing stage is not part of the error's type; inspect [`SendError::cause`]
/// (or walk [`std::error::Error::source`]) to find out what went wrong.
#[derive(Debug, Error)]
#[error("error sending to {destination}")]
pub struct SendError {
    destination: String,
    #[source]
    cause: SendFailure,
}

impl SendError {
    pub fn new(destination: impl Into<String>, cause: SendFailure) -> Self {
        SendError {
            destination: destination.into(),
            cause,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn cause(&self) -> &SendFailure {
        &self.cause
    }

    pub fn into_cause(self) -> SendFailure {
        self.cause
    }
}

/// Closing a resource failed. Only ever logged; never returned from a send.
#[derive(Debug, Error)]
#[error("failed to close {resource}")]
pub struct TeardownError {
    pub resource: Resource,
    #[source]
    pub source: BrokerError,
}

/// Invalid sender configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("destination name must not be empty")]
    EmptyDestination,
    #[error("could not parse sender config: {0}")]
    Parse(#[from] serde_json::Error),
}
