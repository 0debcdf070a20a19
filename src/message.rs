//! What to send: the payload shapes a send pipeline accepts.

use std::collections::HashMap;
use std::fmt;

use base64::prelude::{Engine as _, BASE64_STANDARD};

use crate::broker::{Message, Session};
use crate::error::{BrokerError, SendFailure};

/// Bytes of a binary payload included in its log summary.
const SUMMARY_PREFIX_LEN: usize = 48;

/// Builds a message from an open session.
pub type MessageBuilder<'a, S> =
    Box<dyn FnOnce(&S) -> Result<<S as Session>::Message, BrokerError> + 'a>;

/// The payload of a single send.
pub enum MessageSpec<'a, S: Session> {
    /// Sent as a text message, unchanged.
    Json(&'a str),
    /// Sent as a bytes message with each property set as a string property.
    Bytes {
        data: &'a [u8],
        properties: Option<&'a HashMap<String, String>>,
    },
    /// Caller-built message.
    Builder(MessageBuilder<'a, S>),
}

impl<'a, S: Session> MessageSpec<'a, S> {
    pub fn builder<F>(build: F) -> Self
    where
        F: FnOnce(&S) -> Result<S::Message, BrokerError> + 'a,
    {
        MessageSpec::Builder(Box::new(build))
    }

    /// Create the message within `session`.
    pub(crate) fn build(self, session: &S) -> Result<S::Message, SendFailure> {
        match self {
            MessageSpec::Json(text) => session
                .create_text_message(text)
                .map_err(SendFailure::MessageBuild),
            MessageSpec::Bytes { data, properties } => {
                let mut message = session
                    .create_bytes_message(data)
                    .map_err(SendFailure::MessageBuild)?;
                for (key, value) in properties.into_iter().flatten() {
                    message
                        .set_string_property(key, value)
                        .map_err(|source| SendFailure::PropertyAttach {
                            key: key.clone(),
                            source,
                        })?;
                }
                Ok(message)
            }
            MessageSpec::Builder(build) => build(session).map_err(SendFailure::MessageBuild),
        }
    }

    /// A loggable description of the payload.
    pub fn summary(&self) -> PayloadSummary<'_> {
        match self {
            MessageSpec::Json(text) => PayloadSummary::Text(text),
            MessageSpec::Bytes { data, .. } => PayloadSummary::Bytes(data),
            MessageSpec::Builder(_) => PayloadSummary::Custom,
        }
    }
}

impl<S: Session> fmt::Debug for MessageSpec<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSpec::Json(text) => f.debug_tuple("Json").field(text).finish(),
            MessageSpec::Bytes { data, properties } => f
                .debug_struct("Bytes")
                .field("data", data)
                .field("properties", properties)
                .finish(),
            MessageSpec::Builder(_) => f.write_str("Builder(..)"),
        }
    }
}

/// Log representation of a payload.
///
/// Text is shown in full; binary payloads as their length and a base64 prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSummary<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
    Custom,
}

impl fmt::Display for PayloadSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadSummary::Text(text) => f.write_str(text),
            PayloadSummary::Bytes(data) => {
                let shown = &data[..data.len().min(SUMMARY_PREFIX_LEN)];
                write!(f, "{} bytes base64:{}", data.len(), BASE64_STANDARD.encode(shown))?;
                if shown.len() < data.len() {
                    f.write_str("...")?;
                }
                Ok(())
            }
            PayloadSummary::Custom => f.write_str("<custom>"),
        }
    }
}
