//! Object to payload serialization.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::Serialize;

use crate::error::EncodingError;

/// Turns an object into the text payload of a message.
pub trait PayloadSerializer: Send + Sync {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, EncodingError>;
}

/// JSON via serde_json. Compact unless built with [`JsonSerializer::pretty`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        JsonSerializer { pretty: true }
    }
}

impl PayloadSerializer for JsonSerializer {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, EncodingError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }
}

/// Compact binary encoding with bitcode, carried as base64 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitcodeSerializer;

impl BitcodeSerializer {
    /// Decode a payload produced by this serializer.
    pub fn decode<T: serde::de::DeserializeOwned>(payload: &str) -> Result<T, EncodingError> {
        let bytes = BASE64_STANDARD.decode(payload).map_err(EncodingError::new)?;
        Ok(bitcode::deserialize(&bytes)?)
    }
}

impl PayloadSerializer for BitcodeSerializer {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, EncodingError> {
        let bytes = bitcode::serialize(value)?;
        Ok(BASE64_STANDARD.encode(bytes))
    }
}
