use std::fmt::Debug;

use anyhow::Result;

use crate::{
    core::uri::Uri,
    message::message::Message,
    serializer::json::JsonSerializer,
};

/// The serialization format negotiated for a connection.
///
/// Only JSON is supported. The enum exists because the format is still negotiated per
/// connection, through the WebSocket subprotocol header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SerializerType {
    /// Serializes messages to and from JavaScript Object Notation.
    Json,
}

impl SerializerType {
    /// The subprotocol URI announced during negotiation.
    pub fn uri(&self) -> Uri {
        match self {
            Self::Json => Uri::from_known("wamp.2.json"),
        }
    }

    /// Creates a [`Serializer`] of this type.
    pub fn new_serializer(&self) -> Box<dyn Serializer> {
        match self {
            Self::Json => Box::new(JsonSerializer::default()),
        }
    }
}

impl TryFrom<&str> for SerializerType {
    type Error = &'static str;
    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value {
            "wamp.2.json" => Ok(Self::Json),
            _ => Err("unsupported serializer"),
        }
    }
}

/// Converts WAMP messages to and from their wire bytes.
///
/// Message batching is not implemented; one message maps to one frame.
pub trait Serializer: Send + Debug {
    /// Serializes the given message to bytes.
    fn serialize(&self, value: &Message) -> Result<Vec<u8>>;

    /// Deserializes bytes to a message.
    fn deserialize(&self, bytes: &[u8]) -> Result<Message>;
}
