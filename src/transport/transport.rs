use std::fmt::Debug;

use anyhow::{
    Error,
    Result,
};
use futures_util::{
    Sink,
    Stream,
};

use crate::serializer::serializer::SerializerType;

/// One frame's worth of data moving through a [`Transport`].
pub enum TransportData {
    /// A health check that should immediately be echoed back to the sender.
    Ping(Vec<u8>),
    /// The bytes of one serialized WAMP message.
    Message(Vec<u8>),
}

/// A framed byte transport carrying WAMP messages.
///
/// Implemented as a [`Stream`] and [`Sink`] of [`TransportData`]. The transport separates
/// keep-alive frames from message frames and surfaces frame-level protocol violations as
/// errors, to be handled at higher layers.
pub trait Transport:
    Send + Stream<Item = Result<TransportData>> + Sink<TransportData, Error = Error> + Unpin + Debug
{
}

/// A factory for creating a new [`Transport`].
pub trait TransportFactory<S>: Send + Sync {
    /// Creates a new [`Transport`] for WAMP messaging.
    fn new_transport(&self, stream: S, serializer_type: SerializerType) -> Box<dyn Transport>;
}
