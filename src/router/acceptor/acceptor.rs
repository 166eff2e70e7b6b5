use anyhow::Result;
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::MaybeTlsStream;

use crate::serializer::serializer::SerializerType;

/// The result of an [`Acceptor`] successfully accepting a WAMP connection.
pub struct Acceptance<S> {
    /// The established stream.
    pub stream: S,

    /// The serializer chosen during negotiation.
    pub serializer: SerializerType,
}

/// An acceptor, which upgrades an incoming TCP connection into a stream that can carry WAMP
/// messages.
///
/// Acceptors stop at the transport level. They negotiate how WAMP messages will be framed and
/// encoded, but never look at the messages themselves; sessions are established later, on top
/// of the accepted stream.
#[async_trait]
pub trait Acceptor<S>: Send {
    /// Accepts the incoming TCP connection, erroring out if the upgrade fails.
    async fn accept(&self, stream: MaybeTlsStream<TcpStream>) -> Result<Acceptance<S>>;
}

/// A factory for creating a new [`Acceptor`].
pub trait AcceptorFactory<S>: Send {
    /// Creates a new [`Acceptor`].
    fn new_acceptor(&self) -> Box<dyn Acceptor<S>>;
}
