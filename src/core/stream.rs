use std::{
    pin::Pin,
    task,
};

use anyhow::{
    Error,
    Result,
};
use futures_util::{
    Sink,
    SinkExt,
    Stream,
    StreamExt,
};
use tokio::sync::mpsc::{
    UnboundedReceiver,
    UnboundedSender,
};

use crate::{
    message::message::Message,
    serializer::serializer::Serializer,
    transport::transport::{
        Transport,
        TransportData,
    },
};

/// A message passing through a [`MessageStream`].
pub enum StreamMessage {
    Ping(Vec<u8>),
    Message(Message),
}

/// A bidirectional stream of WAMP messages.
///
/// The stream owns whatever carries the messages: a framed transport with a serializer, or a pair
/// of in-process channels for direct connections.
pub trait MessageStream:
    Send + Stream<Item = Result<StreamMessage>> + Sink<StreamMessage, Error = Error> + Unpin
{
    /// The kind of stream, mostly for logging.
    fn message_stream_type(&self) -> &'static str;
}

/// A [`MessageStream`] over a [`Transport`], converting wire bytes to messages with a
/// [`Serializer`].
pub struct TransportMessageStream {
    transport: Box<dyn Transport>,
    serializer: Box<dyn Serializer>,
}

impl TransportMessageStream {
    pub fn new(transport: Box<dyn Transport>, serializer: Box<dyn Serializer>) -> Self {
        Self {
            transport,
            serializer,
        }
    }
}

impl MessageStream for TransportMessageStream {
    fn message_stream_type(&self) -> &'static str {
        "transport"
    }
}

impl Stream for TransportMessageStream {
    type Item = Result<StreamMessage>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<Option<Self::Item>> {
        match futures_util::ready!(self.transport.poll_next_unpin(cx)) {
            Some(Ok(TransportData::Ping(data))) => {
                task::Poll::Ready(Some(Ok(StreamMessage::Ping(data))))
            }
            Some(Ok(TransportData::Message(data))) => {
                let message = match self.serializer.deserialize(&data) {
                    Ok(message) => message,
                    Err(err) => return task::Poll::Ready(Some(Err(err))),
                };
                task::Poll::Ready(Some(Ok(StreamMessage::Message(message))))
            }
            Some(Err(err)) => task::Poll::Ready(Some(Err(err))),
            None => task::Poll::Ready(None),
        }
    }
}

impl Sink<StreamMessage> for TransportMessageStream {
    type Error = Error;

    fn poll_ready(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        self.transport.poll_ready_unpin(cx)
    }

    fn start_send(
        mut self: Pin<&mut Self>,
        item: StreamMessage,
    ) -> std::result::Result<(), Self::Error> {
        let data = match item {
            StreamMessage::Ping(data) => TransportData::Ping(data),
            StreamMessage::Message(message) => {
                TransportData::Message(self.serializer.serialize(&message)?)
            }
        };
        self.transport.start_send_unpin(data)
    }

    fn poll_flush(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        self.transport.poll_flush_unpin(cx)
    }

    fn poll_close(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        self.transport.poll_close_unpin(cx)
    }
}

/// A [`MessageStream`] over a pair of in-process channels.
///
/// Used for direct connections, where both ends live in the same process and messages never
/// touch a serializer.
pub struct DirectMessageStream {
    send_tx: UnboundedSender<Message>,
    receive_rx: UnboundedReceiver<Message>,
}

impl DirectMessageStream {
    pub fn new(send_tx: UnboundedSender<Message>, receive_rx: UnboundedReceiver<Message>) -> Self {
        Self {
            send_tx,
            receive_rx,
        }
    }
}

impl MessageStream for DirectMessageStream {
    fn message_stream_type(&self) -> &'static str {
        "direct"
    }
}

impl Stream for DirectMessageStream {
    type Item = Result<StreamMessage>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<Option<Self::Item>> {
        match futures_util::ready!(self.receive_rx.poll_recv(cx)) {
            Some(message) => task::Poll::Ready(Some(Ok(StreamMessage::Message(message)))),
            None => task::Poll::Ready(None),
        }
    }
}

impl Sink<StreamMessage> for DirectMessageStream {
    type Error = Error;

    fn poll_ready(
        self: Pin<&mut Self>,
        _: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn start_send(
        self: Pin<&mut Self>,
        item: StreamMessage,
    ) -> std::result::Result<(), Self::Error> {
        match item {
            // There is no link to keep alive.
            StreamMessage::Ping(_) => Ok(()),
            StreamMessage::Message(message) => {
                self.send_tx.send(message).map_err(|_| {
                    Error::msg("direct message stream closed on the receiving side")
                })
            }
        }
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn poll_close(
        self: Pin<&mut Self>,
        _: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }
}
