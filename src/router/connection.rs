use anyhow::{
    Error,
    Result,
};
use log::{
    error,
    info,
};
use tokio::sync::{
    broadcast::{
        self,
        error::RecvError,
    },
    mpsc::{
        unbounded_channel,
        UnboundedReceiver,
        UnboundedSender,
    },
};
use uuid::Uuid;

use crate::{
    core::service::Service,
    message::message::Message,
    router::{
        context::RouterContext,
        session::Session,
    },
};

/// A connection from a router to a client.
///
/// On its own, a connection is not very meaningful. When started, it uses a WAMP [`Service`] to
/// send and receive messages on an underlying stream. Messages are used to set up and manage a
/// [`Session`], which handles all interactions with the router.
///
/// A connection hosts consecutive sessions: when a session closes through a GOODBYE exchange,
/// the peer may establish a new one with another HELLO.
#[derive(Debug)]
pub struct Connection {
    uuid: Uuid,
}

impl Connection {
    /// Creates a new connection.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
        }
    }

    /// The unique identifier of the connection.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    // Starts the connection on the runtime.
    pub fn start<S>(self, context: RouterContext<S>, service: Service)
    where
        S: Send + 'static,
    {
        tokio::spawn(self.run(context, service));
    }

    async fn run<S>(self, context: RouterContext<S>, service: Service) {
        let mut message_rx = service.message_rx();
        let end_rx = service.end_rx();

        let service_handle = service.start();
        loop {
            if !self
                .host_session(
                    &context,
                    service_handle.message_tx(),
                    &mut message_rx,
                    end_rx.resubscribe(),
                )
                .await
            {
                continue;
            }

            info!("Connection {} is done hosting sessions", self.uuid);
            break;
        }

        if let Err(err) = service_handle.cancel() {
            error!(
                "Failed to cancel service for connection {}: {err}",
                self.uuid
            );
        }

        if let Err(err) = service_handle.join().await {
            error!("Failed to join service for connection {}: {err}", self.uuid);
        }
    }

    /// Runs one session on the connection.
    ///
    /// Returns whether the connection is done hosting sessions.
    async fn host_session<S>(
        &self,
        context: &RouterContext<S>,
        service_message_tx: UnboundedSender<Message>,
        service_message_rx: &mut broadcast::Receiver<Message>,
        mut end_rx: broadcast::Receiver<()>,
    ) -> bool {
        let (handle_message_tx, mut handle_message_rx) = unbounded_channel();
        let session = Session::new(self.uuid, service_message_tx, handle_message_tx);

        info!("Starting router session for connection {}", self.uuid);

        let done = match self
            .pump_session(
                context,
                &session,
                &mut handle_message_rx,
                service_message_rx,
                &mut end_rx,
            )
            .await
        {
            Ok(done) => {
                info!("Router session for connection {} finished", self.uuid);
                done
            }
            Err(err) => {
                error!("Router session for connection {} failed: {err:#}", self.uuid);
                true
            }
        };

        // The clean up is idempotent, so it is always safe to run, even if the session cleaned
        // itself up as part of a GOODBYE exchange.
        session.clean_up(context).await;
        done
    }

    async fn pump_session<S>(
        &self,
        context: &RouterContext<S>,
        session: &Session,
        handle_message_rx: &mut UnboundedReceiver<Message>,
        service_message_rx: &mut broadcast::Receiver<Message>,
        end_rx: &mut broadcast::Receiver<()>,
    ) -> Result<bool> {
        let mut router_end_rx = context.router().end_rx();
        let mut session_was_open = false;
        loop {
            tokio::select! {
                // Received a message from some part of the router, addressed to this peer.
                message = handle_message_rx.recv() => {
                    let message = match message {
                        Some(message) => message,
                        None => return Err(Error::msg("session message channel unexpectedly closed")),
                    };
                    let message_name = message.message_name();
                    if let Err(err) = session.send_message(message).await {
                        return Err(err.context(format!("failed to send {message_name} message")));
                    }
                }
                // Received a message from the peer. Inbound handling is strictly FIFO.
                message = service_message_rx.recv() => {
                    let message = match message {
                        Ok(message) => message,
                        Err(RecvError::Closed) => return Ok(true),
                        Err(err) => return Err(Error::new(err).context("failed to receive message")),
                    };
                    session.handle_message(context, message).await?;
                }
                // Transport closed.
                _ = end_rx.recv() => return Ok(true),
                // Router shut down, which closes realms and sessions first, so the connection
                // has nothing left to do.
                _ = router_end_rx.recv() => return Ok(true),
            }

            if session.closed().await {
                if session_was_open {
                    return Ok(false);
                }
            } else {
                session_was_open = true;
            }
        }
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}
