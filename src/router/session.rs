use anyhow::{
    Error,
    Result,
};
use log::{
    debug,
    info,
    warn,
};
use tokio::sync::{
    broadcast,
    mpsc::UnboundedSender,
    RwLock,
};
use uuid::Uuid;

use crate::{
    core::{
        close::CloseReason,
        error::{
            BasicError,
            InteractionError,
        },
        id::Id,
        roles::{
            router_roles_details,
            PeerRole,
            PeerRoles,
        },
        types::{
            Dictionary,
            Value,
        },
        uri::{
            Uri,
            ValidationMode,
        },
    },
    message::{
        common::{
            abort_message_for_error,
            error_for_request,
            goodbye_and_out,
            goodbye_with_close_reason,
        },
        message::{
            EventMessage,
            HelloMessage,
            Message,
            PublishMessage,
            PublishedMessage,
            SubscribeMessage,
            SubscribedMessage,
            UnsubscribeMessage,
            UnsubscribedMessage,
            WelcomeMessage,
        },
    },
    router::{
        context::RouterContext,
        realm::RealmSession,
        router::RouterConfig,
    },
};

/// State held while a session is attached to a realm.
#[derive(Debug, Clone)]
struct EstablishedSessionState {
    id: Id,
    realm: Uri,
    roles: PeerRoles,
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Closed,
    Established(EstablishedSessionState),
    Closing(EstablishedSessionState),
}

impl SessionState {
    fn is_same_state(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Closed, Self::Closed)
                | (Self::Established(_), Self::Established(_))
                | (Self::Closing(_), Self::Closing(_))
        )
    }

    fn allowed_state_transition(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Closed, Self::Established(_))
                | (Self::Established(_), Self::Closing(_))
                | (Self::Established(_), Self::Closed)
                | (Self::Closing(_), Self::Closed)
        )
    }
}

/// A handle to an asynchronously-running router session.
///
/// Handles are stored in realm and subscription tables. They are opaque peer references: the
/// only exposed operation is a non-blocking message enqueue, so holders never touch transport
/// state and never block on peer I/O.
pub struct SessionHandle {
    id: Id,
    message_tx: UnboundedSender<Message>,
    closed_session_rx: broadcast::Receiver<()>,
}

impl SessionHandle {
    /// The session ID, as reported out to the peer.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Sends a message over the session.
    ///
    /// The send is a non-blocking enqueue. It fails only if the session is gone, which callers
    /// tolerate: the session's own connection performs cleanup.
    pub fn send_message(&self, message: Message) -> Result<()> {
        self.message_tx.send(message).map_err(Error::new)
    }

    /// Closes the session by starting a GOODBYE exchange.
    pub fn close(&self, close_reason: CloseReason) -> Result<()> {
        self.send_message(goodbye_with_close_reason(close_reason))
    }

    /// The receiver channel that is populated when the session moves to the CLOSED state.
    pub fn closed_session_rx(&self) -> broadcast::Receiver<()> {
        self.closed_session_rx.resubscribe()
    }
}

/// The router end of a WAMP session.
///
/// Handles WAMP messages in a state machine and holds all session-scoped state. A connection
/// hosts at most one session at a time; after a session closes, the connection may start a new
/// one for a subsequent HELLO.
pub struct Session {
    connection: Uuid,
    service_message_tx: UnboundedSender<Message>,
    handle_message_tx: UnboundedSender<Message>,
    state: RwLock<SessionState>,
    closed_session_tx: broadcast::Sender<()>,
}

impl Session {
    /// Creates a new session for a connection.
    ///
    /// `service_message_tx` writes directly to the peer's outbound stream. `handle_message_tx`
    /// is the channel embedded in [`SessionHandle`]s; messages sent there are routed back
    /// through the connection so state transitions are observed.
    pub fn new(
        connection: Uuid,
        service_message_tx: UnboundedSender<Message>,
        handle_message_tx: UnboundedSender<Message>,
    ) -> Self {
        let (closed_session_tx, _) = broadcast::channel(16);
        Self {
            connection,
            service_message_tx,
            handle_message_tx,
            state: RwLock::new(SessionState::default()),
            closed_session_tx,
        }
    }

    /// Checks if the session is closed.
    pub async fn closed(&self) -> bool {
        matches!(*self.state.read().await, SessionState::Closed)
    }

    fn session_handle(&self, id: Id) -> SessionHandle {
        SessionHandle {
            id,
            message_tx: self.handle_message_tx.clone(),
            closed_session_rx: self.closed_session_tx.subscribe(),
        }
    }

    async fn established_state(&self) -> Result<EstablishedSessionState> {
        match &*self.state.read().await {
            SessionState::Established(state) => Ok(state.clone()),
            _ => Err(Error::msg("session is not in the established state")),
        }
    }

    async fn closable_state(&self) -> Option<EstablishedSessionState> {
        match &*self.state.read().await {
            SessionState::Established(state) | SessionState::Closing(state) => Some(state.clone()),
            SessionState::Closed => None,
        }
    }

    async fn transition_state(&self, next: SessionState) -> Result<()> {
        let entered_closed;
        {
            let mut state = self.state.write().await;
            if state.is_same_state(&next) {
                *state = next;
                return Ok(());
            }
            if !state.allowed_state_transition(&next) {
                return Err(Error::msg(format!(
                    "session for connection {} cannot transition from {state:?} to {next:?}",
                    self.connection
                )));
            }
            entered_closed = matches!(next, SessionState::Closed);
            *state = next;
        }
        if entered_closed {
            self.closed_session_tx.send(()).ok();
        }
        Ok(())
    }

    /// Sends a message to the peer, transitioning session state as needed.
    pub async fn send_message(&self, message: Message) -> Result<()> {
        self.observe_outbound_message(&message).await?;
        self.service_message_tx.send(message).map_err(Error::new)
    }

    async fn observe_outbound_message(&self, message: &Message) -> Result<()> {
        let next_state = match message {
            Message::Abort(_) => SessionState::Closed,
            Message::Goodbye(_) => match &*self.state.read().await {
                SessionState::Closing(_) | SessionState::Closed => SessionState::Closed,
                SessionState::Established(state) => SessionState::Closing(state.clone()),
            },
            _ => return Ok(()),
        };
        self.transition_state(next_state).await
    }

    /// Handles a message over the session state machine.
    ///
    /// An error is a fatal session error: the session is purged, ABORT is sent when the stream
    /// is still writable, and the caller is expected to tear the connection down.
    pub async fn handle_message<S>(
        &self,
        context: &RouterContext<S>,
        message: Message,
    ) -> Result<()> {
        debug!(
            "Received {} message for connection {}",
            message.message_name(),
            self.connection
        );
        if let Err(err) = self.dispatch_on_state(context, message).await {
            self.clean_up(context).await;
            self.send_message(abort_message_for_error(&err)).await.ok();
            return Err(err);
        }
        Ok(())
    }

    async fn dispatch_on_state<S>(
        &self,
        context: &RouterContext<S>,
        message: Message,
    ) -> Result<()> {
        // Read state separately from handling the message, so that handlers can transition
        // freely.
        let mut closed = false;
        let mut closing = false;
        match *self.state.read().await {
            SessionState::Closed => closed = true,
            SessionState::Closing(_) => closing = true,
            SessionState::Established(_) => (),
        }

        if closed {
            self.handle_closed(context, message).await
        } else if closing {
            self.handle_closing(context, message).await
        } else {
            self.handle_established(context, message).await
        }
    }

    async fn handle_closed<S>(&self, context: &RouterContext<S>, message: Message) -> Result<()> {
        match message {
            Message::Hello(message) => {
                if let Err(err) = self.handle_hello(context, &message).await {
                    return self.send_message(abort_message_for_error(&err)).await;
                }
                Ok(())
            }
            // A GOODBYE with no session has nothing to close.
            Message::Goodbye(_) => {
                debug!(
                    "Dropping GOODBYE received with no open session on connection {}",
                    self.connection
                );
                Ok(())
            }
            // Broker messages are guarded on an open session.
            Message::Publish(_) | Message::Subscribe(_) | Message::Unsubscribe(_) => {
                debug!(
                    "Dropping {} received with no open session on connection {}",
                    message.message_name(),
                    self.connection
                );
                Ok(())
            }
            message => self.unexpected_message(context, &message, "closed"),
        }
    }

    async fn handle_closing<S>(&self, context: &RouterContext<S>, message: Message) -> Result<()> {
        match message {
            // The peer confirmed the GOODBYE the router initiated.
            Message::Goodbye(_) | Message::Abort(_) => {
                self.clean_up(context).await;
                Ok(())
            }
            message => {
                debug!(
                    "Dropping {} received on a closing session on connection {}",
                    message.message_name(),
                    self.connection
                );
                Ok(())
            }
        }
    }

    async fn handle_established<S>(
        &self,
        context: &RouterContext<S>,
        message: Message,
    ) -> Result<()> {
        match message {
            // A repeated HELLO on an open session is ignored entirely: no reply, no state
            // change.
            Message::Hello(_) => {
                debug!(
                    "Dropping repeated HELLO on an established session on connection {}",
                    self.connection
                );
                Ok(())
            }
            Message::Abort(_) => {
                warn!(
                    "Session on connection {} aborted by peer: {message:?}",
                    self.connection
                );
                self.clean_up(context).await;
                Ok(())
            }
            Message::Goodbye(_) => {
                let state = self.established_state().await?;
                self.purge_from_realm(context, &state).await;
                self.transition_state(SessionState::Closing(state)).await?;
                self.send_message(goodbye_and_out()).await
            }
            ref message @ Message::Subscribe(ref subscribe_message) => {
                if let Err(err) = self.handle_subscribe(context, subscribe_message).await {
                    return self.send_message(error_for_request(message, &err)).await;
                }
                Ok(())
            }
            ref message @ Message::Unsubscribe(ref unsubscribe_message) => {
                if let Err(err) = self.handle_unsubscribe(context, unsubscribe_message).await {
                    return self.send_message(error_for_request(message, &err)).await;
                }
                Ok(())
            }
            ref message @ Message::Publish(ref publish_message) => {
                if let Err(err) = self.handle_publish(context, publish_message).await {
                    return self.send_message(error_for_request(message, &err)).await;
                }
                Ok(())
            }
            // The dealer role is not implemented.
            ref message @ (Message::Call(_) | Message::Register(_) | Message::Unregister(_)) => {
                self.send_message(error_for_request(
                    message,
                    &BasicError::NotAllowed("router is not a dealer".to_owned()).into(),
                ))
                .await
            }
            message => self.unexpected_message(context, &message, "established"),
        }
    }

    /// Applies the router's protocol-violation policy to an unexpected message.
    fn unexpected_message<S>(
        &self,
        context: &RouterContext<S>,
        message: &Message,
        state: &str,
    ) -> Result<()> {
        if context.router().config.abort_on_protocol_violation {
            return Err(InteractionError::ProtocolViolation(format!(
                "received {} message on a {state} session",
                message.message_name()
            ))
            .into());
        }
        warn!(
            "Dropping {} message received on a {state} session on connection {}",
            message.message_name(),
            self.connection
        );
        Ok(())
    }

    async fn handle_hello<S>(
        &self,
        context: &RouterContext<S>,
        message: &HelloMessage,
    ) -> Result<()> {
        let config = &context.router().config;
        validate_client_uri(config, &message.realm)?;
        let roles = PeerRoles::try_from_details(&message.details).map_err(|err| {
            InteractionError::ProtocolViolation(format!("invalid roles in HELLO details: {err}"))
        })?;

        let mut realm_context = context.realm_context(&message.realm).await?;
        let excluding = realm_context.manager().session_ids();
        let id = realm_context
            .router()
            .id_allocator
            .generate_id(&excluding)
            .await?;
        let realm = realm_context.realm_mut()?;
        realm.sessions.insert(
            id,
            RealmSession {
                session: self.session_handle(id),
            },
        );
        info!(
            "Session {id} joined realm {} ({} active sessions)",
            message.realm,
            realm.session_count()
        );

        let mut details = Dictionary::default();
        details.insert(
            "agent".to_owned(),
            Value::String(config.agent.clone()),
        );
        details.insert(
            "roles".to_owned(),
            router_roles_details(config.roles.iter().copied()),
        );

        self.transition_state(SessionState::Established(EstablishedSessionState {
            id,
            realm: message.realm.clone(),
            roles,
        }))
        .await?;

        self.send_message(Message::Welcome(WelcomeMessage {
            session: id,
            details,
        }))
        .await
    }

    async fn handle_subscribe<S>(
        &self,
        context: &RouterContext<S>,
        message: &SubscribeMessage,
    ) -> Result<()> {
        let state = self.established_state().await?;
        if !state.roles.contains(PeerRole::Subscriber) {
            return Err(BasicError::NotAllowed("peer is not a subscriber".to_owned()).into());
        }
        validate_client_uri(&context.router().config, &message.topic)?;

        let mut realm_context = context.realm_context(&state.realm).await?;
        let subscription = match realm_context
            .realm()?
            .broker
            .subscription_id_for_topic(&message.topic)?
        {
            Some(id) => {
                realm_context.realm_mut()?.broker.add_subscriber(id, state.id)?;
                id
            }
            None => {
                let excluding = realm_context.manager().subscription_ids();
                let id = realm_context
                    .router()
                    .id_allocator
                    .generate_id(&excluding)
                    .await?;
                realm_context
                    .realm_mut()?
                    .broker
                    .insert_subscription(id, message.topic.clone(), state.id);
                id
            }
        };
        // The confirmation is enqueued while the realm lock is held, so the peer never sees an
        // event for this subscription before the confirmation.
        self.send_message(Message::Subscribed(SubscribedMessage {
            subscribe_request: message.request,
            subscription,
        }))
        .await
    }

    async fn handle_unsubscribe<S>(
        &self,
        context: &RouterContext<S>,
        message: &UnsubscribeMessage,
    ) -> Result<()> {
        let state = self.established_state().await?;
        let mut realm_context = context.realm_context(&state.realm).await?;
        realm_context
            .realm_mut()?
            .broker
            .unsubscribe(state.id, message.subscribed_subscription)?;
        self.send_message(Message::Unsubscribed(UnsubscribedMessage {
            unsubscribe_request: message.request,
        }))
        .await
    }

    async fn handle_publish<S>(
        &self,
        context: &RouterContext<S>,
        message: &PublishMessage,
    ) -> Result<()> {
        match self.handle_publish_internal(context, message).await {
            Ok(()) => Ok(()),
            // An ERROR reply is only warranted when the publisher asked for an acknowledgement.
            Err(err) if message.acknowledge() => Err(err),
            Err(err) => {
                debug!(
                    "Dropping unacknowledged PUBLISH on connection {}: {err}",
                    self.connection
                );
                Ok(())
            }
        }
    }

    async fn handle_publish_internal<S>(
        &self,
        context: &RouterContext<S>,
        message: &PublishMessage,
    ) -> Result<()> {
        let state = self.established_state().await?;
        if !state.roles.contains(PeerRole::Publisher) {
            return Err(BasicError::NotAllowed("peer is not a publisher".to_owned()).into());
        }
        validate_client_uri(&context.router().config, &message.topic)?;

        let mut realm_context = context.realm_context(&state.realm).await?;
        let publication = realm_context
            .router()
            .id_allocator
            .generate_id(realm_context.manager().publications())
            .await?;
        realm_context.manager_mut().record_publication(publication);

        let realm = realm_context.realm()?;
        if let Some(subscription) = realm.broker.subscription_for_topic(&message.topic)? {
            for subscriber in &subscription.subscribers {
                // The publisher never receives its own event.
                if *subscriber == state.id {
                    continue;
                }
                let session = match realm.sessions.get(subscriber) {
                    Some(session) => &session.session,
                    None => continue,
                };
                if let Err(err) = session.send_message(Message::Event(EventMessage {
                    subscribed_subscription: subscription.id,
                    published_publication: publication,
                    details: Dictionary::default(),
                    publish_arguments: message.arguments.clone(),
                    publish_arguments_keyword: message.arguments_keyword.clone(),
                })) {
                    warn!("Failed to deliver EVENT to session {subscriber}: {err}");
                }
            }
        }

        // The acknowledgement is enqueued after the fan-out, whether or not there were any
        // subscribers.
        if message.acknowledge() {
            self.send_message(Message::Published(PublishedMessage {
                publish_request: message.request,
                publication,
            }))
            .await?;
        }
        Ok(())
    }

    /// Removes the session from the router.
    ///
    /// Idempotent: sessions may be cleaned up by a GOODBYE exchange, an ABORT, or the transport
    /// closing, in any combination.
    pub async fn clean_up<S>(&self, context: &RouterContext<S>) {
        if let Some(state) = self.closable_state().await {
            self.purge_from_realm(context, &state).await;
        }
        self.transition_state(SessionState::Closed).await.ok();
    }

    async fn purge_from_realm<S>(
        &self,
        context: &RouterContext<S>,
        state: &EstablishedSessionState,
    ) {
        let mut manager = context.router().realm_manager.lock().await;
        if let Some(realm) = manager.get_mut(&state.realm) {
            if realm.sessions.remove(&state.id).is_some() {
                info!("Session {} left realm {}", state.id, state.realm);
            }
            realm.broker.purge_session(state.id);
            debug!(
                "Realm {} has {} live subscriptions",
                state.realm,
                realm.broker.subscription_count()
            );
        }
    }
}

/// Validates a client-chosen URI against the router's validation mode.
///
/// In strict mode, clients also may not use the reserved `wamp.` prefix.
fn validate_client_uri(config: &RouterConfig, uri: &Uri) -> Result<()> {
    if config.validation_mode.validate(uri).is_err() {
        return Err(InteractionError::InvalidUri(uri.to_string()).into());
    }
    if config.validation_mode == ValidationMode::Strict && uri.is_reserved() {
        return Err(InteractionError::InvalidUri(format!(
            "{uri} falls under the reserved wamp prefix"
        ))
        .into());
    }
    Ok(())
}
