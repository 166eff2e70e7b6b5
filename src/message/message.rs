use serde::{
    de::{
        self,
        SeqAccess,
        Visitor,
    },
    ser::SerializeSeq,
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};

use crate::core::{
    id::Id,
    types::{
        Dictionary,
        Integer,
        List,
    },
    uri::Uri,
};

/// A HELLO message for a peer to initiate a WAMP session in a realm.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HelloMessage {
    pub realm: Uri,
    pub details: Dictionary,
}

/// A WELCOME message for a router to confirm a peer's WAMP session in a realm.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WelcomeMessage {
    pub session: Id,
    pub details: Dictionary,
}

/// An ABORT message for quickly terminating a WAMP session.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AbortMessage {
    pub details: Dictionary,
    pub reason: Uri,
}

/// A GOODBYE message for ending a WAMP session with a two-way handshake.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GoodbyeMessage {
    pub details: Dictionary,
    pub reason: Uri,
}

/// An ERROR message for communicating an error in response to a single request.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ErrorMessage {
    pub request_type: Integer,
    pub request: Id,
    pub details: Dictionary,
    pub error: Uri,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

/// A PUBLISH message for publishing an event to a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishMessage {
    pub request: Id,
    pub options: Dictionary,
    pub topic: Uri,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

impl PublishMessage {
    /// Whether the publisher requested an acknowledgement.
    pub fn acknowledge(&self) -> bool {
        self.options
            .get("acknowledge")
            .and_then(|value| value.bool())
            .unwrap_or(false)
    }
}

/// A PUBLISHED message for confirming an event was published.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishedMessage {
    pub publish_request: Id,
    pub publication: Id,
}

/// A SUBSCRIBE message for subscribing to a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SubscribeMessage {
    pub request: Id,
    pub options: Dictionary,
    pub topic: Uri,
}

/// A SUBSCRIBED message for confirming a peer has subscribed to a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SubscribedMessage {
    pub subscribe_request: Id,
    pub subscription: Id,
}

/// An UNSUBSCRIBE message for unsubscribing from a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnsubscribeMessage {
    pub request: Id,
    pub subscribed_subscription: Id,
}

/// An UNSUBSCRIBED message for confirming a peer has unsubscribed from a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnsubscribedMessage {
    pub unsubscribe_request: Id,
}

/// An EVENT message for relaying a published event to subscribers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventMessage {
    pub subscribed_subscription: Id,
    pub published_publication: Id,
    pub details: Dictionary,
    pub publish_arguments: Option<List>,
    pub publish_arguments_keyword: Option<Dictionary>,
}

/// A CALL message for invoking a procedure.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CallMessage {
    pub request: Id,
    pub options: Dictionary,
    pub procedure: Uri,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

/// A RESULT message for sending the result of a procedure invocation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResultMessage {
    pub call_request: Id,
    pub details: Dictionary,
    pub yield_arguments: Option<List>,
    pub yield_arguments_keyword: Option<Dictionary>,
}

/// A REGISTER message for registering a procedure in the realm.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegisterMessage {
    pub request: Id,
    pub options: Dictionary,
    pub procedure: Uri,
}

/// A REGISTERED message for confirming a procedure has been registered.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegisteredMessage {
    pub register_request: Id,
    pub registration: Id,
}

/// An UNREGISTER message for unregistering a procedure in the realm.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnregisterMessage {
    pub request: Id,
    pub registered_registration: Id,
}

/// An UNREGISTERED message for confirming a procedure has been unregistered.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnregisteredMessage {
    pub unregister_request: Id,
}

/// An INVOCATION message for invoking a procedure on its callee.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InvocationMessage {
    pub request: Id,
    pub registered_registration: Id,
    pub details: Dictionary,
    pub call_arguments: Option<List>,
    pub call_arguments_keyword: Option<Dictionary>,
}

/// A YIELD message for yielding the result of an invocation from the callee.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct YieldMessage {
    pub invocation_request: Id,
    pub options: Dictionary,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

/// A WAMP message.
///
/// On the wire, every message is a JSON array whose first element is the message type tag.
/// Payload arguments trail the fixed fields and are preserved verbatim; an absent payload is
/// distinguishable from a present-but-empty one.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(HelloMessage),
    Welcome(WelcomeMessage),
    Abort(AbortMessage),
    Goodbye(GoodbyeMessage),
    Error(ErrorMessage),
    Publish(PublishMessage),
    Published(PublishedMessage),
    Subscribe(SubscribeMessage),
    Subscribed(SubscribedMessage),
    Unsubscribe(UnsubscribeMessage),
    Unsubscribed(UnsubscribedMessage),
    Event(EventMessage),
    Call(CallMessage),
    Result(ResultMessage),
    Register(RegisterMessage),
    Registered(RegisteredMessage),
    Unregister(UnregisterMessage),
    Unregistered(UnregisteredMessage),
    Invocation(InvocationMessage),
    Yield(YieldMessage),
}

impl Message {
    pub const HELLO_TAG: Integer = 1;
    pub const WELCOME_TAG: Integer = 2;
    pub const ABORT_TAG: Integer = 3;
    pub const GOODBYE_TAG: Integer = 6;
    pub const ERROR_TAG: Integer = 8;
    pub const PUBLISH_TAG: Integer = 16;
    pub const PUBLISHED_TAG: Integer = 17;
    pub const SUBSCRIBE_TAG: Integer = 32;
    pub const SUBSCRIBED_TAG: Integer = 33;
    pub const UNSUBSCRIBE_TAG: Integer = 34;
    pub const UNSUBSCRIBED_TAG: Integer = 35;
    pub const EVENT_TAG: Integer = 36;
    pub const CALL_TAG: Integer = 48;
    pub const RESULT_TAG: Integer = 50;
    pub const REGISTER_TAG: Integer = 64;
    pub const REGISTERED_TAG: Integer = 65;
    pub const UNREGISTER_TAG: Integer = 66;
    pub const UNREGISTERED_TAG: Integer = 67;
    pub const INVOCATION_TAG: Integer = 68;
    pub const YIELD_TAG: Integer = 70;

    /// The message type tag, as transmitted on the wire.
    pub fn tag(&self) -> Integer {
        match self {
            Self::Hello(_) => Self::HELLO_TAG,
            Self::Welcome(_) => Self::WELCOME_TAG,
            Self::Abort(_) => Self::ABORT_TAG,
            Self::Goodbye(_) => Self::GOODBYE_TAG,
            Self::Error(_) => Self::ERROR_TAG,
            Self::Publish(_) => Self::PUBLISH_TAG,
            Self::Published(_) => Self::PUBLISHED_TAG,
            Self::Subscribe(_) => Self::SUBSCRIBE_TAG,
            Self::Subscribed(_) => Self::SUBSCRIBED_TAG,
            Self::Unsubscribe(_) => Self::UNSUBSCRIBE_TAG,
            Self::Unsubscribed(_) => Self::UNSUBSCRIBED_TAG,
            Self::Event(_) => Self::EVENT_TAG,
            Self::Call(_) => Self::CALL_TAG,
            Self::Result(_) => Self::RESULT_TAG,
            Self::Register(_) => Self::REGISTER_TAG,
            Self::Registered(_) => Self::REGISTERED_TAG,
            Self::Unregister(_) => Self::UNREGISTER_TAG,
            Self::Unregistered(_) => Self::UNREGISTERED_TAG,
            Self::Invocation(_) => Self::INVOCATION_TAG,
            Self::Yield(_) => Self::YIELD_TAG,
        }
    }

    /// Whether the tag identifies a known message type.
    pub fn is_known_tag(tag: Integer) -> bool {
        matches!(
            tag,
            Self::HELLO_TAG
                | Self::WELCOME_TAG
                | Self::ABORT_TAG
                | Self::GOODBYE_TAG
                | Self::ERROR_TAG
                | Self::PUBLISH_TAG
                | Self::PUBLISHED_TAG
                | Self::SUBSCRIBE_TAG
                | Self::SUBSCRIBED_TAG
                | Self::UNSUBSCRIBE_TAG
                | Self::UNSUBSCRIBED_TAG
                | Self::EVENT_TAG
                | Self::CALL_TAG
                | Self::RESULT_TAG
                | Self::REGISTER_TAG
                | Self::REGISTERED_TAG
                | Self::UNREGISTER_TAG
                | Self::UNREGISTERED_TAG
                | Self::INVOCATION_TAG
                | Self::YIELD_TAG
        )
    }

    /// The message name, mostly for logging.
    pub fn message_name(&self) -> &'static str {
        match self {
            Self::Hello(_) => "HELLO",
            Self::Welcome(_) => "WELCOME",
            Self::Abort(_) => "ABORT",
            Self::Goodbye(_) => "GOODBYE",
            Self::Error(_) => "ERROR",
            Self::Publish(_) => "PUBLISH",
            Self::Published(_) => "PUBLISHED",
            Self::Subscribe(_) => "SUBSCRIBE",
            Self::Subscribed(_) => "SUBSCRIBED",
            Self::Unsubscribe(_) => "UNSUBSCRIBE",
            Self::Unsubscribed(_) => "UNSUBSCRIBED",
            Self::Event(_) => "EVENT",
            Self::Call(_) => "CALL",
            Self::Result(_) => "RESULT",
            Self::Register(_) => "REGISTER",
            Self::Registered(_) => "REGISTERED",
            Self::Unregister(_) => "UNREGISTER",
            Self::Unregistered(_) => "UNREGISTERED",
            Self::Invocation(_) => "INVOCATION",
            Self::Yield(_) => "YIELD",
        }
    }

    /// The request ID on the message.
    pub fn request_id(&self) -> Option<Id> {
        match self {
            Self::Error(message) => Some(message.request),
            Self::Publish(message) => Some(message.request),
            Self::Published(message) => Some(message.publish_request),
            Self::Subscribe(message) => Some(message.request),
            Self::Subscribed(message) => Some(message.subscribe_request),
            Self::Unsubscribe(message) => Some(message.request),
            Self::Unsubscribed(message) => Some(message.unsubscribe_request),
            Self::Call(message) => Some(message.request),
            Self::Result(message) => Some(message.call_request),
            Self::Register(message) => Some(message.request),
            Self::Registered(message) => Some(message.register_request),
            Self::Unregister(message) => Some(message.request),
            Self::Unregistered(message) => Some(message.unregister_request),
            Self::Invocation(message) => Some(message.request),
            Self::Yield(message) => Some(message.invocation_request),
            _ => None,
        }
    }
}

/// Serializes a trailing payload, keeping wire positions fixed.
///
/// If only keyword arguments are present, an empty positional list is emitted in front of them.
fn serialize_payload<S>(
    seq: &mut S,
    arguments: &Option<List>,
    arguments_keyword: &Option<Dictionary>,
) -> Result<(), S::Error>
where
    S: SerializeSeq,
{
    match (arguments, arguments_keyword) {
        (None, None) => Ok(()),
        (Some(arguments), None) => seq.serialize_element(arguments),
        (arguments, Some(arguments_keyword)) => {
            let empty = List::default();
            seq.serialize_element(arguments.as_ref().unwrap_or(&empty))?;
            seq.serialize_element(arguments_keyword)
        }
    }
}

fn payload_len(arguments: &Option<List>, arguments_keyword: &Option<Dictionary>) -> usize {
    match (arguments, arguments_keyword) {
        (None, None) => 0,
        (_, Some(_)) => 2,
        (Some(_), None) => 1,
    }
}

impl Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Hello(message) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&Self::HELLO_TAG)?;
                seq.serialize_element(&message.realm)?;
                seq.serialize_element(&message.details)?;
                seq.end()
            }
            Self::Welcome(message) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&Self::WELCOME_TAG)?;
                seq.serialize_element(&message.session)?;
                seq.serialize_element(&message.details)?;
                seq.end()
            }
            Self::Abort(message) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&Self::ABORT_TAG)?;
                seq.serialize_element(&message.details)?;
                seq.serialize_element(&message.reason)?;
                seq.end()
            }
            Self::Goodbye(message) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&Self::GOODBYE_TAG)?;
                seq.serialize_element(&message.details)?;
                seq.serialize_element(&message.reason)?;
                seq.end()
            }
            Self::Error(message) => {
                let len = 5 + payload_len(&message.arguments, &message.arguments_keyword);
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element(&Self::ERROR_TAG)?;
                seq.serialize_element(&message.request_type)?;
                seq.serialize_element(&message.request)?;
                seq.serialize_element(&message.details)?;
                seq.serialize_element(&message.error)?;
                serialize_payload(&mut seq, &message.arguments, &message.arguments_keyword)?;
                seq.end()
            }
            Self::Publish(message) => {
                let len = 4 + payload_len(&message.arguments, &message.arguments_keyword);
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element(&Self::PUBLISH_TAG)?;
                seq.serialize_element(&message.request)?;
                seq.serialize_element(&message.options)?;
                seq.serialize_element(&message.topic)?;
                serialize_payload(&mut seq, &message.arguments, &message.arguments_keyword)?;
                seq.end()
            }
            Self::Published(message) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&Self::PUBLISHED_TAG)?;
                seq.serialize_element(&message.publish_request)?;
                seq.serialize_element(&message.publication)?;
                seq.end()
            }
            Self::Subscribe(message) => {
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(&Self::SUBSCRIBE_TAG)?;
                seq.serialize_element(&message.request)?;
                seq.serialize_element(&message.options)?;
                seq.serialize_element(&message.topic)?;
                seq.end()
            }
            Self::Subscribed(message) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&Self::SUBSCRIBED_TAG)?;
                seq.serialize_element(&message.subscribe_request)?;
                seq.serialize_element(&message.subscription)?;
                seq.end()
            }
            Self::Unsubscribe(message) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&Self::UNSUBSCRIBE_TAG)?;
                seq.serialize_element(&message.request)?;
                seq.serialize_element(&message.subscribed_subscription)?;
                seq.end()
            }
            Self::Unsubscribed(message) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&Self::UNSUBSCRIBED_TAG)?;
                seq.serialize_element(&message.unsubscribe_request)?;
                seq.end()
            }
            Self::Event(message) => {
                let len = 4
                    + payload_len(
                        &message.publish_arguments,
                        &message.publish_arguments_keyword,
                    );
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element(&Self::EVENT_TAG)?;
                seq.serialize_element(&message.subscribed_subscription)?;
                seq.serialize_element(&message.published_publication)?;
                seq.serialize_element(&message.details)?;
                serialize_payload(
                    &mut seq,
                    &message.publish_arguments,
                    &message.publish_arguments_keyword,
                )?;
                seq.end()
            }
            Self::Call(message) => {
                let len = 4 + payload_len(&message.arguments, &message.arguments_keyword);
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element(&Self::CALL_TAG)?;
                seq.serialize_element(&message.request)?;
                seq.serialize_element(&message.options)?;
                seq.serialize_element(&message.procedure)?;
                serialize_payload(&mut seq, &message.arguments, &message.arguments_keyword)?;
                seq.end()
            }
            Self::Result(message) => {
                let len =
                    3 + payload_len(&message.yield_arguments, &message.yield_arguments_keyword);
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element(&Self::RESULT_TAG)?;
                seq.serialize_element(&message.call_request)?;
                seq.serialize_element(&message.details)?;
                serialize_payload(
                    &mut seq,
                    &message.yield_arguments,
                    &message.yield_arguments_keyword,
                )?;
                seq.end()
            }
            Self::Register(message) => {
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(&Self::REGISTER_TAG)?;
                seq.serialize_element(&message.request)?;
                seq.serialize_element(&message.options)?;
                seq.serialize_element(&message.procedure)?;
                seq.end()
            }
            Self::Registered(message) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&Self::REGISTERED_TAG)?;
                seq.serialize_element(&message.register_request)?;
                seq.serialize_element(&message.registration)?;
                seq.end()
            }
            Self::Unregister(message) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&Self::UNREGISTER_TAG)?;
                seq.serialize_element(&message.request)?;
                seq.serialize_element(&message.registered_registration)?;
                seq.end()
            }
            Self::Unregistered(message) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&Self::UNREGISTERED_TAG)?;
                seq.serialize_element(&message.unregister_request)?;
                seq.end()
            }
            Self::Invocation(message) => {
                let len = 4 + payload_len(&message.call_arguments, &message.call_arguments_keyword);
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element(&Self::INVOCATION_TAG)?;
                seq.serialize_element(&message.request)?;
                seq.serialize_element(&message.registered_registration)?;
                seq.serialize_element(&message.details)?;
                serialize_payload(
                    &mut seq,
                    &message.call_arguments,
                    &message.call_arguments_keyword,
                )?;
                seq.end()
            }
            Self::Yield(message) => {
                let len = 3 + payload_len(&message.arguments, &message.arguments_keyword);
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element(&Self::YIELD_TAG)?;
                seq.serialize_element(&message.invocation_request)?;
                seq.serialize_element(&message.options)?;
                serialize_payload(&mut seq, &message.arguments, &message.arguments_keyword)?;
                seq.end()
            }
        }
    }
}

/// Reads the next wire field, erroring out if the array ends early.
fn next_required<'de, A, T>(seq: &mut A, name: &'static str) -> Result<T, A::Error>
where
    A: SeqAccess<'de>,
    T: Deserialize<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::custom(format_args!("{name} message ended early")))
}

struct MessageVisitor;

impl<'de> Visitor<'de> for MessageVisitor {
    type Value = Message;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a WAMP message array")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let tag: Integer = next_required(&mut seq, "WAMP")?;
        match tag {
            Message::HELLO_TAG => Ok(Message::Hello(HelloMessage {
                realm: next_required(&mut seq, "HELLO")?,
                details: seq.next_element()?.unwrap_or_default(),
            })),
            Message::WELCOME_TAG => Ok(Message::Welcome(WelcomeMessage {
                session: next_required(&mut seq, "WELCOME")?,
                details: seq.next_element()?.unwrap_or_default(),
            })),
            Message::ABORT_TAG => Ok(Message::Abort(AbortMessage {
                details: next_required(&mut seq, "ABORT")?,
                reason: next_required(&mut seq, "ABORT")?,
            })),
            Message::GOODBYE_TAG => Ok(Message::Goodbye(GoodbyeMessage {
                details: next_required(&mut seq, "GOODBYE")?,
                reason: next_required(&mut seq, "GOODBYE")?,
            })),
            Message::ERROR_TAG => {
                let request_type: Integer = next_required(&mut seq, "ERROR")?;
                if !Message::is_known_tag(request_type) {
                    return Err(de::Error::custom(format_args!(
                        "unknown request type {request_type} in ERROR message"
                    )));
                }
                Ok(Message::Error(ErrorMessage {
                    request_type,
                    request: next_required(&mut seq, "ERROR")?,
                    details: next_required(&mut seq, "ERROR")?,
                    error: next_required(&mut seq, "ERROR")?,
                    arguments: seq.next_element()?,
                    arguments_keyword: seq.next_element()?,
                }))
            }
            Message::PUBLISH_TAG => Ok(Message::Publish(PublishMessage {
                request: next_required(&mut seq, "PUBLISH")?,
                options: next_required(&mut seq, "PUBLISH")?,
                topic: next_required(&mut seq, "PUBLISH")?,
                arguments: seq.next_element()?,
                arguments_keyword: seq.next_element()?,
            })),
            Message::PUBLISHED_TAG => Ok(Message::Published(PublishedMessage {
                publish_request: next_required(&mut seq, "PUBLISHED")?,
                publication: next_required(&mut seq, "PUBLISHED")?,
            })),
            Message::SUBSCRIBE_TAG => Ok(Message::Subscribe(SubscribeMessage {
                request: next_required(&mut seq, "SUBSCRIBE")?,
                options: next_required(&mut seq, "SUBSCRIBE")?,
                topic: next_required(&mut seq, "SUBSCRIBE")?,
            })),
            Message::SUBSCRIBED_TAG => Ok(Message::Subscribed(SubscribedMessage {
                subscribe_request: next_required(&mut seq, "SUBSCRIBED")?,
                subscription: next_required(&mut seq, "SUBSCRIBED")?,
            })),
            Message::UNSUBSCRIBE_TAG => Ok(Message::Unsubscribe(UnsubscribeMessage {
                request: next_required(&mut seq, "UNSUBSCRIBE")?,
                subscribed_subscription: next_required(&mut seq, "UNSUBSCRIBE")?,
            })),
            Message::UNSUBSCRIBED_TAG => Ok(Message::Unsubscribed(UnsubscribedMessage {
                unsubscribe_request: next_required(&mut seq, "UNSUBSCRIBED")?,
            })),
            Message::EVENT_TAG => Ok(Message::Event(EventMessage {
                subscribed_subscription: next_required(&mut seq, "EVENT")?,
                published_publication: next_required(&mut seq, "EVENT")?,
                details: next_required(&mut seq, "EVENT")?,
                publish_arguments: seq.next_element()?,
                publish_arguments_keyword: seq.next_element()?,
            })),
            Message::CALL_TAG => Ok(Message::Call(CallMessage {
                request: next_required(&mut seq, "CALL")?,
                options: next_required(&mut seq, "CALL")?,
                procedure: next_required(&mut seq, "CALL")?,
                arguments: seq.next_element()?,
                arguments_keyword: seq.next_element()?,
            })),
            Message::RESULT_TAG => Ok(Message::Result(ResultMessage {
                call_request: next_required(&mut seq, "RESULT")?,
                details: next_required(&mut seq, "RESULT")?,
                yield_arguments: seq.next_element()?,
                yield_arguments_keyword: seq.next_element()?,
            })),
            Message::REGISTER_TAG => Ok(Message::Register(RegisterMessage {
                request: next_required(&mut seq, "REGISTER")?,
                options: next_required(&mut seq, "REGISTER")?,
                procedure: next_required(&mut seq, "REGISTER")?,
            })),
            Message::REGISTERED_TAG => Ok(Message::Registered(RegisteredMessage {
                register_request: next_required(&mut seq, "REGISTERED")?,
                registration: next_required(&mut seq, "REGISTERED")?,
            })),
            Message::UNREGISTER_TAG => Ok(Message::Unregister(UnregisterMessage {
                request: next_required(&mut seq, "UNREGISTER")?,
                registered_registration: next_required(&mut seq, "UNREGISTER")?,
            })),
            Message::UNREGISTERED_TAG => Ok(Message::Unregistered(UnregisteredMessage {
                unregister_request: next_required(&mut seq, "UNREGISTERED")?,
            })),
            Message::INVOCATION_TAG => Ok(Message::Invocation(InvocationMessage {
                request: next_required(&mut seq, "INVOCATION")?,
                registered_registration: next_required(&mut seq, "INVOCATION")?,
                details: next_required(&mut seq, "INVOCATION")?,
                call_arguments: seq.next_element()?,
                call_arguments_keyword: seq.next_element()?,
            })),
            Message::YIELD_TAG => Ok(Message::Yield(YieldMessage {
                invocation_request: next_required(&mut seq, "YIELD")?,
                options: next_required(&mut seq, "YIELD")?,
                arguments: seq.next_element()?,
                arguments_keyword: seq.next_element()?,
            })),
            tag => Err(de::Error::custom(format_args!(
                "unknown message type {tag}"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(MessageVisitor)
    }
}
