#![allow(dead_code)]

use std::{
    sync::Once,
    time::Duration,
};

use anyhow::Result;
use futures_util::{
    SinkExt,
    StreamExt,
};
use tokio::time::timeout;
use wamp_broker::{
    core::{
        id::Id,
        stream::{
            MessageStream,
            StreamMessage,
        },
        types::{
            Dictionary,
            Value,
        },
        uri::Uri,
    },
    message::message::{
        HelloMessage,
        Message,
        PublishMessage,
        SubscribeMessage,
        UnsubscribeMessage,
    },
    router::{
        new_web_socket_router,
        RouterConfig,
        RouterHandle,
    },
};

static INIT: Once = Once::new();

pub fn setup_test_environment() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing_core::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    });
}

pub async fn start_router_with_config(config: RouterConfig) -> Result<RouterHandle> {
    new_web_socket_router(config)?.start().await
}

pub async fn start_router() -> Result<RouterHandle> {
    start_router_with_config(RouterConfig::default()).await
}

/// An in-process peer driving the router over a direct connection.
pub struct DirectPeer {
    stream: Box<dyn MessageStream>,
}

impl DirectPeer {
    pub fn connect(router_handle: &RouterHandle) -> Self {
        Self {
            stream: router_handle.direct_connect().stream(),
        }
    }

    pub async fn send(&mut self, message: Message) {
        self.stream
            .send(StreamMessage::Message(message))
            .await
            .expect("failed to send message to the router");
    }

    pub async fn receive(&mut self) -> Message {
        match timeout(Duration::from_secs(5), self.stream.next()).await {
            Ok(Some(Ok(StreamMessage::Message(message)))) => message,
            Ok(Some(Ok(StreamMessage::Ping(_)))) => panic!("received unexpected ping"),
            Ok(Some(Err(err))) => panic!("stream failed: {err}"),
            Ok(None) => panic!("stream closed while waiting for a message"),
            Err(_) => panic!("timed out waiting for a message"),
        }
    }

    /// Asserts that the router sends nothing to this peer for a short while.
    pub async fn assert_silent(&mut self) {
        match timeout(Duration::from_millis(200), self.stream.next()).await {
            Ok(Some(Ok(StreamMessage::Message(message)))) => {
                panic!("expected silence, but received {message:?}")
            }
            Ok(Some(Ok(StreamMessage::Ping(_)))) => panic!("expected silence, but received a ping"),
            Ok(Some(Err(err))) => panic!("expected silence, but the stream failed: {err}"),
            // Either nothing arrived or the stream ended quietly.
            Ok(None) | Err(_) => (),
        }
    }

    /// Waits for the router to close the connection.
    pub async fn assert_closed(&mut self) {
        loop {
            match timeout(Duration::from_secs(5), self.stream.next()).await {
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(_))) | Ok(None) => return,
                Err(_) => panic!("timed out waiting for the connection to close"),
            }
        }
    }
}

pub fn roles_details(roles: &[&str]) -> Dictionary {
    Dictionary::from_iter([(
        "roles".to_owned(),
        Value::Dictionary(Dictionary::from_iter(roles.iter().map(|role| {
            (
                (*role).to_owned(),
                Value::Dictionary(Dictionary::default()),
            )
        }))),
    )])
}

pub fn hello(realm: &str, roles: &[&str]) -> Message {
    Message::Hello(HelloMessage {
        realm: Uri::try_from(realm).unwrap(),
        details: roles_details(roles),
    })
}

pub fn subscribe(request: u64, topic: &str) -> Message {
    Message::Subscribe(SubscribeMessage {
        request: Id::try_from(request).unwrap(),
        options: Dictionary::default(),
        topic: Uri::try_from(topic).unwrap(),
    })
}

pub fn unsubscribe(request: u64, subscription: Id) -> Message {
    Message::Unsubscribe(UnsubscribeMessage {
        request: Id::try_from(request).unwrap(),
        subscribed_subscription: subscription,
    })
}

pub fn publish(request: u64, topic: &str, arguments: Option<Vec<Value>>) -> Message {
    Message::Publish(PublishMessage {
        request: Id::try_from(request).unwrap(),
        options: Dictionary::default(),
        topic: Uri::try_from(topic).unwrap(),
        arguments,
        arguments_keyword: None,
    })
}

pub fn publish_with_acknowledge(
    request: u64,
    topic: &str,
    arguments: Option<Vec<Value>>,
) -> Message {
    match publish(request, topic, arguments) {
        Message::Publish(mut message) => {
            message
                .options
                .insert("acknowledge".to_owned(), Value::Bool(true));
            Message::Publish(message)
        }
        _ => unreachable!(),
    }
}

/// Establishes a session in the realm, returning the session ID from the WELCOME message.
pub async fn join_realm(peer: &mut DirectPeer, realm: &str, roles: &[&str]) -> Id {
    peer.send(hello(realm, roles)).await;
    match peer.receive().await {
        Message::Welcome(message) => message.session,
        message => panic!("expected WELCOME, got {message:?}"),
    }
}
