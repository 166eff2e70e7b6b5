mod common;

use assert_matches::assert_matches;
use common::{
    hello,
    join_realm,
    publish,
    start_router,
    start_router_with_config,
    subscribe,
    DirectPeer,
};
use wamp_broker::{
    core::{
        id::Id,
        types::{
            Dictionary,
            Value,
        },
        uri::{
            Uri,
            ValidationMode,
        },
    },
    message::message::{
        CallMessage,
        GoodbyeMessage,
        Message,
        WelcomeMessage,
    },
    router::RouterConfig,
};

#[tokio::test]
async fn hello_yields_welcome_with_broker_role() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    peer.send(hello("default", &["publisher"])).await;
    assert_matches!(peer.receive().await, Message::Welcome(message) => {
        let id = u64::from(message.session);
        assert!((Id::MIN..=Id::MAX).contains(&id));
        assert_matches!(message.details.get("roles"), Some(Value::Dictionary(roles)) => {
            assert_matches!(roles.get("broker"), Some(Value::Dictionary(_)));
            assert!(!roles.contains_key("dealer"));
        });
        assert_matches!(message.details.get("agent"), Some(Value::String(_)));
    });
}

#[tokio::test]
async fn repeated_hello_is_ignored() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    join_realm(&mut peer, "default", &["subscriber"]).await;

    // A second HELLO on an open session produces no reply and no state change.
    peer.send(hello("default", &["publisher"])).await;
    peer.assert_silent().await;

    // The original session (and its roles) is still in place.
    peer.send(subscribe(1, "com.myapp.mytopic1")).await;
    assert_matches!(peer.receive().await, Message::Subscribed(_));
}

#[tokio::test]
async fn hello_to_unknown_realm_aborts() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    peer.send(hello("unknown.realm", &["publisher"])).await;
    assert_matches!(peer.receive().await, Message::Abort(message) => {
        assert_eq!(message.reason.as_ref(), "wamp.error.no_such_realm");
        assert_eq!(
            message.details.get("message"),
            Some(&Value::String("The realm 'unknown.realm' does not exist.".to_owned())),
        );
    });

    // The connection survives the failed HELLO.
    join_realm(&mut peer, "default", &["publisher"]).await;
}

#[tokio::test]
async fn hello_auto_creates_realm_when_configured() {
    common::setup_test_environment();

    let mut config = RouterConfig::default();
    config.auto_create_realms = true;
    let router_handle = start_router_with_config(config).await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    join_realm(&mut peer, "unknown.realm", &["publisher"]).await;

    // The realm persists for the next peer.
    let mut other = DirectPeer::connect(&router_handle);
    join_realm(&mut other, "unknown.realm", &["subscriber"]).await;
}

#[tokio::test]
async fn goodbye_before_hello_is_dropped() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    peer.send(Message::Goodbye(GoodbyeMessage {
        details: Dictionary::default(),
        reason: Uri::try_from("wamp.close.goodbye_and_out").unwrap(),
    }))
    .await;
    peer.assert_silent().await;

    // A subsequent HELLO still produces WELCOME.
    join_realm(&mut peer, "default", &["publisher"]).await;
}

#[tokio::test]
async fn goodbye_ends_session_and_allows_a_new_one() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    join_realm(&mut peer, "default", &["subscriber"]).await;

    peer.send(Message::Goodbye(GoodbyeMessage {
        details: Dictionary::default(),
        reason: Uri::try_from("wamp.close.close_realm").unwrap(),
    }))
    .await;
    assert_matches!(peer.receive().await, Message::Goodbye(message) => {
        assert_eq!(message.reason.as_ref(), "wamp.close.goodbye_and_out");
    });

    // The connection can host a fresh session.
    join_realm(&mut peer, "default", &["publisher"]).await;
}

#[tokio::test]
async fn hello_with_invalid_roles_aborts() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    // Roles dictionary is empty.
    peer.send(hello("default", &[])).await;
    assert_matches!(peer.receive().await, Message::Abort(message) => {
        assert_eq!(message.reason.as_ref(), "wamp.error.protocol_violation");
    });

    // Roles dictionary is missing entirely.
    let mut peer = DirectPeer::connect(&router_handle);
    peer.send(
        serde_json::from_str::<Message>(r#"[1, "default", {}]"#).unwrap(),
    )
    .await;
    assert_matches!(peer.receive().await, Message::Abort(message) => {
        assert_eq!(message.reason.as_ref(), "wamp.error.protocol_violation");
    });
}

#[tokio::test]
async fn strict_mode_rejects_nonconforming_realm_uri() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    // The wire accepts any URI without whitespace; the router enforces strict mode.
    peer.send(
        serde_json::from_str::<Message>(
            r#"[1, "Mixed.Case.Realm", {"roles":{"publisher":{}}}]"#,
        )
        .unwrap(),
    )
    .await;
    assert_matches!(peer.receive().await, Message::Abort(message) => {
        assert_eq!(message.reason.as_ref(), "wamp.error.invalid_uri");
    });
}

#[tokio::test]
async fn loose_mode_accepts_nonconforming_realm_uri() {
    common::setup_test_environment();

    let mut config = RouterConfig::default();
    config.validation_mode = ValidationMode::Loose;
    config.auto_create_realms = true;
    let router_handle = start_router_with_config(config).await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    peer.send(
        serde_json::from_str::<Message>(
            r#"[1, "Mixed.Case.Realm", {"roles":{"publisher":{}}}]"#,
        )
        .unwrap(),
    )
    .await;
    assert_matches!(peer.receive().await, Message::Welcome(_));
}

#[tokio::test]
async fn unexpected_message_is_dropped_by_default() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    // A router-to-peer message from a peer is a protocol violation. The default policy drops
    // it.
    peer.send(Message::Welcome(WelcomeMessage {
        session: Id::try_from(1).unwrap(),
        details: Dictionary::default(),
    }))
    .await;
    peer.assert_silent().await;

    join_realm(&mut peer, "default", &["publisher"]).await;
}

#[tokio::test]
async fn unexpected_message_aborts_when_configured() {
    common::setup_test_environment();

    let mut config = RouterConfig::default();
    config.abort_on_protocol_violation = true;
    let router_handle = start_router_with_config(config).await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    peer.send(Message::Welcome(WelcomeMessage {
        session: Id::try_from(1).unwrap(),
        details: Dictionary::default(),
    }))
    .await;
    assert_matches!(peer.receive().await, Message::Abort(message) => {
        assert_eq!(message.reason.as_ref(), "wamp.error.protocol_violation");
    });
    peer.assert_closed().await;
}

#[tokio::test]
async fn broker_messages_before_hello_are_dropped() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    peer.send(subscribe(1, "com.myapp.mytopic1")).await;
    peer.send(publish(2, "com.myapp.mytopic1", None)).await;
    peer.assert_silent().await;

    join_realm(&mut peer, "default", &["subscriber"]).await;
}

#[tokio::test]
async fn call_is_refused_without_dealer_role() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    join_realm(&mut peer, "default", &["caller"]).await;

    peer.send(Message::Call(CallMessage {
        request: Id::try_from(7814135).unwrap(),
        options: Dictionary::default(),
        procedure: Uri::try_from("com.myapp.ping").unwrap(),
        arguments: None,
        arguments_keyword: None,
    }))
    .await;
    assert_matches!(peer.receive().await, Message::Error(message) => {
        assert_eq!(message.request_type, Message::CALL_TAG);
        assert_eq!(u64::from(message.request), 7814135);
        assert_eq!(message.error.as_ref(), "wamp.error.not_allowed");
    });
}
