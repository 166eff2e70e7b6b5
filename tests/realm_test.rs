mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{
    join_realm,
    publish_with_acknowledge,
    start_router_with_config,
    subscribe,
    DirectPeer,
};
use wamp_broker::{
    core::{
        types::{
            Dictionary,
            List,
            Value,
        },
        uri::Uri,
    },
    message::message::{
        GoodbyeMessage,
        Message,
    },
    router::{
        RealmConfig,
        RouterConfig,
    },
};

fn config_with_realms(realms: &[&str]) -> RouterConfig {
    let mut config = RouterConfig::default();
    for realm in realms {
        config.realms.push(RealmConfig {
            name: (*realm).to_owned(),
            uri: Uri::try_from(*realm).unwrap(),
        });
    }
    config
}

#[tokio::test]
async fn events_do_not_cross_realms() {
    common::setup_test_environment();

    let router_handle = start_router_with_config(config_with_realms(&["realm.a", "realm.b"]))
        .await
        .unwrap();
    let mut subscriber = DirectPeer::connect(&router_handle);
    let mut publisher = DirectPeer::connect(&router_handle);

    join_realm(&mut subscriber, "realm.a", &["subscriber"]).await;
    join_realm(&mut publisher, "realm.b", &["publisher"]).await;

    subscriber.send(subscribe(1, "com.myapp.mytopic1")).await;
    assert_matches!(subscriber.receive().await, Message::Subscribed(_));

    publisher
        .send(publish_with_acknowledge(
            2,
            "com.myapp.mytopic1",
            Some(List::from_iter([Value::Integer(1)])),
        ))
        .await;

    // The publication succeeds in its own realm, but the subscriber in the other realm sees
    // nothing.
    assert_matches!(publisher.receive().await, Message::Published(_));
    subscriber.assert_silent().await;
}

#[tokio::test]
async fn sessions_in_different_realms_are_independent() {
    common::setup_test_environment();

    let router_handle = start_router_with_config(config_with_realms(&["realm.a", "realm.b"]))
        .await
        .unwrap();
    let mut peer_a = DirectPeer::connect(&router_handle);
    let mut peer_b = DirectPeer::connect(&router_handle);

    let session_a = join_realm(&mut peer_a, "realm.a", &["subscriber"]).await;
    let session_b = join_realm(&mut peer_b, "realm.b", &["subscriber"]).await;
    assert_ne!(session_a, session_b);

    // Subscriptions to the same topic in different realms do not coalesce.
    peer_a.send(subscribe(1, "com.myapp.mytopic1")).await;
    let subscription_a = assert_matches!(peer_a.receive().await, Message::Subscribed(message) => {
        message.subscription
    });
    peer_b.send(subscribe(1, "com.myapp.mytopic1")).await;
    let subscription_b = assert_matches!(peer_b.receive().await, Message::Subscribed(message) => {
        message.subscription
    });
    assert_ne!(subscription_a, subscription_b);
}

#[tokio::test]
async fn router_shutdown_closes_sessions_with_goodbye() {
    common::setup_test_environment();

    let router_handle = start_router_with_config(RouterConfig::default())
        .await
        .unwrap();
    let mut peer = DirectPeer::connect(&router_handle);

    join_realm(&mut peer, "default", &["publisher"]).await;

    router_handle.cancel().unwrap();

    assert_matches!(peer.receive().await, Message::Goodbye(message) => {
        assert_eq!(message.reason.as_ref(), "wamp.close.system_shutdown");
    });
    peer.send(Message::Goodbye(GoodbyeMessage {
        details: Dictionary::default(),
        reason: Uri::try_from("wamp.close.goodbye_and_out").unwrap(),
    }))
    .await;

    tokio::time::timeout(Duration::from_secs(5), router_handle.join())
        .await
        .expect("router did not shut down in time")
        .unwrap();
}
