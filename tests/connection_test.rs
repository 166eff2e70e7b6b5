mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::start_router;
use futures_util::{
    SinkExt,
    StreamExt,
};
use tokio::{
    net::TcpStream,
    time::timeout,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{
            header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue,
        },
        Error as WsError,
        Message as WsMessage,
    },
    MaybeTlsStream,
    WebSocketStream,
};
use wamp_broker::router::RouterHandle;

async fn connect_with_subprotocol(
    router_handle: &RouterHandle,
) -> WebSocketStream<MaybeTlsStream<TcpStream>> {
    let mut request = format!("ws://{}", router_handle.local_addr())
        .into_client_request()
        .unwrap();
    request.headers_mut().insert(
        SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_static("wamp.2.json"),
    );
    let (stream, response) = connect_async(request).await.unwrap();
    assert_eq!(
        response.headers().get(SEC_WEBSOCKET_PROTOCOL),
        Some(&HeaderValue::from_static("wamp.2.json")),
    );
    stream
}

/// Reads frames until the server closes the connection, failing on any text frame.
async fn assert_connection_closes(mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>) {
    loop {
        match timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for the connection to close")
        {
            Some(Ok(message)) if message.is_close() => return,
            Some(Ok(message)) if message.is_text() => {
                panic!("expected the connection to close, but received {message}")
            }
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return,
        }
    }
}

#[tokio::test]
async fn establishes_session_over_web_socket() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut stream = connect_with_subprotocol(&router_handle).await;

    stream
        .send(WsMessage::Text(
            r#"[1, "default", {"roles":{"publisher":{}}}]"#.into(),
        ))
        .await
        .unwrap();

    let reply = timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for WELCOME")
        .unwrap()
        .unwrap();
    assert!(reply.is_text());
    assert_matches!(
        serde_json::from_str::<serde_json::Value>(reply.to_text().unwrap()),
        Ok(serde_json::Value::Array(elements)) => {
            assert_eq!(elements.first(), Some(&serde_json::Value::from(2)));
        }
    );
}

#[tokio::test]
async fn rejects_handshake_without_subprotocol() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let result = connect_async(format!("ws://{}", router_handle.local_addr())).await;
    assert_matches!(result, Err(WsError::Http(response)) => {
        assert_eq!(response.status(), 400);
    });
}

#[tokio::test]
async fn closes_connection_on_malformed_message() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut stream = connect_with_subprotocol(&router_handle).await;

    stream
        .send(WsMessage::Text("this is not a WAMP message".into()))
        .await
        .unwrap();

    // The router closes the transport with no in-band reply.
    assert_connection_closes(stream).await;
}

#[tokio::test]
async fn closes_connection_on_binary_frame() {
    common::setup_test_environment();

    let router_handle = start_router().await.unwrap();
    let mut stream = connect_with_subprotocol(&router_handle).await;

    stream
        .send(WsMessage::Binary(vec![1, 2, 3].into()))
        .await
        .unwrap();

    assert_connection_closes(stream).await;
}
