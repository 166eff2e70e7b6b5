use std::sync::{
    Arc,
    OnceLock,
};

use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::{
        handshake::server::{
            ErrorResponse,
            Request,
            Response,
        },
        http::{
            header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue,
            StatusCode,
        },
    },
    MaybeTlsStream,
    WebSocketStream,
};

use crate::{
    core::hash::HashSet,
    router::acceptor::acceptor::{
        Acceptance,
        Acceptor,
        AcceptorFactory,
    },
    serializer::serializer::SerializerType,
};

fn reject_response<S>(message: S) -> ErrorResponse
where
    S: Into<String>,
{
    let mut response = ErrorResponse::new(Some(message.into()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

/// Negotiates the WAMP subprotocol during the WebSocket handshake.
///
/// A client that does not offer a supported `Sec-WebSocket-Protocol` value is rejected with
/// HTTP 400.
fn negotiate_subprotocol(
    supported_protocols: HashSet<String>,
    selected_protocol: Arc<OnceLock<String>>,
) -> impl FnOnce(&Request, Response) -> Result<Response, ErrorResponse> {
    move |request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
        let selected = request
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|protocols| match protocols.to_str() {
                Ok(protocols) => protocols
                    .split(',')
                    .find(|protocol| supported_protocols.contains(protocol.trim())),
                Err(_) => None,
            });
        let selected = match selected {
            Some(protocol) => protocol.trim(),
            None => return Err(reject_response("no supported protocol")),
        };
        let header = match HeaderValue::from_str(selected) {
            Ok(header) => header,
            Err(_) => return Err(reject_response("failed to create response header")),
        };
        selected_protocol.set(selected.to_owned()).ok();
        response
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, header);
        Ok(response)
    }
}

#[derive(Default)]
struct WebSocketAcceptor {}

#[async_trait]
impl Acceptor<WebSocketStream<MaybeTlsStream<TcpStream>>> for WebSocketAcceptor {
    async fn accept(
        &self,
        stream: MaybeTlsStream<TcpStream>,
    ) -> Result<Acceptance<WebSocketStream<MaybeTlsStream<TcpStream>>>> {
        let supported_protocols =
            HashSet::from_iter([SerializerType::Json.uri().as_ref().to_owned()]);
        let selected_protocol = Arc::new(OnceLock::new());
        let stream = tokio_tungstenite::accept_hdr_async(
            stream,
            negotiate_subprotocol(supported_protocols, selected_protocol.clone()),
        )
        .await?;
        let protocol = selected_protocol
            .get()
            .cloned()
            .ok_or_else(|| Error::msg("expected protocol after negotiation"))?;
        let serializer = SerializerType::try_from(protocol.as_str()).map_err(Error::msg)?;
        Ok(Acceptance { stream, serializer })
    }
}

/// A factory for an [`Acceptor`] for WebSocket connections.
#[derive(Default)]
pub struct WebSocketAcceptorFactory {}

impl AcceptorFactory<WebSocketStream<MaybeTlsStream<TcpStream>>> for WebSocketAcceptorFactory {
    fn new_acceptor(&self) -> Box<dyn Acceptor<WebSocketStream<MaybeTlsStream<TcpStream>>>> {
        Box::new(WebSocketAcceptor::default())
    }
}
