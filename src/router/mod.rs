mod acceptor;
mod broker;
mod connection;
mod context;
mod realm;
mod router;
mod session;
mod web_socket_router;

pub use realm::RealmConfig;
pub use router::{
    DirectConnection,
    Router,
    RouterConfig,
    RouterHandle,
};
pub use web_socket_router::{
    new_web_socket_router,
    WebSocketRouter,
};
