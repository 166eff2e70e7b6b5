//! # wamp-broker
//!
//! **wamp-broker** is a router-side implementation of the **Web Application Messaging
//! Protocol** (WAMP) Basic Profile for Rust, covering the broker role: realms, sessions,
//! and publish/subscribe event routing.
//!
//! The library uses [`tokio`](https://tokio.rs) as its asynchronous runtime, and is ready for
//! use on top of WebSocket streams speaking the `wamp.2.json` subprotocol.
//!
//! ## What is WAMP?
//!
//! **WAMP** is an open standard, routed protocol that provides two messaging patterns: Publish &
//! Subscribe and routed Remote Procedure Calls. It is intended to connect application components
//! in distributed applications. WAMP uses WebSocket as its default transport.
//!
//! The WAMP protocol specification is described [here](https://wamp-proto.org/spec.html).
//!
//! This crate implements the routing side only. Peers attach to a realm by sending `HELLO`,
//! receive `WELCOME`, and may then subscribe to topics and publish events to them. The dealer
//! (RPC) role is not implemented; calls and registrations are refused.
//!
//! ## Routers
//!
//! Configure a router through a [`RouterConfig`][`crate::router::RouterConfig`] and construct a
//! [`Router`][`crate::router::Router`] directly. If you are working with WebSocket connections,
//! the [`new_web_socket_router`][`crate::router::new_web_socket_router`] utility function sets up
//! the proper modules for convenience.
//!
//! A router is a full-fledged server that manages resources and interactions between peers. It
//! runs in a background task transparent to the caller and is interacted with through the
//! returned [`RouterHandle`][`crate::router::RouterHandle`].
//!
//! ```no_run
//! use wamp_broker::{
//!     core::uri::Uri,
//!     router::{
//!         RealmConfig,
//!         RouterConfig,
//!         new_web_socket_router,
//!     },
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = RouterConfig::default();
//!     config.port = 8080;
//!     config.realms.push(RealmConfig {
//!         name: "Test Realm".to_owned(),
//!         uri: Uri::try_from("com.wamp_broker.realm.test").unwrap(),
//!     });
//!
//!     let router = new_web_socket_router(config).unwrap();
//!
//!     // Start the router in a background task.
//!     let router_handle = router.start().await.unwrap();
//!
//!     // Let the router run for as long as desired...
//!
//!     // Cancel and wait for the router to terminate.
//!     router_handle.cancel().unwrap();
//!     router_handle.join().await.unwrap();
//! }
//! ```
//!
//! In-process components can skip the WebSocket layer entirely with
//! [`RouterHandle::direct_connect`][`crate::router::RouterHandle::direct_connect`], which yields
//! a channel-backed message stream speaking typed [`Message`][`crate::message::message::Message`]
//! values directly.

pub mod core;
pub mod message;
pub mod router;
pub mod serializer;
pub mod transport;
