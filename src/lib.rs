//! Asterisk REST Interface (ARI) client over a message bus
//!
//! This crate talks to an ARI gateway through NATS instead of HTTP/WebSocket: every
//! resource operation is a request/reply exchange on a subject, and Asterisk events
//! arrive as bus messages.
//!
//! # Architecture
//!
//! - [`Connection`] (Send + Sync, shared through `Arc`): owns the transport and the
//!   effective [`Options`], bounds every request by the request timeout
//! - Dispatcher ([`dispatch`]): read operations are retried up to
//!   `read_operation_retry_count` times on timeout or transport failure, writes are
//!   issued exactly once
//! - [`Bus`]: one subscription per event subject, fanned out to any number of
//!   listeners, each running in its own task
//! - [`Client`]: every resource client wired to one connection, with a single
//!   [`cleanup`](Client::cleanup)
//!
//! # Examples
//!
//! ## Queries and commands
//!
//! ```rust,no_run
//! use ari_nats_tokio::{Client, Options};
//! use ari_nats_tokio::resources::{OriginateRequest, PlayOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ari_nats_tokio::AriError> {
//!     let client = Client::connect("nats://127.0.0.1:4222", Options::default()).await?;
//!
//!     let info = client.asterisk().info(&["system"]).await?;
//!     println!("{:?}", info.system);
//!
//!     let channel = client
//!         .channel()
//!         .originate(&OriginateRequest::new("PJSIP/alice").with_app("demo", None::<&str>))
//!         .await?;
//!     let playback = client
//!         .channel()
//!         .play(&channel.id, &PlayOptions::new("sound:hello-world"))
//!         .await?;
//!     playback.stop().await?;
//!
//!     client.cleanup().await
//! }
//! ```
//!
//! ## Events
//!
//! ```rust,no_run
//! use ari_nats_tokio::{Client, EventType, Options};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ari_nats_tokio::AriError> {
//!     let client = Client::connect("nats://127.0.0.1:4222", Options::default()).await?;
//!
//!     let mut events = client.bus().subscribe(EventType::All).await?;
//!     while let Some(event) = events.recv().await {
//!         println!("{} on {:?}", event.kind(), event.channel_id());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a server
//!
//! [`MemoryTransport`](transport::MemoryTransport) is an in-process bus with the same
//! subject semantics; one clone plays the gateway, the other backs the client.

#[macro_use]
mod macros;

pub mod bus;
pub mod client;
pub mod connection;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod reply;
pub mod resources;
pub mod subject;
pub mod transport;

pub use bus::{Bus, EventStream, Listener};
pub use client::Client;
pub use connection::{Connection, ConnectionStatus, Options};
pub use constants::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_SUBJECT_PREFIX};
pub use dispatch::Operation;
pub use error::{AriError, AriResult};
pub use event::{AriEvent, EventType, ParseEventTypeError};
pub use reply::{Reply, ReplyStatus};
pub use transport::{BusMessage, Subscription, Transport};
