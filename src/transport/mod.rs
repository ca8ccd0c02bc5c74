//! Message-bus transports.
//!
//! [`Transport`] is the contract the [`Connection`](crate::Connection) consumes:
//! subject-addressed request/reply, fire-and-forget publish, pattern subscriptions
//! and an explicit close. [`NatsTransport`] talks to a NATS server;
//! [`MemoryTransport`] routes in-process and is what the test suite runs on.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::AriResult;

mod memory;
#[cfg(feature = "nats")]
mod nats;

pub use memory::MemoryTransport;
#[cfg(feature = "nats")]
pub use nats::NatsTransport;

/// A message as carried by the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    /// Concrete subject the message was published on
    pub subject: String,
    /// Opaque body
    pub payload: Bytes,
    /// Inbox the sender waits on, for request messages
    pub reply: Option<String>,
}

/// Bus operations needed by the client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `payload` to `subject` and wait up to `timeout` for a single reply.
    ///
    /// Only the first reply is returned; anything arriving after the call returned
    /// is discarded by the transport.
    async fn request(&self, subject: &str, payload: Bytes, timeout: Duration) -> AriResult<Bytes>;

    /// Fire-and-forget send.
    async fn publish(&self, subject: &str, payload: Bytes) -> AriResult<()>;

    /// Register interest in a subject pattern.
    async fn subscribe(&self, pattern: &str) -> AriResult<Subscription>;

    /// Close the bus handle. Closing twice is not an error.
    async fn close(&self) -> AriResult<()>;
}

type CancelFn = Box<dyn FnOnce() + Send>;

/// Cancelable stream of messages for one subject pattern (!Clone)
///
/// Dropping the subscription, or calling [`cancel`](Self::cancel), unsubscribes.
pub struct Subscription {
    pattern: String,
    rx: mpsc::Receiver<BusMessage>,
    on_cancel: Option<CancelFn>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pattern", &self.pattern)
            .finish()
    }
}

impl Subscription {
    /// Wrap a receiver; `on_cancel` runs exactly once, on cancel or drop.
    pub fn new(
        pattern: impl Into<String>,
        rx: mpsc::Receiver<BusMessage>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            rx,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Pattern this subscription was registered with.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Receive the next message, or `None` once the transport closed the stream.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx
            .recv()
            .await
    }

    /// Unsubscribe. No message is delivered after this returns.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self
            .on_cancel
            .take()
        {
            self.rx
                .close();
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl futures_util::Stream for Subscription {
    type Item = BusMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx
            .poll_recv(cx)
    }
}
