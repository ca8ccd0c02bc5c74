//! In-process transport.
//!
//! Routes published messages to every subscription whose pattern matches, with the
//! same `*` / `>` wildcard rules NATS uses. Requests get a private inbox that is torn
//! down when the request returns, so replies arriving after a timeout have nowhere to
//! go and are dropped.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::{BusMessage, Subscription, Transport};
use crate::constants::{DEFAULT_EVENT_QUEUE_SIZE, INBOX_PREFIX};
use crate::error::{AriError, AriResult};
use crate::subject;

struct Route {
    id: u64,
    pattern: String,
    tx: mpsc::Sender<BusMessage>,
}

struct Inner {
    routes: Mutex<Vec<Route>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    capacity: usize,
}

impl Inner {
    fn routes(&self) -> MutexGuard<'_, Vec<Route>> {
        self.routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_open(&self) -> AriResult<()> {
        if self
            .closed
            .load(Ordering::Acquire)
        {
            return Err(AriError::ConnectionClosed);
        }
        Ok(())
    }

    fn register(self: &Arc<Self>, pattern: &str) -> AriResult<Subscription> {
        self.ensure_open()?;
        subject::validate_pattern(pattern)?;

        let id = self
            .next_id
            .fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);
        self.routes()
            .push(Route {
                id,
                pattern: pattern.to_string(),
                tx,
            });
        trace!("[MEMORY] subscription {} on {}", id, pattern);

        let weak = Arc::downgrade(self);
        Ok(Subscription::new(pattern, rx, move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .routes()
                    .retain(|r| r.id != id);
            }
        }))
    }

    /// Deliver to every matching route without blocking the publisher.
    /// Returns the number of routes the message was handed to.
    fn deliver(&self, message: BusMessage) -> usize {
        let targets: Vec<mpsc::Sender<BusMessage>> = self
            .routes()
            .iter()
            .filter(|r| subject::matches(&r.pattern, &message.subject))
            .map(|r| r.tx.clone())
            .collect();

        let mut delivered = 0;
        for tx in targets {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("[MEMORY] subscriber queue full, dropping message on {}", message.subject);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    fn has_responder(&self, subject: &str) -> bool {
        self.routes()
            .iter()
            .any(|r| subject::matches(&r.pattern, subject))
    }
}

/// In-process bus (Clone + Send + Sync).
///
/// Clones share the same routing table, so one clone can act as the gateway while
/// another is handed to a [`Client`](crate::Client).
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), ari_nats_tokio::AriError> {
/// use ari_nats_tokio::transport::{MemoryTransport, Transport};
/// use bytes::Bytes;
///
/// let bus = MemoryTransport::new();
/// let mut sub = bus.subscribe("ari.events.>").await?;
/// bus.publish("ari.events.StasisStart", Bytes::from_static(b"{}")).await?;
/// assert_eq!(sub.recv().await.unwrap().subject, "ari.events.StasisStart");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("subscriptions", &self.subscription_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Create a bus with the default per-subscription queue size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_QUEUE_SIZE)
    }

    /// Create a bus whose subscriptions buffer at most `capacity` messages each.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                routes: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Number of live subscriptions, request inboxes included.
    pub fn subscription_count(&self) -> usize {
        self.inner
            .routes()
            .len()
    }

    /// Whether [`close`](Transport::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner
            .closed
            .load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn request(&self, subject: &str, payload: Bytes, timeout: Duration) -> AriResult<Bytes> {
        self.inner
            .ensure_open()?;
        subject::validate_subject(subject)?;

        if !self
            .inner
            .has_responder(subject)
        {
            return Err(AriError::transport(format!("no responders on {}", subject)));
        }

        let inbox = format!(
            "{}.{}",
            INBOX_PREFIX,
            self.inner
                .next_id
                .fetch_add(1, Ordering::Relaxed)
        );
        let mut replies = self
            .inner
            .register(&inbox)?;

        self.inner
            .deliver(BusMessage {
                subject: subject.to_string(),
                payload,
                reply: Some(inbox),
            });

        // `replies` is dropped on every path out, which removes the inbox route.
        match tokio::time::timeout(timeout, replies.recv()).await {
            Ok(Some(message)) => Ok(message.payload),
            Ok(None) => Err(AriError::ConnectionClosed),
            Err(_) => {
                debug!("[MEMORY] request on {} timed out", subject);
                Err(AriError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn publish(&self, subject: &str, payload: Bytes) -> AriResult<()> {
        self.inner
            .ensure_open()?;
        subject::validate_subject(subject)?;
        let delivered = self
            .inner
            .deliver(BusMessage {
                subject: subject.to_string(),
                payload,
                reply: None,
            });
        trace!("[MEMORY] published on {} to {} subscribers", subject, delivered);
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> AriResult<Subscription> {
        self.inner
            .register(pattern)
    }

    async fn close(&self) -> AriResult<()> {
        if self
            .inner
            .closed
            .swap(true, Ordering::AcqRel)
        {
            return Ok(());
        }
        // Dropping the senders ends every open subscription stream.
        self.inner
            .routes()
            .clear();
        debug!("[MEMORY] transport closed");
        Ok(())
    }
}
