//! Connection management for the ARI bus

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, trace, warn};

use crate::constants::{
    DEFAULT_EVENT_QUEUE_SIZE, DEFAULT_READ_RETRY_COUNT, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SUBJECT_PREFIX,
};
use crate::error::{AriError, AriResult};
use crate::subject;
use crate::transport::{Subscription, Transport};

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionStatus {
    /// Requests, publishes and subscriptions are accepted.
    Connected,
    /// `close()` ran; every operation fails with [`AriError::ConnectionClosed`].
    Closed,
}

/// Options for the ARI bus client.
///
/// Fixed once the [`Connection`] is built. Use [`Default::default()`] for standard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Extra attempts granted to read operations after a transport failure or timeout.
    /// Default: 0 (no retry).
    pub read_operation_retry_count: u32,
    /// Per-attempt reply timeout. Zero means the 200ms default.
    pub request_timeout: Duration,
    /// Capacity of each event listener queue and, for clients built on NATS, of each
    /// subscription's forwarding queue. Default: 1000.
    pub event_queue_size: usize,
    /// First subject token. Default: `ari`.
    pub subject_prefix: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            read_operation_retry_count: DEFAULT_READ_RETRY_COUNT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            event_queue_size: DEFAULT_EVENT_QUEUE_SIZE,
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
        }
    }
}

impl Options {
    /// Set the read retry count.
    pub fn with_read_operation_retry_count(mut self, count: u32) -> Self {
        self.read_operation_retry_count = count;
        self
    }

    /// Set the per-attempt request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the listener queue capacity.
    pub fn with_event_queue_size(mut self, size: usize) -> Self {
        self.event_queue_size = size;
        self
    }

    /// Set the subject prefix.
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    /// Replace unset values with their defaults.
    ///
    /// A zero `request_timeout` becomes [`DEFAULT_REQUEST_TIMEOUT`], a zero queue size
    /// becomes 1 and an empty prefix becomes `ari`. [`Connection::new`] calls this once;
    /// nothing is substituted per request.
    ///
    /// ```
    /// # use ari_nats_tokio::Options;
    /// # use std::time::Duration;
    /// let opts = Options::default()
    ///     .with_request_timeout(Duration::ZERO)
    ///     .normalize();
    /// assert_eq!(opts.request_timeout, Duration::from_millis(200));
    /// ```
    pub fn normalize(mut self) -> Self {
        if self
            .request_timeout
            .is_zero()
        {
            self.request_timeout = DEFAULT_REQUEST_TIMEOUT;
        }
        self.event_queue_size = self
            .event_queue_size
            .max(1);
        if self
            .subject_prefix
            .is_empty()
        {
            self.subject_prefix = DEFAULT_SUBJECT_PREFIX.to_string();
        }
        self
    }
}

/// Shared bus connection (Send + Sync, share through `Arc`)
///
/// Owns the transport handle and the effective [`Options`]. Request/reply,
/// publish and subscribe all go through here; the typed read/write helpers live in
/// [`dispatch`](crate::dispatch).
pub struct Connection {
    transport: Arc<dyn Transport>,
    options: Options,
    closed: AtomicBool,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("options", &self.options)
            .field("status", &self.status())
            .finish()
    }
}

impl Connection {
    /// Wrap a transport. Options are normalized here, exactly once.
    pub fn new(transport: Arc<dyn Transport>, options: Options) -> Self {
        let options = options.normalize();
        debug!(
            "Connection created: timeout={}ms read_retries={}",
            options
                .request_timeout
                .as_millis(),
            options.read_operation_retry_count
        );
        let (status_tx, _) = watch::channel(ConnectionStatus::Connected);
        Self {
            transport,
            options,
            closed: AtomicBool::new(false),
            status_tx,
        }
    }

    /// Effective options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Per-attempt timeout in effect.
    pub fn request_timeout(&self) -> Duration {
        self.options
            .request_timeout
    }

    /// Build `<prefix>.<resource>.<action>[.<id>]` with this connection's prefix.
    pub fn subject(&self, resource: &str, action: &str, id: Option<&str>) -> String {
        subject::resource(&self.options.subject_prefix, resource, action, id)
    }

    fn ensure_connected(&self) -> AriResult<()> {
        if self
            .closed
            .load(Ordering::Acquire)
        {
            return Err(AriError::ConnectionClosed);
        }
        Ok(())
    }

    /// Send `payload` to `subject` and wait for one reply.
    ///
    /// The wait is bounded by `wait` regardless of how the transport behaves; on
    /// expiry the pending reply is abandoned and `Timeout` is returned.
    pub async fn request(&self, subject: &str, payload: Bytes, wait: Duration) -> AriResult<Bytes> {
        self.ensure_connected()?;
        trace!("[REQUEST] {} ({} bytes)", subject, payload.len());

        let started = Instant::now();
        let result = match timeout(wait, self.transport.request(subject, payload, wait)).await {
            Ok(result) => result,
            Err(_) => Err(AriError::Timeout {
                timeout_ms: wait.as_millis() as u64,
            }),
        };

        match &result {
            Ok(reply) => debug!(
                "[REQUEST] {} replied in {}ms ({} bytes)",
                subject,
                started
                    .elapsed()
                    .as_millis(),
                reply.len()
            ),
            Err(e) => debug!("[REQUEST] {} failed: {}", subject, e),
        }
        result
    }

    /// Fire-and-forget send.
    pub async fn publish(&self, subject: &str, payload: Bytes) -> AriResult<()> {
        self.ensure_connected()?;
        trace!("[PUBLISH] {} ({} bytes)", subject, payload.len());
        self.transport
            .publish(subject, payload)
            .await
    }

    /// Register interest in `pattern`; cancel or drop the subscription to stop it.
    pub async fn subscribe(&self, pattern: &str) -> AriResult<Subscription> {
        self.ensure_connected()?;
        let subscription = self
            .transport
            .subscribe(pattern)
            .await?;
        debug!("Subscribed to {}", pattern);
        Ok(subscription)
    }

    /// Close the transport. Only the first call does anything; concurrent and
    /// repeated calls return `Ok(())`.
    pub async fn close(&self) -> AriResult<()> {
        if self
            .closed
            .swap(true, Ordering::AcqRel)
        {
            debug!("Connection already closed");
            return Ok(());
        }
        info!("Closing bus connection");
        self.status_tx
            .send_replace(ConnectionStatus::Closed);
        if let Err(e) = self
            .transport
            .close()
            .await
        {
            warn!("Transport close failed: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// Whether the connection is still open.
    pub fn is_connected(&self) -> bool {
        !self
            .closed
            .load(Ordering::Acquire)
    }

    /// Current connection status snapshot.
    pub fn status(&self) -> ConnectionStatus {
        *self
            .status_tx
            .borrow()
    }

    /// Watch for the transition to [`ConnectionStatus::Closed`].
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx
            .subscribe()
    }
}
