//! NATS transport backed by `async-nats`.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{BusMessage, Subscription, Transport};
use crate::constants::DEFAULT_EVENT_QUEUE_SIZE;
use crate::error::{AriError, AriResult};

/// NATS bus handle, shared by every resource client through the `Connection`.
pub struct NatsTransport {
    client: async_nats::Client,
    closed: AtomicBool,
    queue_size: usize,
}

impl std::fmt::Debug for NatsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsTransport")
            .field("state", &self.client.connection_state())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl NatsTransport {
    /// Connect to a NATS server.
    pub async fn connect(url: &str) -> AriResult<Self> {
        info!("Connecting to NATS at {}", url);
        let client = async_nats::connect(url)
            .await
            .map_err(|e| {
                warn!("[CONNECT] NATS connect to {} failed: {}", url, e);
                AriError::transport(e)
            })?;
        info!("Connected to NATS at {}", url);
        Ok(Self::new(client))
    }

    /// Wrap an already-established client.
    pub fn new(client: async_nats::Client) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
            queue_size: DEFAULT_EVENT_QUEUE_SIZE,
        }
    }

    /// Bound the queue between each NATS subscriber and its consumer. Zero becomes 1.
    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = size.max(1);
        self
    }

    /// Capacity of each subscription's forwarding queue.
    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    /// Underlying `async-nats` client.
    pub fn client(&self) -> &async_nats::Client {
        &self.client
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
}

#[async_trait]
impl Transport for NatsTransport {
    async fn request(&self, subject: &str, payload: Bytes, timeout: Duration) -> AriResult<Bytes> {
        self.ensure_open()?;
        let timeout_ms = timeout.as_millis() as u64;
        match tokio::time::timeout(timeout, self.client.request(subject.to_string(), payload)).await {
            Ok(Ok(message)) => Ok(message.payload),
            Ok(Err(e)) => match e.kind() {
                async_nats::RequestErrorKind::TimedOut => Err(AriError::Timeout { timeout_ms }),
                _ => Err(AriError::transport(e)),
            },
            Err(_) => Err(AriError::Timeout { timeout_ms }),
        }
    }

    async fn publish(&self, subject: &str, payload: Bytes) -> AriResult<()> {
        self.ensure_open()?;
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(AriError::transport)
    }

    async fn subscribe(&self, pattern: &str) -> AriResult<Subscription> {
        self.ensure_open()?;
        let mut subscriber = self
            .client
            .subscribe(pattern.to_string())
            .await
            .map_err(AriError::transport)?;

        let (tx, rx) = mpsc::channel(self.queue_size);
        let forward_pattern = pattern.to_string();
        let task = tokio::spawn(async move {
            while let Some(message) = subscriber
                .next()
                .await
            {
                let message = BusMessage {
                    subject: message
                        .subject
                        .to_string(),
                    payload: message.payload,
                    reply: message
                        .reply
                        .map(|r| r.to_string()),
                };
                if tx
                    .send(message)
                    .await
                    .is_err()
                {
                    break;
                }
            }
            debug!("[NATS] subscription on {} ended", forward_pattern);
        });

        // Aborting drops the async-nats subscriber, which unsubscribes on the server.
        let abort = task.abort_handle();
        Ok(Subscription::new(pattern, rx, move || abort.abort()))
    }

    async fn close(&self) -> AriResult<()> {
        if self
            .closed
            .swap(true, Ordering::AcqRel)
        {
            debug!("[NATS] close called on already-closed transport");
            return Ok(());
        }
        info!("Draining NATS connection");
        self.client
            .drain()
            .await
            .map_err(AriError::transport)
    }
}
