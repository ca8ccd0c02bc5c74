//! In-process ARI gateway for integration tests.
//!
//! Answers requests on a `MemoryTransport` the way the real gateway would, with
//! per-route hit counters and optional delayed or missing replies.

#![allow(dead_code)]

use ari_nats_tokio::transport::{MemoryTransport, Subscription, Transport};
use ari_nats_tokio::{AriError, AriEvent, AriResult, BusMessage, Client, Options, Reply};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the gateway does with one request.
pub enum Answer {
    Reply(Reply),
    After(Duration, Reply),
    Silent,
}

impl From<Reply> for Answer {
    fn from(reply: Reply) -> Self {
        Answer::Reply(reply)
    }
}

/// Requests seen on one route.
#[derive(Clone, Default)]
pub struct Route {
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<BusMessage>>>,
}

impl Route {
    pub fn hits(&self) -> usize {
        self.hits
            .load(Ordering::SeqCst)
    }

    pub fn subjects(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.subject.clone())
            .collect()
    }

    /// JSON body of the most recent request (`Null` for an empty body).
    pub fn last_body(&self) -> Value {
        let seen = self
            .seen
            .lock()
            .unwrap();
        match seen.last() {
            Some(m) if !m.payload.is_empty() => serde_json::from_slice(&m.payload).unwrap(),
            _ => Value::Null,
        }
    }
}

#[derive(Clone, Default)]
pub struct Gateway {
    pub bus: MemoryTransport,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self, options: Options) -> Client {
        Client::from_transport(Arc::new(self.bus.clone()), options)
    }

    /// Serve `pattern`. `answer` gets the request and its 1-based hit number.
    pub async fn route<F, A>(&self, pattern: &str, answer: F) -> Route
    where
        F: Fn(&BusMessage, usize) -> A + Send + Sync + 'static,
        A: Into<Answer>,
    {
        let route = Route::default();
        let mut sub = self
            .bus
            .subscribe(pattern)
            .await
            .unwrap();
        let bus = self
            .bus
            .clone();
        let counters = route.clone();
        tokio::spawn(async move {
            while let Some(msg) = sub
                .recv()
                .await
            {
                let n = counters
                    .hits
                    .fetch_add(1, Ordering::SeqCst)
                    + 1;
                counters
                    .seen
                    .lock()
                    .unwrap()
                    .push(msg.clone());
                let answer = answer(&msg, n).into();
                let Some(inbox) = msg.reply else {
                    continue;
                };
                let bus = bus.clone();
                tokio::spawn(async move {
                    let reply = match answer {
                        Answer::Reply(reply) => reply,
                        Answer::After(delay, reply) => {
                            tokio::time::sleep(delay).await;
                            reply
                        }
                        Answer::Silent => return,
                    };
                    // the inbox may be gone already; late replies are dropped
                    let _ = bus
                        .publish(&inbox, reply.to_bytes().unwrap())
                        .await;
                });
            }
        });
        route
    }

    /// Serve `pattern` with a fixed data payload.
    pub async fn reply_with(&self, pattern: &str, data: Value) -> Route {
        self.route(pattern, move |_, _| Reply::ok(&data).unwrap())
            .await
    }

    /// Serve `pattern` with an empty success reply.
    pub async fn accept(&self, pattern: &str) -> Route {
        self.route(pattern, |_, _| Reply::empty())
            .await
    }

    /// Publish an event as the gateway does, on `ari.events.<type>`.
    pub async fn emit(&self, event: &AriEvent) {
        let subject = format!("ari.events.{}", event.kind());
        self.bus
            .publish(&subject, event.to_bytes().unwrap())
            .await
            .unwrap();
    }
}

/// Transport whose first `failures` requests find no responder; later requests reach
/// the gateway.
pub struct Flaky {
    bus: MemoryTransport,
    failures: usize,
    attempts: AtomicUsize,
}

impl Flaky {
    /// Requests seen, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts
            .load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for Flaky {
    async fn request(&self, subject: &str, payload: Bytes, timeout: Duration) -> AriResult<Bytes> {
        let n = self
            .attempts
            .fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(AriError::transport(format!("no responders on {}", subject)));
        }
        self.bus
            .request(subject, payload, timeout)
            .await
    }

    async fn publish(&self, subject: &str, payload: Bytes) -> AriResult<()> {
        self.bus
            .publish(subject, payload)
            .await
    }

    async fn subscribe(&self, pattern: &str) -> AriResult<Subscription> {
        self.bus
            .subscribe(pattern)
            .await
    }

    async fn close(&self) -> AriResult<()> {
        self.bus
            .close()
            .await
    }
}

impl Gateway {
    /// Client whose first `failures` requests fail at the transport.
    pub fn flaky_client(&self, failures: usize, options: Options) -> (Client, Arc<Flaky>) {
        let flaky = Arc::new(Flaky {
            bus: self
                .bus
                .clone(),
            failures,
            attempts: AtomicUsize::new(0),
        });
        (Client::from_transport(flaky.clone(), options), flaky)
    }
}

/// Let spawned gateway tasks catch up.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
