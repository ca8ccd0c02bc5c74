//! Event bus multiplexer.
//!
//! One bus subscription per event subject pattern, shared by every listener interested
//! in it. A pump task per pattern decodes incoming events and hands each listener its
//! own copy through a bounded queue; each listener runs in its own task, so a slow or
//! failing handler only ever delays itself.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::task::{Context, Poll};

use futures_util::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::connection::{Connection, ConnectionStatus};
use crate::error::{AriError, AriResult};
use crate::event::{AriEvent, EventType};
use crate::subject;
use crate::transport::Subscription;

#[derive(Clone)]
struct Slot {
    id: u64,
    tx: mpsc::Sender<AriEvent>,
    dropped: Arc<AtomicU64>,
}

type Slots = Arc<RwLock<Vec<Slot>>>;

struct Route {
    slots: Slots,
    pump: JoinHandle<()>,
}

struct BusInner {
    conn: Arc<Connection>,
    routes: Mutex<HashMap<String, Route>>,
    next_listener: AtomicU64,
    closed: AtomicBool,
}

impl BusInner {
    fn routes(&self) -> MutexGuard<'_, HashMap<String, Route>> {
        self.routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn unregister(&self, pattern: &str, id: u64) {
        let mut routes = self.routes();
        let now_empty = match routes.get(pattern) {
            Some(route) => {
                let mut slots = write_slots(&route.slots);
                slots.retain(|s| s.id != id);
                slots.is_empty()
            }
            None => return,
        };
        debug!("Listener {} removed from {}", id, pattern);
        if now_empty {
            if let Some(route) = routes.remove(pattern) {
                route
                    .pump
                    .abort();
                info!("Unsubscribed from {}", pattern);
            }
        }
    }

    /// Drop a route whose pump has stopped on its own. Clearing the slots ends every
    /// listener queue fed by it.
    fn retire(&self, pattern: &str, slots: &Slots) {
        let mut routes = self.routes();
        if routes
            .get(pattern)
            .is_some_and(|route| Arc::ptr_eq(&route.slots, slots))
        {
            routes.remove(pattern);
        }
        write_slots(slots).clear();
        debug!("Event route {} retired", pattern);
    }
}

fn read_slots(slots: &Slots) -> std::sync::RwLockReadGuard<'_, Vec<Slot>> {
    slots
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_slots(slots: &Slots) -> std::sync::RwLockWriteGuard<'_, Vec<Slot>> {
    slots
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Hand `event` to every listener without waiting on any of them.
///
/// A full listener queue drops the event for that listener only and bumps its
/// dropped counter.
fn fan_out(slots: &Slots, event: AriEvent) {
    for slot in read_slots(slots).iter() {
        match slot
            .tx
            .try_send(event.clone())
        {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                slot.dropped
                    .fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Listener {} queue full, dropping {} event",
                    slot.id,
                    event.kind()
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Background pump: bus subscription -> decoded events -> listener queues.
async fn pump_loop(
    pattern: String,
    mut subscription: Subscription,
    slots: Slots,
    mut status: watch::Receiver<ConnectionStatus>,
    bus: Weak<BusInner>,
) {
    let mut sequence: u64 = 0;
    loop {
        tokio::select! {
            message = subscription.recv() => {
                let Some(message) = message else {
                    debug!("Event subscription on {} ended", pattern);
                    break;
                };
                let arrival = sequence;
                sequence += 1;
                match AriEvent::decode(&message, arrival) {
                    Ok(event) => fan_out(&slots, event),
                    Err(e) => warn!("Undecodable event on {}: {}", message.subject, e),
                }
            }
            changed = status.changed() => {
                if changed.is_err() || *status.borrow() == ConnectionStatus::Closed {
                    debug!("Connection closed, event pump for {} exiting", pattern);
                    break;
                }
            }
        }
    }
    match bus.upgrade() {
        Some(bus) => bus.retire(&pattern, &slots),
        None => write_slots(&slots).clear(),
    }
}

/// Listener task: runs the handler for each queued event, one at a time.
async fn handler_loop<F, Fut, E>(id: u64, mut rx: mpsc::Receiver<AriEvent>, handler: F)
where
    F: Fn(AriEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    while let Some(event) = rx
        .recv()
        .await
    {
        let kind = event
            .kind()
            .to_string();
        let outcome = AssertUnwindSafe(async { handler(event).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Listener {} failed handling {}: {}", id, kind, e),
            Err(_) => error!("Listener {} panicked handling {}", id, kind),
        }
    }
    debug!("Listener {} stopped", id);
}

/// Event bus handle (cheap to clone, shares the underlying routes).
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("subscriptions", &self.subscription_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Bus {
    /// Create a bus over a shared connection. No subscription is made until the
    /// first listener registers.
    pub fn new(conn: Arc<Connection>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                conn,
                routes: Mutex::new(HashMap::new()),
                next_listener: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    async fn register(&self, event_type: EventType) -> AriResult<Registration> {
        if self
            .inner
            .closed
            .load(Ordering::Acquire)
        {
            return Err(AriError::ConnectionClosed);
        }

        let conn = &self.inner.conn;
        let pattern = subject::events(&conn.options().subject_prefix, event_type);
        let id = self
            .inner
            .next_listener
            .fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(conn.options().event_queue_size);
        let dropped = Arc::new(AtomicU64::new(0));
        let slot = Slot {
            id,
            tx,
            dropped: dropped.clone(),
        };

        // The routes lock is held across the push so the last listener leaving
        // cannot retire the route in between.
        let joined = {
            let routes = self.inner.routes();
            match routes.get(&pattern) {
                Some(route) => {
                    write_slots(&route.slots).push(slot.clone());
                    true
                }
                None => false,
            }
        };
        if !joined {
            let subscription = conn
                .subscribe(&pattern)
                .await?;
            let mut routes = self.inner.routes();
            match routes.get(&pattern) {
                // Another registration won the race; ours is dropped (unsubscribed).
                Some(route) => write_slots(&route.slots).push(slot),
                None => {
                    let slots: Slots = Arc::new(RwLock::new(vec![slot]));
                    let pump = tokio::spawn(pump_loop(
                        pattern.clone(),
                        subscription,
                        slots.clone(),
                        conn.status_watch(),
                        Arc::downgrade(&self.inner),
                    ));
                    routes.insert(pattern.clone(), Route { slots, pump });
                    info!("Subscribed to events on {}", pattern);
                }
            }
        }

        Ok(Registration {
            id,
            event_type,
            pattern,
            bus: Arc::downgrade(&self.inner),
            dropped,
            rx,
        })
    }

    /// Register `handler` for every event of `event_type` ([`EventType::All`] for all).
    ///
    /// The handler runs in its own task; errors it returns and panics it raises are
    /// logged and the listener keeps running. Keep the returned [`Listener`] alive:
    /// dropping it unregisters.
    ///
    /// ```rust,no_run
    /// # async fn example(client: &ari_nats_tokio::Client) -> Result<(), ari_nats_tokio::AriError> {
    /// use ari_nats_tokio::EventType;
    ///
    /// let _listener = client
    ///     .bus()
    ///     .on(EventType::StasisStart, |event| async move {
    ///         println!("call entered {:?}", event.channel_id());
    ///         Ok::<_, ari_nats_tokio::AriError>(())
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn on<F, Fut, E>(&self, event_type: EventType, handler: F) -> AriResult<Listener>
    where
        F: Fn(AriEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let registration = self
            .register(event_type)
            .await?;
        let (listener, rx) = registration.split();
        tokio::spawn(handler_loop(listener.id, rx, handler));
        debug!("Listener {} registered for {}", listener.id, event_type);
        Ok(listener)
    }

    /// Receive events of `event_type` as a stream instead of a callback.
    pub async fn subscribe(&self, event_type: EventType) -> AriResult<EventStream> {
        let registration = self
            .register(event_type)
            .await?;
        let (listener, rx) = registration.split();
        Ok(EventStream { listener, rx })
    }

    /// Number of live bus subscriptions (one per distinct event pattern).
    pub fn subscription_count(&self) -> usize {
        self.inner
            .routes()
            .len()
    }

    /// Number of registered listeners across all patterns.
    pub fn listener_count(&self) -> usize {
        self.inner
            .routes()
            .values()
            .map(|route| read_slots(&route.slots).len())
            .sum()
    }

    /// Stop every pump and drop every listener queue. Further registrations fail
    /// with [`AriError::ConnectionClosed`].
    pub fn close(&self) {
        if self
            .inner
            .closed
            .swap(true, Ordering::AcqRel)
        {
            return;
        }
        let routes: Vec<(String, Route)> = self
            .inner
            .routes()
            .drain()
            .collect();
        for (pattern, route) in routes {
            route
                .pump
                .abort();
            write_slots(&route.slots).clear();
            debug!("Event pump for {} stopped", pattern);
        }
        info!("Event bus closed");
    }
}

struct Registration {
    id: u64,
    event_type: EventType,
    pattern: String,
    bus: Weak<BusInner>,
    dropped: Arc<AtomicU64>,
    rx: mpsc::Receiver<AriEvent>,
}

impl Registration {
    fn split(self) -> (Listener, mpsc::Receiver<AriEvent>) {
        let listener = Listener {
            id: self.id,
            event_type: self.event_type,
            pattern: self.pattern,
            bus: self.bus,
            dropped: self.dropped,
        };
        (listener, self.rx)
    }
}

/// Registration handle for an event handler.
///
/// Dropping it, or calling [`cancel`](Self::cancel), stops further deliveries.
/// Events already queued to the handler are still processed.
#[must_use = "dropping a Listener unregisters it"]
pub struct Listener {
    id: u64,
    event_type: EventType,
    pattern: String,
    bus: Weak<BusInner>,
    dropped: Arc<AtomicU64>,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .finish()
    }
}

impl Listener {
    /// Unique id within the bus.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Event type this listener was registered for.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Number of events dropped because this listener's queue was full.
    pub fn dropped_event_count(&self) -> u64 {
        self.dropped
            .load(Ordering::Relaxed)
    }

    /// Unregister. No event reaches this listener's queue after this returns.
    pub fn cancel(self) {}
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(bus) = self
            .bus
            .upgrade()
        {
            bus.unregister(&self.pattern, self.id);
        }
    }
}

/// Event receiver (!Clone)
///
/// Yields events in arrival order for its subject. Dropping it unregisters.
pub struct EventStream {
    listener: Listener,
    rx: mpsc::Receiver<AriEvent>,
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("listener", &self.listener)
            .finish()
    }
}

impl EventStream {
    /// Receive the next event, or `None` once the bus or connection closed.
    pub async fn recv(&mut self) -> Option<AriEvent> {
        self.rx
            .recv()
            .await
    }

    /// Number of events dropped because the stream was not drained fast enough.
    pub fn dropped_event_count(&self) -> u64 {
        self.listener
            .dropped_event_count()
    }

    /// Event type this stream was registered for.
    pub fn event_type(&self) -> EventType {
        self.listener
            .event_type()
    }

    /// Unregister and discard anything still queued.
    pub fn cancel(self) {}
}

impl futures_util::Stream for EventStream {
    type Item = AriEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx
            .poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Options;
    use crate::transport::{MemoryTransport, Transport};

    async fn settled(transport: &MemoryTransport, expected: usize) -> bool {
        for _ in 0..100 {
            if transport.subscription_count() == expected {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        false
    }

    fn bus() -> (MemoryTransport, Arc<Connection>, Bus) {
        let transport = MemoryTransport::new();
        let conn = Arc::new(Connection::new(
            Arc::new(transport.clone()),
            Options::default(),
        ));
        let bus = Bus::new(conn.clone());
        (transport, conn, bus)
    }

    #[tokio::test]
    async fn test_no_subscription_until_first_listener() {
        let (transport, _conn, bus) = bus();
        assert_eq!(transport.subscription_count(), 0);
        let stream = bus
            .subscribe(EventType::StasisStart)
            .await
            .unwrap();
        assert_eq!(transport.subscription_count(), 1);
        assert_eq!(bus.subscription_count(), 1);
        drop(stream);
        assert_eq!(bus.subscription_count(), 0);
        assert!(settled(&transport, 0).await);
    }

    #[tokio::test]
    async fn test_listeners_share_one_subscription() {
        let (transport, _conn, bus) = bus();
        let a = bus
            .subscribe(EventType::StasisEnd)
            .await
            .unwrap();
        let b = bus
            .subscribe(EventType::StasisEnd)
            .await
            .unwrap();
        assert_eq!(transport.subscription_count(), 1);
        assert_eq!(bus.listener_count(), 2);
        a.cancel();
        assert_eq!(bus.subscription_count(), 1);
        assert_eq!(transport.subscription_count(), 1);
        b.cancel();
        assert!(settled(&transport, 0).await);
    }

    #[tokio::test]
    async fn test_undecodable_event_skipped() {
        let (transport, _conn, bus) = bus();
        let mut stream = bus
            .subscribe(EventType::All)
            .await
            .unwrap();
        transport
            .publish("ari.events.Broken", bytes::Bytes::from_static(b"not json"))
            .await
            .unwrap();
        let good = AriEvent::new(EventType::StasisStart)
            .to_bytes()
            .unwrap();
        transport
            .publish("ari.events.StasisStart", good)
            .await
            .unwrap();
        let event = stream
            .recv()
            .await
            .unwrap();
        assert_eq!(event.event_type(), Some(EventType::StasisStart));
        assert_eq!(event.sequence(), 1);
    }

    #[tokio::test]
    async fn test_close_ends_streams_and_rejects_registration() {
        let (_transport, _conn, bus) = bus();
        let mut stream = bus
            .subscribe(EventType::All)
            .await
            .unwrap();
        bus.close();
        bus.close();
        assert!(stream
            .recv()
            .await
            .is_none());
        assert!(matches!(
            bus.subscribe(EventType::All)
                .await,
            Err(AriError::ConnectionClosed)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_register_while_last_listener_leaves() {
        let (transport, _conn, bus) = bus();
        for i in 0..200 {
            let leaving = bus
                .subscribe(EventType::StasisStart)
                .await
                .unwrap();
            let joiner = bus.clone();
            let join = tokio::spawn(async move {
                joiner
                    .subscribe(EventType::StasisStart)
                    .await
            });
            let leave = tokio::spawn(async move { drop(leaving) });
            leave
                .await
                .unwrap();
            let mut stream = join
                .await
                .unwrap()
                .unwrap();

            assert_eq!(bus.listener_count(), 1, "iteration {i}");
            assert_eq!(bus.subscription_count(), 1, "iteration {i}");
            let event = AriEvent::new(EventType::StasisStart)
                .to_bytes()
                .unwrap();
            transport
                .publish("ari.events.StasisStart", event)
                .await
                .unwrap();
            let received = tokio::time::timeout(std::time::Duration::from_secs(2), stream.recv())
                .await
                .unwrap();
            assert!(received.is_some(), "iteration {i}");
        }
    }

    #[tokio::test]
    async fn test_transport_ending_subscription_ends_streams() {
        let (transport, _conn, bus) = bus();
        let mut stream = bus
            .subscribe(EventType::StasisStart)
            .await
            .unwrap();
        transport
            .close()
            .await
            .unwrap();

        let end = tokio::time::timeout(std::time::Duration::from_secs(2), stream.recv())
            .await
            .unwrap();
        assert!(end.is_none());
        assert_eq!(bus.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_registration_after_connection_closed() {
        let (_transport, conn, bus) = bus();
        conn.close()
            .await
            .unwrap();
        let err = bus
            .on(EventType::StasisStart, |_| async { Ok::<_, AriError>(()) })
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
