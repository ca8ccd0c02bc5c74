//! Unified client: one shared [`Connection`], every resource client wired to it, and a
//! single teardown path.

use std::sync::Arc;
use tracing::{debug, info};

use crate::bus::Bus;
use crate::connection::{Connection, ConnectionStatus, Options};
use crate::error::AriResult;
use crate::resources::{
    ApplicationClient, AsteriskClient, BridgeClient, ChannelClient, DeviceStateClient,
    LiveRecordingClient, MailboxClient, PlaybackClient, Recording, SoundClient,
    StoredRecordingClient,
};
use crate::transport::Transport;

/// ARI client over a message bus (Clone + Send + Sync).
///
/// Clones share the connection, the event bus and every resource client. The
/// playback and live-recording clients are single instances shared with the
/// channel and bridge clients, so handles returned by `play`/`record` talk to them.
///
/// ```rust,no_run
/// use ari_nats_tokio::{Client, Options};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), ari_nats_tokio::AriError> {
///     let options = Options::default()
///         .with_request_timeout(Duration::from_millis(500))
///         .with_read_operation_retry_count(2);
///     let client = Client::connect("nats://127.0.0.1:4222", options).await?;
///
///     for channel in client.channel().list().await? {
///         println!("{} {}", channel.id, channel.state);
///     }
///
///     client.cleanup().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    conn: Arc<Connection>,
    asterisk: AsteriskClient,
    application: ApplicationClient,
    bridge: BridgeClient,
    channel: ChannelClient,
    device_state: DeviceStateClient,
    mailbox: MailboxClient,
    sound: SoundClient,
    playback: Arc<PlaybackClient>,
    recording: Recording,
    bus: Bus,
}

impl Client {
    /// Connect to a NATS server and build the client on it.
    #[cfg(feature = "nats")]
    pub async fn connect(url: &str, options: Options) -> AriResult<Self> {
        let transport = crate::transport::NatsTransport::connect(url)
            .await?
            .with_queue_size(options.event_queue_size);
        Ok(Self::from_transport(Arc::new(transport), options))
    }

    /// Build the client on an existing `async-nats` connection.
    ///
    /// `options.event_queue_size` also bounds each NATS subscription's forwarding queue.
    ///
    /// [`cleanup`](Self::cleanup) drains and closes that connection.
    #[cfg(feature = "nats")]
    pub fn from_nats(client: async_nats::Client, options: Options) -> Self {
        let transport = crate::transport::NatsTransport::new(client)
            .with_queue_size(options.event_queue_size);
        Self::from_transport(Arc::new(transport), options)
    }

    /// Wire every resource client to `transport`. No I/O happens here.
    pub fn from_transport(transport: Arc<dyn Transport>, options: Options) -> Self {
        let conn = Arc::new(Connection::new(transport, options));

        let playback = Arc::new(PlaybackClient::new(conn.clone()));
        let live = Arc::new(LiveRecordingClient::new(conn.clone()));

        let client = Self {
            asterisk: AsteriskClient::new(conn.clone()),
            application: ApplicationClient::new(conn.clone()),
            bridge: BridgeClient::new(conn.clone(), playback.clone(), live.clone()),
            channel: ChannelClient::new(conn.clone(), playback.clone(), live.clone()),
            device_state: DeviceStateClient::new(conn.clone()),
            mailbox: MailboxClient::new(conn.clone()),
            sound: SoundClient::new(conn.clone()),
            recording: Recording::new(live, StoredRecordingClient::new(conn.clone())),
            bus: Bus::new(conn.clone()),
            playback,
            conn,
        };
        debug!("ARI client assembled");
        client
    }

    pub fn asterisk(&self) -> &AsteriskClient {
        &self.asterisk
    }

    pub fn application(&self) -> &ApplicationClient {
        &self.application
    }

    pub fn bridge(&self) -> &BridgeClient {
        &self.bridge
    }

    pub fn channel(&self) -> &ChannelClient {
        &self.channel
    }

    pub fn device_state(&self) -> &DeviceStateClient {
        &self.device_state
    }

    pub fn mailbox(&self) -> &MailboxClient {
        &self.mailbox
    }

    pub fn sound(&self) -> &SoundClient {
        &self.sound
    }

    pub fn playback(&self) -> &PlaybackClient {
        &self.playback
    }

    /// Live and stored recordings.
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Shared connection, for raw requests on custom subjects.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Whether [`cleanup`](Self::cleanup) has not run yet.
    pub fn is_connected(&self) -> bool {
        self.conn
            .is_connected()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ConnectionStatus {
        self.conn
            .status()
    }

    /// Tear down: stop all event delivery, then close the transport.
    ///
    /// Safe to call from several tasks or clones at once, and after the connection
    /// was closed directly; both steps are idempotent. Afterwards every operation
    /// fails with [`AriError::ConnectionClosed`](crate::AriError::ConnectionClosed).
    pub async fn cleanup(&self) -> AriResult<()> {
        if self
            .conn
            .is_connected()
        {
            info!("Cleaning up ARI client");
        } else {
            debug!("Cleanup on closed connection");
        }
        self.bus
            .close();
        self.conn
            .close()
            .await
    }
}
