//! Live and stored recordings.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{RECORDINGS_LIVE, RECORDINGS_STORED};
use crate::connection::Connection;
use crate::error::AriResult;

/// A recording in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct LiveRecordingData {
    pub name: String,
    pub format: String,
    pub target_uri: String,
    /// `queued`, `recording`, `paused`, `done`, `failed` or `canceled`.
    pub state: String,
    pub duration: Option<u32>,
    pub talking_duration: Option<u32>,
    pub silence_duration: Option<u32>,
    pub cause: Option<String>,
}

/// A finished recording on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct StoredRecordingData {
    pub name: String,
    pub format: String,
}

/// Body of a `record` request on a channel or bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOptions {
    /// Recording name, unique among stored and live recordings.
    pub name: String,
    /// File format, e.g. `wav`.
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_silence_seconds: Option<u32>,
    /// `fail`, `overwrite` or `append` when the name already exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_exists: Option<String>,
    /// Play a beep before recording starts.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub beep: bool,
    /// DTMF digit that ends the recording (`none`, `any`, `*`, `#`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminate_on: Option<String>,
}

impl RecordOptions {
    /// Record to `name` in `format` with server defaults for everything else.
    pub fn new(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            ..Default::default()
        }
    }

    pub fn with_max_duration(mut self, seconds: u32) -> Self {
        self.max_duration_seconds = Some(seconds);
        self
    }

    pub fn with_beep(mut self) -> Self {
        self.beep = true;
        self
    }

    pub fn with_if_exists(mut self, policy: impl Into<String>) -> Self {
        self.if_exists = Some(policy.into());
        self
    }
}

#[derive(Serialize)]
struct CopyBody<'a> {
    destination: &'a str,
}

/// Live recording operations.
#[derive(Debug, Clone)]
pub struct LiveRecordingClient {
    conn: Arc<Connection>,
}

impl LiveRecordingClient {
    pub(crate) fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    fn subject(&self, action: &str, name: &str) -> String {
        self.conn
            .subject(RECORDINGS_LIVE, action, Some(name))
    }

    async fn act(&self, action: &str, name: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject(action, name))
            .await
    }

    pub async fn get(&self, name: &str) -> AriResult<LiveRecordingData> {
        self.conn
            .read(&self.subject("get", name))
            .await
    }

    /// Stop and store the recording.
    pub async fn stop(&self, name: &str) -> AriResult<()> {
        self.act("stop", name)
            .await
    }

    pub async fn pause(&self, name: &str) -> AriResult<()> {
        self.act("pause", name)
            .await
    }

    pub async fn resume(&self, name: &str) -> AriResult<()> {
        self.act("resume", name)
            .await
    }

    pub async fn mute(&self, name: &str) -> AriResult<()> {
        self.act("mute", name)
            .await
    }

    pub async fn unmute(&self, name: &str) -> AriResult<()> {
        self.act("unmute", name)
            .await
    }

    /// Stop and discard the recording.
    pub async fn scrap(&self, name: &str) -> AriResult<()> {
        self.act("scrap", name)
            .await
    }
}

/// Stored recording operations.
#[derive(Debug, Clone)]
pub struct StoredRecordingClient {
    conn: Arc<Connection>,
}

impl StoredRecordingClient {
    pub(crate) fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    fn subject(&self, action: &str, name: Option<&str>) -> String {
        self.conn
            .subject(RECORDINGS_STORED, action, name)
    }

    pub async fn list(&self) -> AriResult<Vec<StoredRecordingData>> {
        self.conn
            .read(&self.subject("list", None))
            .await
    }

    pub async fn get(&self, name: &str) -> AriResult<StoredRecordingData> {
        self.conn
            .read(&self.subject("get", Some(name)))
            .await
    }

    /// Copy a stored recording; returns the new one.
    pub async fn copy(&self, name: &str, destination: &str) -> AriResult<StoredRecordingData> {
        self.conn
            .write_returning(&self.subject("copy", Some(name)), &CopyBody { destination })
            .await
    }

    pub async fn delete(&self, name: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("delete", Some(name)))
            .await
    }
}

/// Both recording clients.
#[derive(Debug, Clone)]
pub struct Recording {
    live: Arc<LiveRecordingClient>,
    stored: StoredRecordingClient,
}

impl Recording {
    pub(crate) fn new(live: Arc<LiveRecordingClient>, stored: StoredRecordingClient) -> Self {
        Self { live, stored }
    }

    /// Recordings in progress.
    pub fn live(&self) -> &LiveRecordingClient {
        &self.live
    }

    /// Recordings on disk.
    pub fn stored(&self) -> &StoredRecordingClient {
        &self.stored
    }
}

/// Live recording started through a channel or bridge, bound to the shared
/// [`LiveRecordingClient`].
#[derive(Debug, Clone)]
pub struct LiveRecordingHandle {
    data: LiveRecordingData,
    client: Arc<LiveRecordingClient>,
}

impl LiveRecordingHandle {
    pub(crate) fn new(data: LiveRecordingData, client: Arc<LiveRecordingClient>) -> Self {
        Self { data, client }
    }

    /// Recording name.
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// State as returned when the recording was started.
    pub fn data(&self) -> &LiveRecordingData {
        &self.data
    }

    pub async fn get(&self) -> AriResult<LiveRecordingData> {
        self.client
            .get(self.name())
            .await
    }

    pub async fn stop(&self) -> AriResult<()> {
        self.client
            .stop(self.name())
            .await
    }

    pub async fn pause(&self) -> AriResult<()> {
        self.client
            .pause(self.name())
            .await
    }

    pub async fn resume(&self) -> AriResult<()> {
        self.client
            .resume(self.name())
            .await
    }

    pub async fn mute(&self) -> AriResult<()> {
        self.client
            .mute(self.name())
            .await
    }

    pub async fn unmute(&self) -> AriResult<()> {
        self.client
            .unmute(self.name())
            .await
    }

    pub async fn scrap(&self) -> AriResult<()> {
        self.client
            .scrap(self.name())
            .await
    }
}
