//! Mixing bridges.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::playback::{PlayOptions, PlaybackClient, PlaybackData, PlaybackHandle};
use super::recording::{LiveRecordingClient, LiveRecordingData, LiveRecordingHandle, RecordOptions};
use super::BRIDGES;
use crate::connection::Connection;
use crate::error::AriResult;

/// A bridge as reported by Asterisk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct BridgeData {
    pub id: String,
    pub technology: String,
    /// `mixing` or `holding`.
    pub bridge_type: String,
    pub bridge_class: String,
    pub creator: String,
    pub name: String,
    /// Ids of the channels currently in the bridge.
    pub channels: Vec<String>,
    pub video_mode: Option<String>,
    pub video_source_id: Option<String>,
    pub creationtime: String,
}

/// Body of a bridge create request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBridge {
    /// Comma-separated bridge flags, e.g. `mixing,dtmf_events`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Requested bridge id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CreateBridge {
    /// A mixing bridge with a server-assigned id.
    pub fn mixing() -> Self {
        Self {
            kind: Some("mixing".to_string()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.bridge_id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Serialize)]
struct ChannelList<'a> {
    channel: &'a [&'a str],
}

/// Bridge operations.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    conn: Arc<Connection>,
    playback: Arc<PlaybackClient>,
    recording: Arc<LiveRecordingClient>,
}

impl BridgeClient {
    pub(crate) fn new(
        conn: Arc<Connection>,
        playback: Arc<PlaybackClient>,
        recording: Arc<LiveRecordingClient>,
    ) -> Self {
        Self {
            conn,
            playback,
            recording,
        }
    }

    fn subject(&self, action: &str, id: Option<&str>) -> String {
        self.conn
            .subject(BRIDGES, action, id)
    }

    pub async fn list(&self) -> AriResult<Vec<BridgeData>> {
        self.conn
            .read(&self.subject("list", None))
            .await
    }

    pub async fn get(&self, id: &str) -> AriResult<BridgeData> {
        self.conn
            .read(&self.subject("get", Some(id)))
            .await
    }

    pub async fn create(&self, request: &CreateBridge) -> AriResult<BridgeData> {
        self.conn
            .write_returning(&self.subject("create", None), request)
            .await
    }

    /// Destroy the bridge. Channels in it are left in Stasis.
    pub async fn delete(&self, id: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("delete", Some(id)))
            .await
    }

    pub async fn add_channel(&self, id: &str, channels: &[&str]) -> AriResult<()> {
        self.conn
            .write(
                &self.subject("addChannel", Some(id)),
                &ChannelList { channel: channels },
            )
            .await
    }

    pub async fn remove_channel(&self, id: &str, channels: &[&str]) -> AriResult<()> {
        self.conn
            .write(
                &self.subject("removeChannel", Some(id)),
                &ChannelList { channel: channels },
            )
            .await
    }

    /// Play media to every channel in the bridge.
    pub async fn play(&self, id: &str, options: &PlayOptions) -> AriResult<PlaybackHandle> {
        let mut data: PlaybackData = self
            .conn
            .write_returning(&self.subject("play", Some(id)), options)
            .await?;
        if data
            .id
            .is_empty()
        {
            data.id = options
                .playback_id
                .clone()
                .unwrap_or_default();
        }
        Ok(PlaybackHandle::new(data, self.playback.clone()))
    }

    /// Record the bridge mix.
    pub async fn record(&self, id: &str, options: &RecordOptions) -> AriResult<LiveRecordingHandle> {
        let mut data: LiveRecordingData = self
            .conn
            .write_returning(&self.subject("record", Some(id)), options)
            .await?;
        if data
            .name
            .is_empty()
        {
            data.name = options
                .name
                .clone();
        }
        Ok(LiveRecordingHandle::new(data, self.recording.clone()))
    }
}
