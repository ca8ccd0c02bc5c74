//! Media playback on channels and bridges.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::PLAYBACKS;
use crate::connection::Connection;
use crate::error::AriResult;

define_wire_enum! {
    parse_error: ParsePlaybackControlError("playback control"),
    /// Operations accepted by [`PlaybackClient::control`].
    pub enum PlaybackControl {
        Restart => "restart",
        Pause => "pause",
        Unpause => "unpause",
        Reverse => "reverse",
        Forward => "forward",
    }
}

/// State of a playback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackData {
    /// Playback id.
    pub id: String,
    /// URI currently playing, e.g. `sound:tt-monkeys`.
    pub media_uri: String,
    /// Next URI when a list of media was requested.
    pub next_media_uri: Option<String>,
    /// `channel:<id>` or `bridge:<id>`.
    pub target_uri: String,
    /// Language used to resolve `sound:` URIs.
    pub language: Option<String>,
    /// `queued`, `playing`, `continuing`, `done` or `failed`.
    pub state: String,
}

/// Body of a `play` request on a channel or bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayOptions {
    /// Media URIs, played in order.
    pub media: Vec<String>,
    /// Language for `sound:` URIs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Start offset in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsetms: Option<u32>,
    /// Skip size for forward/reverse controls in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipms: Option<u32>,
    /// Caller-chosen playback id; the server assigns one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_id: Option<String>,
}

impl PlayOptions {
    /// Play a single media URI.
    pub fn new(media: impl Into<String>) -> Self {
        Self {
            media: vec![media.into()],
            ..Default::default()
        }
    }

    /// Append another media URI.
    pub fn then(mut self, media: impl Into<String>) -> Self {
        self.media
            .push(media.into());
        self
    }

    /// Set the language.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Request a specific playback id.
    pub fn with_playback_id(mut self, id: impl Into<String>) -> Self {
        self.playback_id = Some(id.into());
        self
    }
}

#[derive(Serialize)]
struct ControlBody {
    operation: PlaybackControl,
}

/// Playback operations.
#[derive(Debug, Clone)]
pub struct PlaybackClient {
    conn: Arc<Connection>,
}

impl PlaybackClient {
    pub(crate) fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    fn subject(&self, action: &str, id: &str) -> String {
        self.conn
            .subject(PLAYBACKS, action, Some(id))
    }

    pub async fn get(&self, id: &str) -> AriResult<PlaybackData> {
        self.conn
            .read(&self.subject("get", id))
            .await
    }

    pub async fn control(&self, id: &str, operation: PlaybackControl) -> AriResult<()> {
        self.conn
            .write(
                &self.subject("control", id),
                &ControlBody { operation },
            )
            .await
    }

    /// Stop and discard the playback.
    pub async fn stop(&self, id: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("stop", id))
            .await
    }
}

/// Playback started through a channel or bridge, bound to the shared
/// [`PlaybackClient`].
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    data: PlaybackData,
    client: Arc<PlaybackClient>,
}

impl PlaybackHandle {
    pub(crate) fn new(data: PlaybackData, client: Arc<PlaybackClient>) -> Self {
        Self { data, client }
    }

    /// Playback id.
    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// State as returned when the playback was started.
    pub fn data(&self) -> &PlaybackData {
        &self.data
    }

    /// Fetch the current state.
    pub async fn get(&self) -> AriResult<PlaybackData> {
        self.client
            .get(self.id())
            .await
    }

    pub async fn control(&self, operation: PlaybackControl) -> AriResult<()> {
        self.client
            .control(self.id(), operation)
            .await
    }

    pub async fn pause(&self) -> AriResult<()> {
        self.control(PlaybackControl::Pause)
            .await
    }

    pub async fn unpause(&self) -> AriResult<()> {
        self.control(PlaybackControl::Unpause)
            .await
    }

    pub async fn stop(&self) -> AriResult<()> {
        self.client
            .stop(self.id())
            .await
    }
}
