//! Channels: data types and operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::playback::{PlayOptions, PlaybackClient, PlaybackData, PlaybackHandle};
use super::recording::{LiveRecordingClient, LiveRecordingData, LiveRecordingHandle, RecordOptions};
use super::{VariableBody, CHANNELS};
use crate::connection::Connection;
use crate::error::AriResult;

/// Channel state as reported in the `state` field of a channel.
///
/// Unrecognized values deserialize to [`ChannelState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum ChannelState {
    Down,
    Rsrvd,
    OffHook,
    Dialing,
    Ring,
    Ringing,
    Up,
    Busy,
    DialingOffhook,
    PreRing,
    #[default]
    Unknown,
}

impl ChannelState {
    /// Whether the channel has been answered.
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }

    /// Whether the channel is alerting, inbound (`Ring`) or outbound (`Ringing`).
    pub fn is_ringing(&self) -> bool {
        matches!(self, Self::Ring | Self::Ringing | Self::PreRing)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Down => "Down",
            Self::Rsrvd => "Rsrvd",
            Self::OffHook => "OffHook",
            Self::Dialing => "Dialing",
            Self::Ring => "Ring",
            Self::Ringing => "Ringing",
            Self::Up => "Up",
            Self::Busy => "Busy",
            Self::DialingOffhook => "Dialing Offhook",
            Self::PreRing => "Pre-ring",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing an invalid channel state string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChannelStateError(pub String);

impl fmt::Display for ParseChannelStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown channel state: {}", self.0)
    }
}

impl std::error::Error for ParseChannelStateError {}

impl FromStr for ChannelState {
    type Err = ParseChannelStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s
            .to_lowercase()
            .as_str()
        {
            "down" => Ok(Self::Down),
            "rsrvd" => Ok(Self::Rsrvd),
            "offhook" => Ok(Self::OffHook),
            "dialing" => Ok(Self::Dialing),
            "ring" => Ok(Self::Ring),
            "ringing" => Ok(Self::Ringing),
            "up" => Ok(Self::Up),
            "busy" => Ok(Self::Busy),
            "dialing offhook" => Ok(Self::DialingOffhook),
            "pre-ring" => Ok(Self::PreRing),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseChannelStateError(s.to_string())),
        }
    }
}

impl Serialize for ChannelState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw
            .parse()
            .unwrap_or(Self::Unknown))
    }
}

/// Caller id name and number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct CallerId {
    pub name: String,
    pub number: String,
}

/// Current dialplan position of a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DialplanLocation {
    pub context: String,
    pub exten: String,
    pub priority: i64,
    pub app_name: String,
    pub app_data: String,
}

/// A channel as reported by Asterisk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelData {
    /// Unique id (`uniqueid`).
    pub id: String,
    /// Channel name, e.g. `PJSIP/alice-00000001`.
    pub name: String,
    pub state: ChannelState,
    pub caller: CallerId,
    pub connected: CallerId,
    pub accountcode: String,
    pub dialplan: DialplanLocation,
    /// Creation time (ISO 8601).
    pub creationtime: String,
    pub language: String,
    /// Variables requested through `channelvars` in `ari.conf`.
    pub channelvars: Map<String, Value>,
}

/// Body of an originate request.
///
/// Set either an application (`app`) or a dialplan location (`context`/`extension`).
///
/// ```
/// use ari_nats_tokio::resources::OriginateRequest;
///
/// let req = OriginateRequest::new("PJSIP/alice")
///     .with_app("ivr", Some("menu"))
///     .with_caller_id("\"Support\" <5551234>")
///     .with_timeout(30)
///     .with_variable("CDR(userfield)", "campaign-7");
/// assert_eq!(req.app.as_deref(), Some("ivr"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginateRequest {
    /// Endpoint to call, e.g. `PJSIP/alice`.
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Stasis application to place the channel into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<String>,
    /// Seconds to wait for an answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, String>,
}

impl OriginateRequest {
    /// Call `endpoint` with nothing else set.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Hand the answered channel to a Stasis application.
    pub fn with_app(mut self, app: impl Into<String>, args: Option<impl Into<String>>) -> Self {
        self.app = Some(app.into());
        self.app_args = args.map(Into::into);
        self
    }

    /// Continue the answered channel in the dialplan.
    pub fn with_dialplan(
        mut self,
        context: impl Into<String>,
        extension: impl Into<String>,
        priority: i64,
    ) -> Self {
        self.context = Some(context.into());
        self.extension = Some(extension.into());
        self.priority = Some(priority);
        self
    }

    pub fn with_caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Pick the new channel's id instead of letting Asterisk assign one.
    pub fn with_channel_id(mut self, id: impl Into<String>) -> Self {
        self.channel_id = Some(id.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables
            .insert(name.into(), value.into());
        self
    }
}

#[derive(Serialize)]
struct HangupBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Serialize)]
struct DtmfBody<'a> {
    dtmf: &'a str,
}

/// Channel operations.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    conn: Arc<Connection>,
    playback: Arc<PlaybackClient>,
    recording: Arc<LiveRecordingClient>,
}

impl ChannelClient {
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
            .subject(CHANNELS, action, id)
    }

    pub async fn list(&self) -> AriResult<Vec<ChannelData>> {
        self.conn
            .read(&self.subject("list", None))
            .await
    }

    pub async fn get(&self, id: &str) -> AriResult<ChannelData> {
        self.conn
            .read(&self.subject("get", Some(id)))
            .await
    }

    /// Create a new outbound channel.
    pub async fn originate(&self, request: &OriginateRequest) -> AriResult<ChannelData> {
        self.conn
            .write_returning(&self.subject("originate", None), request)
            .await
    }

    pub async fn answer(&self, id: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("answer", Some(id)))
            .await
    }

    /// Hang up, optionally with a reason (`normal`, `busy`, `congestion`, ...).
    pub async fn hangup(&self, id: &str, reason: Option<&str>) -> AriResult<()> {
        self.conn
            .write(&self.subject("hangup", Some(id)), &HangupBody { reason })
            .await
    }

    /// Start ringing indication.
    pub async fn ring(&self, id: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("ring", Some(id)))
            .await
    }

    pub async fn send_dtmf(&self, id: &str, dtmf: &str) -> AriResult<()> {
        self.conn
            .write(&self.subject("dtmf", Some(id)), &DtmfBody { dtmf })
            .await
    }

    /// Value of a channel variable or dialplan function.
    pub async fn get_variable(&self, id: &str, variable: &str) -> AriResult<String> {
        let body = VariableBody {
            variable: Some(variable.to_string()),
            value: String::new(),
        };
        let reply: VariableBody = self
            .conn
            .read_with(&self.subject("variable_get", Some(id)), &body)
            .await?;
        Ok(reply.value)
    }

    pub async fn set_variable(&self, id: &str, variable: &str, value: &str) -> AriResult<()> {
        let body = VariableBody {
            variable: Some(variable.to_string()),
            value: value.to_string(),
        };
        self.conn
            .write(&self.subject("variable_set", Some(id)), &body)
            .await
    }

    /// Start media playback on the channel.
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

    /// Start recording the channel.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_state_display_roundtrip() {
        for state in [
            ChannelState::Down,
            ChannelState::Rsrvd,
            ChannelState::OffHook,
            ChannelState::Dialing,
            ChannelState::Ring,
            ChannelState::Ringing,
            ChannelState::Up,
            ChannelState::Busy,
            ChannelState::DialingOffhook,
            ChannelState::PreRing,
            ChannelState::Unknown,
        ] {
            let s = state.to_string();
            let parsed: ChannelState = s
                .parse()
                .unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn test_channel_state_case_insensitive() {
        assert_eq!(
            "UP".parse::<ChannelState>()
                .unwrap(),
            ChannelState::Up
        );
        assert_eq!(
            "dialing OFFHOOK"
                .parse::<ChannelState>()
                .unwrap(),
            ChannelState::DialingOffhook
        );
    }

    #[test]
    fn test_channel_state_unknown_value() {
        assert!("Parked"
            .parse::<ChannelState>()
            .is_err());
        let state: ChannelState = serde_json::from_str(r#""Parked""#).unwrap();
        assert_eq!(state, ChannelState::Unknown);
    }

    #[test]
    fn test_channel_data_from_json() {
        let ch: ChannelData = serde_json::from_str(
            r#"{
                "id": "1700000001.42",
                "name": "PJSIP/alice-00000001",
                "state": "Pre-ring",
                "caller": {"name": "Alice", "number": "1001"},
                "dialplan": {"context": "default", "exten": "100", "priority": 1},
                "channelvars": {"X_TENANT": "acme"}
            }"#,
        )
        .unwrap();
        assert_eq!(ch.state, ChannelState::PreRing);
        assert!(ch
            .state
            .is_ringing());
        assert_eq!(ch.caller.number, "1001");
        assert_eq!(ch.dialplan.priority, 1);
        assert_eq!(ch.channelvars["X_TENANT"], "acme");
        assert!(ch
            .connected
            .name
            .is_empty());
    }

    #[test]
    fn test_channel_state_serializes_wire_name() {
        assert_eq!(
            serde_json::to_string(&ChannelState::DialingOffhook).unwrap(),
            r#""Dialing Offhook""#
        );
    }

    #[test]
    fn test_originate_body_omits_unset() {
        let req = OriginateRequest::new("PJSIP/bob").with_dialplan("default", "200", 1);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({
                "endpoint": "PJSIP/bob",
                "context": "default",
                "extension": "200",
                "priority": 1
            })
        );
    }
}
