//! ARI event types and structures

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AriResult;
use crate::transport::BusMessage;

define_wire_enum! {
    parse_error: ParseEventTypeError("event type"),
    /// ARI event names as carried in the `type` field and the last subject token.
    pub enum EventType {
        ApplicationReplaced => "ApplicationReplaced",
        BridgeAttendedTransfer => "BridgeAttendedTransfer",
        BridgeBlindTransfer => "BridgeBlindTransfer",
        BridgeCreated => "BridgeCreated",
        BridgeDestroyed => "BridgeDestroyed",
        BridgeMerged => "BridgeMerged",
        BridgeVideoSourceChanged => "BridgeVideoSourceChanged",
        ChannelCallerId => "ChannelCallerId",
        ChannelConnectedLine => "ChannelConnectedLine",
        ChannelCreated => "ChannelCreated",
        ChannelDestroyed => "ChannelDestroyed",
        ChannelDialplan => "ChannelDialplan",
        ChannelDtmfReceived => "ChannelDtmfReceived",
        ChannelEnteredBridge => "ChannelEnteredBridge",
        ChannelHangupRequest => "ChannelHangupRequest",
        ChannelHold => "ChannelHold",
        ChannelLeftBridge => "ChannelLeftBridge",
        ChannelStateChange => "ChannelStateChange",
        ChannelTalkingFinished => "ChannelTalkingFinished",
        ChannelTalkingStarted => "ChannelTalkingStarted",
        ChannelUnhold => "ChannelUnhold",
        ChannelUserevent => "ChannelUserevent",
        ChannelVarset => "ChannelVarset",
        ContactStatusChange => "ContactStatusChange",
        DeviceStateChanged => "DeviceStateChanged",
        Dial => "Dial",
        EndpointStateChange => "EndpointStateChange",
        PeerStatusChange => "PeerStatusChange",
        PlaybackContinuing => "PlaybackContinuing",
        PlaybackFinished => "PlaybackFinished",
        PlaybackStarted => "PlaybackStarted",
        RecordingFailed => "RecordingFailed",
        RecordingFinished => "RecordingFinished",
        RecordingStarted => "RecordingStarted",
        StasisEnd => "StasisEnd",
        StasisStart => "StasisStart",
        TextMessageReceived => "TextMessageReceived",
        /// Matches every event
        All => "*",
    }
}

/// Decoded ARI event.
///
/// The gateway publishes each event as a JSON object on `<prefix>.events.<type>`.
/// Well-known envelope fields are lifted out; everything else stays in the raw field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AriEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(flatten)]
    fields: Map<String, Value>,
    #[serde(skip)]
    subject: String,
    #[serde(skip)]
    sequence: u64,
}

impl AriEvent {
    /// Create an event with the given type and no fields.
    pub fn new(event_type: EventType) -> Self {
        Self {
            kind: event_type.to_string(),
            application: None,
            timestamp: None,
            fields: Map::new(),
            subject: String::new(),
            sequence: 0,
        }
    }

    /// Decode an event received on the bus. `sequence` is its arrival index on the
    /// subscription it came in on.
    pub fn decode(message: &BusMessage, sequence: u64) -> AriResult<Self> {
        let mut event: AriEvent = serde_json::from_slice(&message.payload)?;
        event.subject = message
            .subject
            .clone();
        event.sequence = sequence;
        Ok(event)
    }

    /// JSON wire encoding, as the gateway publishes it.
    pub fn to_bytes(&self) -> AriResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parsed event type, if recognized.
    pub fn event_type(&self) -> Option<EventType> {
        self.kind
            .parse()
            .ok()
    }

    /// Raw `type` field.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Check whether this event matches the given type. `All` matches everything.
    pub fn is_event_type(&self, event_type: EventType) -> bool {
        event_type == EventType::All || self.event_type() == Some(event_type)
    }

    /// Stasis application the event was raised for.
    pub fn application(&self) -> Option<&str> {
        self.application
            .as_deref()
    }

    /// Set the application name.
    pub fn set_application(&mut self, application: impl Into<String>) {
        self.application = Some(application.into());
    }

    /// Server timestamp as sent (ISO 8601).
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp
            .as_deref()
    }

    /// Look up a top-level field (e.g. `channel`, `digit`, `playback`).
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .get(name)
    }

    /// All fields other than `type`, `application` and `timestamp`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Set or overwrite a field.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields
            .insert(name.into(), value);
    }

    /// Subject the event arrived on. Empty for locally built events.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Arrival index on the subscription that delivered it.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn nested_str(&self, object: &str, key: &str) -> Option<&str> {
        self.fields
            .get(object)?
            .get(key)?
            .as_str()
    }

    /// `channel.id` for channel-scoped events.
    pub fn channel_id(&self) -> Option<&str> {
        self.nested_str("channel", "id")
    }

    /// `bridge.id` for bridge-scoped events.
    pub fn bridge_id(&self) -> Option<&str> {
        self.nested_str("bridge", "id")
    }

    /// `playback.id` for playback events.
    pub fn playback_id(&self) -> Option<&str> {
        self.nested_str("playback", "id")
    }

    /// `recording.name` for recording events.
    pub fn recording_name(&self) -> Option<&str> {
        self.nested_str("recording", "name")
    }
}
