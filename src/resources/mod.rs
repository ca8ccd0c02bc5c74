//! Typed ARI resource clients.
//!
//! Each client is a thin facade over the [`Connection`](crate::Connection) dispatcher:
//! queries go out as [`Operation::Read`](crate::Operation::Read) and may be retried,
//! everything that changes server state goes out once as
//! [`Operation::Write`](crate::Operation::Write).

mod application;
mod asterisk;
mod bridge;
mod channel;
mod device_state;
mod mailbox;
mod playback;
mod recording;
mod sound;

pub use application::{ApplicationClient, ApplicationData};
pub use asterisk::{
    AsteriskClient, AsteriskInfo, BuildInfo, ConfigClient, ConfigInfo, ConfigTuple, LogChannel,
    LoggingClient, ModuleData, ModulesClient, StatusInfo, SystemInfo,
};
pub use bridge::{BridgeClient, BridgeData, CreateBridge};
pub use channel::{
    CallerId, ChannelClient, ChannelData, ChannelState, DialplanLocation, OriginateRequest,
    ParseChannelStateError,
};
pub use device_state::{DeviceState, DeviceStateClient, DeviceStateData, ParseDeviceStateError};
pub use mailbox::{MailboxClient, MailboxData};
pub use playback::{
    ParsePlaybackControlError, PlayOptions, PlaybackClient, PlaybackControl, PlaybackData,
    PlaybackHandle,
};
pub use recording::{
    LiveRecordingClient, LiveRecordingData, LiveRecordingHandle, RecordOptions, Recording,
    StoredRecordingClient, StoredRecordingData,
};
pub use sound::{FormatLang, SoundClient, SoundData, SoundFilter};

use serde::{Deserialize, Serialize};

pub(crate) const APPLICATIONS: &str = "applications";
pub(crate) const ASTERISK: &str = "asterisk";
pub(crate) const ASTERISK_LOGGING: &str = "asterisk.logging";
pub(crate) const ASTERISK_MODULES: &str = "asterisk.modules";
pub(crate) const ASTERISK_CONFIG: &str = "asterisk.config";
pub(crate) const BRIDGES: &str = "bridges";
pub(crate) const CHANNELS: &str = "channels";
pub(crate) const DEVICE_STATES: &str = "deviceStates";
pub(crate) const MAILBOXES: &str = "mailboxes";
pub(crate) const PLAYBACKS: &str = "playbacks";
pub(crate) const RECORDINGS_LIVE: &str = "recordings.live";
pub(crate) const RECORDINGS_STORED: &str = "recordings.stored";
pub(crate) const SOUNDS: &str = "sounds";

/// `{ "value": ... }` body shared by the variable get/set operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct VariableBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default)]
    pub value: String,
}
