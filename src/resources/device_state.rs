//! Custom device states (`Stasis:<name>` devices).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::DEVICE_STATES;
use crate::connection::Connection;
use crate::error::AriResult;

define_wire_enum! {
    parse_error: ParseDeviceStateError("device state"),
    /// Device states accepted by [`DeviceStateClient::update`].
    pub enum DeviceState {
        Unknown => "UNKNOWN",
        NotInUse => "NOT_INUSE",
        InUse => "INUSE",
        Busy => "BUSY",
        Invalid => "INVALID",
        Unavailable => "UNAVAILABLE",
        Ringing => "RINGING",
        RingInUse => "RINGINUSE",
        OnHold => "ONHOLD",
    }
}

/// A device and its current state string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DeviceStateData {
    pub name: String,
    pub state: String,
}

impl DeviceStateData {
    /// Parsed state, if recognized.
    pub fn device_state(&self) -> Option<DeviceState> {
        self.state
            .parse()
            .ok()
    }
}

#[derive(Serialize)]
struct StateBody {
    device_state: DeviceState,
}

/// Device state operations.
#[derive(Debug, Clone)]
pub struct DeviceStateClient {
    conn: Arc<Connection>,
}

impl DeviceStateClient {
    pub(crate) fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    fn subject(&self, action: &str, name: Option<&str>) -> String {
        self.conn
            .subject(DEVICE_STATES, action, name)
    }

    pub async fn list(&self) -> AriResult<Vec<DeviceStateData>> {
        self.conn
            .read(&self.subject("list", None))
            .await
    }

    pub async fn get(&self, name: &str) -> AriResult<DeviceStateData> {
        self.conn
            .read(&self.subject("get", Some(name)))
            .await
    }

    /// Change the state of a `Stasis:` device, creating it if needed.
    pub async fn update(&self, name: &str, state: DeviceState) -> AriResult<()> {
        self.conn
            .write(
                &self.subject("update", Some(name)),
                &StateBody {
                    device_state: state,
                },
            )
            .await
    }

    pub async fn delete(&self, name: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("delete", Some(name)))
            .await
    }
}
